//! Interactive TUI application.

#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]

use crate::dns::{
    Domain, DomainSummary, Engine, EventReceiver, ProbeOutcome, ProgressSnapshot,
    RunConfig, RunEvent, RunReport, Server, SeverityBand, TrustDnsResolver,
};
use crate::error::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, BorderType, Borders, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame,
};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum View {
    #[default]
    Servers,
    Domains,
    Help,
}

/// Latest settled state of one server row.
#[derive(Debug, Clone)]
struct ServerRow {
    server: Server,
    text: String,
    band: Option<SeverityBand>,
}

impl ServerRow {
    fn untested(server: Server) -> Self {
        Self {
            server,
            text: "Untested".to_string(),
            band: None,
        }
    }

    fn settle(&mut self, outcome: &ProbeOutcome) {
        self.text = outcome.display();
        self.band = Some(SeverityBand::from_latency(outcome.latency_ms()));
    }
}

fn band_color(band: Option<SeverityBand>) -> Color {
    match band {
        Some(SeverityBand::Good) => Color::Green,
        Some(SeverityBand::Fair) => Color::Yellow,
        Some(SeverityBand::Poor) => Color::Rgb(255, 165, 0),
        Some(SeverityBand::Bad) => Color::Red,
        None => Color::DarkGray,
    }
}

pub struct App {
    engine: Engine<TrustDnsResolver>,
    events: EventReceiver,
    base: RunConfig,
    rows: Vec<ServerRow>,
    domains: Vec<DomainSummary>,
    domain_input: String,
    editing: bool,
    all_domains: bool,
    current_view: View,
    progress: ProgressSnapshot,
    status: Option<String>,
    /// Set when a run is spawned, cleared by its `Completed` event
    running: bool,
    selected_index: usize,
    table_state: TableState,
}

impl App {
    /// Create the app from a base configuration.
    ///
    /// The base supplies servers, the domain catalog, timeout and worker
    /// count; the domain field starts at the base's single domain.
    #[must_use]
    pub fn new(base: RunConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Engine::new(TrustDnsResolver::new()).with_events(tx);
        let domain_input = base
            .selection()
            .first()
            .map(ToString::to_string)
            .unwrap_or_default();
        let rows = base.servers.iter().cloned().map(ServerRow::untested).collect();

        Self {
            engine,
            events: rx,
            rows,
            domains: Vec::new(),
            domain_input,
            editing: false,
            all_domains: false,
            current_view: View::default(),
            progress: ProgressSnapshot::default(),
            status: None,
            running: false,
            selected_index: 0,
            table_state: TableState::default(),
            base,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        // Initialize terminal with raw mode and alternate screen
        let mut terminal = ratatui::init();

        let res = self.run_loop(&mut terminal).await;

        // Restore terminal state
        ratatui::restore();

        res
    }

    async fn run_loop(&mut self, terminal: &mut ratatui::DefaultTerminal) -> Result<()> {
        loop {
            // 1. Process all pending events from the engine
            while let Ok(event) = self.events.try_recv() {
                self.handle_event(event);
            }

            // 2. Render UI
            terminal.draw(|f| self.draw(f))?;

            // 3. Handle keyboard events (non-blocking with 50ms timeout)
            if crossterm::event::poll(Duration::from_millis(50))? {
                if let crossterm::event::Event::Key(key) = crossterm::event::read()? {
                    if !self.handle_key(key) {
                        break;
                    }
                }
            }
            tokio::task::yield_now().await;
        }

        Ok(())
    }

    fn handle_event(&mut self, event: RunEvent) {
        match event {
            RunEvent::Started { total } => {
                self.progress = ProgressSnapshot {
                    completed: 0,
                    total,
                };
            }
            RunEvent::Outcome(outcome) => {
                if let Some(row) = self.rows.iter_mut().find(|r| r.server == outcome.server) {
                    row.settle(&outcome);
                }
            }
            RunEvent::Progress(snapshot) => {
                // Progress events arrive in completion order, not count order
                if snapshot.completed >= self.progress.completed {
                    self.progress = snapshot;
                }
            }
            RunEvent::ConfigError(msg) => {
                self.status = Some(msg);
            }
            RunEvent::Completed(report) => {
                self.running = false;
                self.apply_report(&report);
            }
        }
    }

    /// Replace the rows with the final ranking.
    fn apply_report(&mut self, report: &RunReport) {
        self.rows = report
            .servers
            .iter()
            .map(|r| ServerRow {
                server: r.server.clone(),
                text: r.latency.to_string(),
                band: Some(r.band),
            })
            .collect();
        if self.rows.is_empty() {
            self.rows = self.base.servers.iter().cloned().map(ServerRow::untested).collect();
        }
        self.domains = report.domains.clone();
        self.progress = report.progress;
        self.status = Some(format!(
            "Done in {:.1}s: {} ok, {} failed",
            report.elapsed.as_secs_f64(),
            report.counts.success,
            report.counts.failed()
        ));
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }

        if self.editing {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => self.editing = false,
                KeyCode::Backspace => {
                    self.domain_input.pop();
                }
                KeyCode::Char(c) if !c.is_whitespace() => self.domain_input.push(c),
                _ => {}
            }
            return true;
        }

        match key.code {
            KeyCode::Char('q') if self.current_view != View::Help => return false,
            KeyCode::Esc | KeyCode::Char('q') => self.current_view = View::Servers,
            KeyCode::Tab => {
                self.current_view = match self.current_view {
                    View::Servers => View::Domains,
                    View::Domains => View::Help,
                    View::Help => View::Servers,
                };
            }
            KeyCode::Char('1') => self.current_view = View::Servers,
            KeyCode::Char('2') => self.current_view = View::Domains,
            KeyCode::Char('3') => self.current_view = View::Help,
            KeyCode::Char('e' | '/') if !self.is_busy() => self.editing = true,
            KeyCode::Char('a') if !self.is_busy() => {
                self.all_domains = !self.all_domains;
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.start_run(),
            KeyCode::Up | KeyCode::Char('k') => {
                if self.selected_index > 0 {
                    self.selected_index -= 1;
                    self.table_state.select(Some(self.selected_index));
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let max = self.rows.len().saturating_sub(1);
                if self.selected_index < max {
                    self.selected_index += 1;
                    self.table_state.select(Some(self.selected_index));
                }
            }
            _ => {}
        }

        true
    }

    fn is_busy(&self) -> bool {
        self.running || self.engine.is_running()
    }

    /// Build the configuration for the next run from the current inputs.
    fn next_config(&self) -> RunConfig {
        let config = if self.all_domains {
            RunConfig::multi(self.base.servers.clone(), self.base.catalog.clone())
        } else {
            RunConfig::single(
                self.base.servers.clone(),
                Domain::new(self.domain_input.trim()),
            )
            .with_catalog(self.base.catalog.clone())
        };
        config
            .with_timeout(self.base.timeout)
            .with_workers(self.base.workers)
    }

    fn start_run(&mut self) {
        // The start key is inert while a run is active
        if self.is_busy() {
            return;
        }
        if !self.all_domains && self.domain_input.trim().is_empty() {
            self.status = Some("Enter a domain first [e]".to_string());
            return;
        }

        self.rows = self.base.servers.iter().cloned().map(ServerRow::untested).collect();
        self.domains.clear();
        self.status = None;
        self.selected_index = 0;
        self.table_state.select(None);

        let config = self.next_config();
        self.progress = ProgressSnapshot {
            completed: 0,
            total: config.total(),
        };

        self.running = true;
        let engine = self.engine.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.start_run(config).await {
                tracing::warn!("run not started: {e}");
            }
        });
    }

    fn draw(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(3),
            ])
            .split(f.area());

        self.draw_title_bar(f, chunks[0]);
        self.draw_input(f, chunks[1]);

        match self.current_view {
            View::Servers => self.draw_servers(f, chunks[2]),
            View::Domains => self.draw_domains(f, chunks[2]),
            View::Help => self.draw_help(f, chunks[2]),
        }

        self.draw_progress(f, chunks[3]);
    }

    fn draw_title_bar(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(24),
                Constraint::Min(10),
                Constraint::Length(24),
            ])
            .split(area);

        let title = Paragraph::new("DNS Latency Ranking").style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
        f.render_widget(title, chunks[0]);

        let tabs = ["Servers", "Domains", "Help"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let active = matches!(
                    (i, self.current_view),
                    (0, View::Servers) | (1, View::Domains) | (2, View::Help)
                );
                if active {
                    format!("[{name}]")
                } else {
                    format!(" {name} ")
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        let tabs = Paragraph::new(tabs)
            .style(Style::default().fg(Color::White))
            .alignment(Alignment::Center);
        f.render_widget(tabs, chunks[1]);

        let counts = Paragraph::new(format!(
            "{} servers / {} domains",
            self.base.servers.len(),
            self.base.catalog.len()
        ))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Right);
        f.render_widget(counts, chunks[2]);
    }

    fn draw_input(&self, f: &mut Frame, area: Rect) {
        let text = if self.all_domains {
            format!("All {} listed domains  [a] single domain", self.base.catalog.len())
        } else if self.editing {
            format!("{}_", self.domain_input)
        } else {
            format!("{}  [e] edit  [a] all domains", self.domain_input)
        };
        let style = if self.editing {
            Style::default().fg(Color::Yellow)
        } else if self.is_busy() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };
        let input = Paragraph::new(text).style(style).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(" Domain "),
        );
        f.render_widget(input, area);
    }

    fn draw_servers(&mut self, f: &mut Frame, area: Rect) {
        if self.rows.is_empty() {
            let empty = Paragraph::new("No DNS servers loaded")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            f.render_widget(empty, area);
            return;
        }

        let rows: Vec<Row> = self
            .rows
            .iter()
            .enumerate()
            .map(|(idx, r)| {
                let style = Style::default().fg(band_color(r.band));
                Row::new(vec![
                    Cell::from(format!("{}", idx + 1)),
                    Cell::from(r.server.to_string()),
                    Cell::from(r.text.clone()).style(style),
                ])
            })
            .collect();

        let header = Row::new(vec!["#", "DNS server", "Response time"])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let table = Table::new(
            rows,
            [
                Constraint::Length(4),
                Constraint::Min(20),
                Constraint::Length(24),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        )
        .row_highlight_style(Style::default().bg(Color::Blue));

        // Use stateful rendering for scroll support
        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn draw_domains(&self, f: &mut Frame, area: Rect) {
        if self.domains.is_empty() {
            let msg = Paragraph::new("Domain summaries appear after a run completes")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            f.render_widget(msg, area);
            return;
        }

        let rows: Vec<Row> = self
            .domains
            .iter()
            .map(|d| {
                Row::new(vec![
                    Cell::from(d.domain.to_string()),
                    Cell::from(d.latency.to_string()).style(Style::default().fg(band_color(d.band))),
                ])
            })
            .collect();

        let header = Row::new(vec!["Domain", "Mean (< 50 ms samples)"])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let table = Table::new(rows, [Constraint::Min(30), Constraint::Length(24)])
            .header(header)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            );
        f.render_widget(table, area);
    }

    fn draw_help(&self, f: &mut Frame, area: Rect) {
        let help_items = [
            ("Space/Enter", "Start a run"),
            ("e or /", "Edit the domain"),
            ("a", "Toggle all listed domains"),
            ("j/k or Up/Down", "Navigate servers"),
            ("1/2/3", "Switch tabs (Servers/Domains/Help)"),
            ("Tab", "Cycle through tabs"),
            ("q", "Quit application"),
        ];

        let rows: Vec<Row> = help_items
            .iter()
            .map(|(key, desc)| {
                Row::new(vec![
                    Cell::from(format!("  {}  ", key)).style(Style::default().fg(Color::Yellow)),
                    Cell::from(*desc).style(Style::default().fg(Color::White)),
                ])
            })
            .collect();

        let help_table = Table::new(rows, [Constraint::Length(18), Constraint::Min(30)])
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Keyboard Shortcuts ")
                    .border_type(BorderType::Rounded),
            )
            .column_spacing(2);

        f.render_widget(help_table, area);
    }

    fn draw_progress(&self, f: &mut Frame, area: Rect) {
        let title = match &self.status {
            Some(status) => format!(" {} | {} ", self.progress, status),
            None => format!(" Progress: {} ", self.progress),
        };

        let gauge = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_type(BorderType::Rounded),
            )
            .gauge_style(Style::default().fg(Color::Cyan))
            .percent(self.progress.percent());

        f.render_widget(gauge, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::OutcomeKind;

    fn app() -> App {
        let base = RunConfig::single(
            vec!["1.1.1.1".into(), "8.8.8.8".into()],
            "example.com".into(),
        );
        App::new(base)
    }

    #[test]
    fn test_outcome_updates_row() {
        let mut app = app();
        app.handle_event(RunEvent::Outcome(ProbeOutcome::new(
            "8.8.8.8".into(),
            "example.com".into(),
            Duration::from_millis(150),
            OutcomeKind::Success,
        )));

        assert_eq!(app.rows[1].text, "150.00 ms");
        assert_eq!(app.rows[1].band, Some(SeverityBand::Fair));
        assert_eq!(app.rows[0].text, "Untested");
    }

    #[test]
    fn test_progress_never_goes_backwards() {
        let mut app = app();
        app.handle_event(RunEvent::Started { total: 2 });
        app.handle_event(RunEvent::Progress(ProgressSnapshot {
            completed: 2,
            total: 2,
        }));
        app.handle_event(RunEvent::Progress(ProgressSnapshot {
            completed: 1,
            total: 2,
        }));
        assert_eq!(app.progress.completed, 2);
    }

    #[test]
    fn test_domain_editing() {
        let mut app = app();
        app.handle_key(KeyEvent::from(KeyCode::Char('e')));
        assert!(app.editing);
        for _ in 0..".com".len() {
            app.handle_key(KeyEvent::from(KeyCode::Backspace));
        }
        for c in ".org".chars() {
            app.handle_key(KeyEvent::from(KeyCode::Char(c)));
        }
        app.handle_key(KeyEvent::from(KeyCode::Enter));

        assert!(!app.editing);
        assert_eq!(app.domain_input, "example.org");
        assert_eq!(app.next_config().selection(), vec![Domain::new("example.org")]);
    }

    #[tokio::test]
    async fn test_second_start_keeps_run_state() {
        let mut app = app();
        app.handle_key(KeyEvent::from(KeyCode::Enter));
        assert!(app.running);
        app.handle_event(RunEvent::Outcome(ProbeOutcome::new(
            "1.1.1.1".into(),
            "example.com".into(),
            Duration::from_millis(12),
            OutcomeKind::Success,
        )));

        // The spawned run has not been polled yet
        app.handle_key(KeyEvent::from(KeyCode::Enter));
        assert_eq!(app.rows[0].band, Some(SeverityBand::Good));
        assert_eq!(app.progress.total, 2);

        app.handle_event(RunEvent::Completed(RunReport::empty(chrono::Utc::now(), &[])));
        assert!(!app.running);
    }

    #[test]
    fn test_band_colors() {
        assert_eq!(band_color(Some(SeverityBand::Good)), Color::Green);
        assert_eq!(band_color(Some(SeverityBand::Bad)), Color::Red);
        assert_eq!(band_color(None), Color::DarkGray);
    }
}
