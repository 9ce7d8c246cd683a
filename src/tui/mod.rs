//! Interactive terminal view.
//!
//! Shows the live server ranking while a run streams outcomes, the
//! per-domain summary once it completes, and a progress gauge, rendered
//! with `ratatui`.

mod app;

pub use app::App;
