//! Configuration module.
//!
//! This module provides functionality for loading the server and domain
//! lists a run is built from.

pub mod loader;

pub use loader::ConfigLoader;
