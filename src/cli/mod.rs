//! Command-line interface
//!
//! `spec`, `check`, `discover` and `read` over a YAML source definition
//! and a local or cloud file store.

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
