//! CLI argument parsing and command dispatch.

pub mod aggregate;
pub mod analyze;
pub mod args;
pub mod status;

pub use args::{Cli, Commands, OutputFormat};
