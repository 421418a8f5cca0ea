//! Tooling
//!
//! Admin command line for installing, checking and inspecting a reliability
//! database.

pub mod cli;
pub mod format;

pub use cli::{ActionCommands, Cli, CliContext, Commands, NodeKind};
