//! The command-line surface: a thin dispatcher over the core (Store,
//! Queue, Worker, Supervisor). Per the design spec this layer is
//! deliberately minimal — argument parsing and output formatting only.

pub mod args;
pub mod commands;
pub mod router;

pub use args::Cli;
pub use router::execute_command;
