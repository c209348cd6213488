//! The external command-execution capability treated as opaque by the
//! rest of the core: run a command, get back one of three outcomes,
//! respecting a wall-clock timeout.

pub mod error;
pub mod mock;
pub mod runner;

pub use error::ProcessError;
pub use mock::MockRunner;
pub use runner::{CommandOutcome, CommandRunner, ShellRunner};
