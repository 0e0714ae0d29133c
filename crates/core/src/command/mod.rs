//! External process invocation and terminal command generation

pub mod invocation;
pub mod terminal_lines;

// Re-export commonly used types
pub use invocation::{Invocation, ProcessOutput, ProcessRunner, SystemProcessRunner, quote};
pub use terminal_lines::TerminalLines;
