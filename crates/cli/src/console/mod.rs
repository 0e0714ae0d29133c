//! Console implementations of the host seams

pub mod host;
pub mod terminal;

pub use host::ConsoleHost;
pub use terminal::{ConsoleTerminal, TerminalMode};
