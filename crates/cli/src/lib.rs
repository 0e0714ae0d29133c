pub mod cli;
pub mod commands;
pub mod console;
pub mod display;
pub mod utils;

// Re-export commonly used items
pub use cli::{Commands, PromptAnswers, Runner};
pub use console::{ConsoleHost, ConsoleTerminal, TerminalMode};
