use std::io;
use std::path::PathBuf;

/// Errors that can occur during qta-runner operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Environment error: {0}")]
    EnvironmentError(String),

    /// An external tool (python, virtualenv, pip) could not be run
    #[error("Failed to run `{command}`: {message}")]
    ToolError { command: String, message: String },

    #[error("No QTA project contains {}", .0.display())]
    ProjectNotFound(PathBuf),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn tool(command: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ToolError {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for qta-runner operations
pub type Result<T> = std::result::Result<T, Error>;
