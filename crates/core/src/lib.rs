//! qta-runner - Outline and run QTA test projects from an editor or a terminal
//!
//! This crate provides functionality to:
//! - Parse Python modules into classes, test cases, functions and steps,
//!   with a persistent cache keyed by file modification time
//! - Manage a project's virtualenv and requirements through its terminal
//! - Build an outline tree and code lenses for the active file
//! - Run scripts and single test cases in a per-project terminal
//!
//! Everything that needs a UI goes through the [`host::Host`] trait.
pub mod cache;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod host;
pub mod lens;
pub mod parser;
pub mod project;
pub mod registry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tree;
pub mod types;
pub mod utils;
pub mod workspace;

// Re-export commonly used types and traits
pub use error::{Error, Result};
pub use types::*;

// Re-export main API components
pub use cache::CacheStore;
pub use command::{Invocation, ProcessOutput, ProcessRunner, SystemProcessRunner, TerminalLines};
pub use config::{Config, ProjectSettings};
pub use dispatch::{RunDispatcher, RunTarget, dotted_test_path};
pub use env::{EnvPolicy, EnvironmentResolver, RequirementsStatus};
pub use host::{EditorState, Host, PromptChoices, PromptResponse, Terminal, terminal_name};
pub use lens::{CodeLens, CodeLensProvider};
pub use parser::{HelperScripts, PythonParser};
pub use project::{Project, ProjectContext};
pub use registry::ProjectRegistry;
pub use tree::{NodeKind, TreeNode, TreeProvider};
pub use workspace::{QtaCommand, Workspace, WorkspaceOptions};
