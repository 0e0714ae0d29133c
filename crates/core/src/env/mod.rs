//! Per-project virtualenv management

pub mod policy;
pub mod resolver;
pub mod watcher;

pub use policy::EnvPolicy;
pub use resolver::{EnvPhase, EnvironmentResolver, RequirementsStatus, parse_virtualenv_major};
pub use watcher::{DEFAULT_DEBOUNCE, ProjectEvent, ProjectWatcher};
