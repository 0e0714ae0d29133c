pub mod env;
pub mod init;
pub mod install;
pub mod lenses;
pub mod run;
pub mod session;
pub mod tree;
pub mod watch;

pub use env::env_command;
pub use init::init_command;
pub use install::install_command;
pub use lenses::lenses_command;
pub use run::run_command;
pub use session::{Session, SessionOptions, find_project_root};
pub use test::test_command;
pub use tree::tree_command;
pub use watch::watch_command;
