//! Tool configuration and per-project editor settings

pub mod project_settings;
pub mod settings;

pub use project_settings::{
    PIP_SOURCE_KEY, PYTHON_PATH_KEY, ProjectSettings, SETTINGS_DIR, SETTINGS_FILE,
};
pub use settings::Config;
