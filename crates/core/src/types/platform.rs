use std::path::{Path, PathBuf};

/// Marker file that identifies an interpreter as belonging to a virtualenv
pub const ACTIVATION_MARKER: &str = "activate_this.py";

/// Host OS family; decides virtualenv layout and terminal syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    /// Directory inside a virtualenv that holds the interpreter and scripts
    pub fn env_bin_dir(self) -> &'static str {
        match self {
            Platform::Windows => "Scripts",
            Platform::Unix => "bin",
        }
    }

    pub fn env_python(self, env_path: &Path) -> PathBuf {
        match self {
            Platform::Windows => env_path.join("Scripts").join("python.exe"),
            Platform::Unix => env_path.join("bin").join("python"),
        }
    }

    pub fn activation_marker(self, env_path: &Path) -> PathBuf {
        env_path.join(self.env_bin_dir()).join(ACTIVATION_MARKER)
    }

    pub fn default_python(self) -> &'static str {
        match self {
            Platform::Windows => "python.exe",
            Platform::Unix => "python",
        }
    }
}
