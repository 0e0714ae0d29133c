//! Command lines sent to a project's terminal

use std::path::Path;

use super::invocation::quote;
use crate::types::Platform;

/// Builds platform-specific terminal command lines
#[derive(Debug, Clone, Copy)]
pub struct TerminalLines {
    platform: Platform,
}

impl TerminalLines {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn export_pythonpath(&self, root: &Path) -> String {
        match self.platform {
            Platform::Windows => format!("set PYTHONPATH={}", root.display()),
            Platform::Unix => format!("export PYTHONPATH={}", root.display()),
        }
    }

    pub fn activate(&self, env_path: &Path) -> String {
        match self.platform {
            Platform::Windows => format!(
                "\"{}\"",
                env_path.join("Scripts").join("activate.bat").display()
            ),
            Platform::Unix => format!(
                "source {};",
                quote(&env_path.join("bin").join("activate").to_string_lossy())
            ),
        }
    }

    pub fn deactivate(&self) -> String {
        "deactivate".to_string()
    }

    /// Put the interpreter's directory first on `PATH`
    pub fn prepend_path(&self, python_dir: &Path) -> String {
        match self.platform {
            Platform::Windows => format!(
                "SET PATH={};{};%PATH%",
                python_dir.display(),
                python_dir.join("Scripts").display()
            ),
            Platform::Unix => format!("export PATH={}:$PATH", python_dir.display()),
        }
    }

    pub fn create_virtualenv(&self, python: &Path, env_path: &Path) -> String {
        format!(
            "\"{}\" -m virtualenv \"{}\" --python={}",
            python.display(),
            env_path.display(),
            quote(&python.to_string_lossy())
        )
    }

    /// `pip install -r`, optionally against an alternate package index
    pub fn pip_install(&self, python: &Path, requirements: &Path, index: Option<&str>) -> String {
        let mut line = format!(
            "{} -m pip install -r {}",
            quote(&python.to_string_lossy()),
            quote(&requirements.to_string_lossy())
        );

        if let Some(index) = index {
            line.push_str(&format!(" -i {index}"));
            match url::Url::parse(index) {
                Ok(url) => {
                    if let Some(host) = url.host_str() {
                        match url.port() {
                            Some(port) => line.push_str(&format!(" --trusted-host {host}:{port}")),
                            None => line.push_str(&format!(" --trusted-host {host}")),
                        }
                    }
                }
                Err(e) => tracing::warn!("Package index {} is not a valid URL: {}", index, e),
            }
        }
        line
    }

    pub fn run_script(&self, python: &Path, script: &Path) -> String {
        format!(
            "{} {}",
            quote(&python.to_string_lossy()),
            quote(&script.to_string_lossy())
        )
    }

    pub fn run_testcase(&self, python: &Path, dotted_path: &str) -> String {
        format!(
            "{} manage.py runtest {}",
            quote(&python.to_string_lossy()),
            dotted_path
        )
    }
}
