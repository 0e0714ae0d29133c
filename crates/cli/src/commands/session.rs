use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use qta_runner_core::config::SETTINGS_DIR;
use qta_runner_core::parser::find_cache_root;
use qta_runner_core::utils::is_qta_project;
use qta_runner_core::{Config, Project, PromptResponse, SystemProcessRunner, Workspace};

use crate::console::{ConsoleHost, TerminalMode};

/// How a command talks to the user and to the shell
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub assumed: Option<PromptResponse>,
    pub mode: TerminalMode,
}

impl SessionOptions {
    pub fn new(assumed: Option<PromptResponse>, dry_run: bool) -> Self {
        Self {
            assumed,
            mode: if dry_run {
                TerminalMode::Echo
            } else {
                TerminalMode::Shell
            },
        }
    }
}

/// A workspace opened on the single project containing a path
pub struct Session {
    pub host: Arc<ConsoleHost>,
    pub workspace: Workspace,
    pub project: Arc<Project>,
    /// The absolute form of the path the session was opened for
    pub target: PathBuf,
}

impl Session {
    pub fn open(path: &Path, options: SessionOptions) -> Result<Self> {
        let target = std::path::absolute(path)
            .with_context(|| format!("Failed to resolve {}", path.display()))?;
        let root = find_project_root(&target)
            .ok_or_else(|| anyhow!("{} is not inside a QTA project", target.display()))?;

        let config = Config::discover(&root).context("Failed to load configuration")?;
        let host = Arc::new(ConsoleHost::new(options.assumed, options.mode));
        let workspace = Workspace::new(host.clone(), config, Arc::new(SystemProcessRunner))
            .context("Failed to set up the workspace")?;
        let project = workspace
            .open_folders(&[root.clone()])
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Failed to open project {}", root.display()))?;
        tracing::debug!("Opened project {}", project.root().display());

        Ok(Self {
            host,
            workspace,
            project,
            target,
        })
    }

    /// Make `target` the active editor with the cursor on 1-based `line`
    pub fn focus(&self, line: Option<u32>) {
        self.host.set_active_editor(&self.target, line.unwrap_or(1));
    }

    /// Fail unless `target` sits below a folder with a settings dir, where
    /// parse results are cached. Closes the session on failure.
    pub fn require_cache_root(self) -> Result<Self> {
        if find_cache_root(&self.target).is_some() {
            return Ok(self);
        }
        let message = format!(
            "{} is outside any project cache root (no {} folder). Run `qta-runner init {}` first",
            self.target.display(),
            SETTINGS_DIR,
            self.project.root().display()
        );
        self.close();
        Err(anyhow!(message))
    }

    /// Persist caches and wait for the project's shell to finish
    pub fn close(self) {
        self.workspace.shutdown();
    }
}

/// Nearest directory at or above `path` holding `manage.py` and `settings.py`
pub fn find_project_root(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find(|dir| is_qta_project(dir))
        .map(Path::to_path_buf)
}
