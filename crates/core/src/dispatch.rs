//! Sending scripts and test cases to a project's terminal

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::command::TerminalLines;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::project::Project;
use crate::registry::ProjectRegistry;
use crate::tree::{TreeNode, TreeProvider};

pub const NO_SCRIPT_SELECTED: &str = "No script selected";
pub const NOT_A_TESTCASE: &str = "The class at the current line is not a valid test case";

/// What `run` should execute
#[derive(Debug, Clone)]
pub enum RunTarget {
    Path(PathBuf),
    Node(TreeNode),
}

/// Runs scripts and test cases.
///
/// Each operation returns the command line it sent, or `None` when nothing
/// was dispatched (the user was told why through the host).
pub struct RunDispatcher {
    host: Arc<dyn Host>,
    registry: Arc<ProjectRegistry>,
    tree: Arc<TreeProvider>,
    lines: TerminalLines,
}

impl RunDispatcher {
    pub fn new(
        host: Arc<dyn Host>,
        registry: Arc<ProjectRegistry>,
        tree: Arc<TreeProvider>,
        lines: TerminalLines,
    ) -> Self {
        Self {
            host,
            registry,
            tree,
            lines,
        }
    }

    /// Run a script: the given path, a node's file, or the active editor's file
    pub async fn run(&self, target: Option<RunTarget>) -> Result<Option<String>> {
        let path = match target {
            Some(RunTarget::Path(path)) => path,
            Some(RunTarget::Node(node)) => node.file,
            None => match self.host.active_editor() {
                Some(editor) => editor.path,
                None => {
                    self.host.show_info(NO_SCRIPT_SELECTED);
                    return Ok(None);
                }
            },
        };

        if self.host.is_dirty(&path) && !self.host.save_document(&path).await {
            tracing::warn!("Could not save {} before running it", path.display());
        }

        let project = self
            .registry
            .find(&path)
            .ok_or_else(|| Error::ProjectNotFound(path.clone()))?;
        project.ensure_env().await?;

        let line = self.lines.run_script(&project.python_path(), &path);
        Ok(Some(self.send(&project, line)))
    }

    /// Run the test case `node` through `manage.py runtest`
    pub async fn run_testcase(&self, node: &TreeNode) -> Result<Option<String>> {
        if !node.is_class() {
            self.host.show_info(NOT_A_TESTCASE);
            return Ok(None);
        }

        let project = self
            .registry
            .get(&node.project_root)
            .or_else(|| self.registry.find(&node.file))
            .ok_or_else(|| Error::ProjectNotFound(node.file.clone()))?;
        project.ensure_env().await?;

        let dotted = dotted_test_path(project.root(), &node.file, &node.label).ok_or_else(|| {
            Error::Other(format!(
                "{} is not inside {}",
                node.file.display(),
                project.root().display()
            ))
        })?;
        let line = self.lines.run_testcase(&project.python_path(), &dotted);
        Ok(Some(self.send(&project, line)))
    }

    /// Run the test case whose class contains the cursor
    pub async fn run_testcase_inline(&self) -> Result<Option<String>> {
        let Some(editor) = self.host.active_editor() else {
            self.host.show_info(NO_SCRIPT_SELECTED);
            return Ok(None);
        };
        self.tree.wait_until_idle().await;

        let nodes = match self.tree.last_root() {
            Some(listing) if listing.file == editor.path => listing.nodes,
            _ => self.tree.top_level().await,
        };

        let found = nodes
            .iter()
            .find(|node| node.is_class() && node.lines.contains_line(editor.cursor_line));

        match found {
            Some(node) if node.is_testcase() => self.run_testcase(node).await,
            _ => {
                tracing::debug!("No test case at line {}", editor.cursor_line);
                self.host.show_info(NOT_A_TESTCASE);
                Ok(None)
            }
        }
    }

    pub async fn open_file(&self, path: &Path, line: Option<u32>) {
        self.host.open_file(path, line).await;
    }

    fn send(&self, project: &Project, line: String) -> String {
        tracing::info!("Sending to {}: {}", project.root().display(), line);
        let terminal = project.terminal();
        terminal.show();
        terminal.send_text(&line);
        line
    }
}

impl std::fmt::Debug for RunDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunDispatcher")
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}

/// `manage.py runtest` target for `class` in `file`: the path relative to
/// `root`, without `.py`, joined with dots, plus the class name.
pub fn dotted_test_path(root: &Path, file: &Path, class: &str) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let mut parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let module = parts.pop()?;
    parts.push(module.strip_suffix(".py").unwrap_or(&module).to_string());
    parts.push(class.to_string());
    Some(parts.join("."))
}
