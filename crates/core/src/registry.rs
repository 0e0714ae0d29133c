//! Live QTA projects of a workspace

use parking_lot::RwLock;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::project::{Project, ProjectContext};
use crate::utils::is_qta_project;

#[derive(Debug)]
pub struct ProjectRegistry {
    ctx: ProjectContext,
    init_on_open: bool,
    projects: RwLock<Vec<Arc<Project>>>,
}

impl ProjectRegistry {
    /// With `init_on_open`, every new project runs its environment setup in
    /// the background as soon as it is added.
    pub fn new(ctx: ProjectContext, init_on_open: bool) -> Self {
        Self {
            ctx,
            init_on_open,
            projects: RwLock::new(Vec::new()),
        }
    }

    pub fn context(&self) -> &ProjectContext {
        &self.ctx
    }

    /// Register the project at `root`.
    ///
    /// Hidden folders, non-directories and folders that are not QTA projects
    /// are skipped. An already registered root returns the live project.
    pub fn add(&self, root: &Path) -> Option<Arc<Project>> {
        let root = absolute(root);
        if root
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'))
        {
            return None;
        }
        if !root.is_dir() || !is_qta_project(&root) {
            tracing::debug!("{} is not a QTA project", root.display());
            return None;
        }

        let project = {
            let mut projects = self.projects.write();
            if let Some(existing) = projects.iter().find(|p| p.root() == root) {
                return Some(Arc::clone(existing));
            }
            let project = Arc::new(Project::new(&root, self.ctx.clone()));
            projects.push(Arc::clone(&project));
            project
        };

        if self.init_on_open {
            let background = Arc::clone(&project);
            tokio::spawn(async move {
                if let Err(e) = background.init().await {
                    tracing::warn!(
                        "Environment setup for {} failed: {}",
                        background.root().display(),
                        e
                    );
                }
            });
        }
        Some(project)
    }

    pub fn get(&self, root: &Path) -> Option<Arc<Project>> {
        let root = absolute(root);
        self.projects
            .read()
            .iter()
            .find(|p| p.root() == root)
            .cloned()
    }

    /// First project whose root contains `path`
    pub fn find(&self, path: &Path) -> Option<Arc<Project>> {
        let path = absolute(path);
        self.projects
            .read()
            .iter()
            .find(|p| path.starts_with(p.root()))
            .cloned()
    }

    /// Dispose and forget the project at `root`
    pub fn remove(&self, root: &Path) -> bool {
        let root = absolute(root);
        let removed = {
            let mut projects = self.projects.write();
            projects
                .iter()
                .position(|p| p.root() == root)
                .map(|index| projects.remove(index))
        };
        match removed {
            Some(project) => {
                project.dispose();
                true
            }
            None => false,
        }
    }

    pub fn projects(&self) -> Vec<Arc<Project>> {
        self.projects.read().clone()
    }

    pub fn len(&self) -> usize {
        self.projects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.read().is_empty()
    }

    pub fn dispose_all(&self) {
        let projects = std::mem::take(&mut *self.projects.write());
        for project in projects {
            project.dispose();
        }
    }
}

/// Absolute form of `path` with `.` and `..` folded away, so every spelling
/// of a folder maps to one registry key
fn absolute(path: &Path) -> PathBuf {
    let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normal = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normal.pop() {
                    normal.push(component);
                }
            }
            other => normal.push(other),
        }
    }
    normal
}
