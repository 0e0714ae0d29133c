use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

use super::node::TreeNode;
use crate::host::Host;
use crate::registry::ProjectRegistry;

/// The most recent top-level listing and the file it was built for
#[derive(Debug, Clone)]
pub struct RootListing {
    pub file: PathBuf,
    pub nodes: Vec<TreeNode>,
}

/// Builds the outline of the active editor's file
pub struct TreeProvider {
    host: Arc<dyn Host>,
    registry: Arc<ProjectRegistry>,
    listing_timeout: Duration,
    last_root: Mutex<Option<RootListing>>,
    active: AtomicUsize,
    refreshing: watch::Sender<bool>,
}

/// Marks a listing as in progress for as long as it lives
struct RefreshGuard<'a> {
    provider: &'a TreeProvider,
}

impl<'a> RefreshGuard<'a> {
    fn new(provider: &'a TreeProvider) -> Self {
        provider.active.fetch_add(1, Ordering::SeqCst);
        provider.refreshing.send_replace(true);
        Self { provider }
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if self.provider.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.provider.refreshing.send_replace(false);
        }
    }
}

impl TreeProvider {
    pub fn new(host: Arc<dyn Host>, registry: Arc<ProjectRegistry>, listing_timeout: Duration) -> Self {
        let (refreshing, _) = watch::channel(false);
        Self {
            host,
            registry,
            listing_timeout,
            last_root: Mutex::new(None),
            active: AtomicUsize::new(0),
            refreshing,
        }
    }

    /// Classes then module-level functions of the active editor's file.
    ///
    /// Empty when no editor is active, the file belongs to no project, or the
    /// listing does not finish within the timeout.
    pub async fn top_level(&self) -> Vec<TreeNode> {
        let Some(editor) = self.host.active_editor() else {
            return Vec::new();
        };
        let Some(project) = self.registry.find(&editor.path) else {
            tracing::debug!("{} is outside every QTA project", editor.path.display());
            return Vec::new();
        };

        let _guard = RefreshGuard::new(self);
        let file = editor.path;
        let root = project.root().to_path_buf();

        let fetch = async {
            tokio::join!(
                project.class_list(&file),
                project.function_list(&file, None)
            )
        };
        let nodes: Vec<TreeNode> = match tokio::time::timeout(self.listing_timeout, fetch).await {
            Ok((classes, functions)) => classes
                .iter()
                .map(|c| TreeNode::class(&root, &file, c))
                .chain(
                    functions
                        .iter()
                        .map(|f| TreeNode::function(&root, &file, f, None)),
                )
                .collect(),
            Err(_) => {
                tracing::warn!(
                    "Listing {} timed out after {:?}",
                    file.display(),
                    self.listing_timeout
                );
                Vec::new()
            }
        };

        *self.last_root.lock() = Some(RootListing {
            file,
            nodes: nodes.clone(),
        });
        self.enrich(&nodes);
        nodes
    }

    /// Top level for `None`, otherwise the children of `node`
    pub async fn children(&self, node: Option<&TreeNode>) -> Vec<TreeNode> {
        match node {
            None => self.top_level().await,
            Some(node) => {
                let children = node.children();
                self.enrich(&children);
                children
            }
        }
    }

    pub fn last_root(&self) -> Option<RootListing> {
        self.last_root.lock().clone()
    }

    pub fn is_refreshing(&self) -> bool {
        *self.refreshing.borrow()
    }

    /// Resolves once no listing is being built
    pub async fn wait_until_idle(&self) {
        let mut rx = self.refreshing.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|refreshing| !*refreshing).await;
    }

    /// Ask the host to re-query the whole tree (`None`) or one node
    pub fn refresh(&self, node: Option<&TreeNode>) {
        self.host.tree_changed(node);
    }

    /// Resolve tooltips in the background, notifying the host per node
    fn enrich(&self, nodes: &[TreeNode]) {
        if nodes.is_empty() {
            return;
        }
        let host = Arc::clone(&self.host);
        let nodes = nodes.to_vec();
        tokio::spawn(async move {
            for node in nodes {
                node.resolve_tooltip();
                host.tree_changed(Some(&node));
            }
        });
    }
}

impl std::fmt::Debug for TreeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeProvider")
            .field("listing_timeout", &self.listing_timeout)
            .field("refreshing", &self.is_refreshing())
            .finish_non_exhaustive()
    }
}
