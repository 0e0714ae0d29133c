//! "Run QTA testcase" lenses above test-case classes

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::host::Host;
use crate::registry::ProjectRegistry;
use crate::tree::{TreeNode, TreeProvider};
use crate::workspace::QtaCommand;

pub const LENS_TITLE: &str = "Run QTA testcase";

#[derive(Debug, Clone)]
pub struct CodeLens {
    pub id: u64,
    /// 0-based line of the class declaration
    pub line: u32,
    pub title: &'static str,
    pub testcase: TreeNode,
}

impl CodeLens {
    pub fn command(&self) -> QtaCommand {
        QtaCommand::RunTestcase(self.testcase.clone())
    }
}

pub struct CodeLensProvider {
    host: Arc<dyn Host>,
    registry: Arc<ProjectRegistry>,
    tree: Arc<TreeProvider>,
    enabled: bool,
    next_id: AtomicU64,
    documents: Mutex<HashMap<PathBuf, HashMap<u32, CodeLens>>>,
}

impl CodeLensProvider {
    pub fn new(
        host: Arc<dyn Host>,
        registry: Arc<ProjectRegistry>,
        tree: Arc<TreeProvider>,
        enabled: bool,
    ) -> Self {
        Self {
            host,
            registry,
            tree,
            enabled,
            next_id: AtomicU64::new(1),
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Lenses for `document`, taken from the last listing once it is settled.
    ///
    /// A lens already shown at the same line keeps its identity.
    pub async fn provide(&self, document: &Path) -> Vec<CodeLens> {
        if !self.enabled {
            return Vec::new();
        }
        self.tree.wait_until_idle().await;

        if self.registry.find(document).is_none() {
            return Vec::new();
        }
        let testcases: Vec<TreeNode> = self
            .tree
            .last_root()
            .filter(|listing| listing.file == document)
            .map(|listing| listing.nodes.into_iter().filter(TreeNode::is_testcase).collect())
            .unwrap_or_default();

        let mut documents = self.documents.lock();
        let previous = documents.remove(document).unwrap_or_default();
        let mut current = HashMap::new();
        let mut lenses = Vec::new();

        for testcase in testcases {
            let line = testcase.lines.start.saturating_sub(1);
            let lens = match previous.get(&line) {
                Some(existing) => CodeLens {
                    testcase,
                    ..existing.clone()
                },
                None => CodeLens {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    line,
                    title: LENS_TITLE,
                    testcase,
                },
            };
            current.insert(line, lens.clone());
            lenses.push(lens);
        }

        documents.insert(document.to_path_buf(), current);
        lenses
    }

    /// Tell the host to re-request lenses once the tree is idle
    pub async fn refresh(&self) {
        self.tree.wait_until_idle().await;
        self.host.lenses_changed();
    }
}

impl std::fmt::Debug for CodeLensProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeLensProvider")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
