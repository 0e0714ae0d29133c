//! The workspace context: owns every service and routes host commands

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{CacheStore, FlusherHandle};
use crate::command::{ProcessRunner, TerminalLines};
use crate::config::Config;
use crate::dispatch::{RunDispatcher, RunTarget};
use crate::env::EnvPolicy;
use crate::error::Result;
use crate::host::Host;
use crate::lens::{CodeLens, CodeLensProvider};
use crate::parser::HelperScripts;
use crate::project::{Project, ProjectContext};
use crate::registry::ProjectRegistry;
use crate::tree::{TreeNode, TreeProvider};
use crate::types::Platform;

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceOptions {
    /// Run environment setup in the background for each opened project
    pub init_on_open: bool,
}

/// Commands a host can invoke
#[derive(Debug, Clone)]
pub enum QtaCommand {
    UpdateStatus(String),
    RefreshTree(Option<TreeNode>),
    RefreshLenses,
    Run(Option<RunTarget>),
    RunTestcase(TreeNode),
    RunTestcaseInline,
    OpenFile { path: PathBuf, line: Option<u32> },
}

pub struct Workspace {
    ctx: ProjectContext,
    registry: Arc<ProjectRegistry>,
    tree: Arc<TreeProvider>,
    lenses: CodeLensProvider,
    dispatcher: RunDispatcher,
    flusher: Mutex<Option<FlusherHandle>>,
}

impl Workspace {
    /// Build a workspace on the current tokio runtime and start the cache flusher
    pub fn new(host: Arc<dyn Host>, config: Config, runner: Arc<dyn ProcessRunner>) -> Result<Self> {
        Self::with_options(host, config, runner, WorkspaceOptions::default())
    }

    pub fn with_options(
        host: Arc<dyn Host>,
        config: Config,
        runner: Arc<dyn ProcessRunner>,
        options: WorkspaceOptions,
    ) -> Result<Self> {
        let scripts = HelperScripts::from_config(&config)?;
        let ctx = ProjectContext {
            host,
            runner,
            config: Arc::new(config),
            cache: Arc::new(CacheStore::new()),
            policy: EnvPolicy::new(),
            scripts: Arc::new(scripts),
            platform: Platform::current(),
        };
        Ok(Self::from_context(ctx, options))
    }

    pub fn from_context(ctx: ProjectContext, options: WorkspaceOptions) -> Self {
        let registry = Arc::new(ProjectRegistry::new(ctx.clone(), options.init_on_open));
        let tree = Arc::new(TreeProvider::new(
            Arc::clone(&ctx.host),
            Arc::clone(&registry),
            ctx.config.listing_timeout(),
        ));
        let lenses = CodeLensProvider::new(
            Arc::clone(&ctx.host),
            Arc::clone(&registry),
            Arc::clone(&tree),
            ctx.config.enable_code_lens,
        );
        let dispatcher = RunDispatcher::new(
            Arc::clone(&ctx.host),
            Arc::clone(&registry),
            Arc::clone(&tree),
            TerminalLines::new(ctx.platform),
        );
        let flusher = ctx.cache.spawn_flusher(ctx.config.flush_interval());

        Self {
            ctx,
            registry,
            tree,
            lenses,
            dispatcher,
            flusher: Mutex::new(Some(flusher)),
        }
    }

    pub fn context(&self) -> &ProjectContext {
        &self.ctx
    }

    pub fn registry(&self) -> &Arc<ProjectRegistry> {
        &self.registry
    }

    pub fn tree(&self) -> &Arc<TreeProvider> {
        &self.tree
    }

    pub fn lenses(&self) -> &CodeLensProvider {
        &self.lenses
    }

    pub fn dispatcher(&self) -> &RunDispatcher {
        &self.dispatcher
    }

    pub fn policy(&self) -> &EnvPolicy {
        &self.ctx.policy
    }

    /// Register the workspace folders that are QTA projects
    pub fn open_folders(&self, folders: &[PathBuf]) -> Vec<Arc<Project>> {
        folders
            .iter()
            .filter_map(|folder| self.registry.add(folder))
            .collect()
    }

    pub fn folders_changed(&self, added: &[PathBuf], removed: &[PathBuf]) {
        for folder in added {
            self.registry.add(folder);
        }
        for folder in removed {
            self.registry.remove(folder);
        }
    }

    pub fn on_active_editor_changed(&self) {
        if self.ctx.host.active_editor().is_some() {
            self.tree.refresh(None);
        }
    }

    pub fn on_document_saved(&self, path: &Path) {
        tracing::debug!("Saved {}", path.display());
        self.tree.refresh(None);
    }

    pub async fn provide_lenses(&self, document: &Path) -> Vec<CodeLens> {
        self.lenses.provide(document).await
    }

    /// Execute a host command; run commands return the line they sent
    pub async fn execute(&self, command: QtaCommand) -> Result<Option<String>> {
        tracing::debug!("Executing {:?}", command);
        match command {
            QtaCommand::UpdateStatus(text) => {
                tracing::info!("{}", text);
                self.ctx.host.update_status(&text);
                Ok(None)
            }
            QtaCommand::RefreshTree(node) => {
                self.tree.refresh(node.as_ref());
                Ok(None)
            }
            QtaCommand::RefreshLenses => {
                self.lenses.refresh().await;
                Ok(None)
            }
            QtaCommand::Run(target) => self.dispatcher.run(target).await,
            QtaCommand::RunTestcase(node) => self.dispatcher.run_testcase(&node).await,
            QtaCommand::RunTestcaseInline => self.dispatcher.run_testcase_inline().await,
            QtaCommand::OpenFile { path, line } => {
                self.dispatcher.open_file(&path, line).await;
                Ok(None)
            }
        }
    }

    /// Dispose every project, stop the flusher and write out dirty caches
    pub fn shutdown(&self) {
        self.registry.dispose_all();
        if let Some(flusher) = self.flusher.lock().take() {
            flusher.stop();
        }
        let written = self.ctx.cache.flush_all();
        tracing::debug!("Shutdown flushed {} cache file(s)", written);
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("ctx", &self.ctx)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(flusher) = self.flusher.lock().take() {
            flusher.stop();
        }
    }
}
