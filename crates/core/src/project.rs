//! A QTA project: one root with its environment, parser and terminal

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::cache::CacheStore;
use crate::command::ProcessRunner;
use crate::config::Config;
use crate::env::{DEFAULT_DEBOUNCE, EnvPolicy, EnvironmentResolver, ProjectEvent, ProjectWatcher};
use crate::error::Result;
use crate::host::{Host, Terminal};
use crate::parser::{HelperScripts, PythonParser};
use crate::types::{ClassInfo, FunctionInfo, ParsedDocument, Platform};
use crate::utils::{has_requirements, is_python_project};

/// Services shared by every project of a workspace
#[derive(Clone)]
pub struct ProjectContext {
    pub host: Arc<dyn Host>,
    pub runner: Arc<dyn ProcessRunner>,
    pub config: Arc<Config>,
    pub cache: Arc<CacheStore>,
    pub policy: EnvPolicy,
    pub scripts: Arc<HelperScripts>,
    pub platform: Platform,
}

impl ProjectContext {
    /// Context with default config, fresh cache and policy, and fixed script paths
    #[cfg(any(test, feature = "testing"))]
    pub fn for_tests(host: Arc<dyn Host>, runner: Arc<dyn ProcessRunner>, platform: Platform) -> Self {
        Self {
            host,
            runner,
            config: Arc::new(Config::default()),
            cache: Arc::new(CacheStore::new()),
            policy: EnvPolicy::new(),
            scripts: Arc::new(HelperScripts::new(
                "/scripts/parse_file.py",
                "/scripts/parse_requirements.py",
            )),
            platform,
        }
    }
}

impl std::fmt::Debug for ProjectContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectContext")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .field("scripts", &self.scripts)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    env: Arc<EnvironmentResolver>,
    parser: PythonParser,
    ctx: ProjectContext,
    watcher: Mutex<Option<(ProjectWatcher, JoinHandle<()>)>>,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>, ctx: ProjectContext) -> Self {
        let root = root.into();
        let env = Arc::new(EnvironmentResolver::new(&root, ctx.clone()));
        let parser = PythonParser::new(
            env.clone(),
            ctx.scripts.parse_file(),
            Arc::clone(&ctx.runner),
            Arc::clone(&ctx.cache),
            Arc::clone(&ctx.host),
        );
        tracing::info!("Opened QTA project {}", root.display());

        Self {
            root,
            env,
            parser,
            ctx,
            watcher: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn env(&self) -> &EnvironmentResolver {
        &self.env
    }

    pub fn parser(&self) -> &PythonParser {
        &self.parser
    }

    pub fn terminal(&self) -> Arc<dyn Terminal> {
        self.env.terminal()
    }

    pub fn python_path(&self) -> PathBuf {
        self.env.python_path()
    }

    /// Start watching and check the environment.
    ///
    /// Only projects with Python sources and a `requirements.txt` are managed.
    pub async fn init(&self) -> Result<()> {
        if !is_python_project(&self.root) || !has_requirements(&self.root) {
            tracing::debug!("{} needs no environment management", self.root.display());
            return Ok(());
        }
        self.start_watching();
        self.env.ensure_env().await
    }

    /// Watch `requirements.txt` and `.vscode/settings.json`; no-op if already watching
    pub fn start_watching(&self) {
        let mut slot = self.watcher.lock();
        if slot.is_some() {
            return;
        }

        let (watcher, mut events) = match ProjectWatcher::start(&self.root, DEFAULT_DEBOUNCE) {
            Ok(started) => started,
            Err(e) => {
                tracing::warn!("Cannot watch {}: {}", self.root.display(), e);
                return;
            }
        };

        let env = Arc::clone(&self.env);
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                tracing::debug!("{:?} in {}", event, env.root().display());
                match event {
                    ProjectEvent::RequirementsChanged => env.on_requirements_changed().await,
                    ProjectEvent::SettingsChanged => env.on_settings_changed(),
                }
            }
        });
        *slot = Some((watcher, task));
    }

    pub fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .as_ref()
            .is_some_and(|(watcher, _)| watcher.is_active())
    }

    pub async fn ensure_env(&self) -> Result<()> {
        self.env.ensure_env().await
    }

    pub async fn init_virtual_env(&self) -> Result<bool> {
        self.env.init_virtual_env().await
    }

    pub fn install_requirements(&self) {
        self.env.install_requirements();
    }

    /// Write the default `.vscode/settings.json`; returns whether it was written
    pub fn update_settings(&self, force: bool) -> Result<bool> {
        self.env
            .settings()
            .write_defaults(&self.ctx.config.env_dir_name, force)
    }

    pub async fn parse(&self, file: &Path) -> Option<ParsedDocument> {
        self.parser.parse(file).await
    }

    pub async fn class_list(&self, file: &Path) -> Vec<ClassInfo> {
        self.parser.class_list(file).await
    }

    pub async fn function_list(&self, file: &Path, class: Option<&str>) -> Vec<FunctionInfo> {
        self.parser.function_list(file, class).await
    }

    pub async fn docstring(&self, file: &Path, item: Option<&str>) -> Option<String> {
        self.parser.docstring(file, item).await
    }

    /// Stop watchers, persist the project's cache and close its terminal
    pub fn dispose(&self) {
        if let Some((watcher, task)) = self.watcher.lock().take() {
            watcher.stop();
            task.abort();
        }
        self.ctx.cache.evict(&self.root);
        self.terminal().close();
        tracing::info!("Closed QTA project {}", self.root.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::terminal_name;
    use crate::testing::{ProjectFixture, RecordingHost, ScriptedRunner};
    use tempfile::TempDir;

    fn context(host: &Arc<RecordingHost>) -> ProjectContext {
        ProjectContext::for_tests(host.clone(), Arc::new(ScriptedRunner::new()), Platform::Unix)
    }

    #[test]
    fn test_update_settings_respects_force() {
        let temp = TempDir::new().unwrap();
        let fixture = ProjectFixture::create(temp.path().join("p")).unwrap();
        let host = Arc::new(RecordingHost::new());
        let project = Project::new(fixture.root(), context(&host));

        assert!(project.update_settings(false).unwrap());
        let settings = project.env().settings().read().unwrap();
        assert_eq!(settings["files.exclude"]["**/.env"], true);

        assert!(!project.update_settings(false).unwrap());
        assert!(project.update_settings(true).unwrap());
    }

    #[tokio::test]
    async fn test_init_skips_projects_without_requirements() {
        let temp = TempDir::new().unwrap();
        let fixture = ProjectFixture::create(temp.path().join("p")).unwrap();
        let host = Arc::new(RecordingHost::new());
        let project = Project::new(fixture.root(), context(&host));

        project.init().await.unwrap();
        assert!(!project.is_watching());
        assert!(host.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_init_watches_and_ensures_env() {
        let temp = TempDir::new().unwrap();
        let fixture = ProjectFixture::create(temp.path().join("p"))
            .unwrap()
            .with_requirements("requests\n")
            .unwrap();
        let host = Arc::new(RecordingHost::new());
        let project = Project::new(fixture.root(), context(&host));

        project.init().await.unwrap();
        assert!(project.is_watching());
        // No virtualenv: offered to create one, dismissed
        assert_eq!(host.prompts().len(), 1);

        project.dispose();
        assert!(!project.is_watching());
        let terminal = host.terminal(&terminal_name(fixture.root())).unwrap();
        assert!(terminal.is_closed());
    }
}
