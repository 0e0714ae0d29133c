use parking_lot::Mutex;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use super::policy::EnvPolicy;
use crate::command::{Invocation, TerminalLines};
use crate::config::{PYTHON_PATH_KEY, ProjectSettings};
use crate::error::{Error, Result};
use crate::host::{PromptChoices, PromptResponse, Terminal, terminal_name};
use crate::parser::InterpreterSource;
use crate::project::ProjectContext;
use crate::types::ACTIVATION_MARKER;
use crate::utils::REQUIREMENTS_FILE;

/// Oldest virtualenv major version that is rejected
const MIN_VIRTUALENV_MAJOR: u32 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvPhase {
    #[default]
    Unchecked,
    NotInEnv,
    InEnv,
    Initializing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementsStatus {
    Satisfied,
    Unsatisfied,
    /// The project has no `requirements.txt`
    Unknown,
}

#[derive(Debug, Default)]
struct EnvState {
    env_path: Option<PathBuf>,
    /// Environment creation has been attempted
    initialized: bool,
    /// The "virtualenv missing" dialog has been shown
    virtualenv_checked: bool,
    phase: EnvPhase,
    /// Outcome of the latest requirements check
    requirements: Option<RequirementsStatus>,
}

#[derive(Debug, Deserialize)]
struct RequirementsReport {
    result: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Virtualenv and dependency management for one project
pub struct EnvironmentResolver {
    root: PathBuf,
    settings: ProjectSettings,
    lines: TerminalLines,
    ctx: ProjectContext,
    terminal: Arc<dyn Terminal>,
    state: Mutex<EnvState>,
}

impl EnvironmentResolver {
    /// Create the resolver and its terminal, seeding `PYTHONPATH` with the root
    pub fn new(root: impl Into<PathBuf>, ctx: ProjectContext) -> Self {
        let root = root.into();
        let lines = TerminalLines::new(ctx.platform);
        let terminal = ctx.host.create_terminal(&terminal_name(&root), &root);
        terminal.send_text(&lines.export_pythonpath(&root));

        Self {
            settings: ProjectSettings::new(&root),
            root,
            lines,
            ctx,
            terminal,
            state: Mutex::new(EnvState::default()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    pub fn terminal(&self) -> Arc<dyn Terminal> {
        Arc::clone(&self.terminal)
    }

    pub fn phase(&self) -> EnvPhase {
        self.state.lock().phase
    }

    pub fn env_path(&self) -> Option<PathBuf> {
        self.state.lock().env_path.clone()
    }

    /// Result of the most recent `check_requirements`, if one ran
    pub fn last_requirements(&self) -> Option<RequirementsStatus> {
        self.state.lock().requirements
    }

    fn set_phase(&self, phase: EnvPhase) {
        self.state.lock().phase = phase;
    }

    fn project_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    /// Interpreter from the project settings, else the configured default
    pub fn python_path(&self) -> PathBuf {
        if let Some(path) = self.settings.python_path() {
            return path;
        }
        match &self.ctx.config.python {
            Some(python) => PathBuf::from(python),
            None => PathBuf::from(self.ctx.platform.default_python()),
        }
    }

    pub fn pip_source(&self) -> Option<String> {
        self.settings
            .get_str(crate::config::PIP_SOURCE_KEY)
            .or_else(|| self.ctx.config.pip_source.clone())
    }

    /// Whether the interpreter sits inside a virtualenv
    pub fn is_in_env(&self) -> bool {
        self.python_path()
            .parent()
            .is_some_and(|dir| dir.join(ACTIVATION_MARKER).is_file())
    }

    /// Sorted names of the root's subdirectories that are virtualenvs
    pub fn find_virtual_envs(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot list {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        let mut envs: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .filter(|entry| self.ctx.platform.activation_marker(&entry.path()).is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        envs.sort();
        envs
    }

    /// Make sure a virtualenv is active and the requirements are installed
    pub async fn ensure_env(&self) -> Result<()> {
        if self.ctx.policy.is_suppressed() {
            return Ok(());
        }

        if self.is_in_env() {
            self.set_phase(EnvPhase::InEnv);
        } else {
            let switched = self.switch_env().await?;
            if !switched {
                self.set_phase(EnvPhase::NotInEnv);
                return Ok(());
            }
            self.state.lock().initialized = true;
        }

        if self.check_requirements().await == RequirementsStatus::Unsatisfied {
            let answer = self
                .ctx
                .host
                .prompt(
                    "The current environment does not match requirements.txt. Install the requirements?",
                    PromptChoices::YesNoSuppress,
                )
                .await;
            match answer {
                PromptResponse::Yes => self.install_requirements(),
                PromptResponse::Suppress => self.ctx.policy.suppress(),
                PromptResponse::No | PromptResponse::Dismissed => {}
            }
        }
        Ok(())
    }

    /// Offer to switch to an existing virtualenv, or to create one.
    ///
    /// Returns whether an environment was adopted or created.
    pub async fn switch_env(&self) -> Result<bool> {
        let envs = self.find_virtual_envs();
        let name = self.project_name();

        let message = if envs.is_empty() {
            format!("No virtual environment found in project {name}. Create one and switch to it?")
        } else {
            format!("Found a virtual environment in project {name}. Switch to it?")
        };

        match self
            .ctx
            .host
            .prompt(&message, PromptChoices::YesNoSuppress)
            .await
        {
            PromptResponse::Yes => {}
            PromptResponse::Suppress => {
                self.ctx.policy.suppress();
                return Ok(false);
            }
            PromptResponse::No | PromptResponse::Dismissed => return Ok(false),
        }

        match envs.as_slice() {
            [] => self.init_virtual_env().await,
            [only] => {
                self.adopt(only)?;
                Ok(true)
            }
            _ => {
                let picked = self
                    .ctx
                    .host
                    .pick(
                        "Several virtual environments found. Choose the one the terminal should use (Esc to cancel)",
                        &envs,
                    )
                    .await;
                match picked {
                    Some(env) if envs.contains(&env) => {
                        self.adopt(&env)?;
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            }
        }
    }

    /// Point the project settings at the virtualenv `name` and activate it
    pub fn adopt(&self, name: &str) -> Result<()> {
        let env_path = self.root.join(name);
        self.write_python_path(&env_path)?;
        {
            let mut state = self.state.lock();
            state.env_path = Some(env_path);
            state.phase = EnvPhase::InEnv;
        }
        tracing::info!("Switched {} to virtualenv {}", self.root.display(), name);
        self.activate_env();
        Ok(())
    }

    fn write_python_path(&self, env_path: &Path) -> Result<()> {
        let python = self.ctx.platform.env_python(env_path);
        self.settings.set(
            PYTHON_PATH_KEY,
            Value::String(python.to_string_lossy().into_owned()),
        )
    }

    /// Create a new virtualenv inside the project, at most once
    pub async fn init_virtual_env(&self) -> Result<bool> {
        if self.state.lock().initialized {
            return Ok(false);
        }

        let root = self.root.clone();
        let validate = move |value: &str| -> Option<String> {
            if value.trim().is_empty() {
                return Some("Enter a folder name".to_string());
            }
            if root.join(value).exists() {
                return Some(format!("A file or folder named {value} already exists"));
            }
            None
        };
        let Some(folder) = self
            .ctx
            .host
            .input(
                "Virtual environment folder:",
                &self.ctx.config.env_dir_name,
                &validate,
            )
            .await
        else {
            return Ok(false);
        };

        {
            let mut state = self.state.lock();
            state.initialized = true;
            state.phase = EnvPhase::Initializing;
        }

        self.ctx.host.select_interpreter().await;
        if let Err(e) = self.check_virtualenv().await {
            self.set_phase(EnvPhase::NotInEnv);
            return Err(e);
        }

        let python = self.python_path();
        let env_path = self.root.join(folder.trim());
        self.terminal
            .send_text(&self.lines.create_virtualenv(&python, &env_path));
        if let Err(e) = self.write_python_path(&env_path) {
            let message = format!("Create env dir failed: {e}");
            self.ctx.host.show_error(&message);
            self.set_phase(EnvPhase::NotInEnv);
            return Err(Error::EnvironmentError(message));
        }

        {
            let mut state = self.state.lock();
            state.env_path = Some(env_path);
            state.phase = EnvPhase::InEnv;
        }
        // The settings watcher may not fire before the env exists
        self.activate_env();
        Ok(true)
    }

    /// Verify `python -m virtualenv` is present and newer than version 13
    pub async fn check_virtualenv(&self) -> Result<()> {
        let invocation = Invocation::python(&self.python_path()).args(["-m", "virtualenv", "--version"]);
        let command = invocation.to_shell_command();

        let failure = match self.ctx.runner.run(&invocation).await {
            Ok(output) if output.success() => {
                let stdout = output.stdout_text();
                match parse_virtualenv_major(&stdout) {
                    Some(major) if major > MIN_VIRTUALENV_MAJOR => {
                        self.state.lock().virtualenv_checked = true;
                        self.status("Check virtualenv status ok");
                        return Ok(());
                    }
                    _ => {
                        let message = "The installed virtualenv is too old. Upgrade it (python -m pip install -U virtualenv) and create the environment again.";
                        self.ctx.host.show_error(message);
                        return Err(Error::tool(command, format!("unsupported version: {}", stdout.trim())));
                    }
                }
            }
            Ok(output) => output.stderr_text(),
            Err(e) => e.to_string(),
        };

        self.status(&format!("virtualenv not installed: {}", failure.trim()));
        let first_time = {
            let mut state = self.state.lock();
            !std::mem::replace(&mut state.virtualenv_checked, true)
        };
        if first_time {
            self.ctx.host.show_error(
                "virtualenv is not installed for the selected interpreter. Install it (python -m pip install virtualenv) and create the environment again.",
            );
        }
        Err(Error::tool(command, failure.trim().to_string()))
    }

    /// Ask the interpreter whether `requirements.txt` is satisfied
    pub async fn check_requirements(&self) -> RequirementsStatus {
        let status = self.query_requirements().await;
        self.state.lock().requirements = Some(status);
        status
    }

    async fn query_requirements(&self) -> RequirementsStatus {
        let requirements = self.root.join(REQUIREMENTS_FILE);
        if !requirements.is_file() {
            return RequirementsStatus::Unknown;
        }

        let invocation = Invocation::python(&self.python_path())
            .path_arg(self.ctx.scripts.parse_requirements())
            .path_arg(&requirements)
            .with_working_dir(&self.root);

        let output = match self.ctx.runner.run(&invocation).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("Requirements check failed: {}", e);
                return RequirementsStatus::Unsatisfied;
            }
        };

        let stdout = output.stdout_text();
        match serde_json::from_str::<RequirementsReport>(stdout.trim()) {
            Ok(RequirementsReport { result: true, .. }) => RequirementsStatus::Satisfied,
            Ok(RequirementsReport { error, .. }) => {
                tracing::info!(
                    "Requirements of {} not satisfied: {}",
                    self.root.display(),
                    error.unwrap_or_default()
                );
                RequirementsStatus::Unsatisfied
            }
            Err(e) => {
                tracing::warn!(
                    "Unreadable requirements check output ({}): {}",
                    e,
                    output.stderr_text().trim()
                );
                RequirementsStatus::Unsatisfied
            }
        }
    }

    pub fn install_requirements(&self) {
        let requirements = self.root.join(REQUIREMENTS_FILE);
        if !requirements.is_file() {
            return;
        }
        let source = self.pip_source();
        self.terminal.send_text(&self.lines.pip_install(
            &self.python_path(),
            &requirements,
            source.as_deref(),
        ));
    }

    pub fn activate_env(&self) {
        if let Some(env_path) = self.env_path() {
            self.terminal.send_text(&self.lines.activate(&env_path));
        }
    }

    /// Leave the current virtualenv, if it is one
    pub fn deactivate_env(&self) {
        let mut state = self.state.lock();
        if let Some(env_path) = state.env_path.take() {
            if self.ctx.platform.activation_marker(&env_path).is_file() {
                self.terminal.send_text(&self.lines.deactivate());
            }
        }
        state.phase = EnvPhase::NotInEnv;
    }

    pub fn set_sys_path(&self) {
        let python = self.python_path();
        let dir = python.parent().unwrap_or(Path::new(""));
        self.terminal.send_text(&self.lines.prepend_path(dir));
    }

    /// React to an edited `settings.json`
    pub fn on_settings_changed(&self) {
        let python = self.python_path();
        let configured = python.parent().and_then(Path::parent);
        {
            let state = self.state.lock();
            // Our own write from `adopt` or `init_virtual_env` already activated it
            if state.phase == EnvPhase::InEnv && state.env_path.as_deref() == configured {
                tracing::debug!("Settings of {} still point at the active env", self.root.display());
                return;
            }
        }

        let env_dir = python
            .parent()
            .filter(|dir| dir.join(ACTIVATION_MARKER).is_file())
            .and_then(Path::parent)
            .map(Path::to_path_buf);

        match env_dir {
            Some(env_path) => {
                {
                    let mut state = self.state.lock();
                    state.env_path = Some(env_path);
                    state.phase = EnvPhase::InEnv;
                }
                self.activate_env();
            }
            None => {
                self.deactivate_env();
                self.set_sys_path();
            }
        }
    }

    /// Offer to reinstall after `requirements.txt` changed
    pub async fn on_requirements_changed(&self) {
        let answer = self
            .ctx
            .host
            .prompt(
                "requirements.txt changed. Reinstall the requirements?",
                PromptChoices::YesNo,
            )
            .await;
        if answer == PromptResponse::Yes {
            self.install_requirements();
        }
    }

    fn status(&self, text: &str) {
        tracing::info!("{}", text);
        self.ctx.host.update_status(text);
    }
}

impl InterpreterSource for EnvironmentResolver {
    fn python_path(&self) -> PathBuf {
        EnvironmentResolver::python_path(self)
    }
}

impl std::fmt::Debug for EnvironmentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentResolver")
            .field("root", &self.root)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

/// Major version from `virtualenv --version` output such as
/// `virtualenv 20.24.5 from /usr/lib/...` or `16.7.9`
pub fn parse_virtualenv_major(output: &str) -> Option<u32> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| Regex::new(r"\d+").expect("valid number pattern"));
    re.find(output)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ProcessOutput;
    use crate::testing::{HostEvent, ProjectFixture, RecordingHost, ScriptedRunner};
    use crate::types::Platform;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        project: ProjectFixture,
        host: Arc<RecordingHost>,
        runner: Arc<ScriptedRunner>,
        ctx: ProjectContext,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let project = ProjectFixture::create(temp.path().join("proj")).unwrap();
        let host = Arc::new(RecordingHost::new());
        let runner = Arc::new(ScriptedRunner::new());
        let ctx = ProjectContext::for_tests(host.clone(), runner.clone(), Platform::Unix);
        Fixture {
            _temp: temp,
            project,
            host,
            runner,
            ctx,
        }
    }

    impl Fixture {
        fn resolver(&self) -> EnvironmentResolver {
            EnvironmentResolver::new(self.project.root(), self.ctx.clone())
        }

        fn lines(&self) -> Vec<String> {
            self.host
                .terminal_lines(&terminal_name(self.project.root()))
        }
    }

    #[test]
    fn test_parse_virtualenv_major() {
        assert_eq!(parse_virtualenv_major("16.7.9\n"), Some(16));
        assert_eq!(
            parse_virtualenv_major("virtualenv 20.24.5 from /usr/lib/python3/virtualenv"),
            Some(20)
        );
        assert_eq!(parse_virtualenv_major("no version"), None);
    }

    #[test]
    fn test_construction_exports_pythonpath() {
        let f = fixture();
        let _resolver = f.resolver();
        assert_eq!(
            f.lines(),
            vec![format!("export PYTHONPATH={}", f.project.root().display())]
        );
    }

    #[test]
    fn test_python_path_defaults_and_settings() {
        let f = fixture();
        let resolver = f.resolver();
        assert_eq!(resolver.python_path(), PathBuf::from("python"));
        assert!(!resolver.is_in_env());

        resolver
            .settings()
            .set(PYTHON_PATH_KEY, Value::String("${workspaceFolder}/venv/bin/python".into()))
            .unwrap();
        assert_eq!(
            resolver.python_path(),
            f.project.root().join("venv").join("bin").join("python")
        );
    }

    #[test]
    fn test_find_virtual_envs_sorted() {
        let f = fixture();
        let project = ProjectFixture::create(f.project.root()).unwrap()
            .with_virtualenv("zenv", Platform::Unix)
            .unwrap()
            .with_virtualenv("aenv", Platform::Unix)
            .unwrap();
        std::fs::create_dir_all(project.root().join("not_an_env")).unwrap();

        assert_eq!(f.resolver().find_virtual_envs(), vec!["aenv", "zenv"]);
    }

    #[tokio::test]
    async fn test_ensure_env_is_noop_when_suppressed() {
        let f = fixture();
        f.ctx.policy.suppress();
        f.resolver().ensure_env().await.unwrap();
        assert!(f.host.prompts().is_empty());
        assert!(f.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_suppress_answer_sets_policy() {
        let f = fixture();
        f.host.answer_prompt(PromptResponse::Suppress);
        let resolver = f.resolver();
        resolver.ensure_env().await.unwrap();

        assert!(f.ctx.policy.is_suppressed());
        assert_eq!(f.host.prompts().len(), 1);
        resolver.ensure_env().await.unwrap();
        assert_eq!(f.host.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_single_env_is_adopted_and_activated() {
        let f = fixture();
        ProjectFixture::create(f.project.root())
            .unwrap()
            .with_virtualenv(".env", Platform::Unix)
            .unwrap();
        f.host.answer_prompt(PromptResponse::Yes);

        let resolver = f.resolver();
        resolver.ensure_env().await.unwrap();

        let env = f.project.root().join(".env");
        assert_eq!(resolver.python_path(), env.join("bin").join("python"));
        assert!(resolver.is_in_env());
        assert_eq!(resolver.phase(), EnvPhase::InEnv);
        assert_eq!(
            f.lines().last().unwrap(),
            &format!("source {};", env.join("bin").join("activate").display())
        );
        // No requirements.txt, so no install prompt
        assert_eq!(f.host.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_adopt_merges_settings() {
        let f = fixture();
        let project = ProjectFixture::create(f.project.root())
            .unwrap()
            .with_settings(r#"{"editor.tabSize": 2}"#)
            .unwrap();
        f.resolver().adopt("venv").unwrap();

        let settings = ProjectSettings::new(project.root()).read().unwrap();
        assert_eq!(settings["editor.tabSize"], 2);
        assert!(settings[PYTHON_PATH_KEY].as_str().unwrap().ends_with("venv/bin/python"));
    }

    #[tokio::test]
    async fn test_several_envs_use_picker() {
        let f = fixture();
        ProjectFixture::create(f.project.root())
            .unwrap()
            .with_virtualenv("a", Platform::Unix)
            .unwrap()
            .with_virtualenv("b", Platform::Unix)
            .unwrap();
        f.host.answer_prompt(PromptResponse::Yes);
        f.host.answer_pick(Some("b"));

        let resolver = f.resolver();
        assert!(resolver.switch_env().await.unwrap());
        assert_eq!(resolver.env_path(), Some(f.project.root().join("b")));
        assert!(f
            .host
            .events()
            .contains(&HostEvent::Pick(vec!["a".to_string(), "b".to_string()])));
    }

    #[tokio::test]
    async fn test_init_virtual_env_creates_and_activates() {
        let f = fixture();
        f.runner
            .respond("virtualenv --version", ProcessOutput::ok("virtualenv 20.1.0 from /x\n"));
        f.host.answer_input(Some("venv"));

        let resolver = f.resolver();
        assert!(resolver.init_virtual_env().await.unwrap());

        let lines = f.lines();
        let env = f.project.root().join("venv");
        assert_eq!(
            lines[1],
            format!("\"python\" -m virtualenv \"{}\" --python=python", env.display())
        );
        assert_eq!(
            lines[2],
            format!("source {};", env.join("bin").join("activate").display())
        );
        assert!(f.host.events().contains(&HostEvent::InterpreterSelection));

        // Guarded: a second attempt does nothing
        assert!(!resolver.init_virtual_env().await.unwrap());
        assert_eq!(f.runner.call_count("virtualenv --version"), 1);
    }

    #[tokio::test]
    async fn test_init_virtual_env_rejects_existing_folder() {
        let f = fixture();
        f.host.answer_input(Some("manage.py"));
        assert!(!f.resolver().init_virtual_env().await.unwrap());
        assert_eq!(f.host.errors().len(), 1);
        assert!(f.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_old_virtualenv_aborts() {
        let f = fixture();
        f.runner
            .respond("virtualenv --version", ProcessOutput::ok("13.1.2\n"));
        f.host.answer_input(Some("venv"));

        let resolver = f.resolver();
        assert!(resolver.init_virtual_env().await.is_err());
        assert_eq!(f.host.errors().len(), 1);
        assert_eq!(f.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_virtualenv_dialog_once() {
        let f = fixture();
        f.runner
            .respond("virtualenv --version", ProcessOutput::failed(1, "No module named virtualenv"));
        let resolver = f.resolver();

        assert!(resolver.check_virtualenv().await.is_err());
        assert!(resolver.check_virtualenv().await.is_err());
        assert_eq!(f.host.errors().len(), 1);
        assert_eq!(f.host.statuses().len(), 2);
    }

    #[tokio::test]
    async fn test_check_requirements_states() {
        let f = fixture();
        let resolver = f.resolver();
        assert_eq!(resolver.check_requirements().await, RequirementsStatus::Unknown);

        f.project.file(REQUIREMENTS_FILE, "requests\n").unwrap();
        f.runner
            .respond("parse_requirements.py", ProcessOutput::ok(r#"{"result": true}"#));
        assert_eq!(resolver.check_requirements().await, RequirementsStatus::Satisfied);

        f.runner.respond(
            "parse_requirements.py",
            ProcessOutput::ok(r#"{"result": false, "error": "requests not found"}"#),
        );
        assert_eq!(resolver.check_requirements().await, RequirementsStatus::Unsatisfied);

        f.runner.fail_spawn("parse_requirements.py", "no python");
        assert_eq!(resolver.check_requirements().await, RequirementsStatus::Unsatisfied);
    }

    #[tokio::test]
    async fn test_unsatisfied_requirements_prompt_install() {
        let f = fixture();
        ProjectFixture::create(f.project.root())
            .unwrap()
            .with_virtualenv(".env", Platform::Unix)
            .unwrap()
            .with_requirements("requests\n")
            .unwrap()
            .with_settings(r#"{"python.pythonPath": ".env/bin/python", "qta.pipSource": "http://mirror.local:8080/simple"}"#)
            .unwrap();
        f.runner
            .respond("parse_requirements.py", ProcessOutput::ok(r#"{"result": false}"#));
        f.host.answer_prompt(PromptResponse::Yes);

        let resolver = f.resolver();
        resolver.ensure_env().await.unwrap();

        let python = f.project.root().join(".env").join("bin").join("python");
        let requirements = f.project.root().join(REQUIREMENTS_FILE);
        assert_eq!(
            f.lines().last().unwrap(),
            &format!(
                "{} -m pip install -r {} -i http://mirror.local:8080/simple --trusted-host mirror.local:8080",
                python.display(),
                requirements.display()
            )
        );
    }

    #[tokio::test]
    async fn test_settings_change_switches_terminal() {
        let f = fixture();
        ProjectFixture::create(f.project.root())
            .unwrap()
            .with_virtualenv("venv", Platform::Unix)
            .unwrap()
            .with_settings(r#"{"python.pythonPath": "venv/bin/python"}"#)
            .unwrap();
        let resolver = f.resolver();

        resolver.on_settings_changed();
        let venv = f.project.root().join("venv");
        assert_eq!(resolver.env_path(), Some(venv.clone()));

        resolver
            .settings()
            .set(PYTHON_PATH_KEY, Value::String("/usr/bin/python3".into()))
            .unwrap();
        resolver.on_settings_changed();

        let lines = f.lines();
        let n = lines.len();
        assert_eq!(lines[n - 2], "deactivate");
        assert_eq!(lines[n - 1], "export PATH=/usr/bin:$PATH");
        assert_eq!(resolver.env_path(), None);
    }

    #[tokio::test]
    async fn test_requirements_change_prompt_ignores_suppress() {
        let f = fixture();
        f.project.file(REQUIREMENTS_FILE, "requests\n").unwrap();
        f.ctx.policy.suppress();
        f.host.answer_prompt(PromptResponse::Yes);

        let resolver = f.resolver();
        resolver.on_requirements_changed().await;
        assert_eq!(f.host.prompts().len(), 1);
        assert!(f.lines().last().unwrap().contains("-m pip install -r"));
    }

    #[tokio::test]
    async fn test_adopt_then_settings_event_activates_once() {
        let f = fixture();
        ProjectFixture::create(f.project.root())
            .unwrap()
            .with_virtualenv("venv", Platform::Unix)
            .unwrap();
        let resolver = f.resolver();

        resolver.adopt("venv").unwrap();
        // The watcher reports the settings write made by `adopt`
        resolver.on_settings_changed();

        let activate = format!(
            "source {};",
            f.project.root().join("venv").join("bin").join("activate").display()
        );
        let lines = f.lines();
        assert_eq!(lines.iter().filter(|line| **line == activate).count(), 1);
        assert!(!lines.contains(&"deactivate".to_string()));
        assert_eq!(resolver.phase(), EnvPhase::InEnv);
    }

    #[tokio::test]
    async fn test_settings_event_during_env_creation_keeps_env() {
        let f = fixture();
        f.runner
            .respond("virtualenv --version", ProcessOutput::ok("virtualenv 20.1.0 from /x\n"));
        f.host.answer_input(Some("venv"));
        let resolver = f.resolver();
        assert!(resolver.init_virtual_env().await.unwrap());

        // The terminal has not created the env yet, so there is no activation script
        resolver.on_settings_changed();

        assert_eq!(resolver.env_path(), Some(f.project.root().join("venv")));
        assert_eq!(f.lines().len(), 3);
    }

    #[tokio::test]
    async fn test_ensure_env_records_requirements_status() {
        let f = fixture();
        ProjectFixture::create(f.project.root())
            .unwrap()
            .with_virtualenv(".env", Platform::Unix)
            .unwrap()
            .with_requirements("requests\n")
            .unwrap()
            .with_settings(r#"{"python.pythonPath": ".env/bin/python"}"#)
            .unwrap();
        f.runner
            .respond("parse_requirements.py", ProcessOutput::ok(r#"{"result": true}"#));

        let resolver = f.resolver();
        assert_eq!(resolver.last_requirements(), None);
        resolver.ensure_env().await.unwrap();

        assert_eq!(resolver.last_requirements(), Some(RequirementsStatus::Satisfied));
        assert_eq!(f.runner.call_count("parse_requirements.py"), 1);
    }

    #[tokio::test]
    async fn test_missing_requirements_file_is_recorded() {
        let f = fixture();
        let resolver = f.resolver();
        assert_eq!(resolver.check_requirements().await, RequirementsStatus::Unknown);
        assert_eq!(resolver.last_requirements(), Some(RequirementsStatus::Unknown));
        assert!(f.runner.calls().is_empty());
    }
}
