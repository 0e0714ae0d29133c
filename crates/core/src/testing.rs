//! In-memory fakes for the host and the process runner.
//!
//! Enabled for unit tests and, through the `testing` feature, for the
//! integration test package.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::command::{Invocation, ProcessOutput, ProcessRunner};
use crate::error::{Error, Result};
use crate::host::{EditorState, Host, InputValidator, PromptChoices, PromptResponse, Terminal};
use crate::tree::TreeNode;

/// Everything the core asked the host to do, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Prompt(String),
    Pick(Vec<String>),
    Input(String),
    Error(String),
    Info(String),
    Status(String),
    Saved(PathBuf),
    Opened(PathBuf, Option<u32>),
    TreeChanged(Option<String>),
    LensesChanged,
    InterpreterSelection,
}

#[derive(Debug)]
pub struct RecordingTerminal {
    name: String,
    cwd: PathBuf,
    lines: Mutex<Vec<String>>,
    shown: Mutex<usize>,
    closed: Mutex<bool>,
}

impl RecordingTerminal {
    fn new(name: &str, cwd: &Path) -> Self {
        Self {
            name: name.to_string(),
            cwd: cwd.to_path_buf(),
            lines: Mutex::new(Vec::new()),
            shown: Mutex::new(0),
            closed: Mutex::new(false),
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn shown(&self) -> usize {
        *self.shown.lock()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

impl Terminal for RecordingTerminal {
    fn name(&self) -> &str {
        &self.name
    }

    fn show(&self) {
        *self.shown.lock() += 1;
    }

    fn send_text(&self, text: &str) {
        self.lines.lock().push(text.to_string());
    }

    fn close(&self) {
        *self.closed.lock() = true;
    }
}

/// Host that answers from queues and records every call.
///
/// An empty prompt queue answers `Dismissed`; empty pick and input queues
/// answer `None`.
#[derive(Debug, Default)]
pub struct RecordingHost {
    prompts: Mutex<VecDeque<PromptResponse>>,
    picks: Mutex<VecDeque<Option<String>>>,
    inputs: Mutex<VecDeque<Option<String>>>,
    events: Mutex<Vec<HostEvent>>,
    editor: Mutex<Option<EditorState>>,
    dirty: Mutex<HashSet<PathBuf>>,
    terminals: Mutex<HashMap<String, Arc<RecordingTerminal>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer_prompt(&self, response: PromptResponse) -> &Self {
        self.prompts.lock().push_back(response);
        self
    }

    pub fn answer_pick(&self, item: Option<&str>) -> &Self {
        self.picks.lock().push_back(item.map(str::to_string));
        self
    }

    pub fn answer_input(&self, value: Option<&str>) -> &Self {
        self.inputs.lock().push_back(value.map(str::to_string));
        self
    }

    pub fn set_active_editor(&self, path: impl Into<PathBuf>, cursor_line: u32) {
        *self.editor.lock() = Some(EditorState {
            path: path.into(),
            cursor_line,
        });
    }

    pub fn clear_active_editor(&self) {
        *self.editor.lock() = None;
    }

    pub fn mark_dirty(&self, path: impl Into<PathBuf>) {
        self.dirty.lock().insert(path.into());
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.filter_events(|e| match e {
            HostEvent::Prompt(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn errors(&self) -> Vec<String> {
        self.filter_events(|e| match e {
            HostEvent::Error(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn infos(&self) -> Vec<String> {
        self.filter_events(|e| match e {
            HostEvent::Info(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn statuses(&self) -> Vec<String> {
        self.filter_events(|e| match e {
            HostEvent::Status(m) => Some(m.clone()),
            _ => None,
        })
    }

    fn filter_events<T>(&self, f: impl Fn(&HostEvent) -> Option<T>) -> Vec<T> {
        self.events.lock().iter().filter_map(f).collect()
    }

    pub fn terminal(&self, name: &str) -> Option<Arc<RecordingTerminal>> {
        self.terminals.lock().get(name).cloned()
    }

    /// Lines sent to the terminal called `name`, empty if it was never created
    pub fn terminal_lines(&self, name: &str) -> Vec<String> {
        self.terminal(name).map(|t| t.lines()).unwrap_or_default()
    }

    fn record(&self, event: HostEvent) {
        self.events.lock().push(event);
    }
}

#[async_trait]
impl Host for RecordingHost {
    async fn prompt(&self, message: &str, _choices: PromptChoices) -> PromptResponse {
        self.record(HostEvent::Prompt(message.to_string()));
        self.prompts
            .lock()
            .pop_front()
            .unwrap_or(PromptResponse::Dismissed)
    }

    async fn pick(&self, _placeholder: &str, items: &[String]) -> Option<String> {
        self.record(HostEvent::Pick(items.to_vec()));
        self.picks.lock().pop_front().flatten()
    }

    async fn input(
        &self,
        prompt: &str,
        _default: &str,
        validate: InputValidator<'_>,
    ) -> Option<String> {
        self.record(HostEvent::Input(prompt.to_string()));
        let value = self.inputs.lock().pop_front().flatten()?;
        match validate(&value) {
            Some(message) => {
                self.record(HostEvent::Error(message));
                None
            }
            None => Some(value),
        }
    }

    async fn select_interpreter(&self) {
        self.record(HostEvent::InterpreterSelection);
    }

    fn show_error(&self, message: &str) {
        self.record(HostEvent::Error(message.to_string()));
    }

    fn show_info(&self, message: &str) {
        self.record(HostEvent::Info(message.to_string()));
    }

    fn update_status(&self, text: &str) {
        self.record(HostEvent::Status(text.to_string()));
    }

    fn active_editor(&self) -> Option<EditorState> {
        self.editor.lock().clone()
    }

    fn is_dirty(&self, path: &Path) -> bool {
        self.dirty.lock().contains(path)
    }

    async fn save_document(&self, path: &Path) -> bool {
        self.dirty.lock().remove(path);
        self.record(HostEvent::Saved(path.to_path_buf()));
        true
    }

    async fn open_file(&self, path: &Path, line: Option<u32>) {
        self.record(HostEvent::Opened(path.to_path_buf(), line));
    }

    fn create_terminal(&self, name: &str, cwd: &Path) -> Arc<dyn Terminal> {
        let terminal = self
            .terminals
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RecordingTerminal::new(name, cwd)))
            .clone();
        terminal
    }

    fn tree_changed(&self, node: Option<&TreeNode>) {
        self.record(HostEvent::TreeChanged(node.map(|n| n.label.clone())));
    }

    fn lenses_changed(&self) {
        self.record(HostEvent::LensesChanged);
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Output(ProcessOutput),
    SpawnError(String),
}

/// Process runner answering from substring rules.
///
/// A call matches a rule when its shell command line contains the rule's
/// pattern; the most recently added matching rule wins. Calls matching no
/// rule fail as if the program could not be spawned.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<(String, Reply)>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, pattern: &str, output: ProcessOutput) -> &Self {
        self.rules
            .lock()
            .push((pattern.to_string(), Reply::Output(output)));
        self
    }

    pub fn fail_spawn(&self, pattern: &str, message: &str) -> &Self {
        self.rules
            .lock()
            .push((pattern.to_string(), Reply::SpawnError(message.to_string())));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    /// Number of recorded calls whose command line contains `pattern`
    pub fn call_count(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.to_shell_command().contains(pattern))
            .count()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        let command = invocation.to_shell_command();
        self.calls.lock().push(invocation.clone());

        let reply = self
            .rules
            .lock()
            .iter()
            .rev()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::SpawnError(message)) => Err(Error::tool(command, message)),
            None => Err(Error::tool(command, "no scripted response")),
        }
    }
}

impl ProcessOutput {
    /// Successful exit with `stdout`
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into().into_bytes(),
            stderr: Vec::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: Vec::new(),
            stderr: stderr.into().into_bytes(),
        }
    }
}

/// Builder for QTA project layouts on disk
#[derive(Debug)]
pub struct ProjectFixture {
    root: PathBuf,
}

impl ProjectFixture {
    /// Create `manage.py` and `settings.py` under `root`
    pub fn create(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        std::fs::write(root.join("manage.py"), "# manage\n")?;
        std::fs::write(root.join("settings.py"), "# settings\n")?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file(&self, relative: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn with_settings_dir(self) -> std::io::Result<Self> {
        std::fs::create_dir_all(self.root.join(crate::config::SETTINGS_DIR))?;
        Ok(self)
    }

    pub fn with_requirements(self, contents: &str) -> std::io::Result<Self> {
        self.file(crate::utils::REQUIREMENTS_FILE, contents)?;
        Ok(self)
    }

    pub fn with_settings(self, json: &str) -> std::io::Result<Self> {
        self.file(".vscode/settings.json", json)?;
        Ok(self)
    }

    /// Lay out a virtualenv named `name` with its activation marker
    pub fn with_virtualenv(self, name: &str, platform: crate::types::Platform) -> std::io::Result<Self> {
        let marker = platform.activation_marker(&self.root.join(name));
        if let Some(parent) = marker.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(marker, "")?;
        Ok(self)
    }
}
