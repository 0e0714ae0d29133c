//! Shared setup for the cross-crate integration tests under `tests/`

use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub use qta_runner_core::testing::{
    HostEvent, ProjectFixture, RecordingHost, RecordingTerminal, ScriptedRunner,
};
use qta_runner_core::{
    Platform, ProcessOutput, ProjectContext, ProjectRegistry, RunDispatcher, TerminalLines,
    TreeProvider,
};

/// A class entry as `parse_file.py` prints it
pub fn class_json(name: &str, line: u32, endline: u32, is_testcase: bool) -> Value {
    json!({
        "name": name,
        "docstring": "",
        "line": line,
        "endline": endline,
        "is_testcase": is_testcase,
        "bases": [],
        "static_fields": [],
        "functions": [],
        "controls": [],
    })
}

/// Full parser output for a module holding `classes` and nothing else
pub fn listing(classes: Vec<Value>) -> String {
    json!({
        "docstring": null,
        "classes": classes,
        "functions": [],
        "errors": [],
    })
    .to_string()
}

/// Parser output reporting a syntax error
pub fn syntax_error(line: u32) -> String {
    json!({
        "classes": [],
        "functions": [],
        "errors": [{"msg": "invalid syntax", "line": line}],
    })
    .to_string()
}

/// One QTA project in a temp dir, wired to a recording host and a scripted runner
pub struct Harness {
    pub temp: TempDir,
    pub project: ProjectFixture,
    pub host: Arc<RecordingHost>,
    pub runner: Arc<ScriptedRunner>,
    pub ctx: ProjectContext,
    pub registry: Arc<ProjectRegistry>,
    pub tree: Arc<TreeProvider>,
}

impl Harness {
    /// A project `proj` with a `.vscode` folder, registered but not initialized
    pub fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let project = ProjectFixture::create(temp.path().join("proj"))
            .and_then(ProjectFixture::with_settings_dir)
            .expect("project fixture");
        let host = Arc::new(RecordingHost::new());
        let runner = Arc::new(ScriptedRunner::new());
        let ctx = ProjectContext::for_tests(host.clone(), runner.clone(), Platform::Unix);
        let registry = Arc::new(ProjectRegistry::new(ctx.clone(), false));
        registry.add(project.root()).expect("QTA project");
        let tree = Arc::new(TreeProvider::new(
            host.clone(),
            registry.clone(),
            Duration::from_secs(5),
        ));
        Self {
            temp,
            project,
            host,
            runner,
            ctx,
            registry,
            tree,
        }
    }

    pub fn root(&self) -> &Path {
        self.project.root()
    }

    pub fn file(&self, relative: &str, contents: &str) -> PathBuf {
        self.project.file(relative, contents).expect("write fixture file")
    }

    /// Answer every `parse_file.py` call with `stdout`
    pub fn parser_prints(&self, stdout: &str) {
        self.runner
            .respond("parse_file.py", ProcessOutput::ok(stdout.to_string()));
    }

    pub fn dispatcher(&self) -> RunDispatcher {
        RunDispatcher::new(
            self.host.clone(),
            self.registry.clone(),
            self.tree.clone(),
            TerminalLines::new(Platform::Unix),
        )
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
