use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::command::{Invocation, ProcessRunner};
use crate::config::SETTINGS_DIR;
use crate::host::Host;
use crate::types::{ClassInfo, FunctionInfo, ParsedDocument};
use crate::utils::file_mtime_millis;

/// Supplies the interpreter used to run the helper scripts
pub trait InterpreterSource: Send + Sync {
    fn python_path(&self) -> PathBuf;
}

/// A fixed interpreter path
#[derive(Debug, Clone)]
pub struct FixedInterpreter(pub PathBuf);

impl InterpreterSource for FixedInterpreter {
    fn python_path(&self) -> PathBuf {
        self.0.clone()
    }
}

/// Parses Python modules through `parse_file.py`, backed by the parse cache
pub struct PythonParser {
    python: Arc<dyn InterpreterSource>,
    script: PathBuf,
    runner: Arc<dyn ProcessRunner>,
    cache: Arc<CacheStore>,
    host: Arc<dyn Host>,
    parse_lock: tokio::sync::Mutex<()>,
}

impl PythonParser {
    pub fn new(
        python: Arc<dyn InterpreterSource>,
        script: impl Into<PathBuf>,
        runner: Arc<dyn ProcessRunner>,
        cache: Arc<CacheStore>,
        host: Arc<dyn Host>,
    ) -> Self {
        Self {
            python,
            script: script.into(),
            runner,
            cache,
            host,
            parse_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Parse `file`, reusing the cached result while its mtime is unchanged.
    ///
    /// Returns `None` when the file is missing, lies outside any cache root,
    /// or the parser fails. Failures are reported to the host.
    pub async fn parse(&self, file: &Path) -> Option<ParsedDocument> {
        if !file.is_file() {
            tracing::debug!("Not parsing missing file {}", file.display());
            return None;
        }
        let root = find_cache_root(file)?;
        let key = cache_key(&root, file)?;

        // One parse at a time, so a second request for the same file hits the cache
        let _guard = self.parse_lock.lock().await;

        let mtime = match file_mtime_millis(file) {
            Ok(mtime) => mtime,
            Err(e) => {
                tracing::warn!("Cannot stat {}: {}", file.display(), e);
                return None;
            }
        };

        if let Some(document) = self.cache.lookup(&root, &key, mtime) {
            tracing::trace!("Cache hit for {}", key);
            return Some(document);
        }

        let invocation = Invocation::python(&self.python.python_path())
            .path_arg(&self.script)
            .path_arg(file);

        let output = match self.runner.run(&invocation).await {
            Ok(output) if output.success() => output,
            Ok(output) => {
                let stderr = output.stderr_text();
                self.report_failure(file, stderr.trim());
                return None;
            }
            Err(e) => {
                self.report_failure(file, &e.to_string());
                return None;
            }
        };

        let stdout = output.stdout_text();
        let document: ParsedDocument = match serde_json::from_str(stdout.trim()) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("Unreadable parser output for {}: {}", file.display(), e);
                self.status(&format!("Failed to read parse result of {}", file.display()));
                return None;
            }
        };

        if document.has_errors() {
            tracing::info!("{} has syntax errors: {:?}", file.display(), document.errors);
            self.status(&format!("Syntax error in {}", file.display()));
            return None;
        }

        self.cache.store(&root, &key, mtime, document.clone());
        Some(document)
    }

    fn status(&self, text: &str) {
        tracing::info!("{}", text);
        self.host.update_status(text);
    }

    fn report_failure(&self, file: &Path, detail: &str) {
        tracing::error!("Parsing {} failed: {}", file.display(), detail);
        self.status(&format!("Failed to parse {}", file.display()));
        self.host
            .show_error(&format!("Failed to parse {}: {}", file.display(), detail));
    }

    pub async fn class_list(&self, file: &Path) -> Vec<ClassInfo> {
        self.parse(file)
            .await
            .map(|document| document.classes)
            .unwrap_or_default()
    }

    /// Module-level functions, or the methods of `class` when given
    pub async fn function_list(&self, file: &Path, class: Option<&str>) -> Vec<FunctionInfo> {
        let Some(document) = self.parse(file).await else {
            return Vec::new();
        };
        match class {
            None => document.functions,
            Some(name) => document
                .classes
                .into_iter()
                .find(|c| c.name == name)
                .map(|c| c.functions)
                .unwrap_or_default(),
        }
    }

    /// Docstring of the module, `"Class"`, `"Class.func"` or `"func"`
    pub async fn docstring(&self, file: &Path, item: Option<&str>) -> Option<String> {
        self.parse(file)
            .await?
            .docstring_for(item)
            .map(str::to_string)
    }
}

impl std::fmt::Debug for PythonParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PythonParser")
            .field("script", &self.script)
            .finish_non_exhaustive()
    }
}

/// Nearest ancestor of `file` holding a `.vscode` directory.
///
/// The walk stops before paths of three characters or fewer, so drive
/// roots such as `C:\` and `/` are never used.
pub fn find_cache_root(file: &Path) -> Option<PathBuf> {
    let mut dir = file.parent();
    while let Some(current) = dir {
        if current.as_os_str().len() <= 3 {
            break;
        }
        if current.join(SETTINGS_DIR).is_dir() {
            return Some(current.to_path_buf());
        }
        dir = current.parent();
    }
    None
}

/// Cache key of `file`: its path relative to `root`, `/`-separated
pub fn cache_key(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ProcessOutput;
    use crate::testing::{RecordingHost, ScriptedRunner};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    const DOC: &str = r#"{"docstring": "mod", "classes": [{"name": "A", "docstring": "a doc", "line": 3, "endline": 9,
        "functions": [{"name": "run_test", "docstring": "runs", "line": 5, "endline": 9}]}],
        "functions": [{"name": "helper", "docstring": "", "line": 11, "endline": 12}], "errors": []}"#;

    struct Fixture {
        _temp: TempDir,
        file: PathBuf,
        runner: Arc<ScriptedRunner>,
        host: Arc<RecordingHost>,
        cache: Arc<CacheStore>,
        parser: PythonParser,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".vscode")).unwrap();
        let file = temp.path().join("cases").join("test_a.py");
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, "class A: pass\n").unwrap();

        let runner = Arc::new(ScriptedRunner::new());
        runner.respond("parse_file.py", ProcessOutput::ok(DOC));
        let host = Arc::new(RecordingHost::new());
        let cache = Arc::new(CacheStore::new());
        let parser = PythonParser::new(
            Arc::new(FixedInterpreter(PathBuf::from("python"))),
            "/scripts/parse_file.py",
            runner.clone(),
            cache.clone(),
            host.clone(),
        );
        Fixture {
            _temp: temp,
            file,
            runner,
            host,
            cache,
            parser,
        }
    }

    #[test]
    fn test_find_cache_root_walks_up() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".vscode")).unwrap();
        let nested = temp.path().join("a").join("b").join("c.py");
        assert_eq!(find_cache_root(&nested), Some(temp.path().to_path_buf()));

        let other = TempDir::new().unwrap();
        assert_eq!(find_cache_root(&other.path().join("x.py")), None);
    }

    #[test]
    fn test_cache_key_uses_forward_slashes() {
        let key = cache_key(Path::new("/work/proj"), Path::new("/work/proj/pkg/sub/t.py"));
        assert_eq!(key.as_deref(), Some("pkg/sub/t.py"));
        assert_eq!(cache_key(Path::new("/a"), Path::new("/b/t.py")), None);
    }

    #[tokio::test]
    async fn test_second_parse_is_served_from_cache() {
        let f = fixture();
        let first = f.parser.parse(&f.file).await.unwrap();
        let second = f.parser.parse(&f.file).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(f.runner.call_count("parse_file.py"), 1);
    }

    #[tokio::test]
    async fn test_mtime_change_reparses_once() {
        let f = fixture();
        f.parser.parse(&f.file).await.unwrap();

        let later = SystemTime::now() + Duration::from_secs(5);
        std::fs::File::options()
            .write(true)
            .open(&f.file)
            .unwrap()
            .set_modified(later)
            .unwrap();

        f.parser.parse(&f.file).await.unwrap();
        f.parser.parse(&f.file).await.unwrap();
        assert_eq!(f.runner.call_count("parse_file.py"), 2);
    }

    #[tokio::test]
    async fn test_concurrent_parses_share_one_invocation() {
        let f = fixture();
        let (a, b) = tokio::join!(f.parser.parse(&f.file), f.parser.parse(&f.file));
        assert_eq!(a, b);
        assert_eq!(f.runner.call_count("parse_file.py"), 1);
    }

    #[tokio::test]
    async fn test_syntax_errors_are_not_cached() {
        let f = fixture();
        f.runner.respond(
            "parse_file.py",
            ProcessOutput::ok(r#"{"classes": [], "functions": [], "errors": [{"lineno": 1}]}"#),
        );

        assert!(f.parser.parse(&f.file).await.is_none());
        assert!(!f.cache.is_dirty(f._temp.path()));
        assert_eq!(f.host.statuses().len(), 1);
        assert!(f.host.errors().is_empty());
    }

    #[tokio::test]
    async fn test_nonzero_exit_shows_error() {
        let f = fixture();
        f.runner
            .respond("parse_file.py", ProcessOutput::failed(1, "Traceback"));

        assert!(f.parser.parse(&f.file).await.is_none());
        assert_eq!(f.host.errors().len(), 1);
        assert!(f.host.errors()[0].contains("Traceback"));
    }

    #[tokio::test]
    async fn test_failed_reparse_keeps_previous_entry() {
        let f = fixture();
        let root = f._temp.path();
        let key = cache_key(root, &f.file).unwrap();
        let first = f.parser.parse(&f.file).await.unwrap();
        let old_mtime = file_mtime_millis(&f.file).unwrap();
        assert!(f.cache.flush_root(root));
        assert!(!f.cache.is_dirty(root));

        let later = SystemTime::now() + Duration::from_secs(5);
        std::fs::File::options()
            .write(true)
            .open(&f.file)
            .unwrap()
            .set_modified(later)
            .unwrap();
        let new_mtime = file_mtime_millis(&f.file).unwrap();
        f.runner
            .respond("parse_file.py", ProcessOutput::failed(1, "Traceback"));

        assert!(f.parser.parse(&f.file).await.is_none());
        assert_eq!(f.cache.lookup(root, &key, old_mtime), Some(first));
        assert_eq!(f.cache.lookup(root, &key, new_mtime), None);
        assert!(!f.cache.is_dirty(root));
    }

    #[tokio::test]
    async fn test_garbage_output_returns_none() {
        let f = fixture();
        f.runner
            .respond("parse_file.py", ProcessOutput::ok("not json"));
        assert!(f.parser.parse(&f.file).await.is_none());
        assert!(f.host.errors().is_empty());
    }

    #[tokio::test]
    async fn test_accessors() {
        let f = fixture();
        assert_eq!(f.parser.class_list(&f.file).await[0].name, "A");
        assert_eq!(f.parser.function_list(&f.file, None).await[0].name, "helper");
        assert_eq!(
            f.parser.function_list(&f.file, Some("A")).await[0].name,
            "run_test"
        );
        assert!(f.parser.function_list(&f.file, Some("B")).await.is_empty());
        assert_eq!(
            f.parser.docstring(&f.file, Some("A.run_test")).await.as_deref(),
            Some("runs")
        );
        assert_eq!(f.parser.docstring(&f.file, None).await.as_deref(), Some("mod"));
    }

    #[tokio::test]
    async fn test_file_outside_cache_root() {
        let f = fixture();
        let other = TempDir::new().unwrap();
        let loose = other.path().join("loose.py");
        std::fs::write(&loose, "").unwrap();
        assert!(f.parser.parse(&loose).await.is_none());
        assert_eq!(f.runner.calls().len(), 0);
    }
}
