//! Access to a project's `.vscode/settings.json`

use crate::error::{Error, Result};
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const SETTINGS_DIR: &str = ".vscode";
pub const SETTINGS_FILE: &str = "settings.json";

pub const PYTHON_PATH_KEY: &str = "python.pythonPath";
pub const PIP_SOURCE_KEY: &str = "qta.pipSource";

#[derive(Debug, Clone)]
pub struct ProjectSettings {
    root: PathBuf,
}

impl ProjectSettings {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(SETTINGS_DIR)
    }

    pub fn path(&self) -> PathBuf {
        self.dir().join(SETTINGS_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Read the settings object; a missing file is an empty object
    pub fn read(&self) -> Result<Map<String, Value>> {
        let path = self.path();
        if !path.exists() {
            return Ok(Map::new());
        }
        let contents = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<Value>(&contents)? {
            Value::Object(map) => Ok(map),
            _ => Err(Error::ConfigError(format!(
                "{} is not a JSON object",
                path.display()
            ))),
        }
    }

    /// Look up a string setting; unreadable settings count as unset
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.read() {
            Ok(map) => map
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            Err(e) => {
                tracing::warn!("Ignoring unreadable {}: {}", self.path().display(), e);
                None
            }
        }
    }

    /// Merge `updates` into the existing settings and write them back
    pub fn merge(&self, updates: Map<String, Value>) -> Result<()> {
        let mut settings = self.read()?;
        settings.extend(updates);
        self.write(&settings)
    }

    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut updates = Map::new();
        updates.insert(key.to_string(), value);
        self.merge(updates)
    }

    fn write(&self, settings: &Map<String, Value>) -> Result<()> {
        std::fs::create_dir_all(self.dir())?;
        std::fs::write(self.path(), to_json_4(settings)?)?;
        Ok(())
    }

    /// Write the default editor settings for a QTA project.
    ///
    /// Returns `false` without touching anything when the file already
    /// exists and `force` is not set.
    pub fn write_defaults(&self, env_dir_name: &str, force: bool) -> Result<bool> {
        if self.exists() && !force {
            return Ok(false);
        }

        let mut exclude = Map::new();
        for pattern in [
            "**/.git",
            "**/.svn",
            "**/.hg",
            "**/CVS",
            "**/.DS_Store",
            ".settings",
            "**/*.pyc",
        ] {
            exclude.insert(pattern.to_string(), Value::Bool(true));
        }
        exclude.insert(format!("**/{env_dir_name}"), Value::Bool(true));

        let mut settings = Map::new();
        settings.insert(
            "python.autoComplete.extraPaths".to_string(),
            json!(["${workspaceFolder}"]),
        );
        settings.insert("python.autoComplete.preloadModules".to_string(), json!([]));
        settings.insert("files.exclude".to_string(), Value::Object(exclude));
        settings.insert("python.linting.enabled".to_string(), Value::Bool(true));

        self.write(&settings)?;
        Ok(true)
    }

    /// Expand editor variables such as `${workspaceFolder}` against the root
    pub fn resolve_variables(&self, value: &str) -> String {
        static VARIABLE: OnceLock<Regex> = OnceLock::new();
        let re = VARIABLE
            .get_or_init(|| Regex::new(r"\$\{(.*?)\}").expect("valid variable pattern"));

        re.replace_all(value, |caps: &Captures<'_>| match &caps[1] {
            "workspaceRootFolderName" | "workspaceFolderBasename" => self
                .root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            _ => self.root.to_string_lossy().into_owned(),
        })
        .into_owned()
    }

    /// The configured interpreter, resolved against the project root
    pub fn python_path(&self) -> Option<PathBuf> {
        let raw = self.get_str(PYTHON_PATH_KEY)?;
        let resolved = PathBuf::from(self.resolve_variables(&raw));
        Some(if resolved.is_absolute() {
            resolved
        } else {
            normalize(&self.root.join(resolved))
        })
    }
}

fn to_json_4(value: &impl Serialize) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| Error::ConfigError(e.to_string()))
}

/// Lexically fold `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_settings_read_as_empty() {
        let temp = TempDir::new().unwrap();
        let settings = ProjectSettings::new(temp.path());
        assert!(settings.read().unwrap().is_empty());
        assert_eq!(settings.python_path(), None);
    }

    #[test]
    fn test_merge_keeps_existing_keys() {
        let temp = TempDir::new().unwrap();
        let settings = ProjectSettings::new(temp.path());
        std::fs::create_dir_all(settings.dir()).unwrap();
        std::fs::write(settings.path(), r#"{"editor.tabSize": 2}"#).unwrap();

        settings
            .set(PYTHON_PATH_KEY, json!("${workspaceFolder}/.env/bin/python"))
            .unwrap();

        let map = settings.read().unwrap();
        assert_eq!(map.get("editor.tabSize"), Some(&json!(2)));
        assert_eq!(
            settings.python_path(),
            Some(temp.path().join(".env/bin/python"))
        );

        let text = std::fs::read_to_string(settings.path()).unwrap();
        assert!(text.contains("\n    \"editor.tabSize\": 2"));
    }

    #[test]
    fn test_relative_python_path_resolves_against_root() {
        let temp = TempDir::new().unwrap();
        let settings = ProjectSettings::new(temp.path());
        settings.set(PYTHON_PATH_KEY, json!("./venv/../.env/bin/python")).unwrap();
        assert_eq!(
            settings.python_path(),
            Some(temp.path().join(".env").join("bin").join("python"))
        );
    }

    #[test]
    fn test_resolve_variables() {
        let settings = ProjectSettings::new("/work/demo");
        assert_eq!(
            settings.resolve_variables("${workspaceRoot}/x"),
            "/work/demo/x"
        );
        assert_eq!(
            settings.resolve_variables("${workspaceFolderBasename}-env"),
            "demo-env"
        );
        assert_eq!(settings.resolve_variables("${unknown}"), "/work/demo");
        assert_eq!(settings.resolve_variables("plain"), "plain");
    }

    #[test]
    fn test_write_defaults_respects_force() {
        let temp = TempDir::new().unwrap();
        let settings = ProjectSettings::new(temp.path());

        assert!(settings.write_defaults(".env", false).unwrap());
        let map = settings.read().unwrap();
        assert_eq!(map.get("python.linting.enabled"), Some(&json!(true)));
        assert_eq!(map["files.exclude"]["**/.env"], json!(true));

        settings.set(PIP_SOURCE_KEY, json!("https://pypi.example/simple")).unwrap();
        assert!(!settings.write_defaults(".env", false).unwrap());
        assert!(settings.get_str(PIP_SOURCE_KEY).is_some());

        assert!(settings.write_defaults("venv", true).unwrap());
        assert!(settings.get_str(PIP_SOURCE_KEY).is_none());
        assert_eq!(settings.read().unwrap()["files.exclude"]["**/venv"], json!(true));
    }

    #[test]
    fn test_malformed_settings_read_as_unset() {
        let temp = TempDir::new().unwrap();
        let settings = ProjectSettings::new(temp.path());
        std::fs::create_dir_all(settings.dir()).unwrap();
        std::fs::write(settings.path(), "[1, 2").unwrap();
        assert!(settings.read().is_err());
        assert_eq!(settings.get_str(PYTHON_PATH_KEY), None);
    }
}
