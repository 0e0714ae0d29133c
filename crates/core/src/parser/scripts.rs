//! Helper scripts run by the project interpreter

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};

pub const PARSE_FILE_SCRIPT: &str = "parse_file.py";
pub const PARSE_REQUIREMENTS_SCRIPT: &str = "parse_requirements.py";

const PARSE_FILE_SOURCE: &str = include_str!("../../scripts/parse_file.py");
const PARSE_REQUIREMENTS_SOURCE: &str = include_str!("../../scripts/parse_requirements.py");

/// Locations of `parse_file.py` and `parse_requirements.py` on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperScripts {
    parse_file: PathBuf,
    parse_requirements: PathBuf,
}

impl HelperScripts {
    pub fn new(parse_file: impl Into<PathBuf>, parse_requirements: impl Into<PathBuf>) -> Self {
        Self {
            parse_file: parse_file.into(),
            parse_requirements: parse_requirements.into(),
        }
    }

    /// Default directory the embedded scripts are written to
    pub fn default_dir() -> PathBuf {
        std::env::temp_dir()
            .join("qta-runner")
            .join(env!("CARGO_PKG_VERSION"))
    }

    /// Write the embedded scripts into `dir`, rewriting stale copies
    pub fn materialize_into(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let scripts = Self::new(
            dir.join(PARSE_FILE_SCRIPT),
            dir.join(PARSE_REQUIREMENTS_SCRIPT),
        );
        write_if_changed(&scripts.parse_file, PARSE_FILE_SOURCE)?;
        write_if_changed(&scripts.parse_requirements, PARSE_REQUIREMENTS_SOURCE)?;
        Ok(scripts)
    }

    /// Scripts named in the config, falling back to the embedded ones
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedded = match (&config.parser_script, &config.requirements_script) {
            (Some(_), Some(_)) => None,
            _ => Some(Self::materialize_into(&Self::default_dir())?),
        };

        let pick = |configured: &Option<PathBuf>, fallback: fn(&Self) -> &Path| -> Result<PathBuf> {
            match configured {
                Some(path) if path.is_file() => Ok(path.clone()),
                Some(path) => Err(Error::ConfigError(format!(
                    "Helper script {} does not exist",
                    path.display()
                ))),
                None => embedded
                    .as_ref()
                    .map(|e| fallback(e).to_path_buf())
                    .ok_or_else(|| Error::Other("embedded scripts unavailable".to_string())),
            }
        };

        Ok(Self::new(
            pick(&config.parser_script, Self::parse_file)?,
            pick(&config.requirements_script, Self::parse_requirements)?,
        ))
    }

    pub fn parse_file(&self) -> &Path {
        &self.parse_file
    }

    pub fn parse_requirements(&self) -> &Path {
        &self.parse_requirements
    }
}

fn write_if_changed(path: &Path, contents: &str) -> Result<()> {
    if std::fs::read_to_string(path).is_ok_and(|existing| existing == contents) {
        return Ok(());
    }
    tracing::debug!("Writing helper script {}", path.display());
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_materialize_writes_both_scripts() {
        let temp = TempDir::new().unwrap();
        let scripts = HelperScripts::materialize_into(temp.path()).unwrap();

        let parse_file = std::fs::read_to_string(scripts.parse_file()).unwrap();
        assert!(parse_file.contains("def parse_class"));
        let requirements = std::fs::read_to_string(scripts.parse_requirements()).unwrap();
        assert!(requirements.contains("working_set.require"));
    }

    #[test]
    fn test_materialize_repairs_stale_copy() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(PARSE_FILE_SCRIPT), "stale").unwrap();

        let scripts = HelperScripts::materialize_into(temp.path()).unwrap();
        let contents = std::fs::read_to_string(scripts.parse_file()).unwrap();
        assert_eq!(contents, PARSE_FILE_SOURCE);
    }

    #[test]
    fn test_configured_scripts_win() {
        let temp = TempDir::new().unwrap();
        let parser = temp.path().join("my_parse.py");
        let requirements = temp.path().join("my_req.py");
        std::fs::write(&parser, "").unwrap();
        std::fs::write(&requirements, "").unwrap();

        let config = Config {
            parser_script: Some(parser.clone()),
            requirements_script: Some(requirements.clone()),
            ..Default::default()
        };
        let scripts = HelperScripts::from_config(&config).unwrap();
        assert_eq!(scripts, HelperScripts::new(parser, requirements));
    }

    #[test]
    fn test_missing_configured_script_is_config_error() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            parser_script: Some(temp.path().join("missing.py")),
            requirements_script: Some(temp.path().join("missing_too.py")),
            ..Default::default()
        };
        assert!(matches!(
            HelperScripts::from_config(&config),
            Err(Error::ConfigError(_))
        ));
    }
}
