use std::path::Path;
use std::time::UNIX_EPOCH;

use walkdir::WalkDir;

use crate::error::Result;

/// Files that must sit directly under a QTA project root
const QTA_MARKERS: [&str; 2] = ["manage.py", "settings.py"];

pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// Check if a directory is a QTA project root
pub fn is_qta_project(dir: &Path) -> bool {
    QTA_MARKERS.iter().all(|marker| dir.join(marker).is_file())
}

/// Check if a directory holds at least one `.py` file at any depth
pub fn is_python_project(dir: &Path) -> bool {
    if !dir.exists() {
        return false;
    }
    WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .any(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().and_then(|e| e.to_str()) == Some("py")
        })
}

pub fn has_requirements(dir: &Path) -> bool {
    dir.join(REQUIREMENTS_FILE).is_file()
}

/// Last modification time in milliseconds since the Unix epoch
pub fn file_mtime_millis(path: &Path) -> Result<u64> {
    let modified = std::fs::metadata(path)?.modified()?;
    let millis = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    Ok(u64::try_from(millis).unwrap_or(u64::MAX))
}
