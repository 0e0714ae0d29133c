//! Filesystem watches on `requirements.txt` and `.vscode/settings.json`

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{SETTINGS_DIR, SETTINGS_FILE};
use crate::error::Result;
use crate::utils::REQUIREMENTS_FILE;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectEvent {
    RequirementsChanged,
    SettingsChanged,
}

type SharedWatcher = Arc<Mutex<Option<RecommendedWatcher>>>;

/// Watches a project root (non-recursively) and its `.vscode` directory.
///
/// A `.vscode` directory created after startup is picked up from its
/// creation event; an existing `settings.json` inside it counts as changed.
pub struct ProjectWatcher {
    root: PathBuf,
    watcher: SharedWatcher,
    task: JoinHandle<()>,
}

impl ProjectWatcher {
    /// Start watching `root`; debounced events arrive on the returned receiver
    pub fn start(
        root: &Path,
        debounce: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ProjectEvent>)> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            // Receiver gone means the watcher is stopping
            let _ = raw_tx.send(res);
        })?;

        watcher.watch(root, RecursiveMode::NonRecursive)?;
        let settings_dir = root.join(SETTINGS_DIR);
        if settings_dir.is_dir() {
            watcher.watch(&settings_dir, RecursiveMode::NonRecursive)?;
        }
        tracing::debug!("Watching {}", root.display());

        let watcher = Arc::new(Mutex::new(Some(watcher)));
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(pump(
            root.to_path_buf(),
            Arc::clone(&watcher),
            raw_rx,
            tx,
            debounce,
        ));

        Ok((
            Self {
                root: root.to_path_buf(),
                watcher,
                task,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_active(&self) -> bool {
        self.watcher.lock().is_some()
    }

    pub fn stop(&self) {
        self.task.abort();
        self.watcher.lock().take();
        tracing::debug!("Stopped watching {}", self.root.display());
    }
}

impl std::fmt::Debug for ProjectWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectWatcher")
            .field("root", &self.root)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for ProjectWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn pump(
    root: PathBuf,
    watcher: SharedWatcher,
    mut raw: mpsc::UnboundedReceiver<notify::Result<Event>>,
    tx: mpsc::UnboundedSender<ProjectEvent>,
    debounce: Duration,
) {
    let mut pending: Vec<ProjectEvent> = Vec::new();
    loop {
        let next = if pending.is_empty() {
            raw.recv().await
        } else {
            match tokio::time::timeout(debounce, raw.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    for event in pending.drain(..) {
                        if tx.send(event).is_err() {
                            return;
                        }
                    }
                    continue;
                }
            }
        };

        let Some(result) = next else {
            return;
        };

        match result {
            Ok(event) => {
                for classified in classify(&root, &watcher, &event) {
                    if !pending.contains(&classified) {
                        pending.push(classified);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Watch error under {}: {}", root.display(), e);
                if is_permission_error(&e) {
                    watcher.lock().take();
                    return;
                }
            }
        }
    }
}

fn classify(root: &Path, watcher: &SharedWatcher, event: &Event) -> Vec<ProjectEvent> {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return Vec::new();
    }

    let mut events = Vec::new();
    for path in &event.paths {
        let name = path.file_name().and_then(|n| n.to_str());
        let parent = path
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str());

        match (name, parent) {
            (Some(SETTINGS_FILE), Some(SETTINGS_DIR)) => {
                events.push(ProjectEvent::SettingsChanged);
            }
            (Some(REQUIREMENTS_FILE), parent) if parent != Some(SETTINGS_DIR) => {
                events.push(ProjectEvent::RequirementsChanged);
            }
            (Some(SETTINGS_DIR), _) if matches!(event.kind, EventKind::Create(_)) => {
                let dir = root.join(SETTINGS_DIR);
                if let Some(w) = watcher.lock().as_mut() {
                    match w.watch(&dir, RecursiveMode::NonRecursive) {
                        Ok(()) => tracing::debug!("Now watching {}", dir.display()),
                        Err(e) => tracing::warn!("Cannot watch {}: {}", dir.display(), e),
                    }
                }
                if dir.join(SETTINGS_FILE).is_file() {
                    events.push(ProjectEvent::SettingsChanged);
                }
            }
            _ => {}
        }
    }
    events
}

fn is_permission_error(error: &notify::Error) -> bool {
    match &error.kind {
        notify::ErrorKind::Io(e) => e.kind() == std::io::ErrorKind::PermissionDenied,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn next(rx: &mut mpsc::UnboundedReceiver<ProjectEvent>) -> Option<ProjectEvent> {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn test_requirements_change_is_reported() {
        let temp = TempDir::new().unwrap();
        let (watcher, mut rx) = ProjectWatcher::start(temp.path(), Duration::from_millis(50)).unwrap();

        std::fs::write(temp.path().join(REQUIREMENTS_FILE), "requests\n").unwrap();
        assert_eq!(next(&mut rx).await, Some(ProjectEvent::RequirementsChanged));
        watcher.stop();
        assert!(!watcher.is_active());
    }

    #[tokio::test]
    async fn test_settings_dir_created_later_is_watched() {
        let temp = TempDir::new().unwrap();
        let (watcher, mut rx) = ProjectWatcher::start(temp.path(), Duration::from_millis(50)).unwrap();

        std::fs::create_dir(temp.path().join(SETTINGS_DIR)).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(
            temp.path().join(SETTINGS_DIR).join(SETTINGS_FILE),
            "{}",
        )
        .unwrap();

        assert_eq!(next(&mut rx).await, Some(ProjectEvent::SettingsChanged));
        watcher.stop();
    }

    #[tokio::test]
    async fn test_unrelated_files_are_ignored() {
        let temp = TempDir::new().unwrap();
        let (watcher, mut rx) = ProjectWatcher::start(temp.path(), Duration::from_millis(50)).unwrap();

        std::fs::write(temp.path().join("notes.txt"), "x").unwrap();
        let event = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(event.is_err());
        watcher.stop();
    }
}
