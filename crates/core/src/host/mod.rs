//! Seams to the editor (or console) hosting qta-runner.
//!
//! The core never talks to a UI directly: prompts, pickers, dialogs, the
//! active editor, documents, tree refreshes and terminals all go through
//! these traits.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::tree::TreeNode;

/// Answer to a yes/no(/don't ask again) prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptResponse {
    Yes,
    No,
    /// "Don't ask again": suppress environment checks for the rest of the process
    Suppress,
    /// Closed without choosing
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoices {
    YesNo,
    YesNoSuppress,
}

/// The editor the user is looking at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    pub path: PathBuf,
    /// 1-based, same numbering as the parser's line numbers
    pub cursor_line: u32,
}

/// Validation callback for input boxes: `Some(message)` rejects the value
pub type InputValidator<'a> = &'a (dyn Fn(&str) -> Option<String> + Send + Sync);

/// An integrated terminal that accepts command lines
pub trait Terminal: Send + Sync {
    fn name(&self) -> &str;
    fn show(&self);
    fn send_text(&self, text: &str);
    fn close(&self);
}

#[async_trait]
pub trait Host: Send + Sync {
    async fn prompt(&self, message: &str, choices: PromptChoices) -> PromptResponse;

    /// Let the user pick one of `items`; `None` when cancelled
    async fn pick(&self, placeholder: &str, items: &[String]) -> Option<String>;

    async fn input(
        &self,
        prompt: &str,
        default: &str,
        validate: InputValidator<'_>,
    ) -> Option<String>;

    /// Ask the user to choose the base interpreter before creating a virtualenv
    async fn select_interpreter(&self) {}

    fn show_error(&self, message: &str);

    fn show_info(&self, message: &str);

    fn update_status(&self, text: &str);

    fn active_editor(&self) -> Option<EditorState>;

    /// Whether `path` is open with unsaved edits
    fn is_dirty(&self, path: &Path) -> bool;

    async fn save_document(&self, path: &Path) -> bool;

    async fn open_file(&self, path: &Path, line: Option<u32>);

    /// Return the terminal called `name`, creating it if needed
    fn create_terminal(&self, name: &str, cwd: &Path) -> Arc<dyn Terminal>;

    /// The tree (or one node of it) must be re-queried
    fn tree_changed(&self, node: Option<&TreeNode>);

    fn lenses_changed(&self) {}
}

/// Terminal name used for a project root
pub fn terminal_name(root: &Path) -> String {
    format!("QTA - {}", root.display())
}
