//! A [`Host`] for the terminal: dialoguer prompts, stdout messages and shell terminals

use async_trait::async_trait;
use dialoguer::{Input, Select, console::Term, theme::ColorfulTheme};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use qta_runner_core::host::InputValidator;
use qta_runner_core::{EditorState, Host, PromptChoices, PromptResponse, Terminal, TreeNode};

use super::terminal::{ConsoleTerminal, TerminalMode};

pub struct ConsoleHost {
    /// Answer given to every prompt without asking (`--yes`, `--no`, `--never`)
    assumed: Option<PromptResponse>,
    interactive: bool,
    mode: TerminalMode,
    editor: Mutex<Option<EditorState>>,
    terminals: Mutex<HashMap<String, Arc<ConsoleTerminal>>>,
}

impl ConsoleHost {
    pub fn new(assumed: Option<PromptResponse>, mode: TerminalMode) -> Self {
        Self {
            assumed,
            interactive: Term::stderr().is_term(),
            mode,
            editor: Mutex::new(None),
            terminals: Mutex::new(HashMap::new()),
        }
    }

    /// Never open a dialog, whatever stderr is attached to
    pub fn non_interactive(mut self) -> Self {
        self.interactive = false;
        self
    }

    /// Point the "active editor" at `path` with the cursor on 1-based `line`
    pub fn set_active_editor(&self, path: &Path, line: u32) {
        *self.editor.lock() = Some(EditorState {
            path: path.to_path_buf(),
            cursor_line: line.max(1),
        });
    }

    pub fn terminal(&self, name: &str) -> Option<Arc<ConsoleTerminal>> {
        self.terminals.lock().get(name).cloned()
    }

    fn can_ask(&self, message: &str) -> bool {
        if !self.interactive {
            tracing::warn!("No terminal to ask: {}", message);
        }
        self.interactive
    }
}

fn response_label(response: PromptResponse) -> &'static str {
    match response {
        PromptResponse::Yes => "yes",
        PromptResponse::No => "no",
        PromptResponse::Suppress => "don't ask again",
        PromptResponse::Dismissed => "dismissed",
    }
}

#[async_trait]
impl Host for ConsoleHost {
    async fn prompt(&self, message: &str, choices: PromptChoices) -> PromptResponse {
        if let Some(answer) = self.assumed {
            // "Don't ask again" only exists on some prompts
            let answer = match (answer, choices) {
                (PromptResponse::Suppress, PromptChoices::YesNo) => PromptResponse::No,
                (answer, _) => answer,
            };
            eprintln!("❓ {} [{}]", message, response_label(answer));
            return answer;
        }
        if !self.can_ask(message) {
            return PromptResponse::Dismissed;
        }

        let mut items = vec!["Yes", "No"];
        if choices == PromptChoices::YesNoSuppress {
            items.push("Don't ask again");
        }
        let selection = tokio::task::block_in_place(|| {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(message)
                .items(&items)
                .default(0)
                .interact_opt()
        });

        match selection {
            Ok(Some(0)) => PromptResponse::Yes,
            Ok(Some(1)) => PromptResponse::No,
            Ok(Some(_)) => PromptResponse::Suppress,
            Ok(None) => PromptResponse::Dismissed,
            Err(e) => {
                tracing::warn!("Prompt failed: {}", e);
                PromptResponse::Dismissed
            }
        }
    }

    async fn pick(&self, placeholder: &str, items: &[String]) -> Option<String> {
        match self.assumed {
            Some(PromptResponse::Yes) => {
                let first = items.first().cloned();
                if let Some(item) = &first {
                    eprintln!("❓ {} [{}]", placeholder, item);
                }
                return first;
            }
            Some(_) => return None,
            None => {}
        }
        if items.is_empty() || !self.can_ask(placeholder) {
            return None;
        }

        let selection = tokio::task::block_in_place(|| {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(placeholder)
                .items(items)
                .default(0)
                .interact_opt()
        });
        match selection {
            Ok(choice) => choice.and_then(|index| items.get(index).cloned()),
            Err(e) => {
                tracing::warn!("Picker failed: {}", e);
                None
            }
        }
    }

    async fn input(
        &self,
        prompt: &str,
        default: &str,
        validate: InputValidator<'_>,
    ) -> Option<String> {
        match self.assumed {
            Some(PromptResponse::Yes) => {
                if let Some(message) = validate(default) {
                    self.show_error(&message);
                    return None;
                }
                eprintln!("❓ {} [{}]", prompt, default);
                return Some(default.to_string());
            }
            Some(_) => return None,
            None => {}
        }
        if !self.can_ask(prompt) {
            return None;
        }

        let value = tokio::task::block_in_place(|| {
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .default(default.to_string())
                .validate_with(|value: &String| match validate(value) {
                    Some(message) => Err(message),
                    None => Ok(()),
                })
                .interact_text()
        });
        match value {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Input failed: {}", e);
                None
            }
        }
    }

    async fn select_interpreter(&self) {
        println!("ℹ️  Set \"python\" in .qta-runner.json to choose the interpreter used for new virtualenvs");
    }

    fn show_error(&self, message: &str) {
        eprintln!("❌ {}", message);
    }

    fn show_info(&self, message: &str) {
        println!("ℹ️  {}", message);
    }

    fn update_status(&self, text: &str) {
        tracing::info!("{}", text);
    }

    fn active_editor(&self) -> Option<EditorState> {
        self.editor.lock().clone()
    }

    /// Files on disk are what the console runs
    fn is_dirty(&self, _path: &Path) -> bool {
        false
    }

    async fn save_document(&self, _path: &Path) -> bool {
        true
    }

    async fn open_file(&self, path: &Path, line: Option<u32>) {
        match line {
            Some(line) => println!("{}:{}", path.display(), line),
            None => println!("{}", path.display()),
        }
    }

    fn create_terminal(&self, name: &str, cwd: &Path) -> Arc<dyn Terminal> {
        self.terminals
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(ConsoleTerminal::new(name, cwd, self.mode)))
            .clone()
    }

    fn tree_changed(&self, node: Option<&TreeNode>) {
        tracing::trace!("Tree changed at {:?}", node.map(|n| n.label.as_str()));
    }
}

impl std::fmt::Debug for ConsoleHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleHost")
            .field("assumed", &self.assumed)
            .field("interactive", &self.interactive)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(assumed: Option<PromptResponse>) -> ConsoleHost {
        ConsoleHost::new(assumed, TerminalMode::Echo).non_interactive()
    }

    #[tokio::test]
    async fn test_assumed_answers() {
        let yes = host(Some(PromptResponse::Yes));
        assert_eq!(yes.prompt("Install?", PromptChoices::YesNo).await, PromptResponse::Yes);

        let never = host(Some(PromptResponse::Suppress));
        assert_eq!(
            never.prompt("Switch?", PromptChoices::YesNoSuppress).await,
            PromptResponse::Suppress
        );
        assert_eq!(never.prompt("Reinstall?", PromptChoices::YesNo).await, PromptResponse::No);
    }

    #[tokio::test]
    async fn test_non_interactive_dismisses() {
        let host = host(None);
        assert_eq!(
            host.prompt("Install?", PromptChoices::YesNo).await,
            PromptResponse::Dismissed
        );
        assert_eq!(host.pick("Pick", &["a".to_string()]).await, None);
        assert_eq!(host.input("Name", ".env", &|_: &str| None).await, None);
    }

    #[tokio::test]
    async fn test_yes_takes_defaults() {
        let host = host(Some(PromptResponse::Yes));
        let items = vec![".env".to_string(), "venv".to_string()];
        assert_eq!(host.pick("Pick", &items).await.as_deref(), Some(".env"));
        assert_eq!(host.input("Name", ".env", &|_: &str| None).await.as_deref(), Some(".env"));

        let rejecting = |_: &str| Some("taken".to_string());
        assert_eq!(host.input("Name", ".env", &rejecting).await, None);
    }

    #[test]
    fn test_terminals_are_reused_by_name() {
        let host = host(None);
        let first = host.create_terminal("QTA - /p", Path::new("/p"));
        first.send_text("export PYTHONPATH=/p");
        let again = host.create_terminal("QTA - /p", Path::new("/p"));
        assert_eq!(again.name(), "QTA - /p");
        assert_eq!(host.terminal("QTA - /p").unwrap().pending().len(), 1);
    }

    #[test]
    fn test_active_editor_is_one_based() {
        let host = host(None);
        assert!(host.active_editor().is_none());
        host.set_active_editor(Path::new("/p/test_a.py"), 0);
        assert_eq!(host.active_editor().unwrap().cursor_line, 1);
    }
}
