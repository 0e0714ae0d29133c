//! Terminals backed by a real shell, or by stdout for dry runs

use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use qta_runner_core::{Platform, Terminal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalMode {
    /// Feed lines to a persistent shell
    Shell,
    /// Print lines instead of running them
    Echo,
}

#[derive(Default)]
struct TerminalState {
    /// Lines sent before the terminal was first shown
    pending: Vec<String>,
    shown: bool,
    shell: Option<Child>,
    stdin: Option<ChildStdin>,
}

/// A named terminal rooted at a project.
///
/// Nothing runs until the terminal is shown: listing a tree never starts a
/// shell, while running a script flushes the queued setup lines first.
pub struct ConsoleTerminal {
    name: String,
    cwd: PathBuf,
    mode: TerminalMode,
    state: Mutex<TerminalState>,
}

impl ConsoleTerminal {
    pub fn new(name: impl Into<String>, cwd: &Path, mode: TerminalMode) -> Self {
        Self {
            name: name.into(),
            cwd: cwd.to_path_buf(),
            mode,
            state: Mutex::new(TerminalState::default()),
        }
    }

    pub fn mode(&self) -> TerminalMode {
        self.mode
    }

    pub fn is_shown(&self) -> bool {
        self.state.lock().shown
    }

    /// Lines waiting for the terminal to be shown
    pub fn pending(&self) -> Vec<String> {
        self.state.lock().pending.clone()
    }

    fn spawn_shell(&self) -> std::io::Result<Child> {
        let mut command = match Platform::current() {
            Platform::Windows => {
                let mut cmd = Command::new("cmd");
                cmd.arg("/Q");
                cmd
            }
            Platform::Unix => {
                let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
                Command::new(shell)
            }
        };
        command
            .current_dir(&self.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
    }

    fn write_line(&self, state: &mut TerminalState, line: &str) {
        match self.mode {
            TerminalMode::Echo => println!("{}", line),
            TerminalMode::Shell => {
                let Some(stdin) = state.stdin.as_mut() else {
                    tracing::warn!("Terminal {} has no shell, dropping: {}", self.name, line);
                    return;
                };
                if let Err(e) = writeln!(stdin, "{}", line).and_then(|_| stdin.flush()) {
                    tracing::error!("Failed to write to terminal {}: {}", self.name, e);
                }
            }
        }
    }
}

impl Terminal for ConsoleTerminal {
    fn name(&self) -> &str {
        &self.name
    }

    fn show(&self) {
        let mut state = self.state.lock();
        if state.shown {
            return;
        }
        state.shown = true;

        if self.mode == TerminalMode::Shell {
            match self.spawn_shell() {
                Ok(mut child) => {
                    tracing::debug!("Started shell for {} in {}", self.name, self.cwd.display());
                    state.stdin = child.stdin.take();
                    state.shell = Some(child);
                }
                Err(e) => tracing::error!("Failed to start a shell for {}: {}", self.name, e),
            }
        }

        let pending = std::mem::take(&mut state.pending);
        for line in &pending {
            self.write_line(&mut state, line);
        }
    }

    fn send_text(&self, text: &str) {
        let mut state = self.state.lock();
        if state.shown {
            self.write_line(&mut state, text);
        } else {
            state.pending.push(text.to_string());
        }
    }

    /// Let the shell finish what it was sent, then wait for it
    fn close(&self) {
        let mut state = self.state.lock();
        state.pending.clear();
        drop(state.stdin.take());
        if let Some(mut shell) = state.shell.take() {
            match shell.wait() {
                Ok(status) => tracing::debug!("Terminal {} exited with {}", self.name, status),
                Err(e) => tracing::warn!("Failed to wait for terminal {}: {}", self.name, e),
            }
        }
    }
}

impl Drop for ConsoleTerminal {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_wait_until_shown() {
        let terminal = ConsoleTerminal::new("QTA - /p", Path::new("/p"), TerminalMode::Echo);
        terminal.send_text("export PYTHONPATH=/p");
        terminal.send_text("python a.py");
        assert!(!terminal.is_shown());
        assert_eq!(terminal.pending(), ["export PYTHONPATH=/p", "python a.py"]);

        terminal.show();
        assert!(terminal.is_shown());
        assert!(terminal.pending().is_empty());
    }

    #[test]
    fn test_close_discards_unshown_lines() {
        let terminal = ConsoleTerminal::new("QTA - /p", Path::new("/p"), TerminalMode::Shell);
        terminal.send_text("export PYTHONPATH=/p");
        terminal.close();
        assert!(terminal.pending().is_empty());
        assert!(!terminal.is_shown());
    }
}
