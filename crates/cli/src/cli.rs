use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use qta_runner_core::PromptResponse;

use crate::commands::{
    env_command, init_command, install_command, lenses_command, run_command, test_command,
    tree_command, watch_command,
};

#[derive(Parser, Debug)]
#[command(name = "qta-runner")]
#[command(version, about, long_about = None, propagate_version = true)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug    Enable debug logging")]
pub struct Runner {
    #[command(flatten)]
    pub answers: PromptAnswers,

    #[command(subcommand)]
    pub command: Commands,
}

/// Answer environment prompts without asking
#[derive(Args, Debug, Default, Clone, Copy)]
pub struct PromptAnswers {
    /// Answer "yes" to every prompt
    #[arg(short, long, global = true, conflicts_with_all = ["no", "never"])]
    pub yes: bool,

    /// Answer "no" to every prompt
    #[arg(long, global = true, conflicts_with = "never")]
    pub no: bool,

    /// Answer "don't ask again" where offered, "no" elsewhere
    #[arg(long, global = true)]
    pub never: bool,
}

impl PromptAnswers {
    pub fn assumed(&self) -> Option<PromptResponse> {
        if self.yes {
            Some(PromptResponse::Yes)
        } else if self.no {
            Some(PromptResponse::No)
        } else if self.never {
            Some(PromptResponse::Suppress)
        } else {
            None
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the outline of a Python module: classes, test cases, functions and steps
    #[command(visible_alias = "t")]
    Tree {
        /// Path to the Python file
        file: PathBuf,

        /// Show the first docstring line next to each item
        #[arg(long)]
        docs: bool,

        /// Print the parsed module as JSON instead of a tree
        #[arg(long, conflicts_with = "docs")]
        json: bool,
    },
    /// List the "Run QTA testcase" lenses of a module
    Lenses {
        /// Path to the Python file
        file: PathBuf,
    },
    /// Run a script in its project's terminal
    #[command(visible_alias = "r")]
    Run {
        /// Path to the Python file
        file: PathBuf,

        /// Print the terminal lines without executing them
        #[arg(short, long)]
        dry_run: bool,
    },
    /// Run one test case through `manage.py runtest`
    Test {
        /// Path to the test file with the line of the test case (e.g., cases/test_login.py:15)
        target: String,

        /// Name of the test-case class, instead of a line
        #[arg(short, long)]
        class: Option<String>,

        /// Print the terminal lines without executing them
        #[arg(short, long)]
        dry_run: bool,
    },
    /// Check the virtualenv and requirements of a project
    Env {
        /// Project directory (defaults to the current directory)
        dir: Option<PathBuf>,

        /// Print the terminal lines without executing them
        #[arg(short, long)]
        dry_run: bool,
    },
    /// Install requirements.txt into the project's interpreter
    Install {
        /// Project directory (defaults to the current directory)
        dir: Option<PathBuf>,

        /// Print the terminal lines without executing them
        #[arg(short, long)]
        dry_run: bool,
    },
    /// Write the default .vscode/settings.json of a project
    Init {
        /// Project directory (defaults to the current directory)
        dir: Option<PathBuf>,

        /// Overwrite existing settings
        #[arg(short, long)]
        force: bool,
    },
    /// Watch requirements.txt and the project settings until interrupted
    Watch {
        /// Project directory (defaults to the current directory)
        dir: Option<PathBuf>,
    },
}

fn dir_or_cwd(dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(|| PathBuf::from("."))
}

impl Runner {
    pub async fn execute(self) -> Result<()> {
        let assumed = self.answers.assumed();
        self.command.execute(assumed).await
    }
}

impl Commands {
    /// Execute the command
    pub async fn execute(self, assumed: Option<PromptResponse>) -> Result<()> {
        tracing::debug!("Executing {:?}", self);

        match self {
            Commands::Tree { file, docs, json } => tree_command(&file, docs, json, assumed).await,
            Commands::Lenses { file } => lenses_command(&file, assumed).await,
            Commands::Run { file, dry_run } => run_command(&file, dry_run, assumed).await,
            Commands::Test {
                target,
                class,
                dry_run,
            } => test_command(&target, class.as_deref(), dry_run, assumed).await,
            Commands::Env { dir, dry_run } => env_command(&dir_or_cwd(dir), dry_run, assumed).await,
            Commands::Install { dir, dry_run } => {
                install_command(&dir_or_cwd(dir), dry_run, assumed).await
            }
            Commands::Init { dir, force } => init_command(&dir_or_cwd(dir), force, assumed),
            Commands::Watch { dir } => watch_command(&dir_or_cwd(dir), assumed).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_test_command() {
        let runner =
            Runner::try_parse_from(["qta-runner", "test", "cases/test_login.py:15", "-d"]).unwrap();
        match runner.command {
            Commands::Test {
                target,
                class,
                dry_run,
            } => {
                assert_eq!(target, "cases/test_login.py:15");
                assert_eq!(class, None);
                assert!(dry_run);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(runner.answers.assumed(), None);
    }

    #[test]
    fn test_global_answers() {
        let runner = Runner::try_parse_from(["qta-runner", "env", "--yes"]).unwrap();
        assert_eq!(runner.answers.assumed(), Some(PromptResponse::Yes));
        assert!(matches!(runner.command, Commands::Env { dir: None, dry_run: false }));

        let runner = Runner::try_parse_from(["qta-runner", "--never", "tree", "a.py"]).unwrap();
        assert_eq!(runner.answers.assumed(), Some(PromptResponse::Suppress));
    }

    #[test]
    fn test_answers_conflict() {
        assert!(Runner::try_parse_from(["qta-runner", "--yes", "--no", "env"]).is_err());
    }

    #[test]
    fn test_aliases() {
        let runner = Runner::try_parse_from(["qta-runner", "t", "a.py", "--docs"]).unwrap();
        assert!(matches!(runner.command, Commands::Tree { docs: true, .. }));
        let runner = Runner::try_parse_from(["qta-runner", "r", "a.py"]).unwrap();
        assert!(matches!(runner.command, Commands::Run { dry_run: false, .. }));
    }
}
