use anyhow::{Context, Result};
use std::path::Path;

use qta_runner_core::{PromptResponse, RequirementsStatus};

use super::session::{Session, SessionOptions};

/// Check the project's virtualenv and requirements, offering to fix them
pub async fn env_command(dir: &Path, dry_run: bool, assumed: Option<PromptResponse>) -> Result<()> {
    let session = Session::open(dir, SessionOptions::new(assumed, dry_run))?;
    let project = session.project.clone();
    println!("📁 Project: {}", project.root().display());

    let checked = project
        .ensure_env()
        .await
        .context("Failed to check the environment");

    match project.env().env_path() {
        Some(env_path) => println!("🐍 Virtualenv: {}", env_path.display()),
        None => println!("🐍 No virtualenv in use"),
    }
    println!("   Interpreter: {}", project.python_path().display());

    // `ensure_env` stops early when no env is in use or prompts are suppressed
    let status = match project.env().last_requirements() {
        Some(status) => status,
        None => project.env().check_requirements().await,
    };
    println!("{}", requirements_line(status));

    // Run whatever the checks queued (activation, virtualenv creation, pip)
    project.terminal().show();
    session.close();
    checked
}

fn requirements_line(status: RequirementsStatus) -> &'static str {
    match status {
        RequirementsStatus::Satisfied => "✅ Requirements satisfied",
        RequirementsStatus::Unsatisfied => "⚠️  Requirements not satisfied",
        RequirementsStatus::Unknown => "❔ No requirements file",
    }
}
