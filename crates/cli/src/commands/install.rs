use anyhow::Result;
use std::path::Path;

use qta_runner_core::PromptResponse;
use qta_runner_core::utils::has_requirements;

use super::session::{Session, SessionOptions};

/// Install `requirements.txt` into the project's interpreter
pub async fn install_command(dir: &Path, dry_run: bool, assumed: Option<PromptResponse>) -> Result<()> {
    let session = Session::open(dir, SessionOptions::new(assumed, dry_run))?;
    let project = session.project.clone();

    if !has_requirements(project.root()) {
        println!("❌ No requirements.txt in {}", project.root().display());
        session.close();
        return Ok(());
    }

    println!("📦 Installing requirements for {}", project.root().display());
    project.env().activate_env();
    project.install_requirements();
    project.terminal().show();
    session.close();
    Ok(())
}
