use anyhow::{Context, Result};
use std::path::Path;

use qta_runner_core::PromptResponse;

use super::session::{Session, SessionOptions};

/// Keep the project's environment in sync with `requirements.txt` and its settings
pub async fn watch_command(dir: &Path, assumed: Option<PromptResponse>) -> Result<()> {
    let session = Session::open(dir, SessionOptions::new(assumed, false))?;
    let project = session.project.clone();

    project.terminal().show();
    project.init().await.context("Failed to set up the environment")?;
    project.start_watching();
    if !project.is_watching() {
        session.close();
        anyhow::bail!("Cannot watch {}", project.root().display());
    }

    println!("👀 Watching {} (Ctrl+C to stop)", project.root().display());
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    println!("Stopping");
    session.close();
    Ok(())
}
