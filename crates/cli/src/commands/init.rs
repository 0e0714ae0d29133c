use anyhow::{Context, Result};
use std::path::Path;

use qta_runner_core::PromptResponse;

use super::session::{Session, SessionOptions};

/// Write the project's default `.vscode/settings.json`
pub fn init_command(dir: &Path, force: bool, assumed: Option<PromptResponse>) -> Result<()> {
    let session = Session::open(dir, SessionOptions::new(assumed, true))?;
    let settings_path = session.project.env().settings().path();

    let written = session
        .project
        .update_settings(force)
        .with_context(|| format!("Failed to write {}", settings_path.display()))?;
    session.close();

    if written {
        println!("✅ Created settings: {}", settings_path.display());
    } else {
        println!("❌ Settings already exist at: {}", settings_path.display());
        println!("   Use --force to overwrite");
    }
    Ok(())
}
