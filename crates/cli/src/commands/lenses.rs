use anyhow::Result;
use std::path::Path;

use qta_runner_core::PromptResponse;

use super::session::{Session, SessionOptions};
use crate::display::format_lens;

/// Print the "run test case" lenses of a module
pub async fn lenses_command(file: &Path, assumed: Option<PromptResponse>) -> Result<()> {
    let session = Session::open(file, SessionOptions::new(assumed, true))?.require_cache_root()?;
    session.focus(None);

    if !session.workspace.context().config.enable_code_lens {
        println!("Code lenses are disabled (enable_code_lens = false)");
        session.close();
        return Ok(());
    }

    session.workspace.tree().top_level().await;
    let lenses = session.workspace.provide_lenses(&session.target).await;
    if lenses.is_empty() {
        println!("No test cases in {}", session.target.display());
    }
    for lens in &lenses {
        println!("{}", format_lens(lens));
    }

    session.close();
    Ok(())
}
