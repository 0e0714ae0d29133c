use anyhow::{Result, bail};
use std::path::Path;
use tracing::{debug, info};

use qta_runner_core::{PromptResponse, QtaCommand, RunTarget};

use super::session::{Session, SessionOptions};

/// Run a script in its project's terminal
pub async fn run_command(file: &Path, dry_run: bool, assumed: Option<PromptResponse>) -> Result<()> {
    debug!("Running script: {}", file.display());

    let session = Session::open(file, SessionOptions::new(assumed, dry_run))?;
    let target = RunTarget::Path(session.target.clone());
    let sent = session.workspace.execute(QtaCommand::Run(Some(target))).await;
    session.close();

    match sent? {
        Some(line) => {
            info!("Ran: {}", line);
            Ok(())
        }
        None => bail!("Nothing was run"),
    }
}
