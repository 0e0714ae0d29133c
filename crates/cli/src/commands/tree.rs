use anyhow::{Context, Result};
use std::path::Path;

use qta_runner_core::{PromptResponse, TreeNode};

use super::session::{Session, SessionOptions};
use crate::display::format_node;

/// Print the outline of a Python module
pub async fn tree_command(
    file: &Path,
    with_docs: bool,
    json: bool,
    assumed: Option<PromptResponse>,
) -> Result<()> {
    let session = Session::open(file, SessionOptions::new(assumed, true))?.require_cache_root()?;
    session.focus(None);

    if json {
        let document = session.project.parse(&session.target).await.unwrap_or_default();
        let out = serde_json::to_string_pretty(&document).context("Failed to serialize the outline")?;
        println!("{}", out);
        session.close();
        return Ok(());
    }

    let tree = session.workspace.tree();
    let top = tree.top_level().await;
    if top.is_empty() {
        println!("No classes or functions found in {}", session.target.display());
    }

    // Depth-first, keeping declaration order
    let mut stack: Vec<(TreeNode, usize)> = top.into_iter().rev().map(|node| (node, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        println!("{}", format_node(&node, depth, with_docs));
        let children = tree.children(Some(&node)).await;
        stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
    }

    session.close();
    Ok(())
}
