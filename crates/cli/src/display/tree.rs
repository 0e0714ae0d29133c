use qta_runner_core::{CodeLens, NodeKind, TreeNode};

pub fn node_icon(node: &TreeNode) -> &'static str {
    match &node.kind {
        NodeKind::Class { is_testcase: true, .. } => "🧪",
        NodeKind::Class { .. } => "📦",
        NodeKind::Function { class: Some(_), .. } => "🔧",
        NodeKind::Function { class: None, .. } => "ƒ",
        NodeKind::StaticField => "📌",
        NodeKind::Control => "🎛",
        NodeKind::Step => "👣",
    }
}

/// One line of the outline: indent, icon, label and line range
pub fn format_node(node: &TreeNode, depth: usize, with_docs: bool) -> String {
    let lines = if node.lines.start == node.lines.end {
        format!("L{}", node.lines.start)
    } else {
        format!("L{}-{}", node.lines.start, node.lines.end)
    };
    let mut out = format!(
        "{}{} {} ({})",
        "   ".repeat(depth),
        node_icon(node),
        node.label,
        lines
    );

    if with_docs {
        let tooltip = node.resolve_tooltip();
        if tooltip != node.label {
            let first_line = tooltip.lines().next().unwrap_or_default().trim();
            out.push_str(&format!("  # {}", first_line));
        }
    }
    out
}

/// Lens line numbers are 0-based; print them the way editors show them
pub fn format_lens(lens: &CodeLens) -> String {
    format!(
        "L{:<5} ▶ {}  {}",
        lens.line + 1,
        lens.title,
        lens.testcase.label
    )
}
