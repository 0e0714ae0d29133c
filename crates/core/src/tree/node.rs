use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::types::{
    ClassInfo, ControlInfo, FunctionInfo, LineRange, StaticField, StepInfo,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        NodeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collapsible {
    None,
    Collapsed,
}

/// Jump to `line` of `path` when the node is activated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAction {
    pub path: PathBuf,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Class {
        is_testcase: bool,
        static_fields: Vec<StaticField>,
        functions: Vec<FunctionInfo>,
        controls: Vec<ControlInfo>,
    },
    StaticField,
    Control,
    Function {
        /// Owning class for methods
        class: Option<String>,
        steps: Vec<StepInfo>,
    },
    Step,
}

/// One entry of the outline tree.
///
/// Nodes are rebuilt on every refresh. Clones share the tooltip, so a
/// tooltip resolved by the enrichment task is visible through every copy.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: NodeId,
    pub project_root: PathBuf,
    pub file: PathBuf,
    pub label: String,
    pub docstring: String,
    pub lines: LineRange,
    pub action: Option<OpenAction>,
    pub collapsible: Collapsible,
    pub kind: NodeKind,
    tooltip: Arc<OnceLock<String>>,
}

impl TreeNode {
    fn build(
        root: &Path,
        file: &Path,
        label: &str,
        docstring: &str,
        lines: LineRange,
        collapsible: Collapsible,
        kind: NodeKind,
    ) -> Self {
        Self {
            id: NodeId::next(),
            project_root: root.to_path_buf(),
            file: file.to_path_buf(),
            label: label.to_string(),
            docstring: docstring.to_string(),
            action: Some(OpenAction {
                path: file.to_path_buf(),
                line: lines.start,
            }),
            lines,
            collapsible,
            kind,
            tooltip: Arc::new(OnceLock::new()),
        }
    }

    pub fn class(root: &Path, file: &Path, class: &ClassInfo) -> Self {
        Self::build(
            root,
            file,
            &class.name,
            &class.docstring,
            class.line_range(),
            Collapsible::Collapsed,
            NodeKind::Class {
                is_testcase: class.is_testcase,
                static_fields: class.static_fields.clone(),
                functions: class.functions.clone(),
                controls: class.controls.clone(),
            },
        )
    }

    pub fn function(root: &Path, file: &Path, function: &FunctionInfo, class: Option<&str>) -> Self {
        let collapsible = if function.steps.is_empty() {
            Collapsible::None
        } else {
            Collapsible::Collapsed
        };
        Self::build(
            root,
            file,
            &function.name,
            &function.docstring,
            LineRange::new(function.line, function.endline.max(function.line)),
            collapsible,
            NodeKind::Function {
                class: class.map(str::to_string),
                steps: function.steps.clone(),
            },
        )
    }

    /// The field's value doubles as its docstring
    pub fn static_field(root: &Path, file: &Path, field: &StaticField) -> Self {
        Self::build(
            root,
            file,
            field.name(),
            field.value(),
            LineRange::single(field.line()),
            Collapsible::None,
            NodeKind::StaticField,
        )
    }

    /// The control's type name doubles as its docstring
    pub fn control(root: &Path, file: &Path, control: &ControlInfo) -> Self {
        Self::build(
            root,
            file,
            &control.name,
            control.type_name().unwrap_or_default(),
            LineRange::new(control.line, control.endline.max(control.line)),
            Collapsible::None,
            NodeKind::Control,
        )
    }

    pub fn step(root: &Path, file: &Path, step: &StepInfo) -> Self {
        Self::build(
            root,
            file,
            &step.name,
            &step.docstring,
            LineRange::new(step.line, step.endline.max(step.line)),
            Collapsible::None,
            NodeKind::Step,
        )
    }

    /// Resolved tooltip, or the label until enrichment has run
    pub fn tooltip(&self) -> &str {
        self.tooltip.get().map(String::as_str).unwrap_or(&self.label)
    }

    pub fn is_complete(&self) -> bool {
        self.tooltip.get().is_some()
    }

    /// Settle the tooltip: the docstring, else the label
    pub fn resolve_tooltip(&self) -> &str {
        self.tooltip.get_or_init(|| {
            if self.docstring.is_empty() {
                self.label.clone()
            } else {
                self.docstring.clone()
            }
        })
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, NodeKind::Class { .. })
    }

    pub fn is_testcase(&self) -> bool {
        matches!(self.kind, NodeKind::Class { is_testcase: true, .. })
    }

    /// Controls, static fields, then functions of a class; steps of a function
    pub fn children(&self) -> Vec<TreeNode> {
        let (root, file) = (self.project_root.as_path(), self.file.as_path());
        match &self.kind {
            NodeKind::Class {
                static_fields,
                functions,
                controls,
                ..
            } => controls
                .iter()
                .map(|c| TreeNode::control(root, file, c))
                .chain(static_fields.iter().map(|f| TreeNode::static_field(root, file, f)))
                .chain(
                    functions
                        .iter()
                        .map(|f| TreeNode::function(root, file, f, Some(&self.label))),
                )
                .collect(),
            NodeKind::Function { steps, .. } => steps
                .iter()
                .map(|s| TreeNode::step(root, file, s))
                .collect(),
            NodeKind::StaticField | NodeKind::Control | NodeKind::Step => Vec::new(),
        }
    }
}

impl PartialEq for TreeNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
