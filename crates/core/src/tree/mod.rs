//! Outline tree of classes, test cases, functions and steps

pub mod node;
pub mod provider;

pub use node::{Collapsible, NodeId, NodeKind, OpenAction, TreeNode};
pub use provider::{RootListing, TreeProvider};
