pub mod tree;

pub use tree::{format_lens, format_node, node_icon};
