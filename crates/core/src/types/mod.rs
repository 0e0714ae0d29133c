pub mod document;
pub mod line_range;
pub mod platform;

// Re-export commonly used types
pub use document::{ClassInfo, ControlInfo, FunctionInfo, ParsedDocument, StaticField, StepInfo};
pub use line_range::LineRange;
pub use platform::{ACTIVATION_MARKER, Platform};
