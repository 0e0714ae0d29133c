pub mod decode;
pub mod project_files;

pub use decode::decode_output;
pub use project_files::{
    REQUIREMENTS_FILE, file_mtime_millis, has_requirements, is_python_project, is_qta_project,
};
