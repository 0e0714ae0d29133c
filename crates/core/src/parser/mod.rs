//! Python module parsing through the project interpreter

pub mod python_parser;
pub mod scripts;

pub use python_parser::{FixedInterpreter, InterpreterSource, PythonParser, cache_key, find_cache_root};
pub use scripts::{HelperScripts, PARSE_FILE_SCRIPT, PARSE_REQUIREMENTS_SCRIPT};
