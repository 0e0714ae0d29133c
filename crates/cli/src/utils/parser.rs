use std::path::PathBuf;

/// Split `path[:line]`; the line stays 1-based and must be positive
pub fn parse_filepath_with_line(filepath_arg: &str) -> (PathBuf, Option<u32>) {
    if let Some(colon_pos) = filepath_arg.rfind(':') {
        let path_part = &filepath_arg[..colon_pos];
        let line_part = &filepath_arg[colon_pos + 1..];

        match line_part.parse::<u32>() {
            Ok(line) if line > 0 && !path_part.is_empty() => (PathBuf::from(path_part), Some(line)),
            // Not a line number (e.g. a Windows drive letter), keep the whole argument
            _ => (PathBuf::from(filepath_arg), None),
        }
    } else {
        (PathBuf::from(filepath_arg), None)
    }
}
