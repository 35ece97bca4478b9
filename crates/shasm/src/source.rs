//! Source ingestion for shasm programs.
//!
//! Lines keep their original 1-indexed numbers so errors and listings can
//! point back into the file.

use std::fs;
use std::io;
use std::path::Path;

/// A line of source with its original location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// The source text (without trailing newline).
    pub text: String,
    /// 1-indexed line number in the original file.
    pub original_line: usize,
}

/// Source content loaded from an input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContent {
    /// All source lines in file order.
    pub lines: Vec<SourceLine>,
    /// The file path (for error reporting).
    pub file_path: String,
}

/// Splits `content` into numbered lines.
///
/// Both `\n` and `\r\n` line endings are accepted.
#[must_use]
pub fn extract_source(file_path: &Path, content: &str) -> SourceContent {
    SourceContent {
        lines: split_lines(content),
        file_path: file_path.to_string_lossy().to_string(),
    }
}

/// Reads and splits a source file.
///
/// # Errors
///
/// Returns the underlying I/O error if the file cannot be read or is not
/// valid UTF-8.
pub fn load_source(path: &Path) -> io::Result<SourceContent> {
    let content = fs::read_to_string(path)?;
    Ok(extract_source(path, &content))
}

fn split_lines(content: &str) -> Vec<SourceLine> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| SourceLine {
            text: line.to_string(),
            original_line: idx + 1,
        })
        .collect()
}
