//! Structured error reporting for the assembler pipeline.
//!
//! Every stage has its own error type. [`AssembleError`] wraps them together
//! with the source location so the CLI can print one uniform line:
//!
//! ```text
//! prog.shasm:10: error: unknown opcode: frobnicate
//! ```

use std::fmt;

use thiserror::Error;

use crate::layout::LayoutError;
use crate::parser::{ParseError, ParseErrorKind};
use crate::symbols::{SymbolError, SymbolErrorKind};

/// A source location for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// File path as given by the caller.
    pub file: String,
    /// 1-indexed line number, or 0 if the error is not tied to a line.
    pub line: usize,
}

impl SourceLocation {
    /// Creates a new source location.
    #[must_use]
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.file)
        } else {
            write!(f, "{}:{}", self.file, self.line)
        }
    }
}

/// The error categories a caller can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// A label was bound twice.
    DuplicateLabel,
    /// A referenced label was never bound.
    UndefinedLabel,
    /// An instruction mnemonic is not in the opcode table.
    UnknownOpcode,
    /// A line does not fit any accepted shape.
    MalformedLine,
    /// I/O, layout, or verification failure.
    Other,
}

/// A unified assembler error with source context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleError {
    /// The kind of error.
    pub kind: AssembleErrorKind,
    /// Source location if available.
    pub location: Option<SourceLocation>,
}

impl AssembleError {
    /// Creates an error without a location.
    #[must_use]
    pub const fn new(kind: AssembleErrorKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    /// Adds a source location to the error.
    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Maps the error onto its category.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match &self.kind {
            AssembleErrorKind::Parse(e) => match e.kind {
                ParseErrorKind::UnknownOpcode(_) => ErrorClass::UnknownOpcode,
                ParseErrorKind::MalformedLine(_) => ErrorClass::MalformedLine,
            },
            AssembleErrorKind::Symbol(e) => match e.kind {
                SymbolErrorKind::DuplicateLabel { .. } => ErrorClass::DuplicateLabel,
                SymbolErrorKind::UndefinedLabel(_) => ErrorClass::UndefinedLabel,
            },
            AssembleErrorKind::Layout(_)
            | AssembleErrorKind::Io(_)
            | AssembleErrorKind::Verify(_) => ErrorClass::Other,
        }
    }

    /// Formats the error for stderr output.
    #[must_use]
    pub fn format_for_stderr(&self) -> String {
        self.location.as_ref().map_or_else(
            || format!("error: {}", self.kind),
            |loc| format!("{loc}: error: {}", self.kind),
        )
    }
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{loc}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for AssembleError {}

impl From<AssembleErrorKind> for AssembleError {
    fn from(kind: AssembleErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<LayoutError> for AssembleError {
    fn from(e: LayoutError) -> Self {
        Self::new(AssembleErrorKind::Layout(e))
    }
}

/// Classification of assembler errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleErrorKind {
    /// Line could not be parsed.
    #[error("{0}")]
    Parse(ParseError),
    /// Label binding or resolution failed.
    #[error("{0}")]
    Symbol(SymbolError),
    /// The program does not fit the output layout.
    #[error("{0}")]
    Layout(LayoutError),
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(String),
    /// The encoded output did not decode back to the program.
    #[error("verification failed: {0}")]
    Verify(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_format() {
        assert_eq!(SourceLocation::new("prog.shasm", 10).to_string(), "prog.shasm:10");
        assert_eq!(SourceLocation::new("prog.shasm", 0).to_string(), "prog.shasm");
    }

    #[test]
    fn error_format_no_location() {
        let error = AssembleError::new(AssembleErrorKind::Io("file not found".into()));
        assert_eq!(
            error.format_for_stderr(),
            "error: I/O error: file not found"
        );
        assert_eq!(error.class(), ErrorClass::Other);
    }

    #[test]
    fn error_format_with_location() {
        let error = AssembleError::new(AssembleErrorKind::Parse(ParseError {
            line: 5,
            kind: ParseErrorKind::UnknownOpcode("nop".into()),
        }))
        .with_location(SourceLocation::new("test.shasm", 5));
        assert_eq!(
            error.format_for_stderr(),
            "test.shasm:5: error: unknown opcode: nop"
        );
        assert_eq!(error.to_string(), "test.shasm:5: unknown opcode: nop");
    }

    #[test]
    fn parse_errors_classify_by_kind() {
        let unknown = AssembleError::new(AssembleErrorKind::Parse(ParseError {
            line: 1,
            kind: ParseErrorKind::UnknownOpcode("x".into()),
        }));
        let malformed = AssembleError::new(AssembleErrorKind::Parse(ParseError {
            line: 1,
            kind: ParseErrorKind::MalformedLine("x".into()),
        }));
        assert_eq!(unknown.class(), ErrorClass::UnknownOpcode);
        assert_eq!(malformed.class(), ErrorClass::MalformedLine);
    }

    #[test]
    fn symbol_errors_classify_by_kind() {
        let duplicate = AssembleError::new(AssembleErrorKind::Symbol(SymbolError {
            kind: SymbolErrorKind::DuplicateLabel {
                name: "a".into(),
                first_definition: 1,
            },
            line: 2,
        }));
        let undefined = AssembleError::new(AssembleErrorKind::Symbol(SymbolError {
            kind: SymbolErrorKind::UndefinedLabel("a".into()),
            line: 2,
        }));
        assert_eq!(duplicate.class(), ErrorClass::DuplicateLabel);
        assert_eq!(undefined.class(), ErrorClass::UndefinedLabel);
    }

    #[test]
    fn layout_error_converts() {
        let error = AssembleError::from(LayoutError::ProgramTooLarge {
            rows: 5,
            max_rows: 2,
        });
        assert!(error.location.is_none());
        assert_eq!(error.class(), ErrorClass::Other);
        assert_eq!(
            error.format_for_stderr(),
            "error: program has 5 rows but the sheet holds at most 2"
        );
    }
}
