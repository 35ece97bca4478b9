//! Top-level assembler pipeline.
//!
//! This module wires the phases together:
//!
//! 1. **Pass 1**: every line is classified and fed into an
//!    [`AssemblerState`], which appends rows, binds labels, and records a
//!    [`LabelReference`] for each symbolic operand.
//! 2. **Pass 2**: [`backpatch`] resolves the recorded references against the
//!    finished symbol table.
//!
//! Row 0 is the bootstrap row. It holds a single reference to
//! [`ENTRY_LABEL`], so every program must define `_start`.
//!
//! A label binds to the index of the last row already emitted. The VM
//! increments its program counter before fetching, so jumping to a label
//! resumes execution at the row that follows the label in the source.

use std::path::Path;

use tracing::{debug, trace};

use crate::codec::{decode_row, encode_row, word_bits};
use crate::errors::{AssembleError, AssembleErrorKind, SourceLocation};
use crate::parser::{parse_line, Operand, ParsedLine, DEFAULT_COMMENT_MARKER};
use crate::source::{extract_source, load_source, SourceContent};
use crate::symbols::{backpatch, LabelReference, Row, SymbolError, SymbolTable};

/// Label the bootstrap row points at.
pub const ENTRY_LABEL: &str = "_start";

/// Line number recorded for the bootstrap row and its reference.
const BOOTSTRAP_LINE: usize = 0;

/// File name used in error locations for in-memory sources.
const INLINE_SOURCE_NAME: &str = "<input>";

/// Assembler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerConfig {
    /// Tokens starting with this character end the line.
    pub comment_marker: char,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            comment_marker: DEFAULT_COMMENT_MARKER,
        }
    }
}

/// An entry in the row-to-source listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Row index in the program matrix.
    pub row: usize,
    /// Source line that produced the row (0 for the bootstrap row).
    pub line: usize,
    /// Source line text.
    pub source: String,
    /// Final cell values.
    pub cells: Row,
}

/// A fully resolved program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// The program matrix.
    pub rows: Vec<Row>,
    /// Every label bound during the scan.
    pub symbols: SymbolTable,
    /// One entry per row, in row order.
    pub listing: Vec<ListingEntry>,
}

impl Assembly {
    /// Number of rows, including the bootstrap row.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Encodes every row into its chunk cells.
    #[must_use]
    pub fn encoded_rows(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(|row| encode_row(row)).collect()
    }

    /// Checks that `encoded` decodes back to this program's words.
    ///
    /// # Errors
    ///
    /// Returns a `Verify` error naming the first row that fails to decode or
    /// decodes to different words.
    pub fn verify(&self, encoded: &[Vec<String>]) -> Result<(), AssembleError> {
        if encoded.len() != self.rows.len() {
            return Err(verify_error(format!(
                "expected {} encoded rows, found {}",
                self.rows.len(),
                encoded.len()
            )));
        }

        for (index, (row, chunks)) in self.rows.iter().zip(encoded).enumerate() {
            let words = decode_row(chunks.iter().map(String::as_str))
                .map_err(|e| verify_error(format!("row {index}: {e}")))?;
            let expected: Vec<u32> = row.iter().copied().map(word_bits).collect();
            if words != expected {
                return Err(verify_error(format!(
                    "row {index} decodes to {words:?}, expected {expected:?}"
                )));
            }
        }

        debug!(rows = self.rows.len(), "encoding verified");
        Ok(())
    }
}

struct RowOrigin {
    line: usize,
    source: String,
}

/// Pass 1 state for a single assembly run.
pub struct AssemblerState {
    rows: Vec<Row>,
    origins: Vec<RowOrigin>,
    symbols: SymbolTable,
    references: Vec<LabelReference>,
}

impl Default for AssemblerState {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblerState {
    /// Creates a state holding only the bootstrap row.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: vec![vec![0]],
            origins: vec![RowOrigin {
                line: BOOTSTRAP_LINE,
                source: String::new(),
            }],
            symbols: SymbolTable::new(),
            references: vec![LabelReference {
                label: ENTRY_LABEL.to_string(),
                row: 0,
                column: 0,
                line: BOOTSTRAP_LINE,
            }],
        }
    }

    /// Applies one classified line.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateLabel` if the line binds a name that is already
    /// bound.
    pub fn feed(&mut self, parsed: ParsedLine, line: usize, source: &str) -> Result<(), SymbolError> {
        match parsed {
            ParsedLine::Blank => Ok(()),
            ParsedLine::Label { name } => self.bind(&name, line),
            ParsedLine::Assignment { name, values } => {
                self.bind(&name, line)?;
                self.push_row(Vec::with_capacity(values.len()), &values, line, source);
                Ok(())
            }
            ParsedLine::Instruction { opcode, operands } => {
                trace!(%opcode, line, "instruction");
                let mut row = Vec::with_capacity(operands.len() + 1);
                row.push(i64::from(opcode.code()));
                self.push_row(row, &operands, line, source);
                Ok(())
            }
        }
    }

    /// Rows emitted so far.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// References waiting for pass 2.
    #[must_use]
    pub fn pending_references(&self) -> usize {
        self.references.len()
    }

    /// Runs pass 2 and produces the final program.
    ///
    /// # Errors
    ///
    /// Returns `UndefinedLabel` for the first reference to a name that was
    /// never bound.
    pub fn finish(self) -> Result<Assembly, SymbolError> {
        let rows = backpatch(self.rows, &self.references, &self.symbols)?;
        let listing = rows
            .iter()
            .zip(self.origins)
            .enumerate()
            .map(|(row, (cells, origin))| ListingEntry {
                row,
                line: origin.line,
                source: origin.source,
                cells: cells.clone(),
            })
            .collect();

        Ok(Assembly {
            rows,
            symbols: self.symbols,
            listing,
        })
    }

    fn bind(&mut self, name: &str, line: usize) -> Result<(), SymbolError> {
        // Row 0 always exists.
        let row = self.rows.len() - 1;
        self.symbols.bind(name, row, line)
    }

    fn push_row(&mut self, mut row: Row, operands: &[Operand], line: usize, source: &str) {
        let index = self.rows.len();
        self.emit_operands(&mut row, operands, index, line);
        trace!(row = index, line, cells = ?row, "row emitted");
        self.rows.push(row);
        self.origins.push(RowOrigin {
            line,
            source: source.trim().to_string(),
        });
    }

    /// Appends operand values to `row`, leaving a zero placeholder and a
    /// pending reference for each label operand.
    fn emit_operands(&mut self, row: &mut Row, operands: &[Operand], row_index: usize, line: usize) {
        for operand in operands {
            match operand {
                Operand::Literal(value) => row.push(*value),
                Operand::Label(label) => {
                    self.references.push(LabelReference {
                        label: label.clone(),
                        row: row_index,
                        column: row.len(),
                        line,
                    });
                    row.push(0);
                }
            }
        }
    }
}

/// Assembles already loaded source.
///
/// # Errors
///
/// Returns the first parse or symbol error, located at its source line.
pub fn assemble_source(
    content: &SourceContent,
    config: &AssemblerConfig,
) -> Result<Assembly, AssembleError> {
    let locate = |line: usize| SourceLocation::new(content.file_path.as_str(), line);

    let mut state = AssemblerState::new();
    for line in &content.lines {
        let parsed = parse_line(&line.text, line.original_line, config.comment_marker)
            .map_err(|e| {
                AssembleError::new(AssembleErrorKind::Parse(e))
                    .with_location(locate(line.original_line))
            })?;
        state
            .feed(parsed, line.original_line, &line.text)
            .map_err(|e| {
                AssembleError::new(AssembleErrorKind::Symbol(e))
                    .with_location(locate(line.original_line))
            })?;
    }

    debug!(
        file = %content.file_path,
        rows = state.row_count(),
        references = state.pending_references(),
        "pass 1 complete"
    );

    state.finish().map_err(|e| {
        let line = e.line;
        AssembleError::new(AssembleErrorKind::Symbol(e)).with_location(locate(line))
    })
}

/// Assembles source text held in memory.
///
/// # Errors
///
/// See [`assemble_source`].
pub fn assemble_str(source: &str, config: &AssemblerConfig) -> Result<Assembly, AssembleError> {
    assemble_source(&extract_source(Path::new(INLINE_SOURCE_NAME), source), config)
}

/// Assembles a source file.
///
/// # Errors
///
/// Returns an `Io` error if the file cannot be read, otherwise see
/// [`assemble_source`].
pub fn assemble(path: &Path, config: &AssemblerConfig) -> Result<Assembly, AssembleError> {
    let content = load_source(path).map_err(|e| {
        AssembleError::new(AssembleErrorKind::Io(format!(
            "failed to read {}: {e}",
            path.display()
        )))
    })?;
    assemble_source(&content, config)
}

fn verify_error(message: String) -> AssembleError {
    AssembleError::new(AssembleErrorKind::Verify(message))
}
