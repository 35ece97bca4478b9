//! Symbol table and label backpatching.
//!
//! Labels are bound during the single forward scan. Every operand that names
//! a label leaves a [`LabelReference`] behind, and [`backpatch`] fills those
//! cells in once the scan is complete. Forward and backward references are
//! therefore equally valid; only names that are never bound fail.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, trace};

/// One row of the program matrix.
pub type Row = Vec<i64>;

/// A bound label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// Row index the label resolves to.
    pub row: usize,
    /// Source line where the label was defined (0 for built-ins).
    pub defined_at: usize,
}

/// Label name to row bindings for one assembly run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

/// A cell waiting for a label's row index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelReference {
    /// The referenced label.
    pub label: String,
    /// Row of the cell to patch.
    pub row: usize,
    /// Column of the cell to patch.
    pub column: usize,
    /// Source line of the operand (0 for the bootstrap entry).
    pub line: usize,
}

/// Error during label binding or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct SymbolError {
    /// Kind of error.
    pub kind: SymbolErrorKind,
    /// Source line where the error occurred.
    pub line: usize,
}

/// Classification of symbol errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolErrorKind {
    /// A name was bound a second time.
    #[error("duplicate label '{name}' (first defined at line {first_definition})")]
    DuplicateLabel {
        /// The label name.
        name: String,
        /// Line of the first definition.
        first_definition: usize,
    },
    /// A referenced name was never bound.
    #[error("undefined label: {0}")]
    UndefinedLabel(String),
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `row`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateLabel` if `name` is already bound.
    pub fn bind(&mut self, name: &str, row: usize, line: usize) -> Result<(), SymbolError> {
        if let Some(existing) = self.symbols.get(name) {
            return Err(SymbolError {
                kind: SymbolErrorKind::DuplicateLabel {
                    name: name.to_string(),
                    first_definition: existing.defined_at,
                },
                line,
            });
        }

        debug!(label = name, row, line, "label bound");
        self.symbols.insert(
            name.to_string(),
            Symbol {
                row,
                defined_at: line,
            },
        );
        Ok(())
    }

    /// Looks up a label.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Number of bound labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true if no label is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterates over all bindings in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.symbols.iter().map(|(name, symbol)| (name.as_str(), symbol))
    }
}

/// Resolves every pending reference against the finished symbol table.
///
/// Consumes the draft rows and returns them with each referenced cell set to
/// its label's row index. References are checked in the order given, so the
/// reported error is the first unresolved use.
///
/// # Errors
///
/// Returns `UndefinedLabel` if any reference names an unbound label.
///
/// # Panics
///
/// Panics if a reference points outside `rows`. References are only ever
/// recorded for cells that were written in the same pass.
#[allow(clippy::cast_possible_wrap)]
pub fn backpatch(
    mut rows: Vec<Row>,
    references: &[LabelReference],
    symbols: &SymbolTable,
) -> Result<Vec<Row>, SymbolError> {
    for reference in references {
        let symbol = symbols.get(&reference.label).ok_or_else(|| SymbolError {
            kind: SymbolErrorKind::UndefinedLabel(reference.label.clone()),
            line: reference.line,
        })?;

        trace!(
            label = %reference.label,
            row = reference.row,
            column = reference.column,
            target = symbol.row,
            "reference patched"
        );
        rows[reference.row][reference.column] = symbol.row as i64;
    }

    debug!(references = references.len(), "backpatch complete");
    Ok(rows)
}
