//! Output grid layout.
//!
//! The plain layout writes one line per program row, with one cell per
//! chunk. The sheet layout wraps the program in the scaffolding the
//! spreadsheet VM reads:
//!
//! ```text
//!        col 0          col 1          col 2..
//! row 0  run            FALSE
//! row 1  pc             0
//! row 2  out            <output formula>
//! row 3  live           initial
//! row 4  <step formula> <chunk 0>      <chunk 1> ...   program row 0
//! row 5  <step formula> <chunk 0>      ...             program row 1
//! ...                                                  up to max_rows
//! ```
//!
//! Formula text comes from outside the assembler and is never interpreted.
//! It is collapsed onto one line and every `{{ROW}}` is replaced with the
//! 1-based sheet row the formula lands in.

use thiserror::Error;
use tracing::debug;

/// Token in formula templates replaced by the destination sheet row.
pub const ROW_PLACEHOLDER: &str = "{{ROW}}";

/// Grid row where program row 0 is placed.
pub const PROGRAM_OFFSET: usize = 4;

/// Default number of band rows in the sheet layout.
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// Largest band the sheet layout will render.
pub const MAX_BAND_ROWS: usize = 1_000_000;

const OUTPUT_ROW: usize = 2;

const STEP_COLUMN: usize = 0;
const FIRST_CHUNK_COLUMN: usize = 1;
const MIN_WIDTH: usize = 2;

const RUN_FLAG_INITIAL: &str = "FALSE";
const PC_INITIAL: &str = "0";

/// Error while laying out the output grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The program has more rows than the sheet band holds.
    #[error("program has {rows} rows but the sheet holds at most {max_rows}")]
    ProgramTooLarge {
        /// Rows in the assembled program.
        rows: usize,
        /// Configured band size.
        max_rows: usize,
    },
    /// The configured band size is zero or above [`MAX_BAND_ROWS`].
    #[error("sheet band of {max_rows} rows is outside 1..={limit}")]
    BandSize {
        /// Configured band size.
        max_rows: usize,
        /// Largest accepted band size.
        limit: usize,
    },
}

/// Formula text and sizing for the sheet layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    /// Per-row step formula placed in the live column.
    pub step_formula: String,
    /// Formula that reads back the program's output.
    pub output_formula: String,
    /// Number of band rows emitted below the control rows.
    pub max_rows: usize,
}

impl SheetLayout {
    /// Creates a sheet layout with [`DEFAULT_MAX_ROWS`] band rows.
    #[must_use]
    pub fn new(step_formula: impl Into<String>, output_formula: impl Into<String>) -> Self {
        Self {
            step_formula: step_formula.into(),
            output_formula: output_formula.into(),
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    /// Overrides the band size.
    #[must_use]
    pub const fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    fn render(&self, encoded_rows: &[Vec<String>]) -> Result<Grid, LayoutError> {
        let band_error = LayoutError::BandSize {
            max_rows: self.max_rows,
            limit: MAX_BAND_ROWS,
        };
        if !(1..=MAX_BAND_ROWS).contains(&self.max_rows) {
            return Err(band_error);
        }
        let grid_rows = PROGRAM_OFFSET
            .checked_add(self.max_rows)
            .ok_or(band_error)?;

        if encoded_rows.len() > self.max_rows {
            return Err(LayoutError::ProgramTooLarge {
                rows: encoded_rows.len(),
                max_rows: self.max_rows,
            });
        }

        let widest = encoded_rows.iter().map(Vec::len).max().unwrap_or(0);
        let width = (FIRST_CHUNK_COLUMN + widest).max(MIN_WIDTH);
        let step = normalize_formula(&self.step_formula);
        let output = normalize_formula(&self.output_formula);

        let mut rows = Vec::with_capacity(grid_rows);
        rows.push(control_row("run", RUN_FLAG_INITIAL, width));
        rows.push(control_row("pc", PC_INITIAL, width));
        rows.push(control_row(
            "out",
            &substitute_row(&output, sheet_row(OUTPUT_ROW)),
            width,
        ));
        rows.push(control_row("live", "initial", width));
        debug_assert_eq!(rows.len(), PROGRAM_OFFSET);

        for band_row in 0..self.max_rows {
            let grid_row = PROGRAM_OFFSET + band_row;
            let mut row = vec![String::new(); width];
            row[STEP_COLUMN] = substitute_row(&step, sheet_row(grid_row));
            if let Some(chunks) = encoded_rows.get(band_row) {
                for (offset, chunk) in chunks.iter().enumerate() {
                    row[FIRST_CHUNK_COLUMN + offset].clone_from(chunk);
                }
            }
            rows.push(row);
        }

        debug!(
            program_rows = encoded_rows.len(),
            band_rows = self.max_rows,
            width,
            "sheet layout rendered"
        );
        Ok(Grid { rows })
    }
}

/// How assembled rows are arranged in the output artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Layout {
    /// One output row per program row, no scaffolding.
    #[default]
    Plain,
    /// Program embedded in the VM's control grid.
    Sheet(SheetLayout),
}

impl Layout {
    /// Arranges encoded rows (one `Vec` of chunks per program row) into a
    /// grid.
    ///
    /// # Errors
    ///
    /// Returns `BandSize` if a sheet layout has an unusable band size, and
    /// `ProgramTooLarge` if it cannot hold every row.
    pub fn render(&self, encoded_rows: &[Vec<String>]) -> Result<Grid, LayoutError> {
        match self {
            Self::Plain => Ok(Grid {
                rows: encoded_rows.to_vec(),
            }),
            Self::Sheet(sheet) => sheet.render(encoded_rows),
        }
    }
}

/// A grid of text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// All rows, top to bottom.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Cell text at a 0-based coordinate.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
    }

    /// Serializes as tab-separated cells and newline-separated rows.
    #[must_use]
    pub fn to_tsv(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.join("\t"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Collapses formula text onto a single line.
///
/// Each line is trimmed, empty lines are dropped, and the rest are joined by
/// one space. A lone `\r` counts as a line break. Tabs become spaces so the text cannot split a cell.
#[must_use]
pub fn normalize_formula(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\t', " ")
}

/// Replaces every [`ROW_PLACEHOLDER`] with `sheet_row`.
#[must_use]
pub fn substitute_row(template: &str, sheet_row: usize) -> String {
    template.replace(ROW_PLACEHOLDER, &sheet_row.to_string())
}

const fn sheet_row(grid_row: usize) -> usize {
    grid_row + 1
}

fn control_row(label: &str, value: &str, width: usize) -> Vec<String> {
    let mut row = vec![String::new(); width];
    row[0] = label.to_string();
    row[1] = value.to_string();
    row
}
