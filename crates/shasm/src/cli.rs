//! Command-line front end.
//!
//! Reads the source and optional formula templates, assembles, lays out the
//! grid, and writes it in one step. The destination is only written once
//! every stage has succeeded.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::assembler::{assemble, AssemblerConfig, Assembly, ListingEntry, ENTRY_LABEL};
use crate::errors::{AssembleError, AssembleErrorKind};
use crate::layout::{Layout, SheetLayout, DEFAULT_MAX_ROWS, MAX_BAND_ROWS};
use crate::parser::DEFAULT_COMMENT_MARKER;
use crate::symbols::SymbolTable;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "warn";

/// Log filter used with `--verbose` when `RUST_LOG` is unset.
const VERBOSE_LOG_FILTER: &str = "shasm=debug";

/// Assemble shasm source into a packed program grid.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "shasm", version, about)]
pub struct Args {
    /// Assembly source file.
    pub source: PathBuf,

    /// Output file for the tab-separated grid.
    pub dest: PathBuf,

    /// Tokens starting with this character begin a comment.
    #[arg(short = 'c', long, default_value_t = DEFAULT_COMMENT_MARKER)]
    pub comment_marker: char,

    /// Step formula template; selects the sheet layout.
    #[arg(long, value_name = "FILE", requires = "output_formula")]
    pub step_formula: Option<PathBuf>,

    /// Output readback formula template; selects the sheet layout.
    #[arg(long, value_name = "FILE", requires = "step_formula")]
    pub output_formula: Option<PathBuf>,

    /// Number of program rows the sheet layout provides.
    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_MAX_ROWS,
        value_parser = parse_max_rows
    )]
    pub max_rows: usize,

    /// Print the row listing and symbol table to stderr.
    #[arg(short, long)]
    pub verbose: bool,

    /// Decode the packed cells and compare them with the program before
    /// writing.
    #[arg(long)]
    pub verify: bool,
}

impl Args {
    /// Assembler settings taken from the flags.
    #[must_use]
    pub const fn assembler_config(&self) -> AssemblerConfig {
        AssemblerConfig {
            comment_marker: self.comment_marker,
        }
    }

    /// Builds the output layout, reading formula templates if given.
    ///
    /// # Errors
    ///
    /// Returns an `Io` error if a template cannot be read.
    pub fn layout(&self) -> Result<Layout, AssembleError> {
        match (&self.step_formula, &self.output_formula) {
            (Some(step), Some(output)) => Ok(Layout::Sheet(
                SheetLayout::new(read_text(step)?, read_text(output)?)
                    .with_max_rows(self.max_rows),
            )),
            _ => Ok(Layout::Plain),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Source file that was assembled.
    pub source: PathBuf,
    /// File that was written.
    pub dest: PathBuf,
    /// Rows in the program matrix.
    pub rows: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Assembled {} ({} rows) -> {}",
            self.source.display(),
            self.rows,
            self.dest.display()
        )
    }
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence. Otherwise only warnings are shown, or debug
/// output from this crate when `verbose` is set.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runs one assembly from the parsed arguments.
///
/// # Errors
///
/// Returns the first error from reading, assembling, laying out, verifying,
/// or writing. Nothing is written on error.
pub fn run(args: &Args) -> Result<RunSummary, AssembleError> {
    let layout = args.layout()?;
    let assembly = assemble(&args.source, &args.assembler_config())?;

    let encoded = assembly.encoded_rows();
    if args.verify {
        assembly.verify(&encoded)?;
    }
    let grid = layout.render(&encoded)?;

    fs::write(&args.dest, grid.to_tsv()).map_err(|e| {
        AssembleError::new(AssembleErrorKind::Io(format!(
            "failed to write {}: {e}",
            args.dest.display()
        )))
    })?;
    debug!(dest = %args.dest.display(), grid_rows = grid.rows().len(), "output written");

    if args.verbose {
        for line in format_listing(&assembly) {
            eprintln!("{line}");
        }
        for line in format_symbols(&assembly.symbols) {
            eprintln!("{line}");
        }
    }

    Ok(RunSummary {
        source: args.source.clone(),
        dest: args.dest.clone(),
        rows: assembly.row_count(),
    })
}

/// Renders one line per program row: index, cells, and the source line.
#[must_use]
pub fn format_listing(assembly: &Assembly) -> Vec<String> {
    assembly.listing.iter().map(format_listing_entry).collect()
}

/// Renders the symbol table ordered by row, then name.
#[must_use]
pub fn format_symbols(symbols: &SymbolTable) -> Vec<String> {
    let mut entries: Vec<_> = symbols.iter().collect();
    entries.sort_by_key(|(name, symbol)| (symbol.row, *name));
    entries
        .into_iter()
        .map(|(name, symbol)| {
            format!(
                "{name:<16} = {:4} ; line {}",
                symbol.row, symbol.defined_at
            )
        })
        .collect()
}

fn format_listing_entry(entry: &ListingEntry) -> String {
    let cells = entry
        .cells
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    if entry.line == 0 {
        format!("{:4}: {cells:<20} ; -> {ENTRY_LABEL}", entry.row)
    } else {
        format!("{:4}: {cells:<20} ; {}: {}", entry.row, entry.line, entry.source)
    }
}

fn parse_max_rows(value: &str) -> Result<usize, String> {
    let rows: usize = value.parse().map_err(|e| format!("{e}"))?;
    if (1..=MAX_BAND_ROWS).contains(&rows) {
        Ok(rows)
    } else {
        Err(format!("must be between 1 and {MAX_BAND_ROWS}"))
    }
}

fn read_text(path: &Path) -> Result<String, AssembleError> {
    fs::read_to_string(path).map_err(|e| {
        AssembleError::new(AssembleErrorKind::Io(format!(
            "failed to read {}: {e}",
            path.display()
        )))
    })
}
