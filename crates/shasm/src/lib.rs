//! shasm assembler library.
//!
//! Turns line-oriented shasm source into the packed program grid executed by
//! the spreadsheet-hosted VM.

/// Top-level two-pass assembler pipeline.
pub mod assembler;
/// Command-line arguments, logging setup, and the run loop.
pub mod cli;
/// Word-to-character cell packing and its decoder.
pub mod codec;
/// Structured assembly error types.
pub mod errors;
/// Plain and sheet output grids.
pub mod layout;
/// Mnemonic to opcode table.
pub mod mnemonic;
/// Line tokenizer, classifier, and operand parser.
pub mod parser;
/// Source loading with line numbers.
pub mod source;
/// Symbol table and label backpatching.
pub mod symbols;
