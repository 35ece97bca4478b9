//! Source line tokenizer and classifier.
//!
//! A line is split on whitespace, truncated at the first token that starts
//! with the comment marker, and then classified in this order:
//!
//! 1. `name = v1 v2 ...` is a data assignment.
//! 2. `name:` is a label definition.
//! 3. Anything else is an instruction whose first token is a mnemonic.
//!
//! Operands are either base-10 integer literals or label references. Label
//! references are resolved later by the symbol pass.

use thiserror::Error;

use crate::mnemonic::Opcode;

/// Comment marker used when none is configured.
pub const DEFAULT_COMMENT_MARKER: char = '#';

/// Second token of a data assignment line.
pub const ASSIGNMENT_MARKER: &str = "=";

/// Suffix that turns the first token into a label definition.
pub const LABEL_TERMINATOR: char = ':';

/// Smallest literal accepted by the 32-bit VM word.
const MIN_LITERAL: i64 = i32::MIN as i64;

/// Largest literal accepted by the 32-bit VM word.
const MAX_LITERAL: i64 = u32::MAX as i64;

/// A single operand as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Integer literal, already range-checked.
    Literal(i64),
    /// Reference to a label, resolved after the whole source is scanned.
    Label(String),
}

/// A single classified source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Empty or comment-only line.
    Blank,
    /// `name:` label definition.
    Label {
        /// Label name without the terminator.
        name: String,
    },
    /// `name = v1 v2 ...` data row.
    Assignment {
        /// Label bound to the data row.
        name: String,
        /// Row contents.
        values: Vec<Operand>,
    },
    /// Instruction row.
    Instruction {
        /// Resolved opcode.
        opcode: Opcode,
        /// Operands following the mnemonic.
        operands: Vec<Operand>,
    },
}

/// Parse error with the source line it occurred on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ParseError {
    /// 1-indexed source line.
    pub line: usize,
    /// Kind of parse error.
    pub kind: ParseErrorKind,
}

/// Classification of parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// The instruction mnemonic is not in the opcode table.
    #[error("unknown opcode: {0}")]
    UnknownOpcode(String),
    /// The line does not fit any of the accepted shapes.
    #[error("malformed line: {0}")]
    MalformedLine(String),
}

/// Result of parsing a single line.
pub type ParseResult = Result<ParsedLine, ParseError>;

/// Splits a line into tokens, dropping everything from the first token that
/// starts with `comment_marker`.
#[must_use]
pub fn tokenize(line: &str, comment_marker: char) -> Vec<&str> {
    line.split_whitespace()
        .take_while(|token| !token.starts_with(comment_marker))
        .collect()
}

/// Parses and classifies a source line.
///
/// # Errors
///
/// Returns `UnknownOpcode` for an unrecognised mnemonic and `MalformedLine`
/// for label lines with trailing tokens, unusable label names, or integer
/// literals outside the 32-bit range.
pub fn parse_line(line: &str, line_number: usize, comment_marker: char) -> ParseResult {
    let tokens = tokenize(line, comment_marker);
    let error = |kind| ParseError {
        line: line_number,
        kind,
    };

    let Some((&first, rest)) = tokens.split_first() else {
        return Ok(ParsedLine::Blank);
    };

    if rest.first() == Some(&ASSIGNMENT_MARKER) {
        let name = check_label_name(first).map_err(error)?;
        let values = parse_operands(&rest[1..]).map_err(error)?;
        return Ok(ParsedLine::Assignment { name, values });
    }

    if let Some(name) = first.strip_suffix(LABEL_TERMINATOR) {
        if !rest.is_empty() {
            return Err(error(ParseErrorKind::MalformedLine(format!(
                "unexpected tokens after label '{name}': {}",
                rest.join(" ")
            ))));
        }
        let name = check_label_name(name).map_err(error)?;
        return Ok(ParsedLine::Label { name });
    }

    let opcode = Opcode::from_mnemonic(first)
        .ok_or_else(|| error(ParseErrorKind::UnknownOpcode(first.to_string())))?;
    let operands = parse_operands(rest).map_err(error)?;
    Ok(ParsedLine::Instruction { opcode, operands })
}

/// Parses one operand token.
///
/// Tokens of the form `[+-]?[0-9]+` are literals. Every other token names a
/// label.
///
/// # Errors
///
/// Returns `MalformedLine` if a literal does not fit a 32-bit word.
pub fn parse_operand(token: &str) -> Result<Operand, ParseErrorKind> {
    if !is_integer_literal(token) {
        return Ok(Operand::Label(token.to_string()));
    }

    token
        .parse::<i64>()
        .ok()
        .filter(|value| (MIN_LITERAL..=MAX_LITERAL).contains(value))
        .map(Operand::Literal)
        .ok_or_else(|| {
            ParseErrorKind::MalformedLine(format!("integer literal out of 32-bit range: {token}"))
        })
}

fn parse_operands(tokens: &[&str]) -> Result<Vec<Operand>, ParseErrorKind> {
    tokens.iter().map(|token| parse_operand(token)).collect()
}

fn is_integer_literal(token: &str) -> bool {
    let digits = token
        .strip_prefix('-')
        .or_else(|| token.strip_prefix('+'))
        .unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn check_label_name(name: &str) -> Result<String, ParseErrorKind> {
    if name.is_empty() {
        return Err(ParseErrorKind::MalformedLine("empty label name".into()));
    }
    if is_integer_literal(name) {
        return Err(ParseErrorKind::MalformedLine(format!(
            "label name is an integer literal: {name}"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn parse(line: &str) -> ParseResult {
        parse_line(line, 1, DEFAULT_COMMENT_MARKER)
    }

    #[test]
    fn tokenize_splits_on_any_whitespace() {
        assert_eq!(tokenize("  add\t1   2  ", '#'), vec!["add", "1", "2"]);
    }

    #[test]
    fn tokenize_truncates_at_comment_token() {
        assert_eq!(tokenize("add 1 2 # sum", '#'), vec!["add", "1", "2"]);
        assert_eq!(tokenize("add 1 2 #sum", '#'), vec!["add", "1", "2"]);
    }

    #[test]
    fn comment_marker_inside_token_is_kept() {
        assert_eq!(tokenize("add a#b 2", '#'), vec!["add", "a#b", "2"]);
    }

    #[test]
    fn tokenize_honours_configured_marker() {
        assert_eq!(tokenize("add 1 2 ; sum # x", ';'), vec!["add", "1", "2"]);
        assert_eq!(tokenize("# not a comment", ';'), vec!["#", "not", "a", "comment"]);
    }

    #[rstest]
    #[case("")]
    #[case("    ")]
    #[case("# just a comment")]
    #[case("   #indented comment")]
    fn blank_and_comment_lines(#[case] line: &str) {
        assert_eq!(parse(line).unwrap(), ParsedLine::Blank);
    }

    #[test]
    fn parse_label_definition() {
        assert_eq!(
            parse("_start:").unwrap(),
            ParsedLine::Label {
                name: "_start".into()
            }
        );
    }

    #[test]
    fn label_followed_by_comment() {
        assert_eq!(
            parse("loop: # top of loop").unwrap(),
            ParsedLine::Label {
                name: "loop".into()
            }
        );
    }

    #[test]
    fn parse_assignment() {
        assert_eq!(
            parse("x = 5 10").unwrap(),
            ParsedLine::Assignment {
                name: "x".into(),
                values: vec![Operand::Literal(5), Operand::Literal(10)],
            }
        );
    }

    #[test]
    fn assignment_with_label_values() {
        assert_eq!(
            parse("table = loop -1 end").unwrap(),
            ParsedLine::Assignment {
                name: "table".into(),
                values: vec![
                    Operand::Label("loop".into()),
                    Operand::Literal(-1),
                    Operand::Label("end".into()),
                ],
            }
        );
    }

    #[test]
    fn assignment_without_values_is_empty_row() {
        assert_eq!(
            parse("scratch =").unwrap(),
            ParsedLine::Assignment {
                name: "scratch".into(),
                values: vec![],
            }
        );
    }

    #[test]
    fn assignment_wins_over_label_terminator() {
        assert_eq!(
            parse("odd: = 1").unwrap(),
            ParsedLine::Assignment {
                name: "odd:".into(),
                values: vec![Operand::Literal(1)],
            }
        );
    }

    #[test]
    fn parse_instruction_with_operands() {
        assert_eq!(
            parse("add 1 2").unwrap(),
            ParsedLine::Instruction {
                opcode: Opcode::Add,
                operands: vec![Operand::Literal(1), Operand::Literal(2)],
            }
        );
    }

    #[test]
    fn parse_instruction_without_operands() {
        assert_eq!(
            parse("    halt").unwrap(),
            ParsedLine::Instruction {
                opcode: Opcode::Halt,
                operands: vec![],
            }
        );
    }

    #[test]
    fn symbolic_comparison_mnemonic() {
        assert_eq!(
            parse("<= flag a b").unwrap(),
            ParsedLine::Instruction {
                opcode: Opcode::Lte,
                operands: vec![
                    Operand::Label("flag".into()),
                    Operand::Label("a".into()),
                    Operand::Label("b".into()),
                ],
            }
        );
    }

    #[test]
    fn error_unknown_opcode() {
        let err = parse("nop").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.kind, ParseErrorKind::UnknownOpcode("nop".into()));
    }

    #[test]
    fn error_unknown_opcode_reports_line() {
        let err = parse_line("frobnicate 1", 42, '#').unwrap_err();
        assert_eq!(err.line, 42);
        assert_eq!(err.to_string(), "unknown opcode: frobnicate");
    }

    #[rstest]
    #[case("loop: add 1 2")]
    #[case(":")]
    #[case("12:")]
    #[case("7 = 1 2")]
    #[case("add 1 4294967296")]
    #[case("x = -2147483649")]
    #[case("add 99999999999999999999 1")]
    fn malformed_lines(#[case] line: &str) {
        let err = parse(line).unwrap_err();
        assert!(
            matches!(err.kind, ParseErrorKind::MalformedLine(_)),
            "{line:?} gave {err:?}"
        );
    }

    #[rstest]
    #[case("0", Operand::Literal(0))]
    #[case("42", Operand::Literal(42))]
    #[case("+7", Operand::Literal(7))]
    #[case("-1", Operand::Literal(-1))]
    #[case("4294967295", Operand::Literal(4_294_967_295))]
    #[case("-2147483648", Operand::Literal(-2_147_483_648))]
    #[case("007", Operand::Literal(7))]
    #[case("loop", Operand::Label("loop".into()))]
    #[case("5x", Operand::Label("5x".into()))]
    #[case("-", Operand::Label("-".into()))]
    #[case("0x10", Operand::Label("0x10".into()))]
    fn operand_classification(#[case] token: &str, #[case] expected: Operand) {
        assert_eq!(parse_operand(token).unwrap(), expected);
    }
}
