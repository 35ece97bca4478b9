//! Cell-packing codec.
//!
//! Every 32-bit word is stored as exactly three characters:
//!
//! ```text
//! bits 31..17 -> field A (15 bits)
//! bits 16..2  -> field B (15 bits)
//! bits  1..0  -> field C (2 bits)
//! ```
//!
//! Each field is offset by [`CHAR_OFFSET`] and emitted as one `char`, in
//! A, B, C order. The largest code point produced is `0x7FFF + 32`, which
//! stays below the UTF-16 surrogate range and therefore occupies a single
//! code unit in the host sheet.
//!
//! A row is split into chunks of at most [`CHUNK_CAPACITY`] words. Each chunk
//! is wrapped in `[` and `]` and becomes one sheet cell.

use thiserror::Error;

/// Maximum number of words per chunk.
///
/// `16_666 * 3 + 2` characters stays under the host's 50 000 character cell
/// limit.
pub const CHUNK_CAPACITY: usize = 16_666;

/// Offset added to every field before it is turned into a character.
pub const CHAR_OFFSET: u32 = 32;

/// Characters per encoded word.
pub const ENCODED_WORD_LEN: usize = 3;

/// Opening chunk delimiter.
pub const CHUNK_OPEN: char = '[';

/// Closing chunk delimiter.
pub const CHUNK_CLOSE: char = ']';

const HIGH_SHIFT: u32 = 17;
const MID_SHIFT: u32 = 2;
const WIDE_FIELD_MASK: u32 = 0x7FFF;
const NARROW_FIELD_MASK: u32 = 0x3;

/// Error while decoding packed cells.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The cell is not wrapped in `[` and `]`.
    #[error("chunk is not wrapped in '[' and ']'")]
    MissingDelimiters,
    /// The chunk body length is not a multiple of three characters.
    #[error("chunk body has {length} characters, not a multiple of 3")]
    TruncatedWord {
        /// Number of characters between the delimiters.
        length: usize,
    },
    /// A character is below the field offset.
    #[error("character U+{code:04X} is below the field offset")]
    BelowOffset {
        /// The offending code point.
        code: u32,
    },
    /// A field decodes to more bits than its slot holds.
    #[error("field value {value} does not fit in {bits} bits")]
    FieldOverflow {
        /// Decoded field value.
        value: u32,
        /// Width of the field.
        bits: u32,
    },
}

/// Reinterprets a matrix cell as the 32-bit pattern the VM stores.
///
/// Negative values become their two's-complement bit pattern.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub const fn word_bits(value: i64) -> u32 {
    value as u32
}

/// Encodes one word as three characters.
#[must_use]
pub fn encode_word(word: u32) -> [char; ENCODED_WORD_LEN] {
    [
        field_char((word >> HIGH_SHIFT) & WIDE_FIELD_MASK),
        field_char((word >> MID_SHIFT) & WIDE_FIELD_MASK),
        field_char(word & NARROW_FIELD_MASK),
    ]
}

/// Encodes a run of cells as one bracketed chunk.
///
/// The caller is responsible for respecting [`CHUNK_CAPACITY`].
#[must_use]
pub fn encode_chunk(cells: &[i64]) -> String {
    let mut chunk = String::with_capacity(cells.len() * ENCODED_WORD_LEN + 2);
    chunk.push(CHUNK_OPEN);
    for &cell in cells {
        chunk.extend(encode_word(word_bits(cell)));
    }
    chunk.push(CHUNK_CLOSE);
    chunk
}

/// Encodes a row as one or more chunks.
///
/// A row of exactly [`CHUNK_CAPACITY`] words is one chunk. Longer rows spill
/// into further chunks, the last of which may be shorter. An empty row has no
/// chunks.
#[must_use]
pub fn encode_row(row: &[i64]) -> Vec<String> {
    row.chunks(CHUNK_CAPACITY).map(encode_chunk).collect()
}

/// Decodes three characters back into a word.
///
/// # Errors
///
/// Returns `BelowOffset` or `FieldOverflow` if a character could not have
/// been produced by [`encode_word`].
pub fn decode_word(chars: [char; ENCODED_WORD_LEN]) -> Result<u32, DecodeError> {
    let [high, mid, low] = chars;
    let high = char_field(high, WIDE_FIELD_MASK, 15)?;
    let mid = char_field(mid, WIDE_FIELD_MASK, 15)?;
    let low = char_field(low, NARROW_FIELD_MASK, 2)?;
    Ok((high << HIGH_SHIFT) | (mid << MID_SHIFT) | low)
}

/// Decodes one bracketed chunk.
///
/// # Errors
///
/// Returns an error if the delimiters are missing, the body is not a whole
/// number of words, or any word fails [`decode_word`].
pub fn decode_chunk(chunk: &str) -> Result<Vec<u32>, DecodeError> {
    let body = chunk
        .strip_prefix(CHUNK_OPEN)
        .and_then(|rest| rest.strip_suffix(CHUNK_CLOSE))
        .ok_or(DecodeError::MissingDelimiters)?;

    let chars: Vec<char> = body.chars().collect();
    if chars.len() % ENCODED_WORD_LEN != 0 {
        return Err(DecodeError::TruncatedWord {
            length: chars.len(),
        });
    }

    chars
        .chunks_exact(ENCODED_WORD_LEN)
        .map(|word| decode_word([word[0], word[1], word[2]]))
        .collect()
}

/// Decodes the chunks of one row and concatenates their words.
///
/// # Errors
///
/// Returns the first chunk error.
pub fn decode_row<'a, I>(chunks: I) -> Result<Vec<u32>, DecodeError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut words = Vec::new();
    for chunk in chunks {
        words.extend(decode_chunk(chunk)?);
    }
    Ok(words)
}

fn field_char(field: u32) -> char {
    // Fields are at most 15 bits, so the code point never reaches a surrogate.
    char::from_u32(field + CHAR_OFFSET).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn char_field(ch: char, mask: u32, bits: u32) -> Result<u32, DecodeError> {
    let code = u32::from(ch);
    let value = code
        .checked_sub(CHAR_OFFSET)
        .ok_or(DecodeError::BelowOffset { code })?;
    if value > mask {
        return Err(DecodeError::FieldOverflow { value, bits });
    }
    Ok(value)
}
