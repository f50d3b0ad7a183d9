// src/codec/mod.rs

//! Descriptor codec.
//!
//! Turns the line-oriented text descriptor (`*.info`) into the fixed-layout
//! binary record consumed by the game (`<stem>.file`):
//!
//! - [`parse`] splits text into rows of raw tokens (`DescriptorRecord`).
//! - [`record`] normalizes tokens into floats and owns the byte layout
//!   (`BinaryRecord`).
//! - [`writer`] persists a record beside its source without ever leaving a
//!   half-written file behind.

pub mod parse;
pub mod record;
pub mod writer;

use thiserror::Error;

pub use parse::{parse_descriptor, DescriptorRecord, DescriptorRow};
pub use record::{encode_token, BinaryRecord, HEADER_LEN};
pub use writer::{output_path, write_record, OUTPUT_EXTENSION};

/// Field count of one sprite entry in the game's layout
/// (`min_uv`, `max_uv`, `center` as three `vec2`s).
pub const DEFAULT_FIELDS_PER_ROW: usize = 6;

/// Reference axes for the normalization rules.
pub const WIDTH_REFERENCE: f64 = 320.0;
pub const HEIGHT_REFERENCE: f64 = 240.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("descriptor contains no rows")]
    Empty,

    #[error("row {row} (line {line}), field {field}: malformed numeric token '{token}'")]
    MalformedToken {
        row: usize,
        line: usize,
        field: usize,
        token: String,
    },

    #[error("row {row} (line {line}): expected {expected} fields, found {found}")]
    FieldCount {
        row: usize,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("payload of {fields} fields does not fit a 32-bit length header")]
    TooLarge { fields: usize },

    #[error("binary record header announces {expected} payload bytes, found {found}")]
    LengthMismatch { expected: usize, found: usize },
}

/// Parses descriptor text and encodes it into a [`BinaryRecord`].
///
/// `fields_per_row = None` accepts any width as long as every row matches
/// the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorCodec {
    fields_per_row: Option<usize>,
}

impl Default for DescriptorCodec {
    fn default() -> Self {
        Self::new(Some(DEFAULT_FIELDS_PER_ROW))
    }
}

impl DescriptorCodec {
    pub fn new(fields_per_row: Option<usize>) -> Self {
        Self { fields_per_row }
    }

    pub fn fields_per_row(&self) -> Option<usize> {
        self.fields_per_row
    }

    pub fn transcode(&self, content: &str) -> Result<BinaryRecord, CodecError> {
        let record = parse_descriptor(content);
        self.encode(&record)
    }

    /// Encode every token in row-major, field-major order.
    pub fn encode(&self, record: &DescriptorRecord) -> Result<BinaryRecord, CodecError> {
        let first = record.rows.first().ok_or(CodecError::Empty)?;
        let expected = self.fields_per_row.unwrap_or(first.fields.len());

        let mut payload = Vec::with_capacity(record.rows.len() * expected);

        for (row_idx, row) in record.rows.iter().enumerate() {
            if row.fields.len() != expected {
                return Err(CodecError::FieldCount {
                    row: row_idx + 1,
                    line: row.line,
                    expected,
                    found: row.fields.len(),
                });
            }

            for (field_idx, token) in row.fields.iter().enumerate() {
                let value = encode_token(token).ok_or_else(|| CodecError::MalformedToken {
                    row: row_idx + 1,
                    line: row.line,
                    field: field_idx + 1,
                    token: token.clone(),
                })?;
                payload.push(value);
            }
        }

        BinaryRecord::new(payload)
    }
}
