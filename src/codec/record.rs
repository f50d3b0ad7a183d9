// src/codec/record.rs

use super::{CodecError, HEIGHT_REFERENCE, WIDTH_REFERENCE};

/// Size of the header region: 4-byte payload length + 4 reserved bytes.
pub const HEADER_LEN: usize = 8;

/// Encoded descriptor: a little-endian length header followed by `f32`s.
///
/// ```text
/// 0..4   u32 LE  payload length in bytes (4 * field count)
/// 4..8           reserved, zero
/// 8..    f32 LE  payload, row-major / field-major
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryRecord {
    payload: Vec<f32>,
}

impl BinaryRecord {
    pub fn new(payload: Vec<f32>) -> Result<Self, CodecError> {
        if payload.len().checked_mul(4).is_none_or(|b| b > u32::MAX as usize) {
            return Err(CodecError::TooLarge {
                fields: payload.len(),
            });
        }
        Ok(Self { payload })
    }

    pub fn payload(&self) -> &[f32] {
        &self.payload
    }

    /// Payload byte count as written in the header.
    pub fn header_length(&self) -> u32 {
        // Bounded by the check in `new`.
        (self.payload.len() * 4) as u32
    }

    pub fn byte_len(&self) -> usize {
        HEADER_LEN + self.payload.len() * 4
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        out.extend_from_slice(&self.header_length().to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        for value in &self.payload {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Decode bytes produced by [`BinaryRecord::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::LengthMismatch {
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }

        let declared = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let body = &bytes[HEADER_LEN..];
        if declared != body.len() || declared % 4 != 0 {
            return Err(CodecError::LengthMismatch {
                expected: declared,
                found: body.len(),
            });
        }

        let payload = body
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(Self { payload })
    }
}

/// Normalize one descriptor token.
///
/// - `<n>w`: width rule, `n / 320`.
/// - contains `.`: literal float.
/// - otherwise: height rule, `1 - n / 240`.
///
/// Returns `None` for anything that is not a finite number.
pub fn encode_token(token: &str) -> Option<f32> {
    let value = if let Some(width) = token.strip_suffix('w') {
        parse_finite(width)? / WIDTH_REFERENCE
    } else if token.contains('.') {
        parse_finite(token)?
    } else {
        1.0 - parse_finite(token)? / HEIGHT_REFERENCE
    };

    Some(value as f32)
}

fn parse_finite(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_rule_inverts_against_240() {
        assert_eq!(encode_token("120"), Some(0.5));
        assert_eq!(encode_token("0"), Some(1.0));
        assert_eq!(encode_token("240"), Some(0.0));
    }

    #[test]
    fn width_rule_scales_against_320() {
        assert_eq!(encode_token("64w"), Some(0.2));
        assert_eq!(encode_token("2.0w"), Some((2.0_f64 / 320.0) as f32));
    }

    #[test]
    fn decimal_tokens_are_literal() {
        assert_eq!(encode_token("0.4"), Some(0.4));
        assert_eq!(encode_token("-1.5"), Some(-1.5));
    }

    #[test]
    fn non_numbers_are_rejected() {
        for bad in ["", "w", "abc", "1.2.3", "inf", "NaN", "12px"] {
            assert_eq!(encode_token(bad), None, "token {bad:?}");
        }
    }

    #[test]
    fn layout_is_header_then_little_endian_floats() {
        let rec = BinaryRecord::new(vec![0.5, 1.0]).unwrap();
        let bytes = rec.to_bytes();

        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], &8u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &0.5f32.to_le_bytes());
        assert_eq!(&bytes[12..16], &1.0f32.to_le_bytes());

        assert_eq!(BinaryRecord::from_bytes(&bytes).unwrap(), rec);
    }

    #[test]
    fn truncated_bytes_are_rejected() {
        let bytes = BinaryRecord::new(vec![1.0, 2.0]).unwrap().to_bytes();
        let err = BinaryRecord::from_bytes(&bytes[..12]).unwrap_err();
        assert_eq!(
            err,
            CodecError::LengthMismatch {
                expected: 8,
                found: 4
            }
        );
        assert!(BinaryRecord::from_bytes(&bytes[..3]).is_err());
    }
}
