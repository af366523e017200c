//! Modified UTF-8 ("MUTF-8") codec for the JVM object-serialization wire
//! format.
//!
//! Differs from standard UTF-8 in two ways: the code point `U+0000` is
//! encoded as the two-byte sequence `C0 80` rather than a raw `0x00` byte,
//! and code points outside the Basic Multilingual Plane are encoded as a
//! pair of three-byte surrogate sequences rather than a single four-byte
//! sequence. A standard UTF-8 decoder must not be reused here for exactly
//! that second reason.
//!
//! Encoding (the reverse direction) is out of scope: this crate only reads
//! streams.

use crate::error::{Error, Result};

/// Decodes a modified-UTF-8 byte sequence into a `String`.
///
/// `position` is the stream offset immediately after the bytes being
/// decoded, used to tag any `InvalidUtf8` error.
pub fn decode(bytes: &[u8], position: u64) -> Result<String> {
    let units = decode_to_utf16(bytes, position)?;
    String::from_utf16(&units).map_err(|_| Error::InvalidUtf8 { position })
}

fn decode_to_utf16(bytes: &[u8], position: u64) -> Result<Vec<u16>> {
    let bad = || Error::InvalidUtf8 { position };
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        if b0 == 0x00 {
            // A literal NUL byte never appears; U+0000 is always the
            // two-byte form below.
            return Err(bad());
        } else if b0 & 0x80 == 0 {
            out.push(b0 as u16);
            i += 1;
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = *bytes.get(i + 1).ok_or_else(bad)?;
            if b1 & 0xC0 != 0x80 {
                return Err(bad());
            }
            out.push((((b0 & 0x1F) as u16) << 6) | (b1 & 0x3F) as u16);
            i += 2;
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = *bytes.get(i + 1).ok_or_else(bad)?;
            let b2 = *bytes.get(i + 2).ok_or_else(bad)?;
            if b1 & 0xC0 != 0x80 || b2 & 0xC0 != 0x80 {
                return Err(bad());
            }
            out.push(
                (((b0 & 0x0F) as u16) << 12) | (((b1 & 0x3F) as u16) << 6) | (b2 & 0x3F) as u16,
            );
            i += 3;
        } else {
            return Err(bad());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ascii() {
        assert_eq!(decode(b"hello", 0).unwrap(), "hello");
    }

    #[test]
    fn decodes_two_byte_nul() {
        assert_eq!(decode(&[0xC0, 0x80], 0).unwrap(), "\u{0}");
    }

    #[test]
    fn decodes_supplementary_as_surrogate_pair() {
        // U+10400 (DESERET CAPITAL LETTER LONG I) as two 3-byte CESU
        // sequences for the surrogate pair D801 DC00, not a 4-byte form.
        let bytes = [0xED, 0xA0, 0x81, 0xED, 0xB0, 0x80];
        assert_eq!(decode(&bytes, 0).unwrap(), "\u{10400}");
    }

    #[test]
    fn rejects_raw_nul_byte() {
        assert!(matches!(
            decode(&[0x00], 0).unwrap_err(),
            Error::InvalidUtf8 { .. }
        ));
    }

    #[test]
    fn rejects_truncated_multibyte_sequence() {
        assert!(matches!(
            decode(&[0xC0], 0).unwrap_err(),
            Error::InvalidUtf8 { .. }
        ));
    }

    #[test]
    fn rejects_bad_continuation_byte() {
        assert!(matches!(
            decode(&[0xC0, 0x00], 0).unwrap_err(),
            Error::InvalidUtf8 { .. }
        ));
    }
}
