//! Decoder for the legacy un-keyed archive ("typedstream") format.
//!
//! Only the plain string payload of an archived attributed string is
//! recovered. Layout of the parts we rely on:
//!
//! ```text
//! 04 0B "streamtyped" 81 E8 03          header: version, signature, system version
//! ... 84 84 08 "NSString" 01 ...        class chain naming the string class
//! 84 01 "+" <len> <utf-8 bytes>         type encoding "+" then the length-prefixed payload
//! ```
//!
//! Integers are one signed byte, or a tag byte followed by a little-endian
//! 16 or 32 bit value.

use crate::error::{Error, Result};

const STREAM_VERSION: i64 = 4;
const STREAM_SIGNATURE: &[u8] = b"streamtyped";

const TAG_INT16: u8 = 0x81;
const TAG_INT32: u8 = 0x82;

/// Class names whose instance carries the payload we want.
const STRING_CLASSES: [&[u8]; 2] = [b"NSString", b"NSMutableString"];

/// Length-1 type encoding string "+" (a C string of bytes).
const BYTES_TYPE_MARKER: [u8; 2] = [0x01, b'+'];

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| decode_err(format!("truncated at offset {}", self.pos)))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_int(&mut self) -> Result<i64> {
        let tag = self.take(1)?[0];
        match tag {
            TAG_INT16 => {
                let b = self.take(2)?;
                Ok(i16::from_le_bytes([b[0], b[1]]) as i64)
            }
            TAG_INT32 => {
                let b = self.take(4)?;
                Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64)
            }
            other => Ok(other as i8 as i64),
        }
    }

    fn read_header(&mut self) -> Result<()> {
        let version = self.read_int()?;
        if version != STREAM_VERSION {
            return Err(decode_err(format!("unsupported stream version {}", version)));
        }
        let sig_len = self.read_int()?;
        let signature = self.take(usize::try_from(sig_len).unwrap_or(usize::MAX))?;
        if signature != STREAM_SIGNATURE {
            return Err(decode_err("missing streamtyped signature".to_string()));
        }
        // System version; its value does not change the layout we read.
        self.read_int()?;
        Ok(())
    }

    /// Move just past the first occurrence of `needle` at or after the cursor.
    fn skip_past(&mut self, needle: &[u8]) -> Option<()> {
        let offset = find(&self.data[self.pos..], needle)?;
        self.pos += offset + needle.len();
        Some(())
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn decode_err(message: String) -> Error {
    Error::RowDecode(format!("typedstream: {}", message))
}

/// Extract the plain string from a typedstream-archived attributed string.
pub fn decode(data: &[u8]) -> Result<String> {
    let mut reader = Reader::new(data);
    reader.read_header()?;

    let class_end = STRING_CLASSES
        .iter()
        .filter_map(|name| find(&data[reader.pos..], name).map(|at| at + name.len()))
        .min()
        .ok_or_else(|| decode_err("no string class in stream".to_string()))?;
    reader.pos += class_end;

    reader
        .skip_past(&BYTES_TYPE_MARKER)
        .ok_or_else(|| decode_err("no string payload after class".to_string()))?;

    let len = reader.read_int()?;
    let len = usize::try_from(len).map_err(|_| decode_err(format!("negative length {}", len)))?;
    let bytes = reader.take(len)?;

    String::from_utf8(bytes.to_vec()).map_err(|e| decode_err(format!("payload is not UTF-8: {}", e)))
}

/// Build a typedstream blob the way the messaging client archives a plain
/// attributed string. Test-only.
#[cfg(test)]
pub(crate) fn encode_for_test(text: &str) -> Vec<u8> {
    let mut b = vec![0x04, 0x0b];
    b.extend_from_slice(STREAM_SIGNATURE);
    b.extend_from_slice(&[0x81, 0xe8, 0x03]);
    b.extend_from_slice(&[0x84, 0x01, b'@', 0x84, 0x84, 0x84, 0x12]);
    b.extend_from_slice(b"NSAttributedString");
    b.extend_from_slice(&[0x00, 0x84, 0x84, 0x08]);
    b.extend_from_slice(b"NSObject");
    b.extend_from_slice(&[0x00, 0x85, 0x92, 0x84, 0x84, 0x84, 0x08]);
    b.extend_from_slice(b"NSString");
    b.extend_from_slice(&[0x01, 0x94, 0x84, 0x01, b'+']);
    let len = text.len();
    if len < 0x80 {
        b.push(len as u8);
    } else {
        b.push(TAG_INT16);
        b.extend_from_slice(&(len as i16).to_le_bytes());
    }
    b.extend_from_slice(text.as_bytes());
    b.extend_from_slice(&[0x86, 0x84, 0x02, b'i', b'I', 0x01, 0x05, 0x92, 0x84, 0x86, 0x86]);
    b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_short_string() {
        let blob = encode_for_test("Hello there");
        assert_eq!(decode(&blob).unwrap(), "Hello there");
    }

    #[test]
    fn test_decode_long_string_uses_int16_length() {
        let text = "word ".repeat(80);
        let blob = encode_for_test(&text);
        assert!(find(&blob, &[b'+', TAG_INT16]).is_some());
        assert_eq!(decode(&blob).unwrap(), text);
    }

    #[test]
    fn test_decode_multibyte_text() {
        let blob = encode_for_test("caf\u{e9} \u{1f600}");
        assert_eq!(decode(&blob).unwrap(), "caf\u{e9} \u{1f600}");
    }

    #[test]
    fn test_rejects_missing_signature() {
        let err = decode(b"\x04\x0bnotastream!\x81\xe8\x03").unwrap_err();
        assert!(matches!(err, Error::RowDecode(_)));
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let mut blob = encode_for_test("Hello there");
        let cut = find(&blob, b"Hello").unwrap() + 2;
        blob.truncate(cut);
        assert!(decode(&blob).is_err());
    }

    #[test]
    fn test_rejects_empty_input() {
        assert!(decode(&[]).is_err());
    }
}
