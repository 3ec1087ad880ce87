//! Compact bytes array codec.
//!
//! Allow-lists are persisted as a concatenation of `u16 length || bytes`
//! elements. A trailing partial length or an element running past the end
//! of the input is malformed.

use crate::error::{CoreError, Result};

/// Maximum length of one element (fits the u16 length prefix).
pub const MAX_ELEMENT_LEN: usize = u16::MAX as usize;

/// Encode elements into a compact bytes array.
pub fn encode<T: AsRef<[u8]>>(elements: &[T]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for element in elements {
        let bytes = element.as_ref();
        if bytes.len() > MAX_ELEMENT_LEN {
            return Err(CoreError::EncodingError(format!(
                "element of {} bytes exceeds compact array limit",
                bytes.len()
            )));
        }
        out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
        out.extend_from_slice(bytes);
    }
    Ok(out)
}

/// Decode a compact bytes array into borrowed element slices.
pub fn decode(input: &[u8]) -> Result<Vec<&[u8]>> {
    let mut elements = Vec::new();
    let mut cursor = 0usize;

    while cursor < input.len() {
        if input.len() - cursor < 2 {
            return Err(CoreError::MalformedCompactBytesArray(format!(
                "truncated length prefix at offset {}",
                cursor
            )));
        }
        let len = u16::from_be_bytes([input[cursor], input[cursor + 1]]) as usize;
        cursor += 2;

        let end = cursor + len;
        if end > input.len() {
            return Err(CoreError::MalformedCompactBytesArray(format!(
                "element at offset {} declares {} bytes, {} remain",
                cursor - 2,
                len,
                input.len() - cursor
            )));
        }
        elements.push(&input[cursor..end]);
        cursor = end;
    }

    Ok(elements)
}
