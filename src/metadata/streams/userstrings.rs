//! The `#US` heap: length-prefixed UTF-16 string literals referenced by `ldstr`.
//!
//! An `ldstr` operand is a token with table byte `0x70` whose low 24 bits are a byte offset
//! into this heap. Each entry has a compressed length counting the UTF-16 code units in bytes
//! plus one final byte, which is set when the string holds characters that need special
//! handling. Lone surrogates are kept lossily, as the literal may not be valid Unicode.
//!
//! # Reference
//! - ECMA-335 6th Edition, Partition II, Section 24.2.4 - `#US` and `#Blob` heaps

use crate::{file::parser::Parser, Error::OutOfBounds, Result};

use widestring::U16String;

/// View over the `#US` heap.
///
/// # Examples
///
/// ```rust
/// use cilgraph::metadata::streams::UserStrings;
///
/// let heap = [0x00, 0x05, b'H', 0x00, b'i', 0x00, 0x00];
/// let strings = UserStrings::from(&heap)?;
/// assert_eq!(strings.get(1)?, "Hi");
/// # Ok::<(), cilgraph::Error>(())
/// ```
pub struct UserStrings<'a> {
    data: &'a [u8],
}

impl<'a> UserStrings<'a> {
    /// Wrap heap bytes; an absent heap is represented by an empty slice.
    ///
    /// # Errors
    /// Returns an error if a non-empty heap does not start with the mandatory empty entry.
    pub fn from(data: &'a [u8]) -> Result<UserStrings<'a>> {
        if !data.is_empty() && data[0] != 0 {
            return Err(malformed_error!("#US heap does not start with an empty entry"));
        }

        Ok(UserStrings { data })
    }

    /// Decode the literal at `index`.
    ///
    /// The stored length counts the UTF-16 bytes plus one trailing flag byte.
    ///
    /// # Errors
    /// Returns an error if the entry reaches outside the heap.
    pub fn get(&self, index: usize) -> Result<String> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(&self.data[index..]);
        let length = parser.read_compressed_uint()? as usize;
        let bytes = parser.read_bytes(length)?;
        let units = bytes[..length & !1]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect::<Vec<u16>>();

        Ok(U16String::from_vec(units).to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups() {
        #[rustfmt::skip]
        let data = [
            0x00,
            0x0B, b'H', 0x00, b'e', 0x00, b'l', 0x00, b'l', 0x00, b'o', 0x00, 0x00,
            0x01, 0x00,
        ];

        let strings = UserStrings::from(&data).unwrap();
        assert_eq!(strings.get(1).unwrap(), "Hello");
        assert_eq!(strings.get(13).unwrap(), "");
        assert!(strings.get(15).is_err());
    }

    #[test]
    fn truncated() {
        let strings = UserStrings::from(&[0x00, 0x09, b'a', 0x00]).unwrap();
        assert!(strings.get(1).is_err());
    }
}
