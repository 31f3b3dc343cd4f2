//! The `#Strings` heap: NUL-terminated UTF-8 identifiers addressed by byte offset.
//!
//! Table columns store offsets into this heap, and an offset may point into the middle of
//! another entry: compilers share suffixes, so `Runtime` can be read from inside
//! `System.Runtime`. The heap must start with a NUL byte so that offset 0 names the empty
//! string.
//!
//! # Reference
//! - ECMA-335 6th Edition, Partition II, Section 24.2.3 - `#Strings` heap

use std::{ffi::CStr, str};

use crate::{Error::OutOfBounds, Result};

/// View over the `#Strings` heap.
///
/// # Examples
///
/// ```rust
/// use cilgraph::metadata::streams::Strings;
///
/// let strings = Strings::from(b"\0Hello\0")?;
/// assert_eq!(strings.get(1)?, "Hello");
/// assert_eq!(strings.get(3)?, "llo");
/// # Ok::<(), cilgraph::Error>(())
/// ```
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Wrap heap bytes; an absent heap is represented by an empty slice.
    ///
    /// # Arguments
    /// * `data` - The heap bytes as listed in the stream directory
    ///
    /// # Errors
    /// Returns an error if a non-empty heap does not start with the mandatory empty string.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if !data.is_empty() && data[0] != 0 {
            return Err(malformed_error!("#Strings heap does not start with an empty string"));
        }

        Ok(Strings { data })
    }

    /// Get the identifier at `index`; index 0 is the empty string.
    ///
    /// The string runs to the next NUL byte. An entry without a terminator before the end
    /// of the heap is malformed.
    ///
    /// # Errors
    /// Returns an error if the index is outside the heap or the bytes are not valid UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index == 0 {
            return Ok("");
        }

        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        CStr::from_bytes_until_nul(&self.data[index..])
            .ok()
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| malformed_error!("Invalid string at index - {}", index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups() {
        let data = b"\0<Module>\0System.Runtime\0Console\0";
        let strings = Strings::from(data).unwrap();

        assert_eq!(strings.get(0).unwrap(), "");
        assert_eq!(strings.get(1).unwrap(), "<Module>");
        assert_eq!(strings.get(10).unwrap(), "System.Runtime");
        assert_eq!(strings.get(17).unwrap(), "Runtime");
        assert_eq!(strings.get(25).unwrap(), "Console");
        assert!(strings.get(data.len()).is_err());
    }

    #[test]
    fn invalid() {
        assert!(Strings::from(b"x\0").is_err());
        let strings = Strings::from(b"\0abc").unwrap();
        assert!(strings.get(1).is_err());
    }
}
