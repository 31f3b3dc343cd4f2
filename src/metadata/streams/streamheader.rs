//! Entries of the metadata root's stream directory.
//!
//! A header is two little-endian `u32` values, the stream's offset from the metadata root
//! and its size, followed by the stream name as a NUL-terminated ASCII string padded to a
//! multiple of 4 bytes. Names are limited to 32 bytes including the terminator.
//!
//! # Reference
//! - ECMA-335 6th Edition, Partition II, Section 24.2.2 - Stream header

use crate::{file::io::read_le, Error::OutOfBounds, Result};

/// One entry of the metadata root's stream directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Stream name, e.g. `#~` or `#Strings`
    pub name: String,
}

impl StreamHeader {
    /// Parse a header from the start of `data`.
    ///
    /// # Arguments
    /// * `data` - The directory bytes, starting at this header
    ///
    /// # Errors
    /// Returns an error if the header is truncated or the name is not NUL-terminated within
    /// 32 bytes.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(OutOfBounds);
        }

        let name_bytes = &data[8..data.len().min(8 + 32)];
        let Some(name_len) = name_bytes.iter().position(|byte| *byte == 0) else {
            return Err(malformed_error!("Stream header name is not terminated"));
        };
        let name = String::from_utf8_lossy(&name_bytes[..name_len]).into_owned();

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name,
        })
    }

    /// Size of this header in the directory, including the 4-byte aligned name
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        8 + ((self.name.len() + 1 + 3) & !3)
    }
}
