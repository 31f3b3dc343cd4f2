//! The metadata root (`BSJB` header) and its stream directory.
//!
//! The CLR header of a managed image points at the metadata root. The root opens with the
//! `BSJB` signature and a padded runtime version string, followed by a directory naming
//! every stream (`#~` or `#-`, `#Strings`, `#US`, `#GUID`, `#Blob`) with its offset and
//! size relative to the root. [`Root::read`] validates that every listed stream lies within
//! the metadata block, so later readers can slice streams without further checks.
//!
//! # Layout
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 4 | Signature `0x424A5342` |
//! | 4 | 2 | Major version |
//! | 6 | 2 | Minor version |
//! | 8 | 4 | Reserved |
//! | 12 | 4 | Version string length, padded to 4 |
//! | 16 | n | Version string |
//! | 16+n | 2 | Flags |
//! | 18+n | 2 | Stream count |
//! | 20+n | | Stream headers |
//!
//! # Example
//!
//! ```rust,no_run
//! use cilgraph::metadata::root::Root;
//!
//! let metadata = std::fs::read("metadata.bin")?;
//! let root = Root::read(&metadata)?;
//! println!("Runtime version: {}", root.version);
//! for stream in &root.stream_headers {
//!     println!("{} at {:#x} ({} bytes)", stream.name, stream.offset, stream.size);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 24.2.1 - Metadata root

use crate::{
    file::io::{read_le, read_le_at},
    metadata::streams::StreamHeader,
    Error::OutOfBounds,
    Result,
};

/// Signature at the start of every metadata root
pub const CIL_HEADER_MAGIC: u32 = crate::file::METADATA_SIGNATURE;

/// The parsed metadata root.
///
/// Only the fields later readers consult are kept; the reserved word and flags are skipped.
/// The stream headers keep their directory order, which matters when an image lists a
/// stream name twice: [`Root::stream`] returns the first.
#[derive(Debug, Clone)]
pub struct Root {
    /// Major version, usually 1
    pub major_version: u16,
    /// Minor version, usually 1
    pub minor_version: u16,
    /// Runtime version string, e.g. `v4.0.30319`
    pub version: String,
    /// Headers of all streams, in directory order
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parse the root at the start of `data`.
    ///
    /// `data` must span the whole metadata block described by the CLR header, since stream
    /// bounds are checked against its length.
    ///
    /// # Arguments
    /// * `data` - The metadata block, starting at the `BSJB` signature
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the header or a stream extends past `data`,
    /// and [`crate::Error::Malformed`] if the signature does not match, no stream is listed,
    /// or a stream's offset and size overflow.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(OutOfBounds);
        }

        let signature = read_le::<u32>(data)?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - {}",
                signature
            ));
        }

        let mut offset = 4;
        let major_version = read_le_at::<u16>(data, &mut offset)?;
        let minor_version = read_le_at::<u16>(data, &mut offset)?;
        offset += 4;
        let version_length = read_le_at::<u32>(data, &mut offset)? as usize;

        let Some(version_bytes) = data.get(offset..offset.saturating_add(version_length)) else {
            return Err(OutOfBounds);
        };
        let version = String::from_utf8_lossy(version_bytes)
            .trim_end_matches('\0')
            .to_string();

        offset += (version_length + 3) & !3;
        offset += 2; // flags
        let stream_count = read_le_at::<u16>(data, &mut offset)?;
        if stream_count == 0 {
            return Err(malformed_error!("Metadata root declares no streams"));
        }

        let mut stream_headers = Vec::with_capacity(usize::from(stream_count));
        for _ in 0..stream_count {
            let Some(header_bytes) = data.get(offset..) else {
                return Err(OutOfBounds);
            };

            let header = StreamHeader::from(header_bytes)?;
            match header.offset.checked_add(header.size) {
                Some(end) if end as usize <= data.len() => {}
                Some(_) => return Err(OutOfBounds),
                None => {
                    return Err(malformed_error!(
                        "Stream offset and size cause integer overflow - {} + {}",
                        header.offset,
                        header.size
                    ))
                }
            }

            offset += header.encoded_len();
            stream_headers.push(header);
        }

        Ok(Root {
            major_version,
            minor_version,
            version,
            stream_headers,
        })
    }

    /// Find a stream by name, such as `#Strings` or `#~`.
    ///
    /// Returns the first header with that name, or `None` if the image has no such stream.
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|header| header.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data = [
            0x42, 0x53, 0x4A, 0x42, 0x01, 0x00, 0x01, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x0C, 0x00, 0x00, 0x00,
            b'v', b'4', b'.', b'0', b'.', b'3', b'0', b'3', b'1', b'9', 0x00, 0x00,
            0x00, 0x00, 0x01, 0x00,
            0x2C, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
            b'#', b'~', 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];

        let root = Root::read(&data).unwrap();
        assert_eq!(root.major_version, 1);
        assert_eq!(root.version, "v4.0.30319");
        assert_eq!(root.stream_headers.len(), 1);
        assert_eq!(root.stream("#~").unwrap().offset, 0x2C);
        assert!(root.stream("#Strings").is_none());
    }

    #[test]
    fn bad_signature() {
        let data = [0u8; 32];
        assert!(Root::read(&data).is_err());
    }
}
