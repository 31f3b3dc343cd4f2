//! The `#GUID` heap: 16-byte entries addressed by 1-based index.
//!
//! Unlike the other heaps, `#GUID` columns hold an entry number rather than a byte offset.
//! The heap has no leading empty entry; index 0 in a column means "no GUID". Values are
//! returned as [`uguid::Guid`] in the mixed-endian layout the runtime writes.
//!
//! # Reference
//! - ECMA-335 6th Edition, Partition II, Section 24.2.5 - `#GUID` heap

use crate::{Error::OutOfBounds, Result};

/// View over the `#GUID` heap
pub struct Guid<'a> {
    data: &'a [u8],
}

impl<'a> Guid<'a> {
    /// Wrap heap bytes
    #[must_use]
    pub fn from(data: &'a [u8]) -> Guid<'a> {
        Guid { data }
    }

    /// Get the entry at the 1-based `index`; index 0 is the nil GUID.
    ///
    /// # Arguments
    /// * `index` - The value of a `#GUID` column, such as `Module::Mvid`
    ///
    /// # Errors
    /// Returns an error if the index is past the last entry.
    pub fn get(&self, index: usize) -> Result<uguid::Guid> {
        if index == 0 {
            return Ok(uguid::Guid::ZERO);
        }

        let offset_start = (index - 1) * 16;
        let Some(bytes) = self.data.get(offset_start..offset_start + 16) else {
            return Err(OutOfBounds);
        };

        let mut buffer = [0u8; 16];
        buffer.copy_from_slice(bytes);

        Ok(uguid::Guid::from_bytes(buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups() {
        #[rustfmt::skip]
        let data: [u8; 32] = [
            0x8e, 0x90, 0x37, 0xd4, 0xe6, 0x65, 0x7c, 0x48, 0x97, 0x35, 0x7b, 0xdf, 0xf6, 0x99, 0xbe, 0xa5,
            0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
        ];

        let guids = Guid::from(&data);
        assert_eq!(
            guids.get(1).unwrap(),
            uguid::guid!("d437908e-65e6-487c-9735-7bdff699bea5")
        );
        assert_eq!(
            guids.get(2).unwrap(),
            uguid::guid!("AAAAAAAA-AAAA-AAAA-AAAA-AAAAAAAAAAAA")
        );
        assert_eq!(guids.get(0).unwrap(), uguid::Guid::ZERO);
        assert!(guids.get(3).is_err());
    }
}
