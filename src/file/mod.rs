//! Image ownership and address translation.
//!
//! A [`File`] owns the bytes of one image for as long as the decoded graph needs them. Two
//! layouts are recognized:
//!
//! - a PE image (`MZ`) whose optional header carries a CLR runtime header directory, parsed
//!   with [`goblin`] and kept next to its buffer through [`ouroboros`];
//! - a bare metadata root (`BSJB`), treated as a flat image where relative virtual addresses
//!   equal file offsets.
//!
//! Anything else is rejected with [`crate::Error::NotSupported`].

pub mod io;
pub mod memory;
pub mod parser;
pub mod physical;

use std::path::Path;

use crate::{
    Error::{Empty, GoblinErr, NotSupported},
    Result,
};
use goblin::pe::PE;
use memory::Memory;
use ouroboros::self_referencing;
use physical::Physical;

/// Signature of a bare metadata root, little-endian `BSJB`
pub const METADATA_SIGNATURE: u32 = 0x424A_5342;

/// Where the bytes of an image live. Shared across threads with the graph.
pub trait Backend: Send + Sync {
    /// The whole image
    fn data(&self) -> &[u8];

    /// Image length in bytes
    fn len(&self) -> usize {
        self.data().len()
    }

    /// `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range leaves the image.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data().get(offset..end))
            .ok_or(out_of_bounds_error!())
    }
}

#[self_referencing]
/// A loaded image holding CLI metadata.
///
/// Dropping the `File` releases the buffer or memory map exactly once.
pub struct File {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
    /// The parsed PE structure, absent for bare metadata images.
    #[borrows(data)]
    #[not_covariant]
    pe: Option<PE<'this>>,
}

impl File {
    /// Loads an image from the given path through a memory map.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] when the file cannot be read, and
    /// [`crate::Error::NotSupported`] / [`crate::Error::Empty`] when the bytes are not an image
    /// of a recognized layout.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Loads an image from a memory buffer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotSupported`] / [`crate::Error::Empty`] when the bytes are not
    /// an image of a recognized layout.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let data = Box::new(data);

        File::try_new(data, |data| {
            let bytes = data.as_ref().data();
            if bytes.len() >= 4 && io::read_le::<u32>(bytes)? == METADATA_SIGNATURE {
                return Ok(None);
            }

            if !bytes.starts_with(b"MZ") {
                return Err(NotSupported);
            }

            let pe = PE::parse(bytes).map_err(GoblinErr)?;
            match pe.header.optional_header {
                Some(optional_header)
                    if optional_header
                        .data_directories
                        .get_clr_runtime_header()
                        .is_some() =>
                {
                    Ok(Some(pe))
                }
                _ => Err(NotSupported),
            }
        })
    }

    /// Returns the total size of the loaded image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns true if the image holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the image is a PE file rather than a bare metadata root.
    #[must_use]
    pub fn is_pe(&self) -> bool {
        self.with_pe(|pe| pe.is_some())
    }

    /// Returns the whole image buffer.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.borrow_data().data()
    }

    /// Returns a bounds-checked slice of the image.
    ///
    /// # Errors
    /// Returns an error if the requested range is out of bounds.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.borrow_data().data_slice(offset, len)
    }

    /// Returns the RVA and size of the CLR runtime header, if this is a PE image.
    #[must_use]
    pub fn clr(&self) -> Option<(usize, usize)> {
        self.with_pe(|pe| {
            let optional_header = pe.as_ref()?.header.optional_header?;
            let clr = optional_header.data_directories.get_clr_runtime_header()?;
            Some((clr.virtual_address as usize, clr.size as usize))
        })
    }

    /// Converts a relative virtual address into a file offset.
    ///
    /// Bare metadata images are flat, so the address is returned unchanged after a bounds
    /// check.
    ///
    /// # Errors
    /// Returns an error if no section contains the address.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let len = self.len();
        self.with_pe(|pe| {
            let Some(pe) = pe else {
                if rva < len {
                    return Ok(rva);
                }
                return Err(out_of_bounds_error!());
            };

            let rva_u32 = u32::try_from(rva)
                .map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;

            for section in &pe.sections {
                let extent = section.virtual_size.max(section.size_of_raw_data);
                let Some(section_max) = section.virtual_address.checked_add(extent) else {
                    return Err(malformed_error!(
                        "Section malformed, causing integer overflow - {} + {}",
                        section.virtual_address,
                        extent
                    ));
                };

                if section.virtual_address <= rva_u32 && rva_u32 < section_max {
                    return Ok((rva - section.virtual_address as usize)
                        + section.pointer_to_raw_data as usize);
                }
            }

            Err(malformed_error!(
                "RVA could not be converted to offset - {}",
                rva
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn load_bare_metadata() {
        let mut data = METADATA_SIGNATURE.to_le_bytes().to_vec();
        data.extend_from_slice(&[0u8; 12]);

        let file = File::from_mem(data).unwrap();
        assert!(!file.is_pe());
        assert_eq!(file.len(), 16);
        assert_eq!(file.clr(), None);
        assert_eq!(file.rva_to_offset(8).unwrap(), 8);
        assert!(file.rva_to_offset(16).is_err());
    }

    #[test]
    fn load_unrecognized() {
        assert!(matches!(File::from_mem(vec![]), Err(Error::Empty)));
        assert!(matches!(
            File::from_mem(b"hello world".to_vec()),
            Err(Error::NotSupported)
        ));
    }

    #[test]
    fn load_truncated_pe() {
        assert!(File::from_mem(b"MZ\x90\x00".to_vec()).is_err());
    }
}
