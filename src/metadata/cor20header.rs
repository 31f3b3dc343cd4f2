//! The CLI header located through the PE's CLR runtime header directory.
//!
//! Data directory 14 of a managed PE image points at this 72-byte structure. It names the
//! runtime version the image was built for, the RVA and size of the metadata root, the
//! `COMIMAGE_FLAGS_*` bits and the entry point. The remaining directories (resources, strong
//! name signature, vtable fixups) are not needed to read metadata and are skipped.
//!
//! Bare metadata images have no CLI header; [`crate::metadata::reader::MetadataReader`]
//! reads their root directly.
//!
//! # Reference
//! - ECMA-335 6th Edition, Partition II, Section 25.3.3 - CLI header

use crate::{file::parser::Parser, Error::OutOfBounds, Result};

/// The fields of the CLI header this crate consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cor20Header {
    /// Major runtime version required
    pub major_runtime_version: u16,
    /// Minor runtime version required
    pub minor_runtime_version: u16,
    /// RVA of the metadata root
    pub meta_data_rva: u32,
    /// Size of the metadata in bytes
    pub meta_data_size: u32,
    /// Runtime flags (`COMIMAGE_FLAGS_*`)
    pub flags: u32,
    /// Token of the entry point method, or 0
    pub entry_point_token: u32,
}

impl Cor20Header {
    /// Parse the header at the start of `data`.
    ///
    /// # Arguments
    /// * `data` - The bytes at the CLR runtime header's file offset
    ///
    /// # Errors
    /// Returns an error if `data` is shorter than the 72-byte header, or the size field or
    /// metadata directory is invalid.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < 72 {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(data);

        let cb = parser.read_le::<u32>()?;
        if cb != 72 {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;
        let meta_data_rva = parser.read_le::<u32>()?;
        let meta_data_size = parser.read_le::<u32>()?;
        if meta_data_rva == 0 || meta_data_size == 0 {
            return Err(malformed_error!("CLI header has no metadata directory"));
        }

        let flags = parser.read_le::<u32>()?;
        let entry_point_token = parser.read_le::<u32>()?;

        Ok(Cor20Header {
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
            entry_point_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        let mut header_bytes = vec![0u8; 72];
        header_bytes[0] = 0x48;
        header_bytes[4] = 0x02;
        header_bytes[6] = 0x05;
        header_bytes[8..12].copy_from_slice(&0x2050u32.to_le_bytes());
        header_bytes[12..16].copy_from_slice(&0x0400u32.to_le_bytes());
        header_bytes[16] = 0x01;
        header_bytes[20..24].copy_from_slice(&0x0600_0001u32.to_le_bytes());

        let header = Cor20Header::read(&header_bytes).unwrap();
        assert_eq!(header.major_runtime_version, 2);
        assert_eq!(header.minor_runtime_version, 5);
        assert_eq!(header.meta_data_rva, 0x2050);
        assert_eq!(header.meta_data_size, 0x400);
        assert_eq!(header.flags, 1);
        assert_eq!(header.entry_point_token, 0x0600_0001);
    }

    #[test]
    fn invalid() {
        assert!(Cor20Header::read(&[0u8; 10]).is_err());
        assert!(Cor20Header::read(&[0u8; 72]).is_err());
    }
}
