//! The `#Blob` heap: length-prefixed byte sequences (signatures, attribute values, keys).
//!
//! Every entry starts with its length in the compressed unsigned encoding of II.23.2: one
//! byte up to `0x7F`, two bytes with the top bits `10` up to `0x3FFF`, and four bytes with
//! the top bits `110` beyond that. The entry at offset 0 is always empty.
//!
//! # Reference
//! - ECMA-335 6th Edition, Partition II, Section 24.2.4 - `#US` and `#Blob` heaps

use crate::{file::parser::Parser, Error::OutOfBounds, Result};

/// View over the `#Blob` heap.
///
/// Returned slices borrow from the image, so decoded signatures and attribute values can be
/// parsed in place.
///
/// # Examples
///
/// ```rust
/// use cilgraph::metadata::streams::Blob;
///
/// let blobs = Blob::from(&[0x00, 0x02, 0x06, 0x08])?;
/// assert_eq!(blobs.get(1)?, &[0x06, 0x08]);
/// assert!(blobs.get(0)?.is_empty());
/// # Ok::<(), cilgraph::Error>(())
/// ```
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Wrap heap bytes; an absent heap is represented by an empty slice.
    ///
    /// # Arguments
    /// * `data` - The heap bytes as listed in the stream directory
    ///
    /// # Errors
    /// Returns an error if a non-empty heap does not start with the mandatory empty blob.
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if !data.is_empty() && data[0] != 0 {
            return Err(malformed_error!("Invalid memory for #Blob heap"));
        }

        Ok(Blob { data })
    }

    /// Get the blob starting at `index`, without its length prefix.
    ///
    /// # Errors
    /// Returns an error if the prefix or the payload reaches outside the heap.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index == 0 {
            return Ok(&[]);
        }

        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(&self.data[index..]);
        let len = parser.read_compressed_uint()? as usize;
        let data_start = index + parser.pos();

        let Some(data_end) = data_start.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if data_end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[data_start..data_end])
    }
}
