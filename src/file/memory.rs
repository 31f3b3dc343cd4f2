//! Owned in-memory backend.
//!
//! Holds images handed over as a byte vector, such as those built in tests or read from a
//! stream that cannot be mapped.

use super::Backend;

/// Image bytes held in an owned buffer
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Take ownership of `data`
    #[must_use]
    pub fn new(data: Vec<u8>) -> Memory {
        Memory { data }
    }
}

impl Backend for Memory {
    fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        let mut data = vec![0xCC_u8; 64];
        data[10..15].copy_from_slice(&[0xBB; 5]);
        let memory = Memory::new(data);

        assert_eq!(memory.len(), 64);
        assert_eq!(memory.data_slice(10, 5).unwrap(), &[0xBB; 5]);
        assert_eq!(memory.data_slice(64, 0).unwrap(), &[] as &[u8]);
        assert!(memory.data_slice(usize::MAX, 2).is_err());
        assert!(memory.data_slice(0, 65).is_err());
        assert!(Memory::new(Vec::new()).data_slice(0, 1).is_err());
    }
}
