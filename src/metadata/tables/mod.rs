//! The tables stream (`#~`, or the uncompressed `#-`) and its row schema.
//!
//! [`TablesHeader::read`] parses the stream header, computes every table's row geometry
//! through [`TableInfo`] and records where each table starts. Rows are then read lazily by
//! [`crate::metadata::reader::MetadataReader`] into the typed structs of [`rows`].
//!
//! # Stream layout
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 4 | Reserved |
//! | 4 | 1 | Major version |
//! | 5 | 1 | Minor version |
//! | 6 | 1 | `HeapSizes`: bits 0, 1 and 2 widen `#Strings`, `#GUID` and `#Blob` indices to 4 bytes |
//! | 7 | 1 | Reserved |
//! | 8 | 8 | `Valid` bit vector |
//! | 16 | 8 | `Sorted` bit vector |
//! | 24 | 4n | Row count of each present table |
//! | | | Rows, table after table in [`TableId`] order |
//!
//! Column widths depend on the whole image: a table index is 4 bytes once the target table
//! has more than `0xFFFF` rows, and a coded index ([`CodedIndexType`]) grows once any of its
//! candidate tables no longer fits in the bits left after the tag. [`TableInfo`] computes
//! these widths once, and [`schema`] maps each table's columns onto them.
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 22 - Metadata logical format: tables
//! - ECMA-335 6th Edition, Partition II, Section 24.2.6 - `#~` stream

mod codedindex;
mod rows;
pub mod schema;
mod tableid;
mod tableinfo;

pub use codedindex::{CodedIndexType, CODED_INDEX_COUNT};
pub use rows::*;
pub use tableid::{TableId, TABLE_COUNT};
pub use tableinfo::{ColumnLayout, TableInfo, TableLayout};

use strum::IntoEnumIterator;

use crate::{
    file::io::{read_le, read_le_at},
    Result,
};

/// `HeapSizes` bit announcing four extra bytes after the row counts
const EXTRA_DATA_FLAG: u8 = 0x40;

/// The parsed header of a tables stream
#[derive(Debug, Clone)]
pub struct TablesHeader {
    /// Major schema version
    pub major_version: u8,
    /// Minor schema version
    pub minor_version: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of tables sorted by their key column
    pub sorted: u64,
    /// Row counts and layouts
    pub info: TableInfo,
    offsets: [usize; TABLE_COUNT],
}

impl TablesHeader {
    /// Parse a tables stream header; `data` is the whole stream.
    ///
    /// # Errors
    /// Returns an error if the header is truncated, a present table id is unknown, or the
    /// declared rows do not fit into the stream.
    pub fn read(data: &[u8]) -> Result<TablesHeader> {
        if data.len() < 24 {
            return Err(out_of_bounds_error!());
        }

        let major_version = read_le::<u8>(&data[4..])?;
        let minor_version = read_le::<u8>(&data[5..])?;
        let heap_sizes = read_le::<u8>(&data[6..])?;
        let valid = read_le::<u64>(&data[8..])?;
        let sorted = read_le::<u64>(&data[16..])?;

        if valid == 0 {
            return Err(malformed_error!("Tables stream declares no tables"));
        }

        let mut offset = 24;
        let mut rows = [0_u32; TABLE_COUNT];
        for bit in 0..64_u8 {
            if valid & (1 << bit) == 0 {
                continue;
            }

            let count = read_le_at::<u32>(data, &mut offset)?;
            match TableId::from_u8(bit) {
                Some(table) => rows[table as usize] = count,
                None => {
                    return Err(malformed_error!(
                        "Tables stream declares unknown table 0x{:02x}",
                        bit
                    ))
                }
            }
        }

        if heap_sizes & EXTRA_DATA_FLAG != 0 {
            offset += 4;
        }

        let info = TableInfo::new(rows, heap_sizes);
        let mut offsets = [0_usize; TABLE_COUNT];
        for table in TableId::iter() {
            offsets[table as usize] = offset;
            let size = (info.row_count(table) as usize)
                .checked_mul(info.layout(table).row_size)
                .ok_or(out_of_bounds_error!())?;
            offset = offset.checked_add(size).ok_or(out_of_bounds_error!())?;
        }

        if offset > data.len() {
            return Err(malformed_error!(
                "Tables need {} bytes, but the stream holds {}",
                offset,
                data.len()
            ));
        }

        Ok(TablesHeader {
            major_version,
            minor_version,
            valid,
            sorted,
            info,
            offsets,
        })
    }

    /// Offset of `table`'s first row relative to the stream start
    #[must_use]
    pub fn table_offset(&self, table: TableId) -> usize {
        self.offsets[table as usize]
    }

    /// Byte range of row `rid` (1-based) relative to the stream start.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] for rid 0 or a rid past the table's end.
    pub fn row_range(&self, table: TableId, rid: u32) -> Result<std::ops::Range<usize>> {
        if rid == 0 || rid > self.info.row_count(table) {
            return Err(crate::Error::RowNotFound { table, rid });
        }

        let row_size = self.info.layout(table).row_size;
        let start = self.table_offset(table) + (rid as usize - 1) * row_size;
        Ok(start..start + row_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(tables: &[(TableId, u32)], heap_sizes: u8, row_bytes: usize) -> Vec<u8> {
        let mut valid = 0_u64;
        for (table, _) in tables {
            valid |= 1 << (*table as u8);
        }

        let mut data = vec![0, 0, 0, 0, 2, 0, heap_sizes, 1];
        data.extend_from_slice(&valid.to_le_bytes());
        data.extend_from_slice(&0_u64.to_le_bytes());
        let mut sorted = tables.to_vec();
        sorted.sort();
        for (_, count) in sorted {
            data.extend_from_slice(&count.to_le_bytes());
        }
        if heap_sizes & EXTRA_DATA_FLAG != 0 {
            data.extend_from_slice(&[0; 4]);
        }
        data.resize(data.len() + row_bytes, 0xAB);
        data
    }

    #[test]
    fn header_offsets() {
        let data = stream(&[(TableId::Module, 1), (TableId::TypeDef, 3)], 0, 10 + 3 * 14);
        let header = TablesHeader::read(&data).unwrap();

        assert_eq!(header.major_version, 2);
        assert_eq!(header.info.row_count(TableId::TypeDef), 3);
        assert_eq!(header.table_offset(TableId::Module), 32);
        assert_eq!(header.table_offset(TableId::TypeDef), 42);
        assert_eq!(header.row_range(TableId::TypeDef, 2).unwrap(), 56..70);
        assert!(matches!(
            header.row_range(TableId::TypeDef, 4),
            Err(crate::Error::RowNotFound { rid: 4, .. })
        ));
        assert!(header.row_range(TableId::TypeDef, 0).is_err());
    }

    #[test]
    fn extra_data_is_skipped() {
        let data = stream(&[(TableId::Module, 1)], EXTRA_DATA_FLAG, 10);
        let header = TablesHeader::read(&data).unwrap();
        assert_eq!(header.table_offset(TableId::Module), 32);
    }

    #[test]
    fn truncated_rows() {
        let data = stream(&[(TableId::Module, 1), (TableId::TypeDef, 3)], 0, 20);
        assert!(TablesHeader::read(&data).is_err());
    }

    #[test]
    fn unknown_table() {
        let mut data = stream(&[(TableId::Module, 1)], 0, 10);
        data[8 + 5] = 0x80; // bit 0x2F
        assert!(TablesHeader::read(&data).is_err());
    }
}
