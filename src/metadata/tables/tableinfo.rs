use strum::IntoEnumIterator;

use crate::metadata::tables::{
    schema::{columns, Column},
    CodedIndexType, TableId, CODED_INDEX_COUNT, TABLE_COUNT,
};

/// Position and width of one column within a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Byte offset within the row
    pub offset: usize,
    /// Width in bytes (1, 2 or 4)
    pub size: usize,
    /// What the column holds
    pub kind: Column,
}

/// Row geometry of one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableLayout {
    /// Size of a single row in bytes
    pub row_size: usize,
    /// Columns in storage order
    pub columns: Vec<ColumnLayout>,
}

/// Row counts and derived index widths of a tables stream.
///
/// Heap indices are 2 bytes unless the matching `HeapSizes` bit is set; table and coded
/// indices grow to 4 bytes once the addressed tables no longer fit into 16 bits minus the
/// tag width.
#[derive(Debug, Clone)]
pub struct TableInfo {
    rows: [u32; TABLE_COUNT],
    coded_sizes: [usize; CODED_INDEX_COUNT],
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
    layouts: Vec<TableLayout>,
}

impl TableInfo {
    /// Compute widths and layouts from row counts and the `HeapSizes` byte
    #[must_use]
    pub fn new(rows: [u32; TABLE_COUNT], heap_sizes: u8) -> Self {
        let mut table_info = TableInfo {
            rows,
            coded_sizes: [2; CODED_INDEX_COUNT],
            is_large_index_str: heap_sizes & 0x01 != 0,
            is_large_index_guid: heap_sizes & 0x02 != 0,
            is_large_index_blob: heap_sizes & 0x04 != 0,
            layouts: Vec::with_capacity(TABLE_COUNT),
        };

        for coded_index in CodedIndexType::iter() {
            let max_rows = coded_index
                .tables()
                .iter()
                .flatten()
                .map(|table| rows[*table as usize])
                .max()
                .unwrap_or(0);
            if u64::from(max_rows) >= 1u64 << (16 - coded_index.tag_bits()) {
                table_info.coded_sizes[coded_index as usize] = 4;
            }
        }

        for table in TableId::iter() {
            let mut offset = 0;
            let columns = columns(table)
                .iter()
                .map(|kind| {
                    let size = table_info.column_size(*kind);
                    let layout = ColumnLayout {
                        offset,
                        size,
                        kind: *kind,
                    };
                    offset += size;
                    layout
                })
                .collect();

            table_info.layouts.push(TableLayout {
                row_size: offset,
                columns,
            });
        }

        table_info
    }

    /// Number of rows in `table`
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.rows[table as usize]
    }

    /// Geometry of `table`
    #[must_use]
    pub fn layout(&self, table: TableId) -> &TableLayout {
        &self.layouts[table as usize]
    }

    /// Width of a `#Strings` index
    #[must_use]
    pub fn str_bytes(&self) -> usize {
        if self.is_large_index_str {
            4
        } else {
            2
        }
    }

    /// Width of a `#GUID` index
    #[must_use]
    pub fn guid_bytes(&self) -> usize {
        if self.is_large_index_guid {
            4
        } else {
            2
        }
    }

    /// Width of a `#Blob` index
    #[must_use]
    pub fn blob_bytes(&self) -> usize {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// Width of a simple index into `table`
    #[must_use]
    pub fn table_index_bytes(&self, table: TableId) -> usize {
        if self.row_count(table) > u32::from(u16::MAX) {
            4
        } else {
            2
        }
    }

    /// Width of a coded index of the given kind
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> usize {
        self.coded_sizes[coded_index_type as usize]
    }

    /// The table a list column actually indexes: the pointer table when one is present
    #[must_use]
    pub fn list_target(&self, table: TableId) -> TableId {
        match table.pointer_table() {
            Some(pointer) if self.row_count(pointer) > 0 => pointer,
            _ => table,
        }
    }

    fn column_size(&self, column: Column) -> usize {
        match column {
            Column::U8 | Column::U16 => 2,
            Column::U32 => 4,
            Column::Str => self.str_bytes(),
            Column::Guid => self.guid_bytes(),
            Column::Blob => self.blob_bytes(),
            Column::Table(table) => self.table_index_bytes(table),
            Column::List(table) => self.table_index_bytes(self.list_target(table)),
            Column::Coded(kind) => self.coded_index_bytes(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(entries: &[(TableId, u32)]) -> [u32; TABLE_COUNT] {
        let mut rows = [0; TABLE_COUNT];
        for (table, count) in entries {
            rows[*table as usize] = *count;
        }
        rows
    }

    #[test]
    fn small_layouts() {
        let info = TableInfo::new(counts(&[(TableId::TypeDef, 4), (TableId::MethodDef, 9)]), 0);

        assert_eq!(info.layout(TableId::TypeDef).row_size, 4 + 2 + 2 + 2 + 2 + 2);
        assert_eq!(info.layout(TableId::MethodDef).row_size, 4 + 2 + 2 + 2 + 2 + 2);
        assert_eq!(info.layout(TableId::Constant).row_size, 6);
        assert_eq!(info.layout(TableId::Assembly).row_size, 22);
        let typedef = info.layout(TableId::TypeDef);
        assert_eq!(typedef.columns[3].offset, 8);
        assert_eq!(typedef.columns[5].offset, 12);
    }

    #[test]
    fn large_indices() {
        let info = TableInfo::new(
            counts(&[(TableId::TypeRef, 0x4000), (TableId::Field, 0x1_0000)]),
            0x07,
        );

        assert_eq!(info.str_bytes(), 4);
        assert_eq!(info.guid_bytes(), 4);
        assert_eq!(info.blob_bytes(), 4);
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 4);
        assert_eq!(info.coded_index_bytes(CodedIndexType::ResolutionScope), 4);
        assert_eq!(info.coded_index_bytes(CodedIndexType::MethodDefOrRef), 2);
        assert_eq!(info.table_index_bytes(TableId::Field), 4);
        assert_eq!(info.layout(TableId::FieldLayout).row_size, 8);
    }

    #[test]
    fn pointer_tables() {
        let info = TableInfo::new(counts(&[(TableId::Field, 3), (TableId::FieldPtr, 3)]), 0);
        assert_eq!(info.list_target(TableId::Field), TableId::FieldPtr);
        assert_eq!(info.list_target(TableId::MethodDef), TableId::MethodDef);
    }
}
