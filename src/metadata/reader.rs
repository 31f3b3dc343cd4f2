//! Row and heap access over one image.
//!
//! [`MetadataReader`] locates the metadata root, keeps the byte ranges of every stream and
//! the parsed tables header, and reads rows and heap entries on demand. Nothing is decoded
//! ahead of time; the reader itself holds only offsets.

use std::ops::Range;

use tracing::debug;

use crate::{
    file::{io::read_le, File, METADATA_SIGNATURE},
    metadata::{
        cor20header::Cor20Header,
        method::MethodBody,
        root::Root,
        streams::{Blob, Guid, Strings, UserStrings},
        tables::{RowData, RowReadable, TableId, TableInfo, TablesHeader},
    },
    Result,
};

/// Typed access to the tables and heaps of one image
pub struct MetadataReader {
    file: File,
    root: Root,
    cor20: Option<Cor20Header>,
    tables: Range<usize>,
    header: TablesHeader,
    strings: Range<usize>,
    blobs: Range<usize>,
    guids: Range<usize>,
    user_strings: Range<usize>,
}

impl MetadataReader {
    /// Locate and parse the metadata of `file`.
    ///
    /// Returns `Ok(None)` if the image carries no metadata root where one is expected.
    ///
    /// # Errors
    /// Returns an error if the root, its stream directory or the tables header is malformed.
    pub fn new(file: File) -> Result<Option<MetadataReader>> {
        let (cor20, metadata) = if file.is_pe() {
            let Some((clr_rva, clr_size)) = file.clr() else {
                return Ok(None);
            };

            let clr_offset = file.rva_to_offset(clr_rva)?;
            let cor20 = Cor20Header::read(file.data_slice(clr_offset, clr_size.max(72))?)?;
            let metadata_offset = file.rva_to_offset(cor20.meta_data_rva as usize)?;
            (
                Some(cor20),
                metadata_offset..metadata_offset + cor20.meta_data_size as usize,
            )
        } else {
            (None, 0..file.len())
        };

        let metadata_bytes = file.data_slice(metadata.start, metadata.len())?;
        if read_le::<u32>(metadata_bytes)? != METADATA_SIGNATURE {
            return Ok(None);
        }

        let root = Root::read(metadata_bytes)?;
        let stream = |names: &[&str]| -> Range<usize> {
            names
                .iter()
                .find_map(|name| root.stream(name))
                .map_or(0..0, |header| {
                    let start = metadata.start + header.offset as usize;
                    start..start + header.size as usize
                })
        };

        let tables = stream(&["#~", "#-"]);
        if tables.is_empty() {
            return Err(malformed_error!("Metadata root has no tables stream"));
        }

        let header = TablesHeader::read(file.data_slice(tables.start, tables.len())?)?;
        let reader = MetadataReader {
            strings: stream(&["#Strings"]),
            blobs: stream(&["#Blob"]),
            guids: stream(&["#GUID"]),
            user_strings: stream(&["#US"]),
            file,
            root,
            cor20,
            tables,
            header,
        };

        // Validate heap preambles once so later lookups only fail on bad indices
        Strings::from(reader.heap(&reader.strings))?;
        Blob::from(reader.heap(&reader.blobs))?;
        UserStrings::from(reader.heap(&reader.user_strings))?;

        debug!(
            version = %reader.root.version,
            pe = reader.file.is_pe(),
            type_definitions = reader.row_count(TableId::TypeDef),
            methods = reader.row_count(TableId::MethodDef),
            "metadata located"
        );

        Ok(Some(reader))
    }

    fn heap(&self, range: &Range<usize>) -> &[u8] {
        self.file.data().get(range.clone()).unwrap_or_default()
    }

    /// The image this reader decodes
    #[must_use]
    pub fn file(&self) -> &File {
        &self.file
    }

    /// The metadata root
    #[must_use]
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// The CLI header, absent for bare metadata images
    #[must_use]
    pub fn cor20(&self) -> Option<&Cor20Header> {
        self.cor20.as_ref()
    }

    /// Row counts and geometry of the tables stream
    #[must_use]
    pub fn table_info(&self) -> &TableInfo {
        &self.header.info
    }

    /// Number of rows in `table`
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.header.info.row_count(table)
    }

    /// Identifier at `offset` in `#Strings`.
    ///
    /// # Errors
    /// Returns an error if `offset` is outside the heap or the string is not valid UTF-8.
    pub fn string(&self, offset: u32) -> Result<&str> {
        Strings::from(self.heap(&self.strings))?.get(offset as usize)
    }

    /// Blob at `offset` in `#Blob`.
    ///
    /// # Errors
    /// Returns an error if `offset` is outside the heap or the blob is truncated.
    pub fn blob(&self, offset: u32) -> Result<&[u8]> {
        Blob::from(self.heap(&self.blobs))?.get(offset as usize)
    }

    /// Guid at 1-based `index` in `#GUID`.
    ///
    /// # Errors
    /// Returns an error if `index` is outside the heap.
    pub fn guid(&self, index: u32) -> Result<uguid::Guid> {
        Guid::from(self.heap(&self.guids)).get(index as usize)
    }

    /// String literal at `offset` in `#US`.
    ///
    /// # Errors
    /// Returns an error if `offset` is outside the heap.
    pub fn user_string(&self, offset: u32) -> Result<String> {
        UserStrings::from(self.heap(&self.user_strings))?.get(offset as usize)
    }

    /// Read row `rid` of `R`'s table.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] if the row does not exist.
    pub fn row<R: RowReadable>(&self, rid: u32) -> Result<R> {
        R::from_row(&self.row_data(R::TABLE, rid)?)
    }

    /// Raw bytes of row `rid` in `table`, with its geometry.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] if the row does not exist.
    pub fn row_data(&self, table: TableId, rid: u32) -> Result<RowData<'_>> {
        let range = self.header.row_range(table, rid)?;
        let bytes = self.file.data_slice(self.tables.start + range.start, range.len())?;
        Ok(RowData::new(bytes, self.header.info.layout(table)))
    }

    /// Resolve the run of `target` rows owned by row `rid` of `owner`, whose first entry is
    /// stored in list column `column`. The run ends where the next owner row's run starts.
    /// Pointer tables are followed, so the result holds `target` row ids.
    ///
    /// # Errors
    /// Returns an error if an owner or pointer row cannot be read.
    pub fn list(&self, owner: TableId, rid: u32, column: usize, target: TableId) -> Result<Vec<u32>> {
        let indexed = self.header.info.list_target(target);
        let limit = self.row_count(indexed) + 1;

        let start = self.row_data(owner, rid)?.u32(column)?.clamp(1, limit);
        let end = if rid < self.row_count(owner) {
            self.row_data(owner, rid + 1)?.u32(column)?.clamp(start, limit)
        } else {
            limit
        };

        if indexed == target {
            return Ok((start..end).collect());
        }

        (start..end)
            .map(|index| self.row_data(indexed, index)?.u32(0))
            .collect()
    }

    /// Decode the method body at `rva`.
    ///
    /// # Errors
    /// Returns an error if the address is not mapped or the body is malformed.
    pub fn method_body(&self, rva: u32) -> Result<MethodBody> {
        let offset = self.file.rva_to_offset(rva as usize)?;
        let Some(data) = self.file.data().get(offset..) else {
            return Err(out_of_bounds_error!());
        };

        MethodBody::read(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::tables::{FieldRow, TypeDefRow},
        test::MetadataBuilder,
    };

    #[test]
    fn bare_metadata_rows_and_heaps() {
        let mut builder = MetadataBuilder::new("Sample");
        let object = builder.type_ref_core("System", "Object");
        let point = builder.type_def(0x0010_0001, "Demo", "Point", object);
        builder.field(point, 0x0006, "X", &[0x06, 0x08]);
        builder.field(point, 0x0006, "Y", &[0x06, 0x08]);
        let other = builder.type_def(0x0010_0001, "Demo", "Other", object);
        builder.field(other, 0x0006, "Z", &[0x06, 0x08]);

        let file = File::from_mem(builder.build()).unwrap();
        let reader = MetadataReader::new(file).unwrap().unwrap();

        assert!(reader.cor20().is_none());
        assert_eq!(reader.root().version, "v4.0.30319");
        assert_eq!(reader.row_count(TableId::TypeDef), 3);

        let row: TypeDefRow = reader.row(2).unwrap();
        assert_eq!(reader.string(row.name).unwrap(), "Point");
        assert_eq!(reader.string(row.namespace).unwrap(), "Demo");
        assert_eq!(reader.list(TableId::TypeDef, 2, 4, TableId::Field).unwrap(), vec![1, 2]);
        assert_eq!(reader.list(TableId::TypeDef, 3, 4, TableId::Field).unwrap(), vec![3]);
        assert!(reader.list(TableId::TypeDef, 1, 4, TableId::Field).unwrap().is_empty());

        let field: FieldRow = reader.row(3).unwrap();
        assert_eq!(reader.string(field.name).unwrap(), "Z");
        assert_eq!(reader.blob(field.signature).unwrap(), &[0x06, 0x08]);

        assert!(matches!(
            reader.row::<TypeDefRow>(4),
            Err(crate::Error::RowNotFound { rid: 4, .. })
        ));
    }

    #[test]
    fn not_metadata() {
        let mut data = METADATA_SIGNATURE.to_le_bytes().to_vec();
        data.extend_from_slice(&[0u8; 8]);
        let file = File::from_mem(data).unwrap();
        assert!(MetadataReader::new(file).is_err());
    }
}
