//! Writes small bare metadata images (a `BSJB` root with `#~`, `#Strings`, `#US`, `#GUID`
//! and `#Blob`) for tests.
//!
//! Rows are appended in table order the way a compiler emits them: fields, methods,
//! parameters, properties and events always belong to the most recently added owner.
//! Method bodies are placed after the streams; the image is flat, so their RVA is their
//! file offset.

use std::collections::HashMap;

use cilgraph::{
    file::METADATA_SIGNATURE,
    metadata::{
        tables::{schema::Column, CodedIndexType, TableId, TableInfo, TABLE_COUNT},
        token::Token,
    },
};

const RUNTIME_VERSION: &[u8; 12] = b"v4.0.30319\0\0";

const CORE_LIBRARY: &str = "System.Runtime";
const CORE_TOKEN: [u8; 8] = [0xB0, 0x3F, 0x5F, 0x7F, 0x11, 0xD5, 0x0A, 0x3A];

/// Builder for a bare metadata image
#[derive(Debug, Clone)]
pub struct MetadataBuilder {
    strings: Vec<u8>,
    string_offsets: HashMap<String, u32>,
    blobs: Vec<u8>,
    blob_offsets: HashMap<Vec<u8>, u32>,
    guids: Vec<[u8; 16]>,
    user_strings: Vec<u8>,
    rows: Vec<Vec<Vec<u32>>>,
    bodies: Vec<(u32, Vec<u8>)>,
    core_library: Option<Token>,
}

impl MetadataBuilder {
    /// An image with a `Module` row named `name` and the `<Module>` type
    pub fn new(name: &str) -> Self {
        let mut builder = MetadataBuilder {
            strings: vec![0],
            string_offsets: HashMap::new(),
            blobs: vec![0],
            blob_offsets: HashMap::new(),
            guids: Vec::new(),
            user_strings: vec![0],
            rows: vec![Vec::new(); TABLE_COUNT],
            bodies: Vec::new(),
            core_library: None,
        };

        let name = builder.string(name);
        let mvid = builder.guid([
            0x8E, 0x90, 0x37, 0xD4, 0xE6, 0x65, 0x7C, 0x48, 0x97, 0x35, 0x7B, 0xDF, 0xF6, 0x99,
            0xBE, 0xA5,
        ]);
        builder.push(TableId::Module, vec![0, name, mvid, 0, 0]);
        builder.type_def(0, "", "<Module>", Token::new(0));
        builder
    }

    /// Intern an identifier and return its `#Strings` offset
    pub fn string(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(offset) = self.string_offsets.get(value) {
            return *offset;
        }

        let offset = self.strings.len() as u32;
        self.strings.extend_from_slice(value.as_bytes());
        self.strings.push(0);
        self.string_offsets.insert(value.to_string(), offset);
        offset
    }

    /// Intern a blob and return its `#Blob` offset
    pub fn blob(&mut self, value: &[u8]) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(offset) = self.blob_offsets.get(value) {
            return *offset;
        }

        let offset = self.blobs.len() as u32;
        self.blobs.extend_from_slice(&compressed(value.len() as u32));
        self.blobs.extend_from_slice(value);
        self.blob_offsets.insert(value.to_vec(), offset);
        offset
    }

    /// Append a GUID and return its 1-based index
    pub fn guid(&mut self, value: [u8; 16]) -> u32 {
        self.guids.push(value);
        self.guids.len() as u32
    }

    /// Append a string literal and return its `ldstr` token
    pub fn user_string(&mut self, value: &str) -> Token {
        let offset = self.user_strings.len() as u32;
        let units: Vec<u16> = value.encode_utf16().collect();
        self.user_strings
            .extend_from_slice(&compressed(units.len() as u32 * 2 + 1));
        for unit in units {
            self.user_strings.extend_from_slice(&unit.to_le_bytes());
        }
        self.user_strings.push(0);
        Token::new(0x7000_0000 | offset)
    }

    /// Append a raw row; values are heap offsets, rids or already encoded coded indices
    pub fn push(&mut self, table: TableId, values: Vec<u32>) -> Token {
        let rows = &mut self.rows[table as usize];
        rows.push(values);
        Token::from_parts(table, rows.len() as u32)
    }

    fn count(&self, table: TableId) -> u32 {
        self.rows[table as usize].len() as u32
    }

    fn last(&self, table: TableId) -> Token {
        Token::from_parts(table, self.count(table))
    }

    /// The `Assembly` row
    pub fn assembly(&mut self, name: &str, version: (u16, u16, u16, u16), public_key: &[u8]) {
        let key = self.blob(public_key);
        let name = self.string(name);
        let flags = u32::from(!public_key.is_empty());
        self.push(
            TableId::Assembly,
            vec![0x8004, version.0.into(), version.1.into(), version.2.into(), version.3.into(), flags, key, name, 0],
        );
    }

    /// An `AssemblyRef` row carrying a public key token (or nothing)
    pub fn assembly_ref(
        &mut self,
        name: &str,
        version: (u16, u16, u16, u16),
        public_key_token: &[u8],
    ) -> Token {
        let token = self.blob(public_key_token);
        let name = self.string(name);
        self.push(
            TableId::AssemblyRef,
            vec![version.0.into(), version.1.into(), version.2.into(), version.3.into(), 0, token, name, 0, 0],
        )
    }

    /// A `ModuleRef` row
    pub fn module_ref(&mut self, name: &str) -> Token {
        let name = self.string(name);
        self.push(TableId::ModuleRef, vec![name])
    }

    /// A type reference resolved through `scope`
    pub fn type_ref(&mut self, scope: Token, namespace: &str, name: &str) -> Token {
        let scope = coded(CodedIndexType::ResolutionScope, scope);
        let name = self.string(name);
        let namespace = self.string(namespace);
        self.push(TableId::TypeRef, vec![scope, name, namespace])
    }

    /// A type reference into the core library
    pub fn type_ref_core(&mut self, namespace: &str, name: &str) -> Token {
        let scope = match self.core_library {
            Some(scope) => scope,
            None => {
                let scope = self.assembly_ref(CORE_LIBRARY, (8, 0, 0, 0), &CORE_TOKEN);
                self.core_library = Some(scope);
                scope
            }
        };
        self.type_ref(scope, namespace, name)
    }

    /// A type definition; pass a null token for `extends` to derive from nothing
    pub fn type_def(&mut self, flags: u32, namespace: &str, name: &str, extends: Token) -> Token {
        let name = self.string(name);
        let namespace = self.string(namespace);
        let extends = coded(CodedIndexType::TypeDefOrRef, extends);
        let fields = self.count(TableId::Field) + 1;
        let methods = self.count(TableId::MethodDef) + 1;
        self.push(
            TableId::TypeDef,
            vec![flags, name, namespace, extends, fields, methods],
        )
    }

    /// A field of `owner`, which must be the last type definition
    pub fn field(&mut self, owner: Token, flags: u16, name: &str, signature: &[u8]) -> Token {
        assert_eq!(owner, self.last(TableId::TypeDef), "fields belong to the last type");
        let name = self.string(name);
        let signature = self.blob(signature);
        self.push(TableId::Field, vec![flags.into(), name, signature])
    }

    /// A method of `owner`, which must be the last type definition
    pub fn method(&mut self, owner: Token, flags: u16, name: &str, signature: &[u8]) -> Token {
        assert_eq!(owner, self.last(TableId::TypeDef), "methods belong to the last type");
        let name = self.string(name);
        let signature = self.blob(signature);
        let params = self.count(TableId::Param) + 1;
        self.push(
            TableId::MethodDef,
            vec![0, 0, flags.into(), name, signature, params],
        )
    }

    /// Give `method` an IL body holding `code`
    pub fn body(&mut self, method: Token, code: &[u8]) {
        self.bodies.push((method.row(), code.to_vec()));
    }

    /// A parameter row of `method`, which must be the last method
    pub fn param(&mut self, method: Token, sequence: u16, name: &str) -> Token {
        self.param_with_flags(method, 0, sequence, name)
    }

    /// A parameter row carrying `ParamAttributes` bits
    pub fn param_with_flags(&mut self, method: Token, flags: u16, sequence: u16, name: &str) -> Token {
        assert_eq!(method, self.last(TableId::MethodDef), "parameters belong to the last method");
        let name = self.string(name);
        self.push(TableId::Param, vec![flags.into(), sequence.into(), name])
    }

    /// A property of `owner`; properties of one type must be added together
    pub fn property(&mut self, owner: Token, name: &str, signature: &[u8]) -> Token {
        self.map_owner(TableId::PropertyMap, TableId::Property, owner);
        let name = self.string(name);
        let signature = self.blob(signature);
        self.push(TableId::Property, vec![0, name, signature])
    }

    /// An event of `owner` with handler type `event_type`
    pub fn event(&mut self, owner: Token, name: &str, event_type: Token) -> Token {
        self.map_owner(TableId::EventMap, TableId::Event, owner);
        let name = self.string(name);
        let event_type = coded(CodedIndexType::TypeDefOrRef, event_type);
        self.push(TableId::Event, vec![0, name, event_type])
    }

    fn map_owner(&mut self, map: TableId, member: TableId, owner: Token) {
        let current = self.rows[map as usize].last().map(|row| row[0]);
        if current != Some(owner.row()) {
            let start = self.count(member) + 1;
            self.push(map, vec![owner.row(), start]);
        }
    }

    /// Link `method` to a property or event; `semantics` holds `MethodSemanticsAttributes` bits
    pub fn semantics(&mut self, association: Token, method: Token, semantics: u16) {
        let association = coded(CodedIndexType::HasSemantics, association);
        self.push(
            TableId::MethodSemantics,
            vec![semantics.into(), method.row(), association],
        );
    }

    /// Make `nested` a nested type of `enclosing`
    pub fn nested(&mut self, nested: Token, enclosing: Token) {
        self.push(TableId::NestedClass, vec![nested.row(), enclosing.row()]);
    }

    /// A generic parameter of a type or method
    pub fn generic_param(&mut self, owner: Token, number: u16, name: &str) -> Token {
        let owner = coded(CodedIndexType::TypeOrMethodDef, owner);
        let name = self.string(name);
        self.push(TableId::GenericParam, vec![number.into(), 0, owner, name])
    }

    /// Constrain `param` to `constraint`
    pub fn constraint(&mut self, param: Token, constraint: Token) {
        let constraint = coded(CodedIndexType::TypeDefOrRef, constraint);
        self.push(TableId::GenericParamConstraint, vec![param.row(), constraint]);
    }

    /// Declare that `class` implements `interface`
    pub fn interface(&mut self, class: Token, interface: Token) {
        let interface = coded(CodedIndexType::TypeDefOrRef, interface);
        self.push(TableId::InterfaceImpl, vec![class.row(), interface]);
    }

    /// A reference to a member of `parent`
    pub fn member_ref(&mut self, parent: Token, name: &str, signature: &[u8]) -> Token {
        let parent = coded(CodedIndexType::MemberRefParent, parent);
        let name = self.string(name);
        let signature = self.blob(signature);
        self.push(TableId::MemberRef, vec![parent, name, signature])
    }

    /// A type specification
    pub fn type_spec(&mut self, signature: &[u8]) -> Token {
        let signature = self.blob(signature);
        self.push(TableId::TypeSpec, vec![signature])
    }

    /// An instantiation of a generic method
    pub fn method_spec(&mut self, method: Token, instantiation: &[u8]) -> Token {
        let method = coded(CodedIndexType::MethodDefOrRef, method);
        let instantiation = self.blob(instantiation);
        self.push(TableId::MethodSpec, vec![method, instantiation])
    }

    /// A standalone signature
    pub fn standalone_sig(&mut self, signature: &[u8]) -> Token {
        let signature = self.blob(signature);
        self.push(TableId::StandAloneSig, vec![signature])
    }

    /// A constant of element type `element_type` attached to a field, parameter or property
    pub fn constant(&mut self, parent: Token, element_type: u8, value: &[u8]) -> Token {
        let parent = coded(CodedIndexType::HasConstant, parent);
        let value = self.blob(value);
        self.push(TableId::Constant, vec![element_type.into(), parent, value])
    }

    /// A custom attribute with constructor `constructor` and value blob `value`
    pub fn custom_attribute(&mut self, parent: Token, constructor: Token, value: &[u8]) -> Token {
        let parent = coded(CodedIndexType::HasCustomAttribute, parent);
        let constructor = coded(CodedIndexType::CustomAttributeType, constructor);
        let value = self.blob(value);
        self.push(TableId::CustomAttribute, vec![parent, constructor, value])
    }

    /// Serialize the image
    pub fn build(mut self) -> Vec<u8> {
        let mut counts = [0_u32; TABLE_COUNT];
        for (index, rows) in self.rows.iter().enumerate() {
            counts[index] = rows.len() as u32;
        }

        let mut heap_sizes = 0_u8;
        if self.strings.len() > 0xFFFF {
            heap_sizes |= 0x01;
        }
        if self.guids.len() > 0xFFFF {
            heap_sizes |= 0x02;
        }
        if self.blobs.len() > 0xFFFF {
            heap_sizes |= 0x04;
        }
        let info = TableInfo::new(counts, heap_sizes);

        let present: Vec<usize> = (0..TABLE_COUNT).filter(|table| counts[*table] > 0).collect();
        let tables_len = 24
            + 4 * present.len()
            + present
                .iter()
                .map(|table| counts[*table] as usize * layout_of(&info, *table).row_size)
                .sum::<usize>();

        let guids: Vec<u8> = self.guids.iter().flatten().copied().collect();
        let streams: [(&str, usize); 5] = [
            ("#~", aligned(tables_len)),
            ("#Strings", aligned(self.strings.len())),
            ("#US", aligned(self.user_strings.len())),
            ("#GUID", guids.len()),
            ("#Blob", aligned(self.blobs.len())),
        ];

        let header_len = 16
            + RUNTIME_VERSION.len()
            + 4
            + streams
                .iter()
                .map(|(name, _)| 8 + aligned(name.len() + 1))
                .sum::<usize>();
        let metadata_len = header_len + streams.iter().map(|(_, size)| size).sum::<usize>();

        let mut bodies = Vec::new();
        for (rid, code) in &self.bodies {
            let rva = (metadata_len + bodies.len()) as u32;
            self.rows[TableId::MethodDef as usize][*rid as usize - 1][0] = rva;
            bodies.extend_from_slice(&method_body(code));
            bodies.resize(aligned(bodies.len()), 0);
        }

        let mut image = Vec::with_capacity(metadata_len + bodies.len());
        image.extend_from_slice(&METADATA_SIGNATURE.to_le_bytes());
        image.extend_from_slice(&1_u16.to_le_bytes());
        image.extend_from_slice(&1_u16.to_le_bytes());
        image.extend_from_slice(&0_u32.to_le_bytes());
        image.extend_from_slice(&(RUNTIME_VERSION.len() as u32).to_le_bytes());
        image.extend_from_slice(RUNTIME_VERSION);
        image.extend_from_slice(&0_u16.to_le_bytes());
        image.extend_from_slice(&(streams.len() as u16).to_le_bytes());

        let mut offset = header_len;
        for (name, size) in &streams {
            image.extend_from_slice(&(offset as u32).to_le_bytes());
            image.extend_from_slice(&(*size as u32).to_le_bytes());
            let start = image.len();
            image.extend_from_slice(name.as_bytes());
            image.resize(start + aligned(name.len() + 1), 0);
            offset += size;
        }
        debug_assert_eq!(image.len(), header_len);

        let start = image.len();
        self.write_tables(&mut image, &info, heap_sizes, &present);
        image.resize(start + streams[0].1, 0);

        for heap in [&self.strings, &self.user_strings, &guids, &self.blobs] {
            let start = image.len();
            image.extend_from_slice(heap);
            image.resize(start + aligned(heap.len()), 0);
        }

        image.extend_from_slice(&bodies);
        image
    }

    fn write_tables(&self, image: &mut Vec<u8>, info: &TableInfo, heap_sizes: u8, present: &[usize]) {
        let valid = present.iter().fold(0_u64, |valid, table| valid | (1_u64 << *table));
        image.extend_from_slice(&0_u32.to_le_bytes());
        image.extend_from_slice(&[2, 0, heap_sizes, 1]);
        image.extend_from_slice(&valid.to_le_bytes());
        image.extend_from_slice(&0_u64.to_le_bytes());
        for table in present {
            image.extend_from_slice(&(self.rows[*table].len() as u32).to_le_bytes());
        }

        for table in present {
            let layout = layout_of(info, *table);
            for row in &self.rows[*table] {
                assert_eq!(row.len(), layout.columns.len(), "column count of table {table:#x}");
                for (value, column) in row.iter().zip(&layout.columns) {
                    let value = match column.kind {
                        Column::U8 => value & 0xFF,
                        _ => *value,
                    };
                    match column.size {
                        4 => image.extend_from_slice(&value.to_le_bytes()),
                        _ => image.extend_from_slice(&(value as u16).to_le_bytes()),
                    }
                }
            }
        }
    }
}

fn layout_of(info: &TableInfo, table: usize) -> &cilgraph::metadata::tables::TableLayout {
    let id = TableId::from_u8(table as u8).expect("dense table ids");
    info.layout(id)
}

fn coded(kind: CodedIndexType, token: Token) -> u32 {
    if token.is_null() {
        return 0;
    }
    kind.encode(token).expect("token fits the coded index")
}

fn aligned(len: usize) -> usize {
    (len + 3) & !3
}

/// ECMA-335 compressed unsigned integer
pub fn compressed(value: u32) -> Vec<u8> {
    match value {
        0..=0x7F => vec![value as u8],
        0x80..=0x3FFF => vec![0x80 | (value >> 8) as u8, value as u8],
        _ => vec![
            0xC0 | (value >> 24) as u8,
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ],
    }
}

fn method_body(code: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(code.len() + 12);
    if code.len() < 64 {
        body.push(((code.len() as u8) << 2) | 0x02);
    } else {
        body.extend_from_slice(&0x3003_u16.to_le_bytes());
        body.extend_from_slice(&8_u16.to_le_bytes());
        body.extend_from_slice(&(code.len() as u32).to_le_bytes());
        body.extend_from_slice(&0_u32.to_le_bytes());
    }
    body.extend_from_slice(code);
    body
}
