//! Typed rows of the tables the object graph consumes.
//!
//! Field names follow the column names of II.22. Heap columns hold raw heap offsets, list
//! columns hold the raw (possibly pointer-table) index, and coded or simple table columns are
//! decoded into [`Token`]s.

use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{schema::Column, TableId, TableLayout},
        token::Token,
    },
    Result,
};

/// The bytes of one row together with its geometry
pub struct RowData<'a> {
    bytes: &'a [u8],
    layout: &'a TableLayout,
}

impl<'a> RowData<'a> {
    pub(crate) fn new(bytes: &'a [u8], layout: &'a TableLayout) -> Self {
        RowData { bytes, layout }
    }

    /// The raw value of column `index`.
    ///
    /// # Errors
    /// Returns an error if the table has no such column or the row is truncated.
    pub fn raw(&self, index: usize) -> Result<u32> {
        let Some(column) = self.layout.columns.get(index) else {
            return Err(malformed_error!("Column {} does not exist", index));
        };

        let mut offset = column.offset;
        let value = read_le_at_dyn(self.bytes, &mut offset, column.size == 4)?;
        Ok(match column.kind {
            Column::U8 => value & 0xFF,
            _ => value,
        })
    }

    /// Column `index` narrowed to 8 bits
    ///
    /// # Errors
    /// See [`RowData::raw`].
    pub fn u8(&self, index: usize) -> Result<u8> {
        Ok(self.raw(index)? as u8)
    }

    /// Column `index` narrowed to 16 bits
    ///
    /// # Errors
    /// See [`RowData::raw`].
    pub fn u16(&self, index: usize) -> Result<u16> {
        Ok(self.raw(index)? as u16)
    }

    /// Column `index` as stored
    ///
    /// # Errors
    /// See [`RowData::raw`].
    pub fn u32(&self, index: usize) -> Result<u32> {
        self.raw(index)
    }

    /// Column `index` decoded into a token; valid for coded and simple table columns.
    ///
    /// # Errors
    /// Returns an error for other column kinds or an invalid coded tag.
    pub fn token(&self, index: usize) -> Result<Token> {
        let raw = self.raw(index)?;
        match self.layout.columns[index].kind {
            Column::Coded(kind) => kind.decode(raw),
            Column::Table(table) => Ok(Token::from_parts(table, raw)),
            other => Err(malformed_error!("Column {:?} does not hold a token", other)),
        }
    }
}

/// A row type that can be materialized from [`RowData`]
pub trait RowReadable: Sized {
    /// The table this row type belongs to
    const TABLE: TableId;

    /// Build the row from its bytes.
    ///
    /// # Errors
    /// Returns an error if a column cannot be read or decoded.
    fn from_row(row: &RowData<'_>) -> Result<Self>;
}

macro_rules! table_row {
    (
        $(#[$meta:meta])*
        $name:ident : $table:ident {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty = $reader:ident($col:expr) ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: $ty, )*
        }

        impl RowReadable for $name {
            const TABLE: TableId = TableId::$table;

            fn from_row(row: &RowData<'_>) -> Result<Self> {
                Ok($name {
                    $( $field: row.$reader($col)?, )*
                })
            }
        }
    };
}

table_row! {
    /// `Module` (0x00)
    ModuleRow: Module {
        /// Always zero
        generation: u16 = u16(0),
        /// `#Strings` offset of the module name
        name: u32 = u32(1),
        /// `#GUID` index of the module version id
        mvid: u32 = u32(2),
    }
}

table_row! {
    /// `TypeRef` (0x01)
    TypeRefRow: TypeRef {
        /// Module, ModuleRef, AssemblyRef or enclosing TypeRef
        resolution_scope: Token = token(0),
        /// `#Strings` offset of the name
        name: u32 = u32(1),
        /// `#Strings` offset of the namespace
        namespace: u32 = u32(2),
    }
}

table_row! {
    /// `TypeDef` (0x02)
    TypeDefRow: TypeDef {
        /// `TypeAttributes`
        flags: u32 = u32(0),
        /// `#Strings` offset of the name
        name: u32 = u32(1),
        /// `#Strings` offset of the namespace
        namespace: u32 = u32(2),
        /// Base type, or a null token
        extends: Token = token(3),
        /// First field of this type's run
        field_list: u32 = u32(4),
        /// First method of this type's run
        method_list: u32 = u32(5),
    }
}

table_row! {
    /// `Field` (0x04)
    FieldRow: Field {
        /// `FieldAttributes`
        flags: u16 = u16(0),
        /// `#Strings` offset of the name
        name: u32 = u32(1),
        /// `#Blob` offset of the field signature
        signature: u32 = u32(2),
    }
}

table_row! {
    /// `MethodDef` (0x06)
    MethodDefRow: MethodDef {
        /// RVA of the method body, 0 if there is none
        rva: u32 = u32(0),
        /// `MethodImplAttributes`
        impl_flags: u16 = u16(1),
        /// `MethodAttributes`
        flags: u16 = u16(2),
        /// `#Strings` offset of the name
        name: u32 = u32(3),
        /// `#Blob` offset of the method signature
        signature: u32 = u32(4),
        /// First parameter of this method's run
        param_list: u32 = u32(5),
    }
}

table_row! {
    /// `Param` (0x08)
    ParamRow: Param {
        /// `ParamAttributes`
        flags: u16 = u16(0),
        /// 0 for the return value, 1.. for parameters
        sequence: u16 = u16(1),
        /// `#Strings` offset of the name
        name: u32 = u32(2),
    }
}

table_row! {
    /// `InterfaceImpl` (0x09)
    InterfaceImplRow: InterfaceImpl {
        /// The implementing TypeDef
        class: Token = token(0),
        /// The implemented interface
        interface: Token = token(1),
    }
}

table_row! {
    /// `MemberRef` (0x0A)
    MemberRefRow: MemberRef {
        /// Declaring type, module reference or vararg method definition
        class: Token = token(0),
        /// `#Strings` offset of the name
        name: u32 = u32(1),
        /// `#Blob` offset of the signature
        signature: u32 = u32(2),
    }
}

table_row! {
    /// `Constant` (0x0B)
    ConstantRow: Constant {
        /// Element type of the value
        element_type: u8 = u8(0),
        /// Owning field, parameter or property
        parent: Token = token(1),
        /// `#Blob` offset of the value bytes
        value: u32 = u32(2),
    }
}

table_row! {
    /// `CustomAttribute` (0x0C)
    CustomAttributeRow: CustomAttribute {
        /// The entity the attribute is applied to
        parent: Token = token(0),
        /// MethodDef or MemberRef of the attribute constructor
        constructor: Token = token(1),
        /// `#Blob` offset of the argument blob
        value: u32 = u32(2),
    }
}

table_row! {
    /// `ClassLayout` (0x0F)
    ClassLayoutRow: ClassLayout {
        /// Field alignment in bytes
        packing_size: u16 = u16(0),
        /// Explicit size in bytes
        class_size: u32 = u32(1),
        /// The laid out TypeDef
        parent: Token = token(2),
    }
}

table_row! {
    /// `StandAloneSig` (0x11)
    StandAloneSigRow: StandAloneSig {
        /// `#Blob` offset of the signature
        signature: u32 = u32(0),
    }
}

table_row! {
    /// `EventMap` (0x12)
    EventMapRow: EventMap {
        /// Declaring TypeDef
        parent: Token = token(0),
        /// First event of this type's run
        event_list: u32 = u32(1),
    }
}

table_row! {
    /// `Event` (0x14)
    EventRow: Event {
        /// `EventAttributes`
        flags: u16 = u16(0),
        /// `#Strings` offset of the name
        name: u32 = u32(1),
        /// Delegate type of the event
        event_type: Token = token(2),
    }
}

table_row! {
    /// `PropertyMap` (0x15)
    PropertyMapRow: PropertyMap {
        /// Declaring TypeDef
        parent: Token = token(0),
        /// First property of this type's run
        property_list: u32 = u32(1),
    }
}

table_row! {
    /// `Property` (0x17)
    PropertyRow: Property {
        /// `PropertyAttributes`
        flags: u16 = u16(0),
        /// `#Strings` offset of the name
        name: u32 = u32(1),
        /// `#Blob` offset of the property signature
        signature: u32 = u32(2),
    }
}

table_row! {
    /// `MethodSemantics` (0x18)
    MethodSemanticsRow: MethodSemantics {
        /// `MethodSemanticsAttributes`
        semantics: u16 = u16(0),
        /// The accessor method
        method: Token = token(1),
        /// The owning event or property
        association: Token = token(2),
    }
}

table_row! {
    /// `MethodImpl` (0x19)
    MethodImplRow: MethodImpl {
        /// The TypeDef carrying the override
        class: Token = token(0),
        /// The implementing method
        body: Token = token(1),
        /// The implemented declaration
        declaration: Token = token(2),
    }
}

table_row! {
    /// `ModuleRef` (0x1A)
    ModuleRefRow: ModuleRef {
        /// `#Strings` offset of the module name
        name: u32 = u32(0),
    }
}

table_row! {
    /// `TypeSpec` (0x1B)
    TypeSpecRow: TypeSpec {
        /// `#Blob` offset of the type signature
        signature: u32 = u32(0),
    }
}

table_row! {
    /// `Assembly` (0x20)
    AssemblyRow: Assembly {
        /// `AssemblyHashAlgorithm`
        hash_alg_id: u32 = u32(0),
        /// Version major
        major_version: u16 = u16(1),
        /// Version minor
        minor_version: u16 = u16(2),
        /// Version build
        build_number: u16 = u16(3),
        /// Version revision
        revision_number: u16 = u16(4),
        /// `AssemblyFlags`
        flags: u32 = u32(5),
        /// `#Blob` offset of the public key
        public_key: u32 = u32(6),
        /// `#Strings` offset of the name
        name: u32 = u32(7),
        /// `#Strings` offset of the culture
        culture: u32 = u32(8),
    }
}

table_row! {
    /// `AssemblyRef` (0x23)
    AssemblyRefRow: AssemblyRef {
        /// Version major
        major_version: u16 = u16(0),
        /// Version minor
        minor_version: u16 = u16(1),
        /// Version build
        build_number: u16 = u16(2),
        /// Version revision
        revision_number: u16 = u16(3),
        /// `AssemblyFlags`
        flags: u32 = u32(4),
        /// `#Blob` offset of the public key or its token
        public_key_or_token: u32 = u32(5),
        /// `#Strings` offset of the name
        name: u32 = u32(6),
        /// `#Strings` offset of the culture
        culture: u32 = u32(7),
        /// `#Blob` offset of the file hash
        hash_value: u32 = u32(8),
    }
}

table_row! {
    /// `NestedClass` (0x29)
    NestedClassRow: NestedClass {
        /// The nested TypeDef
        nested_class: Token = token(0),
        /// The enclosing TypeDef
        enclosing_class: Token = token(1),
    }
}

table_row! {
    /// `GenericParam` (0x2A)
    GenericParamRow: GenericParam {
        /// Position within the owner's parameter list
        number: u16 = u16(0),
        /// `GenericParamAttributes`
        flags: u16 = u16(1),
        /// Owning TypeDef or MethodDef
        owner: Token = token(2),
        /// `#Strings` offset of the name
        name: u32 = u32(3),
    }
}

table_row! {
    /// `MethodSpec` (0x2B)
    MethodSpecRow: MethodSpec {
        /// The generic method being instantiated
        method: Token = token(0),
        /// `#Blob` offset of the instantiation signature
        instantiation: u32 = u32(1),
    }
}

table_row! {
    /// `GenericParamConstraint` (0x2C)
    GenericParamConstraintRow: GenericParamConstraint {
        /// The constrained GenericParam
        owner: Token = token(0),
        /// The constraint type
        constraint: Token = token(1),
    }
}
