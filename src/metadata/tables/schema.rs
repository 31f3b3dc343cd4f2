//! Column layouts of every metadata table (II.22).

use crate::metadata::tables::{CodedIndexType, TableId};

/// Kind of one table column; determines its on-disk width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// A 1-byte constant followed by a padding byte
    U8,
    /// A 2-byte constant
    U16,
    /// A 4-byte constant
    U32,
    /// An index into the `#Strings` heap
    Str,
    /// An index into the `#GUID` heap
    Guid,
    /// An index into the `#Blob` heap
    Blob,
    /// A simple index into another table
    Table(TableId),
    /// The start of a run of rows in another table, possibly through its pointer table
    List(TableId),
    /// A coded index
    Coded(CodedIndexType),
}

use Column::{Blob, Coded, List, Str, Table, Guid, U16, U32, U8};

/// The columns of `table`, in storage order
#[must_use]
pub fn columns(table: TableId) -> &'static [Column] {
    match table {
        TableId::Module => &[U16, Str, Guid, Guid, Guid],
        TableId::TypeRef => &[Coded(CodedIndexType::ResolutionScope), Str, Str],
        TableId::TypeDef => &[
            U32,
            Str,
            Str,
            Coded(CodedIndexType::TypeDefOrRef),
            List(TableId::Field),
            List(TableId::MethodDef),
        ],
        TableId::FieldPtr => &[Table(TableId::Field)],
        TableId::Field => &[U16, Str, Blob],
        TableId::MethodPtr => &[Table(TableId::MethodDef)],
        TableId::MethodDef => &[U32, U16, U16, Str, Blob, List(TableId::Param)],
        TableId::ParamPtr => &[Table(TableId::Param)],
        TableId::Param => &[U16, U16, Str],
        TableId::InterfaceImpl => &[Table(TableId::TypeDef), Coded(CodedIndexType::TypeDefOrRef)],
        TableId::MemberRef => &[Coded(CodedIndexType::MemberRefParent), Str, Blob],
        TableId::Constant => &[U8, Coded(CodedIndexType::HasConstant), Blob],
        TableId::CustomAttribute => &[
            Coded(CodedIndexType::HasCustomAttribute),
            Coded(CodedIndexType::CustomAttributeType),
            Blob,
        ],
        TableId::FieldMarshal => &[Coded(CodedIndexType::HasFieldMarshal), Blob],
        TableId::DeclSecurity => &[U16, Coded(CodedIndexType::HasDeclSecurity), Blob],
        TableId::ClassLayout => &[U16, U32, Table(TableId::TypeDef)],
        TableId::FieldLayout => &[U32, Table(TableId::Field)],
        TableId::StandAloneSig => &[Blob],
        TableId::EventMap => &[Table(TableId::TypeDef), List(TableId::Event)],
        TableId::EventPtr => &[Table(TableId::Event)],
        TableId::Event => &[U16, Str, Coded(CodedIndexType::TypeDefOrRef)],
        TableId::PropertyMap => &[Table(TableId::TypeDef), List(TableId::Property)],
        TableId::PropertyPtr => &[Table(TableId::Property)],
        TableId::Property => &[U16, Str, Blob],
        TableId::MethodSemantics => &[
            U16,
            Table(TableId::MethodDef),
            Coded(CodedIndexType::HasSemantics),
        ],
        TableId::MethodImpl => &[
            Table(TableId::TypeDef),
            Coded(CodedIndexType::MethodDefOrRef),
            Coded(CodedIndexType::MethodDefOrRef),
        ],
        TableId::ModuleRef => &[Str],
        TableId::TypeSpec => &[Blob],
        TableId::ImplMap => &[
            U16,
            Coded(CodedIndexType::MemberForwarded),
            Str,
            Table(TableId::ModuleRef),
        ],
        TableId::FieldRVA => &[U32, Table(TableId::Field)],
        TableId::EncLog => &[U32, U32],
        TableId::EncMap => &[U32],
        TableId::Assembly => &[U32, U16, U16, U16, U16, U32, Blob, Str, Str],
        TableId::AssemblyProcessor => &[U32],
        TableId::AssemblyOS => &[U32, U32, U32],
        TableId::AssemblyRef => &[U16, U16, U16, U16, U32, Blob, Str, Str, Blob],
        TableId::AssemblyRefProcessor => &[U32, Table(TableId::AssemblyRef)],
        TableId::AssemblyRefOS => &[U32, U32, U32, Table(TableId::AssemblyRef)],
        TableId::File => &[U32, Str, Blob],
        TableId::ExportedType => &[U32, U32, Str, Str, Coded(CodedIndexType::Implementation)],
        TableId::ManifestResource => &[U32, U32, Str, Coded(CodedIndexType::Implementation)],
        TableId::NestedClass => &[Table(TableId::TypeDef), Table(TableId::TypeDef)],
        TableId::GenericParam => &[U16, U16, Coded(CodedIndexType::TypeOrMethodDef), Str],
        TableId::MethodSpec => &[Coded(CodedIndexType::MethodDefOrRef), Blob],
        TableId::GenericParamConstraint => &[
            Table(TableId::GenericParam),
            Coded(CodedIndexType::TypeDefOrRef),
        ],
    }
}
