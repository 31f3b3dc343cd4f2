//! Module-wide reverse indices.
//!
//! Metadata stores most relations in one direction only (a type owns a run of fields, a
//! `NestedClass` row names its enclosing type, an attribute names its parent). The graph needs
//! the other direction too; [`ModuleIndex`] computes all of them in one pass over the tables
//! the first time any of them is needed.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::{
    metadata::{
        reader::MetadataReader,
        tables::{
            ClassLayoutRow, ConstantRow, CustomAttributeRow, EventMapRow, GenericParamConstraintRow,
            GenericParamRow, InterfaceImplRow, MethodImplRow, MethodSemanticsRow, NestedClassRow,
            PropertyMapRow, TableId, TypeDefRow,
        },
        token::Token,
        typesystem::MethodSemanticsAttributes,
    },
    Result,
};

/// Reverse relations over one module's tables
#[derive(Debug, Default)]
pub(crate) struct ModuleIndex {
    /// Field rid -> declaring TypeDef rid
    pub field_owner: HashMap<u32, u32>,
    /// MethodDef rid -> declaring TypeDef rid
    pub method_owner: HashMap<u32, u32>,
    /// Param rid -> owning MethodDef rid
    pub param_owner: HashMap<u32, u32>,
    /// Nested TypeDef rid -> enclosing TypeDef rid
    pub enclosing: HashMap<u32, u32>,
    /// Enclosing TypeDef rid -> nested TypeDef rids, in table order
    pub nested: HashMap<u32, Vec<u32>>,
    /// Parent token -> CustomAttribute rids, in table order
    pub attributes: HashMap<Token, Vec<u32>>,
    /// Accessor MethodDef rid -> owning property or event and the accessor role
    pub semantics_by_method: HashMap<u32, (Token, MethodSemanticsAttributes)>,
    /// Property or event token -> accessor MethodDef rids and their roles
    pub semantics_by_association: HashMap<Token, Vec<(u32, MethodSemanticsAttributes)>>,
    /// TypeDef rid -> Property rids
    pub properties: HashMap<u32, Vec<u32>>,
    /// Property rid -> declaring TypeDef rid
    pub property_owner: HashMap<u32, u32>,
    /// TypeDef rid -> Event rids
    pub events: HashMap<u32, Vec<u32>>,
    /// Event rid -> declaring TypeDef rid
    pub event_owner: HashMap<u32, u32>,
    /// Owner token -> GenericParam rids ordered by number
    pub generic_parameters: HashMap<Token, Vec<u32>>,
    /// GenericParam rid -> constraint type tokens
    pub constraints: HashMap<u32, Vec<Token>>,
    /// TypeDef rid -> implemented interface tokens
    pub interfaces: HashMap<u32, Vec<Token>>,
    /// Field, parameter or property token -> Constant rid
    pub constants: HashMap<Token, u32>,
    /// TypeDef rid -> ClassLayout rid
    pub layouts: HashMap<u32, u32>,
    /// TypeDef rid -> (implementing body, implemented declaration) pairs
    pub method_impls: HashMap<u32, Vec<(Token, Token)>>,
    /// Method bodies named by a `MethodImpl` row
    pub implementing_methods: HashSet<Token>,
    /// (namespace, name) -> top-level TypeDef rid
    pub names: HashMap<(String, String), u32>,
    /// Namespace -> top-level TypeDef rids, namespaces sorted by name
    pub namespaces: BTreeMap<String, Vec<u32>>,
}

impl ModuleIndex {
    /// Scan the tables of `reader` once and build every relation.
    ///
    /// # Errors
    /// Returns an error if a row cannot be read.
    pub fn build(reader: &MetadataReader) -> Result<ModuleIndex> {
        let mut index = ModuleIndex::default();

        for rid in 1..=reader.row_count(TableId::NestedClass) {
            let row: NestedClassRow = reader.row(rid)?;
            index
                .enclosing
                .insert(row.nested_class.row(), row.enclosing_class.row());
            index
                .nested
                .entry(row.enclosing_class.row())
                .or_default()
                .push(row.nested_class.row());
        }

        for rid in 1..=reader.row_count(TableId::TypeDef) {
            for field in reader.list(TableId::TypeDef, rid, 4, TableId::Field)? {
                index.field_owner.insert(field, rid);
            }
            for method in reader.list(TableId::TypeDef, rid, 5, TableId::MethodDef)? {
                index.method_owner.insert(method, rid);
            }

            if !index.enclosing.contains_key(&rid) {
                let row: TypeDefRow = reader.row(rid)?;
                let namespace = reader.string(row.namespace)?.to_string();
                let name = reader.string(row.name)?.to_string();
                index.namespaces.entry(namespace.clone()).or_default().push(rid);
                index.names.entry((namespace, name)).or_insert(rid);
            }
        }

        for rid in 1..=reader.row_count(TableId::MethodDef) {
            for param in reader.list(TableId::MethodDef, rid, 5, TableId::Param)? {
                index.param_owner.insert(param, rid);
            }
        }

        for rid in 1..=reader.row_count(TableId::PropertyMap) {
            let row: PropertyMapRow = reader.row(rid)?;
            let properties = reader.list(TableId::PropertyMap, rid, 1, TableId::Property)?;
            for property in &properties {
                index.property_owner.insert(*property, row.parent.row());
            }
            index
                .properties
                .entry(row.parent.row())
                .or_default()
                .extend(properties);
        }

        for rid in 1..=reader.row_count(TableId::EventMap) {
            let row: EventMapRow = reader.row(rid)?;
            let events = reader.list(TableId::EventMap, rid, 1, TableId::Event)?;
            for event in &events {
                index.event_owner.insert(*event, row.parent.row());
            }
            index.events.entry(row.parent.row()).or_default().extend(events);
        }

        for rid in 1..=reader.row_count(TableId::MethodSemantics) {
            let row: MethodSemanticsRow = reader.row(rid)?;
            let semantics = MethodSemanticsAttributes::from_bits_retain(row.semantics);
            index
                .semantics_by_method
                .entry(row.method.row())
                .or_insert((row.association, semantics));
            index
                .semantics_by_association
                .entry(row.association)
                .or_default()
                .push((row.method.row(), semantics));
        }

        for rid in 1..=reader.row_count(TableId::CustomAttribute) {
            let row: CustomAttributeRow = reader.row(rid)?;
            index.attributes.entry(row.parent).or_default().push(rid);
        }

        let mut generic_parameters: HashMap<Token, Vec<(u16, u32)>> = HashMap::new();
        for rid in 1..=reader.row_count(TableId::GenericParam) {
            let row: GenericParamRow = reader.row(rid)?;
            generic_parameters
                .entry(row.owner)
                .or_default()
                .push((row.number, rid));
        }
        for (owner, mut parameters) in generic_parameters {
            parameters.sort_unstable();
            index
                .generic_parameters
                .insert(owner, parameters.into_iter().map(|(_, rid)| rid).collect());
        }

        for rid in 1..=reader.row_count(TableId::GenericParamConstraint) {
            let row: GenericParamConstraintRow = reader.row(rid)?;
            index
                .constraints
                .entry(row.owner.row())
                .or_default()
                .push(row.constraint);
        }

        for rid in 1..=reader.row_count(TableId::InterfaceImpl) {
            let row: InterfaceImplRow = reader.row(rid)?;
            index
                .interfaces
                .entry(row.class.row())
                .or_default()
                .push(row.interface);
        }

        for rid in 1..=reader.row_count(TableId::Constant) {
            let row: ConstantRow = reader.row(rid)?;
            index.constants.entry(row.parent).or_insert(rid);
        }

        for rid in 1..=reader.row_count(TableId::ClassLayout) {
            let row: ClassLayoutRow = reader.row(rid)?;
            index.layouts.entry(row.parent.row()).or_insert(rid);
        }

        for rid in 1..=reader.row_count(TableId::MethodImpl) {
            let row: MethodImplRow = reader.row(rid)?;
            index.implementing_methods.insert(row.body);
            index
                .method_impls
                .entry(row.class.row())
                .or_default()
                .push((row.body, row.declaration));
        }

        debug!(
            types = reader.row_count(TableId::TypeDef),
            namespaces = index.namespaces.len(),
            attributes = reader.row_count(TableId::CustomAttribute),
            "module index built"
        );

        Ok(index)
    }

    /// Custom attribute rids applied to `parent`
    pub fn attributes_of(&self, parent: Token) -> &[u32] {
        self.attributes.get(&parent).map_or(&[], Vec::as_slice)
    }

    /// Generic parameter rids declared by `owner`
    pub fn generic_parameters_of(&self, owner: Token) -> &[u32] {
        self.generic_parameters.get(&owner).map_or(&[], Vec::as_slice)
    }
}
