//! The module: owner of one image's reader and of every entity decoded from it.
//!
//! Entities are interned per table in [`Arena`]s, one publish-once slot per row, so two
//! lookups of the same token return the same `Arc`. Entities point back at the module
//! through a `Weak`; the module and the `Arc`s it hands out are the only strong owners.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use tracing::debug;

use crate::{
    metadata::{
        config::LoaderConfig,
        customattributes::CustomAttribute,
        diagnostics::Diagnostics,
        reader::MetadataReader,
        signatures::{
            parse_local_var_signature, parse_method_signature, primitive_name, LocalVariable,
            MethodSignature, NamedTypeRef, SignatureParser, TypeProvider, TypeSig,
        },
        tables::{
            AssemblyRow, ConstantRow, CustomAttributeRow, EventRow, FieldRow, GenericParamRow,
            MemberRefRow, MethodDefRow, MethodSpecRow, ModuleRow, ParamRow, PropertyRow,
            StandAloneSigRow, TableId, TypeDefRow, TypeRefRow, TypeSpecRow,
        },
        token::Token,
        typesystem::{
            index::ModuleIndex, AssemblyReference, ConstantValue, Event, Field, GenericContext,
            GenericParameter, Lazy, Member, MemberReference, Method, MethodSpecification,
            ModuleReference, Namespace, Parameter, Property, ResolutionScope, TypeDefinition,
            TypeReference,
        },
    },
    Error::{RecursionLimit, RowNotFound, TypeNotFound},
    Result,
};

/// One publish-once slot per row of a table
struct Arena<T> {
    table: TableId,
    slots: Vec<Lazy<Arc<T>>>,
}

impl<T> Arena<T> {
    fn new(table: TableId, reader: &MetadataReader) -> Self {
        Arena {
            table,
            slots: (0..reader.row_count(table)).map(|_| Lazy::new()).collect(),
        }
    }

    fn get_or_try_init<F>(&self, rid: u32, init: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        let slot = (rid as usize)
            .checked_sub(1)
            .and_then(|index| self.slots.get(index))
            .ok_or(RowNotFound {
                table: self.table,
                rid,
            })?;

        slot.get_or_try_init(|| Ok(Arc::new(init()?))).cloned()
    }

    fn len(&self) -> u32 {
        self.slots.len() as u32
    }
}

/// A single image with metadata, and the entity graph decoded from it.
///
/// Every entity reachable from a module holds only a `Weak` link back to it. Once the last
/// `Arc<Module>` is dropped, values already computed stay readable and anything still
/// pending reports [`crate::Error::Disposed`].
pub struct Module {
    this: Weak<Module>,
    reader: MetadataReader,
    config: LoaderConfig,
    diagnostics: Arc<Diagnostics>,
    name: String,
    mvid: uguid::Guid,
    index: Lazy<ModuleIndex>,
    namespaces: Lazy<Arc<Namespace>>,
    type_definitions: Arena<TypeDefinition>,
    type_references: Arena<TypeReference>,
    fields: Arena<Field>,
    methods: Arena<Method>,
    parameters: Arena<Parameter>,
    properties: Arena<Property>,
    events: Arena<Event>,
    member_references: Arena<MemberReference>,
    method_specifications: Arena<MethodSpecification>,
    generic_parameters: Arena<GenericParameter>,
    custom_attributes: Arena<CustomAttribute>,
    assembly_references: Arena<AssemblyReference>,
    module_references: Arena<ModuleReference>,
    synthesized: SkipMap<String, Arc<TypeReference>>,
    enum_widths: DashMap<String, u8>,
}

impl Module {
    /// Wrap a reader into a module.
    ///
    /// # Errors
    /// Returns an error if the `Module` row is missing or its heap references are invalid.
    pub fn new(
        reader: MetadataReader,
        config: LoaderConfig,
        diagnostics: Arc<Diagnostics>,
    ) -> Result<Arc<Module>> {
        let row: ModuleRow = reader.row(1)?;
        let name = reader.string(row.name)?.to_string();
        let mvid = reader.guid(row.mvid)?;

        debug!(module = %name, %mvid, "module opened");

        Ok(Arc::new_cyclic(|this| Module {
            this: this.clone(),
            type_definitions: Arena::new(TableId::TypeDef, &reader),
            type_references: Arena::new(TableId::TypeRef, &reader),
            fields: Arena::new(TableId::Field, &reader),
            methods: Arena::new(TableId::MethodDef, &reader),
            parameters: Arena::new(TableId::Param, &reader),
            properties: Arena::new(TableId::Property, &reader),
            events: Arena::new(TableId::Event, &reader),
            member_references: Arena::new(TableId::MemberRef, &reader),
            method_specifications: Arena::new(TableId::MethodSpec, &reader),
            generic_parameters: Arena::new(TableId::GenericParam, &reader),
            custom_attributes: Arena::new(TableId::CustomAttribute, &reader),
            assembly_references: Arena::new(TableId::AssemblyRef, &reader),
            module_references: Arena::new(TableId::ModuleRef, &reader),
            reader,
            config,
            diagnostics,
            name,
            mvid,
            index: Lazy::new(),
            namespaces: Lazy::new(),
            synthesized: SkipMap::new(),
            enum_widths: DashMap::new(),
        }))
    }

    /// Module name from the `Module` row
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module version id
    #[must_use]
    pub fn mvid(&self) -> uguid::Guid {
        self.mvid
    }

    /// Limits this module decodes with
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The diagnostics sink shared by everything decoded from this module
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    /// The raw reader
    #[must_use]
    pub fn metadata(&self) -> &MetadataReader {
        &self.reader
    }

    pub(crate) fn weak(&self) -> Weak<Module> {
        self.this.clone()
    }

    pub(crate) fn index(&self) -> Result<&ModuleIndex> {
        self.index.get_or_try_init(|| ModuleIndex::build(&self.reader))
    }

    /// The `TypeDef` row `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] for a bad rid, or a heap error.
    pub fn type_definition(&self, rid: u32) -> Result<Arc<TypeDefinition>> {
        self.type_definitions.get_or_try_init(rid, || {
            let row: TypeDefRow = self.reader.row(rid)?;
            Ok(TypeDefinition::new(
                rid,
                self.weak(),
                &row,
                self.reader.string(row.name)?,
                self.reader.string(row.namespace)?,
            ))
        })
    }

    /// The `TypeRef` row `rid`, with its enclosing references.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] for a bad rid and
    /// [`crate::Error::RecursionLimit`] if the enclosing chain does not terminate.
    pub fn type_reference(&self, rid: u32) -> Result<Arc<TypeReference>> {
        self.type_reference_at(rid, 0)
    }

    fn type_reference_at(&self, rid: u32, depth: usize) -> Result<Arc<TypeReference>> {
        if depth > self.config.max_signature_depth {
            return Err(RecursionLimit(self.config.max_signature_depth));
        }

        self.type_references.get_or_try_init(rid, || {
            let row: TypeRefRow = self.reader.row(rid)?;
            let scope = row.resolution_scope;
            let scope = match scope.table_id() {
                _ if scope.is_null() => ResolutionScope::None,
                Some(TableId::Module) => ResolutionScope::Module,
                Some(TableId::ModuleRef) => ResolutionScope::ModuleReference(scope),
                Some(TableId::AssemblyRef) => ResolutionScope::AssemblyReference(scope),
                Some(TableId::TypeRef) => {
                    ResolutionScope::Enclosing(self.type_reference_at(scope.row(), depth + 1)?)
                }
                _ => {
                    return Err(malformed_error!(
                        "Invalid resolution scope {} for TypeRef {}",
                        scope,
                        rid
                    ))
                }
            };

            Ok(TypeReference::new(
                Some(Token::from_parts(TableId::TypeRef, rid)),
                self.weak(),
                self.reader.string(row.namespace)?,
                self.reader.string(row.name)?,
                scope,
            ))
        })
    }

    /// The `Field` row `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] for a bad rid, or a heap error.
    pub fn field(&self, rid: u32) -> Result<Arc<Field>> {
        self.fields.get_or_try_init(rid, || {
            let row: FieldRow = self.reader.row(rid)?;
            Ok(Field::new(rid, self.weak(), &row, self.reader.string(row.name)?))
        })
    }

    /// The `MethodDef` row `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] for a bad rid, or a heap error.
    pub fn method(&self, rid: u32) -> Result<Arc<Method>> {
        self.methods.get_or_try_init(rid, || {
            let row: MethodDefRow = self.reader.row(rid)?;
            Ok(Method::new(rid, self.weak(), &row, self.reader.string(row.name)?))
        })
    }

    /// The `Param` row `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] for a bad rid, or a heap error.
    pub fn parameter(&self, rid: u32) -> Result<Arc<Parameter>> {
        self.parameters.get_or_try_init(rid, || {
            let row: ParamRow = self.reader.row(rid)?;
            Ok(Parameter::new(rid, self.weak(), &row, self.reader.string(row.name)?))
        })
    }

    /// The `Property` row `rid`, with its accessors attached.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] for a bad rid, or an error reading an
    /// accessor.
    pub fn property(&self, rid: u32) -> Result<Arc<Property>> {
        let property = self.properties.get_or_try_init(rid, || {
            let row: PropertyRow = self.reader.row(rid)?;
            Ok(Property::new(rid, self.weak(), &row, self.reader.string(row.name)?))
        })?;
        property.load_accessors(self)?;
        Ok(property)
    }

    /// The `Event` row `rid`, with its accessors attached.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] for a bad rid, or an error reading an
    /// accessor.
    pub fn event(&self, rid: u32) -> Result<Arc<Event>> {
        let event = self.events.get_or_try_init(rid, || {
            let row: EventRow = self.reader.row(rid)?;
            Ok(Event::new(rid, self.weak(), &row, self.reader.string(row.name)?))
        })?;
        event.load_accessors(self)?;
        Ok(event)
    }

    /// The `MemberRef` row `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] for a bad rid, or a heap error.
    pub fn member_reference(&self, rid: u32) -> Result<Arc<MemberReference>> {
        self.member_references.get_or_try_init(rid, || {
            let row: MemberRefRow = self.reader.row(rid)?;
            Ok(MemberReference::new(
                rid,
                self.weak(),
                &row,
                self.reader.string(row.name)?,
            ))
        })
    }

    /// The `MethodSpec` row `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] for a bad rid.
    pub fn method_specification(&self, rid: u32) -> Result<Arc<MethodSpecification>> {
        self.method_specifications.get_or_try_init(rid, || {
            let row: MethodSpecRow = self.reader.row(rid)?;
            Ok(MethodSpecification::new(rid, self.weak(), &row))
        })
    }

    /// The `GenericParam` row `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] for a bad rid, or a heap error.
    pub fn generic_parameter(&self, rid: u32) -> Result<Arc<GenericParameter>> {
        self.generic_parameters.get_or_try_init(rid, || {
            let row: GenericParamRow = self.reader.row(rid)?;
            Ok(GenericParameter::new(
                rid,
                self.weak(),
                &row,
                self.reader.string(row.name)?,
            ))
        })
    }

    /// The `CustomAttribute` row `rid`. Its value is decoded on first access.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] for a bad rid.
    pub fn custom_attribute(&self, rid: u32) -> Result<Arc<CustomAttribute>> {
        self.custom_attributes.get_or_try_init(rid, || {
            let row: CustomAttributeRow = self.reader.row(rid)?;
            Ok(CustomAttribute::new(rid, self.weak(), &row))
        })
    }

    /// The `AssemblyRef` row `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] for a bad rid, or a malformed key blob.
    pub fn assembly_reference(&self, rid: u32) -> Result<Arc<AssemblyReference>> {
        self.assembly_references
            .get_or_try_init(rid, || AssemblyReference::read(rid, &self.reader))
    }

    /// The `ModuleRef` row `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowNotFound`] for a bad rid, or a heap error.
    pub fn module_reference(&self, rid: u32) -> Result<Arc<ModuleReference>> {
        self.module_references
            .get_or_try_init(rid, || ModuleReference::read(rid, &self.reader))
    }

    /// Every type definition in table order, `<Module>` first.
    ///
    /// # Errors
    /// Returns an error if a row cannot be read.
    pub fn types(&self) -> Result<Vec<Arc<TypeDefinition>>> {
        (1..=self.type_definitions.len())
            .map(|rid| self.type_definition(rid))
            .collect()
    }

    /// Every assembly this module references.
    ///
    /// # Errors
    /// Returns an error if a row cannot be read.
    pub fn assembly_references(&self) -> Result<Vec<Arc<AssemblyReference>>> {
        (1..=self.assembly_references.len())
            .map(|rid| self.assembly_reference(rid))
            .collect()
    }

    /// Every module reference.
    ///
    /// # Errors
    /// Returns an error if a row cannot be read.
    pub fn module_references(&self) -> Result<Vec<Arc<ModuleReference>>> {
        (1..=self.module_references.len())
            .map(|rid| self.module_reference(rid))
            .collect()
    }

    /// The root of the namespace tree.
    ///
    /// # Errors
    /// Returns an error if a type row cannot be read.
    pub fn namespaces(&self) -> Result<Arc<Namespace>> {
        self.namespaces
            .get_or_try_init(|| Namespace::build(self))
            .cloned()
    }

    /// The top-level type `namespace.name` defined in this module.
    ///
    /// # Errors
    /// Returns an error if the index or the row cannot be read.
    pub fn find_type(&self, namespace: &str, name: &str) -> Result<Option<Arc<TypeDefinition>>> {
        match self
            .index()?
            .names
            .get(&(namespace.to_string(), name.to_string()))
        {
            Some(rid) => Ok(Some(self.type_definition(*rid)?)),
            None => Ok(None),
        }
    }

    /// The simple name of the assembly this module is the manifest of.
    ///
    /// # Errors
    /// Returns an error if the `Assembly` row cannot be read.
    pub fn assembly_name(&self) -> Result<Option<String>> {
        if self.reader.row_count(TableId::Assembly) == 0 {
            return Ok(None);
        }

        let row: AssemblyRow = self.reader.row(1)?;
        Ok(Some(self.reader.string(row.name)?.to_string()))
    }

    /// Resolve a `TypeDef`, `TypeRef` or `TypeSpec` token in `context`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] for tokens of other tables, or a decoding
    /// error.
    pub fn resolve_type(&self, token: Token, context: &GenericContext) -> Result<TypeSig> {
        self.type_from_token(token, context, 0)
    }

    /// Resolve a member token: field, method, property, event, member reference or method
    /// specification.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] for tokens of other tables, or a row error.
    pub fn resolve_member(&self, token: Token) -> Result<Member> {
        let rid = token.row();
        Ok(match token.table_id() {
            Some(TableId::Field) => Member::Field(self.field(rid)?),
            Some(TableId::MethodDef) => Member::Method(self.method(rid)?),
            Some(TableId::Property) => Member::Property(self.property(rid)?),
            Some(TableId::Event) => Member::Event(self.event(rid)?),
            Some(TableId::MemberRef) => Member::Reference(self.member_reference(rid)?),
            Some(TableId::MethodSpec) => Member::Specification(self.method_specification(rid)?),
            _ => return Err(TypeNotFound(token)),
        })
    }

    /// Custom attributes applied to `parent`, in table order.
    ///
    /// # Errors
    /// Returns an error if an attribute row cannot be read.
    pub fn custom_attributes_of(&self, parent: Token) -> Result<Vec<Arc<CustomAttribute>>> {
        self.index()?
            .attributes_of(parent)
            .iter()
            .map(|rid| self.custom_attribute(*rid))
            .collect()
    }

    /// Custom attributes applied to the module itself.
    ///
    /// # Errors
    /// Returns an error if an attribute row cannot be read.
    pub fn custom_attributes(&self) -> Result<Vec<Arc<CustomAttribute>>> {
        self.custom_attributes_of(Token::from_parts(TableId::Module, 1))
    }

    /// The default value of a field, parameter or property.
    ///
    /// # Errors
    /// Returns an error if the `Constant` row or its blob is malformed.
    pub fn constant(&self, parent: Token) -> Result<Option<ConstantValue>> {
        let Some(rid) = self.index()?.constants.get(&parent).copied() else {
            return Ok(None);
        };

        let row: ConstantRow = self.reader.row(rid)?;
        Ok(Some(ConstantValue::decode(
            row.element_type,
            self.reader.blob(row.value)?,
        )?))
    }

    /// The string literal an `ldstr` token refers to.
    ///
    /// # Errors
    /// Returns an error if the token does not point into the `#US` heap.
    pub fn user_string(&self, token: Token) -> Result<String> {
        if token.table() != 0x70 {
            return Err(malformed_error!("Not a user string token - {}", token));
        }
        self.reader.user_string(token.row())
    }

    /// The call-site signature a `StandAloneSig` token refers to.
    ///
    /// # Errors
    /// Returns an error if the token is not a `StandAloneSig` or the blob is malformed.
    pub fn standalone_signature(
        &self,
        token: Token,
        context: &GenericContext,
    ) -> Result<MethodSignature> {
        parse_method_signature(self.standalone_blob(token)?, self, context)
    }

    /// The local variables a `StandAloneSig` token refers to.
    ///
    /// # Errors
    /// Returns an error if the token is not a `StandAloneSig` or the blob is malformed.
    pub fn local_signature(
        &self,
        token: Token,
        context: &GenericContext,
    ) -> Result<Vec<LocalVariable>> {
        parse_local_var_signature(self.standalone_blob(token)?, self, context)
    }

    fn standalone_blob(&self, token: Token) -> Result<&[u8]> {
        if !token.is_table(TableId::StandAloneSig) {
            return Err(malformed_error!("Not a StandAloneSig token - {}", token));
        }

        let row: StandAloneSigRow = self.reader.row(token.row())?;
        self.reader.blob(row.signature)
    }

    /// A reference without a metadata row, interned by its qualified name
    #[must_use]
    pub fn synthesized_type(
        &self,
        namespace: &str,
        name: &str,
        scope: ResolutionScope,
    ) -> Arc<TypeReference> {
        let created = TypeReference::synthesized(self.weak(), namespace, name, scope);
        let key = created.qualified_name();
        if let Some(entry) = self.synthesized.get(&key) {
            return entry.value().clone();
        }

        self.synthesized
            .get_or_insert(key, Arc::new(created))
            .value()
            .clone()
    }

    /// The element type committed for an enum found by name only
    #[must_use]
    pub fn cached_enum_width(&self, enum_name: &str) -> Option<u8> {
        self.enum_widths.get(enum_name).map(|width| *width)
    }

    pub(crate) fn record_enum_width(&self, enum_name: &str, element_type: u8) {
        self.enum_widths
            .entry(enum_name.to_string())
            .or_insert(element_type);
    }
}

impl TypeProvider for Module {
    fn primitive_type(&self, element_type: u8) -> Result<NamedTypeRef> {
        let Some(name) = primitive_name(element_type) else {
            return Err(malformed_error!("Not a primitive element type - {}", element_type));
        };

        // The core library defines its own primitives
        if let Some(definition) = self.find_type("System", name)? {
            return Ok(NamedTypeRef::definition(&definition));
        }

        Ok(NamedTypeRef::reference(&self.synthesized_type(
            "System",
            name,
            ResolutionScope::None,
        )))
    }

    fn type_from_token(&self, token: Token, context: &GenericContext, depth: usize) -> Result<TypeSig> {
        match token.table_id() {
            Some(TableId::TypeDef) => Ok(TypeSig::Named(NamedTypeRef::definition(
                &self.type_definition(token.row())?,
            ))),
            Some(TableId::TypeRef) => Ok(TypeSig::Named(NamedTypeRef::reference(
                &self.type_reference(token.row())?,
            ))),
            Some(TableId::TypeSpec) => {
                let row: TypeSpecRow = self.reader.row(token.row())?;
                SignatureParser::new(self.reader.blob(row.signature)?, self, context)
                    .with_depth(self.config.max_signature_depth, depth)
                    .parse_type()
            }
            _ => Err(TypeNotFound(token)),
        }
    }

    fn max_depth(&self) -> usize {
        self.config.max_signature_depth
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("mvid", &self.mvid)
            .field("types", &self.type_definitions.len())
            .finish_non_exhaustive()
    }
}
