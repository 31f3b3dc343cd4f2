//! Named type entities: definitions from the `TypeDef` table and references from the
//! `TypeRef` table or synthesized from names.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::{
    metadata::{
        customattributes::CustomAttribute,
        signatures::{primitive_element_type, TypeSig},
        tables::{TableId, TypeDefRow},
        token::Token,
        typesystem::{
            traits::{self, TypeTraits},
            upgrade, Accessibility, EntityRef, Event, Field, GenericContext, GenericParameter,
            Lazy, MemberList, Method, Module, Namespace, Property, TypeAttributes,
        },
    },
    Error::RecursionLimit,
    Result,
};

/// The inferred kind of a type definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Reference type
    Class,
    /// Value type deriving from `System.ValueType`
    Struct,
    /// Enumeration deriving from `System.Enum`
    Enum,
    /// Interface
    Interface,
    /// Delegate deriving from `System.MulticastDelegate`
    Delegate,
}

/// Explicit packing and size from the `ClassLayout` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassLayout {
    /// Field alignment in bytes, 0 for the default
    pub packing_size: u16,
    /// Total size in bytes, 0 if not specified
    pub class_size: u32,
}

/// A type defined in a module
pub struct TypeDefinition {
    token: Token,
    module: Weak<Module>,
    name: String,
    namespace: String,
    flags: TypeAttributes,
    extends: Token,
    enclosing: Lazy<Option<EntityRef<TypeDefinition>>>,
    base_type: Lazy<Option<TypeSig>>,
    interfaces: Lazy<Vec<TypeSig>>,
    generic_parameters: Lazy<Vec<Arc<GenericParameter>>>,
    inherited_parameters: Lazy<usize>,
    fields: Lazy<MemberList<Field>>,
    methods: Lazy<MemberList<Method>>,
    properties: Lazy<Vec<Arc<Property>>>,
    events: Lazy<Vec<Arc<Event>>>,
    nested_types: Lazy<Vec<Arc<TypeDefinition>>>,
    attributes: Lazy<Vec<Arc<CustomAttribute>>>,
    kind: Lazy<TypeKind>,
    layout: Lazy<Option<ClassLayout>>,
    traits: Lazy<TypeTraits>,
    underlying: Lazy<Option<u8>>,
}

impl TypeDefinition {
    pub(crate) fn new(
        rid: u32,
        module: Weak<Module>,
        row: &TypeDefRow,
        name: &str,
        namespace: &str,
    ) -> Self {
        TypeDefinition {
            token: Token::from_parts(TableId::TypeDef, rid),
            module,
            name: name.to_string(),
            namespace: namespace.to_string(),
            flags: TypeAttributes::from_bits_retain(row.flags),
            extends: row.extends,
            enclosing: Lazy::new(),
            base_type: Lazy::new(),
            interfaces: Lazy::new(),
            generic_parameters: Lazy::new(),
            inherited_parameters: Lazy::new(),
            fields: Lazy::new(),
            methods: Lazy::new(),
            properties: Lazy::new(),
            events: Lazy::new(),
            nested_types: Lazy::new(),
            attributes: Lazy::new(),
            kind: Lazy::new(),
            layout: Lazy::new(),
            traits: Lazy::new(),
            underlying: Lazy::new(),
        }
    }

    /// The `TypeDef` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Simple name, including any generic arity suffix (`List`1`)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared namespace; empty for nested types
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `TypeAttributes`
    #[must_use]
    pub fn flags(&self) -> TypeAttributes {
        self.flags
    }

    /// Declared accessibility
    #[must_use]
    pub fn accessibility(&self) -> Accessibility {
        Accessibility::from_type_visibility(self.flags)
    }

    /// True for abstract types, including interfaces and static classes
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(TypeAttributes::ABSTRACT)
    }

    /// True for sealed types
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.flags.contains(TypeAttributes::SEALED)
    }

    /// True for abstract sealed classes
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_abstract() && self.is_sealed() && !self.is_interface()
    }

    /// True for interfaces
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(TypeAttributes::INTERFACE)
    }

    /// True if the type is marked serializable
    #[must_use]
    pub fn is_serializable(&self) -> bool {
        self.flags.contains(TypeAttributes::SERIALIZABLE)
    }

    /// The module defining this type.
    ///
    /// # Errors
    /// Returns [`crate::Error::Disposed`] if the module was dropped.
    pub fn module(&self) -> Result<Arc<Module>> {
        upgrade(&self.module)
    }

    /// The type this one is nested in.
    ///
    /// # Errors
    /// Returns an error if the module was dropped or the enclosing row is missing.
    pub fn enclosing_type(&self) -> Result<Option<Arc<TypeDefinition>>> {
        let enclosing = self.enclosing.get_or_try_init(|| {
            let module = self.module()?;
            match module.index()?.enclosing.get(&self.token.row()) {
                Some(rid) => Ok(Some(EntityRef::new(&module.type_definition(*rid)?))),
                None => Ok(None),
            }
        })?;

        enclosing.as_ref().map(EntityRef::upgrade).transpose()
    }

    /// The enclosing types, innermost first.
    ///
    /// # Errors
    /// Returns [`crate::Error::RecursionLimit`] if the nesting chain does not terminate.
    pub fn enclosing_chain(&self) -> Result<Vec<Arc<TypeDefinition>>> {
        let limit = self.module()?.config().max_signature_depth;
        let mut chain = Vec::new();
        let mut current = self.enclosing_type()?;
        while let Some(outer) = current {
            if chain.len() >= limit {
                return Err(RecursionLimit(limit));
            }
            current = outer.enclosing_type()?;
            chain.push(outer);
        }
        Ok(chain)
    }

    /// Namespace of the outermost enclosing type.
    ///
    /// # Errors
    /// Returns an error if the enclosing chain cannot be walked.
    pub fn outermost_namespace(&self) -> Result<String> {
        Ok(match self.enclosing_chain()?.last() {
            Some(outer) => outer.namespace.clone(),
            None => self.namespace.clone(),
        })
    }

    /// `Namespace.Outer.Inner`, enclosing types joined with `.`.
    ///
    /// # Errors
    /// Returns an error if the enclosing chain cannot be walked.
    pub fn full_name(&self) -> Result<String> {
        let chain = self.enclosing_chain()?;
        let namespace = chain.last().map_or(self.namespace.as_str(), |t| t.namespace.as_str());

        let mut full_name = String::new();
        if !namespace.is_empty() {
            full_name.push_str(namespace);
            full_name.push('.');
        }
        for outer in chain.iter().rev() {
            full_name.push_str(&outer.name);
            full_name.push('.');
        }
        full_name.push_str(&self.name);
        Ok(full_name)
    }

    /// The namespace entity of a top-level type.
    ///
    /// # Errors
    /// Returns an error if the module was dropped or its namespace tree cannot be built.
    pub fn containing_namespace(&self) -> Result<Option<Arc<Namespace>>> {
        if self.enclosing_type()?.is_some() {
            return Ok(None);
        }

        Ok(self.module()?.namespaces()?.find(&self.namespace))
    }

    /// A context resolving this type's generic parameters.
    ///
    /// # Errors
    /// Returns an error if the generic parameters cannot be read.
    pub fn generic_context(&self) -> Result<GenericContext> {
        GenericContext::for_type(self)
    }

    /// The base type, absent for `System.Object`, interfaces and `<Module>`.
    ///
    /// # Errors
    /// Returns an error if the base type cannot be decoded.
    pub fn base_type(&self) -> Result<Option<&TypeSig>> {
        let base = self.base_type.get_or_try_init(|| {
            if self.extends.is_null() {
                return Ok(None);
            }

            let module = self.module()?;
            Ok(Some(module.resolve_type(self.extends, &self.generic_context()?)?))
        })?;
        Ok(base.as_ref())
    }

    /// Directly implemented interfaces.
    ///
    /// # Errors
    /// Returns an error if an interface cannot be decoded.
    pub fn interfaces(&self) -> Result<&[TypeSig]> {
        self.interfaces
            .get_or_try_init(|| {
                let module = self.module()?;
                let context = self.generic_context()?;
                module
                    .index()?
                    .interfaces
                    .get(&self.token.row())
                    .map_or(&[][..], Vec::as_slice)
                    .iter()
                    .map(|token| module.resolve_type(*token, &context))
                    .collect()
            })
            .map(Vec::as_slice)
    }

    /// Every generic parameter in metadata order, including the copies of enclosing types'
    /// parameters a nested type re-declares.
    ///
    /// # Errors
    /// Returns an error if a parameter row cannot be read.
    pub fn all_generic_parameters(&self) -> Result<&[Arc<GenericParameter>]> {
        self.generic_parameters
            .get_or_try_init(|| {
                let module = self.module()?;
                module
                    .index()?
                    .generic_parameters_of(self.token)
                    .iter()
                    .map(|rid| module.generic_parameter(*rid))
                    .collect()
            })
            .map(Vec::as_slice)
    }

    /// The type's own generic parameters, without those inherited from enclosing types.
    ///
    /// # Errors
    /// Returns an error if a parameter row cannot be read.
    pub fn generic_parameters(&self) -> Result<&[Arc<GenericParameter>]> {
        let all = self.all_generic_parameters()?;
        let inherited = *self.inherited_parameters.get_or_try_init(|| {
            Ok(match self.enclosing_type()? {
                Some(outer) => outer.all_generic_parameters()?.len(),
                None => 0,
            })
        })?;
        Ok(all.get(inherited.min(all.len())..).unwrap_or_default())
    }

    /// Fields in declaration order, indexed by token.
    ///
    /// # Errors
    /// Returns an error if a field row cannot be read.
    pub fn fields(&self) -> Result<&MemberList<Field>> {
        self.fields.get_or_try_init(|| {
            let module = self.module()?;
            let rids = module
                .metadata()
                .list(TableId::TypeDef, self.token.row(), 4, TableId::Field)?;
            MemberList::build(rids.into_iter().map(|rid| module.field(rid)), Field::token)
        })
    }

    /// Methods in declaration order, indexed by token.
    ///
    /// # Errors
    /// Returns an error if a method row cannot be read.
    pub fn methods(&self) -> Result<&MemberList<Method>> {
        self.methods.get_or_try_init(|| {
            let module = self.module()?;
            let rids = module
                .metadata()
                .list(TableId::TypeDef, self.token.row(), 5, TableId::MethodDef)?;
            MemberList::build(rids.into_iter().map(|rid| module.method(rid)), Method::token)
        })
    }

    /// Properties in declaration order.
    ///
    /// # Errors
    /// Returns an error if a property row cannot be read.
    pub fn properties(&self) -> Result<&[Arc<Property>]> {
        self.properties
            .get_or_try_init(|| {
                let module = self.module()?;
                module
                    .index()?
                    .properties
                    .get(&self.token.row())
                    .map_or(&[][..], Vec::as_slice)
                    .iter()
                    .map(|rid| module.property(*rid))
                    .collect()
            })
            .map(Vec::as_slice)
    }

    /// Events in declaration order.
    ///
    /// # Errors
    /// Returns an error if an event row cannot be read.
    pub fn events(&self) -> Result<&[Arc<Event>]> {
        self.events
            .get_or_try_init(|| {
                let module = self.module()?;
                module
                    .index()?
                    .events
                    .get(&self.token.row())
                    .map_or(&[][..], Vec::as_slice)
                    .iter()
                    .map(|rid| module.event(*rid))
                    .collect()
            })
            .map(Vec::as_slice)
    }

    /// Directly nested types in table order.
    ///
    /// # Errors
    /// Returns an error if a nested row cannot be read.
    pub fn nested_types(&self) -> Result<&[Arc<TypeDefinition>]> {
        self.nested_types
            .get_or_try_init(|| {
                let module = self.module()?;
                module
                    .index()?
                    .nested
                    .get(&self.token.row())
                    .map_or(&[][..], Vec::as_slice)
                    .iter()
                    .map(|rid| module.type_definition(*rid))
                    .collect()
            })
            .map(Vec::as_slice)
    }

    /// Custom attributes, excluding those translated into traits.
    ///
    /// # Errors
    /// Returns an error if an attribute row cannot be read.
    pub fn custom_attributes(&self) -> Result<Vec<Arc<CustomAttribute>>> {
        self.traits()?;
        Ok(traits::unprocessed(self.all_custom_attributes()?))
    }

    /// Every custom attribute, including those translated into traits.
    ///
    /// # Errors
    /// Returns an error if an attribute row cannot be read.
    pub fn all_custom_attributes(&self) -> Result<&[Arc<CustomAttribute>]> {
        self.attributes
            .get_or_try_init(|| self.module()?.custom_attributes_of(self.token))
            .map(Vec::as_slice)
    }

    /// Traits derived from marker attributes.
    ///
    /// # Errors
    /// Returns an error if the attributes cannot be read.
    pub fn traits(&self) -> Result<&TypeTraits> {
        self.traits
            .get_or_try_init(|| Ok(TypeTraits::launder(self.all_custom_attributes()?)))
    }

    /// True for `ref struct` types
    ///
    /// # Errors
    /// Returns an error if the attributes cannot be read.
    pub fn is_ref_like(&self) -> Result<bool> {
        Ok(self.traits()?.is_ref_like)
    }

    /// True for `readonly struct` types
    ///
    /// # Errors
    /// Returns an error if the attributes cannot be read.
    pub fn is_read_only(&self) -> Result<bool> {
        Ok(self.traits()?.is_read_only)
    }

    /// True if the type declares `required` members
    ///
    /// # Errors
    /// Returns an error if the attributes cannot be read.
    pub fn has_required_members(&self) -> Result<bool> {
        Ok(self.traits()?.has_required_members)
    }

    /// Kind inferred from the interface flag and the base type.
    ///
    /// # Errors
    /// Returns an error if the base type cannot be decoded.
    pub fn kind(&self) -> Result<TypeKind> {
        self.kind
            .get_or_try_init(|| {
                if self.is_interface() {
                    return Ok(TypeKind::Interface);
                }

                // Only sealed types take their kind from the base type
                if !self.is_sealed() {
                    return Ok(TypeKind::Class);
                }
                let base = match self.base_type()?.and_then(TypeSig::named) {
                    Some(named) => named.full_name()?,
                    None => return Ok(TypeKind::Class),
                };

                Ok(match base.as_str() {
                    "System.Enum" => TypeKind::Enum,
                    "System.ValueType" => TypeKind::Struct,
                    "System.MulticastDelegate" => TypeKind::Delegate,
                    _ => TypeKind::Class,
                })
            })
            .copied()
    }

    /// For enums, the element type of the `value__` field.
    ///
    /// # Errors
    /// Returns an error if the kind or the fields cannot be decoded.
    pub fn enum_underlying_type(&self) -> Result<Option<u8>> {
        self.underlying
            .get_or_try_init(|| {
                if self.kind()? != TypeKind::Enum {
                    return Ok(None);
                }

                for field in self.fields()?.iter() {
                    if !field.is_static() && field.name() == "value__" {
                        return Ok(field.signature()?.ty.primitive());
                    }
                }
                Ok(None)
            })
            .copied()
    }

    /// Explicit class layout, if any.
    ///
    /// # Errors
    /// Returns an error if the layout row cannot be read.
    pub fn layout(&self) -> Result<Option<ClassLayout>> {
        self.layout
            .get_or_try_init(|| {
                let module = self.module()?;
                let Some(rid) = module.index()?.layouts.get(&self.token.row()).copied() else {
                    return Ok(None);
                };

                let row: crate::metadata::tables::ClassLayoutRow = module.metadata().row(rid)?;
                Ok(Some(ClassLayout {
                    packing_size: row.packing_size,
                    class_size: row.class_size,
                }))
            })
            .copied()
    }

    /// `(body, declaration)` pairs of explicit overrides declared by this type.
    ///
    /// # Errors
    /// Returns an error if the module was dropped.
    pub fn method_implementations(&self) -> Result<Vec<(Token, Token)>> {
        Ok(self
            .module()?
            .index()?
            .method_impls
            .get(&self.token.row())
            .cloned()
            .unwrap_or_default())
    }
}

impl fmt::Debug for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDefinition")
            .field("token", &self.token)
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Where a type reference is resolved
#[derive(Debug, Clone)]
pub enum ResolutionScope {
    /// No scope; synthesized references without assembly qualification
    None,
    /// The current module
    Module,
    /// Another module of the same assembly
    ModuleReference(Token),
    /// Another assembly
    AssemblyReference(Token),
    /// Nested in another type reference
    Enclosing(Arc<TypeReference>),
    /// An assembly named in a serialized type name
    AssemblyName(String),
}

/// A reference to a type by name
pub struct TypeReference {
    token: Option<Token>,
    module: Weak<Module>,
    name: String,
    namespace: String,
    scope: ResolutionScope,
    generic_arity: u32,
}

impl TypeReference {
    pub(crate) fn new(
        token: Option<Token>,
        module: Weak<Module>,
        namespace: &str,
        name: &str,
        scope: ResolutionScope,
    ) -> Self {
        TypeReference {
            token,
            module,
            generic_arity: parse_generic_arity(name),
            name: name.to_string(),
            namespace: namespace.to_string(),
            scope,
        }
    }

    /// A reference without a metadata row, interned by name by its creator
    #[must_use]
    pub fn synthesized(
        module: Weak<Module>,
        namespace: &str,
        name: &str,
        scope: ResolutionScope,
    ) -> Self {
        Self::new(None, module, namespace, name, scope)
    }

    /// The `TypeRef` token, `None` for synthesized references
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        self.token
    }

    /// True if this reference has no metadata row
    #[must_use]
    pub fn is_synthesized(&self) -> bool {
        self.token.is_none()
    }

    /// Simple name, including any generic arity suffix
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared namespace; empty for nested references
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Resolution scope
    #[must_use]
    pub fn scope(&self) -> &ResolutionScope {
        &self.scope
    }

    /// Generic arity parsed from the `` `N `` suffix of the name
    #[must_use]
    pub fn generic_arity(&self) -> u32 {
        self.generic_arity
    }

    /// The enclosing reference of a nested reference
    #[must_use]
    pub fn enclosing(&self) -> Option<&Arc<TypeReference>> {
        match &self.scope {
            ResolutionScope::Enclosing(outer) => Some(outer),
            _ => None,
        }
    }

    /// Namespace of the outermost enclosing reference
    #[must_use]
    pub fn outermost_namespace(&self) -> &str {
        match &self.scope {
            ResolutionScope::Enclosing(outer) => outer.outermost_namespace(),
            _ => &self.namespace,
        }
    }

    /// `Namespace.Outer.Inner`, enclosing references joined with `.`
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.scope {
            ResolutionScope::Enclosing(outer) => format!("{}.{}", outer.full_name(), self.name),
            _ if self.namespace.is_empty() => self.name.clone(),
            _ => format!("{}.{}", self.namespace, self.name),
        }
    }

    /// The serialized form: `Namespace.Outer+Inner` plus `, Assembly` when the scope names an
    /// assembly by string
    #[must_use]
    pub fn qualified_name(&self) -> String {
        let mut name = self.nested_name();
        if let Some(assembly) = self.assembly_name() {
            name.push_str(", ");
            name.push_str(assembly);
        }
        name
    }

    fn nested_name(&self) -> String {
        match &self.scope {
            ResolutionScope::Enclosing(outer) => format!("{}+{}", outer.nested_name(), self.name),
            _ if self.namespace.is_empty() => self.name.clone(),
            _ => format!("{}.{}", self.namespace, self.name),
        }
    }

    fn assembly_name(&self) -> Option<&str> {
        match &self.scope {
            ResolutionScope::Enclosing(outer) => outer.assembly_name(),
            ResolutionScope::AssemblyName(assembly) => Some(assembly),
            _ => None,
        }
    }

    /// The definition this reference names in its own module, if it points there.
    ///
    /// References scoped to the current module, unqualified synthesized references and
    /// references qualified with the module's own assembly name are looked up by name;
    /// nested references resolve through their enclosing reference.
    ///
    /// # Errors
    /// Returns [`crate::Error::Disposed`] if the module of a metadata reference was dropped.
    pub fn local_definition(&self) -> Result<Option<Arc<TypeDefinition>>> {
        if let ResolutionScope::Enclosing(outer) = &self.scope {
            let Some(outer) = outer.local_definition()? else {
                return Ok(None);
            };
            return Ok(outer
                .nested_types()?
                .iter()
                .find(|nested| nested.name() == self.name)
                .cloned());
        }

        let Some(module) = self.module.upgrade() else {
            return match self.token {
                Some(_) => Err(crate::Error::Disposed),
                None => Ok(None),
            };
        };

        let local = match &self.scope {
            ResolutionScope::None | ResolutionScope::Module => true,
            ResolutionScope::AssemblyName(assembly) => {
                let simple = assembly.split(',').next().unwrap_or_default().trim();
                module
                    .assembly_name()?
                    .is_some_and(|own| own.eq_ignore_ascii_case(simple))
            }
            _ => false,
        };
        if !local {
            return Ok(None);
        }

        module.find_type(&self.namespace, &self.name)
    }

    /// The primitive element type, if this names one of the `System` primitives
    #[must_use]
    pub fn primitive(&self) -> Option<u8> {
        if self.enclosing().is_some() {
            return None;
        }
        primitive_element_type(&self.namespace, &self.name)
    }
}

impl fmt::Debug for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeReference")
            .field("token", &self.token)
            .field("name", &self.qualified_name())
            .finish_non_exhaustive()
    }
}

/// Parse the `` `N `` arity suffix of a mangled generic type name
fn parse_generic_arity(name: &str) -> u32 {
    name.rsplit_once('`')
        .and_then(|(_, arity)| arity.parse().ok())
        .unwrap_or(0)
}

/// A type name without its `` `N `` arity suffix
#[must_use]
pub fn strip_generic_arity(name: &str) -> &str {
    match name.rsplit_once('`') {
        Some((base, arity)) if !arity.is_empty() && arity.bytes().all(|b| b.is_ascii_digit()) => {
            base
        }
        _ => name,
    }
}

/// Groups a type's generic arguments by the nesting level that declares them
pub(crate) fn split_arguments_by_arity<'a, T>(
    arities: &[u32],
    arguments: &'a [T],
) -> Vec<&'a [T]> {
    let mut groups = Vec::with_capacity(arities.len());
    let mut start = 0usize;
    for arity in arities {
        let end = (start + *arity as usize).min(arguments.len());
        groups.push(&arguments[start..end]);
        start = end;
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_suffixes() {
        assert_eq!(parse_generic_arity("List`1"), 1);
        assert_eq!(parse_generic_arity("Dictionary`2"), 2);
        assert_eq!(parse_generic_arity("Plain"), 0);
        assert_eq!(parse_generic_arity("Odd`x"), 0);
        assert_eq!(strip_generic_arity("List`1"), "List");
        assert_eq!(strip_generic_arity("Odd`x"), "Odd`x");
        assert_eq!(strip_generic_arity("Plain"), "Plain");
    }

    #[test]
    fn argument_groups() {
        let arguments = [1, 2, 3];
        let groups = split_arguments_by_arity(&[1, 0, 2], &arguments);
        assert_eq!(groups, vec![&[1][..], &[][..], &[2, 3][..]]);
    }

    #[test]
    fn reference_names() {
        let outer = Arc::new(TypeReference::synthesized(
            Weak::new(),
            "Demo",
            "Outer`1",
            ResolutionScope::AssemblyName("Lib, Version=1.0.0.0".to_string()),
        ));
        let inner = TypeReference::synthesized(
            Weak::new(),
            "",
            "Inner",
            ResolutionScope::Enclosing(outer.clone()),
        );

        assert!(inner.is_synthesized());
        assert_eq!(outer.generic_arity(), 1);
        assert_eq!(inner.outermost_namespace(), "Demo");
        assert_eq!(inner.full_name(), "Demo.Outer`1.Inner");
        assert_eq!(inner.qualified_name(), "Demo.Outer`1+Inner, Lib, Version=1.0.0.0");
        assert!(inner.local_definition().unwrap().is_none());
    }
}
