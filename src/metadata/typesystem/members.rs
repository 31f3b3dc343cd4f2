//! Fields, properties, events and the token-indexed member lists of a type.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Weak},
};

use crate::{
    metadata::{
        customattributes::CustomAttribute,
        signatures::{parse_field_signature, parse_property_signature, PropertySignature, SignatureParameter, TypeSig},
        tables::{EventRow, FieldRow, PropertyRow, TableId},
        token::Token,
        typesystem::{
            traits::{self, FieldTraits, FixedBuffer, PropertyTraits, RefKind},
            upgrade, Accessibility, ConstantValue, EntityRef, EventAttributes, FieldAttributes,
            GenericContext, Lazy, MemberReference, Method, MethodSemanticsAttributes,
            MethodSpecification, Module, PropertyAttributes, TypeDefinition,
        },
    },
    Result,
};

/// Members of one kind in declaration order, indexed by token
pub struct MemberList<T> {
    items: Vec<Arc<T>>,
    by_token: HashMap<Token, usize>,
}

impl<T> MemberList<T> {
    pub(crate) fn build<I>(items: I, key: fn(&T) -> Token) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Arc<T>>>,
    {
        let items = items.into_iter().collect::<Result<Vec<_>>>()?;
        let by_token = items
            .iter()
            .enumerate()
            .map(|(position, item)| (key(item), position))
            .collect();
        Ok(MemberList { items, by_token })
    }

    /// Members in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<T>> {
        self.items.iter()
    }

    /// The member with `token`, if this list holds it
    #[must_use]
    pub fn get(&self, token: Token) -> Option<&Arc<T>> {
        self.by_token.get(&token).map(|position| &self.items[*position])
    }

    /// Members as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[Arc<T>] {
        &self.items
    }

    /// Number of members
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the list is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a, T> IntoIterator for &'a MemberList<T> {
    type Item = &'a Arc<T>;
    type IntoIter = std::slice::Iter<'a, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for MemberList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

/// Any entity a member token can resolve to
#[derive(Debug, Clone)]
pub enum Member {
    /// A `Field` row
    Field(Arc<Field>),
    /// A `MethodDef` row
    Method(Arc<Method>),
    /// A `Property` row
    Property(Arc<Property>),
    /// An `Event` row
    Event(Arc<Event>),
    /// A `MemberRef` row
    Reference(Arc<MemberReference>),
    /// A `MethodSpec` row
    Specification(Arc<MethodSpecification>),
}

impl Member {
    /// The metadata token of the underlying row
    #[must_use]
    pub fn token(&self) -> Token {
        match self {
            Member::Field(field) => field.token(),
            Member::Method(method) => method.token(),
            Member::Property(property) => property.token(),
            Member::Event(event) => event.token(),
            Member::Reference(reference) => reference.token(),
            Member::Specification(specification) => specification.token(),
        }
    }
}

fn declaring_type(
    cell: &Lazy<Option<EntityRef<TypeDefinition>>>,
    module: &Weak<Module>,
    owner: impl FnOnce(&Module) -> Result<Option<u32>>,
) -> Result<Option<Arc<TypeDefinition>>> {
    let declaring = cell.get_or_try_init(|| {
        let module = upgrade(module)?;
        match owner(&module)? {
            Some(rid) => Ok(Some(EntityRef::new(&module.type_definition(rid)?))),
            None => Ok(None),
        }
    })?;

    declaring.as_ref().map(EntityRef::upgrade).transpose()
}

fn declaring_context(declaring: Option<Arc<TypeDefinition>>) -> Result<GenericContext> {
    match declaring {
        Some(ty) => ty.generic_context(),
        None => Ok(GenericContext::default()),
    }
}

/// A field defined in a module
pub struct Field {
    token: Token,
    module: Weak<Module>,
    name: String,
    flags: FieldAttributes,
    signature_blob: u32,
    declaring: Lazy<Option<EntityRef<TypeDefinition>>>,
    signature: Lazy<SignatureParameter>,
    constant: Lazy<Option<ConstantValue>>,
    attributes: Lazy<Vec<Arc<CustomAttribute>>>,
    traits: Lazy<FieldTraits>,
}

impl Field {
    pub(crate) fn new(rid: u32, module: Weak<Module>, row: &FieldRow, name: &str) -> Self {
        Field {
            token: Token::from_parts(TableId::Field, rid),
            module,
            name: name.to_string(),
            flags: FieldAttributes::from_bits_retain(row.flags),
            signature_blob: row.signature,
            declaring: Lazy::new(),
            signature: Lazy::new(),
            constant: Lazy::new(),
            attributes: Lazy::new(),
            traits: Lazy::new(),
        }
    }

    /// The `Field` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Declared name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `FieldAttributes`
    #[must_use]
    pub fn flags(&self) -> FieldAttributes {
        self.flags
    }

    /// Declared accessibility
    #[must_use]
    pub fn accessibility(&self) -> Accessibility {
        Accessibility::from_member_access(self.flags.bits())
    }

    /// True for static fields
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldAttributes::STATIC)
    }

    /// True for compile-time constants
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.flags.contains(FieldAttributes::LITERAL)
    }

    /// True for `readonly` fields
    #[must_use]
    pub fn is_init_only(&self) -> bool {
        self.flags.contains(FieldAttributes::INIT_ONLY)
    }

    /// The declaring type.
    ///
    /// # Errors
    /// Returns an error if the module was dropped or the owner row cannot be read.
    pub fn declaring_type(&self) -> Result<Option<Arc<TypeDefinition>>> {
        declaring_type(&self.declaring, &self.module, |module| {
            Ok(module.index()?.field_owner.get(&self.token.row()).copied())
        })
    }

    /// The field's type with modifiers split off, decoded in the declaring type's context.
    ///
    /// # Errors
    /// Returns an error if the signature blob is malformed.
    pub fn signature(&self) -> Result<&SignatureParameter> {
        self.signature.get_or_try_init(|| {
            let module = upgrade(&self.module)?;
            let context = declaring_context(self.declaring_type()?)?;
            parse_field_signature(module.metadata().blob(self.signature_blob)?, &*module, &context)
        })
    }

    /// The default value of a literal field.
    ///
    /// # Errors
    /// Returns an error if the constant row or its value is malformed.
    pub fn constant(&self) -> Result<Option<&ConstantValue>> {
        let constant = self
            .constant
            .get_or_try_init(|| upgrade(&self.module)?.constant(self.token))?;
        Ok(constant.as_ref())
    }

    /// Custom attributes, excluding those translated into traits.
    ///
    /// # Errors
    /// Returns an error if an attribute row or the signature cannot be read.
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
            .get_or_try_init(|| upgrade(&self.module)?.custom_attributes_of(self.token))
            .map(Vec::as_slice)
    }

    /// Traits derived from marker attributes and modifiers.
    ///
    /// # Errors
    /// Returns an error if the signature or attributes cannot be read.
    pub fn traits(&self) -> Result<&FieldTraits> {
        self.traits.get_or_try_init(|| {
            Ok(FieldTraits::launder(
                self.signature()?,
                self.all_custom_attributes()?,
            ))
        })
    }

    /// True if the field type carries a `modreq(IsVolatile)`
    ///
    /// # Errors
    /// Returns an error if the signature or attributes cannot be read.
    pub fn is_volatile(&self) -> Result<bool> {
        Ok(self.traits()?.is_volatile)
    }

    /// True for `required` fields
    ///
    /// # Errors
    /// Returns an error if the signature or attributes cannot be read.
    pub fn is_required(&self) -> Result<bool> {
        Ok(self.traits()?.is_required)
    }

    /// How a `ref` field refers to its target
    ///
    /// # Errors
    /// Returns an error if the signature or attributes cannot be read.
    pub fn ref_kind(&self) -> Result<RefKind> {
        Ok(self.traits()?.ref_kind)
    }

    /// Element type and length of a `fixed` buffer field
    ///
    /// # Errors
    /// Returns an error if the signature or attributes cannot be read.
    pub fn fixed_buffer(&self) -> Result<Option<&FixedBuffer>> {
        Ok(self.traits()?.fixed_buffer.as_ref())
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("token", &self.token)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Accessor methods of a property or event with their roles
#[derive(Debug, Default)]
struct Accessors {
    methods: Vec<(Arc<Method>, MethodSemanticsAttributes)>,
}

impl Accessors {
    fn load(module: &Module, association: Token) -> Result<Accessors> {
        let methods = module
            .index()?
            .semantics_by_association
            .get(&association)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .map(|(rid, role)| Ok((module.method(*rid)?, *role)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Accessors { methods })
    }

    fn first(&self, role: MethodSemanticsAttributes) -> Option<Arc<Method>> {
        self.methods
            .iter()
            .find(|(_, semantics)| semantics.contains(role))
            .map(|(method, _)| method.clone())
    }

    fn all(&self, role: MethodSemanticsAttributes) -> Vec<Arc<Method>> {
        self.methods
            .iter()
            .filter(|(_, semantics)| semantics.contains(role))
            .map(|(method, _)| method.clone())
            .collect()
    }
}

/// A property: a signature plus optional getter and setter methods
pub struct Property {
    token: Token,
    module: Weak<Module>,
    name: String,
    flags: PropertyAttributes,
    signature_blob: u32,
    declaring: Lazy<Option<EntityRef<TypeDefinition>>>,
    accessors: Lazy<Accessors>,
    signature: Lazy<PropertySignature>,
    constant: Lazy<Option<ConstantValue>>,
    attributes: Lazy<Vec<Arc<CustomAttribute>>>,
    traits: Lazy<PropertyTraits>,
}

impl Property {
    pub(crate) fn new(rid: u32, module: Weak<Module>, row: &PropertyRow, name: &str) -> Self {
        Property {
            token: Token::from_parts(TableId::Property, rid),
            module,
            name: name.to_string(),
            flags: PropertyAttributes::from_bits_retain(row.flags),
            signature_blob: row.signature,
            declaring: Lazy::new(),
            accessors: Lazy::new(),
            signature: Lazy::new(),
            constant: Lazy::new(),
            attributes: Lazy::new(),
            traits: Lazy::new(),
        }
    }

    /// Stitch the accessors before the property is handed out, so that an accessor's
    /// associated member is never observed unset
    pub(crate) fn load_accessors(&self, module: &Module) -> Result<()> {
        self.accessors
            .get_or_try_init(|| Accessors::load(module, self.token))
            .map(|_| ())
    }

    fn accessors(&self) -> Result<&Accessors> {
        self.accessors
            .get_or_try_init(|| Accessors::load(&*upgrade(&self.module)?, self.token))
    }

    /// The `Property` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Declared name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `PropertyAttributes`
    #[must_use]
    pub fn flags(&self) -> PropertyAttributes {
        self.flags
    }

    /// The declaring type.
    ///
    /// # Errors
    /// Returns an error if the module was dropped or the owner row cannot be read.
    pub fn declaring_type(&self) -> Result<Option<Arc<TypeDefinition>>> {
        declaring_type(&self.declaring, &self.module, |module| {
            Ok(module.index()?.property_owner.get(&self.token.row()).copied())
        })
    }

    /// The `get` accessor
    ///
    /// # Errors
    /// Returns an error if an accessor row cannot be read.
    pub fn getter(&self) -> Result<Option<Arc<Method>>> {
        Ok(self.accessors()?.first(MethodSemanticsAttributes::GETTER))
    }

    /// The `set` accessor
    ///
    /// # Errors
    /// Returns an error if an accessor row cannot be read.
    pub fn setter(&self) -> Result<Option<Arc<Method>>> {
        Ok(self.accessors()?.first(MethodSemanticsAttributes::SETTER))
    }

    /// Accessors with the `Other` role
    ///
    /// # Errors
    /// Returns an error if an accessor row cannot be read.
    pub fn other_accessors(&self) -> Result<Vec<Arc<Method>>> {
        Ok(self.accessors()?.all(MethodSemanticsAttributes::OTHER))
    }

    /// Accessibility of the most accessible accessor
    ///
    /// # Errors
    /// Returns an error if an accessor row cannot be read.
    pub fn accessibility(&self) -> Result<Accessibility> {
        Ok(self
            .accessors()?
            .methods
            .iter()
            .map(|(method, _)| method.accessibility())
            .max()
            .unwrap_or(Accessibility::Private))
    }

    /// The property type and indexer parameters, decoded in the declaring type's context.
    ///
    /// # Errors
    /// Returns an error if the signature blob is malformed.
    pub fn signature(&self) -> Result<&PropertySignature> {
        self.signature.get_or_try_init(|| {
            let module = upgrade(&self.module)?;
            let context = declaring_context(self.declaring_type()?)?;
            parse_property_signature(module.metadata().blob(self.signature_blob)?, &*module, &context)
        })
    }

    /// True for indexers
    ///
    /// # Errors
    /// Returns an error if the signature blob is malformed.
    pub fn is_indexer(&self) -> Result<bool> {
        Ok(!self.signature()?.parameters.is_empty())
    }

    /// The default value, if any.
    ///
    /// # Errors
    /// Returns an error if the constant row or its value is malformed.
    pub fn constant(&self) -> Result<Option<&ConstantValue>> {
        let constant = self
            .constant
            .get_or_try_init(|| upgrade(&self.module)?.constant(self.token))?;
        Ok(constant.as_ref())
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
            .get_or_try_init(|| upgrade(&self.module)?.custom_attributes_of(self.token))
            .map(Vec::as_slice)
    }

    /// Traits derived from marker attributes.
    ///
    /// # Errors
    /// Returns an error if the attributes cannot be read.
    pub fn traits(&self) -> Result<&PropertyTraits> {
        self.traits
            .get_or_try_init(|| Ok(PropertyTraits::launder(self.all_custom_attributes()?)))
    }

    /// True for `required` properties
    ///
    /// # Errors
    /// Returns an error if the attributes cannot be read.
    pub fn is_required(&self) -> Result<bool> {
        Ok(self.traits()?.is_required)
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("token", &self.token)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An event: a delegate type plus add, remove and optional raise methods
pub struct Event {
    token: Token,
    module: Weak<Module>,
    name: String,
    flags: EventAttributes,
    event_type_token: Token,
    declaring: Lazy<Option<EntityRef<TypeDefinition>>>,
    accessors: Lazy<Accessors>,
    event_type: Lazy<Option<TypeSig>>,
    attributes: Lazy<Vec<Arc<CustomAttribute>>>,
}

impl Event {
    pub(crate) fn new(rid: u32, module: Weak<Module>, row: &EventRow, name: &str) -> Self {
        Event {
            token: Token::from_parts(TableId::Event, rid),
            module,
            name: name.to_string(),
            flags: EventAttributes::from_bits_retain(row.flags),
            event_type_token: row.event_type,
            declaring: Lazy::new(),
            accessors: Lazy::new(),
            event_type: Lazy::new(),
            attributes: Lazy::new(),
        }
    }

    pub(crate) fn load_accessors(&self, module: &Module) -> Result<()> {
        self.accessors
            .get_or_try_init(|| Accessors::load(module, self.token))
            .map(|_| ())
    }

    fn accessors(&self) -> Result<&Accessors> {
        self.accessors
            .get_or_try_init(|| Accessors::load(&*upgrade(&self.module)?, self.token))
    }

    /// The `Event` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Declared name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `EventAttributes`
    #[must_use]
    pub fn flags(&self) -> EventAttributes {
        self.flags
    }

    /// The declaring type.
    ///
    /// # Errors
    /// Returns an error if the module was dropped or the owner row cannot be read.
    pub fn declaring_type(&self) -> Result<Option<Arc<TypeDefinition>>> {
        declaring_type(&self.declaring, &self.module, |module| {
            Ok(module.index()?.event_owner.get(&self.token.row()).copied())
        })
    }

    /// The `add` accessor
    ///
    /// # Errors
    /// Returns an error if an accessor row cannot be read.
    pub fn adder(&self) -> Result<Option<Arc<Method>>> {
        Ok(self.accessors()?.first(MethodSemanticsAttributes::ADD_ON))
    }

    /// The `remove` accessor
    ///
    /// # Errors
    /// Returns an error if an accessor row cannot be read.
    pub fn remover(&self) -> Result<Option<Arc<Method>>> {
        Ok(self.accessors()?.first(MethodSemanticsAttributes::REMOVE_ON))
    }

    /// The `raise` accessor, rarely emitted
    ///
    /// # Errors
    /// Returns an error if an accessor row cannot be read.
    pub fn raiser(&self) -> Result<Option<Arc<Method>>> {
        Ok(self.accessors()?.first(MethodSemanticsAttributes::FIRE))
    }

    /// Accessibility of the most accessible accessor
    ///
    /// # Errors
    /// Returns an error if an accessor row cannot be read.
    pub fn accessibility(&self) -> Result<Accessibility> {
        Ok(self
            .accessors()?
            .methods
            .iter()
            .map(|(method, _)| method.accessibility())
            .max()
            .unwrap_or(Accessibility::Private))
    }

    /// The delegate type, decoded in the declaring type's context.
    ///
    /// # Errors
    /// Returns an error if the type token cannot be resolved.
    pub fn event_type(&self) -> Result<Option<&TypeSig>> {
        let event_type = self.event_type.get_or_try_init(|| {
            if self.event_type_token.is_null() {
                return Ok(None);
            }

            let module = upgrade(&self.module)?;
            let context = declaring_context(self.declaring_type()?)?;
            Ok(Some(module.resolve_type(self.event_type_token, &context)?))
        })?;
        Ok(event_type.as_ref())
    }

    /// Custom attributes applied to the event.
    ///
    /// # Errors
    /// Returns an error if an attribute row cannot be read.
    pub fn custom_attributes(&self) -> Result<&[Arc<CustomAttribute>]> {
        self.attributes
            .get_or_try_init(|| upgrade(&self.module)?.custom_attributes_of(self.token))
            .map(Vec::as_slice)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("token", &self.token)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Item(Token);

    #[test]
    fn member_list_lookup() {
        let items = [0x0400_0001, 0x0400_0002, 0x0400_0005]
            .into_iter()
            .map(|raw| Ok(Arc::new(Item(Token::new(raw)))));
        let list = MemberList::build(items, |item: &Item| item.0).unwrap();

        assert_eq!(list.len(), 3);
        assert_eq!(list.get(Token::new(0x0400_0005)).unwrap().0.row(), 5);
        assert!(list.get(Token::new(0x0400_0003)).is_none());
        assert_eq!(
            list.iter().map(|item| item.0.row()).collect::<Vec<_>>(),
            vec![1, 2, 5]
        );
    }

    #[test]
    fn member_list_propagates_errors() {
        let items = vec![
            Ok(Arc::new(Item(Token::new(0x0400_0001)))),
            Err(crate::Error::Disposed),
        ];
        assert!(MemberList::build(items, |item: &Item| item.0).is_err());
    }
}
