//! Generic parameters and the context that resolves positional references to them.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::{
    metadata::{
        customattributes::CustomAttribute,
        signatures::{GenericParameterKind, TypeSig},
        tables::{GenericParamRow, TableId},
        token::Token,
        typesystem::{upgrade, EntityRef, GenericParamAttributes, Lazy, Method, Module, TypeDefinition},
    },
    Result,
};

/// A generic parameter declared by a type or method
pub struct GenericParameter {
    token: Token,
    module: Weak<Module>,
    name: String,
    number: u16,
    flags: GenericParamAttributes,
    owner: Token,
    constraints: Lazy<Vec<TypeSig>>,
    attributes: Lazy<Vec<Arc<CustomAttribute>>>,
}

impl GenericParameter {
    pub(crate) fn new(rid: u32, module: Weak<Module>, row: &GenericParamRow, name: &str) -> Self {
        GenericParameter {
            token: Token::from_parts(TableId::GenericParam, rid),
            module,
            name: name.to_string(),
            number: row.number,
            flags: GenericParamAttributes::from_bits_retain(row.flags),
            owner: row.owner,
            constraints: Lazy::new(),
            attributes: Lazy::new(),
        }
    }

    /// The `GenericParam` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Declared name (`T`, `TKey`)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the owner's metadata parameter list
    #[must_use]
    pub fn number(&self) -> u16 {
        self.number
    }

    /// `GenericParamAttributes`
    #[must_use]
    pub fn flags(&self) -> GenericParamAttributes {
        self.flags
    }

    /// The owning `TypeDef` or `MethodDef` token
    #[must_use]
    pub fn owner(&self) -> Token {
        self.owner
    }

    /// Whether a type or a method declares this parameter
    #[must_use]
    pub fn kind(&self) -> GenericParameterKind {
        if self.owner.is_table(TableId::MethodDef) {
            GenericParameterKind::Method
        } else {
            GenericParameterKind::Type
        }
    }

    /// Constraint types, decoded in the owner's context.
    ///
    /// # Errors
    /// Returns an error if the owner or a constraint cannot be resolved.
    pub fn constraints(&self) -> Result<&[TypeSig]> {
        self.constraints
            .get_or_try_init(|| {
                let module = upgrade(&self.module)?;
                let context = match self.kind() {
                    GenericParameterKind::Type => {
                        module.type_definition(self.owner.row())?.generic_context()?
                    }
                    GenericParameterKind::Method => {
                        module.method(self.owner.row())?.generic_context()?
                    }
                };

                module
                    .index()?
                    .constraints
                    .get(&self.token.row())
                    .map_or(&[][..], Vec::as_slice)
                    .iter()
                    .map(|token| module.resolve_type(*token, &context))
                    .collect()
            })
            .map(Vec::as_slice)
    }

    /// Custom attributes applied to the parameter.
    ///
    /// # Errors
    /// Returns an error if an attribute row cannot be read.
    pub fn custom_attributes(&self) -> Result<&[Arc<CustomAttribute>]> {
        self.attributes
            .get_or_try_init(|| upgrade(&self.module)?.custom_attributes_of(self.token))
            .map(Vec::as_slice)
    }
}

impl fmt::Debug for GenericParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericParameter")
            .field("token", &self.token)
            .field("name", &self.name)
            .field("number", &self.number)
            .finish_non_exhaustive()
    }
}

/// The type and method parameters a signature's `!n` and `!!n` refer to.
///
/// The same blob means different things at different call sites, so decoding always takes
/// the context explicitly. An empty context keeps references as bare positions.
#[derive(Debug, Clone, Default)]
pub struct GenericContext {
    type_parameters: Vec<EntityRef<GenericParameter>>,
    method_parameters: Vec<EntityRef<GenericParameter>>,
}

impl GenericContext {
    /// A context over explicit parameter lists
    #[must_use]
    pub fn new(
        type_parameters: &[Arc<GenericParameter>],
        method_parameters: &[Arc<GenericParameter>],
    ) -> Self {
        GenericContext {
            type_parameters: type_parameters.iter().map(EntityRef::new).collect(),
            method_parameters: method_parameters.iter().map(EntityRef::new).collect(),
        }
    }

    /// The context inside a type definition.
    ///
    /// # Errors
    /// Returns an error if the type's generic parameters cannot be read.
    pub fn for_type(ty: &TypeDefinition) -> Result<Self> {
        Ok(Self::new(ty.all_generic_parameters()?, &[]))
    }

    /// The context inside a method definition: its declaring type's parameters plus its own.
    ///
    /// # Errors
    /// Returns an error if the declaring type or either parameter list cannot be read.
    pub fn for_method(method: &Method) -> Result<Self> {
        let type_parameters = match method.declaring_type()? {
            Some(ty) => ty.all_generic_parameters()?.to_vec(),
            None => Vec::new(),
        };
        Ok(Self::new(&type_parameters, method.generic_parameters()?))
    }

    /// The parameter at `index` of the given kind, if the context has it
    #[must_use]
    pub fn parameter(
        &self,
        kind: GenericParameterKind,
        index: u32,
    ) -> Option<EntityRef<GenericParameter>> {
        let parameters = match kind {
            GenericParameterKind::Type => &self.type_parameters,
            GenericParameterKind::Method => &self.method_parameters,
        };
        parameters.get(index as usize).cloned()
    }

    /// Number of type-level parameters
    #[must_use]
    pub fn type_parameter_count(&self) -> usize {
        self.type_parameters.len()
    }

    /// Number of method-level parameters
    #[must_use]
    pub fn method_parameter_count(&self) -> usize {
        self.method_parameters.len()
    }

    /// True if neither list holds a parameter
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.type_parameters.is_empty() && self.method_parameters.is_empty()
    }
}
