//! Method definitions, their parameters and the derived method kind.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use tracing::warn;

use crate::{
    disassembler::InstructionDecoder,
    metadata::{
        customattributes::CustomAttribute,
        method::MethodBody,
        signatures::{parse_method_signature, LocalVariable, MethodSignature, SignatureParameter, ELEMENT_TYPE},
        tables::{MethodDefRow, ParamRow, TableId},
        token::Token,
        typesystem::{
            traits::{self, MethodTraits, RefKind},
            upgrade, Accessibility, ConstantValue, EntityRef, GenericContext, GenericParameter,
            Lazy, Member, MethodAttributes, MethodImplAttributes, MethodSemanticsAttributes, Module,
            ParamAttributes, TypeDefinition,
        },
    },
    Result,
};

/// The role a method plays, derived from its name, flags and associated member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// Any other method
    Ordinary,
    /// Instance constructor `.ctor`
    Constructor,
    /// Type initializer `.cctor`
    StaticConstructor,
    /// `op_Addition` and friends
    UserDefinedOperator,
    /// `op_Implicit` or `op_Explicit`
    Conversion,
    /// Property `get` accessor
    PropertyGet,
    /// Property `set` accessor
    PropertySet,
    /// Event `add` accessor
    EventAdd,
    /// Event `remove` accessor
    EventRemove,
    /// Event `raise` accessor
    EventRaise,
    /// `Finalize` override
    Finalizer,
    /// Private override of an interface method
    ExplicitInterfaceImplementation,
}

/// A row of the `Param` table
pub struct Parameter {
    token: Token,
    module: Weak<Module>,
    name: String,
    sequence: u16,
    flags: ParamAttributes,
    constant: Lazy<Option<ConstantValue>>,
    attributes: Lazy<Vec<Arc<CustomAttribute>>>,
}

impl Parameter {
    pub(crate) fn new(rid: u32, module: Weak<Module>, row: &ParamRow, name: &str) -> Self {
        Parameter {
            token: Token::from_parts(TableId::Param, rid),
            module,
            name: name.to_string(),
            sequence: row.sequence,
            flags: ParamAttributes::from_bits_retain(row.flags),
            constant: Lazy::new(),
            attributes: Lazy::new(),
        }
    }

    /// The `Param` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Declared name, empty for unnamed return rows
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 0 for the return value, 1.. for parameters
    #[must_use]
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// `ParamAttributes`
    #[must_use]
    pub fn flags(&self) -> ParamAttributes {
        self.flags
    }

    /// True for optional parameters
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.flags.contains(ParamAttributes::OPTIONAL)
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

    /// Custom attributes, excluding those translated into the owning method's parameter
    /// traits.
    ///
    /// # Errors
    /// Returns an error if an attribute row or the owning method cannot be read.
    pub fn custom_attributes(&self) -> Result<Vec<Arc<CustomAttribute>>> {
        let module = upgrade(&self.module)?;
        if let Some(owner) = module.index()?.param_owner.get(&self.token.row()) {
            let method = module.method(*owner)?;
            if self.sequence == 0 {
                method.return_parameter()?;
            } else {
                method.parameters()?;
            }
        }
        Ok(traits::unprocessed(self.all_custom_attributes()?))
    }

    /// Every custom attribute.
    ///
    /// # Errors
    /// Returns an error if an attribute row cannot be read.
    pub fn all_custom_attributes(&self) -> Result<&[Arc<CustomAttribute>]> {
        self.attributes
            .get_or_try_init(|| upgrade(&self.module)?.custom_attributes_of(self.token))
            .map(Vec::as_slice)
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("token", &self.token)
            .field("sequence", &self.sequence)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// One position of a method, combining its signature with its optional `Param` row
#[derive(Debug, Clone)]
pub struct MethodParameter {
    /// 0 for the return value, 1.. for parameters
    pub sequence: u16,
    /// The `Param` row, if the compiler emitted one
    pub definition: Option<Arc<Parameter>>,
    /// The position's type with modifiers split off
    pub signature: SignatureParameter,
    /// How a by-reference position may be used
    pub ref_kind: RefKind,
    /// True for a `params` array
    pub is_params_array: bool,
}

impl MethodParameter {
    /// The parameter name, if the `Param` row carries one
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.definition
            .as_ref()
            .map(|definition| definition.name())
            .filter(|name| !name.is_empty())
    }
}

/// A method defined in a module
pub struct Method {
    token: Token,
    module: Weak<Module>,
    name: String,
    flags: MethodAttributes,
    impl_flags: MethodImplAttributes,
    rva: u32,
    signature_blob: u32,
    declaring: Lazy<Option<EntityRef<TypeDefinition>>>,
    generic_parameters: Lazy<Vec<Arc<GenericParameter>>>,
    generic_context: Lazy<GenericContext>,
    signature: Lazy<MethodSignature>,
    definitions: Lazy<Vec<Arc<Parameter>>>,
    parameters: Lazy<Vec<MethodParameter>>,
    return_parameter: Lazy<MethodParameter>,
    attributes: Lazy<Vec<Arc<CustomAttribute>>>,
    traits: Lazy<MethodTraits>,
    semantics: Lazy<Option<(Token, MethodSemanticsAttributes)>>,
    kind: Lazy<MethodKind>,
    body: Lazy<Option<MethodBody>>,
}

impl Method {
    pub(crate) fn new(rid: u32, module: Weak<Module>, row: &MethodDefRow, name: &str) -> Self {
        Method {
            token: Token::from_parts(TableId::MethodDef, rid),
            module,
            name: name.to_string(),
            flags: MethodAttributes::from_bits_retain(row.flags),
            impl_flags: MethodImplAttributes::from_bits_retain(row.impl_flags),
            rva: row.rva,
            signature_blob: row.signature,
            declaring: Lazy::new(),
            generic_parameters: Lazy::new(),
            generic_context: Lazy::new(),
            signature: Lazy::new(),
            definitions: Lazy::new(),
            parameters: Lazy::new(),
            return_parameter: Lazy::new(),
            attributes: Lazy::new(),
            traits: Lazy::new(),
            semantics: Lazy::new(),
            kind: Lazy::new(),
            body: Lazy::new(),
        }
    }

    /// The `MethodDef` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Declared name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `MethodAttributes`
    #[must_use]
    pub fn flags(&self) -> MethodAttributes {
        self.flags
    }

    /// `MethodImplAttributes`
    #[must_use]
    pub fn impl_flags(&self) -> MethodImplAttributes {
        self.impl_flags
    }

    /// RVA of the body, 0 for abstract, runtime and P/Invoke methods
    #[must_use]
    pub fn rva(&self) -> u32 {
        self.rva
    }

    /// Declared accessibility
    #[must_use]
    pub fn accessibility(&self) -> Accessibility {
        Accessibility::from_member_access(self.flags.bits())
    }

    /// True for static methods
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodAttributes::STATIC)
    }

    /// True for virtual methods
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.flags.contains(MethodAttributes::VIRTUAL)
    }

    /// True for abstract methods
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MethodAttributes::ABSTRACT)
    }

    /// True if the name has a meaning to tools or the runtime
    #[must_use]
    pub fn is_special_name(&self) -> bool {
        self.flags
            .intersects(MethodAttributes::SPECIAL_NAME | MethodAttributes::RT_SPECIAL_NAME)
    }

    /// True for `.ctor` and `.cctor`
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.is_special_name() && (self.name == ".ctor" || self.name == ".cctor")
    }

    /// The module defining this method.
    ///
    /// # Errors
    /// Returns [`crate::Error::Disposed`] if the module was dropped.
    pub fn module(&self) -> Result<Arc<Module>> {
        upgrade(&self.module)
    }

    /// The declaring type.
    ///
    /// # Errors
    /// Returns an error if the module was dropped or the owner row cannot be read.
    pub fn declaring_type(&self) -> Result<Option<Arc<TypeDefinition>>> {
        let declaring = self.declaring.get_or_try_init(|| {
            let module = self.module()?;
            match module.index()?.method_owner.get(&self.token.row()) {
                Some(rid) => Ok(Some(EntityRef::new(&module.type_definition(*rid)?))),
                None => Ok(None),
            }
        })?;

        declaring.as_ref().map(EntityRef::upgrade).transpose()
    }

    /// The method's own generic parameters ordered by number.
    ///
    /// # Errors
    /// Returns an error if a parameter row cannot be read.
    pub fn generic_parameters(&self) -> Result<&[Arc<GenericParameter>]> {
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

    /// The context resolving the declaring type's and this method's generic parameters.
    ///
    /// # Errors
    /// Returns an error if either parameter list cannot be read.
    pub fn generic_context(&self) -> Result<GenericContext> {
        self.generic_context
            .get_or_try_init(|| GenericContext::for_method(self))
            .cloned()
    }

    /// The decoded signature.
    ///
    /// # Errors
    /// Returns an error if the signature blob is malformed.
    pub fn signature(&self) -> Result<&MethodSignature> {
        self.signature.get_or_try_init(|| {
            let module = self.module()?;
            let context = self.generic_context()?;
            parse_method_signature(module.metadata().blob(self.signature_blob)?, &*module, &context)
        })
    }

    /// The `Param` rows of this method, in table order.
    ///
    /// # Errors
    /// Returns an error if a parameter row cannot be read.
    pub fn parameter_definitions(&self) -> Result<&[Arc<Parameter>]> {
        self.definitions
            .get_or_try_init(|| {
                let module = self.module()?;
                module
                    .metadata()
                    .list(TableId::MethodDef, self.token.row(), 5, TableId::Param)?
                    .into_iter()
                    .map(|rid| module.parameter(rid))
                    .collect()
            })
            .map(Vec::as_slice)
    }

    fn position(&self, sequence: u16, signature: &SignatureParameter) -> Result<MethodParameter> {
        let definition = self
            .parameter_definitions()?
            .iter()
            .find(|definition| definition.sequence() == sequence)
            .cloned();

        let (ref_kind, is_params_array) = match &definition {
            Some(definition) => traits::launder_parameter(
                signature,
                definition.flags(),
                definition.all_custom_attributes()?,
            ),
            None => traits::launder_parameter(signature, ParamAttributes::empty(), &[]),
        };

        Ok(MethodParameter {
            sequence,
            definition,
            signature: signature.clone(),
            ref_kind,
            is_params_array,
        })
    }

    /// Parameters in signature order, each paired with its `Param` row and laundered traits.
    ///
    /// # Errors
    /// Returns an error if the signature or a parameter row cannot be read.
    pub fn parameters(&self) -> Result<&[MethodParameter]> {
        self.parameters
            .get_or_try_init(|| {
                self.signature()?
                    .parameters
                    .iter()
                    .enumerate()
                    .map(|(position, signature)| {
                        let sequence = u16::try_from(position + 1).map_err(|_| {
                            malformed_error!("Too many parameters - {}", position + 1)
                        })?;
                        self.position(sequence, signature)
                    })
                    .collect()
            })
            .map(Vec::as_slice)
    }

    /// The return position.
    ///
    /// # Errors
    /// Returns an error if the signature or a parameter row cannot be read.
    pub fn return_parameter(&self) -> Result<&MethodParameter> {
        self.return_parameter
            .get_or_try_init(|| self.position(0, &self.signature()?.return_parameter))
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
    pub fn traits(&self) -> Result<&MethodTraits> {
        self.traits
            .get_or_try_init(|| Ok(MethodTraits::launder(self.all_custom_attributes()?)))
    }

    /// True for `readonly` struct members
    ///
    /// # Errors
    /// Returns an error if the attributes cannot be read.
    pub fn is_read_only(&self) -> Result<bool> {
        Ok(self.traits()?.is_read_only)
    }

    fn semantics(&self) -> Result<Option<(Token, MethodSemanticsAttributes)>> {
        self.semantics
            .get_or_try_init(|| {
                Ok(self
                    .module()?
                    .index()?
                    .semantics_by_method
                    .get(&self.token.row())
                    .copied())
            })
            .copied()
    }

    /// The property or event this method is an accessor of.
    ///
    /// # Errors
    /// Returns an error if the owning row cannot be read.
    pub fn associated_member(&self) -> Result<Option<Member>> {
        match self.semantics()? {
            Some((association, _)) => Ok(Some(self.module()?.resolve_member(association)?)),
            None => Ok(None),
        }
    }

    /// The method's role.
    ///
    /// # Errors
    /// Returns an error if the semantics, signature or override rows cannot be read.
    pub fn kind(&self) -> Result<MethodKind> {
        self.kind.get_or_try_init(|| self.compute_kind()).copied()
    }

    fn compute_kind(&self) -> Result<MethodKind> {
        if self.is_special_name() {
            match self.name.as_str() {
                ".ctor" => return Ok(MethodKind::Constructor),
                ".cctor" => return Ok(MethodKind::StaticConstructor),
                _ => {}
            }
        }

        if let Some((_, semantics)) = self.semantics()? {
            let kind = if semantics.contains(MethodSemanticsAttributes::GETTER) {
                MethodKind::PropertyGet
            } else if semantics.contains(MethodSemanticsAttributes::SETTER) {
                MethodKind::PropertySet
            } else if semantics.contains(MethodSemanticsAttributes::ADD_ON) {
                MethodKind::EventAdd
            } else if semantics.contains(MethodSemanticsAttributes::REMOVE_ON) {
                MethodKind::EventRemove
            } else if semantics.contains(MethodSemanticsAttributes::FIRE) {
                MethodKind::EventRaise
            } else {
                MethodKind::Ordinary
            };
            return Ok(kind);
        }

        if self.is_special_name() && self.name.starts_with("op_") {
            let arity = self.signature()?.parameters.len();
            return Ok(match self.name.as_str() {
                "op_Implicit" | "op_Explicit" if arity == 1 => MethodKind::Conversion,
                _ if arity == 1 || arity == 2 => MethodKind::UserDefinedOperator,
                _ => MethodKind::Ordinary,
            });
        }

        if self.is_finalizer()? {
            return Ok(MethodKind::Finalizer);
        }

        if self.is_virtual()
            && self.accessibility() == Accessibility::Private
            && self
                .module()?
                .index()?
                .implementing_methods
                .contains(&self.token)
        {
            return Ok(MethodKind::ExplicitInterfaceImplementation);
        }

        Ok(MethodKind::Ordinary)
    }

    fn is_finalizer(&self) -> Result<bool> {
        if self.name != "Finalize" || !self.is_virtual() || self.is_static() {
            return Ok(false);
        }
        if self.accessibility() != Accessibility::Family {
            return Ok(false);
        }

        let signature = self.signature()?;
        if !signature.parameters.is_empty() || signature.generic_parameter_count != 0 {
            return Ok(false);
        }
        if signature.return_parameter.ty.primitive() != Some(ELEMENT_TYPE::VOID) {
            return Ok(false);
        }

        // Only an override counts, except on System.Object which declares the slot
        if !self.flags.contains(MethodAttributes::NEW_SLOT) {
            return Ok(true);
        }
        Ok(match self.declaring_type()? {
            Some(ty) => ty.full_name()? == "System.Object",
            None => false,
        })
    }

    /// The decoded body, absent for methods without IL or when body decoding is disabled.
    ///
    /// # Errors
    /// Returns an error if the body header is malformed.
    pub fn body(&self) -> Result<Option<&MethodBody>> {
        let body = self.body.get_or_try_init(|| {
            let module = self.module()?;
            if self.rva == 0 || !module.config().decode_method_bodies {
                return Ok(None);
            }
            Ok(Some(module.metadata().method_body(self.rva)?))
        })?;
        Ok(body.as_ref())
    }

    /// The local variables of the body, decoded in this method's context.
    ///
    /// # Errors
    /// Returns an error if the body or its locals signature is malformed.
    pub fn local_variables(&self) -> Result<Vec<LocalVariable>> {
        let Some(body) = self.body()? else {
            return Ok(Vec::new());
        };
        if body.local_var_sig_token.is_null() {
            return Ok(Vec::new());
        }

        self.module()?
            .local_signature(body.local_var_sig_token, &self.generic_context()?)
    }

    /// A fresh forward-only decoder over the body's instructions.
    ///
    /// A body that cannot be read yields an empty sequence and counts as an IL fault.
    ///
    /// # Errors
    /// Returns an error if the module was dropped or the generic context cannot be built.
    pub fn instructions(&self) -> Result<InstructionDecoder<'_, Module>> {
        let module = self.module()?;
        let context = self.generic_context()?;
        let code = match self.body() {
            Ok(Some(body)) => body.code.as_slice(),
            Ok(None) => &[],
            Err(error) => {
                warn!(token = %self.token, %error, "method body abandoned");
                module
                    .diagnostics()
                    .record_il_fault(Some(self.token), 0, error.to_string());
                &[]
            }
        };

        Ok(InstructionDecoder::new(code, module, context).with_method(self.token))
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("token", &self.token)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
