//! Member-like entities referenced from IL and attribute constructors: `MemberRef` and
//! `MethodSpec` rows.

use std::{fmt, sync::Weak};

use crate::{
    metadata::{
        signatures::{
            parse_field_signature, parse_method_signature, parse_method_spec_signature,
            MethodSignature, NamedTypeRef, SignatureParameter, TypeSig,
        },
        tables::{MemberRefRow, MethodSpecRow, TableId},
        token::Token,
        typesystem::{upgrade, GenericContext, Lazy, Member, Module},
    },
    Result,
};

/// The decoded signature of a member reference
#[derive(Debug, Clone, PartialEq)]
pub enum MemberReferenceSignature {
    /// A method or call-site signature
    Method(MethodSignature),
    /// A field type
    Field(SignatureParameter),
}

/// A reference to a field or method by parent, name and signature
pub struct MemberReference {
    token: Token,
    module: Weak<Module>,
    name: String,
    parent: Token,
    signature_blob: u32,
    signature: Lazy<MemberReferenceSignature>,
    parent_type: Lazy<Option<TypeSig>>,
}

impl MemberReference {
    pub(crate) fn new(rid: u32, module: Weak<Module>, row: &MemberRefRow, name: &str) -> Self {
        MemberReference {
            token: Token::from_parts(TableId::MemberRef, rid),
            module,
            name: name.to_string(),
            parent: row.class,
            signature_blob: row.signature,
            signature: Lazy::new(),
            parent_type: Lazy::new(),
        }
    }

    /// The `MemberRef` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Referenced member name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `MemberRefParent` token: a type, a module reference or a vararg method definition
    #[must_use]
    pub fn parent(&self) -> Token {
        self.parent
    }

    /// True if the reference names a constructor
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor" || self.name == ".cctor"
    }

    /// The signature; generic parameter references stay positional because they refer to
    /// the parent type's instantiation.
    ///
    /// # Errors
    /// Returns an error if the signature blob is malformed.
    pub fn signature(&self) -> Result<&MemberReferenceSignature> {
        self.signature.get_or_try_init(|| {
            let module = upgrade(&self.module)?;
            let blob = module.metadata().blob(self.signature_blob)?;
            let context = GenericContext::default();
            match blob.first() {
                Some(0x06) => Ok(MemberReferenceSignature::Field(parse_field_signature(
                    blob, &*module, &context,
                )?)),
                Some(_) => Ok(MemberReferenceSignature::Method(parse_method_signature(
                    blob, &*module, &context,
                )?)),
                None => Err(malformed_error!("Empty member reference signature")),
            }
        })
    }

    /// The method signature, if this references a method.
    ///
    /// # Errors
    /// Returns an error if the signature blob is malformed.
    pub fn method_signature(&self) -> Result<Option<&MethodSignature>> {
        Ok(match self.signature()? {
            MemberReferenceSignature::Method(signature) => Some(signature),
            MemberReferenceSignature::Field(_) => None,
        })
    }

    /// The declaring type: the parent type, or the declaring type of a vararg method
    /// definition. `None` for members of a module reference.
    ///
    /// # Errors
    /// Returns an error if the parent cannot be resolved.
    pub fn parent_type(&self) -> Result<Option<&TypeSig>> {
        let parent = self
            .parent_type
            .get_or_try_init(|| self.parent_type_in(&GenericContext::default()))?;
        Ok(parent.as_ref())
    }

    /// The declaring type with a `TypeSpec` parent decoded in the calling method's context,
    /// so `List<!!0>` at a call site carries the caller's parameter.
    ///
    /// # Errors
    /// Returns an error if the parent cannot be resolved.
    pub fn parent_type_in(&self, context: &GenericContext) -> Result<Option<TypeSig>> {
        let module = upgrade(&self.module)?;
        match self.parent.table_id() {
            Some(TableId::TypeDef | TableId::TypeRef | TableId::TypeSpec) => {
                Ok(Some(module.resolve_type(self.parent, context)?))
            }
            Some(TableId::MethodDef) => Ok(module
                .method(self.parent.row())?
                .declaring_type()?
                .map(|ty| TypeSig::Named(NamedTypeRef::definition(&ty)))),
            _ => Ok(None),
        }
    }
}

impl fmt::Debug for MemberReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberReference")
            .field("token", &self.token)
            .field("parent", &self.parent)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An instantiation of a generic method
pub struct MethodSpecification {
    token: Token,
    module: Weak<Module>,
    method: Token,
    instantiation_blob: u32,
    arguments: Lazy<Vec<TypeSig>>,
}

impl MethodSpecification {
    pub(crate) fn new(rid: u32, module: Weak<Module>, row: &MethodSpecRow) -> Self {
        MethodSpecification {
            token: Token::from_parts(TableId::MethodSpec, rid),
            module,
            method: row.method,
            instantiation_blob: row.instantiation,
            arguments: Lazy::new(),
        }
    }

    /// The `MethodSpec` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// The `MethodDef` or `MemberRef` token of the generic method
    #[must_use]
    pub fn method_token(&self) -> Token {
        self.method
    }

    /// The generic method being instantiated.
    ///
    /// # Errors
    /// Returns an error if the method token cannot be resolved.
    pub fn method(&self) -> Result<Member> {
        upgrade(&self.module)?.resolve_member(self.method)
    }

    /// Type arguments; references to the caller's generic parameters stay positional.
    ///
    /// # Errors
    /// Returns an error if the instantiation blob is malformed.
    pub fn arguments(&self) -> Result<&[TypeSig]> {
        self.arguments
            .get_or_try_init(|| self.arguments_in(&GenericContext::default()))
            .map(Vec::as_slice)
    }

    /// Type arguments decoded in the calling method's context.
    ///
    /// # Errors
    /// Returns an error if the instantiation blob is malformed.
    pub fn arguments_in(&self, context: &GenericContext) -> Result<Vec<TypeSig>> {
        let module = upgrade(&self.module)?;
        parse_method_spec_signature(
            module.metadata().blob(self.instantiation_blob)?,
            &*module,
            context,
        )
    }
}

impl fmt::Debug for MethodSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSpecification")
            .field("token", &self.token)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}
