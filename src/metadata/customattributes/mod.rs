//! Custom attributes: the entity, its decoded arguments and serialized type names.
//!
//! A [`CustomAttribute`] is created per `CustomAttribute` row. Its constructor, attribute type
//! and value are resolved the first time they are asked for. Decoding follows ECMA-335
//! II.23.3; enum arguments of unknown width are handled as described in [`decode_custom_attribute`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilgraph::CilFile;
//!
//! let file = CilFile::from_file("tests/samples/sample.dll".as_ref())?.expect("managed image");
//! for attribute in file.module().custom_attributes()? {
//!     let (namespace, name) = attribute.type_name()?;
//!     println!("[{namespace}.{name}] {:?}", attribute.value()?.fixed_arguments);
//! }
//! # Ok::<(), cilgraph::Error>(())
//! ```

mod parser;
mod typename;
mod types;

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Weak,
    },
};

pub use parser::{decode_custom_attribute, ENUM_WIDTH_TRIAL_ORDER};
pub use typename::{TypeName, TypeNameSuffix};
pub use types::*;

use crate::{
    metadata::{
        signatures::{MethodSignature, NamedTypeRef, TypeSig},
        tables::{CustomAttributeRow, TableId},
        token::Token,
        typesystem::{upgrade, Lazy, Member, Module},
    },
    Result,
};

/// One application of an attribute to a metadata entity
pub struct CustomAttribute {
    token: Token,
    module: Weak<Module>,
    parent: Token,
    constructor: Token,
    value_blob: u32,
    processed: AtomicBool,
    attribute_type: Lazy<Option<TypeSig>>,
    type_name: Lazy<(String, String)>,
    constructor_signature: Lazy<MethodSignature>,
    value: Lazy<CustomAttributeValue>,
}

impl CustomAttribute {
    pub(crate) fn new(rid: u32, module: Weak<Module>, row: &CustomAttributeRow) -> Self {
        CustomAttribute {
            token: Token::from_parts(TableId::CustomAttribute, rid),
            module,
            parent: row.parent,
            constructor: row.constructor,
            value_blob: row.value,
            processed: AtomicBool::new(false),
            attribute_type: Lazy::new(),
            type_name: Lazy::new(),
            constructor_signature: Lazy::new(),
            value: Lazy::new(),
        }
    }

    /// The `CustomAttribute` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// The entity the attribute is applied to
    #[must_use]
    pub fn parent(&self) -> Token {
        self.parent
    }

    /// The `MethodDef` or `MemberRef` token of the constructor
    #[must_use]
    pub fn constructor(&self) -> Token {
        self.constructor
    }

    /// The constructor entity.
    ///
    /// # Errors
    /// Returns an error if the token does not resolve to a method.
    pub fn constructor_member(&self) -> Result<Member> {
        let module = upgrade(&self.module)?;
        match module.resolve_member(self.constructor)? {
            member @ (Member::Method(_) | Member::Reference(_)) => Ok(member),
            _ => Err(malformed_error!(
                "Attribute constructor 0x{:08X} is not a method",
                self.constructor.value()
            )),
        }
    }

    /// The attribute type: the constructor's declaring type, generic arguments included.
    ///
    /// # Errors
    /// Returns an error if the constructor cannot be resolved.
    pub fn attribute_type(&self) -> Result<Option<&TypeSig>> {
        let ty = self.attribute_type.get_or_try_init(|| {
            let module = upgrade(&self.module)?;
            match self.constructor.table_id() {
                Some(TableId::MethodDef) => Ok(module
                    .method(self.constructor.row())?
                    .declaring_type()?
                    .map(|ty| TypeSig::Named(NamedTypeRef::definition(&ty)))),
                Some(TableId::MemberRef) => Ok(module
                    .member_reference(self.constructor.row())?
                    .parent_type()?
                    .cloned()),
                _ => Ok(None),
            }
        })?;
        Ok(ty.as_ref())
    }

    /// Namespace and name of the attribute type; nested attribute types report the
    /// namespace of their outermost enclosing type.
    ///
    /// # Errors
    /// Returns an error if the attribute type cannot be determined.
    pub fn type_name(&self) -> Result<(&str, &str)> {
        let (namespace, name) = self.type_name.get_or_try_init(|| {
            let Some(named) = self.attribute_type()?.and_then(TypeSig::named) else {
                return Err(malformed_error!(
                    "Attribute 0x{:08X} has no named attribute type",
                    self.token.value()
                ));
            };
            Ok((named.namespace()?, named.name()?))
        })?;
        Ok((namespace.as_str(), name.as_str()))
    }

    /// The constructor signature as declared, before substituting generic arguments.
    ///
    /// # Errors
    /// Returns an error if the constructor is not a method or its signature is malformed.
    pub fn constructor_signature(&self) -> Result<&MethodSignature> {
        self.constructor_signature.get_or_try_init(|| {
            let module = upgrade(&self.module)?;
            match self.constructor.table_id() {
                Some(TableId::MethodDef) => {
                    Ok(module.method(self.constructor.row())?.signature()?.clone())
                }
                Some(TableId::MemberRef) => module
                    .member_reference(self.constructor.row())?
                    .method_signature()?
                    .cloned()
                    .ok_or_else(|| malformed_error!("Attribute constructor is a field reference")),
                _ => Err(malformed_error!(
                    "Attribute constructor 0x{:08X} is not a method",
                    self.constructor.value()
                )),
            }
        })
    }

    /// The parameter types the blob is decoded against
    fn parameter_types(&self) -> Result<Vec<TypeSig>> {
        let signature = self.constructor_signature()?;
        let arguments = match self.attribute_type()? {
            Some(TypeSig::GenericInstance { arguments, .. }) => arguments.as_slice(),
            _ => &[],
        };

        Ok(signature
            .fixed_parameters()
            .iter()
            .map(|parameter| {
                if arguments.is_empty() {
                    parameter.ty.clone()
                } else {
                    parameter.ty.substitute(arguments, &[])
                }
            })
            .collect())
    }

    /// The decoded arguments. An attribute whose constructor or blob cannot be decoded yields
    /// an empty value and is counted in the module's diagnostics.
    ///
    /// # Errors
    /// Returns [`crate::Error::Disposed`] if the module was dropped before decoding.
    pub fn value(&self) -> Result<&CustomAttributeValue> {
        self.value.get_or_try_init(|| {
            let module = upgrade(&self.module)?;
            let input = module
                .metadata()
                .blob(self.value_blob)
                .and_then(|blob| Ok((blob, self.parameter_types()?)));

            match input {
                Ok((blob, parameters)) => Ok(decode_custom_attribute(
                    &module,
                    Some(self.token),
                    blob,
                    &parameters,
                )),
                Err(crate::Error::Disposed) => Err(crate::Error::Disposed),
                Err(error) => {
                    parser::abandon(&module, Some(self.token), &error);
                    Ok(CustomAttributeValue::default())
                }
            }
        })
    }

    /// Constructor arguments.
    ///
    /// # Errors
    /// See [`CustomAttribute::value`].
    pub fn fixed_arguments(&self) -> Result<&[TypedValue]> {
        Ok(&self.value()?.fixed_arguments)
    }

    /// Field and property assignments.
    ///
    /// # Errors
    /// See [`CustomAttribute::value`].
    pub fn named_arguments(&self) -> Result<&[NamedArgument]> {
        Ok(&self.value()?.named_arguments)
    }

    /// True once the attribute has been translated into a trait of its parent
    #[must_use]
    pub fn is_processed(&self) -> bool {
        self.processed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_processed(&self) {
        self.processed.store(true, Ordering::Release);
    }
}

impl fmt::Debug for CustomAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomAttribute")
            .field("token", &self.token)
            .field("parent", &self.parent)
            .field("constructor", &self.constructor)
            .field("processed", &self.is_processed())
            .finish_non_exhaustive()
    }
}
