//! Method and type signature decoding.
//!
//! Signatures encode the types of fields, method parameters, properties, locals and generic
//! instantiations in the compressed binary form of ECMA-335 II.23.2. Decoding produces
//! [`TypeSig`] trees whose named leaves come from a [`TypeProvider`] and whose generic
//! parameter references resolve against a [`crate::metadata::typesystem::GenericContext`].
//!
//! # Signature Kinds
//!
//! - **Method Signatures** - Calling convention, generic arity, return and parameter positions
//! - **Field Signatures** - One position, prefixed by `0x06`
//! - **Property Signatures** - Property type and indexer parameters, prefixed by `0x08`
//! - **LocalVar Signatures** - Local slots with their pinned flag, prefixed by `0x07`
//! - **MethodSpec Signatures** - Type arguments of a generic method instantiation
//!
//! # Positions
//!
//! Every parameter, return value, field and local is a *position*. Custom modifiers and the
//! by-ref marker stay inline in a raw [`TypeSig`]; [`consume`] splits them into a
//! [`SignatureParameter`] and [`combine`] restores the inline form exactly.
//!
//! # Examples
//!
//! ```rust
//! use cilgraph::metadata::signatures::{parse_method_signature, SyntheticTypeProvider};
//! use cilgraph::metadata::typesystem::GenericContext;
//!
//! let provider = SyntheticTypeProvider::new();
//! // instance string (int32)
//! let signature = parse_method_signature(
//!     &[0x20, 0x01, 0x0E, 0x08],
//!     &provider,
//!     &GenericContext::default(),
//! )?;
//!
//! assert!(signature.has_this);
//! assert_eq!(signature.return_parameter.ty.to_string(), "System.String");
//! # Ok::<(), cilgraph::Error>(())
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 23.2 - Blobs and Signatures

mod parser;
mod processor;
mod provider;
mod types;

pub use parser::*;
pub use processor::*;
pub use provider::*;
pub use types::*;

use crate::{metadata::typesystem::GenericContext, Result};

/// Parse a method signature blob
///
/// # Errors
/// Returns an error if the signature data is malformed or a referenced type cannot be resolved
pub fn parse_method_signature<P: TypeProvider + ?Sized>(
    data: &[u8],
    provider: &P,
    context: &GenericContext,
) -> Result<MethodSignature> {
    SignatureParser::new(data, provider, context).parse_method_signature()
}

/// Parse a field signature blob
///
/// # Errors
/// Returns an error if the signature data is malformed or a referenced type cannot be resolved
pub fn parse_field_signature<P: TypeProvider + ?Sized>(
    data: &[u8],
    provider: &P,
    context: &GenericContext,
) -> Result<SignatureParameter> {
    SignatureParser::new(data, provider, context).parse_field_signature()
}

/// Parse a property signature blob
///
/// # Errors
/// Returns an error if the signature data is malformed or a referenced type cannot be resolved
pub fn parse_property_signature<P: TypeProvider + ?Sized>(
    data: &[u8],
    provider: &P,
    context: &GenericContext,
) -> Result<PropertySignature> {
    SignatureParser::new(data, provider, context).parse_property_signature()
}

/// Parse a local variable signature blob
///
/// # Errors
/// Returns an error if the signature data is malformed or a referenced type cannot be resolved
pub fn parse_local_var_signature<P: TypeProvider + ?Sized>(
    data: &[u8],
    provider: &P,
    context: &GenericContext,
) -> Result<Vec<LocalVariable>> {
    SignatureParser::new(data, provider, context).parse_local_var_signature()
}

/// Parse a type specification blob, a bare type
///
/// # Errors
/// Returns an error if the signature data is malformed or a referenced type cannot be resolved
pub fn parse_type_spec_signature<P: TypeProvider + ?Sized>(
    data: &[u8],
    provider: &P,
    context: &GenericContext,
) -> Result<TypeSig> {
    SignatureParser::new(data, provider, context).parse_type()
}

/// Parse a method instantiation blob
///
/// # Errors
/// Returns an error if the signature data is malformed or a referenced type cannot be resolved
pub fn parse_method_spec_signature<P: TypeProvider + ?Sized>(
    data: &[u8],
    provider: &P,
    context: &GenericContext,
) -> Result<Vec<TypeSig>> {
    SignatureParser::new(data, provider, context).parse_method_spec_signature()
}
