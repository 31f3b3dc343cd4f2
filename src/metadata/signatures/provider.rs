//! The seam between signature decoding and whatever owns the named types.

use std::sync::Arc;

use crossbeam_skiplist::SkipMap;

use crate::{
    metadata::{
        signatures::{primitive_name, NamedTypeRef, TypeSig, MAX_RECURSION_DEPTH},
        token::Token,
        typesystem::{GenericContext, ResolutionScope, TypeReference},
    },
    Result,
};

/// Supplies the named types a signature refers to.
///
/// [`crate::metadata::typesystem::Module`] implements this over its tables; the
/// [`SyntheticTypeProvider`] needs no image at all.
pub trait TypeProvider {
    /// The named type standing for a primitive element type (`System.Int32` for `I4`, ...).
    ///
    /// # Errors
    /// Returns an error if `element_type` is not a primitive.
    fn primitive_type(&self, element_type: u8) -> Result<NamedTypeRef>;

    /// The type a `TypeDef`, `TypeRef` or `TypeSpec` token stands for. `depth` is the nesting
    /// depth of the position the token appears at, so nested `TypeSpec` decoding can continue
    /// counting against the same limit.
    ///
    /// # Errors
    /// Returns an error if the token cannot be resolved.
    fn type_from_token(&self, token: Token, context: &GenericContext, depth: usize) -> Result<TypeSig>;

    /// Nesting limit for signatures decoded against this provider
    fn max_depth(&self) -> usize {
        MAX_RECURSION_DEPTH
    }
}

/// A provider that invents a name-interned reference for every type it is asked about.
///
/// Primitives map to their `System` names; tokens map to a reference named after the token
/// value (`0x01000003`) in the empty namespace.
#[derive(Default)]
pub struct SyntheticTypeProvider {
    types: SkipMap<String, Arc<TypeReference>>,
}

impl SyntheticTypeProvider {
    /// Create an empty provider
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The interned reference for `namespace.name`
    #[must_use]
    pub fn named(&self, namespace: &str, name: &str) -> Arc<TypeReference> {
        let key = format!("{namespace}.{name}");
        if let Some(entry) = self.types.get(&key) {
            return entry.value().clone();
        }

        let created = Arc::new(TypeReference::synthesized(
            std::sync::Weak::new(),
            namespace,
            name,
            ResolutionScope::None,
        ));
        self.types.get_or_insert(key, created).value().clone()
    }
}

impl TypeProvider for SyntheticTypeProvider {
    fn primitive_type(&self, element_type: u8) -> Result<NamedTypeRef> {
        let Some(name) = primitive_name(element_type) else {
            return Err(malformed_error!("Not a primitive element type - {}", element_type));
        };

        Ok(NamedTypeRef::reference(&self.named("System", name)))
    }

    fn type_from_token(&self, token: Token, _context: &GenericContext, _depth: usize) -> Result<TypeSig> {
        Ok(TypeSig::Named(NamedTypeRef::reference(
            &self.named("", &token.to_string()),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::signatures::ELEMENT_TYPE;

    #[test]
    fn interning() {
        let provider = SyntheticTypeProvider::new();
        let first = provider.primitive_type(ELEMENT_TYPE::I4).unwrap();
        let second = provider.primitive_type(ELEMENT_TYPE::I4).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.full_name().unwrap(), "System.Int32");
        assert_eq!(first.primitive(), Some(ELEMENT_TYPE::I4));
        assert!(provider.primitive_type(ELEMENT_TYPE::CLASS).is_err());

        let token = provider
            .type_from_token(Token::new(0x0100_0003), &GenericContext::default(), 0)
            .unwrap();
        assert_eq!(token.to_string(), "0x01000003");
    }
}
