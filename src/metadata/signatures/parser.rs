//! Signature blob parsing (II.23.2).

use crate::{
    file::parser::Parser,
    metadata::{
        signatures::{
            consume, ArrayShape, CallingConvention, CustomModifier, GenericParameterKind,
            LocalVariable, MethodSignature, NamedTypeRef, PropertySignature, SignatureParameter,
            TypeProvider, TypeSig, ELEMENT_TYPE,
        },
        typesystem::GenericContext,
    },
    Error::RecursionLimit,
    Result,
};

/// Default bound on type nesting, matching [`crate::LoaderConfig::default`]
pub const MAX_RECURSION_DEPTH: usize = 64;

/// A parser for one signature blob.
///
/// Named types are obtained from the [`TypeProvider`]; generic parameter references are
/// resolved against the [`GenericContext`] when it holds enough parameters, and kept as bare
/// positions otherwise.
pub struct SignatureParser<'a, 'p, P: TypeProvider + ?Sized> {
    parser: Parser<'a>,
    provider: &'p P,
    context: &'p GenericContext,
    depth: usize,
    max_depth: usize,
}

impl<'a, 'p, P: TypeProvider + ?Sized> SignatureParser<'a, 'p, P> {
    /// Create a parser over `data`
    #[must_use]
    pub fn new(data: &'a [u8], provider: &'p P, context: &'p GenericContext) -> Self {
        SignatureParser {
            parser: Parser::new(data),
            provider,
            context,
            depth: 0,
            max_depth: provider.max_depth(),
        }
    }

    /// Set the nesting limit and the depth this blob starts at
    #[must_use]
    pub fn with_depth(mut self, max_depth: usize, start_depth: usize) -> Self {
        self.max_depth = max_depth;
        self.depth = start_depth;
        self
    }

    /// Parse one type.
    ///
    /// # Errors
    /// Returns an error on truncated or malformed input, an unresolvable token, or
    /// [`crate::Error::RecursionLimit`] when the nesting limit is exceeded.
    pub fn parse_type(&mut self) -> Result<TypeSig> {
        self.depth += 1;
        if self.depth > self.max_depth {
            self.depth -= 1;
            return Err(RecursionLimit(self.max_depth));
        }

        let result = self.parse_type_inner();
        self.depth -= 1;
        result
    }

    fn parse_type_inner(&mut self) -> Result<TypeSig> {
        let current_byte = self.parser.read_le::<u8>()?;
        match current_byte {
            ELEMENT_TYPE::VOID..=ELEMENT_TYPE::STRING
            | ELEMENT_TYPE::TYPEDBYREF
            | ELEMENT_TYPE::I
            | ELEMENT_TYPE::U
            | ELEMENT_TYPE::OBJECT => Ok(TypeSig::Named(self.provider.primitive_type(current_byte)?)),
            ELEMENT_TYPE::PTR => Ok(TypeSig::Pointer(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::BYREF => Ok(TypeSig::ByRef(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::PINNED => Ok(TypeSig::Pinned(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::VALUETYPE | ELEMENT_TYPE::CLASS => {
                let token = self.parser.read_compressed_token()?;
                self.provider.type_from_token(token, self.context, self.depth)
            }
            ELEMENT_TYPE::VAR => self.generic_parameter(GenericParameterKind::Type),
            ELEMENT_TYPE::MVAR => self.generic_parameter(GenericParameterKind::Method),
            ELEMENT_TYPE::SZARRAY => Ok(TypeSig::Array {
                element: Box::new(self.parse_type()?),
                shape: None,
            }),
            ELEMENT_TYPE::ARRAY => {
                let element = Box::new(self.parse_type()?);
                let rank = self.parser.read_compressed_uint()?;

                let num_sizes = self.parser.read_compressed_uint()?;
                let mut sizes = Vec::with_capacity(num_sizes.min(rank) as usize);
                for _ in 0..num_sizes {
                    sizes.push(self.parser.read_compressed_uint()?);
                }

                let num_lo_bounds = self.parser.read_compressed_uint()?;
                let mut lower_bounds = Vec::with_capacity(num_lo_bounds.min(rank) as usize);
                for _ in 0..num_lo_bounds {
                    lower_bounds.push(self.parser.read_compressed_int()?);
                }

                if sizes.len() > rank as usize || lower_bounds.len() > rank as usize {
                    return Err(malformed_error!(
                        "Array shape declares more bounds than its rank {}",
                        rank
                    ));
                }

                Ok(TypeSig::Array {
                    element,
                    shape: Some(ArrayShape {
                        rank,
                        sizes,
                        lower_bounds,
                    }),
                })
            }
            ELEMENT_TYPE::GENERICINST => {
                let kind = self.parser.read_le::<u8>()?;
                if kind != ELEMENT_TYPE::CLASS && kind != ELEMENT_TYPE::VALUETYPE {
                    return Err(malformed_error!(
                        "GENERICINST - Next byte is not CLASS or VALUETYPE - {}",
                        kind
                    ));
                }

                let token = self.parser.read_compressed_token()?;
                let definition = self.named_type(token)?;

                let arg_count = self.parser.read_compressed_uint()?;
                if arg_count == 0 {
                    return Err(malformed_error!("GENERICINST without type arguments"));
                }

                let mut arguments = Vec::with_capacity(arg_count.min(64) as usize);
                for _ in 0..arg_count {
                    arguments.push(self.parse_type()?);
                }

                Ok(TypeSig::GenericInstance {
                    definition,
                    arguments,
                })
            }
            ELEMENT_TYPE::FNPTR => Ok(TypeSig::FunctionPointer(Box::new(
                self.parse_method_signature()?,
            ))),
            ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
                let token = self.parser.read_compressed_token()?;
                let modifier = CustomModifier {
                    modifier: self.named_type(token)?,
                    required: current_byte == ELEMENT_TYPE::CMOD_REQD,
                };

                Ok(TypeSig::Modified {
                    modifier,
                    inner: Box::new(self.parse_type()?),
                })
            }
            _ => Err(malformed_error!(
                "Unsupported ELEMENT_TYPE - {}",
                current_byte
            )),
        }
    }

    fn named_type(&mut self, token: crate::metadata::token::Token) -> Result<NamedTypeRef> {
        match self.provider.type_from_token(token, self.context, self.depth)? {
            TypeSig::Named(named) => Ok(named),
            other => Err(malformed_error!(
                "Expected a named type for {}, got {}",
                token,
                other
            )),
        }
    }

    fn generic_parameter(&mut self, kind: GenericParameterKind) -> Result<TypeSig> {
        let index = self.parser.read_compressed_uint()?;
        Ok(TypeSig::GenericParameter {
            kind,
            index,
            parameter: self.context.parameter(kind, index),
        })
    }

    fn parse_param(&mut self) -> Result<SignatureParameter> {
        Ok(consume(self.parse_type()?))
    }

    /// Parse a method definition, call site or function pointer signature.
    ///
    /// # Errors
    /// Returns an error on truncated or malformed input.
    pub fn parse_method_signature(&mut self) -> Result<MethodSignature> {
        let header = self.parser.read_le::<u8>()?;
        let Some(calling_convention) = CallingConvention::from_header(header) else {
            return Err(malformed_error!("Invalid method calling convention - {}", header));
        };

        let generic_parameter_count = if header & 0x10 != 0 {
            self.parser.read_compressed_uint()?
        } else {
            0
        };
        let param_count = self.parser.read_compressed_uint()? as usize;
        if param_count > self.parser.remaining() {
            return Err(malformed_error!(
                "Method signature declares {} parameters in {} bytes",
                param_count,
                self.parser.remaining()
            ));
        }

        let return_parameter = self.parse_param()?;

        let mut required_parameter_count = None;
        let mut parameters = Vec::with_capacity(param_count);
        for position in 0..param_count {
            if self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                self.parser.advance_by(1)?;
                if required_parameter_count.replace(position).is_some() {
                    return Err(malformed_error!("Method signature repeats the vararg sentinel"));
                }
            }

            parameters.push(self.parse_param()?);
        }

        Ok(MethodSignature {
            calling_convention,
            has_this: header & 0x20 != 0,
            explicit_this: header & 0x40 != 0,
            generic_parameter_count,
            required_parameter_count: required_parameter_count.unwrap_or(param_count),
            return_parameter,
            parameters,
        })
    }

    /// Parse a field signature.
    ///
    /// # Errors
    /// Returns an error if the blob does not start with the field marker or is malformed.
    pub fn parse_field_signature(&mut self) -> Result<SignatureParameter> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != 0x06 {
            return Err(malformed_error!(
                "SignatureField - invalid start - {}",
                head_byte
            ));
        }

        self.parse_param()
    }

    /// Parse a property signature.
    ///
    /// # Errors
    /// Returns an error if the blob does not start with the property marker or is malformed.
    pub fn parse_property_signature(&mut self) -> Result<PropertySignature> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte & 0x0F != 0x08 {
            return Err(malformed_error!(
                "SignatureProperty - invalid start - {}",
                head_byte
            ));
        }

        let param_count = self.parser.read_compressed_uint()?;
        let property_type = self.parse_param()?;

        let mut parameters = Vec::with_capacity(param_count.min(64) as usize);
        for _ in 0..param_count {
            parameters.push(self.parse_param()?);
        }

        Ok(PropertySignature {
            has_this: head_byte & 0x20 != 0,
            property_type,
            parameters,
        })
    }

    /// Parse a local variable signature.
    ///
    /// # Errors
    /// Returns an error if the blob does not start with the locals marker or is malformed.
    pub fn parse_local_var_signature(&mut self) -> Result<Vec<LocalVariable>> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != 0x07 {
            return Err(malformed_error!(
                "SignatureLocalVar - invalid start - {}",
                head_byte
            ));
        }

        let count = self.parser.read_compressed_uint()?;
        let mut locals = Vec::with_capacity(count.min(256) as usize);
        for _ in 0..count {
            let (ty, pinned) = unpin(self.parse_type()?);
            locals.push(LocalVariable {
                parameter: consume(ty),
                pinned,
            });
        }

        Ok(locals)
    }

    /// Parse the type arguments of a method instantiation.
    ///
    /// # Errors
    /// Returns an error if the blob does not start with the instantiation marker or is
    /// malformed.
    pub fn parse_method_spec_signature(&mut self) -> Result<Vec<TypeSig>> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != 0x0A {
            return Err(malformed_error!(
                "SignatureMethodSpec - invalid start - {}",
                head_byte
            ));
        }

        let arg_count = self.parser.read_compressed_uint()?;
        let mut arguments = Vec::with_capacity(arg_count.min(64) as usize);
        for _ in 0..arg_count {
            arguments.push(self.parse_type()?);
        }

        Ok(arguments)
    }
}

/// Lift a `PINNED` constraint found among a local's leading modifiers
fn unpin(ty: TypeSig) -> (TypeSig, bool) {
    match ty {
        TypeSig::Pinned(inner) => (*inner, true),
        TypeSig::Modified { modifier, inner } => {
            let (inner, pinned) = unpin(*inner);
            (
                TypeSig::Modified {
                    modifier,
                    inner: Box::new(inner),
                },
                pinned,
            )
        }
        other => (other, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::signatures::SyntheticTypeProvider, Error};

    fn parse(provider: &SyntheticTypeProvider, bytes: &[u8]) -> Result<TypeSig> {
        SignatureParser::new(bytes, provider, &GenericContext::default()).parse_type()
    }

    #[test]
    fn primitives() {
        let provider = SyntheticTypeProvider::new();
        let context = GenericContext::default();
        for (byte, name) in [(0x01, "Void"), (0x08, "Int32"), (0x0E, "String"), (0x1C, "Object"), (0x18, "IntPtr")] {
            let ty = SignatureParser::new(&[byte], &provider, &context).parse_type().unwrap();
            assert_eq!(ty.to_string(), format!("System.{name}"));
            assert_eq!(ty.primitive(), Some(byte));
        }
    }

    #[test]
    fn class_tokens() {
        let provider = SyntheticTypeProvider::new();
        assert_eq!(parse(&provider, &[0x12, 0x42]).unwrap().to_string(), "0x1b000010");
        assert_eq!(parse(&provider, &[0x11, 0x35]).unwrap().to_string(), "0x0100000d");
    }

    #[test]
    fn arrays() {
        let provider = SyntheticTypeProvider::new();
        let vector = parse(&provider, &[0x1D, 0x08]).unwrap();
        assert!(vector.is_vector());
        assert_eq!(vector.to_string(), "System.Int32[]");

        // int32[0...3, 2...] -> rank 2, one size, two lower bounds
        let array = parse(&provider, &[0x14, 0x08, 0x02, 0x01, 0x04, 0x02, 0x00, 0x04]).unwrap();
        match array {
            TypeSig::Array {
                shape: Some(shape), ..
            } => {
                assert_eq!(shape.rank, 2);
                assert_eq!(shape.sizes, vec![4]);
                assert_eq!(shape.lower_bounds, vec![0, 2]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn generic_instance() {
        let provider = SyntheticTypeProvider::new();
        // List<int32> with List as TypeRef 1
        let ty = parse(&provider, &[0x15, 0x12, 0x05, 0x01, 0x08]).unwrap();
        assert_eq!(ty.to_string(), "0x01000001<System.Int32>");
        assert!(parse(&provider, &[0x15, 0x08, 0x05, 0x01, 0x08]).is_err());
        assert!(parse(&provider, &[0x15, 0x12, 0x05, 0x00]).is_err());
    }

    #[test]
    fn modifiers_and_pointers() {
        let provider = SyntheticTypeProvider::new();
        // modopt(TypeRef 2) int32*
        let ty = parse(&provider, &[0x20, 0x09, 0x0F, 0x08]).unwrap();
        assert_eq!(ty.to_string(), "System.Int32* modopt(0x01000002)");
    }

    #[test]
    fn method_signature_with_varargs() {
        let provider = SyntheticTypeProvider::new();
        let context = GenericContext::default();
        // vararg void (int32, ..., string)
        let data = [0x05, 0x02, 0x01, 0x08, 0x41, 0x0E];
        let signature = SignatureParser::new(&data, &provider, &context)
            .parse_method_signature()
            .unwrap();

        assert!(signature.is_vararg());
        assert_eq!(signature.parameters.len(), 2);
        assert_eq!(signature.required_parameter_count, 1);
        assert_eq!(signature.fixed_parameters().len(), 1);
    }

    #[test]
    fn method_signature_by_ref_return() {
        let provider = SyntheticTypeProvider::new();
        let context = GenericContext::default();
        // instance generic<1> modreq(TypeRef 3) int32& (!!0)
        let data = [0x30, 0x01, 0x01, 0x1F, 0x0D, 0x10, 0x08, 0x1E, 0x00];
        let signature = SignatureParser::new(&data, &provider, &context)
            .parse_method_signature()
            .unwrap();

        assert!(signature.has_this);
        assert_eq!(signature.generic_parameter_count, 1);
        assert!(signature.return_parameter.by_ref);
        assert_eq!(signature.return_parameter.ref_modifiers.len(), 1);
        assert!(signature.return_parameter.modifiers.is_empty());
        assert!(matches!(
            signature.parameters[0].ty,
            TypeSig::GenericParameter {
                kind: GenericParameterKind::Method,
                index: 0,
                parameter: None
            }
        ));
    }

    #[test]
    fn field_property_and_locals() {
        let provider = SyntheticTypeProvider::new();
        let context = GenericContext::default();

        let field = SignatureParser::new(&[0x06, 0x1F, 0x05, 0x08], &provider, &context)
            .parse_field_signature()
            .unwrap();
        assert_eq!(field.modifiers.len(), 1);
        assert!(field.modifiers[0].required);
        assert!(SignatureParser::new(&[0x07, 0x08], &provider, &context)
            .parse_field_signature()
            .is_err());

        let property = SignatureParser::new(&[0x28, 0x01, 0x0E, 0x08], &provider, &context)
            .parse_property_signature()
            .unwrap();
        assert!(property.has_this);
        assert_eq!(property.parameters.len(), 1);

        let locals = SignatureParser::new(&[0x07, 0x02, 0x45, 0x10, 0x08, 0x0E], &provider, &context)
            .parse_local_var_signature()
            .unwrap();
        assert!(locals[0].pinned);
        assert!(locals[0].parameter.by_ref);
        assert!(!locals[1].pinned);

        let instantiation = SignatureParser::new(&[0x0A, 0x02, 0x08, 0x0E], &provider, &context)
            .parse_method_spec_signature()
            .unwrap();
        assert_eq!(instantiation.len(), 2);
    }

    #[test]
    fn recursion_limit() {
        let provider = SyntheticTypeProvider::new();
        let mut data = vec![0x0F; 200];
        data.push(0x08);
        assert!(matches!(parse(&provider, &data), Err(Error::RecursionLimit(MAX_RECURSION_DEPTH))));

        let context = GenericContext::default();
        let ty = SignatureParser::new(&data, &provider, &context)
            .with_depth(256, 0)
            .parse_type();
        assert!(ty.is_ok());
    }

    #[test]
    fn truncated() {
        let provider = SyntheticTypeProvider::new();
        assert!(parse(&provider, &[0x1D]).is_err());
        assert!(parse(&provider, &[0x14, 0x08]).is_err());
        assert!(parse(&provider, &[0x41]).is_err());
    }
}
