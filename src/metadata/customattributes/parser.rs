//! Custom attribute blob decoding (II.23.3).
//!
//! A blob is a `0x0001` prolog, one value per constructor parameter, a `u16` count and the
//! named arguments. Fixed arguments carry no type tags: their layout follows from the
//! constructor's parameter types. That is ambiguous for enums, whose blob holds only the
//! underlying integer. An enum defined in the same module is sized from its `value__` field;
//! any other enum is sized from the module's cache of earlier successful decodes, and failing
//! that, guessed.
//!
//! # Width guessing
//!
//! Unknown enum types get the first width of [`ENUM_WIDTH_TRIAL_ORDER`] when first met. If
//! the whole blob then fails to decode (a read runs past the end, a tag is invalid, or bytes
//! remain after the last named argument), the most recently discovered guess moves to the
//! next width and the blob is decoded again from the start; exhausted guesses are dropped so
//! that earlier ones advance, odometer style. The number of passes is bounded by
//! [`crate::LoaderConfig::max_enum_width_attempts`]. A successful pass commits its guesses to
//! the module's cache.
//!
//! Decoding never fails: an undecodable attribute yields an empty value, counts as an
//! attribute fault and is logged.

use tracing::{trace, warn};

use crate::{
    file::parser::Parser,
    metadata::{
        customattributes::{
            typename::TypeName, AttributeValue, CustomAttributeValue, NamedArgument,
            NamedArgumentKind, TypedValue, SERIALIZATION_TYPE,
        },
        signatures::{NamedTypeRef, TypeProvider, TypeSig, ELEMENT_TYPE},
        token::Token,
        typesystem::{Module, ResolutionScope, TypeKind},
    },
    Error::RecursionLimit,
    Error,
    Result,
};

/// Candidate underlying types for an enum of unknown width, in trial order
pub const ENUM_WIDTH_TRIAL_ORDER: [u8; 8] = [
    ELEMENT_TYPE::I4,
    ELEMENT_TYPE::U1,
    ELEMENT_TYPE::I2,
    ELEMENT_TYPE::I8,
    ELEMENT_TYPE::U4,
    ELEMENT_TYPE::I1,
    ELEMENT_TYPE::U2,
    ELEMENT_TYPE::U8,
];

/// Guessed widths of unknown enum types, in discovery order
#[derive(Debug, Default)]
struct WidthGuesses {
    entries: Vec<Guess>,
}

#[derive(Debug)]
struct Guess {
    enum_name: String,
    candidate: usize,
    consulted: bool,
}

impl WidthGuesses {
    fn begin_pass(&mut self) {
        for guess in &mut self.entries {
            guess.consulted = false;
        }
    }

    fn width(&mut self, enum_name: &str) -> u8 {
        if let Some(guess) = self.entries.iter_mut().find(|g| g.enum_name == enum_name) {
            guess.consulted = true;
            return ENUM_WIDTH_TRIAL_ORDER[guess.candidate];
        }

        self.entries.push(Guess {
            enum_name: enum_name.to_string(),
            candidate: 0,
            consulted: true,
        });
        ENUM_WIDTH_TRIAL_ORDER[0]
    }

    /// Move to the next combination; false once none is left
    fn advance(&mut self) -> bool {
        self.entries.retain(|guess| guess.consulted);
        while let Some(last) = self.entries.last_mut() {
            if last.candidate + 1 < ENUM_WIDTH_TRIAL_ORDER.len() {
                last.candidate += 1;
                return true;
            }
            self.entries.pop();
        }
        false
    }

    fn consulted(&self) -> impl Iterator<Item = (&str, u8)> {
        self.entries
            .iter()
            .filter(|guess| guess.consulted)
            .map(|guess| (guess.enum_name.as_str(), ENUM_WIDTH_TRIAL_ORDER[guess.candidate]))
    }
}

/// Decode `blob` against the constructor parameter types `parameters`.
///
/// Never fails; see the module documentation for how ambiguity and malformed input are
/// handled.
pub fn decode_custom_attribute(
    module: &Module,
    token: Option<Token>,
    blob: &[u8],
    parameters: &[TypeSig],
) -> CustomAttributeValue {
    if blob.is_empty() && parameters.is_empty() {
        return CustomAttributeValue::default();
    }

    let limit = module.config().max_enum_width_attempts.max(1);
    let mut guesses = WidthGuesses::default();
    let mut attempts = 0usize;

    let error = loop {
        attempts += 1;
        guesses.begin_pass();

        let mut parser = CustomAttributeParser {
            parser: Parser::new(blob),
            module,
            guesses: &mut guesses,
            max_nesting: module.config().max_attribute_nesting,
        };
        match parser.parse(parameters) {
            Ok(value) => {
                for (enum_name, element_type) in guesses.consulted() {
                    module.record_enum_width(enum_name, element_type);
                }
                return value;
            }
            Err(error) => {
                if attempts >= limit || !guesses.advance() {
                    break error;
                }

                module.diagnostics().record_enum_width_retry();
                trace!(token = ?token, attempts, %error, "retrying with the next enum width");
            }
        }
    };

    abandon(module, token, &error);
    CustomAttributeValue::default()
}

/// Count and log an attribute that could not be decoded
pub(crate) fn abandon(module: &Module, token: Option<Token>, error: &Error) {
    warn!(token = ?token, %error, "custom attribute abandoned");
    module
        .diagnostics()
        .record_attribute_fault(token, error.to_string());
}

/// One decoding pass over a blob under a fixed set of width guesses
struct CustomAttributeParser<'a, 'm> {
    parser: Parser<'a>,
    module: &'m Module,
    guesses: &'m mut WidthGuesses,
    max_nesting: usize,
}

impl CustomAttributeParser<'_, '_> {
    fn parse(&mut self, parameters: &[TypeSig]) -> Result<CustomAttributeValue> {
        let prolog = self.parser.read_le::<u16>()?;
        if prolog != 0x0001 {
            return Err(malformed_error!(
                "Invalid custom attribute prolog - expected 0x0001, found 0x{:04X}",
                prolog
            ));
        }

        let mut fixed_arguments = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            fixed_arguments.push(self.fixed_argument(parameter, 0)?);
        }

        let count = self.parser.read_le::<u16>()?;
        let mut named_arguments = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            named_arguments.push(self.named_argument()?);
        }

        if self.parser.has_more_data() {
            return Err(malformed_error!(
                "{} trailing bytes after the last named argument",
                self.parser.remaining()
            ));
        }

        Ok(CustomAttributeValue {
            fixed_arguments,
            named_arguments,
        })
    }

    fn fixed_argument(&mut self, ty: &TypeSig, depth: usize) -> Result<TypedValue> {
        if depth > self.max_nesting {
            return Err(RecursionLimit(self.max_nesting));
        }

        match ty {
            TypeSig::Array {
                element,
                shape: None,
            } => {
                let count = self.parser.read_le::<u32>()?;
                if count == u32::MAX {
                    return Ok(TypedValue {
                        ty: ty.clone(),
                        value: AttributeValue::Array(None),
                    });
                }
                if count as usize > self.parser.remaining() {
                    return Err(malformed_error!(
                        "Array of {} elements exceeds the remaining {} bytes",
                        count,
                        self.parser.remaining()
                    ));
                }

                let mut elements = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    elements.push(self.fixed_argument(element, depth + 1)?);
                }
                Ok(TypedValue {
                    ty: ty.clone(),
                    value: AttributeValue::Array(Some(elements)),
                })
            }
            TypeSig::Named(named) => self.named_value(named, ty, depth),
            _ => Err(malformed_error!(
                "Type {} cannot appear in a custom attribute",
                ty
            )),
        }
    }

    fn named_value(&mut self, named: &NamedTypeRef, ty: &TypeSig, depth: usize) -> Result<TypedValue> {
        if let Some(element_type) = named.primitive() {
            return match element_type {
                ELEMENT_TYPE::OBJECT => self.boxed(depth),
                ELEMENT_TYPE::BOOLEAN..=ELEMENT_TYPE::STRING => Ok(TypedValue {
                    ty: ty.clone(),
                    value: self.primitive(element_type)?,
                }),
                _ => Err(malformed_error!("Type {} cannot appear in a custom attribute", ty)),
            };
        }

        if named.full_name()? == "System.Type" {
            let value = match self.parser.read_ser_string()? {
                Some(name) => Some(TypeName::parse(&name)?.to_type_sig(self.module)),
                None => None,
            };
            return Ok(TypedValue {
                ty: ty.clone(),
                value: AttributeValue::Type(value),
            });
        }

        let element_type = self.enum_width(named)?;
        Ok(TypedValue {
            ty: ty.clone(),
            value: self.primitive(element_type)?,
        })
    }

    /// The underlying element type of an enum: from its definition, the cache, or a guess
    fn enum_width(&mut self, named: &NamedTypeRef) -> Result<u8> {
        if let Some(definition) = named.local_definition()? {
            if let Some(element_type) = definition.enum_underlying_type()? {
                return Ok(element_type);
            }
            return Err(match definition.kind()? {
                TypeKind::Enum => malformed_error!("Enum {} has no value__ field", named),
                _ => malformed_error!("Type {} cannot appear in a custom attribute", named),
            });
        }

        let enum_name = named.full_name()?;
        if let Some(element_type) = self.module.cached_enum_width(&enum_name) {
            return Ok(element_type);
        }
        Ok(self.guesses.width(&enum_name))
    }

    fn boxed(&mut self, depth: usize) -> Result<TypedValue> {
        let tag = self.parser.read_le::<u8>()?;
        if tag == SERIALIZATION_TYPE::TAGGED_OBJECT {
            return Err(malformed_error!("Boxed value tagged as object"));
        }

        let ty = self.serialized_type(tag, depth)?;
        self.fixed_argument(&ty, depth + 1)
    }

    /// Decode a `FieldOrPropType` whose tag has been read
    fn serialized_type(&mut self, tag: u8, depth: usize) -> Result<TypeSig> {
        if depth > self.max_nesting {
            return Err(RecursionLimit(self.max_nesting));
        }

        Ok(match tag {
            SERIALIZATION_TYPE::BOOLEAN..=SERIALIZATION_TYPE::STRING => {
                TypeSig::Named(self.module.primitive_type(tag)?)
            }
            SERIALIZATION_TYPE::TAGGED_OBJECT => {
                TypeSig::Named(self.module.primitive_type(ELEMENT_TYPE::OBJECT)?)
            }
            SERIALIZATION_TYPE::TYPE => TypeSig::Named(NamedTypeRef::reference(
                &self
                    .module
                    .synthesized_type("System", "Type", ResolutionScope::None),
            )),
            SERIALIZATION_TYPE::SZARRAY => {
                let element_tag = self.parser.read_le::<u8>()?;
                TypeSig::Array {
                    element: Box::new(self.serialized_type(element_tag, depth + 1)?),
                    shape: None,
                }
            }
            SERIALIZATION_TYPE::ENUM => {
                let Some(name) = self.parser.read_ser_string()? else {
                    return Err(malformed_error!("Null enum type name"));
                };
                TypeSig::Named(TypeName::parse(&name)?.named_type(self.module))
            }
            _ => {
                return Err(malformed_error!(
                    "Invalid serialization type tag - 0x{:02X}",
                    tag
                ))
            }
        })
    }

    fn named_argument(&mut self) -> Result<NamedArgument> {
        let kind = match self.parser.read_le::<u8>()? {
            SERIALIZATION_TYPE::FIELD => NamedArgumentKind::Field,
            SERIALIZATION_TYPE::PROPERTY => NamedArgumentKind::Property,
            other => {
                return Err(malformed_error!(
                    "Invalid field/property indicator: 0x{:02X}",
                    other
                ))
            }
        };

        let tag = self.parser.read_le::<u8>()?;
        let ty = self.serialized_type(tag, 0)?;
        let Some(name) = self.parser.read_ser_string()? else {
            return Err(malformed_error!("Null named argument name"));
        };
        let value = self.fixed_argument(&ty, 0)?;

        Ok(NamedArgument { kind, name, value })
    }

    fn primitive(&mut self, element_type: u8) -> Result<AttributeValue> {
        Ok(match element_type {
            ELEMENT_TYPE::BOOLEAN => AttributeValue::Boolean(self.parser.read_le::<u8>()? != 0),
            ELEMENT_TYPE::CHAR => AttributeValue::Char(self.parser.read_le::<u16>()?),
            ELEMENT_TYPE::I1 => AttributeValue::I1(self.parser.read_le::<i8>()?),
            ELEMENT_TYPE::U1 => AttributeValue::U1(self.parser.read_le::<u8>()?),
            ELEMENT_TYPE::I2 => AttributeValue::I2(self.parser.read_le::<i16>()?),
            ELEMENT_TYPE::U2 => AttributeValue::U2(self.parser.read_le::<u16>()?),
            ELEMENT_TYPE::I4 => AttributeValue::I4(self.parser.read_le::<i32>()?),
            ELEMENT_TYPE::U4 => AttributeValue::U4(self.parser.read_le::<u32>()?),
            ELEMENT_TYPE::I8 => AttributeValue::I8(self.parser.read_le::<i64>()?),
            ELEMENT_TYPE::U8 => AttributeValue::U8(self.parser.read_le::<u64>()?),
            ELEMENT_TYPE::R4 => AttributeValue::R4(self.parser.read_le::<f32>()?),
            ELEMENT_TYPE::R8 => AttributeValue::R8(self.parser.read_le::<f64>()?),
            ELEMENT_TYPE::STRING => AttributeValue::String(self.parser.read_ser_string()?),
            _ => {
                return Err(malformed_error!(
                    "Invalid enum underlying type - 0x{:02X}",
                    element_type
                ))
            }
        })
    }
}
