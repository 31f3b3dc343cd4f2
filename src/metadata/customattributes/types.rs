//! Decoded custom attribute values.

use std::fmt;

use crate::metadata::signatures::TypeSig;

/// The decoded arguments of one custom attribute
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomAttributeValue {
    /// Constructor arguments in parameter order
    pub fixed_arguments: Vec<TypedValue>,
    /// Field and property assignments in blob order
    pub named_arguments: Vec<NamedArgument>,
}

impl CustomAttributeValue {
    /// True if nothing was decoded, either because the attribute has no arguments or
    /// because its blob could not be decoded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fixed_arguments.is_empty() && self.named_arguments.is_empty()
    }

    /// The named argument called `name`
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&NamedArgument> {
        self.named_arguments.iter().find(|argument| argument.name == name)
    }
}

/// A value together with the type it was decoded as.
///
/// For enum arguments `ty` is the enum type and `value` holds the underlying integer; for
/// boxed `object` arguments `ty` is the type tagged in the blob.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    /// The value's type
    pub ty: TypeSig,
    /// The value
    pub value: AttributeValue,
}

/// An argument value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// `bool`
    Boolean(bool),
    /// `char`, one UTF-16 code unit
    Char(u16),
    /// `sbyte`
    I1(i8),
    /// `byte`
    U1(u8),
    /// `short`
    I2(i16),
    /// `ushort`
    U2(u16),
    /// `int`
    I4(i32),
    /// `uint`
    U4(u32),
    /// `long`
    I8(i64),
    /// `ulong`
    U8(u64),
    /// `float`
    R4(f32),
    /// `double`
    R8(f64),
    /// `string`, `None` for null
    String(Option<String>),
    /// `System.Type`, `None` for null
    Type(Option<TypeSig>),
    /// A vector, `None` for null
    Array(Option<Vec<TypedValue>>),
}

impl AttributeValue {
    /// The value widened to `i64`, for integral values
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        Some(match self {
            AttributeValue::I1(v) => i64::from(*v),
            AttributeValue::U1(v) => i64::from(*v),
            AttributeValue::I2(v) => i64::from(*v),
            AttributeValue::U2(v) => i64::from(*v),
            AttributeValue::I4(v) => i64::from(*v),
            AttributeValue::U4(v) => i64::from(*v),
            AttributeValue::I8(v) => *v,
            AttributeValue::U8(v) => i64::try_from(*v).ok()?,
            AttributeValue::Char(v) => i64::from(*v),
            _ => return None,
        })
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Boolean(v) => write!(f, "{v}"),
            AttributeValue::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "'{c}'"),
                None => write!(f, "'\\u{v:04x}'"),
            },
            AttributeValue::I1(v) => write!(f, "{v}"),
            AttributeValue::U1(v) => write!(f, "{v}"),
            AttributeValue::I2(v) => write!(f, "{v}"),
            AttributeValue::U2(v) => write!(f, "{v}"),
            AttributeValue::I4(v) => write!(f, "{v}"),
            AttributeValue::U4(v) => write!(f, "{v}"),
            AttributeValue::I8(v) => write!(f, "{v}"),
            AttributeValue::U8(v) => write!(f, "{v}"),
            AttributeValue::R4(v) => write!(f, "{v}"),
            AttributeValue::R8(v) => write!(f, "{v}"),
            AttributeValue::String(Some(v)) => write!(f, "{v:?}"),
            AttributeValue::Type(Some(ty)) => write!(f, "typeof({ty})"),
            AttributeValue::String(None) | AttributeValue::Type(None) | AttributeValue::Array(None) => {
                f.write_str("null")
            }
            AttributeValue::Array(Some(elements)) => {
                f.write_str("[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", element.value)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Whether a named argument sets a field or a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedArgumentKind {
    /// `FIELD` (0x53)
    Field,
    /// `PROPERTY` (0x54)
    Property,
}

/// A field or property assignment
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArgument {
    /// Field or property
    pub kind: NamedArgumentKind,
    /// Member name
    pub name: String,
    /// The assigned value
    pub value: TypedValue,
}

/// Type tags of named arguments and boxed values (II.23.3)
#[allow(non_snake_case, missing_docs)]
pub mod SERIALIZATION_TYPE {
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0A;
    pub const U8: u8 = 0x0B;
    pub const R4: u8 = 0x0C;
    pub const R8: u8 = 0x0D;
    pub const STRING: u8 = 0x0E;
    pub const SZARRAY: u8 = 0x1D;
    pub const TYPE: u8 = 0x50;
    pub const TAGGED_OBJECT: u8 = 0x51;
    pub const FIELD: u8 = 0x53;
    pub const PROPERTY: u8 = 0x54;
    pub const ENUM: u8 = 0x55;
}
