//! Default values from the `Constant` table (II.22.9).

use std::fmt;

use widestring::U16Str;

use crate::{
    file::parser::Parser,
    metadata::signatures::ELEMENT_TYPE,
    Result,
};

/// A literal default value of a field, parameter or property
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// `bool`
    Boolean(bool),
    /// `char`, as a UTF-16 code unit
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
    /// `string`
    String(String),
    /// A null reference
    Null,
}

impl ConstantValue {
    /// Decode the value bytes of a `Constant` row with the given element type.
    ///
    /// # Errors
    /// Returns an error if the blob is too short or the element type cannot carry a constant.
    pub fn decode(element_type: u8, blob: &[u8]) -> Result<ConstantValue> {
        let mut parser = Parser::new(blob);
        Ok(match element_type {
            ELEMENT_TYPE::BOOLEAN => ConstantValue::Boolean(parser.read_le::<u8>()? != 0),
            ELEMENT_TYPE::CHAR => ConstantValue::Char(parser.read_le::<u16>()?),
            ELEMENT_TYPE::I1 => ConstantValue::I1(parser.read_le::<i8>()?),
            ELEMENT_TYPE::U1 => ConstantValue::U1(parser.read_le::<u8>()?),
            ELEMENT_TYPE::I2 => ConstantValue::I2(parser.read_le::<i16>()?),
            ELEMENT_TYPE::U2 => ConstantValue::U2(parser.read_le::<u16>()?),
            ELEMENT_TYPE::I4 => ConstantValue::I4(parser.read_le::<i32>()?),
            ELEMENT_TYPE::U4 => ConstantValue::U4(parser.read_le::<u32>()?),
            ELEMENT_TYPE::I8 => ConstantValue::I8(parser.read_le::<i64>()?),
            ELEMENT_TYPE::U8 => ConstantValue::U8(parser.read_le::<u64>()?),
            ELEMENT_TYPE::R4 => ConstantValue::R4(parser.read_le::<f32>()?),
            ELEMENT_TYPE::R8 => ConstantValue::R8(parser.read_le::<f64>()?),
            ELEMENT_TYPE::STRING => {
                if blob.len() % 2 != 0 {
                    return Err(malformed_error!(
                        "String constant has odd length {}",
                        blob.len()
                    ));
                }

                let units: Vec<u16> = blob
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                ConstantValue::String(U16Str::from_slice(&units).to_string_lossy())
            }
            ELEMENT_TYPE::CLASS => ConstantValue::Null,
            _ => {
                return Err(malformed_error!(
                    "Invalid constant element type - {}",
                    element_type
                ))
            }
        })
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Boolean(value) => write!(f, "{value}"),
            ConstantValue::Char(value) => match char::from_u32(u32::from(*value)) {
                Some(c) => write!(f, "'{c}'"),
                None => write!(f, "'\\u{value:04x}'"),
            },
            ConstantValue::I1(value) => write!(f, "{value}"),
            ConstantValue::U1(value) => write!(f, "{value}"),
            ConstantValue::I2(value) => write!(f, "{value}"),
            ConstantValue::U2(value) => write!(f, "{value}"),
            ConstantValue::I4(value) => write!(f, "{value}"),
            ConstantValue::U4(value) => write!(f, "{value}"),
            ConstantValue::I8(value) => write!(f, "{value}"),
            ConstantValue::U8(value) => write!(f, "{value}"),
            ConstantValue::R4(value) => write!(f, "{value}"),
            ConstantValue::R8(value) => write!(f, "{value}"),
            ConstantValue::String(value) => write!(f, "{value:?}"),
            ConstantValue::Null => f.write_str("null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives() {
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::I4, &(-42i32).to_le_bytes()).unwrap(),
            ConstantValue::I4(-42)
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::BOOLEAN, &[1]).unwrap(),
            ConstantValue::Boolean(true)
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::R8, &1.5f64.to_le_bytes()).unwrap(),
            ConstantValue::R8(1.5)
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::CLASS, &[0, 0, 0, 0]).unwrap(),
            ConstantValue::Null
        );
    }

    #[test]
    fn strings() {
        let value = ConstantValue::decode(ELEMENT_TYPE::STRING, &[b'h', 0, b'i', 0]).unwrap();
        assert_eq!(value, ConstantValue::String("hi".to_string()));
        assert_eq!(value.to_string(), "\"hi\"");
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::STRING, &[]).unwrap(),
            ConstantValue::String(String::new())
        );
        assert!(ConstantValue::decode(ELEMENT_TYPE::STRING, &[b'h']).is_err());
    }

    #[test]
    fn invalid() {
        assert!(ConstantValue::decode(ELEMENT_TYPE::I8, &[1, 2]).is_err());
        assert!(ConstantValue::decode(ELEMENT_TYPE::VALUETYPE, &[1]).is_err());
    }
}
