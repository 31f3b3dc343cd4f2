//! Decoded signature shapes.
//!
//! [`TypeSig`] is the recursive type representation produced by the signature parser. Custom
//! modifiers and by-reference markers stay inline as [`TypeSig::Modified`] and
//! [`TypeSig::ByRef`] layers; [`crate::metadata::signatures::consume`] splits them off into a
//! [`SignatureParameter`] and [`crate::metadata::signatures::combine`] puts them back.

use std::{fmt, sync::Arc};

use crate::{
    metadata::typesystem::{EntityRef, GenericParameter, TypeDefinition, TypeReference},
    Result,
};

#[allow(non_snake_case, dead_code, missing_docs)]
/// Element type bytes of II.23.1.16
pub mod ELEMENT_TYPE {
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDef or TypeRef token
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDef or TypeRef token
    pub const CLASS: u8 = 0x12;
    // Generic parameter of a type, followed by its number
    pub const VAR: u8 = 0x13;
    // type rank boundsCount bound1 … loCount lo1 …
    pub const ARRAY: u8 = 0x14;
    // Followed by type type-arg-count type-1 ... type-n
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    pub const I: u8 = 0x18;
    pub const U: u8 = 0x19;
    // Followed by full method signature
    pub const FNPTR: u8 = 0x1b;
    pub const OBJECT: u8 = 0x1c;
    // Single-dim array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    // Generic parameter of a method, followed by its number
    pub const MVAR: u8 = 0x1e;
    // Required modifier, followed by a TypeDef or TypeRef token
    pub const CMOD_REQD: u8 = 0x1f;
    // Optional modifier, followed by a TypeDef or TypeRef token
    pub const CMOD_OPT: u8 = 0x20;
    pub const INTERNAL: u8 = 0x21;
    pub const MODIFIER: u8 = 0x40;
    // Separates fixed from variable arguments at a vararg call site
    pub const SENTINEL: u8 = 0x41;
    pub const PINNED: u8 = 0x45;
    // Only in custom attribute blobs
    pub const TYPE: u8 = 0x50;
    pub const BOXED: u8 = 0x51;
    pub const FIELD: u8 = 0x53;
    pub const PROPERTY: u8 = 0x54;
    pub const ENUM: u8 = 0x55;
}

/// The `System` type a primitive element type stands for
#[must_use]
pub fn primitive_name(element_type: u8) -> Option<&'static str> {
    Some(match element_type {
        ELEMENT_TYPE::VOID => "Void",
        ELEMENT_TYPE::BOOLEAN => "Boolean",
        ELEMENT_TYPE::CHAR => "Char",
        ELEMENT_TYPE::I1 => "SByte",
        ELEMENT_TYPE::U1 => "Byte",
        ELEMENT_TYPE::I2 => "Int16",
        ELEMENT_TYPE::U2 => "UInt16",
        ELEMENT_TYPE::I4 => "Int32",
        ELEMENT_TYPE::U4 => "UInt32",
        ELEMENT_TYPE::I8 => "Int64",
        ELEMENT_TYPE::U8 => "UInt64",
        ELEMENT_TYPE::R4 => "Single",
        ELEMENT_TYPE::R8 => "Double",
        ELEMENT_TYPE::STRING => "String",
        ELEMENT_TYPE::TYPEDBYREF => "TypedReference",
        ELEMENT_TYPE::I => "IntPtr",
        ELEMENT_TYPE::U => "UIntPtr",
        ELEMENT_TYPE::OBJECT => "Object",
        _ => return None,
    })
}

/// The primitive element type named by `System.<name>`, the inverse of [`primitive_name`]
#[must_use]
pub fn primitive_element_type(namespace: &str, name: &str) -> Option<u8> {
    if namespace != "System" {
        return None;
    }

    (ELEMENT_TYPE::VOID..=ELEMENT_TYPE::OBJECT).find(|et| primitive_name(*et) == Some(name))
}

/// A reference to a named type: a definition in this module, or a reference resolved
/// through a scope (possibly synthesized from a name)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamedTypeRef {
    /// A `TypeDef` row
    Definition(EntityRef<TypeDefinition>),
    /// A `TypeRef` row, or a name-interned synthesized reference
    Reference(EntityRef<TypeReference>),
}

impl NamedTypeRef {
    /// Reference a definition
    #[must_use]
    pub fn definition(entity: &Arc<TypeDefinition>) -> Self {
        NamedTypeRef::Definition(EntityRef::new(entity))
    }

    /// Reference a type reference
    #[must_use]
    pub fn reference(entity: &Arc<TypeReference>) -> Self {
        NamedTypeRef::Reference(EntityRef::new(entity))
    }

    /// Namespace of the outermost enclosing type
    ///
    /// # Errors
    /// Returns [`crate::Error::Disposed`] if the referenced entity is gone.
    pub fn namespace(&self) -> Result<String> {
        match self {
            NamedTypeRef::Definition(def) => def.upgrade()?.outermost_namespace(),
            NamedTypeRef::Reference(reference) => {
                Ok(reference.upgrade()?.outermost_namespace().to_string())
            }
        }
    }

    /// Simple name, including any generic arity suffix
    ///
    /// # Errors
    /// Returns [`crate::Error::Disposed`] if the referenced entity is gone.
    pub fn name(&self) -> Result<String> {
        match self {
            NamedTypeRef::Definition(def) => Ok(def.upgrade()?.name().to_string()),
            NamedTypeRef::Reference(reference) => Ok(reference.upgrade()?.name().to_string()),
        }
    }

    /// `Namespace.Outer.Inner`
    ///
    /// # Errors
    /// Returns [`crate::Error::Disposed`] if the referenced entity is gone.
    pub fn full_name(&self) -> Result<String> {
        match self {
            NamedTypeRef::Definition(def) => def.upgrade()?.full_name(),
            NamedTypeRef::Reference(reference) => Ok(reference.upgrade()?.full_name()),
        }
    }

    /// True if this names `System.<name>` for a primitive element type
    #[must_use]
    pub fn primitive(&self) -> Option<u8> {
        let namespace = self.namespace().ok()?;
        primitive_element_type(&namespace, &self.name().ok()?)
    }

    /// The definition, if this references one directly
    ///
    /// # Errors
    /// Returns [`crate::Error::Disposed`] if the referenced entity is gone.
    pub fn as_definition(&self) -> Result<Option<Arc<TypeDefinition>>> {
        match self {
            NamedTypeRef::Definition(def) => Ok(Some(def.upgrade()?)),
            NamedTypeRef::Reference(_) => Ok(None),
        }
    }

    /// The definition this names within its own module: either the definition itself, or the
    /// definition a module-scoped reference points at
    ///
    /// # Errors
    /// Returns [`crate::Error::Disposed`] if the referenced entity or its module is gone.
    pub fn local_definition(&self) -> Result<Option<Arc<TypeDefinition>>> {
        match self {
            NamedTypeRef::Definition(def) => Ok(Some(def.upgrade()?)),
            NamedTypeRef::Reference(reference) => reference.upgrade()?.local_definition(),
        }
    }
}

impl fmt::Display for NamedTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.full_name() {
            Ok(name) => f.write_str(&name),
            Err(_) => f.write_str("<disposed>"),
        }
    }
}

/// A required (`modreq`) or optional (`modopt`) custom modifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomModifier {
    /// The modifier type
    pub modifier: NamedTypeRef,
    /// True for `modreq`
    pub required: bool,
}

/// Whether a generic parameter belongs to a type or a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericParameterKind {
    /// `!n`, declared by a type
    Type,
    /// `!!n`, declared by a method
    Method,
}

/// Rank, sizes and lower bounds of a general array
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ArrayShape {
    /// Number of dimensions
    pub rank: u32,
    /// Known sizes, leading dimensions first
    pub sizes: Vec<u32>,
    /// Known lower bounds, leading dimensions first
    pub lower_bounds: Vec<i32>,
}

/// A decoded type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSig {
    /// A named type, including primitives as their `System` types
    Named(NamedTypeRef),
    /// A constructed generic type
    GenericInstance {
        /// The generic type definition
        definition: NamedTypeRef,
        /// Type arguments for every generic parameter of the definition, enclosing types'
        /// parameters first
        arguments: Vec<TypeSig>,
    },
    /// A single-dimensional zero-based vector (no shape) or a general array
    Array {
        /// Element type
        element: Box<TypeSig>,
        /// Shape of a general array, `None` for a vector
        shape: Option<ArrayShape>,
    },
    /// An unmanaged pointer
    Pointer(Box<TypeSig>),
    /// A managed reference
    ByRef(Box<TypeSig>),
    /// A function pointer
    FunctionPointer(Box<MethodSignature>),
    /// A type carrying one custom modifier
    Modified {
        /// The modifier
        modifier: CustomModifier,
        /// The modified type
        inner: Box<TypeSig>,
    },
    /// A pinned local
    Pinned(Box<TypeSig>),
    /// A reference to a generic parameter by position
    GenericParameter {
        /// Type or method parameter
        kind: GenericParameterKind,
        /// Position in the declaring entity's metadata parameter list
        index: u32,
        /// The parameter, when the decoding context could provide it
        parameter: Option<EntityRef<GenericParameter>>,
    },
}

impl TypeSig {
    /// The named type at the root of a named or generic instance type
    #[must_use]
    pub fn named(&self) -> Option<&NamedTypeRef> {
        match self {
            TypeSig::Named(named) => Some(named),
            TypeSig::GenericInstance { definition, .. } => Some(definition),
            _ => None,
        }
    }

    /// The primitive element type this stands for, if any
    #[must_use]
    pub fn primitive(&self) -> Option<u8> {
        match self {
            TypeSig::Named(named) => named.primitive(),
            _ => None,
        }
    }

    /// True for a one-dimensional zero-based vector
    #[must_use]
    pub fn is_vector(&self) -> bool {
        matches!(self, TypeSig::Array { shape: None, .. })
    }

    /// Replace generic parameter references with the given arguments. References without a
    /// matching argument are kept.
    #[must_use]
    pub fn substitute(&self, type_arguments: &[TypeSig], method_arguments: &[TypeSig]) -> TypeSig {
        let recurse = |ty: &TypeSig| Box::new(ty.substitute(type_arguments, method_arguments));
        match self {
            TypeSig::Named(_) => self.clone(),
            TypeSig::GenericInstance {
                definition,
                arguments,
            } => TypeSig::GenericInstance {
                definition: definition.clone(),
                arguments: arguments
                    .iter()
                    .map(|arg| arg.substitute(type_arguments, method_arguments))
                    .collect(),
            },
            TypeSig::Array { element, shape } => TypeSig::Array {
                element: recurse(element),
                shape: shape.clone(),
            },
            TypeSig::Pointer(inner) => TypeSig::Pointer(recurse(inner)),
            TypeSig::ByRef(inner) => TypeSig::ByRef(recurse(inner)),
            TypeSig::Pinned(inner) => TypeSig::Pinned(recurse(inner)),
            TypeSig::FunctionPointer(signature) => TypeSig::FunctionPointer(Box::new(
                signature.substitute(type_arguments, method_arguments),
            )),
            TypeSig::Modified { modifier, inner } => TypeSig::Modified {
                modifier: modifier.clone(),
                inner: recurse(inner),
            },
            TypeSig::GenericParameter { kind, index, .. } => {
                let arguments = match kind {
                    GenericParameterKind::Type => type_arguments,
                    GenericParameterKind::Method => method_arguments,
                };
                arguments
                    .get(*index as usize)
                    .cloned()
                    .unwrap_or_else(|| self.clone())
            }
        }
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSig::Named(named) => write!(f, "{named}"),
            TypeSig::GenericInstance {
                definition,
                arguments,
            } => {
                write!(f, "{definition}<")?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                f.write_str(">")
            }
            TypeSig::Array { element, shape } => match shape {
                None => write!(f, "{element}[]"),
                Some(shape) => {
                    let commas = ",".repeat(shape.rank.saturating_sub(1) as usize);
                    write!(f, "{element}[{commas}]")
                }
            },
            TypeSig::Pointer(inner) => write!(f, "{inner}*"),
            TypeSig::ByRef(inner) => write!(f, "{inner}&"),
            TypeSig::Pinned(inner) => write!(f, "{inner} pinned"),
            TypeSig::FunctionPointer(signature) => {
                write!(f, "method {} *(", signature.return_parameter.ty)?;
                for (i, parameter) in signature.parameters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", parameter.ty)?;
                }
                f.write_str(")")
            }
            TypeSig::Modified { modifier, inner } => {
                let keyword = if modifier.required { "modreq" } else { "modopt" };
                write!(f, "{inner} {keyword}({})", modifier.modifier)
            }
            TypeSig::GenericParameter {
                kind,
                index,
                parameter,
            } => {
                if let Some(name) = parameter
                    .as_ref()
                    .and_then(|p| p.upgrade().ok())
                    .map(|p| p.name().to_string())
                {
                    return f.write_str(&name);
                }
                match kind {
                    GenericParameterKind::Type => write!(f, "!{index}"),
                    GenericParameterKind::Method => write!(f, "!!{index}"),
                }
            }
        }
    }
}

/// One position of a signature: the raw type with its by-ref marker and custom modifiers
/// split off
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureParameter {
    /// The type without modifiers or by-ref marker
    pub ty: TypeSig,
    /// True if the position is passed by reference
    pub by_ref: bool,
    /// Modifiers applying to the type itself
    pub modifiers: Vec<CustomModifier>,
    /// Modifiers applying to the reference, only present when `by_ref` is set
    pub ref_modifiers: Vec<CustomModifier>,
}

impl SignatureParameter {
    /// A plain position without modifiers
    #[must_use]
    pub fn plain(ty: TypeSig) -> Self {
        SignatureParameter {
            ty,
            by_ref: false,
            modifiers: Vec::new(),
            ref_modifiers: Vec::new(),
        }
    }

    /// True if a modifier named `namespace.name` is present on the type or the reference
    #[must_use]
    pub fn has_modifier(&self, namespace: &str, name: &str, required: bool) -> bool {
        self.modifiers
            .iter()
            .chain(self.ref_modifiers.iter())
            .any(|m| {
                m.required == required
                    && m.modifier.name().is_ok_and(|n| n == name)
                    && m.modifier.namespace().is_ok_and(|ns| ns == namespace)
            })
    }
}

/// Calling convention kind, the low nibble of the signature header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallingConvention {
    /// Managed default
    Default,
    /// Unmanaged cdecl
    C,
    /// Unmanaged stdcall
    StdCall,
    /// Unmanaged thiscall
    ThisCall,
    /// Unmanaged fastcall
    FastCall,
    /// Managed with variable arguments
    VarArg,
    /// Unmanaged, convention given by modifiers
    Unmanaged,
}

impl CallingConvention {
    pub(crate) fn from_header(header: u8) -> Option<Self> {
        Some(match header & 0x0F {
            0x0 => CallingConvention::Default,
            0x1 => CallingConvention::C,
            0x2 => CallingConvention::StdCall,
            0x3 => CallingConvention::ThisCall,
            0x4 => CallingConvention::FastCall,
            0x5 => CallingConvention::VarArg,
            0x9 => CallingConvention::Unmanaged,
            _ => return None,
        })
    }
}

/// A method, call site or function pointer signature
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
    /// Calling convention kind
    pub calling_convention: CallingConvention,
    /// Instance method
    pub has_this: bool,
    /// The `this` pointer is the first explicit parameter
    pub explicit_this: bool,
    /// Number of method generic parameters
    pub generic_parameter_count: u32,
    /// Number of parameters before the vararg sentinel
    pub required_parameter_count: usize,
    /// The return position
    pub return_parameter: SignatureParameter,
    /// All parameters; those past `required_parameter_count` are variable arguments
    pub parameters: Vec<SignatureParameter>,
}

impl MethodSignature {
    /// True for a vararg convention
    #[must_use]
    pub fn is_vararg(&self) -> bool {
        self.calling_convention == CallingConvention::VarArg
    }

    /// The parameters before the vararg sentinel
    #[must_use]
    pub fn fixed_parameters(&self) -> &[SignatureParameter] {
        &self.parameters[..self.required_parameter_count.min(self.parameters.len())]
    }

    /// Substitute generic arguments in every position
    #[must_use]
    pub fn substitute(&self, type_arguments: &[TypeSig], method_arguments: &[TypeSig]) -> Self {
        let map = |p: &SignatureParameter| SignatureParameter {
            ty: p.ty.substitute(type_arguments, method_arguments),
            ..p.clone()
        };

        MethodSignature {
            return_parameter: map(&self.return_parameter),
            parameters: self.parameters.iter().map(map).collect(),
            ..self.clone()
        }
    }
}

/// A property signature
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySignature {
    /// Instance property
    pub has_this: bool,
    /// The property type
    pub property_type: SignatureParameter,
    /// Indexer parameters
    pub parameters: Vec<SignatureParameter>,
}

/// One local variable slot
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariable {
    /// The slot's type
    pub parameter: SignatureParameter,
    /// True if the slot pins its referent
    pub pinned: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_names() {
        assert_eq!(primitive_name(ELEMENT_TYPE::I4), Some("Int32"));
        assert_eq!(primitive_name(ELEMENT_TYPE::OBJECT), Some("Object"));
        assert_eq!(primitive_name(ELEMENT_TYPE::CLASS), None);
        assert_eq!(primitive_element_type("System", "UInt64"), Some(ELEMENT_TYPE::U8));
        assert_eq!(primitive_element_type("System", "Guid"), None);
        assert_eq!(primitive_element_type("Other", "Int32"), None);
    }

    #[test]
    fn calling_conventions() {
        assert_eq!(CallingConvention::from_header(0x20), Some(CallingConvention::Default));
        assert_eq!(CallingConvention::from_header(0x05), Some(CallingConvention::VarArg));
        assert_eq!(CallingConvention::from_header(0x07), None);
    }

    #[test]
    fn substitution() {
        let var = |kind, index| TypeSig::GenericParameter {
            kind,
            index,
            parameter: None,
        };
        let ty = TypeSig::Array {
            element: Box::new(TypeSig::Pointer(Box::new(var(GenericParameterKind::Method, 0)))),
            shape: None,
        };
        let argument = var(GenericParameterKind::Type, 7);

        let substituted = ty.substitute(&[], &[argument.clone()]);
        assert_eq!(
            substituted,
            TypeSig::Array {
                element: Box::new(TypeSig::Pointer(Box::new(argument))),
                shape: None,
            }
        );
        assert_eq!(ty.substitute(&[], &[]), ty);
        assert_eq!(format!("{}", ty), "!!0*[]");
    }
}
