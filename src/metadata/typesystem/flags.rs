//! Attribute flag sets of the metadata tables (II.23.1).

use bitflags::bitflags;

bitflags! {
    /// `TypeAttributes` of a `TypeDef` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeAttributes: u32 {
        /// Mask for the visibility bits
        const VISIBILITY_MASK = 0x0000_0007;
        /// Visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Nested, public
        const NESTED_PUBLIC = 0x0000_0002;
        /// Nested, private
        const NESTED_PRIVATE = 0x0000_0003;
        /// Nested, family
        const NESTED_FAMILY = 0x0000_0004;
        /// Nested, assembly
        const NESTED_ASSEMBLY = 0x0000_0005;
        /// Nested, family and assembly
        const NESTED_FAM_AND_ASSEM = 0x0000_0006;
        /// Nested, family or assembly
        const NESTED_FAM_OR_ASSEM = 0x0000_0007;
        /// Sequential field layout
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        /// Explicit field layout
        const EXPLICIT_LAYOUT = 0x0000_0010;
        /// Interface
        const INTERFACE = 0x0000_0020;
        /// Abstract
        const ABSTRACT = 0x0000_0080;
        /// Sealed
        const SEALED = 0x0000_0100;
        /// Name is special
        const SPECIAL_NAME = 0x0000_0400;
        /// Imported from a type library
        const IMPORT = 0x0000_1000;
        /// Serializable
        const SERIALIZABLE = 0x0000_2000;
        /// Windows runtime type
        const WINDOWS_RUNTIME = 0x0000_4000;
        /// Unicode string marshalling
        const UNICODE_CLASS = 0x0001_0000;
        /// Automatic string marshalling
        const AUTO_CLASS = 0x0002_0000;
        /// Static initializer may run before first static field access
        const BEFORE_FIELD_INIT = 0x0010_0000;
        /// Runtime checks the name
        const RT_SPECIAL_NAME = 0x0000_0800;
        /// Has security declarations
        const HAS_SECURITY = 0x0004_0000;
    }
}

bitflags! {
    /// `FieldAttributes` of a `Field` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldAttributes: u16 {
        /// Mask for the accessibility bits
        const FIELD_ACCESS_MASK = 0x0007;
        /// Private
        const PRIVATE = 0x0001;
        /// Family and assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Assembly
        const ASSEMBLY = 0x0003;
        /// Family
        const FAMILY = 0x0004;
        /// Family or assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Public
        const PUBLIC = 0x0006;
        /// Static
        const STATIC = 0x0010;
        /// Only assignable in a constructor
        const INIT_ONLY = 0x0020;
        /// Compile-time constant
        const LITERAL = 0x0040;
        /// Not serialized
        const NOT_SERIALIZED = 0x0080;
        /// Name is special
        const SPECIAL_NAME = 0x0200;
        /// Implemented through P/Invoke
        const PINVOKE_IMPL = 0x2000;
        /// Runtime checks the name
        const RT_SPECIAL_NAME = 0x0400;
        /// Has marshalling information
        const HAS_FIELD_MARSHAL = 0x1000;
        /// Has a default value
        const HAS_DEFAULT = 0x8000;
        /// Has an RVA
        const HAS_FIELD_RVA = 0x0100;
    }
}

bitflags! {
    /// `MethodAttributes` of a `MethodDef` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodAttributes: u16 {
        /// Mask for the accessibility bits
        const MEMBER_ACCESS_MASK = 0x0007;
        /// Private
        const PRIVATE = 0x0001;
        /// Family and assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Assembly
        const ASSEMBLY = 0x0003;
        /// Family
        const FAMILY = 0x0004;
        /// Family or assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Public
        const PUBLIC = 0x0006;
        /// Static
        const STATIC = 0x0010;
        /// Cannot be overridden
        const FINAL = 0x0020;
        /// Virtual
        const VIRTUAL = 0x0040;
        /// Hidden by name and signature
        const HIDE_BY_SIG = 0x0080;
        /// Always gets a new vtable slot
        const NEW_SLOT = 0x0100;
        /// Overridable only where accessible
        const STRICT = 0x0200;
        /// Abstract
        const ABSTRACT = 0x0400;
        /// Name is special
        const SPECIAL_NAME = 0x0800;
        /// Runtime checks the name
        const RT_SPECIAL_NAME = 0x1000;
        /// Implemented through P/Invoke
        const PINVOKE_IMPL = 0x2000;
        /// Has security declarations
        const HAS_SECURITY = 0x4000;
        /// Calls a method with security declarations
        const REQUIRE_SEC_OBJECT = 0x8000;
    }
}

bitflags! {
    /// `MethodImplAttributes` of a `MethodDef` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodImplAttributes: u16 {
        /// Mask for the code type bits
        const CODE_TYPE_MASK = 0x0003;
        /// Native code
        const NATIVE = 0x0001;
        /// Optimized IL
        const OPTIL = 0x0002;
        /// Provided by the runtime
        const RUNTIME = 0x0003;
        /// Unmanaged
        const UNMANAGED = 0x0004;
        /// Must not be inlined
        const NO_INLINING = 0x0008;
        /// Declared but implemented elsewhere
        const FORWARD_REF = 0x0010;
        /// Single-threaded through the body
        const SYNCHRONIZED = 0x0020;
        /// Must not be optimized
        const NO_OPTIMIZATION = 0x0040;
        /// Signature is exported as declared
        const PRESERVE_SIG = 0x0080;
        /// Should be inlined aggressively
        const AGGRESSIVE_INLINING = 0x0100;
        /// Internal call
        const INTERNAL_CALL = 0x1000;
    }
}

bitflags! {
    /// `ParamAttributes` of a `Param` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ParamAttributes: u16 {
        /// Input parameter
        const IN = 0x0001;
        /// Output parameter
        const OUT = 0x0002;
        /// Optional parameter
        const OPTIONAL = 0x0010;
        /// Has a default value
        const HAS_DEFAULT = 0x1000;
        /// Has marshalling information
        const HAS_FIELD_MARSHAL = 0x2000;
    }
}

bitflags! {
    /// `PropertyAttributes` of a `Property` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyAttributes: u16 {
        /// Name is special
        const SPECIAL_NAME = 0x0200;
        /// Runtime checks the name
        const RT_SPECIAL_NAME = 0x0400;
        /// Has a default value
        const HAS_DEFAULT = 0x1000;
    }
}

bitflags! {
    /// `EventAttributes` of an `Event` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventAttributes: u16 {
        /// Name is special
        const SPECIAL_NAME = 0x0200;
        /// Runtime checks the name
        const RT_SPECIAL_NAME = 0x0400;
    }
}

bitflags! {
    /// `MethodSemanticsAttributes` of a `MethodSemantics` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodSemanticsAttributes: u16 {
        /// Property setter
        const SETTER = 0x0001;
        /// Property getter
        const GETTER = 0x0002;
        /// Other accessor
        const OTHER = 0x0004;
        /// Event adder
        const ADD_ON = 0x0008;
        /// Event remover
        const REMOVE_ON = 0x0010;
        /// Event raiser
        const FIRE = 0x0020;
    }
}

bitflags! {
    /// `GenericParamAttributes` of a `GenericParam` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GenericParamAttributes: u16 {
        /// Mask for the variance bits
        const VARIANCE_MASK = 0x0003;
        /// Covariant
        const COVARIANT = 0x0001;
        /// Contravariant
        const CONTRAVARIANT = 0x0002;
        /// Must be a reference type
        const REFERENCE_TYPE_CONSTRAINT = 0x0004;
        /// Must be a non-nullable value type
        const NOT_NULLABLE_VALUE_TYPE_CONSTRAINT = 0x0008;
        /// Must have a default constructor
        const DEFAULT_CONSTRUCTOR_CONSTRAINT = 0x0010;
        /// May be a by-ref-like type
        const ALLOW_BY_REF_LIKE = 0x0020;
    }
}

bitflags! {
    /// `AssemblyFlags` of an `Assembly` or `AssemblyRef` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AssemblyFlags: u32 {
        /// The blob holds the full public key rather than its token
        const PUBLIC_KEY = 0x0001;
        /// May be retargeted to another implementation
        const RETARGETABLE = 0x0100;
        /// Windows runtime content
        const WINDOWS_RUNTIME = 0x0200;
        /// JIT tracking is disabled
        const DISABLE_JIT_COMPILE_OPTIMIZER = 0x4000;
        /// JIT tracking is enabled
        const ENABLE_JIT_COMPILE_TRACKING = 0x8000;
    }
}

/// Declared accessibility of a type or member, ordered from least to most accessible
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Accessibility {
    /// Not referenceable
    CompilerControlled,
    /// Declaring type only
    Private,
    /// Derived types within the assembly
    FamilyAndAssembly,
    /// Within the assembly
    Assembly,
    /// Derived types
    Family,
    /// Derived types or within the assembly
    FamilyOrAssembly,
    /// Everywhere
    Public,
}

impl Accessibility {
    /// Accessibility from the three member access bits shared by fields and methods
    #[must_use]
    pub fn from_member_access(bits: u16) -> Self {
        match bits & 0x7 {
            1 => Accessibility::Private,
            2 => Accessibility::FamilyAndAssembly,
            3 => Accessibility::Assembly,
            4 => Accessibility::Family,
            5 => Accessibility::FamilyOrAssembly,
            6 => Accessibility::Public,
            _ => Accessibility::CompilerControlled,
        }
    }

    /// Accessibility from type visibility bits
    #[must_use]
    pub fn from_type_visibility(flags: TypeAttributes) -> Self {
        match (flags & TypeAttributes::VISIBILITY_MASK).bits() {
            1 | 2 => Accessibility::Public,
            3 => Accessibility::Private,
            4 => Accessibility::Family,
            6 => Accessibility::FamilyAndAssembly,
            7 => Accessibility::FamilyOrAssembly,
            _ => Accessibility::Assembly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessibility() {
        assert_eq!(Accessibility::from_member_access(0x0086), Accessibility::Public);
        assert_eq!(Accessibility::from_member_access(0x0001), Accessibility::Private);
        assert_eq!(Accessibility::from_member_access(0x0000), Accessibility::CompilerControlled);

        let nested_private = TypeAttributes::from_bits_retain(0x0010_0003);
        assert_eq!(Accessibility::from_type_visibility(nested_private), Accessibility::Private);
        assert_eq!(
            Accessibility::from_type_visibility(TypeAttributes::from_bits_retain(0)),
            Accessibility::Assembly
        );
    }
}
