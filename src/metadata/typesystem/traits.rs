//! Attribute laundering.
//!
//! Compilers encode several language properties as zero-argument marker attributes or as
//! custom modifiers, because the table format has no column for them. Computing an entity's
//! traits recognizes those markers, turns them into plain fields, and flags the source
//! attribute as processed so the default attribute enumeration no longer shows it.

use std::sync::Arc;

use crate::metadata::{
    customattributes::{AttributeValue, CustomAttribute},
    signatures::{SignatureParameter, TypeSig},
    typesystem::ParamAttributes,
};

const COMPILER_SERVICES: &str = "System.Runtime.CompilerServices";
const INTEROP_SERVICES: &str = "System.Runtime.InteropServices";

/// How a by-reference position may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RefKind {
    /// Not by reference
    #[default]
    None,
    /// `ref`
    Ref,
    /// `in` parameter or `ref readonly` return and field
    In,
    /// `out` parameter
    Out,
}

/// A `fixed` buffer field's element type and length
#[derive(Debug, Clone, PartialEq)]
pub struct FixedBuffer {
    /// Element type of the buffer
    pub element_type: TypeSig,
    /// Number of elements
    pub length: i32,
}

/// Traits of a type definition derived from marker attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeTraits {
    /// `ref struct`
    pub is_ref_like: bool,
    /// `readonly struct`
    pub is_read_only: bool,
    /// Declares `required` members
    pub has_required_members: bool,
}

impl TypeTraits {
    pub(crate) fn launder(attributes: &[Arc<CustomAttribute>]) -> Self {
        TypeTraits {
            is_ref_like: take_marker(attributes, COMPILER_SERVICES, "IsByRefLikeAttribute"),
            is_read_only: take_marker(attributes, COMPILER_SERVICES, "IsReadOnlyAttribute"),
            has_required_members: take_marker(
                attributes,
                COMPILER_SERVICES,
                "RequiredMemberAttribute",
            ),
        }
    }
}

/// Traits of a field derived from its modifiers and marker attributes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldTraits {
    /// Carries the `IsVolatile` required modifier
    pub is_volatile: bool,
    /// `required` member
    pub is_required: bool,
    /// By-reference kind of a `ref` field
    pub ref_kind: RefKind,
    /// Element type and length of a `fixed` buffer
    pub fixed_buffer: Option<FixedBuffer>,
}

impl FieldTraits {
    pub(crate) fn launder(signature: &SignatureParameter, attributes: &[Arc<CustomAttribute>]) -> Self {
        let ref_kind = if !signature.by_ref {
            RefKind::None
        } else if take_marker(attributes, COMPILER_SERVICES, "IsReadOnlyAttribute") {
            RefKind::In
        } else {
            RefKind::Ref
        };

        FieldTraits {
            is_volatile: signature.has_modifier(COMPILER_SERVICES, "IsVolatile", true),
            is_required: take_marker(attributes, COMPILER_SERVICES, "RequiredMemberAttribute"),
            ref_kind,
            fixed_buffer: take_fixed_buffer(attributes),
        }
    }
}

/// Traits of a method derived from marker attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MethodTraits {
    /// `readonly` instance member of a struct
    pub is_read_only: bool,
}

impl MethodTraits {
    pub(crate) fn launder(attributes: &[Arc<CustomAttribute>]) -> Self {
        MethodTraits {
            is_read_only: take_marker(attributes, COMPILER_SERVICES, "IsReadOnlyAttribute"),
        }
    }
}

/// Traits of a property derived from marker attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyTraits {
    /// `required` member
    pub is_required: bool,
}

impl PropertyTraits {
    pub(crate) fn launder(attributes: &[Arc<CustomAttribute>]) -> Self {
        PropertyTraits {
            is_required: take_marker(attributes, COMPILER_SERVICES, "RequiredMemberAttribute"),
        }
    }
}

/// The by-ref kind and params-array flag of one parameter or return position
pub(crate) fn launder_parameter(
    signature: &SignatureParameter,
    flags: ParamAttributes,
    attributes: &[Arc<CustomAttribute>],
) -> (RefKind, bool) {
    let is_params_array = take_marker(attributes, "System", "ParamArrayAttribute");
    if !signature.by_ref {
        return (RefKind::None, is_params_array);
    }

    let in_modifier = signature
        .ref_modifiers
        .iter()
        .any(|m| m.required && names(&m.modifier, INTEROP_SERVICES, "InAttribute"));
    let read_only = take_marker(attributes, COMPILER_SERVICES, "IsReadOnlyAttribute");

    let ref_kind = if in_modifier || read_only {
        RefKind::In
    } else if flags.contains(ParamAttributes::OUT) && !flags.contains(ParamAttributes::IN) {
        RefKind::Out
    } else {
        RefKind::Ref
    };
    (ref_kind, is_params_array)
}

/// The attributes not yet translated into traits
pub(crate) fn unprocessed(attributes: &[Arc<CustomAttribute>]) -> Vec<Arc<CustomAttribute>> {
    attributes
        .iter()
        .filter(|attribute| !attribute.is_processed())
        .cloned()
        .collect()
}

fn names(
    named: &crate::metadata::signatures::NamedTypeRef,
    namespace: &str,
    name: &str,
) -> bool {
    named.name().is_ok_and(|n| n == name) && named.namespace().is_ok_and(|ns| ns == namespace)
}

fn is_marker(attribute: &CustomAttribute, namespace: &str, name: &str, arity: usize) -> bool {
    attribute
        .type_name()
        .is_ok_and(|(ns, n)| ns == namespace && n == name)
        && attribute
            .constructor_signature()
            .is_ok_and(|signature| signature.parameters.len() == arity)
}

/// Mark every zero-argument `namespace.name` attribute processed; true if there was one
fn take_marker(attributes: &[Arc<CustomAttribute>], namespace: &str, name: &str) -> bool {
    let mut found = false;
    for attribute in attributes {
        if is_marker(attribute, namespace, name, 0) {
            attribute.mark_processed();
            found = true;
        }
    }
    found
}

fn take_fixed_buffer(attributes: &[Arc<CustomAttribute>]) -> Option<FixedBuffer> {
    for attribute in attributes {
        if !is_marker(attribute, COMPILER_SERVICES, "FixedBufferAttribute", 2) {
            continue;
        }

        let Ok(value) = attribute.value() else {
            continue;
        };
        if let [element, length] = value.fixed_arguments.as_slice() {
            if let (AttributeValue::Type(Some(element_type)), AttributeValue::I4(length)) =
                (&element.value, &length.value)
            {
                attribute.mark_processed();
                return Some(FixedBuffer {
                    element_type: element_type.clone(),
                    length: *length,
                });
            }
        }
    }
    None
}
