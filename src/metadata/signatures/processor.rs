//! Splitting and rebuilding the modifier and by-ref layers of a signature position.

use crate::metadata::signatures::{CustomModifier, SignatureParameter, TypeSig};

fn strip_modifiers(mut ty: TypeSig) -> (Vec<CustomModifier>, TypeSig) {
    let mut modifiers = Vec::new();
    while let TypeSig::Modified { modifier, inner } = ty {
        modifiers.push(modifier);
        ty = *inner;
    }
    (modifiers, ty)
}

fn wrap_modifiers(mut ty: TypeSig, modifiers: &[CustomModifier]) -> TypeSig {
    for modifier in modifiers.iter().rev() {
        ty = TypeSig::Modified {
            modifier: modifier.clone(),
            inner: Box::new(ty),
        };
    }
    ty
}

/// Split a signature position into its raw type, by-ref marker and the two modifier lists.
///
/// Modifiers in front of a by-ref marker apply to the reference and land in
/// `ref_modifiers`; those after it (or all of them, for a position that is not by-ref) apply
/// to the type and land in `modifiers`. Both lists keep their outermost-first order.
#[must_use]
pub fn consume(ty: TypeSig) -> SignatureParameter {
    let (outer, rest) = strip_modifiers(ty);

    match rest {
        TypeSig::ByRef(element) => {
            let (modifiers, raw) = strip_modifiers(*element);
            SignatureParameter {
                ty: raw,
                by_ref: true,
                modifiers,
                ref_modifiers: outer,
            }
        }
        raw => SignatureParameter {
            ty: raw,
            by_ref: false,
            modifiers: outer,
            ref_modifiers: Vec::new(),
        },
    }
}

/// Rebuild the wrapped form of a position; `combine(&consume(ty)) == ty` for every `ty`.
#[must_use]
pub fn combine(parameter: &SignatureParameter) -> TypeSig {
    let ty = wrap_modifiers(parameter.ty.clone(), &parameter.modifiers);
    if parameter.by_ref {
        wrap_modifiers(TypeSig::ByRef(Box::new(ty)), &parameter.ref_modifiers)
    } else {
        ty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::signatures::{GenericParameterKind, NamedTypeRef, SyntheticTypeProvider};

    fn modifier(provider: &SyntheticTypeProvider, name: &str, required: bool) -> CustomModifier {
        CustomModifier {
            modifier: NamedTypeRef::reference(
                &provider.named("System.Runtime.CompilerServices", name),
            ),
            required,
        }
    }

    fn wrap(ty: TypeSig, modifiers: &[CustomModifier]) -> TypeSig {
        modifiers.iter().rev().fold(ty, |inner, m| TypeSig::Modified {
            modifier: m.clone(),
            inner: Box::new(inner),
        })
    }

    #[test]
    fn round_trip_all_chain_lengths() {
        let raw = TypeSig::GenericParameter {
            kind: GenericParameterKind::Type,
            index: 0,
            parameter: None,
        };
        let provider = SyntheticTypeProvider::new();
        let pool: Vec<_> = ["IsConst", "IsVolatile", "IsLong", "InAttribute"]
            .iter()
            .enumerate()
            .map(|(i, name)| modifier(&provider, name, i % 2 == 0))
            .collect();

        for outer in 0..=pool.len() {
            for inner in 0..=pool.len() {
                for by_ref in [false, true] {
                    let ty = if by_ref {
                        wrap(
                            TypeSig::ByRef(Box::new(wrap(raw.clone(), &pool[..inner]))),
                            &pool[..outer],
                        )
                    } else {
                        if inner > 0 {
                            continue;
                        }
                        wrap(raw.clone(), &pool[..outer])
                    };

                    let consumed = consume(ty.clone());
                    assert_eq!(consumed.by_ref, by_ref);
                    assert_eq!(consumed.ty, raw);
                    if by_ref {
                        assert_eq!(consumed.ref_modifiers, pool[..outer].to_vec());
                        assert_eq!(consumed.modifiers, pool[..inner].to_vec());
                    } else {
                        assert_eq!(consumed.modifiers, pool[..outer].to_vec());
                        assert!(consumed.ref_modifiers.is_empty());
                    }
                    assert_eq!(combine(&consumed), ty);
                }
            }
        }
    }

    #[test]
    fn nested_by_ref_stays_in_raw_type() {
        let raw = TypeSig::ByRef(Box::new(TypeSig::Pointer(Box::new(TypeSig::GenericParameter {
            kind: GenericParameterKind::Method,
            index: 1,
            parameter: None,
        }))));
        let ty = TypeSig::ByRef(Box::new(raw.clone()));

        let consumed = consume(ty.clone());
        assert!(consumed.by_ref);
        assert_eq!(consumed.ty, raw);
        assert_eq!(combine(&consumed), ty);
    }
}
