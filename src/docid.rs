//! Documentation comment ids (`T:Namespace.Type`, `M:Type.Method(System.Int32)`, ...).
//!
//! Ids follow the format compilers write into XML documentation files, so they can be used
//! to join metadata with documentation. Member references and method specifications print
//! the id of the member they name: an id computed at a call site matches the id of the
//! declaration.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilgraph::{docid::DocumentationId, CilFile};
//!
//! let file = CilFile::from_file("tests/samples/sample.dll".as_ref())?.expect("managed image");
//! for ty in file.module().types()? {
//!     println!("{}", ty.documentation_id()?);
//!     for method in ty.methods()? {
//!         println!("  {}", method.documentation_id()?);
//!     }
//! }
//! # Ok::<(), cilgraph::Error>(())
//! ```

use std::fmt::Write;

use crate::{
    metadata::{
        signatures::{
            primitive_name, GenericParameterKind, MethodSignature, NamedTypeRef,
            SignatureParameter, TypeSig,
        },
        typesystem::{
            split_arguments_by_arity, strip_generic_arity, Event, Field, Member, MemberReference,
            MemberReferenceSignature, Method, MethodSpecification, Namespace, Property,
            TypeDefinition,
        },
    },
    Result,
};

/// Entities with a documentation comment id
pub trait DocumentationId {
    /// The id, prefix included.
    ///
    /// # Errors
    /// Returns an error if a name or signature the id is built from cannot be decoded.
    fn documentation_id(&self) -> Result<String>;
}

impl DocumentationId for Namespace {
    fn documentation_id(&self) -> Result<String> {
        Ok(format!("N:{}", self.full_name()))
    }
}

impl DocumentationId for TypeDefinition {
    fn documentation_id(&self) -> Result<String> {
        let mut id = String::from("T:");
        write_definition_path(self, &mut id)?;
        Ok(id)
    }
}

impl DocumentationId for Field {
    fn documentation_id(&self) -> Result<String> {
        let mut id = String::from("F:");
        write_declaring_type(self.declaring_type()?.as_deref(), &mut id)?;
        encode_name(self.name(), &mut id);
        Ok(id)
    }
}

impl DocumentationId for Event {
    fn documentation_id(&self) -> Result<String> {
        let mut id = String::from("E:");
        write_declaring_type(self.declaring_type()?.as_deref(), &mut id)?;
        encode_name(self.name(), &mut id);
        Ok(id)
    }
}

impl DocumentationId for Property {
    fn documentation_id(&self) -> Result<String> {
        let mut id = String::from("P:");
        write_declaring_type(self.declaring_type()?.as_deref(), &mut id)?;
        encode_name(self.name(), &mut id);
        write_parameters(&self.signature()?.parameters, false, &mut id)?;
        Ok(id)
    }
}

impl DocumentationId for Method {
    fn documentation_id(&self) -> Result<String> {
        let mut id = String::from("M:");
        write_declaring_type(self.declaring_type()?.as_deref(), &mut id)?;
        write_method_tail(self.name(), self.signature()?, &mut id)?;
        Ok(id)
    }
}

impl DocumentationId for MemberReference {
    fn documentation_id(&self) -> Result<String> {
        let mut id = String::new();
        match self.signature()? {
            MemberReferenceSignature::Method(signature) => {
                id.push_str("M:");
                write_reference_parent(self, &mut id)?;
                write_method_tail(self.name(), signature, &mut id)?;
            }
            MemberReferenceSignature::Field(_) => {
                id.push_str("F:");
                write_reference_parent(self, &mut id)?;
                encode_name(self.name(), &mut id);
            }
        }
        Ok(id)
    }
}

/// The declaring type of a reference as its declaration would print it: instantiations
/// print their generic definition
fn write_reference_parent(reference: &MemberReference, out: &mut String) -> Result<()> {
    match reference.parent_type()? {
        Some(TypeSig::Named(named) | TypeSig::GenericInstance { definition: named, .. }) => {
            write_named(named, None, out)?;
            out.push('.');
        }
        Some(other) => {
            write_type(other, out)?;
            out.push('.');
        }
        None => {}
    }
    Ok(())
}

impl DocumentationId for MethodSpecification {
    fn documentation_id(&self) -> Result<String> {
        self.method()?.documentation_id()
    }
}

impl DocumentationId for Member {
    fn documentation_id(&self) -> Result<String> {
        match self {
            Member::Field(field) => field.documentation_id(),
            Member::Method(method) => method.documentation_id(),
            Member::Property(property) => property.documentation_id(),
            Member::Event(event) => event.documentation_id(),
            Member::Reference(reference) => reference.documentation_id(),
            Member::Specification(specification) => specification.documentation_id(),
        }
    }
}

/// Copy a member name, replacing the characters the id format reserves
fn encode_name(name: &str, out: &mut String) {
    out.extend(name.chars().map(|c| match c {
        '.' => '#',
        '<' => '{',
        '>' => '}',
        ',' => '@',
        other => other,
    }));
}

fn write_declaring_type(declaring: Option<&TypeDefinition>, out: &mut String) -> Result<()> {
    if let Some(declaring) = declaring {
        write_definition_path(declaring, out)?;
        out.push('.');
    }
    Ok(())
}

fn write_definition_path(definition: &TypeDefinition, out: &mut String) -> Result<()> {
    let (namespace, levels) = definition_levels(definition)?;
    write_levels(&namespace, &levels, None, out)
}

/// One nesting level of a type name: the name without arity and the level's own arity
type Level = (String, u32);

fn definition_levels(definition: &TypeDefinition) -> Result<(String, Vec<Level>)> {
    let chain = definition.enclosing_chain()?;
    let mut levels = Vec::with_capacity(chain.len() + 1);
    for ty in chain.iter().rev().map(|ty| &**ty).chain(std::iter::once(definition)) {
        levels.push((
            strip_generic_arity(ty.name()).to_string(),
            u32::try_from(ty.generic_parameters()?.len()).unwrap_or(u32::MAX),
        ));
    }
    Ok((definition.outermost_namespace()?, levels))
}

fn named_levels(named: &NamedTypeRef) -> Result<(String, Vec<Level>)> {
    match named {
        NamedTypeRef::Definition(definition) => definition_levels(&*definition.upgrade()?),
        NamedTypeRef::Reference(reference) => {
            let reference = reference.upgrade()?;
            let mut levels = Vec::new();
            let mut current = Some(&reference);
            while let Some(level) = current {
                levels.push((
                    strip_generic_arity(level.name()).to_string(),
                    level.generic_arity(),
                ));
                current = level.enclosing();
            }
            levels.reverse();
            Ok((reference.outermost_namespace().to_string(), levels))
        }
    }
}

/// Print nesting levels. Without arguments each generic level prints its arity; with
/// arguments each level prints its own group of arguments.
fn write_levels(
    namespace: &str,
    levels: &[Level],
    arguments: Option<&[TypeSig]>,
    out: &mut String,
) -> Result<()> {
    if !namespace.is_empty() {
        out.push_str(namespace);
        out.push('.');
    }

    let arities: Vec<u32> = levels.iter().map(|(_, arity)| *arity).collect();
    let groups = arguments.map(|arguments| split_arguments_by_arity(&arities, arguments));

    for (i, (name, arity)) in levels.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        encode_name(name, out);

        match &groups {
            Some(groups) => {
                if let Some(group) = groups.get(i).filter(|group| !group.is_empty()) {
                    out.push('{');
                    write_list(group, out)?;
                    out.push('}');
                }
            }
            None if *arity > 0 => {
                let _ = write!(out, "`{arity}");
            }
            None => {}
        }
    }
    Ok(())
}

fn write_named(named: &NamedTypeRef, arguments: Option<&[TypeSig]>, out: &mut String) -> Result<()> {
    if let Some(name) = named.primitive().and_then(primitive_name) {
        out.push_str("System.");
        out.push_str(name);
        return Ok(());
    }

    let (namespace, levels) = named_levels(named)?;
    write_levels(&namespace, &levels, arguments, out)
}

fn write_list(types: &[TypeSig], out: &mut String) -> Result<()> {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_type(ty, out)?;
    }
    Ok(())
}

fn write_type(ty: &TypeSig, out: &mut String) -> Result<()> {
    match ty {
        TypeSig::Named(named) => write_named(named, None, out)?,
        TypeSig::GenericInstance {
            definition,
            arguments,
        } => write_named(definition, Some(arguments), out)?,
        TypeSig::Array { element, shape } => {
            write_type(element, out)?;
            match shape {
                None => out.push_str("[]"),
                Some(shape) => {
                    out.push('[');
                    for dimension in 0..shape.rank as usize {
                        if dimension > 0 {
                            out.push(',');
                        }
                        let lower = shape.lower_bounds.get(dimension).copied().unwrap_or(0);
                        let _ = write!(out, "{lower}:");
                        if let Some(size) = shape.sizes.get(dimension) {
                            let _ = write!(out, "{size}");
                        }
                    }
                    out.push(']');
                }
            }
        }
        TypeSig::Pointer(inner) => {
            write_type(inner, out)?;
            out.push('*');
        }
        TypeSig::ByRef(inner) => {
            write_type(inner, out)?;
            out.push('@');
        }
        TypeSig::Pinned(inner) => {
            write_type(inner, out)?;
            out.push('^');
        }
        TypeSig::Modified { modifier, inner } => {
            write_type(inner, out)?;
            out.push(if modifier.required { '!' } else { '|' });
            write_named(&modifier.modifier, None, out)?;
        }
        TypeSig::FunctionPointer(signature) => {
            out.push_str("function ");
            write_parameter(&signature.return_parameter, out)?;
            out.push_str(" (");
            for (i, parameter) in signature.parameters.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_parameter(parameter, out)?;
            }
            out.push(')');
        }
        TypeSig::GenericParameter { kind, index, .. } => {
            let _ = match kind {
                GenericParameterKind::Type => write!(out, "`{index}"),
                GenericParameterKind::Method => write!(out, "``{index}"),
            };
        }
    }
    Ok(())
}

/// A signature position: the type, its custom modifiers, then `@` when passed by reference
fn write_parameter(parameter: &SignatureParameter, out: &mut String) -> Result<()> {
    write_type(&parameter.ty, out)?;
    for modifier in &parameter.modifiers {
        out.push(if modifier.required { '!' } else { '|' });
        write_named(&modifier.modifier, None, out)?;
    }
    if parameter.by_ref {
        out.push('@');
    }
    Ok(())
}

fn write_parameters(parameters: &[SignatureParameter], vararg: bool, out: &mut String) -> Result<()> {
    if parameters.is_empty() {
        if vararg {
            out.push_str("()");
        }
        return Ok(());
    }

    out.push('(');
    for (i, parameter) in parameters.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_parameter(parameter, out)?;
    }
    if vararg {
        out.push(',');
    }
    out.push(')');
    Ok(())
}

fn write_method_tail(name: &str, signature: &MethodSignature, out: &mut String) -> Result<()> {
    encode_name(name, out);
    if signature.generic_parameter_count > 0 {
        let _ = write!(out, "``{}", signature.generic_parameter_count);
    }
    write_parameters(signature.fixed_parameters(), signature.is_vararg(), out)?;

    if name == "op_Implicit" || name == "op_Explicit" {
        out.push('~');
        write_parameter(&signature.return_parameter, out)?;
    }
    Ok(())
}
