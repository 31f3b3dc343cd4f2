//! The entity graph: modules, namespaces, types and members decoded on demand.
//!
//! A [`Module`] owns the reader of one image and interns every entity it hands out, one per
//! token. Entities start as little more than their row; names, signatures, attribute lists
//! and derived properties are computed the first time they are asked for and published once
//! through [`Lazy`].
//!
//! # Key Components
//!
//! - [`Module`]: Per-image entity arenas, lookups by token and the [`crate::metadata::signatures::TypeProvider`] seam
//! - [`TypeDefinition`] / [`TypeReference`]: Named types, defined here or referenced by scope
//! - [`Field`], [`Method`], [`Property`], [`Event`], [`Parameter`]: Members and their parts
//! - [`MemberReference`] / [`MethodSpecification`]: Member-like operands of IL instructions
//! - [`GenericContext`]: What `!n` and `!!n` mean at a given decoding site
//! - [`Namespace`]: The namespace tree of a module
//! - [`Assembly`], [`AssemblyReference`], [`ModuleReference`]: Identity and dependencies
//!
//! # Ownership
//!
//! Links towards the module (member to declaring type, attribute to parent, signature to
//! named type) are non-owning: `Weak<Module>` plus a token, or an [`EntityRef`]. Dropping the
//! last `Arc<Module>` releases the image; values already computed remain readable, and
//! anything still pending reports [`crate::Error::Disposed`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilgraph::CilFile;
//!
//! let file = CilFile::from_file("tests/samples/sample.dll".as_ref())?.expect("managed image");
//! for ty in file.module().types()? {
//!     println!("{} ({:?})", ty.full_name()?, ty.kind()?);
//!     for method in ty.methods()? {
//!         println!("  {} {:?}", method.name(), method.kind()?);
//!     }
//! }
//! # Ok::<(), cilgraph::Error>(())
//! ```

mod assembly;
mod constant;
mod entity;
mod flags;
mod generics;
pub(crate) mod index;
mod lazy;
mod members;
mod methods;
mod module;
mod namespace;
mod references;
pub(crate) mod traits;
mod types;

use std::sync::{Arc, Weak};

pub use assembly::{Assembly, AssemblyReference, ModuleReference};
pub use constant::ConstantValue;
pub use entity::EntityRef;
pub use flags::*;
pub use generics::{GenericContext, GenericParameter};
pub use lazy::Lazy;
pub use members::{Event, Field, Member, MemberList, Property};
pub use methods::{Method, MethodKind, MethodParameter, Parameter};
pub use module::Module;
pub use namespace::Namespace;
pub use references::{MemberReference, MemberReferenceSignature, MethodSpecification};
pub use traits::{FieldTraits, FixedBuffer, MethodTraits, PropertyTraits, RefKind, TypeTraits};
pub use types::{
    strip_generic_arity, ClassLayout, ResolutionScope, TypeDefinition, TypeKind, TypeReference,
};

pub(crate) use types::split_arguments_by_arity;

/// Upgrade an entity's link to its module.
///
/// # Errors
/// Returns [`crate::Error::Disposed`] if the module was dropped.
pub(crate) fn upgrade(module: &Weak<Module>) -> crate::Result<Arc<Module>> {
    module.upgrade().ok_or(crate::Error::Disposed)
}
