//! # cilgraph Prelude
//!
//! The most commonly used types and traits, for glob imports.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cilgraph operations
pub use crate::Error;

/// The result type used throughout cilgraph
pub use crate::Result;

/// Loader options and collected decoding faults
pub use crate::{Diagnostics, LoaderConfig};

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Opening an image
pub use crate::CilFile;

/// Low-level file parsing utilities
pub use crate::{File, Parser};

/// Metadata tokens
pub use crate::metadata::token::Token;

// ================================================================================================
// Entity Graph
// ================================================================================================

pub use crate::metadata::typesystem::{
    Assembly, AssemblyReference, ConstantValue, Event, Field, GenericContext, GenericParameter,
    Member, MemberReference, Method, MethodKind, MethodSpecification, Module, ModuleReference,
    Namespace, Parameter, Property, TypeDefinition, TypeKind, TypeReference,
};

// ================================================================================================
// Signatures and Attributes
// ================================================================================================

pub use crate::metadata::signatures::{MethodSignature, SignatureParameter, TypeProvider, TypeSig};

pub use crate::metadata::customattributes::{
    CustomAttribute, CustomAttributeValue, NamedArgument, TypedValue,
};

/// Assembly identity
pub use crate::metadata::identity::{AssemblyIdentity, AssemblyVersion, PublicKeyToken};

// ================================================================================================
// Documentation Ids and IL
// ================================================================================================

pub use crate::docid::DocumentationId;

pub use crate::disassembler::{FlowType, Instruction, InstructionDecoder, Operand};
