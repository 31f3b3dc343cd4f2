// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # cilgraph
//!
//! A lazy, identity-preserving object graph over ECMA-335 (CLI) metadata.
//!
//! `cilgraph` opens a .NET image (a PE file with a CLI header, or a bare `BSJB` metadata
//! root) and exposes its modules, namespaces, types, members, signatures, custom attributes
//! and IL as a graph of shared entities. Nothing is decoded ahead of time: every name,
//! signature and attribute value is computed on first access and then cached, and asking for
//! the same token twice returns the same `Arc`.
//!
//! ## Features
//!
//! - **Lazy entities** - rows become entities on first access, derived data is computed once
//! - **Signatures with generic context** - `!n` and `!!n` resolve against the decoding site
//! - **Custom attributes** - fixed and named arguments, with enum widths of types in other
//!   assemblies inferred by trial and remembered per module
//! - **Documentation ids** - the `T:`, `M:`, `F:`, `P:`, `E:` and `N:` strings of XML docs
//! - **IL decoding** - forward-only instruction decoding with resolved operands
//! - **Assembly identity** - display names and public key tokens
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cilgraph::prelude::*;
//!
//! let Some(file) = CilFile::from_file("Library.dll".as_ref())? else {
//!     return Ok(());
//! };
//!
//! for ty in file.module().types()? {
//!     println!("{}", ty.documentation_id()?);
//!     for method in ty.methods()? {
//!         println!("  {}", method.documentation_id()?);
//!     }
//! }
//! # Ok::<(), cilgraph::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - the physical layer (root, heaps, tables) and the entity graph on top
//! - [`disassembler`] - opcode tables and the instruction decoder
//! - [`docid`] - documentation id rendering
//! - [`prelude`] - re-exports of the most used types
//!
//! ## Error Handling
//!
//! Fallible operations return [`Result`]. Two subsystems never fail their callers: custom
//! attribute values degrade to empty values and instruction decoding ends early, both
//! recording the fault in the image's [`Diagnostics`].
//!
//! ```rust,no_run
//! use cilgraph::{CilFile, Error};
//!
//! match CilFile::from_mem(std::fs::read("Library.dll")?) {
//!     Ok(Some(file)) => println!("{}", file.module().name()),
//!     Ok(None) => println!("not a CLI image"),
//!     Err(Error::Malformed { message, .. }) => println!("malformed: {message}"),
//!     Err(e) => println!("error: {e}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Standards Compliance
//!
//! - [ECMA-335 Standard](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf) - Partitions II and III

#[cfg(test)]
extern crate self as cilgraph;

#[macro_use]
pub(crate) mod error;

/// Image loading and low-level byte access
pub mod file;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use cilgraph::prelude::*;
///
/// let file = CilFile::from_file("Library.dll".as_ref())?.expect("managed image");
/// println!("{} types", file.module().types()?.len());
/// # Ok::<(), cilgraph::Error>(())
/// ```
pub mod prelude;

/// CIL instruction decoding (ECMA-335 Partition III)
///
/// # Key Types
///
/// - [`disassembler::InstructionDecoder`] - Decodes a method body into [`disassembler::Instruction`]s
/// - [`disassembler::Operand`] - Literals, branch targets and resolved tokens
/// - [`disassembler::OperandResolver`] - How token operands become types and members
///
/// # Examples
///
/// ```rust
/// use cilgraph::disassembler::InstructionDecoder;
///
/// let names: Vec<_> = InstructionDecoder::raw(&[0x00, 0x2A]).map(|i| i.name).collect();
/// assert_eq!(names, ["nop", "ret"]);
/// ```
pub mod disassembler;

/// Documentation ids (`T:`, `M:`, `F:`, ...) of namespaces, types and members
pub mod docid;

/// ECMA-335 metadata and the entity graph
pub mod metadata;

/// `cilgraph` Result type
pub type Result<T> = std::result::Result<T, Error>;

/// `cilgraph` Error type
pub use error::Error;

/// Opening images
pub use metadata::cilfile::CilFile;

/// Loader options and fault counters
pub use metadata::{config::LoaderConfig, diagnostics::Diagnostics};

/// The entity graph entry points
pub use metadata::typesystem::{Assembly, Module};

/// Metadata heaps and the tables stream header
pub use metadata::{
    streams::{Blob, Guid, StreamHeader, Strings, UserStrings},
    tables::TablesHeader,
};

/// Image access and byte parsing
pub use file::{parser::Parser, File};
