//! ECMA-335 metadata: the physical layer and the entity graph built on top of it.
//!
//! The physical layer locates the metadata root ([`root`]), the heaps ([`streams`]) and the
//! tables stream ([`tables`]) and reads rows on demand through [`reader::MetadataReader`].
//! The logical layer ([`typesystem`]) wraps the rows of one module into lazily populated,
//! identity-preserving entities; [`signatures`] and [`customattributes`] decode the blobs
//! those entities point at.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilgraph::metadata::cilfile::CilFile;
//!
//! let Some(file) = CilFile::from_file("Library.dll".as_ref())? else {
//!     println!("not a CLI image");
//!     return Ok(());
//! };
//!
//! for ty in file.module().types()? {
//!     println!("{}", ty.full_name()?);
//! }
//! # Ok::<(), cilgraph::Error>(())
//! ```

/// Opening images into assemblies or modules
pub mod cilfile;
/// Loader options
pub mod config;
/// The CLI header of PE images
pub mod cor20header;
/// Custom attribute decoding
pub mod customattributes;
/// Fault counters shared by everything decoded from one image
pub mod diagnostics;
/// Assembly names, versions and public key tokens
pub mod identity;
/// Method body headers and exception clauses
pub mod method;
/// Row and heap access
pub mod reader;
/// The metadata root and its stream directory
pub mod root;
/// Signature blobs
pub mod signatures;
/// The `#Strings`, `#Blob`, `#GUID` and `#US` heaps
pub mod streams;
/// The tables stream
pub mod tables;
/// Metadata tokens
pub mod token;
/// The entity graph
pub mod typesystem;
