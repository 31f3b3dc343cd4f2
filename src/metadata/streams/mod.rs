//! Metadata heaps.
//!
//! The metadata root lists up to five streams. Four of them are heaps, indexed by byte
//! offset or position from the table columns that refer to them:
//!
//! - **`#Strings`** ([`Strings`]): NUL-terminated UTF-8 identifiers such as type, member and
//!   namespace names. Offset 0 is the empty string.
//! - **`#US`** ([`UserStrings`]): UTF-16 string literals loaded by `ldstr`, each with a
//!   compressed length prefix and a trailing flag byte.
//! - **`#Blob`** ([`Blob`]): length-prefixed binary values, chiefly signatures, custom
//!   attribute values, constants and public keys.
//! - **`#GUID`** ([`Guid`]): 16-byte GUIDs addressed by 1-based index, used for module
//!   version ids.
//!
//! The fifth stream, `#~` (or the uncompressed `#-`), holds the tables and is read by
//! [`crate::metadata::tables`]. Each view here borrows the heap's bytes from the image and
//! never copies them; lookups validate the index on every call, so a corrupt column value
//! surfaces as an error at the entity that owns it.
//!
//! # Examples
//!
//! ```rust
//! use cilgraph::metadata::streams::{Blob, Strings};
//!
//! let strings = Strings::from(b"\0System\0Object\0")?;
//! assert_eq!(strings.get(8)?, "Object");
//!
//! let blobs = Blob::from(&[0x00, 0x03, 0x20, 0x00, 0x01])?;
//! assert_eq!(blobs.get(1)?, &[0x20, 0x00, 0x01]);
//! # Ok::<(), cilgraph::Error>(())
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 24.2.2 - Stream header
//! - ECMA-335 6th Edition, Partition II, Sections 24.2.3 to 24.2.5 - Heaps

mod blob;
mod guid;
mod streamheader;
mod strings;
mod userstrings;

pub use blob::Blob;
pub use guid::Guid;
pub use streamheader::StreamHeader;
pub use strings::Strings;
pub use userstrings::UserStrings;
