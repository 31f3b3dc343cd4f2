//! Method bodies (II.25.4).
//!
//! A body is located through the RVA of its `MethodDef` row and consists of a tiny or fat
//! header, the IL stream and optional data sections holding exception handling clauses.
//! Instructions are decoded from [`MethodBody::code`] by [`crate::disassembler`].

mod body;

pub use body::*;
