//! CIL instruction decoding.
//!
//! [`InstructionDecoder`] walks a method body once, front to back, yielding one
//! [`Instruction`] per opcode. Branch operands are resolved to absolute positions within
//! the code; token operands go through an [`OperandResolver`], which for a [`crate::Module`]
//! yields fields, methods, types and call-site signatures. String literal and runtime
//! handle tokens stay raw.
//!
//! # Key Types
//! - [`InstructionDecoder`] - The forward-only decoder
//! - [`Instruction`] / [`Operand`] - A decoded opcode and its operand
//! - [`OpCode`] - A row of the opcode table ([`INSTRUCTIONS`], [`INSTRUCTIONS_FE`])
//!
//! # Example
//! ```rust,no_run
//! use cilgraph::CilFile;
//!
//! let file = CilFile::from_file("tests/samples/sample.dll".as_ref())?.expect("managed image");
//! for ty in file.module().types()? {
//!     for method in ty.methods()? {
//!         for instruction in method.instructions()? {
//!             println!("{instruction}");
//!         }
//!     }
//! }
//! # Ok::<(), cilgraph::Error>(())
//! ```

mod decoder;
mod instruction;
mod instructions;
mod resolver;

pub use decoder::InstructionDecoder;
pub use instruction::{FlowType, Instruction, OpCode, Operand, OperandType};
pub use instructions::{lookup, INSTRUCTIONS, INSTRUCTIONS_FE, PREFIX_FE};
pub use resolver::{OperandResolver, RawTokens};
