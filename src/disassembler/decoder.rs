//! Forward-only instruction decoding.
//!
//! # Example
//!
//! ```rust
//! use cilgraph::disassembler::{InstructionDecoder, Operand};
//!
//! // ldc.i4.s 5, br.s -4, ret
//! let code = [0x1F, 0x05, 0x2B, 0xFC, 0x2A];
//! let names: Vec<_> = InstructionDecoder::raw(&code).map(|i| i.name).collect();
//! assert_eq!(names, ["ldc.i4.s", "br.s", "ret"]);
//!
//! let branch = InstructionDecoder::raw(&code).nth(1).unwrap();
//! assert!(matches!(branch.operand, Operand::Target(0)));
//! ```

use std::{iter::FusedIterator, sync::Arc};

use tracing::warn;

use crate::{
    disassembler::{
        instructions::{lookup, PREFIX_FE},
        Instruction, Operand, OperandResolver, OperandType, RawTokens,
    },
    file::parser::Parser,
    metadata::{token::Token, typesystem::GenericContext},
    Result,
};

/// Decodes a method's code into instructions, one per `next()`.
///
/// A malformed instruction ends the sequence: it is recorded as an IL fault through the
/// resolver and nothing after it is decoded. Decoding again requires a fresh decoder.
pub struct InstructionDecoder<'a, R: OperandResolver + ?Sized> {
    parser: Parser<'a>,
    resolver: Arc<R>,
    context: GenericContext,
    method: Option<Token>,
    finished: bool,
}

impl<'a> InstructionDecoder<'a, RawTokens> {
    /// A decoder that leaves every token operand unresolved
    #[must_use]
    pub fn raw(code: &'a [u8]) -> Self {
        InstructionDecoder::new(code, Arc::new(RawTokens::default()), GenericContext::default())
    }
}

impl<'a, R: OperandResolver + ?Sized> InstructionDecoder<'a, R> {
    /// Decode `code`, resolving tokens through `resolver` under `context`
    pub fn new(code: &'a [u8], resolver: Arc<R>, context: GenericContext) -> Self {
        InstructionDecoder {
            parser: Parser::new(code),
            resolver,
            context,
            method: None,
            finished: false,
        }
    }

    /// Attribute faults to `method`
    #[must_use]
    pub fn with_method(mut self, method: Token) -> Self {
        self.method = Some(method);
        self
    }

    /// The resolver faults are recorded through
    pub fn resolver(&self) -> &Arc<R> {
        &self.resolver
    }

    fn decode(&mut self) -> Result<Instruction> {
        let offset = self.parser.pos();
        let first = self.parser.read_le::<u8>()?;
        let (prefix, byte) = if first == PREFIX_FE {
            (PREFIX_FE, self.parser.read_le::<u8>()?)
        } else {
            (0, first)
        };

        let Some(opcode) = lookup(prefix, byte) else {
            return Err(match prefix {
                PREFIX_FE => malformed_error!("Invalid opcode FE {:02X}", byte),
                _ => malformed_error!("Invalid opcode {:02X}", byte),
            });
        };

        let operand = match opcode.operand {
            OperandType::None => Operand::None,
            OperandType::Implied(index) => Operand::Variable(u16::from(index)),
            OperandType::Int8 => Operand::Int8(self.parser.read_le::<i8>()?),
            OperandType::UInt8 => Operand::UInt8(self.parser.read_le::<u8>()?),
            OperandType::Int32 => Operand::Int32(self.parser.read_le::<i32>()?),
            OperandType::Int64 => Operand::Int64(self.parser.read_le::<i64>()?),
            OperandType::Float32 => Operand::Float32(self.parser.read_le::<f32>()?),
            OperandType::Float64 => Operand::Float64(self.parser.read_le::<f64>()?),
            OperandType::ShortVariable => {
                Operand::Variable(u16::from(self.parser.read_le::<u8>()?))
            }
            OperandType::Variable => Operand::Variable(self.parser.read_le::<u16>()?),
            OperandType::ShortBranch => {
                let delta = i64::from(self.parser.read_le::<i8>()?);
                Operand::Target(self.target(delta)?)
            }
            OperandType::Branch => {
                let delta = i64::from(self.parser.read_le::<i32>()?);
                Operand::Target(self.target(delta)?)
            }
            OperandType::Switch => {
                let count = self.parser.read_le::<u32>()? as usize;
                if count.saturating_mul(4) > self.parser.remaining() {
                    return Err(malformed_error!(
                        "Switch with {} targets exceeds the method body",
                        count
                    ));
                }

                let mut deltas = Vec::with_capacity(count);
                for _ in 0..count {
                    deltas.push(i64::from(self.parser.read_le::<i32>()?));
                }
                // Offsets are relative to the end of the whole table
                let mut targets = Vec::with_capacity(count);
                for delta in deltas {
                    targets.push(self.target(delta)?);
                }
                Operand::Switch(targets)
            }
            OperandType::Field
            | OperandType::Method
            | OperandType::Type
            | OperandType::Token
            | OperandType::Signature
            | OperandType::String => {
                let token = Token::new(self.parser.read_le::<u32>()?);
                self.resolver
                    .resolve_operand(opcode.operand, token, &self.context)?
            }
        };

        Ok(Instruction {
            offset,
            size: self.parser.pos() - offset,
            opcode: (u16::from(prefix) << 8) | u16::from(byte),
            name: opcode.name,
            flow: opcode.flow,
            operand,
        })
    }

    /// The absolute position `delta` bytes past the current one
    fn target(&self, delta: i64) -> Result<usize> {
        let next = i64::try_from(self.parser.pos()).map_err(|_| out_of_bounds_error!())?;
        usize::try_from(next + delta)
            .map_err(|_| malformed_error!("Branch target {} before the method body", next + delta))
    }
}

impl<R: OperandResolver + ?Sized> Iterator for InstructionDecoder<'_, R> {
    type Item = Instruction;

    fn next(&mut self) -> Option<Instruction> {
        if self.finished || !self.parser.has_more_data() {
            self.finished = true;
            return None;
        }

        let offset = self.parser.pos();
        match self.decode() {
            Ok(instruction) => Some(instruction),
            Err(error) => {
                self.finished = true;
                warn!(method = ?self.method, offset, %error, "instruction stream truncated");
                self.resolver
                    .faults()
                    .record_il_fault(self.method, offset, error.to_string());
                None
            }
        }
    }
}

impl<R: OperandResolver + ?Sized> FusedIterator for InstructionDecoder<'_, R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disassembler::FlowType;

    fn decode(code: &[u8]) -> (Vec<Instruction>, usize) {
        let mut decoder = InstructionDecoder::raw(code);
        let instructions: Vec<_> = decoder.by_ref().collect();
        (instructions, decoder.resolver().faults().il_faults())
    }

    #[test]
    fn short_forms_and_literals() {
        let (instructions, faults) = decode(&[
            0x04, // ldarg.2
            0x0D, // stloc.3
            0x1F, 0xF6, // ldc.i4.s -10
            0x21, 1, 0, 0, 0, 0, 0, 0, 0x80, // ldc.i8
            0x22, 0x00, 0x00, 0x80, 0x3F, // ldc.r4 1.0
            0x2A, // ret
        ]);
        assert_eq!(faults, 0);
        assert_eq!(instructions.len(), 6);
        assert!(matches!(instructions[0].operand, Operand::Variable(2)));
        assert!(matches!(instructions[1].operand, Operand::Variable(3)));
        assert!(matches!(instructions[2].operand, Operand::Int8(-10)));
        assert!(matches!(instructions[3].operand, Operand::Int64(v) if v == i64::MIN + 1));
        assert!(matches!(instructions[4].operand, Operand::Float32(v) if v == 1.0));
        assert_eq!(instructions[4].offset, 13);
        assert_eq!(instructions[4].size, 5);
    }

    #[test]
    fn two_byte_opcodes() {
        let (instructions, _) = decode(&[0xFE, 0x0C, 0x05, 0x01, 0xFE, 0x01, 0xFE, 0x14]);
        assert_eq!(instructions[0].name, "ldloc");
        assert_eq!(instructions[0].opcode, 0xFE0C);
        assert!(matches!(instructions[0].operand, Operand::Variable(0x0105)));
        assert_eq!(instructions[1].name, "ceq");
        assert_eq!(instructions[2].flow, FlowType::Meta);
    }

    #[test]
    fn branch_targets_are_absolute() {
        let mut code = vec![0x00; 10];
        code.extend_from_slice(&[0x2B, 0xFB]);
        let (instructions, _) = decode(&code);
        assert_eq!(instructions[10].targets(), &[7]);

        let mut code = vec![0x00; 10];
        code.extend_from_slice(&[0x38, 0xFB, 0xFF, 0xFF, 0xFF]);
        let (instructions, _) = decode(&code);
        assert_eq!(instructions[10].targets(), &[10]);
        assert_eq!(instructions[10].flow, FlowType::Branch);
    }

    #[test]
    fn switch_targets_follow_the_table() {
        let (instructions, _) = decode(&[
            0x45, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0xFD, 0xFF, 0xFF, 0xFF, 0x00,
            0x2A,
        ]);
        assert_eq!(instructions[0].targets(), &[14, 10]);
        assert_eq!(instructions[0].flow, FlowType::ConditionalBranch);
    }

    #[test]
    fn tokens_stay_raw() {
        let (instructions, _) = decode(&[0x72, 0x01, 0x00, 0x00, 0x70, 0x28, 0x02, 0x00, 0x00, 0x06]);
        assert!(matches!(&instructions[0].operand, Operand::Token(t) if t.value() == 0x7000_0001));
        assert!(matches!(&instructions[1].operand, Operand::Token(t) if t.value() == 0x0600_0002));
        assert_eq!(instructions[1].flow, FlowType::Call);
    }

    #[test]
    fn malformed_instruction_truncates() {
        // nop, nop, ldc.i4 with two of four operand bytes
        let (instructions, faults) = decode(&[0x00, 0x00, 0x20, 0x01, 0x02]);
        assert_eq!(instructions.len(), 2);
        assert_eq!(faults, 1);

        let (instructions, faults) = decode(&[0x00, 0x24, 0x00]);
        assert_eq!(instructions.len(), 1);
        assert_eq!(faults, 1);

        let (instructions, faults) = decode(&[0x2B, 0x80]);
        assert!(instructions.is_empty());
        assert_eq!(faults, 1);
    }

    #[test]
    fn fused_after_fault() {
        let mut decoder = InstructionDecoder::raw(&[0xFE]);
        assert!(decoder.next().is_none());
        assert!(decoder.next().is_none());
        assert_eq!(decoder.resolver().faults().il_faults(), 1);
    }
}
