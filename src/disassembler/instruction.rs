use std::fmt;

use crate::metadata::{
    signatures::{MethodSignature, TypeSig},
    token::Token,
    typesystem::Member,
};

/// How an opcode's operand is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandType {
    /// No operand
    None,
    /// Argument or local index baked into the opcode (`ldarg.0`-`ldarg.3` and friends)
    Implied(u8),
    /// `ShortInlineI` as signed byte
    Int8,
    /// `ShortInlineI` as unsigned byte (`unaligned.`, `no.`)
    UInt8,
    /// `InlineI`
    Int32,
    /// `InlineI8`
    Int64,
    /// `ShortInlineR`
    Float32,
    /// `InlineR`
    Float64,
    /// `ShortInlineVar`, one byte index
    ShortVariable,
    /// `InlineVar`, two byte index
    Variable,
    /// `ShortInlineBrTarget`, signed one byte offset
    ShortBranch,
    /// `InlineBrTarget`, signed four byte offset
    Branch,
    /// `InlineSwitch`, a count followed by four byte offsets
    Switch,
    /// `InlineField` token
    Field,
    /// `InlineMethod` token
    Method,
    /// `InlineType` token
    Type,
    /// `InlineTok`, a type, field or method token for `ldtoken`
    Token,
    /// `InlineSig`, a `StandAloneSig` token
    Signature,
    /// `InlineString`, a user string token
    String,
}

/// How an instruction affects control flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowType {
    /// Falls through to the next instruction
    Next,
    /// Unconditional transfer
    Branch,
    /// Conditional transfer, including `switch`
    ConditionalBranch,
    /// Method call
    Call,
    /// Leaves the method, finally or filter block
    Return,
    /// Raises an exception
    Throw,
    /// Debugger break
    Break,
    /// Prefix applying to the next instruction
    Meta,
}

/// One row of the opcode table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpCode {
    /// Mnemonic, empty for reserved encodings
    pub name: &'static str,
    /// Operand encoding
    pub operand: OperandType,
    /// Control flow kind
    pub flow: FlowType,
}

impl OpCode {
    /// True for an unassigned encoding
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.name.is_empty()
    }
}

/// A decoded operand
#[derive(Debug, Clone)]
pub enum Operand {
    /// No operand
    None,
    /// Signed byte literal
    Int8(i8),
    /// Unsigned byte literal
    UInt8(u8),
    /// 32-bit literal
    Int32(i32),
    /// 64-bit literal
    Int64(i64),
    /// 32-bit floating literal
    Float32(f32),
    /// 64-bit floating literal
    Float64(f64),
    /// Argument or local index
    Variable(u16),
    /// Absolute branch target within the code
    Target(usize),
    /// Absolute jump table targets
    Switch(Vec<usize>),
    /// A token left for the caller (`ldstr`, `ldtoken`, or when not resolving)
    Token(Token),
    /// A resolved type
    Type(TypeSig),
    /// A resolved field or method. The declaring type and a method instantiation's type
    /// arguments are decoded in the enclosing method's generic context.
    Member {
        /// The referenced entity
        member: Member,
        /// Declaring type, `None` for module-level members
        declaring_type: Option<TypeSig>,
        /// Type arguments of a method specification, empty otherwise
        type_arguments: Vec<TypeSig>,
    },
    /// A decoded call-site signature
    Signature(MethodSignature),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Int8(v) => write!(f, "{v}"),
            Operand::UInt8(v) => write!(f, "{v}"),
            Operand::Int32(v) => write!(f, "{v}"),
            Operand::Int64(v) => write!(f, "{v}"),
            Operand::Float32(v) => write!(f, "{v}"),
            Operand::Float64(v) => write!(f, "{v}"),
            Operand::Variable(v) => write!(f, "V_{v}"),
            Operand::Target(target) => write!(f, "IL_{target:04x}"),
            Operand::Switch(targets) => {
                f.write_str("(")?;
                for (i, target) in targets.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "IL_{target:04x}")?;
                }
                f.write_str(")")
            }
            Operand::Token(token) => write!(f, "{token}"),
            Operand::Type(ty) => write!(f, "{ty}"),
            Operand::Member { member, .. } => write!(f, "{}", member.token()),
            Operand::Signature(_) => f.write_str("<signature>"),
        }
    }
}

/// A decoded instruction
#[derive(Debug, Clone)]
pub struct Instruction {
    /// Position of the first opcode byte within the code
    pub offset: usize,
    /// Encoded length in bytes, operand included
    pub size: usize,
    /// The opcode; two-byte opcodes keep their `0xFE` prefix in the high byte
    pub opcode: u16,
    /// Mnemonic
    pub name: &'static str,
    /// Control flow kind
    pub flow: FlowType,
    /// The decoded operand
    pub operand: Operand,
}

impl Instruction {
    /// Position of the following instruction
    #[must_use]
    pub fn next_offset(&self) -> usize {
        self.offset + self.size
    }

    /// Branch and switch targets
    #[must_use]
    pub fn targets(&self) -> &[usize] {
        match &self.operand {
            Operand::Target(target) => std::slice::from_ref(target),
            Operand::Switch(targets) => targets,
            _ => &[],
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}: {}", self.offset, self.name)?;
        if !matches!(self.operand, Operand::None) {
            write!(f, " {}", self.operand)?;
        }
        Ok(())
    }
}
