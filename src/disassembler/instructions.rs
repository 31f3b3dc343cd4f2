//! The ECMA-335 opcode table (III.1.2.1), indexed by the opcode byte.

use crate::disassembler::instruction::{
    FlowType::{self, Branch, Break, Call, ConditionalBranch, Meta, Next, Return, Throw},
    OpCode,
    OperandType::{self as Op, Implied},
};

const fn op(name: &'static str, operand: Op, flow: FlowType) -> OpCode {
    OpCode {
        name,
        operand,
        flow,
    }
}

const fn plain(name: &'static str) -> OpCode {
    op(name, Op::None, Next)
}

const fn with(name: &'static str, operand: Op) -> OpCode {
    op(name, operand, Next)
}

const RESERVED: OpCode = plain("");

/// Escape byte introducing a two-byte opcode
pub const PREFIX_FE: u8 = 0xFE;

/// One-byte opcodes `0x00..=0xE0`
pub static INSTRUCTIONS: [OpCode; 0xE1] = [
    plain("nop"),
    op("break", Op::None, Break),
    with("ldarg.0", Implied(0)),
    with("ldarg.1", Implied(1)),
    with("ldarg.2", Implied(2)),
    with("ldarg.3", Implied(3)),
    with("ldloc.0", Implied(0)),
    with("ldloc.1", Implied(1)),
    with("ldloc.2", Implied(2)),
    with("ldloc.3", Implied(3)),
    with("stloc.0", Implied(0)),
    with("stloc.1", Implied(1)),
    with("stloc.2", Implied(2)),
    with("stloc.3", Implied(3)),
    with("ldarg.s", Op::ShortVariable),
    with("ldarga.s", Op::ShortVariable),
    with("starg.s", Op::ShortVariable),
    with("ldloc.s", Op::ShortVariable),
    with("ldloca.s", Op::ShortVariable),
    with("stloc.s", Op::ShortVariable),
    plain("ldnull"),
    plain("ldc.i4.m1"),
    plain("ldc.i4.0"),
    plain("ldc.i4.1"),
    plain("ldc.i4.2"),
    plain("ldc.i4.3"),
    plain("ldc.i4.4"),
    plain("ldc.i4.5"),
    plain("ldc.i4.6"),
    plain("ldc.i4.7"),
    plain("ldc.i4.8"),
    with("ldc.i4.s", Op::Int8),
    with("ldc.i4", Op::Int32),
    with("ldc.i8", Op::Int64),
    with("ldc.r4", Op::Float32),
    with("ldc.r8", Op::Float64),
    RESERVED,
    plain("dup"),
    plain("pop"),
    op("jmp", Op::Method, Call),
    op("call", Op::Method, Call),
    op("calli", Op::Signature, Call),
    op("ret", Op::None, Return),
    op("br.s", Op::ShortBranch, Branch),
    op("brfalse.s", Op::ShortBranch, ConditionalBranch),
    op("brtrue.s", Op::ShortBranch, ConditionalBranch),
    op("beq.s", Op::ShortBranch, ConditionalBranch),
    op("bge.s", Op::ShortBranch, ConditionalBranch),
    op("bgt.s", Op::ShortBranch, ConditionalBranch),
    op("ble.s", Op::ShortBranch, ConditionalBranch),
    op("blt.s", Op::ShortBranch, ConditionalBranch),
    op("bne.un.s", Op::ShortBranch, ConditionalBranch),
    op("bge.un.s", Op::ShortBranch, ConditionalBranch),
    op("bgt.un.s", Op::ShortBranch, ConditionalBranch),
    op("ble.un.s", Op::ShortBranch, ConditionalBranch),
    op("blt.un.s", Op::ShortBranch, ConditionalBranch),
    op("br", Op::Branch, Branch),
    op("brfalse", Op::Branch, ConditionalBranch),
    op("brtrue", Op::Branch, ConditionalBranch),
    op("beq", Op::Branch, ConditionalBranch),
    op("bge", Op::Branch, ConditionalBranch),
    op("bgt", Op::Branch, ConditionalBranch),
    op("ble", Op::Branch, ConditionalBranch),
    op("blt", Op::Branch, ConditionalBranch),
    op("bne.un", Op::Branch, ConditionalBranch),
    op("bge.un", Op::Branch, ConditionalBranch),
    op("bgt.un", Op::Branch, ConditionalBranch),
    op("ble.un", Op::Branch, ConditionalBranch),
    op("blt.un", Op::Branch, ConditionalBranch),
    op("switch", Op::Switch, ConditionalBranch),
    plain("ldind.i1"),
    plain("ldind.u1"),
    plain("ldind.i2"),
    plain("ldind.u2"),
    plain("ldind.i4"),
    plain("ldind.u4"),
    plain("ldind.i8"),
    plain("ldind.i"),
    plain("ldind.r4"),
    plain("ldind.r8"),
    plain("ldind.ref"),
    plain("stind.ref"),
    plain("stind.i1"),
    plain("stind.i2"),
    plain("stind.i4"),
    plain("stind.i8"),
    plain("stind.r4"),
    plain("stind.r8"),
    plain("add"),
    plain("sub"),
    plain("mul"),
    plain("div"),
    plain("div.un"),
    plain("rem"),
    plain("rem.un"),
    plain("and"),
    plain("or"),
    plain("xor"),
    plain("shl"),
    plain("shr"),
    plain("shr.un"),
    plain("neg"),
    plain("not"),
    plain("conv.i1"),
    plain("conv.i2"),
    plain("conv.i4"),
    plain("conv.i8"),
    plain("conv.r4"),
    plain("conv.r8"),
    plain("conv.u4"),
    plain("conv.u8"),
    op("callvirt", Op::Method, Call),
    with("cpobj", Op::Type),
    with("ldobj", Op::Type),
    with("ldstr", Op::String),
    op("newobj", Op::Method, Call),
    with("castclass", Op::Type),
    with("isinst", Op::Type),
    plain("conv.r.un"),
    RESERVED,
    RESERVED,
    with("unbox", Op::Type),
    op("throw", Op::None, Throw),
    with("ldfld", Op::Field),
    with("ldflda", Op::Field),
    with("stfld", Op::Field),
    with("ldsfld", Op::Field),
    with("ldsflda", Op::Field),
    with("stsfld", Op::Field),
    with("stobj", Op::Type),
    plain("conv.ovf.i1.un"),
    plain("conv.ovf.i2.un"),
    plain("conv.ovf.i4.un"),
    plain("conv.ovf.i8.un"),
    plain("conv.ovf.u1.un"),
    plain("conv.ovf.u2.un"),
    plain("conv.ovf.u4.un"),
    plain("conv.ovf.u8.un"),
    plain("conv.ovf.i.un"),
    plain("conv.ovf.u.un"),
    with("box", Op::Type),
    with("newarr", Op::Type),
    plain("ldlen"),
    with("ldelema", Op::Type),
    plain("ldelem.i1"),
    plain("ldelem.u1"),
    plain("ldelem.i2"),
    plain("ldelem.u2"),
    plain("ldelem.i4"),
    plain("ldelem.u4"),
    plain("ldelem.i8"),
    plain("ldelem.i"),
    plain("ldelem.r4"),
    plain("ldelem.r8"),
    plain("ldelem.ref"),
    plain("stelem.i"),
    plain("stelem.i1"),
    plain("stelem.i2"),
    plain("stelem.i4"),
    plain("stelem.i8"),
    plain("stelem.r4"),
    plain("stelem.r8"),
    plain("stelem.ref"),
    with("ldelem", Op::Type),
    with("stelem", Op::Type),
    with("unbox.any", Op::Type),
    // 0xA6..=0xB2
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    plain("conv.ovf.i1"),
    plain("conv.ovf.u1"),
    plain("conv.ovf.i2"),
    plain("conv.ovf.u2"),
    plain("conv.ovf.i4"),
    plain("conv.ovf.u4"),
    plain("conv.ovf.i8"),
    plain("conv.ovf.u8"),
    // 0xBB..=0xC1
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    with("refanyval", Op::Type),
    plain("ckfinite"),
    RESERVED,
    RESERVED,
    with("mkrefany", Op::Type),
    // 0xC7..=0xCF
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    with("ldtoken", Op::Token),
    plain("conv.u2"),
    plain("conv.u1"),
    plain("conv.i"),
    plain("conv.ovf.i"),
    plain("conv.ovf.u"),
    plain("add.ovf"),
    plain("add.ovf.un"),
    plain("mul.ovf"),
    plain("mul.ovf.un"),
    plain("sub.ovf"),
    plain("sub.ovf.un"),
    op("endfinally", Op::None, Return),
    op("leave", Op::Branch, Branch),
    op("leave.s", Op::ShortBranch, Branch),
    plain("stind.i"),
    plain("conv.u"),
];

/// Two-byte opcodes `0xFE 0x00..=0xFE 0x1E`
pub static INSTRUCTIONS_FE: [OpCode; 0x1F] = [
    plain("arglist"),
    plain("ceq"),
    plain("cgt"),
    plain("cgt.un"),
    plain("clt"),
    plain("clt.un"),
    with("ldftn", Op::Method),
    with("ldvirtftn", Op::Method),
    RESERVED,
    with("ldarg", Op::Variable),
    with("ldarga", Op::Variable),
    with("starg", Op::Variable),
    with("ldloc", Op::Variable),
    with("ldloca", Op::Variable),
    with("stloc", Op::Variable),
    plain("localloc"),
    RESERVED,
    op("endfilter", Op::None, Return),
    op("unaligned.", Op::UInt8, Meta),
    op("volatile.", Op::None, Meta),
    op("tail.", Op::None, Meta),
    with("initobj", Op::Type),
    op("constrained.", Op::Type, Meta),
    plain("cpblk"),
    plain("initblk"),
    op("no.", Op::UInt8, Meta),
    op("rethrow", Op::None, Throw),
    RESERVED,
    with("sizeof", Op::Type),
    plain("refanytype"),
    op("readonly.", Op::None, Meta),
];

/// Look up an opcode; `prefix` is `0xFE` for two-byte opcodes and 0 otherwise
#[must_use]
pub fn lookup(prefix: u8, opcode: u8) -> Option<&'static OpCode> {
    let table: &[OpCode] = if prefix == PREFIX_FE {
        &INSTRUCTIONS_FE
    } else {
        &INSTRUCTIONS
    };
    table
        .get(usize::from(opcode))
        .filter(|opcode| !opcode.is_reserved())
}
