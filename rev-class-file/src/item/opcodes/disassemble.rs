//! Bytecode disassembly.

use std::fmt;

use log::trace;

use super::{Mnemonic, OpcodeInfo, OperandPart};
use crate::{
    error::{self, ClassFileError},
    item::ConstantPool,
    stream::ClassFileStream,
};

/// A decoded operand value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// A literal encoded in the instruction (`bipush`, `sipush`, the `iinc`
    /// increment, counts and dimensions).
    Literal(i32),
    /// A local variable slot.
    Local(u16),
    /// A constant pool index.
    Constant(u16),
    /// A branch offset relative to the instruction's position.
    Branch(i32),
    /// A `newarray` element type code.
    ArrayType(u8),
    Switch(Switch),
}

/// The jump table of a `tableswitch` or `lookupswitch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switch {
    /// Offset taken when no case matches.
    pub default: i32,
    /// `(match, offset)` pairs. A `tableswitch` lists every value from low to high.
    pub cases: Vec<(i32, i32)>,
}

/// One disassembled instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opcode {
    /// Byte offset of the instruction in the method's code.
    pub position: usize,
    pub mnemonic: Mnemonic,
    /// Set when the instruction was modified by a `wide` prefix.
    pub wide: bool,
    pub operands: Vec<Operand>,
    /// Descriptions of the constant pool entries the operands refer to.
    pub comments: Vec<String>,
}

impl Opcode {
    pub fn info(&self) -> &'static OpcodeInfo {
        self.mnemonic.info()
    }

    /// The first constant pool index operand.
    pub fn constant_index(&self) -> Option<u16> {
        self.operands.iter().find_map(|o| match o {
            Operand::Constant(i) => Some(*i),
            _ => None,
        })
    }

    /// The local variable slot operand.
    pub fn local(&self) -> Option<u16> {
        self.operands.iter().find_map(|o| match o {
            Operand::Local(i) => Some(*i),
            _ => None,
        })
    }

    /// The first literal operand.
    pub fn literal(&self) -> Option<i32> {
        self.operands.iter().find_map(|o| match o {
            Operand::Literal(v) => Some(*v),
            _ => None,
        })
    }

    /// Absolute position a branch instruction jumps to.
    pub fn branch_target(&self) -> Option<usize> {
        self.operands.iter().find_map(|o| match o {
            Operand::Branch(offset) => usize::try_from(self.position as i64 + *offset as i64).ok(),
            _ => None,
        })
    }
}

/// Formats as `mnemonic operands // comments`, with branch operands shown
/// as absolute targets.
impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wide {
            f.write_str("wide ")?;
        }
        write!(f, "{}", self.mnemonic)?;
        let target = |offset: i32| self.position as i64 + offset as i64;
        for operand in &self.operands {
            match operand {
                Operand::Literal(v) => write!(f, " {}", v)?,
                Operand::Local(i) => write!(f, " {}", i)?,
                Operand::Constant(i) => write!(f, " #{}", i)?,
                Operand::Branch(offset) => write!(f, " {}", target(*offset))?,
                Operand::ArrayType(t) => write!(f, " {}", array_type_name(*t).unwrap_or("?"))?,
                Operand::Switch(switch) => {
                    f.write_str(" {")?;
                    for (value, offset) in &switch.cases {
                        write!(f, " {}: {},", value, target(*offset))?;
                    }
                    write!(f, " default: {} }}", target(switch.default))?;
                }
            }
        }
        if !self.comments.is_empty() {
            write!(f, " // {}", self.comments.join(", "))?;
        }
        Ok(())
    }
}

/// Element type name for a `newarray` type code.
pub fn array_type_name(atype: u8) -> Option<&'static str> {
    Some(match atype {
        4 => "boolean",
        5 => "char",
        6 => "float",
        7 => "double",
        8 => "byte",
        9 => "short",
        10 => "int",
        11 => "long",
        _ => return None,
    })
}

/// Disassemble a method's code into instructions.
///
/// Fails on an unknown opcode byte, an invalid `wide` target or operands
/// running past the end of the code.
pub fn disassemble(code: &[u8], cp: &ConstantPool) -> error::Result<Vec<Opcode>> {
    let mut s = ClassFileStream::new(code);
    let mut opcodes = vec![];
    while !s.at_end() {
        let opcode = disassemble_opcode(&mut s, cp)?;
        trace!("{:>5}: {}", opcode.position, opcode);
        opcodes.push(opcode);
    }
    Ok(opcodes)
}

fn disassemble_opcode(s: &mut ClassFileStream, cp: &ConstantPool) -> error::Result<Opcode> {
    let position = s.tell();
    let code = s.read_u1()?;
    let info = OpcodeInfo::lookup(code).ok_or(ClassFileError::UnknownOpcode { position, opcode: code })?;

    let truncated = |_| ClassFileError::TruncatedInstruction { position };
    let mut opcode = Opcode {
        position,
        mnemonic: info.mnemonic,
        wide: false,
        operands: vec![],
        comments: vec![],
    };

    // (first part, accumulated value, byte count) of a multi-byte operand
    let mut pending: Option<(OperandPart, u32, u8)> = None;
    for &part in info.operands {
        if part.continues() {
            let byte = s.read_u1().map_err(truncated)?;
            if let Some((_, acc, n)) = pending.as_mut() {
                *acc = (*acc << 8) | byte as u32;
                *n += 1;
            }
            continue;
        }
        if let Some(p) = pending.take() {
            opcode.operands.push(assemble(p));
        }
        match part {
            OperandPart::IndexByte1 | OperandPart::Byte1 | OperandPart::BranchByte1 => {
                pending = Some((part, s.read_u1().map_err(truncated)? as u32, 1));
            }
            OperandPart::Local => opcode.operands.push(Operand::Local(s.read_u1().map_err(truncated)? as u16)),
            OperandPart::Index => opcode.operands.push(Operand::Constant(s.read_u1().map_err(truncated)? as u16)),
            OperandPart::Byte | OperandPart::Const => {
                opcode.operands.push(Operand::Literal(s.read_u1().map_err(truncated)? as i8 as i32))
            }
            OperandPart::Count | OperandPart::Dimensions => {
                opcode.operands.push(Operand::Literal(s.read_u1().map_err(truncated)? as i32))
            }
            OperandPart::AType => opcode.operands.push(Operand::ArrayType(s.read_u1().map_err(truncated)?)),
            OperandPart::Zero => {
                s.read_u1().map_err(truncated)?;
            }
            OperandPart::Switch => {
                let switch = read_switch(s, info.mnemonic, position)?;
                opcode.operands.push(Operand::Switch(switch));
            }
            OperandPart::Wide => return read_wide(s, position),
            _ => unreachable!("continuation parts are handled above"),
        }
    }
    if let Some(p) = pending.take() {
        opcode.operands.push(assemble(p));
    }

    for operand in &opcode.operands {
        if let Operand::Constant(index) = operand {
            if let Some(comment) = cp.describe(*index) {
                opcode.comments.push(comment);
            }
        }
    }
    Ok(opcode)
}

/// Turn an accumulated multi-byte value into its operand.
fn assemble((part, acc, n): (OperandPart, u32, u8)) -> Operand {
    match (part, n) {
        (OperandPart::IndexByte1, _) => Operand::Constant(acc as u16),
        (OperandPart::Byte1, _) => Operand::Literal(acc as u16 as i16 as i32),
        (OperandPart::BranchByte1, 2) => Operand::Branch(acc as u16 as i16 as i32),
        _ => Operand::Branch(acc as i32),
    }
}

fn read_switch(s: &mut ClassFileStream, mnemonic: Mnemonic, position: usize) -> error::Result<Switch> {
    let truncated = |_| ClassFileError::TruncatedInstruction { position };
    // Operands start at the next multiple of four from the start of the code.
    let pad = (4 - (position + 1) % 4) % 4;
    s.read_bytes(pad).map_err(truncated)?;
    let read_i32 = |s: &mut ClassFileStream| s.read_u4().map(|v| v as i32).map_err(truncated);

    let default = read_i32(s)?;
    let mut cases = vec![];
    if mnemonic == Mnemonic::tableswitch {
        let low = read_i32(s)?;
        let high = read_i32(s)?;
        if high < low {
            return Err(ClassFileError::MalformedSwitch { position });
        }
        for value in low..=high {
            cases.push((value, read_i32(s)?));
        }
    } else {
        let npairs = read_i32(s)?;
        if npairs < 0 {
            return Err(ClassFileError::MalformedSwitch { position });
        }
        for _ in 0..npairs {
            let value = read_i32(s)?;
            cases.push((value, read_i32(s)?));
        }
    }
    Ok(Switch { default, cases })
}

fn read_wide(s: &mut ClassFileStream, position: usize) -> error::Result<Opcode> {
    let truncated = |_| ClassFileError::TruncatedInstruction { position };
    let code = s.read_u1().map_err(truncated)?;
    let info = match OpcodeInfo::lookup(code) {
        Some(info) if info.mnemonic.is_widenable() => info,
        _ => return Err(ClassFileError::BadWideOpcode { position, opcode: code }),
    };
    let mut operands = vec![Operand::Local(s.read_u2().map_err(truncated)?)];
    if info.mnemonic == Mnemonic::iinc {
        operands.push(Operand::Literal(s.read_u2().map_err(truncated)? as i16 as i32));
    }
    Ok(Opcode {
        position,
        mnemonic: info.mnemonic,
        wide: true,
        operands,
        comments: vec![],
    })
}
