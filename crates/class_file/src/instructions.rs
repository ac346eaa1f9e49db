//! Bytecode instructions of a `Code` attribute.

mod opcode;

use std::fmt;

pub use opcode::{Opcode, OperandShape};

/// One decoded instruction.
///
/// `offset` is where the opcode byte was found when the code array was read.
/// Writers never trust it: the encoded layout of padded instructions is
/// recomputed from the offset at which the instruction is actually written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub offset: u32,
    pub opcode: Opcode,
    pub operands: Operands,
}
impl Instruction {
    pub fn new(opcode: Opcode, operands: Operands) -> Self {
        Self {
            offset: 0,
            opcode,
            operands,
        }
    }

    /// Encoded size in bytes, opcode included, when written at `offset`.
    ///
    /// `wide` tells whether the previous instruction was the `wide` prefix.
    pub fn size(&self, offset: u32, wide: bool) -> u32 {
        1 + match &self.operands {
            Operands::None => 0,
            Operands::ImmediateByte(_) if wide => 2,
            Operands::ImmediateByte(_) => 1,
            Operands::ImmediateShort(_) | Operands::Branch(_) => 2,
            Operands::BranchWide(_) => 4,
            Operands::Increment { .. } if wide => 4,
            Operands::Increment { .. } => 2,
            Operands::InvokeInterface { .. } | Operands::InvokeDynamic { .. } => 4,
            Operands::MultiANewArray { .. } => 3,
            Operands::TableSwitch(table) => {
                switch_padding(offset) + 12 + 4 * table.offsets.len() as u32
            }
            Operands::LookupSwitch(lookup) => {
                switch_padding(offset) + 8 + 8 * lookup.pairs.len() as u32
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5}: {}", self.offset, self.opcode)?;
        let target = |delta: i64| i64::from(self.offset) + delta;
        match &self.operands {
            Operands::None => Ok(()),
            Operands::ImmediateByte(value) | Operands::ImmediateShort(value) => {
                write!(f, " {value}")
            }
            Operands::Branch(delta) => write!(f, " {}", target(i64::from(*delta))),
            Operands::BranchWide(delta) => write!(f, " {}", target(i64::from(*delta))),
            Operands::Increment { index, constant } => write!(f, " {index} by {constant}"),
            Operands::InvokeInterface { index, count } => write!(f, " #{index} count {count}"),
            Operands::InvokeDynamic { index } => write!(f, " #{index}"),
            Operands::MultiANewArray { index, dimensions } => {
                write!(f, " #{index} dim {dimensions}")
            }
            Operands::TableSwitch(table) => {
                write!(f, " {}..={} {{", table.low, table.high())?;
                for (i, delta) in table.offsets.iter().enumerate() {
                    let key = i64::from(table.low) + i as i64;
                    write!(f, " {key}: {}", target(i64::from(*delta)))?;
                }
                write!(f, " default: {} }}", target(i64::from(table.default)))
            }
            Operands::LookupSwitch(lookup) => {
                write!(f, " {} {{", lookup.pairs.len())?;
                for pair in &lookup.pairs {
                    write!(f, " {}: {}", pair.key, target(i64::from(pair.offset)))?;
                }
                write!(f, " default: {} }}", target(i64::from(lookup.default)))
            }
        }
    }
}

/// Operand payload, one variant per [`OperandShape`].
///
/// Reserved bytes of `invokeinterface` and `invokedynamic` are not kept:
/// they are always written as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operands {
    None,
    /// Holds an unsigned short when the instruction follows `wide`.
    ImmediateByte(u16),
    ImmediateShort(u16),
    Branch(i16),
    BranchWide(i32),
    Increment { index: u16, constant: i16 },
    InvokeInterface { index: u16, count: u8 },
    InvokeDynamic { index: u16 },
    MultiANewArray { index: u16, dimensions: u8 },
    TableSwitch(TableSwitch),
    LookupSwitch(LookupSwitch),
}
impl Operands {
    /// Whether this payload is the one an opcode of `shape` carries.
    pub fn matches(&self, shape: OperandShape) -> bool {
        matches!(
            (self, shape),
            (Operands::None, OperandShape::None)
                | (Operands::ImmediateByte(_), OperandShape::ImmediateByte)
                | (Operands::ImmediateShort(_), OperandShape::ImmediateShort)
                | (Operands::Branch(_), OperandShape::Branch)
                | (Operands::BranchWide(_), OperandShape::BranchWide)
                | (Operands::Increment { .. }, OperandShape::Increment)
                | (Operands::InvokeInterface { .. }, OperandShape::InvokeInterface)
                | (Operands::InvokeDynamic { .. }, OperandShape::InvokeDynamic)
                | (Operands::MultiANewArray { .. }, OperandShape::MultiANewArray)
                | (Operands::TableSwitch(_), OperandShape::TableSwitch)
                | (Operands::LookupSwitch(_), OperandShape::LookupSwitch)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSwitch {
    pub default: i32,
    pub low: i32,
    /// Jump offsets for the keys `low..=high`.
    pub offsets: Vec<i32>,
}
impl TableSwitch {
    pub fn high(&self) -> i64 {
        i64::from(self.low) + self.offsets.len() as i64 - 1
    }
}

/// `lookupswitch` payload. Pairs keep the order they were read in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupSwitch {
    pub default: i32,
    pub pairs: Vec<MatchOffsetPair>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOffsetPair {
    pub key: i32,
    pub offset: i32,
}

/// Zero bytes between a switch opcode at `offset` and its 4-byte aligned payload.
pub fn switch_padding(offset: u32) -> u32 {
    (4 - (offset.wrapping_add(1) % 4)) % 4
}
