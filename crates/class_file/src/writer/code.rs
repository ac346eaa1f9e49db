use std::{convert::TryFrom, io::Write};

use log::trace;

use super::Writer;
use crate::{
    instructions::{switch_padding, Instruction, Opcode, Operands},
    ClassFileError, Result,
};

impl<W: Write> Writer<W> {
    /// Encodes a code array. The writer must be empty so that its position
    /// is the offset of every written opcode.
    pub(super) fn write_instructions(&mut self, instructions: &[Instruction]) -> Result<()> {
        let mut wide = false;
        for instruction in instructions {
            self.write_instruction(instruction, wide)?;
            wide = instruction.opcode == Opcode::Wide;
        }
        Ok(())
    }

    fn write_instruction(&mut self, instruction: &Instruction, wide: bool) -> Result<()> {
        let offset = u32::try_from(self.position())
            .map_err(|_| ClassFileError::ValueTooLarge("code", self.position() as usize))?;
        if self.options.trace {
            trace!("{offset:>8}: {}", instruction.opcode);
        }
        let opcode = instruction.opcode;
        if !instruction.operands.matches(opcode.shape()) {
            return Err(ClassFileError::OperandShapeMismatch {
                mnemonic: opcode.mnemonic(),
                offset,
            });
        }
        self.write_u8(opcode.value())?;

        match &instruction.operands {
            Operands::None => Ok(()),
            Operands::ImmediateByte(value) if wide => self.write_u16(*value),
            Operands::ImmediateByte(value) => {
                let value = u8::try_from(*value).map_err(|_| ClassFileError::OperandNeedsWide {
                    mnemonic: opcode.mnemonic(),
                    value: *value,
                    offset,
                })?;
                self.write_u8(value)
            }
            Operands::ImmediateShort(value) => self.write_u16(*value),
            Operands::Branch(delta) => self.write_i16(*delta),
            Operands::BranchWide(delta) => self.write_i32(*delta),
            Operands::Increment { index, constant } if wide => {
                self.write_u16(*index)?;
                self.write_i16(*constant)
            }
            Operands::Increment { index, constant } => {
                let needs_wide = |value: u16| ClassFileError::OperandNeedsWide {
                    mnemonic: opcode.mnemonic(),
                    value,
                    offset,
                };
                let index = u8::try_from(*index).map_err(|_| needs_wide(*index))?;
                let constant =
                    i8::try_from(*constant).map_err(|_| needs_wide(*constant as u16))?;
                self.write_u8(index)?;
                self.write_i8(constant)
            }
            Operands::InvokeInterface { index, count } => {
                self.write_u16(*index)?;
                self.write_u8(*count)?;
                self.write_u8(0)
            }
            Operands::InvokeDynamic { index } => {
                self.write_u16(*index)?;
                self.write_u16(0)
            }
            Operands::MultiANewArray { index, dimensions } => {
                self.write_u16(*index)?;
                self.write_u8(*dimensions)
            }
            Operands::TableSwitch(table) => {
                let high = i32::try_from(table.high()).map_err(|_| {
                    ClassFileError::ValueTooLarge("tableswitch", table.offsets.len())
                })?;
                if table.offsets.is_empty() {
                    return Err(ClassFileError::InvalidSwitchRange {
                        low: table.low,
                        high,
                        offset,
                    });
                }
                self.write_padding(offset)?;
                self.write_i32(table.default)?;
                self.write_i32(table.low)?;
                self.write_i32(high)?;
                for delta in &table.offsets {
                    self.write_i32(*delta)?;
                }
                Ok(())
            }
            Operands::LookupSwitch(lookup) => {
                let npairs = i32::try_from(lookup.pairs.len()).map_err(|_| {
                    ClassFileError::ValueTooLarge("lookupswitch", lookup.pairs.len())
                })?;
                self.write_padding(offset)?;
                self.write_i32(lookup.default)?;
                self.write_i32(npairs)?;
                for pair in &lookup.pairs {
                    self.write_i32(pair.key)?;
                    self.write_i32(pair.offset)?;
                }
                Ok(())
            }
        }
    }

    fn write_padding(&mut self, offset: u32) -> Result<()> {
        for _ in 0..switch_padding(offset) {
            self.write_u8(0)?;
        }
        Ok(())
    }
}
