use std::{convert::TryFrom, io::Read};

use log::trace;

use super::Parser;
use crate::{
    instructions::{
        switch_padding, Instruction, LookupSwitch, MatchOffsetPair, Opcode, OperandShape,
        Operands, TableSwitch,
    },
    ClassFileError, Result,
};

impl<R: Read> Parser<R> {
    /// Decodes a code array. The parser must start at offset 0 of the array
    /// so that its position is the offset of every decoded opcode.
    pub(super) fn parse_instructions(&mut self, code_length: u32) -> Result<Vec<Instruction>> {
        let mut instructions = Vec::new();
        let mut wide = false;

        while self.position() < u64::from(code_length) {
            let instruction = self.parse_instruction(wide)?;
            if self.options.trace {
                trace!("{instruction}");
            }
            wide = instruction.opcode == Opcode::Wide;
            instructions.push(instruction);
        }

        Ok(instructions)
    }

    fn parse_instruction(&mut self, wide: bool) -> Result<Instruction> {
        let offset = self.position() as u32;
        let opcode = self.read_u8()?;
        let opcode = Opcode::try_from(opcode)
            .map_err(|opcode| ClassFileError::InvalidOpcode { opcode, offset })?;

        let operands = match opcode.shape() {
            OperandShape::None => Operands::None,
            OperandShape::ImmediateByte if wide => Operands::ImmediateByte(self.read_u16()?),
            OperandShape::ImmediateByte => Operands::ImmediateByte(u16::from(self.read_u8()?)),
            OperandShape::ImmediateShort => Operands::ImmediateShort(self.read_u16()?),
            OperandShape::Branch => Operands::Branch(self.read_i16()?),
            OperandShape::BranchWide => Operands::BranchWide(self.read_i32()?),
            OperandShape::Increment if wide => Operands::Increment {
                index: self.read_u16()?,
                constant: self.read_i16()?,
            },
            OperandShape::Increment => Operands::Increment {
                index: u16::from(self.read_u8()?),
                constant: i16::from(self.read_i8()?),
            },
            OperandShape::InvokeInterface => {
                let index = self.read_u16()?;
                let count = self.read_u8()?;
                self.read_u8()?;
                Operands::InvokeInterface { index, count }
            }
            OperandShape::InvokeDynamic => {
                let index = self.read_u16()?;
                self.read_u16()?;
                Operands::InvokeDynamic { index }
            }
            OperandShape::MultiANewArray => Operands::MultiANewArray {
                index: self.read_u16()?,
                dimensions: self.read_u8()?,
            },
            OperandShape::TableSwitch => {
                self.r.skip(switch_padding(offset))?;
                Operands::TableSwitch(self.parse_table_switch(offset)?)
            }
            OperandShape::LookupSwitch => {
                self.r.skip(switch_padding(offset))?;
                Operands::LookupSwitch(self.parse_lookup_switch(offset)?)
            }
        };

        Ok(Instruction {
            offset,
            opcode,
            operands,
        })
    }

    fn parse_table_switch(&mut self, offset: u32) -> Result<TableSwitch> {
        let default = self.read_i32()?;
        let low = self.read_i32()?;
        let high = self.read_i32()?;
        if low > high {
            return Err(ClassFileError::InvalidSwitchRange { low, high, offset });
        }

        // Grown one entry at a time: the range comes from untrusted input.
        let mut offsets = Vec::new();
        for _ in low..=high {
            offsets.push(self.read_i32()?);
        }

        Ok(TableSwitch {
            default,
            low,
            offsets,
        })
    }

    fn parse_lookup_switch(&mut self, offset: u32) -> Result<LookupSwitch> {
        let default = self.read_i32()?;
        let npairs = self.read_i32()?;
        if npairs < 0 {
            return Err(ClassFileError::InvalidLookupSwitchCount {
                count: npairs,
                offset,
            });
        }

        let mut pairs = Vec::new();
        for _ in 0..npairs {
            pairs.push(MatchOffsetPair {
                key: self.read_i32()?,
                offset: self.read_i32()?,
            });
        }

        Ok(LookupSwitch { default, pairs })
    }
}

#[cfg(test)]
mod parse_instructions_tests {
    use super::*;

    fn parse(code: &[u8]) -> Result<Vec<Instruction>> {
        Parser::new(code).parse_instructions(code.len() as u32)
    }

    #[test]
    fn it_should_record_the_offset_of_every_instruction() {
        let code = parse(&[0x2a, 0xb7, 0x00, 0x08, 0xb1]).unwrap();

        assert_eq!(
            code,
            vec![
                Instruction {
                    offset: 0,
                    opcode: Opcode::ALoad0,
                    operands: Operands::None
                },
                Instruction {
                    offset: 1,
                    opcode: Opcode::InvokeSpecial,
                    operands: Operands::ImmediateShort(8)
                },
                Instruction {
                    offset: 4,
                    opcode: Opcode::Return,
                    operands: Operands::None
                },
            ]
        );
    }

    #[test]
    fn it_should_widen_the_instruction_after_wide() {
        let code = parse(&[0xc4, 0x84, 0x01, 0x00, 0xff, 0x38, 0x15, 0x07]).unwrap();

        assert_eq!(code[0].opcode, Opcode::Wide);
        assert_eq!(
            code[1].operands,
            Operands::Increment {
                index: 256,
                constant: -200
            }
        );
        assert_eq!(code[2].offset, 6);
        assert_eq!(code[2].operands, Operands::ImmediateByte(7));
    }

    #[test]
    fn it_should_skip_switch_padding() {
        #[rustfmt::skip]
        let code = parse(&[
            0x00,
            0xab, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x14,
            0x00, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x10,
            0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x0c,
            0xb1,
        ])
        .unwrap();

        assert_eq!(
            code[1].operands,
            Operands::LookupSwitch(LookupSwitch {
                default: 20,
                pairs: vec![
                    MatchOffsetPair { key: 5, offset: 16 },
                    MatchOffsetPair { key: 1, offset: 12 },
                ]
            })
        );
        assert_eq!(code[2].offset, 28);
    }

    #[test]
    fn it_should_parse_a_table_switch() {
        #[rustfmt::skip]
        let code = parse(&[
            0xaa, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x10,
            0xff, 0xff, 0xff, 0xff,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x18,
            0x00, 0x00, 0x00, 0x1c,
        ])
        .unwrap();

        assert_eq!(
            code[0].operands,
            Operands::TableSwitch(TableSwitch {
                default: 16,
                low: -1,
                offsets: vec![24, 28]
            })
        );
    }

    #[test]
    fn it_should_reject_an_inverted_table_switch_range() {
        #[rustfmt::skip]
        let result = parse(&[
            0xaa, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x10,
            0x00, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x00, 0x01,
        ]);

        assert!(matches!(
            result,
            Err(ClassFileError::InvalidSwitchRange {
                low: 2,
                high: 1,
                offset: 0
            })
        ));
    }

    #[test]
    fn it_should_reject_a_negative_lookup_switch_count() {
        #[rustfmt::skip]
        let result = parse(&[
            0xab, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x10,
            0xff, 0xff, 0xff, 0xff,
        ]);

        assert!(matches!(
            result,
            Err(ClassFileError::InvalidLookupSwitchCount { count: -1, .. })
        ));
    }

    #[test]
    fn it_should_drop_reserved_bytes() {
        let code = parse(&[0xb9, 0x00, 0x03, 0x02, 0x07, 0xba, 0x00, 0x04, 0x12, 0x34]).unwrap();

        assert_eq!(
            code[0].operands,
            Operands::InvokeInterface { index: 3, count: 2 }
        );
        assert_eq!(code[1].operands, Operands::InvokeDynamic { index: 4 });
    }

    #[test]
    fn it_should_reject_unassigned_opcodes() {
        assert!(matches!(
            parse(&[0x00, 0xcb]),
            Err(ClassFileError::InvalidOpcode {
                opcode: 0xcb,
                offset: 1
            })
        ));
    }

    #[test]
    fn it_should_fail_on_a_truncated_operand() {
        assert!(matches!(
            parse(&[0x11, 0x00]),
            Err(ClassFileError::UnexpectedEndOfData)
        ));
    }
}
