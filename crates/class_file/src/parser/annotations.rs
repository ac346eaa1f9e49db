use std::io::Read;

use super::Parser;
use crate::{
    attributes::{
        Annotation, ElementValue, ElementValuePair, LocalVarTarget, TargetInfo, TypeAnnotation,
        TypePathEntry,
    },
    ClassFileError, Result,
};

impl<R: Read> Parser<R> {
    pub(super) fn parse_annotations(&mut self) -> Result<Vec<Annotation>> {
        let num_annotations = self.read_u16()?;
        (0..num_annotations)
            .map(|_| self.parse_annotation())
            .collect()
    }

    pub(super) fn parse_parameter_annotations(&mut self) -> Result<Vec<Vec<Annotation>>> {
        let num_parameters = self.read_u8()?;
        (0..num_parameters)
            .map(|_| self.parse_annotations())
            .collect()
    }

    fn parse_annotation(&mut self) -> Result<Annotation> {
        let type_index = self.read_u16()?;
        let num_element_value_pairs = self.read_u16()?;
        let element_value_pairs = (0..num_element_value_pairs)
            .map(|_| {
                Ok(ElementValuePair {
                    element_name_index: self.read_u16()?,
                    value: self.parse_element_value()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Annotation {
            type_index,
            element_value_pairs,
        })
    }

    pub(super) fn parse_element_value(&mut self) -> Result<ElementValue> {
        self.enter()?;
        let element_value = self.parse_element_value_body();
        self.leave();
        element_value
    }

    fn parse_element_value_body(&mut self) -> Result<ElementValue> {
        let tag = self.read_u8()?;
        let element_value = match tag {
            tag if ElementValue::CONST_TAGS.contains(&tag) => ElementValue::Const {
                tag,
                const_value_index: self.read_u16()?,
            },
            b'e' => ElementValue::Enum {
                type_name_index: self.read_u16()?,
                const_name_index: self.read_u16()?,
            },
            b'c' => ElementValue::Class {
                class_info_index: self.read_u16()?,
            },
            b'@' => ElementValue::Annotation(self.parse_annotation()?),
            b'[' => {
                let num_values = self.read_u16()?;
                ElementValue::Array(
                    (0..num_values)
                        .map(|_| self.parse_element_value())
                        .collect::<Result<Vec<_>>>()?,
                )
            }
            _ => return Err(ClassFileError::InvalidElementValueTag(tag)),
        };

        Ok(element_value)
    }

    pub(super) fn parse_type_annotations(&mut self) -> Result<Vec<TypeAnnotation>> {
        let num_annotations = self.read_u16()?;
        (0..num_annotations)
            .map(|_| self.parse_type_annotation())
            .collect()
    }

    fn parse_type_annotation(&mut self) -> Result<TypeAnnotation> {
        let target_type = self.read_u8()?;
        let target_info = self.parse_target_info(target_type)?;
        let path_length = self.read_u8()?;
        let target_path = (0..path_length)
            .map(|_| {
                Ok(TypePathEntry {
                    type_path_kind: self.read_u8()?,
                    type_argument_index: self.read_u8()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let annotation = self.parse_annotation()?;

        Ok(TypeAnnotation {
            target_type,
            target_info,
            target_path,
            annotation,
        })
    }

    fn parse_target_info(&mut self, target_type: u8) -> Result<TargetInfo> {
        let target_info = match target_type {
            0x00 | 0x01 => TargetInfo::TypeParameter {
                type_parameter_index: self.read_u8()?,
            },
            0x10 => TargetInfo::Supertype {
                supertype_index: self.read_u16()?,
            },
            0x11 | 0x12 => TargetInfo::TypeParameterBound {
                type_parameter_index: self.read_u8()?,
                bound_index: self.read_u8()?,
            },
            0x13..=0x15 => TargetInfo::Empty,
            0x16 => TargetInfo::FormalParameter {
                formal_parameter_index: self.read_u8()?,
            },
            0x17 => TargetInfo::Throws {
                throws_type_index: self.read_u16()?,
            },
            0x40 | 0x41 => {
                let table_length = self.read_u16()?;
                TargetInfo::LocalVar(
                    (0..table_length)
                        .map(|_| {
                            Ok(LocalVarTarget {
                                start_pc: self.read_u16()?,
                                length: self.read_u16()?,
                                index: self.read_u16()?,
                            })
                        })
                        .collect::<Result<Vec<_>>>()?,
                )
            }
            0x42 => TargetInfo::Catch {
                exception_table_index: self.read_u16()?,
            },
            0x43..=0x46 => TargetInfo::Offset {
                offset: self.read_u16()?,
            },
            0x47..=0x4b => TargetInfo::TypeArgument {
                offset: self.read_u16()?,
                type_argument_index: self.read_u8()?,
            },
            _ => return Err(ClassFileError::InvalidTargetType(target_type)),
        };

        Ok(target_info)
    }
}

#[cfg(test)]
mod parse_element_value_tests {
    use super::*;
    use crate::MAX_NESTING_DEPTH;

    #[test]
    fn it_should_parse_every_element_value_kind() {
        #[rustfmt::skip]
        let bytes = [
            b'[', 0x00, 0x04,
            b'I', 0x00, 0x07,
            b'e', 0x00, 0x08, 0x00, 0x09,
            b'c', 0x00, 0x0a,
            b'@', 0x00, 0x0b, 0x00, 0x01,
                0x00, 0x0c, b's', 0x00, 0x0d,
        ];

        assert_eq!(
            Parser::new(&bytes[..]).parse_element_value().unwrap(),
            ElementValue::Array(vec![
                ElementValue::Const {
                    tag: b'I',
                    const_value_index: 7
                },
                ElementValue::Enum {
                    type_name_index: 8,
                    const_name_index: 9
                },
                ElementValue::Class {
                    class_info_index: 10
                },
                ElementValue::Annotation(Annotation {
                    type_index: 11,
                    element_value_pairs: vec![ElementValuePair {
                        element_name_index: 12,
                        value: ElementValue::Const {
                            tag: b's',
                            const_value_index: 13
                        }
                    }]
                }),
            ])
        );
    }

    #[test]
    fn it_should_reject_unknown_tags() {
        assert!(matches!(
            Parser::new(&[b'x', 0x00, 0x01][..]).parse_element_value(),
            Err(ClassFileError::InvalidElementValueTag(b'x'))
        ));
    }

    #[test]
    fn it_should_refuse_to_nest_without_bound() {
        let mut bytes = Vec::new();
        for _ in 0..=MAX_NESTING_DEPTH {
            bytes.extend_from_slice(&[b'[', 0x00, 0x01]);
        }
        bytes.extend_from_slice(&[b'Z', 0x00, 0x01]);

        assert!(matches!(
            Parser::new(&bytes[..]).parse_element_value(),
            Err(ClassFileError::NestingTooDeep(_))
        ));
    }

    #[test]
    fn it_should_accept_nesting_below_the_bound() {
        let mut bytes = Vec::new();
        for _ in 0..16 {
            bytes.extend_from_slice(&[b'[', 0x00, 0x01]);
        }
        bytes.extend_from_slice(&[b'Z', 0x00, 0x01]);

        assert!(Parser::new(&bytes[..]).parse_element_value().is_ok());
    }
}
