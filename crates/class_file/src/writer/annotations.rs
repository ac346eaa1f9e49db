use std::io::Write;

use super::Writer;
use crate::{
    attributes::{Annotation, ElementValue, TargetInfo, TypeAnnotation},
    Result,
};

impl<W: Write> Writer<W> {
    pub(super) fn write_annotations(&mut self, annotations: &[Annotation]) -> Result<()> {
        self.write_count("annotations", annotations.len())?;
        for annotation in annotations {
            self.write_annotation(annotation)?;
        }
        Ok(())
    }

    pub(super) fn write_parameter_annotations(
        &mut self,
        parameters: &[Vec<Annotation>],
    ) -> Result<()> {
        self.write_u8_count("annotated parameters", parameters.len())?;
        for annotations in parameters {
            self.write_annotations(annotations)?;
        }
        Ok(())
    }

    fn write_annotation(&mut self, annotation: &Annotation) -> Result<()> {
        self.write_u16(annotation.type_index)?;
        self.write_count("element value pairs", annotation.element_value_pairs.len())?;
        for pair in &annotation.element_value_pairs {
            self.write_u16(pair.element_name_index)?;
            self.write_element_value(&pair.value)?;
        }
        Ok(())
    }

    pub(super) fn write_element_value(&mut self, value: &ElementValue) -> Result<()> {
        self.write_u8(value.tag())?;
        match value {
            ElementValue::Const {
                const_value_index, ..
            } => self.write_u16(*const_value_index),
            ElementValue::Enum {
                type_name_index,
                const_name_index,
            } => {
                self.write_u16(*type_name_index)?;
                self.write_u16(*const_name_index)
            }
            ElementValue::Class { class_info_index } => self.write_u16(*class_info_index),
            ElementValue::Annotation(annotation) => self.write_annotation(annotation),
            ElementValue::Array(values) => {
                self.write_count("array element values", values.len())?;
                for value in values {
                    self.write_element_value(value)?;
                }
                Ok(())
            }
        }
    }

    pub(super) fn write_type_annotations(&mut self, annotations: &[TypeAnnotation]) -> Result<()> {
        self.write_count("type annotations", annotations.len())?;
        for annotation in annotations {
            self.write_u8(annotation.target_type)?;
            self.write_target_info(&annotation.target_info)?;
            self.write_u8_count("type path", annotation.target_path.len())?;
            for entry in &annotation.target_path {
                self.write_u8(entry.type_path_kind)?;
                self.write_u8(entry.type_argument_index)?;
            }
            self.write_annotation(&annotation.annotation)?;
        }
        Ok(())
    }

    fn write_target_info(&mut self, target_info: &TargetInfo) -> Result<()> {
        match target_info {
            TargetInfo::TypeParameter {
                type_parameter_index,
            } => self.write_u8(*type_parameter_index),
            TargetInfo::Supertype { supertype_index } => self.write_u16(*supertype_index),
            TargetInfo::TypeParameterBound {
                type_parameter_index,
                bound_index,
            } => {
                self.write_u8(*type_parameter_index)?;
                self.write_u8(*bound_index)
            }
            TargetInfo::Empty => Ok(()),
            TargetInfo::FormalParameter {
                formal_parameter_index,
            } => self.write_u8(*formal_parameter_index),
            TargetInfo::Throws { throws_type_index } => self.write_u16(*throws_type_index),
            TargetInfo::LocalVar(table) => {
                self.write_count("local variable targets", table.len())?;
                for target in table {
                    self.write_u16(target.start_pc)?;
                    self.write_u16(target.length)?;
                    self.write_u16(target.index)?;
                }
                Ok(())
            }
            TargetInfo::Catch {
                exception_table_index,
            } => self.write_u16(*exception_table_index),
            TargetInfo::Offset { offset } => self.write_u16(*offset),
            TargetInfo::TypeArgument {
                offset,
                type_argument_index,
            } => {
                self.write_u16(*offset)?;
                self.write_u8(*type_argument_index)
            }
        }
    }
}

#[cfg(test)]
mod write_element_value_tests {
    use super::*;
    use crate::attributes::ElementValuePair;

    #[test]
    fn it_should_write_nested_element_values() {
        let value = ElementValue::Array(vec![
            ElementValue::Enum {
                type_name_index: 8,
                const_name_index: 9,
            },
            ElementValue::Annotation(Annotation {
                type_index: 11,
                element_value_pairs: vec![ElementValuePair {
                    element_name_index: 12,
                    value: ElementValue::Const {
                        tag: b'Z',
                        const_value_index: 13,
                    },
                }],
            }),
        ]);

        let mut writer = Writer::new(Vec::new());
        writer.write_element_value(&value).unwrap();

        #[rustfmt::skip]
        assert_eq!(
            writer.into_inner(),
            vec![
                b'[', 0x00, 0x02,
                b'e', 0x00, 0x08, 0x00, 0x09,
                b'@', 0x00, 0x0b, 0x00, 0x01,
                    0x00, 0x0c, b'Z', 0x00, 0x0d,
            ]
        );
    }
}
