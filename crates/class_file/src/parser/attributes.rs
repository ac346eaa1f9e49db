use std::io::Read;

use log::{trace, warn};

use super::Parser;
use crate::{
    attributes::{
        Attribute, AttributeInfo, BootstrapMethod, CodeAttribute, ExceptionTableEntry, InnerClass,
        LineNumber, LocalVariable, MethodParameter, ModuleAttribute, ModuleExports, ModuleHash,
        ModuleProvides, ModuleRequires, RecordComponent, StackMapFrame, VerificationTypeInfo,
    },
    constant_pool::CpInfo,
    ClassFileError, ConstantPool, Result,
};

type PayloadDecoder = fn(&mut Parser<&[u8]>, &ConstantPool) -> Result<AttributeInfo>;

/// Attribute names with a structured payload decoder. Every other name is
/// kept as opaque bytes.
const DECODERS: &[(&str, PayloadDecoder)] = &[
    ("ConstantValue", |p, _| {
        Ok(AttributeInfo::ConstantValue {
            constantvalue_index: p.read_u16()?,
        })
    }),
    ("Code", |p, cp| Ok(AttributeInfo::Code(p.parse_code_attribute(cp)?))),
    ("StackMapTable", |p, _| {
        Ok(AttributeInfo::StackMapTable(p.parse_stack_map_table()?))
    }),
    ("Exceptions", |p, _| Ok(AttributeInfo::Exceptions(p.parse_u16_table()?))),
    ("InnerClasses", |p, _| {
        Ok(AttributeInfo::InnerClasses(p.parse_inner_classes()?))
    }),
    ("EnclosingMethod", |p, _| {
        Ok(AttributeInfo::EnclosingMethod {
            class_index: p.read_u16()?,
            method_index: p.read_u16()?,
        })
    }),
    ("Synthetic", |_, _| Ok(AttributeInfo::Synthetic)),
    ("Signature", |p, _| {
        Ok(AttributeInfo::Signature {
            signature_index: p.read_u16()?,
        })
    }),
    ("SourceFile", |p, _| {
        Ok(AttributeInfo::SourceFile {
            sourcefile_index: p.read_u16()?,
        })
    }),
    ("SourceDebugExtension", |p, _| {
        Ok(AttributeInfo::SourceDebugExtension(p.r.read_to_end()?))
    }),
    ("LineNumberTable", |p, _| {
        Ok(AttributeInfo::LineNumberTable(p.parse_line_numbers()?))
    }),
    ("LocalVariableTable", |p, _| {
        Ok(AttributeInfo::LocalVariableTable(p.parse_local_variables()?))
    }),
    ("LocalVariableTypeTable", |p, _| {
        Ok(AttributeInfo::LocalVariableTypeTable(
            p.parse_local_variables()?,
        ))
    }),
    ("Deprecated", |_, _| Ok(AttributeInfo::Deprecated)),
    ("RuntimeVisibleAnnotations", |p, _| {
        Ok(AttributeInfo::RuntimeVisibleAnnotations(
            p.parse_annotations()?,
        ))
    }),
    ("RuntimeInvisibleAnnotations", |p, _| {
        Ok(AttributeInfo::RuntimeInvisibleAnnotations(
            p.parse_annotations()?,
        ))
    }),
    ("RuntimeVisibleParameterAnnotations", |p, _| {
        Ok(AttributeInfo::RuntimeVisibleParameterAnnotations(
            p.parse_parameter_annotations()?,
        ))
    }),
    ("RuntimeInvisibleParameterAnnotations", |p, _| {
        Ok(AttributeInfo::RuntimeInvisibleParameterAnnotations(
            p.parse_parameter_annotations()?,
        ))
    }),
    ("RuntimeVisibleTypeAnnotations", |p, _| {
        Ok(AttributeInfo::RuntimeVisibleTypeAnnotations(
            p.parse_type_annotations()?,
        ))
    }),
    ("RuntimeInvisibleTypeAnnotations", |p, _| {
        Ok(AttributeInfo::RuntimeInvisibleTypeAnnotations(
            p.parse_type_annotations()?,
        ))
    }),
    ("AnnotationDefault", |p, _| {
        Ok(AttributeInfo::AnnotationDefault(p.parse_element_value()?))
    }),
    ("BootstrapMethods", |p, _| {
        Ok(AttributeInfo::BootstrapMethods(p.parse_bootstrap_methods()?))
    }),
    ("MethodParameters", |p, _| {
        Ok(AttributeInfo::MethodParameters(p.parse_method_parameters()?))
    }),
    ("Module", |p, _| Ok(AttributeInfo::Module(p.parse_module()?))),
    ("ModulePackages", |p, _| {
        Ok(AttributeInfo::ModulePackages(p.parse_u16_table()?))
    }),
    ("ModuleMainClass", |p, _| {
        Ok(AttributeInfo::ModuleMainClass {
            main_class_index: p.read_u16()?,
        })
    }),
    ("ModuleTarget", |p, _| {
        Ok(AttributeInfo::ModuleTarget {
            target_platform_index: p.read_u16()?,
        })
    }),
    ("ModuleHashes", |p, _| {
        let algorithm_index = p.read_u16()?;
        let hashes = p.parse_module_hashes()?;
        Ok(AttributeInfo::ModuleHashes {
            algorithm_index,
            hashes,
        })
    }),
    ("ModuleResolution", |p, _| {
        Ok(AttributeInfo::ModuleResolution {
            resolution_flags: p.read_u16()?,
        })
    }),
    ("NestHost", |p, _| {
        Ok(AttributeInfo::NestHost {
            host_class_index: p.read_u16()?,
        })
    }),
    ("NestMembers", |p, _| Ok(AttributeInfo::NestMembers(p.parse_u16_table()?))),
    ("Record", |p, cp| Ok(AttributeInfo::Record(p.parse_record(cp)?))),
    ("PermittedSubclasses", |p, _| {
        Ok(AttributeInfo::PermittedSubclasses(p.parse_u16_table()?))
    }),
];

fn decoder_for(name: &[u8]) -> Option<(&'static str, PayloadDecoder)> {
    DECODERS
        .iter()
        .find(|(n, _)| n.as_bytes() == name)
        .copied()
}

impl<R: Read> Parser<R> {
    pub(super) fn parse_attribute(&mut self, constant_pool: &ConstantPool) -> Result<Attribute> {
        let offset = self.position();
        let attribute_name_index = self.read_u16()?;
        let attribute_length = self.read_u32()?;
        let bytes = self.r.read_bytes(attribute_length)?;

        // An unresolvable name is not an error here; the attribute just
        // stays opaque.
        let decoder = match constant_pool.get(attribute_name_index) {
            Ok(CpInfo::Utf8(name)) => decoder_for(name.as_bytes()),
            _ => None,
        };
        let Some((name, decoder)) = decoder else {
            if self.options.trace {
                trace!(
                    "{offset:>8}: attribute #{attribute_name_index} ({attribute_length} opaque bytes)"
                );
            }
            return Ok(Attribute {
                attribute_name_index,
                info: AttributeInfo::Unknown(bytes),
            });
        };
        if self.options.trace {
            trace!("{offset:>8}: attribute {name} ({attribute_length} bytes)");
        }

        let decoded = {
            let mut payload = self.nested(&bytes)?;
            decoder(&mut payload, constant_pool).and_then(|info| {
                match payload.position() {
                    consumed if consumed == u64::from(attribute_length) => Ok(info),
                    consumed => Err(ClassFileError::AttributeLengthMismatch {
                        name: name.to_owned(),
                        declared: attribute_length,
                        consumed,
                    }),
                }
            })
        };

        let info = match decoded {
            Ok(info) => info,
            Err(e @ (ClassFileError::UnexpectedEndOfData
            | ClassFileError::AttributeLengthMismatch { .. }))
                if self.options.tolerant =>
            {
                warn!("Keeping attribute {name} at byte {offset} as opaque bytes: {e}");
                AttributeInfo::Unknown(bytes)
            }
            Err(e) => return Err(e),
        };

        Ok(Attribute {
            attribute_name_index,
            info,
        })
    }

    fn parse_code_attribute(&mut self, constant_pool: &ConstantPool) -> Result<CodeAttribute> {
        let max_stack = self.read_u16()?;
        let max_locals = self.read_u16()?;
        let code_length = self.read_u32()?;
        let code = self.r.read_bytes(code_length)?;
        let code = self.nested(&code)?.parse_instructions(code_length)?;
        let exception_table_length = self.read_u16()?;
        let exception_table = (0..exception_table_length)
            .map(|_| self.parse_exception_table_entry())
            .collect::<Result<Vec<_>>>()?;
        let attributes = self.parse_attributes(constant_pool)?;

        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    fn parse_exception_table_entry(&mut self) -> Result<ExceptionTableEntry> {
        let start_pc = self.read_u16()?;
        let end_pc = self.read_u16()?;
        let handler_pc = self.read_u16()?;
        let catch_type = self.read_u16()?;

        Ok(ExceptionTableEntry {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        })
    }

    fn parse_u16_table(&mut self) -> Result<Vec<u16>> {
        let length = self.read_u16()?;
        (0..length).map(|_| self.read_u16()).collect()
    }

    fn parse_inner_classes(&mut self) -> Result<Vec<InnerClass>> {
        let number_of_classes = self.read_u16()?;
        (0..number_of_classes)
            .map(|_| {
                Ok(InnerClass {
                    inner_class_info_index: self.read_u16()?,
                    outer_class_info_index: self.read_u16()?,
                    inner_name_index: self.read_u16()?,
                    inner_class_access_flags: self.parse_access_flags()?,
                })
            })
            .collect()
    }

    fn parse_line_numbers(&mut self) -> Result<Vec<LineNumber>> {
        let line_number_table_length = self.read_u16()?;
        (0..line_number_table_length)
            .map(|_| {
                Ok(LineNumber {
                    start_pc: self.read_u16()?,
                    line_number: self.read_u16()?,
                })
            })
            .collect()
    }

    fn parse_local_variables(&mut self) -> Result<Vec<LocalVariable>> {
        let local_variable_table_length = self.read_u16()?;
        (0..local_variable_table_length)
            .map(|_| {
                Ok(LocalVariable {
                    start_pc: self.read_u16()?,
                    length: self.read_u16()?,
                    name_index: self.read_u16()?,
                    descriptor_index: self.read_u16()?,
                    index: self.read_u16()?,
                })
            })
            .collect()
    }

    fn parse_bootstrap_methods(&mut self) -> Result<Vec<BootstrapMethod>> {
        let num_bootstrap_methods = self.read_u16()?;
        (0..num_bootstrap_methods)
            .map(|_| {
                Ok(BootstrapMethod {
                    bootstrap_method_ref: self.read_u16()?,
                    bootstrap_arguments: self.parse_u16_table()?,
                })
            })
            .collect()
    }

    fn parse_method_parameters(&mut self) -> Result<Vec<MethodParameter>> {
        let parameters_count = self.read_u8()?;
        (0..parameters_count)
            .map(|_| {
                Ok(MethodParameter {
                    name_index: self.read_u16()?,
                    access_flags: self.parse_access_flags()?,
                })
            })
            .collect()
    }

    fn parse_module(&mut self) -> Result<ModuleAttribute> {
        let module_name_index = self.read_u16()?;
        let module_flags = self.read_u16()?;
        let module_version_index = self.read_u16()?;

        let requires_count = self.read_u16()?;
        let requires = (0..requires_count)
            .map(|_| {
                Ok(ModuleRequires {
                    requires_index: self.read_u16()?,
                    requires_flags: self.read_u16()?,
                    requires_version_index: self.read_u16()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let exports = self.parse_module_exports()?;
        let opens = self.parse_module_exports()?;
        let uses = self.parse_u16_table()?;
        let provides_count = self.read_u16()?;
        let provides = (0..provides_count)
            .map(|_| {
                Ok(ModuleProvides {
                    provides_index: self.read_u16()?,
                    provides_with_index: self.parse_u16_table()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ModuleAttribute {
            module_name_index,
            module_flags,
            module_version_index,
            requires,
            exports,
            opens,
            uses,
            provides,
        })
    }

    fn parse_module_exports(&mut self) -> Result<Vec<ModuleExports>> {
        let count = self.read_u16()?;
        (0..count)
            .map(|_| {
                Ok(ModuleExports {
                    index: self.read_u16()?,
                    flags: self.read_u16()?,
                    to_index: self.parse_u16_table()?,
                })
            })
            .collect()
    }

    fn parse_module_hashes(&mut self) -> Result<Vec<ModuleHash>> {
        let hashes_count = self.read_u16()?;
        (0..hashes_count)
            .map(|_| {
                let module_name_index = self.read_u16()?;
                let hash_length = self.read_u16()?;
                let hash = self.r.read_bytes(u32::from(hash_length))?;
                Ok(ModuleHash {
                    module_name_index,
                    hash,
                })
            })
            .collect()
    }

    fn parse_record(&mut self, constant_pool: &ConstantPool) -> Result<Vec<RecordComponent>> {
        let components_count = self.read_u16()?;
        (0..components_count)
            .map(|_| {
                Ok(RecordComponent {
                    name_index: self.read_u16()?,
                    descriptor_index: self.read_u16()?,
                    attributes: self.parse_attributes(constant_pool)?,
                })
            })
            .collect()
    }

    fn parse_stack_map_table(&mut self) -> Result<Vec<StackMapFrame>> {
        let number_of_entries = self.read_u16()?;
        (0..number_of_entries)
            .map(|_| self.parse_stack_map_frame())
            .collect()
    }

    fn parse_stack_map_frame(&mut self) -> Result<StackMapFrame> {
        let frame_type = self.read_u8()?;
        let frame = match frame_type {
            0..=63 => StackMapFrame::Same { frame_type },
            64..=127 => StackMapFrame::SameLocals1StackItem {
                frame_type,
                stack: self.parse_verification_type_info()?,
            },
            StackMapFrame::SAME_LOCALS_1_STACK_ITEM_EXTENDED => {
                StackMapFrame::SameLocals1StackItemExtended {
                    offset_delta: self.read_u16()?,
                    stack: self.parse_verification_type_info()?,
                }
            }
            248..=250 => StackMapFrame::Chop {
                frame_type,
                offset_delta: self.read_u16()?,
            },
            StackMapFrame::SAME_EXTENDED => StackMapFrame::SameExtended {
                offset_delta: self.read_u16()?,
            },
            252..=254 => StackMapFrame::Append {
                offset_delta: self.read_u16()?,
                locals: (0..frame_type - StackMapFrame::SAME_EXTENDED)
                    .map(|_| self.parse_verification_type_info())
                    .collect::<Result<Vec<_>>>()?,
            },
            StackMapFrame::FULL => {
                let offset_delta = self.read_u16()?;
                let number_of_locals = self.read_u16()?;
                let locals = (0..number_of_locals)
                    .map(|_| self.parse_verification_type_info())
                    .collect::<Result<Vec<_>>>()?;
                let number_of_stack_items = self.read_u16()?;
                let stack = (0..number_of_stack_items)
                    .map(|_| self.parse_verification_type_info())
                    .collect::<Result<Vec<_>>>()?;
                StackMapFrame::Full {
                    offset_delta,
                    locals,
                    stack,
                }
            }
            _ => return Err(ClassFileError::InvalidStackMapFrameType(frame_type)),
        };

        Ok(frame)
    }

    fn parse_verification_type_info(&mut self) -> Result<VerificationTypeInfo> {
        let tag = self.read_u8()?;
        Ok(match tag {
            0 => VerificationTypeInfo::Top,
            1 => VerificationTypeInfo::Integer,
            2 => VerificationTypeInfo::Float,
            3 => VerificationTypeInfo::Double,
            4 => VerificationTypeInfo::Long,
            5 => VerificationTypeInfo::Null,
            6 => VerificationTypeInfo::UninitializedThis,
            7 => VerificationTypeInfo::Object {
                cpool_index: self.read_u16()?,
            },
            8 => VerificationTypeInfo::Uninitialized {
                offset: self.read_u16()?,
            },
            _ => return Err(ClassFileError::InvalidVerificationTypeTag(tag)),
        })
    }
}


#[cfg(test)]
mod parse_stack_map_frame_tests {
    use super::*;

    #[test]
    fn it_should_parse_every_frame_kind() {
        #[rustfmt::skip]
        let bytes = [
            0x00, 0x07,
            3,
            65, 1,
            247, 0x00, 0x10, 7, 0x00, 0x05,
            249, 0x00, 0x02,
            251, 0x01, 0x00,
            253, 0x00, 0x04, 4, 8, 0x00, 0x03,
            255, 0x00, 0x01, 0x00, 0x01, 6, 0x00, 0x01, 5,
        ];
        let frames = Parser::new(&bytes[..]).parse_stack_map_table().unwrap();

        assert_eq!(
            frames,
            vec![
                StackMapFrame::Same { frame_type: 3 },
                StackMapFrame::SameLocals1StackItem {
                    frame_type: 65,
                    stack: VerificationTypeInfo::Integer
                },
                StackMapFrame::SameLocals1StackItemExtended {
                    offset_delta: 16,
                    stack: VerificationTypeInfo::Object { cpool_index: 5 }
                },
                StackMapFrame::Chop {
                    frame_type: 249,
                    offset_delta: 2
                },
                StackMapFrame::SameExtended { offset_delta: 256 },
                StackMapFrame::Append {
                    offset_delta: 4,
                    locals: vec![
                        VerificationTypeInfo::Long,
                        VerificationTypeInfo::Uninitialized { offset: 3 }
                    ]
                },
                StackMapFrame::Full {
                    offset_delta: 1,
                    locals: vec![VerificationTypeInfo::UninitializedThis],
                    stack: vec![VerificationTypeInfo::Null]
                },
            ]
        );
    }

    #[test]
    fn it_should_reject_reserved_frame_types() {
        assert!(matches!(
            Parser::new(&[0x00, 0x01, 200][..]).parse_stack_map_table(),
            Err(ClassFileError::InvalidStackMapFrameType(200))
        ));
    }
}
