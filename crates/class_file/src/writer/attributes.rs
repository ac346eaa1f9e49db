use std::{convert::TryFrom, io::Write};

use log::trace;

use super::Writer;
use crate::{
    attributes::{
        Attribute, AttributeInfo, CodeAttribute, ModuleAttribute, ModuleExports, StackMapFrame,
        VerificationTypeInfo,
    },
    ClassFileError, Result,
};

impl<W: Write> Writer<W> {
    pub(super) fn write_attribute(&mut self, attribute: &Attribute) -> Result<()> {
        let mut payload = self.buffer();
        payload.write_attribute_info(&attribute.info)?;
        let payload = payload.into_inner();

        let attribute_length = u32::try_from(payload.len())
            .map_err(|_| ClassFileError::ValueTooLarge("attribute", payload.len()))?;
        if self.options.trace {
            trace!(
                "{:>8}: attribute {} ({attribute_length} bytes)",
                self.position(),
                attribute.name().unwrap_or("#unknown")
            );
        }

        self.write_u16(attribute.attribute_name_index)?;
        self.write_u32(attribute_length)?;
        self.w.write_bytes(&payload)
    }

    fn write_attribute_info(&mut self, info: &AttributeInfo) -> Result<()> {
        match info {
            AttributeInfo::ConstantValue {
                constantvalue_index,
            } => self.write_u16(*constantvalue_index),
            AttributeInfo::Code(code) => self.write_code_attribute(code),
            AttributeInfo::StackMapTable(frames) => {
                self.write_count("stack map frames", frames.len())?;
                for frame in frames {
                    self.write_stack_map_frame(frame)?;
                }
                Ok(())
            }
            AttributeInfo::Exceptions(exceptions) => {
                self.write_u16_table("exceptions", exceptions)
            }
            AttributeInfo::InnerClasses(classes) => {
                self.write_count("inner classes", classes.len())?;
                for class in classes {
                    self.write_u16(class.inner_class_info_index)?;
                    self.write_u16(class.outer_class_info_index)?;
                    self.write_u16(class.inner_name_index)?;
                    self.write_u16(class.inner_class_access_flags.bits())?;
                }
                Ok(())
            }
            AttributeInfo::EnclosingMethod {
                class_index,
                method_index,
            } => {
                self.write_u16(*class_index)?;
                self.write_u16(*method_index)
            }
            AttributeInfo::Synthetic | AttributeInfo::Deprecated => Ok(()),
            AttributeInfo::Signature { signature_index } => self.write_u16(*signature_index),
            AttributeInfo::SourceFile { sourcefile_index } => self.write_u16(*sourcefile_index),
            AttributeInfo::SourceDebugExtension(bytes) | AttributeInfo::Unknown(bytes) => {
                self.w.write_bytes(bytes)
            }
            AttributeInfo::LineNumberTable(line_numbers) => {
                self.write_count("line numbers", line_numbers.len())?;
                for line_number in line_numbers {
                    self.write_u16(line_number.start_pc)?;
                    self.write_u16(line_number.line_number)?;
                }
                Ok(())
            }
            AttributeInfo::LocalVariableTable(variables)
            | AttributeInfo::LocalVariableTypeTable(variables) => {
                self.write_count("local variables", variables.len())?;
                for variable in variables {
                    self.write_u16(variable.start_pc)?;
                    self.write_u16(variable.length)?;
                    self.write_u16(variable.name_index)?;
                    self.write_u16(variable.descriptor_index)?;
                    self.write_u16(variable.index)?;
                }
                Ok(())
            }
            AttributeInfo::RuntimeVisibleAnnotations(annotations)
            | AttributeInfo::RuntimeInvisibleAnnotations(annotations) => {
                self.write_annotations(annotations)
            }
            AttributeInfo::RuntimeVisibleParameterAnnotations(parameters)
            | AttributeInfo::RuntimeInvisibleParameterAnnotations(parameters) => {
                self.write_parameter_annotations(parameters)
            }
            AttributeInfo::RuntimeVisibleTypeAnnotations(annotations)
            | AttributeInfo::RuntimeInvisibleTypeAnnotations(annotations) => {
                self.write_type_annotations(annotations)
            }
            AttributeInfo::AnnotationDefault(value) => self.write_element_value(value),
            AttributeInfo::BootstrapMethods(methods) => {
                self.write_count("bootstrap methods", methods.len())?;
                for method in methods {
                    self.write_u16(method.bootstrap_method_ref)?;
                    self.write_u16_table("bootstrap arguments", &method.bootstrap_arguments)?;
                }
                Ok(())
            }
            AttributeInfo::MethodParameters(parameters) => {
                self.write_u8_count("method parameters", parameters.len())?;
                for parameter in parameters {
                    self.write_u16(parameter.name_index)?;
                    self.write_u16(parameter.access_flags.bits())?;
                }
                Ok(())
            }
            AttributeInfo::Module(module) => self.write_module(module),
            AttributeInfo::ModulePackages(packages) => {
                self.write_u16_table("module packages", packages)
            }
            AttributeInfo::ModuleMainClass { main_class_index } => {
                self.write_u16(*main_class_index)
            }
            AttributeInfo::ModuleTarget {
                target_platform_index,
            } => self.write_u16(*target_platform_index),
            AttributeInfo::ModuleHashes {
                algorithm_index,
                hashes,
            } => {
                self.write_u16(*algorithm_index)?;
                self.write_count("module hashes", hashes.len())?;
                for hash in hashes {
                    self.write_u16(hash.module_name_index)?;
                    self.write_count("module hash", hash.hash.len())?;
                    self.w.write_bytes(&hash.hash)?;
                }
                Ok(())
            }
            AttributeInfo::ModuleResolution { resolution_flags } => {
                self.write_u16(*resolution_flags)
            }
            AttributeInfo::NestHost { host_class_index } => self.write_u16(*host_class_index),
            AttributeInfo::NestMembers(members) => self.write_u16_table("nest members", members),
            AttributeInfo::Record(components) => {
                self.write_count("record components", components.len())?;
                for component in components {
                    self.write_u16(component.name_index)?;
                    self.write_u16(component.descriptor_index)?;
                    self.write_attributes(&component.attributes)?;
                }
                Ok(())
            }
            AttributeInfo::PermittedSubclasses(classes) => {
                self.write_u16_table("permitted subclasses", classes)
            }
        }
    }

    fn write_code_attribute(&mut self, code: &CodeAttribute) -> Result<()> {
        let mut code_array = self.buffer();
        code_array.write_instructions(&code.code)?;
        let code_array = code_array.into_inner();
        let code_length = u32::try_from(code_array.len())
            .map_err(|_| ClassFileError::ValueTooLarge("code", code_array.len()))?;

        self.write_u16(code.max_stack)?;
        self.write_u16(code.max_locals)?;
        self.write_u32(code_length)?;
        self.w.write_bytes(&code_array)?;

        self.write_count("exception table", code.exception_table.len())?;
        for entry in &code.exception_table {
            self.write_u16(entry.start_pc)?;
            self.write_u16(entry.end_pc)?;
            self.write_u16(entry.handler_pc)?;
            self.write_u16(entry.catch_type)?;
        }
        self.write_attributes(&code.attributes)
    }

    fn write_module(&mut self, module: &ModuleAttribute) -> Result<()> {
        self.write_u16(module.module_name_index)?;
        self.write_u16(module.module_flags)?;
        self.write_u16(module.module_version_index)?;

        self.write_count("module requires", module.requires.len())?;
        for requires in &module.requires {
            self.write_u16(requires.requires_index)?;
            self.write_u16(requires.requires_flags)?;
            self.write_u16(requires.requires_version_index)?;
        }
        self.write_module_exports("module exports", &module.exports)?;
        self.write_module_exports("module opens", &module.opens)?;
        self.write_u16_table("module uses", &module.uses)?;
        self.write_count("module provides", module.provides.len())?;
        for provides in &module.provides {
            self.write_u16(provides.provides_index)?;
            self.write_u16_table("module provides with", &provides.provides_with_index)?;
        }
        Ok(())
    }

    fn write_module_exports(
        &mut self,
        what: &'static str,
        exports: &[ModuleExports],
    ) -> Result<()> {
        self.write_count(what, exports.len())?;
        for export in exports {
            self.write_u16(export.index)?;
            self.write_u16(export.flags)?;
            self.write_u16_table(what, &export.to_index)?;
        }
        Ok(())
    }

    fn write_stack_map_frame(&mut self, frame: &StackMapFrame) -> Result<()> {
        if let StackMapFrame::Append { locals, .. } = frame {
            if !(1..=3).contains(&locals.len()) {
                return Err(ClassFileError::InvalidAppendFrame(locals.len()));
            }
        }
        self.write_u8(frame.frame_type())?;

        match frame {
            StackMapFrame::Same { .. } => Ok(()),
            StackMapFrame::SameLocals1StackItem { stack, .. } => {
                self.write_verification_type_info(stack)
            }
            StackMapFrame::SameLocals1StackItemExtended {
                offset_delta,
                stack,
            } => {
                self.write_u16(*offset_delta)?;
                self.write_verification_type_info(stack)
            }
            StackMapFrame::Chop { offset_delta, .. }
            | StackMapFrame::SameExtended { offset_delta } => self.write_u16(*offset_delta),
            StackMapFrame::Append {
                offset_delta,
                locals,
            } => {
                self.write_u16(*offset_delta)?;
                locals
                    .iter()
                    .try_for_each(|local| self.write_verification_type_info(local))
            }
            StackMapFrame::Full {
                offset_delta,
                locals,
                stack,
            } => {
                self.write_u16(*offset_delta)?;
                self.write_count("frame locals", locals.len())?;
                for local in locals {
                    self.write_verification_type_info(local)?;
                }
                self.write_count("frame stack items", stack.len())?;
                for item in stack {
                    self.write_verification_type_info(item)?;
                }
                Ok(())
            }
        }
    }

    fn write_verification_type_info(&mut self, info: &VerificationTypeInfo) -> Result<()> {
        self.write_u8(info.tag())?;
        match info {
            VerificationTypeInfo::Object { cpool_index } => self.write_u16(*cpool_index),
            VerificationTypeInfo::Uninitialized { offset } => self.write_u16(*offset),
            _ => Ok(()),
        }
    }
}
