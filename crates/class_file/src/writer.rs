mod annotations;
mod attributes;
mod code;

use std::{convert::TryFrom, io::Write};

use log::{debug, trace};

use crate::{
    class_file::ClassMember, constant_pool::CpInfo, io::Output, Attributes, ClassFile,
    ClassFileError, ConstantPool, EncodeOptions, Result,
};

/// Encodes a [`ClassFile`] to a byte sink.
///
/// Every count and length prefix is derived from the model, so edits to the
/// model never leave stale lengths behind.
pub struct Writer<W> {
    w: Output<W>,
    options: EncodeOptions,
}
impl<W: Write> Writer<W> {
    pub fn new(w: W) -> Self {
        Self::with_options(w, EncodeOptions::default())
    }

    pub fn with_options(w: W, options: EncodeOptions) -> Self {
        Self {
            w: Output::new(w),
            options,
        }
    }

    /// Bytes produced so far.
    pub fn position(&self) -> u64 {
        self.w.position()
    }

    pub fn into_inner(self) -> W {
        self.w.into_inner()
    }

    pub fn write(&mut self, class_file: &ClassFile) -> Result<()> {
        self.write_u32(class_file.magic)?;
        self.write_u16(class_file.minor_version)?;
        self.write_u16(class_file.major_version)?;
        self.write_constant_pool(&class_file.constant_pool)?;
        self.write_u16(class_file.access_flags.bits())?;
        self.write_u16(class_file.this_class)?;
        self.write_u16(class_file.super_class)?;

        self.write_count("interfaces", class_file.interfaces.len())?;
        for interface in &class_file.interfaces {
            self.write_u16(*interface)?;
        }

        self.write_count("fields", class_file.fields.len())?;
        for field in &class_file.fields {
            self.write_member_info(field)?;
        }

        self.write_count("methods", class_file.methods.len())?;
        for method in &class_file.methods {
            self.write_member_info(method)?;
        }

        self.write_attributes(&class_file.attributes)?;
        self.w.flush()?;

        debug!("Encoded class file: {} bytes", self.position());
        Ok(())
    }

    fn write_member_info(&mut self, member: &ClassMember) -> Result<()> {
        if self.options.trace {
            trace!(
                "{:>8}: member name #{} descriptor #{}",
                self.position(),
                member.name_index,
                member.descriptor_index
            );
        }
        self.write_u16(member.access_flags.bits())?;
        self.write_u16(member.name_index)?;
        self.write_u16(member.descriptor_index)?;
        self.write_attributes(&member.attributes)
    }

    fn write_constant_pool(&mut self, constant_pool: &ConstantPool) -> Result<()> {
        let constant_pool_count = u16::try_from(constant_pool.count())
            .map_err(|_| ClassFileError::ValueTooLarge("constant pool", constant_pool.len()))?;
        self.write_u16(constant_pool_count)?;

        for (index, cp_info) in constant_pool.iter() {
            if self.options.trace {
                trace!("{:>8}: constant #{index} {cp_info:?}", self.position());
            }
            self.write_cp_info(cp_info)?;
        }
        Ok(())
    }

    fn write_cp_info(&mut self, cp_info: &CpInfo) -> Result<()> {
        // Placeholder slots have no bytes of their own.
        let Some(tag) = cp_info.tag() else {
            return Ok(());
        };
        self.write_u8(tag)?;

        match cp_info {
            CpInfo::Utf8(utf8) => {
                let bytes = utf8.as_bytes();
                let length = u16::try_from(bytes.len())
                    .map_err(|_| ClassFileError::ValueTooLarge("utf8 constant", bytes.len()))?;
                self.write_u16(length)?;
                self.w.write_bytes(bytes)
            }
            CpInfo::Integer(value) => self.w.write_i32(*value),
            CpInfo::Float(bits) => self.write_u32(*bits),
            CpInfo::Long(value) => self.w.write_i64(*value),
            CpInfo::Double(bits) => self.w.write_u64(*bits),
            CpInfo::Class(class) => self.write_u16(class.name_index),
            CpInfo::String { string_index } => self.write_u16(*string_index),
            CpInfo::FieldRef(r) | CpInfo::MethodRef(r) | CpInfo::InterfaceMethodRef(r) => {
                self.write_u16(r.class_index)?;
                self.write_u16(r.name_and_type_index)
            }
            CpInfo::NameAndType(name_and_type) => {
                self.write_u16(name_and_type.name_index)?;
                self.write_u16(name_and_type.descriptor_index)
            }
            CpInfo::MethodHandle(handle) => {
                self.write_u8(handle.reference_kind)?;
                self.write_u16(handle.reference_index)
            }
            CpInfo::MethodType(method_type) => self.write_u16(method_type.descriptor_index),
            CpInfo::Dynamic(dynamic) | CpInfo::InvokeDynamic(dynamic) => {
                self.write_u16(dynamic.bootstrap_method_attr_index)?;
                self.write_u16(dynamic.name_and_type_index)
            }
            CpInfo::Module { name_index } | CpInfo::Package { name_index } => {
                self.write_u16(*name_index)
            }
            CpInfo::Unusable => Ok(()),
        }
    }

    fn write_attributes(&mut self, attributes: &Attributes) -> Result<()> {
        self.write_count("attributes", attributes.len())?;
        for attribute in attributes {
            self.write_attribute(attribute)?;
        }
        Ok(())
    }

    /// A writer for a length-prefixed block, whose length is known only
    /// once the block is complete.
    fn buffer(&self) -> Writer<Vec<u8>> {
        Writer::with_options(Vec::new(), self.options)
    }

    fn write_count(&mut self, what: &'static str, count: usize) -> Result<()> {
        let count = u16::try_from(count).map_err(|_| ClassFileError::ValueTooLarge(what, count))?;
        self.write_u16(count)
    }

    fn write_u8_count(&mut self, what: &'static str, count: usize) -> Result<()> {
        let count = u8::try_from(count).map_err(|_| ClassFileError::ValueTooLarge(what, count))?;
        self.write_u8(count)
    }

    fn write_u16_table(&mut self, what: &'static str, table: &[u16]) -> Result<()> {
        self.write_count(what, table.len())?;
        for value in table {
            self.write_u16(*value)?;
        }
        Ok(())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.w.write_u32(value)
    }

    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.w.write_i32(value)
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.w.write_u16(value)
    }

    fn write_i16(&mut self, value: i16) -> Result<()> {
        self.w.write_i16(value)
    }

    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.w.write_u8(value)
    }

    fn write_i8(&mut self, value: i8) -> Result<()> {
        self.w.write_i8(value)
    }
}
