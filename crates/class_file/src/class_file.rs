use std::{
    borrow::Cow,
    io::{Read, Write},
};

use crate::{
    attributes::{Attributes, CodeAttribute},
    constant_pool::ClassInfo,
    matches_cp_info, AccessFlags, ConstantPool, DecodeOptions, EncodeOptions, Parser, Result,
    Writer,
};

pub const MAGIC: u32 = 0xCAFEBABE;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: AccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Attributes,
}
impl Default for ClassFile {
    fn default() -> Self {
        Self {
            magic: MAGIC,
            minor_version: 0,
            major_version: 0,
            constant_pool: ConstantPool::default(),
            access_flags: AccessFlags::empty(),
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Attributes::default(),
        }
    }
}
impl ClassFile {
    pub fn parse(bytes: impl Read) -> Result<ClassFile> {
        Parser::new(bytes).parse()
    }

    /// Like [`ClassFile::parse`], but truncated input yields the structures
    /// decoded before the truncation point.
    pub fn parse_tolerant(bytes: impl Read) -> Result<ClassFile> {
        Parser::with_options(bytes, DecodeOptions::tolerant()).parse()
    }

    pub fn write(&self, w: impl Write) -> Result<()> {
        Writer::new(w).write(self)
    }

    pub fn write_with_options(&self, w: impl Write, options: EncodeOptions) -> Result<()> {
        Writer::with_options(w, options).write(self)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write(&mut bytes)?;
        Ok(bytes)
    }

    pub fn super_class(&self) -> Result<Option<Cow<'_, str>>> {
        // Zero only for java/lang/Object, which has no direct superclass.
        if self.super_class == 0 {
            return Ok(None);
        }

        // Otherwise the constant_pool entry at that index must be a CONSTANT_Class_info structure
        // representing the direct superclass of the class defined by this class file.
        let ClassInfo { name_index } =
            matches_cp_info!(self.constant_pool, self.super_class, Class)?;

        Ok(Some(self.constant_pool.utf8(*name_index)?.to_str()))
    }

    pub fn class_name(&self) -> Result<Cow<'_, str>> {
        // The value of the this_class item must be a valid index into the constant_pool table.
        // The constant_pool entry at that index must be a CONSTANT_Class_info structure (§4.4.1)
        // representing the class or interface defined by this class file.
        self.constant_pool.class_name(self.this_class)
    }

    pub fn interface_names(&self) -> Result<Vec<Cow<'_, str>>> {
        self.interfaces
            .iter()
            .map(|i| self.constant_pool.class_name(*i))
            .collect()
    }

    pub fn field_name(&self, field: &FieldInfo) -> Result<Cow<'_, str>> {
        Ok(self.constant_pool.utf8(field.name_index)?.to_str())
    }

    pub fn field_descriptor(&self, field: &FieldInfo) -> Result<Cow<'_, str>> {
        Ok(self.constant_pool.utf8(field.descriptor_index)?.to_str())
    }

    pub fn method_name(&self, method: &MethodInfo) -> Result<Cow<'_, str>> {
        Ok(self.constant_pool.utf8(method.name_index)?.to_str())
    }

    pub fn method_descriptor(&self, method: &MethodInfo) -> Result<Cow<'_, str>> {
        Ok(self.constant_pool.utf8(method.descriptor_index)?.to_str())
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| {
            self.constant_pool.has_utf8(m.name_index, name.as_bytes())
                && self
                    .constant_pool
                    .has_utf8(m.descriptor_index, descriptor.as_bytes())
        })
    }
}

/// A field or a method.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMember {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes,
}
impl ClassMember {
    pub fn code(&self) -> Option<&CodeAttribute> {
        self.attributes.code_attribute()
    }
}

pub type FieldInfo = ClassMember;
pub type MethodInfo = ClassMember;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constant_pool::Utf8Info, CpInfo};

    fn object_class() -> ClassFile {
        ClassFile {
            major_version: 65,
            constant_pool: ConstantPool::new(vec![
                CpInfo::Utf8(Utf8Info::from("java/lang/Object")),
                CpInfo::Class(ClassInfo { name_index: 1 }),
                CpInfo::Float(0x7fc0_0001),
            ]),
            access_flags: AccessFlags::PUBLIC | AccessFlags::SUPER,
            this_class: 2,
            ..ClassFile::default()
        }
    }

    #[test]
    fn it_should_have_no_super_class_when_the_index_is_zero() {
        assert_eq!(object_class().super_class().unwrap(), None);
    }

    #[test]
    fn it_should_parse_what_it_writes() {
        let class_file = object_class();
        let mut bytes = Vec::new();
        class_file
            .write_with_options(&mut bytes, EncodeOptions::default().with_trace(true))
            .unwrap();

        assert_eq!(ClassFile::parse(&bytes[..]).unwrap(), class_file);
        assert!(class_file.constant_pool.get(3).unwrap().float_value().unwrap().is_nan());
    }

    #[test]
    fn it_should_keep_the_header_of_a_truncated_class() {
        let bytes = object_class().to_bytes().unwrap();

        let class_file = ClassFile::parse_tolerant(&bytes[..bytes.len() - 4]).unwrap();
        assert_eq!(class_file.class_name().unwrap(), "java/lang/Object");
        assert!(class_file.fields.is_empty());
        assert!(ClassFile::parse(&bytes[..bytes.len() - 4]).is_err());
    }
}
