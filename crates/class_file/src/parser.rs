mod annotations;
mod attributes;
mod code;

use std::io::Read;

use log::{debug, trace, warn};

use crate::{
    class_file::{ClassMember, MAGIC},
    constant_pool::{
        ClassInfo, CpInfo, DynamicInfo, MethodHandleInfo, MethodTypeInfo, NameAndTypeInfo, RefInfo,
        Utf8Info,
    },
    io::Input,
    options::MAX_NESTING_DEPTH,
    AccessFlags, Attributes, ClassFile, ClassFileError, ConstantPool, DecodeOptions, Result,
};

/// Decodes a class file from a sequential byte source.
///
/// All state lives in the parser, so independent parsers can run on
/// different threads.
pub struct Parser<R> {
    r: Input<R>,
    options: DecodeOptions,
    depth: usize,
}
impl<R: Read> Parser<R> {
    pub fn new(r: R) -> Self {
        Self::with_options(r, DecodeOptions::default())
    }

    pub fn with_options(r: R, options: DecodeOptions) -> Self {
        Self {
            r: Input::new(r),
            options,
            depth: 0,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.r.position()
    }

    pub fn parse(&mut self) -> Result<ClassFile> {
        let mut class_file = ClassFile::default();

        match self.parse_into(&mut class_file) {
            Ok(()) => {}
            Err(ClassFileError::UnexpectedEndOfData) if self.options.tolerant => {
                warn!(
                    "Class file truncated at byte {}, keeping what was decoded",
                    self.position()
                );
            }
            Err(e) => return Err(e),
        }

        debug!(
            "Decoded class file: {} constant pool slots, {} fields, {} methods, {} attributes",
            class_file.constant_pool.len(),
            class_file.fields.len(),
            class_file.methods.len(),
            class_file.attributes.len()
        );
        Ok(class_file)
    }

    // Fills `class_file` in file order so that an early exit leaves every
    // completely decoded structure in place.
    fn parse_into(&mut self, class_file: &mut ClassFile) -> Result<()> {
        class_file.magic = self.parse_magic_identifier()?;
        (class_file.minor_version, class_file.major_version) = self.parse_version()?;

        self.parse_constant_pool(&mut class_file.constant_pool)?;
        class_file.access_flags = self.parse_access_flags()?;
        class_file.this_class = self.read_u16()?;
        class_file.super_class = self.read_u16()?;

        let interfaces_count = self.read_u16()?;
        for _ in 0..interfaces_count {
            let interface = self.read_u16()?;
            class_file.interfaces.push(interface);
        }

        let fields_count = self.read_u16()?;
        for _ in 0..fields_count {
            let field = self.parse_member_info(&class_file.constant_pool)?;
            class_file.fields.push(field);
        }

        let methods_count = self.read_u16()?;
        for _ in 0..methods_count {
            let method = self.parse_member_info(&class_file.constant_pool)?;
            class_file.methods.push(method);
        }

        let attributes_count = self.read_u16()?;
        for _ in 0..attributes_count {
            let attribute = self.parse_attribute(&class_file.constant_pool)?;
            class_file.attributes.0.push(attribute);
        }

        Ok(())
    }

    fn parse_member_info(&mut self, constant_pool: &ConstantPool) -> Result<ClassMember> {
        let offset = self.position();
        let access_flags = self.parse_access_flags()?;
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;
        if self.options.trace {
            trace!("{offset:>8}: member name #{name_index} descriptor #{descriptor_index}");
        }
        let attributes = self.parse_attributes(constant_pool)?;

        Ok(ClassMember {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn parse_magic_identifier(&mut self) -> Result<u32> {
        match self.read_u32()? {
            MAGIC => Ok(MAGIC),
            magic_identifier => Err(ClassFileError::InvalidMagicIdentifier(magic_identifier)),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.read_u16()?;
        let major = self.read_u16()?;
        Ok((minor, major))
    }

    fn parse_access_flags(&mut self) -> Result<AccessFlags> {
        Ok(AccessFlags::from_bits_retain(self.read_u16()?))
    }

    fn parse_constant_pool(&mut self, constant_pool: &mut ConstantPool) -> Result<()> {
        let constant_pool_count = self.read_u16()?;

        let mut index = 1;
        while index < constant_pool_count {
            let offset = self.position();
            let cp_info = self.parse_cp_info()?;
            if self.options.trace {
                trace!("{offset:>8}: constant #{index} {cp_info:?}");
            }

            let slot_size = cp_info.slot_size() as u32;
            if u32::from(index) + slot_size > u32::from(constant_pool_count) {
                return Err(ClassFileError::WideConstantAtEndOfPool(index));
            }
            constant_pool.push(cp_info);
            index += slot_size as u16;
        }
        Ok(())
    }

    fn parse_cp_info(&mut self) -> Result<CpInfo> {
        let tag = self.read_u8()?;
        let cp_info = match tag {
            CpInfo::UTF8 => self.parse_utf8()?,
            CpInfo::INTEGER => CpInfo::Integer(self.read_i32()?),
            CpInfo::FLOAT => CpInfo::Float(self.read_u32()?),
            CpInfo::LONG => CpInfo::Long(self.r.read_i64()?),
            CpInfo::DOUBLE => CpInfo::Double(self.r.read_u64()?),
            CpInfo::CLASS => self.parse_class_info()?,
            CpInfo::STRING => self.parse_string()?,
            CpInfo::FIELD_REF => CpInfo::FieldRef(self.parse_ref_info()?),
            CpInfo::METHOD_REF => CpInfo::MethodRef(self.parse_ref_info()?),
            CpInfo::INTERFACE_METHOD_REF => CpInfo::InterfaceMethodRef(self.parse_ref_info()?),
            CpInfo::NAME_AND_TYPE => self.parse_name_and_type_info()?,
            CpInfo::METHOD_HANDLE => self.parse_method_handle()?,
            CpInfo::METHOD_TYPE => self.parse_method_type_info()?,
            CpInfo::DYNAMIC => CpInfo::Dynamic(self.parse_dynamic_info()?),
            CpInfo::INVOKE_DYNAMIC => CpInfo::InvokeDynamic(self.parse_dynamic_info()?),
            CpInfo::MODULE => CpInfo::Module {
                name_index: self.read_u16()?,
            },
            CpInfo::PACKAGE => CpInfo::Package {
                name_index: self.read_u16()?,
            },
            _ => return Err(ClassFileError::InvalidCpInfoTag(tag)),
        };

        Ok(cp_info)
    }

    fn parse_utf8(&mut self) -> Result<CpInfo> {
        let length = self.read_u16()?;
        let bytes = self.r.read_bytes(u32::from(length))?;

        Ok(CpInfo::Utf8(Utf8Info::new(bytes)))
    }

    fn parse_class_info(&mut self) -> Result<CpInfo> {
        let name_index = self.read_u16()?;

        Ok(CpInfo::Class(ClassInfo { name_index }))
    }

    fn parse_string(&mut self) -> Result<CpInfo> {
        let string_index = self.read_u16()?;

        Ok(CpInfo::String { string_index })
    }

    fn parse_name_and_type_info(&mut self) -> Result<CpInfo> {
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;

        Ok(CpInfo::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    fn parse_method_handle(&mut self) -> Result<CpInfo> {
        let reference_kind = self.read_u8()?;
        let reference_index = self.read_u16()?;

        Ok(CpInfo::MethodHandle(MethodHandleInfo {
            reference_kind,
            reference_index,
        }))
    }

    fn parse_method_type_info(&mut self) -> Result<CpInfo> {
        let descriptor_index = self.read_u16()?;

        Ok(CpInfo::MethodType(MethodTypeInfo { descriptor_index }))
    }

    fn parse_dynamic_info(&mut self) -> Result<DynamicInfo> {
        let bootstrap_method_attr_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(DynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        })
    }

    fn parse_ref_info(&mut self) -> Result<RefInfo> {
        let class_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(RefInfo {
            class_index,
            name_and_type_index,
        })
    }

    fn parse_attributes(&mut self, constant_pool: &ConstantPool) -> Result<Attributes> {
        let attributes_count = self.read_u16()?;
        (0..attributes_count)
            .map(|_| self.parse_attribute(constant_pool))
            .collect::<Result<Vec<_>>>()
            .map(Attributes)
    }

    /// A parser over an attribute payload or a code array, one level deeper.
    fn nested<'a>(&self, bytes: &'a [u8]) -> Result<Parser<&'a [u8]>> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ClassFileError::NestingTooDeep(MAX_NESTING_DEPTH));
        }

        Ok(Parser {
            r: Input::new(bytes),
            options: self.options,
            depth: self.depth + 1,
        })
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ClassFileError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.r.read_u32()
    }

    fn read_i32(&mut self) -> Result<i32> {
        self.r.read_i32()
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.r.read_u16()
    }

    fn read_i16(&mut self) -> Result<i16> {
        self.r.read_i16()
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.r.read_u8()
    }

    fn read_i8(&mut self) -> Result<i8> {
        self.r.read_i8()
    }
}


#[cfg(test)]
mod parse_version_tests {
    use super::*;

    #[test]
    fn it_should_be_able_to_parse_a_version() {
        assert_eq!(
            Parser::new(&[0x00, 0x03, 0x00, 0x2d][..])
                .parse_version()
                .unwrap(),
            (3, 45)
        );
    }
}

#[cfg(test)]
mod parse_constant_pool_tests {
    use super::*;

    fn parse(bytes: &[u8]) -> Result<ConstantPool> {
        let mut constant_pool = ConstantPool::default();
        Parser::new(bytes).parse_constant_pool(&mut constant_pool)?;
        Ok(constant_pool)
    }

    #[test]
    fn it_should_leave_the_slot_after_a_long_unusable() {
        #[rustfmt::skip]
        let constant_pool = parse(&[
            0x00, 0x04,
            0x05, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02,
            0x03, 0xff, 0xff, 0xff, 0xfe,
        ])
        .unwrap();

        assert_eq!(constant_pool.get(1).unwrap(), &CpInfo::Long(0x1_0000_0002));
        assert!(constant_pool.get(2).is_err());
        assert_eq!(constant_pool.get(3).unwrap(), &CpInfo::Integer(-2));
    }

    #[test]
    fn it_should_keep_the_raw_bits_of_floats() {
        let constant_pool = parse(&[0x00, 0x02, 0x04, 0x7f, 0xc0, 0x00, 0x01]).unwrap();

        assert_eq!(constant_pool.get(1).unwrap(), &CpInfo::Float(0x7fc0_0001));
    }

    #[test]
    fn it_should_reject_a_double_in_the_last_slot() {
        assert!(matches!(
            parse(&[0x00, 0x02, 0x06, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(ClassFileError::WideConstantAtEndOfPool(1))
        ));
    }

    #[test]
    fn it_should_reject_unknown_tags() {
        assert!(matches!(
            parse(&[0x00, 0x02, 0x02]),
            Err(ClassFileError::InvalidCpInfoTag(2))
        ));
    }
}
