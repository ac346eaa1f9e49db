use std::{borrow::Cow, fmt};

use crate::{ClassFileError, Result};

#[macro_export]
macro_rules! matches_cp_info {
    ($cp:expr, $index:expr, $i:ident) => {
        match $cp.get($index) {
            Ok($crate::constant_pool::CpInfo::$i(n)) => Ok(n),
            Ok(c) => Err($crate::ClassFileError::UnexpectedConstantPoolEntry(
                stringify!($i),
                c.clone(),
            )),
            Err(e) => Err(e),
        }
    };
}

/// The constant pool of a class file.
///
/// Indices are 1-based. `Long` and `Double` entries occupy two slots, the
/// second of which holds [`CpInfo::Unusable`] and cannot be resolved.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConstantPool {
    cp_infos: Vec<CpInfo>,
}
impl ConstantPool {
    /// Builds a pool from its entries, inserting the placeholder slot after
    /// every `Long` and `Double`.
    pub fn new(cp_infos: Vec<CpInfo>) -> Self {
        let mut constant_pool = Self::default();
        for cp_info in cp_infos {
            constant_pool.push(cp_info);
        }
        constant_pool
    }

    /// Appends an entry and returns its index.
    pub fn push(&mut self, cp_info: CpInfo) -> u16 {
        let slot_size = cp_info.slot_size();
        self.cp_infos.push(cp_info);
        let index = self.cp_infos.len() as u16;
        if slot_size == 2 {
            self.cp_infos.push(CpInfo::Unusable);
        }
        index
    }

    /// Number of physical slots, placeholders included.
    pub fn len(&self) -> usize {
        self.cp_infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cp_infos.is_empty()
    }

    /// The `constant_pool_count` written to a class file.
    pub fn count(&self) -> usize {
        self.cp_infos.len() + 1
    }

    pub fn get(&self, index: u16) -> Result<&CpInfo> {
        match self.slot(index) {
            Some(CpInfo::Unusable) | None => Err(ClassFileError::InvalidConstantPoolIndex(index)),
            Some(cp_info) => Ok(cp_info),
        }
    }

    /// Replaces the entry at `index`, which must keep its slot width.
    pub fn set(&mut self, index: u16, cp_info: CpInfo) -> Result<CpInfo> {
        let current = self.get(index)?;
        if current.slot_size() != cp_info.slot_size() {
            return Err(ClassFileError::ConstantWidthMismatch(index));
        }
        Ok(std::mem::replace(
            &mut self.cp_infos[index as usize - 1],
            cp_info,
        ))
    }

    pub fn utf8(&self, index: u16) -> Result<&Utf8Info> {
        matches_cp_info!(self, index, Utf8)
    }

    /// Resolves a `Class` entry to its internal name.
    pub fn class_name(&self, index: u16) -> Result<Cow<'_, str>> {
        let ClassInfo { name_index } = matches_cp_info!(self, index, Class)?;
        Ok(self.utf8(*name_index)?.to_str())
    }

    /// Resolves a `NameAndType` entry to its name and descriptor.
    pub fn name_and_type(&self, index: u16) -> Result<(Cow<'_, str>, Cow<'_, str>)> {
        let NameAndTypeInfo {
            name_index,
            descriptor_index,
        } = matches_cp_info!(self, index, NameAndType)?;
        Ok((
            self.utf8(*name_index)?.to_str(),
            self.utf8(*descriptor_index)?.to_str(),
        ))
    }

    /// True if `index` names a `Utf8` entry with exactly these bytes.
    pub fn has_utf8(&self, index: u16, bytes: &[u8]) -> bool {
        matches!(self.slot(index), Some(CpInfo::Utf8(s)) if s.as_bytes() == bytes)
    }

    /// Iterates over `(index, entry)`, skipping placeholder slots.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &CpInfo)> {
        self.cp_infos
            .iter()
            .enumerate()
            .filter(|(_, cp_info)| **cp_info != CpInfo::Unusable)
            .map(|(i, cp_info)| (i as u16 + 1, cp_info))
    }

    fn slot(&self, index: u16) -> Option<&CpInfo> {
        (index as usize).checked_sub(1).and_then(|i| self.cp_infos.get(i))
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum CpInfo {
    Utf8(Utf8Info),
    Integer(i32),
    /// Raw IEEE 754 bits, so that every NaN payload survives.
    Float(u32),
    Long(i64),
    /// Raw IEEE 754 bits, so that every NaN payload survives.
    Double(u64),
    Class(ClassInfo),
    String { string_index: u16 },
    FieldRef(RefInfo),
    MethodRef(RefInfo),
    InterfaceMethodRef(RefInfo),
    NameAndType(NameAndTypeInfo),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    Dynamic(DynamicInfo),
    InvokeDynamic(DynamicInfo),
    Module { name_index: u16 },
    Package { name_index: u16 },
    Unusable,
}
impl CpInfo {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELD_REF: u8 = 9;
    pub const METHOD_REF: u8 = 10;
    pub const INTERFACE_METHOD_REF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
    pub const METHOD_HANDLE: u8 = 15;
    pub const METHOD_TYPE: u8 = 16;
    pub const DYNAMIC: u8 = 17;
    pub const INVOKE_DYNAMIC: u8 = 18;
    pub const MODULE: u8 = 19;
    pub const PACKAGE: u8 = 20;

    /// The tag byte, or `None` for a placeholder slot.
    pub fn tag(&self) -> Option<u8> {
        Some(match self {
            CpInfo::Utf8(_) => Self::UTF8,
            CpInfo::Integer(_) => Self::INTEGER,
            CpInfo::Float(_) => Self::FLOAT,
            CpInfo::Long(_) => Self::LONG,
            CpInfo::Double(_) => Self::DOUBLE,
            CpInfo::Class(_) => Self::CLASS,
            CpInfo::String { .. } => Self::STRING,
            CpInfo::FieldRef(_) => Self::FIELD_REF,
            CpInfo::MethodRef(_) => Self::METHOD_REF,
            CpInfo::InterfaceMethodRef(_) => Self::INTERFACE_METHOD_REF,
            CpInfo::NameAndType(_) => Self::NAME_AND_TYPE,
            CpInfo::MethodHandle(_) => Self::METHOD_HANDLE,
            CpInfo::MethodType(_) => Self::METHOD_TYPE,
            CpInfo::Dynamic(_) => Self::DYNAMIC,
            CpInfo::InvokeDynamic(_) => Self::INVOKE_DYNAMIC,
            CpInfo::Module { .. } => Self::MODULE,
            CpInfo::Package { .. } => Self::PACKAGE,
            CpInfo::Unusable => return None,
        })
    }

    /// Number of pool slots the entry occupies.
    pub fn slot_size(&self) -> usize {
        match self {
            CpInfo::Long(_) | CpInfo::Double(_) => 2,
            _ => 1,
        }
    }

    pub fn float_value(&self) -> Option<f32> {
        match self {
            CpInfo::Float(bits) => Some(f32::from_bits(*bits)),
            _ => None,
        }
    }

    pub fn double_value(&self) -> Option<f64> {
        match self {
            CpInfo::Double(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }
}

/// The bytes of a `CONSTANT_Utf8_info`, in the JVM's modified UTF-8.
#[derive(PartialEq, Eq, Clone, Default)]
pub struct Utf8Info {
    bytes: Vec<u8>,
}
impl Utf8Info {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decodes the modified UTF-8. Borrows when the bytes are plain UTF-8,
    /// which covers every string without NUL or supplementary characters.
    pub fn to_str(&self) -> Cow<'_, str> {
        match std::str::from_utf8(&self.bytes) {
            Ok(s) => Cow::Borrowed(s),
            Err(_) => Cow::Owned(decode_modified_utf8(&self.bytes)),
        }
    }
}
impl From<&str> for Utf8Info {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}
impl fmt::Debug for Utf8Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_str(), f)
    }
}
impl PartialEq<str> for Utf8Info {
    fn eq(&self, other: &str) -> bool {
        self.bytes == other.as_bytes()
    }
}
impl PartialEq<&str> for Utf8Info {
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}

fn decode_modified_utf8(bytes: &[u8]) -> String {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let x = bytes[i];
        let continuation = |at: usize| bytes.get(at).map(|b| u16::from(b & 0x3F));
        if x & 0x80 == 0 {
            units.push(u16::from(x));
            i += 1;
        } else if let (0xC0, Some(y)) = (x & 0xE0, continuation(i + 1)) {
            units.push(u16::from(x & 0x1F) << 6 | y);
            i += 2;
        } else if let (0xE0, Some(y), Some(z)) =
            (x & 0xF0, continuation(i + 1), continuation(i + 2))
        {
            units.push(u16::from(x & 0x0F) << 12 | y << 6 | z);
            i += 3;
        } else {
            units.push(char::REPLACEMENT_CHARACTER as u16);
            i += 1;
        }
    }
    String::from_utf16_lossy(&units)
}

#[derive(Debug, PartialEq, Clone)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ClassInfo {
    // The value of the name_index item must be a valid index into the constant_pool table.
    // The constant_pool entry at that index must be a CONSTANT_Utf8_info structure (§4.4.7)
    // representing a valid binary class or interface name encoded in internal form (§4.2.1).
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

/// Shared layout of `CONSTANT_Dynamic_info` and `CONSTANT_InvokeDynamic_info`.
#[derive(Debug, PartialEq, Clone)]
pub struct DynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}
