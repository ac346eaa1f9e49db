mod parser;

use std::{convert::TryFrom, fmt};

use byteorder::NativeEndian;
use log::{debug, warn};

use crate::{JImageError, Result};

use self::parser::Parser;

const HASH_MULTIPLIER: i32 = 0x01000193;

/// Magic identifier and the six header words that follow it.
const HEADER_SIZE: usize = 7 * std::mem::size_of::<u32>();

#[derive(PartialEq, Debug)]
pub enum AttributeKind {
    Module,
    Parent,
    Base,
    Extension,
    Offset,
    Compressed,
    Uncompressed,

    Total,
}

impl TryFrom<u8> for AttributeKind {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(AttributeKind::Module),
            2 => Ok(AttributeKind::Parent),
            3 => Ok(AttributeKind::Base),
            4 => Ok(AttributeKind::Extension),
            5 => Ok(AttributeKind::Offset),
            6 => Ok(AttributeKind::Compressed),
            7 => Ok(AttributeKind::Uncompressed),
            _ => Err(value),
        }
    }
}

type Attributes = [u64; AttributeKind::Total as usize];

#[derive(Debug)]
pub struct Header {
    pub version: (u16, u16),
    pub flags: u32,
    pub resource_count: u32,
    pub table_length: u32,
    pub attributes_size: u32,
    pub strings_size: u32,
}
impl Header {
    pub fn index_size(&self) -> usize {
        HEADER_SIZE
            + self.redirect_table_size()
            + self.attribute_offsets_size()
            + self.attributes_size as usize
            + self.strings_size as usize
    }

    pub fn redirect_table_size(&self) -> usize {
        self.table_length as usize * std::mem::size_of::<i32>()
    }

    pub fn attribute_offsets_size(&self) -> usize {
        self.table_length as usize * std::mem::size_of::<u32>()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " Major Version:  {}", self.version.0)?;
        writeln!(f, " Minor Version:  {}", self.version.1)?;
        writeln!(f, " Flags:          {}", self.flags)?;
        writeln!(f, " Resource Count: {}", self.resource_count)?;
        writeln!(f, " Table Length:   {}", self.table_length)?;
        writeln!(f, " Offsets Size:   {}", self.attribute_offsets_size())?;
        writeln!(f, " Redirects Size: {}", self.redirect_table_size())?;
        writeln!(f, " Locations Size: {}", self.attributes_size)?;
        writeln!(f, " Strings Size:   {}", self.strings_size)?;
        writeln!(f, " Index Size:     {}", self.index_size())?;

        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct Index<'a> {
    redirect_table: Vec<i32>,
    attribute_offsets: Vec<u32>,
    strings_data: &'a [u8],
    attribute_data: &'a [u8],
}
impl Index<'_> {
    fn attributes(&self, entry: usize) -> Result<Attributes> {
        let data = self
            .attribute_offsets
            .get(entry)
            .and_then(|offset| self.attribute_data.get(*offset as usize..))
            .ok_or(JImageError::InvalidLocation(entry))?;

        Parser::<NativeEndian>::new(data).parse_attributes()
    }
}

/// A JDK module image (`lib/modules`) mapped or read into memory.
///
/// Resources are handed out as slices of the image; nothing is copied.
pub struct Archive<'a> {
    buf: &'a [u8],
    header: Header,
    index: Index<'a>,
    resource_data_start: usize,
}
impl<'a> Archive<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        let archive = Parser::<NativeEndian>::new(buf).parse_archive()?;
        debug!(
            "Parsed module image: {} resources, {} bytes of index",
            archive.header.resource_count,
            archive.header.index_size()
        );
        Ok(archive)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn resources(&self) -> Resources<'_> {
        Resources {
            archive: self,
            index: 0,
        }
    }

    /// Class file resources of every module, `module-info` included.
    pub fn classes(&self) -> impl Iterator<Item = Resource<'_>> {
        self.resources().filter(|r| r.is_class())
    }

    /// Looks up a resource by its full name, e.g. `/java.base/java/lang/Object.class`.
    pub fn by_name(&self, path: &str) -> Option<Resource<'_>> {
        let table_length = self.index.redirect_table.len() as i32;
        if table_length == 0 {
            return None;
        }

        let index = hash(path, HASH_MULTIPLIER) % table_length;
        let value = self.index.redirect_table[index as usize];
        let entry = match value {
            0 => return None,
            seed if seed > 0 => hash(path, seed) % table_length,
            _ => -1 - value,
        };

        let attributes = self.index.attributes(entry as usize).ok()?;
        let resource = Resource {
            archive: self,
            attributes,
        };

        resource.matches(path).then_some(resource)
    }

    /// Looks up the class `class_name` (internal form, e.g. `java/lang/Object`) in `module`.
    pub fn by_class(&self, module: &str, class_name: &str) -> Option<Resource<'_>> {
        self.by_name(&format!("/{module}/{class_name}.class"))
    }
}

fn hash(data: &str, seed: i32) -> i32 {
    let hash_code = data.bytes().fold(seed as u32, |useed, byte| {
        (useed.wrapping_mul(HASH_MULTIPLIER as u32)) ^ byte as u32
    });
    (hash_code & 0x7fff_ffff) as i32
}

pub struct Resources<'a> {
    archive: &'a Archive<'a>,
    index: usize,
}
impl<'a> Iterator for Resources<'a> {
    type Item = Resource<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.archive.index.redirect_table.len() {
            let entry = self.index;
            self.index += 1;

            match self.archive.index.attributes(entry) {
                Ok(attributes) => {
                    return Some(Resource {
                        archive: self.archive,
                        attributes,
                    })
                }
                Err(e) => warn!("Skipping image entry {entry}: {e}"),
            }
        }
        None
    }
}

pub struct Resource<'a> {
    attributes: Attributes,
    archive: &'a Archive<'a>,
}
impl fmt::Debug for Resource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.full_name())
            .field("attributes", &self.attributes)
            .finish()
    }
}
impl fmt::Display for Resource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(module) = self.try_string(AttributeKind::Module) {
            write!(f, "/{module}/")?;
        }
        if let Some(parent) = self.try_string(AttributeKind::Parent) {
            write!(f, "{parent}/")?;
        }
        if let Some(base) = self.try_string(AttributeKind::Base) {
            f.write_str(base)?;
        }
        if let Some(extension) = self.try_string(AttributeKind::Extension) {
            write!(f, ".{extension}")?;
        }
        Ok(())
    }
}
impl<'a> Resource<'a> {
    pub fn module(&self) -> &str {
        self.string_at(AttributeKind::Module)
    }

    pub fn parent(&self) -> &str {
        self.string_at(AttributeKind::Parent)
    }

    pub fn base(&self) -> &str {
        self.string_at(AttributeKind::Base)
    }

    pub fn extension(&self) -> &str {
        self.string_at(AttributeKind::Extension)
    }

    pub fn offset(&self) -> usize {
        self.attribute(AttributeKind::Offset) as usize
    }

    pub fn size(&self) -> usize {
        self.attribute(AttributeKind::Uncompressed) as usize
    }

    pub fn is_compressed(&self) -> bool {
        self.attribute(AttributeKind::Compressed) != 0
    }

    /// Real modules only; the `modules` and `packages` pseudo modules hold
    /// image metadata.
    pub fn is_class(&self) -> bool {
        self.extension() == "class" && !matches!(self.module(), "" | "modules" | "packages")
    }

    /// Internal class name, e.g. `java/lang/Object`.
    pub fn class_name(&self) -> String {
        match self.parent() {
            "" => self.base().to_owned(),
            parent => format!("{parent}/{}", self.base()),
        }
    }

    pub fn bytes(&self) -> Result<&'a [u8]> {
        if self.is_compressed() {
            return Err(JImageError::CompressedResource(self.full_name()));
        }

        let offset = self.archive.resource_data_start + self.offset();
        let size = self.size();
        offset
            .checked_add(size)
            .and_then(|end| self.archive.buf.get(offset..end))
            .ok_or_else(|| JImageError::ResourceOutOfBounds {
                name: self.full_name(),
                offset,
                size,
            })
    }

    /// `/module/parent/base.extension`, leaving out the parts a resource does not have.
    pub fn full_name(&self) -> String {
        self.to_string()
    }

    fn matches(&self, path: &str) -> bool {
        self.strip_name(path) == Some("")
    }

    fn strip_name<'p>(&self, path: &'p str) -> Option<&'p str> {
        let path = match self.module() {
            "" => path,
            module => path
                .strip_prefix('/')?
                .strip_prefix(module)?
                .strip_prefix('/')?,
        };
        let path = match self.parent() {
            "" => path,
            parent => path.strip_prefix(parent)?.strip_prefix('/')?,
        };
        let path = path.strip_prefix(self.base())?;
        match self.extension() {
            "" => Some(path),
            extension => path.strip_prefix('.')?.strip_prefix(extension),
        }
    }

    fn string_at(&self, attribute_kind: AttributeKind) -> &str {
        self.try_string(attribute_kind).unwrap_or_default()
    }

    fn attribute(&self, attribute_kind: AttributeKind) -> u64 {
        self.attributes[attribute_kind as usize]
    }

    fn try_string(&self, attribute_kind: AttributeKind) -> Option<&str> {
        let offset = self.attribute(attribute_kind) as usize;
        let bytes = self
            .archive
            .index
            .strings_data
            .get(offset..)?
            .split(|n| *n == 0)
            .next()?;

        if bytes.is_empty() {
            return None;
        }

        std::str::from_utf8(bytes).ok()
    }
}

#[cfg(test)]
mod hash_tests {
    use super::*;

    #[test]
    fn it_should_stay_positive() {
        for name in ["", "/java.base/java/lang/Object.class", "\u{ff}\u{ff}\u{ff}"] {
            assert!(hash(name, HASH_MULTIPLIER) >= 0);
        }
    }

    #[test]
    fn it_should_depend_on_the_seed() {
        assert_ne!(hash("a", HASH_MULTIPLIER), hash("a", 7));
    }
}
