use std::{convert::TryFrom, marker::PhantomData};

use byteorder::ByteOrder;

use crate::{
    archive::{AttributeKind, Attributes, Header, Index, HEADER_SIZE},
    Archive, JImageError, Result,
};

const MAGIC: u32 = 0xCAFEDADA;

/// Reads an image in place. Tables are decoded, string and location data
/// stay borrowed from the image.
pub struct Parser<'a, E: ByteOrder> {
    buf: &'a [u8],
    position: usize,
    phantom: PhantomData<E>,
}

impl<'a, E: ByteOrder> Parser<'a, E> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            position: 0,
            phantom: PhantomData,
        }
    }

    pub(crate) fn parse_archive(mut self) -> Result<Archive<'a>> {
        let header = self.parse_header()?;

        let available = self.buf.len();
        if header.index_size() > available {
            return Err(JImageError::Truncated {
                what: "index",
                needed: header.index_size(),
                available,
            });
        }
        let index = self.parse_index(&header)?;

        Ok(Archive {
            buf: self.buf,
            header,
            index,
            resource_data_start: self.position,
        })
    }

    fn parse_header(&mut self) -> Result<Header> {
        self.parse_magic_identifier()?;
        let version = self.parse_version()?;

        let header = Header {
            version,
            flags: self.read_u32()?,
            resource_count: self.read_u32()?,
            table_length: self.read_u32()?,
            attributes_size: self.read_u32()?,
            strings_size: self.read_u32()?,
        };
        debug_assert_eq!(self.position, HEADER_SIZE);

        Ok(header)
    }

    fn parse_index(&mut self, header: &Header) -> Result<Index<'a>> {
        let table_length = header.table_length as usize;

        let mut redirect_table = vec![0i32; table_length];
        E::read_i32_into(
            self.take("redirect table", header.redirect_table_size())?,
            &mut redirect_table,
        );

        let mut attribute_offsets = vec![0u32; table_length];
        E::read_u32_into(
            self.take("location offsets", header.attribute_offsets_size())?,
            &mut attribute_offsets,
        );

        let attribute_data = self.take("locations", header.attributes_size as usize)?;
        let strings_data = self.take("strings", header.strings_size as usize)?;

        Ok(Index {
            redirect_table,
            attribute_offsets,
            attribute_data,
            strings_data,
        })
    }

    /// Decodes one location: attributes up to the end marker, each a header
    /// byte (kind in the upper five bits, length minus one in the lower
    /// three) followed by a big-endian value.
    pub(crate) fn parse_attributes(&mut self) -> Result<Attributes> {
        let mut attributes = [0; AttributeKind::Total as usize];
        while let Some((kind, value)) = self.parse_attribute()? {
            attributes[kind as usize] = value;
        }

        Ok(attributes)
    }

    fn parse_attribute(&mut self) -> Result<Option<(AttributeKind, u64)>> {
        let header_byte = self.read_u8()?;
        let kind = header_byte >> 3;
        if kind == 0 {
            return Ok(None);
        }

        let kind = AttributeKind::try_from(kind).map_err(JImageError::InvalidAttributeKind)?;
        let length = usize::from(header_byte & 0x7) + 1;
        let value = self
            .take("location attribute", length)?
            .iter()
            .fold(0u64, |acc, b| acc << 8 | u64::from(*b));

        Ok(Some((kind, value)))
    }

    fn parse_magic_identifier(&mut self) -> Result<()> {
        match self.read_u32()? {
            MAGIC => Ok(()),
            magic_identifier => Err(JImageError::InvalidMagicIdentifier(magic_identifier)),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.read_u16()?;
        let major = self.read_u16()?;
        Ok((major, minor))
    }

    fn take(&mut self, what: &'static str, length: usize) -> Result<&'a [u8]> {
        let available = self.buf.len() - self.position;
        if length > available {
            return Err(JImageError::Truncated {
                what,
                needed: length,
                available,
            });
        }

        let bytes = &self.buf[self.position..self.position + length];
        self.position += length;
        Ok(bytes)
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(E::read_u32(self.take("header", 4)?))
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(E::read_u16(self.take("header", 2)?))
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take("location attribute", 1)?[0])
    }
}

#[cfg(test)]
mod parse_magic_identifier_tests {
    use byteorder::LittleEndian;

    use super::*;

    #[test]
    fn it_should_be_able_to_parse_the_correct_identifier() {
        assert!(Parser::<LittleEndian>::new(&[0xda, 0xda, 0xfe, 0xca])
            .parse_magic_identifier()
            .is_ok());
    }

    #[test]
    fn it_should_fail_if_there_is_not_enough_data() {
        assert!(matches!(
            Parser::<LittleEndian>::new(&[0xca, 0xfe, 0xda]).parse_magic_identifier(),
            Err(JImageError::Truncated {
                needed: 4,
                available: 3,
                ..
            })
        ));
    }

    #[test]
    fn it_should_fail_if_the_magic_identifier_is_incorrect() {
        assert!(matches!(
            Parser::<LittleEndian>::new(&[0xda, 0xda, 0xfe, 0xcb]).parse_magic_identifier(),
            Err(JImageError::InvalidMagicIdentifier(0xCBFEDADA))
        ));
    }
}


#[cfg(test)]
mod parse_attribute_tests {
    use byteorder::LittleEndian;

    use super::*;

    #[test]
    fn it_should_read_values_big_endian_whatever_the_image_order() {
        assert_eq!(
            Parser::<LittleEndian>::new(&[0x22, 0x03, 0x35, 0x62])
                .parse_attribute()
                .unwrap(),
            Some((AttributeKind::Extension, 0x33562))
        );
    }

    #[test]
    fn it_should_fail_on_a_cut_off_value() {
        assert!(matches!(
            Parser::<LittleEndian>::new(&[0x22, 0x03, 0x35]).parse_attribute(),
            Err(JImageError::Truncated { needed: 3, available: 2, .. })
        ));
    }

    #[test]
    fn it_should_reject_unknown_kinds() {
        assert!(matches!(
            Parser::<LittleEndian>::new(&[0x40, 0x01]).parse_attribute(),
            Err(JImageError::InvalidAttributeKind(8))
        ));
    }

    #[test]
    fn it_should_collect_attributes_up_to_the_end_marker() {
        let data = [0x08, 0x01, 0x39, 0x01, 0x00, 0x00, 0x18, 0x05];
        let attributes = Parser::<LittleEndian>::new(&data)
            .parse_attributes()
            .unwrap();

        assert_eq!(attributes[AttributeKind::Module as usize], 1);
        assert_eq!(attributes[AttributeKind::Uncompressed as usize], 0x100);
        assert_eq!(attributes[AttributeKind::Base as usize], 0);
    }
}

#[cfg(test)]
mod parse_archive_tests {
    use byteorder::LittleEndian;

    use super::*;

    fn header(table_length: u32, attributes_size: u32, strings_size: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC.to_le_bytes());
        bytes.extend_from_slice(&[0x00, 0x00, 0x01, 0x00]);
        for word in [0, 0, table_length, attributes_size, strings_size] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn it_should_refuse_an_index_larger_than_the_image() {
        let mut image = header(0, 2, 8);
        image.extend_from_slice(&[0x00, 0x00, 0x61, 0x00]);

        assert!(matches!(
            Parser::<LittleEndian>::new(&image).parse_archive(),
            Err(JImageError::Truncated { what: "index", needed: 38, available: 32 })
        ));
    }

    #[test]
    fn it_should_start_resources_after_the_index() {
        let mut image = header(0, 1, 2);
        image.extend_from_slice(&[0x00, 0x00, 0x61, 0xff, 0xff]);

        let archive = Parser::<LittleEndian>::new(&image).parse_archive().unwrap();
        assert_eq!(archive.resource_data_start, HEADER_SIZE + 3);
        assert_eq!(archive.index.strings_data, &[0x00, 0x61]);
    }
}
