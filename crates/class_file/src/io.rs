//! Counting big-endian readers and writers.
//!
//! Both sides keep a running byte count so that callers can compute the
//! alignment of padded instructions from the position in the stream.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::Result;

type Endian = BigEndian;

pub struct Input<R> {
    r: R,
    position: u64,
}
impl<R: Read> Input<R> {
    pub fn new(r: R) -> Self {
        Self { r, position: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let value = self.r.read_u8()?;
        self.position += 1;
        Ok(value)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        let value = self.r.read_i8()?;
        self.position += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let value = self.r.read_u16::<Endian>()?;
        self.position += 2;
        Ok(value)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let value = self.r.read_i16::<Endian>()?;
        self.position += 2;
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let value = self.r.read_u32::<Endian>()?;
        self.position += 4;
        Ok(value)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let value = self.r.read_i32::<Endian>()?;
        self.position += 4;
        Ok(value)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let value = self.r.read_u64::<Endian>()?;
        self.position += 8;
        Ok(value)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let value = self.r.read_i64::<Endian>()?;
        self.position += 8;
        Ok(value)
    }

    /// Reads exactly `length` bytes.
    ///
    /// The buffer grows with the data actually available, so a bogus length
    /// in a malformed file does not allocate up front.
    pub fn read_bytes(&mut self, length: u32) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let read = (&mut self.r)
            .take(u64::from(length))
            .read_to_end(&mut bytes)?;
        self.position += read as u64;

        if read < length as usize {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(bytes)
    }

    /// Reads everything up to the end of the source.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.position += self.r.read_to_end(&mut bytes)? as u64;
        Ok(bytes)
    }

    pub fn skip(&mut self, length: u32) -> Result<()> {
        let skipped = io::copy(&mut (&mut self.r).take(u64::from(length)), &mut io::sink())?;
        self.position += skipped;

        if skipped < u64::from(length) {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(())
    }
}

pub struct Output<W> {
    w: W,
    position: u64,
}
impl<W: Write> Output<W> {
    pub fn new(w: W) -> Self {
        Self { w, position: 0 }
    }

    /// Number of bytes emitted so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.w.write_u8(value)?;
        self.position += 1;
        Ok(())
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.w.write_i8(value)?;
        self.position += 1;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.w.write_u16::<Endian>(value)?;
        self.position += 2;
        Ok(())
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.w.write_i16::<Endian>(value)?;
        self.position += 2;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.w.write_u32::<Endian>(value)?;
        self.position += 4;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.w.write_i32::<Endian>(value)?;
        self.position += 4;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.w.write_u64::<Endian>(value)?;
        self.position += 8;
        Ok(())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.w.write_i64::<Endian>(value)?;
        self.position += 8;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.w.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.w.flush()?)
    }
}


#[cfg(test)]
mod output_tests {
    use super::*;

    #[test]
    fn it_should_write_big_endian_values_and_count_bytes() {
        let mut output = Output::new(Vec::new());

        output.write_u32(0xCAFEBABE).unwrap();
        output.write_i16(-2).unwrap();
        output.write_bytes(&[7, 8]).unwrap();

        assert_eq!(output.position(), 8);
        assert_eq!(
            output.into_inner(),
            vec![0xCA, 0xFE, 0xBA, 0xBE, 0xFF, 0xFE, 7, 8]
        );
    }
}
