use byteorder::{ByteOrder, LittleEndian};

use super::encoding::VarWidth;
use crate::error::{Error, Result};

/// Cursor over a borrowed byte slice.
///
/// Offsets reported in errors are absolute: a reader carved out of another
/// with [`Reader::sub_reader`] remembers where its slice started.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    origin: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Reader<'a> {
        Reader {
            bytes,
            pos: 0,
            origin: 0,
        }
    }

    pub fn with_origin(bytes: &'a [u8], origin: usize) -> Reader<'a> {
        Reader {
            bytes,
            pos: 0,
            origin,
        }
    }
}

impl<'a> Reader<'a> {
    // Basic operations --------------------------------------------------------

    /// Position relative to the start of this reader's slice.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Absolute offset of the next byte.
    pub fn offset(&self) -> usize {
        self.origin + self.pos
    }

    fn end_offset(&self) -> usize {
        self.origin + self.bytes.len()
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn has_at_least(&self, count: usize) -> bool {
        self.remaining() >= count
    }

    pub fn peek_byte(&self) -> Result<u8> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or(Error::UnexpectedEndOfInput {
                offset: self.offset(),
            })
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        let byte = self.peek_byte()?;
        self.pos += 1;
        Ok(byte)
    }

    /// Reads one byte and fails unless it is `expected`.
    pub fn expect_byte(&mut self, expected: u8) -> Result<()> {
        let offset = self.offset();
        let found = self.read_byte()?;
        if found != expected {
            return Err(Error::UnexpectedByte {
                offset,
                expected,
                found,
            });
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if !self.has_at_least(len) {
            return Err(Error::UnexpectedEndOfInput {
                offset: self.end_offset(),
            });
        }
        let bytes = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Consumes everything left in the reader.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let bytes = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        bytes
    }

    /// Splits off the next `len` bytes as an independent reader.
    pub fn sub_reader(&mut self, len: usize) -> Result<Reader<'a>> {
        let origin = self.offset();
        let bytes = self.read_bytes(len)?;
        Ok(Reader::with_origin(bytes, origin))
    }

    /// Fails if any bytes have not been consumed.
    pub fn finish(&self) -> Result<()> {
        if !self.is_empty() {
            return Err(Error::TrailingInput {
                offset: self.offset(),
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    // Read and interpret types ------------------------------------------------

    fn read_leb_unsigned(&mut self, bits: u32) -> Result<(u64, u8)> {
        let start = self.offset();
        let max_len = (bits + 6) / 7;
        let mut result: u64 = 0;
        let mut shift = 0u32;
        let mut width = 0u8;
        loop {
            let byte = self.read_byte()?;
            width += 1;
            let payload = (byte & 0x7f) as u64;
            if width as u32 == max_len {
                let used = bits - shift;
                if byte & 0x80 != 0 || (used < 7 && payload >> used != 0) {
                    return Err(Error::MalformedVarint { offset: start });
                }
            }
            result |= payload << shift;
            if byte & 0x80 == 0 {
                return Ok((result, width));
            }
            shift += 7;
        }
    }

    fn read_leb_signed(&mut self, bits: u32) -> Result<(i64, u8)> {
        let start = self.offset();
        let max_len = (bits + 6) / 7;
        let mut result: i64 = 0;
        let mut shift = 0u32;
        let mut width = 0u32;
        loop {
            let byte = self.read_byte()?;
            width += 1;
            if width == max_len {
                if byte & 0x80 != 0 {
                    return Err(Error::MalformedVarint { offset: start });
                }
                // the bits above the value width must all copy the sign bit
                let used = bits - shift;
                let high = (byte & 0x7f) >> (used - 1);
                if high != 0 && high != (0x7f >> (used - 1)) {
                    return Err(Error::MalformedVarint { offset: start });
                }
            }
            result |= ((byte & 0x7f) as i64) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                if shift < 64 && byte & 0x40 != 0 {
                    result |= -1i64 << shift;
                }
                return Ok((result, width as u8));
            }
        }
    }

    pub fn read_vu32(&mut self) -> Result<u32> {
        Ok(self.read_leb_unsigned(32)?.0 as u32)
    }

    /// Reads an unsigned LEB128 u32 and also returns how many bytes it used.
    pub fn read_vu32_with_width(&mut self) -> Result<(u32, u8)> {
        let (value, width) = self.read_leb_unsigned(32)?;
        Ok((value as u32, width))
    }

    pub fn read_vs32(&mut self) -> Result<i32> {
        Ok(self.read_leb_signed(32)?.0 as i32)
    }

    pub fn read_vs64(&mut self) -> Result<i64> {
        Ok(self.read_leb_signed(64)?.0)
    }

    /// Reads a u32 along with the width needed to write it back unchanged.
    pub fn read_var_u32(&mut self) -> Result<(u32, VarWidth)> {
        let (value, width) = self.read_vu32_with_width()?;
        Ok((value, VarWidth::of_u32(value, width)))
    }

    pub fn read_var_s32(&mut self) -> Result<(i32, VarWidth)> {
        let (value, width) = self.read_leb_signed(32)?;
        let value = value as i32;
        Ok((value, VarWidth::of_s32(value, width)))
    }

    pub fn read_var_s64(&mut self) -> Result<(i64, VarWidth)> {
        let (value, width) = self.read_leb_signed(64)?;
        Ok((value, VarWidth::of_s64(value, width)))
    }

    /// Reads the raw bit pattern of an f32, leaving NaN payloads untouched.
    pub fn read_f32_bits(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_f64_bits(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    /// Reads a u32 length followed by that many raw bytes.
    pub fn read_byte_vec(&mut self) -> Result<(&'a [u8], VarWidth)> {
        let (len, width) = self.read_var_u32()?;
        Ok((self.read_bytes(len as usize)?, width))
    }

    /// Reads a vector element count, rejecting counts above `limit` and counts
    /// that could not possibly fit in the bytes left.
    pub fn read_count(&mut self, limit: u32, what: &'static str) -> Result<u32> {
        Ok(self.read_count_var(limit, what)?.0)
    }

    /// [`Reader::read_count`], also returning the width of the count field.
    pub fn read_count_var(&mut self, limit: u32, what: &'static str) -> Result<(u32, VarWidth)> {
        let (count, width) = self.read_var_u32()?;
        if count > limit {
            return Err(Error::LimitExceeded {
                what,
                count,
                limit,
            });
        }
        if count as usize > self.remaining() {
            return Err(Error::UnexpectedEndOfInput {
                offset: self.end_offset(),
            });
        }
        Ok((count, width))
    }
}

#[test]
fn test_read_vu32() {
    let read = |v: Vec<u8>| -> u32 {
        let mut reader = Reader::new(&v);
        reader.read_vu32().expect("Failed to read vu32")
    };

    assert_eq!(read(vec![0x00]), 0);
    assert_eq!(read(vec![0x01]), 1);
    assert_eq!(read(vec![0x7f]), 127);
    assert_eq!(read(vec![0x80, 0x01]), 128);
    assert_eq!(read(vec![0xe5, 0x8e, 0x26]), 624485);
    assert_eq!(read(vec![0x90, 0xce, 0x00]), 10000);
    assert_eq!(read(vec![0x80, 0x80, 0x80, 0x80, 0x00]), 0);
    assert_eq!(read(vec![0xff, 0xff, 0xff, 0xff, 0x0f]), u32::MAX);
}

#[test]
fn test_read_vu32_with_width() {
    let mut reader = Reader::new(&[0x85, 0x80, 0x80, 0x80, 0x00, 0x05]);
    assert_eq!(reader.read_vu32_with_width().unwrap(), (5, 5));
    assert_eq!(reader.read_vu32_with_width().unwrap(), (5, 1));
    assert!(reader.is_empty());
}

#[test]
fn test_read_vu32_malformed() {
    let read = |v: Vec<u8>| {
        let mut reader = Reader::new(&v);
        reader.read_vu32()
    };

    // continuation bit on the fifth group
    assert!(matches!(
        read(vec![0x80, 0x80, 0x80, 0x80, 0x80, 0x00]),
        Err(Error::MalformedVarint { offset: 0 })
    ));
    // value needs more than 32 bits
    assert!(matches!(
        read(vec![0xff, 0xff, 0xff, 0xff, 0x1f]),
        Err(Error::MalformedVarint { offset: 0 })
    ));
    assert!(matches!(
        read(vec![0xe5, 0x8e]),
        Err(Error::UnexpectedEndOfInput { offset: 2 })
    ));
}

#[test]
fn test_read_vs32() {
    let read = |v: Vec<u8>| -> i32 {
        let mut reader = Reader::new(&v);
        reader.read_vs32().expect("Failed to read vs32")
    };

    assert_eq!(read(vec![0x00]), 0);
    assert_eq!(read(vec![0x7f]), -1);
    assert_eq!(read(vec![0x3f]), 63);
    assert_eq!(read(vec![0x40]), -64);
    assert_eq!(read(vec![0x80, 0x7f]), -128);
    assert_eq!(read(vec![0x9b, 0xf1, 0x59]), -624485);
    assert_eq!(read(vec![0x90, 0xce, 0x00]), 10000);
    assert_eq!(read(vec![0xff, 0xff, 0xff, 0xff, 0x07]), i32::MAX);
    assert_eq!(read(vec![0x80, 0x80, 0x80, 0x80, 0x78]), i32::MIN);
}

#[test]
fn test_read_vs32_malformed() {
    let mut reader = Reader::new(&[0xff, 0xff, 0xff, 0xff, 0x4f]);
    assert!(matches!(
        reader.read_vs32(),
        Err(Error::MalformedVarint { .. })
    ));
}

#[test]
fn test_read_vs64() {
    let read = |v: Vec<u8>| -> i64 {
        let mut reader = Reader::new(&v);
        reader.read_vs64().expect("Failed to read vs64")
    };

    assert_eq!(read(vec![0x7f]), -1);
    assert_eq!(read(vec![0x80, 0x80, 0x80, 0x80, 0x08]), 0x8000_0000);
    assert_eq!(
        read(vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00]),
        i64::MAX
    );
    assert_eq!(
        read(vec![0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x7f]),
        i64::MIN
    );
}

#[test]
fn test_read_float_bits() {
    let mut reader = Reader::new(&[0x00, 0x00, 0x80, 0x3f]);
    assert_eq!(f32::from_bits(reader.read_f32_bits().unwrap()), 1.0);

    let bytes = (-2.5f64).to_le_bytes();
    let mut reader = Reader::new(&bytes);
    assert_eq!(f64::from_bits(reader.read_f64_bits().unwrap()), -2.5);

    let nan = 0x7fa0_0001u32.to_le_bytes();
    let mut reader = Reader::new(&nan);
    assert_eq!(reader.read_f32_bits().unwrap(), 0x7fa0_0001);
}

#[test]
fn test_read_var_widths() {
    let mut reader = Reader::new(&[0x80, 0x00, 0x00, 0xff, 0x7f, 0x41, 0x83, 0x80, 0x00, b'e', b'n', b'v']);
    assert_eq!(reader.read_var_u32().unwrap(), (0, VarWidth::Fixed(2)));
    assert_eq!(reader.read_var_u32().unwrap(), (0, VarWidth::Minimal));
    assert_eq!(reader.read_var_s32().unwrap(), (-1, VarWidth::Fixed(2)));
    assert_eq!(reader.read_var_s64().unwrap(), (-63, VarWidth::Minimal));
    assert_eq!(reader.read_byte_vec().unwrap(), (&b"env"[..], VarWidth::Fixed(3)));
    assert!(reader.is_empty());
}

#[test]
fn test_sub_reader_offsets() {
    let bytes = [0x01, 0x02, 0x03, 0x04];
    let mut reader = Reader::new(&bytes);
    reader.read_byte().unwrap();
    let mut sub = reader.sub_reader(2).unwrap();
    assert_eq!(sub.offset(), 1);
    assert_eq!(sub.read_byte().unwrap(), 0x02);
    assert!(matches!(
        sub.finish(),
        Err(Error::TrailingInput {
            offset: 2,
            remaining: 1
        })
    ));
    assert_eq!(reader.read_rest(), &[0x04]);
    assert!(matches!(
        reader.sub_reader(1),
        Err(Error::UnexpectedEndOfInput { offset: 4 })
    ));
}

#[test]
fn test_read_count_bounds() {
    let mut reader = Reader::new(&[0x03, 0x00]);
    assert!(matches!(
        reader.read_count(10, "type"),
        Err(Error::UnexpectedEndOfInput { offset: 2 })
    ));

    let mut reader = Reader::new(&[0x8b, 0x00]);
    assert!(matches!(
        reader.read_count_var(10, "type"),
        Err(Error::LimitExceeded {
            what: "type",
            count: 11,
            limit: 10
        })
    ));
}
