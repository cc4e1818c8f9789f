use byteorder::{ByteOrder, LittleEndian};

use crate::parser::config::Utf8Policy;
use crate::parser::error::{ErrorKind, ParseError, Result};

/// A bounds-checked cursor over `[pos, end)` of a borrowed module buffer.
///
/// Positions are absolute offsets into the whole module, so errors raised by
/// a sub-reader already point at the right byte.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Reader<'a> {
        Reader {
            bytes,
            pos: 0,
            end: bytes.len(),
        }
    }
}

impl<'a> Reader<'a> {
    // Basic operations --------------------------------------------------------
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    pub fn eof(&self) -> ParseError {
        ParseError::new(ErrorKind::Eof, self.pos)
    }

    pub fn error(&self, kind: ErrorKind) -> ParseError {
        ParseError::new(kind, self.pos)
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        if self.pos >= self.end {
            return Err(self.eof());
        }
        let byte = self.bytes[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    pub fn peek_byte(&self) -> Option<u8> {
        if self.pos < self.end {
            Some(self.bytes[self.pos])
        } else {
            None
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(ParseError::with_range(ErrorKind::Eof, self.pos, self.end));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn skip_to_end(&mut self) {
        self.pos = self.end;
    }

    /// Splits off the next `len` bytes as their own reader and advances past
    /// them.
    pub fn sub_reader(&mut self, len: usize) -> Result<Reader<'a>> {
        if len > self.remaining() {
            return Err(ParseError::with_range(ErrorKind::Eof, self.pos, self.end));
        }
        let sub = Reader {
            bytes: self.bytes,
            pos: self.pos,
            end: self.pos + len,
        };
        self.pos += len;
        Ok(sub)
    }

    // Read and interpret types ------------------------------------------------

    // le
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.read_bytes(8)?))
    }

    pub fn read_v128(&mut self) -> Result<[u8; 16]> {
        let mut v = [0u8; 16];
        v.copy_from_slice(self.read_bytes(16)?);
        Ok(v)
    }

    pub fn read_vu32(&mut self) -> Result<u32> {
        self.read_unsigned(32).map(|v| v as u32)
    }

    pub fn read_vu64(&mut self) -> Result<u64> {
        self.read_unsigned(64)
    }

    pub fn read_vs32(&mut self) -> Result<i32> {
        self.read_signed(32).map(|v| v as i32)
    }

    pub fn read_vs64(&mut self) -> Result<i64> {
        self.read_signed(64)
    }

    /// Reads a length-prefixed name and validates it as UTF-8.
    pub fn read_name(&mut self, policy: Utf8Policy) -> Result<String> {
        let len = self.read_vu32()? as usize;
        let start = self.pos;
        let bytes = self.read_bytes(len)?;
        let name = std::str::from_utf8(bytes).map_err(|e| {
            ParseError::with_range(ErrorKind::InvalidUtf8, start + e.valid_up_to(), start + len)
        })?;
        if policy == Utf8Policy::ForbidNul {
            if let Some(at) = bytes.iter().position(|&b| b == 0) {
                return Err(ParseError::new(ErrorKind::NulInName, start + at));
            }
        }
        Ok(name.to_string())
    }

    pub fn read_u8vec(&mut self) -> Result<Vec<u8>> {
        let len = self.read_vu32()? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }

    // LEB128 ------------------------------------------------------------------

    // A `bits`-wide integer takes at most ceil(bits / 7) bytes. The last
    // permitted byte may not continue and may only carry the bits that fit.
    fn read_unsigned(&mut self, bits: u32) -> Result<u64> {
        let start = self.pos;
        let mut result: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let byte = self.read_byte()?;
            let available = bits - shift;
            if available < 7 {
                if byte & 0x80 != 0 {
                    return Err(ParseError::with_range(ErrorKind::MalformedLeb128, start, self.pos));
                }
                if (byte & 0x7f) >> available != 0 {
                    return Err(ParseError::with_range(ErrorKind::IntegerTooLarge, start, self.pos));
                }
                return Ok(result | (u64::from(byte) << shift));
            }
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    fn read_signed(&mut self, bits: u32) -> Result<i64> {
        let start = self.pos;
        let mut result: i64 = 0;
        let mut shift: u32 = 0;
        loop {
            let byte = self.read_byte()?;
            let available = bits - shift;
            if available < 7 {
                if byte & 0x80 != 0 {
                    return Err(ParseError::with_range(ErrorKind::MalformedLeb128, start, self.pos));
                }
                // the sign bit and every unused bit above it must agree
                let sign_and_unused = ((byte << 1) as i8) >> available;
                if sign_and_unused != 0 && sign_and_unused != -1 {
                    return Err(ParseError::with_range(ErrorKind::IntegerTooLarge, start, self.pos));
                }
                result |= i64::from(byte & 0x7f) << shift;
                if bits < 64 {
                    // sign extend from the top of the target width
                    let unused = 64 - bits;
                    result = (result << unused) >> unused;
                }
                return Ok(result);
            }
            result |= i64::from(byte & 0x7f) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                if byte & 0x40 != 0 {
                    result |= -1i64 << shift;
                }
                return Ok(result);
            }
        }
    }
}
