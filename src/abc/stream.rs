//! Bounds-checked reader over an in-memory ABC byte buffer

use crate::error::DecodeError;

/// Longest encoding of a variable-length integer
const MAX_VARINT_BYTES: usize = 5;

/// Byte reader with bounds checking.
///
/// Every read either consumes exactly the bytes it needs or fails with
/// [`DecodeError::UnexpectedEof`] without advancing.
pub struct AbcReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> AbcReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the buffer
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Remaining bytes
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    fn eof(&self, needed: usize) -> DecodeError {
        DecodeError::UnexpectedEof {
            offset: self.pos,
            needed: needed.saturating_sub(self.remaining()),
        }
    }

    /// Read exactly `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(n).ok_or_else(|| self.eof(n))?;
        let bytes = self.data.get(self.pos..end).ok_or_else(|| self.eof(n))?;
        self.pos = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    /// Little-endian u16
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Little-endian IEEE-754 double
    pub fn read_d64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Variable-length integer: 7 bits per byte, low group first, high bit
    /// set on every byte but the last. Returns the value and its length.
    fn read_varint(&mut self) -> Result<(u32, usize), DecodeError> {
        let start = self.pos;
        let mut result: u32 = 0;
        for i in 0..MAX_VARINT_BYTES {
            let byte = match self.read_u8() {
                Ok(byte) => byte,
                Err(err) => {
                    self.pos = start;
                    return Err(err);
                }
            };
            result |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok((result, i + 1));
            }
        }
        self.pos = start;
        Err(DecodeError::VarintTooLong { offset: start })
    }

    /// Unsigned 30-bit integer (counts and indices)
    pub fn read_u30(&mut self) -> Result<u32, DecodeError> {
        Ok(self.read_varint()?.0)
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(self.read_varint()?.0)
    }

    /// Signed 32-bit integer, sign-extended from the last encoded bit
    pub fn read_s32(&mut self) -> Result<i32, DecodeError> {
        let (value, len) = self.read_varint()?;
        if len < MAX_VARINT_BYTES {
            let shift = 32 - 7 * len as u32;
            Ok(((value << shift) as i32) >> shift)
        } else {
            Ok(value as i32)
        }
    }

    /// Length-prefixed byte string
    pub fn read_string(&mut self) -> Result<&'a [u8], DecodeError> {
        let offset = self.pos;
        let len = self.read_u30()?;
        if len as usize > self.remaining() {
            self.pos = offset;
            return Err(DecodeError::LengthTooLarge { offset, len });
        }
        self.read_bytes(len as usize)
    }

    /// Read a record count, returning it with a capacity hint that never
    /// exceeds what the remaining input could hold.
    pub fn read_count(&mut self) -> Result<(usize, usize), DecodeError> {
        let count = self.read_u30()? as usize;
        Ok((count, count.min(self.remaining())))
    }
}
