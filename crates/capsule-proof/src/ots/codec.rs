//! Byte-level reader/writer for the OpenTimestamps serialization.
//!
//! Integers are unsigned LEB128 ("varuint"); byte strings are a varuint
//! length followed by the bytes ("varbytes").

use crate::error::ProofError;

/// Cursor over a proof byte slice.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn read_byte(&mut self) -> Result<u8, ProofError> {
        let b = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| ProofError::Codec("unexpected end of proof".into()))?;
        self.pos += 1;
        Ok(b)
    }

    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ProofError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                ProofError::Codec(format!(
                    "unexpected end of proof: wanted {n} bytes at offset {}",
                    self.pos
                ))
            })?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub(crate) fn read_varuint(&mut self) -> Result<u64, ProofError> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let b = self.read_byte()?;
            if shift > 63 {
                return Err(ProofError::Codec("varuint overflow".into()));
            }
            value |= u64::from(b & 0x7f) << shift;
            if b & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    /// Read a length-prefixed byte string with `min..=max` length.
    pub(crate) fn read_varbytes(&mut self, min: usize, max: usize) -> Result<Vec<u8>, ProofError> {
        let len = usize::try_from(self.read_varuint()?)
            .map_err(|_| ProofError::Codec("length does not fit in memory".into()))?;
        if len < min || len > max {
            return Err(ProofError::Codec(format!(
                "varbytes length {len} outside {min}..={max}"
            )));
        }
        Ok(self.read_bytes(len)?.to_vec())
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub(crate) fn assert_eof(&self) -> Result<(), ProofError> {
        if self.is_eof() {
            Ok(())
        } else {
            Err(ProofError::Codec(format!(
                "{} trailing bytes after proof",
                self.buf.len() - self.pos
            )))
        }
    }
}

pub(crate) fn write_varuint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut b = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            b |= 0x80;
        }
        out.push(b);
        if value == 0 {
            return;
        }
    }
}

pub(crate) fn write_varbytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_varuint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}
