// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Little-endian encode/decode cursors and the codec traits.
//!
//! [`Encoder`] appends to a growable buffer; [`Decoder`] walks a borrowed
//! slice and reports truncation with the offset at which it occurred.
//! Strings and byte strings use the UA `i32` length prefix with `-1` as the
//! null marker. Arrays use an `i32` element count; a `-1` (null) array
//! decodes as empty.

use crate::error::DecodingError;

// =============================================================================
// Traits
// =============================================================================

/// A value that can be appended to an [`Encoder`] in UA binary form.
pub trait BinaryEncode {
    /// Appends the binary form of `self`.
    fn encode(&self, w: &mut Encoder);
}

/// A value that can be read from a [`Decoder`] in UA binary form.
pub trait BinaryDecode: Sized {
    /// Reads one value, advancing the cursor.
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError>;
}

// =============================================================================
// Encoder
// =============================================================================

/// Append-only little-endian byte sink.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an encoder with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    /// Consumes the encoder and returns the bytes written.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends raw bytes verbatim.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Appends a single byte.
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Appends a boolean as one byte.
    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    /// Appends an `i8`.
    pub fn write_i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    /// Appends a `u16`.
    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends an `i16`.
    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends a `u32`.
    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends an `i32`.
    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends a `u64`.
    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends an `i64`.
    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends an `f32`.
    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends an `f64`.
    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends a nullable UTF-8 string with the `i32` length prefix.
    pub fn write_str(&mut self, v: Option<&str>) {
        match v {
            Some(s) => {
                self.write_i32(s.len() as i32);
                self.buf.extend_from_slice(s.as_bytes());
            }
            None => self.write_i32(-1),
        }
    }

    /// Appends a nullable byte string with the `i32` length prefix.
    pub fn write_byte_string(&mut self, v: Option<&[u8]>) {
        match v {
            Some(b) => {
                self.write_i32(b.len() as i32);
                self.buf.extend_from_slice(b);
            }
            None => self.write_i32(-1),
        }
    }

    /// Appends an array of encodable values with the `i32` element count.
    pub fn write_array<T: BinaryEncode>(&mut self, items: &[T]) {
        self.write_i32(items.len() as i32);
        for item in items {
            item.encode(self);
        }
    }

    /// Appends an array of nullable strings.
    pub fn write_str_array(&mut self, items: &[String]) {
        self.write_i32(items.len() as i32);
        for item in items {
            self.write_str(Some(item));
        }
    }
}

// =============================================================================
// Decoder
// =============================================================================

/// Forward-only little-endian cursor over a borrowed slice.
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder over `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns the current offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns `true` if the cursor has consumed the whole slice.
    pub fn is_exhausted(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodingError> {
        if self.remaining() < n {
            return Err(DecodingError::UnexpectedEof {
                needed: n - self.remaining(),
                offset: self.pos,
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Reads `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodingError> {
        self.take(n)
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8, DecodingError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a boolean; any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> Result<bool, DecodingError> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads an `i8`.
    pub fn read_i8(&mut self) -> Result<i8, DecodingError> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads a `u16`.
    pub fn read_u16(&mut self) -> Result<u16, DecodingError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Reads an `i16`.
    pub fn read_i16(&mut self) -> Result<i16, DecodingError> {
        Ok(self.read_u16()? as i16)
    }

    /// Reads a `u32`.
    pub fn read_u32(&mut self) -> Result<u32, DecodingError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads an `i32`.
    pub fn read_i32(&mut self) -> Result<i32, DecodingError> {
        Ok(self.read_u32()? as i32)
    }

    /// Reads a `u64`.
    pub fn read_u64(&mut self) -> Result<u64, DecodingError> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_le_bytes(arr))
    }

    /// Reads an `i64`.
    pub fn read_i64(&mut self) -> Result<i64, DecodingError> {
        Ok(self.read_u64()? as i64)
    }

    /// Reads an `f32`.
    pub fn read_f32(&mut self) -> Result<f32, DecodingError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Reads an `f64`.
    pub fn read_f64(&mut self) -> Result<f64, DecodingError> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    fn read_len_prefix(&mut self) -> Result<Option<usize>, DecodingError> {
        let offset = self.pos;
        let len = self.read_i32()?;
        if len < 0 {
            if len == -1 {
                return Ok(None);
            }
            return Err(DecodingError::InvalidLength { len: len.into(), offset });
        }
        let len = len as usize;
        if len > self.remaining() {
            return Err(DecodingError::InvalidLength { len: len as i64, offset });
        }
        Ok(Some(len))
    }

    /// Reads a nullable UTF-8 string.
    pub fn read_str(&mut self) -> Result<Option<String>, DecodingError> {
        match self.read_len_prefix()? {
            None => Ok(None),
            Some(len) => {
                let bytes = self.take(len)?;
                let s = std::str::from_utf8(bytes).map_err(|_| DecodingError::InvalidUtf8)?;
                Ok(Some(s.to_owned()))
            }
        }
    }

    /// Reads a nullable byte string.
    pub fn read_byte_string(&mut self) -> Result<Option<Vec<u8>>, DecodingError> {
        match self.read_len_prefix()? {
            None => Ok(None),
            Some(len) => Ok(Some(self.take(len)?.to_vec())),
        }
    }

    /// Reads an array of decodable values. A null array (`-1`) decodes
    /// as empty.
    pub fn read_array<T: BinaryDecode>(&mut self) -> Result<Vec<T>, DecodingError> {
        let offset = self.pos;
        let count = self.read_i32()?;
        if count < 0 {
            if count == -1 {
                return Ok(Vec::new());
            }
            return Err(DecodingError::InvalidLength { len: count.into(), offset });
        }
        let count = count as usize;
        // Each element is at least one byte; reject counts the buffer
        // cannot possibly satisfy before allocating.
        if count > self.remaining() {
            return Err(DecodingError::InvalidLength { len: count as i64, offset });
        }
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(T::decode(self)?);
        }
        Ok(out)
    }

    /// Reads an array of nullable strings, flattening nulls to empty.
    pub fn read_str_array(&mut self) -> Result<Vec<String>, DecodingError> {
        let offset = self.pos;
        let count = self.read_i32()?;
        if count < 0 {
            if count == -1 {
                return Ok(Vec::new());
            }
            return Err(DecodingError::InvalidLength { len: count.into(), offset });
        }
        let count = count as usize;
        if count > self.remaining() {
            return Err(DecodingError::InvalidLength { len: count as i64, offset });
        }
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read_str()?.unwrap_or_default());
        }
        Ok(out)
    }
}

// =============================================================================
// Blanket impls for primitives
// =============================================================================

impl BinaryEncode for u32 {
    fn encode(&self, w: &mut Encoder) {
        w.write_u32(*self);
    }
}

impl BinaryDecode for u32 {
    fn decode(r: &mut Decoder<'_>) -> Result<Self, DecodingError> {
        r.read_u32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_round_trip() {
        let mut w = Encoder::new();
        w.write_bool(true);
        w.write_u16(0xBEEF);
        w.write_i32(-7);
        w.write_f64(6_000_000.0);
        let bytes = w.into_bytes();

        let mut r = Decoder::new(&bytes);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_u16().unwrap(), 0xBEEF);
        assert_eq!(r.read_i32().unwrap(), -7);
        assert_eq!(r.read_f64().unwrap(), 6_000_000.0);
        assert!(r.is_exhausted());
    }

    #[test]
    fn null_string_marker() {
        let mut w = Encoder::new();
        w.write_str(None);
        w.write_str(Some(""));
        w.write_str(Some("foo"));
        let bytes = w.into_bytes();
        assert_eq!(&bytes[..4], &[0xff, 0xff, 0xff, 0xff]);

        let mut r = Decoder::new(&bytes);
        assert_eq!(r.read_str().unwrap(), None);
        assert_eq!(r.read_str().unwrap(), Some(String::new()));
        assert_eq!(r.read_str().unwrap(), Some("foo".to_owned()));
    }

    #[test]
    fn truncated_read_reports_offset() {
        let mut r = Decoder::new(&[0x01, 0x02]);
        let err = r.read_u32().unwrap_err();
        match err {
            DecodingError::UnexpectedEof { needed, offset } => {
                assert_eq!(needed, 2);
                assert_eq!(offset, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn hostile_length_prefix_rejected() {
        // Declares a 1 GiB string in a 6-byte buffer.
        let bytes = [0x00, 0x00, 0x00, 0x40, 0x61, 0x62];
        let mut r = Decoder::new(&bytes);
        assert!(matches!(r.read_str(), Err(DecodingError::InvalidLength { .. })));
    }

    #[test]
    fn null_array_decodes_empty() {
        let mut w = Encoder::new();
        w.write_i32(-1);
        let bytes = w.into_bytes();
        let mut r = Decoder::new(&bytes);
        let arr: Vec<u32> = r.read_array().unwrap();
        assert!(arr.is_empty());
    }
}
