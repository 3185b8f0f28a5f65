// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Transport primitives: a linear cursor over one byte buffer.
//!
//! [`Parcel`] is the reference transport the framing layer runs on. It knows
//! nothing about envelopes, field headers, or schemas — it only moves a
//! cursor and reads/writes typed primitives in little-endian byte order:
//!
//! - fixed-width scalars (`i32`/`u32`/`i64`/`f32`/`f64`)
//! - length-prefixed UTF-8 strings and raw byte ranges (`u32` prefix)
//! - opaque 64-bit cross-process handles
//!
//! Writes at a cursor position before the end of the buffer overwrite in
//! place and the buffer grows as needed past the end; this is what lets the
//! framing layer reserve a header word and backfill it after the payload
//! length is known.
//!
//! A `Parcel` is single-call mutable state: one encode or decode pass owns
//! it exclusively. It is `Send` but deliberately not shared.

use core::str;

use bytes::Bytes;
use thiserror::Error;

/// Errors produced by the transport primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// A read of `requested` bytes at `offset` would pass the buffer end.
    #[error("read of {requested} bytes at offset {offset} exceeds buffer size {size}")]
    OutOfBounds {
        /// Cursor offset of the attempted read.
        offset: usize,
        /// Number of bytes requested.
        requested: usize,
        /// Total buffer size.
        size: usize,
    },
    /// A cursor reposition target lies past the buffer end.
    #[error("cursor position {requested} exceeds buffer size {size}")]
    BadPosition {
        /// Requested cursor position.
        requested: usize,
        /// Total buffer size.
        size: usize,
    },
    /// A string payload was not valid UTF-8.
    #[error("invalid utf-8 in string payload")]
    InvalidUtf8,
    /// A length does not fit the wire's `u32` length prefix.
    #[error("length {0} exceeds the u32 wire range")]
    LengthTooLarge(usize),
}

/// Opaque cross-process handle, passed through the format untouched.
///
/// The wire carries it as a fixed 64-bit token; what the token means is the
/// platform's business, not this crate's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Handle(pub u64);

/// Linear cursor over a growable byte buffer.
#[derive(Debug, Default)]
pub struct Parcel {
    buf: Vec<u8>,
    pos: usize,
}

impl Parcel {
    /// Creates an empty parcel positioned at offset 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty parcel with a pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            pos: 0,
        }
    }

    /// Creates a parcel over a copy of `bytes`, positioned at offset 0.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            buf: bytes.to_vec(),
            pos: 0,
        }
    }

    /// Total number of bytes in the buffer.
    #[must_use]
    pub fn data_size(&self) -> usize {
        self.buf.len()
    }

    /// Current cursor position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Repositions the cursor.
    ///
    /// # Errors
    /// Returns [`TransportError::BadPosition`] when `pos` lies past the end
    /// of the buffer.
    pub fn set_position(&mut self, pos: usize) -> Result<(), TransportError> {
        if pos > self.buf.len() {
            return Err(TransportError::BadPosition {
                requested: pos,
                size: self.buf.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Drops everything at and after `pos` and parks the cursor there.
    ///
    /// Positions past the end are clamped. Used by the encode engine to
    /// unwind a partially written field.
    pub fn truncate(&mut self, pos: usize) {
        self.buf.truncate(pos);
        self.pos = self.pos.min(self.buf.len());
    }

    /// Consumes the parcel, returning the accumulated bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.buf)
    }

    /// Borrows the full underlying buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Writes raw bytes at the cursor, overwriting in place and growing the
    /// buffer as needed.
    fn put(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        if self.pos == self.buf.len() {
            self.buf.extend_from_slice(bytes);
        } else {
            if end > self.buf.len() {
                self.buf.resize(end, 0);
            }
            self.buf[self.pos..end].copy_from_slice(bytes);
        }
        self.pos = end;
    }

    /// Takes `len` bytes at the cursor, advancing it.
    fn take(&mut self, len: usize) -> Result<&[u8], TransportError> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(TransportError::OutOfBounds {
                offset: self.pos,
                requested: len,
                size: self.buf.len(),
            })?;
        if end > self.buf.len() {
            return Err(TransportError::OutOfBounds {
                offset: self.pos,
                requested: len,
                size: self.buf.len(),
            });
        }
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    /// Writes a little-endian `u32`.
    pub fn write_u32(&mut self, value: u32) {
        self.put(&value.to_le_bytes());
    }

    /// Writes a little-endian `i32`.
    pub fn write_i32(&mut self, value: i32) {
        self.put(&value.to_le_bytes());
    }

    /// Writes a little-endian `i64`.
    pub fn write_i64(&mut self, value: i64) {
        self.put(&value.to_le_bytes());
    }

    /// Writes a little-endian IEEE-754 `f32`.
    pub fn write_f32(&mut self, value: f32) {
        self.put(&value.to_le_bytes());
    }

    /// Writes a little-endian IEEE-754 `f64`.
    pub fn write_f64(&mut self, value: f64) {
        self.put(&value.to_le_bytes());
    }

    /// Writes an opaque handle token.
    pub fn write_handle(&mut self, handle: Handle) {
        self.put(&handle.0.to_le_bytes());
    }

    /// Reads a little-endian `u32`.
    ///
    /// # Errors
    /// Returns [`TransportError::OutOfBounds`] past the end of the buffer.
    pub fn read_u32(&mut self) -> Result<u32, TransportError> {
        let short_read = TransportError::OutOfBounds {
            offset: self.pos,
            requested: 4,
            size: self.buf.len(),
        };
        let raw: [u8; 4] = self.take(4)?.try_into().map_err(|_| short_read)?;
        Ok(u32::from_le_bytes(raw))
    }

    /// Reads a little-endian `i32`.
    ///
    /// # Errors
    /// Returns [`TransportError::OutOfBounds`] past the end of the buffer.
    pub fn read_i32(&mut self) -> Result<i32, TransportError> {
        self.read_u32().map(|v| v as i32)
    }

    /// Reads a little-endian `i64`.
    ///
    /// # Errors
    /// Returns [`TransportError::OutOfBounds`] past the end of the buffer.
    pub fn read_i64(&mut self) -> Result<i64, TransportError> {
        let short_read = TransportError::OutOfBounds {
            offset: self.pos,
            requested: 8,
            size: self.buf.len(),
        };
        let raw: [u8; 8] = self.take(8)?.try_into().map_err(|_| short_read)?;
        Ok(i64::from_le_bytes(raw))
    }

    /// Reads a little-endian IEEE-754 `f32`.
    ///
    /// # Errors
    /// Returns [`TransportError::OutOfBounds`] past the end of the buffer.
    pub fn read_f32(&mut self) -> Result<f32, TransportError> {
        self.read_u32().map(f32::from_bits)
    }

    /// Reads a little-endian IEEE-754 `f64`.
    ///
    /// # Errors
    /// Returns [`TransportError::OutOfBounds`] past the end of the buffer.
    pub fn read_f64(&mut self) -> Result<f64, TransportError> {
        self.read_i64().map(|v| f64::from_bits(v as u64))
    }

    /// Reads an opaque handle token.
    ///
    /// # Errors
    /// Returns [`TransportError::OutOfBounds`] past the end of the buffer.
    pub fn read_handle(&mut self) -> Result<Handle, TransportError> {
        self.read_i64().map(|v| Handle(v as u64))
    }

    /// Writes a length-prefixed UTF-8 string.
    ///
    /// # Errors
    /// Returns [`TransportError::LengthTooLarge`] when the byte length does
    /// not fit the `u32` prefix.
    pub fn write_str(&mut self, value: &str) -> Result<(), TransportError> {
        self.write_len_prefixed(value.as_bytes())
    }

    /// Reads a length-prefixed UTF-8 string.
    ///
    /// # Errors
    /// Returns [`TransportError::OutOfBounds`] past the end of the buffer or
    /// [`TransportError::InvalidUtf8`] for malformed payload bytes.
    pub fn read_str(&mut self) -> Result<String, TransportError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| TransportError::InvalidUtf8)
    }

    /// Writes a length-prefixed raw byte range.
    ///
    /// # Errors
    /// Returns [`TransportError::LengthTooLarge`] when the byte length does
    /// not fit the `u32` prefix.
    pub fn write_blob(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.write_len_prefixed(bytes)
    }

    /// Reads a length-prefixed raw byte range.
    ///
    /// # Errors
    /// Returns [`TransportError::OutOfBounds`] past the end of the buffer.
    pub fn read_blob(&mut self) -> Result<Bytes, TransportError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        Ok(Bytes::copy_from_slice(bytes))
    }

    fn write_len_prefixed(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let len: u32 = bytes
            .len()
            .try_into()
            .map_err(|_| TransportError::LengthTooLarge(bytes.len()))?;
        self.write_u32(len);
        self.put(bytes);
        Ok(())
    }
}
