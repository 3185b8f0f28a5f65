// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Framing codec: byte-exact envelope and field-header framing.
//!
//! Every length `L` paired with an identifier `M` (the record envelope and
//! every field header alike) is framed by one of two layouts:
//!
//! - **short form** (`L < 0xFFFF`): one `u32` word, low 16 bits = `M`,
//!   high 16 bits = `L`.
//! - **long form**: one `u32` word with high 16 bits = the sentinel
//!   `0xFFFF` and low 16 bits = `M`, followed by a second `u32` word
//!   holding the full `L`.
//!
//! Writers that know the payload length up front emit the canonical short
//! form when it fits. Writers that do not (nested records, collections,
//! strings) reserve the long form and backfill the length word after the
//! payload is written. Readers accept both forms for any field.
//!
//! A record envelope is the same scheme with `M` fixed to the reserved
//! [`MAGIC_IDENTIFIER`]; anything else at an envelope boundary is fatal.

use crate::error::WireError;
use crate::parcel::{Parcel, TransportError};
use crate::schema::FieldId;

/// Reserved identifier marking a record envelope.
///
/// No schema may declare a field with this identifier; descriptor-table
/// validation rejects it, so the 16-bit field space is the full range minus
/// this one value.
pub const MAGIC_IDENTIFIER: FieldId = FieldId(0x4F45);

/// High-16-bit sentinel selecting the long header form.
const LONG_FORM: u32 = 0xFFFF_0000;

/// A resolved field header: identifier, payload length, payload start.
///
/// Produced and consumed within a single decode pass; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    /// Field identifier carried in the header word.
    pub id: FieldId,
    /// Declared payload length in bytes.
    pub len: u32,
    /// Absolute cursor position of the first payload byte.
    pub payload_start: usize,
}

impl FieldHeader {
    /// Absolute position one past the declared payload.
    ///
    /// # Errors
    /// Returns [`WireError::OutOfBounds`] when the declared end overflows.
    pub fn payload_end(&self) -> Result<usize, WireError> {
        self.payload_start
            .checked_add(self.len as usize)
            .ok_or(WireError::OutOfBounds {
                end: usize::MAX,
                size: self.payload_start,
            })
    }
}

/// A record envelope resolved during decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// Absolute cursor position of the first body byte.
    pub body_start: usize,
    /// Absolute cursor position one past the last body byte.
    pub body_end: usize,
}

/// Writes a header for a payload whose length is already known.
///
/// Emits the short form when `len` fits in 16 bits, the long form otherwise.
pub fn write_header(parcel: &mut Parcel, id: FieldId, len: u32) {
    if len < 0xFFFF {
        parcel.write_u32(u32::from(id.0) | (len << 16));
    } else {
        parcel.write_u32(u32::from(id.0) | LONG_FORM);
        parcel.write_u32(len);
    }
}

/// Reserves a long-form header for a payload of unknown length.
///
/// Returns the payload start position to hand back to [`finish_variable`].
pub fn begin_variable(parcel: &mut Parcel, id: FieldId) -> usize {
    parcel.write_u32(u32::from(id.0) | LONG_FORM);
    parcel.write_u32(0);
    parcel.position()
}

/// Backfills the length word of a header reserved by [`begin_variable`].
///
/// # Errors
/// Returns [`TransportError::LengthTooLarge`] when the payload outgrew the
/// `u32` length word.
pub fn finish_variable(parcel: &mut Parcel, payload_start: usize) -> Result<(), TransportError> {
    let end = parcel.position();
    let len: u32 = end
        .checked_sub(payload_start)
        .and_then(|n| n.try_into().ok())
        .ok_or(TransportError::LengthTooLarge(end))?;
    parcel.set_position(payload_start - 4)?;
    parcel.write_u32(len);
    parcel.set_position(end)
}

/// Opens a record envelope for writing.
pub fn begin_envelope(parcel: &mut Parcel) -> usize {
    begin_variable(parcel, MAGIC_IDENTIFIER)
}

/// Closes a record envelope opened by [`begin_envelope`].
///
/// # Errors
/// Returns [`WireError::Truncated`] when the body outgrew the `u32` length
/// word.
pub fn finish_envelope(parcel: &mut Parcel, body_start: usize) -> Result<(), WireError> {
    finish_variable(parcel, body_start).map_err(WireError::from)
}

/// Resolves the identifier and length of the header word at the cursor.
fn read_raw_header(parcel: &mut Parcel) -> Result<(u32, FieldId, u32), TransportError> {
    let word = parcel.read_u32()?;
    let id = FieldId((word & 0xFFFF) as u16);
    let len = if word & LONG_FORM == LONG_FORM {
        parcel.read_u32()?
    } else {
        word >> 16
    };
    Ok((word, id, len))
}

/// Reads one field header at the cursor.
///
/// # Errors
/// Returns [`WireError::Truncated`] when the buffer ends inside the header.
pub fn read_field_header(parcel: &mut Parcel) -> Result<FieldHeader, WireError> {
    let (_, id, len) = read_raw_header(parcel)?;
    Ok(FieldHeader {
        id,
        len,
        payload_start: parcel.position(),
    })
}

/// Reads and validates a record envelope at the cursor.
///
/// # Errors
/// - [`WireError::BadMagic`] when the identifier is not [`MAGIC_IDENTIFIER`].
/// - [`WireError::OutOfBounds`] when the declared body end overflows or
///   passes the end of the buffer.
/// - [`WireError::Truncated`] when the buffer ends inside the header.
pub fn read_envelope(parcel: &mut Parcel) -> Result<Envelope, WireError> {
    let (word, id, len) = read_raw_header(parcel)?;
    if id != MAGIC_IDENTIFIER {
        return Err(WireError::BadMagic { word });
    }
    let body_start = parcel.position();
    let body_end = body_start
        .checked_add(len as usize)
        .ok_or(WireError::OutOfBounds {
            end: usize::MAX,
            size: parcel.data_size(),
        })?;
    if body_end > parcel.data_size() {
        return Err(WireError::OutOfBounds {
            end: body_end,
            size: parcel.data_size(),
        });
    }
    Ok(Envelope {
        body_start,
        body_end,
    })
}

/// Advances the cursor past a field's payload without interpreting it.
///
/// This is the forward-compatibility primitive: unknown identifiers and
/// fields whose decode failed recoverably are consumed through here, exactly
/// the number of bytes the header declared.
///
/// # Errors
/// Returns [`WireError::OutOfBounds`] when the declared payload passes the
/// end of the buffer.
pub fn skip(parcel: &mut Parcel, header: &FieldHeader) -> Result<(), WireError> {
    let end = header.payload_end()?;
    if end > parcel.data_size() {
        return Err(WireError::OutOfBounds {
            end,
            size: parcel.data_size(),
        });
    }
    parcel.set_position(end)?;
    Ok(())
}

/// Asserts a fixed-size scalar header declares exactly `expected` bytes.
///
/// # Errors
/// Returns [`WireError::SizeMismatch`] on any other declared length. This is
/// a hard framing error, not a skip — fixed scalars get a stronger
/// self-check than variable-length fields.
pub fn expect_size(header: &FieldHeader, expected: u32) -> Result<(), WireError> {
    if header.len != expected {
        return Err(WireError::SizeMismatch {
            id: header.id,
            declared: header.len,
            expected,
        });
    }
    Ok(())
}
