// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-wire-kind payload codecs.
//!
//! Everything here operates inside an already-framed field: the dispatch
//! engine owns headers, null markers, and cursor repositioning; these
//! routines only read and write payload bytes. Collection payloads are a
//! `u32` element count followed by that many elements; record elements are
//! full recursive envelopes.

use crate::error::FieldError;
use crate::frame::FieldHeader;
use crate::parcel::{Parcel, TransportError};
use crate::schema::Record;
use crate::variant::{read_variant, write_variant, Variant};

/// Null-marker gate shared by every variable-length decode: a zero declared
/// length is absent, anything else runs the payload reader.
pub(crate) fn decode_opt<T>(
    parcel: &mut Parcel,
    header: &FieldHeader,
    read: impl FnOnce(&mut Parcel) -> Result<T, FieldError>,
) -> Result<Option<T>, FieldError> {
    if header.len == 0 {
        return Ok(None);
    }
    read(parcel).map(Some)
}

fn write_count(parcel: &mut Parcel, count: usize) -> Result<(), FieldError> {
    let count: u32 = count
        .try_into()
        .map_err(|_| TransportError::LengthTooLarge(count))?;
    parcel.write_u32(count);
    Ok(())
}

/// Writes a nested record as a full envelope at the cursor.
pub(crate) fn write_nested<N: Record>(parcel: &mut Parcel, value: &N) -> Result<(), FieldError> {
    crate::engine::encode_into(value, parcel).map_err(FieldError::nested)
}

/// Reads a nested record envelope at the cursor.
pub(crate) fn read_nested<N: Record>(parcel: &mut Parcel) -> Result<N, FieldError> {
    crate::engine::decode_from(parcel).map_err(FieldError::nested)
}

pub(crate) fn write_record_seq<N: Record>(
    parcel: &mut Parcel,
    items: &[N],
) -> Result<(), FieldError> {
    write_count(parcel, items.len())?;
    for item in items {
        write_nested(parcel, item)?;
    }
    Ok(())
}

pub(crate) fn read_record_seq<N: Record>(parcel: &mut Parcel) -> Result<Vec<N>, FieldError> {
    let count = parcel.read_u32()?;
    let mut items = Vec::new();
    for _ in 0..count {
        items.push(read_nested(parcel)?);
    }
    Ok(items)
}

pub(crate) fn write_int32_seq(parcel: &mut Parcel, items: &[i32]) -> Result<(), FieldError> {
    write_count(parcel, items.len())?;
    for item in items {
        parcel.write_i32(*item);
    }
    Ok(())
}

pub(crate) fn read_int32_seq(parcel: &mut Parcel) -> Result<Vec<i32>, FieldError> {
    let count = parcel.read_u32()?;
    let mut items = Vec::new();
    for _ in 0..count {
        items.push(parcel.read_i32()?);
    }
    Ok(items)
}

pub(crate) fn write_text_seq(parcel: &mut Parcel, items: &[String]) -> Result<(), FieldError> {
    write_count(parcel, items.len())?;
    for item in items {
        parcel.write_str(item)?;
    }
    Ok(())
}

pub(crate) fn read_text_seq(parcel: &mut Parcel) -> Result<Vec<String>, FieldError> {
    let count = parcel.read_u32()?;
    let mut items = Vec::new();
    for _ in 0..count {
        items.push(parcel.read_str()?);
    }
    Ok(items)
}

pub(crate) fn write_variant_seq(parcel: &mut Parcel, items: &[Variant]) -> Result<(), FieldError> {
    write_count(parcel, items.len())?;
    for item in items {
        write_variant(parcel, item)?;
    }
    Ok(())
}

pub(crate) fn read_variant_seq(parcel: &mut Parcel) -> Result<Vec<Variant>, FieldError> {
    let count = parcel.read_u32()?;
    let mut items = Vec::new();
    for _ in 0..count {
        items.push(read_variant(parcel)?);
    }
    Ok(items)
}
