// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tagged generic value for heterogeneous ordered collections.
//!
//! Open-ended list fields have no declared element kind, so each element
//! carries its own tag word followed by a kind-specific payload. This path
//! trades type safety for flexibility; prefer a concrete homogeneous
//! element kind wherever the schema allows it.

use bytes::Bytes;

use crate::error::FieldError;
use crate::parcel::Parcel;

/// Maximum `List` nesting accepted during decode.
///
/// Hostile payloads can nest list tags arbitrarily deep; past this depth the
/// element decode fails recoverably instead of exhausting the stack.
const MAX_DEPTH: u32 = 32;

const TAG_NULL: u8 = 0;
const TAG_INT32: u8 = 1;
const TAG_INT64: u8 = 2;
const TAG_BOOL: u8 = 3;
const TAG_DOUBLE: u8 = 4;
const TAG_TEXT: u8 = 5;
const TAG_BLOB: u8 = 6;
const TAG_LIST: u8 = 7;

/// One element of a heterogeneous collection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Variant {
    /// Explicit null element.
    Null,
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// Boolean, carried as an int32 on the wire.
    Bool(bool),
    /// 64-bit IEEE-754 float.
    Double(f64),
    /// UTF-8 string.
    Text(String),
    /// Raw byte range.
    Blob(Bytes),
    /// Nested heterogeneous list.
    List(Vec<Variant>),
}

impl Variant {
    fn tag(&self) -> u8 {
        match self {
            Self::Null => TAG_NULL,
            Self::Int32(_) => TAG_INT32,
            Self::Int64(_) => TAG_INT64,
            Self::Bool(_) => TAG_BOOL,
            Self::Double(_) => TAG_DOUBLE,
            Self::Text(_) => TAG_TEXT,
            Self::Blob(_) => TAG_BLOB,
            Self::List(_) => TAG_LIST,
        }
    }
}

/// Writes one tagged value at the cursor.
///
/// # Errors
/// Returns [`FieldError::Transport`] when a string or blob payload exceeds
/// the `u32` length range.
pub fn write_variant(parcel: &mut Parcel, value: &Variant) -> Result<(), FieldError> {
    parcel.write_i32(i32::from(value.tag()));
    match value {
        Variant::Null => {}
        Variant::Int32(v) => parcel.write_i32(*v),
        Variant::Int64(v) => parcel.write_i64(*v),
        Variant::Bool(v) => parcel.write_i32(i32::from(*v)),
        Variant::Double(v) => parcel.write_f64(*v),
        Variant::Text(v) => parcel.write_str(v)?,
        Variant::Blob(v) => parcel.write_blob(v)?,
        Variant::List(items) => {
            let count: u32 = items
                .len()
                .try_into()
                .map_err(|_| crate::parcel::TransportError::LengthTooLarge(items.len()))?;
            parcel.write_u32(count);
            for item in items {
                write_variant(parcel, item)?;
            }
        }
    }
    Ok(())
}

/// Reads one tagged value at the cursor.
///
/// # Errors
/// Returns [`FieldError::UnknownVariantTag`] for an unrecognized tag,
/// [`FieldError::VariantTooDeep`] past the nesting cap, or
/// [`FieldError::Transport`] when the payload runs out of bytes.
pub fn read_variant(parcel: &mut Parcel) -> Result<Variant, FieldError> {
    read_at_depth(parcel, 0)
}

fn read_at_depth(parcel: &mut Parcel, depth: u32) -> Result<Variant, FieldError> {
    if depth > MAX_DEPTH {
        return Err(FieldError::VariantTooDeep);
    }
    let tag_word = parcel.read_i32()?;
    let tag: u8 = tag_word
        .try_into()
        .map_err(|_| FieldError::UnknownVariantTag(tag_word as u8))?;
    match tag {
        TAG_NULL => Ok(Variant::Null),
        TAG_INT32 => Ok(Variant::Int32(parcel.read_i32()?)),
        TAG_INT64 => Ok(Variant::Int64(parcel.read_i64()?)),
        TAG_BOOL => Ok(Variant::Bool(parcel.read_i32()? != 0)),
        TAG_DOUBLE => Ok(Variant::Double(parcel.read_f64()?)),
        TAG_TEXT => Ok(Variant::Text(parcel.read_str()?)),
        TAG_BLOB => Ok(Variant::Blob(parcel.read_blob()?)),
        TAG_LIST => {
            let count = parcel.read_u32()?;
            let mut items = Vec::new();
            for _ in 0..count {
                items.push(read_at_depth(parcel, depth + 1)?);
            }
            Ok(Variant::List(items))
        }
        other => Err(FieldError::UnknownVariantTag(other)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn round_trip(value: &Variant) -> Variant {
        let mut p = Parcel::new();
        write_variant(&mut p, value).unwrap();
        p.set_position(0).unwrap();
        read_variant(&mut p).unwrap()
    }

    #[test]
    fn every_tag_round_trips() {
        for value in [
            Variant::Null,
            Variant::Int32(-5),
            Variant::Int64(1 << 50),
            Variant::Bool(true),
            Variant::Double(0.25),
            Variant::Text("Hello3".into()),
            Variant::Blob(Bytes::from_static(b"\x00\x01")),
            Variant::List(vec![Variant::Int32(2), Variant::Null]),
        ] {
            assert_eq!(round_trip(&value), value);
        }
    }

    #[test]
    fn unknown_tag_is_recoverable() {
        let mut p = Parcel::new();
        p.write_i32(99);
        p.set_position(0).unwrap();
        assert_eq!(read_variant(&mut p), Err(FieldError::UnknownVariantTag(99)));
    }

    #[test]
    fn negative_tag_word_is_recoverable() {
        let mut p = Parcel::new();
        p.write_i32(-1);
        p.set_position(0).unwrap();
        assert!(matches!(
            read_variant(&mut p),
            Err(FieldError::UnknownVariantTag(_))
        ));
    }

    #[test]
    fn runaway_nesting_is_cut_off() {
        let mut p = Parcel::new();
        for _ in 0..=MAX_DEPTH {
            p.write_i32(i32::from(TAG_LIST));
            p.write_u32(1);
        }
        p.write_i32(i32::from(TAG_LIST));
        p.write_u32(1);
        p.set_position(0).unwrap();
        assert_eq!(read_variant(&mut p), Err(FieldError::VariantTooDeep));
    }

    #[test]
    fn truncated_payload_is_recoverable() {
        let mut p = Parcel::new();
        p.write_i32(i32::from(TAG_INT64));
        p.write_i32(1);
        p.set_position(0).unwrap();
        assert!(matches!(
            read_variant(&mut p),
            Err(FieldError::Transport(_))
        ));
    }
}
