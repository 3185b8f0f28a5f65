// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Schema resolver and dispatch engine.
//!
//! Encode walks the declared descriptors in order: open the envelope, frame
//! each field through its wire-kind codec, backfill the envelope length.
//! Decode reads the envelope, then loops field headers until the computed
//! body end — looking each identifier up in the type's descriptor table,
//! decoding known fields and skipping unknown ones.
//!
//! The error boundary is deliberate and asymmetric:
//!
//! - A failure inside **one field** never aborts the record. Encode rewinds
//!   and omits that field's bytes; decode consumes exactly the bytes the
//!   field header declared and leaves the member at its default. Both emit
//!   a diagnostic.
//! - **Envelope-level** corruption (bad magic, bounds violations, a cursor
//!   past the record end, fixed-scalar size mismatch, a broken schema) is
//!   fatal and surfaces as [`WireError`].

use bytes::Bytes;

use crate::error::{FieldError, WireError};
use crate::field;
use crate::frame::{self, FieldHeader};
use crate::parcel::Parcel;
use crate::schema::{FieldAccess, FieldDescriptor, Record, RecordSchema};

/// Encodes a record into a fresh buffer.
///
/// # Errors
/// Returns [`WireError::Schema`] when the record type's descriptor table is
/// invalid. Single-field failures are reported and omitted, never returned.
pub fn encode_record<R: Record>(record: &R) -> Result<Bytes, WireError> {
    let mut parcel = Parcel::new();
    encode_into(record, &mut parcel)?;
    Ok(parcel.into_bytes())
}

/// Encodes a record as one envelope at the parcel's cursor.
///
/// This is the recursion point for nested record fields and the entry for
/// callers embedding a record into a larger stream.
///
/// # Errors
/// Returns [`WireError::Schema`] when the descriptor table is invalid, or
/// [`WireError::Truncated`] when the body outgrows the length word.
pub fn encode_into<R: Record>(record: &R, parcel: &mut Parcel) -> Result<(), WireError> {
    let schema = RecordSchema::<R>::of()?;
    let body_start = frame::begin_envelope(parcel);
    for descriptor in schema.fields() {
        let mark = parcel.position();
        if let Err(err) = encode_field(record, descriptor, parcel) {
            tracing::warn!(
                record = schema.name(),
                field = %descriptor.id(),
                %err,
                "field encode failed, omitting"
            );
            parcel.truncate(mark);
        }
    }
    frame::finish_envelope(parcel, body_start)
}

/// Decodes one record from the start of `bytes`.
///
/// Unknown fields are skipped; fields that fail to decode stay at their
/// default. Only envelope-level corruption produces an error.
///
/// # Errors
/// See [`WireError`] for the fatal cases.
pub fn decode_record<R: Record>(bytes: &[u8]) -> Result<R, WireError> {
    let mut parcel = Parcel::from_slice(bytes);
    decode_from(&mut parcel)
}

/// Decodes one record envelope at the parcel's cursor.
///
/// The cursor lands exactly one past the envelope body on success.
///
/// # Errors
/// See [`WireError`] for the fatal cases.
pub fn decode_from<R: Record>(parcel: &mut Parcel) -> Result<R, WireError> {
    let schema = RecordSchema::<R>::of()?;
    let envelope = frame::read_envelope(parcel)?;
    let mut record = R::default();
    while parcel.position() < envelope.body_end {
        let header = frame::read_field_header(parcel)?;
        match schema.field_by_id(header.id) {
            None => {
                tracing::debug!(
                    record = schema.name(),
                    field = %header.id,
                    "unknown field id, skipping"
                );
            }
            Some(descriptor) => {
                if let Some(expected) = descriptor.access.fixed_size() {
                    frame::expect_size(&header, expected)?;
                }
                if let Err(err) = decode_field(&mut record, descriptor, parcel, &header) {
                    tracing::warn!(
                        record = schema.name(),
                        field = %header.id,
                        %err,
                        "field decode failed, skipping"
                    );
                }
            }
        }
        // Land on the exact field boundary no matter what the codec
        // consumed; unknown and failed fields are swallowed here too.
        frame::skip(parcel, &header)?;
    }
    if parcel.position() > envelope.body_end {
        return Err(WireError::Overrun {
            cursor: parcel.position(),
            end: envelope.body_end,
        });
    }
    Ok(record)
}

fn encode_field<R: Record>(
    record: &R,
    descriptor: &FieldDescriptor<R>,
    parcel: &mut Parcel,
) -> Result<(), FieldError> {
    let id = descriptor.id();
    match &descriptor.access {
        FieldAccess::Int32(a) => {
            frame::write_header(parcel, id, 4);
            parcel.write_i32((a.get)(record));
            Ok(())
        }
        FieldAccess::Byte(a) => {
            frame::write_header(parcel, id, 4);
            parcel.write_i32(i32::from((a.get)(record)));
            Ok(())
        }
        FieldAccess::Short(a) => {
            frame::write_header(parcel, id, 4);
            parcel.write_i32(i32::from((a.get)(record)));
            Ok(())
        }
        FieldAccess::Bool(a) => {
            frame::write_header(parcel, id, 4);
            parcel.write_i32(i32::from((a.get)(record)));
            Ok(())
        }
        FieldAccess::Float(a) => {
            frame::write_header(parcel, id, 4);
            parcel.write_f32((a.get)(record));
            Ok(())
        }
        FieldAccess::Int64(a) => {
            frame::write_header(parcel, id, 8);
            parcel.write_i64((a.get)(record));
            Ok(())
        }
        FieldAccess::Double(a) => {
            frame::write_header(parcel, id, 8);
            parcel.write_f64((a.get)(record));
            Ok(())
        }
        FieldAccess::Text(a) => encode_variable(parcel, descriptor, (a.get)(record), |p, v| {
            p.write_str(v).map_err(FieldError::from)
        }),
        FieldAccess::Blob(a) => encode_variable(parcel, descriptor, (a.get)(record), |p, v| {
            p.write_blob(v).map_err(FieldError::from)
        }),
        FieldAccess::Handle(a) => encode_variable(parcel, descriptor, (a.get)(record), |p, v| {
            p.write_handle(*v);
            Ok(())
        }),
        FieldAccess::Interface(a) => {
            let value = (a.get)(record);
            encode_variable(parcel, descriptor, value.as_ref(), |p, v| {
                p.write_handle(*v);
                Ok(())
            })
        }
        FieldAccess::Int32Seq(a) => {
            encode_variable(parcel, descriptor, (a.get)(record), field::write_int32_seq)
        }
        FieldAccess::TextSeq(a) => {
            encode_variable(parcel, descriptor, (a.get)(record), field::write_text_seq)
        }
        FieldAccess::VariantSeq(a) => {
            encode_variable(parcel, descriptor, (a.get)(record), field::write_variant_seq)
        }
        FieldAccess::Nested(a) | FieldAccess::NestedSeq(a) => {
            let payload_start = frame::begin_variable(parcel, id);
            let present = (a.encode)(record, parcel)?;
            if present {
                frame::finish_variable(parcel, payload_start)?;
                return Ok(());
            }
            if !descriptor.nullable() {
                return Err(FieldError::AbsentRequired);
            }
            // Swap the reserved long-form header for the canonical
            // zero-length marker.
            parcel.truncate(payload_start - 8);
            frame::write_header(parcel, id, 0);
            Ok(())
        }
    }
}

/// Frames one variable-length field: absent values become the zero-length
/// marker (or a per-field error when the field is non-nullable), present
/// values get a reserved header backfilled around the payload writer.
fn encode_variable<R: Record, B: ?Sized>(
    parcel: &mut Parcel,
    descriptor: &FieldDescriptor<R>,
    value: Option<&B>,
    write: impl FnOnce(&mut Parcel, &B) -> Result<(), FieldError>,
) -> Result<(), FieldError> {
    let Some(value) = value else {
        if !descriptor.nullable() {
            return Err(FieldError::AbsentRequired);
        }
        frame::write_header(parcel, descriptor.id(), 0);
        return Ok(());
    };
    let payload_start = frame::begin_variable(parcel, descriptor.id());
    write(parcel, value)?;
    frame::finish_variable(parcel, payload_start)?;
    Ok(())
}

fn decode_field<R: Record>(
    record: &mut R,
    descriptor: &FieldDescriptor<R>,
    parcel: &mut Parcel,
    header: &FieldHeader,
) -> Result<(), FieldError> {
    match &descriptor.access {
        FieldAccess::Int32(a) => {
            (a.set)(record, parcel.read_i32()?);
            Ok(())
        }
        FieldAccess::Byte(a) => {
            (a.set)(record, parcel.read_i32()? as i8);
            Ok(())
        }
        FieldAccess::Short(a) => {
            (a.set)(record, parcel.read_i32()? as i16);
            Ok(())
        }
        FieldAccess::Bool(a) => {
            (a.set)(record, parcel.read_i32()? != 0);
            Ok(())
        }
        FieldAccess::Float(a) => {
            (a.set)(record, parcel.read_f32()?);
            Ok(())
        }
        FieldAccess::Int64(a) => {
            (a.set)(record, parcel.read_i64()?);
            Ok(())
        }
        FieldAccess::Double(a) => {
            (a.set)(record, parcel.read_f64()?);
            Ok(())
        }
        FieldAccess::Text(a) => {
            let value = field::decode_opt(parcel, header, |p| {
                p.read_str().map_err(FieldError::from)
            })?;
            (a.set)(record, value);
            Ok(())
        }
        FieldAccess::Blob(a) => {
            let value = field::decode_opt(parcel, header, |p| {
                p.read_blob().map_err(FieldError::from)
            })?;
            (a.set)(record, value);
            Ok(())
        }
        FieldAccess::Handle(a) => {
            let value = field::decode_opt(parcel, header, |p| {
                p.read_handle().map_err(FieldError::from)
            })?;
            (a.set)(record, value);
            Ok(())
        }
        FieldAccess::Interface(a) => {
            let value = field::decode_opt(parcel, header, |p| {
                p.read_handle().map_err(FieldError::from)
            })?;
            (a.set)(record, value)
        }
        FieldAccess::Int32Seq(a) => {
            let value = field::decode_opt(parcel, header, field::read_int32_seq)?;
            (a.set)(record, value);
            Ok(())
        }
        FieldAccess::TextSeq(a) => {
            let value = field::decode_opt(parcel, header, field::read_text_seq)?;
            (a.set)(record, value);
            Ok(())
        }
        FieldAccess::VariantSeq(a) => {
            let value = field::decode_opt(parcel, header, field::read_variant_seq)?;
            (a.set)(record, value);
            Ok(())
        }
        FieldAccess::Nested(a) | FieldAccess::NestedSeq(a) => (a.decode)(record, parcel, header),
    }
}
