// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]

mod common;

use carton_core::{decode_record, encode_record, frame, FieldId, Parcel};
use common::{Bar, Foo};

/// Writes `{ value: 12 }` as a `Bar` envelope, optionally with an extra
/// field no `Bar` schema has ever heard of.
fn bar_buffer(with_unknown: bool) -> Vec<u8> {
    let mut p = Parcel::new();
    let body = frame::begin_envelope(&mut p);
    frame::write_header(&mut p, FieldId(1), 4);
    p.write_i32(12);
    if with_unknown {
        let start = frame::begin_variable(&mut p, FieldId(99));
        p.write_str("from the future").unwrap();
        frame::finish_variable(&mut p, start).unwrap();
    }
    frame::finish_envelope(&mut p, body).unwrap();
    p.as_slice().to_vec()
}

#[test]
fn unknown_fields_are_skipped() {
    let with_unknown = decode_record::<Bar>(&bar_buffer(true)).unwrap();
    let without = decode_record::<Bar>(&bar_buffer(false)).unwrap();
    assert_eq!(with_unknown, without);
    assert_eq!(with_unknown.value, 12);
}

#[test]
fn unknown_long_form_fields_are_skipped() {
    let mut p = Parcel::new();
    let body = frame::begin_envelope(&mut p);
    // Long-form header with a small payload: legal, must skip cleanly.
    let start = frame::begin_variable(&mut p, FieldId(7777));
    p.write_i32(-1);
    frame::finish_variable(&mut p, start).unwrap();
    frame::write_header(&mut p, FieldId(1), 4);
    p.write_i32(3);
    frame::finish_envelope(&mut p, body).unwrap();

    assert_eq!(decode_record::<Bar>(p.as_slice()).unwrap(), Bar { value: 3 });
}

#[test]
fn newer_reader_defaults_missing_fields() {
    // An "older writer" that only ever knew Foo's field 1.
    let mut p = Parcel::new();
    let body = frame::begin_envelope(&mut p);
    frame::write_header(&mut p, FieldId(1), 4);
    p.write_i32(42);
    frame::finish_envelope(&mut p, body).unwrap();

    let foo = decode_record::<Foo>(p.as_slice()).unwrap();
    assert_eq!(foo.count, 42);
    assert_eq!(foo.text, None);
    assert_eq!(foo.tags, None);
    assert_eq!(foo.bar, None);
    assert_eq!(foo.bar_array, None);
}

#[test]
fn older_reader_survives_a_newer_writer() {
    // A full Foo decoded through Bar's single-field schema: everything but
    // field 1 is unknown to Bar and must skip.
    let bytes = encode_record(&Foo::sample()).unwrap();
    let bar = decode_record::<Bar>(&bytes).unwrap();
    assert_eq!(bar.value, 4);
}

#[test]
fn absent_fields_still_occupy_a_header() {
    // Every declared field gets a placeholder on the wire: absent variable
    // fields appear as zero-length headers, in declaration order.
    let bytes = encode_record(&Foo {
        count: 1,
        ..Foo::default()
    })
    .unwrap();

    let mut p = Parcel::from_slice(&bytes);
    let envelope = frame::read_envelope(&mut p).unwrap();
    let mut seen = Vec::new();
    while p.position() < envelope.body_end {
        let header = frame::read_field_header(&mut p).unwrap();
        seen.push((header.id, header.len));
        frame::skip(&mut p, &header).unwrap();
    }
    assert_eq!(
        seen,
        vec![
            (FieldId(1), 4),
            (FieldId(2), 0),
            (FieldId(3), 0),
            (FieldId(4), 0),
            (FieldId(5), 0),
        ]
    );
}

#[test]
fn field_order_on_the_wire_does_not_matter() {
    // Decode keys on identifiers, not declaration order.
    let mut p = Parcel::new();
    let body = frame::begin_envelope(&mut p);
    let start = frame::begin_variable(&mut p, FieldId(2));
    p.write_str("Hello").unwrap();
    frame::finish_variable(&mut p, start).unwrap();
    frame::write_header(&mut p, FieldId(1), 4);
    p.write_i32(4);
    frame::finish_envelope(&mut p, body).unwrap();

    let foo = decode_record::<Foo>(p.as_slice()).unwrap();
    assert_eq!(foo.count, 4);
    assert_eq!(foo.text.as_deref(), Some("Hello"));
}
