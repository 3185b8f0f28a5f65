// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]

use carton_core::{
    decode_record, encode_record, frame, register_proxy_factory, FieldDescriptor, FieldId, Handle,
    Parcel, Record, SchemaError, WireError, MAGIC_IDENTIFIER,
};

/// "Base class" slice of a composition chain, spliced into the derived
/// record's descriptor list.
fn stamped_fields<R: Record>(
    get: fn(&R) -> i64,
    set: fn(&mut R, i64),
) -> Vec<FieldDescriptor<R>> {
    vec![FieldDescriptor::int64(100, get, set)]
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Event {
    stamp: i64,
    code: i32,
}

impl Record for Event {
    const NAME: &'static str = "Event";

    fn fields() -> Vec<FieldDescriptor<Self>> {
        let mut fields = stamped_fields(|r: &Self| r.stamp, |r, v| r.stamp = v);
        fields.push(FieldDescriptor::int32(2, |r| r.code, |r, v| r.code = v));
        fields
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct ClashingEvent {
    stamp: i64,
    dup: i64,
}

impl Record for ClashingEvent {
    const NAME: &'static str = "ClashingEvent";

    fn fields() -> Vec<FieldDescriptor<Self>> {
        let mut fields = stamped_fields(|r: &Self| r.stamp, |r, v| r.stamp = v);
        // Same identifier as the base slice: must be rejected at table build.
        fields.push(FieldDescriptor::int64(100, |r| r.dup, |r, v| r.dup = v));
        fields
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct MagicThief {
    value: i32,
}

impl Record for MagicThief {
    const NAME: &'static str = "MagicThief";

    fn fields() -> Vec<FieldDescriptor<Self>> {
        vec![FieldDescriptor::int32(
            MAGIC_IDENTIFIER.0,
            |r| r.value,
            |r, v| r.value = v,
        )]
    }
}

#[derive(Debug, Default)]
struct Strict {
    label: Option<String>,
}

impl Record for Strict {
    const NAME: &'static str = "Strict";

    fn fields() -> Vec<FieldDescriptor<Self>> {
        vec![FieldDescriptor::text(1, |r: &Self| r.label.as_deref(), |r, v| r.label = v).required()]
    }
}

#[derive(Debug, PartialEq)]
struct BeaconProxy {
    handle: Handle,
}

#[derive(Debug, Default)]
struct Rig {
    beacon: Option<BeaconProxy>,
}

impl Record for Rig {
    const NAME: &'static str = "Rig";

    fn fields() -> Vec<FieldDescriptor<Self>> {
        vec![FieldDescriptor::interface::<BeaconProxy>(
            1,
            |r| r.beacon.as_ref().map(|p| p.handle),
            |r, v| r.beacon = v,
        )]
    }
}

#[derive(Debug)]
struct OrphanProxy;

#[derive(Debug, Default)]
struct Orphan {
    proxy: Option<OrphanProxy>,
}

impl Record for Orphan {
    const NAME: &'static str = "Orphan";

    fn fields() -> Vec<FieldDescriptor<Self>> {
        vec![FieldDescriptor::interface::<OrphanProxy>(
            1,
            |_| None,
            |r, v| r.proxy = v,
        )]
    }
}

#[test]
fn composed_chain_with_distinct_identifiers_round_trips() {
    let event = Event {
        stamp: 1_700_000_000,
        code: 6,
    };
    let bytes = encode_record(&event).unwrap();
    assert_eq!(decode_record::<Event>(&bytes).unwrap(), event);
}

#[test]
fn duplicate_identifier_across_the_chain_fails_every_instance() {
    for _ in 0..2 {
        let err = encode_record(&ClashingEvent::default()).unwrap_err();
        assert_eq!(
            err,
            WireError::Schema(SchemaError::DuplicateFieldId {
                record: "ClashingEvent",
                id: 100,
            })
        );
    }
    // Decode hits the identical cached failure.
    assert!(matches!(
        decode_record::<ClashingEvent>(&[0; 16]),
        Err(WireError::Schema(SchemaError::DuplicateFieldId { .. }))
    ));
}

#[test]
fn claiming_the_magic_identifier_is_a_schema_error() {
    assert_eq!(
        encode_record(&MagicThief { value: 1 }).unwrap_err(),
        WireError::Schema(SchemaError::ReservedFieldId {
            record: "MagicThief",
            id: MAGIC_IDENTIFIER.0,
        })
    );
}

#[test]
fn absent_required_field_is_omitted_not_marked() {
    // Non-nullable + absent: recoverable per-field encode error, so the
    // field contributes no bytes at all — not even a zero-length marker.
    let bytes = encode_record(&Strict { label: None }).unwrap();
    let mut p = Parcel::from_slice(&bytes);
    let envelope = frame::read_envelope(&mut p).unwrap();
    assert_eq!(envelope.body_start, envelope.body_end);

    let present = encode_record(&Strict {
        label: Some("here".to_owned()),
    })
    .unwrap();
    assert_eq!(
        decode_record::<Strict>(&present).unwrap().label.as_deref(),
        Some("here")
    );
}

#[test]
fn interface_field_round_trips_through_its_factory() {
    let _ = register_proxy_factory::<BeaconProxy>(|handle| BeaconProxy { handle });
    let rig = Rig {
        beacon: Some(BeaconProxy { handle: Handle(44) }),
    };
    let bytes = encode_record(&rig).unwrap();
    let decoded = decode_record::<Rig>(&bytes).unwrap();
    assert_eq!(decoded.beacon, Some(BeaconProxy { handle: Handle(44) }));

    let absent = encode_record(&Rig { beacon: None }).unwrap();
    assert_eq!(decode_record::<Rig>(&absent).unwrap().beacon, None);
}

#[test]
fn unregistered_interface_fails_at_table_build() {
    assert_eq!(
        encode_record(&Orphan::default()).unwrap_err(),
        WireError::Schema(SchemaError::MissingProxyFactory {
            interface: std::any::type_name::<OrphanProxy>(),
        })
    );
}

#[test]
fn field_identifiers_survive_reordered_declarations() {
    // Same wire identifiers, different declaration order: still decodable.
    let event = Event { stamp: 3, code: 9 };
    let bytes = encode_record(&event).unwrap();

    let mut p = Parcel::from_slice(&bytes);
    let envelope = frame::read_envelope(&mut p).unwrap();
    let first = frame::read_field_header(&mut p).unwrap();
    assert_eq!(first.id, FieldId(100));
    frame::skip(&mut p, &first).unwrap();
    let second = frame::read_field_header(&mut p).unwrap();
    assert_eq!(second.id, FieldId(2));
    frame::skip(&mut p, &second).unwrap();
    assert_eq!(p.position(), envelope.body_end);
}
