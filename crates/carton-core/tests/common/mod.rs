// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared record declarations for the integration suites.
#![allow(dead_code)]

use bytes::Bytes;
use carton_core::{FieldDescriptor, Handle, Record, Variant};

/// Minimal one-field record from the round-trip scenario.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Bar {
    pub value: i32,
}

impl Record for Bar {
    const NAME: &'static str = "Bar";

    fn fields() -> Vec<FieldDescriptor<Self>> {
        vec![FieldDescriptor::int32(1, |r| r.value, |r, v| r.value = v)]
    }
}

/// Composite record exercising scalars, strings, and nesting.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Foo {
    pub count: i32,
    pub text: Option<String>,
    pub tags: Option<Vec<String>>,
    pub bar: Option<Bar>,
    pub bar_array: Option<Vec<Bar>>,
}

impl Record for Foo {
    const NAME: &'static str = "Foo";

    fn fields() -> Vec<FieldDescriptor<Self>> {
        vec![
            FieldDescriptor::int32(1, |r| r.count, |r, v| r.count = v),
            FieldDescriptor::text(2, |r| r.text.as_deref(), |r, v| r.text = v),
            FieldDescriptor::text_seq(3, |r| r.tags.as_deref(), |r, v| r.tags = v),
            FieldDescriptor::nested(4, |r| r.bar.as_ref(), |r, v| r.bar = v),
            FieldDescriptor::nested_seq(5, |r| r.bar_array.as_deref(), |r, v| r.bar_array = v),
        ]
    }
}

impl Foo {
    /// The populated instance from the round-trip scenario.
    pub fn sample() -> Self {
        Self {
            count: 4,
            text: Some("Hello".to_owned()),
            tags: Some(vec!["Hello2".to_owned()]),
            bar: Some(Bar { value: 5 }),
            bar_array: Some(vec![Bar { value: 5 }]),
        }
    }
}

/// Kitchen-sink record covering every remaining wire kind.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Gadget {
    pub flag: bool,
    pub tiny: i8,
    pub level: i16,
    pub ticks: i64,
    pub ratio: f32,
    pub precise: f64,
    pub payload: Option<Bytes>,
    pub port: Option<Handle>,
    pub ints: Option<Vec<i32>>,
    pub extras: Option<Vec<Variant>>,
}

impl Record for Gadget {
    const NAME: &'static str = "Gadget";

    fn fields() -> Vec<FieldDescriptor<Self>> {
        vec![
            FieldDescriptor::boolean(1, |r| r.flag, |r, v| r.flag = v),
            FieldDescriptor::byte(2, |r| r.tiny, |r, v| r.tiny = v),
            FieldDescriptor::short(3, |r| r.level, |r, v| r.level = v),
            FieldDescriptor::int64(4, |r| r.ticks, |r, v| r.ticks = v),
            FieldDescriptor::float32(5, |r| r.ratio, |r, v| r.ratio = v),
            FieldDescriptor::float64(6, |r| r.precise, |r, v| r.precise = v),
            FieldDescriptor::blob(7, |r| r.payload.as_ref(), |r, v| r.payload = v),
            FieldDescriptor::handle(8, |r| r.port.as_ref(), |r, v| r.port = v),
            FieldDescriptor::int32_seq(9, |r| r.ints.as_deref(), |r, v| r.ints = v),
            FieldDescriptor::variant_seq(10, |r| r.extras.as_deref(), |r, v| r.extras = v),
        ]
    }
}
