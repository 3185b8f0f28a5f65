// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! carton-core: compact, versioned binary encoding for IPC record payloads.
//!
//! Records are encoded as self-delimited envelopes of identifier-tagged,
//! length-framed fields. Because every field carries its own length, a
//! reader built against an older schema skips fields it does not know, and
//! a reader built against a newer schema falls back to defaults for fields
//! the writer never sent — forward and backward compatibility by
//! size-based skip-safety, with no type negotiation and no field renaming.
//!
//! # Layers
//!
//! - [`Parcel`] — transport primitives: a linear cursor over one byte
//!   buffer, typed little-endian scalar/string/blob/handle access.
//! - [`frame`] — the envelope and field-header framing scheme.
//! - [`schema`] — explicit per-type descriptor tables ([`Record`],
//!   [`FieldDescriptor`]) with process-lifetime caching and validation.
//! - [`engine`] — the dispatch loops: [`encode_record`] / [`decode_record`].
//!
//! # Error boundary
//!
//! Envelope-level corruption (bad magic, bounds violations, scalar size
//! mismatch, broken schema) is fatal and returns [`WireError`]. A failure
//! confined to one field — unknown identifier, malformed payload, missing
//! proxy factory — is consumed field-locally: the engine skips exactly the
//! bytes that field declared, reports a diagnostic through `tracing`, and
//! the rest of the record decodes normally.
//!
//! # Example
//!
//! ```
//! use carton_core::{decode_record, encode_record, FieldDescriptor, Record};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Bar {
//!     value: i32,
//! }
//!
//! impl Record for Bar {
//!     const NAME: &'static str = "Bar";
//!
//!     fn fields() -> Vec<FieldDescriptor<Self>> {
//!         vec![FieldDescriptor::int32(1, |r| r.value, |r, v| r.value = v)]
//!     }
//! }
//!
//! let bytes = encode_record(&Bar { value: 12 }).unwrap();
//! assert_eq!(decode_record::<Bar>(&bytes).unwrap(), Bar { value: 12 });
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod error;
pub mod frame;
mod parcel;
mod proxy;
mod variant;

pub mod engine;
mod field;
pub mod schema;

/// Fatal and recoverable error tiers.
pub use error::{FieldError, SchemaError, WireError};
/// Whole-record encode/decode entry points.
pub use engine::{decode_from, decode_record, encode_into, encode_record};
/// Reserved envelope identifier and framing types.
pub use frame::{Envelope, FieldHeader, MAGIC_IDENTIFIER};
/// Transport primitives and the opaque handle token.
pub use parcel::{Handle, Parcel, TransportError};
/// Handle-to-proxy factory registry.
pub use proxy::{proxy_for, register_proxy_factory};
/// Schema declaration surface.
pub use schema::{FieldDescriptor, FieldId, Record, RecordSchema, WireKind};
/// Tagged generic value for heterogeneous collections.
pub use variant::{read_variant, write_variant, Variant};
