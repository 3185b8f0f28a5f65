// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Two-tier error model for the wire format.
//!
//! Errors split along the recovery boundary, not the module boundary:
//!
//! - [`WireError`] — envelope-level corruption. Fatal: aborts the whole
//!   encode/decode pass and surfaces to the caller.
//! - [`FieldError`] — a single field's encode/decode failed. Recoverable:
//!   the dispatch engine converts it into a skip (decode) or an omission
//!   (encode) and keeps walking the record. Callers of whole-record
//!   operations never observe it.
//! - [`SchemaError`] — a broken field declaration. A programming error, not
//!   a data error; detected once when a record type's descriptor table is
//!   built and replayed for every subsequent use of that type.

use thiserror::Error;

use crate::parcel::TransportError;
use crate::schema::FieldId;

/// Fatal envelope-level failures. Any of these aborts the whole pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The record envelope did not start with the reserved magic identifier.
    #[error("[CARTON_BAD_MAGIC] expected envelope header, got word {word:#010x}")]
    BadMagic {
        /// The header word actually read.
        word: u32,
    },
    /// A fixed-size scalar field declared a payload length other than its
    /// statically known size.
    #[error("[CARTON_SIZE_MISMATCH] field {id} declares a {declared}-byte payload, wire kind requires {expected}")]
    SizeMismatch {
        /// Identifier of the offending field.
        id: FieldId,
        /// Length declared by the field header.
        declared: u32,
        /// Length required by the field's wire kind.
        expected: u32,
    },
    /// A declared region (envelope body or field payload) extends past the
    /// end of the buffer — the classic truncation signature.
    #[error("[CARTON_BOUNDS] declared end {end} exceeds buffer size {size}")]
    OutOfBounds {
        /// Absolute end of the declared region.
        end: usize,
        /// Total buffer size.
        size: usize,
    },
    /// The cursor landed past the envelope's computed end after the field
    /// loop — the stream is corrupt.
    #[error("[CARTON_OVERRUN] cursor {cursor} overran record end {end}")]
    Overrun {
        /// Cursor position after the field loop.
        cursor: usize,
        /// Computed envelope end.
        end: usize,
    },
    /// The transport ran out of bytes while reading framing data.
    #[error("[CARTON_TRUNCATED] {0}")]
    Truncated(#[from] TransportError),
    /// The record type's descriptor table failed to build.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Recoverable single-field failures.
///
/// The dispatch engine catches these, emits a diagnostic, consumes exactly
/// the bytes the field header declared, and moves to the next field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The transport ran out of bytes (or rejected a length) inside one
    /// field's payload.
    #[error("[CARTON_FIELD_TRANSPORT] {0}")]
    Transport(#[from] TransportError),
    /// A nested record payload failed to decode or encode.
    #[error("[CARTON_FIELD_NESTED] nested record: {0}")]
    Nested(Box<WireError>),
    /// An absent value was supplied for a field declared non-nullable.
    #[error("[CARTON_FIELD_ABSENT] absent value on a non-nullable field")]
    AbsentRequired,
    /// No proxy factory is registered for the field's interface type.
    #[error("[CARTON_FIELD_FACTORY] no proxy factory registered for `{0}`")]
    MissingFactory(&'static str),
    /// A generic-value payload carried an unknown tag byte.
    #[error("[CARTON_FIELD_TAG] unknown variant tag {0:#04x}")]
    UnknownVariantTag(u8),
    /// A generic-value payload nested lists beyond the decode depth cap.
    #[error("[CARTON_FIELD_DEPTH] variant list nesting exceeds the decode limit")]
    VariantTooDeep,
}

impl FieldError {
    /// Wraps a fatal nested-record failure as a recoverable outer-field one.
    pub(crate) fn nested(err: WireError) -> Self {
        Self::Nested(Box::new(err))
    }
}

/// Descriptor-table build failures. Always a bug in the schema declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two descriptors in the record's composition chain share an identifier.
    #[error("[CARTON_DUPLICATE_FIELD] field id {id} is declared twice in record `{record}`")]
    DuplicateFieldId {
        /// Record type name.
        record: &'static str,
        /// The colliding identifier.
        id: u16,
    },
    /// A descriptor uses the reserved envelope magic as its identifier.
    #[error("[CARTON_RESERVED_FIELD] field id {id:#06x} is the envelope magic and cannot be declared in record `{record}`")]
    ReservedFieldId {
        /// Record type name.
        record: &'static str,
        /// The reserved identifier.
        id: u16,
    },
    /// A typed-interface field's proxy factory was not registered before the
    /// descriptor table was built.
    #[error("[CARTON_MISSING_FACTORY] no proxy factory registered for interface `{interface}`")]
    MissingProxyFactory {
        /// Interface type name.
        interface: &'static str,
    },
    /// A proxy factory was registered twice for the same interface type.
    #[error("[CARTON_DUPLICATE_FACTORY] proxy factory already registered for interface `{interface}`")]
    DuplicateProxyFactory {
        /// Interface type name.
        interface: &'static str,
    },
}
