// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Field descriptors, descriptor-table construction, and the schema cache.
//!
//! A record type declares its wire fields once, as an explicit list of
//! [`FieldDescriptor`] entries — never via runtime type introspection. Each
//! descriptor pairs a stable 16-bit identifier with typed accessor
//! functions; the descriptor's wire kind decides which codec routine the
//! dispatch engine runs for it.
//!
//! [`RecordSchema`] is the validated table built from that declaration:
//! declaration-order fields for the encode walk plus an identifier index
//! for the decode loop. Building the table is where schema bugs surface —
//! duplicate identifiers anywhere in the composition chain, use of the
//! reserved envelope magic, or a typed-interface field whose proxy factory
//! was never registered. The build result (success or failure) is cached
//! for the process lifetime, so a broken declaration fails identically for
//! every instance of the type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, PoisonError, RwLock};

use bytes::Bytes;

use crate::error::{FieldError, SchemaError};
use crate::field;
use crate::frame::{FieldHeader, MAGIC_IDENTIFIER};
use crate::parcel::{Handle, Parcel};
use crate::proxy;
use crate::variant::Variant;

/// Stable 16-bit wire identifier for a field's role.
///
/// Identifiers are independent of declaration order and must be unique
/// across a record's whole composition chain. The reserved envelope magic
/// ([`MAGIC_IDENTIFIER`]) is excluded from the usable space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldId(pub u16);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Enumerated wire category governing a field's codec routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WireKind {
    /// 32-bit signed integer, fixed 4-byte payload.
    Int32,
    /// 64-bit signed integer, fixed 8-byte payload.
    Int64,
    /// 8-bit signed integer, carried as an int32.
    Byte,
    /// 16-bit signed integer, carried as an int32.
    Short,
    /// Boolean, carried as an int32.
    Bool,
    /// 32-bit IEEE-754 float, fixed 4-byte payload.
    Float,
    /// 64-bit IEEE-754 float, fixed 8-byte payload.
    Double,
    /// UTF-8 string, variable payload.
    Text,
    /// Raw byte array, variable payload.
    Blob,
    /// Opaque cross-process handle.
    Handle,
    /// Opaque handle converted to a typed proxy via a registered factory.
    Interface,
    /// Nested record, payload is a full recursive envelope.
    Nested,
    /// Ordered collection of 32-bit integers.
    Int32Seq,
    /// Ordered collection of UTF-8 strings.
    TextSeq,
    /// Ordered collection of nested records of one element type.
    NestedSeq,
    /// Heterogeneous ordered collection of tagged generic values.
    VariantSeq,
}

/// A record type whose members are tagged wire fields.
///
/// Implementations declare the descriptor table explicitly; the engine
/// default-constructs an instance before decode and fills known fields in.
/// Composition chains concatenate the base type's descriptors into
/// [`Record::fields`] — identifier uniqueness across the chain is enforced
/// when the table is built.
pub trait Record: Default + 'static {
    /// Type name used in diagnostics and schema errors.
    const NAME: &'static str;

    /// Declares the wire fields, in encode order.
    fn fields() -> Vec<FieldDescriptor<Self>>;
}

pub(crate) struct ScalarAccess<R, T> {
    pub(crate) get: fn(&R) -> T,
    pub(crate) set: fn(&mut R, T),
}

pub(crate) struct OptAccess<R, B: ?Sized, O> {
    pub(crate) get: fn(&R) -> Option<&B>,
    pub(crate) set: fn(&mut R, Option<O>),
}

pub(crate) struct NestedAccess<R> {
    /// Writes the payload at the cursor when present; `Ok(false)` means the
    /// value is absent and nothing was written.
    pub(crate) encode: Box<dyn Fn(&R, &mut Parcel) -> Result<bool, FieldError> + Send + Sync>,
    /// Reads the payload described by the header into the record; a
    /// zero-length header stores the absent value.
    pub(crate) decode:
        Box<dyn Fn(&mut R, &mut Parcel, &FieldHeader) -> Result<(), FieldError> + Send + Sync>,
}

pub(crate) struct InterfaceAccess<R> {
    pub(crate) get: fn(&R) -> Option<Handle>,
    pub(crate) set: Box<dyn Fn(&mut R, Option<Handle>) -> Result<(), FieldError> + Send + Sync>,
    pub(crate) ensure: fn() -> Result<(), SchemaError>,
}

pub(crate) enum FieldAccess<R> {
    Int32(ScalarAccess<R, i32>),
    Int64(ScalarAccess<R, i64>),
    Byte(ScalarAccess<R, i8>),
    Short(ScalarAccess<R, i16>),
    Bool(ScalarAccess<R, bool>),
    Float(ScalarAccess<R, f32>),
    Double(ScalarAccess<R, f64>),
    Text(OptAccess<R, str, String>),
    Blob(OptAccess<R, Bytes, Bytes>),
    Handle(OptAccess<R, Handle, Handle>),
    Interface(InterfaceAccess<R>),
    Nested(NestedAccess<R>),
    Int32Seq(OptAccess<R, [i32], Vec<i32>>),
    TextSeq(OptAccess<R, [String], Vec<String>>),
    NestedSeq(NestedAccess<R>),
    VariantSeq(OptAccess<R, [Variant], Vec<Variant>>),
}

impl<R> FieldAccess<R> {
    pub(crate) fn kind(&self) -> WireKind {
        match self {
            Self::Int32(_) => WireKind::Int32,
            Self::Int64(_) => WireKind::Int64,
            Self::Byte(_) => WireKind::Byte,
            Self::Short(_) => WireKind::Short,
            Self::Bool(_) => WireKind::Bool,
            Self::Float(_) => WireKind::Float,
            Self::Double(_) => WireKind::Double,
            Self::Text(_) => WireKind::Text,
            Self::Blob(_) => WireKind::Blob,
            Self::Handle(_) => WireKind::Handle,
            Self::Interface(_) => WireKind::Interface,
            Self::Nested(_) => WireKind::Nested,
            Self::Int32Seq(_) => WireKind::Int32Seq,
            Self::TextSeq(_) => WireKind::TextSeq,
            Self::NestedSeq(_) => WireKind::NestedSeq,
            Self::VariantSeq(_) => WireKind::VariantSeq,
        }
    }

    /// Statically known payload size for fixed scalars, `None` for
    /// variable-length kinds.
    pub(crate) fn fixed_size(&self) -> Option<u32> {
        match self {
            Self::Int32(_) | Self::Byte(_) | Self::Short(_) | Self::Bool(_) | Self::Float(_) => {
                Some(4)
            }
            Self::Int64(_) | Self::Double(_) => Some(8),
            _ => None,
        }
    }
}

/// One wire field of a record type: identifier, nullability, typed access.
///
/// Built through the per-kind constructors ([`FieldDescriptor::int32`],
/// [`FieldDescriptor::text`], [`FieldDescriptor::nested`], …). Variable
/// kinds default to nullable — an absent value encodes the zero-length
/// marker; chain [`required`](FieldDescriptor::required) to make an absent
/// value a per-field encode error instead.
pub struct FieldDescriptor<R> {
    id: FieldId,
    nullable: bool,
    pub(crate) access: FieldAccess<R>,
}

impl<R: Record> FieldDescriptor<R> {
    fn scalar(id: u16, access: FieldAccess<R>) -> Self {
        Self {
            id: FieldId(id),
            nullable: false,
            access,
        }
    }

    fn variable(id: u16, access: FieldAccess<R>) -> Self {
        Self {
            id: FieldId(id),
            nullable: true,
            access,
        }
    }

    /// Field identifier.
    #[must_use]
    pub fn id(&self) -> FieldId {
        self.id
    }

    /// Whether an absent value is legal for this field.
    #[must_use]
    pub fn nullable(&self) -> bool {
        self.nullable
    }

    /// Wire category of this field.
    #[must_use]
    pub fn kind(&self) -> WireKind {
        self.access.kind()
    }

    /// Marks the field non-nullable: encoding an absent value becomes a
    /// recoverable per-field error (the field is omitted and reported)
    /// rather than a zero-length marker.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// 32-bit integer field.
    pub fn int32(id: u16, get: fn(&R) -> i32, set: fn(&mut R, i32)) -> Self {
        Self::scalar(id, FieldAccess::Int32(ScalarAccess { get, set }))
    }

    /// 64-bit integer field.
    pub fn int64(id: u16, get: fn(&R) -> i64, set: fn(&mut R, i64)) -> Self {
        Self::scalar(id, FieldAccess::Int64(ScalarAccess { get, set }))
    }

    /// 8-bit integer field, carried as an int32 on the wire.
    pub fn byte(id: u16, get: fn(&R) -> i8, set: fn(&mut R, i8)) -> Self {
        Self::scalar(id, FieldAccess::Byte(ScalarAccess { get, set }))
    }

    /// 16-bit integer field, carried as an int32 on the wire.
    pub fn short(id: u16, get: fn(&R) -> i16, set: fn(&mut R, i16)) -> Self {
        Self::scalar(id, FieldAccess::Short(ScalarAccess { get, set }))
    }

    /// Boolean field, carried as an int32 on the wire.
    pub fn boolean(id: u16, get: fn(&R) -> bool, set: fn(&mut R, bool)) -> Self {
        Self::scalar(id, FieldAccess::Bool(ScalarAccess { get, set }))
    }

    /// 32-bit float field.
    pub fn float32(id: u16, get: fn(&R) -> f32, set: fn(&mut R, f32)) -> Self {
        Self::scalar(id, FieldAccess::Float(ScalarAccess { get, set }))
    }

    /// 64-bit float field.
    pub fn float64(id: u16, get: fn(&R) -> f64, set: fn(&mut R, f64)) -> Self {
        Self::scalar(id, FieldAccess::Double(ScalarAccess { get, set }))
    }

    /// UTF-8 string field.
    pub fn text(id: u16, get: fn(&R) -> Option<&str>, set: fn(&mut R, Option<String>)) -> Self {
        Self::variable(id, FieldAccess::Text(OptAccess { get, set }))
    }

    /// Raw byte-array field.
    pub fn blob(id: u16, get: fn(&R) -> Option<&Bytes>, set: fn(&mut R, Option<Bytes>)) -> Self {
        Self::variable(id, FieldAccess::Blob(OptAccess { get, set }))
    }

    /// Opaque handle field, passed through untouched.
    pub fn handle(
        id: u16,
        get: fn(&R) -> Option<&Handle>,
        set: fn(&mut R, Option<Handle>),
    ) -> Self {
        Self::variable(id, FieldAccess::Handle(OptAccess { get, set }))
    }

    /// Typed-interface field: a handle on the wire, a `P` proxy in memory.
    ///
    /// The handle-to-proxy factory for `P` must be registered through
    /// [`register_proxy_factory`](crate::register_proxy_factory) before the
    /// first schema naming `P` is built; table construction fails otherwise.
    pub fn interface<P: 'static>(
        id: u16,
        get: fn(&R) -> Option<Handle>,
        set: fn(&mut R, Option<P>),
    ) -> Self {
        Self::variable(
            id,
            FieldAccess::Interface(InterfaceAccess {
                get,
                set: Box::new(move |record, value| match value {
                    None => {
                        set(record, None);
                        Ok(())
                    }
                    Some(handle) => {
                        set(record, Some(proxy::proxy_for::<P>(handle)?));
                        Ok(())
                    }
                }),
                ensure: proxy::ensure_factory::<P>,
            }),
        )
    }

    /// Nested record field; the payload is a full recursive envelope.
    pub fn nested<N: Record>(
        id: u16,
        get: fn(&R) -> Option<&N>,
        set: fn(&mut R, Option<N>),
    ) -> Self {
        Self::variable(
            id,
            FieldAccess::Nested(NestedAccess {
                encode: Box::new(move |record, parcel| match get(record) {
                    Some(value) => {
                        field::write_nested(parcel, value)?;
                        Ok(true)
                    }
                    None => Ok(false),
                }),
                decode: Box::new(move |record, parcel, header| {
                    if header.len == 0 {
                        set(record, None);
                        return Ok(());
                    }
                    let value = field::read_nested::<N>(parcel)?;
                    set(record, Some(value));
                    Ok(())
                }),
            }),
        )
    }

    /// Ordered collection of 32-bit integers.
    pub fn int32_seq(
        id: u16,
        get: fn(&R) -> Option<&[i32]>,
        set: fn(&mut R, Option<Vec<i32>>),
    ) -> Self {
        Self::variable(id, FieldAccess::Int32Seq(OptAccess { get, set }))
    }

    /// Ordered collection of UTF-8 strings.
    pub fn text_seq(
        id: u16,
        get: fn(&R) -> Option<&[String]>,
        set: fn(&mut R, Option<Vec<String>>),
    ) -> Self {
        Self::variable(id, FieldAccess::TextSeq(OptAccess { get, set }))
    }

    /// Ordered collection of nested records, one homogeneous element type.
    pub fn nested_seq<N: Record>(
        id: u16,
        get: fn(&R) -> Option<&[N]>,
        set: fn(&mut R, Option<Vec<N>>),
    ) -> Self {
        Self::variable(
            id,
            FieldAccess::NestedSeq(NestedAccess {
                encode: Box::new(move |record, parcel| match get(record) {
                    Some(items) => {
                        field::write_record_seq(parcel, items)?;
                        Ok(true)
                    }
                    None => Ok(false),
                }),
                decode: Box::new(move |record, parcel, header| {
                    if header.len == 0 {
                        set(record, None);
                        return Ok(());
                    }
                    let items = field::read_record_seq::<N>(parcel)?;
                    set(record, Some(items));
                    Ok(())
                }),
            }),
        )
    }

    /// Heterogeneous ordered collection of tagged generic values.
    ///
    /// Prefer a concrete homogeneous kind where the schema allows it; this
    /// path exists for legacy and open-ended fields.
    pub fn variant_seq(
        id: u16,
        get: fn(&R) -> Option<&[Variant]>,
        set: fn(&mut R, Option<Vec<Variant>>),
    ) -> Self {
        Self::variable(id, FieldAccess::VariantSeq(OptAccess { get, set }))
    }
}

/// Validated, immutable descriptor table for one record type.
pub struct RecordSchema<R> {
    name: &'static str,
    fields: Vec<FieldDescriptor<R>>,
    by_id: HashMap<FieldId, usize>,
}

impl<R> fmt::Debug for RecordSchema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSchema")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .finish()
    }
}

type SchemaCache = HashMap<TypeId, &'static (dyn Any + Send + Sync)>;

static CACHE: OnceLock<RwLock<SchemaCache>> = OnceLock::new();

impl<R: Record> RecordSchema<R> {
    /// Returns the cached table for `R`, building and validating it on
    /// first use.
    ///
    /// Race-tolerant: concurrent first uses may both build, the first
    /// insert wins, and every caller sees the same outcome thereafter —
    /// including a build failure, which is replayed verbatim.
    ///
    /// # Errors
    /// Returns the [`SchemaError`] the table build produced.
    pub fn of() -> Result<&'static Self, SchemaError> {
        let cache = CACHE.get_or_init(|| RwLock::new(HashMap::new()));
        let key = TypeId::of::<R>();
        {
            let map = cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = map.get(&key) {
                return Self::resolve(*entry);
            }
        }
        let built = Self::build();
        let mut map = cache.write().unwrap_or_else(PoisonError::into_inner);
        let entry = *map.entry(key).or_insert_with(|| {
            let leaked: &'static (dyn Any + Send + Sync) = Box::leak(Box::new(built));
            leaked
        });
        Self::resolve(entry)
    }

    fn resolve(entry: &'static (dyn Any + Send + Sync)) -> Result<&'static Self, SchemaError> {
        match entry.downcast_ref::<Result<RecordSchema<R>, SchemaError>>() {
            Some(Ok(schema)) => Ok(schema),
            Some(Err(err)) => Err(err.clone()),
            None => unreachable!("schema cache entry holds a foreign type"),
        }
    }

    fn build() -> Result<Self, SchemaError> {
        let fields = R::fields();
        let mut by_id = HashMap::with_capacity(fields.len());
        for (index, descriptor) in fields.iter().enumerate() {
            if descriptor.id() == MAGIC_IDENTIFIER {
                return Err(SchemaError::ReservedFieldId {
                    record: R::NAME,
                    id: descriptor.id().0,
                });
            }
            if by_id.insert(descriptor.id(), index).is_some() {
                return Err(SchemaError::DuplicateFieldId {
                    record: R::NAME,
                    id: descriptor.id().0,
                });
            }
            if let FieldAccess::Interface(access) = &descriptor.access {
                (access.ensure)()?;
            }
        }
        Ok(Self {
            name: R::NAME,
            fields,
            by_id,
        })
    }

    /// Record type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Descriptors in declaration (encode) order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor<R>] {
        &self.fields
    }

    /// Looks a descriptor up by wire identifier.
    #[must_use]
    pub fn field_by_id(&self, id: FieldId) -> Option<&FieldDescriptor<R>> {
        self.by_id.get(&id).map(|&index| &self.fields[index])
    }
}
