// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Handle-to-proxy factory registry for typed-interface fields.
//!
//! A typed-interface field carries an opaque [`Handle`] on the wire; turning
//! it back into a strongly typed proxy needs a per-interface constructor.
//! Factories are registered explicitly, once, before the first schema that
//! mentions the interface is built — descriptor-table validation calls
//! [`ensure_factory`] and fails fast on a missing registration rather than
//! searching for a constructor at decode time.
//!
//! The registry is process-global, append-only, and read-mostly: the same
//! race-tolerant shape as the schema cache.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use crate::error::{FieldError, SchemaError};
use crate::parcel::Handle;

type Registry = HashMap<TypeId, Box<dyn Any + Send + Sync>>;

static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();

fn registry() -> &'static RwLock<Registry> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers the constructor turning a raw [`Handle`] into a `P` proxy.
///
/// # Errors
/// Returns [`SchemaError::DuplicateProxyFactory`] when a factory for `P` is
/// already registered; the first registration stays in effect.
pub fn register_proxy_factory<P: 'static>(factory: fn(Handle) -> P) -> Result<(), SchemaError> {
    let mut map = registry().write().unwrap_or_else(PoisonError::into_inner);
    if map.contains_key(&TypeId::of::<P>()) {
        return Err(SchemaError::DuplicateProxyFactory {
            interface: std::any::type_name::<P>(),
        });
    }
    map.insert(TypeId::of::<P>(), Box::new(factory));
    Ok(())
}

/// Constructs a `P` proxy from a decoded handle.
///
/// # Errors
/// Returns [`FieldError::MissingFactory`] when no factory is registered for
/// `P` — recoverable, the engine skips the field.
pub fn proxy_for<P: 'static>(handle: Handle) -> Result<P, FieldError> {
    let map = registry().read().unwrap_or_else(PoisonError::into_inner);
    let factory = map
        .get(&TypeId::of::<P>())
        .and_then(|cell| cell.downcast_ref::<fn(Handle) -> P>())
        .ok_or(FieldError::MissingFactory(std::any::type_name::<P>()))?;
    Ok(factory(handle))
}

/// Checks a factory for `P` exists. Called at descriptor-table build time.
///
/// # Errors
/// Returns [`SchemaError::MissingProxyFactory`] when `P` has no registered
/// factory.
pub fn ensure_factory<P: 'static>() -> Result<(), SchemaError> {
    let map = registry().read().unwrap_or_else(PoisonError::into_inner);
    if map.contains_key(&TypeId::of::<P>()) {
        Ok(())
    } else {
        Err(SchemaError::MissingProxyFactory {
            interface: std::any::type_name::<P>(),
        })
    }
}
