//! Module: registry
//! Responsibility: process-wide catalog of adapter factories and the
//! per-connection discovery of which adapter owns an identifier.
//! Does not own: adapter construction details (see `adapter`).

mod discovery;

pub use discovery::{Binding, Discovery, ProbeState, find_adapter};

use crate::{adapter::AdapterFactory, error::InternalError};
use parking_lot::RwLock;
use std::{
    fmt,
    sync::{
        Arc, LazyLock,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::debug;

static GLOBAL: LazyLock<AdapterRegistry> = LazyLock::new(AdapterRegistry::new);

/// The process-wide registry.
#[must_use]
pub fn global() -> &'static AdapterRegistry {
    &GLOBAL
}

///
/// RegistryEntry
///

#[derive(Clone)]
struct RegistryEntry {
    name: String,
    factory: Arc<dyn AdapterFactory>,
}

impl RegistryEntry {
    fn same_factory(&self, other: &Arc<dyn AdapterFactory>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.factory), Arc::as_ptr(other))
    }
}

///
/// AdapterRegistry
///
/// Append-only list of adapter factories in registration order.
/// Several implementations may share a name unless the registry is
/// restricted, in which case the second registration is refused.
///

#[derive(Default)]
pub struct AdapterRegistry {
    entries: RwLock<Vec<RegistryEntry>>,
    restricted: AtomicBool,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that rejects a second implementation under one name.
    #[must_use]
    pub fn restricted() -> Self {
        let registry = Self::new();
        registry.set_restricted(true);
        registry
    }

    pub fn set_restricted(&self, restricted: bool) {
        self.restricted.store(restricted, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_restricted(&self) -> bool {
        self.restricted.load(Ordering::SeqCst)
    }

    /// Register under the factory's own name.
    pub fn register(&self, factory: Arc<dyn AdapterFactory>) -> Result<(), InternalError> {
        let name = factory.name().to_string();
        self.register_as(name, factory)
    }

    /// Register under an explicit name. Registering the same factory twice
    /// is a no-op.
    pub fn register_as(&self, name: impl Into<String>, factory: Arc<dyn AdapterFactory>) -> Result<(), InternalError> {
        let name = name.into();
        let mut entries = self.entries.write();

        let mut taken = false;
        for entry in entries.iter().filter(|entry| entry.name == name) {
            if entry.same_factory(&factory) {
                return Ok(());
            }
            taken = true;
        }
        if taken && self.is_restricted() {
            return Err(InternalError::duplicate_adapter_name(name));
        }

        debug!(adapter = %name, safe = factory.is_safe(), "registering adapter");
        entries.push(RegistryEntry { name, factory });

        Ok(())
    }

    /// Registered names in first-registration order, without duplicates.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for entry in self.entries.read().iter() {
            if !names.contains(&entry.name) {
                names.push(entry.name.clone());
            }
        }
        names
    }

    /// Snapshot the adapters a connection may use.
    ///
    /// Unsafe mode: `allow == None` loads every name, otherwise only the
    /// listed ones; the first implementation of a name wins.
    ///
    /// Safe mode: only listed names load (none without a list), names with
    /// several implementations are refused, and unsafe adapters are skipped.
    pub fn load(&self, allow: Option<&[String]>, safe: bool) -> Result<AdapterSet, InternalError> {
        let entries = self.entries.read();
        let mut loaded: Vec<(String, Arc<dyn AdapterFactory>)> = Vec::new();

        for entry in entries.iter() {
            let allowed = match allow {
                Some(names) => names.iter().any(|name| *name == entry.name),
                None => !safe,
            };
            if !allowed || loaded.iter().any(|(name, _)| *name == entry.name) {
                continue;
            }

            if safe {
                let implementations = entries.iter().filter(|e| e.name == entry.name).count();
                if implementations > 1 {
                    return Err(InternalError::duplicate_adapter_name(entry.name.clone()));
                }
                if !entry.factory.is_safe() {
                    debug!(adapter = %entry.name, "skipping unsafe adapter in safe mode");
                    continue;
                }
            }

            loaded.push((entry.name.clone(), Arc::clone(&entry.factory)));
        }

        Ok(AdapterSet {
            entries: loaded.into(),
        })
    }

    /// Remove every registration. Intended for tests.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

///
/// AdapterSet
///
/// Immutable snapshot of loaded adapters, in registration order.
/// Lookups take no lock.
///

#[derive(Clone, Default)]
pub struct AdapterSet {
    entries: Arc<[(String, Arc<dyn AdapterFactory>)]>,
}

impl AdapterSet {
    /// Build a set directly, bypassing any registry.
    #[must_use]
    pub fn from_factories(factories: impl IntoIterator<Item = Arc<dyn AdapterFactory>>) -> Self {
        let entries: Vec<_> = factories
            .into_iter()
            .map(|factory| (factory.name().to_string(), factory))
            .collect();

        Self {
            entries: entries.into(),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn AdapterFactory>> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, factory)| factory)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn AdapterFactory>)> {
        self.entries.iter().map(|(name, factory)| (name.as_str(), factory))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for AdapterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests;
