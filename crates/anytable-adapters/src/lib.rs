//! Builtin adapters: in-memory tables, generated sequences and
//! JSON-lines files.
#![warn(unreachable_pub)]

pub mod generator;
pub mod jsonl;
pub mod memory;

pub use generator::GeneratorFactory;
pub use jsonl::JsonLinesFactory;
pub use memory::{MemoryFactory, MemoryStore};

use anytable_core::{adapter::AdapterFactory, error::InternalError, registry::AdapterRegistry};
use std::sync::{Arc, LazyLock};

static MEMORY: LazyLock<Arc<MemoryFactory>> = LazyLock::new(|| Arc::new(MemoryFactory::new()));

/// Store behind the builtin `memory` adapter.
#[must_use]
pub fn memory_store() -> MemoryStore {
    MEMORY.store()
}

/// Builtin factories in registration order. The same instances are
/// returned on every call, so registering them twice is a no-op.
#[must_use]
pub fn builtin() -> Vec<Arc<dyn AdapterFactory>> {
    static OTHERS: LazyLock<[Arc<dyn AdapterFactory>; 2]> =
        LazyLock::new(|| [Arc::new(GeneratorFactory), Arc::new(JsonLinesFactory)]);

    let memory: Arc<dyn AdapterFactory> = MEMORY.clone();
    std::iter::once(memory).chain(OTHERS.iter().cloned()).collect()
}

/// Register every builtin adapter under its own name.
pub fn register_builtin(registry: &AdapterRegistry) -> Result<(), InternalError> {
    for factory in builtin() {
        registry.register(factory)?;
    }

    Ok(())
}

///
/// TESTS
///
