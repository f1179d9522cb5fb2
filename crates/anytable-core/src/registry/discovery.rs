use crate::{
    adapter::{AdapterArgs, AdapterConfig, AdapterFactory, Support},
    error::InternalError,
    obs::sink::{self, MetricsEvent},
    registry::AdapterSet,
};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};
use tracing::debug;

///
/// ProbeState
///
/// Where discovery stands for one identifier.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProbeState {
    Unresolved,
    ProbingFast,
    ProbingSlow,
    Resolved,
    Unsupported,
}

///
/// Binding
///
/// The adapter that claimed an identifier, with the constructor arguments
/// derived from it and the adapter's keyword configuration.
///

#[derive(Clone)]
pub struct Binding {
    pub adapter: String,
    pub factory: Arc<dyn AdapterFactory>,
    pub args: AdapterArgs,
    pub config: AdapterConfig,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("adapter", &self.adapter)
            .field("args", &self.args)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Run the two-phase probe for one identifier.
///
/// The fast pass asks every adapter, in registration order, without
/// allowing I/O; the first `Yes` wins. Adapters that answered `Maybe` are
/// then asked again with I/O allowed, in the same order.
///
/// Returns the binding and whether the slow pass decided it.
pub fn find_adapter(
    identifier: &str,
    adapters: &AdapterSet,
    configs: &BTreeMap<String, AdapterConfig>,
) -> Result<(Binding, bool), InternalError> {
    let empty = AdapterConfig::new();
    let config_for = |name: &str| configs.get(name).unwrap_or(&empty);

    debug!(%identifier, state = ?ProbeState::ProbingFast, "probing adapters");

    let mut maybe = Vec::new();
    for (name, factory) in adapters.iter() {
        match factory.supports(identifier, true, config_for(name)) {
            Support::Yes => return bind(identifier, name, factory, config_for(name)).map(|b| (b, false)),
            Support::Maybe => maybe.push((name, factory)),
            Support::No => {}
        }
    }

    let state = if maybe.is_empty() {
        ProbeState::Unsupported
    } else {
        ProbeState::ProbingSlow
    };
    debug!(%identifier, ?state, candidates = maybe.len(), "fast probe inconclusive");

    for (name, factory) in maybe {
        if factory.supports(identifier, false, config_for(name)) == Support::Yes {
            return bind(identifier, name, factory, config_for(name)).map(|b| (b, true));
        }
    }

    debug!(%identifier, state = ?ProbeState::Unsupported, "no adapter claimed identifier");
    Err(InternalError::no_adapter_found(identifier))
}

fn bind(
    identifier: &str,
    name: &str,
    factory: &Arc<dyn AdapterFactory>,
    config: &AdapterConfig,
) -> Result<Binding, InternalError> {
    let args = factory.parse_identifier(identifier)?;
    debug!(%identifier, adapter = %name, state = ?ProbeState::Resolved, "adapter resolved");

    Ok(Binding {
        adapter: name.to_string(),
        factory: Arc::clone(factory),
        args,
        config: config.clone(),
    })
}

///
/// Discovery
///
/// Per-connection memo of resolved identifiers. A resolved identifier is
/// never probed again; failures are not remembered.
///

#[derive(Debug, Default)]
pub struct Discovery {
    bindings: HashMap<String, Binding>,
}

impl Discovery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self, identifier: &str) -> ProbeState {
        if self.bindings.contains_key(identifier) {
            ProbeState::Resolved
        } else {
            ProbeState::Unresolved
        }
    }

    #[must_use]
    pub fn binding(&self, identifier: &str) -> Option<&Binding> {
        self.bindings.get(identifier)
    }

    pub fn resolve(
        &mut self,
        identifier: &str,
        adapters: &AdapterSet,
        configs: &BTreeMap<String, AdapterConfig>,
    ) -> Result<&Binding, InternalError> {
        if !self.bindings.contains_key(identifier) {
            let (binding, slow_probe) = find_adapter(identifier, adapters, configs)?;
            sink::record(MetricsEvent::Discovery {
                identifier,
                adapter: &binding.adapter,
                slow_probe,
            });
            self.bindings.insert(identifier.to_string(), binding);
        }

        self.bindings
            .get(identifier)
            .ok_or_else(|| InternalError::no_adapter_found(identifier))
    }
}
