//! ## Crate layout
//! - `adapters`: builtin adapters (`memory`, `generator`, `jsonl`).
//! - `config`: TOML configuration for connections.
//! - `core`: adapter contract, pushdown planner, virtual tables and the
//!   connection that completes statements locally.
//! - `error`: the public error taxonomy.
//!
//! `connect` registers the builtin adapters with the process-wide registry
//! and opens a connection shaped by an [`AnytableConfig`].

pub use anytable_adapters as adapters;
pub use anytable_config as config;
pub use anytable_core as core;

mod error;

pub use error::{Error, ErrorKind, ErrorOrigin};

use anytable_config::AnytableConfig;
use anytable_core::{registry, session::Connection};
use std::path::Path;
use tracing::debug;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Open a connection against the builtin adapters plus anything already
/// registered with the global registry.
///
/// A safe connection leaves the global registry restricted for the rest of
/// the process, so a second implementation under a taken name is refused
/// when it is registered.
pub fn connect(config: &AnytableConfig) -> Result<Connection, Error> {
    let registry = registry::global();
    if config.safe {
        registry.set_restricted(true);
    }
    adapters::register_builtin(registry)?;
    debug!(safe = config.safe, adapters = ?config.adapters, "connecting");

    Ok(Connection::open(registry, config.connection_options())?)
}

/// `connect` with configuration read from a TOML file.
pub fn connect_file(path: impl AsRef<Path>) -> Result<Connection, Error> {
    let config = AnytableConfig::from_toml_file(path)?;

    connect(&config)
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::{Error, ErrorKind, connect};
    pub use anytable_config::AnytableConfig;
    pub use anytable_core::prelude::*;
}
