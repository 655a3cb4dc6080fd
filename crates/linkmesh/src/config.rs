//! Per-node configuration loading (spec.md §1's ambient stack: "the
//! surrounding parts ... are external collaborators", but config loading
//! itself is never a Non-goal — every node still needs to know its own
//! role, its listen/connect address and its default request timeout).
//!
//! Layered the way `turbomcp-server::config` builds a `ServerConfig`
//! default and lets callers override pieces of it, but using the `config`
//! crate's own layering (defaults -> optional file -> environment) rather
//! than a hand-rolled builder, since this is the crate the rest of the
//! teacher's dependency stack reaches for when a real file/env layer is
//! wanted rather than an in-process builder.

use std::time::Duration;

use serde::Deserialize;

/// Failure loading or validating a node's configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("invalid role {0:?} in configuration")]
    InvalidRole(String),
}

/// What a process needs to know about itself before it can open any
/// [`crate::Link`]s: which role it plays, where to listen or connect, and
/// what default request timeout to hand new links (spec.md §9 Open
/// Question #1 — the timeout default, made per-node-overridable).
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub role: String,
    #[serde(default)]
    pub listen_addr: Option<String>,
    #[serde(default)]
    pub upstream_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    linkmesh_link::DEFAULT_TIMEOUT.as_secs()
}

impl NodeConfig {
    /// Load configuration by layering, in increasing priority: built-in
    /// defaults, an optional `path` file (TOML/JSON/YAML inferred from its
    /// extension), then `LINKMESH_*` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder()
            .set_default("request_timeout_secs", default_timeout_secs())?
            .set_default("role", "control")?;
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path).required(false));
        }
        builder = builder.add_source(::config::Environment::with_prefix("LINKMESH"));
        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn role(&self) -> Result<linkmesh_types::Role, ConfigError> {
        self.role.parse().map_err(|_| ConfigError::InvalidRole(self.role.clone()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
