use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the four node roles that can terminate a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Central authority for the cluster.
    Controller,
    /// Machine daemon managing instances on one host.
    Host,
    /// Per-game-server worker process.
    Instance,
    /// Admin client.
    Control,
}

impl Role {
    /// Short lowercase name used in the wire form of [`LinkSpec`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Controller => "controller",
            Role::Host => "host",
            Role::Instance => "instance",
            Role::Control => "control",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known [`Role`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown role: {0:?}")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "controller" => Ok(Role::Controller),
            "host" => Ok(Role::Host),
            "instance" => Ok(Role::Instance),
            "control" => Ok(Role::Control),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

/// A directional edge between two adjacent [`Role`]s, e.g. `host-instance`.
///
/// `LinkSpec` only ever names a *pair*; whether that pair is one of the six
/// topology edges the cluster actually wires up is validated by the caller
/// (the schema crate's catalog construction), not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkSpec {
    pub source: Role,
    pub target: Role,
}

impl LinkSpec {
    pub const fn new(source: Role, target: Role) -> Self {
        Self { source, target }
    }

    /// The reverse edge (target becomes source and vice versa).
    pub const fn reversed(&self) -> LinkSpec {
        LinkSpec::new(self.target, self.source)
    }
}

impl fmt::Display for LinkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

/// Error returned when a string is not a well-formed `"<source>-<target>"` pair.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LinkSpecParseError {
    #[error("expected \"<source>-<target>\", got {0:?}")]
    Malformed(String),
    #[error(transparent)]
    Role(#[from] RoleParseError),
}

impl FromStr for LinkSpec {
    type Err = LinkSpecParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (src, tgt) = s
            .split_once('-')
            .ok_or_else(|| LinkSpecParseError::Malformed(s.to_string()))?;
        Ok(LinkSpec::new(src.parse()?, tgt.parse()?))
    }
}

impl Serialize for LinkSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LinkSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
