//! Inventory graph and the builder that fills it.
//!
//! [`InventoryGraph`] is the surface the orchestration host exposes: four
//! mutations, all of which merge when repeated. [`Inventory`] is the in-memory
//! implementation used by the command line entry point.

pub mod builder;
pub mod memory;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::Result;

pub use builder::InventoryBuilder;
pub use memory::Inventory;

/// Names the inventory-script document already uses at its top level.
pub const RESERVED_GROUP_NAMES: [&str; 3] = ["all", "ungrouped", "_meta"];

/// Variables attached to a single host, keyed by variable name.
pub type HostVars = BTreeMap<String, serde_json::Value>;

/// Handle returned by [`InventoryGraph::add_group`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One secret turned host: the listing key and the secret's key/value data.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretEntry {
    pub host_name: String,
    pub variables: HostVars,
}

/// Mutable inventory structure owned by the orchestration host.
///
/// Adding an existing group or host must merge, not fail.
pub trait InventoryGraph {
    fn add_group(&mut self, name: &str) -> Result<GroupId>;

    fn add_host(&mut self, name: &str) -> Result<()>;

    fn set_variable(&mut self, host: &str, key: &str, value: serde_json::Value) -> Result<()>;

    /// Make `host` a member of `group`.
    fn add_child(&mut self, group: &GroupId, host: &str) -> Result<()>;
}

/// Last `/`-delimited segment of a secret path, ignoring trailing slashes.
pub fn group_name_for(secret_path: &str) -> &str {
    let trimmed = secret_path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
