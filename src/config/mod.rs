//! # Configuration Management
//!
//! Two inputs drive a run: the inventory file (`inventory_vault.yml`), parsed
//! here into an immutable [`InventoryConfig`], and the process environment,
//! handled by [`environment`].
//!
//! ```yaml
//! plugin: inventory_vault
//! vault_secret_path: services/web
//! vault_mount_point: secret
//! ```

pub mod environment;
pub mod secret;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{Error, Result};
use crate::vault::trust::TrustPolicy;
use environment::EnvSnapshot;

pub use environment::{Credentials, VaultEnvironment};
pub use secret::SecretString;

/// Value expected in the optional `plugin` key.
pub const PLUGIN_NAME: &str = "inventory_vault";

/// Fallback location of the shared trust bundle for `append_bundle`.
pub const SSL_CERT_FILE: &str = "SSL_CERT_FILE";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How the custom CA reaches the HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustPolicyKind {
    /// Attach the CA to this session's client only
    #[default]
    Attach,
    /// Append the CA to a shared bundle file when the chain is untrusted
    AppendBundle,
}

/// Raw document shape. Everything is optional so missing keys can be
/// reported by name instead of as a serde error.
#[derive(Debug, Default, Deserialize)]
struct InventoryFile {
    plugin: Option<String>,
    vault_secret_path: Option<String>,
    vault_mount_point: Option<String>,
    vault_approle_mount: Option<String>,
    vault_jwt_mount: Option<String>,
    vault_namespace: Option<String>,
    vault_timeout: Option<u64>,
    vault_trust_policy: Option<TrustPolicyKind>,
    vault_trust_bundle: Option<PathBuf>,
}

/// Validated inventory file contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    /// Secret path with surrounding slashes removed
    pub vault_secret_path: String,
    /// KV v2 mount name
    pub vault_mount_point: String,
    pub approle_mount: String,
    pub jwt_mount: String,
    pub namespace: Option<String>,
    pub timeout: Duration,
    pub trust_policy: TrustPolicyKind,
    pub trust_bundle: Option<PathBuf>,
}

impl InventoryConfig {
    /// Parse and validate a YAML inventory document.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let raw: InventoryFile = if contents.trim().is_empty() {
            InventoryFile::default()
        } else {
            serde_yaml::from_str(contents)
                .map_err(|e| Error::config(format!("Failed to parse inventory file: {}", e)))?
        };

        if let Some(plugin) = raw.plugin.as_deref() {
            if plugin != PLUGIN_NAME {
                return Err(Error::config(format!(
                    "plugin '{}' does not match '{}'",
                    plugin, PLUGIN_NAME
                )));
            }
        }

        let secret_path =
            raw.vault_secret_path.ok_or_else(|| Error::missing_key("vault_secret_path"))?;
        let secret_path = secret_path.trim_matches('/').to_string();
        if secret_path.is_empty() {
            return Err(Error::config("vault_secret_path cannot be empty"));
        }

        let group = crate::inventory::group_name_for(&secret_path);
        if crate::inventory::RESERVED_GROUP_NAMES.contains(&group) {
            return Err(Error::config(format!(
                "vault_secret_path '{}' would create the reserved group '{}'",
                secret_path, group
            )));
        }

        let mount_point =
            raw.vault_mount_point.ok_or_else(|| Error::missing_key("vault_mount_point"))?;
        let mount_point = mount_point.trim_matches('/').to_string();
        if mount_point.is_empty() {
            return Err(Error::config("vault_mount_point cannot be empty"));
        }

        let timeout_secs = raw.vault_timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::config("vault_timeout must be greater than zero"));
        }

        Ok(Self {
            vault_secret_path: secret_path,
            vault_mount_point: mount_point,
            approle_mount: raw.vault_approle_mount.unwrap_or_else(|| "approle".to_string()),
            jwt_mount: raw.vault_jwt_mount.unwrap_or_else(|| "jwt".to_string()),
            namespace: raw.vault_namespace.filter(|ns| !ns.is_empty()),
            timeout: Duration::from_secs(timeout_secs),
            trust_policy: raw.vault_trust_policy.unwrap_or_default(),
            trust_bundle: raw.vault_trust_bundle,
        })
    }

    /// Read and validate an inventory file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn secret_path(&self) -> &str {
        &self.vault_secret_path
    }

    /// Group name derived from the last segment of the secret path.
    pub fn group_name(&self) -> &str {
        crate::inventory::group_name_for(&self.vault_secret_path)
    }

    /// Resolve the configured trust policy, using `SSL_CERT_FILE` when
    /// `append_bundle` has no explicit bundle.
    pub fn trust_policy(&self, env: &EnvSnapshot) -> Result<TrustPolicy> {
        match self.trust_policy {
            TrustPolicyKind::Attach => Ok(TrustPolicy::Attach),
            TrustPolicyKind::AppendBundle => {
                let bundle = self
                    .trust_bundle
                    .clone()
                    .or_else(|| env.get(SSL_CERT_FILE).map(PathBuf::from))
                    .ok_or_else(|| {
                        Error::config(
                            "vault_trust_policy 'append_bundle' needs vault_trust_bundle \
                             or SSL_CERT_FILE",
                        )
                    })?;
                Ok(TrustPolicy::AppendToBundle { bundle })
            }
        }
    }
}
