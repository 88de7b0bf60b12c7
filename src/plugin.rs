//! # Inventory Plugin
//!
//! The contract an orchestration host uses to drive an inventory source, and
//! the Vault-backed implementation of it.
//!
//! A run is strictly sequential: resolve the environment, authenticate,
//! enumerate secrets, build the graph. Environment and configuration are
//! validated before any network call.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::config::environment::{self, EnvSnapshot};
use crate::config::{InventoryConfig, PLUGIN_NAME};
use crate::errors::Result;
use crate::inventory::{InventoryBuilder, InventoryGraph};
use crate::vault::{Authenticator, SecretEnumerator, SessionOptions};

const ACCEPTED_SUFFIXES: [&str; 2] = ["inventory_vault.yml", "inventory_vault.yaml"];

/// Inventory source the host can discover and invoke.
#[async_trait(?Send)]
pub trait InventoryPlugin {
    /// Name matched against the `plugin` key of inventory files.
    fn name(&self) -> &'static str;

    /// Whether this plugin handles the given inventory file.
    fn accepts(&self, path: &Path) -> bool;

    /// Populate `graph` from the inventory file at `path`.
    async fn parse(
        &self,
        graph: &mut dyn InventoryGraph,
        path: &Path,
        env: &EnvSnapshot,
    ) -> Result<()>;
}

/// Builds a single group from the leaf secrets of one KV v2 path.
#[derive(Debug, Default, Clone, Copy)]
pub struct VaultInventoryPlugin;

impl VaultInventoryPlugin {
    pub fn new() -> Self {
        Self
    }

    /// Run the pipeline for an already-loaded configuration.
    ///
    /// Returns the number of hosts added.
    #[instrument(
        skip_all,
        fields(mount = %config.vault_mount_point, path = %config.vault_secret_path)
    )]
    pub async fn populate<G>(
        &self,
        graph: &mut G,
        config: &InventoryConfig,
        env: &EnvSnapshot,
    ) -> Result<usize>
    where
        G: InventoryGraph + ?Sized,
    {
        let vault_env = environment::resolve(env)?;
        let options = SessionOptions::from_config(config, env)?;

        let session = Authenticator::new(vault_env, options).authenticate().await?;

        let enumerator =
            SecretEnumerator::new(&session, &config.vault_mount_point, config.secret_path());
        let count = InventoryBuilder::new(config.group_name())
            .build(graph, enumerator.entries())
            .await?;

        info!(group = config.group_name(), hosts = count, "Vault inventory loaded");
        Ok(count)
    }
}

#[async_trait(?Send)]
impl InventoryPlugin for VaultInventoryPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn accepts(&self, path: &Path) -> bool {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if !ACCEPTED_SUFFIXES.iter().any(|suffix| file_name.ends_with(suffix)) {
            return false;
        }
        // Must exist and be readable.
        std::fs::File::open(path).and_then(|f| f.metadata()).map(|m| m.is_file()).unwrap_or(false)
    }

    async fn parse(
        &self,
        graph: &mut dyn InventoryGraph,
        path: &Path,
        env: &EnvSnapshot,
    ) -> Result<()> {
        debug!(path = %path.display(), "Parsing inventory file");
        let config = InventoryConfig::load(path)?;
        self.populate(graph, &config, env).await?;
        Ok(())
    }
}
