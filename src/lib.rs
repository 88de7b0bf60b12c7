//! # vault-inventory
//!
//! Ansible dynamic inventory backed by HashiCorp Vault. Every leaf secret
//! under one KV v2 path becomes a host; the secret's key/value pairs become
//! that host's variables; all hosts join one group named after the last
//! segment of the path.
//!
//! ```text
//! Environment Resolver → Authenticator → Secret Enumerator → Inventory Builder
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use vault_inventory::config::environment::EnvSnapshot;
//! use vault_inventory::{Inventory, InventoryConfig, VaultInventoryPlugin};
//!
//! # async fn run() -> vault_inventory::Result<()> {
//! let config = InventoryConfig::load("inventory_vault.yml".as_ref())?;
//! let mut inventory = Inventory::new();
//! VaultInventoryPlugin::new()
//!     .populate(&mut inventory, &config, &EnvSnapshot::from_process())
//!     .await?;
//! println!("{}", inventory.to_list_json());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod inventory;
pub mod plugin;
pub mod vault;

// Re-export commonly used types and traits
pub use config::InventoryConfig;
pub use errors::{Error, Result};
pub use inventory::{Inventory, InventoryBuilder, InventoryGraph};
pub use plugin::{InventoryPlugin, VaultInventoryPlugin};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
