//! # Command Line Interface
//!
//! Inventory-script entry point: `--list`, `--host` and `--graph` over the
//! inventory built by [`VaultInventoryPlugin`].

pub mod output;

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::environment::EnvSnapshot;
use crate::inventory::Inventory;
use crate::plugin::{InventoryPlugin, VaultInventoryPlugin};
use output::{print_output_format, OutputFormat};

/// Environment variable naming the inventory file when `-i` is absent.
pub const INVENTORY_CONFIG_ENV: &str = "VAULT_INVENTORY_CONFIG";

const DEFAULT_INVENTORY_FILE: &str = "inventory_vault.yml";

#[derive(Parser, Debug)]
#[command(name = crate::APP_NAME)]
#[command(about = "Ansible dynamic inventory backed by HashiCorp Vault KV v2")]
#[command(version = crate::VERSION)]
#[command(group(ArgGroup::new("mode").required(true).args(["list", "host", "graph"])))]
pub struct Cli {
    /// Inventory file (defaults to $VAULT_INVENTORY_CONFIG, then inventory_vault.yml)
    #[arg(short, long, value_name = "FILE")]
    pub inventory: Option<PathBuf>,

    /// Print the whole inventory
    #[arg(long)]
    pub list: bool,

    /// Print the variables of a single host
    #[arg(long, value_name = "NAME")]
    pub host: Option<String>,

    /// Print the inventory as a tree
    #[arg(long)]
    pub graph: bool,

    /// Include host variables in --graph output
    #[arg(long, conflicts_with_all = ["list", "host"])]
    pub vars: bool,

    /// Output format for --list and --host
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Inventory file location: flag, then environment, then the default name.
pub fn resolve_inventory_path(flag: Option<PathBuf>, env: &EnvSnapshot) -> PathBuf {
    flag.or_else(|| env.get(INVENTORY_CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INVENTORY_FILE))
}

pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    initialise_logging(cli.verbose)?;

    debug!(version = crate::VERSION, "Starting {}", crate::APP_NAME);

    let env = EnvSnapshot::from_process();
    let path = resolve_inventory_path(cli.inventory.clone(), &env);
    debug!(path = %path.display(), "Using inventory file");

    let plugin = VaultInventoryPlugin::new();
    if !plugin.accepts(&path) {
        bail!(
            "{} is not a readable {} inventory file \
             (expected a name ending in inventory_vault.yml or inventory_vault.yaml)",
            path.display(),
            plugin.name()
        );
    }

    let mut inventory = Inventory::new();
    plugin
        .parse(&mut inventory, &path, &env)
        .await
        .with_context(|| format!("Failed to load inventory from {}", path.display()))?;

    if cli.list {
        print_output_format(&inventory.to_list_json(), cli.output)?;
    } else if let Some(host) = cli.host.as_deref() {
        let vars = inventory.host_vars(host).cloned().unwrap_or_default();
        print_output_format(&vars, cli.output)?;
    } else {
        print!("{}", inventory.render_graph(cli.vars));
    }

    Ok(())
}

/// Install the stderr log subscriber; stdout is reserved for the inventory.
fn initialise_logging(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_env_filter(filter).with_writer(std::io::stderr).finish(),
    )
    .is_err()
    {
        // Subscriber already set elsewhere (e.g. integration tests); ignore.
    }
    Ok(())
}
