//! Inventory Builder
//!
//! Turns the enumerated secrets into one group of hosts. The group is created
//! before the first entry is consumed, so a path with no leaf secrets still
//! produces an empty group.

use futures::{pin_mut, Stream, TryStreamExt};
use tracing::{debug, info};

use super::{GroupId, InventoryGraph, SecretEntry};
use crate::errors::Result;

#[derive(Debug, Clone)]
pub struct InventoryBuilder {
    group_name: String,
}

impl InventoryBuilder {
    pub fn new(group_name: impl Into<String>) -> Self {
        Self { group_name: group_name.into() }
    }

    /// Drain `entries` into `graph`, returning the number of hosts added.
    ///
    /// The first error, from the stream or the graph, stops the build. Hosts
    /// applied before it stay in the graph.
    pub async fn build<G, S>(&self, graph: &mut G, entries: S) -> Result<usize>
    where
        G: InventoryGraph + ?Sized,
        S: Stream<Item = Result<SecretEntry>>,
    {
        let group = graph.add_group(&self.group_name)?;
        pin_mut!(entries);

        let mut count = 0;
        while let Some(entry) = entries.try_next().await? {
            apply_entry(graph, &group, entry)?;
            count += 1;
        }

        info!(group = %group, hosts = count, "Inventory populated");
        Ok(count)
    }
}

fn apply_entry<G>(graph: &mut G, group: &GroupId, entry: SecretEntry) -> Result<()>
where
    G: InventoryGraph + ?Sized,
{
    let SecretEntry { host_name, variables } = entry;

    graph.add_host(&host_name)?;
    // Variable names only; values are secret material.
    debug!(host = %host_name, variables = ?variables.keys().collect::<Vec<_>>(), "Adding host");
    for (key, value) in variables {
        graph.set_variable(&host_name, &key, value)?;
    }
    graph.add_child(group, &host_name)
}
