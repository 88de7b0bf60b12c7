//! In-memory inventory with Ansible renderings.
//!
//! Keeps hosts and groups in insertion order and renders them as the JSON
//! document an inventory script returns for `--list`, or as the tree printed
//! by `ansible-inventory --graph`.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Map, Value};

use super::{GroupId, HostVars, InventoryGraph, RESERVED_GROUP_NAMES};
use crate::errors::{Error, Result};

const ALL: &str = "all";
const UNGROUPED: &str = "ungrouped";
const META: &str = "_meta";

#[derive(Debug, Clone, Default)]
struct Group {
    name: String,
    hosts: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    groups: Vec<Group>,
    hosts: Vec<String>,
    host_vars: HashMap<String, HostVars>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.groups.is_empty()
    }

    /// Host names in the order they were added.
    pub fn host_names(&self) -> Vec<&str> {
        self.hosts.iter().map(String::as_str).collect()
    }

    /// Group names in the order they were added, without `all`/`ungrouped`.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    /// Members of a group in the order they were attached.
    pub fn group_hosts(&self, group: &str) -> Option<Vec<&str>> {
        self.group(group).map(|g| g.hosts.iter().map(String::as_str).collect())
    }

    pub fn host_vars(&self, host: &str) -> Option<&HostVars> {
        self.host_vars.get(host)
    }

    fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    fn ungrouped(&self) -> Vec<&str> {
        self.hosts
            .iter()
            .filter(|h| !self.groups.iter().any(|g| g.hosts.contains(h)))
            .map(String::as_str)
            .collect()
    }

    /// Inventory script `--list` document.
    pub fn to_list_json(&self) -> Value {
        let mut doc = Map::new();

        let hostvars: BTreeMap<&str, &HostVars> =
            self.host_vars.iter().map(|(h, vars)| (h.as_str(), vars)).collect();
        doc.insert(META.to_string(), json!({ "hostvars": hostvars }));

        let mut children = vec![UNGROUPED.to_string()];
        children.extend(self.groups.iter().map(|g| g.name.clone()));
        doc.insert(ALL.to_string(), json!({ "children": children }));

        let ungrouped = self.ungrouped();
        if !ungrouped.is_empty() {
            doc.insert(UNGROUPED.to_string(), json!({ "hosts": ungrouped }));
        }

        for group in &self.groups {
            doc.insert(group.name.clone(), json!({ "hosts": group.hosts }));
        }

        Value::Object(doc)
    }

    /// `ansible-inventory --graph` style tree, optionally with host variables.
    pub fn render_graph(&self, with_vars: bool) -> String {
        let mut out = format!("@{}:\n", ALL);

        let mut sections: Vec<(&str, Vec<&str>)> = vec![(UNGROUPED, self.ungrouped())];
        sections.extend(self.groups.iter().map(|g| {
            (g.name.as_str(), g.hosts.iter().map(String::as_str).collect::<Vec<_>>())
        }));
        sections.sort_by(|a, b| a.0.cmp(b.0));

        for (name, mut hosts) in sections {
            out.push_str(&format!("  |--@{}:\n", name));
            hosts.sort_unstable();
            for host in hosts {
                out.push_str(&format!("  |  |--{}\n", host));
                if !with_vars {
                    continue;
                }
                if let Some(vars) = self.host_vars.get(host) {
                    for (key, value) in vars {
                        let value = display_value(value);
                        out.push_str(&format!("  |  |  |--{{{} = {}}}\n", key, value));
                    }
                }
            }
        }

        out
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl InventoryGraph for Inventory {
    fn add_group(&mut self, name: &str) -> Result<GroupId> {
        if name.is_empty() {
            return Err(Error::config("group name cannot be empty"));
        }
        if RESERVED_GROUP_NAMES.contains(&name) {
            return Err(Error::config(format!("group name '{}' is reserved", name)));
        }
        if self.group(name).is_none() {
            self.groups.push(Group { name: name.to_string(), hosts: Vec::new() });
        }
        Ok(GroupId::new(name))
    }

    fn add_host(&mut self, name: &str) -> Result<()> {
        if !self.host_vars.contains_key(name) {
            self.hosts.push(name.to_string());
            self.host_vars.insert(name.to_string(), HostVars::new());
        }
        Ok(())
    }

    fn set_variable(&mut self, host: &str, key: &str, value: Value) -> Result<()> {
        let vars =
            self.host_vars.get_mut(host).ok_or_else(|| Error::UnknownHost(host.to_string()))?;
        vars.insert(key.to_string(), value);
        Ok(())
    }

    fn add_child(&mut self, group: &GroupId, host: &str) -> Result<()> {
        if !self.host_vars.contains_key(host) {
            return Err(Error::UnknownHost(host.to_string()));
        }
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.name == group.as_str())
            .ok_or_else(|| Error::UnknownGroup(group.to_string()))?;
        if !group.hosts.iter().any(|h| h == host) {
            group.hosts.push(host.to_string());
        }
        Ok(())
    }
}
