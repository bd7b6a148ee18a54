// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Connection table: connector → target, with a target → connectors reverse index.
use std::collections::BTreeMap;

use rig_hierarchy::name::{namespace_of_path, split_namespace, strip_prefix_ignore_case};
use rig_hierarchy::{ElementKey, ElementType};
use serde::{Deserialize, Serialize};

/// A single connector → target edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModularRigConnection {
    /// Connector element, namespaced by its module.
    pub connector: ElementKey,
    /// Element the connector resolves to.
    pub target: ElementKey,
}

/// Forward list of connections plus a derived reverse index.
///
/// Each connector appears at most once as a source. The reverse index keeps,
/// per target, the connectors pointing at it in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModularRigConnections {
    connections: Vec<ModularRigConnection>,
    reverse: BTreeMap<ElementKey, Vec<ElementKey>>,
}

impl ModularRigConnections {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from a connection list; later duplicates win.
    pub fn from_list(list: impl IntoIterator<Item = ModularRigConnection>) -> Self {
        let mut table = Self::new();
        for connection in list {
            table.add_connection(connection.connector, connection.target);
        }
        table
    }

    /// Number of connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// True when there are no connections.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Connections in insertion order.
    pub fn connections(&self) -> &[ModularRigConnection] {
        &self.connections
    }

    /// Iterates connections in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ModularRigConnection> {
        self.connections.iter()
    }

    /// Connects `connector` to `target`, replacing any earlier target.
    pub fn add_connection(&mut self, connector: ElementKey, target: ElementKey) {
        self.remove_connection(&connector);
        let bucket = self.reverse.entry(target.clone()).or_default();
        if !bucket.contains(&connector) {
            bucket.push(connector.clone());
        }
        self.connections
            .push(ModularRigConnection { connector, target });
        debug_assert!(self.is_consistent(), "reverse index out of sync after add");
    }

    /// Removes the connection of `connector` and returns its former target.
    pub fn remove_connection(&mut self, connector: &ElementKey) -> Option<ElementKey> {
        let index = self
            .connections
            .iter()
            .position(|c| &c.connector == connector)?;
        let removed = self.connections.remove(index);
        if let Some(bucket) = self.reverse.get_mut(&removed.target) {
            bucket.retain(|c| c != connector);
            if bucket.is_empty() {
                self.reverse.remove(&removed.target);
            }
        }
        debug_assert!(self.is_consistent(), "reverse index out of sync after remove");
        Some(removed.target)
    }

    /// True when `connector` has a target.
    pub fn has_connection(&self, connector: &ElementKey) -> bool {
        self.connections.iter().any(|c| &c.connector == connector)
    }

    /// Target of `connector`.
    pub fn find_target_from_connector(&self, connector: &ElementKey) -> Option<&ElementKey> {
        self.connections
            .iter()
            .find(|c| &c.connector == connector)
            .map(|c| &c.target)
    }

    /// Connectors targeting `target`, in insertion order.
    pub fn find_connectors_from_target(&self, target: &ElementKey) -> &[ElementKey] {
        self.reverse
            .get(target)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Connections of the module at exactly `module_path`, keyed by local connector name.
    ///
    /// Connectors of descendant modules are not included.
    pub fn get_module_connection_map(&self, module_path: &str) -> BTreeMap<ElementKey, ElementKey> {
        self.connections
            .iter()
            .filter_map(|c| {
                let (prefix, local) = split_namespace(&c.connector.name, true)?;
                (prefix == module_path)
                    .then(|| (ElementKey::new(local, ElementType::Connector), c.target.clone()))
            })
            .collect()
    }

    /// Removes every connection matching `predicate` and returns them in order.
    pub fn remove_where(
        &mut self,
        mut predicate: impl FnMut(&ModularRigConnection) -> bool,
    ) -> Vec<ModularRigConnection> {
        let doomed: Vec<ModularRigConnection> = self
            .connections
            .iter()
            .filter(|c| predicate(c))
            .cloned()
            .collect();
        for connection in &doomed {
            self.remove_connection(&connection.connector);
        }
        doomed
    }

    /// Rewrites the module namespace `old_path` to `new_path` on both ends of
    /// every connection, comparing the prefix case-insensitively.
    pub(crate) fn rename_namespace(&mut self, old_path: &str, new_path: &str) {
        let old_ns = namespace_of_path(old_path);
        let new_ns = namespace_of_path(new_path);
        let rewrite = |key: &ElementKey| {
            strip_prefix_ignore_case(&key.name, &old_ns)
                .map(|rest| ElementKey::new(format!("{new_ns}{rest}"), key.ty))
        };
        let list: Vec<ModularRigConnection> = self
            .connections
            .iter()
            .map(|c| ModularRigConnection {
                connector: rewrite(&c.connector).unwrap_or_else(|| c.connector.clone()),
                target: rewrite(&c.target).unwrap_or_else(|| c.target.clone()),
            })
            .collect();
        *self = Self::from_list(list);
    }

    /// True when the reverse index mirrors the forward list exactly.
    pub fn is_consistent(&self) -> bool {
        let forward = self.connections.iter().all(|c| {
            self.reverse
                .get(&c.target)
                .is_some_and(|bucket| bucket.contains(&c.connector))
        });
        let backward = self.reverse.iter().all(|(target, bucket)| {
            !bucket.is_empty()
                && bucket.iter().all(|connector| {
                    self.find_target_from_connector(connector) == Some(target)
                })
        });
        forward && backward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(name: &str) -> ElementKey {
        ElementKey::connector(name)
    }

    #[test]
    fn add_replaces_previous_target() {
        let mut table = ModularRigConnections::new();
        let t1 = ElementKey::bone("t1");
        let t2 = ElementKey::bone("t2");
        table.add_connection(c("Arm:Root"), t1.clone());
        table.add_connection(c("Arm:Root"), t2.clone());
        assert_eq!(table.len(), 1);
        assert_eq!(table.find_target_from_connector(&c("Arm:Root")), Some(&t2));
        assert!(table.find_connectors_from_target(&t1).is_empty());
        assert_eq!(table.find_connectors_from_target(&t2).to_vec(), vec![c("Arm:Root")]);
    }

    #[test]
    fn reverse_bucket_keeps_insertion_order() {
        let mut table = ModularRigConnections::new();
        let shared = ElementKey::bone("spine");
        table.add_connection(c("B:Root"), shared.clone());
        table.add_connection(c("A:Root"), shared.clone());
        assert_eq!(
            table.find_connectors_from_target(&shared).to_vec(),
            vec![c("B:Root"), c("A:Root")]
        );
        assert_eq!(table.remove_connection(&c("B:Root")), Some(shared.clone()));
        assert_eq!(table.find_connectors_from_target(&shared).to_vec(), vec![c("A:Root")]);
        assert_eq!(table.remove_connection(&c("B:Root")), None);
    }

    #[test]
    fn module_connection_map_excludes_descendants() {
        let mut table = ModularRigConnections::new();
        table.add_connection(c("Arm:Root"), ElementKey::bone("shoulder"));
        table.add_connection(c("Arm:Hand:Root"), ElementKey::bone("wrist"));
        table.add_connection(c("Armor:Root"), ElementKey::bone("spine"));
        let map = table.get_module_connection_map("Arm");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&c("Root")), Some(&ElementKey::bone("shoulder")));
    }

    #[test]
    fn rename_namespace_rewrites_both_ends_only_on_segment_boundary() {
        let mut table = ModularRigConnections::new();
        table.add_connection(c("Arm:Hand:Root"), ElementKey::socket("Arm:wrist_socket"));
        table.add_connection(c("Armor:Root"), ElementKey::bone("spine"));
        table.rename_namespace("Arm", "Leg");
        assert_eq!(
            table.find_target_from_connector(&c("Leg:Hand:Root")),
            Some(&ElementKey::socket("Leg:wrist_socket"))
        );
        assert!(table.has_connection(&c("Armor:Root")));
        assert!(table.is_consistent());
    }
}
