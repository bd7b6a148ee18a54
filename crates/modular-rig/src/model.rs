// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Module tree: an ordered forest of module references plus the connection table.
//!
//! Modules live in a single flat array. Parent/child structure is a derived
//! index of array slots rebuilt after every structural change; outside code
//! addresses modules by path or through generation-checked [`ModuleHandle`]s,
//! never by slot.
use std::collections::{BTreeMap, VecDeque};

use rig_hierarchy::name::{join_namespace, namespace_of_path, split_namespace};
use rig_hierarchy::Hash;
use serde::{Deserialize, Serialize};

use crate::connections::{ModularRigConnection, ModularRigConnections};

/// One module placed in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleReference {
    /// Segment name, unique among siblings (case-insensitive).
    pub name: String,
    /// Display label; derived from the path unless set explicitly.
    #[serde(default)]
    pub short_name: String,
    /// When set, `short_name` is recomputed from the path after every change.
    #[serde(default = "default_true")]
    pub short_name_based_on_path: bool,
    /// Path of the parent module; empty for roots.
    #[serde(default)]
    pub parent_path: String,
    /// Name of the module class in the class registry.
    pub class: String,
    /// Configured variable values.
    #[serde(default)]
    pub config_values: BTreeMap<String, String>,
    /// Variable bindings: variable name → source path.
    #[serde(default)]
    pub bindings: BTreeMap<String, String>,
    /// Name before the last rename or reparent.
    #[serde(default)]
    pub previous_name: String,
    /// Parent path before the last reparent.
    #[serde(default)]
    pub previous_parent_path: String,
}

fn default_true() -> bool {
    true
}

impl ModuleReference {
    /// A fresh module with a path-based short name.
    pub fn new(name: impl Into<String>, class: impl Into<String>, parent_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            parent_path: parent_path.into(),
            short_name_based_on_path: true,
            ..Self::default()
        }
    }

    /// Full path of the module.
    pub fn path(&self) -> String {
        join_namespace(&self.parent_path, &self.name)
    }

    /// Namespace owned by the module (path plus separator).
    pub fn namespace(&self) -> String {
        namespace_of_path(&self.path())
    }

    /// True for modules without a parent.
    pub fn is_root(&self) -> bool {
        self.parent_path.is_empty()
    }

    /// Display label, falling back to the path.
    pub fn display_name(&self) -> String {
        if self.short_name.is_empty() {
            self.path()
        } else {
            self.short_name.clone()
        }
    }
}

/// Stable reference to a module valid until the next structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleHandle {
    slot: usize,
    generation: u64,
}

/// The module forest and its connections.
#[derive(Debug, Clone, Default)]
pub struct ModularRigModel {
    modules: Vec<ModuleReference>,
    connections: ModularRigConnections,
    selection: Vec<String>,
    roots: Vec<usize>,
    children: Vec<Vec<usize>>,
    generation: u64,
}

impl ModularRigModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a model from stored modules and connections.
    pub fn from_parts(
        modules: Vec<ModuleReference>,
        connections: impl IntoIterator<Item = ModularRigConnection>,
    ) -> Self {
        let mut model = Self {
            modules,
            connections: ModularRigConnections::from_list(connections),
            ..Self::default()
        };
        model.update_cached_children();
        model
    }

    /// Modules in storage order.
    pub fn modules(&self) -> &[ModuleReference] {
        &self.modules
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// True when the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// The connection table.
    pub fn connections(&self) -> &ModularRigConnections {
        &self.connections
    }

    /// Paths of the selected modules in selection order.
    pub fn selected_module_paths(&self) -> &[String] {
        &self.selection
    }

    /// Structural generation; bumped whenever the cached children are rebuilt.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Root modules in storage order.
    pub fn root_modules(&self) -> Vec<&ModuleReference> {
        self.roots.iter().map(|&slot| &self.modules[slot]).collect()
    }

    fn slot_of(&self, path: &str) -> Option<usize> {
        let mut level = &self.roots;
        let mut found = None;
        for segment in path.split(rig_hierarchy::NAMESPACE_SEPARATOR) {
            let slot = level
                .iter()
                .copied()
                .find(|&slot| self.modules[slot].name == segment)?;
            found = Some(slot);
            level = &self.children[slot];
        }
        found
    }

    /// Finds a module by path, matching each segment exactly (case-sensitive).
    pub fn find_module(&self, path: &str) -> Option<&ModuleReference> {
        if path.is_empty() {
            return None;
        }
        self.slot_of(path).map(|slot| &self.modules[slot])
    }

    /// Handle to the module at `path`.
    pub fn handle(&self, path: &str) -> Option<ModuleHandle> {
        if path.is_empty() {
            return None;
        }
        self.slot_of(path).map(|slot| ModuleHandle {
            slot,
            generation: self.generation,
        })
    }

    /// Dereferences a handle.
    ///
    /// Handles taken before a structural change are stale; using one is a
    /// programming error and trips an assertion in debug builds.
    pub fn get(&self, handle: ModuleHandle) -> Option<&ModuleReference> {
        debug_assert_eq!(
            handle.generation, self.generation,
            "stale module handle used after a structural change"
        );
        if handle.generation != self.generation {
            return None;
        }
        self.modules.get(handle.slot)
    }

    /// Storage slot of the module at `path`. Moves and renames keep slots;
    /// only deletion shifts them.
    pub(crate) fn storage_slot(&self, path: &str) -> Option<usize> {
        if path.is_empty() {
            return None;
        }
        self.slot_of(path)
    }

    /// Current path of the module stored in `slot`.
    pub(crate) fn path_at_slot(&self, slot: usize) -> Option<String> {
        self.modules.get(slot).map(ModuleReference::path)
    }

    /// Direct children of the module at `path`; roots for an empty path.
    pub fn children(&self, path: &str) -> Vec<&ModuleReference> {
        if path.is_empty() {
            return self.root_modules();
        }
        self.slot_of(path).map_or_else(Vec::new, |slot| {
            self.children[slot]
                .iter()
                .map(|&child| &self.modules[child])
                .collect()
        })
    }

    /// Parent path of the module at `path`.
    pub fn parent_path(&self, path: &str) -> Option<&str> {
        self.find_module(path).map(|m| m.parent_path.as_str())
    }

    /// Parent module of the module at `path`.
    pub fn parent_module(&self, path: &str) -> Option<&ModuleReference> {
        self.find_module(path)
            .filter(|m| !m.is_root())
            .and_then(|m| self.find_module(&m.parent_path))
    }

    /// True when the module at `parent` is a strict ancestor of the one at `child`.
    pub fn is_module_parented_to(&self, child: &str, parent: &str) -> bool {
        let (Some(child_module), Some(parent_module)) =
            (self.find_module(child), self.find_module(parent))
        else {
            return false;
        };
        if std::ptr::eq(child_module, parent_module) {
            return false;
        }
        let target = parent_module.path();
        let mut current = child_module;
        while let Some(next) = self.parent_module(&current.path()) {
            if next.path() == target {
                return true;
            }
            current = next;
        }
        false
    }

    /// Visits modules breadth-first from the roots until `visit` returns `false`.
    pub fn for_each_module(&self, mut visit: impl FnMut(&ModuleReference) -> bool) {
        let mut queue: VecDeque<usize> = self.roots.iter().copied().collect();
        while let Some(slot) = queue.pop_front() {
            if !visit(&self.modules[slot]) {
                return;
            }
            queue.extend(self.children[slot].iter().copied());
        }
    }

    /// Modules in breadth-first order.
    pub fn traversal_order(&self) -> Vec<&ModuleReference> {
        let mut order = Vec::with_capacity(self.modules.len());
        let mut queue: VecDeque<usize> = self.roots.iter().copied().collect();
        while let Some(slot) = queue.pop_front() {
            order.push(&self.modules[slot]);
            queue.extend(self.children[slot].iter().copied());
        }
        order
    }

    /// Orders `paths` by breadth-first tree order; unknown paths are dropped.
    pub fn sort_paths(&self, paths: &[String]) -> Vec<String> {
        self.traversal_order()
            .into_iter()
            .map(ModuleReference::path)
            .filter(|path| paths.contains(path))
            .collect()
    }

    /// Modules instantiating `class`, in breadth-first order.
    pub fn find_module_instances_of_class(&self, class: &str) -> Vec<&ModuleReference> {
        self.traversal_order()
            .into_iter()
            .filter(|m| m.class == class)
            .collect()
    }

    /// Canonical digest of modules (ordered by path) and connections (ordered by connector).
    pub fn digest(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"modular-rig-model:");
        let mut modules: Vec<(String, &ModuleReference)> =
            self.modules.iter().map(|m| (m.path(), m)).collect();
        modules.sort_by(|a, b| a.0.cmp(&b.0));
        hasher.update(&(modules.len() as u64).to_le_bytes());
        for (path, module) in modules {
            feed(&mut hasher, &path);
            feed(&mut hasher, &module.class);
            feed(&mut hasher, &module.short_name);
            hasher.update(&[u8::from(module.short_name_based_on_path)]);
            for map in [&module.config_values, &module.bindings] {
                hasher.update(&(map.len() as u64).to_le_bytes());
                for (key, value) in map {
                    feed(&mut hasher, key);
                    feed(&mut hasher, value);
                }
            }
        }
        let mut connections: Vec<&ModularRigConnection> = self.connections.iter().collect();
        connections.sort_by(|a, b| a.connector.cmp(&b.connector));
        hasher.update(&(connections.len() as u64).to_le_bytes());
        for connection in connections {
            for key in [&connection.connector, &connection.target] {
                feed(&mut hasher, &key.name);
                hasher.update(&[key.ty as u8]);
            }
        }
        hasher.finalize().into()
    }

    // Mutation is crate-private: the controller is the only writer.

    pub(crate) fn modules_mut(&mut self) -> &mut Vec<ModuleReference> {
        &mut self.modules
    }

    pub(crate) fn connections_mut(&mut self) -> &mut ModularRigConnections {
        &mut self.connections
    }

    pub(crate) fn selection_mut(&mut self) -> &mut Vec<String> {
        &mut self.selection
    }

    pub(crate) fn find_module_mut(&mut self, path: &str) -> Option<&mut ModuleReference> {
        if path.is_empty() {
            return None;
        }
        let slot = self.slot_of(path)?;
        self.modules.get_mut(slot)
    }

    pub(crate) fn slot(&self, path: &str) -> Option<usize> {
        self.slot_of(path)
    }

    /// Rebuilds roots and children from the flat array and invalidates handles.
    pub(crate) fn update_cached_children(&mut self) {
        let by_path: BTreeMap<String, usize> = self
            .modules
            .iter()
            .enumerate()
            .map(|(slot, m)| (m.path(), slot))
            .collect();
        self.roots.clear();
        self.children = vec![Vec::new(); self.modules.len()];
        for (slot, module) in self.modules.iter().enumerate() {
            if module.parent_path.is_empty() {
                self.roots.push(slot);
            } else if let Some(&parent) = by_path.get(&module.parent_path) {
                self.children[parent].push(slot);
            }
        }
        self.generation += 1;
    }
}

fn feed(hasher: &mut blake3::Hasher, text: &str) {
    hasher.update(&(text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
}

/// Splits a binding source path into its module path and variable name.
///
/// Root rig variables have no module part.
pub fn split_binding_source(source: &str) -> (Option<&str>, &str) {
    match split_namespace(source, true) {
        Some((module, variable)) => (Some(module), variable),
        None => (None, source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> ModularRigModel {
        ModularRigModel::from_parts(
            vec![
                ModuleReference::new("Spine", "Spine", ""),
                ModuleReference::new("Arm", "Arm", "Spine"),
                ModuleReference::new("Hand", "Hand", "Spine:Arm"),
                ModuleReference::new("Leg", "Leg", ""),
            ],
            [],
        )
    }

    #[test]
    fn find_module_walks_segments_case_sensitively() {
        let model = tree();
        assert_eq!(model.find_module("Spine:Arm:Hand").map(|m| m.name.as_str()), Some("Hand"));
        assert!(model.find_module("spine:arm").is_none());
        assert!(model.find_module("Spine:Hand").is_none());
        assert!(model.find_module("").is_none());
    }

    #[test]
    fn parentage_is_strict() {
        let model = tree();
        assert!(model.is_module_parented_to("Spine:Arm:Hand", "Spine"));
        assert!(!model.is_module_parented_to("Spine", "Spine:Arm:Hand"));
        assert!(!model.is_module_parented_to("Spine", "Spine"));
        assert!(!model.is_module_parented_to("Leg", "Spine"));
        assert_eq!(model.parent_module("Spine:Arm").map(|m| m.name.as_str()), Some("Spine"));
        assert!(model.parent_module("Leg").is_none());
    }

    #[test]
    fn breadth_first_helpers() {
        let model = tree();
        let order: Vec<String> = model.traversal_order().into_iter().map(ModuleReference::path).collect();
        assert_eq!(order, ["Spine", "Leg", "Spine:Arm", "Spine:Arm:Hand"]);
        let sorted = model.sort_paths(&["Spine:Arm:Hand".into(), "Leg".into(), "Nope".into()]);
        assert_eq!(sorted, ["Leg", "Spine:Arm:Hand"]);
        let mut visited = 0;
        model.for_each_module(|_| {
            visited += 1;
            visited < 2
        });
        assert_eq!(visited, 2);
    }

    #[test]
    fn handles_resolve_within_a_generation() {
        let model = tree();
        let handle = model.handle("Spine:Arm").unwrap();
        assert_eq!(model.get(handle).map(|m| m.name.as_str()), Some("Arm"));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "stale module handle")]
    fn stale_handles_fail_loudly() {
        let mut model = tree();
        let handle = model.handle("Leg").unwrap();
        model.modules_mut().push(ModuleReference::new("Tail", "Tail", ""));
        model.update_cached_children();
        let _ = model.get(handle);
    }

    #[test]
    fn digest_ignores_storage_order() {
        let a = tree();
        let mut modules = a.modules().to_vec();
        modules.reverse();
        let b = ModularRigModel::from_parts(modules, []);
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn binding_sources_split_at_last_segment() {
        assert_eq!(split_binding_source("Spine:Arm:length"), (Some("Spine:Arm"), "length"));
        assert_eq!(split_binding_source("scale"), (None, "scale"));
    }
}
