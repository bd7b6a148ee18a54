// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Module tree edits: add, delete, rename, reparent, mirror, class swaps and selection.
use rig_hierarchy::name::{eq_ignore_case, namespace_of_path, starts_with_ignore_case};
use rig_hierarchy::{join_namespace, ElementKey, NAMESPACE_SEPARATOR};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use super::{ControllerError, ModularRigController};
use crate::class::{format_vector, parse_vector, VariableType};
use crate::model::split_binding_source;
use crate::notify::ModularRigNotification;

/// Axis a mirrored module is reflected across.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MirrorAxis {
    /// Negate the x component.
    #[default]
    X,
    /// Negate the y component.
    Y,
    /// Negate the z component.
    Z,
}

impl MirrorAxis {
    /// Reflects a vector across the axis.
    pub fn mirror(self, mut value: [f64; 3]) -> [f64; 3] {
        let index = match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        };
        value[index] = -value[index];
        value
    }
}

/// How a module is mirrored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorSettings {
    /// Substring replaced in the module name, connection targets and binding sources.
    pub search: String,
    /// Replacement for `search`.
    pub replace: String,
    /// Reflection axis for vector config values.
    pub axis: MirrorAxis,
}

impl MirrorSettings {
    /// Mirror settings swapping `search` for `replace`.
    pub fn new(search: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            replace: replace.into(),
            axis: MirrorAxis::X,
        }
    }

    fn apply(&self, text: &str) -> String {
        if self.search.is_empty() {
            text.to_owned()
        } else {
            text.replace(&self.search, &self.replace)
        }
    }
}

impl ModularRigController {
    /// Adds a module of `class` under `parent_path` (empty for a root); returns its path.
    #[instrument(level = "debug", skip(self))]
    pub fn add_module(
        &mut self,
        name: &str,
        class: &str,
        parent_path: &str,
    ) -> Result<String, ControllerError> {
        self.check_add_module(name, class, parent_path)
            .inspect_err(|err| warn!(%err, "add module rejected"))?;
        self.model
            .modules_mut()
            .push(crate::model::ModuleReference::new(name, class, parent_path));
        self.model.update_cached_children();
        self.update_short_names();
        self.mark_dirty();
        let path = join_namespace(parent_path, name);
        self.notify(ModularRigNotification::ModuleAdded, Some(&path));
        Ok(path)
    }

    fn check_add_module(
        &self,
        name: &str,
        class: &str,
        parent_path: &str,
    ) -> Result<(), ControllerError> {
        if !self.classes().contains(class) {
            return Err(ControllerError::UnknownClass(class.to_owned()));
        }
        if !parent_path.is_empty() && self.model.find_module(parent_path).is_none() {
            return Err(ControllerError::ParentNotFound(parent_path.to_owned()));
        }
        self.is_name_available(parent_path, name)
    }

    /// Deletes a module and its whole subtree, with every connection and
    /// binding that refers to them.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_module(&mut self, path: &str) -> Result<(), ControllerError> {
        if self.model.find_module(path).is_none() {
            return Err(ControllerError::ModuleNotFound(path.to_owned()));
        }
        let mut bracket = self.interaction_bracket();
        bracket.delete_subtree(path);
        Ok(())
    }

    fn delete_subtree(&mut self, path: &str) {
        self.deselect_module(path);
        let children: Vec<String> = self.model.children(path).iter().map(|m| m.path()).collect();
        for child in children {
            self.delete_subtree(&child);
        }
        let Some(slot) = self.model.slot(path) else {
            return;
        };
        let removed = self.model.modules_mut().remove(slot);
        self.deleted_modules.push(removed);
        self.model.update_cached_children();
        self.update_short_names();

        let namespace = namespace_of_path(path);
        self.model.connections_mut().remove_where(|c| {
            c.connector.name.starts_with(&namespace) || c.target.name.starts_with(&namespace)
        });
        for module in self.model.modules_mut() {
            module.bindings.retain(|_, source| {
                !split_binding_source(source)
                    .0
                    .is_some_and(|owner| owner == path || owner.starts_with(&namespace))
            });
        }
        self.mark_dirty();
        self.notify(ModularRigNotification::ModuleRemoved, Some(path));
        self.deleted_modules.clear();
    }

    /// Checks a rename without applying it.
    pub fn can_rename_module(&self, path: &str, new_name: &str) -> Result<(), ControllerError> {
        if new_name.is_empty() {
            return Err(ControllerError::EmptyName);
        }
        if new_name.contains(NAMESPACE_SEPARATOR) {
            return Err(ControllerError::NameContainsSeparator);
        }
        let module = self
            .model
            .find_module(path)
            .ok_or_else(|| ControllerError::ModuleNotFound(path.to_owned()))?;
        self.is_name_available(&module.parent_path, new_name)
    }

    /// Renames a module; returns its new path.
    ///
    /// Descendant paths, connections, bindings and the selection follow the
    /// module. Renaming to the current name is a no-op.
    #[instrument(level = "debug", skip(self))]
    pub fn rename_module(&mut self, path: &str, new_name: &str) -> Result<String, ControllerError> {
        let module = self
            .model
            .find_module(path)
            .ok_or_else(|| ControllerError::ModuleNotFound(path.to_owned()))?;
        if module.name == new_name {
            return Ok(path.to_owned());
        }
        let parent_path = module.parent_path.clone();
        self.can_rename_module(path, new_name)
            .inspect_err(|err| warn!(%err, "rename rejected"))?;

        let new_path = join_namespace(&parent_path, new_name);
        let selected = self.begin_move(path);
        if let Some(module) = self.model.find_module_mut(path) {
            module.previous_name = std::mem::replace(&mut module.name, new_name.to_owned());
        }
        self.rewrite_paths(path, &new_path);
        self.model.update_cached_children();
        self.update_short_names();
        self.mark_dirty();
        self.notify(ModularRigNotification::ModuleRenamed, Some(&new_path));
        self.end_move(selected, &new_path);
        self.disconnect_cyclic_connectors();
        Ok(new_path)
    }

    /// Moves a module under `new_parent` (empty for the root); returns its new path.
    ///
    /// The module keeps its name unless it clashes with a new sibling, in which
    /// case it gets a numbered one. Bindings that would now read from inside
    /// the moved subtree are dropped, then cyclic connections are swept.
    #[instrument(level = "debug", skip(self))]
    pub fn reparent_module(
        &mut self,
        path: &str,
        new_parent: &str,
    ) -> Result<String, ControllerError> {
        let module = self
            .model
            .find_module(path)
            .ok_or_else(|| ControllerError::ModuleNotFound(path.to_owned()))?;
        if !new_parent.is_empty() && self.model.find_module(new_parent).is_none() {
            return Err(ControllerError::ParentNotFound(new_parent.to_owned()));
        }
        if eq_ignore_case(&module.parent_path, new_parent) {
            return Ok(path.to_owned());
        }
        if new_parent == path || self.model.is_module_parented_to(new_parent, path) {
            return Err(ControllerError::ReparentIntoSelf(path.to_owned()));
        }
        let name = module.name.clone();

        let new_name = self.safe_new_name(new_parent, &name);
        let new_path = join_namespace(new_parent, &new_name);
        let selected = self.begin_move(path);
        if let Some(module) = self.model.find_module_mut(path) {
            module.previous_parent_path =
                std::mem::replace(&mut module.parent_path, new_parent.to_owned());
            module.previous_name = std::mem::replace(&mut module.name, new_name);
        }
        self.rewrite_paths(path, &new_path);
        self.drop_inward_bindings();
        self.model.update_cached_children();
        self.update_short_names();
        self.mark_dirty();
        self.end_move(selected, &new_path);

        // The sweep may drop the primary and send the module back to root,
        // which reports its own move.
        let slot = self.model.storage_slot(&new_path);
        self.disconnect_cyclic_connectors();
        let final_path = slot
            .and_then(|slot| self.model.path_at_slot(slot))
            .unwrap_or_else(|| new_path.clone());
        if final_path == new_path {
            self.notify(ModularRigNotification::ModuleReparented, Some(&new_path));
        }
        Ok(final_path)
    }

    /// Deselects a module about to move; returns its selection slot.
    fn begin_move(&mut self, path: &str) -> Option<usize> {
        let slot = self
            .model
            .selected_module_paths()
            .iter()
            .position(|selected| selected == path);
        if slot.is_some() {
            self.notify(ModularRigNotification::ModuleDeselected, Some(path));
        }
        slot
    }

    fn end_move(&mut self, slot: Option<usize>, new_path: &str) {
        let Some(slot) = slot else {
            return;
        };
        if let Some(entry) = self.model.selection_mut().get_mut(slot) {
            new_path.clone_into(entry);
        }
        self.notify(ModularRigNotification::ModuleSelected, Some(new_path));
    }

    /// Rewrites every reference to `old_path` and its descendants.
    fn rewrite_paths(&mut self, old_path: &str, new_path: &str) {
        let old_ns = namespace_of_path(old_path);
        let rewrite = |path: &str| -> Option<String> {
            if path == old_path {
                Some(new_path.to_owned())
            } else {
                path.strip_prefix(old_ns.as_str())
                    .map(|rest| join_namespace(new_path, rest))
            }
        };
        for module in self.model.modules_mut() {
            if let Some(parent) = rewrite(&module.parent_path) {
                module.parent_path = parent;
            }
            for source in module.bindings.values_mut() {
                let rewritten = match split_binding_source(source) {
                    (Some(owner), variable) => {
                        rewrite(owner).map(|owner| join_namespace(&owner, variable))
                    }
                    (None, _) => None,
                };
                if let Some(rewritten) = rewritten {
                    *source = rewritten;
                }
            }
        }
        for selected in self.model.selection_mut() {
            if let Some(path) = rewrite(selected) {
                *selected = path;
            }
        }
        self.model
            .connections_mut()
            .rename_namespace(old_path, new_path);
    }

    /// Drops bindings whose source now lies inside the bound module's own subtree.
    fn drop_inward_bindings(&mut self) {
        for module in self.model.modules_mut() {
            let namespace = module.namespace();
            let path = module.path();
            module.bindings.retain(|variable, source| {
                let inward = split_binding_source(source)
                    .0
                    .is_some_and(|owner| owner == path || starts_with_ignore_case(owner, &namespace));
                if inward {
                    warn!(module = %path, %variable, %source, "binding lost");
                }
                !inward
            });
        }
    }

    /// Duplicates a module with search/replace applied to its name,
    /// connection targets and binding sources; vector config values are
    /// reflected across the mirror axis. Returns the new module's path.
    #[instrument(level = "debug", skip(self, settings))]
    pub fn mirror_module(
        &mut self,
        path: &str,
        settings: &MirrorSettings,
    ) -> Result<String, ControllerError> {
        let module = self
            .model
            .find_module(path)
            .ok_or_else(|| ControllerError::ModuleNotFound(path.to_owned()))?
            .clone();
        let class = self.module_class(path)?;
        let connections = self.model.connections().get_module_connection_map(path);
        let name = self.safe_new_name(&module.parent_path, &settings.apply(&module.name));

        let mut bracket = self.interaction_bracket();
        let mut new_path = bracket.add_module(&name, &module.class, &module.parent_path)?;

        for (connector, target) in &connections {
            let connector = ElementKey::connector(join_namespace(&new_path, &connector.name));
            let target = ElementKey::new(settings.apply(&target.name), target.ty);
            match bracket.connect_inner(&connector, &target, false) {
                Ok((owner, _)) => new_path = owner,
                Err(err) => warn!(%connector, %err, "mirrored connection skipped"),
            }
        }

        for (variable, source) in &module.bindings {
            let source = settings.apply(source);
            if let Err(err) = bracket.bind_module_variable(&new_path, variable, &source) {
                warn!(%variable, %err, "mirrored binding skipped");
            }
        }

        for variable in class.variables() {
            let value = module
                .config_values
                .get(&variable.name)
                .cloned()
                .or_else(|| {
                    (variable.ty == VariableType::Vector && !variable.default.is_empty())
                        .then(|| variable.default.clone())
                });
            let Some(value) = value else {
                continue;
            };
            let value = match (variable.ty, parse_vector(&value)) {
                (VariableType::Vector, Some(vector)) if variable.is_configurable() => {
                    format_vector(settings.axis.mirror(vector))
                }
                _ => value,
            };
            if let Err(err) = bracket.set_config_value(&new_path, &variable.name, &value) {
                warn!(variable = %variable.name, %err, "mirrored value skipped");
            }
        }
        Ok(new_path)
    }

    /// Changes the class of a module.
    ///
    /// Connections of connectors the new class does not declare, or whose
    /// target no longer resolves, are removed; config values and bindings are
    /// re-validated.
    #[instrument(level = "debug", skip(self))]
    pub fn swap_module_class(&mut self, path: &str, new_class: &str) -> Result<(), ControllerError> {
        let module = self
            .model
            .find_module(path)
            .ok_or_else(|| ControllerError::ModuleNotFound(path.to_owned()))?;
        if !self.classes().contains(new_class) {
            return Err(ControllerError::UnknownClass(new_class.to_owned()));
        }
        if module.class == new_class {
            return Ok(());
        }

        let mut bracket = self.interaction_bracket();
        if let Some(module) = bracket.model.find_module_mut(path) {
            new_class.clone_into(&mut module.class);
        }
        bracket.mark_dirty();

        let namespace = namespace_of_path(path);
        let owned: Vec<(ElementKey, ElementKey)> = bracket
            .model
            .connections()
            .iter()
            .filter(|c| {
                c.connector
                    .name
                    .strip_prefix(namespace.as_str())
                    .is_some_and(|local| !local.contains(NAMESPACE_SEPARATOR))
            })
            .map(|c| (c.connector.clone(), c.target.clone()))
            .collect();
        for (connector, target) in owned {
            if !bracket.model.connections().has_connection(&connector) {
                continue;
            }
            if let Err(err) = bracket.check_connection(&connector, &target, false) {
                warn!(%connector, %err, "connection dropped by class swap");
                if bracket.disconnect_inner(&connector, false).is_err() {
                    bracket.model.connections_mut().remove_connection(&connector);
                    bracket.mark_dirty();
                }
            }
        }

        bracket.refresh_all_module_variables();
        bracket.notify(ModularRigNotification::ModuleClassChanged, Some(path));
        Ok(())
    }

    /// Swaps every module of `old_class` to `new_class`; returns how many changed.
    pub fn swap_modules_of_class(
        &mut self,
        old_class: &str,
        new_class: &str,
    ) -> Result<usize, ControllerError> {
        if !self.classes().contains(new_class) {
            return Err(ControllerError::UnknownClass(new_class.to_owned()));
        }
        let paths: Vec<String> = self
            .model
            .find_module_instances_of_class(old_class)
            .into_iter()
            .map(|m| m.path())
            .collect();
        let mut bracket = self.interaction_bracket();
        for path in &paths {
            bracket.swap_module_class(path, new_class)?;
        }
        Ok(paths.len())
    }

    /// Selected module paths, oldest selection first.
    pub fn selected_modules(&self) -> &[String] {
        self.model.selected_module_paths()
    }

    /// Adds a module to the selection; `false` when unknown or already selected.
    pub fn select_module(&mut self, path: &str) -> bool {
        if self.model.find_module(path).is_none()
            || self.model.selected_module_paths().iter().any(|p| p == path)
        {
            return false;
        }
        self.model.selection_mut().push(path.to_owned());
        self.notify(ModularRigNotification::ModuleSelected, Some(path));
        true
    }

    /// Removes a module from the selection; `false` when it was not selected.
    pub fn deselect_module(&mut self, path: &str) -> bool {
        let Some(slot) = self
            .model
            .selected_module_paths()
            .iter()
            .position(|p| p == path)
        else {
            return false;
        };
        self.notify(ModularRigNotification::ModuleDeselected, Some(path));
        self.model.selection_mut().remove(slot);
        true
    }

    /// Makes `paths` the selection; returns whether anything changed.
    pub fn set_module_selection(&mut self, paths: &[String]) -> bool {
        let mut changed = false;
        let current = self.model.selected_module_paths().to_vec();
        for path in current.iter().filter(|p| !paths.contains(p)) {
            changed |= self.deselect_module(path);
        }
        for path in paths {
            changed |= self.select_module(path);
        }
        changed
    }
}
