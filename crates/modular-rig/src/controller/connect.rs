// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Connect, disconnect, the cyclic-connection sweep and auto-resolution.
use rig_hierarchy::name::{namespace_of_path, starts_with_ignore_case};
use rig_hierarchy::{join_namespace, split_namespace, ElementKey, ElementType, Hierarchy};
use tracing::{debug, error, instrument, warn};

use super::{ControllerError, ModularRigController};
use crate::connections::ModularRigConnection;
use crate::notify::ModularRigNotification;
use crate::resolve::ElementResolveState;

/// Result of an auto-connect pass.
///
/// A pass never fails half-way: connectors that could not be resolved are
/// listed in `unresolved` and left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoConnectOutcome {
    /// Connectors that received a connection.
    pub connected: Vec<ElementKey>,
    /// Connectors left without a connection.
    pub unresolved: Vec<ElementKey>,
}

impl AutoConnectOutcome {
    /// True when every attempted connector was connected.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

impl ModularRigController {
    /// Checks whether `connector` may be connected to `target`.
    ///
    /// Checks run in order: owning module, declared connector, target
    /// validity, self-connection, then (unless the connection already exists)
    /// primary-first ordering and a live resolver match.
    pub fn can_connect_connector_to_element(
        &mut self,
        connector: &ElementKey,
        target: &ElementKey,
    ) -> Result<(), ControllerError> {
        self.check_connection(connector, target, true)
    }

    pub(super) fn check_connection(
        &mut self,
        connector: &ElementKey,
        target: &ElementKey,
        accept_current: bool,
    ) -> Result<(), ControllerError> {
        let (module_path, declaration) = self.connector_declaration(connector)?;
        if !target.is_valid() {
            return Err(ControllerError::InvalidTarget(target.to_string()));
        }
        if target == connector {
            return Err(ControllerError::SelfConnection(connector.name.clone()));
        }
        let connections = self.model.connections();
        if accept_current && connections.find_target_from_connector(connector) == Some(target) {
            return Ok(());
        }
        if !declaration.kind.is_primary() {
            let primary = self
                .module_class(&module_path)?
                .primary_connector()
                .map(|primary| ElementKey::connector(join_namespace(&module_path, &primary.name)));
            let resolved = primary.is_some_and(|key| self.model.connections().has_connection(&key));
            if !resolved {
                return Err(ControllerError::PrimaryNotResolved(connector.name.clone()));
            }
        }

        self.sync_rig();
        if !self.rig.hierarchy().contains(connector) {
            return Err(ControllerError::ConnectorNotFound(connector.name.clone()));
        }
        let result = self
            .rule_manager
            .find_matches(&mut self.rig, connector, Some(&module_path), None);
        result
            .contains_match(target)
            .map_err(|reason| ControllerError::NotAMatch {
                connector: connector.name.clone(),
                target: target.to_string(),
                reason,
            })
    }

    /// Connects `connector` to `target`.
    ///
    /// An existing connection is replaced; connections that fell with it are
    /// restored when still valid. With automatic reparenting a primary
    /// connector moves its module under the target's module, and
    /// `auto_resolve_others` then resolves the module's secondary connectors.
    /// Returns the connectors dropped by the trailing cyclic-connection sweep.
    #[instrument(level = "debug", skip_all, fields(connector = %connector, target = %target))]
    pub fn connect_connector_to_element(
        &mut self,
        connector: &ElementKey,
        target: &ElementKey,
        auto_resolve_others: bool,
        check_valid: bool,
    ) -> Result<Vec<ElementKey>, ControllerError> {
        if check_valid {
            self.can_connect_connector_to_element(connector, target)
                .inspect_err(|err| error!(%err, "connect rejected"))?;
        }
        let mut bracket = self.interaction_bracket();
        bracket
            .connect_inner(connector, target, auto_resolve_others)
            .map(|(_, removed)| removed)
    }

    /// Connects with validation, resolving secondaries per the settings.
    pub fn connect(
        &mut self,
        connector: &ElementKey,
        target: &ElementKey,
    ) -> Result<Vec<ElementKey>, ControllerError> {
        let auto_resolve = self.settings.auto_resolve_secondary;
        self.connect_connector_to_element(connector, target, auto_resolve, true)
    }

    /// Unchecked connect; returns the module's path afterwards and the
    /// connectors dropped by the cyclic sweep.
    pub(super) fn connect_inner(
        &mut self,
        connector: &ElementKey,
        target: &ElementKey,
        auto_resolve_others: bool,
    ) -> Result<(String, Vec<ElementKey>), ControllerError> {
        let (mut module_path, declaration) = self.connector_declaration(connector)?;
        if !target.is_valid() {
            return Err(ControllerError::InvalidTarget(target.to_string()));
        }
        let target_module_path = self.element_module_path(target);

        let mut previous: Vec<ModularRigConnection> = Vec::new();
        if self.model.connections().has_connection(connector) {
            let reparenting = std::mem::replace(&mut self.settings.automatic_reparenting, false);
            let removed = self.suspended(|c| c.disconnect_inner(connector, false));
            self.settings.automatic_reparenting = reparenting;
            previous = removed?;
        }

        self.model
            .connections_mut()
            .add_connection(connector.clone(), target.clone());
        self.mark_dirty();

        for connection in previous {
            if connection.connector == *connector
                || self.model.connections().has_connection(&connection.connector)
            {
                continue;
            }
            let restore = self
                .can_connect_connector_to_element(&connection.connector, &connection.target)
                .and_then(|()| {
                    self.suspended(|c| c.connect_inner(&connection.connector, &connection.target, false))
                });
            match restore {
                Ok(_) => debug!(connector = %connection.connector, "restored connection"),
                Err(err) => debug!(connector = %connection.connector, %err, "connection not restored"),
            }
        }

        self.notify(ModularRigNotification::ConnectionChanged, Some(&module_path));

        if declaration.kind.is_primary() {
            if self.settings.automatic_reparenting {
                if let Some(parent) = target_module_path {
                    match self.reparent_module(&module_path, &parent) {
                        Ok(path) => module_path = path,
                        Err(err) => warn!(module = %module_path, %err, "automatic reparent failed"),
                    }
                }
            }
            if auto_resolve_others {
                match self.auto_connect_modules(&[module_path.clone()], false) {
                    Ok(outcome) if !outcome.is_complete() => {
                        debug!(module = %module_path, unresolved = outcome.unresolved.len(), "secondary connectors left unresolved");
                    }
                    Ok(_) => {}
                    Err(err) => warn!(module = %module_path, %err, "auto resolve failed"),
                }
            }
        }

        let removed = self.disconnect_cyclic_connectors();
        Ok((module_path, removed))
    }

    /// Removes the connection of `connector`.
    ///
    /// Disconnecting a primary also drops every connection of the module and
    /// its descendants and, with automatic reparenting, moves the module to the
    /// root. With `disconnect_submodules`, a required secondary also drops the
    /// connections of descendant modules.
    #[instrument(level = "debug", skip_all, fields(connector = %connector))]
    pub fn disconnect_connector(
        &mut self,
        connector: &ElementKey,
        disconnect_submodules: bool,
    ) -> Result<(), ControllerError> {
        let mut bracket = self.interaction_bracket();
        bracket
            .disconnect_inner(connector, disconnect_submodules)
            .map(drop)
            .inspect_err(|err| error!(%err, "disconnect rejected"))
    }

    pub(super) fn disconnect_inner(
        &mut self,
        connector: &ElementKey,
        disconnect_submodules: bool,
    ) -> Result<Vec<ModularRigConnection>, ControllerError> {
        let (mut module_path, declaration) = self.connector_declaration(connector)?;
        let Some(target) = self.model.connections_mut().remove_connection(connector) else {
            return Err(ControllerError::NotConnected(connector.name.clone()));
        };
        let mut removed = vec![ModularRigConnection {
            connector: connector.clone(),
            target,
        }];
        let namespace = namespace_of_path(&module_path);
        if declaration.kind.is_primary() {
            removed.extend(
                self.model
                    .connections_mut()
                    .remove_where(|c| starts_with_ignore_case(&c.connector.name, &namespace)),
            );
        } else if !declaration.kind.is_optional() && disconnect_submodules {
            removed.extend(self.model.connections_mut().remove_where(|c| {
                split_namespace(&c.connector.name, true)
                    .is_some_and(|(owner, _)| starts_with_ignore_case(owner, &namespace))
            }));
        }
        self.mark_dirty();

        let is_root = self
            .model
            .find_module(&module_path)
            .is_some_and(|m| m.is_root());
        if self.settings.automatic_reparenting && declaration.kind.is_primary() && !is_root {
            match self.reparent_module(&module_path, "") {
                Ok(path) => module_path = path,
                Err(err) => warn!(module = %module_path, %err, "reparent to root failed"),
            }
        }

        self.notify(ModularRigNotification::ConnectionChanged, Some(&module_path));
        Ok(removed)
    }

    /// Disconnects every connector whose module is not a descendant of its
    /// target's module; returns the disconnected connectors.
    ///
    /// Targets outside any module, unknown modules and connections within a
    /// single module are left alone.
    pub fn disconnect_cyclic_connectors(&mut self) -> Vec<ElementKey> {
        self.sync_rig();
        let hierarchy = self.rig.hierarchy();
        let model = &self.model;
        let doomed: Vec<ElementKey> = model
            .connections()
            .iter()
            .filter(|c| {
                let owner = hierarchy.module_path(&c.connector).filter(|p| !p.is_empty());
                let target = hierarchy.module_path(&c.target).filter(|p| !p.is_empty());
                let (Some(owner), Some(target)) = (owner, target) else {
                    return false;
                };
                if owner == target
                    || model.find_module(&owner).is_none()
                    || model.find_module(&target).is_none()
                {
                    return false;
                }
                !model.is_module_parented_to(&owner, &target)
            })
            .map(|c| c.connector.clone())
            .collect();

        let mut removed = Vec::new();
        for connector in doomed {
            if !self.model.connections().has_connection(&connector) {
                continue;
            }
            match self.disconnect_connector(&connector, false) {
                Ok(()) => {
                    debug!(connector = %connector, "cyclic connection removed");
                    removed.push(connector);
                }
                Err(err) => debug!(connector = %connector, %err, "cyclic connection kept"),
            }
        }
        removed
    }

    /// Resolves each listed secondary connector whose match is unambiguous.
    ///
    /// A connector gets a connection when the resolver yields exactly one
    /// match, or otherwise a default target. Already connected connectors are
    /// only re-resolved with `replace_existing`. Every key must name a live
    /// connector.
    pub fn auto_connect_secondary_connectors(
        &mut self,
        connectors: &[ElementKey],
        replace_existing: bool,
    ) -> Result<AutoConnectOutcome, ControllerError> {
        self.sync_rig();
        for key in connectors {
            let hierarchy = self.rig.hierarchy();
            if key.ty != ElementType::Connector || !hierarchy.contains(key) {
                return Err(ControllerError::ConnectorNotFound(key.name.clone()));
            }
            if hierarchy
                .connector_settings(key)
                .is_some_and(|settings| settings.kind.is_primary())
            {
                warn!(connector = %key, "primary connectors are not auto-resolved");
            }
        }

        let mut bracket = self.interaction_bracket();
        let mut outcome = AutoConnectOutcome::default();
        for key in connectors {
            match bracket.auto_connect_one(key, replace_existing) {
                Some(true) => outcome.connected.push(key.clone()),
                Some(false) => outcome.unresolved.push(key.clone()),
                None => {}
            }
        }
        Ok(outcome)
    }

    /// `None` when the key is skipped (primary, or already connected).
    fn auto_connect_one(&mut self, key: &ElementKey, replace_existing: bool) -> Option<bool> {
        let Some(module_path) = self.element_module_path(key) else {
            error!(connector = %key, "connector has no module");
            return Some(false);
        };
        let primary = self
            .model
            .find_module(&module_path)
            .and_then(|module| self.classes().get(&module.class))
            .and_then(|class| class.primary_connector())
            .map(|primary| ElementKey::connector(join_namespace(&module_path, &primary.name)));
        let Some(primary) = primary else {
            return Some(false);
        };
        if primary == *key {
            return None;
        }
        if !self.model.connections().has_connection(&primary) {
            warn!(connector = %key, module = %module_path, "primary connector not resolved");
            return Some(false);
        }
        if !replace_existing && self.model.connections().has_connection(key) {
            return None;
        }

        self.sync_rig();
        let result = self
            .rule_manager
            .find_matches(&mut self.rig, key, Some(&module_path), None);
        let chosen = if let [only] = result.matches.as_slice() {
            Some(only.key.clone())
        } else {
            result
                .matches
                .iter()
                .find(|m| m.state == ElementResolveState::DefaultTarget)
                .map(|m| m.key.clone())
        };
        let Some(target) = chosen else {
            debug!(connector = %key, matches = result.matches.len(), "no unambiguous match");
            return Some(false);
        };
        self.model
            .connections_mut()
            .add_connection(key.clone(), target);
        self.mark_dirty();
        self.notify(ModularRigNotification::ConnectionChanged, Some(&module_path));
        Some(true)
    }

    /// Auto-connects every non-primary connector declared by the listed modules.
    pub fn auto_connect_modules(
        &mut self,
        paths: &[String],
        replace_existing: bool,
    ) -> Result<AutoConnectOutcome, ControllerError> {
        let mut connectors = Vec::new();
        for path in paths {
            let class = self.module_class(path)?;
            connectors.extend(
                class
                    .connectors()
                    .iter()
                    .filter(|c| c.kind.is_secondary())
                    .map(|c| ElementKey::connector(join_namespace(path, &c.name))),
            );
        }
        self.auto_connect_secondary_connectors(&connectors, replace_existing)
    }
}
