// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Module controller: the only writer of the module tree and connection table.
//!
//! Every mutation validates first and returns a [`ControllerError`] without
//! touching the model when validation fails. Successful mutations emit change
//! notifications through the controller's [`ModifiedEvent`]; compound
//! operations wrap themselves in an [`InteractionBracket`] so observers can
//! coalesce the burst into a single downstream recompile.
//!
//! The controller keeps a live [`ModularRig`] next to the model. Mutations only
//! mark it dirty; it is synced and reconstructed lazily before anything needs
//! the constructed hierarchy (resolving, module-path lookups, cyclic sweeps).
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use rig_hierarchy::{split_namespace, ElementKey, Hierarchy};
use thiserror::Error;

use crate::class::{ModuleClass, ModuleClassRegistry, ModuleConnector, VariableType};
use crate::model::{ModularRigModel, ModuleReference};
use crate::notify::{ModifiedEvent, ModularRigNotification, SubscriptionId};
use crate::resolve::ModularRigResolveResult;
use crate::rig::ModularRig;
use crate::rule_manager::RuleManager;
use crate::settings::ControllerSettings;

mod connect;
mod modules;
mod names;
mod variables;

pub use connect::AutoConnectOutcome;
pub use modules::{MirrorAxis, MirrorSettings};

/// Rejected controller mutation. The message is suitable for direct display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// No module at the path.
    #[error("Module '{0}' not found.")]
    ModuleNotFound(String),
    /// No module at the requested parent path.
    #[error("Parent module '{0}' not found.")]
    ParentNotFound(String),
    /// The class registry has no such class.
    #[error("Module class '{0}' is not registered.")]
    UnknownClass(String),
    /// Empty module name.
    #[error("Name is empty.")]
    EmptyName,
    /// Module names are single path segments.
    #[error("Name contains namespace separator ':'.")]
    NameContainsSeparator,
    /// Name changes under sanitization.
    #[error("Name contains invalid characters.")]
    InvalidName,
    /// A sibling (or, for short names, any module) already uses the name.
    #[error("This name is already in use.")]
    NameInUse,
    /// Display name changes under sanitization.
    #[error("Display Name contains invalid characters.")]
    InvalidShortName,
    /// Reparenting would create a cycle in the module tree.
    #[error("Cannot parent module '{0}' under itself or its descendants.")]
    ReparentIntoSelf(String),
    /// Connector name has no module namespace.
    #[error("Connector '{0}' does not contain a namespace.")]
    ConnectorWithoutNamespace(String),
    /// The module's class does not declare the connector.
    #[error("Could not find connector '{connector}' in class '{class}'.")]
    UndeclaredConnector {
        /// Local connector name.
        connector: String,
        /// Class of the owning module.
        class: String,
    },
    /// The constructed hierarchy has no such connector.
    #[error("Connector '{0}' not found in the hierarchy.")]
    ConnectorNotFound(String),
    /// Invalid target key.
    #[error("Invalid target '{0}'.")]
    InvalidTarget(String),
    /// Connector and target are the same element.
    #[error("Cannot resolve connector '{0}' to itself.")]
    SelfConnection(String),
    /// Non-primary connectors need the module's primary to be connected first.
    #[error("Cannot resolve connector '{0}' because primary connector is not resolved.")]
    PrimaryNotResolved(String),
    /// The resolver does not list the target as a match.
    #[error("The target '{target}' is not a valid match for connector '{connector}': {reason}")]
    NotAMatch {
        /// Connector name.
        connector: String,
        /// Rejected target.
        target: String,
        /// Resolver's reason.
        reason: String,
    },
    /// Disconnecting a connector that has no connection.
    #[error("Connector '{0}' is not connected.")]
    NotConnected(String),
    /// The module's class has no such variable.
    #[error("Could not find variable '{variable}' in module '{module}'.")]
    VariableNotFound {
        /// Module path.
        module: String,
        /// Variable name.
        variable: String,
    },
    /// The variable cannot be configured or bound.
    #[error("The target variable '{variable}' in module '{module}' is read only.")]
    ReadOnlyVariable {
        /// Module path.
        module: String,
        /// Variable name.
        variable: String,
    },
    /// The literal does not parse as the variable's type.
    #[error("Value '{value}' for variable '{variable}' in module '{module}' is not valid.")]
    InvalidValue {
        /// Module path.
        module: String,
        /// Variable name.
        variable: String,
        /// Rejected literal.
        value: String,
    },
    /// Binding source module does not exist.
    #[error("Could not find source module '{0}'.")]
    SourceModuleNotFound(String),
    /// Bindings may not flow from a module into one of its ancestors.
    #[error("Source module '{source_module}' is contained in target module '{target_module}'.")]
    SourceContainedInTarget {
        /// Module the value would come from.
        source_module: String,
        /// Module being configured.
        target_module: String,
    },
    /// Binding source variable does not exist.
    #[error("Could not find source variable '{0}'.")]
    SourceVariableNotFound(String),
    /// Source and target variable types differ.
    #[error("Property '{source_path}' of type {source_type:?} and '{target_path}' of type {target_type:?} are not compatible.")]
    IncompatibleBinding {
        /// Binding source path.
        source_path: String,
        /// Source variable type.
        source_type: VariableType,
        /// `module.variable` being bound.
        target_path: String,
        /// Target variable type.
        target_type: VariableType,
    },
    /// Unbinding a variable that has no binding.
    #[error("Variable '{variable}' in module '{module}' is not bound.")]
    NotBound {
        /// Module path.
        module: String,
        /// Variable name.
        variable: String,
    },
}

/// Sole mutation entry point for modules and connections.
pub struct ModularRigController {
    model: ModularRigModel,
    rig: ModularRig,
    rule_manager: RuleManager,
    settings: ControllerSettings,
    modified: ModifiedEvent,
    suspend_notifications: bool,
    bracket_depth: u32,
    bracket_canceled: bool,
    bracket_silent: bool,
    deleted_modules: Vec<ModuleReference>,
    rig_dirty: bool,
}

impl std::fmt::Debug for ModularRigController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModularRigController")
            .field("modules", &self.model.len())
            .field("connections", &self.model.connections().len())
            .field("settings", &self.settings)
            .field("bracket_depth", &self.bracket_depth)
            .finish_non_exhaustive()
    }
}

impl ModularRigController {
    /// Controller over an empty model, driving `rig`.
    pub fn new(rig: ModularRig) -> Self {
        Self {
            model: ModularRigModel::new(),
            rig,
            rule_manager: RuleManager::new(),
            settings: ControllerSettings::default(),
            modified: ModifiedEvent::new(),
            suspend_notifications: false,
            bracket_depth: 0,
            bracket_canceled: false,
            bracket_silent: false,
            deleted_modules: Vec::new(),
            rig_dirty: true,
        }
    }

    /// Replaces the model (e.g. one loaded by the host) and recomputes short names.
    pub fn with_model(mut self, model: ModularRigModel) -> Self {
        self.model = model;
        let suspended = std::mem::replace(&mut self.suspend_notifications, true);
        self.update_short_names();
        self.suspend_notifications = suspended;
        self.rig_dirty = true;
        self
    }

    /// Replaces the behavior switches.
    pub fn with_settings(mut self, settings: ControllerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the resolver (e.g. one with custom rules registered).
    pub fn with_rule_manager(mut self, rule_manager: RuleManager) -> Self {
        self.rule_manager = rule_manager;
        self
    }

    /// The model.
    pub fn model(&self) -> &ModularRigModel {
        &self.model
    }

    /// Consumes the controller, returning its model.
    pub fn into_model(self) -> ModularRigModel {
        self.model
    }

    /// The live rig as last constructed; may lag the model.
    pub fn rig(&self) -> &ModularRig {
        &self.rig
    }

    /// The live rig, for installing a connector event.
    pub fn rig_mut(&mut self) -> &mut ModularRig {
        &mut self.rig
    }

    /// The live rig, synced with the model and constructed.
    pub fn constructed_rig(&mut self) -> &ModularRig {
        self.sync_rig();
        &self.rig
    }

    /// Module class registry.
    pub fn classes(&self) -> &Arc<ModuleClassRegistry> {
        self.rig.classes()
    }

    /// Behavior switches.
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Replaces the behavior switches.
    pub fn set_settings(&mut self, settings: ControllerSettings) {
        self.settings = settings;
    }

    /// Resolver.
    pub fn rule_manager(&self) -> &RuleManager {
        &self.rule_manager
    }

    /// Resolver, for registering custom rules.
    pub fn rule_manager_mut(&mut self) -> &mut RuleManager {
        &mut self.rule_manager
    }

    /// Subscribes to change notifications.
    pub fn on_modified<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(ModularRigNotification, Option<&ModuleReference>) + 'static,
    {
        self.modified.subscribe(listener)
    }

    /// Removes a change listener.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.modified.unsubscribe(id)
    }

    /// Suspends (or resumes) change notifications.
    pub fn set_notifications_suspended(&mut self, suspended: bool) {
        self.suspend_notifications = suspended;
    }

    /// True while notifications are suspended.
    pub fn notifications_suspended(&self) -> bool {
        self.suspend_notifications
    }

    /// Opens an interaction bracket; it closes when the guard drops.
    pub fn interaction_bracket(&mut self) -> InteractionBracket<'_> {
        self.open_bracket();
        InteractionBracket {
            controller: self,
            canceled: false,
        }
    }

    /// Current bracket nesting depth.
    pub fn bracket_depth(&self) -> u32 {
        self.bracket_depth
    }

    /// Resolves a live connector against the constructed rig.
    pub fn find_matches(&mut self, connector: &ElementKey) -> ModularRigResolveResult {
        self.sync_rig();
        self.rule_manager
            .find_matches(&mut self.rig, connector, None, None)
    }

    /// Resolves the primary connector of a module.
    pub fn find_matches_for_primary_connector(&mut self, path: &str) -> ModularRigResolveResult {
        self.sync_rig();
        self.rule_manager
            .find_matches_for_primary_connector(&mut self.rig, path)
    }

    /// Resolves the secondary connectors of a module.
    pub fn find_matches_for_secondary_connectors(
        &mut self,
        path: &str,
    ) -> Vec<ModularRigResolveResult> {
        self.sync_rig();
        self.rule_manager
            .find_matches_for_secondary_connectors(&mut self.rig, path)
    }

    /// Resolves the optional connectors of a module.
    pub fn find_matches_for_optional_connectors(
        &mut self,
        path: &str,
    ) -> Vec<ModularRigResolveResult> {
        self.sync_rig();
        self.rule_manager
            .find_matches_for_optional_connectors(&mut self.rig, path)
    }

    // ==== internals shared by the operation modules ====

    fn mark_dirty(&mut self) {
        self.rig_dirty = true;
    }

    fn sync_rig(&mut self) {
        if self.rig_dirty {
            self.rig.update_model(&self.model);
            self.rig_dirty = false;
        }
        self.rig.ensure_constructed();
    }

    /// Module path of an element in the constructed hierarchy.
    fn element_module_path(&mut self, key: &ElementKey) -> Option<String> {
        self.sync_rig();
        self.rig
            .hierarchy()
            .module_path(key)
            .filter(|path| !path.is_empty())
    }

    fn module_class(&self, path: &str) -> Result<Arc<ModuleClass>, ControllerError> {
        let module = self
            .model
            .find_module(path)
            .ok_or_else(|| ControllerError::ModuleNotFound(path.to_owned()))?;
        self.classes()
            .get(&module.class)
            .cloned()
            .ok_or_else(|| ControllerError::UnknownClass(module.class.clone()))
    }

    /// Owning module path and declaration of a connector.
    fn connector_declaration(
        &self,
        connector: &ElementKey,
    ) -> Result<(String, ModuleConnector), ControllerError> {
        let (module_path, local) = split_namespace(&connector.name, true)
            .ok_or_else(|| ControllerError::ConnectorWithoutNamespace(connector.name.clone()))?;
        let class = self.module_class(module_path)?;
        let declaration = class.connector(local).cloned().ok_or_else(|| {
            ControllerError::UndeclaredConnector {
                connector: local.to_owned(),
                class: class.name().to_owned(),
            }
        })?;
        Ok((module_path.to_owned(), declaration))
    }

    fn notify(&mut self, kind: ModularRigNotification, path: Option<&str>) {
        if self.suspend_notifications {
            return;
        }
        let model = &self.model;
        let deleted = &self.deleted_modules;
        let module = path.and_then(|path| {
            model
                .find_module(path)
                .or_else(|| deleted.iter().rev().find(|m| m.path() == path))
        });
        self.modified.broadcast(kind, module);
    }

    /// Runs `f` with notifications suspended.
    fn suspended<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.suspend_notifications, true);
        let result = f(self);
        self.suspend_notifications = previous;
        result
    }

    fn open_bracket(&mut self) {
        if self.bracket_depth == 0 {
            self.bracket_canceled = false;
            self.bracket_silent = self.suspend_notifications;
            if !self.bracket_silent {
                self.modified
                    .broadcast(ModularRigNotification::InteractionBracketOpened, None);
            }
        }
        self.bracket_depth += 1;
    }

    fn close_bracket(&mut self, canceled: bool) {
        debug_assert!(self.bracket_depth > 0, "interaction bracket closed twice");
        self.bracket_canceled |= canceled;
        self.bracket_depth = self.bracket_depth.saturating_sub(1);
        if self.bracket_depth == 0 && !self.bracket_silent {
            let kind = if self.bracket_canceled {
                ModularRigNotification::InteractionBracketCanceled
            } else {
                ModularRigNotification::InteractionBracketClosed
            };
            self.modified.broadcast(kind, None);
        }
    }
}

/// Scoped interaction bracket.
///
/// Nested brackets only notify at the outermost level: opening at depth zero
/// emits `InteractionBracketOpened`, dropping the last guard emits
/// `InteractionBracketClosed`, or `InteractionBracketCanceled` when any guard
/// in the nest was canceled.
pub struct InteractionBracket<'a> {
    controller: &'a mut ModularRigController,
    canceled: bool,
}

impl InteractionBracket<'_> {
    /// Marks the bracket canceled.
    pub fn cancel(&mut self) {
        self.canceled = true;
    }
}

impl std::fmt::Debug for InteractionBracket<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionBracket")
            .field("depth", &self.controller.bracket_depth)
            .field("canceled", &self.canceled)
            .finish()
    }
}

impl Deref for InteractionBracket<'_> {
    type Target = ModularRigController;

    fn deref(&self) -> &ModularRigController {
        &*self.controller
    }
}

impl DerefMut for InteractionBracket<'_> {
    fn deref_mut(&mut self) -> &mut ModularRigController {
        &mut *self.controller
    }
}

impl Drop for InteractionBracket<'_> {
    fn drop(&mut self) {
        self.controller.close_bracket(self.canceled);
    }
}
