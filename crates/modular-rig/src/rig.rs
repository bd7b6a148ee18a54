// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Live modular rig: constructs a hierarchy from a base skeleton and a model.
//!
//! Construction walks the module tree parent-first. Each module contributes
//! its connector elements and the elements its class spawns, all under the
//! module namespace. Spawned elements hang off whatever the referenced
//! connector resolves to, so the constructed hierarchy reflects the current
//! connection state.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rig_hierarchy::name::{join_namespace, namespace_of_path};
use rig_hierarchy::{ElementGraph, ElementKey, ElementKeyRedirector, Hierarchy, RigElement};
use tracing::{debug, warn};

use crate::class::{ModuleClass, ModuleClassRegistry, ModuleVariable, SpawnParent};
use crate::model::ModularRigModel;
use crate::resolve::ElementResolveResult;

/// A constructed module.
#[derive(Debug, Clone)]
pub struct ModuleInstance {
    /// Segment name.
    pub name: String,
    /// Parent module path; empty for roots.
    pub parent_path: String,
    /// Class the module instantiates.
    pub class: Arc<ModuleClass>,
    /// Effective config values (class defaults overlaid with module values).
    pub config_values: BTreeMap<String, String>,
}

impl ModuleInstance {
    /// Full path.
    pub fn path(&self) -> String {
        join_namespace(&self.parent_path, &self.name)
    }

    /// Namespace including the trailing separator.
    pub fn namespace(&self) -> String {
        namespace_of_path(&self.path())
    }

    /// Key of a connector of this module.
    pub fn connector_key(&self, connector: &str) -> ElementKey {
        ElementKey::connector(join_namespace(&self.path(), connector))
    }

    /// Key of the primary connector, if the class declares one.
    pub fn primary_connector_key(&self) -> Option<ElementKey> {
        self.class
            .primary_connector()
            .map(|c| self.connector_key(&c.name))
    }
}

/// Inputs handed to a [`ConnectorEvent`].
#[derive(Clone, Copy)]
pub struct ConnectorEventContext<'a> {
    /// Connector being resolved.
    pub connector: &'a ElementKey,
    /// Module owning the connector.
    pub module: &'a ModuleInstance,
    /// Connectors resolved so far.
    pub redirector: &'a ElementKeyRedirector,
    /// Hierarchy being resolved against.
    pub hierarchy: &'a dyn Hierarchy,
}

/// Rig-defined hook that may reorder, prune or tag candidates mid-resolution.
pub trait ConnectorEvent {
    /// Runs the event over the surviving candidates.
    fn execute(&self, context: &ConnectorEventContext<'_>, candidates: &mut Vec<ElementResolveResult>);
}

impl<F> ConnectorEvent for F
where
    F: Fn(&ConnectorEventContext<'_>, &mut Vec<ElementResolveResult>),
{
    fn execute(&self, context: &ConnectorEventContext<'_>, candidates: &mut Vec<ElementResolveResult>) {
        self(context, candidates);
    }
}

/// The object that owns the hierarchy a resolve call runs against.
///
/// A bare [`ElementGraph`] is a host that never needs construction and has no
/// modules. [`ModularRig`] is the full host.
pub trait RigHost {
    /// Hierarchy to resolve against.
    fn hierarchy(&self) -> Option<&dyn Hierarchy>;

    /// True when the hierarchy may be stale.
    fn is_construction_required(&self) -> bool {
        false
    }

    /// Rebuilds the hierarchy.
    fn run_construction(&mut self) {}

    /// Constructed module at `path`.
    fn find_module_instance(&self, _path: &str) -> Option<&ModuleInstance> {
        None
    }

    /// Connectors resolved by the host.
    fn redirector(&self) -> Option<&ElementKeyRedirector> {
        None
    }

    /// Runs the host's connector event; returns `false` when the host has none.
    fn execute_connector_event(
        &self,
        _connector: &ElementKey,
        _module: &ModuleInstance,
        _redirector: &ElementKeyRedirector,
        _candidates: &mut Vec<ElementResolveResult>,
    ) -> bool {
        false
    }
}

impl RigHost for ElementGraph {
    fn hierarchy(&self) -> Option<&dyn Hierarchy> {
        Some(self)
    }
}

/// Modular rig host.
pub struct ModularRig {
    base: ElementGraph,
    classes: Arc<ModuleClassRegistry>,
    variables: Vec<ModuleVariable>,
    model: ModularRigModel,
    hierarchy: ElementGraph,
    instances: Vec<ModuleInstance>,
    redirector: ElementKeyRedirector,
    connector_event: Option<Box<dyn ConnectorEvent>>,
    construction_required: bool,
    construction_count: u64,
}

impl fmt::Debug for ModularRig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModularRig")
            .field("elements", &self.hierarchy.len())
            .field("modules", &self.instances.len())
            .field("construction_required", &self.construction_required)
            .field("has_connector_event", &self.connector_event.is_some())
            .finish_non_exhaustive()
    }
}

impl ModularRig {
    /// Creates a rig over `base` with no modules.
    pub fn new(base: ElementGraph, classes: Arc<ModuleClassRegistry>) -> Self {
        Self {
            hierarchy: base.clone(),
            base,
            classes,
            variables: Vec::new(),
            model: ModularRigModel::new(),
            instances: Vec::new(),
            redirector: ElementKeyRedirector::new(),
            connector_event: None,
            construction_required: false,
            construction_count: 0,
        }
    }

    /// Declares the root rig variables usable as binding sources.
    pub fn with_variables(mut self, variables: Vec<ModuleVariable>) -> Self {
        self.variables = variables;
        self
    }

    /// Root rig variables.
    pub fn variables(&self) -> &[ModuleVariable] {
        &self.variables
    }

    /// Looks a root rig variable up by name.
    pub fn variable(&self, name: &str) -> Option<&ModuleVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Base skeleton the rig is constructed from.
    pub fn base(&self) -> &ElementGraph {
        &self.base
    }

    /// Class registry.
    pub fn classes(&self) -> &Arc<ModuleClassRegistry> {
        &self.classes
    }

    /// Model copy the rig constructs from.
    pub fn model(&self) -> &ModularRigModel {
        &self.model
    }

    /// Constructed hierarchy (may be stale, see [`Self::is_construction_required`]).
    pub fn hierarchy(&self) -> &ElementGraph {
        &self.hierarchy
    }

    /// Constructed modules in tree order.
    pub fn modules(&self) -> &[ModuleInstance] {
        &self.instances
    }

    /// Constructed module at `path`.
    pub fn find_module(&self, path: &str) -> Option<&ModuleInstance> {
        self.instances.iter().find(|m| m.path() == path)
    }

    /// Resolved connectors of the last construction.
    pub fn redirector(&self) -> &ElementKeyRedirector {
        &self.redirector
    }

    /// Number of completed constructions.
    pub fn construction_count(&self) -> u64 {
        self.construction_count
    }

    /// Installs the connector event.
    pub fn set_connector_event<E: ConnectorEvent + 'static>(&mut self, event: E) {
        self.connector_event = Some(Box::new(event));
    }

    /// Removes the connector event.
    pub fn clear_connector_event(&mut self) {
        self.connector_event = None;
    }

    /// Replaces the model copy and marks the hierarchy stale.
    pub fn update_model(&mut self, model: &ModularRigModel) {
        self.model = model.clone();
        self.construction_required = true;
    }

    /// Marks the hierarchy stale.
    pub fn request_construction(&mut self) {
        self.construction_required = true;
    }

    /// True when the hierarchy no longer reflects the model.
    pub fn is_construction_required(&self) -> bool {
        self.construction_required
    }

    /// Constructs if stale.
    pub fn ensure_constructed(&mut self) {
        if self.construction_required {
            self.construct();
        }
    }

    /// Rebuilds the hierarchy, module instances and redirector from the model.
    pub fn construct(&mut self) {
        let mut hierarchy = self.base.clone();
        let mut instances = Vec::with_capacity(self.model.len());
        let connections = self.model.connections();

        for module in self.model.traversal_order() {
            let path = module.path();
            let Some(class) = self.classes.get(&module.class) else {
                warn!(module = %path, class = %module.class, "module class not registered; skipped");
                continue;
            };
            for connector in class.connectors() {
                let name = join_namespace(&path, &connector.name);
                if let Err(err) = hierarchy.add_connector(&name, connector.settings(), Some(&path)) {
                    warn!(module = %path, %err, "failed to add connector");
                }
            }
            for spawn in class.spawns() {
                let parent = match &spawn.parent {
                    SpawnParent::Root => None,
                    SpawnParent::Connector(connector) => connections
                        .find_target_from_connector(&ElementKey::connector(join_namespace(
                            &path, connector,
                        )))
                        .filter(|target| hierarchy.contains(target))
                        .cloned(),
                    SpawnParent::Element(name) => class
                        .spawns()
                        .iter()
                        .find(|s| &s.name == name)
                        .map(|s| ElementKey::new(join_namespace(&path, &s.name), s.ty))
                        .filter(|key| hierarchy.contains(key)),
                };
                let mut element =
                    RigElement::new(ElementKey::new(join_namespace(&path, &spawn.name), spawn.ty));
                element.parents.extend(parent);
                element.module_path = Some(path.clone());
                element.tags.extend(spawn.tags.iter().cloned());
                if let Err(err) = hierarchy.add_element(element) {
                    warn!(module = %path, %err, "failed to spawn element");
                }
            }
            let mut config_values: BTreeMap<String, String> = class
                .variables()
                .iter()
                .map(|v| (v.name.clone(), v.default.clone()))
                .collect();
            config_values.extend(module.config_values.clone());
            instances.push(ModuleInstance {
                name: module.name.clone(),
                parent_path: module.parent_path.clone(),
                class: Arc::clone(class),
                config_values,
            });
        }

        let redirector: ElementKeyRedirector = connections
            .iter()
            .filter(|c| hierarchy.contains(&c.connector) && hierarchy.contains(&c.target))
            .map(|c| (c.connector.clone(), c.target.clone()))
            .collect();

        self.hierarchy = hierarchy;
        self.instances = instances;
        self.redirector = redirector;
        self.construction_required = false;
        self.construction_count += 1;
        debug!(
            modules = self.instances.len(),
            elements = self.hierarchy.len(),
            redirected = self.redirector.len(),
            "constructed modular rig"
        );
    }
}

impl RigHost for ModularRig {
    fn hierarchy(&self) -> Option<&dyn Hierarchy> {
        Some(&self.hierarchy)
    }

    fn is_construction_required(&self) -> bool {
        self.construction_required
    }

    fn run_construction(&mut self) {
        self.construct();
    }

    fn find_module_instance(&self, path: &str) -> Option<&ModuleInstance> {
        self.find_module(path)
    }

    fn redirector(&self) -> Option<&ElementKeyRedirector> {
        Some(&self.redirector)
    }

    fn execute_connector_event(
        &self,
        connector: &ElementKey,
        module: &ModuleInstance,
        redirector: &ElementKeyRedirector,
        candidates: &mut Vec<ElementResolveResult>,
    ) -> bool {
        let Some(event) = &self.connector_event else {
            return false;
        };
        let context = ConnectorEventContext {
            connector,
            module,
            redirector,
            hierarchy: &self.hierarchy,
        };
        event.execute(&context, candidates);
        true
    }
}
