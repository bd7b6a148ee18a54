// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON rig document: base hierarchy, classes, module tree and connections.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use modular_rig::{
    ClassError, ControllerSettings, ModularRig, ModularRigConnection, ModularRigController,
    ModularRigModel, ModuleClass, ModuleClassRegistry, ModuleReference, ModuleVariable,
};
use rig_hierarchy::{ElementGraph, RigElement};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Everything the CLI needs to rebuild a controller.
///
/// Hierarchy elements must list their parents before themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigDocument {
    /// Base hierarchy the modules attach to.
    #[serde(default)]
    pub hierarchy: Vec<RigElement>,
    /// Module class declarations.
    #[serde(default)]
    pub classes: Vec<ModuleClass>,
    /// Module tree.
    #[serde(default)]
    pub modules: Vec<ModuleReference>,
    /// Connector → target connections.
    #[serde(default)]
    pub connections: Vec<ModularRigConnection>,
    /// Root rig variables usable as binding sources.
    #[serde(default)]
    pub variables: Vec<ModuleVariable>,
}

impl RigDocument {
    /// Reads a document from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse rig document {}", path.display()))
    }

    /// Writes the document as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Builds a controller over the document's rig and model.
    pub fn controller(&self, settings: ControllerSettings) -> Result<ModularRigController> {
        let mut graph = ElementGraph::new();
        for element in &self.hierarchy {
            graph
                .add_element(element.clone())
                .with_context(|| format!("invalid hierarchy element {}", element.key))?;
        }

        let mut classes = ModuleClassRegistry::new();
        for class in &self.classes {
            let class = validate_class(class)
                .with_context(|| format!("invalid module class '{}'", class.name()))?;
            classes.register(class);
        }
        for module in &self.modules {
            if !classes.contains(&module.class) {
                bail!(
                    "module '{}' uses unknown class '{}'",
                    module.path(),
                    module.class
                );
            }
        }
        debug!(
            elements = graph.len(),
            classes = classes.len(),
            modules = self.modules.len(),
            "rig document loaded"
        );

        let rig = ModularRig::new(graph, Arc::new(classes)).with_variables(self.variables.clone());
        let model = ModularRigModel::from_parts(self.modules.clone(), self.connections.clone());
        Ok(ModularRigController::new(rig)
            .with_settings(settings)
            .with_model(model))
    }

    /// Copies the controller's module tree and connections back into the document.
    pub fn update_from(&mut self, controller: &ModularRigController) {
        let model = controller.model();
        self.modules = model.modules().to_vec();
        self.connections = model.connections().connections().to_vec();
    }
}

/// Runs a deserialized class back through the builder's checks.
fn validate_class(class: &ModuleClass) -> Result<ModuleClass, ClassError> {
    let builder = class
        .connectors()
        .iter()
        .cloned()
        .fold(ModuleClass::builder(class.name()), |b, c| b.connector(c));
    let builder = class
        .variables()
        .iter()
        .cloned()
        .fold(builder, |b, v| b.variable(v));
    class
        .spawns()
        .iter()
        .cloned()
        .fold(builder, |b, s| b.spawn(s))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use modular_rig::ModuleConnector;
    use rig_hierarchy::{ElementKey, RuleStash};

    fn bone(name: &str, parent: Option<&str>) -> RigElement {
        let element = RigElement::new(ElementKey::bone(name));
        match parent {
            Some(parent) => element.with_parent(ElementKey::bone(parent)),
            None => element,
        }
    }

    fn tail_class() -> ModuleClass {
        ModuleClass::builder("Tail")
            .connector(
                ModuleConnector::primary("Root")
                    .with_rule(RuleStash::Type(rig_hierarchy::ElementType::Bone)),
            )
            .build()
            .unwrap()
    }

    fn document() -> RigDocument {
        RigDocument {
            hierarchy: vec![bone("root", None), bone("pelvis", Some("root"))],
            classes: vec![tail_class()],
            modules: vec![ModuleReference::new("Tail", "Tail", "")],
            ..RigDocument::default()
        }
    }

    #[test]
    fn controller_sees_document_modules() {
        let controller = document().controller(ControllerSettings::default()).unwrap();
        assert!(controller.model().find_module("Tail").is_some());
        assert_eq!(controller.rig().base().len(), 2);
    }

    #[test]
    fn out_of_order_hierarchy_is_rejected() {
        let mut doc = document();
        doc.hierarchy.reverse();
        let err = doc.controller(ControllerSettings::default()).unwrap_err();
        assert!(err.to_string().contains("invalid hierarchy element"));
    }

    #[test]
    fn unknown_module_class_is_rejected() {
        let mut doc = document();
        doc.modules.push(ModuleReference::new("Wing", "Wing", ""));
        let err = doc.controller(ControllerSettings::default()).unwrap_err();
        assert_eq!(err.to_string(), "module 'Wing' uses unknown class 'Wing'");
    }

    #[test]
    fn deserialized_classes_are_validated() {
        let json = r#"{
            "classes": [{
                "name": "Twin",
                "connectors": [
                    { "name": "A", "kind": "Primary" },
                    { "name": "B", "kind": "Primary" }
                ],
                "variables": [],
                "spawns": []
            }]
        }"#;
        let doc: RigDocument = serde_json::from_str(json).unwrap();
        let err = doc.controller(ControllerSettings::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClassError>(),
            Some(ClassError::MultiplePrimaryConnectors(_))
        ));
    }

    #[test]
    fn update_from_copies_the_model_back() {
        let mut doc = document();
        let mut controller = doc.controller(ControllerSettings::default()).unwrap();
        controller
            .connect(&ElementKey::connector("Tail:Root"), &ElementKey::bone("pelvis"))
            .unwrap();
        doc.update_from(&controller);
        assert_eq!(doc.connections.len(), 1);
        assert_eq!(doc.connections[0].target, ElementKey::bone("pelvis"));
    }
}
