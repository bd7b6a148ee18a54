// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Module classes: the reusable building blocks a module reference instantiates.
//!
//! A class declares the connectors a module exposes, the variables it can be
//! configured or bound through, and the elements it spawns into the rig when
//! constructed.
use std::collections::BTreeMap;
use std::sync::Arc;

use rig_hierarchy::name::sanitize_name;
use rig_hierarchy::{ConnectorKind, ConnectorSettings, ElementKey, ElementType, RuleStash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised while declaring a module class.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassError {
    /// The class, a connector, a variable or a spawned element has an invalid name.
    #[error("invalid name '{0}'")]
    InvalidName(String),
    /// A class may expose a single primary connector.
    #[error("class '{0}' declares more than one primary connector")]
    MultiplePrimaryConnectors(String),
    /// Connector names must be unique within a class.
    #[error("class '{class}' declares connector '{connector}' twice")]
    DuplicateConnector {
        /// Class name.
        class: String,
        /// Connector name.
        connector: String,
    },
    /// Variable names must be unique within a class.
    #[error("class '{class}' declares variable '{variable}' twice")]
    DuplicateVariable {
        /// Class name.
        class: String,
        /// Variable name.
        variable: String,
    },
    /// Spawned element keys must be unique within a class.
    #[error("class '{class}' spawns element '{element}' twice")]
    DuplicateSpawn {
        /// Class name.
        class: String,
        /// Element name.
        element: String,
    },
    /// A spawned element names a parent the class does not declare before it.
    #[error("class '{class}' spawns '{element}' under unknown parent '{parent}'")]
    UnknownSpawnParent {
        /// Class name.
        class: String,
        /// Element name.
        element: String,
        /// Missing parent.
        parent: String,
    },
}

/// Value type of a module variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VariableType {
    /// `true` / `false`.
    Bool,
    /// Signed integer.
    Int,
    /// Finite floating point number.
    Float,
    /// Identifier-like name.
    Name,
    /// Free text.
    String,
    /// Three comma-separated floats.
    Vector,
    /// Nine comma-separated floats: translation, rotation, scale.
    Transform,
    /// Element key written as `Type(name)`.
    ElementKey,
}

fn parse_floats(value: &str) -> Option<Vec<f64>> {
    value
        .split(',')
        .map(|part| part.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect()
}

/// Parses a `x,y,z` vector literal.
pub fn parse_vector(value: &str) -> Option<[f64; 3]> {
    match parse_floats(value)?.as_slice() {
        [x, y, z] => Some([*x, *y, *z]),
        _ => None,
    }
}

/// Formats a vector literal accepted by [`parse_vector`].
pub fn format_vector(value: [f64; 3]) -> String {
    format!("{},{},{}", value[0], value[1], value[2])
}

/// Parses a `Type(name)` element key literal.
pub fn parse_element_key(value: &str) -> Option<ElementKey> {
    let (ty, rest) = value.trim().split_once('(')?;
    let name = rest.strip_suffix(')')?;
    let ty = ElementType::parse(ty)?;
    (!name.is_empty()).then(|| ElementKey::new(name, ty))
}

impl VariableType {
    /// True when `value` is a valid textual literal of this type.
    pub fn accepts(self, value: &str) -> bool {
        match self {
            Self::Bool => {
                value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
            }
            Self::Int => value.trim().parse::<i64>().is_ok(),
            Self::Float => value
                .trim()
                .parse::<f64>()
                .is_ok_and(f64::is_finite),
            Self::Name => !value.is_empty() && sanitize_name(value, true) == value,
            Self::String => true,
            Self::Vector => parse_vector(value).is_some(),
            Self::Transform => parse_floats(value).is_some_and(|v| v.len() == 9),
            Self::ElementKey => parse_element_key(value).is_some(),
        }
    }
}

/// Variable declared by a module class (or by the root rig).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleVariable {
    /// Variable name.
    pub name: String,
    /// Value type.
    pub ty: VariableType,
    /// Read-only variables can be used as binding sources but never set.
    pub read_only: bool,
    /// Only public variables are configurable per module.
    pub public: bool,
    /// Advanced variables are hidden from module configuration.
    pub advanced: bool,
    /// Default literal.
    pub default: String,
}

impl ModuleVariable {
    /// A public, writable variable.
    pub fn new(name: impl Into<String>, ty: VariableType) -> Self {
        Self {
            name: name.into(),
            ty,
            read_only: false,
            public: true,
            advanced: false,
            default: String::new(),
        }
    }

    /// Marks the variable read-only.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Marks the variable private.
    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    /// Marks the variable advanced.
    pub fn advanced(mut self) -> Self {
        self.advanced = true;
        self
    }

    /// Sets the default literal.
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = value.into();
        self
    }

    /// True when the variable can be configured on a module instance.
    pub fn is_configurable(&self) -> bool {
        self.public && !self.advanced
    }
}

/// Connector declared by a module class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConnector {
    /// Connector name, local to the module namespace.
    pub name: String,
    /// Role of the connector.
    pub kind: ConnectorKind,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Rules applied in declared order while resolving.
    #[serde(default)]
    pub rules: Vec<RuleStash>,
}

impl ModuleConnector {
    /// Declares a connector of `kind`.
    pub fn new(name: impl Into<String>, kind: ConnectorKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            rules: Vec::new(),
        }
    }

    /// Declares the primary connector.
    pub fn primary(name: impl Into<String>) -> Self {
        Self::new(name, ConnectorKind::Primary)
    }

    /// Declares a secondary connector.
    pub fn secondary(name: impl Into<String>) -> Self {
        Self::new(name, ConnectorKind::Secondary)
    }

    /// Declares an optional connector.
    pub fn optional(name: impl Into<String>) -> Self {
        Self::new(name, ConnectorKind::Optional)
    }

    /// Appends a rule.
    pub fn with_rule(mut self, rule: RuleStash) -> Self {
        self.rules.push(rule);
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Settings stored on the constructed connector element.
    pub fn settings(&self) -> ConnectorSettings {
        ConnectorSettings {
            description: self.description.clone(),
            kind: self.kind,
            rules: self.rules.clone(),
        }
    }
}

/// Where a spawned element is attached when a module is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnParent {
    /// Top level of the hierarchy.
    Root,
    /// Whatever the named connector of the same module resolves to.
    Connector(String),
    /// Another element spawned earlier by the same module.
    Element(String),
}

/// Element a module class adds to the rig under its namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnedElement {
    /// Local name; the constructed key is `module_path:name`.
    pub name: String,
    /// Element type.
    pub ty: ElementType,
    /// Attachment.
    pub parent: SpawnParent,
    /// Tags applied to the constructed element.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SpawnedElement {
    /// Declares a spawned element.
    pub fn new(name: impl Into<String>, ty: ElementType, parent: SpawnParent) -> Self {
        Self {
            name: name.into(),
            ty,
            parent,
            tags: Vec::new(),
        }
    }

    /// Declares a socket attached to the target of `connector`.
    pub fn socket_on(name: impl Into<String>, connector: impl Into<String>) -> Self {
        Self::new(name, ElementType::Socket, SpawnParent::Connector(connector.into()))
    }

    /// Adds a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Immutable module class declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleClass {
    name: String,
    connectors: Vec<ModuleConnector>,
    variables: Vec<ModuleVariable>,
    spawns: Vec<SpawnedElement>,
}

impl ModuleClass {
    /// Starts declaring a class named `name`.
    pub fn builder(name: impl Into<String>) -> ModuleClassBuilder {
        ModuleClassBuilder {
            class: Self {
                name: name.into(),
                connectors: Vec::new(),
                variables: Vec::new(),
                spawns: Vec::new(),
            },
        }
    }

    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exposed connectors in declaration order.
    pub fn connectors(&self) -> &[ModuleConnector] {
        &self.connectors
    }

    /// Declared variables in declaration order.
    pub fn variables(&self) -> &[ModuleVariable] {
        &self.variables
    }

    /// Spawned elements in declaration order.
    pub fn spawns(&self) -> &[SpawnedElement] {
        &self.spawns
    }

    /// The primary connector, if the class declares one.
    pub fn primary_connector(&self) -> Option<&ModuleConnector> {
        self.connectors.iter().find(|c| c.kind.is_primary())
    }

    /// Looks an exposed connector up by local name.
    pub fn connector(&self, name: &str) -> Option<&ModuleConnector> {
        self.connectors.iter().find(|c| c.name == name)
    }

    /// Looks a variable up by name.
    pub fn variable(&self, name: &str) -> Option<&ModuleVariable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Validating builder for [`ModuleClass`].
#[derive(Debug, Clone)]
pub struct ModuleClassBuilder {
    class: ModuleClass,
}

impl ModuleClassBuilder {
    /// Exposes a connector.
    pub fn connector(mut self, connector: ModuleConnector) -> Self {
        self.class.connectors.push(connector);
        self
    }

    /// Declares a variable.
    pub fn variable(mut self, variable: ModuleVariable) -> Self {
        self.class.variables.push(variable);
        self
    }

    /// Declares a spawned element.
    pub fn spawn(mut self, element: SpawnedElement) -> Self {
        self.class.spawns.push(element);
        self
    }

    /// Validates names and uniqueness and returns the class.
    pub fn build(self) -> Result<ModuleClass, ClassError> {
        let class = self.class;
        let valid = |name: &str| !name.is_empty() && sanitize_name(name, false) == name;
        if !valid(&class.name) {
            return Err(ClassError::InvalidName(class.name));
        }
        let mut primaries = 0;
        for (index, connector) in class.connectors.iter().enumerate() {
            if !valid(&connector.name) {
                return Err(ClassError::InvalidName(connector.name.clone()));
            }
            if class.connectors[..index].iter().any(|c| c.name == connector.name) {
                return Err(ClassError::DuplicateConnector {
                    class: class.name.clone(),
                    connector: connector.name.clone(),
                });
            }
            if connector.kind.is_primary() {
                primaries += 1;
            }
        }
        if primaries > 1 {
            return Err(ClassError::MultiplePrimaryConnectors(class.name));
        }
        for (index, variable) in class.variables.iter().enumerate() {
            if !valid(&variable.name) {
                return Err(ClassError::InvalidName(variable.name.clone()));
            }
            if class.variables[..index].iter().any(|v| v.name == variable.name) {
                return Err(ClassError::DuplicateVariable {
                    class: class.name.clone(),
                    variable: variable.name.clone(),
                });
            }
        }
        for (index, spawn) in class.spawns.iter().enumerate() {
            if !valid(&spawn.name) {
                return Err(ClassError::InvalidName(spawn.name.clone()));
            }
            let earlier = &class.spawns[..index];
            if earlier.iter().any(|s| s.name == spawn.name && s.ty == spawn.ty) {
                return Err(ClassError::DuplicateSpawn {
                    class: class.name.clone(),
                    element: spawn.name.clone(),
                });
            }
            let known = match &spawn.parent {
                SpawnParent::Root => true,
                SpawnParent::Connector(name) => class.connector(name).is_some(),
                SpawnParent::Element(name) => earlier.iter().any(|s| &s.name == name),
            };
            if !known {
                let parent = match &spawn.parent {
                    SpawnParent::Connector(name) | SpawnParent::Element(name) => name.clone(),
                    SpawnParent::Root => String::new(),
                };
                return Err(ClassError::UnknownSpawnParent {
                    class: class.name.clone(),
                    element: spawn.name.clone(),
                    parent,
                });
            }
        }
        Ok(class)
    }
}

/// Name-indexed set of module classes.
#[derive(Debug, Clone, Default)]
pub struct ModuleClassRegistry {
    classes: BTreeMap<String, Arc<ModuleClass>>,
}

impl ModuleClassRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a class and returns the shared handle.
    pub fn register(&mut self, class: ModuleClass) -> Arc<ModuleClass> {
        let class = Arc::new(class);
        self.classes
            .insert(class.name().to_owned(), Arc::clone(&class));
        class
    }

    /// Looks a class up by name.
    pub fn get(&self, name: &str) -> Option<&Arc<ModuleClass>> {
        self.classes.get(name)
    }

    /// True when a class of that name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Iterates classes ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModuleClass>> {
        self.classes.values()
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// True when no class is registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_primaries_are_rejected() {
        let err = ModuleClass::builder("Arm")
            .connector(ModuleConnector::primary("Root"))
            .connector(ModuleConnector::primary("Other"))
            .build()
            .unwrap_err();
        assert_eq!(err, ClassError::MultiplePrimaryConnectors("Arm".into()));
    }

    #[test]
    fn spawn_parent_must_be_declared() {
        let err = ModuleClass::builder("Arm")
            .connector(ModuleConnector::primary("Root"))
            .spawn(SpawnedElement::socket_on("hand", "Missing"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ClassError::UnknownSpawnParent { .. }));
    }

    #[test]
    fn connector_names_may_not_contain_separator() {
        let err = ModuleClass::builder("Arm")
            .connector(ModuleConnector::primary("A:B"))
            .build()
            .unwrap_err();
        assert_eq!(err, ClassError::InvalidName("A:B".into()));
    }

    #[test]
    fn variable_literals() {
        assert!(VariableType::Bool.accepts("TRUE"));
        assert!(!VariableType::Bool.accepts("yes"));
        assert!(VariableType::Int.accepts("-3"));
        assert!(!VariableType::Float.accepts("NaN"));
        assert!(VariableType::Vector.accepts("1, 2.5, -3"));
        assert!(!VariableType::Vector.accepts("1,2"));
        assert!(VariableType::Transform.accepts("0,0,0,0,0,0,1,1,1"));
        assert!(VariableType::ElementKey.accepts("Bone(hand_l)"));
        assert!(!VariableType::ElementKey.accepts("Bone()"));
        assert_eq!(parse_vector("1,2,3"), Some([1.0, 2.0, 3.0]));
        assert_eq!(format_vector([1.0, -2.0, 0.5]), "1,-2,0.5");
    }
}
