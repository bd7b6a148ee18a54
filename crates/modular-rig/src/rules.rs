// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Connection rules: per-candidate verdicts applied in declared order.
//!
//! Connector declarations carry rules as [`RuleStash`] data. The
//! [`RuleRegistry`] turns each stash into a boxed [`ConnectionRule`] when a
//! resolve call runs. Every rule returns a full [`ElementResolveResult`] that
//! replaces the candidate's previous verdict.
use std::collections::BTreeMap;
use std::fmt;

use rig_hierarchy::name::eq_ignore_case;
use rig_hierarchy::{ElementKey, ElementKeyRedirector, ElementType, Hierarchy, RuleStash};

use crate::resolve::ElementResolveResult;
use crate::rig::ModuleInstance;

/// Context a rule evaluates a candidate in.
#[derive(Clone, Copy)]
pub struct RuleInput<'a> {
    /// Hierarchy being resolved against.
    pub hierarchy: &'a dyn Hierarchy,
    /// Module owning the connector, when known.
    pub module: Option<&'a ModuleInstance>,
    /// Connectors resolved so far.
    pub redirector: &'a ElementKeyRedirector,
}

impl RuleInput<'_> {
    /// Primary connector element of the module.
    pub fn find_primary_connector(&self) -> Result<ElementKey, String> {
        let missing = || {
            format!(
                "No primary connector found for module '{}'.",
                self.module.map(ModuleInstance::path).unwrap_or_default()
            )
        };
        let module = self.module.ok_or_else(missing)?;
        let namespace = module.namespace();
        self.hierarchy
            .connectors()
            .into_iter()
            .find(|key| {
                self.hierarchy
                    .connector_settings(key)
                    .is_some_and(|s| s.kind.is_primary())
                    && self
                        .hierarchy
                        .namespace(key)
                        .is_some_and(|ns| eq_ignore_case(&ns, &namespace))
            })
            .ok_or_else(missing)
    }

    /// Element a connector currently resolves to.
    pub fn resolve_connector(&self, connector: &ElementKey) -> Result<ElementKey, String> {
        self.redirector
            .find(connector)
            .filter(|target| self.hierarchy.contains(target))
            .cloned()
            .ok_or_else(|| {
                format!("Resolved target not found for connector '{}'.", connector.name)
            })
    }
}

/// A single filter-and-annotate step of connector resolution.
pub trait ConnectionRule: fmt::Debug {
    /// Verdict on `target`.
    fn resolve(&self, target: &ElementKey, input: &RuleInput<'_>) -> ElementResolveResult;
}

/// Accepts a candidate only if every child rule does.
#[derive(Debug, Default)]
pub struct AndRule {
    /// Child rules in evaluation order.
    pub rules: Vec<Box<dyn ConnectionRule>>,
}

impl ConnectionRule for AndRule {
    fn resolve(&self, target: &ElementKey, input: &RuleInput<'_>) -> ElementResolveResult {
        let mut result = ElementResolveResult::possible(target.clone());
        for rule in &self.rules {
            result = rule.resolve(target, input);
            if !result.is_valid() {
                return result;
            }
        }
        result
    }
}

/// Accepts a candidate as soon as one child rule does.
#[derive(Debug, Default)]
pub struct OrRule {
    /// Child rules in evaluation order.
    pub rules: Vec<Box<dyn ConnectionRule>>,
}

impl ConnectionRule for OrRule {
    fn resolve(&self, target: &ElementKey, input: &RuleInput<'_>) -> ElementResolveResult {
        let mut result = ElementResolveResult::invalid(
            target.clone(),
            format!("No rule accepted element '{}'.", target.name),
        );
        for rule in &self.rules {
            result = rule.resolve(target, input);
            if result.is_valid() {
                return result;
            }
        }
        result
    }
}

/// Accepts candidates of one element type.
#[derive(Debug, Clone, Copy)]
pub struct TypeRule {
    /// Required type.
    pub element_type: ElementType,
}

impl Default for TypeRule {
    fn default() -> Self {
        Self {
            element_type: ElementType::Socket,
        }
    }
}

impl ConnectionRule for TypeRule {
    fn resolve(&self, target: &ElementKey, _input: &RuleInput<'_>) -> ElementResolveResult {
        if target.ty == self.element_type {
            ElementResolveResult::possible(target.clone())
        } else {
            ElementResolveResult::invalid(
                target.clone(),
                format!(
                    "Element '{}' is not of the expected type ({}).",
                    target.name, self.element_type
                ),
            )
        }
    }
}

/// Accepts candidates carrying a tag.
#[derive(Debug, Clone)]
pub struct TagRule {
    /// Required tag.
    pub tag: String,
}

impl ConnectionRule for TagRule {
    fn resolve(&self, target: &ElementKey, input: &RuleInput<'_>) -> ElementResolveResult {
        if input.hierarchy.has_tag(target, &self.tag) {
            ElementResolveResult::possible(target.clone())
        } else {
            ElementResolveResult::invalid(
                target.clone(),
                format!("Element '{}' does not contain tag '{}'.", target.name, self.tag),
            )
        }
    }
}

/// Accepts candidates below the target of the module's primary connector.
///
/// A socket resolved as primary target stands for its parent: the socket's
/// parent itself is rejected and children are checked against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChildOfPrimaryRule;

impl ConnectionRule for ChildOfPrimaryRule {
    fn resolve(&self, target: &ElementKey, input: &RuleInput<'_>) -> ElementResolveResult {
        let reject = |message: String| ElementResolveResult::invalid(target.clone(), message);
        let primary = match input.find_primary_connector() {
            Ok(primary) => primary,
            Err(message) => return reject(message),
        };
        let mut primary_target = match input.resolve_connector(&primary) {
            Ok(primary_target) => primary_target,
            Err(message) => return reject(message),
        };
        if target == &primary_target {
            return reject(format!(
                "Target '{}' is already used for the primary.",
                target.name
            ));
        }
        let not_a_child = || format!("Target '{}' is not a child of the primary.", target.name);
        if primary_target.ty == ElementType::Socket {
            if let Some(parent) = input.hierarchy.first_parent(&primary_target) {
                if target == &parent {
                    return reject(not_a_child());
                }
                primary_target = parent;
            }
        }
        if !input.hierarchy.is_parented_to(target, &primary_target) {
            return reject(not_a_child());
        }
        ElementResolveResult::possible(target.clone())
    }
}

/// Stand-in for a custom rule no factory is registered for; rejects everything.
#[derive(Debug, Clone)]
pub struct UnknownRule {
    /// Unregistered rule name.
    pub name: String,
}

impl ConnectionRule for UnknownRule {
    fn resolve(&self, target: &ElementKey, _input: &RuleInput<'_>) -> ElementResolveResult {
        ElementResolveResult::invalid(
            target.clone(),
            format!("Unknown connection rule '{}'.", self.name),
        )
    }
}

/// Factory building a custom rule from its stashed arguments.
pub type RuleFactory = fn(&BTreeMap<String, String>) -> Box<dyn ConnectionRule>;

/// Instantiates rule stashes; knows the builtins plus registered custom rules.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    custom: BTreeMap<String, RuleFactory>,
}

impl RuleRegistry {
    /// Registry with only the builtin rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a custom rule factory.
    pub fn register(&mut self, name: impl Into<String>, factory: RuleFactory) {
        self.custom.insert(name.into(), factory);
    }

    /// True when a custom rule of that name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    /// Builds the executable rule for a stash.
    pub fn instantiate(&self, stash: &RuleStash) -> Box<dyn ConnectionRule> {
        match stash {
            RuleStash::And(children) => Box::new(AndRule {
                rules: children.iter().map(|c| self.instantiate(c)).collect(),
            }),
            RuleStash::Or(children) => Box::new(OrRule {
                rules: children.iter().map(|c| self.instantiate(c)).collect(),
            }),
            RuleStash::Type(element_type) => Box::new(TypeRule {
                element_type: *element_type,
            }),
            RuleStash::Tag(tag) => Box::new(TagRule { tag: tag.clone() }),
            RuleStash::ChildOfPrimary => Box::new(ChildOfPrimaryRule),
            RuleStash::Custom { name, args } => match self.custom.get(name) {
                Some(factory) => factory(args),
                None => Box::new(UnknownRule { name: name.clone() }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_hierarchy::ElementGraph;

    fn graph() -> ElementGraph {
        let mut graph = ElementGraph::new();
        let root = graph.add_bone("root", None).unwrap();
        let hand = graph.add_bone("hand", Some(&root)).unwrap();
        graph.add_tag(&hand, "grip").unwrap();
        graph.add_socket("hand_socket", Some(&hand)).unwrap();
        graph
    }

    fn input<'a>(graph: &'a ElementGraph, redirector: &'a ElementKeyRedirector) -> RuleInput<'a> {
        RuleInput {
            hierarchy: graph,
            module: None,
            redirector,
        }
    }

    #[test]
    fn type_rule_defaults_to_socket() {
        let graph = graph();
        let redirector = ElementKeyRedirector::new();
        let rule = TypeRule::default();
        assert!(rule.resolve(&ElementKey::socket("hand_socket"), &input(&graph, &redirector)).is_valid());
        let verdict = rule.resolve(&ElementKey::bone("hand"), &input(&graph, &redirector));
        assert_eq!(verdict.message, "Element 'hand' is not of the expected type (Socket).");
    }

    #[test]
    fn and_stops_at_first_rejection_or_keeps_first_acceptance() {
        let graph = graph();
        let redirector = ElementKeyRedirector::new();
        let registry = RuleRegistry::new();
        let and = registry.instantiate(&RuleStash::And(vec![
            RuleStash::Type(ElementType::Bone),
            RuleStash::Tag("grip".into()),
        ]));
        let or = registry.instantiate(&RuleStash::Or(vec![
            RuleStash::Type(ElementType::Socket),
            RuleStash::Tag("grip".into()),
        ]));
        let hand = ElementKey::bone("hand");
        let root = ElementKey::bone("root");
        assert!(and.resolve(&hand, &input(&graph, &redirector)).is_valid());
        assert_eq!(
            and.resolve(&root, &input(&graph, &redirector)).message,
            "Element 'root' does not contain tag 'grip'."
        );
        assert!(or.resolve(&hand, &input(&graph, &redirector)).is_valid());
        assert!(!or.resolve(&root, &input(&graph, &redirector)).is_valid());
        assert!(!registry
            .instantiate(&RuleStash::Or(Vec::new()))
            .resolve(&root, &input(&graph, &redirector))
            .is_valid());
    }

    #[test]
    fn unknown_custom_rules_reject_everything() {
        let graph = graph();
        let redirector = ElementKeyRedirector::new();
        let rule = RuleRegistry::new().instantiate(&RuleStash::Custom {
            name: "NearestToMirror".into(),
            args: BTreeMap::new(),
        });
        let verdict = rule.resolve(&ElementKey::bone("hand"), &input(&graph, &redirector));
        assert_eq!(verdict.message, "Unknown connection rule 'NearestToMirror'.");
    }

    fn tagged_anything(args: &BTreeMap<String, String>) -> Box<dyn ConnectionRule> {
        Box::new(TagRule {
            tag: args.get("tag").cloned().unwrap_or_default(),
        })
    }

    #[test]
    fn registered_custom_rules_receive_arguments() {
        let graph = graph();
        let redirector = ElementKeyRedirector::new();
        let mut registry = RuleRegistry::new();
        registry.register("Tagged", tagged_anything);
        let rule = registry.instantiate(&RuleStash::Custom {
            name: "Tagged".into(),
            args: [("tag".to_owned(), "grip".to_owned())].into_iter().collect(),
        });
        assert!(rule.resolve(&ElementKey::bone("hand"), &input(&graph, &redirector)).is_valid());
        assert!(!rule.resolve(&ElementKey::bone("root"), &input(&graph, &redirector)).is_valid());
    }

    #[test]
    fn child_of_primary_without_module_reports_missing_primary() {
        let graph = graph();
        let redirector = ElementKeyRedirector::new();
        let verdict = ChildOfPrimaryRule.resolve(&ElementKey::bone("hand"), &input(&graph, &redirector));
        assert_eq!(verdict.message, "No primary connector found for module ''.");
    }
}
