// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Connector resolver.
//!
//! Every entry point funnels into one [`ResolveWork`] item that runs the pass
//! sequence: seed every hierarchy element, drop incompatible types, drop the
//! connector's own and deeper namespaces, run the declared rules in order,
//! then let the owning rig's connector event prune and reorder. Resolution
//! never mutates the model; the only side effect is an on-demand construction
//! of a stale host.
use rig_hierarchy::name::{eq_ignore_case, starts_with_ignore_case};
use rig_hierarchy::{
    ConnectorKind, ElementKey, ElementKeyRedirector, ElementType, Hierarchy, RuleStash,
};
use tracing::debug;

use crate::class::ModuleConnector;
use crate::resolve::{
    ElementResolveResult, ElementResolveState, ModularRigResolveResult, ModularRigResolveState,
};
use crate::rig::{ModuleInstance, RigHost};
use crate::rules::{RuleInput, RuleRegistry};

/// Computes valid connection targets for connectors.
#[derive(Debug, Clone, Default)]
pub struct RuleManager {
    registry: RuleRegistry,
}

/// Per-call state shared by the passes.
struct ResolveWork<'a> {
    hierarchy: &'a dyn Hierarchy,
    result: ModularRigResolveResult,
}

impl<'a> ResolveWork<'a> {
    fn new(hierarchy: &'a dyn Hierarchy, connector: ElementKey) -> Self {
        Self {
            hierarchy,
            result: ModularRigResolveResult::new(connector),
        }
    }

    fn seed(&mut self) {
        let matches = &mut self.result.matches;
        self.hierarchy.traverse(&mut |element| {
            matches.push(ElementResolveResult::possible(element.key.clone()));
            true
        });
    }

    /// Moves every match `reject` has a message for into `excluded`.
    fn filter(&mut self, mut reject: impl FnMut(&ElementKey) -> Option<String>) {
        let mut kept = Vec::with_capacity(self.result.matches.len());
        for mut candidate in std::mem::take(&mut self.result.matches) {
            match reject(&candidate.key) {
                Some(message) => {
                    candidate.set_invalid_target(message);
                    self.result.excluded.push(candidate);
                }
                None => kept.push(candidate),
            }
        }
        self.result.matches = kept;
    }

    /// Moves matches that are no longer valid into `excluded`.
    fn partition_invalid(&mut self) {
        let (kept, rejected): (Vec<_>, Vec<_>) = std::mem::take(&mut self.result.matches)
            .into_iter()
            .partition(ElementResolveResult::is_valid);
        self.result.matches = kept;
        self.result.excluded.extend(rejected);
    }

    fn filter_incompatible_types(&mut self) {
        self.filter(|key| match key.ty {
            ElementType::Curve => Some("Cannot connect to curves.".to_owned()),
            ElementType::Connector => Some("Cannot connect to connectors.".to_owned()),
            _ => None,
        });
    }

    fn filter_invalid_namespaces(&mut self) {
        let Some(own) = self.hierarchy.namespace(&self.result.connector) else {
            return;
        };
        let hierarchy = self.hierarchy;
        self.filter(|key| {
            let namespace = hierarchy.namespace(key)?;
            if eq_ignore_case(&namespace, &own) {
                Some("Cannot connect within the same namespace.".to_owned())
            } else if starts_with_ignore_case(&namespace, &own) {
                Some("Cannot connect to element below the connector's namespace.".to_owned())
            } else {
                None
            }
        });
    }

    fn filter_by_rules(&mut self, registry: &RuleRegistry, rules: &[RuleStash], input: &RuleInput<'_>) {
        for stash in rules {
            let rule = registry.instantiate(stash);
            for candidate in &mut self.result.matches {
                *candidate = rule.resolve(&candidate.key, input);
            }
            self.partition_invalid();
        }
    }

    fn promote_default(&mut self) {
        let matches = &mut self.result.matches;
        if let Some(index) = matches
            .iter()
            .position(|m| m.state == ElementResolveState::DefaultTarget)
        {
            let preferred = matches.remove(index);
            matches.insert(0, preferred);
        }
    }

    fn finish(mut self) -> ModularRigResolveResult {
        if self.result.matches.is_empty() {
            self.result.state = ModularRigResolveState::Error;
            if self.result.message.is_empty() {
                "No valid targets found.".clone_into(&mut self.result.message);
            }
        }
        debug!(
            connector = %self.result.connector.name,
            matches = self.result.matches.len(),
            excluded = self.result.excluded.len(),
            "resolved connector"
        );
        self.result
    }
}

fn missing_hierarchy(connector: ElementKey) -> ModularRigResolveResult {
    ModularRigResolveResult::new(connector).fail("The rule manager is missing the hierarchy.")
}

impl RuleManager {
    /// Resolver with the builtin rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver using `registry` to instantiate rules.
    pub fn with_registry(registry: RuleRegistry) -> Self {
        Self { registry }
    }

    /// Rule registry.
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Rule registry, for registering custom rules.
    pub fn registry_mut(&mut self) -> &mut RuleRegistry {
        &mut self.registry
    }

    /// Resolves a live connector element.
    ///
    /// `module_path` names the owning module; when `None` it is taken from the
    /// connector's metadata. `redirector` defaults to the host's.
    pub fn find_matches<H: RigHost + ?Sized>(
        &self,
        host: &mut H,
        connector: &ElementKey,
        module_path: Option<&str>,
        redirector: Option<&ElementKeyRedirector>,
    ) -> ModularRigResolveResult {
        if host.hierarchy().is_none() {
            return missing_hierarchy(connector.clone());
        }
        if host.is_construction_required() {
            host.run_construction();
        }
        let host: &H = host;
        let Some(hierarchy) = host.hierarchy() else {
            return missing_hierarchy(connector.clone());
        };
        let Some(settings) = hierarchy.connector_settings(connector) else {
            return ModularRigResolveResult::new(connector.clone()).fail(format!(
                "Connector '{}' not found in the hierarchy.",
                connector.name
            ));
        };
        let empty = ElementKeyRedirector::new();
        let redirector = redirector.or_else(|| host.redirector()).unwrap_or(&empty);
        let module_path = module_path
            .map(str::to_owned)
            .or_else(|| hierarchy.module_path(connector));
        let module: Option<&ModuleInstance> = module_path
            .as_deref()
            .and_then(|path| host.find_module_instance(path));

        let mut work = ResolveWork::new(hierarchy, connector.clone());
        work.seed();
        work.filter_incompatible_types();
        work.filter_invalid_namespaces();
        let input = RuleInput {
            hierarchy,
            module,
            redirector,
        };
        work.filter_by_rules(&self.registry, &settings.rules, &input);
        if let Some(module) = module {
            if host.execute_connector_event(connector, module, redirector, &mut work.result.matches)
            {
                work.partition_invalid();
                work.promote_default();
            }
        }
        work.finish()
    }

    /// Resolves a bare connector declaration, before any module instance exists.
    ///
    /// The namespace pass and the connector event do not run.
    pub fn find_matches_for_declaration<H: RigHost + ?Sized>(
        &self,
        host: &mut H,
        declaration: &ModuleConnector,
    ) -> ModularRigResolveResult {
        let connector = ElementKey::connector(declaration.name.clone());
        if host.hierarchy().is_none() {
            return missing_hierarchy(connector);
        }
        if host.is_construction_required() {
            host.run_construction();
        }
        let host: &H = host;
        let Some(hierarchy) = host.hierarchy() else {
            return missing_hierarchy(connector);
        };
        let empty = ElementKeyRedirector::new();
        let input = RuleInput {
            hierarchy,
            module: None,
            redirector: host.redirector().unwrap_or(&empty),
        };
        let mut work = ResolveWork::new(hierarchy, connector);
        work.seed();
        work.filter_incompatible_types();
        work.filter_by_rules(&self.registry, &declaration.rules, &input);
        work.finish()
    }

    /// Resolves the primary connector of the module at `module_path`.
    ///
    /// Runs against an empty redirector: nothing is resolved before the primary.
    pub fn find_matches_for_primary_connector<H: RigHost + ?Sized>(
        &self,
        host: &mut H,
        module_path: &str,
    ) -> ModularRigResolveResult {
        if host.is_construction_required() {
            host.run_construction();
        }
        let primary = match host.find_module_instance(module_path) {
            None => Err(format!("Module '{module_path}' not found.")),
            Some(module) => module.primary_connector_key().ok_or_else(|| {
                format!("No primary connector found for module '{module_path}'.")
            }),
        };
        match primary {
            Ok(primary) => {
                let empty = ElementKeyRedirector::new();
                self.find_matches(host, &primary, Some(module_path), Some(&empty))
            }
            Err(message) => ModularRigResolveResult::default().fail(message),
        }
    }

    /// Resolves every secondary (required) connector of a module, one result each.
    pub fn find_matches_for_secondary_connectors<H: RigHost + ?Sized>(
        &self,
        host: &mut H,
        module_path: &str,
    ) -> Vec<ModularRigResolveResult> {
        self.find_matches_for_kind(host, module_path, ConnectorKind::Secondary)
    }

    /// Resolves every optional connector of a module, one result each.
    pub fn find_matches_for_optional_connectors<H: RigHost + ?Sized>(
        &self,
        host: &mut H,
        module_path: &str,
    ) -> Vec<ModularRigResolveResult> {
        self.find_matches_for_kind(host, module_path, ConnectorKind::Optional)
    }

    fn find_matches_for_kind<H: RigHost + ?Sized>(
        &self,
        host: &mut H,
        module_path: &str,
        kind: ConnectorKind,
    ) -> Vec<ModularRigResolveResult> {
        if host.is_construction_required() {
            host.run_construction();
        }
        let Some(namespace) = host.find_module_instance(module_path).map(ModuleInstance::namespace)
        else {
            return Vec::new();
        };
        let connectors: Vec<ElementKey> = host
            .hierarchy()
            .map(|hierarchy| {
                hierarchy
                    .connectors()
                    .into_iter()
                    .filter(|key| {
                        hierarchy
                            .connector_settings(key)
                            .is_some_and(|s| s.kind == kind)
                            && hierarchy
                                .namespace(key)
                                .is_some_and(|ns| eq_ignore_case(&ns, &namespace))
                    })
                    .collect()
            })
            .unwrap_or_default();
        connectors
            .iter()
            .map(|connector| self.find_matches(host, connector, Some(module_path), None))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_hierarchy::{ConnectorSettings, ElementGraph};

    fn graph() -> ElementGraph {
        let mut graph = ElementGraph::new();
        let root = graph.add_bone("root", None).unwrap();
        let spine = graph.add_bone("spine", Some(&root)).unwrap();
        graph.add_socket("neck", Some(&spine)).unwrap();
        graph.add_curve("blink").unwrap();
        graph
            .add_connector(
                "Head:Root",
                ConnectorSettings::new(ConnectorKind::Primary),
                Some("Head"),
            )
            .unwrap();
        graph.add_bone("Head:jaw", Some(&spine)).unwrap();
        graph
    }

    #[test]
    fn passes_run_in_order_and_record_reasons() {
        let mut graph = graph();
        let result = RuleManager::new().find_matches(
            &mut graph,
            &ElementKey::connector("Head:Root"),
            None,
            None,
        );
        assert!(result.is_valid());
        assert_eq!(
            result.match_keys(),
            vec![
                ElementKey::bone("root"),
                ElementKey::bone("spine"),
                ElementKey::socket("neck"),
            ]
        );
        let reasons: Vec<&str> = result.excluded.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(
            reasons,
            vec![
                "Cannot connect to curves.",
                "Cannot connect to connectors.",
                "Cannot connect within the same namespace.",
            ]
        );
    }

    #[test]
    fn declarations_skip_the_namespace_pass() {
        let mut graph = graph();
        let declaration =
            ModuleConnector::primary("Root").with_rule(RuleStash::Type(ElementType::Bone));
        let result = RuleManager::new().find_matches_for_declaration(&mut graph, &declaration);
        assert!(result.match_keys().contains(&ElementKey::bone("Head:jaw")));
        assert!(!result.match_keys().contains(&ElementKey::socket("neck")));
    }

    #[test]
    fn missing_connector_is_an_error_state() {
        let mut graph = graph();
        let result =
            RuleManager::new().find_matches(&mut graph, &ElementKey::connector("Nope:Root"), None, None);
        assert_eq!(result.state, ModularRigResolveState::Error);
        assert_eq!(result.message, "Connector 'Nope:Root' not found in the hierarchy.");
    }

    #[test]
    fn emptied_matches_report_no_valid_targets() {
        let mut graph = graph();
        let declaration =
            ModuleConnector::primary("Root").with_rule(RuleStash::Type(ElementType::Physics));
        let result = RuleManager::new().find_matches_for_declaration(&mut graph, &declaration);
        assert!(!result.is_valid());
        assert_eq!(result.message, "No valid targets found.");
    }

    #[test]
    fn bare_graphs_have_no_modules() {
        let mut graph = graph();
        let result = RuleManager::new().find_matches_for_primary_connector(&mut graph, "Head");
        assert_eq!(result.message, "Module 'Head' not found.");
        assert!(RuleManager::new()
            .find_matches_for_secondary_connectors(&mut graph, "Head")
            .is_empty());
    }
}
