// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Read-only query interface over a rig hierarchy.
//!
//! The resolver and the connection rules only ever see a hierarchy through this
//! trait. Implementors supply lookup, roots and children; every derived query
//! (traversal, namespaces, ancestry) has a default built on top of those.
use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::connector::ConnectorSettings;
use crate::element::RigElement;
use crate::key::{ElementKey, ElementType};
use crate::name::{module_path_of_name, namespace_of_name, namespace_of_path};

/// Queryable graph of keyed elements.
pub trait Hierarchy {
    /// Looks an element up by key.
    fn find(&self, key: &ElementKey) -> Option<&RigElement>;

    /// Iterates every element in insertion order.
    fn elements(&self) -> Box<dyn Iterator<Item = &RigElement> + '_>;

    /// Elements without parents, in insertion order.
    fn roots(&self) -> Vec<ElementKey>;

    /// Direct children of `key`, in insertion order.
    fn children(&self, key: &ElementKey) -> Vec<ElementKey>;

    /// True when the element exists.
    fn contains(&self, key: &ElementKey) -> bool {
        self.find(key).is_some()
    }

    /// Parents of `key` in priority order.
    fn parents(&self, key: &ElementKey) -> Vec<ElementKey> {
        self.find(key)
            .map(|element| element.parents.clone())
            .unwrap_or_default()
    }

    /// Primary parent of `key`.
    fn first_parent(&self, key: &ElementKey) -> Option<ElementKey> {
        self.find(key)
            .and_then(|element| element.first_parent().cloned())
    }

    /// Keys of every element of type `ty`, in insertion order.
    fn keys_of_type(&self, ty: ElementType) -> Vec<ElementKey> {
        self.elements()
            .filter(|element| element.key.ty == ty)
            .map(|element| element.key.clone())
            .collect()
    }

    /// Depth-first pre-order walk from the roots.
    ///
    /// Every element is visited once even when it is reachable through several
    /// parents. The walk stops early when `visit` returns `false`.
    fn traverse(&self, visit: &mut dyn FnMut(&RigElement) -> bool) {
        let mut visited: FxHashSet<ElementKey> = FxHashSet::default();
        let mut stack: Vec<ElementKey> = self.roots().into_iter().rev().collect();
        while let Some(key) = stack.pop() {
            if !visited.insert(key.clone()) {
                continue;
            }
            let Some(element) = self.find(&key) else {
                continue;
            };
            if !visit(element) {
                return;
            }
            stack.extend(self.children(&key).into_iter().rev());
        }
    }

    /// Module path of an element: metadata first, then the name's namespace.
    fn module_path(&self, key: &ElementKey) -> Option<String> {
        if let Some(path) = self.find(key).and_then(|e| e.module_path.as_ref()) {
            return Some(path.clone());
        }
        module_path_of_name(&key.name).map(str::to_owned)
    }

    /// Namespace of an element, including the trailing separator.
    fn namespace(&self, key: &ElementKey) -> Option<String> {
        if let Some(path) = self.find(key).and_then(|e| e.module_path.as_ref()) {
            return Some(namespace_of_path(path));
        }
        namespace_of_name(&key.name).map(str::to_owned)
    }

    /// True when the element carries `tag`.
    fn has_tag(&self, key: &ElementKey, tag: &str) -> bool {
        self.find(key)
            .is_some_and(|element| element.tags.contains(tag))
    }

    /// True when `parent` is a (transitive) parent of `child`.
    ///
    /// An element is never parented to itself.
    fn is_parented_to(&self, child: &ElementKey, parent: &ElementKey) -> bool {
        if child == parent {
            return false;
        }
        let mut seen: FxHashSet<ElementKey> = FxHashSet::default();
        let mut queue: VecDeque<ElementKey> = self.parents(child).into();
        while let Some(current) = queue.pop_front() {
            if &current == parent {
                return true;
            }
            if seen.insert(current.clone()) {
                queue.extend(self.parents(&current));
            }
        }
        false
    }

    /// Connector settings of a connector element.
    fn connector_settings(&self, key: &ElementKey) -> Option<&ConnectorSettings> {
        self.find(key).and_then(|element| element.connector.as_ref())
    }

    /// Keys of every connector element, in insertion order.
    fn connectors(&self) -> Vec<ElementKey> {
        self.keys_of_type(ElementType::Connector)
    }
}
