// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Lookup table of already-resolved connector targets.
use std::collections::BTreeMap;

use crate::key::ElementKey;

/// Maps connector keys to the element each one currently resolves to.
///
/// Connection rules consult the redirector to find targets resolved earlier
/// (e.g. the module's primary target).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementKeyRedirector {
    targets: BTreeMap<ElementKey, ElementKey>,
}

impl ElementKeyRedirector {
    /// Creates an empty redirector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved target of `connector`.
    pub fn find(&self, connector: &ElementKey) -> Option<&ElementKey> {
        self.targets.get(connector)
    }

    /// Records (or replaces) the target of `connector`.
    pub fn insert(&mut self, connector: ElementKey, target: ElementKey) {
        self.targets.insert(connector, target);
    }

    /// Number of redirected connectors.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// True when nothing is redirected.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Iterates `(connector, target)` pairs ordered by connector key.
    pub fn iter(&self) -> impl Iterator<Item = (&ElementKey, &ElementKey)> {
        self.targets.iter()
    }
}

impl FromIterator<(ElementKey, ElementKey)> for ElementKeyRedirector {
    fn from_iter<I: IntoIterator<Item = (ElementKey, ElementKey)>>(iter: I) -> Self {
        Self {
            targets: iter.into_iter().collect(),
        }
    }
}
