// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Element records stored by a hierarchy.
use std::collections::BTreeSet;

use crate::connector::ConnectorSettings;
use crate::key::{ElementKey, ElementType};

/// A single hierarchy element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RigElement {
    /// Identity of the element.
    pub key: ElementKey,
    /// Parents in priority order; the first one is the primary parent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub parents: Vec<ElementKey>,
    /// Free-form tags queried by tag rules.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: BTreeSet<String>,
    /// Module that spawned the element, when known.
    ///
    /// Takes precedence over the namespace encoded in the name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub module_path: Option<String>,
    /// Connector declaration; present only on connector elements.
    #[cfg_attr(feature = "serde", serde(default))]
    pub connector: Option<ConnectorSettings>,
}

impl RigElement {
    /// Creates a parentless element.
    pub fn new(key: ElementKey) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    /// Adds a parent.
    pub fn with_parent(mut self, parent: ElementKey) -> Self {
        self.parents.push(parent);
        self
    }

    /// Adds a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Element type shortcut.
    pub fn ty(&self) -> ElementType {
        self.key.ty
    }

    /// Primary parent, if any.
    pub fn first_parent(&self) -> Option<&ElementKey> {
        self.parents.first()
    }
}
