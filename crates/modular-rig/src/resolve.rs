// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-candidate and per-connector resolve results.
use rig_hierarchy::ElementKey;
use serde::{Deserialize, Serialize};

/// Verdict on a single candidate element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ElementResolveState {
    /// Not evaluated.
    #[default]
    Unknown,
    /// Rejected; the result message says why.
    InvalidTarget,
    /// Acceptable target.
    PossibleTarget,
    /// Acceptable target preferred over the others.
    DefaultTarget,
}

/// A candidate element and its verdict.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ElementResolveResult {
    /// Candidate element.
    pub key: ElementKey,
    /// Verdict.
    pub state: ElementResolveState,
    /// Reason for rejection; empty for valid targets.
    pub message: String,
}

impl ElementResolveResult {
    /// A candidate tagged as a possible target.
    pub fn possible(key: ElementKey) -> Self {
        Self {
            key,
            state: ElementResolveState::PossibleTarget,
            message: String::new(),
        }
    }

    /// A candidate tagged as the default target.
    pub fn default_target(key: ElementKey) -> Self {
        Self {
            key,
            state: ElementResolveState::DefaultTarget,
            message: String::new(),
        }
    }

    /// A rejected candidate.
    pub fn invalid(key: ElementKey, message: impl Into<String>) -> Self {
        Self {
            key,
            state: ElementResolveState::InvalidTarget,
            message: message.into(),
        }
    }

    /// True for possible and default targets.
    pub fn is_valid(&self) -> bool {
        matches!(
            self.state,
            ElementResolveState::PossibleTarget | ElementResolveState::DefaultTarget
        )
    }

    /// Rejects the candidate.
    pub fn set_invalid_target(&mut self, message: impl Into<String>) {
        self.state = ElementResolveState::InvalidTarget;
        self.message = message.into();
    }

    /// Accepts the candidate.
    pub fn set_possible_target(&mut self) {
        self.state = ElementResolveState::PossibleTarget;
        self.message.clear();
    }

    /// Accepts the candidate as preferred target.
    pub fn set_default_target(&mut self) {
        self.state = ElementResolveState::DefaultTarget;
        self.message.clear();
    }
}

/// Outcome of a resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModularRigResolveState {
    /// At least one match survived.
    #[default]
    Success,
    /// No match, or the connector could not be resolved at all.
    Error,
}

/// Ordered matches and exclusions for one connector.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModularRigResolveResult {
    /// Connector being resolved.
    pub connector: ElementKey,
    /// Valid candidates; a default target, if any, comes first.
    pub matches: Vec<ElementResolveResult>,
    /// Rejected candidates, in the order they were rejected.
    pub excluded: Vec<ElementResolveResult>,
    /// Overall state.
    pub state: ModularRigResolveState,
    /// Diagnostic for the whole call.
    pub message: String,
}

impl ModularRigResolveResult {
    /// An empty, successful result for `connector`.
    pub fn new(connector: ElementKey) -> Self {
        Self {
            connector,
            ..Self::default()
        }
    }

    /// Marks the result as failed with `message`.
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.state = ModularRigResolveState::Error;
        self.message = message.into();
        self
    }

    /// True on success with at least one match.
    pub fn is_valid(&self) -> bool {
        self.state == ModularRigResolveState::Success && !self.matches.is_empty()
    }

    /// Looks a match up by key.
    pub fn find_match(&self, key: &ElementKey) -> Option<&ElementResolveResult> {
        self.matches.iter().find(|m| &m.key == key)
    }

    /// Checks that `key` is a match; the error is the exclusion reason.
    pub fn contains_match(&self, key: &ElementKey) -> Result<(), String> {
        if self.find_match(key).is_some() {
            return Ok(());
        }
        Err(self
            .excluded
            .iter()
            .find(|e| &e.key == key)
            .map_or_else(
                || format!("Target '{}' is not a possible match.", key.name),
                |e| e.message.clone(),
            ))
    }

    /// The first match tagged as default target.
    pub fn default_match(&self) -> Option<&ElementResolveResult> {
        self.matches
            .iter()
            .find(|m| m.state == ElementResolveState::DefaultTarget)
    }

    /// Keys of all matches in order.
    pub fn match_keys(&self) -> Vec<ElementKey> {
        self.matches.iter().map(|m| m.key.clone()).collect()
    }

    /// Keys of all exclusions in order.
    pub fn excluded_keys(&self) -> Vec<ElementKey> {
        self.excluded.iter().map(|m| m.key.clone()).collect()
    }
}
