// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Connector declarations stored on connector elements.
use std::collections::BTreeMap;

use crate::key::ElementType;

/// Canonical 32-byte digest.
pub type Hash = [u8; 32];

/// Role a connector plays in its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectorKind {
    /// Anchors the module; resolving it positions the module in the tree.
    #[default]
    Primary,
    /// Required binding, resolved relative to the primary.
    Secondary,
    /// Binding that may stay unresolved.
    Optional,
}

impl ConnectorKind {
    /// True for the primary connector.
    pub const fn is_primary(self) -> bool {
        matches!(self, Self::Primary)
    }

    /// True for every non-primary connector, optional ones included.
    pub const fn is_secondary(self) -> bool {
        !self.is_primary()
    }

    /// True for optional connectors.
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::Optional)
    }

    const fn tag(self) -> u8 {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
            Self::Optional => 2,
        }
    }
}

/// Serializable description of a connection rule.
///
/// Stashes are data; the modular-rig rule registry instantiates them into
/// executable rules at resolve time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RuleStash {
    /// Every child rule must accept the candidate.
    And(Vec<RuleStash>),
    /// At least one child rule must accept the candidate.
    Or(Vec<RuleStash>),
    /// Candidate must be of the given type.
    Type(ElementType),
    /// Candidate must carry the given tag.
    Tag(String),
    /// Candidate must sit below the module's resolved primary target.
    ChildOfPrimary,
    /// Rule registered under `name` by the host, with free-form arguments.
    Custom {
        /// Registry name of the rule factory.
        name: String,
        /// Arguments handed to the factory.
        args: BTreeMap<String, String>,
    },
}

impl RuleStash {
    fn feed(&self, hasher: &mut blake3::Hasher) {
        match self {
            Self::And(children) | Self::Or(children) => {
                hasher.update(&[u8::from(matches!(self, Self::Or(_)))]);
                hasher.update(&(children.len() as u64).to_le_bytes());
                for child in children {
                    child.feed(hasher);
                }
            }
            Self::Type(ty) => {
                hasher.update(&[2, *ty as u8]);
            }
            Self::Tag(tag) => {
                hasher.update(&[3]);
                feed_str(hasher, tag);
            }
            Self::ChildOfPrimary => {
                hasher.update(&[4]);
            }
            Self::Custom { name, args } => {
                hasher.update(&[5]);
                feed_str(hasher, name);
                hasher.update(&(args.len() as u64).to_le_bytes());
                for (key, value) in args {
                    feed_str(hasher, key);
                    feed_str(hasher, value);
                }
            }
        }
    }
}

pub(crate) fn feed_str(hasher: &mut blake3::Hasher, text: &str) {
    hasher.update(&(text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
}

/// Settings carried by a connector element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectorSettings {
    /// Human-readable description.
    pub description: String,
    /// Primary, secondary or optional.
    pub kind: ConnectorKind,
    /// Rules applied in declared order while resolving.
    pub rules: Vec<RuleStash>,
}

impl ConnectorSettings {
    /// Settings for a connector of `kind` without rules.
    pub fn new(kind: ConnectorKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Appends a rule.
    pub fn with_rule(mut self, rule: RuleStash) -> Self {
        self.rules.push(rule);
        self
    }

    /// Stable digest of kind and rules.
    ///
    /// Two declarations with equal hashes resolve identically.
    pub fn rules_hash(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"connector-rules:");
        hasher.update(&[self.kind.tag()]);
        hasher.update(&(self.rules.len() as u64).to_le_bytes());
        for rule in &self.rules {
            rule.feed(&mut hasher);
        }
        hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_counts_as_secondary() {
        assert!(ConnectorKind::Optional.is_secondary());
        assert!(ConnectorKind::Secondary.is_secondary());
        assert!(!ConnectorKind::Primary.is_secondary());
        assert!(ConnectorKind::Optional.is_optional());
    }

    #[test]
    fn rules_hash_tracks_rule_order() {
        let a = ConnectorSettings::new(ConnectorKind::Secondary)
            .with_rule(RuleStash::Type(ElementType::Socket))
            .with_rule(RuleStash::Tag("hand".into()));
        let b = ConnectorSettings::new(ConnectorKind::Secondary)
            .with_rule(RuleStash::Tag("hand".into()))
            .with_rule(RuleStash::Type(ElementType::Socket));
        assert_eq!(a.rules_hash(), a.clone().rules_hash());
        assert_ne!(a.rules_hash(), b.rules_hash());
    }

    #[test]
    fn rules_hash_tracks_kind() {
        let primary = ConnectorSettings::new(ConnectorKind::Primary);
        let optional = ConnectorSettings::new(ConnectorKind::Optional);
        assert_ne!(primary.rules_hash(), optional.rules_hash());
    }
}
