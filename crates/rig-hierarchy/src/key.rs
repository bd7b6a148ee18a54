// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Element identity: the `(name, type)` pair every hierarchy lookup is keyed by.
use std::fmt;

/// Kind of element stored in a rig hierarchy.
///
/// The discriminant order is the canonical sort order used by digests and
/// ordered maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementType {
    /// Skeletal bone.
    #[default]
    Bone,
    /// Transform-only helper.
    Null,
    /// Animator-facing control.
    Control,
    /// Scalar curve channel. Never a valid connection target.
    Curve,
    /// Module connector. Never a valid connection target.
    Connector,
    /// Attachment point published for other modules.
    Socket,
    /// Physics body.
    Physics,
    /// Reference to an external transform.
    Reference,
}

impl ElementType {
    /// Every element type, in canonical order.
    pub const ALL: [Self; 8] = [
        Self::Bone,
        Self::Null,
        Self::Control,
        Self::Curve,
        Self::Connector,
        Self::Socket,
        Self::Physics,
        Self::Reference,
    ];

    /// Stable display name of the type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bone => "Bone",
            Self::Null => "Null",
            Self::Control => "Control",
            Self::Curve => "Curve",
            Self::Connector => "Connector",
            Self::Socket => "Socket",
            Self::Physics => "Physics",
            Self::Reference => "Reference",
        }
    }

    /// Parses a type name case-insensitively.
    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(text.trim()))
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a hierarchy element.
///
/// Keys are compared byte-for-byte on the name; the `(name, ty)` pair is unique
/// within a single hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementKey {
    /// Fully qualified element name, including any module namespace.
    pub name: String,
    /// Element type.
    pub ty: ElementType,
}

impl ElementKey {
    /// Creates a key from a name and a type.
    pub fn new(name: impl Into<String>, ty: ElementType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// Shorthand for a bone key.
    pub fn bone(name: impl Into<String>) -> Self {
        Self::new(name, ElementType::Bone)
    }

    /// Shorthand for a connector key.
    pub fn connector(name: impl Into<String>) -> Self {
        Self::new(name, ElementType::Connector)
    }

    /// Shorthand for a socket key.
    pub fn socket(name: impl Into<String>) -> Self {
        Self::new(name, ElementType::Socket)
    }

    /// A key is valid when it carries a name.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.ty, self.name)
    }
}
