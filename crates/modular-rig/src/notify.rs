// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Change notifications emitted by the module controller.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ModuleReference;

/// Kind of structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModularRigNotification {
    /// A module was added.
    ModuleAdded,
    /// A module was renamed.
    ModuleRenamed,
    /// A module was removed.
    ModuleRemoved,
    /// A module moved under a new parent.
    ModuleReparented,
    /// The connection table changed.
    ConnectionChanged,
    /// A config value or binding of a module changed.
    ModuleConfigValueChanged,
    /// The display name of a module changed.
    ModuleShortNameChanged,
    /// The outermost interaction bracket opened.
    InteractionBracketOpened,
    /// The outermost interaction bracket closed.
    InteractionBracketClosed,
    /// The outermost interaction bracket was canceled.
    InteractionBracketCanceled,
    /// The class of a module was swapped.
    ModuleClassChanged,
    /// A module was selected.
    ModuleSelected,
    /// A module was deselected.
    ModuleDeselected,
}

impl ModularRigNotification {
    /// Every notification kind.
    pub const ALL: [Self; 13] = [
        Self::ModuleAdded,
        Self::ModuleRenamed,
        Self::ModuleRemoved,
        Self::ModuleReparented,
        Self::ConnectionChanged,
        Self::ModuleConfigValueChanged,
        Self::ModuleShortNameChanged,
        Self::InteractionBracketOpened,
        Self::InteractionBracketClosed,
        Self::InteractionBracketCanceled,
        Self::ModuleClassChanged,
        Self::ModuleSelected,
        Self::ModuleDeselected,
    ];

    /// True for the three bracket notifications.
    pub const fn is_bracket(self) -> bool {
        matches!(
            self,
            Self::InteractionBracketOpened
                | Self::InteractionBracketClosed
                | Self::InteractionBracketCanceled
        )
    }
}

/// Identifies a subscription for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(ModularRigNotification, Option<&ModuleReference>)>;

/// Multicast `on_modified` callback list.
#[derive(Default)]
pub struct ModifiedEvent {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl fmt::Debug for ModifiedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifiedEvent")
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl ModifiedEvent {
    /// Creates an event with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener; listeners run in subscription order.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(ModularRigNotification, Option<&ModuleReference>) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener; returns `false` when it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(candidate, _)| *candidate != id);
        self.listeners.len() != before
    }

    /// Number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True when nobody listens.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Invokes every listener.
    pub fn broadcast(&mut self, kind: ModularRigNotification, module: Option<&ModuleReference>) {
        for (_, listener) in &mut self.listeners {
            listener(kind, module);
        }
    }
}
