// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Recorder for controller change notifications.

use std::cell::RefCell;
use std::rc::Rc;

use modular_rig::{ModularRigController, ModularRigNotification, SubscriptionId};

/// Shared log of `(kind, module path)` pairs received by a controller listener.
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    entries: Rc<RefCell<Vec<(ModularRigNotification, Option<String>)>>>,
}

impl NotificationLog {
    /// Subscribes a fresh log to `controller`.
    pub fn attach(controller: &mut ModularRigController) -> (Self, SubscriptionId) {
        let log = Self::default();
        let sink = Rc::clone(&log.entries);
        let id = controller.on_modified(move |kind, module| {
            sink.borrow_mut()
                .push((kind, module.map(modular_rig::ModuleReference::path)));
        });
        (log, id)
    }

    /// Every entry so far.
    pub fn entries(&self) -> Vec<(ModularRigNotification, Option<String>)> {
        self.entries.borrow().clone()
    }

    /// Notification kinds so far.
    pub fn kinds(&self) -> Vec<ModularRigNotification> {
        self.entries.borrow().iter().map(|(kind, _)| *kind).collect()
    }

    /// Number of entries of `kind`.
    pub fn count(&self, kind: ModularRigNotification) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|(seen, _)| *seen == kind)
            .count()
    }

    /// Paths reported with `kind`, in order.
    pub fn paths(&self, kind: ModularRigNotification) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|(seen, _)| *seen == kind)
            .filter_map(|(_, path)| path.clone())
            .collect()
    }

    /// Forgets every entry.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
