// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Name availability, safe names and display (short) names.
use std::collections::BTreeMap;

use rig_hierarchy::name::eq_ignore_case;
use rig_hierarchy::{join_namespace, sanitize_name, split_namespace};

use super::{ControllerError, ModularRigController};
use crate::notify::ModularRigNotification;

const FALLBACK_NAME: &str = "Module";

impl ModularRigController {
    /// Checks that `name` is a sanitized name no sibling under `parent_path`
    /// uses (compared case-insensitively).
    pub fn is_name_available(&self, parent_path: &str, name: &str) -> Result<(), ControllerError> {
        if name.is_empty() {
            return Err(ControllerError::EmptyName);
        }
        if sanitize_name(name, false) != name {
            return Err(ControllerError::InvalidName);
        }
        if self
            .model
            .children(parent_path)
            .iter()
            .any(|sibling| eq_ignore_case(&sibling.name, name))
        {
            return Err(ControllerError::NameInUse);
        }
        Ok(())
    }

    /// Sanitized `desired`, suffixed `_1`, `_2`, ... until no sibling clashes.
    pub fn safe_new_name(&self, parent_path: &str, desired: &str) -> String {
        let mut base = sanitize_name(desired, false);
        if base.is_empty() {
            base = FALLBACK_NAME.to_owned();
        }
        let mut name = base.clone();
        let mut suffix = 0_usize;
        while self.is_name_available(parent_path, &name).is_err() {
            suffix += 1;
            name = format!("{base}_{suffix}");
        }
        name
    }

    /// Checks that `short_name` is sanitized and no module displays it.
    pub fn is_short_name_available(&self, short_name: &str) -> Result<(), ControllerError> {
        if short_name.is_empty() || sanitize_name(short_name, false) != short_name {
            return Err(ControllerError::InvalidShortName);
        }
        if self
            .model
            .modules()
            .iter()
            .any(|m| m.short_name == short_name)
        {
            return Err(ControllerError::NameInUse);
        }
        Ok(())
    }

    /// Sanitized `desired`, suffixed until no module displays it.
    pub fn safe_new_short_name(&self, desired: &str) -> String {
        let mut base = sanitize_name(desired, false);
        if base.is_empty() {
            base = FALLBACK_NAME.to_owned();
        }
        let mut name = base.clone();
        let mut suffix = 0_usize;
        while self.is_short_name_available(&name).is_err() {
            suffix += 1;
            name = format!("{base}_{suffix}");
        }
        name
    }

    /// Checks a short-name change without applying it.
    pub fn can_set_module_short_name(
        &self,
        path: &str,
        short_name: &str,
    ) -> Result<(), ControllerError> {
        if self.model.find_module(path).is_none() {
            return Err(ControllerError::ModuleNotFound(path.to_owned()));
        }
        self.is_short_name_available(short_name)
    }

    /// Pins a display name on a module; it stops following the path.
    pub fn set_module_short_name(
        &mut self,
        path: &str,
        short_name: &str,
    ) -> Result<(), ControllerError> {
        let module = self
            .model
            .find_module(path)
            .ok_or_else(|| ControllerError::ModuleNotFound(path.to_owned()))?;
        if module.short_name == short_name {
            return Ok(());
        }
        self.can_set_module_short_name(path, short_name)?;
        if let Some(module) = self.model.find_module_mut(path) {
            short_name.clone_into(&mut module.short_name);
            module.short_name_based_on_path = false;
        }
        self.notify(ModularRigNotification::ModuleShortNameChanged, Some(path));
        self.update_short_names();
        Ok(())
    }

    /// Recomputes path-based short names.
    ///
    /// Each path-based module shows the shortest trailing run of path segments
    /// no other module shares; roots show their full path.
    pub(super) fn update_short_names(&mut self) {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for module in self.model.modules() {
            if module.short_name_based_on_path {
                let path = module.path();
                *counts.entry(path.to_lowercase()).or_default() += 1;
                let mut rest = path.as_str();
                while let Some((_, tail)) = split_namespace(rest, false) {
                    *counts.entry(tail.to_lowercase()).or_default() += 1;
                    rest = tail;
                }
            } else {
                *counts.entry(module.short_name.to_lowercase()).or_default() += 1;
            }
        }

        let mut changed = Vec::new();
        for module in self.model.modules_mut() {
            if !module.short_name_based_on_path {
                continue;
            }
            let path = module.path();
            let short = if module.is_root() {
                path.clone()
            } else {
                unique_suffix(&path, &counts)
            };
            if !eq_ignore_case(&module.short_name, &short) {
                module.short_name = short;
                changed.push(path);
            }
        }
        for path in changed {
            self.notify(ModularRigNotification::ModuleShortNameChanged, Some(&path));
        }
    }
}

/// Shortest trailing segment run of `path` whose count is one; the full path otherwise.
fn unique_suffix(path: &str, counts: &BTreeMap<String, usize>) -> String {
    let mut short = String::new();
    let mut remaining = path;
    while let Some((head, tail)) = split_namespace(remaining, true) {
        short = if short.is_empty() {
            tail.to_owned()
        } else {
            join_namespace(tail, &short)
        };
        if counts.get(&short.to_lowercase()) == Some(&1) {
            return short;
        }
        remaining = head;
    }
    if short.is_empty() {
        remaining.to_owned()
    } else {
        join_namespace(remaining, &short)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_suffix_grows_until_unambiguous() {
        let mut counts = BTreeMap::new();
        for token in ["a:arm:hand", "arm:hand", "hand", "b:arm:hand", "arm:hand", "hand"] {
            *counts.entry(token.to_owned()).or_default() += 1;
        }
        assert_eq!(unique_suffix("A:Arm:Hand", &counts), "A:Arm:Hand");
        counts.insert("hand".to_owned(), 1);
        assert_eq!(unique_suffix("A:Arm:Hand", &counts), "Hand");
    }
}
