// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Module config values and variable bindings.
use rig_hierarchy::join_namespace;
use rig_hierarchy::name::{eq_ignore_case, namespace_of_path, starts_with_ignore_case};
use tracing::{instrument, warn};

use super::{ControllerError, ModularRigController};
use crate::class::ModuleVariable;
use crate::model::split_binding_source;
use crate::notify::ModularRigNotification;

impl ModularRigController {
    /// Effective value of a module variable: the configured literal, else the class default.
    pub fn config_value(&self, path: &str, variable: &str) -> Option<String> {
        let module = self.model.find_module(path)?;
        if let Some(value) = module.config_values.get(variable) {
            return Some(value.clone());
        }
        let class = self.classes().get(&module.class)?;
        class.variable(variable).map(|v| v.default.clone())
    }

    fn target_variable(&self, path: &str, variable: &str) -> Result<ModuleVariable, ControllerError> {
        self.module_class(path)?
            .variable(variable)
            .cloned()
            .ok_or_else(|| ControllerError::VariableNotFound {
                module: path.to_owned(),
                variable: variable.to_owned(),
            })
    }

    /// Sets a config value after checking the variable is writable and the
    /// literal parses as its type.
    #[instrument(level = "debug", skip(self))]
    pub fn set_config_value(
        &mut self,
        path: &str,
        variable: &str,
        value: &str,
    ) -> Result<(), ControllerError> {
        let declared = self.target_variable(path, variable)?;
        if declared.read_only {
            return Err(ControllerError::ReadOnlyVariable {
                module: path.to_owned(),
                variable: variable.to_owned(),
            });
        }
        if !declared.ty.accepts(value) {
            return Err(ControllerError::InvalidValue {
                module: path.to_owned(),
                variable: variable.to_owned(),
                value: value.to_owned(),
            });
        }
        if let Some(module) = self.model.find_module_mut(path) {
            module
                .config_values
                .insert(variable.to_owned(), value.to_owned());
        }
        self.mark_dirty();
        self.notify(ModularRigNotification::ModuleConfigValueChanged, Some(path));
        Ok(())
    }

    /// Checks whether `source` may feed `path.variable`.
    ///
    /// `source` is either a root rig variable name or `module:variable`. The
    /// source module may not lie inside the target module, and both variables
    /// must share a type.
    pub fn can_bind_module_variable(
        &self,
        path: &str,
        variable: &str,
        source: &str,
    ) -> Result<(), ControllerError> {
        let target = self.target_variable(path, variable)?;
        if target.read_only || !target.public {
            return Err(ControllerError::ReadOnlyVariable {
                module: path.to_owned(),
                variable: variable.to_owned(),
            });
        }
        let source_variable = match split_binding_source(source) {
            (Some(source_module), source_name) => {
                if self.model.find_module(source_module).is_none() {
                    return Err(ControllerError::SourceModuleNotFound(source_module.to_owned()));
                }
                if eq_ignore_case(source_module, path)
                    || starts_with_ignore_case(source_module, &namespace_of_path(path))
                {
                    return Err(ControllerError::SourceContainedInTarget {
                        source_module: source_module.to_owned(),
                        target_module: path.to_owned(),
                    });
                }
                self.module_class(source_module)?
                    .variable(source_name)
                    .cloned()
            }
            (None, source_name) => self.rig.variable(source_name).cloned(),
        };
        let source_variable = source_variable
            .ok_or_else(|| ControllerError::SourceVariableNotFound(source.to_owned()))?;
        if source_variable.ty != target.ty {
            return Err(ControllerError::IncompatibleBinding {
                source_path: source.to_owned(),
                source_type: source_variable.ty,
                target_path: format!("{path}.{variable}"),
                target_type: target.ty,
            });
        }
        Ok(())
    }

    /// Binds `path.variable` to `source`.
    #[instrument(level = "debug", skip(self))]
    pub fn bind_module_variable(
        &mut self,
        path: &str,
        variable: &str,
        source: &str,
    ) -> Result<(), ControllerError> {
        self.can_bind_module_variable(path, variable, source)?;
        if let Some(module) = self.model.find_module_mut(path) {
            module
                .bindings
                .insert(variable.to_owned(), source.to_owned());
        }
        self.mark_dirty();
        self.notify(ModularRigNotification::ModuleConfigValueChanged, Some(path));
        Ok(())
    }

    /// Removes the binding of `path.variable`.
    pub fn unbind_module_variable(
        &mut self,
        path: &str,
        variable: &str,
    ) -> Result<(), ControllerError> {
        let module = self
            .model
            .find_module_mut(path)
            .ok_or_else(|| ControllerError::ModuleNotFound(path.to_owned()))?;
        if module.bindings.remove(variable).is_none() {
            return Err(ControllerError::NotBound {
                module: path.to_owned(),
                variable: variable.to_owned(),
            });
        }
        self.mark_dirty();
        self.notify(ModularRigNotification::ModuleConfigValueChanged, Some(path));
        Ok(())
    }

    /// Every source `path.variable` could be bound to: root rig variables
    /// first, then variables of modules outside the target's subtree.
    pub fn possible_bindings(&self, path: &str, variable: &str) -> Vec<String> {
        let Ok(target) = self.target_variable(path, variable) else {
            return Vec::new();
        };
        if target.read_only || !target.is_configurable() {
            return Vec::new();
        }
        let mut candidates: Vec<String> = self
            .rig
            .variables()
            .iter()
            .map(|v| v.name.clone())
            .collect();
        let namespace = namespace_of_path(path);
        for module in self.model.traversal_order() {
            let module_path = module.path();
            if module_path == path || module_path.starts_with(&namespace) {
                continue;
            }
            if let Some(class) = self.classes().get(&module.class) {
                candidates.extend(
                    class
                        .variables()
                        .iter()
                        .map(|v| join_namespace(&module_path, &v.name)),
                );
            }
        }
        candidates.retain(|source| self.can_bind_module_variable(path, variable, source).is_ok());
        candidates
    }

    /// Re-validates config values and bindings of one module against its
    /// class, and bindings of other modules that read from it. Invalid
    /// entries are dropped.
    pub fn refresh_module_variables(&mut self, path: &str) -> Result<(), ControllerError> {
        let class = self.module_class(path)?;
        let Some(module) = self.model.find_module_mut(path) else {
            return Err(ControllerError::ModuleNotFound(path.to_owned()));
        };
        let values = std::mem::take(&mut module.config_values);
        let bindings = std::mem::take(&mut module.bindings);
        let before = (values.clone(), bindings.clone());

        self.suspended(|c| {
            for (variable, value) in &values {
                let hidden = class.variable(variable).is_some_and(|v| !v.is_configurable());
                let applied = if hidden {
                    Err(ControllerError::ReadOnlyVariable {
                        module: path.to_owned(),
                        variable: variable.clone(),
                    })
                } else {
                    c.set_config_value(path, variable, value)
                };
                if let Err(err) = applied {
                    warn!(module = %path, %variable, %err, "config value dropped");
                }
            }
            for (variable, source) in &bindings {
                let hidden = class.variable(variable).is_some_and(|v| !v.is_configurable());
                if hidden {
                    warn!(module = %path, %variable, "binding dropped: variable not configurable");
                } else if let Err(err) = c.bind_module_variable(path, variable, source) {
                    warn!(module = %path, %variable, %err, "binding dropped");
                }
            }

            let dependents: Vec<(String, String, String)> = c
                .model
                .modules()
                .iter()
                .filter(|m| m.path() != path)
                .flat_map(|m| {
                    let owner = m.path();
                    m.bindings
                        .iter()
                        .filter(move |(_, source)| split_binding_source(source).0 == Some(path))
                        .map(move |(variable, source)| (owner.clone(), variable.clone(), source.clone()))
                })
                .collect();
            for (owner, variable, source) in dependents {
                let (_, source_name) = split_binding_source(&source);
                let source_ok = class
                    .variable(source_name)
                    .is_some_and(ModuleVariable::is_configurable);
                let bindable = source_ok
                    && c.can_bind_module_variable(&owner, &variable, &source).is_ok();
                if !bindable {
                    warn!(module = %owner, %variable, %source, "binding dropped: source no longer bindable");
                    if let Err(err) = c.unbind_module_variable(&owner, &variable) {
                        warn!(module = %owner, %err, "unbind failed");
                    }
                }
            }
        });

        let changed = self
            .model
            .find_module(path)
            .is_some_and(|m| (m.config_values.clone(), m.bindings.clone()) != before);
        if changed {
            self.mark_dirty();
            self.notify(ModularRigNotification::ModuleConfigValueChanged, Some(path));
        }
        Ok(())
    }

    /// Re-validates every module; unknown classes are skipped.
    pub fn refresh_all_module_variables(&mut self) {
        let paths: Vec<String> = self.model.traversal_order().iter().map(|m| m.path()).collect();
        for path in paths {
            if let Err(err) = self.refresh_module_variables(&path) {
                warn!(module = %path, %err, "variables not refreshed");
            }
        }
    }
}
