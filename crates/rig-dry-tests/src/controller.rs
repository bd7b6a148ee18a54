// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Controller builder and ready-made rig states over the samples.

use std::sync::Arc;

use modular_rig::{
    ControllerSettings, ModularRig, ModularRigController, ModuleClassRegistry, ModuleVariable,
};
use rig_hierarchy::{ElementGraph, ElementKey};

use crate::classes::{rig_variables, sample_classes, ARM_CLASS, HAND_CLASS};
use crate::skeleton::sample_skeleton;

/// Builder for test controllers.
///
/// # Example
///
/// ```
/// use rig_dry_tests::ControllerTestBuilder;
///
/// let mut controller = ControllerTestBuilder::new().without_auto_resolve().build();
/// assert_eq!(controller.add_module("Arm", "Arm", "").unwrap(), "Arm");
/// ```
pub struct ControllerTestBuilder {
    skeleton: ElementGraph,
    classes: ModuleClassRegistry,
    variables: Vec<ModuleVariable>,
    settings: ControllerSettings,
}

impl Default for ControllerTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerTestBuilder {
    /// Sample skeleton, sample classes, sample rig variables, default settings.
    pub fn new() -> Self {
        Self {
            skeleton: sample_skeleton(),
            classes: sample_classes(),
            variables: rig_variables(),
            settings: ControllerSettings::default(),
        }
    }

    /// Replace the base skeleton.
    pub fn with_skeleton(mut self, skeleton: ElementGraph) -> Self {
        self.skeleton = skeleton;
        self
    }

    /// Replace the class registry.
    pub fn with_classes(mut self, classes: ModuleClassRegistry) -> Self {
        self.classes = classes;
        self
    }

    /// Replace the controller settings.
    pub fn with_settings(mut self, settings: ControllerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Turn off automatic reparenting.
    pub fn without_reparenting(mut self) -> Self {
        self.settings.automatic_reparenting = false;
        self
    }

    /// Turn off secondary auto-resolution on convenience connects.
    pub fn without_auto_resolve(mut self) -> Self {
        self.settings.auto_resolve_secondary = false;
        self
    }

    /// Build the controller.
    pub fn build(self) -> ModularRigController {
        let rig = ModularRig::new(self.skeleton, Arc::new(self.classes)).with_variables(self.variables);
        ModularRigController::new(rig).with_settings(self.settings)
    }
}

/// Ready-made rig states.
#[derive(Debug, Clone, Copy)]
pub struct SampleRig;

impl SampleRig {
    /// Root `Arm` module: `Root` on `shoulder_l`, `Wrist` auto-resolved to `hand_l`.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn connected_arm() -> ModularRigController {
        let mut controller = ControllerTestBuilder::new().build();
        controller
            .add_module("Arm", ARM_CLASS, "")
            .expect("arm module is added");
        controller
            .connect(
                &ElementKey::connector("Arm:Root"),
                &ElementKey::bone("shoulder_l"),
            )
            .expect("arm root connects to the left shoulder");
        controller
    }

    /// [`SampleRig::connected_arm`] plus `Arm:Hand`, attached to the arm's `ik` control.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn arm_with_hand() -> ModularRigController {
        let mut controller = Self::connected_arm();
        controller
            .add_module("Hand", HAND_CLASS, "Arm")
            .expect("hand module is added");
        controller
            .connect(
                &ElementKey::connector("Arm:Hand:Root"),
                &ElementKey::new("Arm:ik", rig_hierarchy::ElementType::Control),
            )
            .expect("hand root connects to the arm ik control");
        controller
    }
}
