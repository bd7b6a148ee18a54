// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Sample module classes.
//!
//! | Class     | Connectors                                                  | Spawns                                   |
//! |-----------|-------------------------------------------------------------|------------------------------------------|
//! | `Arm`     | `Root` (primary, bone), `Wrist` (wrist-tagged child), `Pole` (optional, pole-tagged) | `ik` control on `Wrist`, `fk_root` null on `Root` |
//! | `ArmLite` | `Root` (primary, bone)                                      | none                                     |
//! | `Hand`    | `Root` (primary, control)                                   | `grip` socket on `Root`                  |
//! | `Leg`     | `Root` (primary, bone), `Foot` (foot-tagged child)          | `ik` control on `Foot`                   |

use modular_rig::{
    ModuleClass, ModuleClassRegistry, ModuleConnector, ModuleVariable, SpawnParent,
    SpawnedElement, VariableType,
};
use rig_hierarchy::{ElementType, RuleStash};

/// Arm class name.
pub const ARM_CLASS: &str = "Arm";
/// Connector-only arm used for class swaps.
pub const ARM_LITE_CLASS: &str = "ArmLite";
/// Hand class name.
pub const HAND_CLASS: &str = "Hand";
/// Leg class name.
pub const LEG_CLASS: &str = "Leg";

fn tagged_child(name: &str, tag: &str) -> ModuleConnector {
    ModuleConnector::secondary(name)
        .with_rule(RuleStash::Tag(tag.to_owned()))
        .with_rule(RuleStash::ChildOfPrimary)
}

/// Arm: bone primary, a wrist secondary below it and an optional pole.
#[must_use]
#[allow(clippy::expect_used)]
pub fn arm_class() -> ModuleClass {
    ModuleClass::builder(ARM_CLASS)
        .connector(
            ModuleConnector::primary("Root")
                .with_rule(RuleStash::Type(ElementType::Bone))
                .with_description("Shoulder the arm hangs from"),
        )
        .connector(tagged_child("Wrist", "wrist"))
        .connector(ModuleConnector::optional("Pole").with_rule(RuleStash::Tag("pole".to_owned())))
        .variable(ModuleVariable::new("twist", VariableType::Float).with_default("0"))
        .variable(ModuleVariable::new("pole_vector", VariableType::Vector).with_default("0,0,1"))
        .variable(ModuleVariable::new("side", VariableType::Name).with_default("L"))
        .variable(
            ModuleVariable::new("stretch", VariableType::Bool)
                .with_default("false")
                .advanced(),
        )
        .variable(
            ModuleVariable::new("solver", VariableType::Name)
                .with_default("ik")
                .private(),
        )
        .variable(
            ModuleVariable::new("chain_length", VariableType::Int)
                .with_default("3")
                .read_only(),
        )
        .spawn(SpawnedElement::new(
            "ik",
            ElementType::Control,
            SpawnParent::Connector("Wrist".to_owned()),
        ))
        .spawn(SpawnedElement::new(
            "fk_root",
            ElementType::Null,
            SpawnParent::Connector("Root".to_owned()),
        ))
        .build()
        .expect("arm class is well formed")
}

/// Arm without secondaries or spawns; shares `twist` and `side` with [`arm_class`].
#[must_use]
#[allow(clippy::expect_used)]
pub fn arm_lite_class() -> ModuleClass {
    ModuleClass::builder(ARM_LITE_CLASS)
        .connector(ModuleConnector::primary("Root").with_rule(RuleStash::Type(ElementType::Bone)))
        .variable(ModuleVariable::new("twist", VariableType::Float).with_default("0"))
        .variable(ModuleVariable::new("side", VariableType::Name).with_default("L"))
        .build()
        .expect("arm lite class is well formed")
}

/// Hand: attaches to a control and publishes a grip socket.
#[must_use]
#[allow(clippy::expect_used)]
pub fn hand_class() -> ModuleClass {
    ModuleClass::builder(HAND_CLASS)
        .connector(ModuleConnector::primary("Root").with_rule(RuleStash::Type(ElementType::Control)))
        .variable(ModuleVariable::new("twist", VariableType::Float).with_default("0"))
        .variable(ModuleVariable::new("side", VariableType::Name).with_default("L"))
        .variable(ModuleVariable::new("fingers", VariableType::Int).with_default("5"))
        .spawn(SpawnedElement::socket_on("grip", "Root").with_tag("grip"))
        .build()
        .expect("hand class is well formed")
}

/// Leg: bone primary with a foot secondary below it.
#[must_use]
#[allow(clippy::expect_used)]
pub fn leg_class() -> ModuleClass {
    ModuleClass::builder(LEG_CLASS)
        .connector(ModuleConnector::primary("Root").with_rule(RuleStash::Type(ElementType::Bone)))
        .connector(tagged_child("Foot", "foot"))
        .variable(ModuleVariable::new("twist", VariableType::Float).with_default("0"))
        .variable(ModuleVariable::new("pole_vector", VariableType::Vector).with_default("0,0,1"))
        .variable(ModuleVariable::new("side", VariableType::Name).with_default("L"))
        .spawn(SpawnedElement::new(
            "ik",
            ElementType::Control,
            SpawnParent::Connector("Foot".to_owned()),
        ))
        .build()
        .expect("leg class is well formed")
}

/// Registry holding every sample class.
#[must_use]
pub fn sample_classes() -> ModuleClassRegistry {
    let mut registry = ModuleClassRegistry::new();
    registry.register(arm_class());
    registry.register(arm_lite_class());
    registry.register(hand_class());
    registry.register(leg_class());
    registry
}

/// Root rig variables available as binding sources.
#[must_use]
pub fn rig_variables() -> Vec<ModuleVariable> {
    vec![
        ModuleVariable::new("global_scale", VariableType::Float).with_default("1"),
        ModuleVariable::new("character_side", VariableType::Name).with_default("L"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_classes_register_every_class() {
        let registry = sample_classes();
        for name in [ARM_CLASS, ARM_LITE_CLASS, HAND_CLASS, LEG_CLASS] {
            assert!(registry.contains(name), "{name} missing");
        }
        let arm = arm_class();
        assert_eq!(arm.primary_connector().map(|c| c.name.as_str()), Some("Root"));
        assert!(arm.connector("Pole").is_some_and(|c| c.kind.is_optional()));
    }
}
