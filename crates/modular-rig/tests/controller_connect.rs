// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Connect, disconnect, reparenting cascades and auto-resolution.

use std::collections::BTreeMap;

use modular_rig::{ControllerError, ModularRigController, ModularRigNotification};
use rig_dry_tests::{
    ControllerTestBuilder, NotificationLog, SampleRig, ARM_CLASS, HAND_CLASS, LEG_CLASS,
};
use rig_hierarchy::{ElementKey, ElementType};

fn connector(name: &str) -> ElementKey {
    ElementKey::connector(name)
}

fn bone(name: &str) -> ElementKey {
    ElementKey::bone(name)
}

fn control(name: &str) -> ElementKey {
    ElementKey::new(name, ElementType::Control)
}

fn target_of(controller: &ModularRigController, name: &str) -> Option<ElementKey> {
    controller
        .model()
        .connections()
        .find_target_from_connector(&connector(name))
        .cloned()
}

fn connection_map(controller: &ModularRigController) -> BTreeMap<ElementKey, ElementKey> {
    controller
        .model()
        .connections()
        .iter()
        .map(|c| (c.connector.clone(), c.target.clone()))
        .collect()
}

// =============================================================================
// validation
// =============================================================================

#[test]
fn can_connect_reports_each_failure() {
    let mut controller = ControllerTestBuilder::new().build();
    controller.add_module("Arm", ARM_CLASS, "").unwrap();

    assert_eq!(
        controller.can_connect_connector_to_element(&connector("Root"), &bone("spine")),
        Err(ControllerError::ConnectorWithoutNamespace("Root".to_owned()))
    );
    assert_eq!(
        controller.can_connect_connector_to_element(&connector("Ghost:Root"), &bone("spine")),
        Err(ControllerError::ModuleNotFound("Ghost".to_owned()))
    );
    assert_eq!(
        controller.can_connect_connector_to_element(&connector("Arm:Elbow"), &bone("spine")),
        Err(ControllerError::UndeclaredConnector {
            connector: "Elbow".to_owned(),
            class: ARM_CLASS.to_owned(),
        })
    );
    assert_eq!(
        controller.can_connect_connector_to_element(&connector("Arm:Root"), &bone("")),
        Err(ControllerError::InvalidTarget(bone("").to_string()))
    );
    assert_eq!(
        controller.can_connect_connector_to_element(&connector("Arm:Root"), &connector("Arm:Root")),
        Err(ControllerError::SelfConnection("Arm:Root".to_owned()))
    );
    assert_eq!(
        controller.can_connect_connector_to_element(&connector("Arm:Wrist"), &bone("hand_l")),
        Err(ControllerError::PrimaryNotResolved("Arm:Wrist".to_owned()))
    );
    let err = controller
        .can_connect_connector_to_element(&connector("Arm:Root"), &ElementKey::socket("head_socket"))
        .unwrap_err();
    assert!(matches!(err, ControllerError::NotAMatch { .. }));
    assert!(err.to_string().contains("is not of the expected type"));

    assert!(controller
        .can_connect_connector_to_element(&connector("Arm:Root"), &bone("shoulder_l"))
        .is_ok());
}

#[test]
fn rejected_connect_leaves_the_model_untouched() {
    let mut controller = SampleRig::connected_arm();
    let (log, _) = NotificationLog::attach(&mut controller);
    let before = controller.model().digest();

    let err = controller
        .connect(&connector("Arm:Wrist"), &bone("hand_r"))
        .unwrap_err();
    assert!(matches!(err, ControllerError::NotAMatch { .. }));
    assert_eq!(controller.model().digest(), before);
    assert!(log.is_empty());
}

#[test]
fn current_connection_is_always_acceptable() {
    let mut controller = SampleRig::connected_arm();
    assert!(controller
        .can_connect_connector_to_element(&connector("Arm:Wrist"), &bone("hand_l"))
        .is_ok());
}

// =============================================================================
// connect
// =============================================================================

#[test]
fn connecting_the_primary_auto_resolves_secondaries() {
    let controller = SampleRig::connected_arm();
    assert_eq!(target_of(&controller, "Arm:Root"), Some(bone("shoulder_l")));
    assert_eq!(target_of(&controller, "Arm:Wrist"), Some(bone("hand_l")));
    assert_eq!(target_of(&controller, "Arm:Pole"), None);
    assert!(controller.model().connections().is_consistent());
}

#[test]
fn without_auto_resolve_secondaries_stay_open() {
    let mut controller = ControllerTestBuilder::new().without_auto_resolve().build();
    controller.add_module("Arm", ARM_CLASS, "").unwrap();
    controller.connect(&connector("Arm:Root"), &bone("shoulder_l")).unwrap();
    assert_eq!(target_of(&controller, "Arm:Wrist"), None);
}

#[test]
fn moving_the_primary_drops_stale_secondaries_and_resolves_again() {
    let mut controller = SampleRig::connected_arm();
    controller.connect(&connector("Arm:Root"), &bone("shoulder_r")).unwrap();
    assert_eq!(target_of(&controller, "Arm:Root"), Some(bone("shoulder_r")));
    assert_eq!(target_of(&controller, "Arm:Wrist"), Some(bone("hand_r")));
    assert_eq!(controller.model().connections().len(), 2);
}

#[test]
fn reconnecting_the_same_target_restores_dependents() {
    let mut controller = SampleRig::connected_arm();
    let before = connection_map(&controller);
    let removed = controller
        .connect_connector_to_element(&connector("Arm:Root"), &bone("shoulder_l"), false, true)
        .unwrap();
    assert!(removed.is_empty());
    assert_eq!(connection_map(&controller), before);
}

#[test]
fn connect_notifies_inside_one_bracket() {
    let mut controller = ControllerTestBuilder::new().build();
    controller.add_module("Arm", ARM_CLASS, "").unwrap();
    let (log, _) = NotificationLog::attach(&mut controller);

    controller.connect(&connector("Arm:Root"), &bone("shoulder_l")).unwrap();

    let kinds = log.kinds();
    assert_eq!(kinds.first(), Some(&ModularRigNotification::InteractionBracketOpened));
    assert_eq!(kinds.last(), Some(&ModularRigNotification::InteractionBracketClosed));
    assert_eq!(log.count(ModularRigNotification::InteractionBracketOpened), 1);
    // primary, then the auto-resolved wrist
    assert_eq!(
        log.paths(ModularRigNotification::ConnectionChanged),
        vec!["Arm".to_owned(), "Arm".to_owned()]
    );
}

#[test]
fn leg_foot_resolves_under_the_chosen_thigh() {
    let mut controller = ControllerTestBuilder::new().build();
    controller.add_module("Leg", LEG_CLASS, "").unwrap();
    controller.connect(&connector("Leg:Root"), &bone("thigh_r")).unwrap();
    assert_eq!(target_of(&controller, "Leg:Foot"), Some(bone("foot_r")));
}

// =============================================================================
// automatic reparenting
// =============================================================================

#[test]
fn primary_connection_moves_module_under_target_module() {
    let mut controller = SampleRig::connected_arm();
    controller.add_module("Hand", HAND_CLASS, "").unwrap();
    let (log, _) = NotificationLog::attach(&mut controller);

    let removed = controller.connect(&connector("Hand:Root"), &control("Arm:ik")).unwrap();
    assert!(removed.is_empty());

    let model = controller.model();
    assert!(model.find_module("Hand").is_none());
    assert_eq!(model.find_module("Arm:Hand").map(|m| m.parent_path.as_str()), Some("Arm"));
    assert_eq!(target_of(&controller, "Arm:Hand:Root"), Some(control("Arm:ik")));
    assert!(!controller.model().connections().has_connection(&connector("Hand:Root")));
    assert_eq!(
        log.paths(ModularRigNotification::ModuleReparented),
        vec!["Arm:Hand".to_owned()]
    );

    controller.disconnect_connector(&connector("Arm:Hand:Root"), false).unwrap();
    let hand = controller.model().find_module("Hand").unwrap();
    assert!(hand.is_root());
    assert_eq!(hand.previous_parent_path, "Arm");
    assert!(controller.model().connections().find_connectors_from_target(&control("Arm:ik")).is_empty());
}

#[test]
fn without_reparenting_the_cross_module_connection_is_swept() {
    let mut controller = ControllerTestBuilder::new().without_reparenting().build();
    controller.add_module("Arm", ARM_CLASS, "").unwrap();
    controller.connect(&connector("Arm:Root"), &bone("shoulder_l")).unwrap();
    controller.add_module("Hand", HAND_CLASS, "").unwrap();

    let removed = controller.connect(&connector("Hand:Root"), &control("Arm:ik")).unwrap();
    assert_eq!(removed, vec![connector("Hand:Root")]);
    assert!(controller.model().find_module("Hand").unwrap().is_root());
    assert_eq!(target_of(&controller, "Hand:Root"), None);
}

#[test]
fn connecting_into_own_descendant_is_swept() {
    let mut controller = ControllerTestBuilder::new().without_auto_resolve().build();
    controller.add_module("Arm", ARM_CLASS, "").unwrap();
    controller.add_module("Hand", HAND_CLASS, "Arm").unwrap();

    let removed = controller
        .connect_connector_to_element(
            &connector("Arm:Root"),
            &ElementKey::socket("Arm:Hand:grip"),
            false,
            false,
        )
        .unwrap();
    assert_eq!(removed, vec![connector("Arm:Root")]);
    assert_eq!(target_of(&controller, "Arm:Root"), None);
    assert!(controller.model().find_module("Arm").unwrap().is_root());
    assert!(controller.model().find_module("Arm:Hand").is_some());
}

// =============================================================================
// disconnect
// =============================================================================

#[test]
fn disconnecting_the_primary_drops_every_module_connection() {
    let mut controller = SampleRig::connected_arm();
    controller.disconnect_connector(&connector("Arm:Root"), false).unwrap();
    assert!(controller.model().connections().is_empty());
    assert_eq!(
        controller.disconnect_connector(&connector("Arm:Root"), false),
        Err(ControllerError::NotConnected("Arm:Root".to_owned()))
    );
}

#[test]
fn disconnecting_unconnected_or_undeclared_connectors_fails() {
    let mut controller = SampleRig::connected_arm();
    assert_eq!(
        controller.disconnect_connector(&connector("Arm:Pole"), false),
        Err(ControllerError::NotConnected("Arm:Pole".to_owned()))
    );
    assert!(matches!(
        controller.disconnect_connector(&connector("Arm:Elbow"), false),
        Err(ControllerError::UndeclaredConnector { .. })
    ));
}

#[test]
fn disconnecting_a_secondary_can_cascade_to_submodules() {
    let mut controller = SampleRig::arm_with_hand();
    controller.disconnect_connector(&connector("Arm:Wrist"), false).unwrap();
    assert!(controller.model().connections().has_connection(&connector("Arm:Hand:Root")));

    let mut controller = SampleRig::arm_with_hand();
    controller.disconnect_connector(&connector("Arm:Wrist"), true).unwrap();
    let remaining: Vec<ElementKey> = connection_map(&controller).into_keys().collect();
    assert_eq!(remaining, vec![connector("Arm:Root")]);
    assert_eq!(
        controller.model().find_module("Arm:Hand").map(|m| m.parent_path.as_str()),
        Some("Arm")
    );
}

// =============================================================================
// auto-resolution
// =============================================================================

#[test]
fn auto_connect_reports_unresolved_connectors() {
    let mut controller = SampleRig::connected_arm();
    let outcome = controller.auto_connect_modules(&["Arm".to_owned()], false).unwrap();
    assert!(outcome.connected.is_empty());
    assert_eq!(outcome.unresolved, vec![connector("Arm:Pole")]);
    assert!(!outcome.is_complete());

    let outcome = controller.auto_connect_modules(&["Arm".to_owned()], true).unwrap();
    assert_eq!(outcome.connected, vec![connector("Arm:Wrist")]);
    assert_eq!(target_of(&controller, "Arm:Wrist"), Some(bone("hand_l")));
}

#[test]
fn auto_connect_requires_live_connectors() {
    let mut controller = SampleRig::connected_arm();
    assert_eq!(
        controller.auto_connect_secondary_connectors(&[bone("spine")], false),
        Err(ControllerError::ConnectorNotFound("spine".to_owned()))
    );
    let outcome = controller
        .auto_connect_secondary_connectors(&[connector("Arm:Root")], true)
        .unwrap();
    assert!(outcome.connected.is_empty() && outcome.unresolved.is_empty());
    assert_eq!(
        controller.auto_connect_modules(&["Ghost".to_owned()], false),
        Err(ControllerError::ModuleNotFound("Ghost".to_owned()))
    );
}

#[test]
fn auto_connect_waits_for_the_primary() {
    let mut controller = ControllerTestBuilder::new().build();
    controller.add_module("Arm", ARM_CLASS, "").unwrap();
    let outcome = controller.auto_connect_modules(&["Arm".to_owned()], false).unwrap();
    assert_eq!(
        outcome.unresolved,
        vec![connector("Arm:Wrist"), connector("Arm:Pole")]
    );
    assert!(controller.model().connections().is_empty());
}
