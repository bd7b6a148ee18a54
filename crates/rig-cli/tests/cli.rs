// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! End-to-end runs of the `rig-cli` binary over a fixture document.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/arm.json");

struct Workspace {
    _dir: TempDir,
    doc: PathBuf,
    settings: PathBuf,
}

fn workspace() -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("rig.json");
    fs::copy(FIXTURE, &doc).unwrap();
    let settings = dir.path().join("settings.json");
    Workspace {
        _dir: dir,
        doc,
        settings,
    }
}

fn rig(ws: &Workspace) -> Command {
    let mut cmd = Command::cargo_bin("rig-cli").unwrap();
    cmd.arg("--doc")
        .arg(&ws.doc)
        .arg("--settings")
        .arg(&ws.settings);
    cmd
}

fn connection_count(doc: &Path) -> usize {
    let value: serde_json::Value = serde_json::from_slice(&fs::read(doc).unwrap()).unwrap();
    value["connections"].as_array().map_or(0, Vec::len)
}

// =============================================================================
// queries
// =============================================================================

#[test]
fn tree_lists_unconnected_module() {
    let ws = workspace();
    rig(&ws)
        .arg("tree")
        .assert()
        .success()
        .stdout(predicate::str::contains("Primary target"))
        .stdout(predicate::str::contains("Arm"));
}

#[test]
fn resolve_prints_matches_and_reasons() {
    let ws = workspace();
    rig(&ws)
        .args(["resolve", "Arm:Root"])
        .assert()
        .success()
        .stdout(predicate::str::contains("match Bone(shoulder_l)"))
        .stdout(predicate::str::contains(
            "excluded Curve(blink): Cannot connect to curves.",
        ));
}

#[test]
fn resolve_of_unknown_connector_fails() {
    let ws = workspace();
    rig(&ws)
        .args(["resolve", "Ghost:Root"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Connector 'Ghost:Root' not found in the hierarchy.",
        ));
}

#[test]
fn digest_is_stable_until_the_model_changes() {
    let ws = workspace();
    let first = rig(&ws).arg("digest").output().unwrap();
    let second = rig(&ws).arg("digest").output().unwrap();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
    assert_eq!(String::from_utf8_lossy(&first.stdout).trim().len(), 64);

    rig(&ws)
        .args(["connect", "Arm:Root", "bone", "shoulder_l"])
        .assert()
        .success();
    let third = rig(&ws).arg("digest").output().unwrap();
    assert_ne!(first.stdout, third.stdout);
}

#[test]
fn missing_document_argument_is_reported() {
    let ws = workspace();
    Command::cargo_bin("rig-cli")
        .unwrap()
        .arg("--settings")
        .arg(&ws.settings)
        .arg("tree")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--doc <FILE> is required"));
}

// =============================================================================
// connections
// =============================================================================

#[test]
fn connect_resolves_secondaries_and_writes_back() {
    let ws = workspace();
    rig(&ws)
        .args(["connect", "Arm:Root", "bone", "shoulder_l"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "connected Connector(Arm:Root) -> Bone(shoulder_l)",
        ))
        .stdout(predicate::str::contains(
            "connected Connector(Arm:Wrist) -> Bone(hand_l)",
        ));
    assert_eq!(connection_count(&ws.doc), 2);

    rig(&ws)
        .arg("tree")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bone(shoulder_l)"));
}

#[test]
fn connect_without_auto_resolve_then_auto_connect() {
    let ws = workspace();
    rig(&ws)
        .args(["connect", "Arm:Root", "bone", "shoulder_r", "--no-auto-resolve"])
        .assert()
        .success();
    assert_eq!(connection_count(&ws.doc), 1);

    rig(&ws)
        .args(["auto-connect", "Arm"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "connected Connector(Arm:Wrist) -> Bone(hand_r)",
        ));
    assert_eq!(connection_count(&ws.doc), 2);
}

#[test]
fn rejected_connect_leaves_the_document_untouched() {
    let ws = workspace();
    let before = fs::read(&ws.doc).unwrap();
    rig(&ws)
        .args(["connect", "Arm:Root", "curve", "blink"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "is not a valid match for connector 'Arm:Root': Cannot connect to curves.",
        ));
    assert_eq!(fs::read(&ws.doc).unwrap(), before);
}

#[test]
fn unknown_target_type_is_rejected() {
    let ws = workspace();
    rig(&ws)
        .args(["connect", "Arm:Root", "joint", "spine"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown element type 'joint'"));
}

#[test]
fn disconnecting_the_primary_drops_the_secondaries() {
    let ws = workspace();
    rig(&ws)
        .args(["connect", "Arm:Root", "bone", "shoulder_l"])
        .assert()
        .success();
    rig(&ws)
        .args(["disconnect", "Arm:Root"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disconnected Connector(Arm:Root)"));
    assert_eq!(connection_count(&ws.doc), 0);
}

#[test]
fn out_flag_keeps_the_source_document() {
    let ws = workspace();
    let out = ws.doc.with_file_name("edited.json");
    let before = fs::read(&ws.doc).unwrap();
    rig(&ws)
        .args(["connect", "Arm:Root", "bone", "shoulder_l", "--out"])
        .arg(&out)
        .assert()
        .success();
    assert_eq!(fs::read(&ws.doc).unwrap(), before);
    assert_eq!(connection_count(&out), 2);
}

// =============================================================================
// modules
// =============================================================================

#[test]
fn add_rename_and_delete_modules() {
    let ws = workspace();
    rig(&ws)
        .args(["add-module", "Elbow", "Arm", "--parent", "Arm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added Arm:Elbow"));
    rig(&ws)
        .args(["rename", "Arm", "Limb"])
        .assert()
        .success()
        .stdout(predicate::str::contains("renamed Arm -> Limb"));
    rig(&ws)
        .arg("tree")
        .assert()
        .success()
        .stdout(predicate::str::contains("Limb:Elbow"));
    rig(&ws)
        .args(["reparent", "Limb:Elbow"])
        .assert()
        .success()
        .stdout(predicate::str::contains("moved Limb:Elbow -> Elbow"));
    rig(&ws)
        .args(["delete", "Elbow"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted Elbow"));
}

#[test]
fn controller_errors_become_the_exit_message() {
    let ws = workspace();
    rig(&ws)
        .args(["delete", "Ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Module 'Ghost' not found."));
    rig(&ws)
        .args(["add-module", "Wing", "Wing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Module class 'Wing' is not registered.",
        ));
}

// =============================================================================
// settings
// =============================================================================

#[test]
fn settings_are_persisted_to_the_settings_file() {
    let ws = workspace();
    rig(&ws)
        .args(["settings", "--automatic-reparenting", "false"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"automatic_reparenting\": false"));
    assert!(ws.settings.is_file());

    rig(&ws)
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"automatic_reparenting\": false"))
        .stdout(predicate::str::contains("\"auto_resolve_secondary\": true"));
}

#[test]
fn settings_turn_off_secondary_resolution() {
    let ws = workspace();
    fs::write(&ws.settings, r#"{ "auto_resolve_secondary": false }"#).unwrap();
    rig(&ws)
        .args(["connect", "Arm:Root", "bone", "shoulder_l"])
        .assert()
        .success();
    assert_eq!(connection_count(&ws.doc), 1);
}
