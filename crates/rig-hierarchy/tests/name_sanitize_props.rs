// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Property tests for name sanitization and namespace joins.

use proptest::prelude::*;
use proptest::test_runner::{Config as PropConfig, RngAlgorithm, TestRng, TestRunner};
use rig_hierarchy::name::{
    eq_ignore_case, join_namespace, module_path_of_name, sanitize_name, MAX_NAME_LENGTH,
};
use rig_hierarchy::NAMESPACE_SEPARATOR;

const SEED_BYTES: [u8; 32] = [
    0x52, 0x49, 0x47, 0x2d, 0x4e, 0x41, 0x4d, 0x45, 0x2d, 0x53, 0x41, 0x4e, 0x49, 0x54, 0x49, 0x5a,
    0x45, 0x2d, 0x50, 0x52, 0x4f, 0x50, 0x53, 0x2d, 0x30, 0x31, 0x02, 0x03, 0x05, 0x07, 0x0b, 0x0d,
];

fn runner() -> TestRunner {
    TestRunner::new_with_rng(
        PropConfig {
            cases: 256,
            ..PropConfig::default()
        },
        TestRng::from_seed(RngAlgorithm::ChaCha, &SEED_BYTES),
    )
}

// =============================================================================
// sanitize_name
// =============================================================================

#[test]
fn sanitize_is_idempotent_and_bounded() {
    let mut runner = runner();
    runner
        .run(&(".{0,160}", any::<bool>()), |(raw, allow)| {
            let once = sanitize_name(&raw, allow);
            prop_assert!(once.chars().count() <= MAX_NAME_LENGTH);
            prop_assert_eq!(sanitize_name(&once, allow), once.clone());
            if !allow {
                prop_assert!(!once.contains(NAMESPACE_SEPARATOR));
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn sanitize_keeps_char_count_below_limit() {
    let mut runner = runner();
    runner
        .run(&".{0,100}", |raw| {
            prop_assert_eq!(sanitize_name(&raw, false).chars().count(), raw.chars().count());
            Ok(())
        })
        .unwrap();
}

// =============================================================================
// join / split
// =============================================================================

#[test]
fn joined_path_reports_left_as_module_path() {
    let mut runner = runner();
    runner
        .run(&("[A-Za-z]{1,8}(:[A-Za-z]{1,8}){0,3}", "[A-Za-z_]{1,8}"), |(left, right)| {
            let joined = join_namespace(&left, &right);
            prop_assert_eq!(module_path_of_name(&joined), Some(left.as_str()));
            Ok(())
        })
        .unwrap();
}

#[test]
fn case_insensitive_equality_is_reflexive_under_case_flip() {
    let mut runner = runner();
    runner
        .run(&"[A-Za-z0-9_]{0,24}", |name| {
            prop_assert!(eq_ignore_case(&name, &name.to_uppercase()));
            prop_assert!(eq_ignore_case(&name.to_lowercase(), &name));
            Ok(())
        })
        .unwrap();
}
