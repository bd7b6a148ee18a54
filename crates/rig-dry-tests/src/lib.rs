// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for the modular rig crates.
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`skeleton`] - Sample biped base skeleton
//! - [`classes`] - Sample module classes (arm, hand, leg)
//! - [`controller`] - Controller builder over the samples
//! - [`notifications`] - Recorder for controller notifications
#![forbid(unsafe_code)]

pub mod classes;
pub mod config;
pub mod controller;
pub mod notifications;
pub mod skeleton;

pub use classes::{
    arm_class, arm_lite_class, hand_class, leg_class, rig_variables, sample_classes,
    ARM_CLASS, ARM_LITE_CLASS, HAND_CLASS, LEG_CLASS,
};
pub use config::InMemoryConfigStore;
pub use controller::{ControllerTestBuilder, SampleRig};
pub use notifications::NotificationLog;
pub use skeleton::sample_skeleton;
