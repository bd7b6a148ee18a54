// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! modular-rig: module tree, connection table, connector resolver and module controller.
//!
//! A modular rig is assembled from module instances arranged in a forest.
//! Each module owns a `:`-separated namespace and exposes connectors that must
//! be wired to elements of the constructed hierarchy. The crate is layered:
//!
//! - [`ModularRigModel`] stores the module forest and its
//!   [`ModularRigConnections`] (connector to target, with a reverse index);
//! - [`RuleManager`] lists the legal targets of a connector by running its
//!   declared [`ConnectionRule`]s over a [`Hierarchy`](rig_hierarchy::Hierarchy);
//! - [`ModularRigController`] is the only writer of the model: it validates,
//!   applies cascading effects (reparenting, cyclic-connection sweeps,
//!   auto-resolution) and emits [`ModularRigNotification`]s;
//! - [`ModularRig`] rebuilds the live hierarchy from the model on demand.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::cognitive_complexity,
    clippy::option_if_let_else,
    clippy::significant_drop_tightening,
    clippy::doc_markdown,
    clippy::too_many_lines,
    clippy::struct_excessive_bools,
    clippy::too_long_first_doc_paragraph,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::similar_names,
    clippy::trivially_copy_pass_by_ref,
    clippy::needless_collect,
    clippy::manual_let_else,
    clippy::needless_pass_by_value
)]
// Mirrors the workspace overrides, which the crate-level deny above would
// otherwise shadow.

mod class;
pub mod config;
mod connections;
mod controller;
mod model;
mod notify;
mod resolve;
mod rig;
mod rule_manager;
mod rules;
mod settings;

/// Module class declarations and the class registry.
pub use class::{
    format_vector, parse_element_key, parse_vector, ClassError, ModuleClass, ModuleClassBuilder,
    ModuleClassRegistry, ModuleConnector, ModuleVariable, SpawnParent, SpawnedElement,
    VariableType,
};
/// Connection table.
pub use connections::{ModularRigConnection, ModularRigConnections};
/// Mutation entry point.
pub use controller::{
    AutoConnectOutcome, ControllerError, InteractionBracket, MirrorAxis, MirrorSettings,
    ModularRigController,
};
/// Module tree.
pub use model::{split_binding_source, ModularRigModel, ModuleHandle, ModuleReference};
/// Change notifications.
pub use notify::{ModifiedEvent, ModularRigNotification, SubscriptionId};
/// Resolver results.
pub use resolve::{
    ElementResolveResult, ElementResolveState, ModularRigResolveResult, ModularRigResolveState,
};
/// Live rig and the host seam used by the resolver.
pub use rig::{ConnectorEvent, ConnectorEventContext, ModularRig, ModuleInstance, RigHost};
/// Resolver.
pub use rule_manager::RuleManager;
/// Connection rules.
pub use rules::{
    AndRule, ChildOfPrimaryRule, ConnectionRule, OrRule, RuleFactory, RuleInput, RuleRegistry,
    TagRule, TypeRule, UnknownRule,
};
/// Controller behavior switches.
pub use settings::{ControllerSettings, CONTROLLER_SETTINGS_KEY};
