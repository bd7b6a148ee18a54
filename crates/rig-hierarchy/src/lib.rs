// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! rig-hierarchy: keyed element graph for modular rigs.
//!
//! Provides the element identity types, the `:`-separated namespace path
//! syntax, connector declarations, the read-only [`Hierarchy`] query trait
//! consumed by the modular-rig resolver, and [`ElementGraph`], the in-memory
//! store used both for the base skeleton and for constructed rigs.
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

mod connector;
mod element;
mod graph;
mod hierarchy;
mod key;
pub mod name;
mod redirector;

/// Connector roles, settings and serializable rule descriptions.
pub use connector::{ConnectorKind, ConnectorSettings, Hash, RuleStash};
/// Element records.
pub use element::RigElement;
/// In-memory store and its mutation errors.
pub use graph::{ElementGraph, HierarchyError};
/// Query trait consumed by resolvers and rules.
pub use hierarchy::Hierarchy;
/// Element identity.
pub use key::{ElementKey, ElementType};
/// Frequently used path helpers.
pub use name::{join_namespace, sanitize_name, split_namespace, NAMESPACE_SEPARATOR};
/// Resolved connector lookup.
pub use redirector::ElementKeyRedirector;
