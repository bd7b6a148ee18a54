// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Modular rig developer CLI.
#[derive(Parser, Debug)]
#[command(name = "rig-cli", author, version, about = "Inspect and edit modular rig documents")]
pub struct Cli {
    /// Rig document (JSON) to operate on
    #[arg(long, short = 'd', global = true)]
    pub doc: Option<PathBuf>,
    /// Write the edited document here instead of back to `--doc`
    #[arg(long, global = true)]
    pub out: Option<PathBuf>,
    /// Controller settings file (JSON); defaults to the user config dir
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,
    /// Log resolver and controller activity
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Table of modules, short names, classes and primary targets
    Tree,
    /// List the matches and exclusions of a connector
    Resolve {
        /// Connector name, e.g. `Arm:Wrist`
        connector: String,
    },
    /// Connect a connector to an element
    Connect {
        /// Connector name
        connector: String,
        /// Target element type, e.g. `bone`
        target_type: String,
        /// Target element name
        target_name: String,
        /// Leave the module's secondary connectors alone
        #[arg(long)]
        no_auto_resolve: bool,
        /// Skip validation against the resolver
        #[arg(long)]
        no_check: bool,
    },
    /// Remove a connector's connection
    Disconnect {
        /// Connector name
        connector: String,
        /// Also drop connections of descendant modules (secondary connectors)
        #[arg(long)]
        submodules: bool,
    },
    /// Add a module instance
    AddModule {
        /// Module name
        name: String,
        /// Module class
        class: String,
        /// Parent module path
        #[arg(long, default_value = "")]
        parent: String,
    },
    /// Rename a module
    Rename {
        /// Module path
        path: String,
        /// New segment name
        new_name: String,
    },
    /// Move a module under another one (or to the root)
    Reparent {
        /// Module path
        path: String,
        /// New parent path; omit for the root
        #[arg(long, default_value = "")]
        parent: String,
    },
    /// Delete a module and its descendants
    Delete {
        /// Module path
        path: String,
    },
    /// Resolve the secondary connectors of the listed modules
    AutoConnect {
        /// Module paths
        #[arg(required = true)]
        paths: Vec<String>,
        /// Re-resolve connectors that are already connected
        #[arg(long)]
        replace: bool,
    },
    /// Print the model digest
    Digest,
    /// Show, and optionally change, the controller settings
    Settings {
        /// Reparent modules when their primary connector changes
        #[arg(long)]
        automatic_reparenting: Option<bool>,
        /// Auto-resolve secondary connectors after a primary connect
        #[arg(long)]
        auto_resolve_secondary: Option<bool>,
    },
}

impl Command {
    /// True when the command edits the document.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Self::Tree | Self::Resolve { .. } | Self::Digest | Self::Settings { .. }
        )
    }
}
