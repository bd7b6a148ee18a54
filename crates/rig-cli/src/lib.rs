// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! rig-cli: developer commands over a JSON modular rig document.
//!
//! The binary is a thin wrapper around [`run`], which writes its report to any
//! [`std::io::Write`] so the commands can be driven from tests.
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

mod cli;
mod config;
mod document;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use comfy_table::Table;
use modular_rig::config::ConfigService;
use modular_rig::{ControllerSettings, ElementResolveState, ModularRigController, ModuleReference};
use rig_hierarchy::{join_namespace, ElementKey, ElementType};
use tracing::{debug, warn};

/// Command-line surface.
pub use cli::{Cli, Command};
/// Filesystem config store.
pub use config::FsConfigStore;
/// JSON rig document.
pub use document::RigDocument;

/// Where controller settings are read from and written to.
#[derive(Debug)]
pub enum SettingsSource {
    /// An explicit JSON file.
    File(PathBuf),
    /// The `controller` key of a config store.
    Store(ConfigService<FsConfigStore>),
}

impl SettingsSource {
    /// The file given on the command line, or the user config store.
    pub fn from_cli(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Ok(Self::File(path.to_path_buf())),
            None => Ok(Self::Store(ConfigService::new(FsConfigStore::new()?))),
        }
    }

    /// Stored settings; defaults when nothing is stored yet.
    pub fn load(&self) -> Result<ControllerSettings> {
        match self {
            Self::File(path) => match fs::read(path) {
                Ok(bytes) => serde_json::from_slice(&bytes)
                    .with_context(|| format!("failed to parse settings {}", path.display())),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "settings file missing; using defaults");
                    Ok(ControllerSettings::default())
                }
                Err(err) => Err(err)
                    .with_context(|| format!("failed to read settings {}", path.display())),
            },
            Self::Store(service) => Ok(service.controller_settings()?),
        }
    }

    /// Persists `settings`.
    pub fn save(&self, settings: &ControllerSettings) -> Result<()> {
        match self {
            Self::File(path) => fs::write(path, serde_json::to_vec_pretty(settings)?)
                .with_context(|| format!("failed to write settings {}", path.display())),
            Self::Store(service) => Ok(service.save_controller_settings(settings)?),
        }
    }
}

/// Runs one command, writing its report to `out`.
///
/// Mutating commands write the document back to `--doc`, or to `--out` when
/// given. A rejected mutation leaves the document file untouched.
pub fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let source = SettingsSource::from_cli(cli.settings.as_deref())?;
    if let Command::Settings {
        automatic_reparenting,
        auto_resolve_secondary,
    } = cli.command
    {
        return settings(&source, automatic_reparenting, auto_resolve_secondary, out);
    }

    let Some(doc_path) = cli.doc.as_deref() else {
        bail!("--doc <FILE> is required for this command");
    };
    let mut document = RigDocument::load(doc_path)?;
    let mut controller = document.controller(source.load()?)?;
    execute(&cli.command, &mut controller, out)?;

    if cli.command.is_mutating() {
        document.update_from(&controller);
        let target = cli.out.as_deref().unwrap_or(doc_path);
        document.save(target)?;
        debug!(path = %target.display(), "rig document written");
    }
    Ok(())
}

fn execute(
    command: &Command,
    controller: &mut ModularRigController,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Tree => tree(controller, out)?,
        Command::Resolve { connector } => resolve(controller, connector, out)?,
        Command::Connect {
            connector,
            target_type,
            target_name,
            no_auto_resolve,
            no_check,
        } => {
            let ty = ElementType::parse(target_type)
                .with_context(|| format!("unknown element type '{target_type}'"))?;
            let connector = ElementKey::connector(connector.as_str());
            let target = ElementKey::new(target_name.as_str(), ty);
            let auto_resolve = controller.settings().auto_resolve_secondary && !no_auto_resolve;
            let before = controller.model().connections().connections().to_vec();
            let dropped = controller.connect_connector_to_element(
                &connector,
                &target,
                auto_resolve,
                !no_check,
            )?;
            for connection in controller.model().connections().iter() {
                if !before.contains(connection) {
                    writeln!(out, "connected {} -> {}", connection.connector, connection.target)?;
                }
            }
            for key in dropped {
                writeln!(out, "dropped {key}")?;
            }
        }
        Command::Disconnect {
            connector,
            submodules,
        } => {
            let connector = ElementKey::connector(connector.as_str());
            controller.disconnect_connector(&connector, *submodules)?;
            writeln!(out, "disconnected {connector}")?;
        }
        Command::AddModule {
            name,
            class,
            parent,
        } => {
            let path = controller.add_module(name, class, parent)?;
            writeln!(out, "added {path}")?;
        }
        Command::Rename { path, new_name } => {
            let renamed = controller.rename_module(path, new_name)?;
            writeln!(out, "renamed {path} -> {renamed}")?;
        }
        Command::Reparent { path, parent } => {
            let moved = controller.reparent_module(path, parent)?;
            writeln!(out, "moved {path} -> {moved}")?;
        }
        Command::Delete { path } => {
            controller.delete_module(path)?;
            writeln!(out, "deleted {path}")?;
        }
        Command::AutoConnect { paths, replace } => {
            let outcome = controller.auto_connect_modules(paths, *replace)?;
            let connections = controller.model().connections();
            for key in &outcome.connected {
                if let Some(target) = connections.find_target_from_connector(key) {
                    writeln!(out, "connected {key} -> {target}")?;
                }
            }
            for key in &outcome.unresolved {
                writeln!(out, "unresolved {key}")?;
            }
            if !outcome.is_complete() {
                warn!(unresolved = outcome.unresolved.len(), "auto-connect left connectors open");
            }
        }
        Command::Digest => {
            writeln!(out, "{}", hex::encode(controller.model().digest()))?;
        }
        Command::Settings { .. } => bail!("settings are handled before a document is loaded"),
    }
    Ok(())
}

fn primary_target(controller: &ModularRigController, module: &ModuleReference) -> Option<ElementKey> {
    let class = controller.classes().get(&module.class)?;
    let primary = class.primary_connector()?;
    let connector = ElementKey::connector(join_namespace(&module.path(), &primary.name));
    controller
        .model()
        .connections()
        .find_target_from_connector(&connector)
        .cloned()
}

fn tree(controller: &ModularRigController, out: &mut impl Write) -> Result<()> {
    let modules = controller.model().traversal_order();
    if modules.is_empty() {
        writeln!(out, "no modules")?;
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["Path", "Short name", "Class", "Primary target"]);
    for module in modules {
        let target =
            primary_target(controller, module).map_or_else(|| "-".to_owned(), |k| k.to_string());
        table.add_row(vec![
            module.path(),
            module.display_name(),
            module.class.clone(),
            target,
        ]);
    }
    writeln!(out, "{table}")?;
    Ok(())
}

fn resolve(
    controller: &mut ModularRigController,
    connector: &str,
    out: &mut impl Write,
) -> Result<()> {
    let result = controller.find_matches(&ElementKey::connector(connector));
    for candidate in &result.matches {
        let default = if candidate.state == ElementResolveState::DefaultTarget {
            " (default)"
        } else {
            ""
        };
        writeln!(out, "match {}{default}", candidate.key)?;
    }
    for candidate in &result.excluded {
        writeln!(out, "excluded {}: {}", candidate.key, candidate.message)?;
    }
    if !result.is_valid() {
        bail!("{}", result.message);
    }
    Ok(())
}

fn settings(
    source: &SettingsSource,
    automatic_reparenting: Option<bool>,
    auto_resolve_secondary: Option<bool>,
    out: &mut impl Write,
) -> Result<()> {
    let mut settings = source.load()?;
    if let Some(value) = automatic_reparenting {
        settings.automatic_reparenting = value;
    }
    if let Some(value) = auto_resolve_secondary {
        settings.auto_resolve_secondary = value;
    }
    if automatic_reparenting.is_some() || auto_resolve_secondary.is_some() {
        source.save(&settings)?;
    }
    writeln!(out, "{}", serde_json::to_string_pretty(&settings)?)?;
    Ok(())
}
