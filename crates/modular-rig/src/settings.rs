// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Controller behavior switches.
use serde::{Deserialize, Serialize};

/// Config key under which [`ControllerSettings`] are stored.
pub const CONTROLLER_SETTINGS_KEY: &str = "controller";

/// Switches that change how the controller reacts to connection changes.
///
/// Missing fields deserialize to their defaults, so partial settings files work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Connecting a primary connector moves the module under the target's
    /// module; disconnecting it moves the module back to the root.
    pub automatic_reparenting: bool,
    /// Default for `auto_resolve_others` in convenience connect calls.
    pub auto_resolve_secondary: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            automatic_reparenting: true,
            auto_resolve_secondary: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings: ControllerSettings =
            serde_json::from_str(r#"{ "automatic_reparenting": false }"#).unwrap();
        assert!(!settings.automatic_reparenting);
        assert!(settings.auto_resolve_secondary);
    }
}
