// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Sample biped base skeleton.
//!
//! ```text
//! root
//! └─ pelvis
//!    ├─ spine ─ chest
//!    │          ├─ neck ─ head ─ head_socket (socket)
//!    │          ├─ shoulder_l ─ arm_l ─ hand_l   [wrist]
//!    │          └─ shoulder_r ─ arm_r ─ hand_r   [wrist]
//!    ├─ thigh_l ─ calf_l ─ foot_l                [foot]
//!    └─ thigh_r ─ calf_r ─ foot_r                [foot]
//! blink (curve)
//! ```

use rig_hierarchy::{ElementGraph, ElementKey};

/// Builds the sample skeleton.
#[must_use]
#[allow(clippy::expect_used)]
pub fn sample_skeleton() -> ElementGraph {
    fn bone(graph: &mut ElementGraph, name: &str, parent: Option<&ElementKey>) -> ElementKey {
        graph
            .add_bone(name, parent)
            .expect("sample skeleton bone names are unique")
    }

    let mut graph = ElementGraph::new();
    let root = bone(&mut graph, "root", None);
    let pelvis = bone(&mut graph, "pelvis", Some(&root));
    let spine = bone(&mut graph, "spine", Some(&pelvis));
    let chest = bone(&mut graph, "chest", Some(&spine));
    let neck = bone(&mut graph, "neck", Some(&chest));
    let head = bone(&mut graph, "head", Some(&neck));
    graph
        .add_socket("head_socket", Some(&head))
        .expect("sample skeleton socket is unique");

    for side in ["l", "r"] {
        let shoulder = bone(&mut graph, &format!("shoulder_{side}"), Some(&chest));
        let arm = bone(&mut graph, &format!("arm_{side}"), Some(&shoulder));
        let hand = bone(&mut graph, &format!("hand_{side}"), Some(&arm));
        graph.add_tag(&hand, "wrist").expect("hand bone exists");

        let thigh = bone(&mut graph, &format!("thigh_{side}"), Some(&pelvis));
        let calf = bone(&mut graph, &format!("calf_{side}"), Some(&thigh));
        let foot = bone(&mut graph, &format!("foot_{side}"), Some(&calf));
        graph.add_tag(&foot, "foot").expect("foot bone exists");
    }

    graph.add_curve("blink").expect("sample skeleton curve is unique");
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_hierarchy::Hierarchy;

    #[test]
    fn hands_and_feet_are_tagged() {
        let graph = sample_skeleton();
        assert!(graph.has_tag(&ElementKey::bone("hand_l"), "wrist"));
        assert!(graph.has_tag(&ElementKey::bone("foot_r"), "foot"));
        assert!(!graph.has_tag(&ElementKey::bone("arm_l"), "wrist"));
        assert!(graph.is_parented_to(&ElementKey::bone("hand_l"), &ElementKey::bone("shoulder_l")));
    }
}
