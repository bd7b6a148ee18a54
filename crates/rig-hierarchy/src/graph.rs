// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory element graph used as base skeleton and as constructed rig.
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::connector::ConnectorSettings;
use crate::element::RigElement;
use crate::hierarchy::Hierarchy;
use crate::key::{ElementKey, ElementType};

/// Error returned by [`ElementGraph`] mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// Keys must carry a name.
    #[error("element name is empty")]
    EmptyName,
    /// The `(name, type)` pair is already taken.
    #[error("element {0} already exists")]
    DuplicateElement(ElementKey),
    /// A referenced parent does not exist.
    #[error("parent {0} not found")]
    MissingParent(ElementKey),
    /// The element does not exist.
    #[error("element {0} not found")]
    MissingElement(ElementKey),
    /// Adding the parent would make the element its own ancestor.
    #[error("parenting {child} under {parent} would create a cycle")]
    Cycle {
        /// Element receiving the parent.
        child: ElementKey,
        /// Rejected parent.
        parent: ElementKey,
    },
}

/// Insertion-ordered element store with a key index and a derived children index.
#[derive(Debug, Clone, Default)]
pub struct ElementGraph {
    elements: Vec<RigElement>,
    index: FxHashMap<ElementKey, usize>,
    children: Vec<Vec<usize>>,
}

impl ElementGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when the graph holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterates elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RigElement> {
        self.elements.iter()
    }

    /// Inserts a fully described element.
    ///
    /// Parents must already exist; insertion order therefore never contains a
    /// cycle.
    pub fn add_element(&mut self, element: RigElement) -> Result<ElementKey, HierarchyError> {
        if !element.key.is_valid() {
            return Err(HierarchyError::EmptyName);
        }
        if self.index.contains_key(&element.key) {
            return Err(HierarchyError::DuplicateElement(element.key));
        }
        let mut parent_slots = Vec::with_capacity(element.parents.len());
        for parent in &element.parents {
            let slot = self
                .index
                .get(parent)
                .copied()
                .ok_or_else(|| HierarchyError::MissingParent(parent.clone()))?;
            parent_slots.push(slot);
        }
        let slot = self.elements.len();
        let key = element.key.clone();
        self.index.insert(key.clone(), slot);
        self.elements.push(element);
        self.children.push(Vec::new());
        for parent_slot in parent_slots {
            if !self.children[parent_slot].contains(&slot) {
                self.children[parent_slot].push(slot);
            }
        }
        Ok(key)
    }

    fn add_simple(
        &mut self,
        name: &str,
        ty: ElementType,
        parent: Option<&ElementKey>,
    ) -> Result<ElementKey, HierarchyError> {
        let mut element = RigElement::new(ElementKey::new(name, ty));
        if let Some(parent) = parent {
            element.parents.push(parent.clone());
        }
        self.add_element(element)
    }

    /// Adds a bone.
    pub fn add_bone(
        &mut self,
        name: &str,
        parent: Option<&ElementKey>,
    ) -> Result<ElementKey, HierarchyError> {
        self.add_simple(name, ElementType::Bone, parent)
    }

    /// Adds a null.
    pub fn add_null(
        &mut self,
        name: &str,
        parent: Option<&ElementKey>,
    ) -> Result<ElementKey, HierarchyError> {
        self.add_simple(name, ElementType::Null, parent)
    }

    /// Adds a control.
    pub fn add_control(
        &mut self,
        name: &str,
        parent: Option<&ElementKey>,
    ) -> Result<ElementKey, HierarchyError> {
        self.add_simple(name, ElementType::Control, parent)
    }

    /// Adds a socket.
    pub fn add_socket(
        &mut self,
        name: &str,
        parent: Option<&ElementKey>,
    ) -> Result<ElementKey, HierarchyError> {
        self.add_simple(name, ElementType::Socket, parent)
    }

    /// Adds a curve. Curves never have parents.
    pub fn add_curve(&mut self, name: &str) -> Result<ElementKey, HierarchyError> {
        self.add_simple(name, ElementType::Curve, None)
    }

    /// Adds a connector element owned by `module_path`.
    pub fn add_connector(
        &mut self,
        name: &str,
        settings: ConnectorSettings,
        module_path: Option<&str>,
    ) -> Result<ElementKey, HierarchyError> {
        let mut element = RigElement::new(ElementKey::connector(name));
        element.connector = Some(settings);
        element.module_path = module_path.map(str::to_owned);
        self.add_element(element)
    }

    /// Appends `parent` to the parents of `child`.
    pub fn add_parent(
        &mut self,
        child: &ElementKey,
        parent: &ElementKey,
    ) -> Result<(), HierarchyError> {
        let child_slot = self.slot(child)?;
        let parent_slot = self
            .index
            .get(parent)
            .copied()
            .ok_or_else(|| HierarchyError::MissingParent(parent.clone()))?;
        if child == parent || self.is_parented_to(parent, child) {
            return Err(HierarchyError::Cycle {
                child: child.clone(),
                parent: parent.clone(),
            });
        }
        if self.elements[child_slot].parents.contains(parent) {
            return Ok(());
        }
        self.elements[child_slot].parents.push(parent.clone());
        self.children[parent_slot].push(child_slot);
        Ok(())
    }

    /// Tags an element.
    pub fn add_tag(&mut self, key: &ElementKey, tag: &str) -> Result<(), HierarchyError> {
        let slot = self.slot(key)?;
        self.elements[slot].tags.insert(tag.to_owned());
        Ok(())
    }

    /// Records the module that owns an element.
    pub fn set_module_path(&mut self, key: &ElementKey, path: &str) -> Result<(), HierarchyError> {
        let slot = self.slot(key)?;
        self.elements[slot].module_path = Some(path.to_owned());
        Ok(())
    }

    fn slot(&self, key: &ElementKey) -> Result<usize, HierarchyError> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| HierarchyError::MissingElement(key.clone()))
    }
}

impl Hierarchy for ElementGraph {
    fn find(&self, key: &ElementKey) -> Option<&RigElement> {
        self.index.get(key).map(|&slot| &self.elements[slot])
    }

    fn elements(&self) -> Box<dyn Iterator<Item = &RigElement> + '_> {
        Box::new(self.elements.iter())
    }

    fn roots(&self) -> Vec<ElementKey> {
        self.elements
            .iter()
            .filter(|element| element.parents.is_empty())
            .map(|element| element.key.clone())
            .collect()
    }

    fn children(&self, key: &ElementKey) -> Vec<ElementKey> {
        self.index.get(key).map_or_else(Vec::new, |&slot| {
            self.children[slot]
                .iter()
                .map(|&child| self.elements[child].key.clone())
                .collect()
        })
    }
}
