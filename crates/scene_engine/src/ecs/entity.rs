//! Entity implementation

use serde_json::{json, Value};
use slotmap::new_key_type;

use crate::ecs::ComponentId;
use crate::scene::NodeId;

new_key_type! {
    /// Generation-checked handle to an entity in a scene
    pub struct EntityId;
}

/// Default layer bitmask of new entities
pub const DEFAULT_LAYER: u32 = 1;

/// A named object owning one transform node and a list of units
///
/// Entities are created and destroyed through [`crate::scene::Scene`], which
/// also owns the transform node and the units listed here.
#[derive(Debug, Clone)]
pub struct Entity {
    pub(crate) uid: u32,
    pub(crate) name: String,
    pub(crate) layer: u32,
    pub(crate) transform: NodeId,
    pub(crate) components: Vec<ComponentId>,
    pub(crate) destroyed: bool,
}

impl Entity {
    pub(crate) fn new(uid: u32, name: String, transform: NodeId) -> Self {
        Self {
            uid,
            name,
            layer: DEFAULT_LAYER,
            transform,
            components: Vec::new(),
            destroyed: false,
        }
    }

    /// Process-unique id, also written by the picking pass
    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Layer bitmask matched against camera layer masks
    pub fn layer(&self) -> u32 {
        self.layer
    }

    /// The entity's own transform node
    pub fn transform(&self) -> NodeId {
        self.transform
    }

    /// Attached units in insertion order, excluding the transform
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// Units including the transform; zero once destroyed
    pub fn number_of_components(&self) -> usize {
        if self.destroyed { 0 } else { self.components.len() + 1 }
    }

    /// Whether `destroy` has been called
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub(crate) fn base_json(&self, components: Vec<Value>) -> Value {
        json!({
            "name": self.name,
            "layer": self.layer,
            "uid": self.uid,
            "components": components,
        })
    }
}
