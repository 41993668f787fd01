//! Entities and the units attached to them
//!
//! Storage lives in [`crate::scene::Scene`]; this module defines the entity
//! record, the unit kinds, and the [`Behaviour`] extension point.

pub mod component;
pub mod components;
pub mod entity;

pub use component::{Behaviour, Capabilities, ComponentId, ComponentKind, ComponentSlot, ComponentState, ComponentType};
pub use entity::{Entity, EntityId, DEFAULT_LAYER};
