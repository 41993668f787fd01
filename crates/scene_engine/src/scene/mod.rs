//! Scene management
//!
//! Bridges entities and their units with the render backend.
//!
//! ## Architecture
//!
//! ```text
//! Scene (entities, units, staging buffers)
//!      ↓ flush / update
//! Cameras (buckets, culling, shadow + picking passes)
//!      ↓ draw calls
//! RenderBackend
//! ```
//!
//! The scene:
//! - Owns the transform hierarchy and every entity and unit
//! - Stages structural changes and applies them once per frame
//! - Keeps the light table and the camera list in sync with live units
//! - Snapshots to and from JSON

pub mod lights;
pub mod render_queue;
pub mod scene_graph;
pub mod scene_manager;
pub mod serialization;
pub mod transform;

#[cfg(test)]
mod tests;

pub use lights::{LightSample, SceneLights};
pub use scene_graph::{Frustum, Plane, AABB};
pub use scene_manager::{
    ComponentListener, ListenerId, RenderContext, Scene, SceneObject, SceneView, UpdateContext,
};
pub use serialization::{
    AssetLookup, AssetTable, ComponentRegistry, Reference, ReferenceResolver, SceneSnapshot,
};
pub use transform::{NodeId, SpatialNode, TransformTree};
