//! # Scene Engine
//!
//! Scene graph and rendering core for real-time 3D applications.
//!
//! ## Features
//!
//! - **Transform Hierarchy**: Parent/child transforms with lazily cached world matrices
//! - **Component Lifecycle**: Additions and removals staged and applied once per frame
//! - **Camera Pipeline**: Render buckets, frustum culling, shadow maps, and GPU picking
//! - **Scene Lights**: Ambient, directional, and a fixed number of point lights
//! - **Snapshots**: JSON scene serialization with cross-object references
//! - **Backend Agnostic**: Everything draws through the `RenderBackend` trait
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default();
//!     let mut engine = Engine::new(config, Box::new(HeadlessBackend::new(640, 480)))?;
//!
//!     let scene = engine.scene_mut();
//!     let camera = scene.create_entity("Camera");
//!     scene.add_component(camera, Camera::new().into())?;
//!
//!     engine.run_frames(3)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;
pub mod config;

pub mod foundation;
pub mod ecs;
pub mod scene;
pub mod render;
pub mod events;
pub mod assets;

mod engine;

pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        Engine, EngineError,
        core::{Config, EngineConfig, SceneError, SceneResult},
        foundation::{
            math::{Mat4, Quat, Vec3},
            time::{FrameClock, FrameTime},
        },
        ecs::{Behaviour, Capabilities, ComponentId, ComponentKind, ComponentType, Entity, EntityId},
        ecs::components::{Camera, Light, LightFactory, LightType, MeshRenderer},
        scene::{ComponentRegistry, AssetTable, Scene, UpdateContext, RenderContext},
        render::{HeadlessBackend, Material, Mesh, MeshData, RenderBackend, ShaderId},
        events::TaskQueue,
        assets::{ObjImportOptions, ObjImporter},
    };
}
