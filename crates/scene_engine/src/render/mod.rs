//! Rendering interfaces consumed by the scene core
//!
//! The scene never talks to a graphics API directly. Cameras and renderable
//! units issue their work through the [`RenderBackend`] trait, passing
//! [`Mesh`]/[`Material`] collaborators and per-draw uniform data.

pub mod api;
pub mod material;
pub mod mesh;
pub mod picking;
pub mod headless;

pub use api::{
    RenderBackend, BackendResult, ClearFlags, DrawCall, EngineUniforms, ObjectUniforms,
    RenderTarget, Viewport,
};
pub use material::{Material, ShaderId};
pub use mesh::{Mesh, MeshData};
pub use headless::{BackendCommand, HeadlessBackend};

use thiserror::Error;

/// High-level rendering error types
///
/// Errors a [`RenderBackend`] reports back to the scene, abstracted from the
/// underlying graphics API.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A rendering operation failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// Resource creation or management failed
    ///
    /// Occurs when render targets or other GPU resources cannot be created.
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
