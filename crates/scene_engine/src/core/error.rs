//! Error taxonomy for the scene core

use crate::ecs::components::LightType;
use crate::render::RenderError;

/// Errors raised by scene, entity, transform, and light operations
#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    /// A property received a value of the wrong shape or range
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A structural rule was broken (self-parenting, cycles, destroyed owner)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The unit already belongs to an entity
    #[error("Component is already attached to an entity")]
    AlreadyAttached,

    /// An entity can only carry its own transform
    #[error("Entity already has a Transform")]
    DuplicateTransform,

    /// Point light capacity reached
    #[error("Only {max} point lights allowed in scene")]
    CapacityExceeded {
        /// Configured capacity
        max: usize,
    },

    /// Second ambient or directional light
    #[error("Cannot have multiple {0:?} lights in the scene")]
    DuplicateLight(LightType),

    /// Unknown component type name during deserialization
    #[error("Cannot find component type '{0}'")]
    UnknownType(String),

    /// A handle no longer refers to a live object
    #[error("Handle refers to a destroyed object")]
    StaleHandle,

    /// Malformed JSON snapshot
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// GPU layer failure
    #[error("Backend error: {0}")]
    Backend(#[from] RenderError),
}

/// Result alias used throughout the scene core
pub type SceneResult<T> = Result<T, SceneError>;
