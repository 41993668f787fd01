//! # Core Engine Module
//!
//! Shared configuration and the error taxonomy used by every other module.

pub mod config;
pub mod error;

pub use config::{
    EngineConfig,
    Config,
    ConfigError,
    ConfigFormat,
};
pub use error::{SceneError, SceneResult};
