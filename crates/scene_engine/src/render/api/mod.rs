//! GPU layer abstraction
//!
//! Everything a backend must provide for the camera pipeline: viewport and
//! scissor setup, render target binding, clears, draw calls, pixel read-back,
//! and mipmap generation.

pub mod render_backend;

pub use render_backend::{
    RenderBackend, BackendResult, ClearFlags, DrawCall, EngineUniforms, ObjectUniforms,
    RenderTarget, Viewport,
};
