//! Built-in units

pub mod camera;
pub mod lighting;
pub mod mesh_renderer;

pub use camera::{Camera, CameraFrame};
pub use lighting::{Light, LightFactory, LightType};
pub use mesh_renderer::MeshRenderer;
