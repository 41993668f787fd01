//! Backend abstraction traits for the rendering system
//!
//! This module defines the trait that rendering backends implement and the
//! plain data the scene hands to them for every draw.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat3, Mat4, Vec3};
use crate::render::{Material, Mesh, RenderError};
use crate::scene::SceneLights;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

bitflags! {
    /// Buffers cleared before a camera draws
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ClearFlags: u8 {
        /// Clear the color buffer
        const COLOR = 1;
        /// Clear the depth buffer
        const DEPTH = 1 << 1;
    }
}

/// Pixel rectangle used for both viewport and scissor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Left edge in pixels
    pub x: u32,
    /// Bottom edge in pixels
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Viewport covering a full surface
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    /// Width divided by height, 1.0 for degenerate viewports
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 { 1.0 } else { self.width as f32 / self.height as f32 }
    }
}

/// Off-screen color + depth target created by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderTarget {
    /// Unique id, also used to reference the target from scene snapshots
    pub uid: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Whether the color texture wants mipmaps regenerated after drawing
    pub generate_mipmaps: bool,
}

/// Per-camera uniform values shared by every draw of a pass
#[derive(Debug, Clone, PartialEq)]
pub struct EngineUniforms {
    /// World to view
    pub view_matrix: Mat4,
    /// View to clip
    pub projection_matrix: Mat4,
    /// `projection * view`
    pub view_projection_matrix: Mat4,
    /// World to shadow-map texture space, identity without shadows
    pub light_matrix: Mat4,
    /// Camera position in world space
    pub camera_position: Vec3,
}

impl Default for EngineUniforms {
    fn default() -> Self {
        Self {
            view_matrix: Mat4::identity(),
            projection_matrix: Mat4::identity(),
            view_projection_matrix: Mat4::identity(),
            light_matrix: Mat4::identity(),
            camera_position: Vec3::zeros(),
        }
    }
}

/// Per-object uniform values
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectUniforms {
    /// Object to world
    pub model_matrix: Mat4,
    /// Object to view
    pub model_view_matrix: Mat4,
    /// Object to clip
    pub model_view_projection_matrix: Mat4,
    /// Inverse-transpose of the model-view rotation part
    pub normal_matrix: Mat3,
    /// Uid of the owning entity, written as color by the picking shader
    pub object_uid: u32,
}

impl ObjectUniforms {
    /// Derive every matrix from the model matrix and the pass uniforms
    pub fn new(model_matrix: Mat4, engine: &EngineUniforms, object_uid: u32) -> Self {
        let model_view_matrix = engine.view_matrix * model_matrix;
        let linear = model_view_matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear.try_inverse().map_or(linear, |inv| inv.transpose());
        Self {
            model_matrix,
            model_view_matrix,
            model_view_projection_matrix: engine.projection_matrix * model_view_matrix,
            normal_matrix,
            object_uid,
        }
    }
}

/// One submesh draw: mesh, material, and everything the shader binds
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    /// Mesh to bind
    pub mesh: &'a Mesh,
    /// Submesh index to draw
    pub submesh: usize,
    /// Material (and through it the shader) to bind
    pub material: &'a Material,
    /// Pass uniforms
    pub engine: &'a EngineUniforms,
    /// Packed light data for the current view
    pub lights: &'a SceneLights,
    /// Object uniforms
    pub object: &'a ObjectUniforms,
}

/// Main rendering backend trait
///
/// Implementations wrap a concrete graphics API. The scene calls these in the
/// order the camera pipeline defines and never caches backend state itself.
pub trait RenderBackend {
    /// Size of the default framebuffer (width, height)
    fn viewport_size(&self) -> (u32, u32);

    /// Largest texture edge the backend supports
    fn max_texture_size(&self) -> u32;

    /// Set viewport and scissor to the same rectangle
    fn set_viewport(&mut self, viewport: Viewport);

    /// Bind an off-screen target, or the default framebuffer for `None`
    fn bind_render_target(&mut self, target: Option<&RenderTarget>) -> BackendResult<()>;

    /// Clear the bound target
    fn clear(&mut self, color: [f32; 4], flags: ClearFlags);

    /// Bind mesh, material, and uniforms, then draw one submesh
    fn draw(&mut self, call: &DrawCall<'_>) -> BackendResult<()>;

    /// Read RGBA8 pixels from the bound target; returns `width * height * 4` bytes
    fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32) -> BackendResult<Vec<u8>>;

    /// Regenerate the mipmap chain of a target's color texture
    fn generate_mipmaps(&mut self, target: &RenderTarget) -> BackendResult<()>;

    /// Create an off-screen target
    fn create_render_target(&mut self, width: u32, height: u32, generate_mipmaps: bool) -> BackendResult<RenderTarget>;

    /// Release an off-screen target
    fn destroy_render_target(&mut self, target: &RenderTarget);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_object_uniforms_compose_pass_matrices() {
        let engine = EngineUniforms {
            view_matrix: Mat4::new_translation(&Vec3::new(0.0, 0.0, -5.0)),
            projection_matrix: Mat4::new_scaling(2.0),
            ..EngineUniforms::default()
        };
        let model = Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0));
        let object = ObjectUniforms::new(model, &engine, 7);

        assert_relative_eq!(object.model_view_matrix, engine.view_matrix * model);
        assert_relative_eq!(object.model_view_projection_matrix, engine.projection_matrix * engine.view_matrix * model);
        assert_relative_eq!(object.normal_matrix, Mat3::identity());
        assert_eq!(object.object_uid, 7);
    }

    #[test]
    fn test_viewport_aspect_ratio() {
        assert_relative_eq!(Viewport::full(800, 400).aspect_ratio(), 2.0);
        assert_relative_eq!(Viewport::full(800, 0).aspect_ratio(), 1.0);
    }
}
