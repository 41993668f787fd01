//! Headless rendering backend
//!
//! Records every call the scene makes instead of talking to a GPU. Used by the
//! demo binary and by tests that assert on pass order, culling, and picking.

use std::collections::VecDeque;

use crate::foundation::uid;
use crate::render::{
    BackendResult, ClearFlags, DrawCall, RenderBackend, RenderError, RenderTarget, ShaderId, Viewport,
};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// `set_viewport`
    SetViewport(Viewport),
    /// `bind_render_target` with the target uid, `None` for the default framebuffer
    BindRenderTarget(Option<u32>),
    /// `clear`
    Clear {
        /// Clear color
        color: [f32; 4],
        /// Buffers cleared
        flags: ClearFlags,
    },
    /// `draw`
    Draw {
        /// Mesh uid
        mesh: u32,
        /// Submesh index
        submesh: usize,
        /// Material uid
        material: u32,
        /// Shader bound
        shader: ShaderId,
        /// Entity uid passed in the object uniforms
        object_uid: u32,
    },
    /// `read_pixels`
    ReadPixels {
        /// Left edge
        x: u32,
        /// Bottom edge
        y: u32,
        /// Width
        width: u32,
        /// Height
        height: u32,
    },
    /// `generate_mipmaps` with the target uid
    GenerateMipmaps(u32),
    /// `create_render_target` with the new target uid
    CreateRenderTarget(u32),
    /// `destroy_render_target` with the target uid
    DestroyRenderTarget(u32),
}

/// Backend that records calls and serves scripted pixel read-backs
#[derive(Debug)]
pub struct HeadlessBackend {
    width: u32,
    height: u32,
    max_texture_size: u32,
    commands: Vec<BackendCommand>,
    scripted_pixels: VecDeque<Vec<u8>>,
}

impl HeadlessBackend {
    /// Create a backend with a default framebuffer of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            max_texture_size: 4096,
            commands: Vec::new(),
            scripted_pixels: VecDeque::new(),
        }
    }

    /// Override the reported texture size limit
    pub fn with_max_texture_size(mut self, size: u32) -> Self {
        self.max_texture_size = size;
        self
    }

    /// Queue pixel data returned by the next `read_pixels` call
    ///
    /// Without scripted data the read-back is all zeros (nothing hit).
    pub fn script_pixels(&mut self, pixels: Vec<u8>) {
        self.scripted_pixels.push_back(pixels);
    }

    /// Everything recorded so far
    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Forget recorded commands
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Recorded draws as `(object_uid, shader)` pairs, in order
    pub fn draws(&self) -> Vec<(u32, ShaderId)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                BackendCommand::Draw { object_uid, shader, .. } => Some((*object_uid, *shader)),
                _ => None,
            })
            .collect()
    }

    /// Resize the default framebuffer
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

impl RenderBackend for HeadlessBackend {
    fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(BackendCommand::SetViewport(viewport));
    }

    fn bind_render_target(&mut self, target: Option<&RenderTarget>) -> BackendResult<()> {
        self.commands.push(BackendCommand::BindRenderTarget(target.map(|t| t.uid)));
        Ok(())
    }

    fn clear(&mut self, color: [f32; 4], flags: ClearFlags) {
        self.commands.push(BackendCommand::Clear { color, flags });
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> BackendResult<()> {
        if call.submesh >= call.mesh.submesh_count() {
            return Err(RenderError::RenderingFailed(format!(
                "Submesh {} out of range for mesh '{}'", call.submesh, call.mesh.name
            )));
        }
        self.commands.push(BackendCommand::Draw {
            mesh: call.mesh.uid,
            submesh: call.submesh,
            material: call.material.uid,
            shader: call.material.shader,
            object_uid: call.object.object_uid,
        });
        Ok(())
    }

    fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32) -> BackendResult<Vec<u8>> {
        self.commands.push(BackendCommand::ReadPixels { x, y, width, height });
        let len = width as usize * height as usize * 4;
        let mut pixels = self.scripted_pixels.pop_front().unwrap_or_default();
        pixels.resize(len, 0);
        Ok(pixels)
    }

    fn generate_mipmaps(&mut self, target: &RenderTarget) -> BackendResult<()> {
        self.commands.push(BackendCommand::GenerateMipmaps(target.uid));
        Ok(())
    }

    fn create_render_target(&mut self, width: u32, height: u32, generate_mipmaps: bool) -> BackendResult<RenderTarget> {
        if width == 0 || height == 0 || width > self.max_texture_size || height > self.max_texture_size {
            return Err(RenderError::ResourceCreationFailed(format!(
                "Invalid render target size {width}x{height}"
            )));
        }
        let target = RenderTarget { uid: uid::next_uid(), width, height, generate_mipmaps };
        self.commands.push(BackendCommand::CreateRenderTarget(target.uid));
        Ok(target)
    }

    fn destroy_render_target(&mut self, target: &RenderTarget) {
        self.commands.push(BackendCommand::DestroyRenderTarget(target.uid));
    }
}
