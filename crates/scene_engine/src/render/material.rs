//! Material system for rendering
//!
//! A material pairs a shader with the uniform values it binds. The scene only
//! cares about two things: which shader it uses (for state-change sorting) and
//! its render-order hint (for bucket assignment).

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::foundation::uid;
use crate::scene::render_queue::DEFAULT_RENDER_ORDER;

/// Identity of a shader program, compared when sorting draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShaderId(pub u32);

impl ShaderId {
    /// Engine default lit shader
    pub const DEFAULT: Self = Self(1);
    /// Depth-only shader used by the shadow pass
    pub const SHADOW_MAP: Self = Self(2);
    /// Shader encoding the object uid as color
    pub const PICKING: Self = Self(3);
    /// First id available to user shaders
    pub const FIRST_USER: Self = Self(100);
}

/// Material properties for 3D rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Unique id used for snapshot references
    pub uid: u32,

    /// Display name
    pub name: String,

    /// Shader bound when drawing with this material
    pub shader: ShaderId,

    /// Render-order hint: < 2000 opaque, 2000..3000 transparent, >= 3000 overlay
    pub render_order: i32,

    /// Base color (RGB)
    pub base_color: [f32; 3],

    /// Alpha/transparency (0.0 = transparent, 1.0 = opaque)
    pub alpha: f32,
}

impl Material {
    /// Create an opaque material using the given shader
    pub fn new(name: impl Into<String>, shader: ShaderId) -> Self {
        Self {
            uid: uid::next_uid(),
            name: name.into(),
            shader,
            render_order: DEFAULT_RENDER_ORDER,
            base_color: [1.0, 1.0, 1.0],
            alpha: 1.0,
        }
    }

    /// Set the render-order hint
    pub fn with_render_order(mut self, render_order: i32) -> Self {
        self.render_order = render_order;
        self
    }

    /// Set the base color
    pub fn with_color(mut self, r: f32, g: f32, b: f32) -> Self {
        self.base_color = [r, g, b];
        self
    }

    /// Set the alpha/transparency
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    /// Material assigned to renderers activated without one
    pub fn engine_default() -> Rc<Self> {
        Rc::new(Self::new("Default material", ShaderId::DEFAULT))
    }

    /// Replacement material for the shadow-map pass
    pub fn shadow_map() -> Rc<Self> {
        Rc::new(Self::new("Shadow map material", ShaderId::SHADOW_MAP))
    }

    /// Replacement material for the picking pass
    pub fn picking() -> Rc<Self> {
        Rc::new(Self::new("Picking material", ShaderId::PICKING))
    }
}
