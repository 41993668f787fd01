//! Scene light aggregate
//!
//! Holds at most one ambient light, at most one directional light, and a
//! fixed number of point lights. Once per camera per frame the aggregate
//! turns the lights' world state into view-space blocks of nine floats that
//! backends upload as-is:
//!
//! | block | floats 0..3 | floats 3..6 | floats 6..9 |
//! |---|---|---|---|
//! | directional | eye-space direction | color * intensity | half vector |
//! | point (per light) | eye-space position | color * intensity | attenuation |

use crate::core::{SceneError, SceneResult};
use crate::ecs::components::LightType;
use crate::ecs::ComponentId;
use crate::foundation::math::{Mat4, Point3, Quat, Vec3};
use crate::render::RenderTarget;

/// Floats per packed light block
pub const LIGHT_BLOCK_SIZE: usize = 9;

/// Axis a directional light shines along in its local space
pub const LIGHT_FORWARD: Vec3 = Vec3::new(0.0, 0.0, 1.0);

/// World state of one light, read from its component and transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    /// Color multiplied by intensity
    pub color_intensity: Vec3,
    /// Attenuation coefficients
    pub attenuation: Vec3,
    /// World-space position
    pub position: Vec3,
    /// World-space rotation
    pub rotation: Quat,
    /// Whether the light casts shadows
    pub shadow: bool,
}

/// Lights registered with a scene and their packed per-frame data
#[derive(Debug, Clone)]
pub struct SceneLights {
    max_point_lights: usize,
    ambient: Option<ComponentId>,
    directional: Option<ComponentId>,
    point_lights: Vec<ComponentId>,

    ambient_color: Vec3,
    directional_data: [f32; LIGHT_BLOCK_SIZE],
    directional_world_direction: Vec3,
    point_light_data: Vec<f32>,
    shadow_target: Option<RenderTarget>,
}

impl SceneLights {
    /// Create an empty aggregate with room for `max_point_lights` point lights
    pub fn new(max_point_lights: usize) -> Self {
        Self {
            max_point_lights,
            ambient: None,
            directional: None,
            point_lights: Vec::with_capacity(max_point_lights),
            ambient_color: Vec3::zeros(),
            directional_data: [0.0; LIGHT_BLOCK_SIZE],
            directional_world_direction: LIGHT_FORWARD,
            point_light_data: vec![0.0; LIGHT_BLOCK_SIZE * max_point_lights],
            shadow_target: None,
        }
    }

    /// Check whether a light of this type could be added
    ///
    /// `pending_add` lists the types of lights staged but not yet registered;
    /// `pending_removal` lists registered lights that will be gone by then.
    pub fn check_add(
        &self,
        light_type: LightType,
        pending_add: &[LightType],
        pending_removal: &[ComponentId],
    ) -> SceneResult<()> {
        let staying = |id: &ComponentId| !pending_removal.contains(id);
        let pending_of_type = pending_add.iter().filter(|&&t| t == light_type).count();
        match light_type {
            LightType::Ambient if self.ambient.filter(staying).is_some() || pending_of_type > 0 => {
                Err(SceneError::DuplicateLight(LightType::Ambient))
            }
            LightType::Directional if self.directional.filter(staying).is_some() || pending_of_type > 0 => {
                Err(SceneError::DuplicateLight(LightType::Directional))
            }
            LightType::Point
                if self.point_lights.iter().filter(|id| staying(*id)).count() + pending_of_type
                    >= self.max_point_lights =>
            {
                Err(SceneError::CapacityExceeded { max: self.max_point_lights })
            }
            _ => Ok(()),
        }
    }

    /// Register a light; the aggregate is unchanged on error
    pub fn add(&mut self, id: ComponentId, light_type: LightType) -> SceneResult<()> {
        self.check_add(light_type, &[], &[])?;
        match light_type {
            LightType::Ambient => self.ambient = Some(id),
            LightType::Directional => self.directional = Some(id),
            LightType::Point => self.point_lights.push(id),
        }
        Ok(())
    }

    /// Unregister a light; returns its type if it was registered
    ///
    /// Point lights are kept dense: later lights move down one block and the
    /// freed tail block is zeroed.
    pub fn remove(&mut self, id: ComponentId) -> Option<LightType> {
        if self.ambient == Some(id) {
            self.ambient = None;
            self.ambient_color = Vec3::zeros();
            return Some(LightType::Ambient);
        }
        if self.directional == Some(id) {
            self.directional = None;
            self.directional_data = [0.0; LIGHT_BLOCK_SIZE];
            return Some(LightType::Directional);
        }
        let index = self.point_lights.iter().position(|&p| p == id)?;
        self.point_lights.remove(index);
        let start = index * LIGHT_BLOCK_SIZE;
        self.point_light_data.copy_within(start + LIGHT_BLOCK_SIZE.., start);
        self.reset_point_light(self.point_lights.len());
        Some(LightType::Point)
    }

    fn reset_point_light(&mut self, index: usize) {
        let start = index * LIGHT_BLOCK_SIZE;
        if let Some(block) = self.point_light_data.get_mut(start..start + LIGHT_BLOCK_SIZE) {
            block.fill(0.0);
        }
    }

    /// Registered ambient light
    pub fn ambient_light(&self) -> Option<ComponentId> {
        self.ambient
    }

    /// Registered directional light
    pub fn directional_light(&self) -> Option<ComponentId> {
        self.directional
    }

    /// Registered point lights in registration order
    pub fn point_lights(&self) -> &[ComponentId] {
        &self.point_lights
    }

    /// Number of registered point lights
    pub fn number_of_point_lights(&self) -> usize {
        self.point_lights.len()
    }

    /// Point light capacity
    pub fn max_point_lights(&self) -> usize {
        self.max_point_lights
    }

    /// Ambient color times intensity, zero without an ambient light
    pub fn ambient_color(&self) -> Vec3 {
        self.ambient_color
    }

    /// Packed directional light block
    pub fn directional_data(&self) -> &[f32; LIGHT_BLOCK_SIZE] {
        &self.directional_data
    }

    /// World-space direction of the directional light from the last recompute
    pub fn directional_world_direction(&self) -> Vec3 {
        self.directional_world_direction
    }

    /// Packed point light blocks, `max_point_lights` blocks long
    pub fn point_light_data(&self) -> &[f32] {
        &self.point_light_data
    }

    /// Point light blocks as raw bytes for upload
    pub fn point_light_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.point_light_data)
    }

    /// Shadow map of the directional light, if one has been allocated
    pub fn shadow_target(&self) -> Option<&RenderTarget> {
        self.shadow_target.as_ref()
    }

    pub(crate) fn set_shadow_target(&mut self, target: Option<RenderTarget>) -> Option<RenderTarget> {
        std::mem::replace(&mut self.shadow_target, target)
    }

    /// Transform every registered light into view space and repack the buffers
    ///
    /// `lookup` returns the current world state of a light; lights it cannot
    /// resolve contribute nothing this frame.
    pub fn recompute_light<F>(&mut self, view_matrix: &Mat4, lookup: F)
    where
        F: Fn(ComponentId) -> Option<LightSample>,
    {
        self.ambient_color = self
            .ambient
            .and_then(&lookup)
            .map_or_else(Vec3::zeros, |sample| sample.color_intensity);

        self.directional_data = [0.0; LIGHT_BLOCK_SIZE];
        if let Some(sample) = self.directional.and_then(&lookup) {
            let world_direction = sample.rotation * LIGHT_FORWARD;
            let eye_direction = view_matrix.transform_vector(&world_direction).normalize();
            let half_vector = (eye_direction + LIGHT_FORWARD).normalize();
            self.directional_world_direction = world_direction;
            write_block(&mut self.directional_data, eye_direction, sample.color_intensity, half_vector);
        }

        let mut packed = 0;
        for &id in &self.point_lights {
            let Some(sample) = lookup(id) else { continue };
            let eye_position = view_matrix.transform_point(&Point3::from(sample.position)).coords;
            let start = packed * LIGHT_BLOCK_SIZE;
            write_block(
                &mut self.point_light_data[start..start + LIGHT_BLOCK_SIZE],
                eye_position,
                sample.color_intensity,
                sample.attenuation,
            );
            packed += 1;
        }
        self.point_light_data[packed * LIGHT_BLOCK_SIZE..].fill(0.0);
    }
}

fn write_block(block: &mut [f32], a: Vec3, b: Vec3, c: Vec3) {
    block[0..3].copy_from_slice(a.as_slice());
    block[3..6].copy_from_slice(b.as_slice());
    block[6..9].copy_from_slice(c.as_slice());
}
