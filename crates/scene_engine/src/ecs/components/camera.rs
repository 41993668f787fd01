//! # Camera
//!
//! A camera is the per-frame rendering orchestrator of a scene. It listens for
//! renderable units being added and removed, keeps them in three sorted
//! render-order buckets, and every frame runs a fixed pipeline:
//!
//! 1. Shadow pass: depth from the directional light into its shadow map,
//!    using an orthographic volume fitted in front of the camera
//! 2. Viewport, target binding, clear
//! 3. Projection and view matrices from the camera's settings and transform
//! 4. Light aggregate recomputed into view space
//! 5. Transparent bucket sorted back-to-front
//! 6. Opaque, transparent, and overlay buckets drawn with frustum culling
//! 7. Mipmap regeneration for render targets that want it
//! 8. Picking: id pass, read-back, and deferred callbacks
//!
//! ## Coordinate conventions
//! Right-handed, camera looking down -Z, OpenGL clip space (depth in [-1, 1]).

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{EngineConfig, SceneError, SceneResult};
use crate::ecs::{Capabilities, ComponentId, EntityId};
use crate::events::TaskQueue;
use crate::foundation::math::{utils, Mat4, Mat4Ext, Quat, Vec3};
use crate::render::picking::{self, PickCallback, PickRequest};
use crate::render::{
    ClearFlags, EngineUniforms, Material, ObjectUniforms, RenderBackend, RenderTarget, Viewport,
};
use crate::scene::render_queue::{Bucket, RenderBuckets, RenderItem};
use crate::scene::serialization::{Reference, ReferenceResolver};
use crate::scene::{ComponentListener, Frustum, RenderContext, SceneLights, SceneView};

/// Smallest field of view in degrees
pub const MIN_FIELD_OF_VIEW: f32 = 1.0;

/// Largest field of view in degrees
pub const MAX_FIELD_OF_VIEW: f32 = 179.0;

/// Ratio between the shadow volume radius and half the shadow distance
///
/// Large enough for the bounding sphere of the frustum slice covered by the
/// shadow map at the default field of view.
const SHADOW_RADIUS_FACTOR: f32 = 1.553_773_974;

/// Everything a camera needs from its scene while rendering one frame
pub struct CameraFrame<'a> {
    /// Read-only view of the scene
    pub scene: SceneView<'a>,
    /// Entity owning the camera
    pub entity: EntityId,
    /// Light aggregate, recomputed per camera
    pub lights: &'a mut SceneLights,
    /// GPU layer
    pub backend: &'a mut dyn RenderBackend,
    /// Deferred task queue for picking callbacks
    pub tasks: &'a mut TaskQueue,
    /// Current frame number
    pub frame: u64,
}

/// Serialized form of a camera
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CameraConfig {
    enabled: bool,
    render_shadow: bool,
    layer_mask: u32,
    render_target: Option<Reference>,
    field_of_view: f32,
    near: f32,
    far: f32,
    perspective: bool,
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    camera_index: i32,
    clear_color: [f32; 4],
    clear_flag_color: bool,
    clear_flag_depth: bool,
    normalized_viewport_rect: [f32; 4],
    replacement_material: Option<Reference>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Camera::new().config()
    }
}

/// Viewpoint unit
///
/// Renders the units whose entity layer intersects its layer mask, either to
/// the default framebuffer or to its render target. Cameras render in
/// ascending `camera_index` order.
///
/// # Example
/// ```rust
/// use scene_engine::prelude::*;
///
/// let mut scene = Scene::new(EngineConfig::default());
/// let entity = scene.create_entity("Camera");
/// let mut camera = Camera::new();
/// camera.set_field_of_view(45.0).unwrap();
/// camera.set_camera_index(2);
/// scene.add_component(entity, camera.into()).unwrap();
/// ```
#[derive(Debug)]
pub struct Camera {
    enabled: bool,
    render_shadow: bool,
    layer_mask: u32,
    render_target: Option<RenderTarget>,
    field_of_view: f32,
    near: f32,
    far: f32,
    perspective: bool,
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    camera_index: i32,
    clear_color: [f32; 4],
    clear_flags: ClearFlags,
    normalized_viewport_rect: [f32; 4],
    replacement_material: Option<Rc<Material>>,

    /// Engine settings captured at activation
    config: EngineConfig,
    activated: bool,
    shadow_material: Rc<Material>,
    picking_material: Rc<Material>,
    picking_target: Option<RenderTarget>,
    pick_requests: Vec<PickRequest>,
    buckets: RenderBuckets,
    uniforms: EngineUniforms,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    /// Perspective camera with a 60 degree field of view, clearing color and depth to black
    pub fn new() -> Self {
        Self {
            enabled: true,
            render_shadow: false,
            layer_mask: 0xffff_ffff,
            render_target: None,
            field_of_view: 60.0,
            near: 0.1,
            far: 1000.0,
            perspective: true,
            left: -1.0,
            right: 1.0,
            bottom: -1.0,
            top: 1.0,
            camera_index: 1,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_flags: ClearFlags::COLOR | ClearFlags::DEPTH,
            normalized_viewport_rect: [0.0, 0.0, 1.0, 1.0],
            replacement_material: None,
            config: EngineConfig::default(),
            activated: false,
            shadow_material: Material::shadow_map(),
            picking_material: Material::picking(),
            picking_target: None,
            pick_requests: Vec::new(),
            buckets: RenderBuckets::new(),
            uniforms: EngineUniforms::default(),
        }
    }

    /// Orthographic camera with the given clip box
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32) -> Self {
        Self {
            perspective: false,
            left,
            right,
            bottom,
            top,
            ..Self::new()
        }
    }

    fn reject(&self, message: String) -> SceneResult<()> {
        if self.config.debug_mode {
            Err(SceneError::Configuration(message))
        } else {
            log::warn!("{message}; value ignored");
            Ok(())
        }
    }

    /// Whether the camera renders at all
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable rendering; queued picks wait for the next enabled frame
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the camera runs the shadow pass
    pub fn render_shadow(&self) -> bool {
        self.render_shadow
    }

    /// Enable the shadow pass; needs shadows enabled in the engine config
    pub fn set_render_shadow(&mut self, render_shadow: bool) {
        if render_shadow && self.activated && !self.config.shadows {
            log::error!("Shadows are disabled in the engine config; camera will not render shadows");
        }
        self.render_shadow = render_shadow;
    }

    /// Layers this camera draws
    pub fn layer_mask(&self) -> u32 {
        self.layer_mask
    }

    /// Set the layer mask; live cameras must be changed through `Scene::update_component`
    pub fn set_layer_mask(&mut self, layer_mask: u32) {
        self.layer_mask = layer_mask;
    }

    /// Off-screen target, `None` for the default framebuffer
    pub fn render_target(&self) -> Option<&RenderTarget> {
        self.render_target.as_ref()
    }

    /// Render into an off-screen target
    pub fn set_render_target(&mut self, target: Option<RenderTarget>) {
        self.render_target = target;
    }

    /// Vertical field of view in degrees
    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    /// Set the vertical field of view, clamped to [1, 179] degrees
    pub fn set_field_of_view(&mut self, degrees: f32) -> SceneResult<()> {
        if !degrees.is_finite() {
            return self.reject(format!("Field of view must be a number, got {degrees}"));
        }
        self.field_of_view = degrees.clamp(MIN_FIELD_OF_VIEW, MAX_FIELD_OF_VIEW);
        Ok(())
    }

    /// Near clip distance
    pub fn near(&self) -> f32 {
        self.near
    }

    /// Far clip distance
    pub fn far(&self) -> f32 {
        self.far
    }

    /// Set near and far clip distances; near must be positive and less than far
    pub fn set_clip_planes(&mut self, near: f32, far: f32) -> SceneResult<()> {
        if !near.is_finite() || !far.is_finite() || near <= 0.0 || near >= far {
            return self.reject(format!("Invalid clip planes near={near} far={far}"));
        }
        self.near = near;
        self.far = far;
        Ok(())
    }

    /// Whether the projection is perspective
    pub fn perspective(&self) -> bool {
        self.perspective
    }

    /// Switch between perspective and orthographic projection
    pub fn set_perspective(&mut self, perspective: bool) {
        self.perspective = perspective;
    }

    /// Orthographic clip box as (left, right, bottom, top)
    pub fn orthographic_bounds(&self) -> (f32, f32, f32, f32) {
        (self.left, self.right, self.bottom, self.top)
    }

    /// Set the orthographic clip box
    pub fn set_orthographic_bounds(&mut self, left: f32, right: f32, bottom: f32, top: f32) -> SceneResult<()> {
        if left == right || bottom == top {
            return self.reject(format!("Degenerate orthographic box {left},{right},{bottom},{top}"));
        }
        self.left = left;
        self.right = right;
        self.bottom = bottom;
        self.top = top;
        Ok(())
    }

    /// Render order among cameras; lower renders first
    pub fn camera_index(&self) -> i32 {
        self.camera_index
    }

    /// Set the camera index; live cameras must be changed through `Scene::update_component`
    pub fn set_camera_index(&mut self, camera_index: i32) {
        self.camera_index = camera_index;
    }

    /// Clear color (RGBA)
    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Set the clear color
    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    /// Buffers cleared before drawing
    pub fn clear_flags(&self) -> ClearFlags {
        self.clear_flags
    }

    /// Choose which buffers are cleared before drawing
    pub fn setup_clear_flags(&mut self, clear_color: bool, clear_depth: bool) {
        self.clear_flags = ClearFlags::empty();
        self.clear_flags.set(ClearFlags::COLOR, clear_color);
        self.clear_flags.set(ClearFlags::DEPTH, clear_depth);
    }

    /// Viewport as normalized [x, y, width, height] of the target
    pub fn normalized_viewport_rect(&self) -> [f32; 4] {
        self.normalized_viewport_rect
    }

    /// Set the normalized viewport rect
    pub fn set_normalized_viewport_rect(&mut self, rect: [f32; 4]) {
        self.normalized_viewport_rect = rect;
    }

    /// Material every unit is drawn with instead of its own
    pub fn replacement_material(&self) -> Option<&Rc<Material>> {
        self.replacement_material.as_ref()
    }

    /// Set or clear the replacement material
    pub fn set_replacement_material(&mut self, material: Option<Rc<Material>>) {
        self.replacement_material = material;
    }

    /// Sorted render buckets
    pub fn buckets(&self) -> &RenderBuckets {
        &self.buckets
    }

    /// Pass uniforms of the last rendered frame
    pub fn uniforms(&self) -> &EngineUniforms {
        &self.uniforms
    }

    /// Number of picks waiting for the next rendered frame
    pub fn pending_picks(&self) -> usize {
        self.pick_requests.len()
    }

    /// Pick the object under a window pixel (origin top-left)
    ///
    /// The callback runs on a later frame, once per entity hit, with the
    /// number of pixels the entity covered. It never runs before this call
    /// returns.
    pub fn pick(&mut self, x: u32, y: u32, callback: PickCallback) {
        self.pick_region(x, y, 1, 1, callback);
    }

    /// Pick every object inside a window rectangle (origin top-left)
    pub fn pick_region(&mut self, x: u32, y: u32, width: u32, height: u32, callback: PickCallback) {
        self.pick_requests.push(PickRequest::new(x, y, width, height, callback));
    }

    /// Pixel viewport on a surface of the given size
    pub fn viewport(&self, surface_width: u32, surface_height: u32) -> Viewport {
        let [x, y, width, height] = self.normalized_viewport_rect;
        let (w, h) = (surface_width as f32, surface_height as f32);
        Viewport {
            x: (x * w) as u32,
            y: (y * h) as u32,
            width: (width * w) as u32,
            height: (height * h) as u32,
        }
    }

    /// Projection matrix for the given aspect ratio
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        if self.perspective {
            Mat4::perspective_gl(self.field_of_view, aspect, self.near, self.far)
        } else {
            Mat4::orthographic_gl(self.left, self.right, self.bottom, self.top, self.near, self.far)
        }
    }

    pub(crate) fn activate(&mut self, config: &EngineConfig) {
        self.config = config.clone();
        self.activated = true;
        if self.render_shadow && !self.config.shadows {
            log::error!("Shadows are disabled in the engine config; camera will not render shadows");
        }
    }

    pub(crate) fn deactivate(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(target) = self.picking_target.take() {
            backend.destroy_render_target(&target);
        }
        if !self.pick_requests.is_empty() {
            log::debug!("Dropping {} pick requests of a removed camera", self.pick_requests.len());
            self.pick_requests.clear();
        }
        self.buckets.clear();
        self.activated = false;
    }

    /// Render one frame of the scene from this camera
    pub fn render_scene(&mut self, frame: &mut CameraFrame<'_>) -> SceneResult<()> {
        if !self.enabled {
            return Ok(());
        }
        let Some(node) = frame.scene.entity(frame.entity).map(|e| e.transform()) else {
            return Ok(());
        };
        let transforms = frame.scene.transforms;
        let camera_position = transforms.position(node).unwrap_or_else(Vec3::zeros);
        let camera_rotation = transforms.rotation(node).unwrap_or_else(Quat::identity);
        let view_matrix = transforms.global_inverse(node).unwrap_or_else(Mat4::identity);

        let light_matrix = self.render_shadow_pass(frame, camera_position, camera_rotation)?;

        let (surface_width, surface_height) = match &self.render_target {
            Some(target) => (target.width, target.height),
            None => frame.backend.viewport_size(),
        };
        let viewport = self.viewport(surface_width, surface_height);
        frame.backend.bind_render_target(self.render_target.as_ref())?;
        frame.backend.set_viewport(viewport);
        if !self.clear_flags.is_empty() {
            frame.backend.clear(self.clear_color, self.clear_flags);
        }

        let projection_matrix = self.projection_matrix(viewport.aspect_ratio());
        let uniforms = EngineUniforms {
            view_matrix,
            projection_matrix,
            view_projection_matrix: projection_matrix * view_matrix,
            light_matrix,
            camera_position,
        };

        let scene = &frame.scene;
        frame.lights.recompute_light(&view_matrix, |id| scene.light_sample(id));

        if !self.buckets.bucket(Bucket::Transparent).is_empty() {
            self.buckets.sort_back_to_front(Bucket::Transparent, |id| {
                scene.component_position(id).map(|p| (p - camera_position).norm_squared())
            });
        }

        let frustum = Frustum::from_matrix(&uniforms.view_projection_matrix);
        let replacement = self.replacement_material.as_deref();
        self.draw_buckets(scene, frame.lights, &mut *frame.backend, &uniforms, &frustum, replacement)?;

        if let Some(target) = &self.render_target {
            if target.generate_mipmaps {
                frame.backend.generate_mipmaps(target)?;
            }
        }

        let picked = self.render_picking(frame, &uniforms, &frustum, viewport)?;
        if self.render_target.is_some() || picked {
            frame.backend.bind_render_target(None)?;
        }
        self.uniforms = uniforms;
        Ok(())
    }

    fn render_shadow_pass(
        &mut self,
        frame: &mut CameraFrame<'_>,
        camera_position: Vec3,
        camera_rotation: Quat,
    ) -> SceneResult<Mat4> {
        let light = frame.lights.directional_light().and_then(|id| frame.scene.light_sample(id));
        let Some(light) = light.filter(|l| l.shadow) else {
            if light.is_some() {
                if let Some(target) = frame.lights.set_shadow_target(None) {
                    log::debug!("Directional light stopped casting shadows, releasing shadow map");
                    frame.backend.destroy_render_target(&target);
                }
            }
            return Ok(Mat4::identity());
        };
        if !self.render_shadow || !self.config.shadows {
            return Ok(Mat4::identity());
        }

        let target = match frame.lights.shadow_target() {
            Some(target) => *target,
            None => {
                let size = self.config.shadow_map_size(frame.backend.max_texture_size());
                let target = frame.backend.create_render_target(size, size, false)?;
                log::debug!("Created {size}x{size} shadow map");
                frame.lights.set_shadow_target(Some(target));
                target
            }
        };

        let offset = self.config.shadow_distance * 0.5;
        let radius = offset * SHADOW_RADIUS_FACTOR;
        let near = -radius * self.config.shadow_near_multiplier;
        let projection_matrix = Mat4::orthographic_gl(-radius, radius, -radius, radius, near, radius);

        // Whole units keep the shadow map texels stable while the camera turns
        let center = utils::round_vec3(camera_position + camera_rotation * Vec3::new(0.0, 0.0, -offset));
        let view_matrix = Mat4::from_trs_inverse(&center, &light.rotation, &Vec3::new(1.0, 1.0, 1.0));
        let view_projection_matrix = projection_matrix * view_matrix;
        let uniforms = EngineUniforms {
            view_matrix,
            projection_matrix,
            view_projection_matrix,
            light_matrix: Mat4::identity(),
            camera_position: center,
        };

        frame.backend.bind_render_target(Some(&target))?;
        frame.backend.set_viewport(Viewport::full(target.width, target.height));
        frame.backend.clear([1.0; 4], ClearFlags::COLOR | ClearFlags::DEPTH);
        let frustum = Frustum::from_matrix(&view_projection_matrix);
        let shadow_material = Rc::clone(&self.shadow_material);
        self.draw_buckets(
            &frame.scene,
            frame.lights,
            &mut *frame.backend,
            &uniforms,
            &frustum,
            Some(&shadow_material),
        )?;

        Ok(Mat4::clip_to_texture_offset() * view_projection_matrix)
    }

    fn draw_buckets(
        &self,
        scene: &SceneView<'_>,
        lights: &SceneLights,
        backend: &mut dyn RenderBackend,
        uniforms: &EngineUniforms,
        frustum: &Frustum,
        replacement_material: Option<&Material>,
    ) -> SceneResult<()> {
        let mut culled = 0;
        for bucket in Bucket::ALL {
            for item in self.buckets.bucket(bucket) {
                let Some(slot) = scene.component(item.component) else { continue };
                let Some(kind) = slot.kind() else { continue };
                let Some(entity) = scene.entity(slot.owner()) else { continue };
                let model_matrix = scene
                    .transforms
                    .global_matrix(entity.transform())
                    .unwrap_or_else(Mat4::identity);

                if let Some(aabb) = kind.aabb() {
                    if !frustum.intersects_aabb(&aabb.transform(&model_matrix)) {
                        culled += 1;
                        continue;
                    }
                }

                let object = ObjectUniforms::new(model_matrix, uniforms, entity.uid());
                let ctx = RenderContext {
                    engine: uniforms,
                    lights,
                    object: &object,
                    replacement_material,
                };
                kind.render(&ctx, backend)?;
            }
        }
        if culled > 0 {
            log::trace!("Frustum culled {culled} units");
        }
        Ok(())
    }

    fn render_picking(
        &mut self,
        frame: &mut CameraFrame<'_>,
        uniforms: &EngineUniforms,
        frustum: &Frustum,
        viewport: Viewport,
    ) -> SceneResult<bool> {
        if self.pick_requests.is_empty() {
            return Ok(false);
        }
        let (width, height) = (viewport.width.max(1), viewport.height.max(1));
        let target = match self.picking_target {
            Some(target) if target.width == width && target.height == height => target,
            stale => {
                if let Some(old) = stale {
                    frame.backend.destroy_render_target(&old);
                }
                let target = frame.backend.create_render_target(width, height, false)?;
                self.picking_target = Some(target);
                target
            }
        };

        frame.backend.bind_render_target(Some(&target))?;
        frame.backend.set_viewport(Viewport::full(width, height));
        frame.backend.clear([0.0; 4], ClearFlags::COLOR | ClearFlags::DEPTH);
        let picking_material = Rc::clone(&self.picking_material);
        self.draw_buckets(
            &frame.scene,
            frame.lights,
            &mut *frame.backend,
            uniforms,
            frustum,
            Some(&picking_material),
        )?;

        for request in std::mem::take(&mut self.pick_requests) {
            let pixels = frame.backend.read_pixels(
                request.x,
                request.read_back_y(height),
                request.width,
                request.height,
            )?;
            for (uid, count) in picking::count_hits(&pixels) {
                let Some(entity) = frame.scene.entity_by_uid(uid) else {
                    log::trace!("Picked uid {uid} does not belong to an entity");
                    continue;
                };
                let callback = Rc::clone(&request.callback);
                frame.tasks.post(
                    frame.frame + 1,
                    Box::new(move |scene| {
                        let mut callback = callback.borrow_mut();
                        (&mut **callback)(scene, entity, count);
                    }),
                );
            }
        }
        Ok(true)
    }

    /// Drop all bucket contents and re-register from a unit list
    pub(crate) fn rebuild(&mut self, scene: &SceneView<'_>, components: &[ComponentId]) {
        self.buckets.clear();
        self.components_added(scene, components);
    }

    fn config(&self) -> CameraConfig {
        CameraConfig {
            enabled: self.enabled,
            render_shadow: self.render_shadow,
            layer_mask: self.layer_mask,
            render_target: self.render_target.map(|t| Reference::new(t.uid)),
            field_of_view: self.field_of_view,
            near: self.near,
            far: self.far,
            perspective: self.perspective,
            left: self.left,
            right: self.right,
            bottom: self.bottom,
            top: self.top,
            camera_index: self.camera_index,
            clear_color: self.clear_color,
            clear_flag_color: self.clear_flags.contains(ClearFlags::COLOR),
            clear_flag_depth: self.clear_flags.contains(ClearFlags::DEPTH),
            normalized_viewport_rect: self.normalized_viewport_rect,
            replacement_material: self.replacement_material.as_ref().map(|m| Reference::new(m.uid)),
        }
    }

    /// Snapshot config
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.config()).unwrap_or(Value::Null)
    }

    /// Restore from a snapshot config
    ///
    /// Fields of the wrong type fail with a configuration error; references
    /// that cannot be resolved are skipped with a warning.
    pub fn apply_config(&mut self, config: &Value, refs: &ReferenceResolver<'_>) -> SceneResult<()> {
        let config: CameraConfig =
            serde_json::from_value(config.clone()).map_err(|e| SceneError::Configuration(e.to_string()))?;
        self.enabled = config.enabled;
        self.set_render_shadow(config.render_shadow);
        self.layer_mask = config.layer_mask;
        self.set_field_of_view(config.field_of_view)?;
        self.set_clip_planes(config.near, config.far)?;
        self.perspective = config.perspective;
        self.set_orthographic_bounds(config.left, config.right, config.bottom, config.top)?;
        self.camera_index = config.camera_index;
        self.clear_color = config.clear_color;
        self.setup_clear_flags(config.clear_flag_color, config.clear_flag_depth);
        self.normalized_viewport_rect = config.normalized_viewport_rect;
        self.render_target = config.render_target.and_then(|r| refs.render_target(r));
        self.replacement_material = config.replacement_material.and_then(|r| refs.material(r));
        Ok(())
    }
}

impl ComponentListener for Camera {
    fn components_added(&mut self, scene: &SceneView<'_>, components: &[ComponentId]) {
        for &id in components {
            let Some(slot) = scene.component(id) else { continue };
            if !slot.capabilities().contains(Capabilities::RENDER) {
                continue;
            }
            let Some(kind) = slot.kind() else { continue };
            let layer = scene.entity(slot.owner()).map_or(0, |e| e.layer());
            if layer & self.layer_mask == 0 {
                continue;
            }
            let (render_order, shader, mesh) = kind.sort_key();
            self.buckets.insert(RenderItem {
                component: id,
                render_order,
                shader,
                mesh,
            });
        }
    }

    fn components_removed(&mut self, _scene: &SceneView<'_>, components: &[ComponentId]) -> bool {
        let mut removed = false;
        for &id in components {
            removed |= self.buckets.remove(id);
        }
        removed
    }

    fn component_updated(&mut self, scene: &SceneView<'_>, component: ComponentId) {
        // A layer change can move a unit into the mask, so always re-evaluate
        self.components_removed(scene, &[component]);
        self.components_added(scene, &[component]);
    }
}
