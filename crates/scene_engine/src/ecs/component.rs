//! Units attached to entities
//!
//! A unit is stored as a [`ComponentKind`]: one of the built-in kinds or a
//! user [`Behaviour`]. What a unit can do is captured once, when it is added
//! to a scene, as a [`Capabilities`] set; the scene dispatches on those flags
//! instead of probing the unit every frame.

use std::any::Any;

use bitflags::bitflags;
use serde_json::Value;
use slotmap::new_key_type;

use crate::core::SceneResult;
use crate::ecs::components::{Camera, Light, MeshRenderer};
use crate::ecs::EntityId;
use crate::render::{RenderBackend, RenderResult, ShaderId};
use crate::scene::render_queue::DEFAULT_RENDER_ORDER;
use crate::scene::serialization::ReferenceResolver;
use crate::scene::{RenderContext, UpdateContext, AABB};

new_key_type! {
    /// Generation-checked handle to a unit in a scene
    pub struct ComponentId;
}

bitflags! {
    /// Optional hooks a unit takes part in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Receives `activated` when the scene admits it
        const ACTIVATED = 1;
        /// Receives `deactivated` when the scene removes it
        const DEACTIVATED = 1 << 1;
        /// Receives `update` every frame
        const UPDATE = 1 << 2;
        /// Drawn by cameras whose layer mask matches its entity
        const RENDER = 1 << 3;
        /// Written to scene snapshots
        const SERIALIZE = 1 << 4;
    }
}

/// Type tag of a unit, used by queries and snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// [`Camera`]
    Camera,
    /// [`Light`]
    Light,
    /// [`MeshRenderer`]
    MeshRenderer,
    /// A behaviour, identified by its type name
    Behaviour(&'static str),
}

impl ComponentType {
    /// Name written in the `type` field of a snapshot
    pub fn name(&self) -> &'static str {
        match self {
            Self::Camera => "Camera",
            Self::Light => "Light",
            Self::MeshRenderer => "MeshRenderer",
            Self::Behaviour(name) => name,
        }
    }
}

/// User-defined unit logic
///
/// Every hook is optional. `capabilities` and `script_priority` are read once
/// when the unit is added to a scene and must not change afterwards.
pub trait Behaviour: Any {
    /// Name used for queries and snapshot `type` fields
    fn type_name(&self) -> &'static str;

    /// Hooks this behaviour takes part in
    fn capabilities(&self) -> Capabilities {
        Capabilities::UPDATE
    }

    /// Update order; higher runs first
    fn script_priority(&self) -> i32 {
        0
    }

    /// Called once when the scene admits the unit
    fn activated(&mut self, _ctx: &mut UpdateContext<'_>) {}

    /// Called once when the scene removes the unit
    fn deactivated(&mut self, _ctx: &mut UpdateContext<'_>) {}

    /// Called every frame, highest script priority first
    fn update(&mut self, _ctx: &mut UpdateContext<'_>) {}

    /// Render-order hint; `None` uses the default
    fn render_order(&self) -> Option<i32> {
        None
    }

    /// Object-space bounds; units without bounds are never culled
    fn aabb(&self) -> Option<AABB> {
        None
    }

    /// Issue draw calls
    fn render(&self, _ctx: &RenderContext<'_>, _backend: &mut dyn RenderBackend) -> RenderResult<()> {
        Ok(())
    }

    /// Snapshot config, `None` if the behaviour is not serializable
    fn to_json(&self) -> Option<Value> {
        None
    }

    /// Restore from a snapshot config
    fn apply_config(&mut self, _config: &Value, _refs: &ReferenceResolver<'_>) -> SceneResult<()> {
        Ok(())
    }

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A unit as stored by the scene
pub enum ComponentKind {
    /// Viewpoint
    Camera(Box<Camera>),
    /// Light source
    Light(Light),
    /// Mesh + materials
    MeshRenderer(MeshRenderer),
    /// User logic
    Behaviour(Box<dyn Behaviour>),
}

impl std::fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Camera(camera) => f.debug_tuple("Camera").field(camera).finish(),
            Self::Light(light) => f.debug_tuple("Light").field(light).finish(),
            Self::MeshRenderer(renderer) => f.debug_tuple("MeshRenderer").field(renderer).finish(),
            Self::Behaviour(behaviour) => f.debug_tuple("Behaviour").field(&behaviour.type_name()).finish(),
        }
    }
}

impl From<Camera> for ComponentKind {
    fn from(camera: Camera) -> Self {
        Self::Camera(Box::new(camera))
    }
}

impl From<Light> for ComponentKind {
    fn from(light: Light) -> Self {
        Self::Light(light)
    }
}

impl From<MeshRenderer> for ComponentKind {
    fn from(renderer: MeshRenderer) -> Self {
        Self::MeshRenderer(renderer)
    }
}

impl ComponentKind {
    /// Wrap a behaviour
    pub fn behaviour(behaviour: impl Behaviour) -> Self {
        Self::Behaviour(Box::new(behaviour))
    }

    /// Type tag
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Camera(_) => ComponentType::Camera,
            Self::Light(_) => ComponentType::Light,
            Self::MeshRenderer(_) => ComponentType::MeshRenderer,
            Self::Behaviour(b) => ComponentType::Behaviour(b.type_name()),
        }
    }

    /// Snapshot type name
    pub fn type_name(&self) -> &'static str {
        self.component_type().name()
    }

    /// Hooks this unit takes part in
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Camera(_) | Self::Light(_) => {
                Capabilities::ACTIVATED | Capabilities::DEACTIVATED | Capabilities::SERIALIZE
            }
            Self::MeshRenderer(_) => Capabilities::ACTIVATED | Capabilities::RENDER | Capabilities::SERIALIZE,
            Self::Behaviour(b) => b.capabilities(),
        }
    }

    /// Update and activation order; higher first
    pub fn script_priority(&self) -> i32 {
        match self {
            Self::Behaviour(b) => b.script_priority(),
            _ => 0,
        }
    }

    /// Render order used for bucket assignment
    pub fn render_order(&self) -> i32 {
        match self {
            Self::MeshRenderer(renderer) => renderer.render_order(),
            Self::Behaviour(b) => b.render_order().unwrap_or(DEFAULT_RENDER_ORDER),
            _ => DEFAULT_RENDER_ORDER,
        }
    }

    /// Sort key within a bucket: render order, then shader, then mesh
    pub fn sort_key(&self) -> (i32, ShaderId, u32) {
        match self {
            Self::MeshRenderer(renderer) => (
                renderer.render_order(),
                renderer.material().map_or(ShaderId::DEFAULT, |m| m.shader),
                renderer.mesh().map_or(0, |m| m.uid),
            ),
            _ => (self.render_order(), ShaderId::DEFAULT, 0),
        }
    }

    /// Object-space bounds
    pub fn aabb(&self) -> Option<AABB> {
        match self {
            Self::MeshRenderer(renderer) => renderer.aabb(),
            Self::Behaviour(b) => b.aabb(),
            _ => None,
        }
    }

    /// Issue draw calls for a renderable unit
    pub fn render(&self, ctx: &RenderContext<'_>, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        match self {
            Self::MeshRenderer(renderer) => renderer.render(ctx, backend),
            Self::Behaviour(b) => b.render(ctx, backend),
            _ => Ok(()),
        }
    }

    /// Snapshot config
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::Camera(camera) => Some(camera.to_json()),
            Self::Light(light) => serde_json::to_value(light).ok(),
            Self::MeshRenderer(renderer) => Some(renderer.to_json()),
            Self::Behaviour(b) => b.to_json(),
        }
    }

    /// Restore from a snapshot config
    pub fn apply_config(&mut self, config: &Value, refs: &ReferenceResolver<'_>) -> SceneResult<()> {
        match self {
            Self::Camera(camera) => camera.apply_config(config, refs),
            Self::Light(light) => {
                *light = serde_json::from_value(config.clone())?;
                Ok(())
            }
            Self::MeshRenderer(renderer) => renderer.apply_config(config, refs),
            Self::Behaviour(b) => b.apply_config(config, refs),
        }
    }

    /// Camera, if this unit is one
    pub fn as_camera(&self) -> Option<&Camera> {
        match self {
            Self::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// Mutable camera, if this unit is one
    pub fn as_camera_mut(&mut self) -> Option<&mut Camera> {
        match self {
            Self::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// Light, if this unit is one
    pub fn as_light(&self) -> Option<&Light> {
        match self {
            Self::Light(light) => Some(light),
            _ => None,
        }
    }

    /// Mutable light, if this unit is one
    pub fn as_light_mut(&mut self) -> Option<&mut Light> {
        match self {
            Self::Light(light) => Some(light),
            _ => None,
        }
    }

    /// Mesh renderer, if this unit is one
    pub fn as_mesh_renderer(&self) -> Option<&MeshRenderer> {
        match self {
            Self::MeshRenderer(renderer) => Some(renderer),
            _ => None,
        }
    }

    /// Mutable mesh renderer, if this unit is one
    pub fn as_mesh_renderer_mut(&mut self) -> Option<&mut MeshRenderer> {
        match self {
            Self::MeshRenderer(renderer) => Some(renderer),
            _ => None,
        }
    }

    /// Concrete behaviour, if this unit is a `T`
    pub fn as_behaviour<T: Behaviour>(&self) -> Option<&T> {
        match self {
            Self::Behaviour(b) => b.as_any().downcast_ref(),
            _ => None,
        }
    }

    /// Mutable concrete behaviour, if this unit is a `T`
    pub fn as_behaviour_mut<T: Behaviour>(&mut self) -> Option<&mut T> {
        match self {
            Self::Behaviour(b) => b.as_any_mut().downcast_mut(),
            _ => None,
        }
    }
}

/// Where a unit is in the add/remove protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    /// Staged; activated at the next flush
    PendingAdd,
    /// Registered with every index
    Active,
    /// Staged for removal at the next flush; no further updates
    PendingRemoval,
}

/// A unit plus the bookkeeping the scene keeps for it
#[derive(Debug)]
pub struct ComponentSlot {
    pub(crate) uid: u32,
    pub(crate) owner: EntityId,
    pub(crate) capabilities: Capabilities,
    pub(crate) script_priority: i32,
    pub(crate) state: ComponentState,
    /// Empty only while the unit is running one of its own hooks
    pub(crate) kind: Option<ComponentKind>,
}

impl ComponentSlot {
    pub(crate) fn new(uid: u32, owner: EntityId, kind: ComponentKind) -> Self {
        Self {
            uid,
            owner,
            capabilities: kind.capabilities(),
            script_priority: kind.script_priority(),
            state: ComponentState::PendingAdd,
            kind: Some(kind),
        }
    }

    /// Process-unique id
    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Owning entity
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Capabilities captured when the unit was added
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Script priority captured when the unit was added
    pub fn script_priority(&self) -> i32 {
        self.script_priority
    }

    /// Lifecycle state
    pub fn state(&self) -> ComponentState {
        self.state
    }

    /// The unit, `None` while one of its own hooks is running
    pub fn kind(&self) -> Option<&ComponentKind> {
        self.kind.as_ref()
    }
}
