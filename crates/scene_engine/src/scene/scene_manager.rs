//! Scene: entity and unit lifecycle, update and render scheduling
//!
//! The scene owns every entity, transform node, and unit in arenas addressed
//! by generation-checked ids. Structural changes are staged in four buffers
//! (entities to add, entities to remove, units to add, units to remove) and
//! applied once per frame, before anything is iterated:
//!
//! 1. Flush: entity removals, unit removals (`deactivated`, index removal,
//!    listener notification), entity additions, unit additions (`activated`,
//!    index insertion, listener notification)
//! 2. Update every unit in the update index, highest script priority first
//! 3. Render every enabled camera in ascending camera index order
//!
//! A unit added during a frame is therefore never updated or drawn before the
//! next frame, and a unit removed during a frame gets no further updates.

use std::cmp::Reverse;
use std::collections::HashMap;

use slotmap::SlotMap;

use crate::core::{EngineConfig, SceneError, SceneResult};
use crate::ecs::components::{Camera, CameraFrame, LightType};
use crate::ecs::{
    Behaviour, Capabilities, ComponentId, ComponentKind, ComponentSlot, ComponentState, ComponentType, Entity,
    EntityId,
};
use crate::events::TaskQueue;
use crate::foundation::math::Vec3;
use crate::foundation::time::FrameTime;
use crate::foundation::uid;
use crate::render::picking::PickCallback;
use crate::render::{EngineUniforms, Material, ObjectUniforms, RenderBackend};
use crate::scene::lights::{LightSample, SceneLights};
use crate::scene::transform::{NodeId, TransformTree};

/// Borrow the read-only parts of a scene without borrowing the rest
macro_rules! scene_view {
    ($scene:expr) => {
        SceneView {
            transforms: &$scene.transforms,
            entities: &$scene.entities,
            components: &$scene.components,
            objects: &$scene.objects,
        }
    };
}

/// What a uid refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneObject {
    /// An entity
    Entity(EntityId),
    /// The transform node of an entity
    Transform(EntityId),
    /// A unit
    Component(ComponentId),
}

/// Read-only view of a scene handed to listeners and cameras
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    /// Transform hierarchy
    pub transforms: &'a TransformTree,
    entities: &'a SlotMap<EntityId, Entity>,
    components: &'a SlotMap<ComponentId, ComponentSlot>,
    objects: &'a HashMap<u32, SceneObject>,
}

impl<'a> SceneView<'a> {
    /// Look up an entity
    pub fn entity(&self, id: EntityId) -> Option<&'a Entity> {
        self.entities.get(id)
    }

    /// Look up a unit and its bookkeeping
    pub fn component(&self, id: ComponentId) -> Option<&'a ComponentSlot> {
        self.components.get(id)
    }

    /// Resolve a uid
    pub fn object_by_uid(&self, uid: u32) -> Option<SceneObject> {
        self.objects.get(&uid).copied()
    }

    /// Resolve an entity uid
    pub fn entity_by_uid(&self, uid: u32) -> Option<EntityId> {
        match self.objects.get(&uid) {
            Some(SceneObject::Entity(id)) => Some(*id),
            _ => None,
        }
    }

    /// World position of a unit's entity
    pub fn component_position(&self, id: ComponentId) -> Option<Vec3> {
        let entity = self.entity(self.component(id)?.owner())?;
        self.transforms.position(entity.transform())
    }

    /// Current world state of a light unit
    pub fn light_sample(&self, id: ComponentId) -> Option<LightSample> {
        let slot = self.component(id)?;
        let light = slot.kind()?.as_light()?;
        let node = self.entity(slot.owner())?.transform();
        Some(LightSample {
            color_intensity: light.color_intensity(),
            attenuation: light.attenuation(),
            position: self.transforms.position(node)?,
            rotation: self.transforms.rotation(node)?,
            shadow: light.shadow(),
        })
    }
}

/// Access a behaviour gets while one of its hooks runs
///
/// The behaviour itself is out of the scene for the duration of the call, so
/// looking up `component` returns an empty slot.
pub struct UpdateContext<'a> {
    /// The scene; structural changes are staged until the next frame
    pub scene: &'a mut Scene,
    /// The unit whose hook is running
    pub component: ComponentId,
    /// Its entity
    pub entity: EntityId,
    /// Current frame time
    pub time: FrameTime,
}

/// Data a renderable unit draws with
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Pass uniforms
    pub engine: &'a EngineUniforms,
    /// Light data recomputed for the current view
    pub lights: &'a SceneLights,
    /// Object uniforms of the unit's entity
    pub object: &'a ObjectUniforms,
    /// Material to use instead of the unit's own (shadow and picking passes)
    pub replacement_material: Option<&'a Material>,
}

/// Observer of units entering and leaving the active set
///
/// Registering a listener immediately reports every active unit through
/// `components_added`.
pub trait ComponentListener {
    /// Units were activated
    fn components_added(&mut self, scene: &SceneView<'_>, components: &[ComponentId]);

    /// Units were removed; returns whether any of them was tracked
    fn components_removed(&mut self, scene: &SceneView<'_>, components: &[ComponentId]) -> bool;

    /// A tracked unit changed in a way that affects listeners (render order, layer)
    fn component_updated(&mut self, scene: &SceneView<'_>, component: ComponentId) {
        if self.components_removed(scene, &[component]) {
            self.components_added(scene, &[component]);
        }
    }
}

/// Handle returned by [`Scene::add_component_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

/// Scene graph: owns entities and units and schedules their lifecycle
pub struct Scene {
    uid: u32,
    name: String,
    config: EngineConfig,

    transforms: TransformTree,
    entities: SlotMap<EntityId, Entity>,
    components: SlotMap<ComponentId, ComponentSlot>,
    objects: HashMap<u32, SceneObject>,

    /// Every live entity in creation order, including ones not yet admitted
    entity_order: Vec<EntityId>,
    active_entities: Vec<EntityId>,
    /// Admitted units in activation order
    all_components: Vec<ComponentId>,
    /// Units with the update capability, highest script priority first
    update_order: Vec<ComponentId>,
    /// Active cameras in ascending camera index
    cameras: Vec<ComponentId>,
    listeners: Vec<(ListenerId, Box<dyn ComponentListener>)>,
    next_listener_id: u32,
    lights: SceneLights,

    entities_to_add: Vec<EntityId>,
    entities_to_remove: Vec<EntityId>,
    components_to_add: Vec<ComponentId>,
    components_to_remove: Vec<ComponentId>,

    time: FrameTime,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("uid", &self.uid)
            .field("name", &self.name)
            .field("entities", &self.entity_order.len())
            .field("components", &self.all_components.len())
            .field("cameras", &self.cameras.len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Scene {
    /// Create an empty scene
    pub fn new(config: EngineConfig) -> Self {
        let lights = SceneLights::new(config.max_number_of_lights);
        Self {
            uid: uid::next_uid(),
            name: "Scene".to_string(),
            config,
            transforms: TransformTree::new(),
            entities: SlotMap::with_key(),
            components: SlotMap::with_key(),
            objects: HashMap::new(),
            entity_order: Vec::new(),
            active_entities: Vec::new(),
            all_components: Vec::new(),
            update_order: Vec::new(),
            cameras: Vec::new(),
            listeners: Vec::new(),
            next_listener_id: 1,
            lights,
            entities_to_add: Vec::new(),
            entities_to_remove: Vec::new(),
            components_to_add: Vec::new(),
            components_to_remove: Vec::new(),
            time: FrameTime { frame: 0, delta: 0.0, elapsed: 0.0 },
        }
    }

    /// Empty scene with one entity carrying a default camera
    pub fn create_default(config: EngineConfig) -> SceneResult<Self> {
        let mut scene = Self::new(config);
        let entity = scene.create_entity("Camera");
        scene.add_component(entity, Camera::new().into())?;
        Ok(scene)
    }

    /// Process-unique id
    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub(crate) fn set_uid(&mut self, uid: u32) {
        self.uid = uid;
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the display name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Engine settings this scene was created with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Time of the current frame
    pub fn time(&self) -> FrameTime {
        self.time
    }

    /// Read-only view for helpers that take one
    pub fn view(&self) -> SceneView<'_> {
        scene_view!(self)
    }

    // Entities

    /// Create an entity; it is admitted at the next frame but usable right away
    pub fn create_entity(&mut self, name: impl Into<String>) -> EntityId {
        self.create_entity_with_uids(name.into(), uid::next_uid(), uid::next_uid())
    }

    pub(crate) fn create_entity_with_uids(&mut self, name: String, entity_uid: u32, transform_uid: u32) -> EntityId {
        let node = self.transforms.insert_with_uid(transform_uid);
        let id = self.entities.insert(Entity::new(entity_uid, name, node));
        self.objects.insert(entity_uid, SceneObject::Entity(id));
        self.objects.insert(transform_uid, SceneObject::Transform(id));
        self.entity_order.push(id);
        self.entities_to_add.push(id);
        id
    }

    /// Destroy an entity: its units are removed in reverse order, then the entity
    pub fn destroy_entity(&mut self, id: EntityId) -> SceneResult<()> {
        let entity = self.entities.get(id).ok_or(SceneError::StaleHandle)?;
        if entity.destroyed {
            return Ok(());
        }
        let components = entity.components.clone();
        for component in components.into_iter().rev() {
            self.remove_component(component)?;
        }
        if let Some(entity) = self.entities.get_mut(id) {
            entity.destroyed = true;
        }
        self.entities_to_add.retain(|&e| e != id);
        self.entities_to_remove.push(id);
        Ok(())
    }

    /// Look up an entity
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Entity at a position in creation order
    pub fn entity_at(&self, index: usize) -> Option<EntityId> {
        self.entity_order.get(index).copied()
    }

    /// Number of live entities, including ones not yet admitted
    pub fn number_of_entities(&self) -> usize {
        self.entity_order.len()
    }

    /// Live entities in creation order
    pub fn entities(&self) -> &[EntityId] {
        &self.entity_order
    }

    /// Entities admitted by a flush, in admission order
    pub fn active_entities(&self) -> &[EntityId] {
        &self.active_entities
    }

    /// First entity with the given name
    pub fn entity_by_name(&self, name: &str) -> Option<EntityId> {
        self.entity_order
            .iter()
            .copied()
            .find(|&id| self.entities.get(id).is_some_and(|e| e.name == name))
    }

    /// Rename an entity
    pub fn set_entity_name(&mut self, id: EntityId, name: impl Into<String>) -> SceneResult<()> {
        self.entities.get_mut(id).ok_or(SceneError::StaleHandle)?.name = name.into();
        Ok(())
    }

    /// Change an entity's layer; cameras re-evaluate its units
    pub fn set_entity_layer(&mut self, id: EntityId, layer: u32) -> SceneResult<()> {
        let entity = self.entities.get_mut(id).ok_or(SceneError::StaleHandle)?;
        entity.layer = layer;
        let components = entity.components.clone();
        for component in components {
            if self.components.get(component).is_some_and(|s| s.state == ComponentState::Active) {
                self.notify_component_updated(component);
            }
        }
        Ok(())
    }

    /// Transform node of an entity
    pub fn transform_of(&self, entity: EntityId) -> Option<NodeId> {
        self.entities.get(entity).map(|e| e.transform)
    }

    /// Transform hierarchy
    pub fn transforms(&self) -> &TransformTree {
        &self.transforms
    }

    /// Mutable transform hierarchy
    pub fn transforms_mut(&mut self) -> &mut TransformTree {
        &mut self.transforms
    }

    /// Resolve a uid
    pub fn object_by_uid(&self, uid: u32) -> Option<SceneObject> {
        self.objects.get(&uid).copied()
    }

    // Units

    /// Attach a unit to an entity; it is activated at the next frame
    ///
    /// Lights are checked against the light limits right away, counting lights
    /// that are staged but not yet registered.
    pub fn add_component(&mut self, entity: EntityId, kind: ComponentKind) -> SceneResult<ComponentId> {
        self.add_component_with_uid(entity, kind, uid::next_uid())
    }

    pub(crate) fn add_component_with_uid(
        &mut self,
        entity: EntityId,
        kind: ComponentKind,
        uid: u32,
    ) -> SceneResult<ComponentId> {
        let owner = self.entities.get(entity).ok_or(SceneError::StaleHandle)?;
        if owner.destroyed {
            return Err(SceneError::InvalidOperation(format!(
                "Cannot add a component to destroyed entity '{}'",
                owner.name
            )));
        }
        if let ComponentKind::Light(light) = &kind {
            self.check_light(light.light_type())?;
        }
        Ok(self.insert_component(entity, kind, uid))
    }

    fn check_light(&self, light_type: LightType) -> SceneResult<()> {
        let pending: Vec<LightType> = self
            .components_to_add
            .iter()
            .filter_map(|&id| self.components.get(id)?.kind.as_ref()?.as_light())
            .map(|light| light.light_type())
            .collect();
        self.lights.check_add(light_type, &pending, &self.components_to_remove)
    }

    fn insert_component(&mut self, entity: EntityId, kind: ComponentKind, uid: u32) -> ComponentId {
        log::trace!("Staging {} for activation", kind.type_name());
        let id = self.components.insert(ComponentSlot::new(uid, entity, kind));
        self.objects.insert(uid, SceneObject::Component(id));
        if let Some(owner) = self.entities.get_mut(entity) {
            owner.components.push(id);
        }
        self.components_to_add.push(id);
        id
    }

    /// Detach a unit; it is deactivated at the next frame
    ///
    /// A unit that was never activated is dropped immediately without hooks.
    pub fn remove_component(&mut self, id: ComponentId) -> SceneResult<()> {
        let slot = self.components.get_mut(id).ok_or(SceneError::StaleHandle)?;
        match slot.state {
            ComponentState::PendingAdd => {
                self.components_to_add.retain(|&c| c != id);
                self.delete_component(id);
            }
            ComponentState::Active => {
                slot.state = ComponentState::PendingRemoval;
                self.components_to_remove.push(id);
            }
            ComponentState::PendingRemoval => {}
        }
        Ok(())
    }

    fn delete_component(&mut self, id: ComponentId) {
        if let Some(slot) = self.components.remove(id) {
            self.objects.remove(&slot.uid);
            if let Some(owner) = self.entities.get_mut(slot.owner) {
                owner.components.retain(|&c| c != id);
            }
        }
    }

    /// Look up a unit
    pub fn component(&self, id: ComponentId) -> Option<&ComponentKind> {
        self.components.get(id)?.kind.as_ref()
    }

    /// Mutable unit access without notifying listeners
    ///
    /// Use [`Scene::update_component`] for changes that affect render order,
    /// sort keys, camera index, or layer mask.
    pub fn component_mut(&mut self, id: ComponentId) -> Option<&mut ComponentKind> {
        self.components.get_mut(id)?.kind.as_mut()
    }

    /// Unit bookkeeping (owner, capabilities, state)
    pub fn component_slot(&self, id: ComponentId) -> Option<&ComponentSlot> {
        self.components.get(id)
    }

    /// Concrete behaviour of a unit
    pub fn behaviour<T: Behaviour>(&self, id: ComponentId) -> Option<&T> {
        self.component(id)?.as_behaviour()
    }

    /// Mutable concrete behaviour of a unit
    pub fn behaviour_mut<T: Behaviour>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.component_mut(id)?.as_behaviour_mut()
    }

    /// Modify a unit and tell cameras and listeners about it
    pub fn update_component<R>(&mut self, id: ComponentId, f: impl FnOnce(&mut ComponentKind) -> R) -> SceneResult<R> {
        let slot = self.components.get_mut(id).ok_or(SceneError::StaleHandle)?;
        let state = slot.state;
        let kind = slot
            .kind
            .as_mut()
            .ok_or_else(|| SceneError::InvalidOperation("Component is running one of its own hooks".to_string()))?;
        let result = f(kind);
        let is_camera = matches!(kind, ComponentKind::Camera(_));

        if state == ComponentState::Active {
            if is_camera {
                self.sort_cameras();
                let all = self.all_components.clone();
                self.with_camera(id, |camera, view| camera.rebuild(view, &all));
            }
            self.notify_component_updated(id);
        }
        Ok(result)
    }

    /// First unit of a type on an entity
    pub fn component_of_type(&self, entity: EntityId, component_type: ComponentType) -> Option<ComponentId> {
        self.components_of_type(entity, component_type).into_iter().next()
    }

    /// Every unit of a type on an entity, in attach order
    pub fn components_of_type(&self, entity: EntityId, component_type: ComponentType) -> Vec<ComponentId> {
        let Some(entity) = self.entities.get(entity) else {
            return Vec::new();
        };
        entity
            .components
            .iter()
            .copied()
            .filter(|&id| self.component(id).is_some_and(|k| k.component_type() == component_type))
            .collect()
    }

    /// Every unit of a type in the scene, in entity order
    pub fn find_components_of_type(&self, component_type: ComponentType) -> Vec<ComponentId> {
        self.entity_order
            .iter()
            .flat_map(|&entity| self.components_of_type(entity, component_type))
            .collect()
    }

    /// Admitted units in activation order
    pub fn active_components(&self) -> &[ComponentId] {
        &self.all_components
    }

    /// Units receiving `update`, in call order
    pub fn update_order(&self) -> &[ComponentId] {
        &self.update_order
    }

    /// Active cameras in render order
    pub fn cameras(&self) -> &[ComponentId] {
        &self.cameras
    }

    /// Light aggregate
    pub fn lights(&self) -> &SceneLights {
        &self.lights
    }

    /// Queue a pick on a camera; see [`Camera::pick`]
    pub fn pick(&mut self, camera: ComponentId, x: u32, y: u32, callback: PickCallback) -> SceneResult<()> {
        self.pick_region(camera, x, y, 1, 1, callback)
    }

    /// Queue a region pick on a camera; see [`Camera::pick_region`]
    pub fn pick_region(
        &mut self,
        camera: ComponentId,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        callback: PickCallback,
    ) -> SceneResult<()> {
        let camera = self
            .component_mut(camera)
            .and_then(ComponentKind::as_camera_mut)
            .ok_or_else(|| SceneError::InvalidOperation("Picking requires a camera component".to_string()))?;
        camera.pick_region(x, y, width, height, callback);
        Ok(())
    }

    // Listeners

    /// Register a listener; it is told about every active unit right away
    pub fn add_component_listener(&mut self, mut listener: Box<dyn ComponentListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        listener.components_added(&scene_view!(self), &self.all_components);
        self.listeners.push((id, listener));
        log::debug!("Registered component listener {:?}", id);
        id
    }

    /// Unregister a listener
    pub fn remove_component_listener(&mut self, id: ListenerId) -> Option<Box<dyn ComponentListener>> {
        let index = self.listeners.iter().position(|(l, _)| *l == id)?;
        Some(self.listeners.remove(index).1)
    }

    /// Tell cameras and listeners that a unit's render-relevant state changed
    pub fn notify_component_updated(&mut self, id: ComponentId) {
        for camera in self.cameras.clone() {
            self.with_camera(camera, |camera, view| camera.component_updated(view, id));
        }
        let view = scene_view!(self);
        for (_, listener) in &mut self.listeners {
            listener.component_updated(&view, id);
        }
    }

    fn notify_added(&mut self, ids: &[ComponentId]) {
        if ids.is_empty() {
            return;
        }
        for camera in self.cameras.clone() {
            self.with_camera(camera, |camera, view| camera.components_added(view, ids));
        }
        let view = scene_view!(self);
        for (_, listener) in &mut self.listeners {
            listener.components_added(&view, ids);
        }
    }

    fn notify_removed(&mut self, ids: &[ComponentId]) {
        if ids.is_empty() {
            return;
        }
        for camera in self.cameras.clone() {
            self.with_camera(camera, |camera, view| camera.components_removed(view, ids));
        }
        let view = scene_view!(self);
        for (_, listener) in &mut self.listeners {
            listener.components_removed(&view, ids);
        }
    }

    /// Run `f` on a unit taken out of its slot, with a view of the rest of the scene
    pub(crate) fn with_component<R>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut ComponentKind, &SceneView<'_>) -> R,
    ) -> Option<R> {
        let mut kind = self.components.get_mut(id)?.kind.take()?;
        let result = f(&mut kind, &scene_view!(self));
        if let Some(slot) = self.components.get_mut(id) {
            slot.kind = Some(kind);
        }
        Some(result)
    }

    fn with_camera<R>(&mut self, id: ComponentId, f: impl FnOnce(&mut Camera, &SceneView<'_>) -> R) -> Option<R> {
        self.with_component(id, |kind, view| kind.as_camera_mut().map(|camera| f(camera, view)))
            .flatten()
    }

    fn camera_index_of(&self, id: ComponentId) -> i32 {
        self.component(id)
            .and_then(ComponentKind::as_camera)
            .map_or(i32::MAX, Camera::camera_index)
    }

    fn sort_cameras(&mut self) {
        let mut cameras = std::mem::take(&mut self.cameras);
        cameras.sort_by_key(|&id| self.camera_index_of(id));
        self.cameras = cameras;
    }

    fn script_priority_of(&self, id: ComponentId) -> i32 {
        self.components.get(id).map_or(0, |s| s.script_priority)
    }

    // Frame

    /// Apply staged changes, update, then render every camera
    pub fn update_and_render(
        &mut self,
        time: FrameTime,
        backend: &mut dyn RenderBackend,
        tasks: &mut TaskQueue,
    ) -> SceneResult<()> {
        self.time = time;
        self.flush(backend);
        self.update(time);
        self.render(backend, tasks)
    }

    /// Apply every staged addition and removal
    pub fn flush(&mut self, backend: &mut dyn RenderBackend) {
        let removed_entities = std::mem::take(&mut self.entities_to_remove);
        if !removed_entities.is_empty() {
            self.entity_order.retain(|id| !removed_entities.contains(id));
            self.active_entities.retain(|id| !removed_entities.contains(id));
        }

        let removed = std::mem::take(&mut self.components_to_remove);
        if !removed.is_empty() {
            for &id in &removed {
                self.deactivate_component(id, backend);
            }
            self.all_components.retain(|id| !removed.contains(id));
            self.update_order.retain(|id| !removed.contains(id));
            self.cameras.retain(|id| !removed.contains(id));
            self.notify_removed(&removed);
            for &id in &removed {
                self.delete_component(id);
            }
        }

        for id in &removed_entities {
            if let Some(entity) = self.entities.remove(*id) {
                self.objects.remove(&entity.uid);
                if let Some(node) = self.transforms.remove(entity.transform) {
                    self.objects.remove(&node.uid());
                }
            }
        }

        let added_entities = std::mem::take(&mut self.entities_to_add);
        self.active_entities.extend(added_entities);

        let mut added = std::mem::take(&mut self.components_to_add);
        added.retain(|&id| self.components.contains_key(id));
        added.sort_by_key(|&id| Reverse(self.script_priority_of(id)));
        for &id in &added {
            if let Some(slot) = self.components.get_mut(id) {
                slot.state = ComponentState::Active;
            }
        }
        for &id in &added {
            self.all_components.push(id);
            self.activate_component(id);
        }
        self.notify_added(&added);

        if !removed.is_empty() || !added.is_empty() {
            log::trace!(
                "Flushed {} removed and {} added components ({} entities removed)",
                removed.len(),
                added.len(),
                removed_entities.len()
            );
        }
    }

    fn activate_component(&mut self, id: ComponentId) {
        let Some(slot) = self.components.get_mut(id) else { return };
        let (entity, capabilities, priority) = (slot.owner, slot.capabilities, slot.script_priority);
        let Some(mut kind) = slot.kind.take() else { return };

        match &mut kind {
            ComponentKind::Camera(camera) => {
                camera.activate(&self.config);
                let index = camera.camera_index();
                let position = self.cameras.partition_point(|&c| self.camera_index_of(c) <= index);
                self.cameras.insert(position, id);
                camera.components_added(&scene_view!(self), &self.all_components);
                log::debug!("Camera {} activated", index);
            }
            ComponentKind::Light(light) => match self.lights.add(id, light.light_type()) {
                Ok(()) => light.set_activated(true),
                Err(err) => log::error!("Light was not registered: {err}"),
            },
            ComponentKind::MeshRenderer(renderer) => renderer.ensure_material(),
            ComponentKind::Behaviour(behaviour) => {
                if capabilities.contains(Capabilities::ACTIVATED) {
                    let time = self.time;
                    behaviour.activated(&mut UpdateContext { scene: &mut *self, component: id, entity, time });
                }
            }
        }

        if let Some(slot) = self.components.get_mut(id) {
            slot.kind = Some(kind);
        }
        if capabilities.contains(Capabilities::UPDATE) {
            let position = self.update_order.partition_point(|&c| self.script_priority_of(c) >= priority);
            self.update_order.insert(position, id);
        }
    }

    fn deactivate_component(&mut self, id: ComponentId, backend: &mut dyn RenderBackend) {
        let Some(slot) = self.components.get_mut(id) else { return };
        let (entity, capabilities) = (slot.owner, slot.capabilities);
        let Some(mut kind) = slot.kind.take() else { return };

        match &mut kind {
            ComponentKind::Camera(camera) => camera.deactivate(backend),
            ComponentKind::Light(light) => {
                if self.lights.remove(id) == Some(LightType::Directional) {
                    if let Some(target) = self.lights.set_shadow_target(None) {
                        backend.destroy_render_target(&target);
                    }
                }
                light.set_activated(false);
            }
            ComponentKind::MeshRenderer(_) => {}
            ComponentKind::Behaviour(behaviour) => {
                if capabilities.contains(Capabilities::DEACTIVATED) {
                    let time = self.time;
                    behaviour.deactivated(&mut UpdateContext { scene: &mut *self, component: id, entity, time });
                }
            }
        }

        if let Some(slot) = self.components.get_mut(id) {
            slot.kind = Some(kind);
        }
    }

    /// Call `update` on every active unit with the update capability
    pub fn update(&mut self, time: FrameTime) {
        self.time = time;
        for id in self.update_order.clone() {
            let Some(slot) = self.components.get_mut(id) else { continue };
            if slot.state != ComponentState::Active {
                continue;
            }
            let entity = slot.owner;
            let Some(mut kind) = slot.kind.take() else { continue };
            if let ComponentKind::Behaviour(behaviour) = &mut kind {
                behaviour.update(&mut UpdateContext { scene: &mut *self, component: id, entity, time });
            }
            if let Some(slot) = self.components.get_mut(id) {
                slot.kind = Some(kind);
            }
        }
    }

    /// Render every camera in ascending camera index order
    pub fn render(&mut self, backend: &mut dyn RenderBackend, tasks: &mut TaskQueue) -> SceneResult<()> {
        for id in self.cameras.clone() {
            let Some(slot) = self.components.get_mut(id) else { continue };
            let entity = slot.owner;
            let Some(mut kind) = slot.kind.take() else { continue };
            let result = match &mut kind {
                ComponentKind::Camera(camera) => {
                    let mut frame = CameraFrame {
                        scene: scene_view!(self),
                        entity,
                        lights: &mut self.lights,
                        backend: &mut *backend,
                        tasks: &mut *tasks,
                        frame: self.time.frame,
                    };
                    camera.render_scene(&mut frame)
                }
                _ => Ok(()),
            };
            if let Some(slot) = self.components.get_mut(id) {
                slot.kind = Some(kind);
            }
            result?;
        }
        Ok(())
    }
}
