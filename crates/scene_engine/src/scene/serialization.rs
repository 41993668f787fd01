//! JSON scene snapshots
//!
//! A scene serializes to `{uid, name, gameObjects}`, each entity to
//! `{name, layer, uid, components}` and each unit to `{type, uid, config}`.
//! The entity's own transform is written first with type `"Transform"`.
//! Cross-references are written as `{"ref": uid}` and resolved on load.
//!
//! Loading runs in two passes: the first creates every entity and unit with
//! its original uid, the second applies configs so that references to objects
//! appearing later in the snapshot resolve. Unknown unit types and unresolved
//! references are logged and skipped.

use std::collections::HashMap;
use std::rc::Rc;

use nalgebra::Quaternion;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{EngineConfig, SceneError, SceneResult};
use crate::ecs::components::{Camera, Light, MeshRenderer};
use crate::ecs::{Behaviour, Capabilities, ComponentId, ComponentKind, EntityId, DEFAULT_LAYER};
use crate::foundation::math::{Quat, Vec3};
use crate::foundation::uid;
use crate::render::{Material, Mesh, RenderTarget};
use crate::scene::{NodeId, Scene, SceneObject, SceneView};

/// Type name of the transform record
pub const TRANSFORM_TYPE: &str = "Transform";

/// `{"ref": uid}` pointer to another object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Uid of the target
    #[serde(rename = "ref")]
    pub uid: u32,
}

impl Reference {
    /// Reference to `uid`
    pub fn new(uid: u32) -> Self {
        Self { uid }
    }
}

/// Resolves asset references that live outside the scene
pub trait AssetLookup {
    /// Mesh by uid
    fn mesh(&self, _uid: u32) -> Option<Rc<Mesh>> {
        None
    }

    /// Material by uid
    fn material(&self, _uid: u32) -> Option<Rc<Material>> {
        None
    }

    /// Render target by uid
    fn render_target(&self, _uid: u32) -> Option<RenderTarget> {
        None
    }
}

/// In-memory asset table
#[derive(Debug, Clone, Default)]
pub struct AssetTable {
    meshes: HashMap<u32, Rc<Mesh>>,
    materials: HashMap<u32, Rc<Material>>,
    render_targets: HashMap<u32, RenderTarget>,
}

impl AssetTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh under its uid
    pub fn add_mesh(&mut self, mesh: Rc<Mesh>) {
        self.meshes.insert(mesh.uid, mesh);
    }

    /// Register a material under its uid
    pub fn add_material(&mut self, material: Rc<Material>) {
        self.materials.insert(material.uid, material);
    }

    /// Register a render target under its uid
    pub fn add_render_target(&mut self, target: RenderTarget) {
        self.render_targets.insert(target.uid, target);
    }
}

impl AssetLookup for AssetTable {
    fn mesh(&self, uid: u32) -> Option<Rc<Mesh>> {
        self.meshes.get(&uid).cloned()
    }

    fn material(&self, uid: u32) -> Option<Rc<Material>> {
        self.materials.get(&uid).cloned()
    }

    fn render_target(&self, uid: u32) -> Option<RenderTarget> {
        self.render_targets.get(&uid).copied()
    }
}

/// Resolves `{"ref": uid}` values while configs are applied
pub struct ReferenceResolver<'a> {
    scene: SceneView<'a>,
    assets: &'a dyn AssetLookup,
}

impl<'a> ReferenceResolver<'a> {
    /// Resolver over a scene and an asset table
    pub fn new(scene: SceneView<'a>, assets: &'a dyn AssetLookup) -> Self {
        Self { scene, assets }
    }

    fn missing<T>(kind: &str, reference: Reference) -> Option<T> {
        log::warn!("Cannot resolve {} reference {}", kind, reference.uid);
        None
    }

    /// Entity referenced by its own uid or its transform's uid
    pub fn entity(&self, reference: Reference) -> Option<EntityId> {
        match self.scene.object_by_uid(reference.uid) {
            Some(SceneObject::Entity(id) | SceneObject::Transform(id)) => Some(id),
            _ => Self::missing("entity", reference),
        }
    }

    /// Transform node of a referenced entity or transform
    pub fn transform(&self, reference: Reference) -> Option<NodeId> {
        let entity = self.entity(reference)?;
        self.scene.entity(entity).map(|e| e.transform())
    }

    /// Referenced unit
    pub fn component(&self, reference: Reference) -> Option<ComponentId> {
        match self.scene.object_by_uid(reference.uid) {
            Some(SceneObject::Component(id)) => Some(id),
            _ => Self::missing("component", reference),
        }
    }

    /// Referenced mesh
    pub fn mesh(&self, reference: Reference) -> Option<Rc<Mesh>> {
        self.assets.mesh(reference.uid).or_else(|| Self::missing("mesh", reference))
    }

    /// Referenced material
    pub fn material(&self, reference: Reference) -> Option<Rc<Material>> {
        self.assets.material(reference.uid).or_else(|| Self::missing("material", reference))
    }

    /// Referenced render target
    pub fn render_target(&self, reference: Reference) -> Option<RenderTarget> {
        self.assets
            .render_target(reference.uid)
            .or_else(|| Self::missing("render target", reference))
    }
}

/// `{type, uid, config}` record of one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    /// Type name
    #[serde(rename = "type")]
    pub component_type: String,
    /// Uid
    pub uid: u32,
    /// Type-specific config
    #[serde(default)]
    pub config: Value,
}

fn default_layer() -> u32 {
    DEFAULT_LAYER
}

/// Snapshot of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Layer bitmask
    #[serde(default = "default_layer")]
    pub layer: u32,
    /// Uid
    pub uid: u32,
    /// Transform first, then units
    #[serde(default)]
    pub components: Vec<ComponentSnapshot>,
}

/// Snapshot of a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    /// Uid
    #[serde(default)]
    pub uid: u32,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Entities in creation order
    #[serde(rename = "gameObjects", default)]
    pub game_objects: Vec<EntitySnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TransformConfig {
    local_position: [f32; 3],
    /// x, y, z, w
    local_rotation: [f32; 4],
    local_scale: [f32; 3],
    parent: Option<Reference>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            local_position: [0.0; 3],
            local_rotation: [0.0, 0.0, 0.0, 1.0],
            local_scale: [1.0; 3],
            parent: None,
        }
    }
}

/// Creates a fresh behaviour for a snapshot type name
pub type BehaviourFactory = Box<dyn Fn() -> Box<dyn Behaviour>>;

/// Unit types known to the loader
///
/// `Camera`, `Light`, and `MeshRenderer` are always known; behaviours are
/// registered by name.
#[derive(Default)]
pub struct ComponentRegistry {
    factories: HashMap<String, BehaviourFactory>,
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("behaviours", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ComponentRegistry {
    /// Registry with only the built-in types
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a behaviour factory under a type name
    pub fn register(&mut self, type_name: impl Into<String>, factory: BehaviourFactory) {
        self.factories.insert(type_name.into(), factory);
    }

    /// Register a default-constructible behaviour under its own type name
    pub fn register_default<T: Behaviour + Default>(&mut self) {
        let name = T::default().type_name();
        self.register(name, Box::new(|| Box::new(T::default())));
    }

    /// Whether a type name can be created
    pub fn contains(&self, type_name: &str) -> bool {
        matches!(type_name, "Camera" | "Light" | "MeshRenderer") || self.factories.contains_key(type_name)
    }

    /// Create a unit with default settings
    pub fn create(&self, type_name: &str) -> SceneResult<ComponentKind> {
        match type_name {
            "Camera" => Ok(Camera::new().into()),
            "Light" => Ok(Light::default().into()),
            "MeshRenderer" => Ok(MeshRenderer::new().into()),
            other => self
                .factories
                .get(other)
                .map(|factory| ComponentKind::Behaviour(factory()))
                .ok_or_else(|| SceneError::UnknownType(other.to_string())),
        }
    }
}

enum PendingConfig<'s> {
    Transform(EntityId, &'s Value),
    Component(ComponentId, &'s Value),
}

impl Scene {
    /// Snapshot of every live entity
    pub fn to_json(&self) -> Value {
        self.to_json_filtered(|_| true)
    }

    /// Snapshot of the entities accepted by `filter`
    pub fn to_json_filtered(&self, filter: impl Fn(&crate::ecs::Entity) -> bool) -> Value {
        let game_objects: Vec<Value> = self
            .entities()
            .iter()
            .filter(|&&id| self.entity(id).is_some_and(|e| !e.is_destroyed() && filter(e)))
            .filter_map(|&id| self.entity_to_json(id))
            .collect();
        serde_json::json!({
            "uid": self.uid(),
            "name": self.name(),
            "gameObjects": game_objects,
        })
    }

    /// Snapshot of one entity: transform first, then serializable units
    pub fn entity_to_json(&self, id: EntityId) -> Option<Value> {
        let entity = self.entity(id)?;
        let mut components = vec![self.transform_to_json(entity.transform())?];
        for &component in entity.components() {
            let Some(slot) = self.component_slot(component) else { continue };
            if !slot.capabilities().contains(Capabilities::SERIALIZE) {
                continue;
            }
            let Some(kind) = slot.kind() else { continue };
            let Some(config) = kind.to_json() else { continue };
            let record = ComponentSnapshot {
                component_type: kind.type_name().to_string(),
                uid: slot.uid(),
                config,
            };
            components.push(serde_json::to_value(record).ok()?);
        }
        Some(entity.base_json(components))
    }

    fn transform_to_json(&self, node: NodeId) -> Option<Value> {
        let transforms = self.transforms();
        let spatial = transforms.get(node)?;
        let rotation = spatial.local_rotation().coords;
        let parent = spatial
            .parent()
            .and_then(|p| transforms.get(p))
            .map(|p| Reference::new(p.uid()));
        let config = TransformConfig {
            local_position: spatial.local_position().into(),
            local_rotation: [rotation.x, rotation.y, rotation.z, rotation.w],
            local_scale: spatial.local_scale().into(),
            parent,
        };
        let record = ComponentSnapshot {
            component_type: TRANSFORM_TYPE.to_string(),
            uid: spatial.uid(),
            config: serde_json::to_value(config).ok()?,
        };
        serde_json::to_value(record).ok()
    }

    /// Rebuild a scene from a snapshot
    ///
    /// Every object keeps its uid, and loaded uids are reserved so later
    /// allocations never collide with them. The scene is admitted on its first
    /// frame like any other.
    pub fn from_json(
        config: EngineConfig,
        json: &Value,
        registry: &ComponentRegistry,
        assets: &dyn AssetLookup,
    ) -> SceneResult<Scene> {
        let snapshot: SceneSnapshot = serde_json::from_value(json.clone())?;
        let mut scene = Scene::new(config);
        if snapshot.uid != 0 {
            uid::reserve_uid(snapshot.uid);
            scene.set_uid(snapshot.uid);
        }
        if !snapshot.name.is_empty() {
            scene.set_name(snapshot.name.clone());
        }

        let mut pending = Vec::new();
        for entity in &snapshot.game_objects {
            scene.create_from_snapshot(entity, registry, &mut pending)?;
        }

        for item in pending {
            match item {
                PendingConfig::Transform(entity, config) => scene.apply_transform_config(entity, config)?,
                PendingConfig::Component(id, config) => {
                    let result = scene.with_component(id, |kind, view| {
                        kind.apply_config(config, &ReferenceResolver::new(*view, assets))
                    });
                    result.unwrap_or(Ok(()))?;
                }
            }
        }
        log::debug!(
            "Loaded scene '{}' with {} entities",
            scene.name(),
            scene.number_of_entities()
        );
        Ok(scene)
    }

    fn create_from_snapshot<'s>(
        &mut self,
        snapshot: &'s EntitySnapshot,
        registry: &ComponentRegistry,
        pending: &mut Vec<PendingConfig<'s>>,
    ) -> SceneResult<()> {
        let mut records = snapshot.components.iter().filter(|c| c.component_type == TRANSFORM_TYPE);
        let transform = records.next();
        if records.next().is_some() {
            return Err(SceneError::DuplicateTransform);
        }

        let transform_uid = transform.map_or_else(uid::next_uid, |t| t.uid);
        uid::reserve_uid(snapshot.uid);
        uid::reserve_uid(transform_uid);
        let entity = self.create_entity_with_uids(snapshot.name.clone(), snapshot.uid, transform_uid);
        self.set_entity_layer(entity, snapshot.layer)?;
        if let Some(transform) = transform {
            pending.push(PendingConfig::Transform(entity, &transform.config));
        }

        for record in snapshot.components.iter().filter(|c| c.component_type != TRANSFORM_TYPE) {
            if self.object_by_uid(record.uid).is_some() {
                return Err(SceneError::AlreadyAttached);
            }
            let kind = match registry.create(&record.component_type) {
                Ok(kind) => kind,
                Err(err) => {
                    log::warn!("{err}; skipping component {}", record.uid);
                    continue;
                }
            };
            uid::reserve_uid(record.uid);

            // Light limits are checked on add, so the type must be known up front
            let kind = match kind {
                ComponentKind::Light(_) => ComponentKind::Light(serde_json::from_value(record.config.clone())?),
                other => other,
            };
            let is_light = matches!(kind, ComponentKind::Light(_));
            match self.add_component_with_uid(entity, kind, record.uid) {
                Ok(id) if !is_light => pending.push(PendingConfig::Component(id, &record.config)),
                Ok(_) => {}
                Err(err @ (SceneError::DuplicateLight(_) | SceneError::CapacityExceeded { .. })) => {
                    log::warn!("{err}; skipping light {}", record.uid);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn apply_transform_config(&mut self, entity: EntityId, config: &Value) -> SceneResult<()> {
        let config: TransformConfig =
            serde_json::from_value(config.clone()).map_err(|e| SceneError::Configuration(e.to_string()))?;
        let node = self.transform_of(entity).ok_or(SceneError::StaleHandle)?;
        let [x, y, z, w] = config.local_rotation;
        let parent = config.parent.and_then(|reference| {
            let resolver = ReferenceResolver::new(self.view(), &NO_ASSETS);
            resolver.transform(reference)
        });

        let transforms = self.transforms_mut();
        transforms.set_local_position(node, Vec3::from(config.local_position))?;
        transforms.set_local_rotation(node, Quat::from_quaternion(Quaternion::new(w, x, y, z)))?;
        transforms.set_local_scale(node, Vec3::from(config.local_scale))?;
        if parent.is_some() {
            transforms.set_parent(node, parent)?;
        }
        Ok(())
    }
}

struct NoAssets;

impl AssetLookup for NoAssets {}

static NO_ASSETS: NoAssets = NoAssets;
