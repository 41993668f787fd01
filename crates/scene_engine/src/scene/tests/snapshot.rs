use approx::assert_relative_eq;
use serde_json::json;

use super::*;
use crate::core::SceneError;
use crate::ecs::components::{Camera, LightFactory, LightType, MeshRenderer};
use crate::ecs::{ComponentKind, ComponentType};
use crate::foundation::uid;
use crate::render::{Material, ShaderId};
use crate::scene::{AssetTable, ComponentRegistry, SceneObject};

fn build_scene(assets: &mut AssetTable) -> Scene {
    let mesh = cube();
    let material = Rc::new(Material::new("brick", ShaderId::FIRST_USER));
    assets.add_mesh(Rc::clone(&mesh));
    assets.add_material(Rc::clone(&material));

    let mut scene = test_scene();
    scene.set_name("Level");
    let root = scene.create_entity("root");
    let child = scene.create_entity("child");
    let (root_node, child_node) = (scene.transform_of(root).unwrap(), scene.transform_of(child).unwrap());
    let transforms = scene.transforms_mut();
    transforms.set_local_position(root_node, Vec3::new(0.0, 5.0, 0.0)).unwrap();
    transforms.set_local_position(child_node, Vec3::new(1.0, 0.0, 0.0)).unwrap();
    transforms.set_local_scale(child_node, Vec3::new(2.0, 2.0, 2.0)).unwrap();
    transforms.set_parent(child_node, Some(root_node)).unwrap();
    scene.set_entity_layer(child, 4).unwrap();

    let mut camera = Camera::new();
    camera.set_camera_index(3);
    scene.add_component(root, camera.into()).unwrap();
    scene.add_component(root, LightFactory::directional(Vec3::new(1.0, 0.5, 0.25), 2.0).into()).unwrap();
    let renderer = MeshRenderer::new().with_mesh(mesh).with_materials(vec![material]);
    scene.add_component(child, renderer.into()).unwrap();
    scene
}

#[test]
fn test_snapshot_round_trip() {
    let mut assets = AssetTable::new();
    let original = build_scene(&mut assets);
    let json = original.to_json();
    assert_eq!(json["name"], "Level");
    assert_eq!(json["gameObjects"][0]["components"][0]["type"], "Transform");

    let loaded = Scene::from_json(EngineConfig::default(), &json, &ComponentRegistry::new(), &assets).unwrap();
    assert_eq!(loaded.uid(), original.uid());
    assert_eq!(loaded.number_of_entities(), 2);
    assert_eq!(loaded.to_json(), json);

    let child = loaded.entity_by_name("child").unwrap();
    assert_eq!(loaded.entity(child).unwrap().layer(), 4);
    let node = loaded.transform_of(child).unwrap();
    assert_relative_eq!(loaded.transforms().position(node).unwrap(), Vec3::new(1.0, 5.0, 0.0), epsilon = 1e-6);

    let renderer = loaded.component_of_type(child, ComponentType::MeshRenderer).unwrap();
    let renderer = loaded.component(renderer).and_then(ComponentKind::as_mesh_renderer).unwrap();
    assert_eq!(renderer.materials().len(), 1);
    assert_eq!(renderer.material().unwrap().name, "brick");

    let root = loaded.entity_by_name("root").unwrap();
    let light = loaded.component_of_type(root, ComponentType::Light).unwrap();
    let light = loaded.component(light).and_then(ComponentKind::as_light).unwrap();
    assert_eq!(light.light_type(), LightType::Directional);
    assert_relative_eq!(light.intensity(), 2.0);
}

#[test]
fn test_uids_are_preserved_and_reserved() {
    let snapshot = json!({
        "uid": 900_001,
        "name": "Reserved",
        "gameObjects": [{
            "name": "thing",
            "uid": 900_002,
            "components": [{ "type": "Transform", "uid": 900_003, "config": {} }]
        }]
    });
    let scene = Scene::from_json(EngineConfig::default(), &snapshot, &ComponentRegistry::new(), &AssetTable::new()).unwrap();
    let entity = scene.entity_by_name("thing").unwrap();
    assert_eq!(scene.object_by_uid(900_002), Some(SceneObject::Entity(entity)));
    assert_eq!(scene.object_by_uid(900_003), Some(SceneObject::Transform(entity)));
    assert!(uid::next_uid() > 900_003);
}

#[test]
fn test_unknown_component_type_is_skipped() {
    let snapshot = json!({
        "gameObjects": [{
            "name": "odd",
            "uid": 910_001,
            "components": [
                { "type": "Transform", "uid": 910_002, "config": { "localPosition": [1.0, 2.0, 3.0] } },
                { "type": "Teleporter", "uid": 910_003, "config": { "range": 4 } },
                { "type": "Camera", "uid": 910_004, "config": { "cameraIndex": 7 } }
            ]
        }]
    });
    let scene = Scene::from_json(EngineConfig::default(), &snapshot, &ComponentRegistry::new(), &AssetTable::new()).unwrap();
    let entity = scene.entity_by_name("odd").unwrap();
    assert_eq!(scene.entity(entity).unwrap().components().len(), 1);
    assert!(scene.object_by_uid(910_003).is_none());

    let camera = scene.component_of_type(entity, ComponentType::Camera).unwrap();
    assert_eq!(scene.component(camera).and_then(ComponentKind::as_camera).unwrap().camera_index(), 7);
    let node = scene.transform_of(entity).unwrap();
    assert_relative_eq!(scene.transforms().position(node).unwrap(), Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn test_registered_behaviour_is_created() {
    let log = EventLog::default();
    let mut registry = ComponentRegistry::new();
    let shared = Rc::clone(&log);
    registry.register("Recorder", Box::new(move || Box::new(Recorder::new("loaded", 0, &shared))));

    let snapshot = json!({
        "gameObjects": [{
            "uid": 920_001,
            "components": [{ "type": "Recorder", "uid": 920_002 }]
        }]
    });
    let mut scene = Scene::from_json(EngineConfig::default(), &snapshot, &registry, &AssetTable::new()).unwrap();
    let mut backend = HeadlessBackend::new(8, 8);
    let mut tasks = TaskQueue::new();
    run_frame(&mut scene, &mut backend, &mut tasks, 1);
    assert_eq!(take_log(&log), ["loaded:activated", "loaded:update"]);
}

#[test]
fn test_second_transform_is_rejected() {
    let snapshot = json!({
        "gameObjects": [{
            "uid": 930_001,
            "components": [
                { "type": "Transform", "uid": 930_002 },
                { "type": "Transform", "uid": 930_003 }
            ]
        }]
    });
    let result = Scene::from_json(EngineConfig::default(), &snapshot, &ComponentRegistry::new(), &AssetTable::new());
    assert!(matches!(result, Err(SceneError::DuplicateTransform)));
}

#[test]
fn test_unresolved_references_are_skipped() {
    let snapshot = json!({
        "gameObjects": [{
            "name": "orphan",
            "uid": 940_001,
            "components": [
                { "type": "Transform", "uid": 940_002, "config": { "parent": { "ref": 123_456_789 } } },
                { "type": "MeshRenderer", "uid": 940_003, "config": { "mesh": { "ref": 5 }, "materials": [{ "ref": 6 }] } }
            ]
        }]
    });
    let scene = Scene::from_json(EngineConfig::default(), &snapshot, &ComponentRegistry::new(), &AssetTable::new()).unwrap();
    let entity = scene.entity_by_name("orphan").unwrap();
    let node = scene.transform_of(entity).unwrap();
    assert!(scene.transforms().parent(node).is_none());

    let renderer = scene.component_of_type(entity, ComponentType::MeshRenderer).unwrap();
    let renderer = scene.component(renderer).and_then(ComponentKind::as_mesh_renderer).unwrap();
    assert!(renderer.mesh().is_none());
    assert!(renderer.materials().is_empty());
}

#[test]
fn test_filtered_snapshot() {
    let mut assets = AssetTable::new();
    let scene = build_scene(&mut assets);
    let json = scene.to_json_filtered(|entity| entity.layer() == 4);
    let objects = json["gameObjects"].as_array().unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0]["name"], "child");
}
