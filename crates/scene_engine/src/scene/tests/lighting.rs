use approx::assert_relative_eq;

use super::*;
use crate::core::SceneError;
use crate::ecs::components::{Camera, LightFactory, LightType};
use crate::ecs::{ComponentId, ComponentKind};
use crate::render::BackendCommand;
use crate::scene::lights::LIGHT_BLOCK_SIZE;

fn white() -> Vec3 {
    Vec3::new(1.0, 1.0, 1.0)
}

fn add_point_light(scene: &mut Scene, position: Vec3) -> Result<ComponentId, SceneError> {
    let entity = scene.create_entity("point");
    let node = scene.transform_of(entity).unwrap();
    scene.transforms_mut().set_local_position(node, position).unwrap();
    scene.add_component(entity, LightFactory::point(white(), 1.0, Vec3::new(1.0, 0.0, 0.0)).into())
}

#[test]
fn test_duplicate_ambient_leaves_original() {
    let mut scene = test_scene();
    let mut backend = HeadlessBackend::new(64, 64);
    let mut tasks = TaskQueue::new();
    let entity = scene.create_entity("lights");
    let first = scene.add_component(entity, LightFactory::ambient(white(), 0.2).into()).unwrap();

    let second = scene.add_component(entity, LightFactory::ambient(white(), 0.8).into());
    assert!(matches!(second, Err(SceneError::DuplicateLight(LightType::Ambient))));

    run_frame(&mut scene, &mut backend, &mut tasks, 1);
    assert_eq!(scene.lights().ambient_light(), Some(first));
    assert_eq!(scene.entity(entity).unwrap().components(), [first]);
}

#[test]
fn test_point_light_capacity_through_scene() {
    let capacity = 3;
    let mut scene = Scene::new(EngineConfig::default().with_max_lights(capacity));
    let mut backend = HeadlessBackend::new(64, 64);
    let mut tasks = TaskQueue::new();

    for i in 0..capacity {
        add_point_light(&mut scene, Vec3::new(i as f32, 0.0, 0.0)).unwrap();
    }
    let overflow = add_point_light(&mut scene, Vec3::zeros());
    assert!(matches!(overflow, Err(SceneError::CapacityExceeded { max: 3 })));

    run_frame(&mut scene, &mut backend, &mut tasks, 1);
    assert_eq!(scene.lights().number_of_point_lights(), capacity);
}

#[test]
fn test_light_replaced_within_one_frame() {
    let mut scene = test_scene();
    let mut backend = HeadlessBackend::new(64, 64);
    let mut tasks = TaskQueue::new();
    let entity = scene.create_entity("sun");
    let old = scene.add_component(entity, LightFactory::directional(white(), 1.0).into()).unwrap();
    run_frame(&mut scene, &mut backend, &mut tasks, 1);

    scene.remove_component(old).unwrap();
    let new = scene.add_component(entity, LightFactory::directional(white(), 0.5).into()).unwrap();
    run_frame(&mut scene, &mut backend, &mut tasks, 2);
    assert_eq!(scene.lights().directional_light(), Some(new));
}

#[test]
fn test_removing_middle_point_light_compacts_data() {
    let mut scene = test_scene();
    let mut backend = HeadlessBackend::new(64, 64);
    let mut tasks = TaskQueue::new();
    let camera = scene.create_entity("camera");
    scene.add_component(camera, Camera::new().into()).unwrap();
    let a = add_point_light(&mut scene, Vec3::new(1.0, 0.0, 0.0)).unwrap();
    let b = add_point_light(&mut scene, Vec3::new(2.0, 0.0, 0.0)).unwrap();
    let c = add_point_light(&mut scene, Vec3::new(3.0, 0.0, 0.0)).unwrap();
    run_frame(&mut scene, &mut backend, &mut tasks, 1);
    assert_eq!(scene.lights().point_lights(), [a, b, c]);

    scene.remove_component(b).unwrap();
    run_frame(&mut scene, &mut backend, &mut tasks, 2);

    let lights = scene.lights();
    assert_eq!(lights.point_lights(), [a, c]);
    let data = lights.point_light_data();
    assert_relative_eq!(data[0], 1.0);
    assert_relative_eq!(data[LIGHT_BLOCK_SIZE], 3.0);
    assert!(data[2 * LIGHT_BLOCK_SIZE..].iter().all(|&v| v == 0.0));
}

#[test]
fn test_light_type_is_fixed_once_active() {
    let mut scene = test_scene();
    let mut backend = HeadlessBackend::new(64, 64);
    let mut tasks = TaskQueue::new();
    let entity = scene.create_entity("lamp");
    let lamp = scene.add_component(entity, LightFactory::ambient(white(), 1.0).into()).unwrap();
    run_frame(&mut scene, &mut backend, &mut tasks, 1);

    let result = scene
        .update_component(lamp, |kind| kind.as_light_mut().unwrap().set_light_type(LightType::Point))
        .unwrap();
    assert!(result.is_err());
    assert_eq!(
        scene.component(lamp).and_then(ComponentKind::as_light).unwrap().light_type(),
        LightType::Ambient
    );
}

#[test]
fn test_shadow_map_follows_directional_shadow_flag() {
    let config = EngineConfig::default().with_shadows(true);
    let mut scene = Scene::new(config);
    let mut backend = HeadlessBackend::new(64, 64).with_max_texture_size(1024);
    let mut tasks = TaskQueue::new();

    let mut camera = Camera::new();
    camera.set_render_shadow(true);
    let camera_entity = scene.create_entity("camera");
    scene.add_component(camera_entity, camera.into()).unwrap();
    let sun_entity = scene.create_entity("sun");
    let sun = scene
        .add_component(sun_entity, LightFactory::directional(white(), 1.0).with_shadow(true).into())
        .unwrap();

    run_frame(&mut scene, &mut backend, &mut tasks, 1);
    let target = *scene.lights().shadow_target().unwrap();
    assert_eq!((target.width, target.height), (1024, 1024));
    assert!(backend.commands().contains(&BackendCommand::CreateRenderTarget(target.uid)));

    run_frame(&mut scene, &mut backend, &mut tasks, 2);
    let created = backend
        .commands()
        .iter()
        .filter(|c| matches!(c, BackendCommand::CreateRenderTarget(_)))
        .count();
    assert_eq!(created, 1);

    scene
        .update_component(sun, |kind| kind.as_light_mut().unwrap().set_shadow(false))
        .unwrap();
    run_frame(&mut scene, &mut backend, &mut tasks, 3);
    assert!(scene.lights().shadow_target().is_none());
    assert!(backend.commands().contains(&BackendCommand::DestroyRenderTarget(target.uid)));
}
