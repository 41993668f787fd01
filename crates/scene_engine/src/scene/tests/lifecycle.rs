use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;

use super::*;
use crate::ecs::{ComponentId, ComponentKind, ComponentState, ComponentType};
use crate::scene::{ComponentListener, SceneView};

/// Adds a recorder to its own entity on its first update
struct Spawner {
    log: EventLog,
    spawned: Option<ComponentId>,
}

impl Behaviour for Spawner {
    fn type_name(&self) -> &'static str {
        "Spawner"
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        if self.spawned.is_none() {
            let recorder = ComponentKind::behaviour(Recorder::new("spawned", 0, &self.log));
            self.spawned = ctx.scene.add_component(ctx.entity, recorder).ok();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Removes a target unit on its first update
struct Remover {
    target: Option<ComponentId>,
}

impl Behaviour for Remover {
    fn type_name(&self) -> &'static str {
        "Remover"
    }

    fn script_priority(&self) -> i32 {
        10
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        if let Some(target) = self.target.take() {
            ctx.scene.remove_component(target).unwrap();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Default)]
struct Tracker {
    added: Rc<RefCell<Vec<ComponentId>>>,
    removed: Rc<RefCell<Vec<ComponentId>>>,
}

impl ComponentListener for Tracker {
    fn components_added(&mut self, _scene: &SceneView<'_>, components: &[ComponentId]) {
        self.added.borrow_mut().extend_from_slice(components);
    }

    fn components_removed(&mut self, _scene: &SceneView<'_>, components: &[ComponentId]) -> bool {
        self.removed.borrow_mut().extend_from_slice(components);
        true
    }
}

#[test]
fn test_unit_added_during_update_waits_for_next_frame() {
    let log = EventLog::default();
    let mut scene = test_scene();
    let mut backend = HeadlessBackend::new(64, 64);
    let mut tasks = TaskQueue::new();
    let entity = scene.create_entity("spawner");
    let spawner = scene
        .add_component(entity, ComponentKind::behaviour(Spawner { log: Rc::clone(&log), spawned: None }))
        .unwrap();

    run_frame(&mut scene, &mut backend, &mut tasks, 1);
    assert!(take_log(&log).is_empty());
    let spawned = scene.behaviour::<Spawner>(spawner).and_then(|s| s.spawned).unwrap();
    assert_eq!(scene.component_slot(spawned).unwrap().state(), ComponentState::PendingAdd);

    run_frame(&mut scene, &mut backend, &mut tasks, 2);
    assert_eq!(take_log(&log), ["spawned:activated", "spawned:update"]);
}

#[test]
fn test_unit_removed_during_update_gets_no_further_updates() {
    let log = EventLog::default();
    let mut scene = test_scene();
    let mut backend = HeadlessBackend::new(64, 64);
    let mut tasks = TaskQueue::new();
    let entity = scene.create_entity("actors");
    let remover = scene.add_component(entity, ComponentKind::behaviour(Remover { target: None })).unwrap();
    let target = scene
        .add_component(entity, ComponentKind::behaviour(Recorder::new("target", 0, &log)))
        .unwrap();
    scene.behaviour_mut::<Remover>(remover).unwrap().target = Some(target);

    run_frame(&mut scene, &mut backend, &mut tasks, 1);
    assert_eq!(take_log(&log), ["target:activated"]);
    assert_eq!(scene.component_slot(target).unwrap().state(), ComponentState::PendingRemoval);

    run_frame(&mut scene, &mut backend, &mut tasks, 2);
    assert_eq!(take_log(&log), ["target:deactivated"]);
    assert!(scene.component_slot(target).is_none());
    assert_eq!(scene.update_order(), [remover]);
}

#[test]
fn test_update_runs_by_descending_script_priority() {
    let log = EventLog::default();
    let mut scene = test_scene();
    let mut backend = HeadlessBackend::new(64, 64);
    let mut tasks = TaskQueue::new();
    let entity = scene.create_entity("scripts");
    for (name, priority) in [("low", -1), ("first", 0), ("high", 5), ("second", 0)] {
        scene
            .add_component(entity, ComponentKind::behaviour(Recorder::new(name, priority, &log)))
            .unwrap();
    }

    run_frame(&mut scene, &mut backend, &mut tasks, 1);
    take_log(&log);
    run_frame(&mut scene, &mut backend, &mut tasks, 2);
    assert_eq!(take_log(&log), ["high:update", "first:update", "second:update", "low:update"]);
}

#[test]
fn test_destroy_entity_removes_units_in_reverse_order() {
    let log = EventLog::default();
    let mut scene = test_scene();
    let mut backend = HeadlessBackend::new(64, 64);
    let mut tasks = TaskQueue::new();
    let entity = scene.create_entity("doomed");
    for name in ["a", "b", "c"] {
        scene
            .add_component(entity, ComponentKind::behaviour(Recorder::new(name, 0, &log)))
            .unwrap();
    }
    run_frame(&mut scene, &mut backend, &mut tasks, 1);
    take_log(&log);
    assert_eq!(scene.entity(entity).unwrap().number_of_components(), 4);

    scene.destroy_entity(entity).unwrap();
    assert_eq!(scene.entity(entity).unwrap().number_of_components(), 0);
    assert!(scene.entity(entity).unwrap().is_destroyed());

    run_frame(&mut scene, &mut backend, &mut tasks, 2);
    assert_eq!(take_log(&log), ["c:deactivated", "b:deactivated", "a:deactivated"]);
    assert!(scene.entity(entity).is_none());
    assert_eq!(scene.number_of_entities(), 0);
    assert!(scene.active_components().is_empty());
}

#[test]
fn test_unit_removed_before_activation_gets_no_hooks() {
    let log = EventLog::default();
    let mut scene = test_scene();
    let mut backend = HeadlessBackend::new(64, 64);
    let mut tasks = TaskQueue::new();
    let entity = scene.create_entity("brief");
    let unit = scene
        .add_component(entity, ComponentKind::behaviour(Recorder::new("brief", 0, &log)))
        .unwrap();
    scene.remove_component(unit).unwrap();

    run_frame(&mut scene, &mut backend, &mut tasks, 1);
    assert!(take_log(&log).is_empty());
    assert!(scene.component(unit).is_none());
}

#[test]
fn test_listener_registration_reports_active_units() {
    let log = EventLog::default();
    let mut scene = test_scene();
    let mut backend = HeadlessBackend::new(64, 64);
    let mut tasks = TaskQueue::new();
    let entity = scene.create_entity("observed");
    let first = scene
        .add_component(entity, ComponentKind::behaviour(Recorder::new("first", 0, &log)))
        .unwrap();
    run_frame(&mut scene, &mut backend, &mut tasks, 1);

    let tracker = Tracker::default();
    let (added, removed) = (Rc::clone(&tracker.added), Rc::clone(&tracker.removed));
    let listener = scene.add_component_listener(Box::new(tracker));
    assert_eq!(*added.borrow(), [first]);

    let second = scene
        .add_component(entity, ComponentKind::behaviour(Recorder::new("second", 0, &log)))
        .unwrap();
    scene.remove_component(first).unwrap();
    run_frame(&mut scene, &mut backend, &mut tasks, 2);
    assert_eq!(*added.borrow(), [first, second]);
    assert_eq!(*removed.borrow(), [first]);

    assert!(scene.remove_component_listener(listener).is_some());
    scene.remove_component(second).unwrap();
    run_frame(&mut scene, &mut backend, &mut tasks, 3);
    assert_eq!(*removed.borrow(), [first]);
}

#[test]
fn test_child_global_position_follows_parent() {
    let mut scene = test_scene();
    let parent = scene.create_entity("P");
    let child = scene.create_entity("E");
    let (p, e) = (scene.transform_of(parent).unwrap(), scene.transform_of(child).unwrap());

    let transforms = scene.transforms_mut();
    transforms.set_local_position(p, Vec3::new(0.0, 5.0, 0.0)).unwrap();
    transforms.set_local_position(e, Vec3::new(1.0, 0.0, 0.0)).unwrap();
    transforms.set_parent(e, Some(p)).unwrap();

    let position = scene.transforms().position(e).unwrap();
    assert_relative_eq!(position, Vec3::new(1.0, 5.0, 0.0), epsilon = 1e-6);
}

#[test]
fn test_component_queries() {
    let log = EventLog::default();
    let mut scene = test_scene();
    let entity = scene.create_entity("mixed");
    let recorder = scene
        .add_component(entity, ComponentKind::behaviour(Recorder::new("r", 0, &log)))
        .unwrap();
    let camera = scene.add_component(entity, crate::ecs::components::Camera::new().into()).unwrap();

    assert_eq!(scene.component_of_type(entity, ComponentType::Camera), Some(camera));
    assert_eq!(scene.components_of_type(entity, ComponentType::Behaviour("Recorder")), [recorder]);
    assert_eq!(scene.find_components_of_type(ComponentType::Camera), [camera]);
    assert_eq!(scene.entity_by_name("mixed"), Some(entity));
    assert_eq!(scene.entity_at(0), Some(entity));
}
