//! Cross-module scene scenarios
//!
//! Every scenario drives a real [`Scene`] through whole frames against the
//! headless backend.

mod lifecycle;
mod lighting;
mod snapshot;

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::core::EngineConfig;
use crate::ecs::{Behaviour, Capabilities};
use crate::events::TaskQueue;
use crate::foundation::math::Vec3;
use crate::foundation::time::FrameTime;
use crate::render::{HeadlessBackend, Mesh, MeshData};
use crate::scene::{Scene, UpdateContext};

pub(super) type EventLog = Rc<RefCell<Vec<String>>>;

pub(super) fn frame(n: u64) -> FrameTime {
    FrameTime { frame: n, delta: 1.0 / 60.0, elapsed: n as f32 / 60.0 }
}

pub(super) fn run_frame(scene: &mut Scene, backend: &mut HeadlessBackend, tasks: &mut TaskQueue, n: u64) {
    tasks.drain_due_tasks(n, scene);
    scene.update_and_render(frame(n), backend, tasks).unwrap();
}

pub(super) fn test_scene() -> Scene {
    Scene::new(EngineConfig::default().with_debug(true))
}

/// Unit cube centered on the origin with a single submesh
pub(super) fn cube() -> Rc<Mesh> {
    let positions = vec![
        Vec3::new(-0.5, -0.5, -0.5),
        Vec3::new(0.5, -0.5, -0.5),
        Vec3::new(0.5, 0.5, -0.5),
        Vec3::new(-0.5, 0.5, -0.5),
        Vec3::new(-0.5, -0.5, 0.5),
        Vec3::new(0.5, -0.5, 0.5),
        Vec3::new(0.5, 0.5, 0.5),
        Vec3::new(-0.5, 0.5, 0.5),
    ];
    let indices = vec![
        0, 1, 2, 0, 2, 3, 4, 6, 5, 4, 7, 6, 0, 4, 5, 0, 5, 1, 3, 2, 6, 3, 6, 7, 1, 5, 6, 1, 6, 2, 0, 3, 7, 0, 7, 4,
    ];
    Rc::new(Mesh::new("cube", MeshData { positions, submeshes: vec![indices], ..MeshData::default() }))
}

/// Behaviour that writes every hook call to a shared log
pub(super) struct Recorder {
    pub name: &'static str,
    pub priority: i32,
    pub log: EventLog,
}

impl Recorder {
    pub fn new(name: &'static str, priority: i32, log: &EventLog) -> Self {
        Self { name, priority, log: Rc::clone(log) }
    }

    fn record(&self, event: &str) {
        self.log.borrow_mut().push(format!("{}:{event}", self.name));
    }
}

impl Behaviour for Recorder {
    fn type_name(&self) -> &'static str {
        "Recorder"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ACTIVATED | Capabilities::DEACTIVATED | Capabilities::UPDATE
    }

    fn script_priority(&self) -> i32 {
        self.priority
    }

    fn activated(&mut self, _ctx: &mut UpdateContext<'_>) {
        self.record("activated");
    }

    fn deactivated(&mut self, _ctx: &mut UpdateContext<'_>) {
        self.record("deactivated");
    }

    fn update(&mut self, _ctx: &mut UpdateContext<'_>) {
        self.record("update");
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(super) fn take_log(log: &EventLog) -> Vec<String> {
    std::mem::take(&mut *log.borrow_mut())
}
