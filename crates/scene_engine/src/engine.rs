//! Core engine implementation

use crate::config::Config;
use crate::core::{ConfigError, EngineConfig, SceneError};
use crate::events::TaskQueue;
use crate::foundation::time::{FrameClock, FrameTime};
use crate::render::RenderBackend;
use crate::scene::Scene;
use thiserror::Error;

/// Main engine struct
///
/// The engine owns the active scene, the render backend, the deferred task
/// queue, and the frame clock, and drives one frame per [`Engine::tick`]:
/// advance the clock, run due tasks, then update and render the scene.
pub struct Engine {
    config: EngineConfig,

    /// Scene being updated and rendered
    scene: Scene,

    /// Backend every camera draws through
    backend: Box<dyn RenderBackend>,

    /// Work deferred to a later frame
    tasks: TaskQueue,

    /// Frame timing
    clock: FrameClock,
}

impl Engine {
    /// Create a new engine instance with an empty scene
    pub fn new(config: EngineConfig, backend: Box<dyn RenderBackend>) -> Result<Self, EngineError> {
        config.validate()?;
        log::info!("Initializing engine...");
        let scene = Scene::new(config.clone());
        Ok(Self {
            config,
            scene,
            backend,
            tasks: TaskQueue::new(),
            clock: FrameClock::new(),
        })
    }

    /// Replace the frame clock, e.g. with [`FrameClock::fixed`] for deterministic runs
    pub fn with_clock(mut self, clock: FrameClock) -> Self {
        self.clock = clock;
        self
    }

    /// Advance one frame
    pub fn tick(&mut self) -> Result<FrameTime, EngineError> {
        let time = self.clock.tick();
        self.tasks.drain_due_tasks(time.frame, &mut self.scene);
        self.scene
            .update_and_render(time, self.backend.as_mut(), &mut self.tasks)?;
        Ok(time)
    }

    /// Run `frames` ticks, stopping at the first error
    pub fn run_frames(&mut self, frames: u64) -> Result<(), EngineError> {
        for _ in 0..frames {
            self.tick()?;
        }
        log::debug!("Ran {} frames, now at frame {}", frames, self.clock.frame());
        Ok(())
    }

    /// Swap in a new scene; tasks queued for the old one are dropped
    pub fn set_scene(&mut self, scene: Scene) -> Scene {
        self.tasks.clear();
        std::mem::replace(&mut self.scene, scene)
    }

    /// Engine settings
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the active scene
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Get mutable access to the active scene
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Get the render backend
    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    /// Get the deferred task queue
    pub fn tasks_mut(&mut self) -> &mut TaskQueue {
        &mut self.tasks
    }

    /// Get the most recent frame time
    pub fn time(&self) -> FrameTime {
        self.clock.current()
    }
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Scene or rendering failure during a frame
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
