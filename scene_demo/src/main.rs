//! Headless scene demo
//!
//! Builds a small scene (camera, lights, a field of randomly placed cubes and
//! an imported OBJ model), runs it for a few frames against the recording
//! backend, picks the center of the screen, and prints a scene snapshot.
//!
//! Usage: `scene_demo [config.toml|config.ron]`

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use rand::Rng;
use scene_engine::assets::ObjError;
use scene_engine::config::ConfigError;
use scene_engine::foundation::logging;
use scene_engine::prelude::*;
use thiserror::Error;

const FRAMES: u64 = 120;
const CUBES: usize = 24;

const PYRAMID_OBJ: &str = "\
o Pyramid
v -1 0 -1
v 1 0 -1
v 1 0 1
v -1 0 1
v 0 1.5 0
usemtl stone
f 1 2 3 4
usemtl gold
f 1 5 2
f 2 5 3
f 3 5 4
f 4 5 1
";

#[derive(Error, Debug)]
enum DemoError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Import(#[from] ObjError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Spins its entity about the Y axis
struct Spinner {
    degrees_per_second: f32,
    angle: f32,
}

impl Behaviour for Spinner {
    fn type_name(&self) -> &'static str {
        "Spinner"
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        self.angle = (self.angle + self.degrees_per_second * ctx.time.delta) % 360.0;
        let Some(node) = ctx.scene.transform_of(ctx.entity) else { return };
        if let Err(err) = ctx
            .scene
            .transforms_mut()
            .set_local_rotation_euler(node, Vec3::new(0.0, self.angle, 0.0))
        {
            log::warn!("Spinner could not rotate its entity: {err}");
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn load_config() -> Result<EngineConfig, DemoError> {
    match std::env::args().nth(1) {
        Some(path) => Ok(EngineConfig::load_from_file(path)?),
        None => Ok(EngineConfig::default().with_shadows(true)),
    }
}

fn build_scene(scene: &mut Scene) -> Result<ComponentId, DemoError> {
    let camera_entity = scene.create_entity("Main Camera");
    let node = scene.transform_of(camera_entity).ok_or(SceneError::StaleHandle)?;
    scene.transforms_mut().set_local_position(node, Vec3::new(0.0, 3.0, 12.0))?;
    scene.transforms_mut().set_local_rotation_euler(node, Vec3::new(-10.0, 0.0, 0.0))?;
    let mut camera = Camera::new();
    camera.set_render_shadow(true);
    camera.set_clear_color([0.1, 0.1, 0.15, 1.0]);
    let camera = scene.add_component(camera_entity, camera.into())?;

    let lights = scene.create_entity("Lights");
    let node = scene.transform_of(lights).ok_or(SceneError::StaleHandle)?;
    scene.transforms_mut().set_local_rotation_euler(node, Vec3::new(-45.0, 30.0, 0.0))?;
    scene.add_component(lights, LightFactory::ambient(Vec3::new(0.2, 0.2, 0.25), 1.0).into())?;
    scene.add_component(lights, LightFactory::directional(Vec3::new(1.0, 0.95, 0.8), 1.0).with_shadow(true).into())?;

    let cube = Rc::new(Mesh::new("cube", cube_data()));
    let mut rng = rand::thread_rng();
    for i in 0..CUBES {
        let entity = scene.create_entity(format!("Cube {i}"));
        let node = scene.transform_of(entity).ok_or(SceneError::StaleHandle)?;
        let position = Vec3::new(rng.gen_range(-8.0..8.0), rng.gen_range(0.0..4.0), rng.gen_range(-8.0..2.0));
        scene.transforms_mut().set_local_position(node, position)?;

        let material = Material::new(format!("cube {i}"), ShaderId::DEFAULT)
            .with_color(rng.gen(), rng.gen(), rng.gen());
        let renderer = MeshRenderer::new().with_mesh(Rc::clone(&cube)).with_materials(vec![Rc::new(material)]);
        scene.add_component(entity, renderer.into())?;
        if i % 3 == 0 {
            let spinner = Spinner { degrees_per_second: rng.gen_range(30.0..180.0), angle: 0.0 };
            scene.add_component(entity, ComponentKind::behaviour(spinner))?;
        }
    }

    let imported = ObjImporter::import(PYRAMID_OBJ, scene, &ObjImportOptions::default())?;
    for entity in imported.entities {
        scene.add_component(entity, ComponentKind::behaviour(Spinner { degrees_per_second: 45.0, angle: 0.0 }))?;
    }
    Ok(camera)
}

fn cube_data() -> MeshData {
    let positions = (0..8)
        .map(|i| {
            let bit = |b: u32| if i & (1 << b) == 0 { -0.5 } else { 0.5 };
            Vec3::new(bit(0), bit(1), bit(2))
        })
        .collect();
    let indices = vec![
        0, 2, 1, 1, 2, 3, 4, 5, 6, 5, 7, 6, 0, 1, 4, 1, 5, 4, 2, 6, 3, 3, 6, 7, 0, 4, 2, 2, 4, 6, 1, 3, 5, 3, 7, 5,
    ];
    MeshData { positions, submeshes: vec![indices], ..MeshData::default() }
}

fn main() -> Result<(), DemoError> {
    let config = load_config()?;
    logging::init_with_level(&config.log_level);
    log::info!("Starting scene demo");

    let mut engine = Engine::new(config, Box::new(HeadlessBackend::new(1280, 720)))?
        .with_clock(FrameClock::fixed(1.0 / 60.0));
    let camera = build_scene(engine.scene_mut())?;
    engine.run_frames(FRAMES / 2)?;

    let picked: Rc<RefCell<Vec<(EntityId, u32)>>> = Rc::default();
    let sink = Rc::clone(&picked);
    engine.scene_mut().pick_region(
        camera,
        630,
        350,
        20,
        20,
        Box::new(move |_, entity, pixels| sink.borrow_mut().push((entity, pixels))),
    )?;
    engine.run_frames(FRAMES / 2)?;

    let scene = engine.scene();
    for &(entity, pixels) in picked.borrow().iter() {
        let name = scene.entity(entity).map_or("<destroyed>", Entity::name);
        log::info!("Picked '{name}' covering {pixels} pixels");
    }
    log::info!(
        "Rendered {} frames: {} entities, {} active units, {} point lights",
        engine.time().frame,
        scene.number_of_entities(),
        scene.active_components().len(),
        scene.lights().number_of_point_lights()
    );

    let snapshot = scene.to_json();
    println!("{}", serde_json::to_string_pretty(&snapshot).unwrap_or_default());
    Ok(())
}
