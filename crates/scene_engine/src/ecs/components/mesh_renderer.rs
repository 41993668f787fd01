//! # Mesh Renderer
//!
//! Draws one mesh with a list of materials: submesh `i` is drawn with
//! material `i`. The first material decides the render order and therefore
//! the camera bucket the renderer lands in.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::SceneResult;
use crate::render::{DrawCall, Material, Mesh, RenderBackend, RenderResult};
use crate::scene::render_queue::DEFAULT_RENDER_ORDER;
use crate::scene::serialization::{Reference, ReferenceResolver};
use crate::scene::{RenderContext, AABB};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct MeshRendererConfig {
    mesh: Option<Reference>,
    materials: Vec<Reference>,
}

/// Renderable unit bound to a mesh and its materials
#[derive(Debug, Clone, Default)]
pub struct MeshRenderer {
    mesh: Option<Rc<Mesh>>,
    materials: Vec<Rc<Material>>,
}

impl MeshRenderer {
    /// Renderer without mesh or materials
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mesh
    pub fn with_mesh(mut self, mesh: Rc<Mesh>) -> Self {
        self.mesh = Some(mesh);
        self
    }

    /// Set the materials
    pub fn with_materials(mut self, materials: Vec<Rc<Material>>) -> Self {
        self.materials = materials;
        self
    }

    /// Mesh drawn by this renderer
    pub fn mesh(&self) -> Option<&Rc<Mesh>> {
        self.mesh.as_ref()
    }

    /// Replace the mesh
    ///
    /// Cameras keep the old sort key until the scene is told the unit changed,
    /// so go through `Scene::update_component` for live renderers.
    pub fn set_mesh(&mut self, mesh: Option<Rc<Mesh>>) {
        self.mesh = mesh;
    }

    /// Materials, one per submesh
    pub fn materials(&self) -> &[Rc<Material>] {
        &self.materials
    }

    /// Replace the materials
    pub fn set_materials(&mut self, materials: Vec<Rc<Material>>) {
        self.materials = materials;
    }

    /// First material
    pub fn material(&self) -> Option<&Rc<Material>> {
        self.materials.first()
    }

    /// Replace all materials with one
    pub fn set_material(&mut self, material: Rc<Material>) {
        self.materials = vec![material];
    }

    /// Render order of the first material
    pub fn render_order(&self) -> i32 {
        self.material().map_or(DEFAULT_RENDER_ORDER, |m| m.render_order)
    }

    /// Mesh bounds in object space
    pub fn aabb(&self) -> Option<AABB> {
        self.mesh.as_ref().and_then(|m| m.aabb())
    }

    pub(crate) fn ensure_material(&mut self) {
        if self.materials.is_empty() {
            log::debug!("MeshRenderer activated without materials, using the default material");
            self.materials.push(Material::engine_default());
        }
    }

    /// Draw every submesh that has a material
    ///
    /// With a replacement material in the context (shadow or picking pass)
    /// every submesh is drawn with that material instead.
    pub fn render(&self, ctx: &RenderContext<'_>, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        let Some(mesh) = &self.mesh else {
            return Ok(());
        };
        let count = mesh.submesh_count().min(self.materials.len());
        for (submesh, material) in self.materials.iter().take(count).enumerate() {
            let material = ctx.replacement_material.unwrap_or(&**material);
            backend.draw(&DrawCall {
                mesh,
                submesh,
                material,
                engine: ctx.engine,
                lights: ctx.lights,
                object: ctx.object,
            })?;
        }
        Ok(())
    }

    /// Snapshot config with mesh and material references
    pub fn to_json(&self) -> Value {
        let config = MeshRendererConfig {
            mesh: self.mesh.as_ref().map(|m| Reference::new(m.uid)),
            materials: self.materials.iter().map(|m| Reference::new(m.uid)).collect(),
        };
        serde_json::to_value(config).unwrap_or(Value::Null)
    }

    /// Restore from a snapshot config; unresolved references are skipped
    pub fn apply_config(&mut self, config: &Value, refs: &ReferenceResolver<'_>) -> SceneResult<()> {
        let config: MeshRendererConfig = serde_json::from_value(config.clone())?;
        if let Some(reference) = config.mesh {
            self.mesh = refs.mesh(reference);
        }
        self.materials = config.materials.into_iter().filter_map(|r| refs.material(r)).collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ShaderId;

    #[test]
    fn test_render_order_follows_first_material() {
        let mut renderer = MeshRenderer::new();
        assert_eq!(renderer.render_order(), DEFAULT_RENDER_ORDER);

        renderer.set_materials(vec![
            Rc::new(Material::new("glass", ShaderId::FIRST_USER).with_render_order(2100)),
            Rc::new(Material::new("frame", ShaderId::DEFAULT)),
        ]);
        assert_eq!(renderer.render_order(), 2100);
    }

    #[test]
    fn test_default_material_only_when_empty() {
        let mut renderer = MeshRenderer::new();
        renderer.ensure_material();
        assert_eq!(renderer.materials().len(), 1);
        assert_eq!(renderer.material().unwrap().shader, ShaderId::DEFAULT);

        let custom = Rc::new(Material::new("custom", ShaderId::FIRST_USER));
        let mut renderer = MeshRenderer::new().with_materials(vec![Rc::clone(&custom)]);
        renderer.ensure_material();
        assert_eq!(renderer.materials().len(), 1);
        assert!(Rc::ptr_eq(renderer.material().unwrap(), &custom));
    }
}
