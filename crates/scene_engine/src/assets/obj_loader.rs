//! Wavefront OBJ importer
//!
//! Reads `o`, `usemtl`, `v`, `vn`, `vt` and `f` statements. Every object
//! becomes an entity with a [`MeshRenderer`]; every `usemtl` that follows
//! triangles starts a new submesh. Faces are fan-triangulated and vertices are
//! shared within an object when their `v/vt/vn` token matches.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use thiserror::Error;

use crate::core::SceneError;
use crate::ecs::components::MeshRenderer;
use crate::ecs::EntityId;
use crate::foundation::math::{Quat, Vec3};
use crate::render::{Material, Mesh, MeshData, ShaderId};
use crate::scene::Scene;

/// Name given to geometry that precedes the first `o` statement
const DEFAULT_OBJECT_NAME: &str = "MeshObject";

#[derive(Error, Debug)]
pub enum ObjError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Import settings
#[derive(Debug, Clone, Default)]
pub struct ObjImportOptions {
    /// Rotate positions and normals -90 degrees about X (Z-up files)
    pub rotate_90x: bool,
    /// Existing materials matched by `usemtl` name
    pub materials: HashMap<String, Rc<Material>>,
}

/// Everything an import created
#[derive(Debug, Default)]
pub struct ObjImport {
    /// One mesh per object
    pub meshes: Vec<Rc<Mesh>>,
    /// One entity per object, in file order
    pub entities: Vec<EntityId>,
    /// Default materials created for unmatched or missing names
    pub materials: Vec<Rc<Material>>,
}

/// One `v/vt/vn` corner with missing indices falling back to the position index
#[derive(Debug, Clone, Copy)]
struct Corner {
    position: usize,
    uv: usize,
    normal: usize,
}

#[derive(Debug)]
struct ObjectBuilder<'a> {
    name: String,
    material_names: Vec<String>,
    /// Triangles per submesh, each corner kept as its source token
    submeshes: Vec<Vec<[&'a str; 3]>>,
}

impl<'a> ObjectBuilder<'a> {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            material_names: Vec::new(),
            submeshes: vec![Vec::new()],
        }
    }

    fn is_empty(&self) -> bool {
        self.submeshes.iter().all(Vec::is_empty)
    }

    fn use_material(&mut self, name: &str) {
        self.material_names.push(name.to_string());
        if self.submeshes.last().is_some_and(|s| !s.is_empty()) {
            self.submeshes.push(Vec::new());
        }
    }

    fn add_face(&mut self, corners: &[&'a str]) {
        let Some(triangles) = self.submeshes.last_mut() else { return };
        for i in 2..corners.len() {
            triangles.push([corners[0], corners[i - 1], corners[i]]);
        }
    }
}

#[derive(Debug, Default)]
struct Geometry {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<[f32; 2]>,
}

/// Imports OBJ text into a scene
pub struct ObjImporter;

impl ObjImporter {
    /// Read an OBJ file and import it
    pub fn import_file(
        path: impl AsRef<Path>,
        scene: &mut Scene,
        options: &ObjImportOptions,
    ) -> Result<ObjImport, ObjError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Importing OBJ file {}", path.as_ref().display());
        Self::import(&text, scene, options)
    }

    /// Import OBJ text, creating one entity per object
    pub fn import(text: &str, scene: &mut Scene, options: &ObjImportOptions) -> Result<ObjImport, ObjError> {
        let rotation = if options.rotate_90x {
            Quat::from_axis_angle(&Vec3::x_axis(), -90.0_f32.to_radians())
        } else {
            Quat::identity()
        };

        let mut geometry = Geometry::default();
        let mut result = ObjImport::default();
        let mut object = ObjectBuilder::new(DEFAULT_OBJECT_NAME);

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            let Some((token, value)) = line.split_once(char::is_whitespace) else { continue };
            let value = value.trim();
            let parse_error = |message: &str| ObjError::ParseError { line: number + 1, message: message.to_string() };

            match token {
                "o" => {
                    let next = ObjectBuilder::new(value);
                    Self::finish_object(std::mem::replace(&mut object, next), &geometry, scene, options, &mut result)?;
                }
                "usemtl" => object.use_material(value),
                "v" => {
                    let [x, y, z] = parse_floats(value).ok_or_else(|| parse_error("Invalid vertex"))?;
                    geometry.positions.push(rotation * Vec3::new(x, y, z));
                }
                "vn" => {
                    let [x, y, z] = parse_floats(value).ok_or_else(|| parse_error("Invalid normal"))?;
                    geometry.normals.push(rotation * Vec3::new(x, y, z));
                }
                "vt" => {
                    let [u, v] = parse_floats(value).ok_or_else(|| parse_error("Invalid texture coordinate"))?;
                    geometry.uvs.push([u, v]);
                }
                "f" => {
                    let corners: Vec<&str> = value.split_whitespace().collect();
                    if corners.len() < 3 {
                        return Err(parse_error("Face needs at least three corners"));
                    }
                    object.add_face(&corners);
                }
                _ => {}
            }
        }
        Self::finish_object(object, &geometry, scene, options, &mut result)?;

        log::debug!(
            "Imported {} OBJ objects ({} vertices)",
            result.entities.len(),
            geometry.positions.len()
        );
        Ok(result)
    }

    fn finish_object(
        object: ObjectBuilder<'_>,
        geometry: &Geometry,
        scene: &mut Scene,
        options: &ObjImportOptions,
        result: &mut ObjImport,
    ) -> Result<(), ObjError> {
        if object.is_empty() {
            return Ok(());
        }

        let mut data = MeshData::default();
        let mut cache: HashMap<&str, u32> = HashMap::new();
        for triangles in &object.submeshes {
            let mut indices = Vec::with_capacity(triangles.len() * 3);
            for &token in triangles.iter().flatten() {
                if let Some(&index) = cache.get(token) {
                    indices.push(index);
                    continue;
                }
                let corner = parse_corner(token)?;
                let position = lookup(&geometry.positions, corner.position, "position")?;
                data.positions.push(*position);
                if !geometry.uvs.is_empty() {
                    data.uvs.push(*lookup(&geometry.uvs, corner.uv, "texture coordinate")?);
                }
                if !geometry.normals.is_empty() {
                    data.normals.push(*lookup(&geometry.normals, corner.normal, "normal")?);
                }
                let index = u32::try_from(data.positions.len() - 1)
                    .map_err(|_| ObjError::InvalidFormat("Too many vertices".to_string()))?;
                cache.insert(token, index);
                indices.push(index);
            }
            data.submeshes.push(indices);
        }

        let mut materials = Vec::with_capacity(data.submeshes.len());
        for submesh in 0..data.submeshes.len() {
            let name = object.material_names.get(submesh);
            match name.and_then(|n| options.materials.get(n)) {
                Some(material) => materials.push(Rc::clone(material)),
                None => {
                    let material = Rc::new(Material::new(name.map_or("material", String::as_str), ShaderId::DEFAULT));
                    result.materials.push(Rc::clone(&material));
                    materials.push(material);
                }
            }
        }

        let mesh = Rc::new(Mesh::new(format!("{} mesh", object.name), data));
        let entity = scene.create_entity(object.name);
        let renderer = MeshRenderer::new().with_mesh(Rc::clone(&mesh)).with_materials(materials);
        scene.add_component(entity, renderer.into())?;
        result.meshes.push(mesh);
        result.entities.push(entity);
        Ok(())
    }
}

fn parse_floats<const N: usize>(value: &str) -> Option<[f32; N]> {
    let mut out = [0.0; N];
    let mut parts = value.split_whitespace();
    for slot in &mut out {
        *slot = parts.next()?.parse().ok()?;
    }
    Some(out)
}

fn parse_corner(token: &str) -> Result<Corner, ObjError> {
    let invalid = || ObjError::InvalidFormat(format!("Invalid face corner '{token}'"));
    let mut parts = token.split('/');
    let position: usize = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
    let index_or_position = |part: Option<&str>| match part {
        Some(p) if !p.is_empty() => p.parse().map_err(|_| invalid()),
        _ => Ok(position),
    };
    let uv = index_or_position(parts.next())?;
    let normal = index_or_position(parts.next())?;
    Ok(Corner { position, uv, normal })
}

/// Resolve a 1-based OBJ index
fn lookup<'a, T>(items: &'a [T], index: usize, what: &str) -> Result<&'a T, ObjError> {
    index
        .checked_sub(1)
        .and_then(|i| items.get(i))
        .ok_or_else(|| ObjError::InvalidFormat(format!("{what} index {index} out of bounds")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EngineConfig;
    use crate::ecs::{ComponentKind, ComponentType};
    use approx::assert_relative_eq;

    const QUAD: &str = "\
# two objects
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
o Quad
usemtl red
f 1//1 2//1 3//1 4//1
o Split
usemtl red
f 1//1 2//1 3//1
usemtl blue
f 1//1 3//1 4//1
";

    fn import(text: &str, options: &ObjImportOptions) -> (Scene, ObjImport) {
        let mut scene = Scene::new(EngineConfig::default());
        let result = ObjImporter::import(text, &mut scene, options).unwrap();
        (scene, result)
    }

    #[test]
    fn test_objects_become_entities() {
        let (scene, result) = import(QUAD, &ObjImportOptions::default());
        assert_eq!(result.entities.len(), 2);
        assert_eq!(scene.entity(result.entities[0]).unwrap().name(), "Quad");
        assert_eq!(result.meshes[1].name, "Split mesh");

        let renderer = scene.component_of_type(result.entities[0], ComponentType::MeshRenderer).unwrap();
        let renderer = scene.component(renderer).and_then(ComponentKind::as_mesh_renderer).unwrap();
        assert!(Rc::ptr_eq(renderer.mesh().unwrap(), &result.meshes[0]));
    }

    #[test]
    fn test_fan_triangulation_shares_vertices() {
        let (_, result) = import(QUAD, &ObjImportOptions::default());
        let data = result.meshes[0].data();
        assert_eq!(data.submeshes, vec![vec![0, 1, 2, 0, 2, 3]]);
        assert_eq!(data.vertex_count(), 4);
        assert_eq!(data.normals.len(), 4);
    }

    #[test]
    fn test_usemtl_splits_submeshes() {
        let red = Rc::new(Material::new("red", ShaderId::FIRST_USER));
        let options = ObjImportOptions {
            materials: HashMap::from([("red".to_string(), Rc::clone(&red))]),
            ..ObjImportOptions::default()
        };
        let (scene, result) = import(QUAD, &options);
        assert_eq!(result.meshes[1].submesh_count(), 2);

        let renderer = scene.component_of_type(result.entities[1], ComponentType::MeshRenderer).unwrap();
        let renderer = scene.component(renderer).and_then(ComponentKind::as_mesh_renderer).unwrap();
        assert!(Rc::ptr_eq(&renderer.materials()[0], &red));
        assert_eq!(renderer.materials()[1].name, "blue");
        assert_eq!(result.materials.len(), 1);
    }

    #[test]
    fn test_missing_material_names_get_defaults() {
        let (_, result) = import("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n", &ObjImportOptions::default());
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.materials.len(), 1);
        assert_eq!(result.materials[0].name, "material");
        assert_eq!(result.meshes[0].name, "MeshObject mesh");
    }

    #[test]
    fn test_rotate_90x() {
        let options = ObjImportOptions { rotate_90x: true, ..ObjImportOptions::default() };
        let (_, result) = import("v 0 1 0\nv 0 0 1\nv 1 0 0\nf 1 2 3\n", &options);
        let positions = &result.meshes[0].data().positions;
        assert_relative_eq!(positions[0], Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
        assert_relative_eq!(positions[1], Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(positions[2], Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_out_of_range_index_fails() {
        let mut scene = Scene::new(EngineConfig::default());
        let result = ObjImporter::import("v 0 0 0\nf 1 2 3\n", &mut scene, &ObjImportOptions::default());
        assert!(matches!(result, Err(ObjError::InvalidFormat(_))));
    }

    #[test]
    fn test_bad_vertex_reports_line() {
        let mut scene = Scene::new(EngineConfig::default());
        let result = ObjImporter::import("# header\nv 0 zero 0\n", &mut scene, &ObjImportOptions::default());
        assert!(matches!(result, Err(ObjError::ParseError { line: 2, .. })));
    }
}
