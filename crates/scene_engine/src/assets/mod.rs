//! Asset import
//!
//! Importers turn source files into meshes, materials, and entities in a
//! [`crate::scene::Scene`].

pub mod obj_loader;

pub use obj_loader::{ObjError, ObjImport, ObjImportOptions, ObjImporter};
