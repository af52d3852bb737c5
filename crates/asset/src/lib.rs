//! Asset loading: OBJ geometry, MTL materials, textures.
//!
//! Everything here is CPU-only and may run off the render thread; the result
//! of [`import::import_model`] is handed to the renderer for GPU upload.

pub mod import;
pub mod mesh;
pub mod mtl;
pub mod obj;
pub mod source;
pub mod texture;

pub use import::{GroupMaterial, ImportedModel, import_model, import_model_from_path};
pub use mesh::{IndexedMesh, MeshGroup};
pub use mtl::{Material, MaterialLibrary};
pub use obj::VertexKey;
pub use source::{AssetSource, DirSource, MemorySource};
pub use texture::TextureData;
