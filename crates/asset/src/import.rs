//! One-shot model import: OBJ + material libraries + textures.

use std::{io::Cursor, path::Path};

use anyhow::{Context, Result};

use crate::{
    mesh::{IndexedMesh, build_indexed_mesh},
    mtl::{Material, MaterialLibrary, parse_mtl_reader},
    obj::parse_obj_reader,
    source::{AssetSource, DirSource},
    texture::{TextureData, TextureResolver},
};

/// Material + texture for one [`crate::mesh::MeshGroup`], same order as `mesh.groups`.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupMaterial {
    pub material: Material,
    pub texture: TextureData,
}

/// Import result, independent of any GPU context. Safe to send across threads.
#[derive(Clone, Debug)]
pub struct ImportedModel {
    pub name: String,
    pub mesh: IndexedMesh,
    pub materials: MaterialLibrary,
    pub group_materials: Vec<GroupMaterial>,
}

/// Load a model file plus its sibling MTL and texture files from disk.
pub fn import_model_from_path(path: impl AsRef<Path>) -> Result<ImportedModel> {
    let path = path.as_ref();
    let (source, name) = DirSource::for_file(path)
        .with_context(|| format!("Not a model file path: {}", path.display()))?;
    import_model(&source, &name)
}

/// Import `name` from `source`.
///
/// Only an unreadable or corrupt geometry stream is an error. Missing material
/// libraries, unknown material names and broken textures degrade to defaults.
pub fn import_model<S: AssetSource + ?Sized>(source: &S, name: &str) -> Result<ImportedModel> {
    let bytes = source
        .read(name)
        .with_context(|| format!("Failed to open OBJ file: {}", source.describe(name)))?;
    let doc = parse_obj_reader(Cursor::new(bytes))
        .with_context(|| format!("Failed to parse OBJ file: {}", source.describe(name)))?;

    let mut materials = MaterialLibrary::new();
    for lib in &doc.material_libraries {
        match load_material_library(source, lib) {
            Ok(parsed) => {
                log::info!("Loaded {} materials from {}", parsed.len(), lib);
                materials.extend(parsed);
            }
            Err(e) => log::warn!("{e:#}; continuing with default materials"),
        }
    }

    let mesh = build_indexed_mesh(&doc)?;
    if !mesh.is_valid() {
        log::warn!("{} contains no triangles", name);
    }

    let mut textures = TextureResolver::new(source);
    let group_materials = mesh
        .groups
        .iter()
        .map(|group| {
            let found = group.material.as_deref().and_then(|m| {
                let hit = materials.get(m);
                if hit.is_none() {
                    log::warn!("Material not found: {}", m);
                }
                hit
            });
            GroupMaterial {
                material: found.cloned().unwrap_or_default(),
                texture: textures.resolve(found),
            }
        })
        .collect();

    log::info!(
        "Imported {}: {} vertices, {} triangles, {} materials",
        name,
        mesh.vertex_count(),
        mesh.triangle_count(),
        materials.len()
    );

    Ok(ImportedModel {
        name: name.to_owned(),
        mesh,
        materials,
        group_materials,
    })
}

/// Read one `mtllib` entry; names without an extension also try `<name>.mtl`.
fn load_material_library<S: AssetSource + ?Sized>(
    source: &S,
    name: &str,
) -> Result<MaterialLibrary> {
    let bytes = match source.read(name) {
        Ok(bytes) => bytes,
        Err(first) if Path::new(name).extension().is_none() => {
            let with_ext = format!("{name}.mtl");
            source.read(&with_ext).with_context(|| {
                format!(
                    "Failed to open MTL file {} ({first})",
                    source.describe(&with_ext)
                )
            })?
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to open MTL file {}", source.describe(name)));
        }
    };
    parse_mtl_reader(Cursor::new(bytes))
        .with_context(|| format!("Failed to parse MTL file {}", source.describe(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    const TRI: &str = "mtllib scene.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl red\nf 1 2 3\n";

    #[test]
    fn missing_material_library_still_imports() {
        let src = MemorySource::new().with("tri.obj", TRI);
        let model = import_model(&src, "tri.obj").expect("import without mtl");
        assert_eq!(model.mesh.indices.len(), 3);
        assert!(model.materials.is_empty());
        assert_eq!(model.group_materials.len(), 1);
        assert_eq!(model.group_materials[0].material, Material::default());
        assert_eq!(model.group_materials[0].texture, TextureData::white());
    }

    #[test]
    fn material_library_is_applied_to_groups() {
        let src = MemorySource::new()
            .with("tri.obj", TRI)
            .with("scene.mtl", "newmtl red\nKd 1 0 0\nmap_Kd gone.png\n");
        let model = import_model(&src, "tri.obj").unwrap();
        let gm = &model.group_materials[0];
        assert_eq!(gm.material.diffuse, [1.0, 0.0, 0.0]);
        assert_eq!(gm.texture, TextureData::white());
    }

    #[test]
    fn extensionless_mtllib_gets_mtl_suffix() {
        let src = MemorySource::new()
            .with("tri.obj", TRI.replace("scene.mtl", "scene"))
            .with("scene.mtl", "newmtl red\nNs 8\n");
        let model = import_model(&src, "tri.obj").unwrap();
        assert_eq!(model.group_materials[0].material.shininess, 8.0);
    }

    #[test]
    fn missing_geometry_is_an_error() {
        let src = MemorySource::new();
        assert!(import_model(&src, "nothing.obj").is_err());
    }
}
