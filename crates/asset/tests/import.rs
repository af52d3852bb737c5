use std::path::PathBuf;

use asset::{TextureData, import_model_from_path};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

#[test]
fn cube_from_disk_has_per_face_rows_and_two_groups() {
    let model = import_model_from_path(fixture("cube.obj")).expect("import cube");
    let mesh = &model.mesh;

    // every face has its own normal, so corners are not shared across faces
    assert_eq!(mesh.vertex_count(), 24);
    assert_eq!(mesh.indices.len(), 36);
    assert_eq!(mesh.texcoords.len(), mesh.vertex_count());
    assert_eq!(mesh.normals.len(), mesh.vertex_count());

    assert_eq!(mesh.groups.len(), 2);
    assert_eq!(mesh.groups[0].material.as_deref(), Some("shell"));
    assert_eq!(mesh.groups[0].indices, 0..18);
    assert_eq!(mesh.groups[1].indices, 18..36);

    let shell = &model.group_materials[0].material;
    assert_eq!(shell.diffuse, [0.2, 0.4, 0.6]);
    assert_eq!(shell.shininess, 64.0);
    // shell_diffuse.png is not shipped
    assert_eq!(model.group_materials[0].texture, TextureData::white());

    let base = &model.group_materials[1].material;
    assert!((base.transparency - 0.7).abs() < 1e-6);
    assert_eq!(base.illumination_model, 1);
}

#[test]
fn orphan_model_without_material_file_imports_with_defaults() {
    let model = import_model_from_path(fixture("orphan.obj")).expect("import orphan");
    assert_eq!(model.mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    assert!(model.materials.is_empty());
    assert_eq!(model.group_materials.len(), 1);
    assert_eq!(model.group_materials[0].material, asset::Material::default());
    assert!(model.group_materials[0].texture.is_valid());
    assert_eq!(model.group_materials[0].texture.width, 1);
}

#[test]
fn unreadable_model_path_is_an_error() {
    assert!(import_model_from_path(fixture("no_such_model.obj")).is_err());
}
