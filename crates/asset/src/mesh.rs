//! CPU-side indexed mesh and its construction from parsed OBJ faces.

use std::{collections::HashMap, ops::Range};

use anyhow::{Result, anyhow};

use crate::obj::{ObjDocument, VertexKey};

pub const DEFAULT_POSITION: [f32; 3] = [0.0, 0.0, 0.0];
pub const DEFAULT_TEXCOORD: [f32; 2] = [0.0, 0.0];
pub const DEFAULT_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

/// Run of indices drawn with one material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshGroup {
    pub material: Option<String>,
    pub indices: Range<u32>,
}

impl MeshGroup {
    pub fn index_count(&self) -> u32 {
        self.indices.end - self.indices.start
    }
}

/// Indexed triangle mesh with one attribute row per unique [`VertexKey`].
///
/// `vertices`, `texcoords` and `normals` always have the same length;
/// `indices.len()` is a multiple of three.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexedMesh {
    pub vertices: Vec<[f32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub groups: Vec<MeshGroup>,
}

impl IndexedMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    /// Axis-aligned `(min, max)` over all vertex positions.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let (first, rest) = self.vertices.split_first()?;
        Some(rest.iter().fold((*first, *first), |(mut lo, mut hi), p| {
            for axis in 0..3 {
                lo[axis] = lo[axis].min(p[axis]);
                hi[axis] = hi[axis].max(p[axis]);
            }
            (lo, hi)
        }))
    }
}

/// Deduplicate face corners and fan-triangulate every face.
///
/// Faces are assumed convex and planar; nothing is validated.
pub fn build_indexed_mesh(doc: &ObjDocument) -> Result<IndexedMesh> {
    let attrs = &doc.attributes;
    let mut unique: HashMap<VertexKey, u32> = HashMap::new();
    let mut mesh = IndexedMesh::default();
    let mut face_indices: Vec<u32> = Vec::new();

    for face in &doc.faces {
        face_indices.clear();
        for key in &face.corners {
            let index = match unique.get(key) {
                Some(&idx) => idx,
                None => {
                    let idx = u32::try_from(mesh.vertices.len())
                        .map_err(|_| anyhow!("Too many vertices in OBJ (>{})", u32::MAX))?;
                    let position = key
                        .position
                        .and_then(|i| attrs.positions.get(i).copied())
                        .unwrap_or(DEFAULT_POSITION);
                    let uv = key
                        .texcoord
                        .and_then(|i| attrs.texcoords.get(i).copied())
                        .unwrap_or(DEFAULT_TEXCOORD);
                    let normal = key
                        .normal
                        .and_then(|i| attrs.normals.get(i).copied())
                        .unwrap_or(DEFAULT_NORMAL);

                    mesh.vertices.push(position);
                    mesh.texcoords.push(uv);
                    mesh.normals.push(normal);
                    unique.insert(*key, idx);
                    idx
                }
            };
            face_indices.push(index);
        }

        if face_indices.len() < 3 {
            continue;
        }
        let start = mesh.indices.len();
        fan_triangulate(&face_indices, &mut mesh.indices);
        extend_groups(&mut mesh.groups, face.material.as_deref(), start, mesh.indices.len())?;
    }

    log::debug!(
        "Mesh built: {} unique vertices, {} triangles, {} groups",
        mesh.vertex_count(),
        mesh.triangle_count(),
        mesh.groups.len()
    );
    Ok(mesh)
}

/// Emit `(v0, v[i-1], v[i])` for `i` in `2..n`, keeping the source winding.
fn fan_triangulate(face: &[u32], out: &mut Vec<u32>) {
    for i in 2..face.len() {
        out.extend_from_slice(&[face[0], face[i - 1], face[i]]);
    }
}

fn extend_groups(
    groups: &mut Vec<MeshGroup>,
    material: Option<&str>,
    start: usize,
    end: usize,
) -> Result<()> {
    let start = u32::try_from(start).map_err(|_| anyhow!("Index buffer too large"))?;
    let end = u32::try_from(end).map_err(|_| anyhow!("Index buffer too large"))?;
    match groups.last_mut() {
        Some(last) if last.material.as_deref() == material && last.indices.end == start => {
            last.indices.end = end;
        }
        _ => groups.push(MeshGroup {
            material: material.map(str::to_owned),
            indices: start..end,
        }),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obj::parse_obj_str;

    const CUBE: &str = r#"
        v -1 -1 -1
        v  1 -1 -1
        v  1  1 -1
        v -1  1 -1
        v -1 -1  1
        v  1 -1  1
        v  1  1  1
        v -1  1  1
        f 5 6 7 8
        f 1 4 3 2
        f 4 8 7 3
        f 1 2 6 5
        f 1 5 8 4
        f 2 3 7 6
    "#;

    fn build(src: &str) -> IndexedMesh {
        build_indexed_mesh(&parse_obj_str(src).unwrap()).unwrap()
    }

    #[test]
    fn quad_cube_triangulates_to_twelve_triangles() {
        let mesh = build(CUBE);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.indices.len(), 36);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
        assert!(mesh.is_valid());
        assert_eq!(mesh.bounds(), Some(([-1.0; 3], [1.0; 3])));
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        let mesh = build("v 0 0 0\n");
        assert!(!mesh.is_valid());
        assert_eq!(mesh.bounds(), None);
    }

    #[test]
    fn fan_keeps_winding_from_first_vertex() {
        let mesh = build("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0.5 2 0\nv 0 1 0\nf 1 2 3 4 5\n");
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3, 0, 3, 4]);
    }

    #[test]
    fn shared_key_resolves_to_same_row_in_any_order() {
        let src = r#"
            v 0 0 0
            v 1 0 0
            v 0 1 0
            v 1 1 0
            vt 0 0
            vt 1 1
            vn 0 0 1
            f 2/2/1 4/1/1 3/1/1
            f 1/1/1 2/2/1 3/1/1
        "#;
        let mesh = build(src);
        // 2/2/1 and 3/1/1 show up in both faces.
        assert_eq!(mesh.indices[0], mesh.indices[4]);
        assert_eq!(mesh.indices[2], mesh.indices[5]);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn same_position_different_normal_is_a_new_row() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nvn 0 0 -1\nf 1//1 2//1 3//1\nf 1//2 3//2 2//2\n";
        let mesh = build(src);
        assert_eq!(mesh.vertex_count(), 6);
    }

    #[test]
    fn bare_position_gets_default_texcoord_and_normal() {
        let mesh = build("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        assert!(mesh.normals.iter().all(|n| *n == DEFAULT_NORMAL));
        assert!(mesh.texcoords.iter().all(|t| *t == DEFAULT_TEXCOORD));
    }

    #[test]
    fn out_of_range_position_uses_origin() {
        let mesh = build("v 5 5 5\nv 1 0 0\nf 1 2 9\n");
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.vertices[2], DEFAULT_POSITION);
        assert_eq!(mesh.normals[2], DEFAULT_NORMAL);
    }

    #[test]
    fn groups_follow_material_runs() {
        let src = r#"
            v 0 0 0
            v 1 0 0
            v 0 1 0
            usemtl a
            f 1 2 3
            f 1 3 2
            usemtl b
            f 1 2 3 3
            usemtl a
            f 3 2 1
        "#;
        let mesh = build(src);
        let groups: Vec<_> = mesh
            .groups
            .iter()
            .map(|g| (g.material.as_deref(), g.indices.clone()))
            .collect();
        assert_eq!(
            groups,
            vec![(Some("a"), 0..6), (Some("b"), 6..12), (Some("a"), 12..15)]
        );
        let total: u32 = mesh.groups.iter().map(MeshGroup::index_count).sum();
        assert_eq!(total as usize, mesh.indices.len());
    }
}
