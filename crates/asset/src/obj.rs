//! OBJ geometry parser: positions, texcoords, normals, faces and material hooks.
//!
//! Parsing only collects raw attribute lists and face references; turning them
//! into an indexed mesh is [`crate::mesh::build_indexed_mesh`]'s job.

use std::io::{self, BufRead};

use anyhow::{Context, Result, anyhow};

/// Identity of one face corner. `None` marks a missing or unresolvable index.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct VertexKey {
    pub position: Option<usize>,
    pub texcoord: Option<usize>,
    pub normal: Option<usize>,
}

impl VertexKey {
    pub const fn new(
        position: Option<usize>,
        texcoord: Option<usize>,
        normal: Option<usize>,
    ) -> Self {
        Self {
            position,
            texcoord,
            normal,
        }
    }
}

/// Raw attribute lists in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawAttributeLists {
    pub positions: Vec<[f32; 3]>,
    /// Stored with V flipped (`1.0 - v`).
    pub texcoords: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
}

/// A polygon with at least three corners and the material active when it was read.
#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    pub corners: Vec<VertexKey>,
    pub material: Option<String>,
}

/// Everything the geometry file says, before mesh construction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjDocument {
    pub attributes: RawAttributeLists,
    pub faces: Vec<Face>,
    /// `mtllib` names in the order they appeared.
    pub material_libraries: Vec<String>,
}

/// Parse an OBJ document from a [`BufRead`] implementation.
pub fn parse_obj_reader<R: BufRead>(reader: R) -> Result<ObjDocument> {
    let mut acc = ObjAccumulator::default();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        acc.feed(&line, line_no)?;
    }
    Ok(acc.finish())
}

/// Convenience helper to parse an OBJ string literal.
pub fn parse_obj_str(contents: &str) -> Result<ObjDocument> {
    parse_obj_reader(io::Cursor::new(contents))
}

/// Parse state threaded through the line loop.
#[derive(Default)]
struct ObjAccumulator {
    doc: ObjDocument,
    current_material: Option<String>,
}

impl ObjAccumulator {
    fn feed(&mut self, line: &str, line_no: usize) -> Result<()> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            return Ok(());
        };
        let attrs = &mut self.doc.attributes;

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                attrs.positions.push([x, y, z]);
            }
            "vt" => {
                let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                let v = match parts.next() {
                    Some(token) => parse_f32(Some(token), line_no, "v coordinate")?,
                    None => 0.0,
                };
                attrs.texcoords.push([u, 1.0 - v]);
            }
            "vn" => {
                let nx = parse_f32(parts.next(), line_no, "nx coordinate")?;
                let ny = parse_f32(parts.next(), line_no, "ny coordinate")?;
                let nz = parse_f32(parts.next(), line_no, "nz coordinate")?;
                attrs.normals.push([nx, ny, nz]);
            }
            "f" => {
                let corners: Vec<VertexKey> = parts
                    .map(|token| parse_face_vertex(token, attrs, line_no))
                    .collect();
                if corners.len() < 3 {
                    log::warn!(
                        "Skipping face with {} vertices on line {}",
                        corners.len(),
                        line_no + 1
                    );
                    return Ok(());
                }
                self.doc.faces.push(Face {
                    corners,
                    material: self.current_material.clone(),
                });
            }
            "mtllib" => {
                let names: Vec<String> = parts.map(str::to_owned).collect();
                if names.is_empty() {
                    log::warn!("mtllib without a file name on line {}", line_no + 1);
                }
                self.doc.material_libraries.extend(names);
            }
            "usemtl" => {
                let name = rest_of_line(trimmed, tag);
                self.current_material = (!name.is_empty()).then(|| name.to_owned());
            }
            _ => {
                // o/g/s and friends carry nothing we render.
            }
        }
        Ok(())
    }

    fn finish(self) -> ObjDocument {
        let doc = self.doc;
        log::debug!(
            "OBJ parsed: {} positions, {} texcoords, {} normals, {} faces",
            doc.attributes.positions.len(),
            doc.attributes.texcoords.len(),
            doc.attributes.normals.len(),
            doc.faces.len()
        );
        doc
    }
}

fn rest_of_line<'a>(trimmed: &'a str, tag: &str) -> &'a str {
    trimmed[tag.len()..].trim()
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> Result<f32> {
    let token = value.ok_or_else(|| anyhow!("Missing {} on line {}", what, line_no + 1))?;
    token
        .parse::<f32>()
        .with_context(|| format!("Failed to parse {} on line {}", what, line_no + 1))
}

fn parse_face_vertex(token: &str, attrs: &RawAttributeLists, line_no: usize) -> VertexKey {
    let mut split = token.split('/');
    let position = split.next().and_then(|value| {
        resolve_index(value, attrs.positions.len(), line_no, "position")
    });
    let texcoord = split.next().and_then(|value| {
        resolve_index(value, attrs.texcoords.len(), line_no, "texcoord")
    });
    let normal = split
        .next()
        .and_then(|value| resolve_index(value, attrs.normals.len(), line_no, "normal"));
    VertexKey::new(position, texcoord, normal)
}

/// 1-based (or negative, end-relative) OBJ index to a 0-based one.
///
/// Empty tokens mean "not given". Anything that cannot be resolved against the
/// list as it stands on this line becomes `None` and gets a default attribute.
fn resolve_index(token: &str, len: usize, line_no: usize, what: &str) -> Option<usize> {
    if token.is_empty() {
        return None;
    }
    let Ok(raw) = token.parse::<i64>() else {
        log::warn!(
            "Invalid {} index '{}' on line {}",
            what,
            token,
            line_no + 1
        );
        return None;
    };

    let idx = match raw {
        0 => None,
        r if r > 0 => Some(r - 1),
        r => Some(len as i64 + r),
    };
    match idx {
        Some(i) if i >= 0 && (i as usize) < len => Some(i as usize),
        _ => {
            log::warn!(
                "OBJ {} index {} out of bounds (len={}) on line {}",
                what,
                raw,
                len,
                line_no + 1
            );
            None
        }
    }
}
