//! MTL material library parser.

use std::{
    collections::HashMap,
    io::{self, BufRead},
};

use anyhow::{Context, Result};

/// Surface properties referenced by `usemtl`.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse: [f32; 3],
    pub ambient: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    /// Opacity in `[0, 1]`; `Tr` values are stored inverted.
    pub transparency: f32,
    pub illumination_model: i32,
    /// `map_Kd` file name, relative to the library.
    pub texture: Option<String>,
}

impl Material {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse: [1.0; 3],
            ambient: [1.0; 3],
            specular: [1.0; 3],
            shininess: 32.0,
            transparency: 1.0,
            illumination_model: 2,
            texture: None,
        }
    }
}

pub type MaterialLibrary = HashMap<String, Material>;

pub fn parse_mtl_reader<R: BufRead>(reader: R) -> Result<MaterialLibrary> {
    let mut library = MaterialLibrary::new();
    let mut current: Option<Material> = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read MTL line {}", line_no + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else { continue };

        if tag == "newmtl" {
            if let Some(done) = current.take() {
                library.insert(done.name.clone(), done);
            }
            let name = trimmed[tag.len()..].trim();
            current = Some(Material::named(name));
            continue;
        }

        let Some(mat) = current.as_mut() else {
            log::debug!("MTL line {} precedes any newmtl, ignored", line_no + 1);
            continue;
        };
        let args: Vec<&str> = parts.collect();

        match tag {
            "Kd" => set_rgb(&mut mat.diffuse, &args, tag, line_no),
            "Ka" => set_rgb(&mut mat.ambient, &args, tag, line_no),
            "Ks" => set_rgb(&mut mat.specular, &args, tag, line_no),
            "Ns" => {
                if let Some(n) = scalar(&args, tag, line_no) {
                    mat.shininess = n;
                }
            }
            "d" => {
                if let Some(d) = scalar(&args, tag, line_no) {
                    mat.transparency = d.clamp(0.0, 1.0);
                }
            }
            "Tr" => {
                if let Some(tr) = scalar(&args, tag, line_no) {
                    mat.transparency = (1.0 - tr).clamp(0.0, 1.0);
                }
            }
            "illum" => match args.first().map(|s| s.parse::<i32>()) {
                Some(Ok(model)) => mat.illumination_model = model,
                _ => log::warn!("Bad illum value on MTL line {}", line_no + 1),
            },
            "map_Kd" => {
                // Option flags (-s, -o, -bm ...) precede the file name.
                match args.last() {
                    Some(file) => mat.texture = Some((*file).to_owned()),
                    None => log::warn!("map_Kd without file on MTL line {}", line_no + 1),
                }
            }
            _ => {}
        }
    }

    if let Some(done) = current.take() {
        library.insert(done.name.clone(), done);
    }
    Ok(library)
}

pub fn parse_mtl_str(contents: &str) -> Result<MaterialLibrary> {
    parse_mtl_reader(io::Cursor::new(contents))
}

fn scalar(args: &[&str], tag: &str, line_no: usize) -> Option<f32> {
    match args.first().map(|s| s.parse::<f32>()) {
        Some(Ok(v)) => Some(v),
        _ => {
            log::warn!("Bad {} value on MTL line {}", tag, line_no + 1);
            None
        }
    }
}

fn set_rgb(dst: &mut [f32; 3], args: &[&str], tag: &str, line_no: usize) {
    if args.len() < 3 {
        log::warn!("{} needs 3 components on MTL line {}", tag, line_no + 1);
        return;
    }
    let mut rgb = [0.0f32; 3];
    for (slot, token) in rgb.iter_mut().zip(args) {
        match token.parse::<f32>() {
            Ok(v) => *slot = v,
            Err(_) => {
                log::warn!("Bad {} component '{}' on MTL line {}", tag, token, line_no + 1);
                return;
            }
        }
    }
    *dst = rgb;
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        # exported
        newmtl body
        Kd 0.2 0.4 0.6
        Ka 0.1 0.1 0.1
        Ks 0.5 0.5 0.5
        Ns 96.0
        Tr 0.3
        illum 1
        map_Kd -s 1 1 1 body_diffuse.png

        newmtl glass
        d 0.25
    "#;

    #[test]
    fn parses_properties_per_material() {
        let lib = parse_mtl_str(SAMPLE).unwrap();
        assert_eq!(lib.len(), 2);

        let body = &lib["body"];
        assert_eq!(body.diffuse, [0.2, 0.4, 0.6]);
        assert_eq!(body.ambient, [0.1, 0.1, 0.1]);
        assert_eq!(body.specular, [0.5, 0.5, 0.5]);
        assert_eq!(body.shininess, 96.0);
        assert!((body.transparency - 0.7).abs() < 1e-6);
        assert_eq!(body.illumination_model, 1);
        assert_eq!(body.texture.as_deref(), Some("body_diffuse.png"));

        let glass = &lib["glass"];
        assert_eq!(glass.transparency, 0.25);
        assert_eq!(glass.diffuse, [1.0, 1.0, 1.0]);
        assert_eq!(glass.texture, None);
    }

    #[test]
    fn defaults_match_unlit_white() {
        let m = Material::default();
        assert_eq!(m.diffuse, [1.0; 3]);
        assert_eq!(m.shininess, 32.0);
        assert_eq!(m.transparency, 1.0);
        assert_eq!(m.illumination_model, 2);
    }

    #[test]
    fn malformed_values_keep_defaults() {
        let lib = parse_mtl_str("Kd 0 0 0\nnewmtl m\nKd 0.5 x 0.5\nNs\nillum two\n").unwrap();
        let m = &lib["m"];
        assert_eq!(m.diffuse, [1.0; 3]);
        assert_eq!(m.shininess, 32.0);
        assert_eq!(m.illumination_model, 2);
    }
}
