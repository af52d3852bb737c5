//! Texture data and material texture resolution.
//! Decoded to RGBA8; anything that fails to load becomes a 1x1 white pixel.

use std::collections::HashMap;

use anyhow::Context;

use crate::{mtl::Material, source::AssetSource};

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureFormat {
    Rgba8,
}

impl TextureData {
    /// Create a new texture with given dimensions and RGBA8 format.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> anyhow::Result<Self> {
        let expected = width as usize * height as usize * 4;
        anyhow::ensure!(
            data.len() == expected,
            "RGBA8 data is {} bytes, expected {} for {}x{}",
            data.len(),
            expected,
            width,
            height
        );
        Ok(Self {
            data,
            width,
            height,
            format: TextureFormat::Rgba8,
        })
    }

    /// 1x1 opaque white, used whenever a material has no usable texture.
    pub fn white() -> Self {
        Self {
            data: vec![255, 255, 255, 255],
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
        }
    }

    /// Decode an encoded image (PNG/JPEG) held in memory.
    pub fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        let img = image::load_from_memory(bytes).context("Failed to decode image")?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new_rgba8(width, height, rgba.into_raw())
    }

    /// Get the number of bytes per pixel for the format.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self.format {
            TextureFormat::Rgba8 => 4,
        }
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        let expected_size = (self.width * self.height * self.bytes_per_pixel()) as usize;
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }
}

/// Resolves material texture references, decoding each file once.
pub struct TextureResolver<'a, S: AssetSource + ?Sized> {
    source: &'a S,
    cache: HashMap<String, TextureData>,
}

impl<'a, S: AssetSource + ?Sized> TextureResolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            cache: HashMap::new(),
        }
    }

    /// Texture for `material`, or the white fallback. Never fails.
    pub fn resolve(&mut self, material: Option<&Material>) -> TextureData {
        match material.and_then(|m| m.texture.as_deref()) {
            Some(name) => self.load(name),
            None => TextureData::white(),
        }
    }

    fn load(&mut self, name: &str) -> TextureData {
        if let Some(hit) = self.cache.get(name) {
            return hit.clone();
        }
        let loaded = self
            .source
            .read(name)
            .with_context(|| format!("Failed to read texture {}", self.source.describe(name)))
            .and_then(|bytes| TextureData::decode(&bytes));
        let texture = match loaded {
            Ok(tex) => {
                log::info!("Loaded texture {} ({}x{})", name, tex.width, tex.height);
                tex
            }
            Err(e) => {
                log::warn!("{e:#}; using default white texture");
                TextureData::white()
            }
        };
        self.cache.insert(name.to_owned(), texture.clone());
        texture
    }
}
