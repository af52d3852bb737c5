//! Where asset bytes come from: a directory on disk or an in-memory table.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

/// Resolves sibling resources (OBJ, MTL, textures) by name.
pub trait AssetSource {
    /// Read the whole resource into memory.
    fn read(&self, name: &str) -> io::Result<Vec<u8>>;

    /// Human-readable location of `name`, used in log and error messages.
    fn describe(&self, name: &str) -> String {
        name.to_owned()
    }
}

/// Resources are files relative to a root directory.
#[derive(Clone, Debug)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Split a model path into its parent directory source and file name.
    pub fn for_file(path: impl AsRef<Path>) -> Option<(Self, String)> {
        let path = path.as_ref();
        let name = path.file_name()?.to_str()?.to_owned();
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Some((Self::new(root), name))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirSource {
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(name))
    }

    fn describe(&self, name: &str) -> String {
        self.root.join(name).display().to_string()
    }
}

/// Name-keyed blobs held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(name, contents);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.files.insert(name.into(), contents.into());
    }
}

impl AssetSource for MemorySource {
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        self.files.get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such asset: {name}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_reports_missing_as_not_found() {
        let src = MemorySource::new().with("a.obj", "v 0 0 0");
        assert_eq!(src.read("a.obj").unwrap(), b"v 0 0 0");
        let err = src.read("b.mtl").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn dir_source_splits_model_path() {
        let (src, name) = DirSource::for_file("assets/models/clip.obj").unwrap();
        assert_eq!(name, "clip.obj");
        assert_eq!(src.root(), Path::new("assets/models"));
    }

    #[test]
    fn bare_file_name_resolves_to_current_dir() {
        let (src, name) = DirSource::for_file("clip.obj").unwrap();
        assert_eq!(name, "clip.obj");
        assert_eq!(src.root(), Path::new(""));
    }
}
