//! Texture resolution against the export directory layout.
//!
//! The partitioner only ever sees this interface; whether textures live in
//! a flat directory, an archive or a test fixture is the locator's concern.
//! Resolution failure for a face's texture is fatal for the whole export,
//! while the `em_` emissive companion is optional by convention.

use std::path::{Path, PathBuf};

/// What the locator learned about one referenced texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTexture {
    /// Path relative to the engine's data root, as written into the model.
    pub path: String,
    /// Whether the image carries an alpha channel; `None` if the file
    /// couldn't be probed.
    pub has_alpha: Option<bool>,
}

/// Resolves texture references for the mesh partitioner.
pub trait TextureLocator {
    /// Resolve a texture reference to its engine-relative path.
    fn resolve(&self, reference: &str) -> Option<ResolvedTexture>;

    /// Look for an `em_<basename>` companion beside the base texture,
    /// returning its file name if present.
    fn find_emissive(&self, base: &str) -> Option<String>;
}

/// Locator backed by a flat textures directory on disk.
pub struct DirTextureLocator {
    dir: PathBuf,
}

impl DirTextureLocator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn probe_alpha(&self, path: &Path) -> Option<bool> {
        let img = image::open(path).ok()?;
        Some(img.color().has_alpha())
    }
}

impl TextureLocator for DirTextureLocator {
    fn resolve(&self, reference: &str) -> Option<ResolvedTexture> {
        let file_name = Path::new(reference).file_name()?.to_str()?.to_string();
        let on_disk = self.dir.join(&file_name);
        if !on_disk.is_file() {
            return None;
        }
        Some(ResolvedTexture {
            path: format!("textures/{file_name}"),
            has_alpha: self.probe_alpha(&on_disk),
        })
    }

    fn find_emissive(&self, base: &str) -> Option<String> {
        let file_name = Path::new(base).file_name()?.to_str()?;
        let emissive = format!("em_{file_name}");
        self.dir.join(&emissive).is_file().then_some(emissive)
    }
}
