//! Material records and the TOML-backed material store.
//!
//! Materials are authored centrally and looked up by canonical name while
//! partitioning faces. An unresolved name falls back to the default
//! material; the partitioner reports the fallback as a warning event.

use std::path::Path;

use anyhow::{Context, Result};
use hashbrown::HashMap;
use serde::Deserialize;

/// Shading state for one material.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Material {
    #[serde(skip)]
    pub name: String,
    pub lighting: bool,
    pub cull_faces: bool,
    pub alpha_test: bool,
    pub alpha_blend: bool,
    pub bump_map: bool,
    pub specularity: f32,
    pub hardness: u32,
    pub parallax_strength: f32,
    pub normal_strength: f32,
    pub shader: String,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            lighting: true,
            cull_faces: true,
            alpha_test: false,
            alpha_blend: false,
            bump_map: false,
            specularity: 0.2,
            hardness: 30,
            parallax_strength: 0.07,
            normal_strength: 1.5,
            shader: String::new(),
        }
    }
}

#[derive(Deserialize)]
struct MaterialFile {
    #[serde(default)]
    materials: HashMap<String, Material>,
}

/// The set of material descriptions resolved for one export run.
#[derive(Debug, Default)]
pub struct MaterialStore {
    materials: HashMap<String, Material>,
}

impl MaterialStore {
    /// A store with no descriptions; every lookup falls back to the default
    /// material.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a materials file holding `[materials.<name>]` tables.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read materials file: {:?}", path))?;
        let file: MaterialFile = toml::from_str(&text)
            .with_context(|| format!("Failed to parse materials file: {:?}", path))?;

        let mut store = Self::empty();
        for (name, mut material) in file.materials {
            material.name = name.clone();
            store.materials.insert(name, material);
        }
        Ok(store)
    }

    pub fn insert(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    /// Look up a material by canonical name.
    pub fn resolve(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
