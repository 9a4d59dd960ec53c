//! Export error and warning types.
//!
//! Fatal conditions abort the whole asset; no partial model file is ever
//! committed. Warnings are accumulated on the export context and logged as
//! they occur, but never stop an export.

use std::fmt;

use thiserror::Error;

/// Fatal conditions that abort an asset's export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("mesh \"{mesh}\": texture \"{texture}\" could not be resolved, aborting export")]
    UnresolvedTexture { mesh: String, texture: String },

    #[error("object \"{0}\" has no mesh groups")]
    EmptyMesh(String),

    #[error("mesh \"{mesh}\" exceeds 65535 welded vertices in one group, split the mesh")]
    GroupVertexOverflow { mesh: String },

    #[error("mesh \"{mesh}\": face {face} is degenerate")]
    DegenerateFace { mesh: String, face: usize },

    #[error("mesh \"{mesh}\" has faces without texture, aborting export")]
    UntexturedFaces { mesh: String },

    #[error("\"{0}\" doesn't adhere to naming conventions")]
    InvalidName(String),

    #[error("mesh \"{mesh}\": face {face} has {corners} corners, expected 3 or 4")]
    MalformedFace {
        mesh: String,
        face: usize,
        corners: usize,
    },

    #[error("mesh \"{mesh}\": face {face} doesn't carry one texture coordinate per corner and layer")]
    UvLayerMismatch { mesh: String, face: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Recoverable conditions, reported as events without stopping the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportWarning {
    /// No description found for a material name; the default material is used.
    UnresolvedMaterial { name: String },
    /// A texture's alpha channel contradicts the material's alpha/bump setup.
    AlphaChannelMismatch {
        mesh: String,
        texture: String,
        has_alpha: bool,
    },
    /// A flat-shaded face produced a zero-length normal; a zero vector is used.
    ZeroLengthNormal { mesh: String, face: usize },
}

impl fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportWarning::UnresolvedMaterial { name } => write!(
                f,
                "couldn't find description for material \"{name}\", using default material"
            ),
            ExportWarning::AlphaChannelMismatch {
                mesh,
                texture,
                has_alpha: true,
            } => write!(
                f,
                "mesh \"{mesh}\": {texture} is used without alphatest/blend or bumpmap but has alpha channel"
            ),
            ExportWarning::AlphaChannelMismatch {
                mesh,
                texture,
                has_alpha: false,
            } => write!(
                f,
                "mesh \"{mesh}\": {texture} is used with alphatest/blend or bumpmap but has no alpha channel"
            ),
            ExportWarning::ZeroLengthNormal { mesh, face } => write!(
                f,
                "mesh \"{mesh}\": face {face} has zero-length flat normal"
            ),
        }
    }
}
