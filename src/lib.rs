//! bbm-export library
//!
//! Turns authoring-tool scenes into the engine's BBM model container:
//! faces are partitioned by material/texture binding, vertices are welded
//! per group, and everything is basis-converted into the engine's frame as
//! it is serialized. Used by the `bbm-export` binary and by other pipeline
//! tools.

pub mod basis;
pub mod error;
pub mod export;
pub mod formats;
pub mod material;
pub mod obj;
pub mod partition;
pub mod scene;
pub mod texture;
pub mod weld;

pub use error::{ExportError, ExportWarning};
pub use export::{build_node_tree, check_obj, convert_obj, export_model};
pub use formats::{write_model, WriteOptions, CREATOR_NATIVE, CREATOR_TOOL, MAGIC_HEADER};
pub use material::{Material, MaterialStore};
pub use partition::{
    mesh_flags, partition_and_weld, ExportContext, MeshGroup, SourceCorner, SourceFace,
};
pub use scene::{canonical_name, node_flags, ModelHeader, NodeKind, SceneNode};
pub use texture::{DirTextureLocator, ResolvedTexture, TextureLocator};
pub use weld::{VertexWelder, WeldMode, WeldedVertex, MAX_GROUP_VERTICES};
