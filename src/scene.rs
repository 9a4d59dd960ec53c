//! Scene-node tree assembly and naming rules.
//!
//! Nodes are built once per export pass, held in memory while one asset is
//! serialized and discarded afterwards. The tree never mutates after
//! construction.

use crate::basis;
use crate::error::ExportError;
use crate::partition::MeshGroup;

/// Node-level flag bits written in the container header.
pub mod node_flags {
    pub const SHADOW_BLOCKER: u16 = 1;
    pub const SHADOW_RECEIVER: u16 = 2;
    pub const INSTANCED: u16 = 4;
}

/// Whole-asset properties written ahead of the node tree.
#[derive(Debug, Clone)]
pub struct ModelHeader {
    /// Combination of [`node_flags`] bits.
    pub flags: u16,
    /// Level-of-detail class consumed by the engine's streaming.
    pub lod_class: String,
}

impl Default for ModelHeader {
    fn default() -> Self {
        Self {
            flags: 0,
            lod_class: "building".to_string(),
        }
    }
}

/// Payload variants of a scene node.
#[derive(Debug)]
pub enum NodeKind {
    /// Renderable geometry, one entry per material/texture binding.
    Mesh { groups: Vec<MeshGroup> },
    /// Pure grouping node.
    Group,
    /// Effect anchor; a leaf carrying only name and transform.
    Effect,
}

/// One node of the exported scene tree.
#[derive(Debug)]
pub struct SceneNode {
    pub name: String,
    /// Opaque group-membership tag passed through to the engine.
    pub group_tag: String,
    /// Transform in the authoring tool's convention; converted at write time.
    pub transform: [[f32; 4]; 4],
    pub kind: NodeKind,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Build a mesh node. Fails on a name violating the naming conventions
    /// or an empty group list (a mesh without geometry must never be
    /// emitted).
    pub fn mesh(
        name: &str,
        group_tag: impl Into<String>,
        transform: [[f32; 4]; 4],
        groups: Vec<MeshGroup>,
        children: Vec<SceneNode>,
    ) -> Result<Self, ExportError> {
        if groups.is_empty() {
            return Err(ExportError::EmptyMesh(name.to_string()));
        }
        Ok(Self {
            name: canonical_name(name)?,
            group_tag: group_tag.into(),
            transform,
            kind: NodeKind::Mesh { groups },
            children,
        })
    }

    /// Build a grouping node.
    pub fn group(
        name: &str,
        group_tag: impl Into<String>,
        transform: [[f32; 4]; 4],
        children: Vec<SceneNode>,
    ) -> Result<Self, ExportError> {
        Ok(Self {
            name: canonical_name(name)?,
            group_tag: group_tag.into(),
            transform,
            kind: NodeKind::Group,
            children,
        })
    }

    /// Build an effect leaf.
    pub fn effect(
        name: &str,
        group_tag: impl Into<String>,
        transform: [[f32; 4]; 4],
    ) -> Result<Self, ExportError> {
        Ok(Self {
            name: canonical_name(name)?,
            group_tag: group_tag.into(),
            transform,
            kind: NodeKind::Effect,
            children: Vec::new(),
        })
    }

    /// Nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(SceneNode::node_count)
            .sum::<usize>()
    }
}

/// Identity transform for sources that don't carry one.
pub const IDENTITY_TRANSFORM: [[f32; 4]; 4] = basis::IDENTITY;

/// Validate a name against the engine's character set and strip the
/// authoring tool's `.NNN` duplicate suffix.
pub fn canonical_name(name: &str) -> Result<String, ExportError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':');
    if !name.chars().all(allowed) {
        return Err(ExportError::InvalidName(name.to_string()));
    }

    match name.rsplit_once('.') {
        Some((stem, suffix))
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) =>
        {
            Ok(stem.to_string())
        }
        _ => Ok(name.to_string()),
    }
}
