//! BBM container serialization.
//!
//! All multi-byte values are little-endian. Strings are a u32 length prefix
//! followed by the raw bytes, no terminator. Vertex attributes are written
//! as parallel length-prefixed arrays, not interleaved, and every vector
//! and matrix passes through the basis conversion here, at the
//! serialization boundary.

use std::io::Write;

use crate::basis::{convert_matrix, convert_vector};
use crate::error::ExportError;
use crate::partition::{mesh_flags, MeshGroup};
use crate::scene::{ModelHeader, NodeKind, SceneNode};
use crate::weld::MAX_GROUP_VERTICES;

/// First four bytes of every BBM file.
pub const MAGIC_HEADER: u32 = 0xabca_fe07;

/// Creator tag for files produced by the authoring-tool pipeline.
pub const CREATOR_TOOL: u32 = 1;
/// Creator tag reserved for files rewritten by the engine itself.
pub const CREATOR_NATIVE: u32 = 2;

// Node type tags.
const NT_MESH: u32 = 0;
const NT_GROUP: u32 = 1;
const NT_EFFECT: u32 = 2;

/// Serialization quirks that are configurable per export run.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Overwrite the translation row's homogeneous element with 1.0. On by
    /// default; disable to preserve source transforms that carry 0 there.
    pub force_unit_w: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { force_unit_w: true }
    }
}

/// Write a complete BBM asset: container header, then the root nodes
/// depth-first.
pub fn write_model<W: Write>(
    w: &mut W,
    header: &ModelHeader,
    roots: &[SceneNode],
    options: &WriteOptions,
) -> Result<(), ExportError> {
    write_u32(w, MAGIC_HEADER)?;
    write_u32(w, CREATOR_TOOL)?;
    write_u16(w, header.flags)?;
    write_string(w, &header.lod_class)?;

    write_u32(w, roots.len() as u32)?;
    for node in roots {
        write_node(w, node, options)?;
    }
    Ok(())
}

fn write_node<W: Write>(
    w: &mut W,
    node: &SceneNode,
    options: &WriteOptions,
) -> Result<(), ExportError> {
    let tag = match node.kind {
        NodeKind::Mesh { .. } => NT_MESH,
        NodeKind::Group => NT_GROUP,
        NodeKind::Effect => NT_EFFECT,
    };
    write_u32(w, tag)?;
    write_string(w, &node.name)?;
    write_string(w, &node.group_tag)?;
    write_matrix(w, &node.transform, options.force_unit_w)?;

    if let NodeKind::Mesh { groups } = &node.kind {
        write_u32(w, groups.len() as u32)?;
        for group in groups {
            write_mesh_group(w, group)?;
        }
    }

    write_u32(w, node.children.len() as u32)?;
    for child in &node.children {
        write_node(w, child, options)?;
    }
    Ok(())
}

fn write_mesh_group<W: Write>(w: &mut W, group: &MeshGroup) -> Result<(), ExportError> {
    // Overflow and emptiness are caught while the group is built; the
    // writer only ever sees valid groups.
    debug_assert!(!group.vertices.is_empty());
    debug_assert!(group.vertices.len() <= MAX_GROUP_VERTICES);
    debug_assert!(group.indices.len() % 3 == 0);

    write_u16(w, group.flags)?;
    write_string(w, &group.material.shader)?;

    // Parallel vertex arrays. The reader slurps each into its own vector,
    // so every array carries its own length prefix.
    write_u32(w, group.vertices.len() as u32)?;
    for vertex in &group.vertices {
        write_vector(w, vertex.position)?;
    }
    write_u32(w, group.vertices.len() as u32)?;
    for vertex in &group.vertices {
        write_vector(w, vertex.normal)?;
    }

    // Tangents and bitangents are not computed by this pipeline.
    write_u32(w, 0)?;
    write_u32(w, 0)?;

    let layers = group.vertices[0].texcoords.len();
    write_u32(w, layers as u32)?;
    for layer in 0..layers {
        write_u32(w, group.vertices.len() as u32)?;
        for vertex in &group.vertices {
            write_texcoord(w, vertex.texcoords[layer])?;
        }
    }

    write_u32(w, group.indices.len() as u32)?;
    for &index in &group.indices {
        write_u16(w, index)?;
    }

    // Texture names, extension swapped for the engine's streamed format.
    write_string(w, &dds_name(&group.textures[0]))?;
    if group.textures.len() == 2 {
        write_string(w, &dds_name(&group.textures[1]))?;
    }
    if let Some(emissive) = &group.emissive {
        write_string(w, &dds_name(emissive))?;
    }

    if group.flags & mesh_flags::BUMP_MAP != 0 {
        write_f32(w, group.material.parallax_strength)?;
        write_f32(w, group.material.normal_strength)?;
    }

    write_f32(w, group.material.specularity)?;
    write_u32(w, group.material.hardness)?;
    Ok(())
}

/// Swap a texture reference's extension for the engine's streamed format.
fn dds_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) => format!("{stem}.dds"),
        None => format!("{name}.dds"),
    }
}

#[inline]
fn write_u32<W: Write>(w: &mut W, value: u32) -> std::io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

#[inline]
fn write_u16<W: Write>(w: &mut W, value: u16) -> std::io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

#[inline]
fn write_f32<W: Write>(w: &mut W, value: f32) -> std::io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

fn write_string<W: Write>(w: &mut W, value: &str) -> std::io::Result<()> {
    write_u32(w, value.len() as u32)?;
    w.write_all(value.as_bytes())
}

fn write_vector<W: Write>(w: &mut W, value: [f32; 3]) -> std::io::Result<()> {
    let v = convert_vector(value);
    write_f32(w, v[0])?;
    write_f32(w, v[1])?;
    write_f32(w, v[2])
}

fn write_texcoord<W: Write>(w: &mut W, value: [f32; 2]) -> std::io::Result<()> {
    write_f32(w, value[0])?;
    write_f32(w, value[1])
}

fn write_matrix<W: Write>(
    w: &mut W,
    value: &[[f32; 4]; 4],
    force_unit_w: bool,
) -> std::io::Result<()> {
    let m = convert_matrix(value, force_unit_w);
    for row in &m {
        for &component in row {
            write_f32(w, component)?;
        }
    }
    Ok(())
}
