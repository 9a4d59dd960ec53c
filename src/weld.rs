//! Indexed-mesh construction (vertex welding).
//!
//! Vertices shared between faces can carry the same attributes for both
//! faces (smooth shading, continuous UVs) or different ones (hard-edge
//! normals, UV seams). Occurrences with equal data are shared, the rest are
//! duplicated, so every source vertex maps to a small set of welded
//! variants. The welder tracks, per origin index, where those variants were
//! stored in the output list.

use hashbrown::HashMap;

use crate::basis::{texcoords_equal, vectors_equal};

/// Maximum number of welded vertices in one mesh group; triangle indices
/// are written as u16.
pub const MAX_GROUP_VERTICES: usize = u16::MAX as usize;

/// Whether vertex insertions are deduplicated or appended blindly.
///
/// `Duplicate` trades larger output for export speed and is selected once
/// per export run, not per mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeldMode {
    #[default]
    Weld,
    Duplicate,
}

/// One output vertex: position, normal and one coordinate per UV layer.
///
/// All vertices within one group carry texcoord sequences of the same
/// length; the partitioner guarantees this via its group keys.
#[derive(Debug, Clone, PartialEq)]
pub struct WeldedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub texcoords: Vec<[f32; 2]>,
}

impl WeldedVertex {
    fn matches(&self, other: &WeldedVertex) -> bool {
        vectors_equal(self.position, other.position)
            && vectors_equal(self.normal, other.normal)
            && self.texcoords.len() == other.texcoords.len()
            && self
                .texcoords
                .iter()
                .zip(&other.texcoords)
                .all(|(a, b)| texcoords_equal(*a, *b))
    }
}

/// Returned when a group's welded vertex list outgrows the u16 index range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupFull;

/// Maps a stream of per-face vertex insertions to a deduplicated vertex
/// list, handing back the welded index for each insertion.
pub struct VertexWelder {
    mode: WeldMode,
    vertices: Vec<WeldedVertex>,
    /// Origin index -> welded indices created for it so far.
    variants: HashMap<u32, Vec<u16>>,
}

impl VertexWelder {
    pub fn new(mode: WeldMode) -> Self {
        Self {
            mode,
            vertices: Vec::new(),
            variants: HashMap::new(),
        }
    }

    /// Insert one vertex occurrence and return its welded index.
    ///
    /// In [`WeldMode::Weld`], prior variants of the same origin index are
    /// scanned linearly and the first attribute-equal one is reused; the
    /// variant count per origin index is small in practice (at most one per
    /// adjacent smoothing-group/UV-seam combination). Tolerance-based
    /// equality rules out hashing the attributes themselves.
    pub fn insert(
        &mut self,
        origin_index: u32,
        position: [f32; 3],
        normal: [f32; 3],
        texcoords: &[[f32; 2]],
    ) -> Result<u16, GroupFull> {
        let vertex = WeldedVertex {
            position,
            normal,
            texcoords: texcoords.to_vec(),
        };

        if self.mode == WeldMode::Duplicate {
            return self.append(vertex);
        }

        if let Some(stored) = self.variants.get(&origin_index) {
            for &welded in stored {
                if self.vertices[welded as usize].matches(&vertex) {
                    return Ok(welded);
                }
            }
        }

        let new_index = self.append(vertex)?;
        self.variants
            .entry(origin_index)
            .or_default()
            .push(new_index);
        Ok(new_index)
    }

    fn append(&mut self, vertex: WeldedVertex) -> Result<u16, GroupFull> {
        if self.vertices.len() >= MAX_GROUP_VERTICES {
            return Err(GroupFull);
        }
        let index = self.vertices.len() as u16;
        self.vertices.push(vertex);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Consume the welder, yielding the deduplicated vertex list.
    pub fn into_vertices(self) -> Vec<WeldedVertex> {
        self.vertices
    }
}
