//! Face-stream partitioning into per-material mesh groups.
//!
//! Faces are grouped by their (material, texture set) binding; each group
//! owns its own vertex welder, so a source vertex shared by faces of
//! different materials is welded independently in every group that touches
//! it. Group order, vertex order and index order all follow first-seen
//! input order, keeping repeated exports byte-identical.

use hashbrown::HashMap;

use crate::basis::{cross, normalized};
use crate::error::{ExportError, ExportWarning};
use crate::material::{Material, MaterialStore};
use crate::scene::canonical_name;
use crate::texture::TextureLocator;
use crate::weld::{VertexWelder, WeldMode, WeldedVertex};

/// Render-flag bits stored per mesh group.
pub mod mesh_flags {
    pub const LIGHTING: u16 = 1;
    pub const CULL_FACES: u16 = 2;
    pub const ALPHA_TEST: u16 = 4;
    pub const ALPHA_BLEND: u16 = 8;
    pub const PER_PIXEL_LIGHTING: u16 = 16;
    pub const LIGHT_MAP: u16 = 32;
    pub const BUMP_MAP: u16 = 64;
    pub const EMISSIVE_MAP: u16 = 128;
}

/// Faces flatter than this (squared cross-product length) abort the export.
const FACE_DEGENERATE_EPSILON: f32 = 1e-14;

/// One corner of a source face.
#[derive(Debug, Clone, Copy)]
pub struct SourceCorner {
    /// Index into the authoring mesh's raw vertex array.
    pub origin_index: u32,
    pub position: [f32; 3],
    /// The corner's smooth-shading normal; unused for flat faces.
    pub normal: [f32; 3],
}

/// A face handed over by the scene source: a triangle or quad plus its
/// material and per-layer texture binding.
#[derive(Debug, Clone)]
pub struct SourceFace {
    pub smooth: bool,
    /// 3 or 4 corners, winding preserved into the output triangles.
    pub corners: Vec<SourceCorner>,
    /// Material name as authored; canonicalized during partitioning.
    pub material: String,
    /// One texture reference per UV layer.
    pub textures: Vec<String>,
    /// Texture coordinates: `uvs[layer][corner]`.
    pub uvs: Vec<Vec<[f32; 2]>>,
}

/// The unit of output: welded vertices and triangles sharing one
/// material/texture binding.
#[derive(Debug)]
pub struct MeshGroup {
    pub material: Material,
    /// Engine-relative texture paths: base, then the optional light map.
    pub textures: Vec<String>,
    /// File name of the `em_` companion, if one was located.
    pub emissive: Option<String>,
    /// Combination of [`mesh_flags`] bits.
    pub flags: u16,
    pub vertices: Vec<WeldedVertex>,
    pub indices: Vec<u16>,
}

/// Per-run export state: weld mode, the resolved material set and the
/// warnings accumulated so far.
pub struct ExportContext {
    pub weld_mode: WeldMode,
    pub materials: MaterialStore,
    warnings: Vec<ExportWarning>,
}

impl ExportContext {
    pub fn new(materials: MaterialStore, weld_mode: WeldMode) -> Self {
        Self {
            weld_mode,
            materials,
            warnings: Vec::new(),
        }
    }

    /// Record a recoverable event and log it.
    pub fn warn(&mut self, warning: ExportWarning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[ExportWarning] {
        &self.warnings
    }
}

/// Value-based grouping key; owns its strings so group identity doesn't
/// depend on any source object's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey {
    material: String,
    textures: Vec<String>,
}

struct GroupBuilder {
    material: Material,
    textures: Vec<String>,
    emissive: Option<String>,
    flags: u16,
    welder: VertexWelder,
    indices: Vec<u16>,
}

/// Convert a face stream into mesh groups, welding vertices per group.
///
/// Fatal conditions (unresolvable textures, degenerate or malformed faces,
/// vertex overflow, an empty mesh) abort immediately; no partial group set
/// is returned.
pub fn partition_and_weld(
    mesh_name: &str,
    faces: &[SourceFace],
    locator: &dyn TextureLocator,
    ctx: &mut ExportContext,
) -> Result<Vec<MeshGroup>, ExportError> {
    validate_faces(mesh_name, faces)?;

    let mut order: Vec<GroupBuilder> = Vec::new();
    let mut by_key: HashMap<GroupKey, usize> = HashMap::new();

    for (face_index, face) in faces.iter().enumerate() {
        let material = resolve_material(&face.material, ctx)?;

        let mut resolved = Vec::with_capacity(face.textures.len());
        for reference in &face.textures {
            let texture =
                locator
                    .resolve(reference)
                    .ok_or_else(|| ExportError::UnresolvedTexture {
                        mesh: mesh_name.to_string(),
                        texture: reference.clone(),
                    })?;
            resolved.push(texture);
        }

        let key = GroupKey {
            material: material.name.clone(),
            textures: resolved.iter().map(|t| t.path.clone()).collect(),
        };

        let slot = match by_key.get(&key) {
            Some(&slot) => slot,
            None => {
                // First face of this binding: derive flags and run the
                // alpha-channel advisory once per group.
                let wants_alpha =
                    material.alpha_test || material.alpha_blend || material.bump_map;
                for texture in &resolved {
                    if let Some(has_alpha) = texture.has_alpha {
                        if has_alpha != wants_alpha {
                            ctx.warn(ExportWarning::AlphaChannelMismatch {
                                mesh: mesh_name.to_string(),
                                texture: texture.path.clone(),
                                has_alpha,
                            });
                        }
                    }
                }

                let emissive = locator.find_emissive(&key.textures[0]);
                let flags = group_flags(&material, key.textures.len(), emissive.is_some());

                order.push(GroupBuilder {
                    material,
                    textures: key.textures.clone(),
                    emissive,
                    flags,
                    welder: VertexWelder::new(ctx.weld_mode),
                    indices: Vec::new(),
                });
                by_key.insert(key, order.len() - 1);
                order.len() - 1
            }
        };

        add_face(mesh_name, face_index, face, &mut order[slot], ctx)?;
    }

    if order.is_empty() {
        return Err(ExportError::EmptyMesh(mesh_name.to_string()));
    }

    let groups = order
        .into_iter()
        .map(|builder| {
            let group = MeshGroup {
                material: builder.material,
                textures: builder.textures,
                emissive: builder.emissive,
                flags: builder.flags,
                vertices: builder.welder.into_vertices(),
                indices: builder.indices,
            };
            tracing::debug!(
                "{} / {:?}: {} vertices, {} faces",
                group.material.name,
                group.textures,
                group.vertices.len(),
                group.indices.len() / 3
            );
            group
        })
        .collect();

    Ok(groups)
}

/// Structural and geometric pre-checks; all of these are caller data bugs
/// and abort before any group is built.
fn validate_faces(mesh_name: &str, faces: &[SourceFace]) -> Result<(), ExportError> {
    for (face_index, face) in faces.iter().enumerate() {
        let corners = face.corners.len();
        if corners != 3 && corners != 4 {
            return Err(ExportError::MalformedFace {
                mesh: mesh_name.to_string(),
                face: face_index,
                corners,
            });
        }

        if face.textures.is_empty() {
            return Err(ExportError::UntexturedFaces {
                mesh: mesh_name.to_string(),
            });
        }

        if face.uvs.len() != face.textures.len()
            || face.uvs.iter().any(|layer| layer.len() != corners)
        {
            return Err(ExportError::UvLayerMismatch {
                mesh: mesh_name.to_string(),
                face: face_index,
            });
        }

        let degenerate = is_triangle_degenerate(face, 0, 1, 2)
            || (corners == 4 && is_triangle_degenerate(face, 2, 3, 0));
        if degenerate {
            return Err(ExportError::DegenerateFace {
                mesh: mesh_name.to_string(),
                face: face_index,
            });
        }
    }
    Ok(())
}

fn is_triangle_degenerate(face: &SourceFace, a: usize, b: usize, c: usize) -> bool {
    let n = cross(
        edge(face.corners[a].position, face.corners[b].position),
        edge(face.corners[a].position, face.corners[c].position),
    );
    n[0] * n[0] + n[1] * n[1] + n[2] * n[2] < FACE_DEGENERATE_EPSILON
}

#[inline]
fn edge(from: [f32; 3], to: [f32; 3]) -> [f32; 3] {
    [to[0] - from[0], to[1] - from[1], to[2] - from[2]]
}

/// Canonicalize and resolve a face's material name. Unknown names fall back
/// to the default material; the unnamed material does so silently.
fn resolve_material(name: &str, ctx: &mut ExportContext) -> Result<Material, ExportError> {
    let canonical = canonical_name(name)?;
    if let Some(material) = ctx.materials.resolve(&canonical) {
        return Ok(material.clone());
    }
    if !canonical.is_empty() {
        ctx.warn(ExportWarning::UnresolvedMaterial { name: canonical });
    }
    Ok(Material::default())
}

fn group_flags(material: &Material, texture_layers: usize, has_emissive: bool) -> u16 {
    let mut flags = mesh_flags::PER_PIXEL_LIGHTING;
    if texture_layers == 2 {
        flags |= mesh_flags::LIGHT_MAP;
    }
    if has_emissive {
        flags |= mesh_flags::EMISSIVE_MAP;
    }
    if material.lighting {
        flags |= mesh_flags::LIGHTING;
    }
    if material.cull_faces {
        flags |= mesh_flags::CULL_FACES;
    }
    if material.alpha_test {
        flags |= mesh_flags::ALPHA_TEST;
    }
    if material.alpha_blend {
        flags |= mesh_flags::ALPHA_BLEND;
    }
    if material.bump_map {
        flags |= mesh_flags::BUMP_MAP;
    }
    flags
}

/// Push one face's corners through the group's welder and append its
/// triangles. A quad becomes two triangles sharing the first/third
/// diagonal.
fn add_face(
    mesh_name: &str,
    face_index: usize,
    face: &SourceFace,
    builder: &mut GroupBuilder,
    ctx: &mut ExportContext,
) -> Result<(), ExportError> {
    let flat_normal = if face.smooth {
        None
    } else {
        let n = cross(
            edge(face.corners[0].position, face.corners[1].position),
            edge(face.corners[0].position, face.corners[2].position),
        );
        Some(normalized(n).unwrap_or_else(|| {
            ctx.warn(ExportWarning::ZeroLengthNormal {
                mesh: mesh_name.to_string(),
                face: face_index,
            });
            [0.0, 0.0, 0.0]
        }))
    };

    let mut welded = [0u16; 4];
    for (corner_index, corner) in face.corners.iter().enumerate() {
        let normal = flat_normal.unwrap_or(corner.normal);
        let texcoords: Vec<[f32; 2]> = face.uvs.iter().map(|layer| layer[corner_index]).collect();

        welded[corner_index] = builder
            .welder
            .insert(corner.origin_index, corner.position, normal, &texcoords)
            .map_err(|_| ExportError::GroupVertexOverflow {
                mesh: mesh_name.to_string(),
            })?;
    }

    builder.indices.extend_from_slice(&welded[..3]);
    if face.corners.len() == 4 {
        let [a, _, c, d] = welded;
        builder.indices.extend_from_slice(&[c, d, a]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{ResolvedTexture, TextureLocator};

    /// In-memory locator for tests.
    struct MapLocator {
        known: Vec<(String, Option<bool>)>,
        emissive: Vec<String>,
    }

    impl MapLocator {
        fn with(names: &[&str]) -> Self {
            Self {
                known: names.iter().map(|n| (n.to_string(), None)).collect(),
                emissive: Vec::new(),
            }
        }

        fn with_alpha(names: &[(&str, bool)]) -> Self {
            Self {
                known: names
                    .iter()
                    .map(|(n, a)| (n.to_string(), Some(*a)))
                    .collect(),
                emissive: Vec::new(),
            }
        }
    }

    impl TextureLocator for MapLocator {
        fn resolve(&self, reference: &str) -> Option<ResolvedTexture> {
            self.known
                .iter()
                .find(|(name, _)| name == reference)
                .map(|(name, has_alpha)| ResolvedTexture {
                    path: format!("textures/{name}"),
                    has_alpha: *has_alpha,
                })
        }

        fn find_emissive(&self, base: &str) -> Option<String> {
            let file_name = base.rsplit('/').next().unwrap();
            let emissive = format!("em_{file_name}");
            self.emissive.contains(&emissive).then_some(emissive)
        }
    }

    fn flat_quad(material: &str, texture: &str) -> SourceFace {
        let positions = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        SourceFace {
            smooth: false,
            corners: (0..4)
                .map(|i| SourceCorner {
                    origin_index: i as u32,
                    position: positions[i],
                    normal: [0.0, 0.0, 1.0],
                })
                .collect(),
            material: material.to_string(),
            textures: vec![texture.to_string()],
            uvs: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]],
        }
    }

    fn ctx() -> ExportContext {
        ExportContext::new(MaterialStore::empty(), WeldMode::Weld)
    }

    #[test]
    fn test_single_quad_welds_to_four_vertices() {
        let locator = MapLocator::with(&["rock.png"]);
        let mut ctx = ctx();
        let groups =
            partition_and_weld("quad", &[flat_quad("", "rock.png")], &locator, &mut ctx).unwrap();

        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.vertices.len(), 4);
        assert_eq!(group.indices, vec![0, 1, 2, 2, 3, 0]);
        assert_eq!(group.textures, vec!["textures/rock.png".to_string()]);
        // flat normal replaces the authored corner normals
        for v in &group.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
        assert!(ctx.warnings().is_empty());
    }

    #[test]
    fn test_group_order_is_first_seen() {
        let locator = MapLocator::with(&["b.png", "a.png"]);
        let mut ctx = ctx();
        let faces = vec![
            flat_quad("", "b.png"),
            flat_quad("", "a.png"),
            flat_quad("", "b.png"),
        ];
        let groups = partition_and_weld("mixed", &faces, &locator, &mut ctx).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].textures[0], "textures/b.png");
        assert_eq!(groups[1].textures[0], "textures/a.png");
        // both b-faces landed in the first group
        assert_eq!(groups[0].indices.len(), 12);
        assert_eq!(groups[1].indices.len(), 6);
    }

    #[test]
    fn test_shared_vertices_weld_independently_per_group() {
        let locator = MapLocator::with(&["a.png", "b.png"]);
        let mut store = MaterialStore::empty();
        let mut red = Material::default();
        red.name = "red".to_string();
        store.insert(red);
        let mut ctx = ExportContext::new(store, WeldMode::Weld);

        let mut second = flat_quad("red", "b.png");
        second.material = "red".to_string();
        let faces = vec![flat_quad("", "a.png"), second];
        let groups = partition_and_weld("shared", &faces, &locator, &mut ctx).unwrap();

        assert_eq!(groups.len(), 2);
        // same origin indices, but each group owns its own welded copies
        assert_eq!(groups[0].vertices.len(), 4);
        assert_eq!(groups[1].vertices.len(), 4);
    }

    #[test]
    fn test_unresolved_material_falls_back_with_warning() {
        let locator = MapLocator::with(&["rock.png"]);
        let mut ctx = ctx();
        let groups = partition_and_weld(
            "hut",
            &[flat_quad("missing_mat", "rock.png")],
            &locator,
            &mut ctx,
        )
        .unwrap();

        assert_eq!(groups[0].material.name, "default");
        assert_eq!(
            ctx.warnings(),
            &[ExportWarning::UnresolvedMaterial {
                name: "missing_mat".to_string()
            }]
        );
    }

    #[test]
    fn test_unnamed_material_falls_back_silently() {
        let locator = MapLocator::with(&["rock.png"]);
        let mut ctx = ctx();
        partition_and_weld("hut", &[flat_quad("", "rock.png")], &locator, &mut ctx).unwrap();
        assert!(ctx.warnings().is_empty());
    }

    #[test]
    fn test_missing_texture_is_fatal() {
        let locator = MapLocator::with(&[]);
        let mut ctx = ctx();
        let err = partition_and_weld("hut", &[flat_quad("", "rock.png")], &locator, &mut ctx);
        assert!(matches!(
            err,
            Err(ExportError::UnresolvedTexture { texture, .. }) if texture == "rock.png"
        ));
    }

    #[test]
    fn test_untextured_face_is_fatal() {
        let locator = MapLocator::with(&[]);
        let mut ctx = ctx();
        let mut face = flat_quad("", "rock.png");
        face.textures.clear();
        face.uvs.clear();
        let err = partition_and_weld("hut", &[face], &locator, &mut ctx);
        assert!(matches!(err, Err(ExportError::UntexturedFaces { .. })));
    }

    #[test]
    fn test_empty_face_list_is_fatal() {
        let locator = MapLocator::with(&[]);
        let mut ctx = ctx();
        let err = partition_and_weld("empty", &[], &locator, &mut ctx);
        assert!(matches!(err, Err(ExportError::EmptyMesh(name)) if name == "empty"));
    }

    #[test]
    fn test_degenerate_face_is_fatal() {
        let locator = MapLocator::with(&["rock.png"]);
        let mut ctx = ctx();
        let mut face = flat_quad("", "rock.png");
        for corner in &mut face.corners {
            corner.position = [1.0, 1.0, 1.0];
        }
        let err = partition_and_weld("flat", &[face], &locator, &mut ctx);
        assert!(matches!(
            err,
            Err(ExportError::DegenerateFace { face: 0, .. })
        ));
    }

    #[test]
    fn test_uv_layer_mismatch_is_fatal() {
        let locator = MapLocator::with(&["rock.png"]);
        let mut ctx = ctx();
        let mut face = flat_quad("", "rock.png");
        face.uvs[0].pop();
        let err = partition_and_weld("hut", &[face], &locator, &mut ctx);
        assert!(matches!(err, Err(ExportError::UvLayerMismatch { .. })));
    }

    #[test]
    fn test_light_map_flag_for_two_layers() {
        let locator = MapLocator::with(&["rock.png", "rock_lm.png"]);
        let mut ctx = ctx();
        let mut face = flat_quad("", "rock.png");
        face.textures.push("rock_lm.png".to_string());
        face.uvs.push(face.uvs[0].clone());
        let groups = partition_and_weld("lit", &[face], &locator, &mut ctx).unwrap();

        let group = &groups[0];
        assert_ne!(group.flags & mesh_flags::LIGHT_MAP, 0);
        assert_eq!(group.textures.len(), 2);
        assert_eq!(group.vertices[0].texcoords.len(), 2);
    }

    #[test]
    fn test_emissive_flag_when_companion_exists() {
        let mut locator = MapLocator::with(&["rock.png"]);
        locator.emissive.push("em_rock.png".to_string());
        let mut ctx = ctx();
        let groups =
            partition_and_weld("glow", &[flat_quad("", "rock.png")], &locator, &mut ctx).unwrap();

        let group = &groups[0];
        assert_ne!(group.flags & mesh_flags::EMISSIVE_MAP, 0);
        assert_eq!(group.emissive.as_deref(), Some("em_rock.png"));
    }

    #[test]
    fn test_alpha_channel_advisory() {
        // alpha channel present, but plain material: one warning per group
        let locator = MapLocator::with_alpha(&[("rock.png", true)]);
        let mut ctx = ctx();
        let faces = vec![flat_quad("", "rock.png"), flat_quad("", "rock.png")];
        partition_and_weld("hut", &faces, &locator, &mut ctx).unwrap();

        assert_eq!(
            ctx.warnings(),
            &[ExportWarning::AlphaChannelMismatch {
                mesh: "hut".to_string(),
                texture: "textures/rock.png".to_string(),
                has_alpha: true,
            }]
        );
    }

    #[test]
    fn test_smooth_face_keeps_corner_normals() {
        let locator = MapLocator::with(&["rock.png"]);
        let mut ctx = ctx();
        let mut face = flat_quad("", "rock.png");
        face.smooth = true;
        for (i, corner) in face.corners.iter_mut().enumerate() {
            corner.normal = [i as f32, 1.0, 0.0];
        }
        let groups = partition_and_weld("ball", &[face], &locator, &mut ctx).unwrap();
        assert_eq!(groups[0].vertices[2].normal, [2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_render_flags_copy_material_state() {
        let locator = MapLocator::with(&["rock.png"]);
        let mut store = MaterialStore::empty();
        let mut mat = Material::default();
        mat.name = "bumpy".to_string();
        mat.bump_map = true;
        mat.alpha_test = true;
        mat.lighting = false;
        store.insert(mat);
        let mut ctx = ExportContext::new(store, WeldMode::Weld);

        let groups =
            partition_and_weld("hut", &[flat_quad("bumpy", "rock.png")], &locator, &mut ctx)
                .unwrap();
        let flags = groups[0].flags;
        assert_eq!(flags & mesh_flags::LIGHTING, 0);
        assert_ne!(flags & mesh_flags::CULL_FACES, 0);
        assert_ne!(flags & mesh_flags::ALPHA_TEST, 0);
        assert_eq!(flags & mesh_flags::ALPHA_BLEND, 0);
        assert_ne!(flags & mesh_flags::BUMP_MAP, 0);
        assert_ne!(flags & mesh_flags::PER_PIXEL_LIGHTING, 0);
    }
}
