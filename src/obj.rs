//! Wavefront OBJ scene source for the command-line exporter.
//!
//! OBJ is the interchange path out of the authoring tool: every `o` object
//! becomes a mesh node, `usemtl` selects the material, and the MTL
//! library's `map_Kd` supplies each face's base texture reference. Quads
//! are kept as quads so they reach the partitioner's quad split; larger
//! polygons are fan-triangulated.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use hashbrown::HashMap;

use crate::partition::{SourceCorner, SourceFace};

/// One exportable object: a name and its face stream.
pub struct ObjObject {
    pub name: String,
    pub faces: Vec<SourceFace>,
}

/// A loaded OBJ scene.
pub struct ObjScene {
    pub objects: Vec<ObjObject>,
}

/// Load an OBJ file, following its `mtllib` references for face textures.
pub fn load_obj(input: &Path) -> Result<ObjScene> {
    let file = File::open(input).with_context(|| format!("Failed to open OBJ: {:?}", input))?;
    let reader = BufReader::new(file);

    let default_name = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .to_string();

    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut tex_coords: Vec<[f32; 2]> = Vec::new();
    let mut normals_raw: Vec<[f32; 3]> = Vec::new();

    // material name -> base texture file, from the MTL libraries
    let mut material_textures: HashMap<String, String> = HashMap::new();

    let mut objects: Vec<ObjObject> = Vec::new();
    let mut current_name = default_name;
    let mut current_faces: Vec<SourceFace> = Vec::new();
    let mut started = false;

    let mut current_material = String::new();
    let mut smoothing = false;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "v" if parts.len() >= 4 => {
                let x: f32 = parts[1].parse().unwrap_or(0.0);
                let y: f32 = parts[2].parse().unwrap_or(0.0);
                let z: f32 = parts[3].parse().unwrap_or(0.0);
                positions.push([x, y, z]);
            }
            "vt" if parts.len() >= 3 => {
                let u: f32 = parts[1].parse().unwrap_or(0.0);
                let v: f32 = parts[2].parse().unwrap_or(0.0);
                tex_coords.push([u, v]);
            }
            "vn" if parts.len() >= 4 => {
                let x: f32 = parts[1].parse().unwrap_or(0.0);
                let y: f32 = parts[2].parse().unwrap_or(0.0);
                let z: f32 = parts[3].parse().unwrap_or(0.0);
                normals_raw.push([x, y, z]);
            }
            "mtllib" if parts.len() >= 2 => {
                let mtl_path = input.with_file_name(parts[1]);
                load_mtl(&mtl_path, &mut material_textures)?;
            }
            "usemtl" if parts.len() >= 2 => {
                current_material = parts[1].to_string();
            }
            "s" if parts.len() >= 2 => {
                smoothing = !matches!(parts[1], "off" | "0");
            }
            "o" if parts.len() >= 2 => {
                if started && !current_faces.is_empty() {
                    objects.push(ObjObject {
                        name: std::mem::take(&mut current_name),
                        faces: std::mem::take(&mut current_faces),
                    });
                } else if started {
                    bail!("Object \"{}\" has no faces", current_name);
                }
                current_name = parts[1].to_string();
                started = true;
            }
            "f" if parts.len() >= 4 => {
                let refs: Vec<VertexRef> = parts[1..]
                    .iter()
                    .filter_map(|v| parse_vertex_ref(v))
                    .collect();
                if refs.len() < 3 {
                    continue;
                }
                started = true;

                let texture = material_textures.get(&current_material).cloned();
                if refs.len() <= 4 {
                    current_faces.push(build_face(
                        &refs,
                        smoothing,
                        &current_material,
                        texture.as_deref(),
                        &positions,
                        &tex_coords,
                        &normals_raw,
                    ));
                } else {
                    // Fan triangulation for larger (convex) polygons.
                    for i in 1..refs.len() - 1 {
                        let tri = [refs[0], refs[i], refs[i + 1]];
                        current_faces.push(build_face(
                            &tri,
                            smoothing,
                            &current_material,
                            texture.as_deref(),
                            &positions,
                            &tex_coords,
                            &normals_raw,
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    if !current_faces.is_empty() {
        objects.push(ObjObject {
            name: current_name,
            faces: current_faces,
        });
    } else if started {
        bail!("Object \"{}\" has no faces", current_name);
    } else {
        bail!("No faces found in OBJ file");
    }

    Ok(ObjScene { objects })
}

/// Position / texcoord / normal indices of one face corner, 0-based.
type VertexRef = (usize, Option<usize>, Option<usize>);

/// Parse an OBJ vertex reference: "v", "v/vt", "v/vt/vn", or "v//vn".
fn parse_vertex_ref(s: &str) -> Option<VertexRef> {
    let mut parts = s.split('/');

    let vi = parts.next()?.parse::<usize>().ok()?.checked_sub(1)?;
    let vti = parts
        .next()
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<usize>().ok())
        .and_then(|i| i.checked_sub(1));
    let vni = parts
        .next()
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<usize>().ok())
        .and_then(|i| i.checked_sub(1));

    Some((vi, vti, vni))
}

fn build_face(
    refs: &[VertexRef],
    smoothing: bool,
    material: &str,
    texture: Option<&str>,
    positions: &[[f32; 3]],
    tex_coords: &[[f32; 2]],
    normals_raw: &[[f32; 3]],
) -> SourceFace {
    let corners: Vec<SourceCorner> = refs
        .iter()
        .map(|&(vi, _, vni)| SourceCorner {
            origin_index: vi as u32,
            position: positions.get(vi).copied().unwrap_or([0.0; 3]),
            normal: vni
                .and_then(|ni| normals_raw.get(ni).copied())
                .unwrap_or([0.0, 0.0, 1.0]),
        })
        .collect();

    // Smooth shading needs authored normals on every corner.
    let smooth = smoothing && refs.iter().all(|&(_, _, vni)| vni.is_some());

    let uvs = if texture.is_some() && refs.iter().all(|&(_, vti, _)| vti.is_some()) {
        vec![refs
            .iter()
            .map(|&(_, vti, _)| {
                vti.and_then(|ti| tex_coords.get(ti).copied())
                    .unwrap_or([0.0, 0.0])
            })
            .collect()]
    } else {
        Vec::new()
    };

    SourceFace {
        smooth,
        corners,
        material: material.to_string(),
        textures: texture.map(|t| vec![t.to_string()]).unwrap_or_default(),
        uvs,
    }
}

fn load_mtl(path: &Path, textures: &mut HashMap<String, String>) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open MTL: {:?}", path))?;
    let reader = BufReader::new(file);

    let mut current: Option<String> = None;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "newmtl" if parts.len() >= 2 => current = Some(parts[1].to_string()),
            // options may precede the file name; the name is the last token
            "map_Kd" if parts.len() >= 2 => {
                if let Some(name) = &current {
                    textures.insert(name.clone(), parts[parts.len() - 1].to_string());
                }
            }
            _ => {}
        }
    }
    Ok(())
}
