//! Test-asset generators for the integration tests.
//!
//! Each generator lays out a small scene in the given directory: an OBJ
//! file, its MTL library, a materials.toml and a textures/ directory, the
//! same layout the tool expects next to real exports.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

const MATERIALS_TOML: &str = "\
[materials.stone]
specularity = 0.5
hardness = 80
shader = \"diffuse\"

[materials.glass]
alpha_blend = true
cull_faces = false
shader = \"glass\"
";

fn write_textures(dir: &Path, names: &[&str]) -> Result<()> {
    let textures = dir.join("textures");
    fs::create_dir_all(&textures)?;
    for name in names {
        if name.ends_with("glass.png") {
            image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 220, 255, 120]))
                .save(textures.join(name))?;
        } else {
            image::RgbImage::from_pixel(2, 2, image::Rgb([90, 90, 90]))
                .save(textures.join(name))?;
        }
    }
    Ok(())
}

/// One flat-shaded textured quad named "slab", with a stone material.
pub fn generate_quad_scene(dir: &Path) -> Result<PathBuf> {
    fs::write(dir.join("materials.toml"), MATERIALS_TOML)?;
    fs::write(dir.join("quad.mtl"), "newmtl stone\nmap_Kd rock.png\n")?;
    fs::write(
        dir.join("quad.obj"),
        "mtllib quad.mtl\n\
         o slab\n\
         v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
         vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
         usemtl stone\n\
         s off\n\
         f 1/1 2/2 3/3 4/4\n",
    )?;
    write_textures(dir, &["rock.png"])?;
    Ok(dir.join("quad.obj"))
}

/// Two flat triangles sharing an edge, for weld-vs-quick comparisons.
pub fn generate_shared_edge_scene(dir: &Path) -> Result<PathBuf> {
    fs::write(dir.join("materials.toml"), MATERIALS_TOML)?;
    fs::write(dir.join("sheet.mtl"), "newmtl stone\nmap_Kd rock.png\n")?;
    fs::write(
        dir.join("sheet.obj"),
        "mtllib sheet.mtl\n\
         o sheet\n\
         v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
         vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
         usemtl stone\n\
         s off\n\
         f 1/1 2/2 3/3\n\
         f 1/1 3/3 4/4\n",
    )?;
    write_textures(dir, &["rock.png"])?;
    Ok(dir.join("sheet.obj"))
}

/// Two side-by-side quads with different materials, exercising group
/// partitioning.
pub fn generate_two_material_scene(dir: &Path) -> Result<PathBuf> {
    fs::write(dir.join("materials.toml"), MATERIALS_TOML)?;
    fs::write(
        dir.join("wall.mtl"),
        "newmtl stone\nmap_Kd rock.png\n\
         newmtl glass\nmap_Kd glass.png\n",
    )?;
    fs::write(
        dir.join("wall.obj"),
        "mtllib wall.mtl\n\
         o wall\n\
         v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
         v 2 0 0\nv 2 1 0\n\
         vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
         usemtl stone\n\
         s off\n\
         f 1/1 2/2 3/3 4/4\n\
         usemtl glass\n\
         f 2/1 5/2 6/3 3/4\n",
    )?;
    write_textures(dir, &["rock.png", "glass.png"])?;
    Ok(dir.join("wall.obj"))
}
