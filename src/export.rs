//! One-asset export sessions: scene loading, welding and the committed
//! write.
//!
//! Fatal conditions abort before the output path is touched; the model is
//! written to a sibling temp file and only renamed into place on full
//! success, so no partial BBM is ever committed.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::ExportError;
use crate::formats::{write_model, WriteOptions};
use crate::obj::{load_obj, ObjScene};
use crate::partition::{partition_and_weld, ExportContext};
use crate::scene::{ModelHeader, SceneNode, IDENTITY_TRANSFORM};
use crate::texture::TextureLocator;

/// Build the exported node tree for a loaded OBJ scene: one mesh node per
/// object, in file order.
pub fn build_node_tree(
    scene: &ObjScene,
    locator: &dyn TextureLocator,
    ctx: &mut ExportContext,
) -> Result<Vec<SceneNode>, ExportError> {
    let mut roots = Vec::with_capacity(scene.objects.len());
    for object in &scene.objects {
        let groups = partition_and_weld(&object.name, &object.faces, locator, ctx)?;
        roots.push(SceneNode::mesh(
            &object.name,
            "",
            IDENTITY_TRANSFORM,
            groups,
            Vec::new(),
        )?);
    }
    Ok(roots)
}

/// Serialize a node tree to disk, committing the output only on success.
pub fn export_model(
    header: &ModelHeader,
    roots: &[SceneNode],
    output: &Path,
    options: &WriteOptions,
) -> Result<(), ExportError> {
    let tmp = temp_path(output);

    let written = (|| -> Result<(), ExportError> {
        let file = fs::File::create(&tmp)?;
        let mut writer = std::io::BufWriter::new(file);
        write_model(&mut writer, header, roots, options)?;
        writer.flush()?;
        Ok(())
    })();

    match written {
        Ok(()) => {
            fs::rename(&tmp, output)?;
            Ok(())
        }
        Err(err) => {
            let _ = fs::remove_file(&tmp);
            Err(err)
        }
    }
}

fn temp_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "model.bbm".into());
    name.push(".tmp");
    output.with_file_name(name)
}

/// Convert an OBJ scene to a committed BBM asset.
pub fn convert_obj(
    input: &Path,
    output: &Path,
    locator: &dyn TextureLocator,
    ctx: &mut ExportContext,
    header: &ModelHeader,
    options: &WriteOptions,
) -> Result<()> {
    let scene = load_obj(input)?;
    let roots = build_node_tree(&scene, locator, ctx)
        .with_context(|| format!("Failed to export {:?}", input))?;
    export_model(header, &roots, output, options)
        .with_context(|| format!("Failed to write {:?}", output))?;

    let nodes: usize = roots.iter().map(SceneNode::node_count).sum();
    tracing::info!(
        "Exported {:?}: {} nodes, {} warnings",
        output,
        nodes,
        ctx.warnings().len()
    );
    Ok(())
}

/// Run every validation of the model pipeline without writing output.
pub fn check_obj(
    input: &Path,
    locator: &dyn TextureLocator,
    ctx: &mut ExportContext,
) -> Result<()> {
    let scene = load_obj(input)?;
    let roots = build_node_tree(&scene, locator, ctx)
        .with_context(|| format!("{:?} failed validation", input))?;

    let groups: usize = roots
        .iter()
        .map(|node| match &node.kind {
            crate::scene::NodeKind::Mesh { groups } => groups.len(),
            _ => 0,
        })
        .sum();
    tracing::info!(
        "{:?} is valid: {} nodes, {} mesh groups, {} warnings",
        input,
        roots.len(),
        groups,
        ctx.warnings().len()
    );
    Ok(())
}
