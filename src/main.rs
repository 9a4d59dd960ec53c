//! bbm-export - BBM model export tool
//!
//! Converts authoring-tool scenes (Wavefront OBJ) to the engine's binary
//! model format (.bbm).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use bbm_export::{
    check_obj, convert_obj, node_flags, DirTextureLocator, ExportContext, MaterialStore,
    ModelHeader, WeldMode, WriteOptions,
};

#[derive(Parser)]
#[command(name = "bbm-export")]
#[command(about = "BBM model export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export an OBJ scene to a BBM model
    Model {
        /// Input OBJ file
        input: PathBuf,

        /// Output .bbm file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Materials file (default: materials.toml next to the input)
        #[arg(short, long)]
        materials: Option<PathBuf>,

        /// Directory searched for referenced textures (default: textures/
        /// next to the input)
        #[arg(short, long)]
        textures: Option<PathBuf>,

        /// Skip vertex welding (faster, larger output)
        #[arg(long)]
        quick: bool,

        /// Level-of-detail class stored in the model
        #[arg(long, default_value = "building")]
        lod_class: String,

        /// Mark the model as a shadow blocker
        #[arg(long)]
        blocker: bool,

        /// Mark the model as a shadow receiver
        #[arg(long)]
        receiver: bool,

        /// Mark the model as instanced
        #[arg(long)]
        instanced: bool,

        /// Preserve each transform's homogeneous element instead of
        /// writing 1.0
        #[arg(long)]
        keep_w: bool,
    },

    /// Validate a scene without writing output
    Check {
        /// Input OBJ file
        input: PathBuf,

        /// Materials file (default: materials.toml next to the input)
        #[arg(short, long)]
        materials: Option<PathBuf>,

        /// Directory searched for referenced textures (default: textures/
        /// next to the input)
        #[arg(short, long)]
        textures: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Model {
            input,
            output,
            materials,
            textures,
            quick,
            lod_class,
            blocker,
            receiver,
            instanced,
            keep_w,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("bbm"));
            tracing::info!("Exporting {:?} -> {:?}", input, output);

            let weld_mode = if quick {
                WeldMode::Duplicate
            } else {
                WeldMode::Weld
            };
            let mut ctx = ExportContext::new(load_materials(&input, materials)?, weld_mode);
            let locator = DirTextureLocator::new(textures_dir(&input, textures));

            let mut flags = 0;
            if blocker {
                flags |= node_flags::SHADOW_BLOCKER;
            }
            if receiver {
                flags |= node_flags::SHADOW_RECEIVER;
            }
            if instanced {
                flags |= node_flags::INSTANCED;
            }
            let header = ModelHeader { flags, lod_class };

            let options = WriteOptions {
                force_unit_w: !keep_w,
            };

            convert_obj(&input, &output, &locator, &mut ctx, &header, &options)?;
            tracing::info!("Done!");
        }

        Commands::Check {
            input,
            materials,
            textures,
        } => {
            tracing::info!("Checking {:?}", input);

            let mut ctx = ExportContext::new(load_materials(&input, materials)?, WeldMode::Weld);
            let locator = DirTextureLocator::new(textures_dir(&input, textures));

            check_obj(&input, &locator, &mut ctx)?;
            tracing::info!("Scene is valid!");
        }
    }

    Ok(())
}

/// Load the given materials file, or `materials.toml` next to the input if
/// one exists.
fn load_materials(input: &Path, materials: Option<PathBuf>) -> Result<MaterialStore> {
    match materials {
        Some(path) => MaterialStore::load(&path),
        None => {
            let default = input.with_file_name("materials.toml");
            if default.is_file() {
                MaterialStore::load(&default)
            } else {
                Ok(MaterialStore::empty())
            }
        }
    }
}

fn textures_dir(input: &Path, textures: Option<PathBuf>) -> PathBuf {
    textures.unwrap_or_else(|| input.with_file_name("textures"))
}
