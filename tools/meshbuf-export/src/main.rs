//! meshbuf-export - mesh buffer export tool
//!
//! Converts glTF/GLB scenes to `.meshbuf` bundles of interleaved vertex
//! buffers, and inspects existing bundles.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use meshbuf_export::{convert_gltf, inspect_bundle, load_bundle, load_config, BUNDLE_EXT};

#[derive(Parser)]
#[command(name = "meshbuf-export")]
#[command(about = "Mesh buffer export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a glTF/GLB scene to a .meshbuf bundle
    Convert {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Output .meshbuf file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Codec settings (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fail if any mesh cannot be converted
        #[arg(long)]
        strict: bool,
    },

    /// Decode a .meshbuf bundle and print its records
    Inspect {
        /// Input .meshbuf file
        file: PathBuf,

        /// Codec settings (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
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
        Commands::Convert {
            input,
            output,
            config,
            strict,
        } => {
            let config = load_config(config.as_deref())?;
            let output = output.unwrap_or_else(|| input.with_extension(BUNDLE_EXT));
            tracing::info!("Converting {:?} -> {:?}", input, output);

            let ext = input
                .extension()
                .and_then(|e| e.to_str())
                .map(|s| s.to_lowercase())
                .unwrap_or_default();
            match ext.as_str() {
                "gltf" | "glb" => {
                    convert_gltf(&input, &output, &config, strict)?;
                }
                _ => anyhow::bail!("Unsupported scene format: {:?} (use .gltf or .glb)", input),
            }
            tracing::info!("Done!");
        }

        Commands::Inspect { file, config } => {
            let config = load_config(config.as_deref())?;
            let scene = load_bundle(&file, &config)?;
            inspect_bundle(&mut std::io::stdout().lock(), &scene, &config)?;
        }
    }

    Ok(())
}
