//! meshbuf-export library
//!
//! glTF loading, codec configuration and `.meshbuf` bundle I/O, for use by
//! the CLI and by other tools that pack meshes directly.

pub mod config;
pub mod container;
pub mod gltf_source;

use anyhow::{bail, Context, Result};
use meshbuf_common::{export_scene, import_scene, CodecConfig, ConversionContext, ImportedScene};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub use config::load_config;
pub use container::{read_bundle, write_bundle, BundleError, BUNDLE_MAGIC, BUNDLE_VERSION};
pub use gltf_source::{gltf_to_scene, load_gltf};

/// Bundle file extension
pub const BUNDLE_EXT: &str = "meshbuf";

/// Convert a glTF/GLB file to packed records in memory
pub fn convert_gltf_to_memory(input: &Path, config: &CodecConfig) -> Result<ImportedScene> {
    let source = load_gltf(input)?;
    let mut ctx = ConversionContext::new(config.clone());
    Ok(import_scene(&source, &mut ctx))
}

/// Convert a glTF/GLB file to a `.meshbuf` bundle
///
/// Meshes that fail to convert are logged and left out. With `strict`, any
/// such failure aborts before the output is written.
pub fn convert_gltf(
    input: &Path,
    output: &Path,
    config: &CodecConfig,
    strict: bool,
) -> Result<ImportedScene> {
    let scene = convert_gltf_to_memory(input, config)?;

    for failure in &scene.failures {
        tracing::warn!(
            "Mesh {} ({:?}) not converted: {}",
            failure.source,
            failure.name,
            failure.error
        );
    }
    if strict && !scene.failures.is_empty() {
        bail!(
            "{} of {} meshes failed to convert",
            scene.failures.len(),
            scene.failures.len() + scene.meshes.len()
        );
    }

    let file =
        File::create(output).with_context(|| format!("Failed to create output: {:?}", output))?;
    let mut writer = BufWriter::new(file);
    write_bundle(&mut writer, &scene)
        .with_context(|| format!("Failed to write bundle: {:?}", output))?;
    writer.flush()?;

    tracing::info!(
        "Converted scene: {} meshes, {} materials, {} joints",
        scene.meshes.len(),
        scene.materials.len(),
        scene.joints.len()
    );

    Ok(scene)
}

/// Read a `.meshbuf` bundle from disk
pub fn load_bundle(path: &Path, config: &CodecConfig) -> Result<ImportedScene> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read bundle: {:?}", path))?;
    let scene =
        read_bundle(&bytes, config).with_context(|| format!("Invalid bundle: {:?}", path))?;
    Ok(scene)
}

/// Print a human-readable summary of a bundle and check that every record
/// unpacks back to an interchange mesh
pub fn inspect_bundle<W: Write>(
    out: &mut W,
    scene: &ImportedScene,
    config: &CodecConfig,
) -> Result<()> {
    writeln!(
        out,
        "{} meshes, {} materials, {} textures, {} joints",
        scene.meshes.len(),
        scene.materials.len(),
        scene.textures.len(),
        scene.joints.len()
    )?;

    for (i, mesh) in scene.meshes.iter().enumerate() {
        let meta = &mesh.metadata;
        writeln!(out, "mesh {} {:?}", i, mesh.name)?;
        writeln!(out, "  hash:      {}", mesh.hash)?;
        writeln!(
            out,
            "  vertices:  {} (stride {})",
            meta.vertex_count,
            mesh.stride()
        )?;
        writeln!(
            out,
            "  triangles: {} ({:?} indices)",
            meta.triangle_count,
            mesh.index_buffer.element_type()
        )?;
        for d in mesh.layout.descriptors() {
            writeln!(
                out,
                "  {:?}: {} x {:?} @ {}",
                d.semantic, d.component_count, d.element_type, d.byte_offset
            )?;
        }
        writeln!(out, "  aabb:      {:?} .. {:?}", meta.aabb_min, meta.aabb_max)?;
        if mesh.is_skinned() {
            let names: Vec<&str> = mesh
                .bones
                .iter()
                .filter_map(|&j| scene.joints.get(j as usize))
                .map(|joint| joint.name.as_str())
                .collect();
            writeln!(out, "  bones:     {}", names.join(", "))?;
        }
        if let Some(m) = mesh.material.and_then(|m| scene.materials.get(m)) {
            writeln!(out, "  material:  {:?}", m.name)?;
        }
    }

    let mut ctx = ConversionContext::new(config.clone());
    let exported = export_scene(scene, &mut ctx);
    for failure in &exported.failures {
        writeln!(
            out,
            "mesh {} ({:?}) failed to unpack: {}",
            failure.source, failure.name, failure.error
        )?;
    }
    if !exported.failures.is_empty() {
        bail!("{} meshes failed to unpack", exported.failures.len());
    }
    writeln!(out, "all records unpack")?;
    Ok(())
}
