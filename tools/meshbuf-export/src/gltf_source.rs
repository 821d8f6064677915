//! glTF/GLB scene loading
//!
//! Turns a glTF document into the interchange scene the codec imports.
//! Each triangle primitive becomes one source mesh; skins are re-expressed
//! bone-centric and matrices are converted to row-major.

use anyhow::{bail, Context, Result};
use glam::Mat4;
use meshbuf_common::scene::{Polygon, IDENTITY_MATRIX};
use meshbuf_common::{
    SourceBone, SourceMaterial, SourceMesh, SourceNode, SourceScene, TextureKind, TextureSlot,
    VertexWeight,
};
use std::path::Path;

/// Highest UV set read from a primitive
const UV_SETS: u32 = 2;

/// Load a glTF or GLB file as an interchange scene
///
/// Only buffers are resolved; images stay referenced by path and are never
/// decoded.
pub fn load_gltf(input: &Path) -> Result<SourceScene> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::open(input).with_context(|| format!("Failed to load glTF: {:?}", input))?;
    let buffers = gltf::import_buffers(&document, input.parent(), blob)
        .with_context(|| format!("Failed to load glTF buffers: {:?}", input))?;
    gltf_to_scene(&document, &buffers)
}

/// Build an interchange scene from an already imported document
pub fn gltf_to_scene(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<SourceScene> {
    let materials = document.materials().map(|m| convert_material(&m)).collect();

    // A mesh takes its skin from the first node that instances it with one
    let mut mesh_skins: Vec<Option<gltf::Skin>> = vec![None; document.meshes().len()];
    for node in document.nodes() {
        if let (Some(mesh), Some(skin)) = (node.mesh(), node.skin()) {
            if mesh_skins[mesh.index()].is_none() {
                mesh_skins[mesh.index()] = Some(skin);
            }
        }
    }

    let mut meshes = Vec::new();
    let mut primitive_map: Vec<Vec<usize>> = Vec::with_capacity(mesh_skins.len());

    for mesh in document.meshes() {
        let base_name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));
        let primitive_count = mesh.primitives().len();
        let skin = mesh_skins[mesh.index()].as_ref();

        let mut converted = Vec::new();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                tracing::warn!(
                    "Skipping primitive {} of {:?}: mode {:?} is not triangles",
                    primitive.index(),
                    base_name,
                    primitive.mode()
                );
                continue;
            }

            let name = if primitive_count > 1 {
                format!("{}.{}", base_name, primitive.index())
            } else {
                base_name.clone()
            };
            let source = convert_primitive(&primitive, skin, buffers, name)
                .with_context(|| format!("Failed to read mesh {:?}", base_name))?;
            converted.push(meshes.len());
            meshes.push(source);
        }
        primitive_map.push(converted);
    }

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    let mut root = SourceNode::new("root");
    if let Some(scene) = scene {
        root.children = scene
            .nodes()
            .map(|node| convert_node(&node, &primitive_map))
            .collect();
    }

    tracing::debug!(
        "Loaded glTF: {} meshes, {} materials, {} root nodes",
        meshes.len(),
        document.materials().len(),
        root.children.len()
    );

    Ok(SourceScene {
        root,
        meshes,
        materials,
    })
}

fn convert_primitive(
    primitive: &gltf::Primitive,
    skin: Option<&gltf::Skin>,
    buffers: &[gltf::buffer::Data],
    name: String,
) -> Result<SourceMesh> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .context("No positions in primitive")?
        .collect();

    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|iter| iter.collect());

    // xyz only; the handedness sign has no slot in the packed row
    let tangents: Option<Vec<[f32; 3]>> = reader
        .read_tangents()
        .map(|iter| iter.map(|t| [t[0], t[1], t[2]]).collect());

    let mut uv_channels = Vec::new();
    for set in 0..UV_SETS {
        match reader.read_tex_coords(set) {
            Some(iter) => uv_channels.push(iter.into_f32().collect::<Vec<[f32; 2]>>()),
            None => break,
        }
    }

    let indices: Vec<u32> = match reader.read_indices() {
        Some(iter) => iter.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    if indices.len() % 3 != 0 {
        tracing::warn!(
            "{:?}: dropping {} trailing indices that do not form a triangle",
            name,
            indices.len() % 3
        );
    }
    let faces = indices.chunks_exact(3).map(Polygon::from_slice).collect();

    let bones = match skin {
        Some(skin) => read_skin_bones(&reader, skin, buffers, positions.len(), &name)?,
        None => Vec::new(),
    };

    Ok(SourceMesh {
        name,
        positions,
        normals,
        tangents,
        uv_channels,
        bones,
        faces,
        material: primitive.material().index(),
    })
}

/// Re-express JOINTS_0 / WEIGHTS_0 as per-bone vertex weight lists
///
/// Bones that pull on no vertex of this primitive are left out.
fn read_skin_bones<'a, 's, F>(
    reader: &gltf::mesh::Reader<'a, 's, F>,
    skin: &gltf::Skin,
    buffers: &[gltf::buffer::Data],
    vertex_count: usize,
    name: &str,
) -> Result<Vec<SourceBone>>
where
    F: Clone + Fn(gltf::Buffer<'a>) -> Option<&'s [u8]>,
{
    let joints: Option<Vec<[u16; 4]>> = reader.read_joints(0).map(|iter| iter.into_u16().collect());
    let weights: Option<Vec<[f32; 4]>> =
        reader.read_weights(0).map(|iter| iter.into_f32().collect());

    let (joints, weights) = match (joints, weights) {
        (Some(j), Some(w)) => (j, w),
        (None, None) => return Ok(Vec::new()),
        _ => {
            tracing::warn!(
                "{:?} has partial skinning data (joints or weights missing), ignoring skinning",
                name
            );
            return Ok(Vec::new());
        }
    };
    if joints.len() != vertex_count || weights.len() != vertex_count {
        bail!(
            "{:?}: skin streams have {} joints / {} weights for {} vertices",
            name,
            joints.len(),
            weights.len(),
            vertex_count
        );
    }

    let skin_reader = skin.reader(|buffer| Some(&buffers[buffer.index()]));
    let inverse_binds: Vec<[[f32; 4]; 4]> = skin_reader
        .read_inverse_bind_matrices()
        .map(|iter| iter.collect())
        .unwrap_or_default();

    let mut bones: Vec<SourceBone> = skin
        .joints()
        .enumerate()
        .map(|(i, node)| SourceBone {
            name: node
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("joint_{}", node.index())),
            offset_matrix: inverse_binds
                .get(i)
                .map(row_major)
                .unwrap_or(IDENTITY_MATRIX),
            weights: Vec::new(),
        })
        .collect();

    for (vertex, (joint_set, weight_set)) in joints.iter().zip(&weights).enumerate() {
        for (&joint, &weight) in joint_set.iter().zip(weight_set) {
            if weight <= 0.0 {
                continue;
            }
            let Some(bone) = bones.get_mut(joint as usize) else {
                bail!(
                    "{:?}: vertex {} references joint {} but the skin has {}",
                    name,
                    vertex,
                    joint,
                    skin.joints().len()
                );
            };
            bone.weights.push(VertexWeight {
                vertex_id: vertex as u32,
                weight,
            });
        }
    }

    bones.retain(|bone| !bone.weights.is_empty());
    Ok(bones)
}

fn convert_material(material: &gltf::Material) -> SourceMaterial {
    let name = material
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("material_{}", material.index().unwrap_or(0)));
    let pbr = material.pbr_metallic_roughness();

    let mut textures = Vec::new();
    if let Some(info) = pbr.base_color_texture() {
        textures.push(texture_slot(TextureKind::Diffuse, &info.texture()));
    }
    if let Some(normal) = material.normal_texture() {
        textures.push(texture_slot(TextureKind::Normal, &normal.texture()));
    }
    if let Some(info) = material.emissive_texture() {
        textures.push(texture_slot(TextureKind::Emissive, &info.texture()));
    }
    if let Some(info) = pbr.metallic_roughness_texture() {
        textures.push(texture_slot(TextureKind::Masks, &info.texture()));
    }

    SourceMaterial {
        name,
        diffuse_color: Some(pbr.base_color_factor()),
        textures,
    }
}

/// Texture path: the image URI, or a synthetic name for buffer-embedded images
fn texture_slot(kind: TextureKind, texture: &gltf::Texture) -> TextureSlot {
    let image = texture.source();
    let path = match image.source() {
        gltf::image::Source::Uri { uri, .. } => uri.to_string(),
        gltf::image::Source::View { .. } => image
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("embedded_image_{}", image.index())),
    };
    TextureSlot { kind, path }
}

fn convert_node(node: &gltf::Node, primitive_map: &[Vec<usize>]) -> SourceNode {
    SourceNode {
        name: node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node_{}", node.index())),
        transform: row_major(&node.transform().matrix()),
        meshes: node
            .mesh()
            .and_then(|mesh| primitive_map.get(mesh.index()))
            .cloned()
            .unwrap_or_default(),
        children: node
            .children()
            .map(|child| convert_node(&child, primitive_map))
            .collect(),
    }
}

/// glTF stores matrices column-major
fn row_major(cols: &[[f32; 4]; 4]) -> [[f32; 4]; 4] {
    Mat4::from_cols_array_2d(cols).transpose().to_cols_array_2d()
}
