//! Import pipeline: interchange scene → packed records
//!
//! Per mesh: skin packing → layout planning → vertex packing → index
//! building → hashing → metadata. Meshes fail independently; a failure is
//! logged and recorded, its siblings still convert.

use crate::context::{ConversionContext, MeshKey};
use crate::error::{CodecError, Result};
use crate::hash::mesh_hash;
use crate::index::{Face, build_index_buffer, expand_corners};
use crate::layout::{MAX_UV_CHANNELS, VertexLayout};
use crate::metadata::MeshMetaData;
use crate::record::{
    ImportedScene, MaterialRecord, MeshFailure, NodeKind, PackedMesh, SceneNode, Transform,
    material_flags, texture_flag,
};
use crate::scene::{SourceMaterial, SourceMesh, SourceNode, SourceScene};
use crate::skin::{PackedSkin, bind_bones};
use crate::vertex::{VertexAttributes, pack_vertices};

/// Convert one source mesh into a packed record
///
/// Bones are registered in the context's bone table; the record's blend
/// indices are local to the mesh and map to joints through
/// [`PackedMesh::bones`]. The material is left unresolved. A mesh that fails
/// leaves the bone table as it found it.
pub fn import_mesh(mesh: &SourceMesh, ctx: &mut ConversionContext) -> Result<PackedMesh> {
    let joints_before = ctx.bones().len();
    let packed = pack_mesh(mesh, ctx);
    if packed.is_err() {
        ctx.bones_mut().truncate(joints_before);
    }
    packed
}

fn pack_mesh(mesh: &SourceMesh, ctx: &mut ConversionContext) -> Result<PackedMesh> {
    let vertex_count = mesh.vertex_count();
    if vertex_count == 0 && !mesh.faces.is_empty() {
        return Err(CodecError::MissingPositions);
    }

    let mut faces = mesh
        .faces
        .iter()
        .enumerate()
        .map(|(i, corners)| Face::from_indices(i, corners))
        .collect::<Result<Vec<_>>>()?;

    let bound = bind_bones(ctx.bones_mut(), &mesh.bones);
    let skin = if bound.joints.is_empty() {
        None
    } else {
        Some(PackedSkin::from_bones(
            bound.weights.iter().copied(),
            bound.joints.len(),
            vertex_count,
        )?)
    };

    if mesh.uv_channels.len() > MAX_UV_CHANNELS {
        tracing::warn!(
            mesh = %mesh.name,
            channels = mesh.uv_channels.len(),
            kept = MAX_UV_CHANNELS,
            "extra UV channels dropped"
        );
    }
    let uv_channels: Vec<_> = mesh
        .uv_channels
        .iter()
        .take(MAX_UV_CHANNELS)
        .cloned()
        .collect();
    let uv_channel_count = uv_channels.len() as u8;

    let mut attrs = VertexAttributes {
        positions: mesh.positions.clone(),
        normals: mesh.normals.clone(),
        tangents: mesh.tangents.clone(),
        uv_channels,
        skin,
    };
    attrs.validate()?;

    let config = ctx.config();
    if config.expand_corners {
        let (remap, expanded) = expand_corners(&faces);
        // Range-check against the welded vertices before remapping
        build_index_buffer(&faces, vertex_count)?;
        attrs = attrs.remap(&remap);
        faces = expanded;
    }

    let layout = VertexLayout::plan(&attrs.attribute_set(), &config.encodings)?;
    let vertex_buffer = pack_vertices(&attrs, &layout, config)?;
    let index_buffer = build_index_buffer(&faces, attrs.vertex_count())?;
    let hash = mesh_hash(&vertex_buffer, index_buffer.bytes());
    let metadata = MeshMetaData::build(
        &attrs.positions,
        index_buffer.triangle_count(),
        bound.joints.len(),
    );

    tracing::debug!(
        mesh = %mesh.name,
        vertices = metadata.vertex_count,
        triangles = metadata.triangle_count,
        stride = layout.stride(),
        %hash,
        "packed mesh"
    );

    Ok(PackedMesh {
        name: mesh.name.clone(),
        hash,
        vertex_buffer,
        index_buffer,
        layout,
        metadata,
        uv_channel_count,
        bones: bound.joints,
        material: None,
    })
}

/// Convert a source material, interning its texture paths
pub fn import_material(material: &SourceMaterial, ctx: &mut ConversionContext) -> MaterialRecord {
    let mut flags = 0;
    let main_color = match material.diffuse_color {
        Some(color) => {
            flags |= material_flags::MAIN_COLOR;
            color
        }
        None => [1.0; 4],
    };
    let textures = material
        .textures
        .iter()
        .map(|slot| {
            flags |= texture_flag(slot.kind);
            (slot.kind, ctx.texture_handle(&slot.path))
        })
        .collect();

    MaterialRecord {
        name: material.name.clone(),
        flags,
        main_color,
        textures,
    }
}

/// Convert a whole scene, resetting `ctx` first
///
/// Identical meshes (same content hash, material and joints) are stored once;
/// materials are deduplicated by name.
pub fn import_scene(scene: &SourceScene, ctx: &mut ConversionContext) -> ImportedScene {
    ctx.reset();

    let mut materials = Vec::new();
    let material_map: Vec<usize> = scene
        .materials
        .iter()
        .map(|source| match ctx.find_material(&source.name) {
            Some(index) => index,
            None => {
                let record = import_material(source, ctx);
                materials.push(record);
                ctx.register_material(&source.name, materials.len() - 1)
            }
        })
        .collect();

    let mut meshes: Vec<PackedMesh> = Vec::new();
    let mut failures = Vec::new();
    let mut mesh_map = Vec::with_capacity(scene.meshes.len());

    for (source, mesh) in scene.meshes.iter().enumerate() {
        let material = mesh.material.and_then(|m| {
            let resolved = material_map.get(m).copied();
            if resolved.is_none() {
                tracing::warn!(mesh = %mesh.name, material = m, "material index out of range");
            }
            resolved
        });

        match import_mesh(mesh, ctx) {
            Ok(mut packed) => {
                packed.material = material;
                let key = MeshKey::new(packed.hash, material, &packed.bones);
                let index = match ctx.find_mesh(&key) {
                    Some(existing) => {
                        tracing::debug!(mesh = %mesh.name, into = existing, "duplicate mesh merged");
                        existing
                    }
                    None => {
                        meshes.push(packed);
                        ctx.register_mesh(key, meshes.len() - 1)
                    }
                };
                mesh_map.push(Some(index));
            }
            Err(error) => {
                tracing::warn!(mesh = %mesh.name, %error, "mesh skipped");
                failures.push(MeshFailure {
                    source,
                    name: mesh.name.clone(),
                    error,
                });
                mesh_map.push(None);
            }
        }
    }

    let root = import_node(&scene.root, &mesh_map);

    tracing::info!(
        meshes = meshes.len(),
        materials = materials.len(),
        textures = ctx.texture_paths().len(),
        joints = ctx.bones().len(),
        failed = failures.len(),
        "imported scene"
    );

    ImportedScene {
        root,
        meshes,
        materials,
        textures: ctx.texture_paths().to_vec(),
        joints: ctx.bones().joints().to_vec(),
        failures,
    }
}

fn import_node(node: &SourceNode, mesh_map: &[Option<usize>]) -> SceneNode {
    let meshes: Vec<usize> = node
        .meshes
        .iter()
        .filter_map(|&m| mesh_map.get(m).copied().flatten())
        .collect();
    let kind = if node.meshes.is_empty() {
        NodeKind::Locator
    } else {
        NodeKind::Mesh(meshes)
    };

    SceneNode {
        name: node.name.clone(),
        transform: Transform::from_row_major(&node.transform),
        kind,
        children: node
            .children
            .iter()
            .map(|child| import_node(child, mesh_map))
            .collect(),
    }
}
