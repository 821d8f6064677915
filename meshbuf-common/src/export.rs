//! Export pipeline: packed records → interchange scene
//!
//! The reverse of [`crate::import`]. Vertex streams come back through the
//! unpacker driven by each record's own layout; bone-centric influence lists
//! are re-derived from the padded skin rows.

use smallvec::SmallVec;

use crate::config::CodecConfig;
use crate::context::{ConversionContext, MeshKey};
use crate::error::{CodecError, Result};
use crate::record::{
    ImportedScene, MaterialRecord, MeshFailure, NodeKind, PackedMesh, SceneNode, material_flags,
};
use crate::scene::{SourceBone, SourceMaterial, SourceMesh, SourceNode, SourceScene, TextureSlot};
use crate::skin::Joint;
use crate::vertex::unpack_vertices;

/// Interchange scene plus the records that could not be exported
#[derive(Debug, Clone, Default)]
pub struct ExportedScene {
    pub scene: SourceScene,
    pub failures: Vec<MeshFailure>,
}

/// Rebuild an interchange mesh from a packed record
///
/// `joints` is the bone table the record's [`PackedMesh::bones`] points into.
/// UV channels are trimmed back to the authored count and zero-weight padding
/// slots are not reported as influences.
pub fn export_mesh(
    packed: &PackedMesh,
    joints: &[Joint],
    config: &CodecConfig,
) -> Result<SourceMesh> {
    let vertex_count = packed.vertex_count();
    let mut attrs = unpack_vertices(&packed.vertex_buffer, vertex_count, &packed.layout, config)?;
    attrs.uv_channels.truncate(packed.uv_channel_count as usize);

    let mut faces = Vec::with_capacity(packed.index_buffer.triangle_count());
    for (face, triangle) in packed.index_buffer.triangles().enumerate() {
        if let Some(&index) = triangle.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(CodecError::IndexOutOfRange {
                face,
                index,
                vertex_count,
            });
        }
        faces.push(SmallVec::from_slice(&triangle));
    }

    let bones = match &attrs.skin {
        Some(skin) => skin
            .to_bone_weights(packed.bones.len())
            .into_iter()
            .zip(&packed.bones)
            .map(|(weights, &joint_id)| {
                let joint = joints.get(joint_id as usize).ok_or_else(|| {
                    CodecError::LayoutViolation(format!(
                        "joint {joint_id} is not in a bone table of {}",
                        joints.len()
                    ))
                })?;
                Ok(SourceBone {
                    name: joint.name.clone(),
                    offset_matrix: joint.offset_matrix,
                    weights,
                })
            })
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(SourceMesh {
        name: packed.name.clone(),
        positions: attrs.positions,
        normals: attrs.normals,
        tangents: attrs.tangents,
        uv_channels: attrs.uv_channels,
        bones,
        faces,
        material: packed.material,
    })
}

/// Rebuild an interchange material, resolving texture handles to paths
pub fn export_material(material: &MaterialRecord, texture_paths: &[String]) -> SourceMaterial {
    let textures = material
        .textures
        .iter()
        .filter_map(|&(kind, handle)| match texture_paths.get(handle.0 as usize) {
            Some(path) => Some(TextureSlot {
                kind,
                path: path.clone(),
            }),
            None => {
                tracing::warn!(
                    material = %material.name,
                    handle = handle.0,
                    "unknown texture handle"
                );
                None
            }
        })
        .collect();

    SourceMaterial {
        name: material.name.clone(),
        diffuse_color: material
            .has(material_flags::MAIN_COLOR)
            .then_some(material.main_color),
        textures,
    }
}

struct SceneExporter<'a> {
    imported: &'a ImportedScene,
    ctx: &'a mut ConversionContext,
    config: CodecConfig,
    scene: SourceScene,
    failures: Vec<MeshFailure>,
    /// Imported mesh index -> exported mesh index, `None` once it failed
    exported: Vec<Option<Option<usize>>>,
}

impl SceneExporter<'_> {
    fn material(&mut self, index: usize) -> Option<usize> {
        let imported = self.imported;
        let record = imported.materials.get(index)?;
        if let Some(existing) = self.ctx.find_material(&record.name) {
            return Some(existing);
        }
        self.scene
            .materials
            .push(export_material(record, &imported.textures));
        Some(
            self.ctx
                .register_material(&record.name, self.scene.materials.len() - 1),
        )
    }

    fn mesh(&mut self, index: usize) -> Option<usize> {
        if let Some(done) = self.exported.get(index).copied().flatten() {
            return done;
        }
        let imported = self.imported;
        let packed = imported.meshes.get(index)?;
        let material = packed.material.and_then(|m| self.material(m));

        let key = MeshKey::new(packed.hash, material, &packed.bones);
        let result = match self.ctx.find_mesh(&key) {
            Some(existing) => Some(existing),
            None => match export_mesh(packed, &imported.joints, &self.config) {
                Ok(mut mesh) => {
                    mesh.material = material;
                    self.scene.meshes.push(mesh);
                    let exported = self.scene.meshes.len() - 1;
                    Some(self.ctx.register_mesh(key, exported))
                }
                Err(error) => {
                    tracing::warn!(mesh = %packed.name, %error, "mesh skipped");
                    self.failures.push(MeshFailure {
                        source: index,
                        name: packed.name.clone(),
                        error,
                    });
                    None
                }
            },
        };

        if let Some(slot) = self.exported.get_mut(index) {
            *slot = Some(result);
        }
        result
    }

    fn node(&mut self, node: &SceneNode) -> SourceNode {
        let meshes = match &node.kind {
            NodeKind::Locator => Vec::new(),
            NodeKind::Mesh(indices) => indices.iter().filter_map(|&i| self.mesh(i)).collect(),
        };

        SourceNode {
            name: node.name.clone(),
            transform: node.transform.to_row_major(),
            meshes,
            children: node.children.iter().map(|child| self.node(child)).collect(),
        }
    }
}

/// Convert an imported scene back to interchange form, resetting `ctx` first
///
/// Only meshes reachable from the node tree are exported. Identical meshes
/// and same-named materials are emitted once.
pub fn export_scene(imported: &ImportedScene, ctx: &mut ConversionContext) -> ExportedScene {
    ctx.reset();
    let config = ctx.config().clone();

    let mut exporter = SceneExporter {
        imported,
        ctx,
        config,
        scene: SourceScene::default(),
        failures: Vec::new(),
        exported: vec![None; imported.meshes.len()],
    };
    exporter.scene.root = exporter.node(&imported.root);

    tracing::info!(
        meshes = exporter.scene.meshes.len(),
        materials = exporter.scene.materials.len(),
        failed = exporter.failures.len(),
        "exported scene"
    );

    ExportedScene {
        scene: exporter.scene,
        failures: exporter.failures,
    }
}
