//! Host-side records produced by the importer
//!
//! A [`PackedMesh`] is what the renderer uploads: interleaved vertex bytes,
//! an index buffer, the layout that describes them and derived metadata.

use glam::{Mat4, Quat, Vec3};

use crate::error::CodecError;
use crate::hash::MeshHash;
use crate::index::IndexBuffer;
use crate::layout::VertexLayout;
use crate::metadata::MeshMetaData;
use crate::scene::TextureKind;
use crate::skin::Joint;

/// Packed, self-describing mesh
#[derive(Debug, Clone, PartialEq)]
pub struct PackedMesh {
    pub name: String,
    pub hash: MeshHash,
    pub vertex_buffer: Vec<u8>,
    pub index_buffer: IndexBuffer,
    pub layout: VertexLayout,
    pub metadata: MeshMetaData,
    /// UV channels actually authored (the slot always holds two)
    pub uv_channel_count: u8,
    /// Local blend index -> joint index in the conversion's bone table
    pub bones: Vec<u32>,
    pub material: Option<usize>,
}

impl PackedMesh {
    pub fn vertex_count(&self) -> usize {
        self.metadata.vertex_count as usize
    }

    pub fn stride(&self) -> u32 {
        self.layout.stride()
    }

    pub fn is_skinned(&self) -> bool {
        !self.bones.is_empty()
    }
}

/// Opaque handle to a texture the host loads by path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Material feature flags
pub mod material_flags {
    pub const DIFFUSE_MAP: u32 = 1 << 0;
    pub const NORMAL_MAP: u32 = 1 << 1;
    pub const EMISSIVE_MAP: u32 = 1 << 2;
    pub const MASKS_MAP: u32 = 1 << 3;
    pub const MAIN_COLOR: u32 = 1 << 4;
}

/// Flag bit for a texture role
pub const fn texture_flag(kind: TextureKind) -> u32 {
    match kind {
        TextureKind::Diffuse => material_flags::DIFFUSE_MAP,
        TextureKind::Normal => material_flags::NORMAL_MAP,
        TextureKind::Emissive => material_flags::EMISSIVE_MAP,
        TextureKind::Masks => material_flags::MASKS_MAP,
    }
}

/// Material handed to the host
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRecord {
    pub name: String,
    pub flags: u32,
    /// Linear RGBA, white when the source has none
    pub main_color: [f32; 4],
    pub textures: Vec<(TextureKind, TextureHandle)>,
}

impl MaterialRecord {
    pub fn has(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }
}

/// Decomposed local transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Decompose a row-major 4×4 matrix
    pub fn from_row_major(m: &[[f32; 4]; 4]) -> Self {
        let (scale, rotation, translation) =
            Mat4::from_cols_array_2d(m).transpose().to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Recompose into a row-major 4×4 matrix
    pub fn to_row_major(&self) -> [[f32; 4]; 4] {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
            .transpose()
            .to_cols_array_2d()
    }
}

/// What a scene node carries
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Empty transform
    Locator,
    /// Indices into [`ImportedScene::meshes`], one per source mesh
    Mesh(Vec<usize>),
}

/// Host-side scene graph node
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Nodes in depth-first order, self first
    pub fn walk(&self) -> Vec<&SceneNode> {
        fn visit<'a>(node: &'a SceneNode, out: &mut Vec<&'a SceneNode>) {
            out.push(node);
            for child in &node.children {
                visit(child, out);
            }
        }

        let mut out = Vec::new();
        visit(self, &mut out);
        out
    }
}

/// A source mesh that could not be converted
#[derive(Debug, Clone, PartialEq)]
pub struct MeshFailure {
    /// Index in the source scene
    pub source: usize,
    pub name: String,
    pub error: CodecError,
}

/// Everything one import produced
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedScene {
    pub root: SceneNode,
    /// Deduplicated packed meshes
    pub meshes: Vec<PackedMesh>,
    pub materials: Vec<MaterialRecord>,
    /// Texture paths in handle order
    pub textures: Vec<String>,
    pub joints: Vec<Joint>,
    pub failures: Vec<MeshFailure>,
}
