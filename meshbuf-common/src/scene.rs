//! Interchange-side scene structures
//!
//! The shape a mesh-interchange library hands to the importer, and the shape
//! the exporter hands back. Matrices are row-major 4×4.

use smallvec::SmallVec;

use crate::skin::VertexWeight;

/// Row-major 4×4 identity
pub const IDENTITY_MATRIX: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Vertex indices of one polygon (triangles and quads stay inline)
pub type Polygon = SmallVec<[u32; 4]>;

/// A complete interchange scene
#[derive(Debug, Clone, Default)]
pub struct SourceScene {
    pub root: SourceNode,
    pub meshes: Vec<SourceMesh>,
    pub materials: Vec<SourceMaterial>,
}

/// Scene graph node
#[derive(Debug, Clone)]
pub struct SourceNode {
    pub name: String,
    /// Local transform, row-major
    pub transform: [[f32; 4]; 4],
    /// Indices into [`SourceScene::meshes`]
    pub meshes: Vec<usize>,
    pub children: Vec<SourceNode>,
}

impl Default for SourceNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: IDENTITY_MATRIX,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }
}

impl SourceNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// One mesh as exposed by the interchange library
#[derive(Debug, Clone, Default)]
pub struct SourceMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tangents: Option<Vec<[f32; 3]>>,
    /// Texture coordinate channels, each one entry per vertex
    pub uv_channels: Vec<Vec<[f32; 2]>>,
    pub bones: Vec<SourceBone>,
    pub faces: Vec<Polygon>,
    /// Index into [`SourceScene::materials`]
    pub material: Option<usize>,
}

impl SourceMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_skinned(&self) -> bool {
        !self.bones.is_empty()
    }
}

/// Bone with its bind-pose inverse and the vertices it pulls on
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBone {
    pub name: String,
    /// Inverse bind-pose matrix, row-major
    pub offset_matrix: [[f32; 4]; 4],
    pub weights: Vec<VertexWeight>,
}

/// Role of a texture bound to a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    Normal,
    Emissive,
    /// Roughness / metalness mask
    Masks,
}

/// Texture reference by path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSlot {
    pub kind: TextureKind,
    pub path: String,
}

/// Material as exposed by the interchange library
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMaterial {
    pub name: String,
    pub diffuse_color: Option<[f32; 4]>,
    pub textures: Vec<TextureSlot>,
}
