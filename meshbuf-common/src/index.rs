//! Index buffer builder
//!
//! Triangulates faces with a fixed quad split and stores the triangle list in
//! the narrowest width the vertex count allows.

use crate::error::{CodecError, Result};

/// Vertex counts at or above this need 32-bit indices
pub const U16_VERTEX_LIMIT: usize = 1 << 16;

/// A source polygon the builder accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Triangle([u32; 3]),
    Quad([u32; 4]),
}

impl Face {
    /// Classify a polygon's corner list
    pub fn from_indices(face: usize, corners: &[u32]) -> Result<Self> {
        match *corners {
            [a, b, c] => Ok(Self::Triangle([a, b, c])),
            [a, b, c, d] => Ok(Self::Quad([a, b, c, d])),
            _ => Err(CodecError::UnsupportedFace {
                face,
                corners: corners.len(),
            }),
        }
    }

    pub fn corners(&self) -> &[u32] {
        match self {
            Self::Triangle(c) => c,
            Self::Quad(c) => c,
        }
    }

    /// Triangles in emit order; quads split along the 0-2 diagonal
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> {
        let (first, second) = match *self {
            Self::Triangle(t) => (t, None),
            Self::Quad([a, b, c, d]) => ([a, b, c], Some([a, c, d])),
        };
        std::iter::once(first).chain(second)
    }
}

/// Width of one stored index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexElementType {
    U16,
    U32,
}

impl IndexElementType {
    /// U16 below 65536 vertices, U32 otherwise
    pub const fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count < U16_VERTEX_LIMIT {
            Self::U16
        } else {
            Self::U32
        }
    }

    pub const fn size(self) -> usize {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            Self::U16 => 0,
            Self::U32 => 1,
        }
    }

    pub const fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::U16),
            1 => Some(Self::U32),
            _ => None,
        }
    }
}

/// Little-endian triangle list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBuffer {
    element_type: IndexElementType,
    bytes: Vec<u8>,
}

impl IndexBuffer {
    /// Wrap stored bytes, checking they form whole triangles
    pub fn from_bytes(element_type: IndexElementType, bytes: Vec<u8>) -> Result<Self> {
        let triangle_bytes = 3 * element_type.size();
        if bytes.len() % triangle_bytes != 0 {
            return Err(CodecError::LayoutViolation(format!(
                "{} index bytes do not form whole {element_type:?} triangles",
                bytes.len()
            )));
        }
        Ok(Self {
            element_type,
            bytes,
        })
    }

    pub fn element_type(&self) -> IndexElementType {
        self.element_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn index_count(&self) -> usize {
        self.bytes.len() / self.element_type.size()
    }

    pub fn triangle_count(&self) -> usize {
        self.index_count() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Index at position `i`, widened to u32
    pub fn get(&self, i: usize) -> Option<u32> {
        let size = self.element_type.size();
        let raw = self.bytes.get(i * size..(i + 1) * size)?;
        Some(match self.element_type {
            IndexElementType::U16 => u32::from(u16::from_le_bytes([raw[0], raw[1]])),
            IndexElementType::U32 => u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.index_count()).filter_map(move |i| self.get(i))
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        (0..self.triangle_count()).filter_map(move |t| {
            Some([self.get(t * 3)?, self.get(t * 3 + 1)?, self.get(t * 3 + 2)?])
        })
    }

    /// Largest index referenced, if any
    pub fn max_index(&self) -> Option<u32> {
        self.iter().max()
    }
}

/// Triangulate `faces` and encode them for a mesh of `vertex_count` vertices
///
/// Triangles are emitted in face declaration order.
pub fn build_index_buffer(faces: &[Face], vertex_count: usize) -> Result<IndexBuffer> {
    let element_type = IndexElementType::for_vertex_count(vertex_count);
    let triangles: usize = faces
        .iter()
        .map(|f| match f {
            Face::Triangle(_) => 1,
            Face::Quad(_) => 2,
        })
        .sum();
    let mut bytes = Vec::with_capacity(triangles * 3 * element_type.size());

    for (face_index, face) in faces.iter().enumerate() {
        for &index in face.corners() {
            if index as usize >= vertex_count {
                return Err(CodecError::IndexOutOfRange {
                    face: face_index,
                    index,
                    vertex_count,
                });
            }
        }
        for index in face.triangles().flatten() {
            match element_type {
                // Guarded by the range check and the U16 threshold
                IndexElementType::U16 => bytes.extend_from_slice(&(index as u16).to_le_bytes()),
                IndexElementType::U32 => bytes.extend_from_slice(&index.to_le_bytes()),
            }
        }
    }

    tracing::debug!(
        faces = faces.len(),
        triangles,
        ?element_type,
        "built index buffer"
    );

    Ok(IndexBuffer {
        element_type,
        bytes,
    })
}

/// Un-weld faces into one vertex per triangle corner
///
/// Returns the vertex remap (new vertex -> old vertex) and triangles over the
/// new vertices, numbered in emit order.
pub fn expand_corners(faces: &[Face]) -> (Vec<u32>, Vec<Face>) {
    let mut remap = Vec::new();
    let mut expanded = Vec::new();
    for triangle in faces.iter().flat_map(Face::triangles) {
        let base = remap.len() as u32;
        remap.extend_from_slice(&triangle);
        expanded.push(Face::Triangle([base, base + 1, base + 2]));
    }
    (remap, expanded)
}
