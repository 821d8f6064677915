//! Codec error taxonomy
//!
//! Every failure is local to a single mesh conversion. Scene-level pipelines
//! log the error and skip the mesh; sibling meshes are unaffected.

use crate::layout::Semantic;
use crate::packing::ElementType;

/// Errors raised by the mesh buffer codec
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// Element type has no codec for the requested operation
    #[error("unsupported encoding {element_type:?} in {operation}")]
    UnsupportedEncoding {
        element_type: ElementType,
        operation: &'static str,
    },

    /// Descriptor table is inconsistent (overlap, stride overflow, missing position)
    #[error("layout violation: {0}")]
    LayoutViolation(String),

    /// Bone name registered twice within one mesh
    #[error("bone '{name}' is already registered, later definition ignored")]
    BoneTableCollision { name: String },

    /// Source mesh carries no position stream
    #[error("mesh has no position attribute")]
    MissingPositions,

    /// A per-vertex stream does not match the vertex count
    #[error("{semantic:?} stream has {actual} entries, expected {expected}")]
    AttributeCountMismatch {
        semantic: Semantic,
        expected: usize,
        actual: usize,
    },

    /// Face corner points past the vertex array
    #[error("face {face} references vertex {index}, mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        face: usize,
        index: u32,
        vertex_count: usize,
    },

    /// Face is neither a triangle nor a quad
    #[error("face {face} has {corners} corners (only triangles and quads are supported)")]
    UnsupportedFace { face: usize, corners: usize },

    /// Bone influence points past the vertex array
    #[error("bone {bone} influences vertex {vertex}, mesh has {vertex_count} vertices")]
    InfluenceOutOfRange {
        bone: usize,
        vertex: u32,
        vertex_count: usize,
    },

    /// Byte buffer ends before the data it should hold
    #[error("buffer is {actual} bytes, expected at least {expected}")]
    BufferTooShort { expected: usize, actual: usize },

    /// Stored mesh hash does not match the hash of the stored bytes
    #[error("mesh hash mismatch: stored {expected:016x}, computed {actual:016x}")]
    HashMismatch { expected: u64, actual: u64 },
}

/// Result alias used throughout the codec
pub type Result<T> = std::result::Result<T, CodecError>;
