//! Interleaved mesh buffer codec
//!
//! Converts interchange meshes (arbitrary attributes, quads, bone-centric
//! skin weights) into self-describing interleaved vertex buffers plus index
//! buffers, and back.
//!
//! # Modules
//!
//! - [`packing`] - Numeric codec (f32, f16, integers, packed 10-10-10-2)
//! - [`layout`] - Buffer layout planner and descriptor validation
//! - [`skin`] - Skin influence packer and the shared bone table
//! - [`vertex`] - Vertex packer / unpacker
//! - [`index`] - Index buffer builder
//! - [`metadata`] - Bounding box and batch counts
//! - [`hash`] - Content hashing for deduplication
//! - [`context`] - Per-conversion dedup tables
//! - [`import`] / [`export`] - Scene pipelines in both directions
//! - [`formats`] - Binary packed mesh records

pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod formats;
pub mod hash;
pub mod import;
pub mod index;
pub mod layout;
pub mod metadata;
pub mod packing;
pub mod record;
pub mod scene;
pub mod skin;
pub mod vertex;

pub use config::{CodecConfig, UnsupportedPolicy};
pub use context::{ConversionContext, MeshKey};
pub use error::{CodecError, Result};
pub use export::{ExportedScene, export_material, export_mesh, export_scene};
pub use hash::{MeshHash, combine_hash, mesh_hash};
pub use import::{import_material, import_mesh, import_scene};
pub use index::{Face, IndexBuffer, IndexElementType, build_index_buffer, expand_corners};
pub use layout::{
    AttributeSet, BufferDescriptor, LayoutEncodings, Semantic, SkinFormat, VertexLayout,
};
pub use metadata::{Aabb, MeshMetaData};
pub use packing::{
    ElementType, decode_float, decode_vec3, encode_float, encode_vec3, pack_10_10_10_2,
    unpack_10_10_10_2,
};
pub use record::{
    ImportedScene, MaterialRecord, MeshFailure, NodeKind, PackedMesh, SceneNode, TextureHandle,
    Transform,
};
pub use scene::{
    SourceBone, SourceMaterial, SourceMesh, SourceNode, SourceScene, TextureKind, TextureSlot,
};
pub use skin::{BoneTable, Joint, PackedSkin, VertexWeight};
pub use vertex::{VertexAttributes, pack_vertices, unpack_vertices};
