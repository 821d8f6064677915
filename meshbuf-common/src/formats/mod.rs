//! Binary record formats
//!
//! POD little-endian layouts for persisting packed meshes. No magic bytes;
//! containers that hold several records add their own framing.
//!
//! Fixed-size headers implement [`BinarySerializable`].

pub mod mesh;
mod serialization;

pub use mesh::*;
pub use serialization::BinarySerializable;
