//! Content hashing for mesh deduplication
//!
//! xxh3 over the vertex bytes and the index bytes, folded into one value.
//! Not a security boundary; collisions are treated as "same mesh".

use std::fmt;

use xxhash_rust::xxh3::xxh3_64;

/// Identity of a packed mesh, derived from its buffer bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHash(pub u64);

impl MeshHash {
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MeshHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Order-sensitive 64-bit combine
#[inline]
pub const fn combine_hash(seed: u64, value: u64) -> u64 {
    seed ^ value
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}

/// Hash of one buffer's bytes
#[inline]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

/// `combine(hash(vertex_bytes), hash(index_bytes))`
pub fn mesh_hash(vertex_bytes: &[u8], index_bytes: &[u8]) -> MeshHash {
    MeshHash(combine_hash(hash_bytes(vertex_bytes), hash_bytes(index_bytes)))
}
