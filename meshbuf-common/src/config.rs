//! Codec configuration
//!
//! Deserializable from TOML (see `meshbuf-export --config`). Every field has a
//! default so partial files are accepted.

use serde::{Deserialize, Serialize};

use crate::layout::LayoutEncodings;

/// What to do when a stored component has no decoder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedPolicy {
    /// Abort the mesh with `CodecError::UnsupportedEncoding`
    #[default]
    Error,
    /// Substitute `-1.0` and log a warning
    Sentinel,
}

/// Settings shared by the pack and unpack directions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Store V as `1 - v` for both UV channels (flipped back on unpack)
    pub flip_v: bool,
    pub on_unsupported: UnsupportedPolicy,
    pub encodings: LayoutEncodings,
    /// Un-weld shared vertices into one vertex per triangle corner
    pub expand_corners: bool,
    /// Pack rows on the rayon thread pool
    pub parallel_rows: bool,
}
