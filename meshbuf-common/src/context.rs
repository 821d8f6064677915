//! Per-conversion state
//!
//! Dedup tables and the bone table live here instead of in globals. One
//! context serves one top-level import or export; [`ConversionContext::reset`]
//! starts the next one clean.

use hashbrown::HashMap;

use crate::config::CodecConfig;
use crate::hash::MeshHash;
use crate::record::TextureHandle;
use crate::skin::BoneTable;

/// What makes two packed meshes interchangeable
///
/// Blend indices are mesh-local, so identical bytes bound to different
/// joints are different meshes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeshKey {
    pub hash: MeshHash,
    pub material: Option<usize>,
    pub bones: Vec<u32>,
}

impl MeshKey {
    pub fn new(hash: MeshHash, material: Option<usize>, bones: &[u32]) -> Self {
        Self {
            hash,
            material,
            bones: bones.to_vec(),
        }
    }
}

/// Dedup tables, bone table and settings for one conversion
#[derive(Debug, Clone, Default)]
pub struct ConversionContext {
    config: CodecConfig,
    meshes: HashMap<MeshKey, usize>,
    materials: HashMap<String, usize>,
    texture_handles: HashMap<String, TextureHandle>,
    texture_paths: Vec<String>,
    bones: BoneTable,
}

impl ConversionContext {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Drop every table, keeping the configuration
    pub fn reset(&mut self) {
        self.meshes.clear();
        self.materials.clear();
        self.texture_handles.clear();
        self.texture_paths.clear();
        self.bones.clear();
    }

    /// Index of an already converted mesh with the same key
    pub fn find_mesh(&self, key: &MeshKey) -> Option<usize> {
        self.meshes.get(key).copied()
    }

    /// Remember where a mesh with `key` was stored; the first index wins
    pub fn register_mesh(&mut self, key: MeshKey, index: usize) -> usize {
        *self.meshes.entry(key).or_insert(index)
    }

    pub fn find_material(&self, name: &str) -> Option<usize> {
        self.materials.get(name).copied()
    }

    /// Remember where a material named `name` was stored; the first index wins
    pub fn register_material(&mut self, name: &str, index: usize) -> usize {
        if let Some(&existing) = self.materials.get(name) {
            return existing;
        }
        self.materials.insert(name.to_string(), index);
        index
    }

    /// Handle for `path`, allocating the next one on first sight
    pub fn texture_handle(&mut self, path: &str) -> TextureHandle {
        if let Some(&handle) = self.texture_handles.get(path) {
            return handle;
        }
        let handle = TextureHandle(self.texture_paths.len() as u32);
        self.texture_paths.push(path.to_string());
        self.texture_handles.insert(path.to_string(), handle);
        handle
    }

    /// Texture paths in handle order
    pub fn texture_paths(&self) -> &[String] {
        &self.texture_paths
    }

    pub fn bones(&self) -> &BoneTable {
        &self.bones
    }

    pub fn bones_mut(&mut self) -> &mut BoneTable {
        &mut self.bones
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}
