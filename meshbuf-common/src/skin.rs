//! Skin influence packer
//!
//! Interchange formats list influences per bone (`bone -> [(vertex, weight)]`),
//! renderers want them per vertex in fixed-width rows. Packing is two passes:
//! 1. invert the bone lists and measure the widest vertex
//! 2. write every vertex into a zero-padded row of `capacity` slots
//!
//! Weights are passed through untouched; no renormalization happens here.

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::error::{CodecError, Result};
use crate::layout::SkinFormat;
use crate::packing::ElementType;
use crate::scene::SourceBone;

/// Largest bone count addressable with u8 blend indices
pub const MAX_U8_BONES: usize = 256;

/// Largest per-vertex capacity a descriptor can express
pub const MAX_CAPACITY: usize = 252;

/// One bone's influence on one vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    pub vertex_id: u32,
    pub weight: f32,
}

impl VertexWeight {
    pub const fn new(vertex_id: u32, weight: f32) -> Self {
        Self { vertex_id, weight }
    }
}

/// Influences on a single vertex as `(bone, weight)` pairs
pub type Influences = SmallVec<[(u32, f32); 4]>;

/// Round the widest influence count up to a multiple of 4 (minimum 4)
#[inline]
pub const fn influence_capacity(max_influences: usize) -> usize {
    let groups = max_influences.div_ceil(4);
    if groups == 0 { 4 } else { groups * 4 }
}

/// Narrowest blend index type able to address `bone_count` bones
#[inline]
pub const fn blend_index_type(bone_count: usize) -> ElementType {
    if bone_count > MAX_U8_BONES {
        ElementType::U16
    } else {
        ElementType::U8
    }
}

/// Invert bone-centric lists into per-vertex lists in one pass
///
/// Bone ids are the positions in `bones`. A bone naming the same vertex twice
/// contributes only its first entry.
pub fn invert_influences<'a, I>(bones: I, vertex_count: usize) -> Result<Vec<Influences>>
where
    I: IntoIterator<Item = &'a [VertexWeight]>,
{
    let mut per_vertex = vec![Influences::new(); vertex_count];

    for (bone, weights) in bones.into_iter().enumerate() {
        for w in weights {
            let slot = per_vertex
                .get_mut(w.vertex_id as usize)
                .ok_or(CodecError::InfluenceOutOfRange {
                    bone,
                    vertex: w.vertex_id,
                    vertex_count,
                })?;
            if slot.last().is_some_and(|&(b, _)| b == bone as u32) {
                tracing::debug!(bone, vertex = w.vertex_id, "duplicate influence ignored");
                continue;
            }
            slot.push((bone as u32, w.weight));
        }
    }

    Ok(per_vertex)
}

/// Fixed-width, zero-padded blend index and weight rows
#[derive(Debug, Clone, PartialEq)]
pub struct PackedSkin {
    capacity: usize,
    index_type: ElementType,
    indices: Vec<u32>,
    weights: Vec<f32>,
}

impl PackedSkin {
    /// Invert and pack bone-centric influence lists
    pub fn from_bones<'a, I>(bones: I, bone_count: usize, vertex_count: usize) -> Result<Self>
    where
        I: IntoIterator<Item = &'a [VertexWeight]>,
    {
        let per_vertex = invert_influences(bones, vertex_count)?;
        Self::pack(&per_vertex, bone_count)
    }

    /// Pack per-vertex lists into rows of a uniform capacity
    pub fn pack(per_vertex: &[Influences], bone_count: usize) -> Result<Self> {
        // Pass 1: measure
        let max_influences = per_vertex.iter().map(|v| v.len()).max().unwrap_or(0);
        let capacity = influence_capacity(max_influences);
        if capacity > MAX_CAPACITY {
            return Err(CodecError::LayoutViolation(format!(
                "{max_influences} influences per vertex exceed the supported {MAX_CAPACITY}"
            )));
        }

        // Pass 2: write padded rows
        let mut indices = vec![0u32; per_vertex.len() * capacity];
        let mut weights = vec![0.0f32; per_vertex.len() * capacity];
        for (vertex, influences) in per_vertex.iter().enumerate() {
            let row = vertex * capacity;
            for (slot, &(bone, weight)) in influences.iter().enumerate() {
                indices[row + slot] = bone;
                weights[row + slot] = weight;
            }
        }

        let index_type = blend_index_type(bone_count);
        tracing::debug!(
            max_influences,
            capacity,
            ?index_type,
            bone_count,
            "packed skin influences"
        );

        Ok(Self {
            capacity,
            index_type,
            indices,
            weights,
        })
    }

    /// Rebuild from decoded rows
    pub fn from_rows(
        format: SkinFormat,
        indices: Vec<u32>,
        weights: Vec<f32>,
    ) -> Result<Self> {
        let capacity = format.capacity as usize;
        if capacity == 0 || indices.len() != weights.len() || indices.len() % capacity != 0 {
            return Err(CodecError::LayoutViolation(format!(
                "{} indices and {} weights do not form rows of {capacity}",
                indices.len(),
                weights.len()
            )));
        }
        Ok(Self {
            capacity,
            index_type: format.index_type,
            indices,
            weights,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn index_type(&self) -> ElementType {
        self.index_type
    }

    /// Layout-facing description of the rows
    pub fn format(&self) -> SkinFormat {
        SkinFormat {
            capacity: self.capacity as u8,
            index_type: self.index_type,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.indices.len() / self.capacity
    }

    /// Blend indices and weights of one vertex
    pub fn row(&self, vertex: usize) -> (&[u32], &[f32]) {
        let range = vertex * self.capacity..(vertex + 1) * self.capacity;
        (&self.indices[range.clone()], &self.weights[range])
    }

    /// Rows reordered by `remap` (new vertex -> old vertex)
    pub fn remap(&self, remap: &[u32]) -> Self {
        let mut indices = Vec::with_capacity(remap.len() * self.capacity);
        let mut weights = Vec::with_capacity(remap.len() * self.capacity);
        for &old in remap {
            let (i, w) = self.row(old as usize);
            indices.extend_from_slice(i);
            weights.extend_from_slice(w);
        }
        Self {
            capacity: self.capacity,
            index_type: self.index_type,
            indices,
            weights,
        }
    }

    /// Re-express the rows bone-centric for `bone_count` bones
    ///
    /// Zero-weight slots (padding) are dropped. Indices past `bone_count`
    /// are skipped with a warning.
    pub fn to_bone_weights(&self, bone_count: usize) -> Vec<Vec<VertexWeight>> {
        let mut bones = vec![Vec::new(); bone_count];
        for vertex in 0..self.vertex_count() {
            let (indices, weights) = self.row(vertex);
            for (&bone, &weight) in indices.iter().zip(weights) {
                if weight == 0.0 {
                    continue;
                }
                match bones.get_mut(bone as usize) {
                    Some(list) => list.push(VertexWeight::new(vertex as u32, weight)),
                    None => tracing::warn!(bone, vertex, bone_count, "blend index out of range"),
                }
            }
        }
        bones
    }
}

// ============================================================================
// Bone Table
// ============================================================================

/// A joint in the conversion-wide bone table
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    /// Inverse bind-pose matrix, row-major
    pub offset_matrix: [[f32; 4]; 4],
}

/// Name-keyed table of joints shared by every mesh of one conversion
#[derive(Debug, Clone, Default)]
pub struct BoneTable {
    joints: Vec<Joint>,
    by_name: HashMap<String, u32>,
}

impl BoneTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joint index for `name`, registering it on first sight
    ///
    /// The first definition of a name wins; later offset matrices are ignored.
    pub fn register(&mut self, name: &str, offset_matrix: [[f32; 4]; 4]) -> u32 {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.joints.len() as u32;
        self.joints.push(Joint {
            name: name.to_string(),
            offset_matrix,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn find(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: u32) -> Option<&Joint> {
        self.joints.get(id as usize)
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn clear(&mut self) {
        self.joints.clear();
        self.by_name.clear();
    }

    /// Forget every joint registered at or after index `len`
    pub fn truncate(&mut self, len: usize) {
        for joint in self.joints.drain(len.min(self.joints.len())..) {
            self.by_name.remove(&joint.name);
        }
    }
}

/// Bones of one mesh resolved against the bone table
#[derive(Debug, Default)]
pub struct BoundBones<'a> {
    /// Local bone index -> joint index
    pub joints: Vec<u32>,
    /// Influence lists in local bone order
    pub weights: Vec<&'a [VertexWeight]>,
    /// Bones skipped because their name repeated within the mesh
    pub collisions: Vec<CodecError>,
}

/// Resolve a mesh's bones to joints, skipping repeated names
///
/// A repeated name keeps the first bone; the later bone's weights are dropped.
pub fn bind_bones<'a>(table: &mut BoneTable, bones: &'a [SourceBone]) -> BoundBones<'a> {
    let mut bound = BoundBones::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(bones.len());

    for bone in bones {
        if !seen.insert(bone.name.as_str()) {
            tracing::warn!(bone = %bone.name, "duplicate bone name, skipping later definition");
            bound.collisions.push(CodecError::BoneTableCollision {
                name: bone.name.clone(),
            });
            continue;
        }
        bound.joints.push(table.register(&bone.name, bone.offset_matrix));
        bound.weights.push(&bone.weights);
    }

    bound
}
