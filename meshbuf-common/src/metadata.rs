//! Geometry metadata: bounding box and batch counts

use std::ops::Range;

use glam::Vec3;

/// Axis-aligned bounds of a position stream
///
/// An empty stream keeps the `+∞ / -∞` sentinels; check
/// [`Aabb::is_empty`] before trusting the extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Unreduced sentinel bounds
    pub const EMPTY: Self = Self {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    /// Single linear min/max reduction
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a [f32; 3]>) -> Self {
        positions.into_iter().fold(Self::EMPTY, |aabb, &p| {
            let p = Vec3::from(p);
            Self {
                min: aabb.min.min(p),
                max: aabb.max.max(p),
            }
        })
    }

    /// True while no point has been folded in
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Counts and bounds the host needs for culling and draw submission
#[derive(Debug, Clone, PartialEq)]
pub struct MeshMetaData {
    pub vertex_count: u32,
    pub triangle_count: u32,
    /// Indices submitted per draw
    pub batch_count: u32,
    /// First vertex and one past the last
    pub vertex_range: Range<u32>,
    pub aabb_min: Vec3,
    pub aabb_max: Vec3,
    pub bone_count: u32,
}

impl MeshMetaData {
    /// Build from pre-pack or decoded positions and the triangle count
    pub fn build(positions: &[[f32; 3]], triangle_count: usize, bone_count: usize) -> Self {
        let aabb = Aabb::from_positions(positions);
        let vertex_count = positions.len() as u32;
        Self {
            vertex_count,
            triangle_count: triangle_count as u32,
            batch_count: triangle_count as u32 * 3,
            vertex_range: 0..vertex_count,
            aabb_min: aabb.min,
            aabb_max: aabb.max,
            bone_count: bone_count as u32,
        }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb {
            min: self.aabb_min,
            max: self.aabb_max,
        }
    }
}
