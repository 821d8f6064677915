//! Mesh and skeleton data for the test scene.

/// Bone count for the test skeleton
pub const BONE_COUNT: usize = 3;
/// Joint node names, root first
pub const BONE_NAMES: [&str; BONE_COUNT] = ["Root", "Spine", "Head"];
/// Segment height between bones
pub const SEGMENT_HEIGHT: f32 = 1.0;
/// Two vertices per level, one level per bone plus the tip
pub const BLADE_VERTEX_COUNT: usize = (BONE_COUNT + 1) * 2;
/// Two triangles per segment
pub const BLADE_TRIANGLE_COUNT: usize = BONE_COUNT * 2;
/// Translation of the plate node
pub const PLATE_OFFSET: [f32; 3] = [2.0, 0.0, 0.0];
/// Albedo texture referenced by the blade material
pub const ALBEDO_URI: &str = "blade_albedo.png";

/// Static mesh attributes
pub(crate) struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<Vec<[f32; 2]>>,
    pub indices: Vec<u16>,
}

/// Skinned mesh: attributes plus JOINTS_0 / WEIGHTS_0
pub(crate) struct SkinnedMeshData {
    pub mesh: MeshData,
    pub joints: Vec<[u8; 4]>,
    pub weights: Vec<[f32; 4]>,
}

/// Skeleton data
pub(crate) struct SkeletonData {
    pub inverse_bind_matrices: Vec<[[f32; 4]; 4]>,
}

/// Create the blade: a vertical strip of quads, one per bone
///
/// Inner levels are shared half and half between neighbouring bones.
pub(crate) fn create_blade() -> SkinnedMeshData {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    let mut joints = Vec::new();
    let mut weights = Vec::new();
    let mut indices = Vec::new();

    let half_w = 0.1;

    for level in 0..=BONE_COUNT {
        let y = level as f32 * SEGMENT_HEIGHT;
        let v = level as f32 / BONE_COUNT as f32;

        let (level_joints, level_weights) = if level == 0 {
            ([0, 0, 0, 0], [1.0, 0.0, 0.0, 0.0])
        } else if level == BONE_COUNT {
            ([(BONE_COUNT - 1) as u8, 0, 0, 0], [1.0, 0.0, 0.0, 0.0])
        } else {
            ([(level - 1) as u8, level as u8, 0, 0], [0.5, 0.5, 0.0, 0.0])
        };

        for (x, u) in [(-half_w, 0.0), (half_w, 1.0)] {
            positions.push([x, y, 0.0]);
            normals.push([0.0, 0.0, 1.0]);
            uvs.push([u, v]);
            joints.push(level_joints);
            weights.push(level_weights);
        }
    }

    for segment in 0..BONE_COUNT {
        let base = (segment * 2) as u16;
        // Two triangles per segment
        indices.extend_from_slice(&[base, base + 1, base + 3, base, base + 3, base + 2]);
    }

    SkinnedMeshData {
        mesh: MeshData {
            positions,
            normals,
            uvs: vec![uvs],
            indices,
        },
        joints,
        weights,
    }
}

/// Create the plate: a unit quad on the XZ plane with two UV sets
pub(crate) fn create_plate() -> MeshData {
    MeshData {
        positions: vec![
            [-0.5, 0.0, -0.5],
            [0.5, 0.0, -0.5],
            [0.5, 0.0, 0.5],
            [-0.5, 0.0, 0.5],
        ],
        normals: vec![[0.0, 1.0, 0.0]; 4],
        uvs: vec![
            vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            vec![[0.25, 0.25], [0.75, 0.25], [0.75, 0.75], [0.25, 0.75]],
        ],
        indices: vec![0, 2, 1, 0, 3, 2],
    }
}

/// Create skeleton with 3 bones
pub(crate) fn create_skeleton() -> SkeletonData {
    // Inverse bind matrices (4x4 column-major)
    // For a simple vertical bone chain, the inverse bind matrix
    // is just an inverse translation
    let inverse_bind_matrices = (0..BONE_COUNT)
        .map(|bone| mat4_translate(0.0, -(bone as f32) * SEGMENT_HEIGHT, 0.0))
        .collect();

    SkeletonData {
        inverse_bind_matrices,
    }
}

// Helper functions

pub(crate) fn mat4_translate(x: f32, y: f32, z: f32) -> [[f32; 4]; 4] {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [x, y, z, 1.0],
    ]
}

pub(crate) fn compute_bounds(positions: &[[f32; 3]]) -> (Vec<f32>, Vec<f32>) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];

    for pos in positions {
        for i in 0..3 {
            min[i] = min[i].min(pos[i]);
            max[i] = max[i].max(pos[i]);
        }
    }

    (min.to_vec(), max.to_vec())
}
