//! Binary data packing for GLTF buffers.

use super::mesh_data::{compute_bounds, MeshData, SkeletonData, SkinnedMeshData};
use gltf_json as json;
use json::validation::Checked::Valid;

/// Accessor indices, in the order [`pack_binary_data`] emits them
pub(crate) mod accessor {
    pub const BLADE_POSITIONS: u32 = 0;
    pub const BLADE_NORMALS: u32 = 1;
    pub const BLADE_UV0: u32 = 2;
    pub const BLADE_JOINTS: u32 = 3;
    pub const BLADE_WEIGHTS: u32 = 4;
    pub const BLADE_INDICES: u32 = 5;
    pub const INVERSE_BIND_MATRICES: u32 = 6;
    pub const PLATE_POSITIONS: u32 = 7;
    pub const PLATE_NORMALS: u32 = 8;
    pub const PLATE_UV0: u32 = 9;
    pub const PLATE_UV1: u32 = 10;
    pub const PLATE_INDICES: u32 = 11;
}

/// Accumulates the shared binary buffer, its views and accessors
struct BufferBuilder {
    buffer: Vec<u8>,
    views: Vec<json::buffer::View>,
    accessors: Vec<json::Accessor>,
}

impl BufferBuilder {
    fn push(
        &mut self,
        bytes: &[u8],
        count: usize,
        component_type: json::accessor::ComponentType,
        type_: json::accessor::Type,
        target: Option<json::buffer::Target>,
        bounds: Option<(Vec<f32>, Vec<f32>)>,
    ) {
        let offset = self.buffer.len();
        self.buffer.extend_from_slice(bytes);
        self.views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: bytes.len().into(),
            byte_offset: Some(offset.into()),
            byte_stride: None,
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: target.map(Valid),
        });

        let (min, max) = match bounds {
            Some((min, max)) => (
                Some(json::Value::Array(
                    min.into_iter().map(json::Value::from).collect(),
                )),
                Some(json::Value::Array(
                    max.into_iter().map(json::Value::from).collect(),
                )),
            ),
            None => (None, None),
        };
        self.accessors.push(json::Accessor {
            buffer_view: Some(json::Index::new(self.views.len() as u32 - 1)),
            byte_offset: Some(0u64.into()),
            count: count.into(),
            component_type: Valid(json::accessor::GenericComponentType(component_type)),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(type_),
            min,
            max,
            name: None,
            normalized: false,
            sparse: None,
        });

        // Align buffer to 4 bytes
        while !self.buffer.len().is_multiple_of(4) {
            self.buffer.push(0);
        }
    }

    fn push_positions(&mut self, positions: &[[f32; 3]]) {
        self.push(
            bytemuck::cast_slice(positions),
            positions.len(),
            json::accessor::ComponentType::F32,
            json::accessor::Type::Vec3,
            Some(json::buffer::Target::ArrayBuffer),
            Some(compute_bounds(positions)),
        );
    }

    fn push_vec3(&mut self, values: &[[f32; 3]]) {
        self.push(
            bytemuck::cast_slice(values),
            values.len(),
            json::accessor::ComponentType::F32,
            json::accessor::Type::Vec3,
            Some(json::buffer::Target::ArrayBuffer),
            None,
        );
    }

    fn push_vec2(&mut self, values: &[[f32; 2]]) {
        self.push(
            bytemuck::cast_slice(values),
            values.len(),
            json::accessor::ComponentType::F32,
            json::accessor::Type::Vec2,
            Some(json::buffer::Target::ArrayBuffer),
            None,
        );
    }

    fn push_indices(&mut self, indices: &[u16]) {
        let bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
        self.push(
            &bytes,
            indices.len(),
            json::accessor::ComponentType::U16,
            json::accessor::Type::Scalar,
            Some(json::buffer::Target::ElementArrayBuffer),
            None,
        );
    }

    fn push_mesh(&mut self, mesh: &MeshData) {
        self.push_positions(&mesh.positions);
        self.push_vec3(&mesh.normals);
        for channel in &mesh.uvs {
            self.push_vec2(channel);
        }
    }
}

/// Pack all binary data into a single buffer
pub(crate) fn pack_binary_data(
    blade: &SkinnedMeshData,
    plate: &MeshData,
    skeleton: &SkeletonData,
) -> (Vec<u8>, Vec<json::buffer::View>, Vec<json::Accessor>) {
    let mut builder = BufferBuilder {
        buffer: Vec::new(),
        views: Vec::new(),
        accessors: Vec::new(),
    };

    // --- Blade ---
    builder.push_mesh(&blade.mesh);
    builder.push(
        bytemuck::cast_slice(&blade.joints),
        blade.joints.len(),
        json::accessor::ComponentType::U8,
        json::accessor::Type::Vec4,
        Some(json::buffer::Target::ArrayBuffer),
        None,
    );
    builder.push(
        bytemuck::cast_slice(&blade.weights),
        blade.weights.len(),
        json::accessor::ComponentType::F32,
        json::accessor::Type::Vec4,
        Some(json::buffer::Target::ArrayBuffer),
        None,
    );
    builder.push_indices(&blade.mesh.indices);

    // --- Skeleton ---
    builder.push(
        bytemuck::cast_slice(&skeleton.inverse_bind_matrices),
        skeleton.inverse_bind_matrices.len(),
        json::accessor::ComponentType::F32,
        json::accessor::Type::Mat4,
        None,
        None,
    );

    // --- Plate ---
    builder.push_mesh(plate);
    builder.push_indices(&plate.indices);

    assert_eq!(builder.accessors.len() as u32, accessor::PLATE_INDICES + 1);
    (builder.buffer, builder.views, builder.accessors)
}
