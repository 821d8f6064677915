//! Programmatic GLB generation for integration tests.
//!
//! Generates a complete GLB file with:
//! - Skinned blade strip (positions, normals, UVs, joints, weights, indices)
//! - 3-bone skeleton with inverse bind matrices
//! - Static plate with two UV sets, instanced under a translated node
//! - Two materials, one referencing an external albedo texture

mod binary_packing;
mod glb_assembly;
mod gltf_json;
mod mesh_data;

#[allow(unused_imports)]
pub use mesh_data::{
    ALBEDO_URI, BLADE_TRIANGLE_COUNT, BLADE_VERTEX_COUNT, BONE_COUNT, BONE_NAMES,
    PLATE_OFFSET, SEGMENT_HEIGHT,
};

use mesh_data::{create_blade, create_plate, create_skeleton};

/// File name the `.gltf` variant uses for its external buffer
pub const BIN_URI: &str = "scene.bin";

/// Generate the test scene as `.gltf` JSON plus the bytes of [`BIN_URI`]
pub fn generate_scene_gltf() -> (String, Vec<u8>) {
    let (buffer_data, buffer_views, accessors) =
        binary_packing::pack_binary_data(&create_blade(), &create_plate(), &create_skeleton());
    let root = gltf_json::build_gltf_json(&buffer_views, &accessors);
    let json = glb_assembly::assemble_gltf(&root, buffer_data.len(), BIN_URI);
    (json, buffer_data)
}

/// Generate the test scene as GLB bytes.
///
/// Contains:
/// - "Blade": 3 stacked quads skinned to Root -> Spine -> Head
/// - "Plate": one unskinned quad with TEXCOORD_0 and TEXCOORD_1
pub fn generate_scene_glb() -> Vec<u8> {
    let blade = create_blade();
    let plate = create_plate();
    let skeleton = create_skeleton();

    // Pack all binary data
    let (buffer_data, buffer_views, accessors) =
        binary_packing::pack_binary_data(&blade, &plate, &skeleton);

    // Build GLTF JSON
    let root = gltf_json::build_gltf_json(&buffer_views, &accessors);

    // Assemble GLB
    glb_assembly::assemble_glb(&root, &buffer_data)
}
