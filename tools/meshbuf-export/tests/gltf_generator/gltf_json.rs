//! GLTF JSON structure building.

use super::binary_packing::accessor;
use super::mesh_data::{ALBEDO_URI, BONE_NAMES, PLATE_OFFSET, SEGMENT_HEIGHT};
use gltf_json as json;
use json::validation::Checked::Valid;
use std::collections::BTreeMap;

// Node indices
const ROOT_NODE: u32 = 0;
const SPINE_NODE: u32 = 1;
const HEAD_NODE: u32 = 2;
const BLADE_NODE: u32 = 3;
const PLATE_NODE: u32 = 4;

fn node(name: &str) -> json::Node {
    json::Node {
        camera: None,
        children: None,
        extensions: Default::default(),
        extras: Default::default(),
        matrix: None,
        mesh: None,
        name: Some(name.to_string()),
        rotation: None,
        scale: None,
        translation: None,
        skin: None,
        weights: None,
    }
}

type Attributes =
    BTreeMap<json::validation::Checked<json::mesh::Semantic>, json::Index<json::Accessor>>;

fn attributes(pairs: &[(json::mesh::Semantic, u32)]) -> Attributes {
    pairs
        .iter()
        .map(|(semantic, index)| (Valid(semantic.clone()), json::Index::new(*index)))
        .collect()
}

fn mesh(name: &str, attributes: Attributes, indices: u32, material: u32) -> json::Mesh {
    json::Mesh {
        extensions: Default::default(),
        extras: Default::default(),
        name: Some(name.to_string()),
        primitives: vec![json::mesh::Primitive {
            attributes,
            extensions: Default::default(),
            extras: Default::default(),
            indices: Some(json::Index::new(indices)),
            material: Some(json::Index::new(material)),
            mode: Valid(json::mesh::Mode::Triangles),
            targets: None,
        }],
        weights: None,
    }
}

/// Build the GLTF JSON structure
pub(crate) fn build_gltf_json(
    buffer_views: &[json::buffer::View],
    accessors: &[json::Accessor],
) -> json::Root {
    use json::mesh::Semantic;

    // Bone chain, then the two mesh instances
    let nodes = vec![
        json::Node {
            children: Some(vec![json::Index::new(SPINE_NODE)]),
            translation: Some([0.0, 0.0, 0.0]),
            ..node(BONE_NAMES[0])
        },
        json::Node {
            children: Some(vec![json::Index::new(HEAD_NODE)]),
            translation: Some([0.0, SEGMENT_HEIGHT, 0.0]),
            ..node(BONE_NAMES[1])
        },
        json::Node {
            translation: Some([0.0, SEGMENT_HEIGHT, 0.0]),
            ..node(BONE_NAMES[2])
        },
        json::Node {
            mesh: Some(json::Index::new(0)),
            skin: Some(json::Index::new(0)),
            ..node("BladeMesh")
        },
        json::Node {
            mesh: Some(json::Index::new(1)),
            translation: Some(PLATE_OFFSET),
            ..node("PlateMesh")
        },
    ];

    let meshes = vec![
        mesh(
            "Blade",
            attributes(&[
                (Semantic::Positions, accessor::BLADE_POSITIONS),
                (Semantic::Normals, accessor::BLADE_NORMALS),
                (Semantic::TexCoords(0), accessor::BLADE_UV0),
                (Semantic::Joints(0), accessor::BLADE_JOINTS),
                (Semantic::Weights(0), accessor::BLADE_WEIGHTS),
            ]),
            accessor::BLADE_INDICES,
            0,
        ),
        mesh(
            "Plate",
            attributes(&[
                (Semantic::Positions, accessor::PLATE_POSITIONS),
                (Semantic::Normals, accessor::PLATE_NORMALS),
                (Semantic::TexCoords(0), accessor::PLATE_UV0),
                (Semantic::TexCoords(1), accessor::PLATE_UV1),
            ]),
            accessor::PLATE_INDICES,
            1,
        ),
    ];

    let skins = vec![json::Skin {
        extensions: Default::default(),
        extras: Default::default(),
        inverse_bind_matrices: Some(json::Index::new(accessor::INVERSE_BIND_MATRICES)),
        joints: vec![
            json::Index::new(ROOT_NODE),
            json::Index::new(SPINE_NODE),
            json::Index::new(HEAD_NODE),
        ],
        name: Some("TestSkeleton".to_string()),
        skeleton: Some(json::Index::new(ROOT_NODE)),
    }];

    // External image, referenced by path only
    let images = vec![json::Image {
        buffer_view: None,
        mime_type: None,
        name: None,
        uri: Some(ALBEDO_URI.to_string()),
        extensions: Default::default(),
        extras: Default::default(),
    }];
    let textures = vec![json::Texture {
        name: None,
        sampler: None,
        source: json::Index::new(0),
        extensions: Default::default(),
        extras: Default::default(),
    }];

    let materials = vec![
        json::Material {
            name: Some("Steel".to_string()),
            pbr_metallic_roughness: json::material::PbrMetallicRoughness {
                base_color_factor: json::material::PbrBaseColorFactor([0.8, 0.7, 0.6, 1.0]),
                base_color_texture: Some(json::texture::Info {
                    index: json::Index::new(0),
                    tex_coord: 0,
                    extensions: Default::default(),
                    extras: Default::default(),
                }),
                ..Default::default()
            },
            ..Default::default()
        },
        json::Material {
            name: Some("Stone".to_string()),
            ..Default::default()
        },
    ];

    let scenes = vec![json::Scene {
        extensions: Default::default(),
        extras: Default::default(),
        name: Some("TestScene".to_string()),
        nodes: vec![
            json::Index::new(ROOT_NODE),
            json::Index::new(BLADE_NODE),
            json::Index::new(PLATE_NODE),
        ],
    }];

    // Create buffer (byte length will be set by assemble_glb)
    let buffers = vec![json::Buffer {
        byte_length: 0u64.into(),
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        uri: None,
    }];

    json::Root {
        accessors: accessors.to_vec(),
        animations: Vec::new(),
        asset: json::Asset {
            copyright: None,
            extensions: Default::default(),
            extras: Default::default(),
            generator: Some("meshbuf-export-test".to_string()),
            min_version: None,
            version: "2.0".to_string(),
        },
        buffers,
        buffer_views: buffer_views.to_vec(),
        cameras: Vec::new(),
        extensions: Default::default(),
        extras: Default::default(),
        extensions_required: Vec::new(),
        extensions_used: Vec::new(),
        images,
        materials,
        meshes,
        nodes,
        samplers: Vec::new(),
        scene: Some(json::Index::new(0)),
        scenes,
        skins,
        textures,
    }
}
