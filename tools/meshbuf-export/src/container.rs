//! `.meshbuf` bundle container
//!
//! Wraps the packed mesh records of one converted scene together with the
//! tables they reference: texture paths, materials, joints and the node tree.
//!
//! # Layout
//! ```text
//! 0x00: magic "MBUF"
//! 0x04: version u16
//! 0x06: reserved u16
//! 0x08: textures   count u32, then per texture: path string
//! var:  materials  count u32, then per material:
//!                    name string, flags u32, main_color 4×f32,
//!                    texture count u32, then per texture: kind u8, handle u32
//! var:  joints     count u32, then per joint: name string, offset 16×f32 (row-major)
//! var:  meshes     count u32, then per mesh:
//!                    name string, material u32 (0xFFFFFFFF = none),
//!                    record length u32, packed mesh record
//! var:  root node  name string, translation 3×f32, rotation 4×f32 (xyzw),
//!                  scale 3×f32, kind u8 (0 = locator, 1 = mesh),
//!                  mesh count u32, mesh indices u32...,
//!                  child count u32, children...
//! ```
//!
//! Strings are a u32 byte length followed by UTF-8. Everything is little-endian.

use glam::{Quat, Vec3};
use meshbuf_common::formats::{decode_mesh, encode_mesh};
use meshbuf_common::{
    CodecConfig, CodecError, ImportedScene, Joint, MaterialRecord, NodeKind, PackedMesh,
    SceneNode, TextureHandle, TextureKind, Transform,
};
use std::io::Write;
use thiserror::Error;

/// Bundle magic bytes
pub const BUNDLE_MAGIC: [u8; 4] = *b"MBUF";

/// Current bundle version
pub const BUNDLE_VERSION: u16 = 1;

const NO_MATERIAL: u32 = u32::MAX;

/// Deepest node nesting a bundle may declare
pub const MAX_NODE_DEPTH: usize = 256;

/// Errors reading or writing a bundle
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("not a mesh bundle (magic {0:?})")]
    BadMagic([u8; 4]),

    #[error("unsupported bundle version {0}")]
    UnsupportedVersion(u16),

    #[error("bundle truncated at offset {offset}: {needed} more bytes needed")]
    Truncated { offset: usize, needed: usize },

    #[error("string at offset {0} is not valid UTF-8")]
    InvalidString(usize),

    #[error("unknown {what} tag {tag} at offset {offset}")]
    UnknownTag {
        what: &'static str,
        tag: u8,
        offset: usize,
    },

    #[error("{what} index {index} out of range ({count} entries)")]
    DanglingIndex {
        what: &'static str,
        index: u32,
        count: usize,
    },

    #[error("mesh record {index} ({name:?}) declares {declared} bytes but uses {consumed}")]
    RecordLength {
        index: usize,
        name: String,
        declared: usize,
        consumed: usize,
    },

    #[error("mesh record {index} ({name:?}): {source}")]
    Record {
        index: usize,
        name: String,
        #[source]
        source: CodecError,
    },

    #[error("node at offset {offset} nests deeper than {limit} levels")]
    NodeDepth { offset: usize, limit: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type BundleResult<T> = std::result::Result<T, BundleError>;

// ============================================================================
// Writing
// ============================================================================

/// Serialize a converted scene
///
/// Import failures are not stored; only the meshes that converted.
pub fn write_bundle<W: Write>(w: &mut W, scene: &ImportedScene) -> BundleResult<()> {
    w.write_all(&BUNDLE_MAGIC)?;
    w.write_all(&BUNDLE_VERSION.to_le_bytes())?;
    w.write_all(&0u16.to_le_bytes())?;

    write_u32(w, scene.textures.len() as u32)?;
    for path in &scene.textures {
        write_str(w, path)?;
    }

    write_u32(w, scene.materials.len() as u32)?;
    for material in &scene.materials {
        write_material(w, material)?;
    }

    write_u32(w, scene.joints.len() as u32)?;
    for joint in &scene.joints {
        write_str(w, &joint.name)?;
        write_f32s(w, bytemuck::cast_slice::<[f32; 4], f32>(&joint.offset_matrix))?;
    }

    write_u32(w, scene.meshes.len() as u32)?;
    for mesh in &scene.meshes {
        write_str(w, &mesh.name)?;
        write_u32(w, mesh.material.map_or(NO_MATERIAL, |m| m as u32))?;
        let record = encode_mesh(mesh);
        write_u32(w, record.len() as u32)?;
        w.write_all(&record)?;
    }

    write_node(w, &scene.root)
}

fn write_material<W: Write>(w: &mut W, material: &MaterialRecord) -> BundleResult<()> {
    write_str(w, &material.name)?;
    write_u32(w, material.flags)?;
    write_f32s(w, &material.main_color)?;
    write_u32(w, material.textures.len() as u32)?;
    for (kind, handle) in &material.textures {
        w.write_all(&[kind_to_u8(*kind)])?;
        write_u32(w, handle.0)?;
    }
    Ok(())
}

fn write_node<W: Write>(w: &mut W, node: &SceneNode) -> BundleResult<()> {
    write_str(w, &node.name)?;
    write_f32s(w, &node.transform.translation.to_array())?;
    write_f32s(w, &node.transform.rotation.to_array())?;
    write_f32s(w, &node.transform.scale.to_array())?;

    match &node.kind {
        NodeKind::Locator => {
            w.write_all(&[0])?;
            write_u32(w, 0)?;
        }
        NodeKind::Mesh(meshes) => {
            w.write_all(&[1])?;
            write_u32(w, meshes.len() as u32)?;
            for &mesh in meshes {
                write_u32(w, mesh as u32)?;
            }
        }
    }

    write_u32(w, node.children.len() as u32)?;
    for child in &node.children {
        write_node(w, child)?;
    }
    Ok(())
}

fn write_u32<W: Write>(w: &mut W, value: u32) -> BundleResult<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_f32s<W: Write>(w: &mut W, values: &[f32]) -> BundleResult<()> {
    for value in values {
        w.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

fn write_str<W: Write>(w: &mut W, s: &str) -> BundleResult<()> {
    write_u32(w, s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn kind_to_u8(kind: TextureKind) -> u8 {
    match kind {
        TextureKind::Diffuse => 0,
        TextureKind::Normal => 1,
        TextureKind::Emissive => 2,
        TextureKind::Masks => 3,
    }
}

fn kind_from_u8(tag: u8) -> Option<TextureKind> {
    match tag {
        0 => Some(TextureKind::Diffuse),
        1 => Some(TextureKind::Normal),
        2 => Some(TextureKind::Emissive),
        3 => Some(TextureKind::Masks),
        _ => None,
    }
}

// ============================================================================
// Reading
// ============================================================================

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> BundleResult<&'a [u8]> {
        let remaining = self.bytes.len() - self.pos;
        if remaining < len {
            return Err(BundleError::Truncated {
                offset: self.pos,
                needed: len - remaining,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u8(&mut self) -> BundleResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> BundleResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> BundleResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32s<const N: usize>(&mut self) -> BundleResult<[f32; N]> {
        let mut out = [0.0; N];
        for value in &mut out {
            *value = f32::from_bits(self.u32()?);
        }
        Ok(out)
    }

    fn string(&mut self) -> BundleResult<String> {
        let len = self.u32()? as usize;
        let at = self.pos;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| BundleError::InvalidString(at))
    }
}

/// Parse a bundle written by [`write_bundle`]
///
/// Every record is hash-checked and every cross-reference range-checked.
pub fn read_bundle(bytes: &[u8], config: &CodecConfig) -> BundleResult<ImportedScene> {
    let mut r = Reader { bytes, pos: 0 };

    let magic = r.take(4)?;
    if magic != BUNDLE_MAGIC {
        return Err(BundleError::BadMagic([magic[0], magic[1], magic[2], magic[3]]));
    }
    let version = r.u16()?;
    if version != BUNDLE_VERSION {
        return Err(BundleError::UnsupportedVersion(version));
    }
    let _reserved = r.u16()?;

    let texture_count = r.u32()? as usize;
    let textures = (0..texture_count)
        .map(|_| r.string())
        .collect::<BundleResult<Vec<_>>>()?;

    let material_count = r.u32()? as usize;
    let mut materials = Vec::with_capacity(material_count.min(1024));
    for _ in 0..material_count {
        materials.push(read_material(&mut r, textures.len())?);
    }

    let joint_count = r.u32()? as usize;
    let mut joints = Vec::with_capacity(joint_count.min(1024));
    for _ in 0..joint_count {
        let name = r.string()?;
        let flat: [f32; 16] = r.f32s()?;
        joints.push(Joint {
            name,
            offset_matrix: bytemuck::cast(flat),
        });
    }

    let mesh_count = r.u32()? as usize;
    let mut meshes = Vec::with_capacity(mesh_count.min(1024));
    for index in 0..mesh_count {
        meshes.push(read_mesh(&mut r, index, config, materials.len(), joints.len())?);
    }

    let root = read_node(&mut r, meshes.len(), 0)?;

    if r.pos != bytes.len() {
        tracing::warn!("Ignoring {} trailing bytes in bundle", bytes.len() - r.pos);
    }

    Ok(ImportedScene {
        root,
        meshes,
        materials,
        textures,
        joints,
        failures: Vec::new(),
    })
}

fn read_material(r: &mut Reader, texture_count: usize) -> BundleResult<MaterialRecord> {
    let name = r.string()?;
    let flags = r.u32()?;
    let main_color = r.f32s()?;

    let count = r.u32()? as usize;
    let mut textures = Vec::with_capacity(count.min(16));
    for _ in 0..count {
        let at = r.pos;
        let tag = r.u8()?;
        let kind = kind_from_u8(tag).ok_or(BundleError::UnknownTag {
            what: "texture kind",
            tag,
            offset: at,
        })?;
        let handle = r.u32()?;
        check_index("texture", handle, texture_count)?;
        textures.push((kind, TextureHandle(handle)));
    }

    Ok(MaterialRecord {
        name,
        flags,
        main_color,
        textures,
    })
}

fn read_mesh(
    r: &mut Reader,
    index: usize,
    config: &CodecConfig,
    material_count: usize,
    joint_count: usize,
) -> BundleResult<PackedMesh> {
    let name = r.string()?;
    let material = match r.u32()? {
        NO_MATERIAL => None,
        m => {
            check_index("material", m, material_count)?;
            Some(m as usize)
        }
    };

    let declared = r.u32()? as usize;
    let record = r.take(declared)?;
    let (mut mesh, consumed) = decode_mesh(record, config).map_err(|source| BundleError::Record {
        index,
        name: name.clone(),
        source,
    })?;
    if consumed != declared {
        return Err(BundleError::RecordLength {
            index,
            name,
            declared,
            consumed,
        });
    }
    for &joint in &mesh.bones {
        check_index("joint", joint, joint_count)?;
    }

    mesh.name = name;
    mesh.material = material;
    Ok(mesh)
}

fn read_node(r: &mut Reader, mesh_count: usize, depth: usize) -> BundleResult<SceneNode> {
    if depth > MAX_NODE_DEPTH {
        return Err(BundleError::NodeDepth {
            offset: r.pos,
            limit: MAX_NODE_DEPTH,
        });
    }
    let name = r.string()?;
    let translation = Vec3::from_array(r.f32s()?);
    let rotation = Quat::from_array(r.f32s()?);
    let scale = Vec3::from_array(r.f32s()?);

    let at = r.pos;
    let tag = r.u8()?;
    let count = r.u32()? as usize;
    let mut meshes = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let mesh = r.u32()?;
        check_index("mesh", mesh, mesh_count)?;
        meshes.push(mesh as usize);
    }
    let kind = match tag {
        0 => NodeKind::Locator,
        1 => NodeKind::Mesh(meshes),
        tag => {
            return Err(BundleError::UnknownTag {
                what: "node kind",
                tag,
                offset: at,
            })
        }
    };

    let child_count = r.u32()? as usize;
    let mut children = Vec::with_capacity(child_count.min(1024));
    for _ in 0..child_count {
        children.push(read_node(r, mesh_count, depth + 1)?);
    }

    Ok(SceneNode {
        name,
        transform: Transform {
            translation,
            rotation,
            scale,
        },
        kind,
        children,
    })
}

fn check_index(what: &'static str, index: u32, count: usize) -> BundleResult<()> {
    if index as usize >= count {
        return Err(BundleError::DanglingIndex { what, index, count });
    }
    Ok(())
}
