//! Packed mesh record format
//!
//! Self-describing: the descriptor table travels with the bytes, so a reader
//! needs nothing but the record to unpack it.
//!
//! # Layout
//! ```text
//! 0x00: vertex_count u32
//! 0x04: index_count u32
//! 0x08: stride u32
//! 0x0C: bone_count u32
//! 0x10: hash u64
//! 0x18: descriptor_count u8
//! 0x19: index_type u8 (0 = u16, 1 = u32)
//! 0x1A: uv_channel_count u8
//! 0x1B: padding (1 byte)
//! 0x1C: descriptors (descriptor_count * 12 bytes)
//! var:  joint ids (bone_count * u32)
//! var:  vertex_data (vertex_count * stride)
//! var:  index_data (index_count * index size)
//! ```
//!
//! Descriptor record (12 bytes):
//! ```text
//! 0x00: semantic u8
//! 0x01: component_count u8
//! 0x02: element_type u8
//! 0x03: normalize u8
//! 0x04: byte_offset u32
//! 0x08: row_stride u32
//! ```

use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::hash::{MeshHash, mesh_hash};
use crate::index::{IndexBuffer, IndexElementType};
use crate::layout::{BufferDescriptor, Semantic, VertexLayout};
use crate::metadata::MeshMetaData;
use crate::packing::ElementType;
use crate::record::PackedMesh;
use crate::vertex::unpack_vertices;

/// Packed mesh record header (28 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct MeshRecordHeader {
    pub vertex_count: u32,
    pub index_count: u32,
    pub stride: u32,
    pub bone_count: u32,
    pub hash: u64,
    pub descriptor_count: u8,
    pub index_type: u8,
    pub uv_channel_count: u8,
    pub _padding: u8,
}

impl MeshRecordHeader {
    pub const SIZE: usize = 28;

    /// Header describing `mesh`
    pub fn for_mesh(mesh: &PackedMesh) -> Self {
        Self {
            vertex_count: mesh.metadata.vertex_count,
            index_count: mesh.index_buffer.index_count() as u32,
            stride: mesh.layout.stride(),
            bone_count: mesh.bones.len() as u32,
            hash: mesh.hash.value(),
            descriptor_count: mesh.layout.descriptors().len() as u8,
            index_type: mesh.index_buffer.element_type().to_u8(),
            uv_channel_count: mesh.uv_channel_count,
            _padding: 0,
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.vertex_count.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.index_count.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.stride.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.bone_count.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.hash.to_le_bytes());
        bytes[24] = self.descriptor_count;
        bytes[25] = self.index_type;
        bytes[26] = self.uv_channel_count;
        // padding byte stays 0
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let u32_at =
            |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let mut hash = [0u8; 8];
        hash.copy_from_slice(&bytes[16..24]);
        Some(Self {
            vertex_count: u32_at(0),
            index_count: u32_at(4),
            stride: u32_at(8),
            bone_count: u32_at(12),
            hash: u64::from_le_bytes(hash),
            descriptor_count: bytes[24],
            index_type: bytes[25],
            uv_channel_count: bytes[26],
            _padding: 0,
        })
    }
}

/// On-disk form of one [`BufferDescriptor`] (12 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorRecord(pub BufferDescriptor);

impl DescriptorRecord {
    pub const SIZE: usize = 12;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let d = &self.0;
        let mut bytes = [0u8; Self::SIZE];
        bytes[0] = d.semantic.to_u8();
        bytes[1] = d.component_count;
        bytes[2] = d.element_type.to_u8();
        bytes[3] = u8::from(d.normalize);
        bytes[4..8].copy_from_slice(&d.byte_offset.to_le_bytes());
        bytes[8..12].copy_from_slice(&d.row_stride.to_le_bytes());
        bytes
    }

    /// Read a descriptor; `None` on short input or unknown tags
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self(BufferDescriptor {
            semantic: Semantic::from_u8(bytes[0])?,
            component_count: bytes[1],
            element_type: ElementType::from_u8(bytes[2])?,
            normalize: bytes[3] != 0,
            byte_offset: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            row_stride: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        }))
    }
}

/// Serialized size of `mesh`
pub fn encoded_len(mesh: &PackedMesh) -> usize {
    MeshRecordHeader::SIZE
        + mesh.layout.descriptors().len() * DescriptorRecord::SIZE
        + mesh.bones.len() * 4
        + mesh.vertex_buffer.len()
        + mesh.index_buffer.bytes().len()
}

/// Serialize a packed mesh record
///
/// Name and material are not part of the record; containers carry them.
pub fn encode_mesh(mesh: &PackedMesh) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(mesh));
    out.extend_from_slice(&MeshRecordHeader::for_mesh(mesh).to_bytes());
    for descriptor in mesh.layout.descriptors() {
        out.extend_from_slice(&DescriptorRecord(*descriptor).to_bytes());
    }
    for joint in &mesh.bones {
        out.extend_from_slice(&joint.to_le_bytes());
    }
    out.extend_from_slice(&mesh.vertex_buffer);
    out.extend_from_slice(mesh.index_buffer.bytes());
    out
}

/// Split `len` bytes off the front of `cursor`
fn take<'a>(cursor: &mut &'a [u8], len: usize, offset: usize) -> Result<&'a [u8]> {
    if cursor.len() < len {
        return Err(CodecError::BufferTooShort {
            expected: offset + len,
            actual: offset + cursor.len(),
        });
    }
    let (head, tail) = cursor.split_at(len);
    *cursor = tail;
    Ok(head)
}

/// Parse one packed mesh record from the front of `bytes`
///
/// Returns the record and the number of bytes consumed. The stored hash is
/// checked against the stored buffers and metadata is rebuilt from the
/// decoded positions.
pub fn decode_mesh(bytes: &[u8], config: &CodecConfig) -> Result<(PackedMesh, usize)> {
    let mut cursor = bytes;
    let consumed = |cursor: &[u8]| bytes.len() - cursor.len();

    let header = MeshRecordHeader::from_bytes(take(&mut cursor, MeshRecordHeader::SIZE, 0)?)
        .ok_or(CodecError::BufferTooShort {
            expected: MeshRecordHeader::SIZE,
            actual: bytes.len(),
        })?;

    let mut descriptors = Vec::with_capacity(header.descriptor_count as usize);
    for i in 0..header.descriptor_count {
        let at = consumed(cursor);
        let raw = take(&mut cursor, DescriptorRecord::SIZE, at)?;
        let record = DescriptorRecord::from_bytes(raw).ok_or_else(|| {
            CodecError::LayoutViolation(format!(
                "descriptor {i} has unknown tags {:#04x}/{:#04x}",
                raw[0], raw[2]
            ))
        })?;
        descriptors.push(record.0);
    }
    let layout = VertexLayout::new(descriptors, header.stride)?;

    let index_type = IndexElementType::from_u8(header.index_type).ok_or_else(|| {
        CodecError::LayoutViolation(format!("unknown index type tag {}", header.index_type))
    })?;

    let at = consumed(cursor);
    let bones = take(&mut cursor, header.bone_count as usize * 4, at)?
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect::<Vec<_>>();

    let vertex_count = header.vertex_count as usize;
    let at = consumed(cursor);
    let vertex_buffer = take(&mut cursor, layout.buffer_len(vertex_count), at)?.to_vec();

    let at = consumed(cursor);
    let index_bytes = take(&mut cursor, header.index_count as usize * index_type.size(), at)?;
    let index_buffer = IndexBuffer::from_bytes(index_type, index_bytes.to_vec())?;

    let hash = mesh_hash(&vertex_buffer, index_buffer.bytes());
    if hash.value() != header.hash {
        return Err(CodecError::HashMismatch {
            expected: header.hash,
            actual: hash.value(),
        });
    }

    let attrs = unpack_vertices(&vertex_buffer, vertex_count, &layout, config)?;
    let metadata = MeshMetaData::build(
        &attrs.positions,
        index_buffer.triangle_count(),
        bones.len(),
    );

    let mesh = PackedMesh {
        name: String::new(),
        hash: MeshHash(header.hash),
        vertex_buffer,
        index_buffer,
        layout,
        metadata,
        uv_channel_count: header.uv_channel_count,
        bones,
        material: None,
    };
    Ok((mesh, consumed(cursor)))
}
