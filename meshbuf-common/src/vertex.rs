//! Vertex packer / unpacker
//!
//! Writes per-semantic arrays into one interleaved buffer and reads them back,
//! driven entirely by a [`VertexLayout`]. The packer never decides layout and
//! never cares whether vertices are shared or duplicated per corner.

use crate::config::{CodecConfig, UnsupportedPolicy};
use crate::error::{CodecError, Result};
use crate::layout::{
    AttributeSet, BufferDescriptor, MAX_UV_CHANNELS, Semantic, SkinFormat, VertexLayout,
};
use crate::packing::{
    ElementType, UNSUPPORTED_SENTINEL, decode_float, decode_uint, decode_vec3, encode_float,
    encode_uint, encode_vec3,
};
use crate::skin::PackedSkin;

/// Per-semantic vertex streams, one entry per vertex
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexAttributes {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tangents: Option<Vec<[f32; 3]>>,
    /// Texture coordinate channels; only the first two are packed
    pub uv_channels: Vec<Vec<[f32; 2]>>,
    pub skin: Option<PackedSkin>,
}

impl VertexAttributes {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Semantics the layout planner needs to reserve
    pub fn attribute_set(&self) -> AttributeSet {
        AttributeSet {
            tangents: self.tangents.is_some(),
            uv_channels: self.uv_channels.len().min(MAX_UV_CHANNELS),
            skin: self.skin.as_ref().map(PackedSkin::format),
        }
    }

    /// Check every stream has exactly one entry per vertex
    pub fn validate(&self) -> Result<()> {
        let expected = self.vertex_count();
        let check = |semantic: Semantic, actual: usize| {
            if actual == expected {
                Ok(())
            } else {
                Err(CodecError::AttributeCountMismatch {
                    semantic,
                    expected,
                    actual,
                })
            }
        };

        if let Some(normals) = &self.normals {
            check(Semantic::Normal, normals.len())?;
        }
        if let Some(tangents) = &self.tangents {
            check(Semantic::Tangent, tangents.len())?;
        }
        for channel in &self.uv_channels {
            check(Semantic::Uv, channel.len())?;
        }
        if let Some(skin) = &self.skin {
            check(Semantic::BlendIndices, skin.vertex_count())?;
        }
        Ok(())
    }

    /// Streams reordered by `remap` (new vertex -> old vertex)
    pub fn remap(&self, remap: &[u32]) -> Self {
        fn pick<T: Copy>(src: &[T], remap: &[u32]) -> Vec<T> {
            remap.iter().map(|&old| src[old as usize]).collect()
        }

        Self {
            positions: pick(&self.positions, remap),
            normals: self.normals.as_deref().map(|n| pick(n, remap)),
            tangents: self.tangents.as_deref().map(|t| pick(t, remap)),
            uv_channels: self.uv_channels.iter().map(|c| pick(c, remap)).collect(),
            skin: self.skin.as_ref().map(|s| s.remap(remap)),
        }
    }
}

// ============================================================================
// Pack
// ============================================================================

/// Pack `attrs` into an interleaved buffer of `stride * vertex_count` bytes
///
/// Slots the attributes do not fill (missing normals, the second UV channel,
/// skin padding) are left zeroed.
pub fn pack_vertices(
    attrs: &VertexAttributes,
    layout: &VertexLayout,
    config: &CodecConfig,
) -> Result<Vec<u8>> {
    attrs.validate()?;
    layout.validate()?;
    check_skin_slots(attrs, layout)?;

    let stride = layout.stride() as usize;
    let mut bytes = vec![0u8; layout.buffer_len(attrs.vertex_count())];
    if bytes.is_empty() {
        return Ok(bytes);
    }

    let write = |(vertex, row): (usize, &mut [u8])| write_row(row, vertex, attrs, layout, config);

    #[cfg(feature = "parallel")]
    {
        if config.parallel_rows {
            use rayon::prelude::*;
            bytes.par_chunks_mut(stride).enumerate().try_for_each(write)?;
            return Ok(bytes);
        }
    }

    bytes.chunks_mut(stride).enumerate().try_for_each(write)?;
    Ok(bytes)
}

fn check_skin_slots(attrs: &VertexAttributes, layout: &VertexLayout) -> Result<()> {
    let Some(skin) = &attrs.skin else {
        return Ok(());
    };
    let (Some(indices), Some(weights)) = (
        layout.find(Semantic::BlendIndices),
        layout.find(Semantic::BlendWeights),
    ) else {
        return Err(CodecError::LayoutViolation(
            "skinned vertices need blend index and weight slots".to_string(),
        ));
    };
    for slot in [indices, weights] {
        if slot.component_count as usize != skin.capacity() {
            return Err(CodecError::LayoutViolation(format!(
                "{:?} slot holds {} influences, skin rows hold {}",
                slot.semantic,
                slot.component_count,
                skin.capacity()
            )));
        }
    }
    Ok(())
}

fn write_row(
    row: &mut [u8],
    vertex: usize,
    attrs: &VertexAttributes,
    layout: &VertexLayout,
    config: &CodecConfig,
) -> Result<()> {
    for d in layout.descriptors() {
        let field = &mut row[d.byte_offset as usize..d.byte_end() as usize];
        let ty = d.element_type;

        match d.semantic {
            Semantic::Position => {
                encode_vec3(attrs.positions[vertex], ty, field)?;
            }
            Semantic::Normal => {
                if let Some(normals) = &attrs.normals {
                    encode_vec3(normals[vertex], ty, field)?;
                }
            }
            Semantic::Tangent => {
                if let Some(tangents) = &attrs.tangents {
                    encode_vec3(tangents[vertex], ty, field)?;
                }
            }
            Semantic::Uv => {
                let mut components = [0.0f32; 4];
                for (channel, pair) in attrs
                    .uv_channels
                    .iter()
                    .take(MAX_UV_CHANNELS)
                    .zip(components.chunks_mut(2))
                {
                    let [u, v] = channel[vertex];
                    pair[0] = u;
                    pair[1] = if config.flip_v { 1.0 - v } else { v };
                }
                let count = (d.component_count as usize).min(components.len());
                write_floats(&components[..count], ty, field)?;
            }
            Semantic::BlendIndices => {
                if let Some(skin) = &attrs.skin {
                    let size = ty.size();
                    for (i, &bone) in skin.row(vertex).0.iter().enumerate() {
                        encode_uint(bone, ty, field.get_mut(i * size..).unwrap_or_default())?;
                    }
                }
            }
            Semantic::BlendWeights => {
                if let Some(skin) = &attrs.skin {
                    write_floats(skin.row(vertex).1, ty, field)?;
                }
            }
        }
    }
    Ok(())
}

fn write_floats(values: &[f32], ty: ElementType, field: &mut [u8]) -> Result<()> {
    let size = ty.size();
    for (i, &value) in values.iter().enumerate() {
        encode_float(value, ty, field.get_mut(i * size..).unwrap_or_default())?;
    }
    Ok(())
}

// ============================================================================
// Unpack
// ============================================================================

/// Per-descriptor decode state
struct SlotReader<'a> {
    bytes: &'a [u8],
    descriptor: &'a BufferDescriptor,
    stride: usize,
    policy: UnsupportedPolicy,
    warned: bool,
}

impl<'a> SlotReader<'a> {
    fn field(&self, vertex: usize) -> &'a [u8] {
        let start = vertex * self.stride + self.descriptor.byte_offset as usize;
        &self.bytes[start..start + self.descriptor.byte_len() as usize]
    }

    /// Apply the unsupported-encoding policy to a decode result
    fn recover<T>(&mut self, result: Result<T>, sentinel: T) -> Result<T> {
        match result {
            Err(CodecError::UnsupportedEncoding {
                element_type,
                operation,
            }) if self.policy == UnsupportedPolicy::Sentinel => {
                if !self.warned {
                    tracing::warn!(
                        semantic = ?self.descriptor.semantic,
                        ?element_type,
                        operation,
                        sentinel = UNSUPPORTED_SENTINEL,
                        "unsupported encoding, substituting sentinel"
                    );
                    self.warned = true;
                }
                Ok(sentinel)
            }
            other => other,
        }
    }

    fn vec3(&mut self, vertex: usize) -> Result<[f32; 3]> {
        let decoded = decode_vec3(self.field(vertex), self.descriptor.element_type);
        self.recover(decoded, [UNSUPPORTED_SENTINEL; 3])
    }

    /// Decode `out.len()` float components
    ///
    /// The element type is shared by every component, so one sentinel fills
    /// the rest of the slot.
    fn floats(&mut self, vertex: usize, out: &mut [f32]) -> Result<()> {
        let field = self.field(vertex);
        let ty = self.descriptor.element_type;
        let size = ty.size();
        for i in 0..out.len() {
            match decode_float(field.get(i * size..).unwrap_or_default(), ty) {
                Ok(value) => out[i] = value,
                Err(err) => {
                    let sentinel = self.recover(Err(err), UNSUPPORTED_SENTINEL)?;
                    out[i..].fill(sentinel);
                    break;
                }
            }
        }
        Ok(())
    }

    fn uints(&self, vertex: usize, out: &mut [u32]) -> Result<()> {
        let field = self.field(vertex);
        let ty = self.descriptor.element_type;
        let size = ty.size();
        for (i, value) in out.iter_mut().enumerate() {
            *value = decode_uint(field.get(i * size..).unwrap_or_default(), ty)?;
        }
        Ok(())
    }
}

/// Decode `vertex_count` rows of `bytes` back into per-semantic streams
///
/// A 4-wide UV slot always yields two channels; callers that know how many
/// channels were authored trim the rest.
pub fn unpack_vertices(
    bytes: &[u8],
    vertex_count: usize,
    layout: &VertexLayout,
    config: &CodecConfig,
) -> Result<VertexAttributes> {
    layout.validate()?;
    let expected = layout.buffer_len(vertex_count);
    if bytes.len() < expected {
        return Err(CodecError::BufferTooShort {
            expected,
            actual: bytes.len(),
        });
    }

    let mut attrs = VertexAttributes::default();
    let mut blend_indices = None;
    let mut blend_weights = None;

    for descriptor in layout.descriptors() {
        let mut reader = SlotReader {
            bytes,
            descriptor,
            stride: layout.stride() as usize,
            policy: config.on_unsupported,
            warned: false,
        };
        let count = descriptor.component_count as usize;

        match descriptor.semantic {
            Semantic::Position => {
                attrs.positions = (0..vertex_count)
                    .map(|v| reader.vec3(v))
                    .collect::<Result<_>>()?;
            }
            Semantic::Normal => {
                attrs.normals = Some(
                    (0..vertex_count)
                        .map(|v| reader.vec3(v))
                        .collect::<Result<_>>()?,
                );
            }
            Semantic::Tangent => {
                attrs.tangents = Some(
                    (0..vertex_count)
                        .map(|v| reader.vec3(v))
                        .collect::<Result<_>>()?,
                );
            }
            Semantic::Uv => {
                let channels = (count / 2).clamp(1, MAX_UV_CHANNELS);
                let mut uvs = vec![Vec::with_capacity(vertex_count); channels];
                let mut components = [0.0f32; 4];
                for v in 0..vertex_count {
                    let n = count.min(components.len());
                    reader.floats(v, &mut components[..n])?;
                    for (channel, uv) in uvs.iter_mut().enumerate() {
                        let u = components[channel * 2];
                        let raw = components[channel * 2 + 1];
                        uv.push([u, if config.flip_v { 1.0 - raw } else { raw }]);
                    }
                }
                attrs.uv_channels = uvs;
            }
            Semantic::BlendIndices => {
                let mut indices = vec![0u32; vertex_count * count];
                if count > 0 {
                    for (v, row) in indices.chunks_mut(count).enumerate() {
                        reader.uints(v, row)?;
                    }
                }
                blend_indices = Some((descriptor.element_type, count, indices));
            }
            Semantic::BlendWeights => {
                let mut weights = vec![0.0f32; vertex_count * count];
                if count > 0 {
                    for (v, row) in weights.chunks_mut(count).enumerate() {
                        reader.floats(v, row)?;
                    }
                }
                blend_weights = Some(weights);
            }
        }
    }

    attrs.skin = match (blend_indices, blend_weights) {
        (Some((index_type, capacity, indices)), Some(weights)) => Some(PackedSkin::from_rows(
            SkinFormat {
                capacity: capacity as u8,
                index_type,
            },
            indices,
            weights,
        )?),
        (None, None) => None,
        _ => {
            return Err(CodecError::LayoutViolation(
                "blend indices and weights must be laid out together".to_string(),
            ));
        }
    };

    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutEncodings;
    use crate::skin::VertexWeight;

    fn quad() -> VertexAttributes {
        VertexAttributes {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            normals: Some(vec![[0.0, 0.0, 1.0]; 4]),
            tangents: None,
            uv_channels: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.25]]],
            skin: None,
        }
    }

    fn skinned_strip() -> VertexAttributes {
        let bones = [
            vec![VertexWeight::new(0, 1.0), VertexWeight::new(1, 0.5)],
            vec![VertexWeight::new(1, 0.5), VertexWeight::new(2, 1.0)],
        ];
        let skin = PackedSkin::from_bones(bones.iter().map(Vec::as_slice), 2, 3).unwrap();
        VertexAttributes {
            positions: vec![[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 2.0, 0.0]],
            normals: Some(vec![[1.0, 0.0, 0.0]; 3]),
            tangents: Some(vec![[0.0, 0.0, 1.0]; 3]),
            uv_channels: vec![
                vec![[0.0, 0.0], [0.0, 0.5], [0.0, 1.0]],
                vec![[0.5, 0.5], [0.25, 0.75], [1.0, 1.0]],
            ],
            skin: Some(skin),
        }
    }

    fn plan(attrs: &VertexAttributes, encodings: &LayoutEncodings) -> VertexLayout {
        VertexLayout::plan(&attrs.attribute_set(), encodings).unwrap()
    }

    #[test]
    fn test_f32_roundtrip_exact() {
        let config = CodecConfig::default();
        let attrs = skinned_strip();
        let layout = plan(&attrs, &config.encodings);

        let bytes = pack_vertices(&attrs, &layout, &config).unwrap();
        assert_eq!(bytes.len(), layout.stride() as usize * attrs.vertex_count());

        let decoded = unpack_vertices(&bytes, attrs.vertex_count(), &layout, &config).unwrap();
        assert_eq!(decoded, attrs);
    }

    #[test]
    fn test_compact_roundtrip_within_precision() {
        let config = CodecConfig {
            encodings: LayoutEncodings {
                position: ElementType::F16,
                normal: ElementType::Packed10_10_10_2,
                tangent: ElementType::Packed10_10_10_2,
                uv: ElementType::F16,
                blend_weights: ElementType::F16,
            },
            ..CodecConfig::default()
        };
        let mut attrs = skinned_strip();
        // Non-unit normals keep only their direction
        attrs.normals = Some(vec![[3.0, 0.0, 0.0], [0.0, -2.0, 0.0], [0.0, 0.0, 0.5]]);
        let layout = plan(&attrs, &config.encodings);

        let bytes = pack_vertices(&attrs, &layout, &config).unwrap();
        let decoded = unpack_vertices(&bytes, 3, &layout, &config).unwrap();

        for (a, b) in attrs.positions.iter().zip(&decoded.positions) {
            for axis in 0..3 {
                assert!((a[axis] - b[axis]).abs() < 1e-3);
            }
        }
        assert_eq!(
            decoded.normals.unwrap(),
            vec![[1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]]
        );
        assert_eq!(decoded.uv_channels, attrs.uv_channels);
        assert_eq!(decoded.skin, attrs.skin);
    }

    #[test]
    fn test_missing_second_channel_zero_filled() {
        let config = CodecConfig::default();
        let attrs = quad();
        let layout = plan(&attrs, &config.encodings);
        let bytes = pack_vertices(&attrs, &layout, &config).unwrap();

        let decoded = unpack_vertices(&bytes, 4, &layout, &config).unwrap();
        assert_eq!(decoded.uv_channels.len(), 2);
        assert_eq!(decoded.uv_channels[0], attrs.uv_channels[0]);
        assert_eq!(decoded.uv_channels[1], vec![[0.0, 0.0]; 4]);
    }

    #[test]
    fn test_missing_normals_get_zero_slot() {
        let config = CodecConfig::default();
        let mut attrs = quad();
        attrs.normals = None;
        let layout = plan(&attrs, &config.encodings);
        assert!(layout.has(Semantic::Normal));

        let bytes = pack_vertices(&attrs, &layout, &config).unwrap();
        let decoded = unpack_vertices(&bytes, 4, &layout, &config).unwrap();
        assert_eq!(decoded.normals, Some(vec![[0.0; 3]; 4]));
    }

    #[test]
    fn test_default_does_not_flip_v() {
        let config = CodecConfig::default();
        let attrs = quad();
        let layout = plan(&attrs, &config.encodings);
        let bytes = pack_vertices(&attrs, &layout, &config).unwrap();

        // Vertex 3 has v = 0.25, stored as-is
        let uv = layout.find(Semantic::Uv).unwrap();
        let at = 3 * layout.stride() as usize + uv.byte_offset as usize + 4;
        assert_eq!(f32::from_le_bytes(bytes[at..at + 4].try_into().unwrap()), 0.25);
    }

    #[test]
    fn test_flip_v_is_symmetric() {
        let config = CodecConfig {
            flip_v: true,
            ..CodecConfig::default()
        };
        let attrs = quad();
        let layout = plan(&attrs, &config.encodings);
        let bytes = pack_vertices(&attrs, &layout, &config).unwrap();

        let uv = layout.find(Semantic::Uv).unwrap();
        let at = 3 * layout.stride() as usize + uv.byte_offset as usize + 4;
        assert_eq!(f32::from_le_bytes(bytes[at..at + 4].try_into().unwrap()), 0.75);

        let decoded = unpack_vertices(&bytes, 4, &layout, &config).unwrap();
        assert_eq!(decoded.uv_channels[0], attrs.uv_channels[0]);
    }

    fn byte_normal_layout() -> VertexLayout {
        let stride = 15;
        VertexLayout::new(
            vec![
                BufferDescriptor {
                    semantic: Semantic::Position,
                    component_count: 3,
                    element_type: ElementType::F32,
                    byte_offset: 0,
                    row_stride: stride,
                    normalize: false,
                },
                BufferDescriptor {
                    semantic: Semantic::Normal,
                    component_count: 3,
                    element_type: ElementType::U8,
                    byte_offset: 12,
                    row_stride: stride,
                    normalize: false,
                },
            ],
            stride,
        )
        .unwrap()
    }

    #[test]
    fn test_unsupported_decode_errors_by_default() {
        let layout = byte_normal_layout();
        let bytes = vec![0u8; 30];
        let err = unpack_vertices(&bytes, 2, &layout, &CodecConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnsupportedEncoding {
                element_type: ElementType::U8,
                ..
            }
        ));
    }

    #[test]
    fn test_unsupported_decode_sentinel_policy() {
        let layout = byte_normal_layout();
        let bytes = vec![0u8; 30];
        let config = CodecConfig {
            on_unsupported: UnsupportedPolicy::Sentinel,
            ..CodecConfig::default()
        };
        let decoded = unpack_vertices(&bytes, 2, &layout, &config).unwrap();
        assert_eq!(decoded.positions, vec![[0.0; 3]; 2]);
        assert_eq!(decoded.normals, Some(vec![[-1.0; 3]; 2]));
    }

    fn packed_uv_layout() -> VertexLayout {
        let stride = 16;
        VertexLayout::new(
            vec![
                BufferDescriptor {
                    semantic: Semantic::Position,
                    component_count: 3,
                    element_type: ElementType::F32,
                    byte_offset: 0,
                    row_stride: stride,
                    normalize: false,
                },
                BufferDescriptor {
                    semantic: Semantic::Uv,
                    component_count: 3,
                    element_type: ElementType::Packed10_10_10_2,
                    byte_offset: 12,
                    row_stride: stride,
                    normalize: true,
                },
            ],
            stride,
        )
        .unwrap()
    }

    #[test]
    fn test_packed_uv_slot_sentinel_stays_in_slot() {
        let layout = packed_uv_layout();
        let bytes = vec![0u8; 32];
        let config = CodecConfig {
            on_unsupported: UnsupportedPolicy::Sentinel,
            ..CodecConfig::default()
        };
        let decoded = unpack_vertices(&bytes, 2, &layout, &config).unwrap();
        assert_eq!(decoded.uv_channels, vec![vec![[-1.0, -1.0]; 2]]);

        let err = unpack_vertices(&bytes, 2, &layout, &CodecConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnsupportedEncoding {
                element_type: ElementType::Packed10_10_10_2,
                ..
            }
        ));
    }

    #[test]
    fn test_zero_vertices() {
        let config = CodecConfig::default();
        let attrs = VertexAttributes::default();
        let layout = plan(&attrs, &config.encodings);
        let bytes = pack_vertices(&attrs, &layout, &config).unwrap();
        assert!(bytes.is_empty());

        let decoded = unpack_vertices(&bytes, 0, &layout, &config).unwrap();
        assert!(decoded.positions.is_empty());
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let config = CodecConfig::default();
        let mut attrs = quad();
        attrs.uv_channels[0].pop();
        let layout = VertexLayout::plan(
            &AttributeSet {
                uv_channels: 1,
                ..AttributeSet::default()
            },
            &config.encodings,
        )
        .unwrap();
        let err = pack_vertices(&attrs, &layout, &config).unwrap_err();
        assert_eq!(
            err,
            CodecError::AttributeCountMismatch {
                semantic: Semantic::Uv,
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_skin_capacity_must_match_layout() {
        let config = CodecConfig::default();
        let attrs = skinned_strip();
        let layout = VertexLayout::plan(
            &AttributeSet {
                tangents: true,
                uv_channels: 2,
                skin: Some(SkinFormat {
                    capacity: 8,
                    index_type: ElementType::U8,
                }),
            },
            &config.encodings,
        )
        .unwrap();
        assert!(matches!(
            pack_vertices(&attrs, &layout, &config),
            Err(CodecError::LayoutViolation(_))
        ));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let config = CodecConfig::default();
        let attrs = quad();
        let layout = plan(&attrs, &config.encodings);
        let bytes = pack_vertices(&attrs, &layout, &config).unwrap();
        let err = unpack_vertices(&bytes[..bytes.len() - 1], 4, &layout, &config).unwrap_err();
        assert!(matches!(err, CodecError::BufferTooShort { .. }));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_rows_match_serial() {
        let serial = CodecConfig::default();
        let parallel = CodecConfig {
            parallel_rows: true,
            ..CodecConfig::default()
        };
        let attrs = skinned_strip();
        let layout = plan(&attrs, &serial.encodings);
        assert_eq!(
            pack_vertices(&attrs, &layout, &serial).unwrap(),
            pack_vertices(&attrs, &layout, &parallel).unwrap()
        );
    }

    #[test]
    fn test_remap_duplicates_vertices() {
        let attrs = skinned_strip();
        let remapped = attrs.remap(&[2, 0, 0]);
        assert_eq!(remapped.vertex_count(), 3);
        assert_eq!(remapped.positions[0], [0.0, 2.0, 0.0]);
        assert_eq!(remapped.positions[1], remapped.positions[2]);
        assert_eq!(remapped.uv_channels[1][0], [1.0, 1.0]);
        assert!(remapped.validate().is_ok());
    }
}
