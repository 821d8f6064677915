//! Buffer layout planner
//!
//! Decides the interleaved row layout for a mesh from the semantics it
//! carries. The plan is the single source of truth for both the pack and the
//! unpack direction.
//!
//! Row order is fixed:
//! Position → Normal → Tangent → UV (4 wide) → BlendIndices → BlendWeights

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};
use crate::packing::ElementType;

/// Number of components reserved for the UV slot (two 2-component channels)
pub const UV_SLOT_COMPONENTS: u8 = 4;

/// Maximum number of UV channels carried by the UV slot
pub const MAX_UV_CHANNELS: usize = 2;

/// Meaning of a vertex attribute slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Semantic {
    Position,
    Uv,
    Normal,
    Tangent,
    BlendIndices,
    BlendWeights,
}

impl Semantic {
    /// Stable tag used by the binary record format
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Position => 0,
            Self::Uv => 1,
            Self::Normal => 2,
            Self::Tangent => 3,
            Self::BlendIndices => 4,
            Self::BlendWeights => 5,
        }
    }

    /// Inverse of [`Semantic::to_u8`]
    pub const fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Position),
            1 => Some(Self::Uv),
            2 => Some(Self::Normal),
            3 => Some(Self::Tangent),
            4 => Some(Self::BlendIndices),
            5 => Some(Self::BlendWeights),
            _ => None,
        }
    }
}

/// One attribute slot inside an interleaved row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub semantic: Semantic,
    pub component_count: u8,
    pub element_type: ElementType,
    pub byte_offset: u32,
    pub row_stride: u32,
    pub normalize: bool,
}

impl BufferDescriptor {
    /// Bytes this slot occupies in each row
    ///
    /// A packed 10-10-10-2 vector stores its three components in 4 bytes.
    pub const fn byte_len(&self) -> u32 {
        match self.element_type {
            ElementType::Packed10_10_10_2 => 4,
            ty => self.component_count as u32 * ty.size() as u32,
        }
    }

    /// First byte past this slot within the row
    ///
    /// Only meaningful once [`BufferDescriptor::checked_end`] succeeded, which
    /// [`VertexLayout::validate`] guarantees.
    pub const fn byte_end(&self) -> u32 {
        self.byte_offset.saturating_add(self.byte_len())
    }

    /// First byte past this slot, `None` when it overflows `u32`
    pub const fn checked_end(&self) -> Option<u32> {
        self.byte_offset.checked_add(self.byte_len())
    }
}

/// Element type chosen for each semantic at plan time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutEncodings {
    pub position: ElementType,
    pub normal: ElementType,
    pub tangent: ElementType,
    pub uv: ElementType,
    pub blend_weights: ElementType,
}

impl Default for LayoutEncodings {
    fn default() -> Self {
        Self {
            position: ElementType::F32,
            normal: ElementType::F32,
            tangent: ElementType::F32,
            uv: ElementType::F32,
            blend_weights: ElementType::F32,
        }
    }
}

/// Shape of the skin slots: influences per row and blend index width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinFormat {
    pub capacity: u8,
    pub index_type: ElementType,
}

/// Optional semantics present on a source mesh
///
/// Position and Normal are always laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeSet {
    pub tangents: bool,
    pub uv_channels: usize,
    pub skin: Option<SkinFormat>,
}

/// Ordered descriptor table plus the shared row stride
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    descriptors: Vec<BufferDescriptor>,
    stride: u32,
}

impl VertexLayout {
    /// Wrap an externally supplied descriptor table, validating it first
    pub fn new(descriptors: Vec<BufferDescriptor>, stride: u32) -> Result<Self> {
        let layout = Self {
            descriptors,
            stride,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Plan the row layout for a mesh carrying `attrs`
    pub fn plan(attrs: &AttributeSet, encodings: &LayoutEncodings) -> Result<Self> {
        use ElementType::*;

        require(encodings.position, &[F32, F16])?;
        require(encodings.normal, &[F32, F16, Packed10_10_10_2])?;
        require(encodings.tangent, &[F32, F16, Packed10_10_10_2])?;
        require(encodings.uv, &[F32, F16])?;
        require(encodings.blend_weights, &[F32, F16])?;

        let mut slots = vec![
            (Semantic::Position, 3, encodings.position),
            (Semantic::Normal, 3, encodings.normal),
        ];
        if attrs.tangents {
            slots.push((Semantic::Tangent, 3, encodings.tangent));
        }
        if attrs.uv_channels > 0 {
            slots.push((Semantic::Uv, UV_SLOT_COMPONENTS, encodings.uv));
        }
        if let Some(skin) = attrs.skin {
            require(skin.index_type, &[U8, U16])?;
            if skin.capacity == 0 || skin.capacity % 4 != 0 {
                return Err(CodecError::LayoutViolation(format!(
                    "skin capacity {} is not a positive multiple of 4",
                    skin.capacity
                )));
            }
            slots.push((Semantic::BlendIndices, skin.capacity, skin.index_type));
            slots.push((Semantic::BlendWeights, skin.capacity, encodings.blend_weights));
        }

        // Pass 1: offsets, pass 2: shared stride
        let mut offset = 0u32;
        let mut descriptors: Vec<BufferDescriptor> = slots
            .into_iter()
            .map(|(semantic, component_count, element_type)| {
                let descriptor = BufferDescriptor {
                    semantic,
                    component_count,
                    element_type,
                    byte_offset: offset,
                    row_stride: 0,
                    normalize: element_type == Packed10_10_10_2,
                };
                offset = descriptor.byte_end();
                descriptor
            })
            .collect();
        for descriptor in &mut descriptors {
            descriptor.row_stride = offset;
        }

        tracing::debug!(
            stride = offset,
            slots = descriptors.len(),
            "planned vertex layout"
        );

        Self::new(descriptors, offset)
    }

    pub fn descriptors(&self) -> &[BufferDescriptor] {
        &self.descriptors
    }

    /// Bytes per interleaved row
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Descriptor for `semantic`, if laid out
    pub fn find(&self, semantic: Semantic) -> Option<&BufferDescriptor> {
        self.descriptors.iter().find(|d| d.semantic == semantic)
    }

    pub fn has(&self, semantic: Semantic) -> bool {
        self.find(semantic).is_some()
    }

    /// Skin slot shape, if the layout is skinned
    pub fn skin_format(&self) -> Option<SkinFormat> {
        let indices = self.find(Semantic::BlendIndices)?;
        Some(SkinFormat {
            capacity: indices.component_count,
            index_type: indices.element_type,
        })
    }

    /// Total vertex buffer length for `vertex_count` rows
    pub fn buffer_len(&self, vertex_count: usize) -> usize {
        self.stride as usize * vertex_count
    }

    /// Check the descriptor table invariants
    ///
    /// - a Position slot exists
    /// - every descriptor shares the layout stride
    /// - every slot fits inside the row and no two slots overlap
    /// - each semantic appears at most once
    pub fn validate(&self) -> Result<()> {
        let violation = |msg: String| Err(CodecError::LayoutViolation(msg));

        if !self.has(Semantic::Position) {
            return violation("no position descriptor".to_string());
        }

        for (i, d) in self.descriptors.iter().enumerate() {
            if d.row_stride != self.stride {
                return violation(format!(
                    "{:?} row stride {} differs from layout stride {}",
                    d.semantic, d.row_stride, self.stride
                ));
            }
            if d.component_count == 0 {
                return violation(format!("{:?} has zero components", d.semantic));
            }
            if d.element_type == ElementType::Packed10_10_10_2 && d.component_count != 3 {
                return violation(format!(
                    "{:?} packs {} components into 10-10-10-2",
                    d.semantic, d.component_count
                ));
            }
            match d.checked_end() {
                Some(end) if end <= self.stride => {}
                _ => {
                    return violation(format!(
                        "{:?} at byte {} with {} bytes runs past stride {}",
                        d.semantic,
                        d.byte_offset,
                        d.byte_len(),
                        self.stride
                    ));
                }
            }
            if self.descriptors[..i].iter().any(|o| o.semantic == d.semantic) {
                return violation(format!("{:?} laid out twice", d.semantic));
            }
        }

        let mut ranges: Vec<(u32, u32, Semantic)> = self
            .descriptors
            .iter()
            .map(|d| (d.byte_offset, d.byte_end(), d.semantic))
            .collect();
        ranges.sort_by_key(|r| r.0);
        for pair in ranges.windows(2) {
            if pair[0].1 > pair[1].0 {
                return violation(format!(
                    "{:?} overlaps {:?} at byte {}",
                    pair[0].2, pair[1].2, pair[1].0
                ));
            }
        }

        Ok(())
    }
}

fn require(ty: ElementType, allowed: &[ElementType]) -> Result<()> {
    if allowed.contains(&ty) {
        Ok(())
    } else {
        Err(CodecError::UnsupportedEncoding {
            element_type: ty,
            operation: "plan_layout",
        })
    }
}
