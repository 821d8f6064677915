//! Numeric codec for vertex components
//!
//! Encodes and decodes single components and small vectors in the primitive
//! types an interleaved buffer can hold:
//! - f32 (IEEE 754 single)
//! - f16 (IEEE 754 half-float)
//! - u8 / u16 / u32 / i32 (little-endian integers)
//! - packed 10-10-10-2 signed vectors (direction only)
//!
//! Every encoder writes into the front of a destination slice and returns the
//! number of bytes written; every decoder reads from the front of a source slice.

use half::f16;
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// Value substituted for undecodable float components when the caller opts
/// into the sentinel policy
pub const UNSUPPORTED_SENTINEL: f32 = -1.0;

// ============================================================================
// Element Types
// ============================================================================

/// On-disk primitive type of a single vertex component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    F32,
    F16,
    U8,
    U16,
    U32,
    I32,
    /// Three 10-bit two's-complement fields in one little-endian u32
    #[serde(rename = "packed_10_10_10_2")]
    Packed10_10_10_2,
}

impl ElementType {
    /// Size in bytes of one stored element
    ///
    /// For `Packed10_10_10_2` this is the size of the whole packed vector.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::F16 | Self::U16 => 2,
            Self::F32 | Self::U32 | Self::I32 | Self::Packed10_10_10_2 => 4,
        }
    }

    /// True for types that carry floating point components
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F16)
    }

    /// True for plain integer types
    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::I32)
    }

    /// Stable tag used by the binary record format
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::F32 => 0,
            Self::F16 => 1,
            Self::U8 => 2,
            Self::U16 => 3,
            Self::U32 => 4,
            Self::I32 => 5,
            Self::Packed10_10_10_2 => 6,
        }
    }

    /// Inverse of [`ElementType::to_u8`]
    pub const fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::F32),
            1 => Some(Self::F16),
            2 => Some(Self::U8),
            3 => Some(Self::U16),
            4 => Some(Self::U32),
            5 => Some(Self::I32),
            6 => Some(Self::Packed10_10_10_2),
            _ => None,
        }
    }
}

// ============================================================================
// Slice Helpers
// ============================================================================

fn put(dst: &mut [u8], bytes: &[u8]) -> Result<usize> {
    let actual = dst.len();
    let slot = dst
        .get_mut(..bytes.len())
        .ok_or(CodecError::BufferTooShort {
            expected: bytes.len(),
            actual,
        })?;
    slot.copy_from_slice(bytes);
    Ok(bytes.len())
}

fn take<const N: usize>(src: &[u8]) -> Result<[u8; N]> {
    src.get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(CodecError::BufferTooShort {
            expected: N,
            actual: src.len(),
        })
}

fn unsupported(element_type: ElementType, operation: &'static str) -> CodecError {
    CodecError::UnsupportedEncoding {
        element_type,
        operation,
    }
}

// ============================================================================
// Float Components
// ============================================================================

/// Encode one float component as F32 or F16
pub fn encode_float(value: f32, ty: ElementType, dst: &mut [u8]) -> Result<usize> {
    match ty {
        ElementType::F32 => put(dst, &value.to_le_bytes()),
        ElementType::F16 => put(dst, &f16::from_f32(value).to_le_bytes()),
        other => Err(unsupported(other, "encode_float")),
    }
}

/// Decode one float component stored as F32 or F16
pub fn decode_float(src: &[u8], ty: ElementType) -> Result<f32> {
    match ty {
        ElementType::F32 => Ok(f32::from_le_bytes(take::<4>(src)?)),
        ElementType::F16 => Ok(f16::from_le_bytes(take::<2>(src)?).to_f32()),
        other => Err(unsupported(other, "decode_float")),
    }
}

// ============================================================================
// Integer Components
// ============================================================================

/// Encode one unsigned integer component
///
/// Fails with a layout violation when the value does not fit the element width.
pub fn encode_uint(value: u32, ty: ElementType, dst: &mut [u8]) -> Result<usize> {
    let overflow = || CodecError::LayoutViolation(format!("value {value} does not fit in {ty:?}"));
    match ty {
        ElementType::U8 => put(dst, &[u8::try_from(value).map_err(|_| overflow())?]),
        ElementType::U16 => put(dst, &u16::try_from(value).map_err(|_| overflow())?.to_le_bytes()),
        ElementType::U32 => put(dst, &value.to_le_bytes()),
        ElementType::I32 => put(dst, &i32::try_from(value).map_err(|_| overflow())?.to_le_bytes()),
        other => Err(unsupported(other, "encode_uint")),
    }
}

/// Decode one integer component into a u32
///
/// Narrow unsigned types are zero-extended; I32 keeps its bit pattern.
pub fn decode_uint(src: &[u8], ty: ElementType) -> Result<u32> {
    match ty {
        ElementType::U8 => Ok(u32::from(take::<1>(src)?[0])),
        ElementType::U16 => Ok(u32::from(u16::from_le_bytes(take::<2>(src)?))),
        ElementType::U32 => Ok(u32::from_le_bytes(take::<4>(src)?)),
        ElementType::I32 => Ok(i32::from_le_bytes(take::<4>(src)?) as u32),
        other => Err(unsupported(other, "decode_uint")),
    }
}

/// Decode one integer component into an i32
pub fn decode_int(src: &[u8], ty: ElementType) -> Result<i32> {
    match ty {
        ElementType::U8 => Ok(i32::from(take::<1>(src)?[0])),
        ElementType::U16 => Ok(i32::from(u16::from_le_bytes(take::<2>(src)?))),
        ElementType::U32 => Ok(u32::from_le_bytes(take::<4>(src)?) as i32),
        ElementType::I32 => Ok(i32::from_le_bytes(take::<4>(src)?)),
        other => Err(unsupported(other, "decode_int")),
    }
}

// ============================================================================
// Packed 10-10-10-2
// ============================================================================

/// Sign-extend the low 10 bits of `bits` to an i32
#[inline]
pub const fn sign_extend_10(bits: u32) -> i32 {
    ((bits << 22) as i32) >> 22
}

/// Pack a direction into three 10-bit two's-complement fields
///
/// Layout: x in bits 0-9, y in bits 10-19, z in bits 20-29, bits 30-31 zero.
/// The input is normalized first; magnitude is not representable.
pub fn pack_10_10_10_2(v: [f32; 3]) -> u32 {
    let dir = glam::Vec3::from(v).normalize_or_zero();
    let field = |c: f32| ((c.clamp(-1.0, 1.0) * 511.0).round() as i32 as u32) & 0x3FF;
    field(dir.x) | (field(dir.y) << 10) | (field(dir.z) << 20)
}

/// Unpack three 10-bit fields and normalize by the vector's own magnitude
///
/// The result is unit length whatever the stored field magnitudes were.
/// An all-zero payload decodes to the zero vector.
pub fn unpack_10_10_10_2(packed: u32) -> [f32; 3] {
    let v = glam::Vec3::new(
        sign_extend_10(packed & 0x3FF) as f32,
        sign_extend_10((packed >> 10) & 0x3FF) as f32,
        sign_extend_10((packed >> 20) & 0x3FF) as f32,
    );
    let norm = v.length();
    if norm == 0.0 {
        return [0.0; 3];
    }
    (v / norm).to_array()
}

// ============================================================================
// Vectors
// ============================================================================

/// Encode a 3-component vector (three floats, or one packed u32)
pub fn encode_vec3(v: [f32; 3], ty: ElementType, dst: &mut [u8]) -> Result<usize> {
    match ty {
        ElementType::Packed10_10_10_2 => put(dst, &pack_10_10_10_2(v).to_le_bytes()),
        _ => {
            let mut written = 0;
            for c in v {
                written += encode_float(c, ty, &mut dst[written..])?;
            }
            Ok(written)
        }
    }
}

/// Decode a 3-component vector written by [`encode_vec3`]
pub fn decode_vec3(src: &[u8], ty: ElementType) -> Result<[f32; 3]> {
    match ty {
        ElementType::Packed10_10_10_2 => Ok(unpack_10_10_10_2(u32::from_le_bytes(take::<4>(
            src,
        )?))),
        _ => {
            let size = ty.size();
            let mut out = [0.0; 3];
            for (i, c) in out.iter_mut().enumerate() {
                *c = decode_float(src.get(i * size..).unwrap_or_default(), ty)?;
            }
            Ok(out)
        }
    }
}
