//! Binary serialization trait for fixed-size records.
//!
//! Each record type also keeps a type-specific `to_bytes()` returning a
//! fixed-size array; the trait returns `Vec<u8>` so generic code can handle
//! any record.

/// Fixed-size record that round-trips through bytes
pub trait BinarySerializable: Sized {
    /// Size of the serialized record in bytes.
    const SIZE: usize;

    /// Serialize to bytes.
    fn serialize(&self) -> Vec<u8>;

    /// Deserialize from bytes.
    ///
    /// Returns `None` if the slice is too short or holds an unknown tag.
    fn deserialize(bytes: &[u8]) -> Option<Self>;
}

impl BinarySerializable for super::MeshRecordHeader {
    const SIZE: usize = Self::SIZE;

    fn serialize(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        Self::from_bytes(bytes)
    }
}

impl BinarySerializable for super::DescriptorRecord {
    const SIZE: usize = Self::SIZE;

    fn serialize(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        Self::from_bytes(bytes)
    }
}
