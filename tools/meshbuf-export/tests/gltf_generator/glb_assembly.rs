//! Scene file assembly: binary GLB, or `.gltf` JSON with an external buffer.

use gltf_json as json;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;
const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// Chunk payload padded to 4-byte alignment with `fill`
fn padded(data: &[u8], fill: u8) -> Vec<u8> {
    let mut chunk = data.to_vec();
    chunk.resize(data.len().next_multiple_of(4), fill);
    chunk
}

/// Copy of `root` whose single buffer has the given length and location
fn with_buffer(root: &json::Root, byte_length: usize, uri: Option<&str>) -> json::Root {
    let mut root = root.clone();
    root.buffers[0].byte_length = byte_length.into();
    root.buffers[0].uri = uri.map(str::to_string);
    root
}

/// Assemble a GLB: header, space-padded JSON chunk, zero-padded BIN chunk
pub(crate) fn assemble_glb(root: &json::Root, buffer_data: &[u8]) -> Vec<u8> {
    let root = with_buffer(root, buffer_data.len(), None);
    let json_bytes = json::serialize::to_string(&root)
        .expect("Failed to serialize JSON")
        .into_bytes();
    let chunks = [
        (CHUNK_JSON, padded(&json_bytes, b' ')),
        (CHUNK_BIN, padded(buffer_data, 0)),
    ];
    let total_length = HEADER_LEN
        + chunks
            .iter()
            .map(|(_, data)| CHUNK_HEADER_LEN + data.len())
            .sum::<usize>();

    let mut glb = Vec::with_capacity(total_length);
    glb.extend_from_slice(GLB_MAGIC);
    glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());
    for (kind, data) in &chunks {
        glb.extend_from_slice(&(data.len() as u32).to_le_bytes());
        glb.extend_from_slice(&kind.to_le_bytes());
        glb.extend_from_slice(data);
    }
    glb
}

/// `.gltf` JSON text whose buffer is the sibling file `bin_uri`
pub(crate) fn assemble_gltf(root: &json::Root, buffer_len: usize, bin_uri: &str) -> String {
    let root = with_buffer(root, buffer_len, Some(bin_uri));
    json::serialize::to_string(&root).expect("Failed to serialize JSON")
}
