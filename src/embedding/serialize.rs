//! Embedding vector serialization.
//!
//! Two representations: JSON arrays for the scalar columns (human-readable,
//! tolerant) and little-endian f32 blobs for the sqlite-vec virtual table
//! (lossless, the format vec0 expects).

/// Serialize a vector to a JSON array string.
pub fn embedding_to_json(embedding: &[f32]) -> String {
    serde_json::to_string(embedding).unwrap_or_else(|_| "[]".to_string())
}

/// Parse a JSON array string back into a vector.
///
/// Malformed input yields an empty vector, never an error.
pub fn json_to_embedding(json: &str) -> Vec<f32> {
    serde_json::from_str(json).unwrap_or_default()
}

/// Pack a vector into a little-endian f32 byte blob.
pub fn vec_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Unpack a little-endian f32 byte blob.
///
/// Trailing bytes that do not form a full f32 are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
