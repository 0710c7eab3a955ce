use sha2::{Digest, Sha256};

/// Lower-case hex SHA-256, used for both host change detection and the
/// generated-file lock.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
