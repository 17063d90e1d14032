//! Object key layout shared by all backends.
//!
//! A node's content is stored under `{node_id}.data` at the bucket root, with
//! its MD5 attached as the `shock-md5` user metadata entry.

use crate::traits::{StorageError, StorageResult};

/// Suffix appended to node ids, matching the local temp file name.
pub const DATA_SUFFIX: &str = ".data";
/// User metadata key carrying the node's MD5.
pub const MD5_METADATA_KEY: &str = "shock-md5";

/// Object key for a node's content.
pub fn node_object_key(node_id: &str) -> String {
    format!("{}{}", node_id, DATA_SUFFIX)
}

/// Reject keys that are empty, absolute or contain traversal segments.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|s| s == ".." || s == ".") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_key_has_data_suffix() {
        assert_eq!(
            node_object_key("0c6e8a6f-1d2c-4bd5-9c2a-6f2c2f0c1a11"),
            "0c6e8a6f-1d2c-4bd5-9c2a-6f2c2f0c1a11.data"
        );
    }

    #[test]
    fn traversal_is_rejected() {
        assert!(validate_key("n1.data").is_ok());
        assert!(validate_key("../n1.data").is_err());
        assert!(validate_key("/n1.data").is_err());
        assert!(validate_key("").is_err());
    }
}
