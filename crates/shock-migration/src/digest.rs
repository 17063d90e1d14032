//! MD5 digests of downloaded node content.

use std::path::Path;

use md5::{Digest, Md5};
use shock_core::{ShockError, ShockResult};
use tokio::io::AsyncReadExt;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Lowercase hex MD5 of a file, read in fixed-size blocks.
pub async fn md5_file(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Check a file against the MD5 the service recorded for it.
pub async fn verify_md5(path: &Path, expected: &str) -> ShockResult<String> {
    let actual = md5_file(path).await?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(actual)
    } else {
        Err(ShockError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}
