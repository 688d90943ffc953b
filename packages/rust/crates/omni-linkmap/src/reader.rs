//! Size-limited text reads with binary detection.
//!
//! Sync variant for the rayon scan, async variant for the session actor.

use std::io::Read;
use std::path::Path;

use memchr::memchr;
use tokio::io::AsyncReadExt;

use crate::error::{LinkMapError, Result};

/// Default read limit for one note (4 MiB).
pub const DEFAULT_MAX_NOTE_BYTES: u64 = 4 * 1024 * 1024;

/// Quick binary detection: NULL byte within the first 8KB.
#[must_use]
pub fn is_binary(buffer: &[u8]) -> bool {
    let check_len = std::cmp::min(buffer.len(), 8192);
    memchr(0, &buffer[..check_len]).is_some()
}

fn decode_note(path: &Path, buffer: Vec<u8>) -> Result<String> {
    if is_binary(&buffer) {
        return Err(LinkMapError::BinaryFile(path.display().to_string()));
    }
    match String::from_utf8(buffer) {
        Ok(text) => Ok(text),
        Err(e) => Ok(String::from_utf8_lossy(&e.into_bytes()).into_owned()),
    }
}

fn capacity_hint(len: u64) -> usize {
    usize::try_from(len).unwrap_or(0)
}

/// Read one note as text (blocking).
///
/// # Errors
/// `NotFound` when metadata is unavailable, `TooLarge` above `max_bytes`,
/// `BinaryFile` for NULL-byte content, `System` for read failures.
pub fn read_note_text(path: &Path, max_bytes: u64) -> Result<String> {
    let metadata =
        std::fs::metadata(path).map_err(|_| LinkMapError::NotFound(path.display().to_string()))?;
    if metadata.len() > max_bytes {
        return Err(LinkMapError::TooLarge(metadata.len(), max_bytes));
    }
    let mut file = std::fs::File::open(path)?;
    let mut buffer = Vec::with_capacity(capacity_hint(metadata.len()));
    file.read_to_end(&mut buffer)?;
    decode_note(path, buffer)
}

/// Read one note as text (async).
///
/// # Errors
/// Same as [`read_note_text`].
pub async fn read_note_text_async(path: &Path, max_bytes: u64) -> Result<String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| LinkMapError::NotFound(path.display().to_string()))?;
    if metadata.len() > max_bytes {
        return Err(LinkMapError::TooLarge(metadata.len(), max_bytes));
    }
    let mut file = tokio::fs::File::open(path).await?;
    let mut buffer = Vec::with_capacity(capacity_hint(metadata.len()));
    file.read_to_end(&mut buffer).await?;
    decode_note(path, buffer)
}
