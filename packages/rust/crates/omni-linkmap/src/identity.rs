//! Node identity derived from document paths.
//!
//! The id is the path with one extension suffix removed. It is the only key
//! used to compare documents once a path has been seen.

use std::path::Path;

/// Replace Windows separators so ids compare equal across platforms.
pub(crate) fn normalize_slashes(raw: &str) -> String {
    raw.replace('\\', "/")
}

/// Derive the node id for a path string.
///
/// Strips the final `.ext` segment of the last path component. A path whose
/// last component has no dot is returned unchanged.
///
/// ```rust
/// use omni_linkmap::node_id;
///
/// assert_eq!(node_id("/vault/notes/alpha.md"), "/vault/notes/alpha");
/// assert_eq!(node_id("/vault/notes/alpha"), "/vault/notes/alpha");
/// ```
#[must_use]
pub fn node_id(path: &str) -> String {
    let normalized = normalize_slashes(path);
    let name_start = normalized.rfind('/').map_or(0, |idx| idx + 1);
    match normalized[name_start..].rfind('.') {
        Some(dot) => normalized[..name_start + dot].to_string(),
        None => normalized,
    }
}

/// [`node_id`] for a filesystem path.
#[must_use]
pub fn node_id_for(path: &Path) -> String {
    node_id(&path.to_string_lossy())
}

/// Extension of the last path component (text after its final dot).
pub(crate) fn extension_of(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_string())
}
