use std::path::Path;

use crate::identity::{node_id, normalize_slashes};

const EXTERNAL_PREFIXES: &[&str] = &[
    "http://",
    "https://",
    "mailto:",
    "tel:",
    "data:",
    "javascript:",
];

fn is_external(candidate: &str) -> bool {
    let lower = candidate.to_lowercase();
    EXTERNAL_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
        || lower.contains("://")
}

fn is_absolute(candidate: &str) -> bool {
    candidate.starts_with('/') || Path::new(candidate).is_absolute()
}

/// Collapse `.` and `..` segments without touching the filesystem.
pub(crate) fn normalize_lexically(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute { format!("/{joined}") } else { joined }
}

/// Directory part of a document path (everything before the last `/`).
pub(crate) fn parent_directory(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

/// Resolve one raw link target found in a document to a node id.
///
/// Returns `None` for external URLs, bare `#` targets, same-document anchors
/// and empty targets.
pub(crate) fn resolve_link_target(raw: &str, parent_dir: &str) -> Option<String> {
    let trimmed = raw.trim();
    // Support [text](<path/to/doc.md>)
    let unwrapped = match trimmed.strip_prefix('<') {
        Some(rest) => &rest[..rest.find('>')?],
        None => trimmed,
    };
    let candidate = normalize_slashes(unwrapped.trim());
    if candidate.is_empty() || is_external(&candidate) {
        return None;
    }
    if candidate.ends_with('#') {
        return None;
    }

    let mut target = candidate.as_str();
    if let Some((left, _fragment)) = target.split_once('#') {
        target = left;
    }
    if let Some((left, _query)) = target.split_once('?') {
        target = left;
    }
    if target.is_empty() {
        return None;
    }

    let joined = if is_absolute(target) {
        target.to_string()
    } else {
        format!("{parent_dir}/{target}")
    };
    let normalized = normalize_lexically(&joined);
    if normalized.is_empty() || normalized == "/" {
        return None;
    }
    Some(node_id(&normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_targets_resolve_against_parent() {
        assert_eq!(
            resolve_link_target("b.md", "/vault/notes").as_deref(),
            Some("/vault/notes/b")
        );
        assert_eq!(
            resolve_link_target("../other/c.md", "/vault/notes").as_deref(),
            Some("/vault/other/c")
        );
        assert_eq!(
            resolve_link_target("./B", "/vault").as_deref(),
            Some("/vault/B")
        );
    }

    #[test]
    fn absolute_targets_are_kept() {
        assert_eq!(
            resolve_link_target("/elsewhere/x.md", "/vault").as_deref(),
            Some("/elsewhere/x")
        );
    }

    #[test]
    fn fragments_and_anchors() {
        assert_eq!(resolve_link_target("b.md#", "/vault"), None);
        assert_eq!(resolve_link_target("#section", "/vault"), None);
        assert_eq!(
            resolve_link_target("b.md#section", "/vault").as_deref(),
            Some("/vault/b")
        );
        assert_eq!(
            resolve_link_target("<b c.md>", "/vault").as_deref(),
            Some("/vault/b c")
        );
    }

    #[test]
    fn external_urls_are_skipped() {
        assert_eq!(resolve_link_target("https://example.com/a.md", "/v"), None);
        assert_eq!(resolve_link_target("mailto:me@example.com", "/v"), None);
        assert_eq!(resolve_link_target("", "/v"), None);
    }

    #[test]
    fn lexical_normalization() {
        assert_eq!(normalize_lexically("/a/./b/../c"), "/a/c");
        assert_eq!(normalize_lexically("/../a"), "/a");
        assert_eq!(normalize_lexically("../a"), "../a");
        assert_eq!(parent_directory("/a/b/c.md"), "/a/b");
    }
}
