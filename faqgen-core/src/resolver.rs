//! Document locator parsing.
//!
//! A locator is a repository file URL of the form
//! `https://host/<owner>/<name>/blob/<revision>/<path...>`. The two segments
//! before the `blob` marker form the collection identifier; everything after
//! the segment following the marker forms the file path.

use crate::error::ResolveError;
use crate::types::DocumentReference;
use url::Url;

/// Segment separating the repository identifier from the file location.
pub const BLOB_MARKER: &str = "blob";

/// Parse a locator into a [`DocumentReference`].
///
/// Pure function: the same input always yields the same result. A failure
/// means the document cannot be processed at all and should not be retried.
pub fn resolve(raw_locator: &str) -> Result<DocumentReference, ResolveError> {
    let trimmed = raw_locator.trim();
    let url = Url::parse(trimmed).map_err(|e| ResolveError::InvalidUrl {
        locator: raw_locator.to_string(),
        message: e.to_string(),
    })?;

    let segments: Vec<String> = url
        .path_segments()
        .map(|segs| {
            segs.filter(|s| !s.is_empty())
                .map(decode_segment)
                .collect()
        })
        .unwrap_or_default();

    let marker = segments
        .iter()
        .position(|s| s == BLOB_MARKER)
        .ok_or_else(|| ResolveError::MissingMarker {
            locator: raw_locator.to_string(),
            marker: BLOB_MARKER.to_string(),
        })?;

    if marker < 2 {
        return Err(missing(raw_locator, "repository owner and name"));
    }
    let revision = segments
        .get(marker + 1)
        .ok_or_else(|| missing(raw_locator, "revision"))?;
    let path = segments[marker + 2..].join("/");
    if path.is_empty() {
        return Err(missing(raw_locator, "file path"));
    }

    let collection_id = format!("{}/{}", segments[0], segments[1]);
    Ok(DocumentReference::new(
        raw_locator,
        collection_id,
        revision.as_str(),
        path,
    ))
}

impl DocumentReference {
    /// Resolve a locator, marking the reference invalid instead of failing.
    pub fn from_locator(raw_locator: &str) -> Self {
        resolve(raw_locator).unwrap_or_else(|_| DocumentReference::unresolved(raw_locator))
    }
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

fn missing(locator: &str, what: &str) -> ResolveError {
    ResolveError::MissingSegments {
        locator: locator.to_string(),
        what: what.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_standard_blob_url() {
        let r = resolve("https://github.com/upstash/docs/blob/main/redis/features/consistency.mdx")
            .unwrap();
        assert_eq!(r.collection_id(), "upstash/docs");
        assert_eq!(r.revision(), "main");
        assert_eq!(r.path(), "redis/features/consistency.mdx");
        assert!(r.is_resolved());
    }

    #[test]
    fn test_resolve_ignores_query_and_fragment() {
        let r = resolve("https://github.com/o/r/blob/dev/README.md?plain=1#usage").unwrap();
        assert_eq!(r.path(), "README.md");
        assert_eq!(r.revision(), "dev");
        assert_eq!(
            r.raw_locator(),
            "https://github.com/o/r/blob/dev/README.md?plain=1#usage"
        );
    }

    #[test]
    fn test_resolve_decodes_segments() {
        let r = resolve("https://github.com/o/r/blob/main/docs/getting%20started.md").unwrap();
        assert_eq!(r.path(), "docs/getting started.md");
    }

    #[test]
    fn test_resolve_first_marker_wins() {
        let r = resolve("https://github.com/o/r/blob/main/blob/notes.md").unwrap();
        assert_eq!(r.revision(), "main");
        assert_eq!(r.path(), "blob/notes.md");
    }

    #[test]
    fn test_resolve_missing_marker() {
        let err = resolve("https://github.com/o/r/tree/main/docs").unwrap_err();
        assert!(matches!(err, ResolveError::MissingMarker { .. }));
    }

    #[test]
    fn test_resolve_invalid_url() {
        let err = resolve("not a url").unwrap_err();
        assert!(matches!(err, ResolveError::InvalidUrl { .. }));
    }

    #[test]
    fn test_resolve_marker_too_early() {
        let err = resolve("https://github.com/o/blob/main/file.md").unwrap_err();
        assert!(matches!(err, ResolveError::MissingSegments { .. }));
    }

    #[test]
    fn test_resolve_missing_path() {
        assert!(resolve("https://github.com/o/r/blob/main").is_err());
        assert!(resolve("https://github.com/o/r/blob/main/").is_err());
        assert!(resolve("https://github.com/o/r/blob").is_err());
    }

    #[test]
    fn test_from_locator_marks_invalid() {
        let r = DocumentReference::from_locator("https://example.com/nothing-here");
        assert!(!r.is_resolved());
        assert_eq!(r.raw_locator(), "https://example.com/nothing-here");
    }

    #[test]
    fn test_resolve_is_pure() {
        let url = "https://github.com/o/r/blob/v1.2/a/b/c.md";
        assert_eq!(resolve(url), resolve(url));
    }
}
