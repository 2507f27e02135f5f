//! Path/URL extraction (C3, spec §4.3).
//!
//! Grounded on `mount.rs::extract_mount_path` in the teacher crate, but
//! simplified to the spec's exact rule: strip one leading `/`, then
//! truncate at the next `/`. Unlike the teacher (which strips a `/trackN`
//! suffix to resolve a mount), a path here only ever names the publish
//! point — tracks are distinguished by SETUP order, not URL shape.

/// Derive the canonical path from a request URL.
///
/// Takes the URL's path component (stripping a `scheme://host[:port]`
/// prefix if present), drops one leading `/`, and truncates at the next
/// `/`. Returns `None` for an empty path (malformed request, per spec
/// §4.3: "Reject empty paths as malformed").
///
/// ```
/// use rtsp::path::extract_path;
///
/// assert_eq!(extract_path("rtsp://host:8554/cam"), Some("cam"));
/// assert_eq!(extract_path("rtsp://host:8554/cam/track1"), Some("cam"));
/// assert_eq!(extract_path("/cam?key=abc"), Some("cam"));
/// assert_eq!(extract_path("rtsp://host:8554/"), None);
/// assert_eq!(extract_path("rtsp://host:8554"), None);
/// ```
pub fn extract_path(url: &str) -> Option<&str> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);

    let path = if let Some(after_scheme) = without_query
        .strip_prefix("rtsp://")
        .or_else(|| without_query.strip_prefix("rtsps://"))
    {
        match after_scheme.find('/') {
            Some(slash) => &after_scheme[slash..],
            None => return None,
        }
    } else {
        without_query
    };

    let stripped = path.strip_prefix('/').unwrap_or(path);
    let truncated = match stripped.find('/') {
        Some(slash) => &stripped[..slash],
        None => stripped,
    };

    if truncated.is_empty() {
        None
    } else {
        Some(truncated)
    }
}

/// Extract the value of a named query parameter from a request URL, e.g.
/// the `key` parameter ANNOUNCE uses for publish authentication (spec §4.3,
/// §4.5).
///
/// ```
/// use rtsp::path::extract_query_param;
///
/// assert_eq!(
///     extract_query_param("rtsp://host/cam?key=secret", "key"),
///     Some("secret")
/// );
/// assert_eq!(extract_query_param("rtsp://host/cam", "key"), None);
/// ```
pub fn extract_query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == name { Some(value) } else { None }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_path_full_uri() {
        assert_eq!(extract_path("rtsp://localhost:8554/cam"), Some("cam"));
    }

    #[test]
    fn extract_path_with_track_suffix() {
        assert_eq!(
            extract_path("rtsp://localhost:8554/cam/track1"),
            Some("cam")
        );
    }

    #[test]
    fn extract_path_root_is_malformed() {
        assert_eq!(extract_path("rtsp://localhost:8554/"), None);
        assert_eq!(extract_path("rtsp://localhost:8554"), None);
    }

    #[test]
    fn extract_path_bare_path() {
        assert_eq!(extract_path("/camera1"), Some("camera1"));
    }

    #[test]
    fn extract_path_strips_query() {
        assert_eq!(extract_path("rtsp://host/cam?key=wrong"), Some("cam"));
    }

    #[test]
    fn extract_path_no_leading_slash() {
        assert_eq!(extract_path("camera1"), Some("camera1"));
    }

    #[test]
    fn query_param_present() {
        assert_eq!(
            extract_query_param("rtsp://host/cam?key=secret&x=1", "key"),
            Some("secret")
        );
    }

    #[test]
    fn query_param_absent() {
        assert_eq!(extract_query_param("rtsp://host/cam", "key"), None);
        assert_eq!(extract_query_param("rtsp://host/cam?x=1", "key"), None);
    }
}
