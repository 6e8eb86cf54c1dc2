// Path sanitization utilities
//
// Every GitHub API path this service constructs goes through one of these
// normalizers first; they are the sole defense against path traversal and
// characters that would corrupt blob paths.
use once_cell::sync::Lazy;
use regex::Regex;

/// Allow-list for a single path segment: letters, digits, dot, space,
/// dash, underscore, 1-128 characters.
static SEGMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9 ._-]{1,128}$").unwrap());

fn is_valid_segment(segment: &str) -> bool {
    segment != "." && segment != ".." && SEGMENT_RE.is_match(segment)
}

/// Strip the asset-root prefix from a slash-trimmed path, if present.
fn strip_asset_root<'a>(path: &'a str, asset_root: &str) -> &'a str {
    if asset_root.is_empty() {
        return path;
    }
    if path == asset_root {
        return "";
    }
    path.strip_prefix(asset_root)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}

/// Normalize a user-supplied folder path into its canonical relative form.
///
/// `None` means the asset root itself and normalizes to the empty string.
/// A leading asset-root prefix is stripped, backslashes are folded into
/// forward slashes before splitting, repeated and surrounding slashes are
/// collapsed, and every segment must pass the allow-list. Returns `None`
/// on any invalid segment.
pub fn normalize_folder(input: Option<&str>, asset_root: &str) -> Option<String> {
    let raw = match input {
        None => return Some(String::new()),
        Some(value) => value.replace('\\', "/"),
    };

    let trimmed = raw.trim().trim_matches('/');
    let relative = strip_asset_root(trimmed, asset_root);
    let relative = relative.trim_matches('/');

    if relative.is_empty() {
        return Some(String::new());
    }

    let mut segments = Vec::new();
    for segment in relative.split('/') {
        if segment.is_empty() {
            continue;
        }
        if !is_valid_segment(segment) {
            return None;
        }
        segments.push(segment);
    }

    if segments.is_empty() {
        return Some(String::new());
    }
    Some(segments.join("/"))
}

/// Normalize a relative asset path (folder segments plus leaf file name).
///
/// Unlike a folder path, a file path cannot be the root: the result must
/// contain at least one segment.
pub fn normalize_asset_path(input: &str, asset_root: &str) -> Option<String> {
    match normalize_folder(Some(input), asset_root) {
        Some(path) if !path.is_empty() => Some(path),
        _ => None,
    }
}

/// Sanitize a single asset file name: non-empty, not `.` or `..`, no path
/// separators of either flavor.
pub fn sanitize_asset_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.contains('/') || trimmed.contains('\\') {
        return None;
    }
    if !is_valid_segment(trimmed) {
        return None;
    }
    Some(trimmed.to_string())
}
