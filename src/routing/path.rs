//! Request path canonicalization.

use percent_encoding::percent_decode_str;

/// Canonicalize a raw request URL into an absolute path.
///
/// Query and fragment are dropped, segments are percent-decoded, and `.`/`..`
/// are collapsed against `/` so the result never climbs above the root.
/// Anything that cannot be decoded sensibly becomes `/`.
pub fn normalize(raw: &str) -> String {
    let raw = raw.split(['?', '#']).next().unwrap_or("");
    // Absolute-form request targets carry scheme and authority.
    let raw = match raw.find("://") {
        Some(i) if !raw.starts_with('/') => {
            let rest = &raw[i + 3..];
            rest.find('/').map(|j| &rest[j..]).unwrap_or("/")
        }
        _ => raw,
    };

    let mut segments: Vec<String> = Vec::new();
    for encoded in raw.split('/') {
        let decoded = match percent_decode_str(encoded).decode_utf8() {
            Ok(s) => s,
            Err(_) => return "/".to_string(),
        };
        if decoded.contains('\0') {
            return "/".to_string();
        }
        // Encoded separators are treated as real ones.
        for segment in decoded.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s.to_string()),
            }
        }
    }

    let mut out = String::with_capacity(raw.len() + 1);
    for s in &segments {
        out.push('/');
        out.push_str(s);
    }
    // Keep the trailing slash so listings can build relative links.
    if out.is_empty() || (raw.ends_with('/') && !segments.is_empty()) {
        out.push('/');
    }
    out
}
