// Free-text input hygiene for mutating endpoints.
//
// This is a denylist scrub, not a parser: angle brackets and the common
// script-URL schemes are stripped outright. Image-URL fields go through
// `sanitize_image_url`, which exempts `data:image/` payloads from the
// `data:` rule.

const BLOCKED_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

/// Trim, cap at `max_len` characters, and strip denylisted substrings from
/// free text. Returns an empty string for all-whitespace input.
pub fn sanitize_text(input: &str, max_len: usize) -> String {
    let mut cleaned: String = input
        .trim()
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .take(max_len)
        .collect();

    for scheme in BLOCKED_SCHEMES {
        cleaned = strip_case_insensitive(&cleaned, scheme);
    }

    cleaned.trim().to_string()
}

/// Sanitize a thumbnail URL. Accepts http(s) URLs and inline
/// `data:image/...` payloads; everything else is rejected.
pub fn sanitize_image_url(input: &str, max_len: usize) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.chars().count() > max_len {
        return None;
    }

    let lower = trimmed.to_lowercase();
    if lower.starts_with("data:image/") {
        // Inline payload from the image provider; passed through untouched.
        return Some(trimmed.to_string());
    }
    if (lower.starts_with("https://") || lower.starts_with("http://"))
        && !trimmed.contains('<')
        && !trimmed.contains('>')
    {
        return Some(trimmed.to_string());
    }

    None
}

/// Remove every case-insensitive occurrence of `needle` from `haystack`.
/// Repeats until no occurrence remains, so interleavings like
/// `javascrjavascript:ipt:` cannot survive a single pass.
fn strip_case_insensitive(haystack: &str, needle: &str) -> String {
    let needle_lower = needle.to_lowercase();
    let mut current = haystack.to_string();

    loop {
        let lower = current.to_lowercase();
        match lower.find(&needle_lower) {
            Some(pos) => {
                // Byte offsets line up because to_lowercase preserves ASCII
                // lengths and the needles are pure ASCII.
                let end = pos + needle_lower.len();
                if current.is_char_boundary(pos) && current.is_char_boundary(end) {
                    current.replace_range(pos..end, "");
                } else {
                    return current;
                }
            }
            None => return current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_caps() {
        assert_eq!(sanitize_text("  hello world  ", 5), "hello");
        assert_eq!(sanitize_text("   ", 100), "");
    }

    #[test]
    fn strips_angle_brackets() {
        assert_eq!(
            sanitize_text("<script>alert(1)</script>", 100),
            "scriptalert(1)/script"
        );
    }

    #[test]
    fn strips_script_schemes_case_insensitively() {
        assert_eq!(sanitize_text("JaVaScRiPt:alert(1)", 100), "alert(1)");
        assert_eq!(sanitize_text("vbscript:msgbox", 100), "msgbox");
        assert_eq!(sanitize_text("data:text/html,x", 100), "text/html,x");
    }

    #[test]
    fn strips_reassembled_scheme() {
        // Removing the inner occurrence must not leave a new one behind.
        assert_eq!(sanitize_text("javascrjavascript:ipt:x", 100), "x");
    }

    #[test]
    fn image_url_allows_data_image() {
        let url = "data:image/png;base64,iVBORw0KGgo=";
        assert_eq!(sanitize_image_url(url, 1000), Some(url.to_string()));
    }

    #[test]
    fn image_url_allows_https() {
        let url = "https://cdn.example.com/thumb.png";
        assert_eq!(sanitize_image_url(url, 1000), Some(url.to_string()));
    }

    #[test]
    fn image_url_rejects_other_schemes() {
        assert_eq!(sanitize_image_url("javascript:alert(1)", 1000), None);
        assert_eq!(sanitize_image_url("data:text/html,<h1>", 1000), None);
        assert_eq!(sanitize_image_url("", 1000), None);
    }

    #[test]
    fn image_url_rejects_oversized() {
        let url = format!("https://example.com/{}", "a".repeat(100));
        assert_eq!(sanitize_image_url(&url, 50), None);
    }
}
