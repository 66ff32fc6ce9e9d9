// Helper functions for safe logging

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 {
            format!("{}***@{}", &parts[0][..1.min(parts[0].len())], parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Shortens inline image payloads before they hit a log line. Generated
/// thumbnails travel as base64 data URLs that run to hundreds of kilobytes;
/// logging them verbatim would drown everything else.
pub fn truncate_data_url(value: &str) -> String {
    const KEEP: usize = 48;
    if value.starts_with("data:") && value.len() > KEEP {
        format!("{}... ({} bytes)", &value[..KEEP], value.len())
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_email_local_part() {
        assert_eq!(safe_email_log("creator@example.com"), "c***@example.com");
    }

    #[test]
    fn masks_malformed_email_entirely() {
        assert_eq!(safe_email_log("oops"), "***@***.***");
    }

    #[test]
    fn truncates_long_data_urls() {
        let url = format!("data:image/png;base64,{}", "A".repeat(5000));
        let short = truncate_data_url(&url);
        assert!(short.len() < 100);
        assert!(short.contains("bytes"));
    }

    #[test]
    fn leaves_plain_urls_alone() {
        let url = "https://cdn.example.com/thumb.png";
        assert_eq!(truncate_data_url(url), url);
    }
}
