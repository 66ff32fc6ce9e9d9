// src/projects/validators.rs

use super::handlers::SaveProjectRequest;
use crate::common::sanitize::sanitize_text;
use crate::common::{ValidationResult, Validator};
use crate::generation::prompts::StyleId;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 5_000;
pub const MAX_TAGS_LEN: usize = 500;

// ============================================================================
// Save Project Validator
// ============================================================================

pub struct SaveProjectValidator;

impl Validator<SaveProjectRequest> for SaveProjectValidator {
    fn validate(&self, data: &SaveProjectRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        match &data.image_url {
            None => result.add_error("imageUrl", "Image URL is required"),
            Some(url) if url.trim().is_empty() => {
                result.add_error("imageUrl", "Image URL is required")
            }
            Some(_) => {}
        }

        if StyleId::from_str(&data.selected_style_id).is_none() {
            result.add_error("selectedStyleId", "Unknown style identifier");
        }

        if let Some(title) = &data.generated_title {
            if title.len() > MAX_TITLE_LEN {
                result.add_error("generatedTitle", "Title is too long");
            }
        }

        if let Some(description) = &data.generated_description {
            if description.len() > MAX_DESCRIPTION_LEN {
                result.add_error("generatedDescription", "Description is too long");
            }
        }

        if let Some(tags) = &data.generated_tags {
            if tags.len() > MAX_TAGS_LEN {
                result.add_error("generatedTags", "Tags are too long");
            }
        }

        result
    }
}

// ============================================================================
// Content field hygiene
// ============================================================================

/// Scrub the optional generated-content fields. Blank values come back as
/// None so the COALESCE-based partial update leaves them alone.
pub fn sanitize_content_fields(
    title: Option<&str>,
    description: Option<&str>,
    tags: Option<&str>,
) -> (Option<String>, Option<String>, Option<String>) {
    let clean = |value: Option<&str>, cap: usize| {
        value
            .map(|v| sanitize_text(v, cap))
            .filter(|v| !v.is_empty())
    };

    (
        clean(title, MAX_TITLE_LEN),
        clean(description, MAX_DESCRIPTION_LEN),
        clean(tags, MAX_TAGS_LEN),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> SaveProjectRequest {
        SaveProjectRequest {
            image_url: Some("data:image/png;base64,AAAA".to_string()),
            selected_style_id: "beast-style".to_string(),
            generated_title: Some("A Title".to_string()),
            generated_description: None,
            generated_tags: None,
        }
    }

    #[test]
    fn accepts_a_valid_request() {
        let result = SaveProjectValidator.validate(&valid_request());
        assert!(result.is_valid);
    }

    #[test]
    fn rejects_missing_image_url() {
        let mut req = valid_request();
        req.image_url = None;
        let result = SaveProjectValidator.validate(&req);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.field == "imageUrl"));
    }

    #[test]
    fn rejects_unknown_style() {
        let mut req = valid_request();
        req.selected_style_id = "vaporwave-style".to_string();
        let result = SaveProjectValidator.validate(&req);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.field == "selectedStyleId"));
    }

    #[test]
    fn rejects_oversized_title() {
        let mut req = valid_request();
        req.generated_title = Some("t".repeat(MAX_TITLE_LEN + 1));
        let result = SaveProjectValidator.validate(&req);
        assert!(!result.is_valid);
    }

    #[test]
    fn blank_fields_become_none() {
        let (title, description, tags) = sanitize_content_fields(Some("  "), None, Some(""));
        assert!(title.is_none());
        assert!(description.is_none());
        assert!(tags.is_none());
    }

    #[test]
    fn fields_are_scrubbed_and_capped() {
        let long_title = "t".repeat(500);
        let (title, _, tags) = sanitize_content_fields(
            Some(&long_title),
            None,
            Some("cooking, <b>pasta</b>, chef"),
        );
        assert_eq!(title.unwrap().len(), MAX_TITLE_LEN);
        assert_eq!(tags.unwrap(), "cooking, bpasta/b, chef");
    }
}
