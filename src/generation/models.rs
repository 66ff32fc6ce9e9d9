// src/generation/models.rs
//! Shared types for the generation pipeline.

use serde::{Deserialize, Serialize};

/// Which metadata field a content-generation call should produce. Absent
/// means all of them (the full submit flow).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Titles,
    Descriptions,
    Tags,
}

impl ContentKind {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "titles" => Some(ContentKind::Titles),
            "descriptions" => Some(ContentKind::Descriptions),
            "tags" => Some(ContentKind::Tags),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Titles => "titles",
            ContentKind::Descriptions => "descriptions",
            ContentKind::Tags => "tags",
        }
    }
}

/// Metadata produced by the content provider (or synthesized locally when
/// the provider fails).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedContent {
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub descriptions: Vec<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

impl GeneratedContent {
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty() && self.descriptions.is_empty() && self.tags.is_none()
    }

    pub fn best_title(&self) -> Option<&str> {
        self.titles.first().map(String::as_str)
    }

    pub fn best_description(&self) -> Option<&str> {
        self.descriptions.first().map(String::as_str)
    }
}

/// Locally derived stand-in content for when the provider call fails or is
/// not configured. Deliberately low-fidelity: the user still gets a usable
/// result instead of a failed generation.
pub fn fallback_content(description: &str) -> GeneratedContent {
    let trimmed = description.trim();

    // First 40 characters, cut on a char boundary.
    let title: String = trimmed.chars().take(40).collect::<String>().trim_end().to_string();

    // Distinct lowercase words longer than 3 characters become tags.
    let mut seen = std::collections::HashSet::new();
    let tags: Vec<String> = trimmed
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| w.len() > 3)
        .filter(|w| seen.insert(w.clone()))
        .take(10)
        .collect();

    GeneratedContent {
        titles: if title.is_empty() { vec![] } else { vec![title] },
        descriptions: vec![trimmed.to_string()],
        tags: if tags.is_empty() {
            None
        } else {
            Some(tags.join(", "))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_title_is_first_40_chars() {
        let description = "a chef cooking pasta in a rustic italian kitchen at sunset";
        let content = fallback_content(description);
        let title = content.best_title().unwrap();
        assert!(title.chars().count() <= 40);
        assert!(description.starts_with(title));
    }

    #[test]
    fn fallback_tags_are_words_longer_than_three_chars() {
        let content = fallback_content("a chef cooking pasta in a pan");
        let tags = content.tags.unwrap();
        assert!(tags.contains("chef"));
        assert!(tags.contains("cooking"));
        assert!(tags.contains("pasta"));
        assert!(!tags.contains("pan"));
        assert!(!tags.split(", ").any(|t| t == "a" || t == "in"));
    }

    #[test]
    fn fallback_tags_are_deduplicated() {
        let content = fallback_content("pasta pasta pasta sauce");
        let tags = content.tags.unwrap();
        assert_eq!(tags.matches("pasta").count(), 1);
    }

    #[test]
    fn fallback_handles_short_input() {
        let content = fallback_content("ok");
        assert_eq!(content.best_title(), Some("ok"));
        assert!(content.tags.is_none());
    }

    #[test]
    fn content_kind_parses_known_values() {
        assert_eq!(ContentKind::from_str("titles"), Some(ContentKind::Titles));
        assert_eq!(ContentKind::from_str("tags"), Some(ContentKind::Tags));
        assert_eq!(ContentKind::from_str("bogus"), None);
    }
}
