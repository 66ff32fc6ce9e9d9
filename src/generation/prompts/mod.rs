// src/generation/prompts/mod.rs
//! Structured-prompt assembly for thumbnail generation.
//!
//! The beast style is built entirely locally from extracted themes. The
//! other three styles hand their material to a `PromptAnalyzer` (Gemini in
//! production) and fall back to a local template when the analyzer fails.
//! Either way the caller always gets a prompt string back.

pub mod beast;
pub mod overlay;
pub mod themes;

use async_trait::async_trait;
use tracing::warn;

pub use overlay::{OverlayStyle, TextOverlay, NO_TEXT_DIRECTIVE};
pub use themes::{extract_themes, Mood, PriceComparison, ThemeProfile};

/// The four thumbnail presentation styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleId {
    Beast,
    Minimalist,
    Cinematic,
    Clickbait,
}

impl StyleId {
    /// Accepts both the stored identifier ("beast-style") and the bare
    /// name ("beast").
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().trim_end_matches("-style") {
            "beast" => Some(StyleId::Beast),
            "minimalist" => Some(StyleId::Minimalist),
            "cinematic" => Some(StyleId::Cinematic),
            "clickbait" => Some(StyleId::Clickbait),
            _ => None,
        }
    }

    /// Canonical stored identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleId::Beast => "beast-style",
            StyleId::Minimalist => "minimalist-style",
            StyleId::Cinematic => "cinematic-style",
            StyleId::Clickbait => "clickbait-style",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StyleId::Beast => "Beast",
            StyleId::Minimalist => "Minimalist",
            StyleId::Cinematic => "Cinematic",
            StyleId::Clickbait => "Clickbait",
        }
    }

    /// Art-direction brief handed to the analyzer for the delegated styles.
    pub fn art_direction(&self) -> &'static str {
        match self {
            StyleId::Beast => {
                "Maximum energy: exaggerated expressions, saturated colors, oversized props."
            }
            StyleId::Minimalist => {
                "Minimalist: one subject, flat or softly gradiented background, large negative \
                 space, restrained two-tone palette, geometric balance."
            }
            StyleId::Cinematic => {
                "Cinematic: film-still framing, anamorphic depth of field, atmospheric haze, \
                 teal-and-orange or desaturated grade, a single dramatic light source."
            }
            StyleId::Clickbait => {
                "Clickbait: shocked face in the near third, red arrow or circle accent toward \
                 the reveal, impossible juxtaposition, colors tuned for feed contrast."
            }
        }
    }
}

/// Seam to the analyze-prompt flow. Production wires the Gemini service in;
/// tests substitute stubs.
#[async_trait]
pub trait PromptAnalyzer: Send + Sync {
    async fn structured_prompt(
        &self,
        description: &str,
        style: StyleId,
        themes: &ThemeProfile,
        ai_chat_input: Option<&str>,
    ) -> anyhow::Result<String>;
}

/// Build the full structured prompt for a generation attempt.
///
/// Never fails: analyzer errors are logged and replaced with the local
/// fallback template built from whatever theme fields were already
/// computed.
pub async fn generate_thumbnail_prompt(
    description: &str,
    style: StyleId,
    overlay: Option<&TextOverlay>,
    ai_chat_input: Option<&str>,
    analyzer: &dyn PromptAnalyzer,
) -> String {
    let themes = extract_themes(description);

    let body = match style {
        StyleId::Beast => beast::build_beast_prompt(description, &themes),
        _ => match analyzer
            .structured_prompt(description, style, &themes, ai_chat_input)
            .await
        {
            Ok(structured) if !structured.trim().is_empty() => structured,
            Ok(_) => {
                warn!(style = style.as_str(), "Analyzer returned empty prompt, using fallback");
                fallback_style_prompt(description, style, &themes)
            }
            Err(e) => {
                warn!(style = style.as_str(), error = %e, "Prompt analysis failed, using fallback");
                fallback_style_prompt(description, style, &themes)
            }
        },
    };

    format!("{}{}", body, overlay::overlay_directive(overlay))
}

/// Low-fidelity local template for the delegated styles, used when the
/// analyzer is unavailable. Always contains the literal description.
pub fn fallback_style_prompt(description: &str, style: StyleId, themes: &ThemeProfile) -> String {
    format!(
        "A YouTube thumbnail in the {} style for a video about \"{}\". \
Main subject: {}. {} {} 16:9 composition, sharp focus on the subject, \
readable at small sizes.",
        style.display_name(),
        description,
        themes.main_subject,
        themes.mood.lighting_phrase(),
        style.art_direction(),
    )
}
