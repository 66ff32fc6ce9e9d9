// src/generation/prompts/overlay.rs
//! Text-overlay post-processing appended to every style's prompt body.

use serde::Deserialize;

/// Canned overlay typography styles the studio offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayStyle {
    BoldWhite,
    BoldYellow,
    Minimalist,
    Pixel,
    Calligraphy,
    Cute,
}

impl OverlayStyle {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "bold-white" => Some(OverlayStyle::BoldWhite),
            "bold-yellow" => Some(OverlayStyle::BoldYellow),
            "minimalist" => Some(OverlayStyle::Minimalist),
            "pixel" => Some(OverlayStyle::Pixel),
            "calligraphy" => Some(OverlayStyle::Calligraphy),
            "cute" => Some(OverlayStyle::Cute),
            _ => None,
        }
    }

    fn styling_phrase(&self) -> &'static str {
        match self {
            OverlayStyle::BoldWhite => {
                "massive bold white sans-serif capitals with a heavy black outline and hard drop shadow"
            }
            OverlayStyle::BoldYellow => {
                "massive bold yellow sans-serif capitals with a black outline, slightly tilted for energy"
            }
            OverlayStyle::Minimalist => {
                "thin, elegant white lettering with generous spacing, no outline, placed over negative space"
            }
            OverlayStyle::Pixel => {
                "chunky retro pixel-art lettering in bright arcade colors with a scanline sheen"
            }
            OverlayStyle::Calligraphy => {
                "flowing hand-drawn calligraphy with ink-brush texture in ivory white"
            }
            OverlayStyle::Cute => {
                "rounded bubbly lettering in pastel pink and white with a soft outline and tiny sparkle accents"
            }
        }
    }
}

/// Overlay text plus its typography style. Both must be present for the
/// overlay block to be emitted.
#[derive(Debug, Clone)]
pub struct TextOverlay {
    pub text: String,
    pub style: OverlayStyle,
}

/// Appended when no overlay is requested. The image model needs the
/// instruction repeated firmly or it invents captions on its own.
pub const NO_TEXT_DIRECTIVE: &str = "\n\nTEXT: Render no text at all. No words, no letters, \
no numbers, no captions, no watermarks, no logos anywhere in the image. \
The thumbnail must be purely visual.";

/// Produce the overlay directive for a prompt: either explicit styling
/// instructions containing the overlay text, or the fixed no-text block.
/// Exactly one of the two, never both.
pub fn overlay_directive(overlay: Option<&TextOverlay>) -> String {
    match overlay {
        Some(overlay) if !overlay.text.trim().is_empty() => format!(
            "\n\nTEXT OVERLAY: Render the exact text \"{}\" as {}. Keep the text inside \
the safe area, never covering the main subject's face, readable at mobile size.",
            overlay.text.trim(),
            overlay.style.styling_phrase()
        ),
        _ => NO_TEXT_DIRECTIVE.to_string(),
    }
}
