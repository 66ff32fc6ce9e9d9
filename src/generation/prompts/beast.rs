// src/generation/prompts/beast.rs
//! Beast-style prompt builder. Fully local: theme material is substituted
//! into a fixed multi-section template, no provider round trip.

use super::themes::ThemeProfile;

/// Build the beast-style prompt. Always contains the literal description.
pub fn build_beast_prompt(description: &str, themes: &ThemeProfile) -> String {
    let subject_line = match &themes.action {
        Some(action) => format!(
            "A larger-than-life {} caught mid-{}, exaggerated wide-eyed expression, mouth open in disbelief",
            themes.main_subject, action
        ),
        None => format!(
            "A larger-than-life {} with an exaggerated wide-eyed expression, mouth open in disbelief",
            themes.main_subject
        ),
    };

    let setting_line = match &themes.setting {
        Some(setting) => format!("set in a {} pushed to absurd scale", setting),
        None => "set against a high-energy radial burst background".to_string(),
    };

    let descriptor_line = if themes.descriptors.is_empty() {
        "oversized props, exaggerated proportions".to_string()
    } else {
        format!("emphasize: {}", themes.descriptors.join(", "))
    };

    let objects_line = if themes.objects.is_empty() {
        String::new()
    } else {
        format!("Surrounding elements: {}. ", themes.objects.join(", "))
    };

    let comparison_block = match &themes.price_comparison {
        Some(cmp) if !cmp.prices.is_empty() => format!(
            "SPLIT-FRAME COMPARISON: divide the frame with a jagged diagonal, one side per price point ({}), visual quality contrast cranked to the extreme.\n",
            cmp.prices.join(" vs ")
        ),
        Some(_) => "SPLIT-FRAME COMPARISON: divide the frame with a jagged diagonal, cheap side vs premium side, contrast cranked to the extreme.\n".to_string(),
        None => String::new(),
    };

    format!(
        "COMPOSITION: Extreme close-up hero shot, subject filling 60% of the frame, \
rule-of-thirds focal point, aggressive depth with a blurred background.\n\
SUBJECTS: {subject_line}, {setting_line}.\n\
VISUAL TREATMENT: {lighting}, hyper-saturated color grading, thick colored rim light \
around the subject, {descriptor_line}.\n\
{comparison_block}\
STORYTELLING: The image must scream the stakes of \"{description}\" at a glance - \
one unmissable focal moment, no subtlety.\n\
TECHNICAL: Photorealistic render, crisp edges, 16:9 aspect, composed to survive \
shrinking to a 168px-wide mobile thumbnail.\n\
{objects_line}KEY ELEMENTS: bold shapes, maximum contrast against the feed, an arrow or \
burst accent only where it reinforces the focal point.",
        subject_line = subject_line,
        setting_line = setting_line,
        lighting = themes.mood.lighting_phrase(),
        descriptor_line = descriptor_line,
        comparison_block = comparison_block,
        description = description,
        objects_line = objects_line,
    )
}

#[cfg(test)]
mod tests {
    use super::super::themes::extract_themes;
    use super::*;

    #[test]
    fn prompt_contains_the_literal_description() {
        let description = "a chef cooking pasta";
        let themes = extract_themes(description);
        let prompt = build_beast_prompt(description, &themes);
        assert!(prompt.contains(description));
    }

    #[test]
    fn prompt_has_all_sections() {
        let themes = extract_themes("a chef cooking pasta in a kitchen");
        let prompt = build_beast_prompt("a chef cooking pasta in a kitchen", &themes);
        for section in [
            "COMPOSITION:",
            "SUBJECTS:",
            "VISUAL TREATMENT:",
            "STORYTELLING:",
            "TECHNICAL:",
            "KEY ELEMENTS:",
        ] {
            assert!(prompt.contains(section), "missing section {}", section);
        }
    }

    #[test]
    fn price_comparison_adds_split_frame_block() {
        let description = "$1 pizza vs $1000 pizza";
        let themes = extract_themes(description);
        let prompt = build_beast_prompt(description, &themes);
        assert!(prompt.contains("SPLIT-FRAME COMPARISON"));
        assert!(prompt.contains("$1 vs $1000"));
    }

    #[test]
    fn no_split_frame_without_comparison() {
        let themes = extract_themes("a quiet morning routine");
        let prompt = build_beast_prompt("a quiet morning routine", &themes);
        assert!(!prompt.contains("SPLIT-FRAME COMPARISON"));
    }
}
