// src/generation/prompts/themes.rs
//! Heuristic theme extraction over a video description.
//!
//! Lexicon lookups and a price regex, nothing more. There is no correctness
//! criterion here beyond producing plausible template material for the
//! prompt builders; words the lexicons do not know simply fall through.

use regex::Regex;
use std::sync::OnceLock;

/// Overall emotional read of the description, from a small sentiment
/// lexicon. Drives color/lighting language in the templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Exciting,
    Dramatic,
    Joyful,
    Tense,
    Neutral,
}

impl Mood {
    pub fn display_name(&self) -> &'static str {
        match self {
            Mood::Exciting => "exciting",
            Mood::Dramatic => "dramatic",
            Mood::Joyful => "joyful",
            Mood::Tense => "tense",
            Mood::Neutral => "neutral",
        }
    }

    pub fn lighting_phrase(&self) -> &'static str {
        match self {
            Mood::Exciting => "high-contrast lighting with saturated, vibrant colors",
            Mood::Dramatic => "moody low-key lighting with deep shadows",
            Mood::Joyful => "warm, bright lighting with a golden glow",
            Mood::Tense => "hard directional lighting with a cold color cast",
            Mood::Neutral => "balanced studio lighting",
        }
    }
}

/// Price-comparison signal ("$1 vs $1000" style videos) detected in the
/// description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceComparison {
    pub prices: Vec<String>,
}

/// Fixed-shape record the style templates substitute from.
#[derive(Debug, Clone)]
pub struct ThemeProfile {
    /// Best-guess main subject; falls back to the first meaningful word.
    pub main_subject: String,
    pub action: Option<String>,
    pub descriptors: Vec<String>,
    pub setting: Option<String>,
    pub objects: Vec<String>,
    pub mood: Mood,
    pub price_comparison: Option<PriceComparison>,
}

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "of", "in", "on", "at", "to", "for", "with", "from",
    "by", "about", "as", "into", "is", "are", "was", "were", "be", "been", "being", "this",
    "that", "these", "those", "my", "your", "his", "her", "its", "our", "their", "i", "you",
    "he", "she", "it", "we", "they", "how", "what", "when", "where", "why", "who", "will",
    "would", "can", "could", "should", "do", "does", "did", "have", "has", "had", "not", "no",
    "so", "very", "just", "then", "than", "too", "also", "while", "during",
];

const SUBJECT_WORDS: &[&str] = &[
    "chef", "gamer", "streamer", "creator", "developer", "programmer", "artist", "musician",
    "athlete", "doctor", "teacher", "scientist", "engineer", "builder", "driver", "pilot",
    "chief", "kid", "man", "woman", "girl", "boy", "team", "family", "dog", "cat", "robot",
    "car", "house", "phone", "laptop", "camera", "drone", "pasta", "pizza", "burger", "cake",
    "game", "challenge", "experiment", "reaction", "review", "tutorial", "unboxing", "prank",
];

const ACTION_WORDS: &[&str] = &[
    "cooking", "baking", "eating", "building", "making", "creating", "racing", "driving",
    "flying", "exploring", "testing", "reviewing", "unboxing", "surviving", "escaping",
    "hunting", "fighting", "winning", "losing", "breaking", "fixing", "coding", "painting",
    "drawing", "singing", "dancing", "playing", "streaming", "reacting", "trying",
    "comparing", "destroying", "transforming", "renovating", "training", "climbing",
    "swimming", "running", "jumping", "hiding", "searching", "finding", "buying", "selling",
    "spending", "giving",
];

const DESCRIPTOR_WORDS: &[&str] = &[
    "giant", "tiny", "huge", "massive", "miniature", "epic", "insane", "crazy", "wild",
    "extreme", "ultimate", "secret", "hidden", "mysterious", "luxury", "cheap", "expensive",
    "fast", "slow", "new", "old", "ancient", "modern", "futuristic", "rustic", "homemade",
    "professional", "amateur", "rare", "impossible", "dangerous", "safe", "beautiful",
    "terrifying", "delicious", "spicy", "frozen", "golden", "colorful",
];

const PLACE_WORDS: &[&str] = &[
    "kitchen", "restaurant", "house", "home", "garage", "studio", "office", "school",
    "island", "beach", "ocean", "desert", "forest", "jungle", "mountain", "city", "town",
    "village", "farm", "warehouse", "basement", "rooftop", "stadium", "arena", "hotel",
    "mansion", "castle", "cave", "bunker", "lab", "laboratory", "store", "mall", "park",
    "space", "underwater",
];

const POSITIVE_WORDS: &[&str] = &[
    "amazing", "awesome", "incredible", "beautiful", "delicious", "fun", "happy", "love",
    "best", "great", "perfect", "winning", "luxury", "golden", "epic", "celebration",
    "party", "gift", "surprise", "joy",
];

const NEGATIVE_WORDS: &[&str] = &[
    "scary", "terrifying", "dangerous", "horror", "worst", "fail", "failing", "broken",
    "destroyed", "abandoned", "haunted", "dark", "survival", "surviving", "escaping",
    "trapped", "lost", "emergency", "disaster", "impossible",
];

const HIGH_ENERGY_WORDS: &[&str] = &[
    "insane", "crazy", "extreme", "ultimate", "challenge", "vs", "race", "racing", "battle",
    "competition", "record", "fastest", "biggest", "wild", "epic",
];

fn price_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // "$1", "$1,000", "$10.50", "100 dollars"
        Regex::new(r"(?i)\$\s?\d[\d,]*(?:\.\d+)?|\b\d[\d,]*\s?(?:dollars|bucks)\b")
            .expect("price regex is valid")
    })
}

/// Extract a theme profile from a free-text description.
pub fn extract_themes(description: &str) -> ThemeProfile {
    let words: Vec<String> = description
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric() && c != '$')
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();

    let mut main_subject: Option<String> = None;
    let mut action: Option<String> = None;
    let mut descriptors = Vec::new();
    let mut setting: Option<String> = None;
    let mut objects = Vec::new();

    for word in &words {
        let w = word.as_str();
        if main_subject.is_none() && SUBJECT_WORDS.contains(&w) {
            main_subject = Some(word.clone());
        } else if SUBJECT_WORDS.contains(&w) && !objects.contains(word) {
            objects.push(word.clone());
        }
        if action.is_none() && ACTION_WORDS.contains(&w) {
            action = Some(word.clone());
        }
        if DESCRIPTOR_WORDS.contains(&w) && !descriptors.contains(word) {
            descriptors.push(word.clone());
        }
        if setting.is_none() && PLACE_WORDS.contains(&w) {
            setting = Some(word.clone());
        }
    }

    // No lexicon hit: take the first non-stopword as the subject so the
    // templates always have something to name.
    let main_subject = main_subject.unwrap_or_else(|| {
        words
            .iter()
            .find(|w| !STOPWORDS.contains(&w.as_str()) && w.len() > 2)
            .cloned()
            .unwrap_or_else(|| "the scene".to_string())
    });

    ThemeProfile {
        main_subject,
        action,
        descriptors,
        setting,
        objects,
        mood: classify_mood(&words),
        price_comparison: detect_price_comparison(description),
    }
}

fn classify_mood(words: &[String]) -> Mood {
    let mut positive = 0i32;
    let mut negative = 0i32;
    let mut energy = 0i32;

    for word in words {
        let w = word.as_str();
        if POSITIVE_WORDS.contains(&w) {
            positive += 1;
        }
        if NEGATIVE_WORDS.contains(&w) {
            negative += 1;
        }
        if HIGH_ENERGY_WORDS.contains(&w) {
            energy += 1;
        }
    }

    if energy > 0 && negative == 0 {
        Mood::Exciting
    } else if negative > positive && energy > 0 {
        Mood::Tense
    } else if negative > positive {
        Mood::Dramatic
    } else if positive > 0 {
        Mood::Joyful
    } else {
        Mood::Neutral
    }
}

/// Two or more price tokens, or one price next to a "vs", reads as a
/// price-comparison video.
fn detect_price_comparison(description: &str) -> Option<PriceComparison> {
    let prices: Vec<String> = price_regex()
        .find_iter(description)
        .map(|m| m.as_str().trim().to_string())
        .collect();

    let has_versus = description.to_lowercase().split_whitespace().any(|w| {
        let w = w.trim_matches(|c: char| !c.is_alphanumeric());
        w == "vs" || w == "versus"
    });

    if prices.len() >= 2 || (has_versus && !prices.is_empty()) {
        Some(PriceComparison { prices })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_subject_action_and_setting() {
        let themes = extract_themes("a chef cooking pasta in a rustic kitchen");
        assert_eq!(themes.main_subject, "chef");
        assert_eq!(themes.action.as_deref(), Some("cooking"));
        assert_eq!(themes.setting.as_deref(), Some("kitchen"));
        assert!(themes.descriptors.contains(&"rustic".to_string()));
        assert!(themes.objects.contains(&"pasta".to_string()));
    }

    #[test]
    fn unknown_words_fall_back_to_first_meaningful_word() {
        let themes = extract_themes("the quixotic zeppelin");
        assert_eq!(themes.main_subject, "quixotic");
    }

    #[test]
    fn empty_description_still_yields_a_subject() {
        let themes = extract_themes("");
        assert_eq!(themes.main_subject, "the scene");
        assert_eq!(themes.mood, Mood::Neutral);
    }

    #[test]
    fn mood_reads_high_energy_as_exciting() {
        let themes = extract_themes("insane challenge with epic prizes");
        assert_eq!(themes.mood, Mood::Exciting);
    }

    #[test]
    fn mood_reads_negative_as_dramatic() {
        let themes = extract_themes("exploring an abandoned haunted house");
        assert_eq!(themes.mood, Mood::Dramatic);
    }

    #[test]
    fn detects_two_price_comparison() {
        let themes = extract_themes("$1 pizza vs $1000 pizza");
        let prices = themes.price_comparison.unwrap().prices;
        assert_eq!(prices, vec!["$1", "$1000"]);
    }

    #[test]
    fn detects_versus_with_single_price() {
        let themes = extract_themes("eating a $500 steak versus a homemade one");
        assert!(themes.price_comparison.is_some());
    }

    #[test]
    fn no_price_comparison_without_prices() {
        let themes = extract_themes("cats vs dogs");
        assert!(themes.price_comparison.is_none());
    }

    #[test]
    fn single_price_without_versus_is_not_a_comparison() {
        let themes = extract_themes("I bought a $3000 camera");
        assert!(themes.price_comparison.is_none());
    }
}
