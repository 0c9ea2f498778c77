use crate::types::{ImportanceSubscores, RelatedEntities};

const EMOTIONAL_KEYWORDS: &[&str] = &[
    "love", "hate", "scared", "terrified", "thrilled", "devastated", "heartbroken", "furious", "grateful",
];
const EXPLICIT_MARKERS: &[&str] = &["remember that", "don't forget", "please remember", "keep in mind"];
const RELEVANCE_MARKERS: &[&str] = &[
    "my wife", "my husband", "my partner", "my friend", "my goal", "my job", "my family",
];

/// Recency sub-score: 1.0 today, ~0.1 after 6 months (spec §4.5). Explicit-
/// mention memories skip this decay (treated as permanently recent).
pub fn recency_score(days_since_created: f64, explicit_mention: f64) -> f64 {
    if explicit_mention >= 1.0 {
        return 1.0;
    }
    // exp(-days/halflife) hits ~0.1 at 180 days.
    const HALFLIFE_DAYS: f64 = 78.2;
    (-days_since_created / HALFLIFE_DAYS).exp().clamp(0.0, 1.0)
}

/// Same curve, used for retrieval's `temporal_decay` term (spec §4.5
/// Retrieval). Kept as a distinct entry point because retrieval decay is
/// never suppressed by explicit mentions — importance still should, but
/// decay used purely for ranking freshness is not.
pub fn temporal_decay(days_since_created: f64) -> f64 {
    recency_score(days_since_created, 0.0)
}

pub fn emotional_significance(content: &str, emotion_confidence: Option<f64>) -> f64 {
    let lower = content.to_lowercase();
    let keyword_hit = EMOTIONAL_KEYWORDS.iter().any(|k| lower.contains(k));
    let keyword_score = if keyword_hit { 0.6 } else { 0.0 };
    emotion_confidence.unwrap_or(0.0).max(keyword_score)
}

pub fn explicit_mention(content: &str) -> f64 {
    let lower = content.to_lowercase();
    if EXPLICIT_MARKERS.iter().any(|m| lower.contains(m)) {
        1.0
    } else {
        0.0
    }
}

/// Log-scaled access count (spec §4.5).
pub fn frequency_referenced(access_count: u32) -> f64 {
    (1.0 + access_count as f64).ln() / (1.0 + 20.0_f64).ln()
}

/// Bounded function of length (sweet spot 20-200 chars) plus presence of
/// numbers / proper nouns / dates (spec §4.5).
pub fn specificity(content: &str, related_entities: &RelatedEntities) -> f64 {
    let len = content.trim().chars().count() as f64;
    let length_score = if len < 20.0 {
        len / 20.0
    } else if len <= 200.0 {
        1.0
    } else {
        (400.0 - len).max(0.0) / 200.0
    };
    let has_number = content.chars().any(|c| c.is_ascii_digit());
    let has_entity = !related_entities.people.is_empty()
        || !related_entities.places.is_empty()
        || !related_entities.dates.is_empty();
    let marker_score = if has_number || has_entity { 0.3 } else { 0.0 };
    (length_score * 0.7 + marker_score).clamp(0.0, 1.0)
}

/// Names, possessives, relationship/goal/event markers (spec §4.5).
pub fn personal_relevance(content: &str, related_entities: &RelatedEntities) -> f64 {
    let lower = content.to_lowercase();
    let has_possessive = lower.contains(" my ") || lower.starts_with("my ") || lower.contains("i'm") || lower.contains(" i ");
    let has_marker = RELEVANCE_MARKERS.iter().any(|m| lower.contains(m));
    let has_named_entity = !related_entities.people.is_empty() || !related_entities.relationship_free();
    let mut score: f64 = 0.0;
    if has_possessive {
        score += 0.4;
    }
    if has_marker {
        score += 0.4;
    }
    if has_named_entity {
        score += 0.2;
    }
    score.clamp(0.0, 1.0)
}

impl RelatedEntities {
    fn relationship_free(&self) -> bool {
        self.people.is_empty() && self.places.is_empty()
    }
}

/// Minimal entity extractor: capitalized words (excluding the sentence's
/// first word) as people/places candidates, bare numbers/date-like tokens
/// as dates, remaining non-stopword nouns as topics. Good enough for
/// prompt-assembly hints; not a full NER pipeline.
pub fn extract_entities(content: &str) -> RelatedEntities {
    let mut people = Vec::new();
    let mut dates = Vec::new();
    let mut topics = Vec::new();

    for (i, word) in content.split_whitespace().enumerate() {
        let cleaned: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
        if cleaned.is_empty() {
            continue;
        }
        if i > 0 && cleaned.chars().next().is_some_and(|c| c.is_uppercase()) && cleaned.len() > 1 {
            people.push(cleaned.clone());
        } else if cleaned.chars().all(|c| c.is_ascii_digit()) {
            dates.push(cleaned.clone());
        } else if cleaned.len() > 4 {
            topics.push(cleaned.to_lowercase());
        }
    }
    people.dedup();
    topics.dedup();

    RelatedEntities {
        people,
        places: Vec::new(),
        topics,
        dates,
    }
}

pub fn blend(subscores: ImportanceSubscores) -> f64 {
    subscores.blend()
}
