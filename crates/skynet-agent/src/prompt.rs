use serde::Serialize;

/// Per-section character budget, a coarse proxy for the token-bounded
/// truncation spec §4.7 requires (this crate has no tokenizer dependency;
/// the teacher's own `WorkspaceLoader` used the same chars-as-proxy
/// approach for its file-size caps).
const PERSONA_MAX_CHARS: usize = 2_000;
const EMOTION_MAX_CHARS: usize = 500;
const PREFERENCES_MAX_CHARS: usize = 500;
const MEMORIES_MAX_CHARS: usize = 3_000;
const GOALS_MAX_CHARS: usize = 1_000;

/// 3-tier system prompt for Anthropic prompt caching.
///
/// TIER 1 (static): persona (archetype + traits + behaviors + relationship
///   depth) — stable for the lifetime of a (user, personality) pair.
///   → cache_control: {type: "ephemeral"} — high hit rate across a session.
/// TIER 2 (per-user): reserved, currently unused (persona already carries
///   the user/personality-scoped content).
/// TIER 3 (volatile): emotional context, preferences, memories, goals —
///   recomputed every turn. → NO cache, placed last so it doesn't break
///   the tier-1 prefix.
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    pub static_tier: String,
    pub user_tier: String,
    pub volatile_tier: String,
}

impl SystemPrompt {
    /// Flatten all tiers into a single string (for providers without caching).
    pub fn to_plain_text(&self) -> String {
        let mut out = self.static_tier.clone();
        if !self.user_tier.is_empty() {
            out.push_str("\n\n");
            out.push_str(&self.user_tier);
        }
        if !self.volatile_tier.is_empty() {
            out.push_str("\n\n");
            out.push_str(&self.volatile_tier);
        }
        out
    }

    /// Convert to Anthropic API format with cache breakpoints.
    pub fn to_anthropic_blocks(&self) -> Vec<serde_json::Value> {
        let mut blocks = Vec::with_capacity(3);

        blocks.push(serde_json::json!({
            "type": "text",
            "text": self.static_tier,
            "cache_control": { "type": "ephemeral" }
        }));

        if !self.user_tier.is_empty() {
            blocks.push(serde_json::json!({
                "type": "text",
                "text": self.user_tier,
                "cache_control": { "type": "ephemeral" }
            }));
        }

        if !self.volatile_tier.is_empty() {
            blocks.push(serde_json::json!({
                "type": "text",
                "text": self.volatile_tier,
            }));
        }

        blocks
    }
}

/// Truncate content to `max_chars` using a 70% head / 20% tail split,
/// breaking on line boundaries where possible.
pub(crate) fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.len() <= max_chars {
        return content.to_string();
    }

    let head_chars = max_chars * 70 / 100;
    let tail_chars = max_chars * 20 / 100;
    let marker = "\n\n[... truncated ...]\n\n";

    let head_end = content[..head_chars]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(head_chars);
    let tail_start = if content.len() > tail_chars {
        content[(content.len() - tail_chars)..]
            .find('\n')
            .map(|i| content.len() - tail_chars + i + 1)
            .unwrap_or(content.len() - tail_chars)
    } else {
        0
    };

    let mut out = String::with_capacity(head_end + marker.len() + (content.len() - tail_start));
    out.push_str(&content[..head_end]);
    out.push_str(marker);
    out.push_str(&content[tail_start..]);
    out
}

// ---------------------------------------------------------------------------
// Section inputs — plain value structs so this crate need not depend on
// skynet-personality / skynet-memory / skynet-detectors (narrow interface,
// the same framing used for `DetectorLlm`/`JudgeProvider`/`Embedder`).
// The orchestrator maps its own types onto these before calling build().
// ---------------------------------------------------------------------------

/// Persona section input (spec §4.7: "persona (archetype + traits +
/// behaviors + relationship depth)").
#[derive(Debug, Clone, Default)]
pub struct PersonaInput {
    pub archetype: String,
    pub traits_description: String,
    pub behaviors_description: String,
    pub backstory: Option<String>,
    pub speaking_style: Option<String>,
    pub custom_instructions: Option<String>,
    pub relationship_depth: f64,
    pub trust_level: f64,
}

/// Emotional-context section input.
#[derive(Debug, Clone, Default)]
pub struct EmotionInput {
    pub emotion: String,
    pub intensity: String,
    pub trend: Option<String>,
}

/// Preference section input. Any field left `None` is omitted from the
/// rendered section entirely rather than printed as "unset".
#[derive(Debug, Clone, Default)]
pub struct PreferencesInput {
    pub formality: Option<String>,
    pub tone: Option<String>,
    pub emoji_usage: Option<String>,
    pub response_length: Option<String>,
    pub explanation_style: Option<String>,
}

/// One retrieved memory, already ranked by the caller (spec §4.5
/// retrieval blend) — `build()` only re-sorts by `importance` as a
/// defensive tie-breaker, it doesn't re-rank by recency/similarity.
#[derive(Debug, Clone)]
pub struct MemoryInput {
    pub content: String,
    pub importance: f64,
}

/// One active goal.
#[derive(Debug, Clone)]
pub struct GoalInput {
    pub title: String,
    pub category: String,
}

/// Volatile per-turn metadata injected alongside the other volatile
/// sections (not itself one of spec §4.7's named sections).
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub conversation_id: String,
    pub turn_count: u32,
    pub timestamp: String,
}

/// C9 — assembles the fixed-order system prompt (spec §4.4 step 9, §4.7).
///
/// Grounded on the teacher's `SystemPrompt` 3-tier cache-breakpoint shape;
/// the section-assembly logic itself is new (the teacher's version read
/// section text from workspace `.md` files, this one composes it from
/// typed inputs the orchestrator already holds in memory).
pub struct PromptBuilder {
    route_system_prompt: String,
}

impl PromptBuilder {
    pub fn new(route_system_prompt: impl Into<String>) -> Self {
        Self {
            route_system_prompt: route_system_prompt.into(),
        }
    }

    /// Build the full system prompt in the fixed section order: persona,
    /// emotional context, preferences, memories, goals.
    pub fn build(
        &self,
        persona: &PersonaInput,
        emotion: Option<&EmotionInput>,
        preferences: &PreferencesInput,
        memories: &[MemoryInput],
        goals: &[GoalInput],
        session_info: Option<&SessionInfo>,
    ) -> SystemPrompt {
        let persona_section = truncate_content(&render_persona(persona), PERSONA_MAX_CHARS);

        let static_tier = if self.route_system_prompt.is_empty() {
            persona_section
        } else {
            format!("{}\n\n{}", self.route_system_prompt, persona_section)
        };

        let mut volatile_sections = Vec::with_capacity(4);

        if let Some(emotion) = emotion {
            volatile_sections.push(truncate_content(&render_emotion(emotion), EMOTION_MAX_CHARS));
        }

        let preferences_section = render_preferences(preferences);
        if !preferences_section.is_empty() {
            volatile_sections.push(truncate_content(&preferences_section, PREFERENCES_MAX_CHARS));
        }

        if !memories.is_empty() {
            volatile_sections.push(truncate_content(&render_memories(memories), MEMORIES_MAX_CHARS));
        }

        if !goals.is_empty() {
            volatile_sections.push(truncate_content(&render_goals(goals), GOALS_MAX_CHARS));
        }

        if let Some(info) = session_info {
            volatile_sections.push(format!(
                "[conversation: {} | turn: {} | time: {}]",
                info.conversation_id, info.turn_count, info.timestamp
            ));
        }

        SystemPrompt {
            static_tier,
            user_tier: String::new(),
            volatile_tier: volatile_sections.join("\n\n"),
        }
    }
}

fn render_persona(persona: &PersonaInput) -> String {
    let mut out = format!(
        "## Persona\nArchetype: {}\n{}\n{}",
        persona.archetype, persona.traits_description, persona.behaviors_description
    );
    if let Some(backstory) = &persona.backstory {
        out.push_str("\nBackstory: ");
        out.push_str(backstory);
    }
    if let Some(style) = &persona.speaking_style {
        out.push_str("\nSpeaking style: ");
        out.push_str(style);
    }
    if let Some(instructions) = &persona.custom_instructions {
        out.push_str("\nAdditional instructions: ");
        out.push_str(instructions);
    }
    out.push_str(&format!(
        "\nRelationship depth: {:.1}/10, trust: {:.1}/10.",
        persona.relationship_depth, persona.trust_level
    ));
    out
}

fn render_emotion(emotion: &EmotionInput) -> String {
    let mut out = format!(
        "## Emotional context\nThe user currently seems {} (intensity: {}).",
        emotion.emotion, emotion.intensity
    );
    if let Some(trend) = &emotion.trend {
        out.push(' ');
        out.push_str(trend);
    }
    out
}

fn render_preferences(preferences: &PreferencesInput) -> String {
    let mut lines = Vec::new();
    if let Some(v) = &preferences.formality {
        lines.push(format!("Formality: {v}"));
    }
    if let Some(v) = &preferences.tone {
        lines.push(format!("Tone: {v}"));
    }
    if let Some(v) = &preferences.emoji_usage {
        lines.push(format!("Emoji usage: {v}"));
    }
    if let Some(v) = &preferences.response_length {
        lines.push(format!("Response length: {v}"));
    }
    if let Some(v) = &preferences.explanation_style {
        lines.push(format!("Explanation style: {v}"));
    }
    if lines.is_empty() {
        return String::new();
    }
    format!("## User preferences\n{}", lines.join("\n"))
}

/// Memories are placed prominently above persona embellishments in the
/// spec's section order is already respected by caller ordering; here we
/// only guarantee highest-importance first within this section (spec
/// §4.7: "memory text prefers highest-importance first").
fn render_memories(memories: &[MemoryInput]) -> String {
    let mut sorted: Vec<&MemoryInput> = memories.iter().collect();
    sorted.sort_by(|a, b| b.importance.partial_cmp(&a.importance).unwrap_or(std::cmp::Ordering::Equal));
    let lines: Vec<String> = sorted.iter().map(|m| format!("- {}", m.content)).collect();
    format!("## Things you remember about this user\n{}", lines.join("\n"))
}

fn render_goals(goals: &[GoalInput]) -> String {
    let lines: Vec<String> = goals.iter().map(|g| format!("- {} ({})", g.title, g.category)).collect();
    format!("## Active goals\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona() -> PersonaInput {
        PersonaInput {
            archetype: "wise_mentor".to_string(),
            traits_description: "Traits: thoughtful, direct.".to_string(),
            behaviors_description: "Behaviors: asks questions.".to_string(),
            backstory: None,
            speaking_style: None,
            custom_instructions: None,
            relationship_depth: 3.5,
            trust_level: 2.0,
        }
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let builder = PromptBuilder::new("");
        let emotion = EmotionInput {
            emotion: "anxious".to_string(),
            intensity: "med".to_string(),
            trend: None,
        };
        let preferences = PreferencesInput {
            formality: Some("casual".to_string()),
            ..Default::default()
        };
        let memories = vec![MemoryInput {
            content: "user works at Google".to_string(),
            importance: 0.8,
        }];
        let goals = vec![GoalInput {
            title: "learn Rust".to_string(),
            category: "learning".to_string(),
        }];

        let prompt = builder.build(&persona(), Some(&emotion), &preferences, &memories, &goals, None);
        let full = prompt.to_plain_text();

        let persona_pos = full.find("## Persona").unwrap();
        let emotion_pos = full.find("## Emotional context").unwrap();
        let prefs_pos = full.find("## User preferences").unwrap();
        let memories_pos = full.find("## Things you remember").unwrap();
        let goals_pos = full.find("## Active goals").unwrap();

        assert!(persona_pos < emotion_pos);
        assert!(emotion_pos < prefs_pos);
        assert!(prefs_pos < memories_pos);
        assert!(memories_pos < goals_pos);
    }

    #[test]
    fn memories_sorted_by_importance_descending() {
        let builder = PromptBuilder::new("");
        let memories = vec![
            MemoryInput { content: "low importance fact".to_string(), importance: 0.2 },
            MemoryInput { content: "high importance fact".to_string(), importance: 0.9 },
        ];
        let prompt = builder.build(&persona(), None, &PreferencesInput::default(), &memories, &[], None);
        let full = prompt.to_plain_text();
        let high_pos = full.find("high importance fact").unwrap();
        let low_pos = full.find("low importance fact").unwrap();
        assert!(high_pos < low_pos);
    }

    #[test]
    fn empty_preferences_section_is_omitted() {
        let builder = PromptBuilder::new("");
        let prompt = builder.build(&persona(), None, &PreferencesInput::default(), &[], &[], None);
        assert!(!prompt.to_plain_text().contains("## User preferences"));
    }

    #[test]
    fn route_system_prompt_prefixes_static_tier() {
        let builder = PromptBuilder::new("You are an intimate companion for a verified adult user.");
        let prompt = builder.build(&persona(), None, &PreferencesInput::default(), &[], &[], None);
        assert!(prompt.static_tier.starts_with("You are an intimate companion"));
    }

    #[test]
    fn long_section_is_truncated() {
        let mut long_persona = persona();
        long_persona.custom_instructions = Some("x".repeat(PERSONA_MAX_CHARS + 500));
        let builder = PromptBuilder::new("");
        let prompt = builder.build(&long_persona, None, &PreferencesInput::default(), &[], &[], None);
        assert!(prompt.static_tier.contains("[... truncated ...]"));
    }
}
