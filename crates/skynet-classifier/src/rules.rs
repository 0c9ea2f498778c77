use std::sync::OnceLock;

use regex::Regex;

use crate::types::Label;

/// Layer 2 — fast rules (hard gates). Never overridden by later layers.
/// Returns `(label, matched_indicator)` on a hit.
pub fn fast_rules(normalized: &str) -> Option<(Label, String)> {
    for re in age_indicator_patterns() {
        if let Some(m) = re.find(normalized) {
            return Some((Label::MinorRisk, m.as_str().to_string()));
        }
    }
    for re in coercion_indicator_patterns() {
        if let Some(m) = re.find(normalized) {
            return Some((Label::Nonconsensual, m.as_str().to_string()));
        }
    }
    None
}

fn age_indicator_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"\bteen\w*\b").unwrap(),
            Regex::new(r"\bschool ?girl\b|\bschool ?boy\b|\bin school\b").unwrap(),
            Regex::new(r"\bbarely legal\b").unwrap(),
            Regex::new(r"\bunderage\b").unwrap(),
            Regex::new(r"\bminor\b").unwrap(),
            // digit ages <18 in person context, e.g. "she's 15", "17 year old", "i'm 12 yo"
            Regex::new(r"\b([2-9]|1[0-7])\s*(-|\s)?\s*(years?|yrs?|yo)\b").unwrap(),
            Regex::new(r"\b([2-9]|1[0-7])\s*(-|\s)?\s*year(-|\s)?old\b").unwrap(),
        ]
    })
}

fn coercion_indicator_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"\bforced\b|\bforcing\b|\bforce her\b|\bforce him\b").unwrap(),
            Regex::new(r"\brape\b|\braping\b|\braped\b").unwrap(),
            Regex::new(r"\bdrugged\b|\bdrugging\b").unwrap(),
            Regex::new(r"\bagainst (her|his|their) will\b").unwrap(),
            Regex::new(r"\bnon-?consensual\b|\bwithout consent\b").unwrap(),
        ]
    })
}

/// Per-category weighted pattern list used by Layer 3.
pub struct PatternCategory {
    pub label: Label,
    pub patterns: Vec<(Regex, f64)>,
}

/// Clinical-context suppressors attenuate explicit scores (spec §4.1 Layer 3).
pub fn clinical_context_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"\bdoctor\b|\bphysician\b|\bnurse\b").unwrap(),
            Regex::new(r"\bmedical\b|\bclinical\b|\bdiagnosis\b").unwrap(),
            Regex::new(r"\btextbook\b|\banatomy class\b|\bbiology\b").unwrap(),
        ]
    })
}

pub fn category_tables() -> &'static Vec<PatternCategory> {
    static TABLES: OnceLock<Vec<PatternCategory>> = OnceLock::new();
    TABLES.get_or_init(|| {
        vec![
            PatternCategory {
                label: Label::Suggestive,
                patterns: vec![
                    (Regex::new(r"\bkiss\b|\bkissing\b").unwrap(), 0.3),
                    (Regex::new(r"\bromance\b|\bromantic\b").unwrap(), 0.3),
                    (Regex::new(r"\bflirt\w*\b").unwrap(), 0.4),
                    (Regex::new(r"\bsexy\b|\bseductive\b").unwrap(), 0.5),
                    (Regex::new(r"\bcuddle\b|\bcuddling\b").unwrap(), 0.2),
                    (Regex::new(r"\bdate\b|\bdating\b").unwrap(), 0.15),
                ],
            },
            PatternCategory {
                label: Label::ExplicitConsensualAdult,
                patterns: vec![
                    (Regex::new(r"\bpenis\b|\bvagina\b|\bcock\b|\bpussy\b").unwrap(), 0.8),
                    (Regex::new(r"\bboobs\b|\btits\b|\bass\b|\bbreasts\b").unwrap(), 0.5),
                    (Regex::new(r"\bsex\b|\bfuck\w*\b|\bfucking\b").unwrap(), 0.7),
                    (Regex::new(r"\borgasm\w*\b|\bcum\b|\bcumming\b").unwrap(), 0.8),
                    (Regex::new(r"\bnaked\b|\bnude\b|\bundress\w*\b").unwrap(), 0.4),
                    (Regex::new(r"\bmasturbat\w*\b").unwrap(), 0.7),
                    (Regex::new(r"\bporn\w*\b").unwrap(), 0.6),
                ],
            },
            PatternCategory {
                label: Label::ExplicitFetish,
                patterns: vec![
                    (Regex::new(r"\bbdsm\b|\bbondage\b").unwrap(), 0.8),
                    (Regex::new(r"\bspank\w*\b|\bwhip\w*\b").unwrap(), 0.6),
                    (Regex::new(r"\bdom(me|inatrix|ination)\b|\bsubmissive\b").unwrap(), 0.6),
                    (Regex::new(r"\bfoot fetish\b|\blatex\b|\broleplay pet\b").unwrap(), 0.6),
                    (Regex::new(r"\bchoking\b|\bhumiliation\b").unwrap(), 0.5),
                ],
            },
        ]
    })
}

/// Score each category against the normalized text; returns
/// `(label, confidence, indicators)` for the argmax category, or `None`
/// when nothing matched.
pub fn pattern_score(normalized: &str) -> Option<(Label, f64, Vec<String>)> {
    let clinical_hit = clinical_context_patterns()
        .iter()
        .any(|re| re.is_match(normalized));

    let mut best: Option<(Label, f64, Vec<String>)> = None;

    for category in category_tables() {
        let mut indicators = Vec::new();
        let mut strongest: f64 = 0.0;
        for (re, weight) in &category.patterns {
            if let Some(m) = re.find(normalized) {
                indicators.push(m.as_str().to_string());
                if *weight > strongest {
                    strongest = *weight;
                }
            }
        }
        if indicators.is_empty() {
            continue;
        }

        // Bounded monotonic function of (match count, strongest weight).
        let count_factor = 1.0 - (1.0 / (1.0 + indicators.len() as f64));
        let mut confidence = (strongest * 0.7 + count_factor * 0.3).min(1.0);

        let is_explicit = matches!(
            category.label,
            Label::ExplicitConsensualAdult | Label::ExplicitFetish
        );
        if is_explicit && clinical_hit {
            confidence *= 0.4;
        }

        let better = match &best {
            None => true,
            Some((_, best_conf, _)) => confidence > *best_conf,
        };
        if better {
            best = Some((category.label, confidence, indicators));
        }
    }

    best
}

/// Number of distinct category families with at least one indicator hit —
/// one of the Layer-4 trigger conditions (spec §4.1: "3+ category
/// indicator families hit simultaneously").
pub fn indicator_family_count(normalized: &str) -> usize {
    category_tables()
        .iter()
        .filter(|cat| cat.patterns.iter().any(|(re, _)| re.is_match(normalized)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    #[test]
    fn age_indicator_triggers_minor_risk() {
        let n = normalize("she is barely legal and in school");
        let hit = fast_rules(&n);
        assert_eq!(hit.unwrap().0, Label::MinorRisk);
    }

    #[test]
    fn digit_age_under_18_triggers_minor_risk() {
        let n = normalize("she's 15 years old");
        assert_eq!(fast_rules(&n).unwrap().0, Label::MinorRisk);
    }

    #[test]
    fn coercion_triggers_nonconsensual() {
        let n = normalize("he forced her against her will");
        assert_eq!(fast_rules(&n).unwrap().0, Label::Nonconsensual);
    }

    #[test]
    fn safe_text_has_no_fast_rule_hit() {
        let n = normalize("what's the weather like today?");
        assert!(fast_rules(&n).is_none());
    }

    #[test]
    fn clinical_context_attenuates_explicit_score() {
        let clinical = normalize("the doctor explained the anatomy of the penis in class");
        let casual = normalize("send nudes, i want to see your penis");
        let (label_c, conf_c, _) = pattern_score(&clinical).unwrap();
        let (label_u, conf_u, _) = pattern_score(&casual).unwrap();
        assert_eq!(label_c, Label::ExplicitConsensualAdult);
        assert_eq!(label_u, Label::ExplicitConsensualAdult);
        assert!(conf_c < conf_u);
    }
}
