use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

/// Leetspeak / homoglyph substitution table, applied after lowercasing.
/// Longer keys first so e.g. `p0rn` matches before a lone `0`.
fn leet_table() -> &'static Vec<(&'static str, &'static str)> {
    static TABLE: OnceLock<Vec<(&'static str, &'static str)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        // Word-level substitutions only — a blanket per-digit map (0->o,
        // 1->i, ...) would also mangle the literal ages Layer 2 needs to
        // read ("17 years old"), so only whole known leetspeak words are
        // rewritten, not every digit in the text.
        let mut t = vec![
            ("s3x", "sex"),
            ("p0rn", "porn"),
            ("pr0n", "porn"),
            ("a$$", "ass"),
            ("@ss", "ass"),
            ("b00bs", "boobs"),
            ("t1ts", "tits"),
            ("fuk", "fuck"),
            ("phuck", "fuck"),
            ("@", "a"),
        ];
        t.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        t
    })
}

/// Fixed emoji → semantic token table (spec §4.1 Layer 1).
fn emoji_table() -> &'static Vec<(&'static str, &'static str)> {
    static TABLE: OnceLock<Vec<(&'static str, &'static str)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        vec![
            ("\u{1F346}", " penis "),  // 🍆
            ("\u{1F351}", " ass "),    // 🍑
            ("\u{1F4A6}", " cum "),    // 💦
            ("\u{1F61B}", " tongue "), // 😛
            ("\u{1F525}", " hot "),    // 🔥
        ]
    })
}

/// Layer 1 — Normalize: NFKC, lowercase, leetspeak/homoglyph substitution,
/// emoji mapping, whitespace collapse. The original text is retained
/// alongside the normalized one by the caller (`ClassificationResult`
/// carries only the normalized text in `layer_trace`, per spec).
pub fn normalize(text: &str) -> String {
    let nfkc: String = text.nfkc().collect();
    let mut s = nfkc.to_lowercase();

    for (from, to) in emoji_table() {
        s = s.replace(from, to);
    }
    for (from, to) in leet_table() {
        s = s.replace(from, to);
    }

    // Collapse whitespace so "s e x" -> "sex": drop spaces between single
    // letters first, then collapse runs of whitespace.
    let despaced = collapse_spelled_out(&s);
    despaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapses sequences of single letters separated by single spaces
/// ("s e x" -> "sex") without touching normal multi-letter words.
fn collapse_spelled_out(s: &str) -> String {
    let tokens: Vec<&str> = s.split(' ').collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].chars().count() == 1 && tokens[i].chars().next().unwrap().is_alphabetic() {
            let mut run = String::new();
            let mut j = i;
            while j < tokens.len()
                && tokens[j].chars().count() == 1
                && tokens[j].chars().next().unwrap().is_alphabetic()
            {
                run.push_str(tokens[j]);
                j += 1;
            }
            if j - i >= 2 {
                out.push_str(&run);
                out.push(' ');
                i = j;
                continue;
            }
        }
        out.push_str(tokens[i]);
        out.push(' ');
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_leetspeak() {
        assert!(normalize("s3x please").contains("sex"));
        assert!(normalize("p0rn site").contains("porn"));
    }

    #[test]
    fn maps_emoji_to_tokens() {
        assert!(normalize("send me a \u{1F346} pic").contains("penis"));
    }

    #[test]
    fn collapses_spelled_out_letters() {
        assert_eq!(normalize("s e x"), "sex");
    }

    #[test]
    fn lowercases_and_applies_nfkc() {
        assert_eq!(normalize("HELLO"), "hello");
    }
}
