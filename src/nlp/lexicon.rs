// Word lists behind the lexical signals: emotive density and subjectivity.
//
// Subjectivity is a lexicon average in the style of pattern/TextBlob: every
// known adjective carries a score in [0, 1] and the text's subjectivity is
// the mean over the lexicon words it contains.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex_lite::Regex;

/// Words that signal emotionally loaded framing.
pub const EMOTIVE_WORDS: [&str; 13] = [
    "outrage",
    "shocking",
    "crisis",
    "emergency",
    "devastating",
    "scandal",
    "controversial",
    "celebrate",
    "delighted",
    "thrilled",
    "disaster",
    "tragic",
    "alarm",
];

/// Adjective subjectivity scores. Factual descriptors sit low, evaluative
/// ones high.
const SUBJECTIVITY_LEXICON: &[(&str, f64)] = &[
    ("absurd", 1.0),
    ("alarming", 0.9),
    ("amazing", 0.9),
    ("appalling", 1.0),
    ("awful", 1.0),
    ("bad", 0.67),
    ("beautiful", 1.0),
    ("best", 0.3),
    ("bizarre", 0.8),
    ("brilliant", 1.0),
    ("brutal", 0.9),
    ("catastrophic", 0.9),
    ("certain", 0.57),
    ("chaotic", 0.8),
    ("clear", 0.38),
    ("controversial", 0.75),
    ("corrupt", 0.7),
    ("crazy", 0.9),
    ("dangerous", 0.9),
    ("devastating", 0.8),
    ("disastrous", 0.85),
    ("disgraceful", 1.0),
    ("dramatic", 0.7),
    ("easy", 0.83),
    ("excellent", 1.0),
    ("extraordinary", 0.75),
    ("extreme", 1.0),
    ("fair", 0.9),
    ("false", 0.65),
    ("famous", 1.0),
    ("fantastic", 0.9),
    ("federal", 0.1),
    ("fine", 0.5),
    ("final", 0.5),
    ("foreign", 0.13),
    ("good", 0.6),
    ("great", 0.75),
    ("happy", 1.0),
    ("hard", 0.54),
    ("historic", 0.4),
    ("horrible", 1.0),
    ("huge", 0.9),
    ("important", 1.0),
    ("incredible", 0.9),
    ("insane", 1.0),
    ("interesting", 0.5),
    ("large", 0.48),
    ("latest", 0.9),
    ("local", 0.0),
    ("major", 0.5),
    ("massive", 1.0),
    ("military", 0.1),
    ("national", 0.0),
    ("new", 0.45),
    ("nice", 1.0),
    ("official", 0.0),
    ("outrageous", 1.0),
    ("perfect", 1.0),
    ("political", 0.1),
    ("poor", 0.6),
    ("possible", 1.0),
    ("powerful", 1.0),
    ("previous", 0.17),
    ("public", 0.07),
    ("recent", 0.25),
    ("ridiculous", 1.0),
    ("sad", 1.0),
    ("serious", 0.67),
    ("shameful", 1.0),
    ("shocking", 1.0),
    ("significant", 0.88),
    ("small", 0.4),
    ("strong", 0.73),
    ("stunning", 1.0),
    ("stupid", 1.0),
    ("successful", 0.95),
    ("terrible", 1.0),
    ("tragic", 0.75),
    ("true", 0.65),
    ("unprecedented", 0.9),
    ("weak", 0.62),
    ("wonderful", 1.0),
    ("worst", 1.0),
    ("wrong", 0.9),
];

static EMOTIVE_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| EMOTIVE_WORDS.into_iter().collect());

static SUBJECTIVITY: LazyLock<HashMap<&'static str, f64>> =
    LazyLock::new(|| SUBJECTIVITY_LEXICON.iter().copied().collect());

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z][a-z'-]*").expect("valid word pattern"));

/// Share of whitespace-separated tokens that are emotive words.
///
/// Tokens are lowercased and stripped of surrounding punctuation, so
/// "Crisis!" counts. Empty text scores 0.0.
pub fn emotive_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut emotive = 0usize;
    for token in text.split_whitespace() {
        total += 1;
        let word = token
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if EMOTIVE_SET.contains(word.as_str()) {
            emotive += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    emotive as f64 / total as f64
}

/// Mean lexicon subjectivity over the words of `text`. 0.0 when no lexicon
/// word appears.
pub fn subjectivity(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let scores: Vec<f64> = WORD
        .find_iter(&lower)
        .filter_map(|m| SUBJECTIVITY.get(m.as_str()).copied())
        .collect();
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emotive_ratio_counts_words() {
        // 2 emotive words out of 9 tokens
        let text = "The crisis deepened as a tragic storm hit town";
        assert!((emotive_ratio(text) - 2.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_emotive_ratio_trims_punctuation_and_case() {
        assert!((emotive_ratio("Outrage! SCANDAL, \"disaster\"") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_emotive_ratio_empty() {
        assert_eq!(emotive_ratio(""), 0.0);
        assert_eq!(emotive_ratio("   \n\t"), 0.0);
    }

    #[test]
    fn test_subjectivity_average() {
        // terrible = 1.0, local = 0.0
        assert!((subjectivity("A terrible day for local traders") - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_subjectivity_without_lexicon_words() {
        assert_eq!(subjectivity("Council meets on Tuesday at noon"), 0.0);
        assert_eq!(subjectivity(""), 0.0);
    }

    #[test]
    fn test_lexicon_scores_in_range() {
        for (word, score) in SUBJECTIVITY_LEXICON {
            assert!((0.0..=1.0).contains(score), "{word} out of range");
        }
    }
}
