//! Fuzzy mapping from discovered labels to logical fields.

use tracing::{debug, warn};

use crate::fields::Field;
use crate::sections::SectionMap;

/// Minimum similarity for a discovered label to count as a synonym.
///
/// 0.6 accepts one or two edits on a typical label ("Relevence",
/// "Sentiments") and rejects unrelated words ("Sentiment" for "Relevance").
pub const SIMILARITY_THRESHOLD: f64 = 0.6;

/// Normalized Levenshtein similarity in `[0.0, 1.0]`.
///
/// Comparison is case-insensitive and treats any run of whitespace as a
/// single space. Distance is counted in chars, not bytes.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

/// Score of `label` as a stand-in for `target`.
///
/// Labels often carry trailing qualifiers ("Relevance rating",
/// "Agreement level (1-5)"), so the label's leading words, as many as
/// `target` has, are scored too and the better result is kept.
pub fn label_score(target: &str, label: &str) -> f64 {
    let full = similarity(target, label);
    let target_words = target.split_whitespace().count();
    let label_words: Vec<&str> = label.split_whitespace().collect();
    if target_words == 0 || label_words.len() <= target_words {
        return full;
    }
    let leading = label_words[..target_words].join(" ");
    full.max(similarity(target, &leading))
}

/// Whether `label` is one of the synonyms of `field`.
pub fn matches_field(label: &str, field: Field) -> bool {
    field
        .synonyms()
        .iter()
        .any(|synonym| label_score(synonym, label) >= SIMILARITY_THRESHOLD)
}

fn normalize(s: &str) -> Vec<char> {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .collect()
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            row[j + 1] = substitution.min(prev[j + 1] + 1).min(row[j] + 1);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

/// Best label in `sections` for `target`, if any clears the threshold.
/// Ties go to the label discovered first.
pub fn closest_label<'a>(sections: &'a SectionMap, target: &str) -> Option<&'a str> {
    let mut best: Option<(&str, f64)> = None;
    for label in sections.labels() {
        let score = label_score(target, label);
        if score < SIMILARITY_THRESHOLD {
            continue;
        }
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((label, score));
        }
    }
    best.map(|(label, _)| label)
}

/// Value for `field`: synonyms are tried in order and the first one that
/// matches any label wins.
pub fn resolve_field<'a>(sections: &'a SectionMap, field: Field) -> Option<&'a str> {
    for synonym in field.synonyms() {
        if let Some(label) = closest_label(sections, synonym) {
            debug!(%field, synonym, label, "resolved field");
            return sections.get(label);
        }
    }
    warn!(%field, labels = sections.len(), "field not found in response");
    None
}
