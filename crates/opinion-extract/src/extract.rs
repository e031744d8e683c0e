use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::fields::Field;
use crate::model::{ParsedAnswer, Rating, StructuredRecord};
use crate::numeric::extract_rating;
use crate::resolve::resolve_field;
use crate::sections::{split_sections, LineClassifier};

const QUOTES: &[char] = &['"', '\u{201c}', '\u{201d}'];

/// Turns raw model answers into [`StructuredRecord`]s.
///
/// Holds only compiled patterns, so one instance can be shared freely
/// (including across threads) and reused for every response in a run.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    classifier: LineClassifier,
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            classifier: LineClassifier::new(),
        }
    }

    /// Extract a record from one raw response. Never fails: anything that
    /// cannot be structured comes back as a fallback carrying `raw` verbatim.
    pub fn extract(&self, raw: &str) -> StructuredRecord {
        match self.try_extract(raw) {
            Ok(answer) => StructuredRecord::Succeeded(answer),
            Err(e) => {
                warn!(error = %e, "could not structure model output, keeping raw text");
                StructuredRecord::Fallback {
                    raw_text: raw.to_string(),
                }
            }
        }
    }

    /// The fallible pipeline behind [`Extractor::extract`].
    ///
    /// Individual fields may come back unavailable; an error means nothing
    /// usable was found at all.
    pub fn try_extract(&self, raw: &str) -> Result<ParsedAnswer, ExtractError> {
        if raw.trim().is_empty() {
            return Err(ExtractError::EmptyInput);
        }

        let sections = split_sections(&self.classifier, raw);
        debug!(sections = ?sections, "extracted sections");
        if sections.is_empty() {
            return Err(ExtractError::NoSections);
        }

        let relevance = resolve_field(&sections, Field::Relevance);
        let sentiment = resolve_field(&sections, Field::Sentiment);
        let agreement = resolve_field(&sections, Field::Agreement);
        let post = resolve_field(&sections, Field::Post);

        if [relevance, sentiment, agreement, post]
            .iter()
            .all(Option::is_none)
        {
            return Err(ExtractError::NoRecognizedFields {
                labels: sections.len(),
            });
        }

        Ok(ParsedAnswer {
            relevance: rating(relevance),
            sentiment: rating(sentiment),
            agreement: rating(agreement),
            post: post.map(strip_quotes).unwrap_or_default(),
        })
    }
}

/// Extract with a throwaway [`Extractor`]. Prefer building one `Extractor`
/// when processing many responses.
pub fn extract(raw: &str) -> StructuredRecord {
    Extractor::new().extract(raw)
}

fn rating(value: Option<&str>) -> Rating {
    value.map_or(Rating::Unavailable, extract_rating)
}

fn strip_quotes(post: &str) -> String {
    post.trim().trim_matches(QUOTES).trim().to_string()
}
