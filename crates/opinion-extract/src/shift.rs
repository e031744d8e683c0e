//! Opinion shift between a persona's answer before and after reading an article.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Rating, Stance, StructuredRecord, SurveyEntry, UserId};

/// Per-field change for one (persona, question, article) triple.
///
/// A shift is `None` when either side of the comparison has no rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub user_id: UserId,
    pub question: String,
    pub article_title: Option<String>,
    pub article_sentiment: Option<Stance>,
    pub relevance_shift: Option<i64>,
    pub sentiment_shift: Option<i64>,
    pub agreement_shift: Option<i64>,
}

/// `after - before`, if both ratings are available.
pub fn rating_delta(before: Rating, after: Rating) -> Option<i64> {
    Some(i64::from(after.value()?) - i64::from(before.value()?))
}

/// Compare every `after` entry with the `before` entry for the same persona
/// and question. After entries with no counterpart are skipped; when a
/// persona answered a question more than once before, the last answer counts.
pub fn calculate_shifts(before: &[SurveyEntry], after: &[SurveyEntry]) -> Vec<Shift> {
    let lookup: HashMap<(&UserId, &str), &StructuredRecord> = before
        .iter()
        .map(|entry| ((&entry.user_id, entry.question.as_str()), &entry.response))
        .collect();

    after
        .iter()
        .filter_map(|entry| {
            let before = lookup.get(&(&entry.user_id, entry.question.as_str()))?;
            let (relevance_shift, sentiment_shift, agreement_shift) =
                match (before.answer(), entry.response.answer()) {
                    (Some(b), Some(a)) => (
                        rating_delta(b.relevance, a.relevance),
                        rating_delta(b.sentiment, a.sentiment),
                        rating_delta(b.agreement, a.agreement),
                    ),
                    _ => (None, None, None),
                };
            Some(Shift {
                user_id: entry.user_id.clone(),
                question: entry.question.clone(),
                article_title: entry.article.as_ref().map(|a| a.title.clone()),
                article_sentiment: entry.article.as_ref().map(|a| a.stance),
                relevance_shift,
                sentiment_shift,
                agreement_shift,
            })
        })
        .collect()
}
