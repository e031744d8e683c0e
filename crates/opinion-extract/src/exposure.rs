//! Which personas get shown an article, and which kind.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Article, ParsedAnswer, Rating, Stance};

/// Ratings at or below this count as a low score.
pub const LOW_RATING: u32 = 2;

fn is_low(rating: Rating) -> bool {
    rating.value().is_some_and(|v| v <= LOW_RATING)
}

/// A persona is exposed to an article when it found the question of little
/// relevance, felt negative about it, and did not agree (or gave no
/// agreement rating at all).
pub fn needs_exposure(answer: &ParsedAnswer) -> bool {
    is_low(answer.relevance)
        && is_low(answer.sentiment)
        && (!answer.agreement.is_available() || is_low(answer.agreement))
}

/// Stance of the articles to show: the opposite of how the persona feels.
/// `None` when there is no sentiment rating to oppose.
pub fn opposing_stance(answer: &ParsedAnswer) -> Option<Stance> {
    let sentiment = answer.sentiment.value()?;
    Some(if sentiment <= LOW_RATING {
        Stance::Positive
    } else {
        Stance::Negative
    })
}

/// Articles collected for one topic, split by stance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticlePool {
    #[serde(default)]
    pub positive: Vec<Article>,
    #[serde(default)]
    pub negative: Vec<Article>,
}

impl ArticlePool {
    pub fn for_stance(&self, stance: Stance) -> &[Article] {
        match stance {
            Stance::Positive => &self.positive,
            Stance::Negative => &self.negative,
        }
    }
}

/// Question -> topic mapping, as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicMap {
    pub question_to_topic: HashMap<String, String>,
}

/// Articles to show for `question` given the persona's earlier `answer`.
///
/// Empty when the persona does not qualify, the question has no topic, or
/// the topic has no articles of the needed stance.
pub fn select_articles<'a>(
    question: &str,
    answer: &ParsedAnswer,
    topics: &TopicMap,
    pools: &'a HashMap<String, ArticlePool>,
) -> &'a [Article] {
    if !needs_exposure(answer) {
        return &[];
    }
    let Some(stance) = opposing_stance(answer) else {
        return &[];
    };
    topics
        .question_to_topic
        .get(question)
        .and_then(|topic| pools.get(topic))
        .map(|pool| pool.for_stance(stance))
        .unwrap_or(&[])
}
