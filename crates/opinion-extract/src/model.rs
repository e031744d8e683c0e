use std::fmt;

use serde::{Deserialize, Serialize};

/// A Likert-style rating pulled out of a model response.
///
/// `Unavailable` marks a field that could not be resolved. It is distinct
/// from a rating of `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RatingRepr", into = "RatingRepr")]
pub enum Rating {
    Value(u32),
    Unavailable,
}

impl Rating {
    pub fn value(self) -> Option<u32> {
        match self {
            Rating::Value(v) => Some(v),
            Rating::Unavailable => None,
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, Rating::Value(_))
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rating::Value(v) => write!(f, "{v}"),
            Rating::Unavailable => f.write_str("N/A"),
        }
    }
}

/// Wire form: a JSON integer, or the string `"unavailable"`.
///
/// Numeric strings (`"4"`) are accepted on input since older result files
/// stored some ratings that way. Any other string reads as unavailable.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RatingRepr {
    Number(u32),
    Text(String),
}

const UNAVAILABLE: &str = "unavailable";

impl From<RatingRepr> for Rating {
    fn from(repr: RatingRepr) -> Self {
        match repr {
            RatingRepr::Number(v) => Rating::Value(v),
            RatingRepr::Text(s) => s
                .trim()
                .parse::<u32>()
                .map(Rating::Value)
                .unwrap_or(Rating::Unavailable),
        }
    }
}

impl From<Rating> for RatingRepr {
    fn from(rating: Rating) -> Self {
        match rating {
            Rating::Value(v) => RatingRepr::Number(v),
            Rating::Unavailable => RatingRepr::Text(UNAVAILABLE.to_string()),
        }
    }
}

/// The four fields of a successfully structured answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAnswer {
    pub relevance: Rating,
    pub sentiment: Rating,
    pub agreement: Rating,
    /// Free-text social post, trimmed of surrounding quotes. Empty when the
    /// response carried no post.
    pub post: String,
}

/// Output of one extraction. Never an error: a response that cannot be
/// structured comes back as `Fallback` carrying the untouched text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StructuredRecord {
    Succeeded(ParsedAnswer),
    Fallback { raw_text: String },
}

impl StructuredRecord {
    pub fn answer(&self) -> Option<&ParsedAnswer> {
        match self {
            StructuredRecord::Succeeded(answer) => Some(answer),
            StructuredRecord::Fallback { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StructuredRecord::Fallback { .. })
    }
}

/// Persona identifiers show up as numbers or strings depending on which
/// export produced the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(u64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{n}"),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub user_id: UserId,
    /// System prompt that conditions the model on this persona.
    pub persona_prompt: String,
}

/// Editorial stance of a news article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub date: String,
    pub url: String,
    pub body: String,
    #[serde(rename = "sentiment")]
    pub stance: Stance,
}

/// One persona's answer to one question, optionally after reading an article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyEntry {
    pub user_id: UserId,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<Article>,
    pub response: StructuredRecord,
}
