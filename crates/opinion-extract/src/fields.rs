use std::fmt;

/// The logical fields every answer is resolved into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Relevance,
    Sentiment,
    Agreement,
    Post,
}

/// Label the post capture path stores its buffer under.
pub const POST_LABEL: &str = "Post";

const RELEVANCE_SYNONYMS: &[&str] = &["Relevance", "Rel", "Importance"];
const SENTIMENT_SYNONYMS: &[&str] = &["Sentiment", "Feelings", "Opinion"];
const AGREEMENT_SYNONYMS: &[&str] = &[
    "Agreement",
    "Consensus",
    "Alignment",
    "Agree",
    "Disagree",
    "Disagreement",
];
const POST_SYNONYMS: &[&str] = &[
    POST_LABEL,
    "Twitter Post",
    "Tweet",
    "Social Post",
    "Message",
    "TwitterPost",
];

impl Field {
    pub const ALL: [Field; 4] = [
        Field::Relevance,
        Field::Sentiment,
        Field::Agreement,
        Field::Post,
    ];

    /// Accepted labels, most preferred first.
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            Field::Relevance => RELEVANCE_SYNONYMS,
            Field::Sentiment => SENTIMENT_SYNONYMS,
            Field::Agreement => AGREEMENT_SYNONYMS,
            Field::Post => POST_SYNONYMS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Relevance => "relevance",
            Field::Sentiment => "sentiment",
            Field::Agreement => "agreement",
            Field::Post => "post",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_post_label_is_preferred() {
        assert_eq!(Field::Post.synonyms()[0], POST_LABEL);
    }

    #[test]
    fn every_field_has_synonyms() {
        for field in Field::ALL {
            assert!(!field.synonyms().is_empty(), "{field} has no synonyms");
        }
    }
}
