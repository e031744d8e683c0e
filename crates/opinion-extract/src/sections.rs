/// Section splitter for free-text model answers.
///
/// Answers come back in whatever shape the model felt like that run:
/// - Emphasis headers: `**Relevance**`, `__Relevance__`, `*Relevance:*`
/// - Markdown headings: `### Relevance`
/// - Bulleted or numbered pairs: `- Relevance: 4`, `2. **Sentiment:** 1`
/// - Plain pairs: `Relevance: 4`
/// - Free text under an open header
///
/// Parser approach: each line goes through an ordered list of independent
/// classifiers producing a [`LineKind`], and [`split_sections`] folds those
/// into a [`SectionMap`]. A second, greedy path captures the social post,
/// which tends to span lines and contain colons of its own.
use regex::Regex;

use crate::fields::{Field, POST_LABEL};
use crate::resolve::matches_field;

/// Optional emphasis opener/closer around a label.
const EMPHASIS: &str = r"(?:\*{1,2}|_{1,2})?";
/// Labels are short runs of words; prose with a colon further in is not a label.
const LABEL: &str = r"(?P<label>\w[\w \t'/()&-]{0,47}?)";
/// Bullet or ordinal list marker.
const MARKER: &str = r"(?:[-*+•]|\d+[.)])";

/// Classification of a single response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// A label on its own; opens a section for the lines that follow.
    Header(String),
    /// An inline `label: value` pair.
    KeyValue { label: String, value: String },
    /// Anything else with visible content.
    Text,
    /// Whitespace only.
    Blank,
}

type Rule = fn(&LineClassifier, &str) -> Option<LineKind>;

/// Compiled line patterns. Build once and reuse across responses.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    emphasis_header_re: Regex,
    heading_re: Regex,
    marked_pair_re: Regex,
    plain_pair_re: Regex,
    inline_emphasis_re: Regex,
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LineClassifier {
    pub fn new() -> Self {
        let emphasis_header_re = Regex::new(
            r"^\s*(?:(?:[-+•]|\d+[.)])\s+)?(?:\*\*\s*(?P<a>\w[^*:]{0,47}?)\s*:?\s*\*\*|__\s*(?P<b>\w[^_:]{0,47}?)\s*:?\s*__|\*\s*(?P<c>\w[^*:]{0,47}?)\s*:?\s*\*)\s*:?\s*$",
        )
        .expect("valid regex");
        let heading_re = Regex::new(
            r"^\s*#{1,6}\s+(?:\*\*)?\s*(?P<label>\w[^#*:]{0,47}?)\s*:?\s*(?:\*\*)?\s*:?\s*$",
        )
        .expect("valid regex");
        let marked_pair_re = Regex::new(&format!(
            r"^\s*{MARKER}\s+{EMPHASIS}\s*{LABEL}\s*{EMPHASIS}\s*:\s*(?:\*\*|__)?(?P<value>.*)$"
        ))
        .expect("valid regex");
        let plain_pair_re = Regex::new(&format!(
            r"^\s*{EMPHASIS}\s*{LABEL}\s*{EMPHASIS}\s*:\s*(?:\*\*|__)?(?P<value>.*)$"
        ))
        .expect("valid regex");
        let inline_emphasis_re = Regex::new(
            r"^\s*(?:(?:[-+•]|\d+[.)])\s+)?\*\*(?P<label>\w[^*:]{0,47}?)\*\*\s+(?P<value>[^:\s].*)$",
        )
        .expect("valid regex");

        Self {
            emphasis_header_re,
            heading_re,
            marked_pair_re,
            plain_pair_re,
            inline_emphasis_re,
        }
    }

    /// Classify one line (without its terminator). Rules are tried top to
    /// bottom and the first match wins.
    pub fn classify(&self, line: &str) -> LineKind {
        if line.trim().is_empty() {
            return LineKind::Blank;
        }
        const RULES: [Rule; 5] = [
            LineClassifier::emphasis_header,
            LineClassifier::heading,
            LineClassifier::marked_pair,
            LineClassifier::plain_pair,
            LineClassifier::inline_emphasis,
        ];
        RULES
            .iter()
            .find_map(|rule| rule(self, line))
            .unwrap_or(LineKind::Text)
    }

    /// `**Label**`, `__Label__`, `*Label*`, optionally with a colon and a
    /// list marker in front.
    pub fn emphasis_header(&self, line: &str) -> Option<LineKind> {
        let caps = self.emphasis_header_re.captures(line)?;
        let label = caps
            .name("a")
            .or_else(|| caps.name("b"))
            .or_else(|| caps.name("c"))?;
        Some(LineKind::Header(label.as_str().trim().to_string()))
    }

    /// `# Label` through `###### Label`.
    pub fn heading(&self, line: &str) -> Option<LineKind> {
        let caps = self.heading_re.captures(line)?;
        Some(LineKind::Header(caps["label"].trim().to_string()))
    }

    /// `- Label: value`, `* **Label:** value`, `3. Label: value`.
    pub fn marked_pair(&self, line: &str) -> Option<LineKind> {
        let caps = self.marked_pair_re.captures(line)?;
        Some(pair(&caps["label"], &caps["value"]))
    }

    /// `Label: value` with no list marker.
    pub fn plain_pair(&self, line: &str) -> Option<LineKind> {
        let caps = self.plain_pair_re.captures(line)?;
        Some(pair(&caps["label"], &caps["value"]))
    }

    /// `**Label** value` with no colon.
    pub fn inline_emphasis(&self, line: &str) -> Option<LineKind> {
        let caps = self.inline_emphasis_re.captures(line)?;
        Some(pair(&caps["label"], &caps["value"]))
    }
}

/// A pair with nothing after the colon behaves like a header.
fn pair(label: &str, value: &str) -> LineKind {
    let label = label.trim().to_string();
    let value = clean_value(value);
    if value.is_empty() {
        LineKind::Header(label)
    } else {
        LineKind::KeyValue { label, value }
    }
}

/// Trim a value and drop an unmatched bold marker left over from
/// `**Label: value**` style lines.
fn clean_value(value: &str) -> String {
    let mut value = value.trim();
    for marker in ["**", "__"] {
        if value.matches(marker).count() == 1 {
            value = value
                .strip_prefix(marker)
                .or_else(|| value.strip_suffix(marker))
                .unwrap_or(value)
                .trim();
        }
    }
    value.to_string()
}

/// Discovered label -> text, in discovery order.
///
/// Labels are stored as written; matching against logical fields happens
/// later in [`crate::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMap {
    entries: Vec<(String, String)>,
}

impl SectionMap {
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set `label` to `value`, replacing an earlier value for the same label.
    pub fn insert(&mut self, label: String, value: String) {
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((label, value)),
        }
    }

    fn slot(&mut self, label: &str) -> &mut String {
        let idx = match self.entries.iter().position(|(l, _)| l == label) {
            Some(idx) => idx,
            None => {
                self.entries.push((label.to_string(), String::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    fn open(&mut self, label: &str) {
        let slot = self.slot(label);
        if !slot.is_empty() && !slot.ends_with('\n') {
            slot.push('\n');
        }
    }

    fn append(&mut self, label: &str, raw_line: &str) {
        self.slot(label).push_str(raw_line);
    }

    fn has_content(&self, label: &str) -> bool {
        self.get(label).is_some_and(|v| !v.trim().is_empty())
    }

    fn finish(self) -> Self {
        let entries = self
            .entries
            .into_iter()
            .map(|(label, value)| (label, value.trim().to_string()))
            .filter(|(_, value)| !value.is_empty())
            .collect();
        Self { entries }
    }
}

/// Greedy buffer for the social post.
///
/// Starts at a label matching a post synonym and keeps every following
/// line, colons included, until a blank line after some text or a label
/// belonging to one of the rating fields.
#[derive(Debug, Default)]
struct PostCapture {
    active: bool,
    lines: Vec<String>,
}

impl PostCapture {
    fn observe(&mut self, kind: &LineKind, line: &str) {
        let (label, value) = match kind {
            LineKind::Header(label) => (Some(label.as_str()), ""),
            LineKind::KeyValue { label, value } => (Some(label.as_str()), value.as_str()),
            LineKind::Text | LineKind::Blank => (None, ""),
        };
        if let Some(label) = label {
            if matches_field(label, Field::Post) {
                self.active = true;
                if !value.is_empty() {
                    self.lines.push(value.to_string());
                }
                return;
            }
            if RATING_FIELDS.iter().any(|&field| matches_field(label, field)) {
                self.active = false;
                return;
            }
        }
        if !self.active {
            return;
        }
        let text = line.trim();
        if text.is_empty() {
            if !self.lines.is_empty() {
                self.active = false;
            }
        } else {
            self.lines.push(text.to_string());
        }
    }

    fn into_text(self) -> Option<String> {
        let text = self.lines.join(" ");
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

const RATING_FIELDS: [Field; 3] = [Field::Relevance, Field::Sentiment, Field::Agreement];

/// Build the section map for a raw response.
///
/// Precedence for a `label: value` line: the pair is stored on its own and
/// closes any open header section, so free text after a pair is not
/// attached to anything. Only headers collect following lines.
pub fn split_sections(classifier: &LineClassifier, text: &str) -> SectionMap {
    let mut map = SectionMap::default();
    let mut current: Option<String> = None;
    let mut post = PostCapture::default();

    for raw_line in text.split_inclusive('\n') {
        let line = raw_line.trim_end_matches(&['\n', '\r'][..]);
        let kind = classifier.classify(line);
        post.observe(&kind, line);

        match kind {
            LineKind::Header(label) => {
                map.open(&label);
                current = Some(label);
            }
            LineKind::KeyValue { label, value } => {
                map.insert(label, value);
                current = None;
            }
            LineKind::Text => {
                if let Some(label) = &current {
                    map.append(label, raw_line);
                }
            }
            LineKind::Blank => {
                if current.as_deref().is_some_and(|l| map.has_content(l)) {
                    current = None;
                }
            }
        }
    }

    let mut map = map.finish();
    if let Some(post_text) = post.into_text() {
        map.insert(POST_LABEL.to_string(), post_text);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> LineClassifier {
        LineClassifier::new()
    }

    fn kv(label: &str, value: &str) -> Option<LineKind> {
        Some(LineKind::KeyValue {
            label: label.to_string(),
            value: value.to_string(),
        })
    }

    fn header(label: &str) -> Option<LineKind> {
        Some(LineKind::Header(label.to_string()))
    }

    #[test]
    fn test_emphasis_header_variants() {
        let c = classifier();
        assert_eq!(c.emphasis_header("**Relevance**"), header("Relevance"));
        assert_eq!(c.emphasis_header("  __Sentiment__  "), header("Sentiment"));
        assert_eq!(c.emphasis_header("*Agreement:*"), header("Agreement"));
        assert_eq!(c.emphasis_header("**Twitter Post:**"), header("Twitter Post"));
        assert_eq!(c.emphasis_header("**Twitter Post**:"), header("Twitter Post"));
        assert_eq!(c.emphasis_header("1. **Relevance**"), header("Relevance"));
        assert_eq!(c.emphasis_header("**Relevance:** 4"), None);
        assert_eq!(c.emphasis_header("Relevance"), None);
    }

    #[test]
    fn test_heading() {
        let c = classifier();
        assert_eq!(c.heading("### Relevance"), header("Relevance"));
        assert_eq!(c.heading("## **Twitter Post:**"), header("Twitter Post"));
        assert_eq!(c.heading("#hashtag"), None);
    }

    #[test]
    fn test_marked_pair() {
        let c = classifier();
        assert_eq!(c.marked_pair("- Relevance: 4"), kv("Relevance", "4"));
        assert_eq!(c.marked_pair("  * Sentiment: 2 (negative)"), kv("Sentiment", "2 (negative)"));
        assert_eq!(c.marked_pair("3. Agreement: 5"), kv("Agreement", "5"));
        assert_eq!(c.marked_pair("2) Rel: 1"), kv("Rel", "1"));
        assert_eq!(c.marked_pair("- **Relevance:** 4"), kv("Relevance", "4"));
        assert_eq!(c.marked_pair("• **Sentiment**: 3"), kv("Sentiment", "3"));
        assert_eq!(c.marked_pair("- Twitter Post:"), header("Twitter Post"));
        assert_eq!(c.marked_pair("Relevance: 4"), None);
    }

    #[test]
    fn test_plain_pair() {
        let c = classifier();
        assert_eq!(c.plain_pair("Relevance: 4"), kv("Relevance", "4"));
        assert_eq!(c.plain_pair("Relevance (1-5): 3"), kv("Relevance (1-5)", "3"));
        assert_eq!(c.plain_pair("**Relevance: 4**"), kv("Relevance", "4"));
        assert_eq!(c.plain_pair("*Agreement*: 2"), kv("Agreement", "2"));
        assert_eq!(
            c.plain_pair("Twitter Post: \"Taxes again?! #fedup\""),
            kv("Twitter Post", "\"Taxes again?! #fedup\"")
        );
        assert_eq!(c.plain_pair("Twitter Post:"), header("Twitter Post"));
        assert_eq!(c.plain_pair("- Relevance: 4"), None);
        assert_eq!(c.plain_pair("Just some prose."), None);
    }

    #[test]
    fn test_inline_emphasis() {
        let c = classifier();
        assert_eq!(c.inline_emphasis("**Relevance** 4"), kv("Relevance", "4"));
        assert_eq!(c.inline_emphasis("**Relevance**"), None);
    }

    #[test]
    fn test_classify_order_and_fallthrough() {
        let c = classifier();
        assert_eq!(c.classify(""), LineKind::Blank);
        assert_eq!(c.classify("   \t"), LineKind::Blank);
        assert_eq!(c.classify("**Relevance**"), LineKind::Header("Relevance".into()));
        assert_eq!(
            c.classify("- Relevance: 4"),
            LineKind::KeyValue {
                label: "Relevance".into(),
                value: "4".into()
            }
        );
        assert_eq!(c.classify("I honestly don't care much."), LineKind::Text);
    }

    #[test]
    fn test_header_then_pair() {
        let map = split_sections(&classifier(), "**Relevance**\n- Relevance: 4\n");
        assert_eq!(map.get("Relevance"), Some("4"));
    }

    #[test]
    fn test_header_collects_following_lines() {
        let text = "**Thoughts**\nfirst line\nsecond line\n\nunrelated\n";
        let map = split_sections(&classifier(), text);
        assert_eq!(map.get("Thoughts"), Some("first line\nsecond line"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_blank_before_content_keeps_section_open() {
        let text = "**Relevance**\n\n4\n";
        let map = split_sections(&classifier(), text);
        assert_eq!(map.get("Relevance"), Some("4"));
    }

    #[test]
    fn test_pair_closes_open_section() {
        let text = "**Sentiment**\n- Relevance: 4\nI feel about 2 ways on this.\n";
        let map = split_sections(&classifier(), text);
        assert_eq!(map.get("Relevance"), Some("4"));
        assert_eq!(map.get("Sentiment"), None);
        assert!(!map.iter().any(|(_, v)| v.contains("2 ways")));
    }

    #[test]
    fn test_empty_sections_are_dropped() {
        let map = split_sections(&classifier(), "**Relevance**\n**Sentiment**\n");
        assert!(map.is_empty());
    }

    #[test]
    fn test_post_capture_multiline() {
        let text = "Relevance: 4\nTwitter Post:\nFirst line of the post\nsecond line #tag\n\nTrailing note\n";
        let map = split_sections(&classifier(), text);
        assert_eq!(
            map.get(POST_LABEL),
            Some("First line of the post second line #tag")
        );
    }

    #[test]
    fn test_post_capture_inline_start() {
        let text = "- Twitter Post: \"Gas prices again?!\"\n";
        let map = split_sections(&classifier(), text);
        assert_eq!(map.get(POST_LABEL), Some("\"Gas prices again?!\""));
        assert_eq!(map.get("Twitter Post"), Some("\"Gas prices again?!\""));
    }

    #[test]
    fn test_post_capture_keeps_colons() {
        let text = "**Tweet:**\nHot take: nobody asked us.\nNote: still mad\n";
        let map = split_sections(&classifier(), text);
        assert_eq!(
            map.get(POST_LABEL),
            Some("Hot take: nobody asked us. Note: still mad")
        );
    }

    #[test]
    fn test_post_before_ratings_stops_at_rating_line() {
        let text = "Twitter Post: \"Not our war.\"\nRelevance: 2\nSentiment: 1\n";
        let map = split_sections(&classifier(), text);
        assert_eq!(map.get(POST_LABEL), Some("\"Not our war.\""));
        assert_eq!(map.get("Relevance"), Some("2"));
    }

    #[test]
    fn test_rating_header_ends_post() {
        let text = "**Tweet:**\nToo many promises.\n**Agreement**\n1\n";
        let map = split_sections(&classifier(), text);
        assert_eq!(map.get(POST_LABEL), Some("Too many promises."));
        assert_eq!(map.get("Agreement"), Some("1"));
    }

    #[test]
    fn test_post_prefixed_prose_label_is_not_a_post() {
        let text = "Post-election analysis: turnout was low\nRelevance: 2\n";
        let map = split_sections(&classifier(), text);
        assert_eq!(map.get(POST_LABEL), None);
        assert_eq!(map.get("Post-election analysis"), Some("turnout was low"));
    }

    #[test]
    fn test_post_label_with_qualifier() {
        let text = "**Social Post (max 260)**: Vote them all out.\n";
        let map = split_sections(&classifier(), text);
        assert_eq!(map.get(POST_LABEL), Some("Vote them all out."));
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "Relevance: 4\r\nSentiment: 2\r\n";
        let map = split_sections(&classifier(), text);
        assert_eq!(map.get("Relevance"), Some("4"));
        assert_eq!(map.get("Sentiment"), Some("2"));
    }

    #[test]
    fn test_discovery_order_preserved() {
        let text = "Sentiment: 2\nRelevance: 4\nSentiment: 3\n";
        let map = split_sections(&classifier(), text);
        let labels: Vec<&str> = map.labels().collect();
        assert_eq!(labels, vec!["Sentiment", "Relevance"]);
        assert_eq!(map.get("Sentiment"), Some("3"));
    }
}
