//! Prompt text sent to the model for each survey question.
//!
//! Both prompts end in the same answer skeleton so the extractor sees the
//! same labels before and after article exposure.

use serde::{Deserialize, Serialize};

use crate::model::{Article, ParsedAnswer};

const TASK_INSTRUCTIONS: &str = "\
For the following question, provide:
1. The relevance of the question to you, given your profile, on a Likert scale from 1 to 5.
   - 1: Not relevant at all (the question has no significance to you)
   - 2: Slightly relevant (the question has minimal significance)
   - 3: Relevant (the question is fairly significant)
   - 4: Very relevant (the question is highly significant)
   - 5: Extremely relevant (the question is of utmost significance)

2. Your sentiment about the question on a Likert scale from 1 to 5.
   - 1: Very negative (strongly unfavorable reaction)
   - 2: Negative (unfavorable reaction)
   - 3: Neutral (no strong feelings either way)
   - 4: Positive (favorable reaction)
   - 5: Very positive (strongly favorable reaction)

3. Your agreement with the statement on a Likert scale from 1 to 5.
   - 1: Strongly disagree
   - 2: Disagree
   - 3: Neutral (no strong feelings either way, or not applicable)
   - 4: Agree
   - 5: Strongly agree

4. Your opinion on the topic as a Twitter post of at most 260 characters. The post must:
   - Be realistic and believable
   - Reflect your profile while staying within guardrails, even for extreme opinions
   - Use natural language and tone
   - Avoid technical jargon unless it fits your profile
   - Be engaging and concise
   - Match the style of the platform: slang, abbreviations, hashtags, the occasional rant

Follow the answer structure below exactly. Some examples of the format:
";

/// Maximum post length requested from the model.
pub const MAX_POST_CHARS: usize = 260;

/// One few-shot example shown before the real question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub question: String,
    pub relevance: u32,
    pub sentiment: u32,
    pub agreement: u32,
    pub post: String,
}

impl Example {
    fn new(question: &str, relevance: u32, sentiment: u32, agreement: u32, post: &str) -> Self {
        Self {
            question: question.to_string(),
            relevance,
            sentiment,
            agreement,
            post: post.to_string(),
        }
    }
}

/// The built-in few-shot set: two opposite answers to each of two questions.
pub fn default_examples() -> Vec<Example> {
    vec![
        Example::new(
            "I feel like I am treated fairly by politicians.",
            5,
            1,
            1,
            "We just need to be treated fairly by the politicians who are supposed to be working for US! Not wasting our money.",
        ),
        Example::new(
            "I feel like I am treated fairly by politicians.",
            5,
            5,
            5,
            "This man is perfectly capable of leading the United States of America, & is doing a damned good job!",
        ),
        Example::new(
            "The energy crisis is worsening my situation.",
            4,
            1,
            5,
            "I'm doing as much as I can, even bringing the kiddo along to make money for all these bills due by the end of the month. And what happens? My car battery dies. So tired of the struggle.",
        ),
        Example::new(
            "The energy crisis is worsening my situation.",
            3,
            4,
            1,
            "Actually, thank God my family is still able to get by in this overwhelming economic crisis.",
        ),
    ]
}

fn answer_skeleton(question: &str) -> String {
    format!(
        "\nQuestion:\n\"{question}\"\n    - Relevance: [1-5]\n    - Sentiment: [1-5]\n    - Agreement: [1-5]\n    - Twitter Post:\n"
    )
}

/// Prompt for a persona's first answer to `question`.
pub fn question_prompt(question: &str, examples: &[Example]) -> String {
    let mut prompt = String::from(TASK_INSTRUCTIONS);
    for example in examples {
        prompt.push_str(&format!(
            "\nExample Question:\n\"{}\"\n    - Relevance: {}\n    - Sentiment: {}\n    - Agreement: {}\n    - Twitter Post: {}\n",
            example.question, example.relevance, example.sentiment, example.agreement, example.post
        ));
    }
    prompt.push_str(&answer_skeleton(question));
    prompt
}

/// Prompt asking the persona to answer `question` again after reading
/// `article`, reminding it of its `previous` answer.
pub fn article_prompt(question: &str, article: &Article, previous: &ParsedAnswer) -> String {
    let mut prompt = format!(
        "\nHere are your previous responses to the same question:\n- Relevance: {}\n- Sentiment: {}\n- Agreement: {}\n- Twitter Post: {}\n",
        previous.relevance, previous.sentiment, previous.agreement, previous.post
    );
    prompt.push_str(&format!(
        "\nNow, read the following article:\n\nTitle: {}\nDate: {}\nURL: {}\n\n{}\n",
        article.title, article.date, article.url, article.body
    ));
    prompt.push_str("\nNow, provide your response to the question again.\n");
    prompt.push_str(&answer_skeleton(question));
    prompt
}
