use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, info, warn};

use opinion_common::generate::GenerateClient;
use opinion_extract::exposure::{select_articles, ArticlePool, TopicMap};
use opinion_extract::prompt::{article_prompt, default_examples, question_prompt};
use opinion_extract::{
    calculate_shifts, Article, Extractor, ParsedAnswer, Persona, SurveyEntry, UserId,
};

use crate::error::AppError;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let text = std::fs::read_to_string(path).map_err(|source| AppError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| AppError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn read_input(file: Option<&Path>) -> Result<String, AppError> {
    match file {
        Some(path) => std::fs::read_to_string(path).map_err(|source| AppError::Read {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

/// One JSON document per line, flushed so partial runs keep their output.
fn write_line<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<(), AppError> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// All personas, or just the one whose id prints as `user_id`.
pub fn select_personas(
    personas: Vec<Persona>,
    user_id: Option<&str>,
) -> Result<Vec<Persona>, AppError> {
    let Some(wanted) = user_id else {
        return Ok(personas);
    };
    let selected: Vec<Persona> = personas
        .into_iter()
        .filter(|p| p.user_id.to_string() == wanted)
        .collect();
    if selected.is_empty() {
        return Err(AppError::UnknownPersona(wanted.to_string()));
    }
    Ok(selected)
}

pub fn run_parse<W: Write>(
    extractor: &Extractor,
    file: Option<&Path>,
    out: &mut W,
) -> Result<(), AppError> {
    let raw = read_input(file)?;
    let record = extractor.extract(&raw);
    serde_json::to_writer_pretty(&mut *out, &record)?;
    out.write_all(b"\n")?;
    Ok(())
}

/// Questions from `--question` or a `--questions` JSON array.
pub fn load_questions(
    question: Option<String>,
    file: Option<&Path>,
) -> Result<Vec<String>, AppError> {
    let questions = match (question, file) {
        (Some(question), _) => vec![question],
        (None, Some(path)) => read_json(path)?,
        (None, None) => Vec::new(),
    };
    let questions = clean_questions(questions);
    if questions.is_empty() {
        return Err(AppError::Config("no survey questions given".to_string()));
    }
    Ok(questions)
}

fn clean_questions(questions: Vec<String>) -> Vec<String> {
    questions
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect()
}

/// Every persona answers every question, persona by persona.
pub async fn run_ask<W: Write>(
    client: &GenerateClient,
    extractor: &Extractor,
    model: &str,
    personas: &[Persona],
    questions: &[String],
    out: &mut W,
) -> Result<(), AppError> {
    let examples = default_examples();
    let prompts: Vec<String> = questions
        .iter()
        .map(|q| question_prompt(q, &examples))
        .collect();
    let mut failed = 0usize;

    for persona in personas {
        for (question, prompt) in questions.iter().zip(&prompts) {
            let raw = match client.generate(model, &persona.persona_prompt, prompt).await {
                Ok(raw) => raw,
                Err(e) => {
                    error!(
                        user_id = %persona.user_id,
                        question = %question,
                        error = %e,
                        "generation failed, skipping question"
                    );
                    failed += 1;
                    continue;
                }
            };
            let entry = SurveyEntry {
                user_id: persona.user_id.clone(),
                question: question.clone(),
                article: None,
                response: extractor.extract(&raw),
            };
            write_line(out, &entry)?;
        }
    }

    info!(
        personas = personas.len(),
        questions = questions.len(),
        failed,
        "ask complete"
    );
    Ok(())
}

/// One re-ask: a persona, its earlier answer, and the article to show it.
#[derive(Debug)]
pub struct ExposureJob<'a> {
    pub persona: &'a Persona,
    pub question: &'a str,
    pub previous: &'a ParsedAnswer,
    pub article: &'a Article,
}

/// Every (persona, article) pair to re-ask, in `before` order.
///
/// Fallback answers and answers from personas missing in `personas` are
/// skipped.
pub fn exposure_plan<'a>(
    personas: &'a [Persona],
    before: &'a [SurveyEntry],
    topics: &TopicMap,
    pools: &'a HashMap<String, ArticlePool>,
) -> Vec<ExposureJob<'a>> {
    let by_id: HashMap<&UserId, &Persona> = personas.iter().map(|p| (&p.user_id, p)).collect();
    let mut jobs = Vec::new();

    for entry in before {
        let Some(previous) = entry.response.answer() else {
            continue;
        };
        let articles = select_articles(&entry.question, previous, topics, pools);
        if articles.is_empty() {
            continue;
        }
        let Some(&persona) = by_id.get(&entry.user_id) else {
            warn!(user_id = %entry.user_id, "no persona prompt for answer, skipping");
            continue;
        };
        jobs.extend(articles.iter().map(|article| ExposureJob {
            persona,
            question: &entry.question,
            previous,
            article,
        }));
    }
    jobs
}

pub async fn run_expose<W: Write>(
    client: &GenerateClient,
    extractor: &Extractor,
    model: &str,
    jobs: &[ExposureJob<'_>],
    out: &mut W,
) -> Result<(), AppError> {
    let mut failed = 0usize;

    for job in jobs {
        let prompt = article_prompt(job.question, job.article, job.previous);
        let raw = match client.generate(model, &job.persona.persona_prompt, &prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(
                    user_id = %job.persona.user_id,
                    article = %job.article.title,
                    error = %e,
                    "generation failed, skipping article"
                );
                failed += 1;
                continue;
            }
        };
        let entry = SurveyEntry {
            user_id: job.persona.user_id.clone(),
            question: job.question.to_string(),
            article: Some(job.article.clone()),
            response: extractor.extract(&raw),
        };
        write_line(out, &entry)?;
    }

    info!(jobs = jobs.len(), failed, "expose complete");
    Ok(())
}

pub fn run_shift<W: Write>(
    before: &[SurveyEntry],
    after: &[SurveyEntry],
    out: &mut W,
) -> Result<(), AppError> {
    let shifts = calculate_shifts(before, after);
    info!(before = before.len(), after = after.len(), shifts = shifts.len(), "shifts calculated");
    serde_json::to_writer_pretty(&mut *out, &shifts)?;
    out.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opinion_extract::{Rating, Stance, StructuredRecord};

    fn persona(id: u64) -> Persona {
        Persona {
            user_id: UserId::Number(id),
            persona_prompt: format!("You are persona {id}."),
        }
    }

    fn entry(id: u64, question: &str, response: StructuredRecord) -> SurveyEntry {
        SurveyEntry {
            user_id: UserId::Number(id),
            question: question.to_string(),
            article: None,
            response,
        }
    }

    fn low_answer() -> StructuredRecord {
        StructuredRecord::Succeeded(ParsedAnswer {
            relevance: Rating::Value(1),
            sentiment: Rating::Value(2),
            agreement: Rating::Unavailable,
            post: "Whatever.".to_string(),
        })
    }

    fn article(title: &str, stance: Stance) -> Article {
        Article {
            title: title.to_string(),
            date: "2024-02-02".to_string(),
            url: format!("https://news.example.org/{title}"),
            body: "Body.".to_string(),
            stance,
        }
    }

    #[test]
    fn test_select_personas() {
        let all = vec![persona(1), persona(2)];
        assert_eq!(select_personas(all.clone(), None).unwrap().len(), 2);

        let one = select_personas(all.clone(), Some("2")).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].user_id, UserId::Number(2));

        assert!(matches!(
            select_personas(all, Some("9")),
            Err(AppError::UnknownPersona(id)) if id == "9"
        ));
    }

    #[test]
    fn test_load_single_question() {
        let questions = load_questions(Some(" Q? ".to_string()), None).unwrap();
        assert_eq!(questions, vec!["Q?".to_string()]);
        assert!(matches!(load_questions(None, None), Err(AppError::Config(_))));
    }

    #[test]
    fn test_question_file_parses_and_drops_blanks() {
        let parsed: Vec<String> =
            serde_json::from_str(r#"["Taxes are too high.", "  ", "Gas costs too much. "]"#)
                .unwrap();
        assert_eq!(
            clean_questions(parsed),
            vec!["Taxes are too high.".to_string(), "Gas costs too much.".to_string()]
        );
    }

    #[test]
    fn test_exposure_plan() {
        let personas = vec![persona(1), persona(2)];
        let before = vec![
            entry(1, "Q?", low_answer()),
            entry(2, "Q?", StructuredRecord::Fallback { raw_text: "?".to_string() }),
            entry(3, "Q?", low_answer()),
        ];
        let mut topics = TopicMap::default();
        topics
            .question_to_topic
            .insert("Q?".to_string(), "economy".to_string());
        let mut pools = HashMap::new();
        pools.insert(
            "economy".to_string(),
            ArticlePool {
                positive: vec![
                    article("jobs", Stance::Positive),
                    article("wages", Stance::Positive),
                ],
                negative: vec![article("layoffs", Stance::Negative)],
            },
        );

        let jobs = exposure_plan(&personas, &before, &topics, &pools);
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|j| j.persona.user_id == UserId::Number(1)));
        assert_eq!(jobs[0].article.title, "jobs");
        assert_eq!(jobs[1].article.title, "wages");
        assert_eq!(jobs[0].previous.post, "Whatever.");
    }

    #[test]
    fn test_write_line_emits_json_lines() {
        let mut out = Vec::new();
        write_line(&mut out, &entry(1, "Q?", low_answer())).unwrap();
        write_line(&mut out, &entry(2, "Q?", low_answer())).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: SurveyEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.user_id, UserId::Number(1));
        assert!(!lines[0].contains("article"));
    }

    #[test]
    fn test_run_shift_prints_array() {
        let before = vec![entry(1, "Q?", low_answer())];
        let after = vec![entry(
            1,
            "Q?",
            StructuredRecord::Succeeded(ParsedAnswer {
                relevance: Rating::Value(3),
                sentiment: Rating::Value(4),
                agreement: Rating::Value(2),
                post: String::new(),
            }),
        )];
        let mut out = Vec::new();
        run_shift(&before, &after, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["relevance_shift"], 2);
        assert_eq!(value[0]["sentiment_shift"], 2);
        assert!(value[0]["agreement_shift"].is_null());
    }

    #[test]
    fn test_read_json_reports_path() {
        let missing = Path::new("/nonexistent/personas.json");
        match read_json::<Vec<Persona>>(missing) {
            Err(AppError::Read { path, .. }) => assert_eq!(path, missing),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
