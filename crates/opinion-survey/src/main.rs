mod cli;
mod commands;
mod config;
mod error;

use std::collections::HashMap;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use opinion_common::generate::GenerateClient;
use opinion_extract::exposure::{ArticlePool, TopicMap};
use opinion_extract::{Extractor, Persona, SurveyEntry};

use cli::{Cli, Command};
use config::Config;
use error::AppError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries only JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let extractor = Extractor::new();
    let mut out = std::io::stdout().lock();

    match cli.command {
        Command::Parse { file } => {
            commands::run_parse(&extractor, file.as_deref(), &mut out)?;
        }
        Command::Ask {
            personas,
            question,
            questions,
            user_id,
            model,
        } => {
            let (client, model) = connect(model)?;

            let personas: Vec<Persona> = commands::read_json(&personas)?;
            let personas = commands::select_personas(personas, user_id.as_deref())?;
            let questions = commands::load_questions(question, questions.as_deref())?;
            commands::run_ask(&client, &extractor, &model, &personas, &questions, &mut out)
                .await?;
        }
        Command::Expose {
            personas,
            before,
            articles,
            topics,
            model,
        } => {
            let (client, model) = connect(model)?;

            let personas: Vec<Persona> = commands::read_json(&personas)?;
            let before: Vec<SurveyEntry> = commands::read_json(&before)?;
            let pools: HashMap<String, ArticlePool> = commands::read_json(&articles)?;
            let topics: TopicMap = commands::read_json(&topics)?;

            let jobs = commands::exposure_plan(&personas, &before, &topics, &pools);
            info!(answers = before.len(), jobs = jobs.len(), "exposure plan built");
            commands::run_expose(&client, &extractor, &model, &jobs, &mut out).await?;
        }
        Command::Shift { before, after } => {
            let before: Vec<SurveyEntry> = commands::read_json(&before)?;
            let after: Vec<SurveyEntry> = commands::read_json(&after)?;
            commands::run_shift(&before, &after, &mut out)?;
        }
    }

    Ok(())
}

/// Generate client and model name from the environment and `--model`.
fn connect(model: Option<String>) -> Result<(GenerateClient, String), AppError> {
    let config = Config::from_env()?.with_model_override(model);
    let client = GenerateClient::new(config.generate)?;
    info!(
        url = %client.config().url,
        timeout_secs = client.config().timeout.as_secs(),
        max_retries = client.config().max_retries,
        model = %config.model,
        "configuration loaded"
    );
    Ok((client, config.model))
}
