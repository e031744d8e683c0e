use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "opinion-survey")]
#[command(about = "Ask simulated personas survey questions and measure opinion shift")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract a structured record from one saved model response
    Parse {
        /// Response file (reads stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Ask every persona the survey questions, printing one JSON line per answer
    Ask {
        /// JSON array of {user_id, persona_prompt}
        #[arg(long)]
        personas: PathBuf,

        /// A single survey question
        #[arg(long, conflicts_with = "questions", required_unless_present = "questions")]
        question: Option<String>,

        /// JSON array of survey questions
        #[arg(long)]
        questions: Option<PathBuf>,

        /// Only ask this persona
        #[arg(long)]
        user_id: Option<String>,

        /// Model name (overrides GENERATE_MODEL)
        #[arg(long)]
        model: Option<String>,
    },

    /// Show qualifying personas opposing-stance articles and ask again
    Expose {
        /// JSON array of {user_id, persona_prompt}
        #[arg(long)]
        personas: PathBuf,

        /// JSON array of survey entries from `ask`
        #[arg(long)]
        before: PathBuf,

        /// JSON object of topic -> {positive: [...], negative: [...]}
        #[arg(long)]
        articles: PathBuf,

        /// JSON object {"question_to_topic": {question: topic}}
        #[arg(long)]
        topics: PathBuf,

        /// Model name (overrides GENERATE_MODEL)
        #[arg(long)]
        model: Option<String>,
    },

    /// Compare answers before and after exposure
    Shift {
        /// JSON array of survey entries before exposure
        before: PathBuf,

        /// JSON array of survey entries after exposure
        after: PathBuf,
    },
}
