mod repl;

use std::path::PathBuf;

use canyon::{
    config::{CanyonConfig, ProviderKind},
    conversation::Session,
    error::CanyonError,
    ingest::{self, IfExists},
};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "canyon", version, about = "Ask questions about camera feeds and codec configuration")]
struct Cli {
    /// Also append debug-level logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load the feed and definition CSVs into the SQLite database
    Ingest {
        #[command(flatten)]
        data: DataArgs,
        /// Keep an existing database instead of rebuilding it
        #[arg(long)]
        skip_existing: bool,
    },
    /// Start an interactive chat session
    Chat {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Answer a single question and exit
    Ask {
        question: String,
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Debug, Args)]
struct DataArgs {
    /// Directory holding the CSV and JSON inputs
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// SQLite database file
    #[arg(long)]
    db: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ModelArgs {
    /// Model backend: openrouter or ollama
    #[arg(long)]
    provider: Option<ProviderKind>,
    #[arg(long)]
    model: Option<String>,
    /// Chat endpoint base URL
    #[arg(long)]
    base_url: Option<String>,
    /// Tool-call rounds allowed per question
    #[arg(long)]
    max_rounds: Option<usize>,
}

impl DataArgs {
    fn apply(self, config: &mut CanyonConfig) {
        if let Some(dir) = self.data_dir {
            config.data.data_dir = dir;
        }
        if let Some(db) = self.db {
            config.data.db_path = db;
        }
    }
}

impl ModelArgs {
    fn apply(self, config: &mut CanyonConfig) {
        if let Some(provider) = self.provider {
            config.model = config.model.clone().with_provider(provider);
        }
        if let Some(model) = self.model {
            config.model = config.model.clone().with_model(model);
        }
        if let Some(url) = self.base_url {
            config.model.base_url = url;
        }
        if let Some(rounds) = self.max_rounds {
            config.agent.max_tool_rounds = rounds;
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(why) = run(Cli::parse()).await {
        tracing::error!(error = %why, "canyon failed");
        eprintln!("error: {why}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CanyonError> {
    let mut config = CanyonConfig::from_env()?;
    if let Some(path) = cli.log_file {
        config.log_file = Some(path);
    }

    let default_level = match cli.command {
        Command::Chat { .. } => "warn",
        _ => "info",
    };
    canyon::init_logging(default_level, config.log_file.as_deref())?;

    match cli.command {
        Command::Ingest {
            data,
            skip_existing,
        } => {
            data.apply(&mut config);
            let if_exists = if skip_existing {
                IfExists::Skip
            } else {
                IfExists::Replace
            };
            let report = ingest::ingest(&config.data, if_exists)?;
            let verb = if report.skipped { "kept" } else { "wrote" };
            println!(
                "{verb} {} feeds and {} column definitions in {}",
                report.feed_count,
                report.definition_count,
                report.db_path.display()
            );
        }
        Command::Chat { data, model } => {
            data.apply(&mut config);
            model.apply(&mut config);
            let agent = canyon::build_agent(&config)?;
            repl::run(&agent).await?;
        }
        Command::Ask {
            question,
            data,
            model,
        } => {
            data.apply(&mut config);
            model.apply(&mut config);
            let agent = canyon::build_agent(&config)?;
            let mut session = Session::new();
            let reply = agent
                .respond_with(&mut session, &question, repl::print_event)
                .await?;
            println!("{}", reply.answer);
        }
    }

    Ok(())
}
