//! webrag CLI
//!
//! Main entry point for the webrag command-line tool: answers a question
//! from live web search results.

mod commands;
mod error_log;

use clap::Parser;
use commands::AskCommand;
use std::path::PathBuf;
use std::process::ExitCode;
use webrag_core::{
    config::{AppConfig, ConfigOverrides},
    logging::{self, LogFormat},
    ReducerStrategy,
};

/// webrag - answer questions from live web search results
#[derive(Parser, Debug)]
#[command(name = "webrag")]
#[command(about = "Answer questions from live web search results", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, env = "WEBRAG_CONFIG")]
    config: Option<PathBuf>,

    /// Search backend base URL
    #[arg(long)]
    search_url: Option<String>,

    /// Number of search results to read
    #[arg(short = 'n', long)]
    num_urls: Option<usize>,

    /// LLM provider (openai, ollama)
    #[arg(short, long)]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long)]
    model: Option<String>,

    /// Stream the answer from the model
    #[arg(long, conflicts_with = "no_stream")]
    stream: bool,

    /// Disable streaming
    #[arg(long)]
    no_stream: bool,

    /// Content reduction strategy (truncate, semantic)
    #[arg(long)]
    strategy: Option<ReducerStrategy>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Log line format (pretty, json)
    #[arg(long, default_value = "pretty")]
    log_format: String,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// File receiving the last fatal error
    #[arg(long, default_value = "error_log.txt", env = "WEBRAG_ERROR_LOG")]
    error_log: PathBuf,

    #[command(flatten)]
    ask: AskCommand,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let stream = match (self.stream, self.no_stream) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };

        ConfigOverrides {
            config_file: self.config.clone(),
            search_url: self.search_url.clone(),
            num_urls: self.num_urls,
            provider: self.provider.clone(),
            model: self.model.clone(),
            stream,
            strategy: self.strategy,
            log_level: self.log_level.clone(),
            verbose: self.verbose,
            no_color: self.no_color,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Environment from .env before anything reads it
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = error_log::reset(&cli.error_log) {
        eprintln!("{:#}", e);
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {:#}", e);
            if let Err(log_error) = error_log::record(&cli.error_log, &format!("{:#}", e)) {
                eprintln!("{:#}", log_error);
            }
            eprintln!(
                "An error occurred. Check {} for details.",
                cli.error_log.display()
            );
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    // Load base configuration from the file and environment
    let config = AppConfig::load_with(cli.config.as_deref(), |name| std::env::var(name).ok())?;

    // Apply CLI overrides
    let config = config.with_overrides(cli.overrides());

    let format = LogFormat::parse(&cli.log_format).unwrap_or_default();
    logging::init_logging(config.log_level.as_deref(), config.no_color, format)?;

    tracing::info!("webrag starting");
    tracing::debug!("Search backend: {}", config.search.base_url);
    tracing::debug!("Provider: {} ({})", config.llm.provider, config.llm.model);
    tracing::debug!("Reducer: {:?}", config.reducer.strategy);

    config.validate()?;

    let _span = tracing::info_span!("command", name = "ask").entered();
    cli.ask.execute(&config).await?;

    tracing::info!("Command completed successfully");
    Ok(())
}
