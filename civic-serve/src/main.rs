//! civic-serve - HTTP JSON API for generating and scheduling civic social posts

use std::sync::Arc;

use clap::Parser;
use civic_serve::AppState;
use libcivicast::logging::{self, LogFormat};
use libcivicast::service::CivicastService;
use libcivicast::Config;

#[derive(Parser, Debug)]
#[command(name = "civic-serve")]
#[command(version)]
#[command(about = "Serve the Civicast generation and scheduling API over HTTP")]
#[command(long_about = "\
civic-serve - Serve the Civicast generation and scheduling API over HTTP

DESCRIPTION:
    Exposes copy generation, curation sessions, scheduling and post history
    as JSON endpoints for an operator UI. Curation sessions are kept in
    memory and are lost on restart; posts are stored in the local database.

CONFIGURATION:
    Configuration file: ~/.config/civicast/config.toml
    Database location:  ~/.local/share/civicast/posts.db

    Environment variables:
        CIVICAST_CONFIG      - Path to config file
        CIVICAST_DB_PATH     - Path to database file
        CIVICAST_LOG_FORMAT  - text, json or pretty
        CIVICAST_LOG_LEVEL   - Default log level (info)
        LATE_API_KEY         - Scheduling provider key
        OPENAI_API_KEY       - Text generation key

EXIT CODES:
    0 - Clean shutdown
    1 - Server failed
    2 - Missing API key or configuration value
    3 - Invalid input
")]
struct Cli {
    /// Address to listen on, overriding server.bind
    #[arg(short, long, env = "CIVICAST_BIND")]
    bind: Option<String>,

    /// Log output format
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut logging_config = logging::from_env(cli.verbose);
    if let Some(format) = cli.log_format {
        logging_config.format = format;
    }
    logging_config.init();

    if let Err(code) = run(cli).await {
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<(), i32> {
    let config = Config::load().map_err(report)?;
    let bind = cli.bind.unwrap_or_else(|| config.server.bind.clone());

    let service = CivicastService::from_config(config).await.map_err(report)?;
    let state = Arc::new(AppState::new(service));

    civic_serve::serve(&bind, state).await.map_err(|e| {
        eprintln!("Error: {:#}", e);
        1
    })
}

fn report(error: libcivicast::CivicastError) -> i32 {
    eprintln!("Error: {}", error);
    error.exit_code()
}
