//! civic-queue - Manage civic social posts from the command line

use std::io::{IsTerminal, Read};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use libcivicast::generation::{CopyGenerator, OpenAiGenerator};
use libcivicast::logging;
use libcivicast::provider::LateClient;
use libcivicast::scheduling::{format_timestamp, parse_schedule, parse_timestamp};
use libcivicast::service::events::{Event, EventBus};
use libcivicast::service::generation::{GenerateParams, GenerationService};
use libcivicast::service::history::HistoryService;
use libcivicast::service::orchestrator::{
    PostUpdate, RemoteSync, ScheduleRequest, SchedulingOrchestrator,
};
use libcivicast::{CivicastError, Config, Database, Platform, Post, PostQuery, PostStatus};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "civic-queue")]
#[command(version)]
#[command(about = "Generate, schedule and manage civic social posts")]
#[command(long_about = "\
civic-queue - Generate, schedule and manage civic social posts

DESCRIPTION:
    civic-queue drives the Civicast workflow from a terminal: generate copy
    variations, submit posts to the scheduling provider, and inspect or
    change the local post history.

USAGE EXAMPLES:
    # List the 20 most recent posts
    civic-queue list

    # Only scheduled Twitter/X and Facebook posts, as JSON
    civic-queue list --platform x,fb --status scheduled --format json

    # Publish now on Facebook
    civic-queue post \"The pool reopens today\" --platform facebook

    # Schedule on two platforms
    civic-queue post \"Town hall on the budget\" --platform twitter,linkedin --at \"tomorrow 3pm\"

    # Save a draft without contacting the provider
    echo \"Leaf pickup starts Monday\" | civic-queue post --platform facebook --draft

    # Change a scheduled post
    civic-queue edit <POST_ID> --content \"Updated text\" --at 2h

    # Generate variations
    civic-queue generate --title \"Park Opens\" --content \"New playground opens Saturday\" --platform twitter

CONFIGURATION:
    Configuration file: ~/.config/civicast/config.toml
    Database location:  ~/.local/share/civicast/posts.db

    Override with environment variables:
        CIVICAST_CONFIG    - Path to config file
        CIVICAST_DB_PATH   - Path to database file
        LATE_API_KEY       - Scheduling provider key (post, edit, delete, profiles)
        OPENAI_API_KEY     - Text generation key (generate)

EXIT CODES:
    0 - Success
    1 - Operation failed
    2 - Missing API key, configuration value or connected account
    3 - Invalid input (bad post ID, time format, published post, etc.)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List posts, newest first
    List {
        /// Platforms (comma-separated)
        #[arg(short, long)]
        platform: Option<String>,

        /// Statuses (comma-separated: draft, scheduled, published, failed)
        #[arg(short, long)]
        status: Option<String>,

        /// Case-insensitive content search
        #[arg(long)]
        search: Option<String>,

        /// Created at or after (RFC 3339)
        #[arg(long)]
        since: Option<String>,

        /// Created at or before (RFC 3339)
        #[arg(long)]
        until: Option<String>,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Show one post
    Show {
        post_id: String,
    },

    /// Show totals by status and platform
    Stats,

    /// List accounts connected at the scheduling provider
    Profiles,

    /// Submit a post (reads content from stdin if not provided)
    Post {
        content: Option<String>,

        /// Target platform(s) (comma-separated)
        #[arg(short, long)]
        platform: String,

        /// When to publish, e.g. "2h", "tomorrow 3pm" or an RFC 3339 time
        #[arg(long)]
        at: Option<String>,

        #[arg(long)]
        image_url: Option<String>,

        #[arg(long)]
        link: Option<String>,

        #[arg(long)]
        article_id: Option<String>,

        /// Save locally without contacting the provider
        #[arg(short, long)]
        draft: bool,
    },

    /// Change a post that is not yet published
    Edit {
        post_id: String,

        #[arg(long)]
        content: Option<String>,

        /// New publish time
        #[arg(long)]
        at: Option<String>,

        #[arg(long)]
        platform: Option<Platform>,

        #[arg(long)]
        image_url: Option<String>,

        #[arg(long)]
        link: Option<String>,

        /// Fail if the post changed since this version
        #[arg(long)]
        expected_version: Option<i64>,
    },

    /// Delete a post that is not yet published
    Delete {
        post_id: String,
    },

    /// Generate copy variations
    Generate {
        #[arg(long)]
        title: Option<String>,

        /// Source text (reads from stdin if neither this nor --article-id is given)
        #[arg(long)]
        content: Option<String>,

        #[arg(long)]
        article_id: Option<String>,

        /// Target platform(s) (comma-separated, default from config)
        #[arg(short, long)]
        platform: Option<String>,

        /// Variations per platform
        #[arg(short = 'n', long)]
        per_platform: Option<usize>,

        /// Extra instruction the generator must follow
        #[arg(long)]
        steer: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::LoggingConfig::new(
        logging::LogFormat::Text,
        "warn".to_string(),
        cli.verbose,
    )
    .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<CivicastError>()
        .map(CivicastError::exit_code)
        .unwrap_or(1)
}

fn invalid(message: impl Into<String>) -> CivicastError {
    CivicastError::InvalidInput(message.into())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!("Using database {}", config.database.path);
    let db = Arc::new(Database::new(&config.database.path).await?);
    let format = cli.format;

    match cli.command {
        Commands::List {
            platform,
            status,
            search,
            since,
            until,
            limit,
            offset,
        } => {
            let query = PostQuery {
                platforms: match platform {
                    Some(list) => Platform::parse_list(&list).map_err(invalid)?,
                    None => Vec::new(),
                },
                statuses: match status {
                    Some(list) => parse_statuses(&list)?,
                    None => Vec::new(),
                },
                search,
                since: since.as_deref().map(parse_timestamp).transpose()?,
                until: until.as_deref().map(parse_timestamp).transpose()?,
                article_id: None,
                limit,
                offset,
            };
            cmd_list(&history(&config, db), query, format).await
        }
        Commands::Show { post_id } => {
            let post = history(&config, db).get(&post_id).await?;
            match format {
                OutputFormat::Json => print_json(&post),
                OutputFormat::Text => {
                    print_post_detail(&post);
                    Ok(())
                }
            }
        }
        Commands::Stats => cmd_stats(&history(&config, db), format).await,
        Commands::Profiles => {
            let (orchestrator, _) = orchestrator(&config, db)?;
            let accounts = orchestrator
                .registry()
                .list()
                .await
                .map_err(CivicastError::from)?;
            match format {
                OutputFormat::Json => print_json(&accounts),
                OutputFormat::Text => {
                    for account in accounts {
                        println!(
                            "{} | {} | {} | {}",
                            account.platform,
                            account.external_id,
                            account.username.as_deref().unwrap_or("-"),
                            if account.is_active { "active" } else { "inactive" }
                        );
                    }
                    Ok(())
                }
            }
        }
        Commands::Post {
            content,
            platform,
            at,
            image_url,
            link,
            article_id,
            draft,
        } => {
            let content = content_or_stdin(content)?;
            let platforms = Platform::parse_list(&platform).map_err(invalid)?;
            let scheduled_for = at.as_deref().map(parse_schedule).transpose()?;
            let requests = platforms
                .into_iter()
                .map(|p| ScheduleRequest {
                    image_url: image_url.clone(),
                    link: link.clone(),
                    scheduled_for,
                    article_id: article_id.clone(),
                    draft,
                    ..ScheduleRequest::new(p, content.clone())
                })
                .collect();
            let (orchestrator, bus) = orchestrator(&config, db)?;
            cmd_post(&orchestrator, &bus, requests, format).await
        }
        Commands::Edit {
            post_id,
            content,
            at,
            platform,
            image_url,
            link,
            expected_version,
        } => {
            let update = PostUpdate {
                content,
                scheduled_for: at.as_deref().map(parse_schedule).transpose()?,
                platform,
                image_url: image_url.map(|s| Some(s).filter(|s| !s.is_empty())),
                link: link.map(|s| Some(s).filter(|s| !s.is_empty())),
                expected_version,
            };
            let (orchestrator, _) = orchestrator(&config, db)?;
            let outcome = orchestrator.update(&post_id, update).await?;
            match format {
                OutputFormat::Json => print_json(&outcome),
                OutputFormat::Text => {
                    println!("{} updated (version {})", outcome.post.id, outcome.post.version);
                    if let RemoteSync::Failed(e) = &outcome.remote {
                        eprintln!("Warning: provider copy not updated: {}", e);
                    }
                    Ok(())
                }
            }
        }
        Commands::Delete { post_id } => {
            let (orchestrator, _) = orchestrator(&config, db)?;
            let outcome = orchestrator.delete(&post_id).await?;
            match format {
                OutputFormat::Json => print_json(&outcome),
                OutputFormat::Text => {
                    println!("{} deleted", outcome.id);
                    if let RemoteSync::Failed(e) = &outcome.remote {
                        eprintln!("Warning: provider copy not deleted: {}", e);
                    }
                    Ok(())
                }
            }
        }
        Commands::Generate {
            title,
            content,
            article_id,
            platform,
            per_platform,
            steer,
        } => {
            let content = match (&content, &article_id) {
                (None, None) => Some(content_or_stdin(None)?),
                _ => content,
            };
            let params = GenerateParams {
                title,
                content,
                article_id,
                platforms: match platform {
                    Some(list) => Platform::parse_list(&list).map_err(invalid)?,
                    None => Vec::new(),
                },
                posts_per_platform: per_platform,
                prior_variations: Vec::new(),
                steering_prompt: steer,
            };
            let backend = OpenAiGenerator::from_config(&config.generation)?;
            let generator = CopyGenerator::new(
                Arc::new(backend),
                config.generation.clone(),
                config.default_platforms(),
            );
            let service = GenerationService::new(Arc::new(generator), db);
            let variations = service.generate(params).await?;
            match format {
                OutputFormat::Json => print_json(&variations),
                OutputFormat::Text => {
                    for (i, v) in variations.iter().enumerate() {
                        println!("[{}] {} / {}", i, v.platform.display_name(), v.angle);
                        println!("{}\n", v.text);
                    }
                    Ok(())
                }
            }
        }
    }
}

fn history(config: &Config, db: Arc<Database>) -> HistoryService {
    HistoryService::new(db, config.server.max_page_size)
}

/// Orchestrator backed by the configured provider, plus its event bus
fn orchestrator(
    config: &Config,
    db: Arc<Database>,
) -> libcivicast::Result<(SchedulingOrchestrator, EventBus)> {
    let provider = LateClient::from_config(&config.scheduling)?;
    let bus = EventBus::new(100);
    let orchestrator = SchedulingOrchestrator::new(db, Arc::new(provider), bus.clone());
    Ok((orchestrator, bus))
}

fn parse_statuses(list: &str) -> libcivicast::Result<Vec<PostStatus>> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<PostStatus>().map_err(invalid))
        .collect()
}

fn content_or_stdin(content: Option<String>) -> anyhow::Result<String> {
    if let Some(content) = content {
        return Ok(content);
    }
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Err(invalid("No content provided. Pass it as an argument or pipe it on stdin").into());
    }
    let mut buffer = String::new();
    stdin
        .lock()
        .read_to_string(&mut buffer)
        .context("Failed to read content from stdin")?;
    let content = buffer.trim_end().to_string();
    if content.trim().is_empty() {
        return Err(invalid("Content cannot be empty").into());
    }
    Ok(content)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_list(history: &HistoryService, query: PostQuery, format: OutputFormat) -> anyhow::Result<()> {
    let page = history.list(query).await?;
    if format == OutputFormat::Json {
        return print_json(&page);
    }

    for post in &page.posts {
        let when = post
            .scheduled_for
            .or(post.published_at)
            .map(format_timestamp)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} | {} | {} | {} | {}",
            post.id,
            post.platform,
            post.status,
            when,
            truncate_content(&post.content, 50)
        );
    }
    if page.total as usize > page.offset + page.posts.len() {
        eprintln!(
            "Showing {}-{} of {}",
            page.offset + 1,
            page.offset + page.posts.len(),
            page.total
        );
    }
    Ok(())
}

fn print_post_detail(post: &Post) {
    println!("ID:        {}", post.id);
    println!("Platform:  {}", post.platform.display_name());
    println!("Status:    {}", post.status);
    println!("Version:   {}", post.version);
    if let Some(at) = post.scheduled_for {
        println!("Scheduled: {}", format_timestamp(at));
    }
    if let Some(at) = post.published_at {
        println!("Published: {}", format_timestamp(at));
    }
    if let Some(id) = &post.external_post_id {
        println!("External:  {}", id);
    }
    if let Some(url) = &post.image_url {
        println!("Image:     {}", url);
    }
    if let Some(link) = &post.link {
        println!("Link:      {}", link);
    }
    if let Some(error) = &post.error_message {
        println!("Error:     {}", error);
    }
    println!("Created:   {}", format_timestamp(post.created_at));
    println!();
    println!("{}", post.content);
}

async fn cmd_stats(history: &HistoryService, format: OutputFormat) -> anyhow::Result<()> {
    let stats = history.stats().await?;
    if format == OutputFormat::Json {
        return print_json(&stats);
    }

    println!("Total:      {}", stats.total);
    println!("Published:  {}", stats.published);
    println!("Scheduled:  {}", stats.scheduled);
    println!("Drafts:     {}", stats.draft);
    println!("Failed:     {}", stats.failed);
    println!("Last 7 days: {}", stats.recent_posts);
    for (platform, count) in &stats.platform_counts {
        println!("  {:<10} {}", platform, count);
    }
    Ok(())
}

async fn cmd_post(
    orchestrator: &SchedulingOrchestrator,
    bus: &EventBus,
    requests: Vec<ScheduleRequest>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if requests.len() == 1 {
        let request = requests.into_iter().next().context("no platform given")?;
        let post = orchestrator.schedule_post(request).await?;
        return match format {
            OutputFormat::Json => print_json(&post),
            OutputFormat::Text => {
                println!("{} | {} | {}", post.id, post.platform, post.status);
                Ok(())
            }
        };
    }

    let progress = (format == OutputFormat::Text).then(|| spawn_progress(bus));
    let summary = orchestrator.schedule_batch(requests).await;
    if let Some(handle) = progress {
        // The listener stops on BatchCompleted
        let _ = handle.await;
    }

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => {
            for outcome in &summary.results {
                match (&outcome.post, &outcome.error) {
                    (Some(post), None) => {
                        println!("{} | {} | {}", post.id, post.platform, post.status)
                    }
                    (_, error) => println!(
                        "- | {} | failed: {}",
                        outcome.platform,
                        error.as_deref().unwrap_or("unknown error")
                    ),
                }
            }
            println!("{} succeeded / {} failed", summary.succeeded, summary.failed);
        }
    }

    if summary.failed > 0 {
        anyhow::bail!("{} of {} posts failed", summary.failed, summary.total);
    }
    Ok(())
}

/// Print batch progress to stderr until the batch completes
fn spawn_progress(bus: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::BatchStarted { total } => eprintln!("Submitting {} posts...", total),
                Event::ItemScheduled {
                    index, platform, ..
                } => eprintln!("  [{}] {} ok", index + 1, platform),
                Event::ItemFailed {
                    index,
                    platform,
                    error,
                } => eprintln!("  [{}] {} failed: {}", index + 1, platform, error),
                Event::BatchCompleted { .. } => break,
            }
        }
    })
}

/// Truncate content to `max_chars` characters with an ellipsis
fn truncate_content(content: &str, max_chars: usize) -> String {
    let line = content.lines().next().unwrap_or("");
    if line.chars().count() <= max_chars && line.len() == content.len() {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
