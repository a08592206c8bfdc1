mod commands;
mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use feedwatch_graph::GraphClient;
use feedwatch_sync::{Mirror, MirrorSettings};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "feedwatch")]
#[command(about = "Incrementally mirror source feeds and their comment threads")]
struct Cli {
    /// Abort on the first unexpected API error instead of logging it.
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Restore state and mirror sources until interrupted (the default).
    Run,
    /// Crawl live posts, write the CSV exports, and exit.
    Export {
        /// Overrides `FEEDWATCH_POST_EXPORT_FILE`.
        #[arg(long)]
        posts: Option<PathBuf>,
        /// Overrides `FEEDWATCH_COMMENT_EXPORT_FILE`.
        #[arg(long)]
        comments: Option<PathBuf>,
    },
    /// Fetch one page from every source and fail if any is empty.
    CheckSources,
    /// Print how many API requests the restored state made in the last hour.
    Requests,
}

type SharedMirror = Arc<Mirror<GraphClient>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = feedwatch_core::load_app_config()?;
    config.strict |= cli.strict;
    let config = Arc::new(config);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, strict = config.strict, "feedwatch starting");

    let sources = feedwatch_core::load_sources(&config.sources_path)?;
    let client = GraphClient::from_config(&config)?;
    let settings = MirrorSettings::from_config(&config, sources.sources);
    let mirror: SharedMirror = Arc::new(Mirror::new(Arc::new(client), settings));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run_mirror(mirror, config).await,
        Commands::Export { posts, comments } => {
            let posts = posts.unwrap_or_else(|| config.post_export_file.clone());
            let comments = comments.unwrap_or_else(|| config.comment_export_file.clone());
            commands::run_export(&mirror, &config, &posts, &comments).await
        }
        Commands::CheckSources => commands::run_check_sources(&mirror).await,
        Commands::Requests => {
            commands::run_requests(&mirror, &config).await;
            Ok(())
        }
    }
}
