use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use canvas_notion_sync::api::router;
use canvas_notion_sync::canvas::CanvasHttpClient;
use canvas_notion_sync::config::AppConfig;
use canvas_notion_sync::error::AppError;
use canvas_notion_sync::notion::{NotionAuth, NotionConfig, NotionHttpClient, oauth};
use canvas_notion_sync::services::{SyncScheduler, SyncService};
use canvas_notion_sync::state::AppState;

/// Mirror Canvas assignments into a Notion database.
#[derive(Parser)]
#[command(name = "canvas-notion-sync", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync and print the summary.
    Sync,
    /// Sync now, then again every interval until interrupted.
    Watch {
        /// Seconds between runs (defaults to SYNC_INTERVAL_SECS).
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Serve the HTTP API with the scheduler running in the background.
    Serve {
        /// Listen address (defaults to BIND_ADDR).
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Authorize the Notion public integration and save the token file.
    Authorize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "canvas_notion_sync=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        // Authorization needs only the Notion settings.
        Commands::Authorize => authorize().await?,
        command => run(command).await?,
    }

    Ok(())
}

async fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    match command {
        Commands::Sync => {
            let service = build_service(&config).await?;
            let summary = service.sync_all().await?;

            println!("Total assignments processed: {}", summary.total);
            println!("New assignments created: {}", summary.created);
            println!("Assignments updated: {}", summary.updated);
            println!("Assignments failed: {}", summary.failed);
            if summary.scopes_failed > 0 {
                println!("Courses skipped: {}", summary.scopes_failed);
            }

            match service.pending_count().await {
                Ok(pending) => println!("{} assignments still pending", pending),
                Err(e) => warn!("Could not count pending assignments: {}", e),
            }
        }
        Commands::Watch { interval } => {
            let service = build_service(&config).await?;
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or(config.sync.interval);
            SyncScheduler::new(service, interval).start().await;
        }
        Commands::Serve { bind } => {
            let service = build_service(&config).await?;
            let scheduler = SyncScheduler::new(service.clone(), config.sync.interval);
            tokio::spawn(scheduler.start());

            let app = router(AppState { sync: service });

            let addr = bind.unwrap_or(config.sync.bind_addr);
            info!("listening on http://{}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
        Commands::Authorize => authorize().await?,
    }

    Ok(())
}

async fn authorize() -> Result<(), AppError> {
    let notion = NotionConfig::from_lookup(&|key: &str| std::env::var(key).ok())?;
    let NotionAuth::OAuth(oauth_config) = &notion.auth else {
        return Err(AppError::Config(
            "authorize needs NOTION_CLIENT_ID and NOTION_CLIENT_SECRET instead of NOTION_TOKEN"
                .to_string(),
        ));
    };

    let client = reqwest::Client::new();
    oauth::authorize(&client, &notion.api_base, oauth_config).await?;
    println!("Saved tokens to {}", oauth_config.token_file.display());
    Ok(())
}

async fn build_service(config: &AppConfig) -> Result<Arc<SyncService>, AppError> {
    let canvas = Arc::new(CanvasHttpClient::new(config.canvas.clone())?);
    let notion = Arc::new(NotionHttpClient::new(config.notion.clone()).await?);

    Ok(Arc::new(SyncService::new(
        canvas,
        notion,
        config.canvas.course_ids.clone(),
        config.sync.pace,
    )))
}
