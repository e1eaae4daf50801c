mod orchestrator;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use birdwatch_core::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "birdwatch-cli")]
#[command(about = "Timeline capture and analysis pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Capture the timeline: screenshot, extract posts, persist.
    Capture,
    /// Analyze the newest timeline screenshot for trends and
    /// recommendations.
    Vision,
    /// Enrich unprocessed posts with summary, sentiment, and category.
    Enrich,
    /// Supervise the full pipeline on a jittered schedule, with the
    /// dashboard as a side process.
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = birdwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Capture => {
            let pool = connect(&config).await?;
            birdwatch_capture::run_capture(&config, &pool).await?;
        }
        Commands::Vision => {
            let pool = connect(&config).await?;
            birdwatch_vision::run_visual_insight(&config, &pool).await?;
        }
        Commands::Enrich => {
            let pool = connect(&config).await?;
            birdwatch_enrich::run_enrichment(&config, &pool).await?;
        }
        Commands::Run => orchestrator::run(config).await?,
    }

    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::SqlitePool> {
    let pool = birdwatch_db::connect_pool(
        &config.database_url,
        birdwatch_db::PoolConfig::from_app_config(config),
    )
    .await?;
    birdwatch_db::run_migrations(&pool).await?;
    Ok(pool)
}
