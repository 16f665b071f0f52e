use dotenvy::dotenv;
use jonas::{
    bot,
    config::{self, database},
    core::{audit::CommandLog, leaderboard},
    errors::{Error, Result},
};
use std::{env, sync::Arc};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();

    // 3. Load settings (config.toml, then env overrides)
    let config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Open the leaderboard index
    let database = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&database).await?;

    // 5. Seed the index from the command log on first run
    let entries = CommandLog::new(config.paths.command_log.clone())
        .read_entries()
        .await?;
    leaderboard::rebuild_from_log(&database, &entries).await?;

    // 6. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {}", e))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, Arc::new(config), database)
        .await
        .map_err(Error::from)?;

    Ok(())
}
