//! Poise framework setup and client startup.

use crate::{
    bot::{BotData, commands},
    config::BotConfig,
    errors::Error,
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::{env, sync::Arc};
use tracing::{error, info, instrument, warn};

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
            if let Err(e) = ctx.say(error.user_reply()).await {
                error!("Failed to send error message: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Guild to register commands in instead of globally, read from `DEV_GUILD_ID`.
fn dev_guild() -> Option<serenity::GuildId> {
    let raw = env::var("DEV_GUILD_ID").ok()?;
    match raw.trim().parse::<std::num::NonZeroU64>() {
        Ok(id) => Some(serenity::GuildId::from(id)),
        Err(e) => {
            warn!("Ignoring DEV_GUILD_ID={raw:?}: {e}");
            None
        }
    }
}

/// Builds the framework and runs the client until it disconnects.
#[instrument(skip(token, config, database))]
pub async fn run_bot(
    token: String,
    config: Arc<BotConfig>,
    database: DatabaseConnection,
) -> Result<(), serenity::Error> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::engrep(),
                commands::resize(),
                commands::balls(),
                commands::export_log(),
                commands::ping(),
                commands::help(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                let commands = &framework.options().commands;
                if let Some(guild_id) = dev_guild() {
                    poise::builtins::register_in_guild(ctx, commands, guild_id).await?;
                    info!("Registered {} commands in guild {}", commands.len(), guild_id);
                } else {
                    poise::builtins::register_globally(ctx, commands).await?;
                    info!("Registered {} commands globally", commands.len());
                }
                Ok(BotData::new(config, database))
            })
        })
        .build();

    // Slash commands and attachments need no privileged intents.
    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {:?}", e))
}
