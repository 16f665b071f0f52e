//! Log export Discord command - DMs the command log to the bot owner.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::gate},
        core::{
            access,
            audit::{LOG, LogStatus},
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use tracing::warn;

    /// File name the log is delivered under
    const LOG_ATTACHMENT_NAME: &str = "command_log.txt";

    async fn send_log_to_owner(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let contents = tokio::fs::read(data.command_log.path()).await?;
        let attachment = serenity::CreateAttachment::bytes(contents, LOG_ATTACHMENT_NAME);

        serenity::UserId::new(data.config.access.owner_id)
            .direct_message(
                ctx.serenity_context(),
                serenity::CreateMessage::new().add_file(attachment),
            )
            .await?;
        Ok(())
    }

    /// Sends the command log
    #[poise::command(slash_command, rename = "log")]
    pub async fn export_log(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let guild_id = ctx.guild_id().map(|id| id.get());

        if !access::may_export_log(&data.config, ctx.author().id.get(), guild_id).await? {
            ctx.send(
                poise::CreateReply::default()
                    .content("You don't have permission to use this command.")
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }

        match send_log_to_owner(ctx).await {
            Ok(()) => {
                ctx.send(
                    poise::CreateReply::default()
                        .content("Log file sent.")
                        .ephemeral(true),
                )
                .await?;
                gate::record(ctx, LogStatus::Completed(LOG)).await?;
            }
            Err(e) => {
                warn!("Failed to send log file: {}", e);
                ctx.say(format!("Failed to send log file: {e}")).await?;
            }
        }

        Ok(())
    }
}

pub use inner::*;
