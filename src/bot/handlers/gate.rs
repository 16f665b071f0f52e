//! Whitelist gate and outcome recording shared by the commands.

use crate::{
    bot::BotData,
    core::{
        access,
        audit::{self, LogStatus},
    },
    errors::{Error, Result},
};

/// Ephemeral reply for users the whitelist denies
pub const DENIED_REPLY: &str = "womp womp";

/// How the invoking user appears in the command log and leaderboard
#[must_use]
pub fn user_display(ctx: poise::Context<'_, BotData, Error>) -> String {
    ctx.author().tag()
}

/// Applies the whitelist gate to the current invocation.
///
/// Returns `Ok(false)` after replying and logging `not whitelisted` when the user is
/// denied; the caller should return immediately.
pub async fn ensure_whitelisted(ctx: poise::Context<'_, BotData, Error>) -> Result<bool> {
    let data = ctx.data();
    let guild_id = ctx.guild_id().map(|id| id.get());

    if access::is_permitted(&data.config, ctx.author().id.get(), guild_id).await? {
        return Ok(true);
    }

    tracing::info!(
        user = %ctx.author().id,
        command = %ctx.command().name,
        "Denied by whitelist"
    );
    ctx.send(
        poise::CreateReply::default()
            .content(DENIED_REPLY)
            .ephemeral(true),
    )
    .await?;
    record(ctx, LogStatus::NotWhitelisted).await?;
    Ok(false)
}

/// Writes the invocation's outcome to the command log (and the leaderboard index for
/// completions).
pub async fn record(ctx: poise::Context<'_, BotData, Error>, status: LogStatus) -> Result<()> {
    let data = ctx.data();
    audit::record_outcome(
        &data.command_log,
        &data.database,
        &user_display(ctx),
        &status,
    )
    .await
}
