//! General Discord commands - the leaderboard, ping and help.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::gate},
        core::{
            audit::{self, LogStatus},
            leaderboard,
        },
        errors::{Error, Result},
    };

    /// Returns the top 3 ballers
    ///
    /// Ranks users by how many times they've run `/balls`. The ranking is taken before
    /// this invocation is counted.
    #[poise::command(slash_command)]
    pub async fn balls(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        if !gate::ensure_whitelisted(ctx).await? {
            return Ok(());
        }

        let db = &ctx.data().database;
        let top = leaderboard::top_users(db, audit::BALLS, leaderboard::LEADERBOARD_SIZE).await?;
        ctx.say(leaderboard::format_leaderboard(&top)?).await?;

        gate::record(ctx, LogStatus::Completed(audit::BALLS)).await?;
        Ok(())
    }

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Jonas Help**\n\
        Here is a summary of all available commands.\n\n\
        • `/engrep <file>` - Turns a `.ship` file into an `.stl` model of the ship.\n\
        • `/resize <file>` - Resizes a `.png` to 256x256 and shrinks it for badge use.\n\
        • `/balls` - Shows the top 3 ballers.\n\
        • `/log` - Sends the command log to the bot owner.\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
