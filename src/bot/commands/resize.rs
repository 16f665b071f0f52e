//! Badge resize Discord command.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::gate},
        core::{
            audit::{self, LogStatus, RESIZE},
            badge,
            scratch::ScratchDir,
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use tracing::info;

    /// Inputs a .png and returns it resized and degraded
    #[poise::command(slash_command)]
    pub async fn resize(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "The .png file to resize"] file: serenity::Attachment,
    ) -> Result<()> {
        if !gate::ensure_whitelisted(ctx).await? {
            return Ok(());
        }

        if !badge::is_png_name(&file.filename) {
            ctx.say(badge::NOT_PNG_REPLY).await?;
            gate::record(
                ctx,
                LogStatus::Rejected {
                    command: RESIZE,
                    reason: badge::NOT_PNG_REASON,
                },
            )
            .await?;
            return Ok(());
        }

        ctx.defer().await?;

        let data = ctx.data();
        let user = gate::user_display(ctx);
        audit::record_failures(&data.command_log, &data.database, &user, RESIZE, async {
            let scratch = ScratchDir::create(&data.config.paths.scratch_dir, RESIZE)?;
            let bytes = file.download().await?;
            let input = scratch.stage(&file.filename, &bytes).await?;
            let output = scratch.file(&badge::output_name(&file.filename));

            let outcome =
                badge::resize_badge(input, output.clone(), data.config.resize.clone()).await?;
            info!(
                file = %file.filename,
                quality = outcome.quality,
                colors = outcome.colors,
                bytes = outcome.bytes,
                "Badge resized"
            );

            let attachment = serenity::CreateAttachment::path(&output).await?;
            ctx.send(poise::CreateReply::default().attachment(attachment))
                .await?;
            Ok::<_, Error>(())
        })
        .await?;

        gate::record(ctx, LogStatus::Completed(RESIZE)).await?;

        Ok(())
    }
}

pub use inner::*;
