//! Ship-to-mesh Discord command.
//!
//! Stages the uploaded `.ship` file in a fresh scratch directory, runs the engrep
//! pipeline, and uploads the composed STL. The scratch directory (upload, driver
//! files, mesh) is removed when the command returns, on every path, and any failing
//! step after the name check is written to the command log.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::gate},
        core::{
            audit::{self, ENGREP, LogStatus},
            engrep::{self, EngrepOutcome},
            scratch::ScratchDir,
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use tracing::info;

    /// Inputs a .ship file and returns a .stl file
    #[poise::command(slash_command)]
    pub async fn engrep(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "The .ship file to convert"] file: serenity::Attachment,
    ) -> Result<()> {
        if !gate::ensure_whitelisted(ctx).await? {
            return Ok(());
        }

        // Disallowed extensions never get downloaded.
        if let Some(rejection) = engrep::check_upload(&file.filename) {
            ctx.say(rejection.reply()).await?;
            gate::record(
                ctx,
                LogStatus::Rejected {
                    command: ENGREP,
                    reason: rejection.log_reason(),
                },
            )
            .await?;
            return Ok(());
        }

        // Blender can take a while; acknowledge before the interaction times out.
        ctx.defer().await?;

        let data = ctx.data();
        let user = gate::user_display(ctx);
        let work = async {
            let scratch = ScratchDir::create(&data.config.paths.scratch_dir, ENGREP)?;
            let bytes = file.download().await?;
            let ship_path = scratch.stage(&file.filename, &bytes).await?;
            info!(file = %file.filename, size = bytes.len(), "Converting ship");

            let outcome =
                engrep::run_engrep(&data.config.paths, &data.composer, &ship_path, scratch.path())
                    .await?;
            let status = match outcome {
                EngrepOutcome::Rejected(rejection) => {
                    ctx.say(rejection.reply()).await?;
                    LogStatus::Rejected {
                        command: ENGREP,
                        reason: rejection.log_reason(),
                    }
                }
                EngrepOutcome::Mesh(mesh) => {
                    let attachment = serenity::CreateAttachment::path(&mesh.path).await?;
                    ctx.send(poise::CreateReply::default().attachment(attachment))
                        .await?;
                    LogStatus::Completed(ENGREP)
                }
            };
            Ok::<_, Error>(status)
        };
        let status =
            audit::record_failures(&data.command_log, &data.database, &user, ENGREP, work).await?;

        gate::record(ctx, status).await?;
        Ok(())
    }
}

pub use inner::*;
