//! Image generation command handler
//!
//! Handles: draw
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Renamed to /draw; typed errors, multiple images per request
//! - 1.0.0: Extracted from command_handler.rs

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::channel::AttachmentType;
use serenity::prelude::Context;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use crate::commands::context::{defer, respond, CommandContext, REPLY_ALL_REFUSAL};
use crate::commands::handler::SlashCommandHandler;
use crate::commands::slash::{get_integer_option, get_string_option};
use crate::core::embeds::image_embed;
use crate::features::image_gen::{GeneratedImage, ImageGenerator, ImageSize};

const MAX_IMAGES: i64 = 4;

const NOT_CONFIGURED: &str =
    "> **Warn: Image generation needs `OPENAI_API_KEY` to be configured.**";

/// Handler for `/draw`
pub struct DrawHandler;

#[async_trait]
impl SlashCommandHandler for DrawHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["draw"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        if ctx.session.is_reply_all() {
            return respond(&serenity_ctx.http, command, REPLY_ALL_REFUSAL, false).await;
        }
        let Some(generator) = ctx.image_generator.as_ref() else {
            return respond(&serenity_ctx.http, command, NOT_CONFIGURED, false).await;
        };

        let prompt = get_string_option(&command.data.options, "prompt")
            .ok_or_else(|| anyhow::anyhow!("Missing prompt parameter"))?;
        let size = get_string_option(&command.data.options, "size")
            .and_then(|s| ImageSize::parse(&s))
            .unwrap_or(ImageSize::Medium);
        let count = get_integer_option(&command.data.options, "amount")
            .unwrap_or(1)
            .clamp(1, MAX_IMAGES) as u8;

        info!(
            "Generating {count} image(s) | User: {} | Size: {} | Prompt: '{}'",
            command.user.id,
            size.as_str(),
            prompt.chars().take(100).collect::<String>()
        );

        // Image generation can take 10-30 seconds
        defer(&serenity_ctx.http, command, false).await?;

        let start_time = Instant::now();
        let images = match generator.generate(&prompt, size, count).await {
            Ok(images) => images,
            Err(e) => {
                error!("Image generation failed after {:?}: {e}", start_time.elapsed());
                command
                    .create_followup_message(&serenity_ctx.http, |m| m.content(e.user_message()))
                    .await?;
                return Ok(());
            }
        };
        info!("Images generated | Time: {:?}", start_time.elapsed());

        let total = images.len();
        for (index, image) in images.iter().enumerate() {
            send_image(serenity_ctx, command, generator, &prompt, image, index, total).await?;
        }

        info!("Images sent | Total time: {:?}", start_time.elapsed());
        Ok(())
    }
}

/// Post one image, attached when the download works, linked otherwise
async fn send_image(
    serenity_ctx: &Context,
    command: &ApplicationCommandInteraction,
    generator: &ImageGenerator,
    prompt: &str,
    image: &GeneratedImage,
    index: usize,
    total: usize,
) -> Result<()> {
    match generator.download(&image.url).await {
        Ok(bytes) => {
            debug!("Image downloaded | Size: {} bytes", bytes.len());
            let filename = attachment_name(index);
            let embed = image_embed(prompt, &format!("attachment://{filename}"), index, total);
            command
                .create_followup_message(&serenity_ctx.http, |m| {
                    m.add_file(AttachmentType::Bytes {
                        data: Cow::Owned(bytes),
                        filename,
                    })
                    .add_embed(embed)
                })
                .await?;
        }
        Err(e) => {
            warn!("Image download failed, linking instead: {e}");
            let embed = image_embed(prompt, &image.url, index, total);
            command
                .create_followup_message(&serenity_ctx.http, |m| m.add_embed(embed))
                .await?;
        }
    }
    Ok(())
}

fn attachment_name(index: usize) -> String {
    format!("image{}.png", index + 1)
}
