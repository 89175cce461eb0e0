//! Embed builders for Discord responses
//!
//! - **Version**: 2.0.0
//! - **Since**: 4.5.0
//!
//! ## Changelog
//! - 2.0.0: Image and help embeds for the relay commands
//! - 1.0.0: Extracted from duplicate implementations across command handlers

use serenity::builder::CreateEmbed;

pub const EMBED_DESCRIPTION_LIMIT: usize = 4096;
const ACCENT: u32 = 0x10A37F;

/// One generated image, titled with the prompt that produced it
pub fn image_embed(prompt: &str, url: &str, index: usize, total: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::default();
    embed.title(truncate_chars(prompt, 256));
    embed.image(url);
    embed.color(ACCENT);
    if total > 1 {
        embed.footer(|f| f.text(format!("Image {} of {}", index + 1, total)));
    }
    embed
}

/// Command list plus a snapshot of the session's modes
pub fn help_embed(commands: &[(&str, &str)], status: &[(&str, String)]) -> CreateEmbed {
    let description = commands
        .iter()
        .map(|(name, about)| format!("- `/{name}` {about}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut embed = CreateEmbed::default();
    embed.title("Commands");
    embed.description(truncate_chars(&description, EMBED_DESCRIPTION_LIMIT));
    embed.color(ACCENT);
    for (name, value) in status {
        embed.field(*name, value, true);
    }
    embed
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
