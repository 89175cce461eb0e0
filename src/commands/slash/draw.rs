//! Image slash command: /draw

use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;

pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![create_draw_command()]
}

fn create_draw_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("draw")
        .description("Generate an image from a prompt")
        .create_option(|option| {
            option
                .name("prompt")
                .description("What to draw")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .create_option(|option| {
            option
                .name("size")
                .description("Image size")
                .kind(CommandOptionType::String)
                .required(false)
                .add_string_choice("Small (256x256)", "small")
                .add_string_choice("Medium (512x512)", "medium")
                .add_string_choice("Large (1024x1024)", "large")
        })
        .create_option(|option| {
            option
                .name("amount")
                .description("Number of images, 1 to 4")
                .kind(CommandOptionType::Integer)
                .required(false)
        })
        .to_owned()
}
