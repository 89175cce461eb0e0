//! Profile slash commands: /register, /unregister

use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;

pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![create_register_command(), create_unregister_command()]
}

fn create_register_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("register")
        .description("Tell the bot about yourself so replies can be personalised")
        .create_option(|option| {
            option
                .name("name")
                .description("What the bot should call you")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .create_option(|option| {
            option
                .name("school")
                .description("Your school")
                .kind(CommandOptionType::String)
                .required(false)
        })
        .create_option(|option| {
            option
                .name("friends")
                .description("Comma separated list of friends")
                .kind(CommandOptionType::String)
                .required(false)
        })
        .create_option(|option| {
            option
                .name("preferences")
                .description("key=value pairs, e.g. tone=casual, language=English")
                .kind(CommandOptionType::String)
                .required(false)
        })
        .to_owned()
}

fn create_unregister_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("unregister")
        .description("Delete your stored profile")
        .to_owned()
}
