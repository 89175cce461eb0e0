//! Chat slash commands: /chat, /private, /public, /replyall, /chat-model, /reset

use crate::features::backend::ChatModel;
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;

pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![
        create_chat_command(),
        simple("private", "Toggle private access"),
        simple("public", "Toggle public access"),
        simple("replyall", "Toggle between reply-all mode and slash-command-only mode"),
        create_chat_model_command(),
        simple("reset", "Complete reset of the conversation history"),
    ]
}

fn simple(name: &str, description: &str) -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(name)
        .description(description)
        .to_owned()
}

fn create_chat_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("chat")
        .description("Have a chat with the bot")
        .create_option(|option| {
            option
                .name("message")
                .description("What you want to say")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .to_owned()
}

fn create_chat_model_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("chat-model")
        .description("Switch between the chat backends")
        .create_option(|option| {
            option
                .name("choice")
                .description("Backend to use")
                .kind(CommandOptionType::String)
                .required(true)
                .add_string_choice("Official API (API key)", ChatModel::ApiKey.as_str())
                .add_string_choice(
                    "Website ChatGPT (access token)",
                    ChatModel::RemoteSession.as_str(),
                )
        })
        .to_owned()
}
