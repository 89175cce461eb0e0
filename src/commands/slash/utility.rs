//! Utility slash command: /help

use serenity::builder::CreateApplicationCommand;

pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![CreateApplicationCommand::default()
        .name("help")
        .description("Show the available commands")
        .to_owned()]
}
