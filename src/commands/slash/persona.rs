//! Persona slash command: /switchpersona

use crate::features::personas::add_persona_choices;
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;

pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![create_switchpersona_command()]
}

fn create_switchpersona_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("switchpersona")
        .description("Switch between optional personas")
        .create_option(|option| {
            option
                .name("persona")
                .description("Persona to switch to")
                .kind(CommandOptionType::String)
                .required(true);
            add_persona_choices(option);
            option
        })
        .to_owned()
}
