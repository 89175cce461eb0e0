//! Persona choices for the `/switchpersona` command
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Standard and random entries, catalog trimmed to the built-in prompts
//! - 1.0.0: Extracted from duplicated constants in command handlers

use super::manager::{RANDOM_PERSONA, STANDARD_PERSONA};
use serenity::builder::CreateApplicationCommandOption;

/// All selectable personas (display_name, id)
pub const PERSONA_CHOICES: &[(&str, &str)] = &[
    ("Standard", STANDARD_PERSONA),
    ("Random", RANDOM_PERSONA),
    ("Analyst", "analyst"),
    ("Chef", "chef"),
    ("Developer", "dev"),
    ("Noir Detective", "noir"),
    ("Teacher", "teacher"),
    ("Zen Master", "zen"),
];

/// Add all persona choices to a command option builder
pub fn add_persona_choices(option: &mut CreateApplicationCommandOption) {
    for (name, value) in PERSONA_CHOICES {
        option.add_string_choice(name, value);
    }
}

pub fn is_valid_persona(id: &str) -> bool {
    PERSONA_CHOICES.iter().any(|(_, pid)| *pid == id)
}
