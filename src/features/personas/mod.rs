//! # Personas Feature
//!
//! Named system prompts and the switch protocol that applies them to the
//! active chat backend.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Switching goes through the active backend
//! - 1.0.0: Initial release

pub mod choices;
pub mod manager;

pub use choices::{add_persona_choices, is_valid_persona, PERSONA_CHOICES};
pub use manager::{
    Persona, PersonaCatalog, PersonaManager, PersonaSwitch, RANDOM_PERSONA, STANDARD_PERSONA,
};
