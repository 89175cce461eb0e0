//! Registered user profile used to personalise replies

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub friends: Vec<String>,
    #[serde(default)]
    pub preferences: BTreeMap<String, String>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Greeting line placed under the quoted request
    pub fn greeting(&self) -> String {
        let mut greeting = format!("Hello {}", self.name);
        if !self.friends.is_empty() {
            greeting.push_str(&format!(", you have {} friends", self.friends.len()));
        }
        if !self.school.is_empty() {
            greeting.push_str(&format!(", your school is {}", self.school));
        }
        greeting.push_str("! ");
        greeting
    }

    /// Prefix the request with the user's stated preferences, if any
    pub fn augment_prompt(&self, text: &str) -> String {
        if self.preferences.is_empty() {
            return text.to_string();
        }
        let preferences = self
            .preferences
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>()
            .join("; ");
        format!("[Context about me - {preferences}]\n{text}")
    }

    /// Parse `key=value, key=value` preference input from the register command
    pub fn parse_preferences(input: &str) -> BTreeMap<String, String> {
        input
            .split(',')
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=')?;
                let key = key.trim();
                let value = value.trim();
                (!key.is_empty() && !value.is_empty()).then(|| (key.to_string(), value.to_string()))
            })
            .collect()
    }
}
