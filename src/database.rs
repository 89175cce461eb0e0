//! SQLite store for registered user profiles

use crate::core::profile::UserProfile;
use anyhow::Result;
use log::info;
use sqlite::{Connection, State};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    pub async fn new(database_path: &str) -> Result<Self> {
        let connection = sqlite::open(database_path)?;
        let db = Database {
            connection: Arc::new(Mutex::new(connection)),
        };

        db.init_tables().await?;
        info!("Database initialized at: {database_path}");
        Ok(db)
    }

    async fn init_tables(&self) -> Result<()> {
        let conn = self.connection.lock().await;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_profiles (
                user_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                school TEXT NOT NULL DEFAULT '',
                friends TEXT NOT NULL DEFAULT '[]',
                preferences TEXT NOT NULL DEFAULT '{}',
                updated_at TEXT NOT NULL
            )",
        )?;

        Ok(())
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(
            "SELECT name, school, friends, preferences FROM user_profiles WHERE user_id = ?",
        )?;
        statement.bind((1, user_id))?;

        if let State::Row = statement.next()? {
            let friends: Vec<String> =
                serde_json::from_str(&statement.read::<String, _>("friends")?).unwrap_or_default();
            let preferences: BTreeMap<String, String> =
                serde_json::from_str(&statement.read::<String, _>("preferences")?)
                    .unwrap_or_default();
            Ok(Some(UserProfile {
                user_id: user_id.to_string(),
                name: statement.read::<String, _>("name")?,
                school: statement.read::<String, _>("school")?,
                friends,
                preferences,
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        let friends = serde_json::to_string(&profile.friends)?;
        let preferences = serde_json::to_string(&profile.preferences)?;
        let updated_at = chrono::Utc::now().to_rfc3339();

        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(
            "INSERT OR REPLACE INTO user_profiles (user_id, name, school, friends, preferences, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        statement.bind((1, profile.user_id.as_str()))?;
        statement.bind((2, profile.name.as_str()))?;
        statement.bind((3, profile.school.as_str()))?;
        statement.bind((4, friends.as_str()))?;
        statement.bind((5, preferences.as_str()))?;
        statement.bind((6, updated_at.as_str()))?;
        statement.next()?;

        info!("Stored profile for user {}", profile.user_id);
        Ok(())
    }

    pub async fn delete_profile(&self, user_id: &str) -> Result<bool> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare("DELETE FROM user_profiles WHERE user_id = ?")?;
        statement.bind((1, user_id))?;
        statement.next()?;
        drop(statement);
        Ok(conn.change_count() > 0)
    }
}
