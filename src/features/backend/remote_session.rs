//! Remote-session variant: the website's conversation endpoint, driven with an
//! access token. History lives server side and is addressed by
//! `conversation_id` + `parent_message_id`.

use super::{ChatBackend, ChatModel};
use crate::core::error::BackendError;
use async_trait::async_trait;
use log::{debug, warn};
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

/// Engine ids that the website knows under a different name
fn remote_model_name(engine: &str) -> String {
    match engine {
        "gpt-3.5-turbo" => "text-davinci-002-render-sha".to_string(),
        other => other.to_string(),
    }
}

pub struct RemoteSessionBackend {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    model: String,
    conversation_id: Option<String>,
    parent_message_id: String,
    /// Persona prompt sent as the first turn of the conversation. A reset
    /// drops it along with the remote history.
    pending_primer: Option<String>,
}

impl RemoteSessionBackend {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        engine: &str,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            model: remote_model_name(engine),
            conversation_id: None,
            parent_message_id: Uuid::new_v4().to_string(),
            pending_primer: None,
        })
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    fn fresh_like(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            access_token: self.access_token.clone(),
            model: self.model.clone(),
            conversation_id: None,
            parent_message_id: Uuid::new_v4().to_string(),
            pending_primer: None,
        }
    }

    /// One request/response turn against the conversation endpoint
    async fn exchange(&mut self, text: &str) -> Result<String, BackendError> {
        let body = json!({
            "action": "next",
            "messages": [{
                "id": Uuid::new_v4().to_string(),
                "role": "user",
                "author": { "role": "user" },
                "content": { "content_type": "text", "parts": [text] },
            }],
            "conversation_id": self.conversation_id,
            "parent_message_id": self.parent_message_id,
            "model": self.model,
        });

        let response = self
            .client
            .post(format!("{}/conversation", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::from_status(status.as_u16(), &payload));
        }

        let event = last_event(&payload)
            .ok_or_else(|| BackendError::transport("conversation response had no message"))?;

        let reply = event["message"]["content"]["parts"]
            .as_array()
            .and_then(|parts| parts.first())
            .and_then(Value::as_str)
            .ok_or_else(|| BackendError::transport("conversation message had no text part"))?
            .to_string();

        if let Some(id) = event["conversation_id"].as_str() {
            self.conversation_id = Some(id.to_string());
        }
        if let Some(id) = event["message"]["id"].as_str() {
            self.parent_message_id = id.to_string();
        }

        Ok(reply)
    }

    async fn send_pending_primer(&mut self) -> Result<(), BackendError> {
        if let Some(primer) = self.pending_primer.take() {
            debug!("Priming remote conversation with system prompt");
            if let Err(e) = self.exchange(&primer).await {
                self.pending_primer = Some(primer);
                return Err(e);
            }
        }
        Ok(())
    }
}

/// The response is either a JSON object or an event stream of `data:` lines
/// where each event carries the cumulative message. The last one wins.
fn last_event(payload: &str) -> Option<Value> {
    let trimmed = payload.trim();
    if trimmed.starts_with('{') {
        return serde_json::from_str(trimmed).ok();
    }

    trimmed
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|data| *data != "[DONE]")
        .filter_map(|data| serde_json::from_str::<Value>(data).ok())
        .filter(|event| event.get("message").map_or(false, |m| !m.is_null()))
        .last()
}

#[async_trait]
impl ChatBackend for RemoteSessionBackend {
    fn model(&self) -> ChatModel {
        ChatModel::RemoteSession
    }

    async fn generate_reply(&mut self, text: &str) -> Result<String, BackendError> {
        self.send_pending_primer().await?;
        self.exchange(text).await
    }

    /// Local state is always cleared. Hiding the old conversation on the
    /// website is best effort: a failed PATCH is logged and the reset still
    /// succeeds, since the next turn starts a new conversation either way.
    async fn reset(&mut self) -> Result<(), BackendError> {
        self.parent_message_id = Uuid::new_v4().to_string();
        self.pending_primer = None;

        let Some(conversation_id) = self.conversation_id.take() else {
            return Ok(());
        };

        let sent = self
            .client
            .patch(format!("{}/conversation/{}", self.base_url, conversation_id))
            .bearer_auth(&self.access_token)
            .json(&json!({ "is_visible": false }))
            .send()
            .await;

        match sent {
            Ok(response) if response.status().is_success() => {
                debug!("Hid remote conversation {conversation_id}");
            }
            Ok(response) => {
                warn!(
                    "Failed to hide remote conversation {conversation_id}: HTTP {}",
                    response.status()
                );
            }
            Err(e) => {
                warn!("Failed to hide remote conversation {conversation_id}: {e}");
            }
        }
        Ok(())
    }

    async fn with_system_prompt(&self, prompt: &str) -> Result<Box<dyn ChatBackend>, BackendError> {
        let mut fresh = self.fresh_like();
        fresh.pending_primer = (!prompt.trim().is_empty()).then(|| prompt.to_string());
        // Prime now so a bad prompt or dead session fails the switch, not the next request
        fresh.send_pending_primer().await?;
        Ok(Box::new(fresh))
    }
}
