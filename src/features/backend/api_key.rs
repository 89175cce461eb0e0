//! API-key variant backed by the openai crate's chat completions.
//!
//! The conversation lives in this struct: the system prompt plus a bounded
//! window of user/assistant turns. Resetting throws all of it away and
//! rebuilds from the base prompt the session started with, so a persona
//! prompt applied on top does not survive a reset.

use super::{ChatBackend, ChatModel};
use crate::core::error::{mentions_content_policy, BackendError};
use async_trait::async_trait;
use log::debug;
use openai::chat::{ChatCompletion, ChatCompletionMessage, ChatCompletionMessageRole};

#[derive(Debug, Clone)]
pub struct ApiKeyBackend {
    engine: String,
    base_prompt: String,
    system_prompt: String,
    history: Vec<ChatCompletionMessage>,
    max_history: usize,
}

impl ApiKeyBackend {
    pub fn new(engine: impl Into<String>, system_prompt: &str, max_history: usize) -> Self {
        Self {
            engine: engine.into(),
            base_prompt: system_prompt.to_string(),
            system_prompt: system_prompt.to_string(),
            history: Vec::new(),
            max_history: max_history.max(2),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn message(role: ChatCompletionMessageRole, content: &str) -> ChatCompletionMessage {
        ChatCompletionMessage {
            role,
            content: Some(content.to_string()),
            name: None,
            function_call: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }

    /// System prompt (when set), the retained history, then the new turn
    fn request_messages(&self, text: &str) -> Vec<ChatCompletionMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if !self.system_prompt.trim().is_empty() {
            messages.push(Self::message(
                ChatCompletionMessageRole::System,
                &self.system_prompt,
            ));
        }
        messages.extend(self.history.iter().cloned());
        messages.push(Self::message(ChatCompletionMessageRole::User, text));
        messages
    }

    fn record_turn(&mut self, text: &str, reply: &str) {
        self.history
            .push(Self::message(ChatCompletionMessageRole::User, text));
        self.history
            .push(Self::message(ChatCompletionMessageRole::Assistant, reply));

        if self.history.len() > self.max_history {
            let excess = self.history.len() - self.max_history;
            // Drop whole user/assistant pairs from the front
            let excess = excess + excess % 2;
            self.history.drain(..excess.min(self.history.len()));
        }
    }
}

/// Map an OpenAI error payload onto the backend taxonomy
pub(crate) fn classify_openai_error(error_type: &str, code: Option<&str>, message: &str) -> BackendError {
    let detail = format!("{error_type}: {message}");
    let code = code.unwrap_or_default();

    if error_type == "authentication_error"
        || error_type == "permission_error"
        || code == "invalid_api_key"
    {
        return BackendError::auth(detail);
    }
    if code == "content_filter" || code == "content_policy_violation" || mentions_content_policy(message) {
        return BackendError::policy_rejected(detail);
    }
    BackendError::transport(detail)
}

#[async_trait]
impl ChatBackend for ApiKeyBackend {
    fn model(&self) -> ChatModel {
        ChatModel::ApiKey
    }

    async fn generate_reply(&mut self, text: &str) -> Result<String, BackendError> {
        let messages = self.request_messages(text);
        debug!(
            "Sending {} messages to {} via API key",
            messages.len(),
            self.engine
        );

        let completion = ChatCompletion::builder(&self.engine, messages)
            .create()
            .await
            .map_err(|e| classify_openai_error(&e.error_type, e.code.as_deref(), &e.message))?;

        let choice = completion
            .choices
            .first()
            .ok_or_else(|| BackendError::transport("No response from OpenAI"))?;

        if choice.finish_reason == "content_filter" {
            return Err(BackendError::policy_rejected(
                "completion stopped by content filter",
            ));
        }

        let reply = choice
            .message
            .content
            .clone()
            .filter(|content| !content.is_empty())
            .ok_or_else(|| BackendError::transport("OpenAI returned an empty message"))?;

        self.record_turn(text, &reply);
        Ok(reply)
    }

    async fn reset(&mut self) -> Result<(), BackendError> {
        *self = Self::new(self.engine.clone(), &self.base_prompt, self.max_history);
        Ok(())
    }

    async fn with_system_prompt(&self, prompt: &str) -> Result<Box<dyn ChatBackend>, BackendError> {
        Ok(Box::new(Self {
            engine: self.engine.clone(),
            base_prompt: self.base_prompt.clone(),
            system_prompt: prompt.to_string(),
            history: Vec::new(),
            max_history: self.max_history,
        }))
    }
}
