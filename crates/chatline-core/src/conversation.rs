//! Conversation transcript and the chat session controller.
//!
//! `ChatSession` is the single writer of the transcript. The UI calls
//! `begin_turn` before sending a request, feeds buffer snapshots through
//! `apply_update`, and closes the turn with `complete_turn` or
//! `fail_turn`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::{ChatRequest, ResetRequest};

const LANGUAGE_ADVISORY_MODEL: &str = "tinyllama";
const LANGUAGE_ADVISORY: &str = "tinyllama may answer in English only; choose mistral for better results in other languages.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Ordered list of messages with at most one assistant message streaming.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    streaming: Option<usize>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::new(Role::User, text));
    }

    /// Appends an empty assistant message and marks it as streaming.
    pub fn begin_assistant(&mut self) -> usize {
        self.messages.push(Message::new(Role::Assistant, ""));
        let index = self.messages.len() - 1;
        self.streaming = Some(index);
        index
    }

    /// Replaces the streaming message text with a longer snapshot.
    ///
    /// Snapshots that do not extend the current text are ignored.
    pub fn update_streaming(&mut self, text: &str) -> bool {
        let Some(message) = self.streaming.and_then(|i| self.messages.get_mut(i)) else {
            tracing::warn!("update for a conversation with no streaming message");
            return false;
        };
        if !text.starts_with(message.text.as_str()) {
            tracing::warn!(
                current = message.text.len(),
                update = text.len(),
                "ignoring update that does not extend the streaming message"
            );
            return false;
        }
        message.text.replace_range(.., text);
        true
    }

    /// Stops streaming; returns the index of the message that was streaming.
    pub fn finish_streaming(&mut self) -> Option<usize> {
        self.streaming.take()
    }

    pub fn streaming_index(&self) -> Option<usize> {
        self.streaming
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.streaming = None;
    }

    fn remove(&mut self, index: usize) {
        if index < self.messages.len() {
            self.messages.remove(index);
        }
    }

    fn set_text(&mut self, index: usize, text: String) {
        if let Some(message) = self.messages.get_mut(index) {
            message.text = text;
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("message is empty")]
    EmptyInput,
    #[error("a response is still streaming")]
    Busy,
    #[error("temperature must be between 0 and 1, got {0}")]
    Temperature(f64),
    #[error("model name is empty")]
    EmptyModel,
}

/// Owns the transcript and the request settings for one chat.
#[derive(Debug, Clone)]
pub struct ChatSession {
    conversation: Conversation,
    model: String,
    temperature: f64,
    busy: bool,
}

impl ChatSession {
    /// # Errors
    /// Returns an error if `model` is blank or `temperature` is out of range.
    pub fn new(model: impl Into<String>, temperature: f64) -> Result<Self, SessionError> {
        let mut session = Self {
            conversation: Conversation::new(),
            model: String::new(),
            temperature: 0.0,
            busy: false,
        };
        session.set_model(model)?;
        session.set_temperature(temperature)?;
        Ok(session)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Starts a turn and returns the request to send.
    ///
    /// The input is sent as typed; whitespace only decides whether it is
    /// blank.
    ///
    /// # Errors
    /// `EmptyInput` for blank input; `Busy` while a turn is in flight.
    pub fn begin_turn(&mut self, input: &str) -> Result<ChatRequest, SessionError> {
        if input.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }
        if self.busy {
            return Err(SessionError::Busy);
        }

        self.conversation.push_user(input);
        self.conversation.begin_assistant();
        self.busy = true;
        tracing::debug!(model = %self.model, chars = input.chars().count(), "turn started");

        Ok(ChatRequest {
            user_input: input.to_string(),
            model: self.model.clone(),
            temperature: self.temperature,
        })
    }

    /// Mirrors the latest buffer snapshot into the streaming message.
    pub fn apply_update(&mut self, buffer: &str) {
        if self.busy {
            self.conversation.update_streaming(buffer);
        }
    }

    /// Stores the final buffer and ends the turn.
    pub fn complete_turn(&mut self, text: String) {
        if !self.busy {
            return;
        }
        if let Some(index) = self.conversation.finish_streaming() {
            self.conversation.set_text(index, text);
        }
        self.busy = false;
    }

    /// Ends a failed turn, keeping whatever was received.
    ///
    /// An assistant message with nothing received is dropped; the user
    /// message stays.
    pub fn fail_turn(&mut self, partial: String) {
        if !self.busy {
            return;
        }
        if let Some(index) = self.conversation.finish_streaming() {
            if partial.is_empty() {
                self.conversation.remove(index);
            } else {
                self.conversation.set_text(index, partial);
            }
        }
        self.busy = false;
    }

    /// # Errors
    /// Returns `EmptyModel` for a blank name.
    pub fn set_model(&mut self, name: impl Into<String>) -> Result<(), SessionError> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyModel);
        }
        self.model = name.to_string();
        Ok(())
    }

    /// # Errors
    /// Returns `Temperature` unless `value` is finite and within `[0, 1]`.
    pub fn set_temperature(&mut self, value: f64) -> Result<(), SessionError> {
        validate_temperature(value)?;
        self.temperature = value;
        Ok(())
    }

    pub fn reset_request(&self) -> ResetRequest {
        ResetRequest::new(self.model.clone())
    }

    /// Clears the transcript. Call only after the backend confirmed the reset.
    pub fn apply_reset(&mut self) {
        self.conversation.clear();
        self.busy = false;
    }

    /// Advisory shown when the selected model has known limitations.
    pub fn model_notice(&self) -> Option<&'static str> {
        model_notice(&self.model)
    }
}

/// Advisory for `model`, if any.
pub fn model_notice(model: &str) -> Option<&'static str> {
    (model == LANGUAGE_ADVISORY_MODEL).then_some(LANGUAGE_ADVISORY)
}

/// # Errors
/// Returns `Temperature` unless `value` is finite and within `[0, 1]`.
pub fn validate_temperature(value: f64) -> Result<(), SessionError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SessionError::Temperature(value))
    }
}
