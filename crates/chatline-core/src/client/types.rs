use serde::{Deserialize, Serialize};

/// Body of `POST /chat` and `POST /chat/stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_input: String,
    pub model: String,
    pub temperature: f64,
}

/// Body of `POST /reset`.
///
/// The backend parses this body with its chat request model, which
/// requires `user_input`, so an empty one is always sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetRequest {
    pub model: String,
    #[serde(default)]
    pub user_input: String,
}

impl ResetRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            user_input: String::new(),
        }
    }
}

/// Response of the blocking `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    /// Seconds the backend spent producing the reply.
    pub elapsed_time: f64,
}

/// Response of `POST /reset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetReply {
    pub status: String,
    pub message: String,
}

impl ResetReply {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}
