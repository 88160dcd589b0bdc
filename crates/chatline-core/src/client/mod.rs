//! HTTP client for the chat backend.
//!
//! Three endpoints: `POST /chat/stream` (plain-text body streamed as the
//! model generates), `POST /chat` (blocking JSON reply) and `POST /reset`
//! (drops the backend's per-model history).

mod decode;
mod error;
mod types;

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use self::decode::{Utf8Decoder, decode_stream};
pub use self::error::{BackendError, BackendErrorKind, classify_reqwest_error};
pub use self::types::{ChatReply, ChatRequest, ResetReply, ResetRequest};
use crate::config::Config;
use crate::conversation::validate_temperature;

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!("chatline/", env!("CARGO_PKG_VERSION"));

/// Text fragments of one streamed response.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Connection settings for [`ChatClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Resolves settings with precedence: explicit override > env > config.
    ///
    /// # Errors
    /// Returns an error if the resulting base URL is not a valid URL.
    pub fn resolve(config: &Config, base_url_override: Option<&str>) -> Result<Self> {
        let base_url = match base_url_override.map(str::trim).filter(|s| !s.is_empty()) {
            Some(url) => url.to_string(),
            None => config.effective_base_url(),
        };
        validate_url(&base_url)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
        })
    }
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url).with_context(|| format!("Invalid backend URL: {url}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("Invalid backend URL: {url} (expected http or https)");
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Opens a streamed response for `request`.
    ///
    /// # Errors
    /// Returns an error for an invalid temperature, a failed connection or
    /// a non-2xx status. Failures while reading the body arrive through
    /// the returned stream.
    pub async fn stream_chat(&self, request: &ChatRequest) -> Result<FragmentStream> {
        validate_temperature(request.temperature)?;

        let response = self.post("/chat/stream", request).await?;
        tracing::debug!(model = %request.model, "response stream opened");

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| classify_reqwest_error(&e)));
        Ok(decode_stream(bytes).boxed())
    }

    /// Sends `request` to the blocking endpoint.
    ///
    /// # Errors
    /// Returns an error for an invalid temperature, a transport failure,
    /// a non-2xx status or an unexpected body.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        validate_temperature(request.temperature)?;
        let reply: ChatReply = self.post_json("/chat", request).await?;
        tracing::debug!(
            model = %request.model,
            elapsed = reply.elapsed_time,
            "blocking reply received"
        );
        Ok(reply)
    }

    /// Asks the backend to forget the history for a model.
    ///
    /// # Errors
    /// Returns an error for a transport failure, a non-2xx status or an
    /// unexpected body.
    pub async fn reset(&self, request: &ResetRequest) -> Result<ResetReply> {
        let reply: ResetReply = self.post_json("/reset", request).await?;
        tracing::info!(model = %request.model, status = %reply.status, "conversation reset");
        Ok(reply)
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = self.url(path);
        tracing::trace!(%url, "POST");

        let response = self
            .http
            .post(&url)
            .header("accept", "*/*")
            .json(body)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(%url, status = status.as_u16(), "backend returned an error status");
            return Err(BackendError::http_status(status.as_u16(), &error_body).into());
        }
        Ok(response)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.post(path, body).await?;
        let text = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        serde_json::from_str(&text).map_err(|e| {
            let mut err = BackendError::parse(format!("Unexpected response from {path}: {e}"));
            err.details = Some(text);
            err.into()
        })
    }
}
