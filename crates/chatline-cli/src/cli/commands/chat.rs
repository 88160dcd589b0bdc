//! Chat command handler.

use anyhow::{Context, Result};
use chatline_core::client::ChatClient;
use chatline_core::config;

use crate::modes;

pub async fn run(config: &config::Config, client: ChatClient) -> Result<()> {
    modes::chat::run_chat(config, client)
        .await
        .context("interactive chat failed")
}
