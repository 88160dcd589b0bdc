//! Reset command handler.

use anyhow::{Context, Result};
use chatline_core::client::{ChatClient, ResetRequest};
use chatline_core::config;

pub async fn run(config: &config::Config, client: &ChatClient) -> Result<()> {
    let request = ResetRequest::new(config.model.trim());
    if request.model.is_empty() {
        anyhow::bail!("Model name is empty");
    }

    let reply = client
        .reset(&request)
        .await
        .with_context(|| format!("reset conversation for {}", request.model))?;
    if !reply.is_ok() {
        anyhow::bail!("Reset failed: {}", reply.message);
    }

    println!("{}", reply.message);
    Ok(())
}
