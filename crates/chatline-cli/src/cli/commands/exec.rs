//! Exec command handler.

use std::io::{IsTerminal, Read};

use anyhow::{Context, Result};
use chatline_core::client::ChatClient;
use chatline_core::config;
use chatline_core::conversation::ChatSession;
use chatline_term::Theme;

use crate::modes;

pub struct ExecRunOptions<'a> {
    pub config: &'a config::Config,
    pub client: ChatClient,
    /// Prompt text; stdin is read when absent.
    pub prompt: Option<&'a str>,
    pub stream: bool,
}

pub async fn run(options: ExecRunOptions<'_>) -> Result<()> {
    let prompt = match options.prompt {
        Some(prompt) => prompt.to_string(),
        None => read_piped_prompt()?,
    };
    if prompt.trim().is_empty() {
        anyhow::bail!("Prompt is empty");
    }

    let mut session = ChatSession::new(&options.config.model, options.config.temperature)
        .context("invalid chat settings")?;
    let exec_opts = modes::exec::ExecOptions {
        prompt,
        stream: options.stream,
        theme: Theme::new(options.config.theme),
    };

    modes::exec::run_exec(&options.client, &mut session, &exec_opts).await
}

fn read_piped_prompt() -> Result<String> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        anyhow::bail!("No prompt given; pass --prompt or pipe one on stdin");
    }
    let mut prompt = String::new();
    stdin
        .lock()
        .read_to_string(&mut prompt)
        .context("read prompt from stdin")?;
    // Drop the pipe's closing newline; leading indentation is content.
    let len = prompt.trim_end_matches(['\n', '\r']).len();
    prompt.truncate(len);
    Ok(prompt)
}
