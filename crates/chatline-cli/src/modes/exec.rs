//! Single-shot exec mode.
//!
//! # Output contract
//! - The rendered answer goes to stdout (live-painted on a terminal).
//! - Advisories, timings and errors go to stderr.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use chatline_core::client::ChatClient;
use chatline_core::conversation::ChatSession;
use chatline_core::interrupt::{self, InterruptedError};
use chatline_core::render::render;
use chatline_term::{NoticeLevel, Theme, assistant_lines, notice_lines};

use super::turn::{TurnOutcome, failure_message, stream_turn};
use super::{install_cursor_restore, stdout_sink, terminal_size, write_lines};

/// Options for exec execution.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    pub prompt: String,
    /// Stream through `/chat/stream`; otherwise wait on `/chat`.
    pub stream: bool,
    pub theme: Theme,
}

/// Sends one prompt and prints the answer.
///
/// # Errors
/// Returns an error if the backend fails (after printing any partial
/// answer), or [`InterruptedError`] on Ctrl+C.
pub async fn run_exec(client: &ChatClient, session: &mut ChatSession, options: &ExecOptions) -> Result<()> {
    if io::stdout().is_terminal() {
        install_cursor_restore();
    }
    if let Some(advisory) = session.model_notice() {
        notice(NoticeLevel::Advisory, advisory)?;
    }

    if options.stream {
        run_streaming(client, session, options).await
    } else {
        run_blocking(client, session, options).await
    }
}

async fn run_streaming(
    client: &ChatClient,
    session: &mut ChatSession,
    options: &ExecOptions,
) -> Result<()> {
    let (width, _) = terminal_size();
    let mut sink = stdout_sink(options.theme);

    match stream_turn(client, session, &options.prompt, sink.as_mut(), width).await? {
        TurnOutcome::Completed => Ok(()),
        TurnOutcome::Cancelled => Err(InterruptedError.into()),
        TurnOutcome::Failed(error) => anyhow::bail!("{}", failure_message(&error)),
    }
}

async fn run_blocking(
    client: &ChatClient,
    session: &mut ChatSession,
    options: &ExecOptions,
) -> Result<()> {
    let request = session.begin_turn(&options.prompt)?;

    let reply = tokio::select! {
        reply = client.chat(&request) => reply,
        () = interrupt::wait_for_interrupt() => {
            session.fail_turn(String::new());
            return Err(InterruptedError.into());
        }
    };
    let reply = match reply {
        Ok(reply) => reply,
        Err(e) => {
            session.fail_turn(String::new());
            return Err(e).context("request failed");
        }
    };

    let (width, _) = terminal_size();
    let lines = assistant_lines(&render(&reply.response), width, false);
    let mut sink = stdout_sink(options.theme);
    sink.finish(&lines).context("print response")?;
    session.complete_turn(reply.response);

    notice(
        NoticeLevel::Info,
        &format!("Answered in {:.2}s", reply.elapsed_time),
    )
}

fn notice(level: NoticeLevel, text: &str) -> Result<()> {
    let (width, _) = terminal_size();
    write_lines(&mut io::stderr(), &notice_lines(level, text, width), None)?;
    Ok(())
}
