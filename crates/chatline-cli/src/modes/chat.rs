//! Interactive chat REPL.
//!
//! Lines starting with `:` are commands; everything else is sent as a
//! message. Answers stream inline below the prompt. When stdout is not a
//! terminal the prompt and colors are dropped and notices go to stderr,
//! so the REPL can be scripted through a pipe.

use std::io::{self, BufRead, IsTerminal, Write};
use std::thread;

use anyhow::{Context, Result};
use chatline_core::client::ChatClient;
use chatline_core::config::{Config, ThemeKind};
use chatline_core::conversation::ChatSession;
use chatline_core::interrupt::{self, InterruptedError};
use chatline_term::transcript::PROMPT_PREFIX;
use chatline_term::{NoticeLevel, Style, StyledLine, Theme, notice_lines, user_lines};
use tokio::sync::mpsc;

use super::turn::{TurnOutcome, failure_message, stream_turn};
use super::{install_cursor_restore, stdout_sink, terminal_size, write_lines};

const HELP: &[(&str, &str)] = &[
    (":q, :quit", "leave the chat"),
    (":reset", "clear the conversation here and on the backend"),
    (":model [name]", "show or switch the model"),
    (":models", "list configured models"),
    (":temp [0..1]", "show or set the temperature"),
    (":theme", "toggle between dark and light colors"),
    (":help", "show this help"),
];

/// A parsed `:` command.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Quit,
    Reset,
    Model(Option<String>),
    Models,
    Temperature(Option<String>),
    Theme,
    Help,
    Unknown(String),
}

impl ReplCommand {
    /// Parses a line starting with `:`; other lines are messages.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.trim().strip_prefix(':')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim().to_string()).filter(|a| !a.is_empty())),
            None => (rest, None),
        };

        Some(match name {
            "q" | "quit" | "exit" => ReplCommand::Quit,
            "reset" => ReplCommand::Reset,
            "model" => ReplCommand::Model(arg),
            "models" => ReplCommand::Models,
            "temp" | "temperature" => ReplCommand::Temperature(arg),
            "theme" => ReplCommand::Theme,
            "help" | "h" | "?" => ReplCommand::Help,
            other => ReplCommand::Unknown(other.to_string()),
        })
    }
}

/// Runs the REPL until `:q`, end of input or Ctrl+C at the prompt.
///
/// # Errors
/// Returns an error if the terminal cannot be written, or
/// [`InterruptedError`] when interrupted at the prompt.
pub async fn run_chat(config: &Config, client: ChatClient) -> Result<()> {
    let session = ChatSession::new(&config.model, config.temperature)
        .context("invalid chat settings")?;
    let styled = io::stdout().is_terminal();
    let echo_input = styled && !io::stdin().is_terminal();
    if styled {
        install_cursor_restore();
    }

    let mut repl = Repl {
        client,
        session,
        models: config.available_models(),
        theme: Theme::new(config.theme),
        styled,
        echo_input,
    };
    repl.greet()?;

    let mut lines = spawn_line_reader();
    loop {
        repl.prompt()?;

        let line = tokio::select! {
            line = lines.recv() => line,
            () = interrupt::wait_for_interrupt() => {
                repl.end_prompt_line()?;
                return Err(InterruptedError.into());
            }
        };
        let Some(line) = line else {
            repl.end_prompt_line()?;
            break;
        };
        let line = line.context("read input")?;

        let flow = match ReplCommand::parse(&line) {
            Some(command) => repl.handle_command(command).await?,
            None => {
                repl.send(&line).await?;
                Flow::Continue
            }
        };
        if flow == Flow::Quit {
            break;
        }
    }

    tracing::info!(messages = repl.session.conversation().len(), "chat ended");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Repl {
    client: ChatClient,
    session: ChatSession,
    models: Vec<String>,
    theme: Theme,
    styled: bool,
    /// Piped input is not echoed by the terminal.
    echo_input: bool,
}

impl Repl {
    fn greet(&self) -> Result<()> {
        if self.styled {
            self.notice(
                NoticeLevel::Info,
                &format!(
                    "chatline · {} · temperature {} · {}",
                    self.session.model(),
                    self.session.temperature(),
                    self.client.base_url()
                ),
            )?;
            self.notice(NoticeLevel::Info, "Type :help for commands, :q to quit.")?;
        }
        self.model_advisory()
    }

    fn prompt(&self) -> Result<()> {
        if !self.styled || self.echo_input {
            return Ok(());
        }
        let line = StyledLine::single(PROMPT_PREFIX, Style::UserPrefix);
        let mut out = io::stdout();
        write!(out, "{}", self.theme.paint(&line))?;
        out.flush()?;
        Ok(())
    }

    fn end_prompt_line(&self) -> Result<()> {
        if self.styled && !self.echo_input {
            writeln!(io::stdout())?;
        }
        Ok(())
    }

    fn notice(&self, level: NoticeLevel, text: &str) -> Result<()> {
        let (width, _) = terminal_size();
        let lines = notice_lines(level, text, width);
        if self.styled {
            write_lines(&mut io::stdout(), &lines, Some(self.theme))?;
        } else {
            write_lines(&mut io::stderr(), &lines, None)?;
        }
        Ok(())
    }

    fn model_advisory(&self) -> Result<()> {
        match self.session.model_notice() {
            Some(advisory) => self.notice(NoticeLevel::Advisory, advisory),
            None => Ok(()),
        }
    }

    async fn send(&mut self, input: &str) -> Result<()> {
        if input.trim().is_empty() {
            return Ok(());
        }

        let (width, _) = terminal_size();
        if self.echo_input {
            let lines = user_lines(input.trim(), width);
            write_lines(&mut io::stdout(), &lines, Some(self.theme))?;
        }
        let mut sink = stdout_sink(self.theme);
        let outcome =
            stream_turn(&self.client, &mut self.session, input, sink.as_mut(), width).await?;

        match outcome {
            TurnOutcome::Completed => Ok(()),
            TurnOutcome::Cancelled => {
                interrupt::reset();
                self.notice(NoticeLevel::Info, "Response cancelled.")
            }
            TurnOutcome::Failed(error) => self.notice(NoticeLevel::Error, &failure_message(&error)),
        }
    }

    async fn handle_command(&mut self, command: ReplCommand) -> Result<Flow> {
        tracing::debug!(?command, "repl command");
        match command {
            ReplCommand::Quit => return Ok(Flow::Quit),
            ReplCommand::Reset => self.reset().await?,
            ReplCommand::Model(None) => self.notice(
                NoticeLevel::Info,
                &format!("Current model: {}", self.session.model()),
            )?,
            ReplCommand::Model(Some(name)) => self.switch_model(&name)?,
            ReplCommand::Models => {
                for model in &self.models {
                    let marker = if model == self.session.model() { "*" } else { " " };
                    self.notice(NoticeLevel::Info, &format!("{marker} {model}"))?;
                }
            }
            ReplCommand::Temperature(None) => self.notice(
                NoticeLevel::Info,
                &format!("Temperature: {}", self.session.temperature()),
            )?,
            ReplCommand::Temperature(Some(raw)) => self.set_temperature(&raw)?,
            ReplCommand::Theme => {
                self.theme.toggle();
                let name = match self.theme.kind() {
                    ThemeKind::Dark => "dark",
                    ThemeKind::Light => "light",
                };
                self.notice(NoticeLevel::Success, &format!("Theme: {name}"))?;
            }
            ReplCommand::Help => {
                for (usage, what) in HELP {
                    self.notice(NoticeLevel::Info, &format!("{usage:<14} {what}"))?;
                }
            }
            ReplCommand::Unknown(name) => self.notice(
                NoticeLevel::Error,
                &format!("Unknown command ':{name}'. Type :help for commands."),
            )?,
        }
        Ok(Flow::Continue)
    }

    async fn reset(&mut self) -> Result<()> {
        let request = self.session.reset_request();
        match self.client.reset(&request).await {
            Ok(reply) if reply.is_ok() => {
                self.session.apply_reset();
                self.notice(NoticeLevel::Success, &reply.message)
            }
            Ok(reply) => self.notice(
                NoticeLevel::Error,
                &format!("Reset failed: {}", reply.message),
            ),
            Err(e) => self.notice(NoticeLevel::Error, &format!("Reset failed: {e:#}")),
        }
    }

    fn switch_model(&mut self, name: &str) -> Result<()> {
        if let Err(e) = self.session.set_model(name) {
            return self.notice(NoticeLevel::Error, &e.to_string());
        }
        let model = self.session.model().to_string();
        if !self.models.contains(&model) {
            self.models.push(model.clone());
        }
        self.notice(NoticeLevel::Success, &format!("Model set to {model}"))?;

        if let Err(e) = Config::save_model(&model) {
            tracing::warn!(error = %e, "failed to save model");
            self.notice(NoticeLevel::Error, &format!("Could not save model: {e:#}"))?;
        }
        self.model_advisory()
    }

    fn set_temperature(&mut self, raw: &str) -> Result<()> {
        let Ok(value) = raw.parse::<f64>() else {
            return self.notice(NoticeLevel::Error, &format!("Not a number: {raw}"));
        };
        match self.session.set_temperature(value) {
            Ok(()) => self.notice(NoticeLevel::Success, &format!("Temperature set to {value}")),
            Err(e) => self.notice(NoticeLevel::Error, &e.to_string()),
        }
    }
}

/// Reads stdin on a plain thread; a blocked read must not hold up runtime
/// shutdown.
fn spawn_line_reader() -> mpsc::Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel(1);
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}
