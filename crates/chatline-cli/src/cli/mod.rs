//! CLI entry and dispatch.

use anyhow::{Context, Result};
use chatline_core::client::{ChatClient, ClientConfig};
use chatline_core::config::{self, ThemeKind};
use chatline_core::{interrupt, logging};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

mod commands;

#[derive(Parser)]
#[command(name = "chatline")]
#[command(version)]
#[command(about = "Chat with a local language model from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Model to use (overrides config)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Sampling temperature between 0 and 1 (overrides config)
    #[arg(short, long, global = true, value_name = "T")]
    temperature: Option<f64>,

    /// Backend base URL (overrides CHATLINE_BASE_URL and config)
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Color theme: dark or light (overrides config)
    #[arg(long, global = true, value_parser = ThemeKind::parse)]
    theme: Option<ThemeKind>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Start an interactive chat (default)
    Chat,
    /// Send one prompt and print the answer
    Exec {
        /// The prompt to send (read from stdin when omitted)
        #[arg(short, long)]
        prompt: Option<String>,

        /// Wait for the whole answer instead of streaming it
        #[arg(long = "no-stream")]
        no_stream: bool,
    },
    /// Clear the backend's conversation history for the model
    Reset,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    interrupt::init()?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        command,
        model,
        temperature,
        base_url,
        theme,
        verbose,
    } = cli;
    let overrides = Overrides {
        model,
        temperature,
        base_url,
        theme,
        verbose,
    };

    // default to chat mode
    match command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let backend = overrides.load()?;
            commands::chat::run(&backend.config, backend.client).await
        }
        Commands::Exec { prompt, no_stream } => {
            let backend = overrides.load()?;
            commands::exec::run(commands::exec::ExecRunOptions {
                config: &backend.config,
                client: backend.client,
                prompt: prompt.as_deref(),
                stream: !no_stream,
            })
            .await
        }
        Commands::Reset => {
            let backend = overrides.load()?;
            commands::reset::run(&backend.config, &backend.client).await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}

/// Global flags that override config values.
struct Overrides {
    model: Option<String>,
    temperature: Option<f64>,
    base_url: Option<String>,
    theme: Option<ThemeKind>,
    verbose: u8,
}

/// Everything a backend-facing command needs.
struct Backend {
    config: config::Config,
    client: ChatClient,
    _log_guard: Option<WorkerGuard>,
}

impl Overrides {
    fn load(self) -> Result<Backend> {
        let mut config = config::Config::load().context("load config")?;

        // Logging failures are reported but never fatal.
        let log_guard = match logging::init(
            &config::paths::logs_dir(),
            config.log_level.as_deref(),
            self.verbose,
        ) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Warning: {e:#}");
                None
            }
        };

        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(theme) = self.theme {
            config.theme = theme;
        }

        let client_config = ClientConfig::resolve(&config, self.base_url.as_deref())
            .context("resolve backend")?;
        tracing::info!(
            base_url = %client_config.base_url,
            model = %config.model,
            "chatline starting"
        );
        let client = ChatClient::new(client_config)?;

        Ok(Backend {
            config,
            client,
            _log_guard: log_guard,
        })
    }
}
