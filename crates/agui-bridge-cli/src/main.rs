use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use agui_bridge_core::config::{Config, LoggingConfig};
use agui_bridge_core::types::{ChatMessage, ChatRequest};
use agui_bridge_transcoder::{AgUiPipe, ChatPipe, PipeOutput};

#[derive(Parser)]
#[command(
    name = "agui-bridge",
    about = "Bridge chat-UI requests to an AG-UI agent endpoint",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Port to listen on (default: 18790)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Send one chat message through the pipe
    Chat {
        /// Message to send
        #[arg(short, long)]
        message: String,

        /// Model id as the chat UI would send it
        #[arg(long)]
        model: Option<String>,

        /// System prompt
        #[arg(long)]
        system: Option<String>,

        /// Wait for the whole reply instead of streaming
        #[arg(long)]
        no_stream: bool,

        #[arg(long)]
        temperature: Option<f64>,
    },

    /// List the models offered to the chat UI
    Models,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get a specific config value
    Get { key: String },
    /// Check the configuration for problems
    Validate,
    /// Write the effective configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(Config::config_path);

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    init_logging(config.logging.as_ref(), cli.verbose);

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or_else(|| config.gateway_port());
            let pipe = Arc::new(AgUiPipe::new(config.bridge_settings())?);
            tracing::info!(
                endpoint = %pipe.settings().endpoint_url,
                "Starting AG-UI bridge gateway on port {port}"
            );

            let state = agui_bridge_gateway::GatewayState::new(Arc::new(config), pipe);
            #[cfg(feature = "metrics")]
            let state =
                state.with_metrics(agui_bridge_gateway::metrics::install_prometheus_recorder()?);

            agui_bridge_gateway::start_gateway(Arc::new(state), port).await?;
        }
        Commands::Chat {
            message,
            model,
            system,
            no_stream,
            temperature,
        } => {
            let pipe = AgUiPipe::new(config.bridge_settings())?;
            let request = build_chat_request(message, model, system, !no_stream, temperature);

            let mut stdout = std::io::stdout();
            match pipe.pipe(request).await {
                PipeOutput::Text(text) => writeln!(stdout, "{text}")?,
                PipeOutput::Stream(mut chunks) => {
                    while let Some(chunk) = chunks.next().await {
                        write!(stdout, "{chunk}")?;
                        stdout.flush()?;
                    }
                    writeln!(stdout)?;
                }
            }
        }
        Commands::Models => {
            for model in config.model_catalog() {
                println!("{}.{}\t{}\t→ {}", AgUiPipe::ID, model.id, model.name, model.target());
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
            ConfigAction::Get { key } => match config.get_path(&key) {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => anyhow::bail!("No config value at '{key}'"),
            },
            ConfigAction::Validate => {
                let (warnings, errors) = config.validate();
                for w in &warnings {
                    println!("warning: {w}");
                }
                for e in &errors {
                    println!("error: {e}");
                }
                if !errors.is_empty() {
                    anyhow::bail!("{} configuration error(s)", errors.len());
                }
                println!("Config OK ({})", config_path.display());
            }
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists (use --force to overwrite)",
                        config_path.display()
                    );
                }
                config.save(&config_path)?;
                println!("Wrote {}", config_path.display());
            }
        },
    }

    Ok(())
}

fn build_chat_request(
    message: String,
    model: Option<String>,
    system: Option<String>,
    stream: bool,
    temperature: Option<f64>,
) -> ChatRequest {
    let mut messages = Vec::new();
    if let Some(system) = system {
        messages.push(ChatMessage::new("system", system));
    }
    messages.push(ChatMessage::new("user", message));

    ChatRequest {
        messages,
        model,
        temperature: temperature.map(serde_json::Value::from),
        stream: Some(stream),
        ..ChatRequest::default()
    }
}

/// Build the log filter: `RUST_LOG` wins, then `--verbose`, then the
/// configured level, with per-crate directives layered on top.
fn log_filter(logging: Option<&LoggingConfig>, verbose: bool) -> EnvFilter {
    let level = if verbose {
        "debug".to_string()
    } else {
        logging
            .and_then(|l| l.level.clone())
            .unwrap_or_else(|| "info".to_string())
    };

    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    for directive in logging.map(|l| l.filters.as_slice()).unwrap_or_default() {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("Ignoring invalid log filter '{directive}': {e}"),
        }
    }
    filter
}

fn init_logging(logging: Option<&LoggingConfig>, verbose: bool) {
    let filter = log_filter(logging, verbose);
    let writer = match logging.map(|l| l.output.as_str()) {
        Some("stdout") => BoxMakeWriter::new(std::io::stdout),
        _ => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    if logging.is_some_and(|l| l.format == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
}
