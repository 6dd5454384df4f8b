//! CLI command definitions, routing, and tracing setup.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use parlance_core::{Node, Pipeline, PipelineState, StepObserver, TranslateResponse};
use parlance_model::StructuredModel;
use parlance_server::AppState;
use parlance_shared::{AppConfig, ParlanceError, init_config, load_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Parlance: translate a message, or answer it if it isn't a translation request.
#[derive(Parser)]
#[command(
    name = "parlance",
    version,
    about = "Route a message to a translation or a direct answer using a language model.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run one message through the pipeline and print the result as JSON.
    Ask {
        /// The message (multiple words are joined with spaces).
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,

        /// Model identifier (overrides the config file).
        #[arg(long)]
        model: Option<String>,

        /// Print only the translation or answer instead of the JSON record.
        #[arg(long)]
        plain: bool,
    },

    /// Serve the pipeline over HTTP.
    Serve {
        /// Address to bind (overrides the config file).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides the config file).
        #[arg(short, long)]
        port: Option<u16>,

        /// Model identifier (overrides the config file).
        #[arg(long)]
        model: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "parlance=info",
        1 => "parlance=debug",
        _ => "parlance=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Ask {
            message,
            model,
            plain,
        } => cmd_ask(&message.join(" "), model, plain).await,
        Command::Serve { host, port, model } => cmd_serve(host, port, model).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Load the config file and apply command-line overrides.
fn resolve_config(model: Option<String>) -> Result<AppConfig> {
    let mut config = load_config()?;
    if let Some(model) = model {
        config.model.model = model;
    }
    Ok(config)
}

fn build_pipeline(config: &AppConfig) -> Result<Pipeline> {
    let model = StructuredModel::from_config(&config.model)?;
    Ok(Pipeline::new(model))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_ask(message: &str, model: Option<String>, plain: bool) -> Result<()> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ParlanceError::EmptyInput.into());
    }

    let config = resolve_config(model)?;
    let pipeline = build_pipeline(&config)?;

    info!(
        backend = pipeline.model().backend_name(),
        model = pipeline.model().model(),
        "running pipeline"
    );

    let progress = CliProgress::new();
    let result = pipeline.run_with_observer(message, &progress).await;
    progress.finish();

    let final_state = result?;
    if plain {
        println!("{}", final_state.text());
    } else {
        let response = TranslateResponse::from(final_state);
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    Ok(())
}

async fn cmd_serve(host: Option<String>, port: Option<u16>, model: Option<String>) -> Result<()> {
    let mut config = resolve_config(model)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let pipeline = build_pipeline(&config)?;
    let addr = resolve_addr(&config.server.host, config.server.port).await?;

    info!(
        backend = pipeline.model().backend_name(),
        model = pipeline.model().model(),
        "starting HTTP server"
    );
    println!("Serving on http://{addr}/translate");

    parlance_server::serve(AppState::new(pipeline), addr).await?;
    Ok(())
}

async fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| eyre!("cannot resolve '{host}:{port}': {e}"))?
        .next()
        .ok_or_else(|| eyre!("'{host}:{port}' did not resolve to any address"))
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner showing which pipeline step is waiting on the model.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid progress template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl StepObserver for CliProgress {
    fn step_started(&self, node: Node) {
        self.spinner.set_message(step_label(node));
    }

    fn step_finished(&self, node: Node, state: &PipelineState) {
        if node == Node::DetectTranslateMsg {
            let kind = if state.is_translate_msg {
                "translation request"
            } else {
                "general question"
            };
            self.spinner.println(format!("  Detected: {kind}"));
        }
    }
}

fn step_label(node: Node) -> &'static str {
    match node {
        Node::DetectTranslateMsg => "Detecting intent...",
        Node::ExtractLanguage => "Extracting target language...",
        Node::ExtractMsg => "Extracting phrase...",
        Node::Translate => "Translating...",
        Node::ResponseToUser => "Answering...",
    }
}
