//! triage: review a tagged inbox of notes from the terminal.
//!
//! Pages come from a running Logseq instance (HTTP API) or from a graph
//! exported to JSON. A local Ollama server titles and summarizes the page
//! under review on request.

mod render;
mod repl;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use triage_core::{HostGraph, InferenceBackend, Visibility};
use triage_inference::{GenerateMode, OllamaBackend, OllamaConfig};
use triage_review::{LogseqConfig, LogseqHost, MemoryGraph, ReviewConfig, ReviewSession};

#[derive(Parser)]
#[command(name = "triage")]
#[command(author, version, about = "Review and process a tagged inbox of notes")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Read pages from a JSON graph file instead of a running Logseq
    #[arg(long, global = true)]
    graph_file: Option<PathBuf>,

    /// Logseq HTTP API endpoint (overrides LOGSEQ_API_URL)
    #[arg(long, global = true)]
    logseq_url: Option<String>,

    /// Tag whose pages make up the inbox (overrides TRIAGE_TAG)
    #[arg(short, long, global = true)]
    tag: Option<String>,

    /// Pages fetched per batch (overrides TRIAGE_BATCH_SIZE)
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Generation model (overrides OLLAMA_GEN_MODEL)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Stream generation responses; `--stream=false` turns streaming off
    /// (overrides TRIAGE_GEN_STREAM)
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true,
        value_name = "BOOL"
    )]
    stream: Option<bool>,
}

#[derive(Subcommand)]
enum Commands {
    /// Review the inbox interactively (default)
    Review,

    /// Check that the inference server and the host are reachable
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut review_config = ReviewConfig::from_env().context("Invalid review settings")?;
    if let Some(tag) = &cli.tag {
        review_config.tag = tag.clone();
    }
    if let Some(batch_size) = cli.batch_size {
        review_config.batch_size = batch_size;
    }
    review_config
        .validate()
        .context("Invalid review settings")?;

    let host = build_host(&cli)?;
    let backend = Arc::new(build_backend(&cli)?);

    match cli.command.unwrap_or(Commands::Review) {
        Commands::Review => {
            if !backend.health_check().await.unwrap_or(false) {
                warn!(
                    base_url = %backend.config().base_url,
                    "Inference server is not reachable; generation will fail"
                );
            }
            let visibility = Visibility::default();
            let session = ReviewSession::new(host.clone(), &review_config, visibility);
            repl::run(session, host, backend).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Health => health(host, backend.as_ref(), &review_config.tag).await,
    }
}

async fn health(
    host: Arc<dyn HostGraph>,
    backend: &OllamaBackend,
    tag: &str,
) -> anyhow::Result<ExitCode> {
    let mut healthy = true;

    match backend.health_check().await {
        Ok(true) => println!("inference: ok ({})", backend.config().base_url),
        Ok(false) | Err(_) => {
            println!("inference: unreachable ({})", backend.config().base_url);
            healthy = false;
        }
    }

    match host.pages_with_tag(tag).await {
        Ok(pages) => println!("host: ok ({} pages tagged {:?})", pages.len(), tag),
        Err(e) => {
            println!("host: {}", e);
            healthy = false;
        }
    }

    Ok(if healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_host(cli: &Cli) -> anyhow::Result<Arc<dyn HostGraph>> {
    if let Some(path) = &cli.graph_file {
        let graph = MemoryGraph::from_json_file(path)
            .with_context(|| format!("Failed to load graph file {}", path.display()))?;
        return Ok(Arc::new(graph));
    }

    let mut config = LogseqConfig::from_env().context("Logseq API is not configured")?;
    if let Some(url) = &cli.logseq_url {
        config.api_url = url.clone();
    }
    info!(api_url = %config.api_url, "Using Logseq HTTP API");
    Ok(Arc::new(LogseqHost::new(config)?))
}

fn build_backend(cli: &Cli) -> anyhow::Result<OllamaBackend> {
    let mut config = OllamaConfig::from_env().context("Invalid inference settings")?;
    apply_backend_overrides(cli, &mut config);
    Ok(OllamaBackend::new(config)?)
}

fn apply_backend_overrides(cli: &Cli, config: &mut OllamaConfig) {
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    match cli.stream {
        Some(true) => config.mode = GenerateMode::Streamed,
        Some(false) => config.mode = GenerateMode::Buffered,
        None => {}
    }
}

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, replaces stderr output)
///   LOG_ANSI    - "true"/"false" override ANSI colors
///   RUST_LOG    - standard env filter (default: "warn,triage=info")
///
/// Logs go to stderr so they stay out of the review screen on stdout.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "warn,triage=info,triage_review=info,triage_inference=info".into()
    });
    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("triage.log");
        let appender = tracing_appender::rolling::daily(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}
