//! DSGVO compliance checker CLI.
//!
//! Scores already-extracted document text against a GDPR criteria protocol
//! using an OpenAI-compatible model endpoint.

mod output;
mod retry;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use dsgvo_core::{DocumentInput, Language, Protocol, RunSummary};
use dsgvo_runtime::{CheckerConfig, ComplianceChecker, LlmProvider, OpenAiProvider};

use crate::retry::RetryProvider;

#[derive(Parser)]
#[command(name = "dsgvo")]
#[command(version, about = "GDPR (DSGVO) compliance checks for document text")]
struct Cli {
    /// Log level used when RUST_LOG is not set (falls back to LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check text files against a protocol
    Check {
        /// UTF-8 text files with the extracted document content
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Protocol file (YAML or JSON); built-in GDPR protocol if omitted
        #[arg(short, long)]
        protocol: Option<PathBuf>,

        /// Report language (de or en)
        #[arg(short, long)]
        language: Option<String>,

        /// Config file (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Model name
        #[arg(short, long)]
        model: Option<String>,

        /// Documents analyzed at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Extra attempts for rate-limited or failed connections
        #[arg(long, default_value = "0")]
        retries: usize,
    },

    /// Inspect or create protocols
    Protocol {
        #[command(subcommand)]
        action: ProtocolCommand,
    },

    /// Check that the configured endpoint answers
    Ping {
        /// Config file (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ProtocolCommand {
    /// Print a protocol as YAML
    Show {
        /// Protocol file; built-in GDPR protocol if omitted
        #[arg(short, long)]
        protocol: Option<PathBuf>,
    },

    /// Write the built-in GDPR protocol to a file for editing
    Init {
        /// Destination path (.yaml or .json)
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a protocol file
    Validate {
        /// Protocol file (YAML or JSON)
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable report
    Text,
    /// Reports and run summary as JSON
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match cli.command {
        Command::Check {
            files,
            protocol,
            language,
            config,
            model,
            concurrency,
            format,
            retries,
        } => {
            let mut config = CheckerConfig::load(config.as_deref())
                .context("Failed to load configuration")?;
            if let Some(model) = model {
                config.model = model;
            }
            if let Some(language) = language {
                config.language = Language::from_code(&language);
            }
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency;
            }
            config.validate().context("Invalid configuration")?;

            let protocol = load_protocol(protocol.as_deref())?;
            let documents = read_documents(&files, config.language)?;
            check(&config, &protocol, &documents, format, retries).await?;
        }
        Command::Protocol { action } => match action {
            ProtocolCommand::Show { protocol } => {
                let protocol = load_protocol(protocol.as_deref())?;
                print!("{}", protocol.to_yaml()?);
            }
            ProtocolCommand::Init { path, force } => init_protocol(&path, force)?,
            ProtocolCommand::Validate { path } => validate_protocol(&path)?,
        },
        Command::Ping { config } => {
            let config = CheckerConfig::load(config.as_deref())
                .context("Failed to load configuration")?;
            config.validate().context("Invalid configuration")?;
            ping(&config).await?;
        }
    }

    Ok(())
}

/// Logs go to stderr so JSON on stdout stays clean.
fn init_logging(level: Option<&str>) {
    let level = level
        .map(str::to_string)
        .or_else(|| std::env::var("LOG_LEVEL").ok())
        .unwrap_or_else(|| "warn".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_protocol(path: Option<&Path>) -> Result<Protocol> {
    match path {
        Some(path) => Protocol::from_file(path)
            .with_context(|| format!("Failed to load protocol {}", path.display())),
        None => Ok(Protocol::default_gdpr()),
    }
}

fn read_documents(files: &[PathBuf], language: Language) -> Result<Vec<DocumentInput>> {
    files
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(DocumentInput::new(filename, text, language))
        })
        .collect()
}

async fn check(
    config: &CheckerConfig,
    protocol: &Protocol,
    documents: &[DocumentInput],
    format: OutputFormat,
    retries: usize,
) -> Result<()> {
    let mut provider: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::from_config(config)?);
    if retries > 0 {
        provider = Arc::new(RetryProvider::new(provider, retries));
    }

    let checker = ComplianceChecker::builder()
        .provider(provider)
        .config(config)
        .build()?;

    let reports = checker
        .check(documents, protocol)
        .await
        .context("Compliance check failed")?;
    let summary = RunSummary::from_reports(&reports);

    match format {
        OutputFormat::Text => print!("{}", output::render_text(&reports, &summary, protocol)),
        OutputFormat::Json => println!("{}", output::render_json(&reports, &summary)?),
    }
    Ok(())
}

fn init_protocol(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let protocol = Protocol::default_gdpr();
    let contents = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => protocol.to_json()?,
        _ => protocol.to_yaml()?,
    };
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote {} categories to {}", protocol.len(), path.display());
    Ok(())
}

fn validate_protocol(path: &Path) -> Result<()> {
    let protocol = Protocol::from_file(path)
        .with_context(|| format!("Invalid protocol {}", path.display()))?;
    protocol.ensure_checkable()?;

    let not_applicable = protocol
        .categories()
        .iter()
        .filter(|c| !c.is_applicable())
        .count();
    println!(
        "{}: valid, {} categories ({} without criteria)",
        path.display(),
        protocol.len(),
        not_applicable
    );
    Ok(())
}

async fn ping(config: &CheckerConfig) -> Result<()> {
    let provider = OpenAiProvider::from_config(config)?;
    let mode = if provider.is_proxy() { "proxy" } else { "direct" };

    println!("Endpoint: {} ({})", provider.base_url(), mode);
    println!("Model:    {}", config.model);

    if !provider.health_check().await {
        bail!("endpoint did not answer successfully");
    }
    println!("Status:   reachable");
    Ok(())
}
