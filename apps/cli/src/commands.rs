//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use apidoc_core::{DocumentParser, MetadataRecord, read_source};
use apidoc_shared::{AppConfig, init_config, load_config, load_config_from};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// apidoc: split API reference documents into per-section records.
#[derive(Parser)]
#[command(
    name = "apidoc",
    version,
    about = "Split API reference markdown into sections with structured metadata.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.apidoc/apidoc.toml.
    #[arg(long, global = true, env = "APIDOC_CONFIG")]
    pub config: Option<PathBuf>,

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
    /// Parse documents and print their section records as JSON.
    Parse {
        /// Markdown files, parsed as one batch in the given order.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },

    /// Print the section outline of a document.
    Toc {
        /// Markdown file.
        file: PathBuf,
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

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout
/// stays machine-readable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "apidoc=info",
        1 => "apidoc=debug",
        _ => "apidoc=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
        Command::Parse { files, pretty } => {
            cmd_parse(cli.config.as_deref(), &files, pretty).await
        }
        Command::Toc { file } => cmd_toc(cli.config.as_deref(), &file).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_parse(config: Option<&Path>, files: &[PathBuf], pretty: bool) -> Result<()> {
    let config = resolve_config(config)?;
    let parser = DocumentParser::new(&config)?;

    info!(files = files.len(), "parsing documents");

    let records = parser
        .parse_documents(files.iter().cloned().map(read_source))
        .await?;

    let json = if pretty {
        serde_json::to_string_pretty(&records)
    } else {
        serde_json::to_string(&records)
    }
    .wrap_err("failed to serialize records")?;

    println!("{json}");
    Ok(())
}

async fn cmd_toc(config: Option<&Path>, file: &Path) -> Result<()> {
    let config = resolve_config(config)?;
    let parser = DocumentParser::new(&config)?;

    let records = parser.parse_document(read_source(file)).await?;
    if records.is_empty() {
        return Err(eyre!("no headings found in {}", file.display()));
    }

    for record in &records {
        println!("{}", outline_line(record));
    }
    Ok(())
}

/// One indented outline entry: title, anchor, and stability when present.
fn outline_line(record: &MetadataRecord) -> String {
    let indent = "  ".repeat(usize::from(record.depth().saturating_sub(1)));
    let mut line = format!("{indent}{} (#{})", record.title(), record.slug());
    if let Some(stability) = record.stability() {
        line.push_str(&format!(" [{} {}]", stability.index, stability.index.name()));
    }
    line
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: Option<&Path>) -> Result<()> {
    let config = resolve_config(config)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
