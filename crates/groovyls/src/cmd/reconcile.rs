//! groovyls-reconcile - Inspect the compiler session for a workspace.
//!
//! Runs a single reconciliation the way the language server does on its
//! first request, then prints the resolved classpath, every source record
//! and any per-document errors.
//!
//! # Usage
//!
//! ```bash
//! groovyls-reconcile ./project                        # Disk sources only
//! groovyls-reconcile ./project -c 'libs/*' -c a.jar   # With classpath entries
//! groovyls-reconcile ./project --open src/Main.groovy # Treat a file as open
//! groovyls-reconcile ./project --virtual Scratch='println 1'
//! groovyls-reconcile --virtual Scratch='println 1'    # Open documents only
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use groovyls_session::uri::{FILE_SCHEME, VIRTUAL_SCHEME};
use groovyls_session::{Reconciliation, SessionManager, Settings};
use groovyls_vfs::FileContentsTracker;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Output format for the report.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// JSON output for tooling integration
    Json,
}

/// Reconcile a Groovy workspace and report the compiler session.
#[derive(Parser, Debug)]
#[command(name = "groovyls-reconcile")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Workspace root to walk; omit to consider open documents only
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Additional classpath entry (archive path, or directory ending in `*`)
    #[arg(short = 'c', long = "classpath", value_name = "ENTRY")]
    pub classpath: Vec<String>,

    /// Library auto-discovery directory (overrides GROOVYLS_LIB_PATH)
    #[arg(long, value_name = "DIR")]
    pub lib_path: Option<PathBuf>,

    /// JSON file with client settings, e.g. {"groovy": {"classpath": [...]}}
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Treat a file as open in the editor, with its current disk content
    #[arg(long, value_name = "FILE")]
    pub open: Vec<PathBuf>,

    /// Open a virtual document NAME with the given text
    #[arg(long = "virtual", value_name = "NAME=TEXT")]
    pub virtual_docs: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Show debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// A source record in JSON format.
#[derive(Debug, Serialize)]
pub struct JsonSource {
    /// Document URI
    pub uri: String,
    /// Location used for diagnostics
    pub location: String,
    /// "disk" or "in-memory"
    pub origin: String,
    /// Number of lines
    pub lines: usize,
}

/// JSON output structure for a reconciliation.
#[derive(Debug, Serialize)]
pub struct JsonOutput {
    /// Whether the session was built from nothing
    pub full_build: bool,
    /// Resolved classpath archives, in order
    pub classpath: Vec<String>,
    /// Source records, ordered by URI
    pub sources: Vec<JsonSource>,
    /// Per-document errors
    pub errors: Vec<String>,
}

impl From<&Reconciliation<'_>> for JsonOutput {
    fn from(result: &Reconciliation<'_>) -> Self {
        Self {
            full_build: result.full_build,
            classpath: result
                .session
                .config()
                .classpath
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            sources: result
                .session
                .sources()
                .map(|s| JsonSource {
                    uri: s.uri().to_string(),
                    location: s.location().display().to_string(),
                    origin: s.origin().to_string(),
                    lines: s.num_lines(),
                })
                .collect(),
            errors: result.errors.iter().map(ToString::to_string).collect(),
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    Ok(cwd.join(path))
}

/// Build a virtual URI for `name` placed under `base`.
fn virtual_uri(base: &Path, name: &str) -> Result<Url> {
    let file_url = Url::from_file_path(base.join(name))
        .map_err(|()| anyhow!("cannot build a URI for {name:?} under {}", base.display()))?;
    let rest = file_url
        .as_str()
        .strip_prefix(FILE_SCHEME)
        .unwrap_or_else(|| file_url.as_str());
    Url::parse(&format!("{VIRTUAL_SCHEME}{rest}"))
        .with_context(|| format!("invalid virtual document name {name:?}"))
}

fn build_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::from_env();

    if let Some(file) = &args.settings {
        tracing::debug!("Loading client settings from {}", file.display());
        let text = fs::read_to_string(file)
            .with_context(|| format!("failed to read settings file {}", file.display()))?;
        let payload: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("settings file {} is not JSON", file.display()))?;
        settings
            .apply_client_settings(&payload)
            .with_context(|| format!("invalid settings in {}", file.display()))?;
    }
    if !args.classpath.is_empty() {
        settings.classpath.clone_from(&args.classpath);
    }
    if let Some(dir) = &args.lib_path {
        settings.library_dir = Some(dir.clone());
    }

    Ok(settings)
}

fn build_tracker(args: &Args, root: Option<&Path>) -> Result<FileContentsTracker> {
    let mut tracker = FileContentsTracker::new();

    for file in &args.open {
        let path = absolute(file)?;
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let uri = Url::from_file_path(&path)
            .map_err(|()| anyhow!("cannot build a URI for {}", path.display()))?;
        tracker.open(uri, &text, 1);
    }

    let base = match root {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir().context("failed to determine current directory")?,
    };
    for spec in &args.virtual_docs {
        let (name, text) = spec
            .split_once('=')
            .ok_or_else(|| anyhow!("expected NAME=TEXT, got {spec:?}"))?;
        tracker.open(virtual_uri(&base, name)?, text, 1);
    }

    Ok(tracker)
}

fn print_text<W: Write>(out: &mut W, result: &Reconciliation<'_>) -> io::Result<()> {
    let classpath = &result.session.config().classpath;
    writeln!(out, "classpath ({} archives):", classpath.len())?;
    for archive in classpath.iter() {
        writeln!(out, "  {}", archive.display())?;
    }

    writeln!(out, "sources ({}):", result.session.len())?;
    for source in result.session.sources() {
        writeln!(
            out,
            "  {} [{}, {} lines]",
            source.location().display(),
            source.origin(),
            source.num_lines()
        )?;
    }

    if !result.errors.is_empty() {
        writeln!(out, "errors ({}):", result.errors.len())?;
        for err in &result.errors {
            writeln!(out, "  {err}")?;
        }
    }
    Ok(())
}

fn run(args: &Args) -> Result<ExitCode> {
    let settings = build_settings(args)?;
    let root = args.root.as_deref().map(absolute).transpose()?;
    let mut tracker = build_tracker(args, root.as_deref())?;
    match &root {
        Some(root) => tracing::debug!("Workspace root: {}", root.display()),
        None => tracing::debug!("No workspace root, open documents only"),
    }

    let mut manager = SessionManager::new(settings);
    let result = manager.reconcile(root.as_deref(), &mut tracker);

    let mut stdout = io::stdout().lock();
    match args.format {
        OutputFormat::Text => print_text(&mut stdout, &result)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, &JsonOutput::from(&result))?;
            writeln!(stdout)?;
        }
    }

    Ok(if result.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

/// Main entry point for the reconcile command.
pub fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&args) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
