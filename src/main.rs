use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docvault::config::{self, EngineConfig};
use docvault::diagnostics::DiagnosticSink;
use docvault::query::{FacetOptions, QueryScheduler, QueryState, RawQuery, SearchEvent};
use docvault::recent::{self, RecentQueryCache, SharedRecent};
use docvault::records::{DocumentRecord, FolderRecord};
use docvault::usage::{gb_to_bytes, StorageAnalyzer};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Query and storage analytics over a document vault snapshot.
#[derive(Parser, Debug)]
#[command(name = "docvault", version, about)]
struct Cli {
    /// Config file (defaults to the platform config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Filter and sort a snapshot, printing matching documents as JSON.
    Search {
        snapshot: PathBuf,
        #[arg(long, default_value = "")]
        text: String,
        /// File extension, repeatable.
        #[arg(long = "type")]
        types: Vec<String>,
        /// Folder id, repeatable.
        #[arg(long = "folder")]
        folders: Vec<String>,
        /// "Last 24 hours", "Last 7 days", "Last 30 days" or "This Year".
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        min: Option<f64>,
        #[arg(long)]
        max: Option<f64>,
        /// KB, MB or GB.
        #[arg(long)]
        unit: Option<String>,
        /// name, date or size.
        #[arg(long)]
        sort: Option<String>,
    },
    /// Print storage usage for a snapshot.
    Storage {
        snapshot: PathBuf,
        /// Override the configured capacity.
        #[arg(long)]
        capacity_gb: Option<f64>,
    },
    /// List type and folder facet options for a snapshot.
    Facets { snapshot: PathBuf },
    /// Inspect or edit recent-search history.
    Recent {
        #[command(subcommand)]
        action: RecentAction,
    },
    /// Config helpers.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum RecentAction {
    List,
    Remove { term: String },
    Clear,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the JSON schema of the config file.
    Schema,
    /// Print the effective config as TOML.
    Show,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    docvault::logging::init(&config.logging.level);
    let diagnostics = DiagnosticSink::log_only();

    match cli.command {
        Command::Search {
            snapshot,
            text,
            types,
            folders,
            date,
            min,
            max,
            unit,
            sort,
        } => {
            let (documents, _) = load_snapshot(&snapshot, &diagnostics)?;
            let raw = RawQuery {
                text,
                file_types: types,
                folders,
                date_preset: date,
                min_size: min.map(Value::from),
                max_size: max.map(Value::from),
                size_unit: unit,
                sort_by: sort,
            };
            let query = QueryState::resolve(&raw, &diagnostics);
            let recent = open_recent(&config, &diagnostics)?;
            search(&config, documents, query, recent, diagnostics).await
        }
        Command::Storage {
            snapshot,
            capacity_gb,
        } => {
            let (documents, _) = load_snapshot(&snapshot, &diagnostics)?;
            let capacity = capacity_gb.map(gb_to_bytes).unwrap_or_else(|| config.capacity_bytes());
            print_json(&StorageAnalyzer::analyze(&documents, capacity))
        }
        Command::Facets { snapshot } => {
            let (documents, folders) = load_snapshot(&snapshot, &diagnostics)?;
            print_json(&FacetOptions::collect(&documents, &folders))
        }
        Command::Recent { action } => {
            let recent = open_recent(&config, &diagnostics)?;
            let mut cache = recent.lock();
            match action {
                RecentAction::List => {}
                RecentAction::Remove { term } => cache.remove(&term),
                RecentAction::Clear => cache.clear(),
            }
            print_json(&cache.entries())
        }
        Command::Config { action } => {
            match action {
                ConfigAction::Schema => println!("{}", config::config_schema()),
                ConfigAction::Show => print!(
                    "{}",
                    toml::to_string_pretty(&config).context("Failed to render config")?
                ),
            }
            Ok(())
        }
    }
}

async fn search(
    config: &EngineConfig,
    documents: Vec<DocumentRecord>,
    query: QueryState,
    recent: SharedRecent,
    diagnostics: DiagnosticSink,
) -> Result<()> {
    let (scheduler, mut events) = QueryScheduler::new(config.scheduler(), diagnostics);
    scheduler.attach_recent(recent);
    scheduler.set_documents(documents);
    scheduler.submit(query);

    while let Some(event) = events.recv().await {
        match event {
            SearchEvent::Searching { run } => tracing::debug!(run, "search armed"),
            SearchEvent::Idle { .. } => {
                eprintln!("no search: pass --text or at least one filter");
                return Ok(());
            }
            SearchEvent::Results(outcome) => return print_json(&outcome),
        }
    }
    bail!("search scheduler stopped without a result")
}

fn open_recent(config: &EngineConfig, diagnostics: &DiagnosticSink) -> Result<SharedRecent> {
    let store = recent::open_store(&config.recent, &config::default_data_dir())?;
    let cache = RecentQueryCache::open(store, config.recent.key.clone(), diagnostics.clone());
    Ok(Arc::new(Mutex::new(cache)))
}

/// Accepts `{"documents": [...], "folders": [...]}` or a bare document array.
fn load_snapshot(path: &Path, diagnostics: &DiagnosticSink) -> Result<(Vec<DocumentRecord>, Vec<FolderRecord>)> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw).context("Snapshot is not valid JSON")?;
    let empty = Vec::new();
    let (docs, folders) = match &value {
        Value::Array(docs) => (docs, &empty),
        Value::Object(map) => (
            map.get("documents").and_then(Value::as_array).unwrap_or(&empty),
            map.get("folders").and_then(Value::as_array).unwrap_or(&empty),
        ),
        _ => bail!("snapshot must be a JSON array or object"),
    };
    Ok((
        DocumentRecord::collect_json(docs, diagnostics),
        FolderRecord::collect_json(folders, diagnostics),
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
