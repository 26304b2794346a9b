//! # foreman-agent
//!
//! Foreman agent binary — wires settings, stores, the reasoning backend,
//! and the tool surface into a session, then runs an interactive stdin
//! front end.

#![deny(unsafe_code)]

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::Parser;
use tokio::io::AsyncBufReadExt as _;
use tracing::info;

use foreman_core::ids::SessionId;
use foreman_llm::gemini::{GeminiBackend, GeminiConfig};
use foreman_runtime::{EventEmitter, Session, TaskService, WorkerExecutor};
use foreman_settings::ForemanSettings;
use foreman_store::fs::LocalObjectStore;
use foreman_store::memory::MemoryStore;
use foreman_store::sqlite::SqliteStore;
use foreman_store::{DocumentStore, MessageLog, ObjectStore};
use foreman_tools::search::BraveSearchClient;
use foreman_tools::{SearchClient, ToolError, ToolRegistry, WebHit};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Foreman orchestration agent.
#[derive(Parser, Debug)]
#[command(name = "foreman-agent", about = "Foreman orchestration agent")]
struct Cli {
    /// Path to the settings JSON file.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Session id to open or resume.
    #[arg(long, default_value = "default")]
    session: String,

    /// Data directory override (empty string forces in-memory mode).
    #[arg(long)]
    data_dir: Option<String>,

    /// Admin turn ceiling override.
    #[arg(long)]
    max_turns: Option<u32>,
}

impl Cli {
    fn default_settings_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(".foreman").join("settings.json")
    }
}

/// Search client used when no search API key is configured. Keeps the tool
/// declared; every call fails as an execution error.
struct DisabledSearch;

#[async_trait]
impl SearchClient for DisabledSearch {
    async fn search(&self, _query: &str, _count: u32) -> Result<Vec<WebHit>, ToolError> {
        Err(ToolError::internal("web search is not configured (set FOREMAN_SEARCH_API_KEY)"))
    }
}

struct Stores {
    documents: Arc<dyn DocumentStore>,
    messages: Arc<dyn MessageLog>,
    objects: Option<Arc<dyn ObjectStore>>,
}

/// Build the storage stack from settings. An empty data dir means degraded
/// mode: in-memory documents and messages, no object store.
fn build_stores(settings: &ForemanSettings) -> Result<Stores> {
    if settings.storage.data_dir.is_empty() {
        info!("no data directory configured, running in-memory");
        let store = Arc::new(MemoryStore::new());
        return Ok(Stores { documents: store.clone(), messages: store, objects: None });
    }

    let dir = Path::new(&settings.storage.data_dir);
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create data directory {}", dir.display()))?;

    let sqlite = Arc::new(
        SqliteStore::open(&dir.join("foreman.db")).context("failed to open database")?,
    );
    let objects = Arc::new(
        LocalObjectStore::new(dir.join("objects")).context("failed to open object store")?,
    );
    info!(dir = %dir.display(), "storage ready");
    Ok(Stores { documents: sqlite.clone(), messages: sqlite, objects: Some(objects) })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let settings_path = args.settings.clone().unwrap_or_else(Cli::default_settings_path);
    let mut settings = foreman_settings::load_settings_from_path(&settings_path)
        .context("failed to load settings")?;
    if let Some(dir) = args.data_dir {
        settings.storage.data_dir = dir;
    }
    if let Some(turns) = args.max_turns {
        settings.agent.max_turns = turns;
    }

    if settings.backend.api_key.is_empty() {
        bail!("no API key configured; set FOREMAN_API_KEY or backend.apiKey in settings");
    }

    let backend = Arc::new(
        GeminiBackend::new(GeminiConfig {
            api_key: settings.backend.api_key.clone(),
            model: settings.backend.model.clone(),
            base_url: settings.backend.base_url.clone(),
            temperature: settings.backend.temperature,
            max_output_tokens: settings.backend.max_output_tokens,
        })
        .context("failed to build reasoning backend")?,
    );
    info!(model = %settings.backend.model, "reasoning backend ready");

    let stores = build_stores(&settings)?;
    let planner = Arc::new(TaskService::new(stores.documents.clone(), stores.objects.clone()));
    let workers = Arc::new(WorkerExecutor::new(backend.clone()));

    let search: Arc<dyn SearchClient> = if settings.search.api_key.is_empty() {
        info!("search API key missing, web_search runs degraded");
        Arc::new(DisabledSearch)
    } else {
        Arc::new(
            BraveSearchClient::new(
                settings.search.api_key.clone(),
                settings.search.base_url.clone(),
            )
            .context("failed to build search client")?,
        )
    };

    let registry = Arc::new(ToolRegistry::new(
        search,
        planner,
        workers,
        None, // no memory recall backend bundled
        stores.objects,
    ));

    let session_id = SessionId::parse(&args.session)
        .with_context(|| format!("invalid session id {:?}", args.session))?;
    let session = Arc::new(Session::new(
        session_id,
        backend,
        registry,
        stores.messages,
        EventEmitter::new(),
        settings.agent.max_turns,
    ));
    session.hydrate().await.context("failed to load session history")?;
    let flush = session
        .spawn_history_flush(Duration::from_secs(settings.agent.history_flush_secs));

    println!("foreman-agent ready (session {}). /status /history /clear /quit", args.session);
    repl(&session).await?;

    flush.abort();
    session.flush_history().await.context("final history flush failed")?;
    Ok(())
}

async fn repl(session: &Session) -> Result<()> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        match line {
            "" => {}
            "/quit" | "/exit" => break,
            "/status" => {
                println!("{}", serde_json::to_string_pretty(&session.status())?);
            }
            "/history" => {
                for message in session.history() {
                    println!("[{:?}] {}", message.role, foreman_core::text::first_line(&message.content));
                }
            }
            "/clear" => {
                session.clear().await?;
                println!("session cleared");
            }
            _ => match session.chat(line, Vec::new()).await {
                Ok(outcome) => {
                    println!("{}", outcome.response);
                    for artifact in &outcome.artifacts {
                        println!("[artifact] {} ({})", artifact.title, artifact.artifact_type);
                    }
                    info!(
                        turns = outcome.metadata.turns_used,
                        phase = %outcome.conversation_phase,
                        tokens = outcome.metadata.usage.total(),
                        "request finished"
                    );
                }
                Err(e) => eprintln!("error: {e}"),
            },
        }
    }
    Ok(())
}
