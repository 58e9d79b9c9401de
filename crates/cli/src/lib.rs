use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tutor_search::{PromptMessages, RetrievalConfig, RetrievalResult};
use tutor_vector_store::{Embedder, StubEmbedder, DEFAULT_STUB_DIMENSION};

pub mod ingest;
pub mod ollama;
pub mod scanner;

use ingest::{IngestStats, KnowledgeBase};
use ollama::{OllamaClient, DEFAULT_CHAT_MODEL, DEFAULT_EMBED_MODEL, DEFAULT_OLLAMA_URL};

/// Config file picked up from the project root when `--config` is absent
const PROJECT_CONFIG_FILE: &str = "tutor.toml";

fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "tutor")]
#[command(about = "Ask questions about a JavaScript library from its sources and docs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(long, global = true)]
    quiet: bool,

    #[command(flatten)]
    backend: BackendArgs,

    #[command(flatten)]
    retrieval: RetrievalArgs,
}

#[derive(Args)]
struct BackendArgs {
    /// Embedding backend
    #[arg(long, global = true, value_enum, env = "TUTOR_EMBEDDING_MODE", default_value = "stub")]
    embed_mode: EmbedMode,

    /// Base URL of the Ollama server
    #[arg(long, global = true, env = "TUTOR_OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL)]
    ollama_url: String,

    /// Ollama embedding model
    #[arg(long, global = true, env = "TUTOR_EMBED_MODEL", default_value = DEFAULT_EMBED_MODEL)]
    embed_model: String,

    /// Ollama chat model used by `ask` and `chat`
    #[arg(long, global = true, env = "TUTOR_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    /// Vector width of the stub embedder
    #[arg(long, global = true, default_value_t = DEFAULT_STUB_DIMENSION)]
    stub_dimension: usize,
}

#[derive(Args, Default)]
struct RetrievalArgs {
    /// Retrieval config file (defaults to <path>/tutor.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Hits taken from each corpus
    #[arg(long, global = true)]
    top_k: Option<usize>,

    /// Minimum cosine similarity for every corpus
    #[arg(long, global = true)]
    threshold: Option<f32>,

    /// Cap on the merged result list
    #[arg(long, global = true)]
    global_cap: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan and index a project, reporting what was found
    Index(IndexArgs),

    /// Print the chunks most similar to a query
    Search(SearchArgs),

    /// Answer one question from the indexed project
    Ask(AskArgs),

    /// Interactive question loop (`exit` quits)
    Chat(ChatArgs),
}

#[derive(Args)]
struct IndexArgs {
    /// Project directory
    path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SearchArgs {
    /// Project directory
    path: PathBuf,

    /// Search query
    query: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct AskArgs {
    /// Project directory
    path: PathBuf,

    /// Question about the library
    question: String,

    /// Print the retrieved snippets before the answer
    #[arg(long)]
    show_context: bool,
}

#[derive(Args)]
struct ChatArgs {
    /// Project directory
    path: PathBuf,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum EmbedMode {
    Stub,
    Ollama,
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    results: Vec<RetrievalResult<'a>>,
}

/// Embedding backend plus the chat client shared by `ask` and `chat`
struct Backend {
    embedder: Box<dyn Embedder>,
    ollama: OllamaClient,
}

impl Backend {
    fn from_args(args: &BackendArgs) -> Result<Self> {
        let ollama = OllamaClient::new(&args.ollama_url, &args.embed_model, &args.chat_model)?;
        let embedder: Box<dyn Embedder> = match args.embed_mode {
            EmbedMode::Stub => Box::new(StubEmbedder::new(args.stub_dimension)),
            EmbedMode::Ollama => Box::new(ollama.clone()),
        };
        log::debug!("Embedding with {}", embedder.model_id());
        Ok(Self { embedder, ollama })
    }
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON parsing
    let json_output = match &cli.command {
        Commands::Index(args) => args.json,
        Commands::Search(args) => args.json,
        Commands::Ask(_) | Commands::Chat(_) => false,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let backend = Backend::from_args(&cli.backend)?;
    match cli.command {
        Commands::Index(args) => run_index(args, &cli.retrieval, &backend).await,
        Commands::Search(args) => run_search(args, &cli.retrieval, &backend).await,
        Commands::Ask(args) => run_ask(args, &cli.retrieval, &backend).await,
        Commands::Chat(args) => run_chat(args, &cli.retrieval, &backend).await,
    }
}

/// File config (explicit or discovered at the project root) with flag overrides applied
fn resolve_config(args: &RetrievalArgs, root: &Path) -> Result<RetrievalConfig> {
    let discovered = root.join(PROJECT_CONFIG_FILE);
    let path = args
        .config
        .clone()
        .or_else(|| discovered.is_file().then_some(discovered));

    let mut config = match path {
        Some(path) => RetrievalConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RetrievalConfig::default(),
    };

    for settings in config.corpora.values_mut() {
        if let Some(top_k) = args.top_k {
            settings.top_k = top_k;
        }
        if let Some(threshold) = args.threshold {
            settings.threshold = threshold;
        }
    }
    if args.global_cap.is_some() {
        config.global_cap = args.global_cap;
    }

    config.validate()?;
    Ok(config)
}

async fn load_knowledge_base(
    root: &Path,
    retrieval: &RetrievalArgs,
    backend: &Backend,
) -> Result<KnowledgeBase> {
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }
    let config = resolve_config(retrieval, root)?;
    KnowledgeBase::build(root, backend.embedder.as_ref(), &config)
        .await
        .with_context(|| format!("failed to index {}", root.display()))
}

async fn run_index(args: IndexArgs, retrieval: &RetrievalArgs, backend: &Backend) -> Result<()> {
    let kb = load_knowledge_base(&args.path, retrieval, backend).await?;
    let stats = kb.stats();

    if args.json {
        print_stdout(&serde_json::to_string_pretty(stats)?)?;
    } else {
        print_stdout(&format_stats(stats))?;
    }
    Ok(())
}

fn format_stats(stats: &IngestStats) -> String {
    let mut out = format!(
        "code: {} chunks from {} files\ndocs: {} sections from {} files",
        stats.code_chunks, stats.code_files, stats.doc_chunks, stats.doc_files
    );
    if !stats.unbalanced_files.is_empty() {
        out.push_str(&format!(
            "\nunbalanced: {}",
            stats.unbalanced_files.join(", ")
        ));
    }
    out
}

async fn run_search(args: SearchArgs, retrieval: &RetrievalArgs, backend: &Backend) -> Result<()> {
    let kb = load_knowledge_base(&args.path, retrieval, backend).await?;
    let results = kb.search(backend.embedder.as_ref(), &args.query).await?;

    if args.json {
        let output = SearchOutput {
            query: &args.query,
            results,
        };
        print_stdout(&serde_json::to_string_pretty(&output)?)?;
    } else {
        print_stdout(&format_results(&results))?;
    }
    Ok(())
}

fn format_results(results: &[RetrievalResult<'_>]) -> String {
    if results.is_empty() {
        return "No matches.".to_string();
    }

    let mut lines = Vec::new();
    for (i, result) in results.iter().enumerate() {
        let chunk = result.chunk;
        let mut header = format!(
            "{}. [{}] {} (score: {:.3})",
            i + 1,
            result.corpus,
            chunk.source_id(),
            result.score
        );
        if let Some(section) = chunk.kind().section() {
            header.push_str(&format!(" - {section}"));
        }
        lines.push(header);
        let preview = chunk.text().lines().next().unwrap_or_default();
        lines.push(format!("   {preview}"));
    }
    lines.join("\n")
}

async fn run_ask(args: AskArgs, retrieval: &RetrievalArgs, backend: &Backend) -> Result<()> {
    let kb = load_knowledge_base(&args.path, retrieval, backend).await?;
    answer(&kb, backend, &args.question, args.show_context).await
}

async fn answer(kb: &KnowledgeBase, backend: &Backend, question: &str, show: bool) -> Result<()> {
    let results = kb.search(backend.embedder.as_ref(), question).await?;
    if results.is_empty() {
        log::warn!("No snippet passed the similarity threshold");
    }
    let prompt = PromptMessages::new(question, &results);
    if show {
        print_stdout(&tutor_search::render_context(&results))?;
    }

    log::debug!("Asking {}", backend.ollama.chat_model());
    let mut stdout = io::stdout();
    backend.ollama.chat_stream(&prompt, &mut stdout).await?;
    print_stdout("")?;

    if !results.is_empty() {
        let sources: Vec<&str> = results.iter().map(|r| r.chunk.source_id()).collect();
        log::info!("Sources: {}", sources.join(", "));
    }
    Ok(())
}

async fn run_chat(args: ChatArgs, retrieval: &RetrievalArgs, backend: &Backend) -> Result<()> {
    let kb = load_knowledge_base(&args.path, retrieval, backend).await?;
    print_stdout("Ready. Type 'exit' to quit.")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!(">> Ask: ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        if let Err(err) = answer(&kb, backend, question, false).await {
            log::error!("{err:#}");
        }
    }
    Ok(())
}
