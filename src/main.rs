//! Thin CLI wrapper over the query core — not part of the core itself
//! (see crate-level docs). Exposes the pipeline DSL plus a handful of
//! ergonomic subcommands, in the spirit of the teacher's own CLI-over-library
//! split (`magellan`'s `src/main.rs` + `src/cli.rs`), but driven by `clap`
//! derive rather than a hand-rolled arg parser.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use scip_index::{Cache, Registry};

#[derive(Parser)]
#[command(name = "scip-index", version = scip_index::version::version(), about = "Incremental, queryable SCIP-based semantic code-intelligence index")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a pipeline query against a project's persisted cache.
    Query {
        /// The pipeline DSL string, e.g. `find Auth* | members`.
        pipeline: String,
        /// Project root whose cache should be loaded.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Override the global cache directory (defaults to `<cache-dir>/<TOOL>`).
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Output format.
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Print index statistics for a project's persisted cache.
    Status {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Run the JSON-RPC 2.0 stdio protocol server.
    Serve {
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Print version and build metadata.
    Version,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

fn main() -> ExitCode {
    let settings = scip_index::Settings::load().unwrap_or_default();
    scip_index::logging::init_with_config(&settings.logging);

    let cli = Cli::parse();
    match cli.command {
        Command::Query {
            pipeline,
            root,
            cache_dir,
            format,
        } => run_query(&pipeline, &root, cache_dir, &settings, format),
        Command::Status { root, cache_dir } => run_status(&root, cache_dir, &settings),
        Command::Serve { cache_dir } => run_serve(cache_dir, &settings),
        Command::Version => {
            println!("{}", scip_index::version::version());
            ExitCode::SUCCESS
        }
    }
}

fn resolve_cache_dir(explicit: Option<PathBuf>, root: &std::path::Path, settings: &scip_index::Settings) -> PathBuf {
    explicit.unwrap_or_else(|| settings.cache_dir().join(cache_key_for(root)))
}

/// Per-project cache subdirectory name: the absolute root path, hex-encoded,
/// so two projects never collide under the shared global cache directory.
fn cache_key_for(root: &std::path::Path) -> String {
    let absolute = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    hex::encode(absolute.to_string_lossy().as_bytes())
}

fn load_project(root: &std::path::Path, cache_dir: Option<PathBuf>, settings: &scip_index::Settings) -> Registry {
    let cache_dir = resolve_cache_dir(cache_dir, root, settings);
    let cache = Cache::new(cache_dir, settings.cache.max_size_bytes);
    let mut registry = Registry::new();
    if let Some(loaded) = cache.load(root, Some(root.to_path_buf())) {
        registry.project_index = Some(loaded.index);
    }
    registry
}

fn run_query(pipeline: &str, root: &std::path::Path, cache_dir: Option<PathBuf>, settings: &scip_index::Settings, format: OutputFormat) -> ExitCode {
    let registry = load_project(root, cache_dir, settings);
    let result = scip_index::query::run(&registry, pipeline);
    let is_error = matches!(result, scip_index::query::wire::QueryResult::Error { .. });

    match format {
        OutputFormat::Json => println!("{}", result.to_json()),
        OutputFormat::Text => println!("{}", scip_index::server::render_text(&result)),
    }

    if is_error {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn run_status(root: &std::path::Path, cache_dir: Option<PathBuf>, settings: &scip_index::Settings) -> ExitCode {
    let registry = load_project(root, cache_dir, settings);
    let stats = registry.project_index.as_ref().map(|idx| idx.stats()).unwrap_or_default();
    println!("{}", json!({"root": root.display().to_string(), "cached": registry.project_index.is_some(), "stats": stats}));
    ExitCode::SUCCESS
}

/// A [`scip_index::server::ServerContext`] backed by a single on-disk cache,
/// loaded lazily on `initialize`. No language binding is wired up here (out
/// of scope for the core); `file/didChange` notifications are accepted but
/// cannot trigger a reindex without one, so they are logged and dropped.
struct CliServerContext {
    registry: Registry,
    root: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    settings: Arc<scip_index::Settings>,
}

impl scip_index::server::ServerContext for CliServerContext {
    fn initialize(&mut self, root_path: &str, _language_id: &str) -> Result<(), String> {
        let root = PathBuf::from(root_path);
        self.registry = load_project(&root, self.cache_dir.clone(), &self.settings);
        self.root = Some(root);
        Ok(())
    }

    fn provider(&self) -> &dyn scip_index::Provider {
        &self.registry
    }

    fn status(&self) -> Value {
        let stats = self.registry.project_index.as_ref().map(|idx| idx.stats()).unwrap_or_default();
        json!({
            "initialized": self.root.is_some(),
            "root": self.root.as_ref().map(|r| r.display().to_string()),
            "stats": stats,
        })
    }

    fn notify_file_changed(&mut self, path: &str) {
        tracing::warn!(path, "file/didChange received but no language binding is wired into the CLI server; ignoring");
    }
}

fn run_serve(cache_dir: Option<PathBuf>, settings: &scip_index::Settings) -> ExitCode {
    let ctx = CliServerContext {
        registry: Registry::new(),
        root: None,
        cache_dir,
        settings: Arc::new(settings.clone()),
    };
    let stdin = io::stdin();
    let stdout = io::stdout();
    scip_index::server::run_stdio(ctx, stdin.lock(), stdout.lock());
    ExitCode::SUCCESS
}
