//! Process configuration, loaded from environment (with `.env` support via
//! `dotenvy`) and from CLI flags layered on top via `clap`'s `env` feature.

use std::path::PathBuf;

use clap::Parser;

/// Database connection configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub pool_size: usize,
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.dbname
        )
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            user: "organism".to_string(),
            password: String::new(),
            dbname: "organism".to_string(),
            pool_size: 8,
        }
    }
}

/// External text-generation service configuration.
#[derive(Debug, Clone)]
pub struct TextModelConfig {
    pub base_url: String,
    pub model: String,
    pub request_timeout_secs: u64,
    pub embedding_enabled: bool,
}

impl Default for TextModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3".to_string(),
            request_timeout_secs: 120,
            embedding_enabled: true,
        }
    }
}

/// Sandboxed workspace configuration for file-system agent capabilities.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub root: PathBuf,
    pub max_read_bytes: usize,
    pub subprocess_timeout_secs: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./workspace"),
            max_read_bytes: 10_000,
            subprocess_timeout_secs: 60,
        }
    }
}

/// Tick scheduler cadence configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick_interval_secs: u64,
    pub season_turn_every: u64,
    pub pulse_every: u64,
    pub dream_every: u64,
    pub self_model_every: u64,
    pub memory_consolidation_every: u64,
    pub max_llm_evals_per_tick: u32,
    pub max_active_agents: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            season_turn_every: 5,
            pulse_every: 3,
            dream_every: 4,
            self_model_every: 10,
            memory_consolidation_every: 20,
            max_llm_evals_per_tick: 4,
            max_active_agents: 8,
        }
    }
}

/// HTTP/WebSocket surface bind configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8420,
        }
    }
}

/// Top-level process configuration, assembled from environment variables.
///
/// Every field is also settable as a CLI flag via [`Cli`], which takes
/// precedence when present.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub text_model: TextModelConfig,
    pub workspace: WorkspaceConfig,
    pub scheduler: SchedulerConfig,
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults. Call [`dotenvy::dotenv`] before this in development so a
    /// `.env` file populates the environment first.
    pub fn from_env() -> Self {
        let mut cfg = Config::default();

        if let Ok(v) = std::env::var("ORGANISM_DATABASE_HOST") {
            cfg.database.host = v;
        }
        if let Ok(v) = std::env::var("ORGANISM_DATABASE_PORT") {
            if let Ok(p) = v.parse() {
                cfg.database.port = p;
            }
        }
        if let Ok(v) = std::env::var("ORGANISM_DATABASE_USER") {
            cfg.database.user = v;
        }
        if let Ok(v) = std::env::var("ORGANISM_DATABASE_PASSWORD") {
            cfg.database.password = v;
        }
        if let Ok(v) = std::env::var("ORGANISM_DATABASE_NAME") {
            cfg.database.dbname = v;
        }
        if let Ok(v) = std::env::var("ORGANISM_TEXT_MODEL_URL") {
            cfg.text_model.base_url = v;
        }
        if let Ok(v) = std::env::var("ORGANISM_TEXT_MODEL_NAME") {
            cfg.text_model.model = v;
        }
        if let Ok(v) = std::env::var("ORGANISM_WORKSPACE_ROOT") {
            cfg.workspace.root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("ORGANISM_TICK_INTERVAL_SECS") {
            if let Ok(p) = v.parse() {
                cfg.scheduler.tick_interval_secs = p;
            }
        }
        if let Ok(v) = std::env::var("ORGANISM_HTTP_HOST") {
            cfg.http.host = v;
        }
        if let Ok(v) = std::env::var("ORGANISM_HTTP_PORT") {
            if let Ok(p) = v.parse() {
                cfg.http.port = p;
            }
        }

        cfg
    }
}

/// Command-line interface. Every flag mirrors an environment variable via
/// clap's `env` feature so either form works in a container or a shell.
#[derive(Parser, Debug)]
#[command(name = "organism", version, about = "Autonomous garden organism kernel")]
pub struct Cli {
    #[arg(long, env = "ORGANISM_DATABASE_HOST", default_value = "127.0.0.1")]
    pub database_host: String,

    #[arg(long, env = "ORGANISM_DATABASE_PORT", default_value_t = 5432)]
    pub database_port: u16,

    #[arg(long, env = "ORGANISM_TEXT_MODEL_URL", default_value = "http://127.0.0.1:11434")]
    pub text_model_url: String,

    #[arg(long, env = "ORGANISM_WORKSPACE_ROOT", default_value = "./workspace")]
    pub workspace_root: PathBuf,

    #[arg(long, env = "ORGANISM_HTTP_HOST", default_value = "127.0.0.1")]
    pub http_host: String,

    #[arg(long, env = "ORGANISM_HTTP_PORT", default_value_t = 8420)]
    pub http_port: u16,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Run migrations, start the hormone bus, and enter the tick loop.
    Run,
    /// Inspect or modify persisted settings overrides.
    Config {
        #[command(subcommand)]
        cmd: crate::cli::config::ConfigCommand,
    },
    /// Run pending database migrations and exit.
    Migrate,
    /// Plant a single seed from a wish given on the command line, then exit.
    Plant {
        wish: String,
    },
}
