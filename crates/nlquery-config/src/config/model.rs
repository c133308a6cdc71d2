use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Default LLM provider
pub const DEFAULT_PROVIDER: &str = "openai";

/// Default model for the OpenAI-compatible provider
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default per-completion timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default maximum completion calls per process
pub const DEFAULT_BUDGET: u32 = 20;

/// Default database file
pub const DEFAULT_DATABASE_PATH: &str = "data/fr8tools.db";

/// Default connection pool size
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Default retry ceiling for the generate/fix loop
pub const DEFAULT_RETRY_CEILING: u32 = 2;

/// Default size of streamed content chunks, in characters
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Default number of rows rendered into formatter prompts
pub const DEFAULT_MAX_PROMPT_ROWS: usize = 30;

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value provided via environment variable.
    Environment(String),
    /// Value loaded from a configuration file.
    ConfigFile(PathBuf),
    /// Built-in default value (lowest precedence).
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::Environment(var) => write!(f, "env:{var}"),
            Self::ConfigFile(path) => write!(f, "config:{}", path.display()),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Configuration for nlquery.
///
/// Precedence: CLI arguments > environment > config file > built-in defaults.
///
/// # Configuration File Format
///
/// ```toml
/// [llm]
/// provider = "openai"
///
/// [llm.openai]
/// api_key_env = "OPENAI_API_KEY"
/// model = "gpt-4o"
/// budget = 20
///
/// [database]
/// path = "data/fr8tools.db"
///
/// [workflow]
/// retry_ceiling = 2
/// chunk_size = 50
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// LLM provider configuration.
    pub llm: LlmConfig,
    /// Data store configuration.
    pub database: DatabaseConfig,
    /// Workflow tuning.
    pub workflow: WorkflowConfig,
    /// Source attribution for each setting (for `nlquery config`).
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// LLM provider configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    pub provider: Option<String>,
    pub openai: Option<OpenAiConfig>,
}

/// OpenAI-compatible HTTP provider configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub budget: Option<u32>,
}

/// Read-only data store configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: Option<String>,
    pub max_connections: Option<u32>,
}

/// Workflow tuning
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Generate/fix attempts allowed before the run is routed to Fail
    pub retry_ceiling: Option<u32>,
    /// Streamed content chunk size, in characters
    pub chunk_size: Option<usize>,
    /// Rows rendered into formatter prompts
    pub max_prompt_rows: Option<usize>,
    /// File holding the schema description injected into query prompts
    pub schema_file: Option<PathBuf>,
}

impl Config {
    /// Provider name, defaulting to `openai`.
    #[must_use]
    pub fn provider(&self) -> &str {
        self.llm.provider.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    /// Model for completions.
    #[must_use]
    pub fn model(&self) -> &str {
        self.llm
            .openai
            .as_ref()
            .and_then(|o| o.model.as_deref())
            .unwrap_or(DEFAULT_MODEL)
    }

    /// Per-completion timeout.
    #[must_use]
    pub fn llm_timeout(&self) -> std::time::Duration {
        let secs = self
            .llm
            .openai
            .as_ref()
            .and_then(|o| o.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        std::time::Duration::from_secs(secs)
    }

    /// Database path.
    #[must_use]
    pub fn database_path(&self) -> &str {
        self.database
            .path
            .as_deref()
            .unwrap_or(DEFAULT_DATABASE_PATH)
    }

    /// Connection pool size.
    #[must_use]
    pub fn max_connections(&self) -> u32 {
        self.database
            .max_connections
            .unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }

    /// Retry ceiling for the generate/fix loop.
    #[must_use]
    pub fn retry_ceiling(&self) -> u32 {
        self.workflow.retry_ceiling.unwrap_or(DEFAULT_RETRY_CEILING)
    }

    /// Content chunk size in characters.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.workflow.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE)
    }

    /// Rows rendered into formatter prompts.
    #[must_use]
    pub fn max_prompt_rows(&self) -> usize {
        self.workflow
            .max_prompt_rows
            .unwrap_or(DEFAULT_MAX_PROMPT_ROWS)
    }

    /// Read the configured schema description, if a schema file is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is configured but cannot be read.
    pub fn schema_description(&self) -> std::io::Result<Option<String>> {
        match &self.workflow.schema_file {
            Some(path) => std::fs::read_to_string(path).map(Some),
            None => Ok(None),
        }
    }

    /// Effective settings with their sources, sorted by key.
    #[must_use]
    pub fn effective(&self) -> Vec<(String, String, String)> {
        let mut entries = vec![
            ("llm.provider", self.provider().to_string()),
            ("llm.openai.model", self.model().to_string()),
            ("database.path", self.database_path().to_string()),
            ("database.max_connections", self.max_connections().to_string()),
            ("workflow.retry_ceiling", self.retry_ceiling().to_string()),
            ("workflow.chunk_size", self.chunk_size().to_string()),
            ("workflow.max_prompt_rows", self.max_prompt_rows().to_string()),
        ]
        .into_iter()
        .map(|(key, value)| {
            let source = self
                .source_attribution
                .get(key)
                .cloned()
                .unwrap_or(ConfigSource::Default);
            (key.to_string(), value, source.to_string())
        })
        .collect::<Vec<_>>();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
