use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{CliArgs, Config, ConfigSource, DatabaseConfig, LlmConfig, WorkflowConfig};

/// Environment variable overriding the database path
pub(crate) const DATABASE_PATH_ENV: &str = "NLQUERY_DATABASE_PATH";

/// Environment variable overriding the model
pub(crate) const MODEL_ENV: &str = "NLQUERY_MODEL";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    llm: Option<LlmConfig>,
    database: Option<DatabaseConfig>,
    workflow: Option<WorkflowConfig>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > env > file > defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be read, the config
    /// file cannot be parsed, or the resulting values fail validation.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover configuration starting from a specific directory.
    ///
    /// # Errors
    ///
    /// See [`Config::discover`].
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        Self::discover_with_env(start_dir, cli_args, |key| std::env::var(key).ok())
    }

    /// Path-and-environment-driven discovery used by tests to avoid process-global state.
    pub(crate) fn discover_with_env(
        start_dir: &Path,
        cli_args: &CliArgs,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Config {
            source_attribution: HashMap::new(),
            ..Config::default()
        };

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    anyhow::bail!(
                        "Configuration file not found: {}",
                        explicit.display()
                    );
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            config.apply_file(file_config, path);
            tracing::debug!(path = %path.display(), "Loaded configuration file");
        }

        if let Some(path) = env(DATABASE_PATH_ENV) {
            config.database.path = Some(path);
            config.source_attribution.insert(
                "database.path".to_string(),
                ConfigSource::Environment(DATABASE_PATH_ENV.to_string()),
            );
        }
        if let Some(model) = env(MODEL_ENV) {
            config.llm.openai.get_or_insert_with(Default::default).model = Some(model);
            config.source_attribution.insert(
                "llm.openai.model".to_string(),
                ConfigSource::Environment(MODEL_ENV.to_string()),
            );
        }

        if let Some(path) = &cli_args.database_path {
            config.database.path = Some(path.clone());
            config
                .source_attribution
                .insert("database.path".to_string(), ConfigSource::Cli);
        }
        if let Some(model) = &cli_args.model {
            config.llm.openai.get_or_insert_with(Default::default).model = Some(model.clone());
            config
                .source_attribution
                .insert("llm.openai.model".to_string(), ConfigSource::Cli);
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: TomlConfig, path: &Path) {
        let source = ConfigSource::ConfigFile(path.to_path_buf());
        let mut mark = |key: &str| {
            self.source_attribution
                .insert(key.to_string(), source.clone());
        };

        if let Some(llm) = file.llm {
            if llm.provider.is_some() {
                mark("llm.provider");
            }
            if llm.openai.as_ref().is_some_and(|o| o.model.is_some()) {
                mark("llm.openai.model");
            }
            self.llm = llm;
        }
        if let Some(database) = file.database {
            if database.path.is_some() {
                mark("database.path");
            }
            if database.max_connections.is_some() {
                mark("database.max_connections");
            }
            self.database = database;
        }
        if let Some(mut workflow) = file.workflow {
            if workflow.retry_ceiling.is_some() {
                mark("workflow.retry_ceiling");
            }
            if workflow.chunk_size.is_some() {
                mark("workflow.chunk_size");
            }
            if workflow.max_prompt_rows.is_some() {
                mark("workflow.max_prompt_rows");
            }
            // Relative schema paths resolve against the directory holding .nlquery/
            if let Some(schema) = workflow.schema_file.take() {
                workflow.schema_file = Some(resolve_relative(path, schema));
            }
            self.workflow = workflow;
        }
    }

    /// Search upward from `start_dir` for `.nlquery/config.toml`.
    ///
    /// Stops at the filesystem root or at a repository root marker.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(".nlquery").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            if current_dir.join(".git").exists() {
                return None;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => return None,
            }
        }
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;
        Ok(config)
    }
}

fn resolve_relative(config_path: &Path, target: PathBuf) -> PathBuf {
    if target.is_absolute() {
        return target;
    }
    // config_path is <root>/.nlquery/config.toml
    match config_path.parent().and_then(Path::parent) {
        Some(root) => root.join(target),
        None => target,
    }
}
