//! Configuration model, discovery, and validation for nlquery.

mod config;

pub use config::{
    CliArgs, Config, ConfigSource, DEFAULT_API_KEY_ENV, DEFAULT_BUDGET, DatabaseConfig, LlmConfig,
    OpenAiConfig, WorkflowConfig,
};
