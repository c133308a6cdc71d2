use nlquery_utils::error::ConfigError;

use super::Config;

/// Providers with a backend implementation
pub(crate) const SUPPORTED_PROVIDERS: &[&str] = &["openai"];

impl Config {
    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for the first out-of-range setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let provider = self.provider();
        if !SUPPORTED_PROVIDERS.contains(&provider) {
            return Err(ConfigError::InvalidValue {
                key: "llm.provider".to_string(),
                value: format!(
                    "unknown provider '{provider}' (supported: {})",
                    SUPPORTED_PROVIDERS.join(", ")
                ),
            });
        }

        if let Some(retry_ceiling) = self.workflow.retry_ceiling {
            if retry_ceiling == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "workflow.retry_ceiling".to_string(),
                    value: "must be greater than 0".to_string(),
                });
            }
            if retry_ceiling > 10 {
                return Err(ConfigError::InvalidValue {
                    key: "workflow.retry_ceiling".to_string(),
                    value: "exceeds maximum limit of 10".to_string(),
                });
            }
        }

        if self.workflow.chunk_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "workflow.chunk_size".to_string(),
                value: "must be greater than 0".to_string(),
            });
        }

        if self.workflow.max_prompt_rows == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "workflow.max_prompt_rows".to_string(),
                value: "must be greater than 0".to_string(),
            });
        }

        if self.database.max_connections == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "database.max_connections".to_string(),
                value: "must be greater than 0".to_string(),
            });
        }

        if let Some(openai) = &self.llm.openai {
            if openai.timeout_secs == Some(0) {
                return Err(ConfigError::InvalidValue {
                    key: "llm.openai.timeout_secs".to_string(),
                    value: "must be greater than 0".to_string(),
                });
            }
            if openai.max_tokens == Some(0) {
                return Err(ConfigError::InvalidValue {
                    key: "llm.openai.max_tokens".to_string(),
                    value: "must be greater than 0".to_string(),
                });
            }
        }

        Ok(())
    }
}
