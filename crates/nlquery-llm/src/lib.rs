//! Completion backends for nlquery
//!
//! Every provider implements [`LlmBackend`], so the workflow engine can run
//! against an HTTP provider or a scripted fake without knowing which.

mod budgeted_backend;
mod http_client;
mod openai_backend;
mod types;

pub use budgeted_backend::BudgetedBackend;
pub use nlquery_utils::error::LlmError;
pub use types::{
    LlmBackend, LlmInvocation, LlmResult, MAX_TOKENS_KEY, Message, Role, TEMPERATURE_KEY,
};

use nlquery_config::Config;
use openai_backend::OpenAiBackend;

/// Redact credentials and key-like tokens from a message.
#[doc(hidden)]
#[must_use]
pub fn redact_error_message(message: &str) -> String {
    http_client::redact_error_message(message)
}

/// Create the configured backend, wrapped in a call budget.
///
/// # Errors
///
/// Returns `LlmError::Unsupported` for an unknown provider and
/// `LlmError::Misconfiguration` when provider settings are incomplete.
pub fn from_config(config: &Config) -> Result<Box<dyn LlmBackend>, LlmError> {
    match config.provider() {
        "openai" => {
            let backend = OpenAiBackend::new_from_config(config)?;
            let config_budget = config.llm.openai.as_ref().and_then(|o| o.budget);
            let budgeted = BudgetedBackend::with_limit_from_config(Box::new(backend), config_budget);
            tracing::debug!(
                provider = "openai",
                model = config.model(),
                limit = budgeted.limit(),
                "Constructed completion backend"
            );
            Ok(Box::new(budgeted))
        }
        unknown => Err(LlmError::Unsupported(format!(
            "Unknown LLM provider '{unknown}'. Supported providers: openai."
        ))),
    }
}
