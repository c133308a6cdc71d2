//! Call-count budget around any backend

use crate::LlmError;
use crate::types::{LlmBackend, LlmInvocation, LlmResult};
use async_trait::async_trait;
use nlquery_config::DEFAULT_BUDGET;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

/// Environment variable overriding the budget limit
pub(crate) const BUDGET_ENV_VAR: &str = "NLQUERY_LLM_BUDGET";

/// Wraps an `LlmBackend` and refuses invocations past a fixed limit.
///
/// The budget counts attempted calls, so failed calls still consume a slot.
/// The counter lives as long as the wrapper, which is one per process in the
/// CLI.
pub struct BudgetedBackend {
    inner: Box<dyn LlmBackend>,
    calls: AtomicU32,
    limit: u32,
}

impl BudgetedBackend {
    pub fn new(inner: Box<dyn LlmBackend>, limit: u32) -> Self {
        debug!(limit = limit, "Creating BudgetedBackend");
        Self {
            inner,
            calls: AtomicU32::new(0),
            limit,
        }
    }

    /// Resolve the limit from `NLQUERY_LLM_BUDGET`, then `config_budget`, then the default.
    pub fn with_limit_from_config(inner: Box<dyn LlmBackend>, config_budget: Option<u32>) -> Self {
        let env_value = std::env::var(BUDGET_ENV_VAR).ok();
        Self::new(inner, resolve_limit(env_value.as_deref(), config_budget))
    }

    /// Calls attempted so far.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }
}

/// Precedence: env var > config file > default. Unparseable env values are ignored.
fn resolve_limit(env_value: Option<&str>, config_budget: Option<u32>) -> u32 {
    if let Some(limit) = env_value.and_then(|s| s.trim().parse::<u32>().ok()) {
        debug!(limit = limit, "Using budget limit from {}", BUDGET_ENV_VAR);
        return limit;
    }
    if let Some(limit) = config_budget {
        debug!(limit = limit, "Using budget limit from config file");
        return limit;
    }
    DEFAULT_BUDGET
}

#[async_trait]
impl LlmBackend for BudgetedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        // Count before calling so retries cannot bypass the limit
        let current = self.calls.fetch_add(1, Ordering::SeqCst);

        if current >= self.limit {
            let attempted = current + 1;
            warn!(limit = self.limit, attempted = attempted, "Budget limit exceeded");
            return Err(LlmError::BudgetExceeded {
                limit: self.limit,
                attempted,
            });
        }

        let result = self.inner.invoke(inv).await;
        if let Err(e) = &result {
            debug!(
                call_count = current + 1,
                limit = self.limit,
                error = %e,
                "Inner backend invocation failed (budget slot still consumed)"
            );
        }
        result
    }
}
