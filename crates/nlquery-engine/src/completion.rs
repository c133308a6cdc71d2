//! Text-generation contract used by the workflow nodes
//!
//! Nodes build a [`CompletionRequest`] and hand it to a [`CompletionClient`].
//! [`LlmCompletionClient`] is the production adapter: it renders the prompt
//! template and forwards it to an [`LlmBackend`].

use async_trait::async_trait;
use nlquery_llm::{LlmBackend, LlmError, LlmInvocation, Message};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::prompts::{
    self, CHART_TEMPLATE, FIX_QUERY_TEMPLATE, GENERATE_QUERY_TEMPLATE, MAP_TEMPLATE,
    NARRATIVE_TEMPLATE, PromptError,
};

/// Which prompt a request renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    GenerateQuery,
    FixQuery,
    Narrative,
    Chart,
    Map,
}

impl PromptKind {
    #[must_use]
    pub const fn template(&self) -> &'static str {
        match self {
            Self::GenerateQuery => GENERATE_QUERY_TEMPLATE,
            Self::FixQuery => FIX_QUERY_TEMPLATE,
            Self::Narrative => NARRATIVE_TEMPLATE,
            Self::Chart => CHART_TEMPLATE,
            Self::Map => MAP_TEMPLATE,
        }
    }

    /// Sampling temperature. Only the narrative is allowed some variety.
    #[must_use]
    pub const fn temperature(&self) -> f32 {
        match self {
            Self::Narrative => 0.3,
            Self::GenerateQuery | Self::FixQuery | Self::Chart | Self::Map => 0.0,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GenerateQuery => "generate_query",
            Self::FixQuery => "fix_query",
            Self::Narrative => "narrative",
            Self::Chart => "chart",
            Self::Map => "map",
        }
    }
}

/// A prompt kind plus the variables its template needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub kind: PromptKind,
    pub vars: BTreeMap<&'static str, String>,
}

impl CompletionRequest {
    #[must_use]
    pub fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            vars: BTreeMap::new(),
        }
    }

    /// Set a template variable.
    #[must_use]
    pub fn var(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.vars.insert(name, value.into());
        self
    }

    /// Look up a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Render the prompt text.
    ///
    /// # Errors
    ///
    /// Returns `PromptError` if a template variable is missing.
    pub fn render(&self) -> Result<String, PromptError> {
        prompts::render(self.kind.template(), &self.vars)
    }
}

/// Asynchronous text generation.
///
/// Output carries no correctness guarantee; callers validate or parse it.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// # Errors
    ///
    /// Any `LlmError` is an upstream failure for the workflow.
    async fn generate(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

#[async_trait]
impl<T: CompletionClient + ?Sized> CompletionClient for std::sync::Arc<T> {
    async fn generate(&self, request: CompletionRequest) -> Result<String, LlmError> {
        (**self).generate(request).await
    }
}

/// [`CompletionClient`] over an [`LlmBackend`].
pub struct LlmCompletionClient {
    backend: Box<dyn LlmBackend>,
    model: String,
    timeout: Duration,
}

impl LlmCompletionClient {
    /// `model` may be empty to use the backend's default.
    #[must_use]
    pub fn new(backend: Box<dyn LlmBackend>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            backend,
            model: model.into(),
            timeout,
        }
    }
}

#[async_trait]
impl CompletionClient for LlmCompletionClient {
    async fn generate(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let prompt = request
            .render()
            .map_err(|e| LlmError::Misconfiguration(format!("{} prompt: {e}", request.kind.as_str())))?;

        debug!(
            prompt = request.kind.as_str(),
            prompt_chars = prompt.chars().count(),
            "Requesting completion"
        );

        let invocation = LlmInvocation::new(self.model.clone(), self.timeout, vec![Message::user(prompt)])
            .with_temperature(request.kind.temperature());

        let result = self.backend.invoke(invocation).await?;
        Ok(result.raw_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlquery_llm::{LlmResult, TEMPERATURE_KEY};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingBackend {
        seen: Arc<Mutex<Vec<LlmInvocation>>>,
    }

    #[async_trait]
    impl LlmBackend for RecordingBackend {
        async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
            self.seen.lock().unwrap().push(inv);
            Ok(LlmResult::new("SELECT 1", "fake", "fake-model"))
        }
    }

    #[tokio::test]
    async fn test_adapter_renders_prompt_and_sets_temperature() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let client = LlmCompletionClient::new(
            Box::new(RecordingBackend {
                seen: Arc::clone(&seen),
            }),
            "gpt-4o",
            Duration::from_secs(30),
        );

        let text = client
            .generate(
                CompletionRequest::new(PromptKind::Narrative)
                    .var("question", "How many terminals?")
                    .var("results", "Row 1: {\"n\":3}"),
            )
            .await
            .unwrap();
        assert_eq!(text, "SELECT 1");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "gpt-4o");
        assert_eq!(seen[0].timeout, Duration::from_secs(30));
        assert!(seen[0].messages[0].content.contains("How many terminals?"));
        assert!(seen[0].messages[0].content.contains("Row 1: {\"n\":3}"));
        let temperature = seen[0].metadata[TEMPERATURE_KEY].as_f64().unwrap();
        assert!((temperature - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_missing_variable_is_misconfiguration() {
        let client = LlmCompletionClient::new(
            Box::new(RecordingBackend::default()),
            "",
            Duration::from_secs(1),
        );
        let err = client
            .generate(CompletionRequest::new(PromptKind::GenerateQuery))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Misconfiguration(_)));
    }

    #[test]
    fn test_temperatures() {
        assert_eq!(PromptKind::GenerateQuery.temperature(), 0.0);
        assert_eq!(PromptKind::Chart.temperature(), 0.0);
        assert!(PromptKind::Narrative.temperature() > 0.0);
    }
}
