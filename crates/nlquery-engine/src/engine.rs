//! Workflow driver
//!
//! [`WorkflowEngine::run`] walks the transition table one node at a time,
//! applies each node's update to a request-local [`WorkflowState`], and
//! streams events to the subscriber in order.

use std::sync::Arc;
use std::time::Instant;

use nlquery_config::Config;
use nlquery_store::DataStore;
use nlquery_utils::error::WorkflowError;
use nlquery_utils::logging::{log_node_complete, node_span, run_span};
use tokio::sync::mpsc;
use tracing::{Instrument, error, info, warn};

use crate::completion::CompletionClient;
use crate::event::{EventSink, EventStream, StreamEvent, chunk_text};
use crate::nodes::{self, NodeContext};
use crate::prompts::DEFAULT_SCHEMA;
use crate::routing::{Next, Node, next_step};
use crate::state::WorkflowState;

/// Events buffered between the engine task and the subscriber.
const EVENT_BUFFER: usize = 16;

/// Tunables for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Generate and fix calls allowed before giving up.
    pub retry_ceiling: u32,
    /// Characters per `content` event.
    pub chunk_size: usize,
    /// Rows rendered into formatter prompts.
    pub max_prompt_rows: usize,
    /// Schema description injected into query prompts.
    pub schema: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            retry_ceiling: 2,
            chunk_size: 50,
            max_prompt_rows: 30,
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }
}

impl EngineSettings {
    /// Settings from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured schema file cannot be read.
    pub fn from_config(config: &Config) -> std::io::Result<Self> {
        let schema = config
            .schema_description()?
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
        Ok(Self {
            retry_ceiling: config.retry_ceiling(),
            chunk_size: config.chunk_size(),
            max_prompt_rows: config.max_prompt_rows(),
            schema,
        })
    }
}

/// Answers questions by generating, checking and running queries.
///
/// Cheap to clone; every run owns its own state.
#[derive(Clone)]
pub struct WorkflowEngine {
    client: Arc<dyn CompletionClient>,
    store: Arc<dyn DataStore>,
    settings: Arc<EngineSettings>,
}

impl WorkflowEngine {
    #[must_use]
    pub fn new(
        client: Arc<dyn CompletionClient>,
        store: Arc<dyn DataStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            client,
            store,
            settings: Arc::new(settings),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Start a run and return its event stream.
    ///
    /// The run executes on a spawned task, so this must be called from
    /// within a Tokio runtime. Dropping the stream cancels the run at its
    /// next suspension point.
    #[must_use]
    pub fn run(&self, question: impl Into<String>) -> EventStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let engine = self.clone();
        let question = question.into();
        tokio::spawn(async move {
            engine.serve(question, EventSink::new(tx)).await;
        });
        EventStream::new(rx)
    }

    async fn serve(self, question: String, sink: EventSink) {
        if question.trim().is_empty() {
            let err = WorkflowError::InvalidQuestion;
            warn!("Rejected empty question");
            let _ = sink.emit(StreamEvent::error(err.public_message())).await;
            return;
        }

        let span = run_span(question.chars().count());
        let outcome = async {
            tokio::select! {
                biased;
                () = sink.closed() => Err(WorkflowError::Cancelled),
                result = self.drive(&question, &sink) => result,
            }
        }
        .instrument(span)
        .await;

        match outcome {
            Ok(()) => info!("Workflow completed"),
            Err(WorkflowError::Cancelled) => info!("Subscriber disconnected, run abandoned"),
            Err(e) => {
                error!(error = %e, "Workflow aborted");
                let _ = sink.emit(StreamEvent::error(e.public_message())).await;
            }
        }
    }

    async fn drive(&self, question: &str, sink: &EventSink) -> Result<(), WorkflowError> {
        let ctx = NodeContext {
            client: self.client.as_ref(),
            store: self.store.as_ref(),
            settings: &self.settings,
        };
        let mut state = WorkflowState::new(question);
        let mut node = Node::INITIAL;

        loop {
            let started = Instant::now();
            let span = node_span(node.as_str(), state.attempt);
            self.step(ctx, node, &mut state, sink)
                .instrument(span)
                .await?;
            log_node_complete(node.as_str(), started.elapsed());

            match next_step(node, &state, self.settings.retry_ceiling) {
                Next::Node(next) => node = next,
                Next::Done => return sink.emit(StreamEvent::done()).await,
            }
        }
    }

    async fn step(
        &self,
        ctx: NodeContext<'_>,
        node: Node,
        state: &mut WorkflowState,
        sink: &EventSink,
    ) -> Result<(), WorkflowError> {
        match node {
            Node::GenerateQuery | Node::FixQuery => {
                let update = if node == Node::GenerateQuery {
                    nodes::generate_query(ctx, state).await?
                } else {
                    nodes::fix_query(ctx, state).await?
                };
                let query = update.query_text.clone();
                state.apply_query(update);
                sink.emit(StreamEvent::query(query)).await
            }
            Node::ExecuteQuery => {
                let update = nodes::execute_query(ctx, state).await;
                state.apply_execution(update);
                Ok(())
            }
            Node::FormatResponse => {
                let update = nodes::format_response(ctx, state).await?;
                state.apply_response(update);
                self.emit_response(state, sink).await
            }
            Node::Fail => {
                let update = nodes::fail(state);
                state.apply_response(update);
                self.emit_response(state, sink).await
            }
        }
    }

    /// Content chunks, then chart, then map, whichever finished first.
    async fn emit_response(
        &self,
        state: &WorkflowState,
        sink: &EventSink,
    ) -> Result<(), WorkflowError> {
        for chunk in chunk_text(&state.narrative, self.settings.chunk_size) {
            sink.emit(StreamEvent::content(chunk)).await?;
        }
        if let Some(chart) = &state.chart {
            sink.emit(StreamEvent::Chart(chart.clone())).await?;
        }
        if let Some(overlay) = &state.map_overlay {
            sink.emit(StreamEvent::Map(overlay.clone())).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = EngineSettings::default();
        assert_eq!(settings.retry_ceiling, 2);
        assert_eq!(settings.chunk_size, 50);
        assert_eq!(settings.max_prompt_rows, 30);
        assert!(settings.schema.contains("TABLE terminals"));
    }

    #[test]
    fn test_settings_from_config_reads_schema_file() {
        let dir = TempDir::new().unwrap();
        let schema = dir.path().join("schema.txt");
        fs::write(&schema, "TABLE depots: id, name").unwrap();

        let mut config = Config::default();
        config.workflow.retry_ceiling = Some(3);
        config.workflow.schema_file = Some(schema);

        let settings = EngineSettings::from_config(&config).unwrap();
        assert_eq!(settings.retry_ceiling, 3);
        assert_eq!(settings.chunk_size, 50);
        assert_eq!(settings.schema, "TABLE depots: id, name");
    }

    #[test]
    fn test_settings_from_config_uses_builtin_schema() {
        let settings = EngineSettings::from_config(&Config::default()).unwrap();
        assert_eq!(settings.schema, DEFAULT_SCHEMA);
    }
}
