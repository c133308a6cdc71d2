//! Workflow nodes.
//!
//! Each node reads the state and returns a typed partial update. Failures a
//! node can absorb (execution errors, artifact errors) are folded into the
//! update; completion failures on a required step surface as
//! [`WorkflowError::Upstream`] and end the run.

use nlquery_llm::LlmError;
use nlquery_store::DataStore;
use nlquery_utils::error::WorkflowError;
use nlquery_utils::types::{Row, has_coordinates};
use tracing::{debug, info, warn};

use crate::artifacts::{ArtifactError, ChartSpec, FeatureCollection};
use crate::completion::{CompletionClient, CompletionRequest, PromptKind};
use crate::engine::EngineSettings;
use crate::extraction::extract_query;
use crate::format::format_results_for_prompt;
use crate::guard::{REJECTION_MESSAGE, is_read_only};
use crate::state::{ExecutionOutcome, ExecutionUpdate, QueryUpdate, ResponseUpdate, WorkflowState};

/// Rows needed before a chart is attempted.
pub const MIN_CHART_ROWS: usize = 2;

/// Sentence prefixed to a narrative that forgets to say the result was empty.
pub const EMPTY_RESULT_PREFIX: &str = "No results were found for this question. ";

/// Phrases that already tell the reader nothing matched.
const EMPTY_RESULT_PHRASES: &[&str] = &[
    "no results",
    "no matching",
    "no data",
    "nothing was found",
    "nothing found",
    "not find any",
    "couldn't find",
    "could not find",
    "none were found",
];

/// Collaborators shared by every node of one run.
#[derive(Clone, Copy)]
pub struct NodeContext<'a> {
    pub client: &'a dyn CompletionClient,
    pub store: &'a dyn DataStore,
    pub settings: &'a EngineSettings,
}

fn upstream(node: &'static str) -> impl FnOnce(LlmError) -> WorkflowError {
    move |source| WorkflowError::Upstream { node, source }
}

/// Ask for a first candidate query.
///
/// # Errors
///
/// Completion failures are returned as `WorkflowError::Upstream`.
pub async fn generate_query(
    ctx: NodeContext<'_>,
    state: &WorkflowState,
) -> Result<QueryUpdate, WorkflowError> {
    let request = CompletionRequest::new(PromptKind::GenerateQuery)
        .var("schema", ctx.settings.schema.as_str())
        .var("question", state.question());

    let raw = ctx
        .client
        .generate(request)
        .await
        .map_err(upstream("generate_query"))?;

    let query_text = extract_query(&raw);
    debug!(query = %query_text, "Generated query");
    Ok(QueryUpdate {
        query_text,
        attempt: state.attempt + 1,
    })
}

/// Ask for a corrected query given the failed one and its error.
///
/// # Errors
///
/// Completion failures are returned as `WorkflowError::Upstream`.
pub async fn fix_query(
    ctx: NodeContext<'_>,
    state: &WorkflowState,
) -> Result<QueryUpdate, WorkflowError> {
    let request = CompletionRequest::new(PromptKind::FixQuery)
        .var("schema", ctx.settings.schema.as_str())
        .var("query", state.query_text.as_str())
        .var("error", state.query_error().unwrap_or_default());

    let raw = ctx
        .client
        .generate(request)
        .await
        .map_err(upstream("fix_query"))?;

    let query_text = extract_query(&raw);
    debug!(query = %query_text, attempt = state.attempt + 1, "Fixed query");
    Ok(QueryUpdate {
        query_text,
        attempt: state.attempt + 1,
    })
}

/// Run the current query if the guard accepts it.
///
/// Never fails: a rejected query or a store error becomes
/// `ExecutionOutcome::Failed` and drives the retry loop.
pub async fn execute_query(ctx: NodeContext<'_>, state: &WorkflowState) -> ExecutionUpdate {
    if !is_read_only(&state.query_text) {
        warn!(query = %state.query_text, "Rejected non-read-only query");
        return ExecutionUpdate {
            outcome: ExecutionOutcome::Failed(REJECTION_MESSAGE.to_string()),
        };
    }

    let outcome = match ctx.store.query(&state.query_text).await {
        Ok(rows) => {
            info!(rows = rows.len(), "Query succeeded");
            ExecutionOutcome::Succeeded(rows)
        }
        Err(e) => {
            warn!(error = %e, attempt = state.attempt, "Query failed");
            ExecutionOutcome::Failed(e.to_string())
        }
    };
    ExecutionUpdate { outcome }
}

/// Produce the narrative and, where the rows allow, a chart and a map.
///
/// # Errors
///
/// Only a narrative completion failure is returned. Chart and map failures
/// are logged and leave the artifact unset.
pub async fn format_response(
    ctx: NodeContext<'_>,
    state: &WorkflowState,
) -> Result<ResponseUpdate, WorkflowError> {
    let rows = state.query_results().unwrap_or_default();
    let results = format_results_for_prompt(rows, ctx.settings.max_prompt_rows);

    let narrative = ctx
        .client
        .generate(
            CompletionRequest::new(PromptKind::Narrative)
                .var("question", state.question())
                .var("results", results.as_str()),
        )
        .await
        .map_err(upstream("format_response"))?;
    let narrative = ensure_empty_result_notice(rows, narrative);

    let (chart, map_overlay) = tokio::join!(
        attempt_chart(ctx, state.question(), rows, &results),
        attempt_map(ctx, state.question(), rows, &results),
    );

    Ok(ResponseUpdate {
        narrative,
        chart,
        map_overlay,
    })
}

/// Explain that the retry budget ran out.
#[must_use]
pub fn fail(state: &WorkflowState) -> ResponseUpdate {
    let error = state.query_error().unwrap_or("unknown error");
    let narrative = format!(
        "I wasn't able to answer your question. The database query failed after {} attempts.\n\n\
         **Error:** {error}\n\n\
         Try rephrasing your question or asking about specific routes, terminals, or operators.",
        state.attempt
    );
    ResponseUpdate {
        narrative,
        chart: None,
        map_overlay: None,
    }
}

fn ensure_empty_result_notice(rows: &[Row], narrative: String) -> String {
    if !rows.is_empty() {
        return narrative;
    }
    let lower = narrative.to_lowercase();
    if EMPTY_RESULT_PHRASES.iter().any(|p| lower.contains(p)) {
        narrative
    } else {
        format!("{EMPTY_RESULT_PREFIX}{narrative}")
    }
}

async fn request_artifact(
    ctx: NodeContext<'_>,
    request: CompletionRequest,
) -> Result<String, ArtifactError> {
    Ok(ctx.client.generate(request).await?)
}

async fn attempt_chart(
    ctx: NodeContext<'_>,
    question: &str,
    rows: &[Row],
    results: &str,
) -> Option<ChartSpec> {
    if rows.len() < MIN_CHART_ROWS {
        return None;
    }
    let request = CompletionRequest::new(PromptKind::Chart)
        .var("question", question)
        .var("results", results);
    match request_artifact(ctx, request).await.and_then(|text| ChartSpec::parse(&text)) {
        Ok(chart) => Some(chart),
        Err(e) => {
            warn!(error = %e, "Chart generation failed");
            None
        }
    }
}

async fn attempt_map(
    ctx: NodeContext<'_>,
    question: &str,
    rows: &[Row],
    results: &str,
) -> Option<FeatureCollection> {
    if !has_coordinates(rows) {
        return None;
    }
    let request = CompletionRequest::new(PromptKind::Map)
        .var("question", question)
        .var("results", results);
    match request_artifact(ctx, request)
        .await
        .and_then(|text| FeatureCollection::parse(&text))
    {
        Ok(overlay) => Some(overlay),
        Err(e) => {
            warn!(error = %e, "Map overlay generation failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nlquery_store::StoreError;
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers by prompt kind and records every request.
    struct Scripted {
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl Scripted {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
            }
        }

        fn kinds(&self) -> Vec<PromptKind> {
            self.seen.lock().unwrap().iter().map(|r| r.kind).collect()
        }
    }

    #[async_trait]
    impl CompletionClient for Scripted {
        async fn generate(&self, request: CompletionRequest) -> Result<String, LlmError> {
            let kind = request.kind;
            self.seen.lock().unwrap().push(request);
            match kind {
                PromptKind::GenerateQuery => Ok("```sql\nSELECT 1\n```".into()),
                PromptKind::FixQuery => Ok("SELECT 2".into()),
                PromptKind::Narrative => Ok("Here is what I found.".into()),
                PromptKind::Chart => Err(LlmError::Transport("chart down".into())),
                PromptKind::Map => Ok("not json".into()),
            }
        }
    }

    struct FixedStore(Result<Vec<Row>, StoreError>);

    #[async_trait]
    impl DataStore for FixedStore {
        async fn query(&self, _query: &str) -> Result<Vec<Row>, StoreError> {
            self.0.clone()
        }
    }

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn ctx<'a>(
        client: &'a Scripted,
        store: &'a FixedStore,
        settings: &'a EngineSettings,
    ) -> NodeContext<'a> {
        NodeContext {
            client,
            store,
            settings,
        }
    }

    #[tokio::test]
    async fn test_generate_extracts_and_counts_attempt() {
        let client = Scripted::new();
        let store = FixedStore(Ok(vec![]));
        let settings = EngineSettings::default();
        let state = WorkflowState::new("How many terminals?");

        let update = generate_query(ctx(&client, &store, &settings), &state)
            .await
            .unwrap();
        assert_eq!(update.query_text, "SELECT 1");
        assert_eq!(update.attempt, 1);

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].get("question"), Some("How many terminals?"));
        assert_eq!(seen[0].get("schema"), Some(settings.schema.as_str()));
    }

    #[tokio::test]
    async fn test_fix_receives_failed_query_and_error() {
        let client = Scripted::new();
        let store = FixedStore(Ok(vec![]));
        let settings = EngineSettings::default();
        let mut state = WorkflowState::new("q");
        state.apply_query(QueryUpdate {
            query_text: "SELECT nope".into(),
            attempt: 1,
        });
        state.apply_execution(ExecutionUpdate {
            outcome: ExecutionOutcome::Failed("no such column: nope".into()),
        });

        let update = fix_query(ctx(&client, &store, &settings), &state)
            .await
            .unwrap();
        assert_eq!(update.attempt, 2);

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].get("query"), Some("SELECT nope"));
        assert_eq!(seen[0].get("error"), Some("no such column: nope"));
    }

    #[tokio::test]
    async fn test_execute_rejects_writes_without_touching_store() {
        let client = Scripted::new();
        let store = FixedStore(Err(StoreError::Connection("must not be called".into())));
        let settings = EngineSettings::default();
        let mut state = WorkflowState::new("q");
        state.query_text = "DROP TABLE terminals".into();

        let update = execute_query(ctx(&client, &store, &settings), &state).await;
        assert_eq!(
            update.outcome,
            ExecutionOutcome::Failed(REJECTION_MESSAGE.to_string())
        );
    }

    #[tokio::test]
    async fn test_execute_keeps_store_error_text() {
        let client = Scripted::new();
        let store = FixedStore(Err(StoreError::Query("no such table: routez".into())));
        let settings = EngineSettings::default();
        let mut state = WorkflowState::new("q");
        state.query_text = "SELECT * FROM routez".into();

        let update = execute_query(ctx(&client, &store, &settings), &state).await;
        assert_eq!(
            update.outcome,
            ExecutionOutcome::Failed("no such table: routez".into())
        );
    }

    #[tokio::test]
    async fn test_format_drops_failed_artifacts() {
        let client = Scripted::new();
        let store = FixedStore(Ok(vec![]));
        let settings = EngineSettings::default();
        let mut state = WorkflowState::new("Where are the terminals?");
        state.apply_execution(ExecutionUpdate {
            outcome: ExecutionOutcome::Succeeded(vec![
                row(json!({"name": "A", "latitude": 51.4, "longitude": 6.7})),
                row(json!({"name": "B", "latitude": 52.5, "longitude": 13.4})),
            ]),
        });

        let update = format_response(ctx(&client, &store, &settings), &state)
            .await
            .unwrap();
        assert_eq!(update.narrative, "Here is what I found.");
        assert!(update.chart.is_none());
        assert!(update.map_overlay.is_none());

        let kinds = client.kinds();
        assert_eq!(kinds[0], PromptKind::Narrative);
        assert!(kinds.contains(&PromptKind::Chart));
        assert!(kinds.contains(&PromptKind::Map));
    }

    #[tokio::test]
    async fn test_format_skips_artifacts_for_single_plain_row() {
        let client = Scripted::new();
        let store = FixedStore(Ok(vec![]));
        let settings = EngineSettings::default();
        let mut state = WorkflowState::new("How many?");
        state.apply_execution(ExecutionUpdate {
            outcome: ExecutionOutcome::Succeeded(vec![row(json!({"n": 3}))]),
        });

        format_response(ctx(&client, &store, &settings), &state)
            .await
            .unwrap();
        assert_eq!(client.kinds(), [PromptKind::Narrative]);
    }

    #[tokio::test]
    async fn test_empty_results_are_announced() {
        let client = Scripted::new();
        let store = FixedStore(Ok(vec![]));
        let settings = EngineSettings::default();
        let mut state = WorkflowState::new("Routes to Mars?");
        state.apply_execution(ExecutionUpdate {
            outcome: ExecutionOutcome::Succeeded(vec![]),
        });

        let update = format_response(ctx(&client, &store, &settings), &state)
            .await
            .unwrap();
        assert_eq!(
            update.narrative,
            format!("{EMPTY_RESULT_PREFIX}Here is what I found.")
        );
        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].get("results"), Some("No results found."));
    }

    #[test]
    fn test_notice_not_doubled() {
        let narrative = "Sorry, there are no results for that.".to_string();
        assert_eq!(ensure_empty_result_notice(&[], narrative.clone()), narrative);
        let rows = vec![row(json!({"n": 1}))];
        assert_eq!(ensure_empty_result_notice(&rows, "Fine.".into()), "Fine.");
    }

    #[test]
    fn test_fail_embeds_error_and_attempts() {
        let mut state = WorkflowState::new("q");
        state.attempt = 2;
        state.apply_execution(ExecutionUpdate {
            outcome: ExecutionOutcome::Failed("no such table: x".into()),
        });
        let update = fail(&state);
        assert!(update.narrative.contains("after 2 attempts"));
        assert!(update.narrative.contains("**Error:** no such table: x"));
        assert!(update.narrative.contains("rephrasing"));
        assert!(update.chart.is_none() && update.map_overlay.is_none());
    }
}
