//! Scripted collaborators for engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use nlquery::{
    CompletionClient, CompletionRequest, DataStore, EngineSettings, LlmError, PromptKind, Row,
    StoreError, StreamEvent, WorkflowEngine,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CHART_JSON: &str = r#"{"chart_type": "bar", "title": "Terminals", "x_key": "name", "y_key": "tracks", "data": [{"name": "A", "tracks": 4}]}"#;

pub const MAP_JSON: &str = r#"```json
{"type": "FeatureCollection", "features": [
  {"type": "Feature", "geometry": {"type": "Point", "coordinates": [6.76, 51.43]}, "properties": {"name": "Duisburg"}}
]}
```"#;

/// Sets a flag when dropped, so a test can see an abandoned call.
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub enum Reply {
    Text(String),
    Fail(LlmError),
    /// Never completes; sets the flag when the call is dropped.
    Hang(Arc<AtomicBool>),
}

impl Reply {
    async fn resolve(self) -> Result<String, LlmError> {
        match self {
            Reply::Text(text) => Ok(text),
            Reply::Fail(err) => Err(err),
            Reply::Hang(flag) => {
                let _guard = DropFlag(flag);
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

/// Completion client answering from per-prompt scripts.
///
/// Generate and fix prompts share one queue of replies, consumed in order.
pub struct ScriptedClient {
    queries: Mutex<VecDeque<Reply>>,
    narrative: Reply,
    chart: Reply,
    map: Reply,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            queries: Mutex::new(VecDeque::new()),
            narrative: Reply::Text("Here is what I found.".to_string()),
            chart: Reply::Fail(LlmError::Transport("chart not scripted".to_string())),
            map: Reply::Fail(LlmError::Transport("map not scripted".to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn query(self, text: &str) -> Self {
        self.queries
            .lock()
            .unwrap()
            .push_back(Reply::Text(text.to_string()));
        self
    }

    pub fn narrative(mut self, reply: Reply) -> Self {
        self.narrative = reply;
        self
    }

    pub fn chart(mut self, reply: Reply) -> Self {
        self.chart = reply;
        self
    }

    pub fn map(mut self, reply: Reply) -> Self {
        self.map = reply;
        self
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<PromptKind> {
        self.calls().iter().map(|r| r.kind).collect()
    }

    fn reply_for(&self, request: CompletionRequest) -> Reply {
        let kind = request.kind;
        self.calls.lock().unwrap().push(request);
        match kind {
            PromptKind::GenerateQuery | PromptKind::FixQuery => {
                self.queries.lock().unwrap().pop_front().unwrap_or_else(|| {
                    Reply::Fail(LlmError::Transport("no scripted query left".to_string()))
                })
            }
            PromptKind::Narrative => self.narrative.clone(),
            PromptKind::Chart => self.chart.clone(),
            PromptKind::Map => self.map.clone(),
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn generate(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let reply = self.reply_for(request);
        reply.resolve().await
    }
}

/// Data store returning scripted results in order.
pub struct ScriptedStore {
    results: Mutex<VecDeque<Result<Vec<Row>, StoreError>>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn rows(self, rows: Vec<Row>) -> Self {
        self.results.lock().unwrap().push_back(Ok(rows));
        self
    }

    pub fn error(self, message: &str) -> Self {
        self.results
            .lock()
            .unwrap()
            .push_back(Err(StoreError::Query(message.to_string())));
        self
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataStore for ScriptedStore {
    async fn query(&self, query: &str) -> Result<Vec<Row>, StoreError> {
        self.seen.lock().unwrap().push(query.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(StoreError::Query("no scripted result left".to_string())))
    }
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().expect("row literal must be an object")
}

pub fn engine(client: &Arc<ScriptedClient>, store: &Arc<ScriptedStore>) -> WorkflowEngine {
    engine_with(client, store, EngineSettings::default())
}

pub fn engine_with(
    client: &Arc<ScriptedClient>,
    store: &Arc<ScriptedStore>,
    settings: EngineSettings,
) -> WorkflowEngine {
    WorkflowEngine::new(client.clone(), store.clone(), settings)
}

/// Run a question to completion, failing the test if it hangs.
pub async fn run(engine: &WorkflowEngine, question: &str) -> Vec<StreamEvent> {
    tokio::time::timeout(Duration::from_secs(5), engine.run(question).collect())
        .await
        .expect("run did not finish")
}

/// Event kinds with consecutive `content` events collapsed into one.
pub fn shape(events: &[StreamEvent]) -> Vec<&'static str> {
    let mut kinds: Vec<&'static str> = Vec::new();
    for event in events {
        let kind = event.kind();
        if kind == "content" && kinds.last() == Some(&"content") {
            continue;
        }
        kinds.push(kind);
    }
    kinds
}

/// Concatenated narrative.
pub fn narrative(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Content { content } => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

/// Candidate queries in emission order.
pub fn queries(events: &[StreamEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Query { query } => Some(query.clone()),
            _ => None,
        })
        .collect()
}
