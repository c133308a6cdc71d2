//! Streamed output protocol
//!
//! A run produces `query* content* chart? map? done` or ends early with a
//! single `error`. Events serialize as `{"event": "<kind>", "data": {...}}`.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::artifacts::{ChartSpec, FeatureCollection};
use nlquery_utils::error::WorkflowError;

/// Status carried by the `done` event.
pub const DONE_STATUS: &str = "complete";

/// One unit of streamed output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Candidate query produced by a generate or fix step.
    Query { query: String },
    /// A chunk of the narrative.
    Content { content: String },
    Chart(ChartSpec),
    Map(FeatureCollection),
    Done { status: String },
    Error { error: String },
}

impl StreamEvent {
    #[must_use]
    pub fn query(query: impl Into<String>) -> Self {
        Self::Query {
            query: query.into(),
        }
    }

    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self::Content {
            content: content.into(),
        }
    }

    #[must_use]
    pub fn done() -> Self {
        Self::Done {
            status: DONE_STATUS.to_string(),
        }
    }

    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// Event name as it appears on the wire.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Query { .. } => "query",
            Self::Content { .. } => "content",
            Self::Chart(_) => "chart",
            Self::Map(_) => "map",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    /// Whether nothing can follow this event.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// Split `text` into contiguous chunks of `chunk_size` characters.
///
/// Counts characters, not bytes, so multi-byte text is never split inside a
/// code point. Concatenating the chunks gives back `text`.
#[must_use]
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == chunk_size {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Receiving half of a run. Dropping it cancels the run.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<StreamEvent>,
}

impl EventStream {
    pub(crate) fn new(rx: mpsc::Receiver<StreamEvent>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the run has finished.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Drain the stream to the end.
    pub async fn collect(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }
}

/// Sending half used by the engine.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx }
    }

    /// Deliver one event, waiting for buffer space.
    pub(crate) async fn emit(&self, event: StreamEvent) -> Result<(), WorkflowError> {
        tracing::trace!(event = event.kind(), "Emitting event");
        self.tx
            .send(event)
            .await
            .map_err(|_| WorkflowError::Cancelled)
    }

    /// Resolves once the subscriber has gone away.
    pub(crate) async fn closed(&self) {
        self.tx.closed().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        assert_eq!(
            serde_json::to_value(StreamEvent::query("SELECT 1")).unwrap(),
            json!({"event": "query", "data": {"query": "SELECT 1"}})
        );
        assert_eq!(
            serde_json::to_value(StreamEvent::content("Hello")).unwrap(),
            json!({"event": "content", "data": {"content": "Hello"}})
        );
        assert_eq!(
            serde_json::to_value(StreamEvent::done()).unwrap(),
            json!({"event": "done", "data": {"status": "complete"}})
        );
        assert_eq!(
            serde_json::to_value(StreamEvent::error("oops")).unwrap(),
            json!({"event": "error", "data": {"error": "oops"}})
        );
    }

    #[test]
    fn test_map_event_carries_geojson() {
        let collection = FeatureCollection {
            kind: "FeatureCollection".to_string(),
            features: vec![],
        };
        let value = serde_json::to_value(StreamEvent::Map(collection)).unwrap();
        assert_eq!(
            value,
            json!({"event": "map", "data": {"type": "FeatureCollection", "features": []}})
        );
    }

    #[test]
    fn test_chunking_by_characters() {
        assert_eq!(chunk_text("abcdefg", 3), ["abc", "def", "g"]);
        assert_eq!(chunk_text("abcdef", 3), ["abc", "def"]);
        assert!(chunk_text("", 3).is_empty());
        assert_eq!(chunk_text("äöü€", 2), ["äö", "ü€"]);
    }

    #[test]
    fn test_chunks_concatenate_to_input() {
        let text = "Rotterdam → Milano: 1 150 km, 21 h. ".repeat(9);
        let chunks = chunk_text(&text, 50);
        assert!(chunks.iter().all(|c| c.chars().count() <= 50));
        assert!(chunks[..chunks.len() - 1].iter().all(|c| c.chars().count() == 50));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_terminal_events() {
        assert!(StreamEvent::done().is_terminal());
        assert!(StreamEvent::error("x").is_terminal());
        assert!(!StreamEvent::content("x").is_terminal());
    }
}
