//! Per-request workflow state and the partial updates nodes return.

use nlquery_utils::types::Row;

use crate::artifacts::{ChartSpec, FeatureCollection};

/// Result of the most recent execution.
///
/// A single enum keeps "error" and "rows" from ever being set together.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Succeeded(Vec<Row>),
    Failed(String),
}

/// The record threaded through every node of one run.
///
/// Created empty at the start of a run and dropped with the terminal event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkflowState {
    question: String,
    /// Current candidate query.
    pub query_text: String,
    /// `None` until the first execution.
    pub execution: Option<ExecutionOutcome>,
    /// Generate and fix calls so far.
    pub attempt: u32,
    pub narrative: String,
    pub chart: Option<ChartSpec>,
    pub map_overlay: Option<FeatureCollection>,
}

impl WorkflowState {
    #[must_use]
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    /// The question this run answers. Fixed at construction.
    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Error from the last execution, if it failed.
    #[must_use]
    pub fn query_error(&self) -> Option<&str> {
        match &self.execution {
            Some(ExecutionOutcome::Failed(error)) => Some(error),
            _ => None,
        }
    }

    /// Rows from the last execution, if it succeeded.
    #[must_use]
    pub fn query_results(&self) -> Option<&[Row]> {
        match &self.execution {
            Some(ExecutionOutcome::Succeeded(rows)) => Some(rows),
            _ => None,
        }
    }

    pub fn apply_query(&mut self, update: QueryUpdate) {
        debug_assert!(update.attempt > self.attempt, "attempt must only grow");
        self.query_text = update.query_text;
        self.attempt = self.attempt.max(update.attempt);
    }

    pub fn apply_execution(&mut self, update: ExecutionUpdate) {
        self.execution = Some(update.outcome);
    }

    pub fn apply_response(&mut self, update: ResponseUpdate) {
        self.narrative = update.narrative;
        self.chart = update.chart;
        self.map_overlay = update.map_overlay;
    }
}

/// Output of GenerateQuery and FixQuery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryUpdate {
    pub query_text: String,
    pub attempt: u32,
}

/// Output of ExecuteQuery.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionUpdate {
    pub outcome: ExecutionOutcome,
}

/// Output of FormatResponse and Fail.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseUpdate {
    pub narrative: String,
    pub chart: Option<ChartSpec>,
    pub map_overlay: Option<FeatureCollection>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_state_is_empty() {
        let state = WorkflowState::new("List terminals");
        assert_eq!(state.question(), "List terminals");
        assert_eq!(state.attempt, 0);
        assert!(state.query_error().is_none());
        assert!(state.query_results().is_none());
        assert!(state.narrative.is_empty());
    }

    #[test]
    fn test_execution_outcomes_replace_each_other() {
        let mut state = WorkflowState::new("q");
        state.apply_execution(ExecutionUpdate {
            outcome: ExecutionOutcome::Failed("no such table: x".to_string()),
        });
        assert_eq!(state.query_error(), Some("no such table: x"));
        assert!(state.query_results().is_none());

        let row = json!({"n": 1}).as_object().cloned().unwrap();
        state.apply_execution(ExecutionUpdate {
            outcome: ExecutionOutcome::Succeeded(vec![row]),
        });
        assert!(state.query_error().is_none());
        assert_eq!(state.query_results().map(<[Row]>::len), Some(1));
    }

    #[test]
    fn test_query_updates_advance_attempt() {
        let mut state = WorkflowState::new("q");
        state.apply_query(QueryUpdate {
            query_text: "SELECT 1".to_string(),
            attempt: 1,
        });
        state.apply_query(QueryUpdate {
            query_text: "SELECT 2".to_string(),
            attempt: 2,
        });
        assert_eq!(state.query_text, "SELECT 2");
        assert_eq!(state.attempt, 2);
    }
}
