//! Question-to-query workflow engine
//!
//! Turns a natural-language question into a read-only query, runs it, repairs
//! it a bounded number of times when it fails, and streams a narrative plus
//! optional chart and map artifacts as [`StreamEvent`]s.
//!
//! ```text
//! GenerateQuery -> ExecuteQuery -> { FixQuery | FormatResponse | Fail } -> Done
//!                      ^               |
//!                      +---------------+
//! ```

pub mod artifacts;
pub mod completion;
mod engine;
pub mod event;
pub mod extraction;
pub mod format;
pub mod guard;
pub mod nodes;
pub mod prompts;
pub mod routing;
pub mod state;

pub use artifacts::{ArtifactError, ChartSpec, ChartType, Feature, FeatureCollection};
pub use completion::{CompletionClient, CompletionRequest, LlmCompletionClient, PromptKind};
pub use engine::{EngineSettings, WorkflowEngine};
pub use event::{EventStream, StreamEvent, chunk_text};
pub use extraction::extract_query;
pub use format::format_results_for_prompt;
pub use guard::{REJECTION_MESSAGE, is_read_only};
pub use routing::{Next, Node, Route, next_step, route};
pub use state::{ExecutionOutcome, WorkflowState};
