//! nlquery - natural-language questions to validated read-only SQL
//!
//! A question goes through a small state machine: a model drafts a query, a
//! guard rejects anything that is not a plain `SELECT`, the query runs against
//! a read-only SQLite database, and failures are sent back to the model for
//! repair a bounded number of times. The answer is streamed as events: the
//! candidate queries, the narrative in chunks, then an optional chart and map.
//!
//! nlquery can be used in two ways:
//! - **CLI**: `nlquery ask "List terminals in Germany"` prints one JSON event
//!   per line
//! - **Library**: build a [`WorkflowEngine`] from any [`CompletionClient`] and
//!   [`DataStore`] and consume its [`EventStream`]
//!
//! # Quick Start (Library)
//!
//! ```no_run
//! use nlquery::{Config, CliArgs, StreamEvent};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::discover(&CliArgs::default())?;
//! let engine = nlquery::cli::build_engine(&config).await?;
//!
//! let mut stream = engine.run("How many terminals are in Italy?");
//! while let Some(event) = stream.next().await {
//!     if let StreamEvent::Content { content } = &event {
//!         print!("{content}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Crates
//!
//! | Crate | Contents |
//! |---|---|
//! | `nlquery-utils` | errors, logging, shared row type |
//! | `nlquery-config` | configuration discovery and validation |
//! | `nlquery-llm` | completion backends |
//! | `nlquery-store` | read-only data stores |
//! | `nlquery-engine` | guard, extractor, nodes, routing, streaming |

pub mod cli;
pub mod exit_codes;
pub mod rate_limit;

pub use nlquery_config::{CliArgs, Config, ConfigSource};
pub use nlquery_engine::{
    ChartSpec, CompletionClient, CompletionRequest, EngineSettings, EventStream,
    FeatureCollection, LlmCompletionClient, PromptKind, StreamEvent, WorkflowEngine,
    REJECTION_MESSAGE, extract_query, is_read_only,
};
pub use nlquery_llm::{LlmBackend, LlmError};
pub use nlquery_store::{DataStore, SqliteStore, StoreError};
pub use nlquery_utils::error::{NlqueryError, UserFriendlyError, WorkflowError};
pub use nlquery_utils::types::Row;
pub use rate_limit::{RateLimited, RateLimiter};
