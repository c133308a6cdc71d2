//! Logging and observability infrastructure for nlquery
//!
//! Structured logging through `tracing`. Binaries call [`init_tracing`] once;
//! library code only emits events and spans.

use std::io::IsTerminal;
use std::time::Duration;
use tracing::{Level, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Check if colored output should be used.
///
/// Returns true only if stderr is a terminal and `NO_COLOR` is not set.
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence. Otherwise the filter is `nlquery=info,warn`,
/// or `nlquery=debug,info` when `verbose` is set. Logs go to stderr so that
/// stdout stays reserved for streamed events.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("nlquery=debug,info")
            } else {
                EnvFilter::try_new("nlquery=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(use_color())
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(use_color())
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span covering one node execution.
#[must_use]
pub fn node_span(node: &'static str, attempt: u32) -> tracing::Span {
    span!(Level::INFO, "node", node = node, attempt = attempt)
}

/// Span covering one workflow run.
#[must_use]
pub fn run_span(question_chars: usize) -> tracing::Span {
    span!(Level::INFO, "workflow_run", question_chars = question_chars)
}

/// Log node completion with duration.
pub fn log_node_complete(node: &'static str, elapsed: Duration) {
    info!(
        node = node,
        duration_ms = elapsed.as_millis() as u64,
        "Node completed"
    );
}
