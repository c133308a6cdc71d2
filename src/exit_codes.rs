//! Process exit codes for the nlquery CLI

use nlquery_engine::StreamEvent;

/// Exit code constants
pub mod codes {
    /// The stream ended with `done`
    pub const SUCCESS: i32 = 0;

    /// The stream ended with `error`, or setup failed outside configuration
    pub const FAILURE: i32 = 1;

    /// Configuration could not be discovered, loaded or validated
    pub const CONFIG: i32 = 2;
}

/// Exit code for a finished event stream, given its last event.
#[must_use]
pub fn for_stream_end(last: Option<&StreamEvent>) -> i32 {
    match last {
        Some(StreamEvent::Done { .. }) => codes::SUCCESS,
        _ => codes::FAILURE,
    }
}
