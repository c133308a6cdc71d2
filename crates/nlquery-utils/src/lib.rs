//! Foundation utilities shared by every nlquery crate.

pub mod error;
pub mod logging;
pub mod types;
