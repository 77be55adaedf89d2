//! Shared error-context helpers and the clock abstraction used across all hourbell crates.

pub mod clock;
pub mod error;

pub use {
    clock::{Clock, ManualClock, SharedClock, SystemClock},
    error::FromMessage,
};
