//! Sweep Scheduler: the recurring scan that delivers the broadcast message to
//! every subscriber whose timer has elapsed.

pub mod service;
pub mod types;

pub use {
    service::SweepService,
    types::{SweepReport, SweepStatus},
};
