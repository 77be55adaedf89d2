use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Records read from the store.
    pub scanned: usize,
    /// Records whose interval had elapsed.
    pub due: usize,
    /// Deliveries the gateway accepted.
    pub delivered: usize,
    /// Deliveries that failed or timed out. Those records stay due.
    pub failed: usize,
    /// Accepted deliveries whose record was stopped or restarted before the
    /// write-back, so it was left alone.
    pub stale: usize,
    /// Scan items that could not be read plus write-backs that errored.
    pub store_errors: usize,
}

impl SweepReport {
    pub fn is_idle(&self) -> bool {
        self.due == 0 && self.store_errors == 0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepStatus {
    pub running: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_report: Option<SweepReport>,
}
