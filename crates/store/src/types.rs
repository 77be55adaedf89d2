//! The subscription record.

use {
    chrono::{DateTime, Duration, SubsecRound, Utc},
    serde::{Deserialize, Serialize},
};

/// One opted-in subscriber's timer state.
///
/// Timestamps are kept at millisecond precision so that a record read back
/// from any backend compares equal to the one that was written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// When the subscriber (last) opted in.
    pub start_time: DateTime<Utc>,
    /// When the most recent accepted delivery was made. Never earlier than
    /// `start_time`.
    pub last_sent_time: DateTime<Utc>,
}

impl Subscription {
    /// A fresh subscription: both clocks start at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        let now = now.trunc_subsecs(3);
        Self {
            start_time: now,
            last_sent_time: now,
        }
    }

    /// Whether at least `interval` has elapsed since the last delivery.
    pub fn is_due(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        now - self.last_sent_time >= interval
    }

    /// The record after a delivery accepted at `sent_at`.
    #[must_use]
    pub fn delivered_at(&self, sent_at: DateTime<Utc>) -> Self {
        Self {
            start_time: self.start_time,
            last_sent_time: sent_at.trunc_subsecs(3).max(self.start_time),
        }
    }
}
