//! Timestamps of successful outbound requests, for rate observability.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Ordered (oldest first) list of request times.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestLog(Vec<DateTime<Utc>>);

impl RequestLog {
    pub fn record(&mut self, at: DateTime<Utc>) {
        self.0.push(at);
    }

    /// Drops entries an hour old or older and returns how many remain.
    pub fn prune_to_last_hour(&mut self, now: DateTime<Utc>) -> usize {
        let window = Duration::hours(1);
        self.0.retain(|when| now - *when < window);
        self.0.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.0.iter()
    }
}
