use std::time::Duration;

use chrono::{DateTime, Utc};

/// 30s, 1m, 5m, 15m, 1h.
pub const DEFAULT_RETRY_INTERVALS_SECS: [u64; 5] = [30, 60, 5 * 60, 15 * 60, 60 * 60];

/// Ascending wait table indexed by completed attempts; the last entry
/// repeats for every attempt past the end of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffTable {
    intervals: Vec<Duration>,
}

impl BackoffTable {
    /// Returns `None` for an empty or descending table.
    pub fn new(intervals: Vec<Duration>) -> Option<Self> {
        if intervals.is_empty() || intervals.windows(2).any(|pair| pair[1] < pair[0]) {
            return None;
        }
        Some(Self { intervals })
    }

    pub fn intervals(&self) -> &[Duration] {
        &self.intervals
    }

    /// Wait required after `attempts` attempts. Zero attempts never waits.
    pub fn retry_interval(&self, attempts: u32) -> Duration {
        if attempts == 0 {
            return Duration::ZERO;
        }
        let last = self.intervals.len() - 1;
        let index = (attempts as usize - 1).min(last);
        self.intervals[index]
    }

    pub fn is_eligible(
        &self,
        attempts: u32,
        last_attempt_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(last) = last_attempt_at else {
            return true;
        };
        // A clock that went backwards counts as no time elapsed.
        let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
        elapsed >= self.retry_interval(attempts)
    }

    pub fn next_eligible_at(
        &self,
        attempts: u32,
        last_attempt_at: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        let last = last_attempt_at?;
        let wait = chrono::Duration::from_std(self.retry_interval(attempts)).ok()?;
        last.checked_add_signed(wait)
    }
}

impl Default for BackoffTable {
    fn default() -> Self {
        Self {
            intervals: DEFAULT_RETRY_INTERVALS_SECS
                .iter()
                .copied()
                .map(Duration::from_secs)
                .collect(),
        }
    }
}
