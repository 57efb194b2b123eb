//! Bounded polling state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default number of status polls before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Whether the context sync job has completed for the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Not observed as complete.
    #[default]
    NotSynced,
    /// The job reported completion.
    Synced,
}

impl From<bool> for SyncStatus {
    fn from(synced: bool) -> Self {
        if synced { Self::Synced } else { Self::NotSynced }
    }
}

/// Polling interval and attempt ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Delay before each poll.
    pub interval: Duration,
    /// Maximum number of polls.
    pub max_attempts: u32,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl SyncPolicy {
    /// Longest time polling can take.
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// What to do after recording a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// Completion observed; stop.
    Synced,
    /// Not yet; poll again after the interval.
    Pending,
    /// Ceiling reached without observing completion.
    Exhausted,
}

/// Attempt counter for one polling run.
///
/// Each poll waits out the interval first. A failed poll request counts
/// as a used attempt observing "not synced".
#[derive(Debug, Clone)]
pub struct Poller {
    policy: SyncPolicy,
    attempts: u32,
}

impl Poller {
    /// Starts a run with no attempts used.
    #[must_use]
    pub const fn new(policy: SyncPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Attempts used so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Attempts left.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.policy.max_attempts.saturating_sub(self.attempts)
    }

    /// Delay before the next poll, or `None` once the ceiling is reached.
    #[must_use]
    pub const fn next_delay(&self) -> Option<Duration> {
        if self.remaining() > 0 {
            Some(self.policy.interval)
        } else {
            None
        }
    }

    /// Records one poll; `None` stands for a failed request.
    pub fn record(&mut self, observed: Option<SyncStatus>) -> Poll {
        self.attempts += 1;
        match observed {
            Some(SyncStatus::Synced) => Poll::Synced,
            _ if self.remaining() == 0 => Poll::Exhausted,
            _ => Poll::Pending,
        }
    }
}
