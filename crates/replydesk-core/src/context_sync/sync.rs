//! Context sync driver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::poller::{Poll, Poller, SyncPolicy, SyncStatus};
use crate::backend::DraftBackend;
use crate::error::Result;

/// Where the context sync run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// Not checked this session.
    #[default]
    Unknown,
    /// Reading the status.
    Checking,
    /// The first check reported synced.
    AlreadySynced,
    /// Starting the job.
    Triggering,
    /// Waiting for completion.
    Polling {
        /// Poll about to run (1-based).
        attempt: u32,
    },
    /// Completion observed while polling.
    Synced,
    /// Gave up waiting; the job continues in the background.
    TimedOut,
    /// Stopped by the caller.
    Cancelled,
}

impl SyncPhase {
    /// Returns true while a run is in progress.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Checking | Self::Triggering | Self::Polling { .. })
    }
}

/// How a run ended. Every outcome lets the caller proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Synced before this run started.
    AlreadySynced,
    /// Completion observed after `attempts` polls.
    Synced {
        /// Polls used.
        attempts: u32,
    },
    /// Ceiling reached; the job continues in the background.
    TimedOut {
        /// Polls used.
        attempts: u32,
    },
    /// Another run is in progress; nothing was started.
    InProgress,
    /// Stopped by [`ContextSync::cancel`].
    Cancelled,
}

impl SyncOutcome {
    /// Returns true if the job may still be running in the background.
    #[must_use]
    pub const fn continues_in_background(self) -> bool {
        matches!(self, Self::TimedOut { .. } | Self::Cancelled)
    }
}

/// Runs the check, trigger, poll sequence at most once at a time.
pub struct ContextSync<B> {
    backend: Arc<B>,
    policy: SyncPolicy,
    phase: Mutex<SyncPhase>,
    cancelled: AtomicBool,
}

impl<B> std::fmt::Debug for ContextSync<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextSync")
            .field("policy", &self.policy)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl<B> ContextSync<B> {
    fn phase_lock(&self) -> MutexGuard<'_, SyncPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: SyncPhase) {
        *self.phase_lock() = phase;
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        *self.phase_lock()
    }

    /// Status as last observed. Only ever `Synced` after the backend said so.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        match self.phase() {
            SyncPhase::AlreadySynced | SyncPhase::Synced => SyncStatus::Synced,
            _ => SyncStatus::NotSynced,
        }
    }

    /// Stops a running poll loop before its next request.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl<B: DraftBackend> ContextSync<B> {
    /// Creates an idle driver.
    #[must_use]
    pub fn new(backend: Arc<B>, policy: SyncPolicy) -> Self {
        Self {
            backend,
            policy,
            phase: Mutex::new(SyncPhase::Unknown),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Checks the sync status and, if needed, triggers the job and polls.
    ///
    /// Calling this while a run is in progress returns `InProgress`
    /// without touching the backend. Once synced, later calls return
    /// `AlreadySynced`. A failed status check or trigger is logged and
    /// polling goes ahead.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend rejects the session.
    pub async fn start(&self) -> Result<SyncOutcome> {
        {
            let mut phase = self.phase_lock();
            if phase.is_running() {
                debug!("Context sync already running");
                return Ok(SyncOutcome::InProgress);
            }
            if matches!(*phase, SyncPhase::AlreadySynced | SyncPhase::Synced) {
                return Ok(SyncOutcome::AlreadySynced);
            }
            *phase = SyncPhase::Checking;
        }
        self.cancelled.store(false, Ordering::SeqCst);

        match self.backend.sync_status().await {
            Ok(true) => {
                self.set_phase(SyncPhase::AlreadySynced);
                info!("Context already synced");
                return Ok(SyncOutcome::AlreadySynced);
            }
            Ok(false) => {}
            Err(e) if e.is_unauthorized() => {
                self.set_phase(SyncPhase::Unknown);
                return Err(e.into());
            }
            Err(e) => warn!(error = %e, "Could not check context sync status"),
        }

        self.set_phase(SyncPhase::Triggering);
        info!("Triggering context sync");
        match self.backend.trigger_sync().await {
            Ok(()) => {}
            Err(e) if e.is_unauthorized() => {
                self.set_phase(SyncPhase::Unknown);
                return Err(e.into());
            }
            Err(e) => warn!(error = %e, "Context sync trigger failed; polling anyway"),
        }

        self.poll().await
    }

    async fn poll(&self) -> Result<SyncOutcome> {
        let mut poller = Poller::new(self.policy);

        while let Some(delay) = poller.next_delay() {
            let attempt = poller.attempts() + 1;
            self.set_phase(SyncPhase::Polling { attempt });
            tokio::time::sleep(delay).await;

            if self.cancelled.load(Ordering::SeqCst) {
                self.set_phase(SyncPhase::Cancelled);
                info!(attempt, "Context sync polling cancelled");
                return Ok(SyncOutcome::Cancelled);
            }

            let observed = match self.backend.sync_status().await {
                Ok(synced) => Some(SyncStatus::from(synced)),
                Err(e) if e.is_unauthorized() => {
                    self.set_phase(SyncPhase::Unknown);
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(
                        attempt,
                        error = %e,
                        transient = e.is_transient(),
                        "Context sync poll failed"
                    );
                    None
                }
            };

            match poller.record(observed) {
                Poll::Synced => {
                    self.set_phase(SyncPhase::Synced);
                    info!(attempts = attempt, "Context sync complete");
                    return Ok(SyncOutcome::Synced { attempts: attempt });
                }
                Poll::Pending => debug!(attempt, "Context not yet synced"),
                Poll::Exhausted => break,
            }
        }

        self.set_phase(SyncPhase::TimedOut);
        warn!(
            attempts = poller.attempts(),
            "Context sync still running; continuing in background"
        );
        Ok(SyncOutcome::TimedOut {
            attempts: poller.attempts(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tokio_test::assert_ok;

    use super::*;
    use crate::backend::{Call, CallKind, Fault, MemoryBackend};

    fn driver(backend: &Arc<MemoryBackend>) -> ContextSync<MemoryBackend> {
        ContextSync::new(Arc::clone(backend), SyncPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_synced_skips_trigger() {
        let backend = Arc::new(MemoryBackend::new());
        let sync = driver(&backend);

        let outcome = assert_ok!(sync.start().await);
        assert_eq!(outcome, SyncOutcome::AlreadySynced);
        assert_eq!(backend.calls(), vec![Call::SyncStatus]);
        assert_eq!(sync.status(), SyncStatus::Synced);

        assert_eq!(sync.start().await.unwrap(), SyncOutcome::AlreadySynced);
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_synced() {
        let backend = Arc::new(MemoryBackend::new().sync_after(4));
        let sync = driver(&backend);
        let started = tokio::time::Instant::now();

        let outcome = sync.start().await.unwrap();
        assert_eq!(outcome, SyncOutcome::Synced { attempts: 3 });
        assert_eq!(backend.trigger_count(), 1);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
        assert_eq!(sync.phase(), SyncPhase::Synced);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_without_blocking_forever() {
        let backend = Arc::new(MemoryBackend::new().never_sync());
        let sync = driver(&backend);
        let started = tokio::time::Instant::now();

        let outcome = sync.start().await.unwrap();
        assert_eq!(outcome, SyncOutcome::TimedOut { attempts: 30 });
        assert!(outcome.continues_in_background());
        assert_eq!(started.elapsed(), Duration::from_secs(60));
        assert_eq!(backend.status_polls(), 31);
        assert_eq!(sync.status(), SyncStatus::NotSynced);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_polls_count_as_attempts() {
        let backend = Arc::new(MemoryBackend::new().sync_after(4));
        backend.fail_next(CallKind::SyncStatus, Fault::Unavailable);
        backend.fail_next(CallKind::SyncStatus, Fault::Unavailable);
        let sync = ContextSync::new(
            Arc::clone(&backend),
            SyncPolicy {
                interval: Duration::from_secs(2),
                max_attempts: 2,
            },
        );

        // First check and first poll fail; the second poll is the last one.
        let outcome = sync.start().await.unwrap();
        assert_eq!(outcome, SyncOutcome::TimedOut { attempts: 2 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_failure_is_not_fatal() {
        let backend = Arc::new(MemoryBackend::new().sync_after(2));
        backend.fail_next(CallKind::TriggerSync, Fault::Unavailable);
        let sync = driver(&backend);

        assert_eq!(
            sync.start().await.unwrap(),
            SyncOutcome::Synced { attempts: 1 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_suppressed() {
        let backend = Arc::new(MemoryBackend::new().sync_after(3));
        let sync = driver(&backend);

        let (first, second) = tokio::join!(sync.start(), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            sync.start().await
        });

        assert_eq!(first.unwrap(), SyncOutcome::Synced { attempts: 2 });
        assert_eq!(second.unwrap(), SyncOutcome::InProgress);
        assert_eq!(backend.trigger_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let backend = Arc::new(MemoryBackend::new().never_sync());
        let sync = driver(&backend);

        let (outcome, ()) = tokio::join!(sync.start(), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            sync.cancel();
        });

        assert_eq!(outcome.unwrap(), SyncOutcome::Cancelled);
        assert_eq!(sync.phase(), SyncPhase::Cancelled);
        // Check plus polls at 2s and 4s.
        assert_eq!(backend.status_polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_session_stops_polling() {
        let backend = Arc::new(MemoryBackend::new().never_sync());
        backend.fail_next(CallKind::TriggerSync, Fault::Unauthorized);
        let sync = driver(&backend);

        let err = sync.start().await.unwrap_err();
        assert!(err.is_session_expired());
        assert_eq!(sync.phase(), SyncPhase::Unknown);
        assert_eq!(backend.status_polls(), 1);
    }
}
