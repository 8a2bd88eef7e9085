//! Single-timer expiry scheduling for the active session.
//!
//! At most one timer is ever live; every `arm` cancels the previous one
//! first, so replacing a session can never leave a stale timer behind.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

pub const DEFAULT_WARNING_THRESHOLD_MS: i64 = 5 * 60 * 1000;

/// The one live timer, if any. Owned exclusively by the scheduler.
pub struct ScheduledExpiry {
    pub target_ms: i64,
    pub generation: u64,
    handle: JoinHandle<()>,
}

pub struct ExpiryScheduler {
    warning_threshold_ms: i64,
    current: Option<ScheduledExpiry>,
}

impl Default for ExpiryScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_WARNING_THRESHOLD_MS)
    }
}

impl ExpiryScheduler {
    pub fn new(warning_threshold_ms: i64) -> Self {
        Self { warning_threshold_ms, current: None }
    }

    /// Arm the expiry timer for the given instant.
    ///
    /// An already-past instant fires `on_expire` synchronously and arms
    /// nothing (the "already expired on load" case). When the remaining
    /// window is inside the warning threshold, `on_warning` fires once,
    /// immediately, at arm time; it is never re-evaluated later.
    ///
    /// Callbacks must not re-enter the scheduler. Requires a tokio runtime.
    pub fn arm<E, W>(
        &mut self,
        expires_at_epoch_secs: i64,
        now_ms: i64,
        generation: u64,
        on_expire: E,
        on_warning: W,
    ) where
        E: FnOnce() + Send + 'static,
        W: FnOnce(),
    {
        self.disarm();
        let delta_ms = expires_at_epoch_secs
            .saturating_mul(1000)
            .saturating_sub(now_ms);
        if delta_ms <= 0 {
            debug!(delta_ms, "credential already expired, firing immediately");
            on_expire();
            return;
        }
        if delta_ms < self.warning_threshold_ms {
            debug!(delta_ms, "arming inside warning threshold");
            on_warning();
        }
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delta_ms as u64)).await;
            on_expire();
        });
        self.current = Some(ScheduledExpiry {
            target_ms: now_ms + delta_ms,
            generation,
            handle,
        });
    }

    /// Cancel the live timer, if any. Idempotent.
    pub fn disarm(&mut self) {
        if let Some(scheduled) = self.current.take() {
            debug!(target_ms = scheduled.target_ms, "expiry timer cancelled");
            scheduled.handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.current.is_some()
    }

    pub fn armed_target_ms(&self) -> Option<i64> {
        self.current.as_ref().map(|s| s.target_ms)
    }
}

impl Drop for ExpiryScheduler {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn flag() -> (Arc<AtomicU32>, impl FnOnce() + Send + 'static) {
        let c = Arc::new(AtomicU32::new(0));
        let c2 = c.clone();
        (c, move || {
            c2.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn past_instant_fires_synchronously_without_a_timer() {
        let mut sched = ExpiryScheduler::default();
        let (expired, on_expire) = flag();
        let (warned, on_warning) = flag();
        // exp one second in the past
        sched.arm(9, 10_000, 1, on_expire, on_warning);
        assert_eq!(expired.load(Ordering::SeqCst), 1);
        assert_eq!(warned.load(Ordering::SeqCst), 0);
        assert!(!sched.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn warning_fires_at_arm_time_inside_threshold() {
        let mut sched = ExpiryScheduler::default();
        let (expired, on_expire) = flag();
        let (warned, on_warning) = flag();
        // two minutes left: inside the 5-minute threshold
        sched.arm(120, 0, 1, on_expire, on_warning);
        assert_eq!(warned.load(Ordering::SeqCst), 1);
        assert_eq!(expired.load(Ordering::SeqCst), 0);
        assert!(sched.is_armed());
        assert_eq!(sched.armed_target_ms(), Some(120_000));
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_after_the_window_elapses() {
        let mut sched = ExpiryScheduler::default();
        let (expired, on_expire) = flag();
        sched.arm(3600, 0, 1, on_expire, || {});
        tokio::time::sleep(Duration::from_secs(3601)).await;
        assert_eq!(expired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_cancels_the_previous_timer() {
        let mut sched = ExpiryScheduler::default();
        let (first, on_first) = flag();
        let (second, on_second) = flag();
        sched.arm(600, 0, 1, on_first, || {});
        sched.arm(7200, 0, 2, on_second, || {});
        // well past the first target, well short of the second
        tokio::time::sleep(Duration::from_secs(700)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0, "cancelled timer fired");
        assert_eq!(second.load(Ordering::SeqCst), 0);
        assert_eq!(sched.armed_target_ms(), Some(7_200_000));
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_is_idempotent() {
        let mut sched = ExpiryScheduler::default();
        let (expired, on_expire) = flag();
        sched.arm(60, 0, 1, on_expire, || {});
        sched.disarm();
        sched.disarm();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(expired.load(Ordering::SeqCst), 0);
    }
}
