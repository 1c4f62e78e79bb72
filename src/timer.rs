//! Retransmission-timer management.
//!
//! The sender keeps at most one timer alive, logically tied to the oldest
//! unacknowledged segment. [`RetransmitTimer`] models it as a cancellable
//! scheduled task: arming spawns a tokio task that sleeps for the RTO and
//! then runs a fire future; cancelling aborts the task and invalidates its
//! epoch.
//!
//! # Cancellation race
//!
//! The timer is always armed and cancelled while its owner holds the shared
//! sender lock, and the fire future must acquire that same lock before
//! acting. A fire that loses the race — cancelled after its sleep elapsed
//! but before it got the lock — observes a bumped epoch and returns without
//! touching any state. The epoch check is the authoritative guard; task
//! abort merely stops sleepers early.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A single restartable retransmission timer.
///
/// Owned exclusively by the sender's shared state; see [`crate::transfer`].
#[derive(Debug, Default)]
pub struct RetransmitTimer {
    /// Incremented on every cancel; a fire whose epoch no longer matches
    /// was cancelled and must do nothing.
    epoch: u64,
    task: Option<JoinHandle<()>>,
}

impl RetransmitTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` while a scheduled fire is pending.
    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }

    /// Epoch of the current arming; fires compare against this under the
    /// sender lock.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Cancel any pending fire and schedule a new one after `rto`.
    ///
    /// `fire` is handed the epoch of this arming and must re-check it (via
    /// [`epoch`](Self::epoch), under the shared lock) before mutating state.
    pub fn arm<F, Fut>(&mut self, rto: Duration, fire: F)
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let fut = fire(self.epoch);
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(rto).await;
            fut.await;
        }));
    }

    /// Consume the current arming from within its own fire.
    ///
    /// A fire that passed the epoch check calls this instead of
    /// [`cancel`](Self::cancel): the armed task *is* the running fire, and
    /// aborting it here would cancel the retransmission mid-flight.
    pub fn fired(&mut self) {
        self.epoch += 1;
        self.task = None;
    }

    /// Cancel the pending fire, if any.
    ///
    /// Safe to call when disarmed. After this returns no previously armed
    /// fire can act, provided the caller holds the sender lock.
    pub fn cancel(&mut self) {
        self.epoch += 1;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for RetransmitTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn armed_timer_fires_after_rto() {
        let fired = Arc::new(AtomicU32::new(0));
        let mut timer = RetransmitTimer::new();

        let f = fired.clone();
        timer.arm(Duration::from_secs(2), move |_epoch| async move {
            f.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let fired = Arc::new(AtomicU32::new(0));
        let mut timer = RetransmitTimer::new();

        let f = fired.clone();
        timer.arm(Duration::from_secs(2), move |_epoch| async move {
            f.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        timer.cancel();
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_replaces_previous_fire() {
        let fired = Arc::new(AtomicU32::new(0));
        let mut timer = RetransmitTimer::new();

        for _ in 0..3 {
            let f = fired.clone();
            timer.arm(Duration::from_secs(2), move |_epoch| async move {
                f.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        // Only the last arming may ever fire.
        tokio::time::sleep(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_epoch_detectable_by_fire() {
        let mut timer = RetransmitTimer::new();
        let armed_epoch = {
            timer.arm(Duration::from_secs(1), |_epoch| async {});
            timer.epoch()
        };
        timer.cancel();
        assert_ne!(timer.epoch(), armed_epoch, "cancel must bump the epoch");
    }
}
