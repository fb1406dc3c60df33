//! Cancellable one-shot timers keyed by hotspot.
//!
//! The alert controller never sleeps itself.  It asks a [`TimerScheduler`]
//! for a deadline and later receives a [`TimerFired`] notice through the
//! event loop.  Each scheduled timer carries a unique token; a notice whose
//! token no longer matches the controller's live handle is stale and must be
//! dropped, so a cancelled timer has no effect even if its sleeper already
//! woke up.
//!
//! * [`TokioTimers`] – one spawned sleeper task per timer, aborted on cancel.
//! * [`ManualTimers`] – a virtual clock advanced explicitly by tests and the
//!   REPL.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// A live timer.  Only the scheduler that issued it can cancel it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerHandle {
    hotspot_id: String,
    token: u64,
}

impl TimerHandle {
    pub fn hotspot_id(&self) -> &str {
        &self.hotspot_id
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    /// Whether `fired` was produced by this handle.
    pub fn matches(&self, fired: &TimerFired) -> bool {
        self.token == fired.token && self.hotspot_id == fired.hotspot_id
    }
}

/// Expiry notice delivered to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFired {
    pub hotspot_id: String,
    pub token: u64,
}

/// Source of one-shot timers.
pub trait TimerScheduler: Send {
    /// Start a timer that fires once after `delay`.
    fn schedule(&mut self, hotspot_id: &str, delay: Duration) -> TimerHandle;

    /// Stop `handle`.  Cancelling a timer that already fired is a no-op.
    fn cancel(&mut self, handle: &TimerHandle);

    /// Number of timers scheduled and neither fired nor cancelled.
    fn live_count(&self) -> usize;
}

// ────────────────────────────────────────────────────────────────────────────
// TokioTimers
// ────────────────────────────────────────────────────────────────────────────

/// Timers backed by `tokio::time::sleep` tasks.
///
/// Expiries are sent on the channel returned by [`TokioTimers::new`].
#[derive(Debug)]
pub struct TokioTimers {
    next_token: u64,
    tx: mpsc::UnboundedSender<TimerFired>,
    tasks: HashMap<u64, JoinHandle<()>>,
}

impl TokioTimers {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerFired>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let timers = Self {
            next_token: 0,
            tx,
            tasks: HashMap::new(),
        };
        (timers, rx)
    }
}

impl TimerScheduler for TokioTimers {
    fn schedule(&mut self, hotspot_id: &str, delay: Duration) -> TimerHandle {
        self.tasks.retain(|_, task| !task.is_finished());

        self.next_token += 1;
        let token = self.next_token;
        let tx = self.tx.clone();
        let fired = TimerFired {
            hotspot_id: hotspot_id.to_string(),
            token,
        };
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver is gone only during shutdown.
            let _ = tx.send(fired);
        });
        self.tasks.insert(token, task);
        debug!(hotspot = %hotspot_id, token, ?delay, "timer scheduled");

        TimerHandle {
            hotspot_id: hotspot_id.to_string(),
            token,
        }
    }

    fn cancel(&mut self, handle: &TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle.token) {
            task.abort();
            debug!(hotspot = %handle.hotspot_id, token = handle.token, "timer cancelled");
        }
    }

    fn live_count(&self) -> usize {
        self.tasks.values().filter(|t| !t.is_finished()).count()
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for task in self.tasks.values() {
            task.abort();
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ManualTimers
// ────────────────────────────────────────────────────────────────────────────

/// Virtual-clock timers.  Nothing fires until [`advance`][Self::advance] is
/// called.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use spotlight_kernel::timer::{ManualTimers, TimerScheduler};
///
/// let mut timers = ManualTimers::new();
/// timers.schedule("pump", Duration::from_secs(20));
///
/// assert!(timers.advance(Duration::from_secs(19)).is_empty());
/// let fired = timers.advance(Duration::from_secs(1));
/// assert_eq!(fired[0].hotspot_id, "pump");
/// assert_eq!(timers.live_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct ManualTimers {
    now: Duration,
    next_token: u64,
    pending: BTreeMap<u64, (Duration, String)>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Move the clock forward and return every timer that expired, ordered by
    /// deadline then scheduling order.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerFired> {
        self.now += by;
        let now = self.now;

        let mut due: Vec<(Duration, u64)> = self
            .pending
            .iter()
            .filter(|(_, (deadline, _))| *deadline <= now)
            .map(|(token, (deadline, _))| (*deadline, *token))
            .collect();
        due.sort();

        due.into_iter()
            .filter_map(|(_, token)| {
                self.pending
                    .remove(&token)
                    .map(|(_, hotspot_id)| TimerFired { hotspot_id, token })
            })
            .collect()
    }
}

impl TimerScheduler for ManualTimers {
    fn schedule(&mut self, hotspot_id: &str, delay: Duration) -> TimerHandle {
        self.next_token += 1;
        let token = self.next_token;
        self.pending
            .insert(token, (self.now + delay, hotspot_id.to_string()));
        TimerHandle {
            hotspot_id: hotspot_id.to_string(),
            token,
        }
    }

    fn cancel(&mut self, handle: &TimerHandle) {
        self.pending.remove(&handle.token);
    }

    fn live_count(&self) -> usize {
        self.pending.len()
    }
}
