//! [`SensorAlertController`] – telemetry-driven alert state machine.
//!
//! Per controlled hotspot:
//!
//! ```text
//!             reading > threshold                reading <= threshold
//!   Hidden ───────────────────────▶ Alert ───────────────────────────▶ Recovering
//!     ▲                              ▲  (cancel timer)        (arm timer if none)│
//!     │                              └───────────────────────────────────────────┤
//!     │                                 reading > threshold                      │
//!     └──────────────────────────────────────────────────────────────────────────┘
//!                               hide timer fired
//! ```
//!
//! The `{hotspot id → TimerHandle}` map is only changed through `arm` and
//! `cancel`, so a hotspot never has more than one live timer.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use spotlight_scene::IdSet;
use spotlight_types::{AlertPalette, TelemetryReading};
use tracing::{debug, info, warn};

use crate::Surfaces;
use crate::state::StateEvent;
use crate::timer::{TimerFired, TimerHandle, TimerScheduler};

/// Delay between a recovered reading and the auto-hide.
pub const DEFAULT_HIDE_DELAY: Duration = Duration::from_secs(20);

/// What a reading did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    /// Unknown, untracked or target-less reading.
    Ignored,
    Alert,
    /// `armed` is `false` when a hide timer was already pending.
    Recovered { armed: bool },
}

pub struct SensorAlertController<T: TimerScheduler> {
    timers: T,
    tracked: HashSet<String>,
    pending: HashMap<String, TimerHandle>,
    palette: AlertPalette,
    hide_delay: Duration,
}

impl<T: TimerScheduler> SensorAlertController<T> {
    pub fn new(timers: T, palette: AlertPalette, hide_delay: Duration) -> Self {
        Self {
            timers,
            tracked: HashSet::new(),
            pending: HashMap::new(),
            palette,
            hide_delay,
        }
    }

    /// Start reacting to readings for `hotspot_id`.
    pub fn track(&mut self, hotspot_id: &str) {
        self.tracked.insert(hotspot_id.to_string());
    }

    pub fn is_tracked(&self, hotspot_id: &str) -> bool {
        self.tracked.contains(hotspot_id)
    }

    pub fn pending_timer(&self, hotspot_id: &str) -> Option<&TimerHandle> {
        self.pending.get(hotspot_id)
    }

    pub fn palette(&self) -> &AlertPalette {
        &self.palette
    }

    pub fn hide_delay(&self) -> Duration {
        self.hide_delay
    }

    pub fn timers(&self) -> &T {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut T {
        &mut self.timers
    }

    /// Arm the hide timer of `hotspot_id` unless one is already pending.
    fn arm(&mut self, hotspot_id: &str) -> bool {
        if self.pending.contains_key(hotspot_id) {
            return false;
        }
        let handle = self.timers.schedule(hotspot_id, self.hide_delay);
        self.pending.insert(hotspot_id.to_string(), handle);
        true
    }

    fn cancel(&mut self, hotspot_id: &str) -> bool {
        match self.pending.remove(hotspot_id) {
            Some(handle) => {
                self.timers.cancel(&handle);
                true
            }
            None => false,
        }
    }

    /// Handle one telemetry reading.
    pub fn on_reading(&mut self, reading: &TelemetryReading, cx: Surfaces<'_>) -> AlertOutcome {
        let Some(id) = reading.target_id.as_deref() else {
            debug!("reading without target ignored");
            return AlertOutcome::Ignored;
        };
        if !self.tracked.contains(id) {
            debug!(target_id = %id, "reading for untracked hotspot ignored");
            return AlertOutcome::Ignored;
        }
        let Some(hotspot) = cx.registry.get(id) else {
            return AlertOutcome::Ignored;
        };
        if !hotspot.controlled() {
            return AlertOutcome::Ignored;
        }

        if cx.store.state().active_id() == Some(id) {
            cx.store.dispatch(StateEvent::GraphData {
                reading: reading.clone(),
            });
        }

        if reading.is_alert() {
            if self.cancel(id) {
                debug!(hotspot = %id, "hide timer cancelled by alert");
            }
            let alert = self.palette.alert.clone();
            // `id` was looked up above; these cannot fail.
            let applied = cx
                .registry
                .set_style(&mut *cx.scene, id, &alert)
                .and_then(|_| cx.registry.show(&mut *cx.scene, id));
            if let Err(e) = applied {
                warn!(hotspot = %id, error = %e, "alert not applied");
                return AlertOutcome::Ignored;
            }
            if let Some(hotspot) = cx.registry.get(id) {
                cx.store.dispatch(StateEvent::AlertRaised {
                    data: hotspot.data().clone(),
                });
            }
            info!(
                hotspot = %id,
                temperature = ?reading.object_temperature,
                threshold = ?reading.threshold,
                "sensor alert"
            );
            AlertOutcome::Alert
        } else {
            let normal = self.palette.normal.clone();
            if let Err(e) = cx.registry.set_style(&mut *cx.scene, id, &normal) {
                warn!(hotspot = %id, error = %e, "recovery not applied");
                return AlertOutcome::Ignored;
            }
            cx.store.dispatch(StateEvent::Recovered {
                id: id.to_string(),
                style: normal,
            });
            let armed = self.arm(id);
            debug!(hotspot = %id, armed, "sensor recovered");
            AlertOutcome::Recovered { armed }
        }
    }

    /// Handle a timer expiry.  Stale notices (cancelled or superseded
    /// timers) are dropped.  Returns `true` when the hotspot was hidden.
    pub fn on_timer_fired(&mut self, fired: &TimerFired, cx: Surfaces<'_>) -> bool {
        let live = self
            .pending
            .get(&fired.hotspot_id)
            .is_some_and(|h| h.matches(fired));
        if !live {
            debug!(hotspot = %fired.hotspot_id, token = fired.token, "stale timer ignored");
            return false;
        }
        self.pending.remove(&fired.hotspot_id);

        if let Err(e) = cx.registry.hide(&mut *cx.scene, &fired.hotspot_id) {
            debug!(hotspot = %fired.hotspot_id, error = %e, "auto-hide target gone");
        }
        let was_focused = cx.store.state().active_id() == Some(fired.hotspot_id.as_str());
        cx.store.dispatch(StateEvent::AutoHidden {
            id: fired.hotspot_id.clone(),
        });
        // Focus is gone, so the scene leaves the hotspot's isolation too.
        if was_focused {
            cx.scene.isolate(None);
            cx.registry.isolate(&mut *cx.scene, IdSet::all());
            cx.scene.fit_view();
        }
        info!(hotspot = %fired.hotspot_id, "hotspot auto-hidden");
        true
    }

    /// Cancel every pending timer and forget tracked hotspots.
    pub fn reset(&mut self) {
        let ids: Vec<String> = self.pending.keys().cloned().collect();
        for id in ids {
            self.cancel(&id);
        }
        self.tracked.clear();
    }
}

impl<T: TimerScheduler> std::fmt::Debug for SensorAlertController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorAlertController")
            .field("tracked", &self.tracked)
            .field("pending", &self.pending.len())
            .field("hide_delay", &self.hide_delay)
            .finish()
    }
}
