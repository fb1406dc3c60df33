//! `spotlight-kernel` – hotspot alert and focus core.
//!
//! Everything that decides *when* a hotspot is shown, hidden, recolored or
//! focused lives here.  None of it blocks; the runtime feeds it telemetry,
//! commands and timer expiries one at a time.
//!
//! # Modules
//!
//! - [`timer`] – the [`TimerScheduler`][timer::TimerScheduler] trait with a
//!   Tokio implementation and a virtual-clock one.
//! - [`state`] – the pure [`reduce`][state::reduce] function, the
//!   [`UiStore`][state::UiStore] that applies it and the
//!   [`SnapshotSink`][state::SnapshotSink] it publishes to.
//! - [`alert`] – [`SensorAlertController`][alert::SensorAlertController]:
//!   alert/recover transitions with a single auto-hide timer per hotspot.
//! - [`focus`] – [`FocusBridge`][focus::FocusBridge]: list and scene clicks to
//!   scene focus.
//! - [`extension`] – [`HotspotExtension`][extension::HotspotExtension], the
//!   per-extension owner wiring the above together.

use spotlight_scene::{HotSpotRegistry, SceneEngine};

pub mod alert;
pub mod extension;
pub mod focus;
pub mod state;
pub mod timer;

pub use alert::{AlertOutcome, DEFAULT_HIDE_DELAY, SensorAlertController};
pub use extension::{ExtensionOptions, HotspotExtension};
pub use focus::{FocusBridge, FocusChange};
pub use state::{RecordingSink, SnapshotSink, StateEvent, UiStore, reduce};
pub use timer::{ManualTimers, TimerFired, TimerHandle, TimerScheduler, TokioTimers};

/// Mutable borrows of the three things a transition touches.
pub struct Surfaces<'a> {
    pub scene: &'a mut dyn SceneEngine,
    pub registry: &'a mut HotSpotRegistry,
    pub store: &'a mut UiStore,
}
