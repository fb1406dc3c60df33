//! UI state projection.
//!
//! The externally visible state is a [`FocusSnapshot`].  It is only ever
//! changed by [`reduce`], a pure function applied by [`UiStore::dispatch`] to
//! the store's *latest* state, and every dispatch publishes the full result to
//! a [`SnapshotSink`].  Deferred work (an auto-hide timer) therefore never acts
//! on a snapshot captured when it was scheduled.
//!
//! Invariant: `active_item` is only ever set for an id present in `hotspots`.

use std::sync::{Arc, Mutex};

use spotlight_types::{
    FocusSnapshot, HotSpotData, HotSpotEntry, HotSpotStyle, TelemetryReading, ViewState,
};
use tracing::debug;

/// Mutations of the UI state.
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    /// Replace the list with `entries`; nothing focused.
    Initialized { entries: Vec<HotSpotData> },
    /// Upsert a controlled hotspot in alert, keyed by id.
    AlertRaised { data: HotSpotData },
    /// A controlled hotspot went back under its threshold.
    Recovered { id: String, style: HotSpotStyle },
    /// The auto-hide timer of `id` fired.
    AutoHidden { id: String },
    /// The scene view was captured for `id` after an edit.
    ViewCaptured { id: String, view: ViewState },
    /// A reading for the focused hotspot.  Ignored for any other target.
    GraphData { reading: TelemetryReading },
    /// Focus the listed hotspot carrying `data`.
    Focused { data: HotSpotData },
    Defocused,
    /// Hotspots were torn down: drop focus and controlled entries.
    Deactivated,
}

/// Apply `event` to `state`.
pub fn reduce(state: &FocusSnapshot, event: &StateEvent) -> FocusSnapshot {
    let mut next = state.clone();

    match event {
        StateEvent::Initialized { entries } => {
            next = FocusSnapshot {
                active_item: None,
                hotspots: entries.iter().cloned().map(HotSpotEntry::new).collect(),
                graph_data: None,
            };
        }

        StateEvent::AlertRaised { data } => {
            match next.hotspots.iter_mut().find(|e| e.id() == data.id) {
                Some(entry) => entry.data = data.clone(),
                None => next.hotspots.push(HotSpotEntry::new(data.clone())),
            }
            if let Some(active) = next.active_item.as_mut().filter(|a| a.id == data.id) {
                *active = data.clone();
            }
        }

        StateEvent::Recovered { id, style } => {
            if let Some(entry) = next.hotspots.iter_mut().find(|e| e.id() == id) {
                entry.data.set_style(style);
            }
            if let Some(active) = next.active_item.as_mut().filter(|a| &a.id == id) {
                active.set_style(style);
            }
        }

        StateEvent::AutoHidden { id } => {
            next.hotspots.retain(|e| e.id() != id);
            if next.active_id() == Some(id.as_str()) {
                next.active_item = None;
                next.graph_data = None;
            }
        }

        StateEvent::ViewCaptured { id, view } => {
            if let Some(entry) = next.hotspots.iter_mut().find(|e| e.id() == id) {
                entry.data.viewer_state = Some(view.clone());
            }
            if let Some(active) = next.active_item.as_mut().filter(|a| &a.id == id) {
                active.viewer_state = Some(view.clone());
            }
        }

        StateEvent::GraphData { reading } => {
            if next.active_id().is_some() && next.active_id() == reading.target_id.as_deref() {
                next.graph_data = Some(reading.clone());
            }
        }

        StateEvent::Focused { data } => {
            if next.entry(&data.id).is_none() {
                debug!(hotspot = %data.id, "focus on unlisted hotspot ignored");
                return next;
            }
            for entry in &mut next.hotspots {
                entry.active = entry.data.id == data.id;
            }
            next.active_item = Some(data.clone());
            next.graph_data = None;
        }

        StateEvent::Defocused => {
            for entry in &mut next.hotspots {
                entry.active = false;
            }
            next.active_item = None;
            next.graph_data = None;
        }

        StateEvent::Deactivated => {
            next.hotspots.retain(|e| !e.data.controlled);
            for entry in &mut next.hotspots {
                entry.active = false;
            }
            next.active_item = None;
            next.graph_data = None;
        }
    }

    next
}

// ────────────────────────────────────────────────────────────────────────────
// Publication
// ────────────────────────────────────────────────────────────────────────────

/// Consumer of full-replace snapshots (UI, cockpit, tests).
pub trait SnapshotSink: Send {
    fn publish(&mut self, snapshot: &FocusSnapshot);
}

/// Sink that keeps every published snapshot.  Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    published: Arc<Mutex<Vec<FocusSnapshot>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<FocusSnapshot> {
        self.published.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<FocusSnapshot> {
        self.published
            .lock()
            .ok()
            .and_then(|v| v.last().cloned())
    }

    pub fn len(&self) -> usize {
        self.published.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotSink for RecordingSink {
    fn publish(&mut self, snapshot: &FocusSnapshot) {
        if let Ok(mut published) = self.published.lock() {
            published.push(snapshot.clone());
        }
    }
}

/// Owner of the current [`FocusSnapshot`].
pub struct UiStore {
    state: FocusSnapshot,
    sink: Box<dyn SnapshotSink>,
}

impl UiStore {
    pub fn new(sink: Box<dyn SnapshotSink>) -> Self {
        Self {
            state: FocusSnapshot::default(),
            sink,
        }
    }

    /// The latest state.
    pub fn state(&self) -> &FocusSnapshot {
        &self.state
    }

    /// Reduce `event` onto the latest state and publish the result.
    pub fn dispatch(&mut self, event: StateEvent) -> &FocusSnapshot {
        self.state = reduce(&self.state, &event);
        debug!(
            ?event,
            hotspots = self.state.hotspots.len(),
            active = ?self.state.active_id(),
            "ui state published"
        );
        self.sink.publish(&self.state);
        &self.state
    }
}

impl std::fmt::Debug for UiStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiStore").field("state", &self.state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(id: &str, controlled: bool) -> HotSpotData {
        let mut d = HotSpotData::new(id, &HotSpotStyle::new("#4CAF50", "#4CAF50"));
        d.controlled = controlled;
        d
    }

    fn listed() -> FocusSnapshot {
        reduce(
            &FocusSnapshot::default(),
            &StateEvent::Initialized {
                entries: vec![data("a", false), data("b", false)],
            },
        )
    }

    #[test]
    fn focus_marks_exactly_one_entry_active() {
        let s = reduce(&listed(), &StateEvent::Focused { data: data("b", false) });
        assert_eq!(s.active_id(), Some("b"));
        let active: Vec<_> = s.hotspots.iter().filter(|e| e.active).map(|e| e.id()).collect();
        assert_eq!(active, vec!["b"]);
        assert!(s.graph_data.is_none());
    }

    #[test]
    fn focus_on_unlisted_id_is_ignored() {
        let before = listed();
        let after = reduce(&before, &StateEvent::Focused { data: data("ghost", false) });
        assert_eq!(after, before);
    }

    #[test]
    fn defocus_clears_everything() {
        let mut s = reduce(&listed(), &StateEvent::Focused { data: data("a", false) });
        s.graph_data = Some(TelemetryReading::new("a", 1.0, 2.0));
        let s = reduce(&s, &StateEvent::Defocused);
        assert!(s.active_item.is_none());
        assert!(s.graph_data.is_none());
        assert!(s.hotspots.iter().all(|e| !e.active));
    }

    #[test]
    fn alert_upserts_by_id_last_write_wins() {
        let mut first = data("pump", true);
        first.stroke_color = "#FF0000".into();
        let s = reduce(&listed(), &StateEvent::AlertRaised { data: first });
        let mut second = data("pump", true);
        second.fill_color = "#FF8888".into();
        let s = reduce(&s, &StateEvent::AlertRaised { data: second.clone() });

        assert_eq!(s.hotspots.len(), 3);
        assert_eq!(s.entry("pump").unwrap().data, second);
    }

    #[test]
    fn alert_keeps_active_flag_of_focused_entry() {
        let s = reduce(&listed(), &StateEvent::AlertRaised { data: data("pump", true) });
        let s = reduce(&s, &StateEvent::Focused { data: data("pump", true) });
        let s = reduce(&s, &StateEvent::AlertRaised { data: data("pump", true) });
        assert!(s.entry("pump").unwrap().active);
        assert_eq!(s.active_id(), Some("pump"));
    }

    #[test]
    fn graph_data_only_for_focused_target() {
        let s = reduce(&listed(), &StateEvent::Focused { data: data("a", false) });
        let s = reduce(
            &s,
            &StateEvent::GraphData { reading: TelemetryReading::new("b", 30.0, 20.0) },
        );
        assert!(s.graph_data.is_none());

        let reading = TelemetryReading::new("a", 30.0, 20.0);
        let s = reduce(&s, &StateEvent::GraphData { reading: reading.clone() });
        assert_eq!(s.graph_data, Some(reading));

        let unfocused = reduce(&listed(), &StateEvent::GraphData {
            reading: TelemetryReading::default(),
        });
        assert!(unfocused.graph_data.is_none());
    }

    #[test]
    fn view_captured_updates_entry_and_focus() {
        let view = ViewState(serde_json::json!({"viewport": 7}));
        let s = reduce(&listed(), &StateEvent::Focused { data: data("a", false) });
        let s = reduce(&s, &StateEvent::ViewCaptured { id: "a".into(), view: view.clone() });
        assert_eq!(s.entry("a").unwrap().data.viewer_state, Some(view.clone()));
        assert_eq!(s.active_item.as_ref().unwrap().viewer_state, Some(view));
        assert!(s.entry("b").unwrap().data.viewer_state.is_none());
    }

    #[test]
    fn recovered_recolors_entry() {
        let s = reduce(&listed(), &StateEvent::AlertRaised { data: data("pump", true) });
        let normal = HotSpotStyle::new("#00FF00", "#00FF00");
        let s = reduce(&s, &StateEvent::Recovered { id: "pump".into(), style: normal.clone() });
        assert_eq!(s.entry("pump").unwrap().data.style(), normal);
    }

    #[test]
    fn auto_hide_clears_focus_only_when_focused() {
        let s = reduce(&listed(), &StateEvent::AlertRaised { data: data("pump", true) });

        let unfocused = reduce(&s, &StateEvent::Focused { data: data("a", false) });
        let hidden = reduce(&unfocused, &StateEvent::AutoHidden { id: "pump".into() });
        assert!(hidden.entry("pump").is_none());
        assert_eq!(hidden.active_id(), Some("a"));

        let mut focused = reduce(&s, &StateEvent::Focused { data: data("pump", true) });
        focused.graph_data = Some(TelemetryReading::new("pump", 10.0, 20.0));
        let hidden = reduce(&focused, &StateEvent::AutoHidden { id: "pump".into() });
        assert!(hidden.active_item.is_none());
        assert!(hidden.graph_data.is_none());
    }

    #[test]
    fn deactivated_drops_controlled_entries_and_focus() {
        let s = reduce(&listed(), &StateEvent::AlertRaised { data: data("pump", true) });
        let s = reduce(&s, &StateEvent::Focused { data: data("a", false) });
        let s = reduce(&s, &StateEvent::Deactivated);
        assert_eq!(s.hotspots.len(), 2);
        assert!(s.active_item.is_none());
        assert!(s.hotspots.iter().all(|e| !e.active));
    }

    #[test]
    fn store_publishes_every_dispatch() {
        let sink = RecordingSink::new();
        let mut store = UiStore::new(Box::new(sink.clone()));
        store.dispatch(StateEvent::Initialized { entries: vec![data("a", false)] });
        store.dispatch(StateEvent::Focused { data: data("a", false) });

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.last().unwrap().active_id(), Some("a"));
        assert_eq!(store.state(), &sink.last().unwrap());
    }
}
