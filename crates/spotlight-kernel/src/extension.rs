//! [`HotspotExtension`] – one viewer extension instance.
//!
//! Owns the scene engine, the hotspot registry, the alert controller and the
//! UI store, and routes every input (toolbar, list clicks, scene clicks,
//! telemetry, timer expiries) to the component that handles it.  All methods
//! run to completion; the caller serializes them on a single task.

use std::time::Duration;

use spotlight_middleware::emitter::{Emitter, Listener, ListenerId};
use spotlight_scene::{ActivationReport, HotSpotRegistry, RegistryEvent, SceneEngine};
use spotlight_types::{
    AlertPalette, AnchorSpec, FocusSnapshot, HotSpotDefinition, SceneHandle, SpotError,
    TelemetryReading, ViewerCommand,
};
use tracing::{debug, info};

use crate::Surfaces;
use crate::alert::{AlertOutcome, DEFAULT_HIDE_DELAY, SensorAlertController};
use crate::focus::{FocusBridge, FocusChange};
use crate::state::{SnapshotSink, StateEvent, UiStore};
use crate::timer::{ManualTimers, TimerFired, TimerScheduler};

/// Construction parameters of a [`HotspotExtension`].
#[derive(Debug, Clone)]
pub struct ExtensionOptions {
    pub definitions: Vec<HotSpotDefinition>,
    pub palette: AlertPalette,
    pub hide_delay: Duration,
}

impl ExtensionOptions {
    pub fn new(definitions: Vec<HotSpotDefinition>) -> Self {
        Self {
            definitions,
            palette: AlertPalette::default(),
            hide_delay: DEFAULT_HIDE_DELAY,
        }
    }

    pub fn with_palette(mut self, palette: AlertPalette) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_hide_delay(mut self, hide_delay: Duration) -> Self {
        self.hide_delay = hide_delay;
        self
    }

    /// Check every color up front: both palette styles, then each
    /// definition's style.
    ///
    /// # Errors
    ///
    /// [`SpotError::BadColor`] for a palette color, and
    /// [`SpotError::InvalidStyle`] naming the first offending hotspot.
    pub fn validate(&self) -> Result<(), SpotError> {
        self.palette.alert.validate()?;
        self.palette.normal.validate()?;
        for def in &self.definitions {
            def.data
                .style()
                .validate()
                .map_err(|e| SpotError::InvalidStyle {
                    id: def.data.id.clone(),
                    details: e.to_string(),
                })?;
        }
        Ok(())
    }
}

pub struct HotspotExtension<S: SceneEngine, T: TimerScheduler> {
    scene: S,
    registry: HotSpotRegistry,
    alerts: SensorAlertController<T>,
    store: UiStore,
}

impl<S: SceneEngine, T: TimerScheduler> HotspotExtension<S, T> {
    pub fn new(scene: S, timers: T, sink: Box<dyn SnapshotSink>, options: ExtensionOptions) -> Self {
        Self {
            scene,
            registry: HotSpotRegistry::new(options.definitions),
            alerts: SensorAlertController::new(timers, options.palette, options.hide_delay),
            store: UiStore::new(sink),
        }
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn registry(&self) -> &HotSpotRegistry {
        &self.registry
    }

    pub fn alerts(&self) -> &SensorAlertController<T> {
        &self.alerts
    }

    pub fn state(&self) -> &FocusSnapshot {
        self.store.state()
    }

    pub fn is_active(&self) -> bool {
        self.registry.is_active()
    }

    fn surfaces(&mut self) -> Surfaces<'_> {
        Surfaces {
            scene: &mut self.scene,
            registry: &mut self.registry,
            store: &mut self.store,
        }
    }

    /// Create the hotspots, track the controlled ones and publish the
    /// initial list (uncontrolled hotspots only).
    pub fn activate(&mut self) -> ActivationReport {
        if self.registry.is_active() {
            return ActivationReport::default();
        }
        let report = self.registry.activate(&mut self.scene);
        for id in &report.controlled {
            self.alerts.track(id);
        }
        let entries = self
            .registry
            .iter()
            .filter(|h| !h.controlled())
            .map(|h| h.data().clone())
            .collect();
        self.store.dispatch(StateEvent::Initialized { entries });
        report
    }

    /// Tear everything down: pending timers, hotspots, focus.
    pub fn deactivate(&mut self) -> usize {
        if !self.registry.is_active() {
            return 0;
        }
        self.alerts.reset();
        if self.store.state().active_item.is_some() {
            self.scene.isolate(None);
        }
        let removed = self.registry.deactivate(&mut self.scene);
        self.store.dispatch(StateEvent::Deactivated);
        removed
    }

    /// Toolbar toggle.  Returns the new activation state.
    pub fn toggle(&mut self) -> bool {
        if self.registry.is_active() {
            self.deactivate();
        } else {
            self.activate();
        }
        self.registry.is_active()
    }

    pub fn on_reading(&mut self, reading: &TelemetryReading) -> AlertOutcome {
        let Self {
            scene,
            registry,
            alerts,
            store,
        } = self;
        alerts.on_reading(
            reading,
            Surfaces {
                scene,
                registry,
                store,
            },
        )
    }

    pub fn on_timer(&mut self, fired: &TimerFired) -> bool {
        let Self {
            scene,
            registry,
            alerts,
            store,
        } = self;
        alerts.on_timer_fired(
            fired,
            Surfaces {
                scene,
                registry,
                store,
            },
        )
    }

    /// UI list click (toggles focus).
    pub fn item_clicked(&mut self, id: &str) -> FocusChange {
        FocusBridge::new(self.surfaces()).focus(id)
    }

    /// Scene marker click.  `None` when the handle is not a hotspot.
    pub fn scene_click(&mut self, handle: SceneHandle) -> Option<FocusChange> {
        let id = self.registry.scene_click(handle)?;
        Some(FocusBridge::new(self.surfaces()).focus_hotspot(&id))
    }

    /// Scene marker edit.  The current view is saved with the hotspot so a
    /// later focus returns to it.
    pub fn scene_modified(&mut self, handle: SceneHandle, anchor: AnchorSpec) -> Option<String> {
        let id = self.registry.scene_modified(&self.scene, handle, anchor)?;
        if let Some(view) = self.registry.get(&id).and_then(|h| h.data().viewer_state.clone()) {
            self.store.dispatch(StateEvent::ViewCaptured {
                id: id.clone(),
                view,
            });
        }
        Some(id)
    }

    /// Context-menu "show all objects".
    pub fn show_all(&mut self) {
        FocusBridge::new(self.surfaces()).show_all();
    }

    /// Dispatch a viewer command.
    pub fn command(&mut self, command: ViewerCommand) {
        debug!(?command, "viewer command");
        match command {
            ViewerCommand::Toggle => {
                let active = self.toggle();
                info!(active, "hotspots toggled");
            }
            ViewerCommand::Activate => {
                self.activate();
            }
            ViewerCommand::Deactivate => {
                self.deactivate();
            }
            ViewerCommand::ShowAll => self.show_all(),
            ViewerCommand::ItemClicked { id } => {
                self.item_clicked(&id);
            }
            ViewerCommand::SceneClick { handle } => {
                self.scene_click(handle);
            }
            ViewerCommand::SceneModified { handle, anchor } => {
                self.scene_modified(handle, anchor);
            }
        }
    }
}

impl<S: SceneEngine> HotspotExtension<S, ManualTimers> {
    /// Advance the virtual clock and deliver every expiry.  Returns the
    /// number of hotspots hidden.
    pub fn advance(&mut self, by: Duration) -> usize {
        let fired = self.alerts.timers_mut().advance(by);
        fired.iter().filter(|f| self.on_timer(f)).count()
    }
}

impl<S: SceneEngine, T: TimerScheduler> Emitter<RegistryEvent> for HotspotExtension<S, T> {
    fn on(&mut self, name: &'static str, listener: Listener<RegistryEvent>) -> ListenerId {
        self.registry.on(name, listener)
    }

    fn off(&mut self, id: ListenerId) -> bool {
        self.registry.off(id)
    }

    fn emit(&mut self, event: &RegistryEvent) -> usize {
        self.registry.emit(event)
    }
}

impl<S: SceneEngine, T: TimerScheduler> std::fmt::Debug for HotspotExtension<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotspotExtension")
            .field("registry", &self.registry)
            .field("alerts", &self.alerts)
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RecordingSink;
    use serde_json::json;
    use spotlight_middleware::emitter::ANY_EVENT;
    use spotlight_scene::sim::{SceneCall, SimScene};
    use spotlight_types::{HotSpotData, HotSpotStyle};
    use std::sync::{Arc, Mutex};

    type Ext = HotspotExtension<SimScene, ManualTimers>;

    fn defs() -> Vec<HotSpotDefinition> {
        let normal = HotSpotStyle::new("#4CAF50", "#4CAF50");
        let mut pump = HotSpotData::new("pump", &normal);
        pump.controlled = true;
        pump.isolate_ids = vec![42];
        vec![
            HotSpotDefinition {
                anchor: AnchorSpec(json!({"dbId": 1})),
                data: HotSpotData::new("door", &normal),
            },
            HotSpotDefinition {
                anchor: AnchorSpec(json!({"dbId": 2})),
                data: HotSpotData::new("fan", &normal),
            },
            HotSpotDefinition {
                anchor: AnchorSpec(json!({"dbId": 3})),
                data: pump,
            },
        ]
    }

    fn ext() -> (Ext, RecordingSink) {
        let sink = RecordingSink::new();
        let ext = HotspotExtension::new(
            SimScene::new(),
            ManualTimers::new(),
            Box::new(sink.clone()),
            ExtensionOptions::new(defs()),
        );
        (ext, sink)
    }

    fn reading(t: f64) -> TelemetryReading {
        TelemetryReading::new("pump", t, 20.0)
    }

    #[test]
    fn activate_publishes_uncontrolled_list_and_tracks_controlled() {
        let (mut ext, sink) = ext();
        let report = ext.activate();

        assert_eq!(report.created.len(), 3);
        assert!(ext.alerts().is_tracked("pump"));
        let ids: Vec<_> = sink.last().unwrap().hotspots.iter().map(|e| e.id().to_string()).collect();
        assert_eq!(ids, vec!["door", "fan"]);
        assert!(ext.registry().get("pump").unwrap().hidden());
    }

    #[test]
    fn malformed_hotspot_style_is_skipped_and_never_listed() {
        let mut definitions = defs();
        definitions[0].data.stroke_color = "red".into();
        definitions[0].data.fill_color = "blue".into();
        let options = ExtensionOptions::new(definitions);
        assert!(matches!(
            options.validate(),
            Err(SpotError::InvalidStyle { ref id, .. }) if id == "door"
        ));

        let sink = RecordingSink::new();
        let mut ext: Ext =
            HotspotExtension::new(SimScene::new(), ManualTimers::new(), Box::new(sink.clone()), options);
        let report = ext.activate();

        assert_eq!(report.created, vec!["fan", "pump"]);
        assert_eq!(report.skipped.len(), 1);
        let ids: Vec<_> = sink.last().unwrap().hotspots.iter().map(|e| e.id().to_string()).collect();
        assert_eq!(ids, vec!["fan"]);
    }

    #[test]
    fn default_options_validate() {
        assert!(ExtensionOptions::new(defs()).validate().is_ok());
    }

    #[test]
    fn toggle_round_trips_activation() {
        let (mut ext, _) = ext();
        assert!(ext.toggle());
        assert_eq!(ext.scene().marker_count(), 3);
        assert!(!ext.toggle());
        assert_eq!(ext.scene().marker_count(), 0);
        assert!(ext.registry().is_empty());
    }

    #[test]
    fn alert_cycle_end_to_end() {
        let (mut ext, _) = ext();
        ext.activate();

        assert_eq!(ext.on_reading(&reading(30.0)), AlertOutcome::Alert);
        assert!(ext.state().entry("pump").is_some());

        assert_eq!(ext.on_reading(&reading(10.0)), AlertOutcome::Recovered { armed: true });
        assert_eq!(ext.advance(Duration::from_secs(20)), 1);

        assert!(ext.state().entry("pump").is_none());
        assert!(ext.registry().get("pump").unwrap().hidden());
    }

    #[test]
    fn focused_alerting_hotspot_receives_graph_data_then_clears_on_hide() {
        let (mut ext, _) = ext();
        ext.activate();
        ext.on_reading(&reading(30.0));

        assert_eq!(ext.item_clicked("pump"), FocusChange::Focused("pump".into()));
        assert_eq!(ext.scene().isolated(), Some(&[42][..]));

        ext.on_reading(&reading(25.0));
        assert_eq!(ext.state().graph_data, Some(reading(25.0)));

        assert!(!ext.registry().get("door").unwrap().is_visible());

        ext.on_reading(&reading(5.0));
        ext.advance(Duration::from_secs(20));

        assert!(ext.state().active_item.is_none());
        assert!(ext.state().graph_data.is_none());
        assert_eq!(ext.scene().isolated(), None);
        assert!(ext.registry().get("door").unwrap().is_visible());
        assert_eq!(ext.scene().calls().last(), Some(&SceneCall::FitView));
    }

    #[test]
    fn unfocused_auto_hide_keeps_current_isolation() {
        let (mut ext, _) = ext();
        ext.activate();
        ext.item_clicked("door");
        ext.on_reading(&reading(30.0));
        ext.on_reading(&reading(5.0));
        ext.advance(Duration::from_secs(20));

        assert_eq!(ext.state().active_id(), Some("door"));
        assert!(!ext.registry().get("fan").unwrap().is_visible());
    }

    #[test]
    fn scene_edit_saves_the_view_restored_on_focus() {
        let (mut ext, _) = ext();
        ext.activate();
        let handle = ext.registry().get("door").unwrap().handle().unwrap();
        let view = ext.scene().save_view_state();

        ext.command(ViewerCommand::SceneModified {
            handle,
            anchor: AnchorSpec(json!({"dbId": 9})),
        });
        assert_eq!(ext.state().entry("door").unwrap().data.viewer_state, Some(view.clone()));

        ext.item_clicked("door");
        assert_eq!(ext.scene().current_view(), Some(&view));
    }

    #[test]
    fn graph_data_untouched_for_unfocused_target() {
        let (mut ext, _) = ext();
        ext.activate();
        ext.item_clicked("door");
        ext.on_reading(&reading(30.0));
        assert!(ext.state().graph_data.is_none());
        assert_eq!(ext.state().active_id(), Some("door"));
    }

    #[test]
    fn item_click_toggles_and_scene_click_focuses() {
        let (mut ext, _) = ext();
        ext.activate();

        let handle = ext.registry().get("fan").unwrap().handle().unwrap();
        assert_eq!(ext.scene_click(handle), Some(FocusChange::Focused("fan".into())));
        assert_eq!(ext.item_clicked("fan"), FocusChange::Defocused("fan".into()));
        assert!(ext.state().active_item.is_none());
        assert_eq!(ext.scene_click(SceneHandle(9_999)), None);
    }

    #[test]
    fn commands_route_to_handlers() {
        let (mut ext, sink) = ext();
        ext.command(ViewerCommand::Toggle);
        assert!(ext.is_active());

        ext.command(ViewerCommand::ItemClicked { id: "door".into() });
        assert_eq!(sink.last().unwrap().active_id(), Some("door"));

        ext.command(ViewerCommand::ShowAll);
        assert_eq!(ext.scene().calls().last(), Some(&SceneCall::FitView));

        ext.command(ViewerCommand::Deactivate);
        assert!(!ext.is_active());
        assert!(sink.last().unwrap().active_item.is_none());
    }

    #[test]
    fn deactivate_cancels_pending_hide() {
        let (mut ext, _) = ext();
        ext.activate();
        ext.on_reading(&reading(30.0));
        ext.on_reading(&reading(10.0));
        assert_eq!(ext.alerts().timers().live_count(), 1);

        ext.deactivate();
        assert_eq!(ext.alerts().timers().live_count(), 0);
        assert_eq!(ext.advance(Duration::from_secs(60)), 0);

        // Readings after deactivation are ignored.
        assert_eq!(ext.on_reading(&reading(30.0)), AlertOutcome::Ignored);
    }

    #[test]
    fn registry_events_reach_extension_listeners() {
        let (mut ext, _) = ext();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        ext.on(
            ANY_EVENT,
            Box::new(move |e: &RegistryEvent| sink.lock().unwrap().push(e.clone())),
        );

        ext.activate();
        let created = seen
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, RegistryEvent::Created { .. }))
            .count();
        assert_eq!(created, 3);
    }
}
