//! [`HotSpotRegistry`] – the per-extension set of hotspots.
//!
//! The registry owns every [`HotSpot`] created from the configured
//! definitions and is the single chokepoint for focus-driven visibility:
//! "show everything", "show only X" and "restore after defocus" are all
//! expressed through [`HotSpotRegistry::isolate`].
//!
//! # Membership
//!
//! `Unregistered → Active → Removed`, one way, driven only by
//! [`activate`][HotSpotRegistry::activate] and
//! [`deactivate`][HotSpotRegistry::deactivate].  No hotspot is created or
//! destroyed outside those two bulk operations.
//!
//! # Events
//!
//! Observers registered through [`Emitter`] receive `hotspot.created`,
//! `hotspot.clicked`, `hotspot.updated` and `hotspot.visible`.

use std::collections::HashSet;

use spotlight_middleware::emitter::{Emitter, EventHub, Listener, ListenerId, NamedEvent};
use spotlight_types::{AnchorSpec, HotSpotDefinition, HotSpotStyle, SceneHandle, SpotError};
use tracing::{debug, info, warn};

use crate::engine::SceneEngine;
use crate::hotspot::HotSpot;

/// Registry-level hotspot events.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    Created { id: String, controlled: bool },
    Clicked { id: String },
    Updated { id: String, anchor: AnchorSpec },
    Visible { id: String, visible: bool },
}

impl RegistryEvent {
    pub fn hotspot_id(&self) -> &str {
        match self {
            RegistryEvent::Created { id, .. }
            | RegistryEvent::Clicked { id }
            | RegistryEvent::Updated { id, .. }
            | RegistryEvent::Visible { id, .. } => id,
        }
    }
}

impl NamedEvent for RegistryEvent {
    fn name(&self) -> &'static str {
        match self {
            RegistryEvent::Created { .. } => "hotspot.created",
            RegistryEvent::Clicked { .. } => "hotspot.clicked",
            RegistryEvent::Updated { .. } => "hotspot.updated",
            RegistryEvent::Visible { .. } => "hotspot.visible",
        }
    }
}

/// Normalized isolation target.  Empty means "every hotspot".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSet(HashSet<String>);

impl IdSet {
    /// The empty selection: show every hotspot.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a hotspot with `id` is shown under this selection.
    pub fn admits(&self, id: &str) -> bool {
        self.0.is_empty() || self.0.contains(id)
    }
}

impl From<Option<&str>> for IdSet {
    fn from(id: Option<&str>) -> Self {
        Self(id.into_iter().map(str::to_owned).collect())
    }
}

impl From<&str> for IdSet {
    fn from(id: &str) -> Self {
        Some(id).into()
    }
}

impl From<&[&str]> for IdSet {
    fn from(ids: &[&str]) -> Self {
        Self(ids.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for IdSet {
    fn from(ids: [&str; N]) -> Self {
        ids.as_slice().into()
    }
}

impl From<Vec<String>> for IdSet {
    fn from(ids: Vec<String>) -> Self {
        Self(ids.into_iter().collect())
    }
}

/// Outcome of [`HotSpotRegistry::activate`].
#[derive(Debug, Default)]
pub struct ActivationReport {
    /// Ids of hotspots created, in definition order.
    pub created: Vec<String>,
    /// Subset of `created` that is telemetry-controlled (and now hidden).
    pub controlled: Vec<String>,
    /// Definitions whose anchor did not resolve.
    pub skipped: Vec<SpotError>,
}

/// Owns the hotspots of one extension.
#[derive(Debug)]
pub struct HotSpotRegistry {
    definitions: Vec<HotSpotDefinition>,
    hotspots: Vec<HotSpot>,
    active: bool,
    hub: EventHub<RegistryEvent>,
}

impl HotSpotRegistry {
    pub fn new(definitions: Vec<HotSpotDefinition>) -> Self {
        Self {
            definitions,
            hotspots: Vec::new(),
            active: false,
            hub: EventHub::new(),
        }
    }

    pub fn definitions(&self) -> &[HotSpotDefinition] {
        &self.definitions
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn len(&self) -> usize {
        self.hotspots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hotspots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HotSpot> {
        self.hotspots.iter()
    }

    pub fn get(&self, id: &str) -> Option<&HotSpot> {
        self.hotspots.iter().find(|h| h.id() == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut HotSpot, SpotError> {
        self.hotspots
            .iter_mut()
            .find(|h| h.id() == id)
            .ok_or_else(|| SpotError::UnknownHotSpot(id.to_string()))
    }

    /// Create one hotspot per definition.
    ///
    /// Activation is per hotspot, not transactional: an anchor that does not
    /// resolve is logged and skipped while the rest are created.  Controlled
    /// hotspots are force-hidden right after creation.  Calling this while
    /// already active returns an empty report.
    pub fn activate(&mut self, scene: &mut dyn SceneEngine) -> ActivationReport {
        let mut report = ActivationReport::default();
        if self.active {
            debug!("registry already active");
            return report;
        }
        self.active = true;

        for definition in self.definitions.clone() {
            let id = definition.data.id.clone();
            match HotSpot::create(scene, definition) {
                Ok(mut hotspot) => {
                    let controlled = hotspot.controlled();
                    if controlled {
                        hotspot.hide(scene);
                        report.controlled.push(id.clone());
                    }
                    self.hotspots.push(hotspot);
                    self.hub.emit(&RegistryEvent::Created {
                        id: id.clone(),
                        controlled,
                    });
                    report.created.push(id);
                }
                Err(e) => {
                    warn!(hotspot = %id, error = %e, "skipping hotspot");
                    report.skipped.push(e);
                }
            }
        }

        info!(
            created = report.created.len(),
            controlled = report.controlled.len(),
            skipped = report.skipped.len(),
            "hotspots activated"
        );
        report
    }

    /// Remove every tracked hotspot from the scene and forget it.  No-op when
    /// not active.  Returns the number of markers removed.
    pub fn deactivate(&mut self, scene: &mut dyn SceneEngine) -> usize {
        if !self.active {
            return 0;
        }
        let removed = self
            .hotspots
            .iter_mut()
            .map(|h| h.remove(scene))
            .filter(|removed| *removed)
            .count();
        self.hotspots.clear();
        self.active = false;
        info!(removed, "hotspots deactivated");
        removed
    }

    /// Show the hotspots in `ids` and skip the rest; an empty selection shows
    /// every hotspot.  Hidden hotspots are left untouched.
    pub fn isolate(&mut self, scene: &mut dyn SceneEngine, ids: impl Into<IdSet>) {
        let ids: IdSet = ids.into();
        let mut changed = Vec::new();

        for hotspot in self.hotspots.iter_mut().filter(|h| !h.hidden()) {
            let visible = ids.admits(hotspot.id());
            hotspot.set_skip_occlusion(scene, !visible);
            if hotspot.set_visible(scene, visible) {
                changed.push(RegistryEvent::Visible {
                    id: hotspot.id().to_string(),
                    visible,
                });
            }
        }

        for event in &changed {
            self.hub.emit(event);
        }
    }

    /// Force-hide one hotspot.
    pub fn hide(&mut self, scene: &mut dyn SceneEngine, id: &str) -> Result<(), SpotError> {
        let hotspot = self.get_mut(id)?;
        if hotspot.hide(scene) {
            self.hub.emit(&RegistryEvent::Visible {
                id: id.to_string(),
                visible: false,
            });
        }
        Ok(())
    }

    /// Un-hide and show one hotspot.
    pub fn show(&mut self, scene: &mut dyn SceneEngine, id: &str) -> Result<(), SpotError> {
        let hotspot = self.get_mut(id)?;
        if hotspot.show(scene) {
            self.hub.emit(&RegistryEvent::Visible {
                id: id.to_string(),
                visible: true,
            });
        }
        Ok(())
    }

    pub fn set_style(
        &mut self,
        scene: &mut dyn SceneEngine,
        id: &str,
        style: &HotSpotStyle,
    ) -> Result<(), SpotError> {
        self.get_mut(id)?.set_style(scene, style);
        Ok(())
    }

    /// Route a scene click to the hotspot owning `handle`.  Returns the
    /// hotspot id, or `None` when the handle is not one of ours.
    pub fn scene_click(&mut self, handle: SceneHandle) -> Option<String> {
        let hotspot = self
            .hotspots
            .iter_mut()
            .find(|h| h.handle() == Some(handle))?;
        hotspot.click();
        let id = hotspot.id().to_string();
        self.hub.emit(&RegistryEvent::Clicked { id: id.clone() });
        Some(id)
    }

    /// Route a scene edit to the hotspot owning `handle`.
    pub fn scene_modified(
        &mut self,
        scene: &dyn SceneEngine,
        handle: SceneHandle,
        anchor: AnchorSpec,
    ) -> Option<String> {
        let hotspot = self
            .hotspots
            .iter_mut()
            .find(|h| h.handle() == Some(handle))?;
        hotspot.modified(anchor.clone(), scene.save_view_state());
        let id = hotspot.id().to_string();
        self.hub.emit(&RegistryEvent::Updated {
            id: id.clone(),
            anchor,
        });
        Some(id)
    }
}

impl Emitter<RegistryEvent> for HotSpotRegistry {
    fn on(&mut self, name: &'static str, listener: Listener<RegistryEvent>) -> ListenerId {
        self.hub.on(name, listener)
    }

    fn off(&mut self, id: ListenerId) -> bool {
        self.hub.off(id)
    }

    fn emit(&mut self, event: &RegistryEvent) -> usize {
        self.hub.emit(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SceneCall, SimScene};
    use serde_json::json;
    use spotlight_middleware::emitter::ANY_EVENT;
    use spotlight_types::HotSpotData;
    use std::sync::{Arc, Mutex};

    fn def(id: &str, db_id: i64, controlled: bool) -> HotSpotDefinition {
        let mut data = HotSpotData::new(id, &HotSpotStyle::new("#4CAF50", "#4CAF50"));
        data.controlled = controlled;
        HotSpotDefinition {
            anchor: AnchorSpec(json!({ "dbId": db_id })),
            data,
        }
    }

    fn capture(reg: &mut HotSpotRegistry) -> Arc<Mutex<Vec<RegistryEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        reg.on(
            ANY_EVENT,
            Box::new(move |e: &RegistryEvent| sink.lock().unwrap().push(e.clone())),
        );
        seen
    }

    /// A and B visible, C force-hidden.
    fn abc(scene: &mut SimScene) -> HotSpotRegistry {
        let mut reg = HotSpotRegistry::new(vec![def("A", 1, false), def("B", 2, false), def("C", 3, false)]);
        reg.activate(scene);
        reg.hide(scene, "C").unwrap();
        reg
    }

    #[test]
    fn isolate_empty_shows_all_non_hidden() {
        let mut scene = SimScene::new();
        let mut reg = abc(&mut scene);
        reg.isolate(&mut scene, "B");
        scene.take_calls();

        reg.isolate(&mut scene, IdSet::all());

        for id in ["A", "B"] {
            let h = reg.get(id).unwrap();
            assert!(h.is_visible(), "{id} visible");
            assert!(!h.skip_occlusion(), "{id} not skipped");
        }
        let c = reg.get("C").unwrap();
        assert!(c.hidden());
        assert!(!c.is_visible());
        let c_handle = c.handle().unwrap();
        assert!(
            scene.calls().iter().all(|call| !matches!(
                call,
                SceneCall::SetVisible(h, _) | SceneCall::SkipOcclusion(h, _) if *h == c_handle
            )),
            "hidden hotspot must not be touched"
        );
    }

    #[test]
    fn isolate_single_id_skips_the_rest() {
        let mut scene = SimScene::new();
        let mut reg = abc(&mut scene);

        reg.isolate(&mut scene, "A");

        let a = reg.get("A").unwrap();
        assert!(a.is_visible());
        assert!(!a.skip_occlusion());
        let b = reg.get("B").unwrap();
        assert!(!b.is_visible());
        assert!(b.skip_occlusion());
        let c = reg.get("C").unwrap();
        assert!(!c.skip_occlusion(), "hidden hotspot untouched");
    }

    #[test]
    fn isolate_accepts_absent_single_and_many() {
        assert_eq!(IdSet::from(None::<&str>), IdSet::all());
        assert!(IdSet::from("A").admits("A"));
        assert!(!IdSet::from("A").admits("B"));
        let many = IdSet::from(["A", "B"]);
        assert!(many.admits("B") && !many.admits("C"));
        let owned = IdSet::from(vec!["X".to_string()]);
        assert!(owned.admits("X"));
        assert!(IdSet::all().admits("anything"));
    }

    #[test]
    fn isolate_emits_visible_only_for_changes() {
        let mut scene = SimScene::new();
        let mut reg = abc(&mut scene);
        let seen = capture(&mut reg);

        reg.isolate(&mut scene, "A");
        reg.isolate(&mut scene, "A");

        assert_eq!(
            *seen.lock().unwrap(),
            vec![RegistryEvent::Visible { id: "B".into(), visible: false }]
        );
    }

    #[test]
    fn activate_hides_controlled_and_emits_created() {
        let mut scene = SimScene::new();
        let mut reg = HotSpotRegistry::new(vec![def("static", 1, false), def("sensor", 2, true)]);
        let seen = capture(&mut reg);

        let report = reg.activate(&mut scene);

        assert_eq!(report.created, vec!["static", "sensor"]);
        assert_eq!(report.controlled, vec!["sensor"]);
        let sensor = reg.get("sensor").unwrap();
        assert!(sensor.hidden());
        assert!(!sensor.is_visible());
        assert!(reg.get("static").unwrap().is_visible());

        let created: Vec<_> = seen
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, RegistryEvent::Created { .. }))
            .map(|e| e.hotspot_id().to_string())
            .collect();
        assert_eq!(created, vec!["static", "sensor"]);
    }

    #[test]
    fn activate_skips_unresolvable_anchor_but_keeps_others() {
        let mut scene = SimScene::new().with_missing_object(2);
        let mut reg = HotSpotRegistry::new(vec![def("A", 1, false), def("B", 2, false), def("C", 3, false)]);

        let report = reg.activate(&mut scene);

        assert_eq!(report.created, vec!["A", "C"]);
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(&report.skipped[0], SpotError::UnresolvableAnchor { id, .. } if id == "B"));
        assert_eq!(reg.len(), 2);
        assert!(reg.get("B").is_none());
    }

    #[test]
    fn activate_skips_malformed_colors_like_a_bad_anchor() {
        let mut scene = SimScene::new();
        let mut door = def("door", 2, false);
        door.data.stroke_color = "red".into();
        door.data.fill_color = "blue".into();
        let mut reg = HotSpotRegistry::new(vec![def("A", 1, false), door]);

        let report = reg.activate(&mut scene);

        assert_eq!(report.created, vec!["A"]);
        assert!(matches!(&report.skipped[..], [SpotError::InvalidStyle { id, .. }] if id == "door"));
        assert!(reg.get("door").is_none());
        assert_eq!(scene.marker_count(), 1);
    }

    #[test]
    fn activate_twice_is_a_noop() {
        let mut scene = SimScene::new();
        let mut reg = HotSpotRegistry::new(vec![def("A", 1, false)]);
        reg.activate(&mut scene);
        let second = reg.activate(&mut scene);
        assert!(second.created.is_empty());
        assert_eq!(reg.len(), 1);
        assert_eq!(scene.marker_count(), 1);
    }

    #[test]
    fn deactivate_removes_everything_and_is_safe_when_inactive() {
        let mut scene = SimScene::new();
        let mut reg = HotSpotRegistry::new(vec![def("A", 1, false), def("B", 2, true)]);

        assert_eq!(reg.deactivate(&mut scene), 0, "not active yet");

        reg.activate(&mut scene);
        assert_eq!(reg.deactivate(&mut scene), 2);
        assert!(reg.is_empty());
        assert!(!reg.is_active());
        assert_eq!(scene.marker_count(), 0);

        assert_eq!(reg.deactivate(&mut scene), 0);

        // A fresh activation recreates the set.
        reg.activate(&mut scene);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn scene_click_routes_by_handle() {
        let mut scene = SimScene::new();
        let mut reg = HotSpotRegistry::new(vec![def("A", 1, false), def("B", 2, false)]);
        reg.activate(&mut scene);
        let seen = capture(&mut reg);

        let handle = reg.get("B").unwrap().handle().unwrap();
        assert_eq!(reg.scene_click(handle).as_deref(), Some("B"));
        assert_eq!(reg.scene_click(SceneHandle(999)), None);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![RegistryEvent::Clicked { id: "B".into() }]
        );
    }

    #[test]
    fn scene_modified_emits_updated() {
        let mut scene = SimScene::new();
        let mut reg = HotSpotRegistry::new(vec![def("A", 1, false)]);
        reg.activate(&mut scene);
        let seen = capture(&mut reg);

        let handle = reg.get("A").unwrap().handle().unwrap();
        let moved = AnchorSpec(json!({"dbId": 5}));
        assert_eq!(reg.scene_modified(&scene, handle, moved.clone()).as_deref(), Some("A"));
        assert_eq!(reg.get("A").unwrap().anchor(), &moved);
        assert_eq!(reg.get("A").unwrap().data().viewer_state, Some(scene.save_view_state()));
        assert_eq!(reg.scene_modified(&scene, SceneHandle(999), moved), None);
        assert_eq!(seen.lock().unwrap().first().map(NamedEvent::name), Some("hotspot.updated"));
    }

    #[test]
    fn operations_on_unknown_ids_fail() {
        let mut scene = SimScene::new();
        let mut reg = HotSpotRegistry::new(vec![]);
        reg.activate(&mut scene);
        assert!(matches!(reg.hide(&mut scene, "ghost"), Err(SpotError::UnknownHotSpot(_))));
        assert!(matches!(reg.show(&mut scene, "ghost"), Err(SpotError::UnknownHotSpot(_))));
        let style = HotSpotStyle::new("#FF0000", "#FF8888");
        assert!(reg.set_style(&mut scene, "ghost", &style).is_err());
    }
}
