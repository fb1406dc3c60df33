//! In-process scene engine for headless runs and tests.
//!
//! [`SimScene`] keeps a table of markers, the current isolation set and a
//! view-state counter, and records every call it receives as a
//! [`SceneCall`] so tests can assert on the exact command sequence the core
//! produced.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use spotlight_scene::{SceneEngine, sim::SimScene};
//! use spotlight_types::AnchorSpec;
//!
//! let mut scene = SimScene::new().with_missing_object(99);
//! assert!(scene.resolve_anchor(&AnchorSpec(json!({"dbId": 1}))).is_ok());
//! assert!(scene.resolve_anchor(&AnchorSpec(json!({"dbId": 99}))).is_err());
//! ```

use std::collections::{BTreeMap, HashSet};

use serde_json::json;
use spotlight_types::{AnchorSpec, HotSpotStyle, SceneHandle, SpotError, ViewState};

use crate::engine::SceneEngine;

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneCall {
    Resolve(SceneHandle),
    SaveView,
    RestoreView(ViewState),
    Isolate(Option<Vec<u32>>),
    FitView,
    SetVisible(SceneHandle, bool),
    SkipOcclusion(SceneHandle, bool),
    Style(SceneHandle, HotSpotStyle),
    Remove(SceneHandle),
}

/// State of one simulated marker.
#[derive(Debug, Clone, PartialEq)]
pub struct SimMarker {
    pub anchor: AnchorSpec,
    pub visible: bool,
    pub skip_occlusion: bool,
    pub style: Option<HotSpotStyle>,
}

/// Recording scene engine.
#[derive(Debug, Default)]
pub struct SimScene {
    next_handle: u64,
    markers: BTreeMap<SceneHandle, SimMarker>,
    missing_objects: HashSet<i64>,
    isolated: Option<Vec<u32>>,
    view_counter: u64,
    view: Option<ViewState>,
    calls: Vec<SceneCall>,
}

impl SimScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchors whose `dbId` equals `db_id` will fail to resolve.
    pub fn with_missing_object(mut self, db_id: i64) -> Self {
        self.missing_objects.insert(db_id);
        self
    }

    pub fn calls(&self) -> &[SceneCall] {
        &self.calls
    }

    /// Drain the recorded calls.
    pub fn take_calls(&mut self) -> Vec<SceneCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn marker(&self, handle: SceneHandle) -> Option<&SimMarker> {
        self.markers.get(&handle)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Current object isolation; `None` means everything is shown.
    pub fn isolated(&self) -> Option<&[u32]> {
        self.isolated.as_deref()
    }

    /// Last restored view, if any.
    pub fn current_view(&self) -> Option<&ViewState> {
        self.view.as_ref()
    }
}

impl SceneEngine for SimScene {
    fn resolve_anchor(&mut self, anchor: &AnchorSpec) -> Result<SceneHandle, SpotError> {
        let Some(obj) = anchor.0.as_object() else {
            return Err(SpotError::Scene(format!("anchor is not an object: {}", anchor.0)));
        };
        if let Some(db_id) = obj.get("dbId").and_then(|v| v.as_i64())
            && self.missing_objects.contains(&db_id)
        {
            return Err(SpotError::Scene(format!("dbId {db_id} is not in the model")));
        }

        self.next_handle += 1;
        let handle = SceneHandle(self.next_handle);
        self.markers.insert(
            handle,
            SimMarker {
                anchor: anchor.clone(),
                visible: true,
                skip_occlusion: false,
                style: None,
            },
        );
        self.calls.push(SceneCall::Resolve(handle));
        Ok(handle)
    }

    fn save_view_state(&self) -> ViewState {
        ViewState(json!({ "viewport": self.view_counter }))
    }

    fn restore_view_state(&mut self, state: &ViewState) {
        self.view_counter += 1;
        self.view = Some(state.clone());
        self.calls.push(SceneCall::RestoreView(state.clone()));
    }

    fn isolate(&mut self, ids: Option<&[u32]>) {
        let normalized = ids.filter(|ids| !ids.is_empty()).map(<[u32]>::to_vec);
        self.isolated = normalized.clone();
        self.calls.push(SceneCall::Isolate(normalized));
    }

    fn fit_view(&mut self) {
        self.calls.push(SceneCall::FitView);
    }

    fn set_visible(&mut self, handle: SceneHandle, visible: bool) -> bool {
        self.calls.push(SceneCall::SetVisible(handle, visible));
        match self.markers.get_mut(&handle) {
            Some(marker) if marker.visible != visible => {
                marker.visible = visible;
                true
            }
            _ => false,
        }
    }

    fn set_skip_occlusion(&mut self, handle: SceneHandle, skip: bool) {
        self.calls.push(SceneCall::SkipOcclusion(handle, skip));
        if let Some(marker) = self.markers.get_mut(&handle) {
            marker.skip_occlusion = skip;
        }
    }

    fn set_style(&mut self, handle: SceneHandle, style: &HotSpotStyle) {
        self.calls.push(SceneCall::Style(handle, style.clone()));
        if let Some(marker) = self.markers.get_mut(&handle) {
            marker.style = Some(style.clone());
        }
    }

    fn remove(&mut self, handle: SceneHandle) {
        self.calls.push(SceneCall::Remove(handle));
        self.markers.remove(&handle);
    }
}
