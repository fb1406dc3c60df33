//! [`FocusBridge`] – selection to scene focus.
//!
//! Focusing a hotspot restores its saved view, isolates its scene objects,
//! isolates the hotspot itself in the registry and marks it active in the UI
//! state.  Defocusing undoes all of that and fits the view.

use spotlight_scene::IdSet;
use spotlight_types::HotSpotData;
use tracing::{debug, warn};

use crate::Surfaces;
use crate::state::StateEvent;

/// Result of a focus request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusChange {
    Focused(String),
    Defocused(String),
    /// The id is not in the published hotspot list.
    Ignored,
}

/// Applies focus changes across the scene, the registry and the UI store.
pub struct FocusBridge<'a> {
    cx: Surfaces<'a>,
}

impl<'a> FocusBridge<'a> {
    pub fn new(cx: Surfaces<'a>) -> Self {
        Self { cx }
    }

    /// UI list click: toggles focus on `id`.
    pub fn focus(mut self, id: &str) -> FocusChange {
        if self.cx.store.state().active_id() == Some(id) {
            self.defocus();
            return FocusChange::Defocused(id.to_string());
        }
        self.focus_listed(id)
    }

    /// Scene marker click: always focuses, never toggles.
    pub fn focus_hotspot(self, id: &str) -> FocusChange {
        self.focus_listed(id)
    }

    /// Scene "show all objects": clear every isolation and fit the view.
    /// The focus state is left as is.
    pub fn show_all(self) {
        let Surfaces {
            scene, registry, ..
        } = self.cx;
        scene.isolate(None);
        registry.isolate(&mut *scene, IdSet::all());
        scene.fit_view();
        debug!("show all objects");
    }

    fn focus_listed(self, id: &str) -> FocusChange {
        let Some(entry) = self.cx.store.state().entry(id) else {
            warn!(hotspot = %id, "focus on unlisted hotspot ignored");
            return FocusChange::Ignored;
        };
        let data: HotSpotData = entry.data.clone();

        let Surfaces {
            scene,
            registry,
            store,
        } = self.cx;
        if let Some(view) = &data.viewer_state {
            scene.restore_view_state(view);
        }
        scene.isolate(Some(data.isolate_ids.as_slice()));
        registry.isolate(&mut *scene, id);
        store.dispatch(StateEvent::Focused { data });
        debug!(hotspot = %id, "focused");
        FocusChange::Focused(id.to_string())
    }

    fn defocus(&mut self) {
        self.cx.store.dispatch(StateEvent::Defocused);
        self.cx.scene.isolate(None);
        self.cx.registry.isolate(&mut *self.cx.scene, IdSet::all());
        self.cx.scene.fit_view();
        debug!("defocused");
    }
}
