//! [`HotSpot`] – a single scene-anchored marker.
//!
//! A hotspot owns its marker binding and its visibility flags; it has no
//! timers and no network access.  Every scene operation takes the engine as
//! an argument so ownership of the engine stays with the caller.
//!
//! Two flags govern what is rendered:
//!
//! * `hidden` – operator-level force-hide.  Set by [`HotSpot::hide`], cleared
//!   by [`HotSpot::show`].  Isolation never touches a hidden hotspot.
//! * `skip_occlusion` – derived by isolation; alert logic never sets it.

use spotlight_middleware::emitter::{Emitter, EventHub, Listener, ListenerId, NamedEvent};
use spotlight_types::{
    AnchorSpec, HotSpotData, HotSpotDefinition, HotSpotStyle, SceneHandle, SpotError, ViewState,
};
use tracing::debug;

use crate::engine::SceneEngine;

/// Events emitted by a single hotspot.
#[derive(Debug, Clone, PartialEq)]
pub enum HotSpotEvent {
    /// The user clicked the marker.
    Click { id: String },
    /// The user dragged or edited the marker.
    Modified { id: String, anchor: AnchorSpec },
    /// Rendered visibility changed.
    Visible { id: String, visible: bool },
}

impl NamedEvent for HotSpotEvent {
    fn name(&self) -> &'static str {
        match self {
            HotSpotEvent::Click { .. } => "click",
            HotSpotEvent::Modified { .. } => "modified",
            HotSpotEvent::Visible { .. } => "visible",
        }
    }
}

/// A marker bound to the scene.
#[derive(Debug)]
pub struct HotSpot {
    handle: Option<SceneHandle>,
    anchor: AnchorSpec,
    data: HotSpotData,
    hidden: bool,
    visible: bool,
    skip_occlusion: bool,
    hub: EventHub<HotSpotEvent>,
}

impl HotSpot {
    /// Resolve `definition.anchor` and bind a new, visible marker to it.
    ///
    /// # Errors
    ///
    /// Returns [`SpotError::InvalidStyle`] when either style color is malformed,
    /// and [`SpotError::UnresolvableAnchor`] when the engine rejects the
    /// anchor.  Nothing is bound in the scene on error.
    pub fn create(
        scene: &mut dyn SceneEngine,
        definition: HotSpotDefinition,
    ) -> Result<Self, SpotError> {
        let HotSpotDefinition { anchor, data } = definition;
        data.style()
            .validate()
            .map_err(|e| SpotError::InvalidStyle {
                id: data.id.clone(),
                details: e.to_string(),
            })?;
        let handle = scene
            .resolve_anchor(&anchor)
            .map_err(|e| SpotError::UnresolvableAnchor {
                id: data.id.clone(),
                details: e.to_string(),
            })?;

        Ok(Self {
            handle: Some(handle),
            anchor,
            data,
            hidden: false,
            visible: true,
            skip_occlusion: false,
            hub: EventHub::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }

    /// `None` once the hotspot has been removed.
    pub fn handle(&self) -> Option<SceneHandle> {
        self.handle
    }

    pub fn anchor(&self) -> &AnchorSpec {
        &self.anchor
    }

    pub fn data(&self) -> &HotSpotData {
        &self.data
    }

    pub fn controlled(&self) -> bool {
        self.data.controlled
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn skip_occlusion(&self) -> bool {
        self.skip_occlusion
    }

    pub fn is_removed(&self) -> bool {
        self.handle.is_none()
    }

    pub fn style(&self) -> HotSpotStyle {
        self.data.style()
    }

    /// Toggle rendering without touching `hidden`.  Returns `true` when the
    /// rendered visibility actually changed; a `visible` event is emitted in
    /// that case.
    pub fn set_visible(&mut self, scene: &mut dyn SceneEngine, visible: bool) -> bool {
        let Some(handle) = self.handle else {
            return false;
        };
        let changed = scene.set_visible(handle, visible);
        self.visible = visible;
        if changed {
            let event = HotSpotEvent::Visible {
                id: self.data.id.clone(),
                visible,
            };
            self.hub.emit(&event);
        }
        changed
    }

    pub fn set_skip_occlusion(&mut self, scene: &mut dyn SceneEngine, skip: bool) {
        self.skip_occlusion = skip;
        if let Some(handle) = self.handle {
            scene.set_skip_occlusion(handle, skip);
        }
    }

    /// Force-hide: mark `hidden` and stop rendering.
    pub fn hide(&mut self, scene: &mut dyn SceneEngine) -> bool {
        self.hidden = true;
        self.set_visible(scene, false)
    }

    /// Clear `hidden` and render the marker.
    pub fn show(&mut self, scene: &mut dyn SceneEngine) -> bool {
        self.hidden = false;
        self.set_visible(scene, true)
    }

    /// Update the payload colors and recolor the marker.
    pub fn set_style(&mut self, scene: &mut dyn SceneEngine, style: &HotSpotStyle) {
        self.data.set_style(style);
        if let Some(handle) = self.handle {
            scene.set_style(handle, style);
        }
    }

    /// Record a user click on the marker.
    pub fn click(&mut self) {
        let event = HotSpotEvent::Click {
            id: self.data.id.clone(),
        };
        self.hub.emit(&event);
    }

    /// Record a user edit that moved the marker to `anchor`.  `view` becomes
    /// the camera restored when the hotspot is next focused.
    pub fn modified(&mut self, anchor: AnchorSpec, view: ViewState) {
        self.anchor = anchor.clone();
        self.data.viewer_state = Some(view);
        let event = HotSpotEvent::Modified {
            id: self.data.id.clone(),
            anchor,
        };
        self.hub.emit(&event);
    }

    /// Detach from the scene.  Idempotent: returns `false` when the marker
    /// was already removed.
    pub fn remove(&mut self, scene: &mut dyn SceneEngine) -> bool {
        match self.handle.take() {
            Some(handle) => {
                scene.remove(handle);
                self.visible = false;
                debug!(hotspot = %self.data.id, "marker removed");
                true
            }
            None => false,
        }
    }
}

impl Emitter<HotSpotEvent> for HotSpot {
    fn on(&mut self, name: &'static str, listener: Listener<HotSpotEvent>) -> ListenerId {
        self.hub.on(name, listener)
    }

    fn off(&mut self, id: ListenerId) -> bool {
        self.hub.off(id)
    }

    fn emit(&mut self, event: &HotSpotEvent) -> usize {
        self.hub.emit(event)
    }
}
