//! The scene-engine capability surface.
//!
//! Rendering, camera control, occlusion and object-id resolution belong to
//! the host's 3D engine.  The hotspot core only ever reaches it through this
//! trait; [`SimScene`][crate::sim::SimScene] is the in-process stand-in used
//! by tests and the headless CLI.

use spotlight_types::{AnchorSpec, HotSpotStyle, SceneHandle, SpotError, ViewState};

/// Everything the hotspot core asks of a 3D scene.
pub trait SceneEngine: Send {
    /// Bind a marker to `anchor` and return its handle.
    ///
    /// # Errors
    ///
    /// Returns [`SpotError::Scene`] when the anchor does not resolve to
    /// anything in the loaded model.
    fn resolve_anchor(&mut self, anchor: &AnchorSpec) -> Result<SceneHandle, SpotError>;

    /// Capture the current camera/view.
    fn save_view_state(&self) -> ViewState;

    /// Restore a view previously produced by [`save_view_state`][Self::save_view_state].
    fn restore_view_state(&mut self, state: &ViewState);

    /// Restrict rendering to the given object ids.  `None` (or an empty
    /// slice) shows every object.
    fn isolate(&mut self, ids: Option<&[u32]>);

    /// Fit the camera to the visible geometry.
    fn fit_view(&mut self);

    /// Show or hide a marker.  Returns `true` when the rendered visibility
    /// actually changed after the engine's occlusion check.
    fn set_visible(&mut self, handle: SceneHandle, visible: bool) -> bool;

    /// Exempt a marker from occlusion culling (or restore culling).
    fn set_skip_occlusion(&mut self, handle: SceneHandle, skip: bool);

    /// Recolor a marker.
    fn set_style(&mut self, handle: SceneHandle, style: &HotSpotStyle);

    /// Detach a marker and release its binding.
    fn remove(&mut self, handle: SceneHandle);
}
