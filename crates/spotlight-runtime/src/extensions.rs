//! [`ExtensionRegistry`] – extension id to factory.
//!
//! The host owns the registry and hands it to whoever loads extensions; there
//! is no process-wide lookup table.  A factory receives the runtime-provided
//! pieces (timers wired to the event loop, a snapshot sink wired to the bus)
//! and picks its own scene engine.

use std::collections::HashMap;

use spotlight_kernel::{
    AlertOutcome, ExtensionOptions, HotspotExtension, SnapshotSink, TimerFired, TimerScheduler,
    TokioTimers,
};
use spotlight_middleware::emitter::{Emitter, Listener, ListenerId};
use spotlight_scene::{RegistryEvent, SceneEngine};
use spotlight_types::{FocusSnapshot, SpotError, TelemetryReading, ViewerCommand};
use tracing::info;

/// What the event loop needs from a loaded extension.
pub trait ViewerExtension: Send {
    fn command(&mut self, command: ViewerCommand);

    fn on_reading(&mut self, reading: &TelemetryReading) -> AlertOutcome;

    fn on_timer(&mut self, fired: &TimerFired) -> bool;

    fn state(&self) -> &FocusSnapshot;

    fn is_active(&self) -> bool;

    /// Observe registry lifecycle events (`hotspot.*`).
    fn observe(&mut self, name: &'static str, listener: Listener<RegistryEvent>) -> ListenerId;
}

impl<S: SceneEngine, T: TimerScheduler> ViewerExtension for HotspotExtension<S, T> {
    fn command(&mut self, command: ViewerCommand) {
        HotspotExtension::command(self, command);
    }

    fn on_reading(&mut self, reading: &TelemetryReading) -> AlertOutcome {
        HotspotExtension::on_reading(self, reading)
    }

    fn on_timer(&mut self, fired: &TimerFired) -> bool {
        HotspotExtension::on_timer(self, fired)
    }

    fn state(&self) -> &FocusSnapshot {
        HotspotExtension::state(self)
    }

    fn is_active(&self) -> bool {
        HotspotExtension::is_active(self)
    }

    fn observe(&mut self, name: &'static str, listener: Listener<RegistryEvent>) -> ListenerId {
        self.on(name, listener)
    }
}

/// Runtime-provided construction inputs.
pub struct ExtensionContext {
    pub timers: TokioTimers,
    pub sink: Box<dyn SnapshotSink>,
    pub options: ExtensionOptions,
}

pub type ExtensionFactory =
    Box<dyn Fn(ExtensionContext) -> Result<Box<dyn ViewerExtension>, SpotError> + Send + Sync>;

/// Extension id → factory.
#[derive(Default)]
pub struct ExtensionRegistry {
    factories: HashMap<String, ExtensionFactory>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `id`, replacing any previous one.
    pub fn register(&mut self, id: impl Into<String>, factory: ExtensionFactory) {
        let id = id.into();
        info!(extension = %id, "extension registered");
        self.factories.insert(id, factory);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Build the extension registered under `id`.
    ///
    /// # Errors
    ///
    /// [`SpotError::UnknownExtension`] when nothing is registered under `id`,
    /// or whatever the factory returns.
    pub fn create(
        &self,
        id: &str,
        context: ExtensionContext,
    ) -> Result<Box<dyn ViewerExtension>, SpotError> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| SpotError::UnknownExtension(id.to_string()))?;
        factory(context)
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotlight_kernel::RecordingSink;
    use spotlight_scene::sim::SimScene;

    fn sim_factory() -> ExtensionFactory {
        Box::new(|cx: ExtensionContext| {
            let ext = HotspotExtension::new(SimScene::new(), cx.timers, cx.sink, cx.options);
            Ok(Box::new(ext) as Box<dyn ViewerExtension>)
        })
    }

    fn context() -> ExtensionContext {
        let (timers, _rx) = TokioTimers::new();
        ExtensionContext {
            timers,
            sink: Box::new(RecordingSink::new()),
            options: ExtensionOptions::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn create_builds_registered_extension() {
        let mut registry = ExtensionRegistry::new();
        registry.register("spotlight.hotspots", sim_factory());
        assert!(registry.contains("spotlight.hotspots"));

        let mut ext = registry.create("spotlight.hotspots", context()).unwrap();
        assert!(!ext.is_active());
        ext.command(ViewerCommand::Toggle);
        assert!(ext.is_active());
    }

    #[tokio::test]
    async fn unknown_id_is_an_error() {
        let registry = ExtensionRegistry::new();
        let err = registry.create("nope", context()).err().unwrap();
        assert_eq!(err, SpotError::UnknownExtension("nope".into()));
    }

    #[test]
    fn registries_are_independent() {
        let mut a = ExtensionRegistry::new();
        let b = ExtensionRegistry::new();
        a.register("x", sim_factory());
        a.register("w", sim_factory());
        assert_eq!(a.ids(), vec!["w", "x"]);
        assert!(b.ids().is_empty());
    }
}
