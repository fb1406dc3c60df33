//! [`EventLoop`] – the single task that drives an extension.
//!
//! Three sources are multiplexed with `tokio::select!`: telemetry readings
//! from [`Topic::Telemetry`], viewer commands from [`Topic::Commands`] and
//! timer expiries from the extension's [`TokioTimers`].  Every handler runs to
//! completion before the next input is taken, so the extension never sees
//! two inputs at once.
//!
//! Output leaves the loop on the bus: every UI snapshot on
//! [`Topic::UiState`] and every registry event on [`Topic::HotSpotEvents`].

use std::future::Future;

use spotlight_kernel::{ExtensionOptions, SnapshotSink, TimerFired, TokioTimers};
use spotlight_middleware::emitter::{ANY_EVENT, NamedEvent};
use spotlight_middleware::{EventBus, Topic, TopicReceiver};
use spotlight_scene::RegistryEvent;
use spotlight_types::{Event, EventPayload, FocusSnapshot, SpotError};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use crate::extensions::{ExtensionContext, ExtensionRegistry, ViewerExtension};

const SOURCE: &str = "spotlight-runtime";

// ─────────────────────────────────────────────────────────────────────────────
// BusSink
// ─────────────────────────────────────────────────────────────────────────────

/// Publishes every snapshot to [`Topic::UiState`].
#[derive(Debug, Clone)]
pub struct BusSink {
    bus: EventBus,
}

impl BusSink {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl SnapshotSink for BusSink {
    fn publish(&mut self, snapshot: &FocusSnapshot) {
        let event = Event::new(SOURCE, EventPayload::Snapshot(snapshot.clone()));
        self.bus.publish_to(Topic::UiState, event);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventLoop
// ─────────────────────────────────────────────────────────────────────────────

pub struct EventLoop {
    extension: Box<dyn ViewerExtension>,
    bus: EventBus,
    telemetry: TopicReceiver,
    commands: TopicReceiver,
    timers: mpsc::UnboundedReceiver<TimerFired>,
}

impl EventLoop {
    /// Create extension `id` from `registry`, wired to `bus`.
    ///
    /// Must be called inside a Tokio runtime (timers spawn sleeper tasks).
    ///
    /// # Errors
    ///
    /// Propagates [`ExtensionRegistry::create`] failures.
    pub fn launch(
        registry: &ExtensionRegistry,
        id: &str,
        options: ExtensionOptions,
        bus: EventBus,
    ) -> Result<Self, SpotError> {
        let (timers, timer_rx) = TokioTimers::new();
        let context = ExtensionContext {
            timers,
            sink: Box::new(BusSink::new(bus.clone())),
            options,
        };
        let mut extension = registry.create(id, context)?;

        let forward = bus.clone();
        extension.observe(
            ANY_EVENT,
            Box::new(move |e: &RegistryEvent| {
                let payload = EventPayload::HotSpot {
                    event: e.name().to_string(),
                    hotspot_id: e.hotspot_id().to_string(),
                };
                forward.publish_to(Topic::HotSpotEvents, Event::new(SOURCE, payload));
            }),
        );
        info!(extension = %id, "extension loaded");

        Ok(Self::new(extension, bus, timer_rx))
    }

    /// Wire an already-built extension.  `timers` must be the receiving end of
    /// the extension's timer channel.
    pub fn new(
        extension: Box<dyn ViewerExtension>,
        bus: EventBus,
        timers: mpsc::UnboundedReceiver<TimerFired>,
    ) -> Self {
        let telemetry = bus.subscribe_to(Topic::Telemetry);
        let commands = bus.subscribe_to(Topic::Commands);
        Self {
            extension,
            bus,
            telemetry,
            commands,
            timers,
        }
    }

    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    pub fn extension(&self) -> &dyn ViewerExtension {
        self.extension.as_ref()
    }

    /// Apply one bus event.  Payloads other than telemetry and commands are
    /// ignored.
    pub fn handle_event(&mut self, event: Event) {
        match event.payload {
            EventPayload::Telemetry(reading) => {
                let outcome = self.extension.on_reading(&reading);
                debug!(source = %event.source, ?outcome, "reading handled");
            }
            EventPayload::Command(command) => self.extension.command(command),
            other => debug!(?other, "unexpected payload ignored"),
        }
    }

    pub fn handle_timer(&mut self, fired: TimerFired) {
        self.extension.on_timer(&fired);
    }

    /// Run until `shutdown` resolves or the bus closes.  Returns the
    /// extension so callers can inspect its final state.
    #[instrument(skip_all)]
    pub async fn run_until<F>(mut self, shutdown: F) -> Box<dyn ViewerExtension>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("event loop started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                event = self.telemetry.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                event = self.commands.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                Some(fired) = self.timers.recv() => self.handle_timer(fired),
            }
        }
        info!("event loop stopped");
        self.extension
    }
}
