//! `spotlight-middleware` – event routing.
//!
//! Moves data between the telemetry transport, the hotspot core and the UI
//! without caring what it means.
//!
//! # Modules
//!
//! - [`bus`] – topic-based publish/subscribe event bus built on Tokio
//!   broadcast channels.
//! - [`emitter`] – the synchronous [`Emitter`] capability components use to
//!   expose lifecycle events to local observers.
//! - [`adapter`] – the [`TelemetryAdapter`] trait and the bus pump.
//! - [`sim_telemetry`] – scripted telemetry for demos and tests.
//! - [`ws_telemetry`] – WebSocket client for a live sensor feed.

pub mod adapter;
pub mod bus;
pub mod emitter;
pub mod sim_telemetry;
pub mod ws_telemetry;

pub use adapter::{TelemetryAdapter, forward_to_bus};
pub use bus::{EventBus, Topic, TopicReceiver};
pub use emitter::{ANY_EVENT, Emitter, EventHub, Listener, ListenerId, NamedEvent};
pub use sim_telemetry::SimTelemetryAdapter;
pub use ws_telemetry::WsTelemetryAdapter;
