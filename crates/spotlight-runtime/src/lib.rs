//! `spotlight-runtime` – runs a hotspot extension.
//!
//! # Modules
//!
//! - [`extensions`] – [`ExtensionRegistry`][extensions::ExtensionRegistry]:
//!   host-owned map of extension ids to factories, and the
//!   [`ViewerExtension`][extensions::ViewerExtension] surface the loop drives.
//! - [`event_loop`] – [`EventLoop`][event_loop::EventLoop]: the single Tokio
//!   task multiplexing telemetry, commands and timer expiries, publishing UI
//!   snapshots and registry events back to the bus.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with an optional OTLP span exporter.

pub mod event_loop;
pub mod extensions;
pub mod telemetry;

pub use event_loop::{BusSink, EventLoop};
pub use extensions::{ExtensionContext, ExtensionFactory, ExtensionRegistry, ViewerExtension};
pub use telemetry::{TracerProviderGuard, init_tracing};
