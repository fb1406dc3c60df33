//! Shared types for the Spotlight hotspot workspace.
//!
//! - [`color`] – hex color parsing, [`HotSpotStyle`] and the alert palette.
//! - [`records`] – hotspot payloads, telemetry readings, UI snapshots and
//!   viewer commands.
//! - [`Event`] / [`EventPayload`] – the envelope routed over the event bus.
//! - [`SpotError`] – the workspace-wide error type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod color;
pub mod records;

pub use color::{AlertPalette, Color, HotSpotStyle, Swatch};
pub use records::{
    AnchorSpec, FocusSnapshot, HotSpotData, HotSpotDefinition, HotSpotEntry, SceneHandle,
    TelemetryReading, ViewState, ViewerCommand,
};

/// Unified event wrapper for the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"spotlight-middleware::sim_telemetry"`
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Stamp `payload` with a fresh id and the current time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data routed over the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    Telemetry(TelemetryReading),
    Command(ViewerCommand),
    Snapshot(FocusSnapshot),
    /// Registry lifecycle notice (`hotspot.created`, `hotspot.clicked`, ...).
    HotSpot { event: String, hotspot_id: String },
    Fault { component: String, message: String },
}

/// Errors spanning color computation, scene binding and transport.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpotError {
    #[error("Bad Hex Number: {0}")]
    BadColor(String),

    #[error("Hotspot {id} has a malformed style: {details}")]
    InvalidStyle { id: String, details: String },

    #[error("Anchor for hotspot {id} cannot be resolved: {details}")]
    UnresolvableAnchor { id: String, details: String },

    #[error("Unknown hotspot: {0}")]
    UnknownHotSpot(String),

    #[error("No extension registered under id: {0}")]
    UnknownExtension(String),

    #[error("Scene engine error: {0}")]
    Scene(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
