//! Telemetry transport adapters.
//!
//! The core never talks to a sensor transport directly.  An adapter turns
//! whatever the transport delivers into a stream of [`TelemetryReading`]s and
//! [`forward_to_bus`] pumps that stream onto [`Topic::Telemetry`], where the
//! runtime picks it up.
//!
//! - [`SimTelemetryAdapter`][crate::sim_telemetry::SimTelemetryAdapter] –
//!   scripted temperatures for demos and headless tests.
//! - [`WsTelemetryAdapter`][crate::ws_telemetry::WsTelemetryAdapter] – a
//!   WebSocket client for a live `sensor.temperature` feed.

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use spotlight_types::{Event, EventPayload, SpotError, TelemetryReading};
use tracing::{debug, info};

use crate::bus::{EventBus, Topic};

/// Every telemetry transport implements this trait.
#[async_trait]
pub trait TelemetryAdapter: Send + Sync {
    /// Short label used as the bus event source, e.g. `"sim_telemetry"`.
    fn name(&self) -> &str;

    /// Open the transport and return the live stream of readings.  The stream
    /// ends when the transport closes.
    ///
    /// # Errors
    ///
    /// Returns [`SpotError::Channel`] when the transport cannot be opened.
    async fn readings(&self) -> Result<BoxStream<'static, TelemetryReading>, SpotError>;
}

/// Publish every reading of `adapter` onto [`Topic::Telemetry`] until the
/// stream ends.  Returns the number of readings forwarded.
pub async fn forward_to_bus(
    adapter: &dyn TelemetryAdapter,
    bus: &EventBus,
) -> Result<usize, SpotError> {
    let mut stream = adapter.readings().await?;
    let source = format!("spotlight-middleware::{}", adapter.name());
    info!(adapter = adapter.name(), "telemetry stream opened");

    let mut forwarded = 0;
    while let Some(reading) = stream.next().await {
        let receivers = bus.publish_to(
            Topic::Telemetry,
            Event::new(source.clone(), EventPayload::Telemetry(reading)),
        );
        debug!(receivers, "telemetry reading forwarded");
        forwarded += 1;
    }

    info!(adapter = adapter.name(), forwarded, "telemetry stream closed");
    Ok(forwarded)
}
