//! WebSocket telemetry client.
//!
//! [`WsTelemetryAdapter`] connects to a sensor gateway and turns its text
//! frames into [`TelemetryReading`]s.  Two frame shapes are accepted:
//!
//! * an envelope naming the channel:
//!   `{"event":"sensor.temperature","data":{"targetId":..,"objectTemperature":..,"threshold":..}}`
//! * a bare reading object.
//!
//! Frames for other channels, binary frames and malformed JSON are dropped.
//! The feed is uncontrolled input, so nothing here is treated as an error
//! once the connection is up.

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde_json::Value;
use spotlight_types::{SpotError, TelemetryReading};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

use crate::adapter::TelemetryAdapter;

/// Channel name carried by temperature frames.
pub const TEMPERATURE_CHANNEL: &str = "sensor.temperature";

/// Maximum accepted frame size; larger frames are dropped unparsed.
pub const MAX_FRAME_BYTES: usize = 16 * 1024;

/// WebSocket client for a `sensor.temperature` feed.
#[derive(Debug, Clone)]
pub struct WsTelemetryAdapter {
    url: String,
}

impl WsTelemetryAdapter {
    /// `url` is the `ws://` or `wss://` address of the sensor gateway.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TelemetryAdapter for WsTelemetryAdapter {
    fn name(&self) -> &str {
        "ws_telemetry"
    }

    async fn readings(&self) -> Result<BoxStream<'static, TelemetryReading>, SpotError> {
        let (ws, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| SpotError::Channel(format!("connect to {} failed: {e}", self.url)))?;

        let stream = ws.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => parse_frame(text.as_str()),
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, "telemetry socket error");
                    None
                }
            }
        });
        Ok(stream.boxed())
    }
}

/// Parse one text frame.  Returns `None` for anything that is not a
/// temperature reading.
pub fn parse_frame(text: &str) -> Option<TelemetryReading> {
    if text.len() > MAX_FRAME_BYTES {
        warn!(bytes = text.len(), "oversized telemetry frame dropped");
        return None;
    }
    let json: Value = serde_json::from_str(text).ok()?;

    let channel = json
        .get("event")
        .or_else(|| json.get("topic"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    let body = match channel.as_deref() {
        Some(TEMPERATURE_CHANNEL) => json.get("data")?.clone(),
        Some(other) => {
            debug!(channel = other, "ignoring frame for other channel");
            return None;
        }
        None => json,
    };

    if !body.is_object() {
        return None;
    }
    serde_json::from_value(body).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_enveloped_frame() {
        let frame = r#"{"event":"sensor.temperature","data":{"targetId":"pump","objectTemperature":31.2,"threshold":25}}"#;
        let r = parse_frame(frame).expect("reading");
        assert_eq!(r.target_id.as_deref(), Some("pump"));
        assert!(r.is_alert());
    }

    #[test]
    fn parses_bare_reading() {
        let r = parse_frame(r#"{"targetId":"pump","objectTemperature":12.0,"threshold":25.0}"#)
            .expect("reading");
        assert!(!r.is_alert());
    }

    #[test]
    fn bare_reading_with_missing_fields_still_parses() {
        let r = parse_frame(r#"{"targetId":"pump"}"#).expect("reading");
        assert_eq!(r.object_temperature, None);
        assert!(!r.is_alert());
    }

    #[test]
    fn other_channels_are_ignored() {
        assert!(parse_frame(r#"{"event":"sensor.humidity","data":{"targetId":"pump"}}"#).is_none());
    }

    #[test]
    fn malformed_frames_are_ignored() {
        assert!(parse_frame("not json").is_none());
        assert!(parse_frame("[1,2,3]").is_none());
        assert!(parse_frame(r#"{"event":"sensor.temperature"}"#).is_none());
        assert!(parse_frame(r#"{"objectTemperature":"hot"}"#).is_none());
    }

    #[test]
    fn oversized_frames_are_dropped() {
        let padding = "x".repeat(MAX_FRAME_BYTES);
        let frame = format!(r#"{{"targetId":"{padding}"}}"#);
        assert!(parse_frame(&frame).is_none());
    }

    #[tokio::test]
    async fn connect_failure_is_a_channel_error() {
        // Port 9 (discard) is not a WebSocket server on any CI host.
        let adapter = WsTelemetryAdapter::new("ws://127.0.0.1:9/");
        let err = adapter.readings().await.err().expect("connection must fail");
        assert!(matches!(err, SpotError::Channel(_)));
    }
}
