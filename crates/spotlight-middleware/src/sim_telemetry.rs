//! Scripted temperature source.
//!
//! [`SimTelemetryAdapter`] replays a fixed temperature pattern for one target
//! at a fixed interval.  The default pattern climbs above the threshold,
//! holds, and falls back below it, which exercises the full alert → recover
//! → auto-hide cycle of a controlled hotspot.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use spotlight_types::{SpotError, TelemetryReading};

use crate::adapter::TelemetryAdapter;

const DEFAULT_PATTERN: [f64; 12] = [
    18.0, 19.5, 21.0, 24.5, 28.0, 31.0, 29.5, 25.0, 21.5, 19.0, 17.5, 17.0,
];

/// Replays a temperature pattern against a single hotspot id.
#[derive(Debug, Clone)]
pub struct SimTelemetryAdapter {
    target_id: String,
    threshold: f64,
    pattern: Vec<f64>,
    interval: Duration,
    repeat: bool,
}

impl SimTelemetryAdapter {
    /// Default pattern, one reading per second, repeating forever.
    pub fn new(target_id: impl Into<String>, threshold: f64) -> Self {
        Self {
            target_id: target_id.into(),
            threshold,
            pattern: DEFAULT_PATTERN.to_vec(),
            interval: Duration::from_secs(1),
            repeat: true,
        }
    }

    pub fn with_pattern(mut self, pattern: Vec<f64>) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Play the pattern a single time and end the stream.
    pub fn once(mut self) -> Self {
        self.repeat = false;
        self
    }

    /// The readings of one pass over the pattern.
    pub fn script(&self) -> Vec<TelemetryReading> {
        self.pattern
            .iter()
            .map(|t| TelemetryReading::new(self.target_id.clone(), *t, self.threshold))
            .collect()
    }
}

#[async_trait]
impl TelemetryAdapter for SimTelemetryAdapter {
    fn name(&self) -> &str {
        "sim_telemetry"
    }

    async fn readings(&self) -> Result<BoxStream<'static, TelemetryReading>, SpotError> {
        let script: Arc<[TelemetryReading]> = self.script().into();
        if script.is_empty() {
            return Ok(stream::empty().boxed());
        }
        let interval = self.interval;
        let repeat = self.repeat;

        let stream = stream::unfold(0usize, move |index| {
            let script = Arc::clone(&script);
            async move {
                if !repeat && index >= script.len() {
                    return None;
                }
                tokio::time::sleep(interval).await;
                let reading = script[index % script.len()].clone();
                Some((reading, index + 1))
            }
        });
        Ok(stream.boxed())
    }
}
