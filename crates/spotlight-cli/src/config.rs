//! Configuration – reads/writes `~/.spotlight/config.toml`.

use serde::{Deserialize, Serialize};
use serde_json::json;
use spotlight_kernel::ExtensionOptions;
use spotlight_types::{
    AlertPalette, AnchorSpec, HotSpotData, HotSpotDefinition, HotSpotStyle, SpotError,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Persisted user configuration stored in `~/.spotlight/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP/WebSocket port of the cockpit panel.
    #[serde(default = "default_cockpit_port")]
    pub cockpit_port: u16,

    /// WebSocket URL of the live sensor feed.  Empty selects simulated
    /// telemetry.
    #[serde(default)]
    pub telemetry_url: String,

    /// SQLite file holding sequences.  Empty keeps them in memory.
    #[serde(default)]
    pub database_path: String,

    /// Seconds a recovered hotspot stays visible before it auto-hides.
    #[serde(default = "default_hide_delay_secs")]
    pub hide_delay_secs: u64,

    /// Threshold reported by the simulated telemetry source.
    #[serde(default = "default_sim_threshold")]
    pub sim_threshold: f64,

    #[serde(default = "default_alert_stroke")]
    pub alert_stroke: String,
    #[serde(default = "default_alert_fill")]
    pub alert_fill: String,
    #[serde(default = "default_normal_color")]
    pub normal_stroke: String,
    #[serde(default = "default_normal_color")]
    pub normal_fill: String,

    #[serde(default = "default_hotspots")]
    pub hotspots: Vec<HotSpotDefinition>,
}

fn default_cockpit_port() -> u16 {
    8080
}
fn default_hide_delay_secs() -> u64 {
    20
}
fn default_sim_threshold() -> f64 {
    25.0
}
fn default_alert_stroke() -> String {
    "#FF0000".to_string()
}
fn default_alert_fill() -> String {
    "#FF8888".to_string()
}
fn default_normal_color() -> String {
    "#4CAF50".to_string()
}

/// Demo set: one plain hotspot and two telemetry-controlled ones.
fn default_hotspots() -> Vec<HotSpotDefinition> {
    let normal = HotSpotStyle::new(default_normal_color(), default_normal_color());
    let spot = |id: &str, name: &str, db_id: u32, controlled: bool| {
        let mut data = HotSpotData::new(id, &normal);
        data.name = Some(name.to_string());
        data.controlled = controlled;
        data.isolate_ids = vec![db_id];
        HotSpotDefinition {
            anchor: AnchorSpec(json!({"dbId": db_id, "point": {"x": 0.0, "y": 0.0, "z": 0.0}})),
            data,
        }
    };
    vec![
        spot("entrance", "Main entrance", 1, false),
        spot("pump-1", "Cooling pump", 2, true),
        spot("boiler", "Boiler", 3, true),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cockpit_port: default_cockpit_port(),
            telemetry_url: String::new(),
            database_path: String::new(),
            hide_delay_secs: default_hide_delay_secs(),
            sim_threshold: default_sim_threshold(),
            alert_stroke: default_alert_stroke(),
            alert_fill: default_alert_fill(),
            normal_stroke: default_normal_color(),
            normal_fill: default_normal_color(),
            hotspots: default_hotspots(),
        }
    }
}

impl Config {
    /// The alert palette, validated.
    pub fn palette(&self) -> Result<AlertPalette, SpotError> {
        AlertPalette::new(
            HotSpotStyle::new(&self.alert_stroke, &self.alert_fill),
            HotSpotStyle::new(&self.normal_stroke, &self.normal_fill),
        )
    }

    pub fn hide_delay(&self) -> Duration {
        Duration::from_secs(self.hide_delay_secs)
    }

    /// Options for the hotspot extension.  Every palette and hotspot color
    /// is checked here so a malformed one stops startup.
    pub fn extension_options(&self) -> Result<ExtensionOptions, SpotError> {
        let options = ExtensionOptions::new(self.hotspots.clone())
            .with_palette(self.palette()?)
            .with_hide_delay(self.hide_delay());
        options.validate()?;
        Ok(options)
    }

    /// First controlled hotspot, the target of simulated telemetry.
    pub fn sim_target(&self) -> Option<&str> {
        self.hotspots
            .iter()
            .find(|d| d.data.controlled)
            .map(|d| d.data.id.as_str())
    }
}

/// Return the path to `~/.spotlight/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".spotlight").join("config.toml")
}

/// Load the config from disk and apply environment overrides.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `SPOTLIGHT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SPOTLIGHT_COCKPIT_PORT` | `cockpit_port` |
/// | `SPOTLIGHT_TELEMETRY_URL` | `telemetry_url` |
/// | `SPOTLIGHT_DATABASE` | `database_path` |
/// | `SPOTLIGHT_HIDE_DELAY_SECS` | `hide_delay_secs` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("SPOTLIGHT_COCKPIT_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.cockpit_port = port;
    }
    if let Ok(v) = std::env::var("SPOTLIGHT_TELEMETRY_URL") {
        cfg.telemetry_url = v;
    }
    if let Ok(v) = std::env::var("SPOTLIGHT_DATABASE") {
        cfg.database_path = v;
    }
    if let Ok(v) = std::env::var("SPOTLIGHT_HIDE_DELAY_SECS")
        && let Ok(secs) = v.parse::<u64>()
    {
        cfg.hide_delay_secs = secs;
    }
}

/// Save the config to disk, creating `~/.spotlight/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}
