//! Typed records exchanged between the scene layer, the alert controller, the
//! focus bridge and the UI.
//!
//! Field names serialise in camelCase so that hotspot definitions and
//! telemetry frames authored for the web viewer deserialise unchanged.

use serde::{Deserialize, Serialize};

use crate::color::HotSpotStyle;

/// Handle returned by the scene engine when an anchor is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneHandle(pub u64);

/// Scene-engine-specific anchor description (world point, object id, ...).
/// The core never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorSpec(pub serde_json::Value);

/// Saved camera/view state, produced and consumed only by the scene engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewState(pub serde_json::Value);

/// Application payload carried by a hotspot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotSpotData {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Telemetry-driven hotspots are hidden until an alert shows them.
    #[serde(default)]
    pub controlled: bool,
    pub stroke_color: String,
    pub fill_color: String,
    /// Display properties shown in the detail panel.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub properties: serde_json::Value,
    /// View restored when the hotspot is focused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_state: Option<ViewState>,
    /// Scene object ids isolated when the hotspot is focused.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub isolate_ids: Vec<u32>,
    /// Graph metadata for the detail panel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<serde_json::Value>,
}

impl HotSpotData {
    /// Minimal payload with the given id and style; everything else empty.
    pub fn new(id: impl Into<String>, style: &HotSpotStyle) -> Self {
        Self {
            id: id.into(),
            name: None,
            controlled: false,
            stroke_color: style.stroke_color.clone(),
            fill_color: style.fill_color.clone(),
            properties: serde_json::Value::Null,
            viewer_state: None,
            isolate_ids: Vec::new(),
            graph: None,
        }
    }

    pub fn style(&self) -> HotSpotStyle {
        HotSpotStyle::new(self.stroke_color.clone(), self.fill_color.clone())
    }

    pub fn set_style(&mut self, style: &HotSpotStyle) {
        self.stroke_color.clone_from(&style.stroke_color);
        self.fill_color.clone_from(&style.fill_color);
    }

    /// Label for list rendering: the name, or the id when unnamed.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Configured hotspot: where to anchor it and what it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotSpotDefinition {
    pub anchor: AnchorSpec,
    #[serde(flatten)]
    pub data: HotSpotData,
}

/// One entry of the externally visible hotspot list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotSpotEntry {
    #[serde(flatten)]
    pub data: HotSpotData,
    #[serde(default)]
    pub active: bool,
}

impl HotSpotEntry {
    pub fn new(data: HotSpotData) -> Self {
        Self {
            data,
            active: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }
}

/// A single temperature sample pushed by the telemetry channel.
///
/// Every field is optional on the wire; readings with missing fields are
/// never alerts and readings without a target are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReading {
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub object_temperature: Option<f64>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl TelemetryReading {
    pub fn new(target_id: impl Into<String>, object_temperature: f64, threshold: f64) -> Self {
        Self {
            target_id: Some(target_id.into()),
            object_temperature: Some(object_temperature),
            threshold: Some(threshold),
        }
    }

    /// `true` only when both values are present and the temperature is
    /// strictly above the threshold.
    pub fn is_alert(&self) -> bool {
        match (self.object_temperature, self.threshold) {
            (Some(temperature), Some(threshold)) => temperature > threshold,
            _ => false,
        }
    }
}

/// Full-replace UI snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSnapshot {
    pub active_item: Option<HotSpotData>,
    pub hotspots: Vec<HotSpotEntry>,
    pub graph_data: Option<TelemetryReading>,
}

impl FocusSnapshot {
    pub fn entry(&self, id: &str) -> Option<&HotSpotEntry> {
        self.hotspots.iter().find(|e| e.id() == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_item.as_ref().map(|d| d.id.as_str())
    }
}

/// Commands entering the core from the toolbar, the UI list and the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ViewerCommand {
    /// Toolbar toggle: activate when inactive, deactivate otherwise.
    Toggle,
    Activate,
    Deactivate,
    /// Context-menu "show all objects".
    ShowAll,
    /// A UI list item was clicked.
    ItemClicked { id: String },
    /// A marker was clicked in the scene.
    SceneClick { handle: SceneHandle },
    /// A marker was dragged or edited in the scene.
    SceneModified { handle: SceneHandle, anchor: AnchorSpec },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reading_alert_requires_both_fields() {
        assert!(TelemetryReading::new("hs", 30.0, 20.0).is_alert());
        assert!(!TelemetryReading::new("hs", 20.0, 20.0).is_alert());
        assert!(!TelemetryReading::new("hs", 10.0, 20.0).is_alert());

        let no_threshold = TelemetryReading {
            target_id: Some("hs".into()),
            object_temperature: Some(99.0),
            threshold: None,
        };
        assert!(!no_threshold.is_alert());

        let no_temp = TelemetryReading {
            target_id: Some("hs".into()),
            object_temperature: None,
            threshold: Some(0.0),
        };
        assert!(!no_temp.is_alert());
    }

    #[test]
    fn reading_with_nan_is_not_an_alert() {
        assert!(!TelemetryReading::new("hs", f64::NAN, 20.0).is_alert());
    }

    #[test]
    fn reading_parses_camel_case_with_missing_fields() {
        let r: TelemetryReading =
            serde_json::from_value(json!({"targetId": "pump", "objectTemperature": 31.5})).unwrap();
        assert_eq!(r.target_id.as_deref(), Some("pump"));
        assert_eq!(r.object_temperature, Some(31.5));
        assert_eq!(r.threshold, None);
        assert!(!r.is_alert());
    }

    #[test]
    fn definition_flattens_data_fields() {
        let def: HotSpotDefinition = serde_json::from_value(json!({
            "id": "valve",
            "name": "Valve 3",
            "anchor": {"dbId": 1234, "worldPoint": {"x": 1.0, "y": 2.0, "z": 3.0}},
            "strokeColor": "#FF0000",
            "fillColor": "#FF8888",
            "controlled": true,
            "isolateIds": [12, 13]
        }))
        .unwrap();
        assert_eq!(def.data.id, "valve");
        assert_eq!(def.data.label(), "Valve 3");
        assert!(def.data.controlled);
        assert_eq!(def.data.isolate_ids, vec![12, 13]);
        assert_eq!(def.anchor.0["dbId"], 1234);
    }

    #[test]
    fn entry_serialises_flat_with_active_flag() {
        let style = HotSpotStyle::new("#4CAF50", "#4CAF50");
        let mut entry = HotSpotEntry::new(HotSpotData::new("a", &style));
        entry.active = true;
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["id"], "a");
        assert_eq!(v["active"], true);
        assert_eq!(v["strokeColor"], "#4CAF50");
    }

    #[test]
    fn snapshot_serialises_camel_case_nulls() {
        let v = serde_json::to_value(FocusSnapshot::default()).unwrap();
        assert!(v["activeItem"].is_null());
        assert!(v["graphData"].is_null());
        assert_eq!(v["hotspots"], json!([]));
    }

    #[test]
    fn command_tagged_by_op() {
        let cmd: ViewerCommand =
            serde_json::from_value(json!({"op": "item_clicked", "id": "a"})).unwrap();
        assert_eq!(cmd, ViewerCommand::ItemClicked { id: "a".into() });

        let cmd: ViewerCommand = serde_json::from_value(json!({"op": "toggle"})).unwrap();
        assert_eq!(cmd, ViewerCommand::Toggle);
    }

    #[test]
    fn set_style_overwrites_colors() {
        let mut data = HotSpotData::new("a", &HotSpotStyle::new("#000", "#111"));
        data.set_style(&HotSpotStyle::new("#FF0000", "#FF8888"));
        assert_eq!(data.style(), HotSpotStyle::new("#FF0000", "#FF8888"));
    }
}
