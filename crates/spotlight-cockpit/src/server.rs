//! [`CockpitServer`] – HTTP + WebSocket server for the hotspot panel.
//!
//! Listens on `0.0.0.0:8080` (configurable via [`CockpitServer::with_port`]).
//!
//! * `GET /` → the embedded panel page, or a WebSocket when the request asks
//!   for an upgrade: snapshot stream down, viewer commands up.
//! * `/api/config/...` → sequence CRUD (see [`crate::api`]).
//! * Anything else → 404.

use std::net::SocketAddr;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use serde_json::{Value, json};
use spotlight_middleware::{EventBus, Topic, TopicReceiver};
use spotlight_store::SequenceStores;
use spotlight_types::{
    Event, EventPayload, FocusSnapshot, SpotError, TelemetryReading, ViewerCommand,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::api;

/// Default TCP port for the cockpit HTTP/WebSocket server.
pub const DEFAULT_PORT: u16 = 8080;

/// Fill alpha of list swatches.
pub const SWATCH_ALPHA: f32 = 0.3;

const SOURCE: &str = "spotlight-cockpit::server";

const PANEL_HTML: &str = include_str!("panel.html");

/// Latest UI snapshot, `None` until the first one is published.
pub type LatestSnapshot = watch::Receiver<Option<FocusSnapshot>>;

// ---------------------------------------------------------------------------
// CockpitServer
// ---------------------------------------------------------------------------

pub struct CockpitServer {
    bus: EventBus,
    stores: SequenceStores,
    port: u16,
    ui: TopicReceiver,
}

impl CockpitServer {
    /// Create a server backed by `bus` and `stores` on the [`DEFAULT_PORT`].
    ///
    /// Snapshots published from here on are kept, so a panel that connects
    /// later still starts from the current state.
    pub fn new(bus: EventBus, stores: SequenceStores) -> Self {
        let ui = bus.subscribe_to(Topic::UiState);
        Self {
            bus,
            stores,
            port: DEFAULT_PORT,
            ui,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Bind and serve forever.
    ///
    /// # Errors
    ///
    /// Returns [`SpotError::Channel`] if the TCP listener cannot bind.
    pub async fn run(self) -> Result<(), SpotError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| SpotError::Channel(format!("cockpit bind error on {addr}: {e}")))?;
        self.serve(listener).await
    }

    /// Serve connections from an already-bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), SpotError> {
        let local = listener
            .local_addr()
            .map_err(|e| SpotError::Channel(format!("cockpit listener error: {e}")))?;

        let (latest_tx, latest) = watch::channel(None);
        tokio::spawn(mirror_snapshots(self.ui, latest_tx));
        let app = router(self.bus, self.stores, latest);

        info!(%local, "cockpit listening");
        axum::serve(listener, app)
            .await
            .map_err(|e| SpotError::Channel(format!("cockpit server error: {e}")))
    }
}

/// Keep the newest snapshot from the UI topic.
async fn mirror_snapshots(mut ui: TopicReceiver, latest: watch::Sender<Option<FocusSnapshot>>) {
    while let Some(event) = ui.recv().await {
        if let EventPayload::Snapshot(snapshot) = event.payload {
            latest.send_replace(Some(snapshot));
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct PanelState {
    bus: EventBus,
    latest: LatestSnapshot,
}

/// The full cockpit router: panel page, panel WebSocket and sequence API.
pub fn router(bus: EventBus, stores: SequenceStores, latest: LatestSnapshot) -> Router {
    Router::new()
        .route("/", get(index))
        .with_state(PanelState { bus, latest })
        .merge(api::router(stores))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
}

async fn index(ws: Option<WebSocketUpgrade>, State(panel): State<PanelState>) -> Response {
    match ws {
        Some(ws) => ws.on_upgrade(move |socket| stream_panel(socket, panel)),
        None => Html(PANEL_HTML).into_response(),
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

// ---------------------------------------------------------------------------
// WebSocket: snapshots down, commands up
// ---------------------------------------------------------------------------

async fn stream_panel(socket: WebSocket, panel: PanelState) {
    info!("panel connected");
    let (mut ws_tx, mut ws_rx) = socket.split();
    let PanelState { bus, mut latest } = panel;

    // Current state first.
    let current = latest.borrow_and_update().clone();
    if let Some(snapshot) = current
        && send_snapshot(&mut ws_tx, &snapshot).await.is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            changed = latest.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = latest.borrow_and_update().clone();
                let Some(snapshot) = snapshot else { continue };
                if send_snapshot(&mut ws_tx, &snapshot).await.is_err() {
                    break;
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_upstream_message(&text, &bus);
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    info!("panel disconnected");
}

async fn send_snapshot(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    snapshot: &FocusSnapshot,
) -> Result<(), axum::Error> {
    let frame = snapshot_frame(snapshot).unwrap_or_else(|e| {
        warn!(error = %e, "snapshot not rendered");
        error_frame(&e)
    });
    ws_tx.send(Message::Text(frame.to_string())).await
}

/// JSON frame for one snapshot: the snapshot itself with a precomputed
/// `swatch` on every hotspot entry.
///
/// # Errors
///
/// [`SpotError::InvalidStyle`] naming the first entry whose colors do not
/// parse.
pub fn snapshot_frame(snapshot: &FocusSnapshot) -> Result<Value, SpotError> {
    let mut state =
        serde_json::to_value(snapshot).map_err(|e| SpotError::Serialization(e.to_string()))?;
    if let Some(entries) = state.get_mut("hotspots").and_then(Value::as_array_mut) {
        for (value, entry) in entries.iter_mut().zip(&snapshot.hotspots) {
            let swatch = entry
                .data
                .style()
                .swatch(SWATCH_ALPHA)
                .map_err(|e| SpotError::InvalidStyle {
                    id: entry.id().to_string(),
                    details: e.to_string(),
                })?;
            let swatch =
                serde_json::to_value(swatch).map_err(|e| SpotError::Serialization(e.to_string()))?;
            if let Some(obj) = value.as_object_mut() {
                obj.insert("swatch".into(), swatch);
            }
        }
    }
    Ok(json!({ "type": "snapshot", "state": state }))
}

/// Frame sent instead of a snapshot that could not be rendered.
pub fn error_frame(err: &SpotError) -> Value {
    json!({ "type": "error", "message": err.to_string() })
}

// ---------------------------------------------------------------------------
// Upstream message parser
// ---------------------------------------------------------------------------

/// Parse a panel message and publish it on the bus.
///
/// | `op` | Topic |
/// |---|---|
/// | `reading` | [`Topic::Telemetry`] |
/// | any [`ViewerCommand`] op | [`Topic::Commands`] |
///
/// Returns `false` for malformed or unknown messages, which are dropped.
pub(crate) fn handle_upstream_message(text: &str, bus: &EventBus) -> bool {
    let Ok(json) = serde_json::from_str::<Value>(text) else {
        return false;
    };

    if json.get("op").and_then(Value::as_str) == Some("reading") {
        let Ok(reading) = serde_json::from_value::<TelemetryReading>(json) else {
            return false;
        };
        bus.publish_to(Topic::Telemetry, Event::new(SOURCE, EventPayload::Telemetry(reading)));
        return true;
    }

    match serde_json::from_value::<ViewerCommand>(json) {
        Ok(command) => {
            debug!(?command, "panel command");
            bus.publish_to(Topic::Commands, Event::new(SOURCE, EventPayload::Command(command)));
            true
        }
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use spotlight_store::SequenceStore;
    use spotlight_types::{AlertPalette, HotSpotData, HotSpotEntry, HotSpotStyle};
    use std::time::Duration;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tower::ServiceExt;

    fn stores() -> SequenceStores {
        let mut stores = SequenceStores::new();
        stores.insert("main", SequenceStore::open_in_memory().unwrap());
        stores
    }

    fn listed(ids: &[&str]) -> FocusSnapshot {
        let palette = AlertPalette::default();
        FocusSnapshot {
            active_item: None,
            hotspots: ids
                .iter()
                .map(|id| HotSpotEntry::new(HotSpotData::new(*id, &palette.normal)))
                .collect(),
            graph_data: None,
        }
    }

    fn publish(bus: &EventBus, snapshot: FocusSnapshot) {
        bus.publish_to(Topic::UiState, Event::new("test", EventPayload::Snapshot(snapshot)));
    }

    #[test]
    fn default_port_is_8080() {
        let server = CockpitServer::new(EventBus::default(), stores());
        assert_eq!(server.port(), DEFAULT_PORT);
        assert_eq!(server.with_port(9999).port(), 9999);
    }

    #[tokio::test]
    async fn item_click_publishes_command() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Commands);

        assert!(handle_upstream_message(r#"{"op":"item_clicked","id":"pump"}"#, &bus));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.source, SOURCE);
        assert_eq!(
            event.payload,
            EventPayload::Command(ViewerCommand::ItemClicked { id: "pump".into() })
        );
    }

    #[tokio::test]
    async fn toggle_and_show_all_publish_commands() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Commands);
        handle_upstream_message(r#"{"op":"toggle"}"#, &bus);
        handle_upstream_message(r#"{"op":"show_all"}"#, &bus);

        let first = rx.recv().await.unwrap().payload;
        let second = rx.recv().await.unwrap().payload;
        assert_eq!(first, EventPayload::Command(ViewerCommand::Toggle));
        assert_eq!(second, EventPayload::Command(ViewerCommand::ShowAll));
    }

    #[tokio::test]
    async fn reading_publishes_telemetry() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Telemetry);
        let msg = r#"{"op":"reading","targetId":"pump","objectTemperature":31.0,"threshold":25.0}"#;
        assert!(handle_upstream_message(msg, &bus));

        match rx.recv().await.unwrap().payload {
            EventPayload::Telemetry(r) => assert!(r.is_alert()),
            other => panic!("expected telemetry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_and_invalid_messages_are_ignored() {
        let bus = EventBus::default();
        let mut commands = bus.subscribe_to(Topic::Commands);
        assert!(!handle_upstream_message(r#"{"op":"explode"}"#, &bus));
        assert!(!handle_upstream_message("not json at all", &bus));
        assert!(commands.try_recv().is_none());
    }

    #[test]
    fn snapshot_frame_adds_swatches() {
        let palette = AlertPalette::default();
        let snapshot = FocusSnapshot {
            active_item: None,
            hotspots: vec![HotSpotEntry::new(HotSpotData::new("pump", &palette.alert))],
            graph_data: None,
        };
        let frame = snapshot_frame(&snapshot).unwrap();
        assert_eq!(frame["type"], "snapshot");
        let swatch = &frame["state"]["hotspots"][0]["swatch"];
        assert_eq!(swatch["background"], "rgba(255,136,136,0.3)");
        assert_eq!(swatch["border"], "2px solid #FF0000");
    }

    #[test]
    fn snapshot_frame_reports_malformed_colors() {
        let mut snapshot = listed(&["door"]);
        snapshot
            .hotspots
            .push(HotSpotEntry::new(HotSpotData::new("pump", &HotSpotStyle::new("red", "#GGGGGG"))));

        let err = snapshot_frame(&snapshot).unwrap_err();
        assert!(matches!(err, SpotError::InvalidStyle { ref id, .. } if id == "pump"));

        let frame = error_frame(&err);
        assert_eq!(frame["type"], "error");
        assert!(frame["message"].as_str().unwrap().contains("pump"));
    }

    #[test]
    fn panel_html_opens_a_websocket() {
        assert!(PANEL_HTML.contains("WebSocket"));
    }

    #[tokio::test]
    async fn serves_panel_api_and_404() {
        let (_tx, latest) = watch::channel(None);
        let app = router(EventBus::default(), stores(), latest);

        let get = |uri: &'static str| Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = app.clone().oneshot(get("/api/config/main/m/sequences")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = app.oneshot(get("/nope")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    async fn next_frame<S>(ws: &mut S) -> Value
    where
        S: futures_util::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("frame in time")
            .expect("stream open")
            .expect("ws message");
        serde_json::from_str(msg.to_text().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn late_panel_starts_from_the_current_snapshot() {
        let bus = EventBus::default();
        let server = CockpitServer::new(bus.clone(), stores());
        publish(&bus, listed(&["door", "fan"]));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server.serve(listener));

        let (mut ws, _) = connect_async(format!("ws://{addr}/")).await.unwrap();
        let frame = next_frame(&mut ws).await;
        assert_eq!(frame["type"], "snapshot");
        let ids: Vec<_> = frame["state"]["hotspots"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["door", "fan"]);

        // Later snapshots keep streaming, and commands flow upstream.
        let mut commands = bus.subscribe_to(Topic::Commands);
        publish(&bus, listed(&["door"]));
        let frame = next_frame(&mut ws).await;
        assert_eq!(frame["state"]["hotspots"].as_array().unwrap().len(), 1);

        ws.send(WsMessage::text(r#"{"op":"toggle"}"#))
            .await
            .unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), commands.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.payload, EventPayload::Command(ViewerCommand::Toggle));
    }
}
