//! `spotlight-cockpit` – HTTP + WebSocket surface of the hotspot panel.
//!
//! Boots an `axum` server (default port `8080`) that:
//!
//! 1. **Serves** the embedded panel page at `/`.
//!
//! 2. **Streams** the current [`FocusSnapshot`] to each panel as soon as it
//!    connects, then every snapshot published on the bus UI topic, with
//!    precomputed list swatches.
//!
//! 3. **Accepts** upstream panel messages (`item_clicked`, `toggle`,
//!    `show_all`, `reading`) and republishes them as commands or telemetry.
//!
//! 4. **Exposes** sequence CRUD under `/api/config/:db/:model_id/sequences`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use spotlight_cockpit::CockpitServer;
//! use spotlight_middleware::EventBus;
//! use spotlight_store::{SequenceStore, SequenceStores};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut stores = SequenceStores::new();
//!     stores.insert("main", SequenceStore::open_in_memory().unwrap());
//!     CockpitServer::new(EventBus::default(), stores)
//!         .run()
//!         .await
//!         .expect("cockpit server failed");
//! }
//! ```
//!
//! [`FocusSnapshot`]: spotlight_types::FocusSnapshot

pub mod api;
pub mod server;

pub use server::{
    CockpitServer, DEFAULT_PORT, LatestSnapshot, SWATCH_ALPHA, error_frame, router,
    snapshot_frame,
};
