//! `spotlight-scene` – hotspot markers bound to a 3D scene.
//!
//! # Modules
//!
//! - [`engine`] – the [`SceneEngine`] trait every host scene implements.
//! - [`hotspot`] – a single [`HotSpot`] marker and its events.
//! - [`registry`] – [`HotSpotRegistry`], the set of hotspots owned by one
//!   extension, and isolation.
//! - [`sim`] – [`SimScene`][sim::SimScene], a recording in-process engine.

pub mod engine;
pub mod hotspot;
pub mod registry;
pub mod sim;

pub use engine::SceneEngine;
pub use hotspot::{HotSpot, HotSpotEvent};
pub use registry::{ActivationReport, HotSpotRegistry, IdSet, RegistryEvent};
