//! `spotlight-cli` – Spotlight command line interface
//!
//! This binary boots the whole stack in one process.  It:
//!
//! 1. Loads `~/.spotlight/config.toml`, writing the defaults on first run.
//! 2. Starts the event loop hosting the `spotlight.hotspots` extension.
//! 3. Pumps telemetry from the configured WebSocket feed, or from the
//!    simulated source when none is configured.
//! 4. Serves the cockpit panel and sequence API.
//! 5. Drops the user into an **interactive REPL**.
//! 6. Intercepts **Ctrl-C** to publish a shutdown fault and exit cleanly.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

use spotlight_cockpit::CockpitServer;
use spotlight_kernel::HotspotExtension;
use spotlight_middleware::{
    EventBus, SimTelemetryAdapter, TelemetryAdapter, Topic, WsTelemetryAdapter, forward_to_bus,
};
use spotlight_runtime::{
    EventLoop, ExtensionContext, ExtensionRegistry, ViewerExtension, init_tracing,
};
use spotlight_scene::sim::SimScene;
use spotlight_store::{SequenceStore, SequenceStores, StoreError};
use spotlight_types::{Event, EventPayload};

const EXTENSION_ID: &str = "spotlight.hotspots";
const DEFAULT_DB: &str = "main";

fn main() {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start async runtime".red(), e);
            std::process::exit(1);
        }
    };

    // ── Structured logging ────────────────────────────────────────────────
    let _tracing = {
        let _enter = runtime.enter();
        init_tracing("spotlight")
    };

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => first_run(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    let options = match cfg.extension_options() {
        Ok(options) => options,
        Err(e) => {
            println!("{}: {}", "Invalid hotspot colors".red(), e);
            std::process::exit(1);
        }
    };

    let stores = match open_stores(&cfg) {
        Ok(stores) => stores,
        Err(e) => {
            println!("{}: {}", "Failed to open sequence database".red(), e);
            std::process::exit(1);
        }
    };

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let bus = EventBus::default();

    let shutdown_clone = shutdown.clone();
    let bus_ctrlc = bus.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – shutting down …".yellow().bold());
        let fault = EventPayload::Fault {
            component: "cli".to_string(),
            message: "operator Ctrl-C".to_string(),
        };
        bus_ctrlc.publish_to(Topic::SystemAlerts, Event::new("spotlight-cli", fault));
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    // ── Event loop ────────────────────────────────────────────────────────
    let mut extensions = ExtensionRegistry::new();
    extensions.register(
        EXTENSION_ID,
        Box::new(|cx: ExtensionContext| {
            let ext = HotspotExtension::new(SimScene::new(), cx.timers, cx.sink, cx.options);
            Ok(Box::new(ext) as Box<dyn ViewerExtension>)
        }),
    );

    let event_loop = {
        let _enter = runtime.enter();
        match EventLoop::launch(&extensions, EXTENSION_ID, options, bus.clone()) {
            Ok(event_loop) => event_loop,
            Err(e) => {
                println!("{}: {}", "Failed to load extension".red(), e);
                std::process::exit(1);
            }
        }
    };

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let loop_task = runtime.spawn(event_loop.run_until(async move {
        let _ = stop_rx.await;
    }));

    // ── Telemetry ─────────────────────────────────────────────────────────
    let adapter: Box<dyn TelemetryAdapter> = if cfg.telemetry_url.is_empty() {
        let target = cfg.sim_target().unwrap_or_default().to_string();
        println!(
            "  Telemetry: {} for {}",
            "simulated".yellow(),
            target.bold()
        );
        Box::new(SimTelemetryAdapter::new(target, cfg.sim_threshold))
    } else {
        println!("  Telemetry: {}", cfg.telemetry_url.bold());
        Box::new(WsTelemetryAdapter::new(cfg.telemetry_url.clone()))
    };
    let telemetry_bus = bus.clone();
    runtime.spawn(async move {
        match forward_to_bus(adapter.as_ref(), &telemetry_bus).await {
            Ok(n) => info!(readings = n, "telemetry finished"),
            Err(e) => error!(error = %e, "telemetry failed"),
        }
    });

    // ── Cockpit ───────────────────────────────────────────────────────────
    let cockpit = CockpitServer::new(bus.clone(), stores).with_port(cfg.cockpit_port);
    println!(
        "  Cockpit: {}",
        format!("http://localhost:{}", cockpit.port()).bold()
    );
    runtime.spawn(async move {
        if let Err(e) = cockpit.run().await {
            error!(error = %e, "cockpit stopped");
        }
    });

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(shutdown, bus);

    let _ = stop_tx.send(());
    match runtime.block_on(loop_task) {
        Ok(ext) => println!(
            "  {} {} hotspot(s) listed at exit.",
            "✓".green().bold(),
            ext.state().hotspots.len()
        ),
        Err(e) => error!(error = %e, "event loop task failed"),
    }
    runtime.shutdown_timeout(Duration::from_secs(1));
}

fn open_stores(cfg: &config::Config) -> Result<SequenceStores, StoreError> {
    let store = if cfg.database_path.is_empty() {
        SequenceStore::open_in_memory()?
    } else {
        SequenceStore::open(&cfg.database_path)?
    };
    let mut stores = SequenceStores::new();
    stores.insert(DEFAULT_DB, store);
    Ok(stores)
}

// ─────────────────────────────────────────────────────────────────────────────
// First run
// ─────────────────────────────────────────────────────────────────────────────

fn first_run() -> config::Config {
    let mut cfg = config::Config::default();
    match config::save(&cfg) {
        Ok(()) => println!(
            "  {} Default config written to {}",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    config::apply_env_overrides(&mut cfg);
    cfg
}

fn print_banner() {
    println!();
    println!("  {} {}",
        "Spotlight".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Hotspots and sensor alerts");
    println!();
}
