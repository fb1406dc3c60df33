//! REPL – interactive shell driving the hotspot extension over the bus.
//!
//! Supported slash-commands:
//!   /help                          – show this list
//!   /toggle                        – activate or deactivate the extension
//!   /click <id>                    – click a hotspot in the list
//!   /reading <id> <temp> <thresh>  – inject a telemetry reading
//!   /showall                       – reset isolation and fit the view
//!   /state                         – print the latest UI snapshot
//!   /quit | /exit                  – gracefully exit the CLI

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use spotlight_middleware::{EventBus, Topic, TopicReceiver};
use spotlight_types::{Event, EventPayload, FocusSnapshot, TelemetryReading, ViewerCommand};

const SOURCE: &str = "spotlight-cli::repl";

/// What the loop should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Help,
    Publish(ViewerCommand),
    Reading(TelemetryReading),
    State,
    Quit,
}

/// Parse one input line.  `Err` carries a message for the user.
pub fn parse(line: &str) -> Result<ReplCommand, String> {
    let mut words = line.split_whitespace();
    let cmd = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    match (cmd, args.as_slice()) {
        ("/help", []) => Ok(ReplCommand::Help),
        ("/toggle", []) => Ok(ReplCommand::Publish(ViewerCommand::Toggle)),
        ("/showall", []) => Ok(ReplCommand::Publish(ViewerCommand::ShowAll)),
        ("/click", [id]) => Ok(ReplCommand::Publish(ViewerCommand::ItemClicked {
            id: (*id).to_string(),
        })),
        ("/reading", [id, temp, threshold]) => {
            let temp = temp
                .parse::<f64>()
                .map_err(|_| format!("'{temp}' is not a temperature"))?;
            let threshold = threshold
                .parse::<f64>()
                .map_err(|_| format!("'{threshold}' is not a threshold"))?;
            Ok(ReplCommand::Reading(TelemetryReading::new(*id, temp, threshold)))
        }
        ("/state", []) => Ok(ReplCommand::State),
        ("/quit" | "/exit", []) => Ok(ReplCommand::Quit),
        ("/click", _) => Err("usage: /click <id>".to_string()),
        ("/reading", _) => Err("usage: /reading <id> <temp> <threshold>".to_string()),
        (other, _) => Err(format!("Unknown command: '{other}'")),
    }
}

/// Shell state: the bus to publish on and the last snapshot seen.
pub struct Repl {
    bus: EventBus,
    ui: TopicReceiver,
    last: Option<FocusSnapshot>,
}

impl Repl {
    pub fn new(bus: EventBus) -> Self {
        let ui = bus.subscribe_to(Topic::UiState);
        Self { bus, ui, last: None }
    }

    /// Latest snapshot published by the event loop.
    pub fn latest(&mut self) -> Option<&FocusSnapshot> {
        while let Some(event) = self.ui.try_recv() {
            if let EventPayload::Snapshot(snapshot) = event.payload {
                self.last = Some(snapshot);
            }
        }
        self.last.as_ref()
    }

    pub fn execute(&mut self, line: &str) -> Flow {
        let command = match parse(line) {
            Ok(command) => command,
            Err(msg) => {
                println!(
                    "{} Type {} for available commands.",
                    msg.red(),
                    "/help".bold()
                );
                return Flow::Continue;
            }
        };

        match command {
            ReplCommand::Help => cmd_help(),
            ReplCommand::Publish(cmd) => {
                self.bus
                    .publish_to(Topic::Commands, Event::new(SOURCE, EventPayload::Command(cmd)));
            }
            ReplCommand::Reading(reading) => {
                self.bus.publish_to(
                    Topic::Telemetry,
                    Event::new(SOURCE, EventPayload::Telemetry(reading)),
                );
            }
            ReplCommand::State => match self.latest() {
                Some(snapshot) => print_snapshot(snapshot),
                None => println!("  {}", "No snapshot yet. Try /toggle.".dimmed()),
            },
            ReplCommand::Quit => {
                println!("{}", "Goodbye.".green());
                return Flow::Quit;
            }
        }
        Flow::Continue
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(shutdown: Arc<AtomicBool>, bus: EventBus) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("{}: {}", "Terminal error".red(), e);
            return;
        }
    };
    let mut repl = Repl::new(bus);
    let prompt = format!("{} ", "spotlight>".bold().cyan());

    while !shutdown.load(Ordering::SeqCst) {
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        };

        let cmd = line.trim();
        if cmd.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(cmd);

        if repl.execute(cmd) == Flow::Quit {
            break;
        }
    }
    shutdown.store(true, Ordering::SeqCst);
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Spotlight Commands".bold().underline());
    println!("  {}                         – activate / deactivate hotspots", "/toggle".bold().cyan());
    println!("  {}                      – click a hotspot in the list", "/click <id>".bold().cyan());
    println!("  {} – inject a telemetry reading", "/reading <id> <temp> <threshold>".bold().cyan());
    println!("  {}                        – show all objects", "/showall".bold().cyan());
    println!("  {}                          – print the current hotspot list", "/state".bold().cyan());
    println!("  {}                    – exit the CLI", "/quit  /exit".bold().cyan());
    println!();
}

fn print_snapshot(snapshot: &FocusSnapshot) {
    println!("{}", "Hotspots".bold().underline());
    if snapshot.hotspots.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for entry in &snapshot.hotspots {
        let marker = if entry.active { "▶" } else { " " };
        let label = format!("{} [{}]", entry.data.label(), entry.data.fill_color);
        let label = if entry.data.fill_color.eq_ignore_ascii_case(&entry.data.stroke_color) {
            label.green()
        } else {
            label.red()
        };
        println!("  {} {}", marker.green(), label);
    }
    if let Some(reading) = &snapshot.graph_data {
        println!(
            "  Temperature: {} (threshold {})",
            reading
                .object_temperature
                .map_or_else(|| "-".to_string(), |t| t.to_string())
                .yellow(),
            reading
                .threshold
                .map_or_else(|| "-".to_string(), |t| t.to_string())
        );
    }
}
