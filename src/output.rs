// ABOUTME: Console presentation sink for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use parking_lot::Mutex;
use serde::Serialize;
use std::time::Instant;

use crate::config::Catalog;
use crate::directory::ContainerRecord;
use crate::events::{LogEvent, PresentationSink, Severity, SinkEvent};
use crate::runtime::ContainerState;
use crate::snapshot::Snapshot;
use crate::types::ContainerId;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only results and errors)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Prints activity to the terminal and remembers the latest directory.
pub struct Output {
    mode: OutputMode,
    start_time: Mutex<Option<Instant>>,
    directory: Mutex<Vec<ContainerRecord>>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: Mutex::new(None),
            directory: Mutex::new(Vec::new()),
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation; the next success line shows the elapsed time.
    pub fn start_timer(&self) {
        *self.start_time.lock() = Some(Instant::now());
    }

    fn take_elapsed(&self) -> Option<f64> {
        self.start_time
            .lock()
            .take()
            .map(|t| t.elapsed().as_secs_f64())
    }

    /// Print a plain message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print an error that did not come through the activity log.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonError {
                    event: "error",
                    message,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print the directory as received by the last refresh.
    pub fn print_directory(&self) {
        let records = self.directory.lock().clone();
        match self.mode {
            OutputMode::Json => print_json(&SinkEvent::Directory {
                containers: records,
            }),
            OutputMode::Normal if records.is_empty() => println!("No containers."),
            OutputMode::Normal | OutputMode::Quiet => print!("{}", directory_table(&records)),
        }
    }

    pub fn print_catalog(&self, catalog: &Catalog) {
        match self.mode {
            OutputMode::Json => print_json(catalog),
            OutputMode::Normal | OutputMode::Quiet => {
                for family in catalog.families() {
                    let versions: Vec<&str> = family.versions.iter().map(String::as_str).collect();
                    println!("{:<12} {}", family.name, versions.join(", "));
                }
            }
        }
    }

    pub fn print_snapshots(&self, snapshots: &[Snapshot]) {
        match self.mode {
            OutputMode::Json => print_json(&snapshots),
            OutputMode::Normal if snapshots.is_empty() => println!("No snapshots."),
            OutputMode::Normal | OutputMode::Quiet => {
                for s in snapshots {
                    println!(
                        "{}  {:<24} from {}  {}",
                        s.snapshot_id.short(),
                        s.repository_tag,
                        s.source_container_id.short(),
                        s.created_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
        }
    }

    /// Print a key/value summary, or one JSON object.
    pub fn print_fields(&self, fields: &[(&str, String)]) {
        match self.mode {
            OutputMode::Json => {
                let map: serde_json::Map<String, serde_json::Value> = fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
                    .collect();
                print_json(&map);
            }
            OutputMode::Normal | OutputMode::Quiet => {
                for (key, value) in fields {
                    println!("{:<10} {}", format!("{key}:"), value);
                }
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        println!("{json}");
    }
}

/// Log line as shown in normal mode.
fn render_log(event: &LogEvent, elapsed: Option<f64>) -> String {
    let line = format!("[{}] {}", event.title, event.message);
    match (event.severity, elapsed) {
        (Severity::Success, Some(secs)) => format!("{line} ({secs:.1}s)"),
        (Severity::InProgress, _) => format!("{line}..."),
        _ => line,
    }
}

/// Fixed-width table of containers with a header row.
pub fn directory_table(records: &[ContainerRecord]) -> String {
    const HEADERS: [&str; 5] = ["NAME", "ID", "IMAGE", "STATE", "STATUS"];
    let rows: Vec<[String; 5]> = records
        .iter()
        .map(|r| {
            [
                r.name.clone(),
                r.id.short().to_string(),
                r.image.clone(),
                r.state.to_string(),
                r.status.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: [&str; 5]| {
        let line: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    };
    push_row(HEADERS);
    for row in &rows {
        push_row(row.each_ref().map(String::as_str));
    }
    out
}

impl PresentationSink for Output {
    fn emit_log(&self, event: LogEvent) {
        match self.mode {
            OutputMode::Json => {
                let line = SinkEvent::Log(event);
                if let Ok(json) = serde_json::to_string(&line) {
                    if matches!(line, SinkEvent::Log(LogEvent { severity: Severity::Error, .. })) {
                        eprintln!("{json}");
                    } else {
                        println!("{json}");
                    }
                }
            }
            OutputMode::Quiet => match event.severity {
                Severity::Success => println!("{}", event.message),
                Severity::Error => eprintln!("Error: {}", event.message),
                _ => {}
            },
            OutputMode::Normal => match event.severity {
                Severity::Success => println!("{}", render_log(&event, self.take_elapsed())),
                Severity::Error | Severity::Warning => eprintln!("{}", render_log(&event, None)),
                Severity::Info | Severity::InProgress => println!("{}", render_log(&event, None)),
            },
        }
    }

    fn update_status(&self, id: &ContainerId, state: ContainerState) {
        if let Some(record) = self.directory.lock().iter_mut().find(|r| &r.id == id) {
            record.state = state;
        }
        if self.mode == OutputMode::Json {
            print_json(&SinkEvent::Status {
                id: id.clone(),
                state,
            });
        }
    }

    fn replace_directory(&self, containers: &[ContainerRecord]) {
        *self.directory.lock() = containers.to_vec();
    }
}

#[derive(Serialize)]
struct JsonError<'a> {
    event: &'a str,
    message: &'a str,
}
