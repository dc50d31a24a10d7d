// ABOUTME: Structured log events and the presentation sink they are delivered to.
// ABOUTME: Includes a channel-backed sink for consumers rendering on another task.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::directory::ContainerRecord;
use crate::runtime::ContainerState;
use crate::types::ContainerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
    InProgress,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::InProgress => "in_progress",
        }
    }
}

/// One entry of the user-facing activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl LogEvent {
    pub fn new(severity: Severity, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
            timestamp: Utc::now(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, title, message)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Success, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, title, message)
    }

    pub fn in_progress(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::InProgress, title, message)
    }
}

/// Receives everything the lifecycle core reports outward.
pub trait PresentationSink: Send + Sync {
    fn emit_log(&self, event: LogEvent);

    fn update_status(&self, id: &ContainerId, state: ContainerState);

    fn replace_directory(&self, containers: &[ContainerRecord]);
}

/// A sink call, as forwarded by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    Log(LogEvent),
    Status {
        id: ContainerId,
        state: ContainerState,
    },
    Directory {
        containers: Vec<ContainerRecord>,
    },
}

/// Forwards sink calls into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SinkEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("sink receiver dropped; event discarded");
        }
    }
}

impl PresentationSink for ChannelSink {
    fn emit_log(&self, event: LogEvent) {
        self.send(SinkEvent::Log(event));
    }

    fn update_status(&self, id: &ContainerId, state: ContainerState) {
        self.send(SinkEvent::Status {
            id: id.clone(),
            state,
        });
    }

    fn replace_directory(&self, containers: &[ContainerRecord]) {
        self.send(SinkEvent::Directory {
            containers: containers.to_vec(),
        });
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use parking_lot::Mutex;

    /// Sink that keeps every call for assertions.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        events: Mutex<Vec<SinkEvent>>,
    }

    impl RecordingSink {
        pub fn events(&self) -> Vec<SinkEvent> {
            self.events.lock().clone()
        }

        pub fn logs(&self) -> Vec<LogEvent> {
            self.events
                .lock()
                .iter()
                .filter_map(|e| match e {
                    SinkEvent::Log(log) => Some(log.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn logs_with(&self, severity: Severity) -> Vec<LogEvent> {
            self.logs()
                .into_iter()
                .filter(|l| l.severity == severity)
                .collect()
        }

        pub fn statuses(&self) -> Vec<(ContainerId, ContainerState)> {
            self.events
                .lock()
                .iter()
                .filter_map(|e| match e {
                    SinkEvent::Status { id, state } => Some((id.clone(), *state)),
                    _ => None,
                })
                .collect()
        }

        pub fn directory_updates(&self) -> usize {
            self.events
                .lock()
                .iter()
                .filter(|e| matches!(e, SinkEvent::Directory { .. }))
                .count()
        }
    }

    impl PresentationSink for RecordingSink {
        fn emit_log(&self, event: LogEvent) {
            self.events.lock().push(SinkEvent::Log(event));
        }

        fn update_status(&self, id: &ContainerId, state: ContainerState) {
            self.events.lock().push(SinkEvent::Status {
                id: id.clone(),
                state,
            });
        }

        fn replace_directory(&self, containers: &[ContainerRecord]) {
            self.events.lock().push(SinkEvent::Directory {
                containers: containers.to_vec(),
            });
        }
    }
}
