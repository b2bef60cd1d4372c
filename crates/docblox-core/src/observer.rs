//! Build event reporting.
//!
//! Components never log through a global: they receive a [`BuildObserver`]
//! and report to it. [`TracingObserver`] forwards events to `tracing`;
//! [`CollectingObserver`] records them for inspection.

use std::cell::RefCell;
use std::time::Duration;

use tracing::{debug, error, info, warn};

/// One reported build event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    FileParsed { path: String },
    FileSkipped { path: String },
    FileFailed { path: String, message: String },
    PassStarted { description: String },
    PassFinished { description: String },
    Warning { message: String },
    Error { message: String },
    Debug { message: String },
}

/// Receives build progress and diagnostics.
pub trait BuildObserver {
    fn event(&self, event: BuildEvent);

    fn file_parsed(&self, path: &str) {
        self.event(BuildEvent::FileParsed {
            path: path.to_string(),
        });
    }

    fn file_skipped(&self, path: &str) {
        self.event(BuildEvent::FileSkipped {
            path: path.to_string(),
        });
    }

    fn file_failed(&self, path: &str, message: &str) {
        self.event(BuildEvent::FileFailed {
            path: path.to_string(),
            message: message.to_string(),
        });
    }

    fn pass_started(&self, description: &str) {
        self.event(BuildEvent::PassStarted {
            description: description.to_string(),
        });
    }

    /// Default implementations drop the timing; [`TracingObserver`] logs it.
    fn pass_finished(&self, description: &str, _elapsed: Duration) {
        self.event(BuildEvent::PassFinished {
            description: description.to_string(),
        });
    }

    fn warning(&self, message: &str) {
        self.event(BuildEvent::Warning {
            message: message.to_string(),
        });
    }

    fn error(&self, message: &str) {
        self.event(BuildEvent::Error {
            message: message.to_string(),
        });
    }

    fn debug(&self, message: &str) {
        self.event(BuildEvent::Debug {
            message: message.to_string(),
        });
    }
}

/// Forwards build events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl BuildObserver for TracingObserver {
    fn event(&self, event: BuildEvent) {
        match event {
            BuildEvent::FileParsed { path } => debug!(file = %path, "parsed file"),
            BuildEvent::FileSkipped { path } => {
                info!(file = %path, "skipped file as no modifications were detected")
            }
            BuildEvent::FileFailed { path, message } => {
                error!(file = %path, error = %message, "unable to parse file")
            }
            BuildEvent::PassStarted { description } => debug!(pass = %description, "pass started"),
            BuildEvent::PassFinished { description } => {
                debug!(pass = %description, "pass finished")
            }
            BuildEvent::Warning { message } => warn!("{}", message),
            BuildEvent::Error { message } => error!("{}", message),
            BuildEvent::Debug { message } => debug!("{}", message),
        }
    }

    fn pass_finished(&self, description: &str, elapsed: Duration) {
        info!(
            pass = %description,
            elapsed_ms = elapsed.as_millis() as u64,
            "pass finished"
        );
    }
}

/// Records events in memory.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: RefCell<Vec<BuildEvent>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        CollectingObserver::default()
    }

    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.borrow().clone()
    }

    /// Warning and error messages, in order.
    pub fn problems(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                BuildEvent::Warning { message } | BuildEvent::Error { message } => {
                    Some(message.clone())
                }
                BuildEvent::FileFailed { path, message } => Some(format!("{}: {}", path, message)),
                _ => None,
            })
            .collect()
    }

    pub fn skipped_files(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                BuildEvent::FileSkipped { path } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }
}

impl BuildObserver for CollectingObserver {
    fn event(&self, event: BuildEvent) {
        self.events.borrow_mut().push(event);
    }
}
