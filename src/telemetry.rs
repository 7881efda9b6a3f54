//! Application telemetry events and sinks.
//!
//! The categorization service runs close to a dashboard's data, so a small
//! amount of structured telemetry helps debugging without pulling in a full
//! metrics stack: operational signals such as the active database schema
//! version are emitted as events to a pluggable sink.

use std::io;

use serde::{Deserialize, Serialize};

/// A structured telemetry event emitted by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Records the current database schema version after migrations apply.
    SchemaVersionRecorded {
        /// Diesel migration version string (e.g. `20260801000000`).
        schema_version: String,
    },
}

/// A sink that can record telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Records a telemetry event.
    fn record(&self, event: TelemetryEvent);
}

/// Telemetry sink that drops all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Records telemetry events to stderr as JSON lines (JSONL).
///
/// This is intended for local debugging and is not transmitted anywhere.
#[derive(Debug, Default)]
pub struct StderrJsonlTelemetrySink;

impl TelemetrySink for StderrJsonlTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        let Ok(serialised) = serde_json::to_string(&event) else {
            return;
        };

        let _ignored = writeln_stderr(&serialised);
    }
}

fn writeln_stderr(message: &str) -> io::Result<()> {
    use io::Write;

    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{message}")
}

/// Test helpers for asserting on emitted telemetry.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::{TelemetryEvent, TelemetrySink};

    /// Sink that stores every recorded event for later inspection.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        events: std::sync::Mutex<Vec<TelemetryEvent>>,
    }

    impl RecordingSink {
        /// Drains and returns the recorded events.
        ///
        /// # Panics
        ///
        /// Panics if the internal mutex has been poisoned by another test
        /// thread.
        pub fn take(&self) -> Vec<TelemetryEvent> {
            self.events
                .lock()
                .expect("events mutex should be available")
                .drain(..)
                .collect()
        }
    }

    impl TelemetrySink for RecordingSink {
        fn record(&self, event: TelemetryEvent) {
            self.events
                .lock()
                .expect("events mutex should be available")
                .push(event);
        }
    }
}
