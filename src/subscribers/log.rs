//! # LogWriter: event mirror into `tracing`
//!
//! A minimal subscriber that writes every [`Event`] as a `tracing` record. Severity
//! follows the event status: `success` → `debug`, `warning` → `warn`, `error` → `error`.
//! Use it for demos and debugging sessions (the host decides where records go by
//! installing a `tracing` subscriber).
//!
//! ## Example output
//! ```text
//! DEBUG adbreak: event name="AD_SDK_LOADER_READY" message="https://pubads..." seq=4
//! DEBUG adbreak: event name="LOADED" message="video/mp4" seq=9
//!  WARN adbreak: event name="AD_SAFETY_TIMER" message="Advertisement took too long to load." seq=10
//!  WARN adbreak: event name="AD_SDK_CANCELED" message="Advertisement has been canceled." attempt=1
//! ```

use crate::events::{Event, EventStatus};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for LogWriter {
    fn on_event(&self, e: &Event) {
        let attempt = e.attempt.unwrap_or_default();
        match e.status {
            EventStatus::Success => {
                tracing::debug!(target: "adbreak", name = e.name(), message = %e.message, seq = e.seq, attempt, "event");
            }
            EventStatus::Warning => {
                tracing::warn!(target: "adbreak", name = e.name(), message = %e.message, seq = e.seq, attempt, "event");
            }
            EventStatus::Error => {
                tracing::error!(target: "adbreak", name = e.name(), message = %e.message, seq = e.seq, attempt, "event");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
