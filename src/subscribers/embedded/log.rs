//! # LogWriter: structured event printer
//!
//! A subscriber that turns every [`Event`] into a `tracing` record. The
//! binary installs a `tracing-subscriber` formatter; library users route the
//! records wherever their own subscriber sends them.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO safevax: [SYSTEM] Registered Hospital-1 (max V:21 S:17 T:3) seq=2 kind=LOG
//! INFO safevax: status seq=9 kind=STATUS hospital=Hospital-1 status=Requesting: V:4 S:9 T:1
//! INFO safevax: [GRANTED] Hospital-1 request V:4 S:9 T:1 approved. Safe sequence: ... seq=10 kind=LOG
//! WARN safevax: [RISKY] Hospital-3 granted V:2 S:1 T:1 with safety check OFF seq=57 kind=LOG risky=true
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, LogLevel, Payload};
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

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let seq = e.seq;
        let kind = e.kind.as_tag();
        let hospital = e.subject.as_deref().unwrap_or("-");

        match &e.payload {
            Payload::Log { level, text } => match level {
                LogLevel::Info => info!(target: "safevax", seq, kind, "{text}"),
                LogLevel::Warn => warn!(target: "safevax", seq, kind, "{text}"),
                LogLevel::Risk => warn!(target: "safevax", seq, kind, risky = true, "{text}"),
            },
            Payload::Status(status) => {
                info!(target: "safevax", seq, kind, hospital, status = %status, "status");
            }
            Payload::Available(available) => {
                debug!(target: "safevax", seq, kind, available = %available, "pool");
            }
            Payload::Allocated(allocated) => {
                debug!(target: "safevax", seq, kind, hospital, allocated = %allocated, "holdings");
            }
            Payload::Init { max, allocated } => {
                info!(
                    target: "safevax",
                    seq,
                    kind,
                    hospital,
                    max = %max,
                    allocated = %allocated,
                    "hospital"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
