//! Dispatch - selects one sink and feeds it events
//!
//! ```text
//! NDJSON lines ──► Event ──► RegisteredSink::handle
//! ```
//!
//! Events are delivered one at a time, in input order.

use crate::config::Config;
use crate::error::{KubewatchError, Result};
use crate::event::Event;
use crate::metrics;
use crate::registry::{RegisteredSink, SinkKind};
use crate::sink::Sink;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// Counters returned when the input ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events passed to the sink
    pub handled: u64,
    /// Lines that were not valid events
    pub skipped: u64,
}

/// Select and initialize the configured sink
///
/// An init failure aborts startup.
pub async fn start(config: &Config) -> Result<RegisteredSink> {
    let kind = SinkKind::select(config);
    let mut sink = kind.build();

    sink.init(config)
        .await
        .map_err(|e| KubewatchError::sink(kind.name(), e))?;

    info!(sink = kind.name(), "Sink initialized");
    Ok(sink)
}

/// Feed newline-delimited JSON events to `sink` until the reader is exhausted
pub async fn run<S, R>(sink: &S, reader: R) -> Result<DispatchStats>
where
    S: Sink + ?Sized,
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = DispatchStats::default();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: Event = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Skipping malformed event");
                stats.skipped += 1;
                continue;
            }
        };

        debug!(resource = %event.resource_id(), reason = %event.reason, "Dispatching event");
        sink.handle(&event).await;
        metrics::try_record_handled(sink.name());
        stats.handled += 1;
    }

    info!(
        handled = stats.handled,
        skipped = stats.skipped,
        "Event input closed"
    );
    Ok(stats)
}
