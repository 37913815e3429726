//! Default sink
//!
//! Selected when no specific sink is enabled. Accepts every event and only
//! logs it at debug level.

use crate::config::Config;
use crate::error::SinkError;
use crate::event::Event;
use crate::sink::Sink;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// No-op sink
#[derive(Debug, Default)]
pub struct DefaultSink {
    /// Count of events handled
    handled_count: AtomicU64,
}

impl DefaultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total events handled
    pub fn handled_count(&self) -> u64 {
        self.handled_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Sink for DefaultSink {
    fn name(&self) -> &'static str {
        "default"
    }

    async fn init(&mut self, _config: &Config) -> Result<(), SinkError> {
        Ok(())
    }

    async fn handle(&self, event: &Event) {
        debug!(
            kind = %event.kind,
            namespace = %event.namespace,
            name = %event.name,
            reason = %event.reason,
            "Event received"
        );
        self.handled_count.fetch_add(1, Ordering::Relaxed);
    }
}
