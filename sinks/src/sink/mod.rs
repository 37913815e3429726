//! Sink system for kubewatch
//!
//! A sink receives every Event the watcher observes. Exactly one sink is
//! selected from configuration (see [`crate::registry`]).

pub mod default;
pub mod graph;

use crate::config::Config;
use crate::error::SinkError;
use crate::event::Event;
use async_trait::async_trait;

pub use default::DefaultSink;
pub use graph::GraphSink;

/// Sink trait - consumes Events
///
/// `init` must validate configuration and acquire external resources before
/// returning `Ok`. `handle` is fire-and-forget: failures are logged, never
/// returned, and calling it on a sink whose `init` failed is a no-op.
///
/// # Example
///
/// ```ignore
/// struct MyDestinationSink {
///     client: Option<MyClient>,
/// }
///
/// #[async_trait]
/// impl Sink for MyDestinationSink {
///     fn name(&self) -> &'static str { "my-destination" }
///
///     async fn init(&mut self, config: &Config) -> Result<(), SinkError> {
///         self.client = Some(MyClient::connect(&config.handler.mine).await?);
///         Ok(())
///     }
///
///     async fn handle(&self, event: &Event) {
///         let Some(client) = &self.client else { return };
///         if let Err(e) = client.send(event).await {
///             tracing::error!(error = %e, "Failed to send event");
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Sink: Send + Sync {
    /// Sink name for identification and logging
    fn name(&self) -> &'static str;

    /// Validate configuration and acquire resources
    async fn init(&mut self, config: &Config) -> Result<(), SinkError>;

    /// Process one event
    async fn handle(&self, event: &Event);

    /// Release resources
    ///
    /// Must be idempotent. Callers stop calling `handle` before closing.
    async fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
