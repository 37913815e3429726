//! Sink registry
//!
//! The set of selectable sinks is closed: each one is a variant of
//! [`SinkKind`], and [`RegisteredSink`] holds the matching instance. Selection
//! is a pure function of the configuration.

use crate::config::Config;
use crate::error::SinkError;
use crate::event::Event;
use crate::sink::{DefaultSink, GraphSink, Sink};
use async_trait::async_trait;

/// Every sink this build knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Default,
    Graph,
}

impl SinkKind {
    pub const ALL: [SinkKind; 2] = [SinkKind::Default, SinkKind::Graph];

    /// Stable name used in config and logs
    pub fn name(&self) -> &'static str {
        match self {
            SinkKind::Default => "default",
            SinkKind::Graph => "graph",
        }
    }

    /// Look up a sink by its stable name
    pub fn from_name(name: &str) -> Option<SinkKind> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Pick exactly one sink; falls back to the default sink
    pub fn select(config: &Config) -> SinkKind {
        let graph = &config.handler.graph;
        if graph.enabled && !graph.endpoint.is_empty() {
            SinkKind::Graph
        } else {
            SinkKind::Default
        }
    }

    /// Fresh, uninitialized instance of this sink
    pub fn build(&self) -> RegisteredSink {
        match self {
            SinkKind::Default => RegisteredSink::Default(DefaultSink::new()),
            SinkKind::Graph => RegisteredSink::Graph(GraphSink::new()),
        }
    }
}

/// An instance of one registered sink
pub enum RegisteredSink {
    Default(DefaultSink),
    Graph(GraphSink),
}

impl RegisteredSink {
    pub fn kind(&self) -> SinkKind {
        match self {
            RegisteredSink::Default(_) => SinkKind::Default,
            RegisteredSink::Graph(_) => SinkKind::Graph,
        }
    }

    pub fn as_graph(&self) -> Option<&GraphSink> {
        match self {
            RegisteredSink::Graph(sink) => Some(sink),
            _ => None,
        }
    }
}

#[async_trait]
impl Sink for RegisteredSink {
    fn name(&self) -> &'static str {
        match self {
            RegisteredSink::Default(sink) => sink.name(),
            RegisteredSink::Graph(sink) => sink.name(),
        }
    }

    async fn init(&mut self, config: &Config) -> Result<(), SinkError> {
        match self {
            RegisteredSink::Default(sink) => sink.init(config).await,
            RegisteredSink::Graph(sink) => sink.init(config).await,
        }
    }

    async fn handle(&self, event: &Event) {
        match self {
            RegisteredSink::Default(sink) => sink.handle(event).await,
            RegisteredSink::Graph(sink) => sink.handle(event).await,
        }
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        match self {
            RegisteredSink::Default(sink) => sink.close().await,
            RegisteredSink::Graph(sink) => sink.close().await,
        }
    }
}
