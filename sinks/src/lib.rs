//! kubewatch sinks - pluggable destinations for cluster events
//!
//! The watcher turns every change to a cluster resource into an [`Event`] and
//! hands it to exactly one sink. The graph sink projects events into a
//! property graph held in a Gremlin-compatible store.
//!
//! # Architecture
//!
//! ```text
//! Event source ──► dispatch ──► RegisteredSink ──► GraphSink ──► GraphStore
//!                                              └─► DefaultSink   (Gremlin / memory)
//! ```

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod gremlin;
pub mod metrics;
pub mod registry;
pub mod sink;
pub mod store;

pub use config::Config;
pub use error::{GraphError, KubewatchError, Result, SinkError, Step};
pub use event::Event;
pub use registry::{RegisteredSink, SinkKind};
pub use sink::{DefaultSink, GraphSink, Sink};
pub use store::{GraphStore, MemoryGraph, PropertyValue};
