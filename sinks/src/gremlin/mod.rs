//! Gremlin Server wire client
//!
//! Talks to any Gremlin-compatible graph store (Amazon Neptune, JanusGraph,
//! TinkerGraph) over a websocket, submitting parameterized `eval` scripts.
//!
//! # Example
//!
//! ```ignore
//! let mut options = GremlinOptions::new("wss://cluster.example.com:8182/gremlin");
//! options.traversal_source = "g".into();
//! let client = GremlinClient::connect(options).await?;
//! let exists = client.vertex_exists("Pod:default:web").await?;
//! ```

mod client;
pub mod protocol;
mod tls;

pub use client::{DEFAULT_TIMEOUT, GremlinClient, GremlinOptions};
pub use protocol::Script;
