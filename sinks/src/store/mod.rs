//! Graph store abstraction
//!
//! The graph sink only needs four primitives from a property-graph store:
//! an existence check, vertex creation, single-property update and edge
//! creation. Anything that can do those can back the sink.
//!
//! # Example
//!
//! ```ignore
//! struct MyStore { client: MyGraphClient }
//!
//! #[async_trait]
//! impl GraphStore for MyStore {
//!     async fn vertex_exists(&self, id: &str) -> Result<bool, GraphError> {
//!         self.client.has_vertex(id).await
//!     }
//!     // ...
//! }
//! ```

pub mod memory;

use crate::error::GraphError;
use async_trait::async_trait;
use std::fmt;

pub use memory::MemoryGraph;

/// A typed property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    String(String),
    Long(i64),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            PropertyValue::Long(_) => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            PropertyValue::Long(n) => Some(*n),
            PropertyValue::String(_) => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Long(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Long(n)
    }
}

/// Property list attached to a new vertex or edge
pub type Properties = Vec<(&'static str, PropertyValue)>;

/// Property-graph store used by the graph sink
///
/// Vertex identities are caller-chosen strings. Implementations must not
/// create a vertex twice for the same identity and must reject edges whose
/// endpoints do not exist.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Store name for identification and logging
    fn name(&self) -> &'static str;

    /// Whether a vertex with this identity exists
    async fn vertex_exists(&self, id: &str) -> Result<bool, GraphError>;

    /// Create a vertex with the given label, identity and properties
    async fn add_vertex(
        &self,
        label: &str,
        id: &str,
        properties: &[(&'static str, PropertyValue)],
    ) -> Result<(), GraphError>;

    /// Replace a single property on an existing vertex
    async fn set_property(
        &self,
        id: &str,
        key: &'static str,
        value: PropertyValue,
    ) -> Result<(), GraphError>;

    /// Create a directed edge between two existing vertices
    async fn add_edge(
        &self,
        label: &str,
        from: &str,
        to: &str,
        properties: &[(&'static str, PropertyValue)],
    ) -> Result<(), GraphError>;

    /// Release the underlying connection. Calling it again is a no-op.
    async fn close(&self) -> Result<(), GraphError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_value_conversions() {
        assert_eq!(PropertyValue::from("pod"), PropertyValue::String("pod".into()));
        assert_eq!(PropertyValue::from(42_i64).as_long(), Some(42));
        assert_eq!(PropertyValue::from("x").as_long(), None);
        assert_eq!(PropertyValue::from(7_i64).to_string(), "7");
    }
}
