//! In-process property graph
//!
//! Keeps vertices and edges in memory with the same identity rules as a real
//! store. Used to run the graph sink without a server and to inspect what it
//! wrote.

use crate::error::GraphError;
use crate::store::{GraphStore, PropertyValue};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

/// A stored vertex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    pub label: String,
    pub properties: HashMap<String, PropertyValue>,
}

impl Vertex {
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

/// A stored directed edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub label: String,
    pub from: String,
    pub to: String,
    pub properties: HashMap<String, PropertyValue>,
}

#[derive(Default)]
struct Inner {
    vertices: HashMap<String, Vertex>,
    edges: Vec<Edge>,
    mutations: u64,
    closed: bool,
}

/// In-memory graph store
#[derive(Default)]
pub struct MemoryGraph {
    inner: Mutex<Inner>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a vertex
    pub fn vertex(&self, id: &str) -> Option<Vertex> {
        self.inner.lock().vertices.get(id).cloned()
    }

    /// Identities of all vertices with this label
    pub fn vertex_ids(&self, label: &str) -> Vec<String> {
        let inner = self.inner.lock();
        let mut ids: Vec<String> = inner
            .vertices
            .iter()
            .filter(|(_, v)| v.label == label)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn vertex_count(&self) -> usize {
        self.inner.lock().vertices.len()
    }

    /// Snapshot of all edges in insertion order
    pub fn edges(&self) -> Vec<Edge> {
        self.inner.lock().edges.clone()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.lock().edges.len()
    }

    /// Number of successful writes (vertex, property or edge)
    pub fn mutation_count(&self) -> u64 {
        self.inner.lock().mutations
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

fn to_map(properties: &[(&'static str, PropertyValue)]) -> HashMap<String, PropertyValue> {
    properties
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[async_trait]
impl GraphStore for MemoryGraph {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn vertex_exists(&self, id: &str) -> Result<bool, GraphError> {
        let inner = self.inner.lock();
        if inner.closed {
            return Err(GraphError::Closed);
        }
        Ok(inner.vertices.contains_key(id))
    }

    async fn add_vertex(
        &self,
        label: &str,
        id: &str,
        properties: &[(&'static str, PropertyValue)],
    ) -> Result<(), GraphError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(GraphError::Closed);
        }
        if inner.vertices.contains_key(id) {
            return Err(GraphError::VertexExists(id.to_string()));
        }
        inner.vertices.insert(
            id.to_string(),
            Vertex {
                label: label.to_string(),
                properties: to_map(properties),
            },
        );
        inner.mutations += 1;
        Ok(())
    }

    async fn set_property(
        &self,
        id: &str,
        key: &'static str,
        value: PropertyValue,
    ) -> Result<(), GraphError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(GraphError::Closed);
        }
        let vertex = inner
            .vertices
            .get_mut(id)
            .ok_or_else(|| GraphError::VertexNotFound(id.to_string()))?;
        vertex.properties.insert(key.to_string(), value);
        inner.mutations += 1;
        Ok(())
    }

    async fn add_edge(
        &self,
        label: &str,
        from: &str,
        to: &str,
        properties: &[(&'static str, PropertyValue)],
    ) -> Result<(), GraphError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(GraphError::Closed);
        }
        for endpoint in [from, to] {
            if !inner.vertices.contains_key(endpoint) {
                return Err(GraphError::VertexNotFound(endpoint.to_string()));
            }
        }
        inner.edges.push(Edge {
            label: label.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            properties: to_map(properties),
        });
        inner.mutations += 1;
        Ok(())
    }

    async fn close(&self) -> Result<(), GraphError> {
        self.inner.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_query_vertex() {
        let graph = MemoryGraph::new();
        assert!(!graph.vertex_exists("a").await.unwrap());

        graph
            .add_vertex("Resource", "a", &[("kind", "Pod".into())])
            .await
            .unwrap();

        assert!(graph.vertex_exists("a").await.unwrap());
        let v = graph.vertex("a").unwrap();
        assert_eq!(v.label, "Resource");
        assert_eq!(v.property("kind"), Some(&PropertyValue::from("Pod")));
        assert_eq!(graph.vertex_ids("Resource"), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_vertex_rejected() {
        let graph = MemoryGraph::new();
        graph.add_vertex("Resource", "a", &[]).await.unwrap();
        let err = graph.add_vertex("Resource", "a", &[]).await.unwrap_err();
        assert!(matches!(err, GraphError::VertexExists(id) if id == "a"));
        assert_eq!(graph.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_set_property_replaces_value() {
        let graph = MemoryGraph::new();
        graph
            .add_vertex("Resource", "a", &[("lastUpdated", 1_i64.into())])
            .await
            .unwrap();
        graph.set_property("a", "lastUpdated", 5_i64.into()).await.unwrap();
        assert_eq!(
            graph.vertex("a").unwrap().property("lastUpdated"),
            Some(&PropertyValue::Long(5))
        );

        let err = graph.set_property("missing", "x", 1_i64.into()).await.unwrap_err();
        assert!(matches!(err, GraphError::VertexNotFound(_)));
    }

    #[tokio::test]
    async fn test_edge_requires_both_endpoints() {
        let graph = MemoryGraph::new();
        graph.add_vertex("Resource", "r", &[]).await.unwrap();

        let err = graph.add_edge("HAS_EVENT", "r", "e", &[]).await.unwrap_err();
        assert!(matches!(err, GraphError::VertexNotFound(id) if id == "e"));

        graph.add_vertex("Event", "e", &[]).await.unwrap();
        graph.add_edge("HAS_EVENT", "r", "e", &[]).await.unwrap();
        let edges = graph.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from, "r");
        assert_eq!(edges[0].to, "e");
    }

    #[tokio::test]
    async fn test_closed_graph_rejects_calls() {
        let graph = MemoryGraph::new();
        graph.close().await.unwrap();
        graph.close().await.unwrap();
        assert!(graph.is_closed());
        assert!(matches!(
            graph.vertex_exists("a").await,
            Err(GraphError::Closed)
        ));
    }
}
