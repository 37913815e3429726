//! Graph sink
//!
//! Projects every Event into a property graph held in a Gremlin-compatible
//! store (see [`model`] for the shape). Each event runs three writes in order,
//! stopping at the first failure:
//!
//! 1. upsert the `Resource` vertex
//! 2. create the `Event` vertex
//! 3. link them with `HAS_EVENT`
//!
//! A failed write is logged and counted; the event is dropped.
//!
//! # Example
//!
//! ```ignore
//! let mut sink = GraphSink::new();
//! sink.init(&config).await?;
//! sink.handle(&event).await;
//! sink.close().await?;
//! ```

pub mod model;
pub mod settings;

use crate::config::{Config, GraphConfig};
use crate::error::{GraphError, SinkError, Step};
use crate::event::Event;
use crate::gremlin::GremlinClient;
use crate::metrics;
use crate::sink::Sink;
use crate::store::GraphStore;
use async_trait::async_trait;
use chrono::Utc;
use std::env;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub use settings::GraphSettings;

/// Number of resource lock stripes
const LOCK_STRIPES: usize = 16;

/// Sink that writes events into a property graph
pub struct GraphSink {
    /// Settings resolved by the last `init`, kept even if connecting failed
    settings: Option<GraphSettings>,
    /// Store handle; `None` until `init` succeeds
    store: Option<Arc<dyn GraphStore>>,
    /// Serializes the exists-then-create upsert per resource identity
    stripes: Vec<Mutex<()>>,
}

impl GraphSink {
    /// Create an uninitialized sink
    pub fn new() -> Self {
        Self {
            settings: None,
            store: None,
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Create a sink already bound to a store, skipping `init`
    pub fn with_store(store: Arc<dyn GraphStore>) -> Self {
        let mut sink = Self::new();
        sink.store = Some(store);
        sink
    }

    /// Settings resolved by the last `init` call
    pub fn settings(&self) -> Option<&GraphSettings> {
        self.settings.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    /// Resolve, validate and connect with a custom environment lookup
    pub async fn init_with<F>(&mut self, config: &GraphConfig, lookup: F) -> Result<(), SinkError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // a re-init starts disconnected; the old session is released first
        if let Some(previous) = self.store.take() {
            match previous.close().await {
                Ok(()) => debug!(store = previous.name(), "Closed previous graph connection"),
                Err(e) => warn!(
                    store = previous.name(),
                    error = %e,
                    "Failed to close previous graph connection"
                ),
            }
        }

        let settings = GraphSettings::resolve_with(config, lookup);
        self.settings = Some(settings.clone());
        settings.validate()?;

        let client = GremlinClient::connect(settings.gremlin_options())
            .await
            .map_err(SinkError::Connection)?;

        info!(
            endpoint = %settings.endpoint,
            region = %settings.region,
            traversal_source = %settings.traversal_source,
            timeout_secs = settings.timeout.as_secs(),
            "Connected to graph store"
        );

        self.store = Some(Arc::new(client));
        Ok(())
    }

    fn stripe(&self, resource_id: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        resource_id.hash(&mut hasher);
        &self.stripes[(hasher.finish() as usize) % self.stripes.len()]
    }

    /// Run the three writes for one event, returning the first failure
    pub async fn materialize(&self, event: &Event) -> Result<(), SinkError> {
        let Some(store) = self.store.as_deref() else {
            return Err(SinkError::Operation {
                step: Step::ResourceUpsert,
                resource: model::resource_id(event),
                source: GraphError::Closed,
            });
        };

        let resource_id = model::resource_id(event);
        let fail = |step: Step| {
            let resource = resource_id.clone();
            move |source: GraphError| SinkError::Operation {
                step,
                resource,
                source,
            }
        };

        self.upsert_resource(store, event, &resource_id)
            .await
            .map_err(fail(Step::ResourceUpsert))?;

        // captured once so the edge targets the vertex created here
        let captured = Utc::now();
        let event_id = model::event_id(event, captured);
        store
            .add_vertex(
                model::EVENT_LABEL,
                &event_id,
                &model::event_properties(event, captured),
            )
            .await
            .map_err(fail(Step::EventCreate))?;

        store
            .add_edge(
                model::HAS_EVENT_LABEL,
                &resource_id,
                &event_id,
                &model::edge_properties(Utc::now()),
            )
            .await
            .map_err(fail(Step::RelationshipCreate))?;

        debug!(resource = %resource_id, event = %event_id, "Event stored in graph");
        Ok(())
    }

    async fn upsert_resource(
        &self,
        store: &dyn GraphStore,
        event: &Event,
        resource_id: &str,
    ) -> Result<(), GraphError> {
        let _guard = self.stripe(resource_id).lock().await;
        let now = Utc::now();

        if store.vertex_exists(resource_id).await? {
            store
                .set_property(resource_id, model::LAST_UPDATED, now.timestamp().into())
                .await
        } else {
            store
                .add_vertex(
                    model::RESOURCE_LABEL,
                    resource_id,
                    &model::resource_properties(event, now),
                )
                .await
        }
    }
}

impl Default for GraphSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for GraphSink {
    fn name(&self) -> &'static str {
        "graph"
    }

    async fn init(&mut self, config: &Config) -> Result<(), SinkError> {
        self.init_with(&config.handler.graph, |key| env::var(key).ok())
            .await
    }

    async fn handle(&self, event: &Event) {
        if self.store.is_none() {
            error!("Graph sink not properly initialized");
            return;
        }

        match self.materialize(event).await {
            Ok(()) => {
                info!(
                    namespace = %event.namespace,
                    name = %event.name,
                    "Stored event in graph"
                );
            }
            Err(SinkError::Operation {
                step,
                resource,
                source,
            }) => {
                metrics::try_record_step_failure(step.as_str());
                error!(
                    step = %step,
                    resource = %resource,
                    reason = %event.reason,
                    error = %source,
                    "Failed to store event in graph"
                );
            }
            Err(e) => {
                error!(error = %e, "Failed to store event in graph");
            }
        }
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        let Some(store) = self.store.take() else {
            return Ok(());
        };
        store.close().await.map_err(SinkError::Close)?;
        info!(store = store.name(), "Graph connection closed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{MemoryGraph, PropertyValue};
    use std::sync::atomic::{AtomicU32, Ordering};

    const ENDPOINT: &str = "wss://test.neptune.amazonaws.com:8182/gremlin";

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn pod(name: &str, reason: &str) -> Event {
        Event::new("Pod", "production", name, reason, "update")
    }

    fn memory_sink() -> (Arc<MemoryGraph>, GraphSink) {
        let graph = Arc::new(MemoryGraph::new());
        let sink = GraphSink::with_store(Arc::clone(&graph) as Arc<dyn GraphStore>);
        (graph, sink)
    }

    /// Store that fails every write of one kind, delegating the rest
    struct FailingStore {
        inner: MemoryGraph,
        fail_label: &'static str,
        calls: AtomicU32,
    }

    #[async_trait]
    impl GraphStore for FailingStore {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn vertex_exists(&self, id: &str) -> Result<bool, GraphError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.vertex_exists(id).await
        }

        async fn add_vertex(
            &self,
            label: &str,
            id: &str,
            properties: &[(&'static str, PropertyValue)],
        ) -> Result<(), GraphError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if label == self.fail_label {
                return Err(GraphError::Server {
                    code: 500,
                    message: "injected".into(),
                });
            }
            self.inner.add_vertex(label, id, properties).await
        }

        async fn set_property(
            &self,
            id: &str,
            key: &'static str,
            value: PropertyValue,
        ) -> Result<(), GraphError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.set_property(id, key, value).await
        }

        async fn add_edge(
            &self,
            label: &str,
            from: &str,
            to: &str,
            properties: &[(&'static str, PropertyValue)],
        ) -> Result<(), GraphError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.add_edge(label, from, to, properties).await
        }
    }

    #[tokio::test]
    async fn test_init_missing_endpoint() {
        let mut sink = GraphSink::new();
        let config = GraphConfig {
            region: "us-east-1".into(),
            ..Default::default()
        };
        let err = sink.init_with(&config, no_env).await.unwrap_err();
        assert!(matches!(err, SinkError::Config(ref msg) if msg.contains("Missing Neptune endpoint")));
        assert!(!sink.is_connected());
    }

    #[tokio::test]
    async fn test_failed_reinit_releases_previous_store() {
        let (graph, mut sink) = memory_sink();
        let config = GraphConfig {
            region: "us-east-1".into(),
            ..Default::default()
        };

        let err = sink.init_with(&config, no_env).await.unwrap_err();
        assert!(matches!(err, SinkError::Config(_)));
        assert!(!sink.is_connected());
        assert!(graph.is_closed());

        sink.handle(&pod("web", "Created")).await;
        assert_eq!(graph.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_reinit_closes_previous_store_before_connecting() {
        let (graph, mut sink) = memory_sink();
        sink.handle(&pod("web", "Created")).await;
        assert_eq!(graph.mutation_count(), 3);

        let config = GraphConfig {
            endpoint: "ws://127.0.0.1:1/gremlin".into(),
            region: "us-east-1".into(),
            ..Default::default()
        };
        let err = sink.init_with(&config, no_env).await.unwrap_err();
        assert!(matches!(err, SinkError::Connection(_)));
        assert!(graph.is_closed());
        assert!(!sink.is_connected());
        assert_eq!(
            sink.settings().map(|s| s.endpoint.as_str()),
            Some("ws://127.0.0.1:1/gremlin")
        );
    }

    #[tokio::test]
    async fn test_init_missing_region() {
        let mut sink = GraphSink::new();
        let config = GraphConfig {
            endpoint: ENDPOINT.into(),
            ..Default::default()
        };
        let err = sink.init_with(&config, no_env).await.unwrap_err();
        assert!(matches!(err, SinkError::Config(ref msg) if msg.contains("Missing AWS region")));
    }

    #[tokio::test]
    async fn test_init_connection_failure_keeps_defaults() {
        let mut sink = GraphSink::new();
        let config = GraphConfig {
            endpoint: "ws://127.0.0.1:1/gremlin".into(),
            region: "us-east-1".into(),
            ..Default::default()
        };

        let err = sink.init_with(&config, no_env).await.unwrap_err();
        assert!(matches!(err, SinkError::Connection(_)));
        assert!(err.to_string().starts_with("failed to connect to Neptune"));
        assert!(!sink.is_connected());

        let settings = sink.settings().unwrap();
        assert_eq!(settings.traversal_source, "g");
        assert_eq!(settings.timeout, std::time::Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_init_keeps_explicit_timeout() {
        let mut sink = GraphSink::new();
        let config = GraphConfig {
            endpoint: "ws://127.0.0.1:1/gremlin".into(),
            region: "us-east-1".into(),
            timeout: 60,
            ..Default::default()
        };
        let _ = sink.init_with(&config, no_env).await;

        let settings = sink.settings().unwrap();
        assert_eq!(settings.timeout, std::time::Duration::from_secs(60));
        assert_eq!(settings.traversal_source, "g");
    }

    #[tokio::test]
    async fn test_handle_uninitialized_is_noop() {
        let sink = GraphSink::new();
        // logs, must not panic
        sink.handle(&pod("test-pod", "Created")).await;
        assert!(sink.materialize(&pod("test-pod", "Created")).await.is_err());
    }

    #[tokio::test]
    async fn test_first_event_creates_resource_event_and_edge() {
        let (graph, sink) = memory_sink();
        sink.handle(&pod("nginx-pod", "Created")).await;

        let resource = graph.vertex("Pod:production:nginx-pod").unwrap();
        assert_eq!(resource.label, "Resource");
        assert_eq!(resource.property("kind"), Some(&PropertyValue::from("Pod")));
        assert_eq!(
            resource.property("createdAt"),
            resource.property(model::LAST_UPDATED)
        );

        let events = graph.vertex_ids(model::EVENT_LABEL);
        assert_eq!(events.len(), 1);
        assert!(events[0].starts_with("event:nginx-pod:"));

        let event = graph.vertex(&events[0]).unwrap();
        assert_eq!(event.property("reason"), Some(&PropertyValue::from("Created")));

        let edges = graph.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].label, "HAS_EVENT");
        assert_eq!(edges[0].from, "Pod:production:nginx-pod");
        assert_eq!(edges[0].to, events[0]);
    }

    #[tokio::test]
    async fn test_repeat_events_collapse_onto_one_resource() {
        let (graph, sink) = memory_sink();

        sink.handle(&pod("web", "Created")).await;
        let first = graph.vertex("Pod:production:web").unwrap();

        sink.handle(&pod("web", "Updated")).await;
        let second = graph.vertex("Pod:production:web").unwrap();

        assert_eq!(graph.vertex_ids(model::RESOURCE_LABEL).len(), 1);
        assert_eq!(first.property("createdAt"), second.property("createdAt"));

        let before = first.property(model::LAST_UPDATED).and_then(PropertyValue::as_long);
        let after = second.property(model::LAST_UPDATED).and_then(PropertyValue::as_long);
        assert!(after >= before);

        assert_eq!(graph.vertex_ids(model::EVENT_LABEL).len(), 2);
        assert_eq!(graph.edge_count(), 2);
    }

    #[tokio::test]
    async fn test_event_create_failure_stops_before_edge() {
        let store = Arc::new(FailingStore {
            inner: MemoryGraph::new(),
            fail_label: model::EVENT_LABEL,
            calls: AtomicU32::new(0),
        });
        let sink = GraphSink::with_store(Arc::clone(&store) as Arc<dyn GraphStore>);

        let err = sink.materialize(&pod("web", "Created")).await.unwrap_err();
        assert!(matches!(
            err,
            SinkError::Operation { step: Step::EventCreate, ref resource, .. } if resource == "Pod:production:web"
        ));

        // exists + add resource + failed add event, no edge attempt
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.inner.edge_count(), 0);

        // handle swallows the same failure
        sink.handle(&pod("web", "Updated")).await;
        assert_eq!(store.inner.edge_count(), 0);
    }

    #[tokio::test]
    async fn test_resource_failure_stops_everything() {
        let store = Arc::new(FailingStore {
            inner: MemoryGraph::new(),
            fail_label: model::RESOURCE_LABEL,
            calls: AtomicU32::new(0),
        });
        let sink = GraphSink::with_store(Arc::clone(&store) as Arc<dyn GraphStore>);

        let err = sink.materialize(&pod("web", "Created")).await.unwrap_err();
        assert!(matches!(
            err,
            SinkError::Operation { step: Step::ResourceUpsert, .. }
        ));
        assert_eq!(store.inner.vertex_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_events_share_one_resource() {
        let (graph, sink) = memory_sink();
        let sink = Arc::new(sink);

        let mut handles = Vec::new();
        for i in 0..8 {
            let sink = Arc::clone(&sink);
            handles.push(tokio::spawn(async move {
                sink.handle(&pod("web", &format!("Update{i}"))).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(graph.vertex_ids(model::RESOURCE_LABEL).len(), 1);
        assert_eq!(graph.edge_count(), graph.vertex_ids(model::EVENT_LABEL).len());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut never_opened = GraphSink::new();
        never_opened.close().await.unwrap();

        let (graph, mut sink) = memory_sink();
        sink.close().await.unwrap();
        sink.close().await.unwrap();
        assert!(graph.is_closed());
        assert!(!sink.is_connected());

        // handle after close is a no-op
        sink.handle(&pod("web", "Created")).await;
        assert_eq!(graph.mutation_count(), 0);
    }
}
