//! Websocket client for a Gremlin server
//!
//! One client owns one websocket session. Requests on that session are
//! serialized: a request is written, then frames are read until the response
//! carrying the same request id completes.

use crate::error::GraphError;
use crate::gremlin::protocol::{self, Script, status};
use crate::gremlin::tls;
use crate::metrics;
use crate::store::{GraphStore, PropertyValue};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::error::Error as WsError;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default connect and request timeout (30 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GremlinOptions {
    /// `ws://` or `wss://` URL of the Gremlin endpoint
    pub endpoint: String,
    /// Traversal source bound to `g` in every script
    pub traversal_source: String,
    /// Bound on connect and on each request round-trip
    pub timeout: Duration,
    /// Accept any server certificate
    pub tls_skip: bool,
}

impl GremlinOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            traversal_source: "g".to_string(),
            timeout: DEFAULT_TIMEOUT,
            tls_skip: false,
        }
    }
}

/// Gremlin websocket client
pub struct GremlinClient {
    /// The session; `None` once closed
    stream: Mutex<Option<WsStream>>,
    endpoint: String,
    traversal_source: String,
    timeout: Duration,
}

impl GremlinClient {
    /// Open a session to the endpoint
    ///
    /// # Errors
    /// `InvalidEndpoint` for non-websocket URLs, `Timeout` if the handshake
    /// takes longer than `options.timeout`, `Transport`/`Tls` otherwise.
    pub async fn connect(options: GremlinOptions) -> Result<Self, GraphError> {
        let connector = if options.endpoint.starts_with("wss://") {
            Connector::Rustls(Arc::new(tls::client_config(options.tls_skip)?))
        } else if options.endpoint.starts_with("ws://") {
            Connector::Plain
        } else {
            return Err(GraphError::InvalidEndpoint {
                endpoint: options.endpoint,
                reason: "expected a ws:// or wss:// URL".to_string(),
            });
        };

        let (stream, _response) = tokio::time::timeout(
            options.timeout,
            tokio_tungstenite::connect_async_tls_with_config(
                options.endpoint.as_str(),
                None,
                false,
                Some(connector),
            ),
        )
        .await
        .map_err(|_| GraphError::Timeout(options.timeout))??;

        debug!(
            endpoint = %options.endpoint,
            traversal_source = %options.traversal_source,
            "Gremlin client connected"
        );

        Ok(Self {
            stream: Mutex::new(Some(stream)),
            endpoint: options.endpoint,
            traversal_source: options.traversal_source,
            timeout: options.timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn traversal_source(&self) -> &str {
        &self.traversal_source
    }

    /// Submit a script and collect every result item
    ///
    /// Write and read share one deadline. A failed or timed-out write, or a
    /// broken connection while reading, drops the session; later calls get
    /// `Closed`. A read timeout keeps it, since late responses are skipped by
    /// request id.
    pub async fn submit(&self, script: &Script) -> Result<Vec<Value>, GraphError> {
        let request_id = Uuid::new_v4();
        let frame = protocol::encode_request(request_id, script, &self.traversal_source)?;

        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(GraphError::Closed)?;

        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.timeout;
        let sent = tokio::time::timeout_at(deadline, stream.send(Message::Binary(frame.into()))).await;

        let result = match sent {
            Ok(Ok(())) => {
                let read = tokio::time::timeout_at(
                    deadline,
                    read_response(stream, &request_id.to_string()),
                )
                .await
                .unwrap_or(Err(GraphError::Timeout(self.timeout)));
                if matches!(read, Err(GraphError::Closed | GraphError::Transport(_))) {
                    *guard = None;
                }
                read
            }
            Ok(Err(e)) => {
                *guard = None;
                Err(e.into())
            }
            Err(_) => {
                // the frame may be half written
                *guard = None;
                Err(GraphError::Timeout(self.timeout))
            }
        };
        drop(guard);
        metrics::try_record_request(script.op, started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            debug!(
                op = script.op,
                request_id = %request_id,
                error = %e,
                "Gremlin request failed"
            );
        }
        result
    }

    /// Submit a mutation; an empty result means nothing was written
    async fn mutate(&self, script: &Script) -> Result<(), GraphError> {
        let items = self.submit(script).await?;
        if items.is_empty() {
            return Err(GraphError::EmptyResult);
        }
        Ok(())
    }
}

async fn read_response(stream: &mut WsStream, request_id: &str) -> Result<Vec<Value>, GraphError> {
    let mut items = Vec::new();
    loop {
        let message = stream.next().await.ok_or(GraphError::Closed)??;
        let response = match &message {
            Message::Text(text) => protocol::decode_response(text.as_bytes())?,
            Message::Binary(body) => protocol::decode_response(body)?,
            Message::Close(_) => return Err(GraphError::Closed),
            _ => continue,
        };

        if response.request_id.as_deref() != Some(request_id) {
            warn!(
                expected = %request_id,
                got = ?response.request_id,
                "Ignoring response for another request"
            );
            continue;
        }

        match response.status.code {
            status::SUCCESS => {
                items.extend(response.items);
                return Ok(items);
            }
            status::NO_CONTENT => return Ok(items),
            status::PARTIAL_CONTENT => items.extend(response.items),
            code => {
                return Err(GraphError::Server {
                    code,
                    message: response.status.message,
                });
            }
        }
    }
}

#[async_trait]
impl GraphStore for GremlinClient {
    fn name(&self) -> &'static str {
        "gremlin"
    }

    async fn vertex_exists(&self, id: &str) -> Result<bool, GraphError> {
        let items = self.submit(&Script::vertex_exists(id)).await?;
        match items.first() {
            Some(Value::Bool(found)) => Ok(*found),
            None => Ok(false),
            Some(other) => Err(GraphError::Protocol(format!(
                "expected a boolean from hasNext(), got {other}"
            ))),
        }
    }

    async fn add_vertex(
        &self,
        label: &str,
        id: &str,
        properties: &[(&'static str, PropertyValue)],
    ) -> Result<(), GraphError> {
        self.mutate(&Script::add_vertex(label, id, properties)).await
    }

    async fn set_property(
        &self,
        id: &str,
        key: &'static str,
        value: PropertyValue,
    ) -> Result<(), GraphError> {
        self.mutate(&Script::set_property(id, key, &value)).await
    }

    async fn add_edge(
        &self,
        label: &str,
        from: &str,
        to: &str,
        properties: &[(&'static str, PropertyValue)],
    ) -> Result<(), GraphError> {
        self.mutate(&Script::add_edge(label, from, to, properties))
            .await
    }

    async fn close(&self) -> Result<(), GraphError> {
        let Some(mut stream) = self.stream.lock().await.take() else {
            return Ok(());
        };
        match stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => {
                debug!(endpoint = %self.endpoint, "Gremlin client closed");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
