//! Error types for kubewatch sinks

use thiserror::Error;

/// Result type alias for top-level kubewatch operations
pub type Result<T> = std::result::Result<T, KubewatchError>;

/// Main error type for the kubewatch binary and bootstrap
#[derive(Error, Debug)]
pub enum KubewatchError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Sink error
    #[error("sink '{sink}' error: {source}")]
    Sink {
        sink: &'static str,
        #[source]
        source: SinkError,
    },

    /// Metrics error
    #[error("metrics error: {0}")]
    Metrics(String),
}

/// Error type for sink operations
#[derive(Error, Debug)]
pub enum SinkError {
    /// Required settings are missing; the message carries setup instructions
    #[error("{0}")]
    Config(String),

    /// The graph store could not be reached
    #[error("failed to connect to Neptune: {0}")]
    Connection(#[source] GraphError),

    /// A graph mutation failed while handling an event
    #[error("{step} failed for {resource}: {source}")]
    Operation {
        step: Step,
        resource: String,
        #[source]
        source: GraphError,
    },

    /// Releasing the connection failed
    #[error("failed to close graph connection: {0}")]
    Close(#[source] GraphError),
}

/// The write steps performed for every handled event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Create or refresh the resource vertex
    ResourceUpsert,
    /// Create the event vertex
    EventCreate,
    /// Link resource to event
    RelationshipCreate,
}

impl Step {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::ResourceUpsert => "resource_upsert",
            Step::EventCreate => "event_create",
            Step::RelationshipCreate => "relationship_create",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for graph store operations
#[derive(Error, Debug)]
pub enum GraphError {
    /// Endpoint is not a usable websocket URL
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Websocket transport error
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// TLS setup error
    #[error("TLS error: {0}")]
    Tls(String),

    /// Connect or request exceeded the configured timeout
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The server answered with a non-success status
    #[error("server returned {code}: {message}")]
    Server { code: u16, message: String },

    /// The server sent something we could not understand
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A mutation matched nothing
    #[error("mutation returned no result")]
    EmptyResult,

    /// The connection was already closed
    #[error("connection closed")]
    Closed,

    /// A vertex with this identity already exists
    #[error("vertex '{0}' already exists")]
    VertexExists(String),

    /// No vertex with this identity exists
    #[error("vertex '{0}' not found")]
    VertexNotFound(String),
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        GraphError::Protocol(err.to_string())
    }
}

impl KubewatchError {
    /// Attach the sink name to a sink error
    pub fn sink(sink: &'static str, source: SinkError) -> Self {
        KubewatchError::Sink { sink, source }
    }
}
