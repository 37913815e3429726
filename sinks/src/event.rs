//! Event type for kubewatch sinks
//!
//! An `Event` describes one change to a watched cluster resource. It is produced
//! by the event source, handed to exactly one sink, and never mutated.

use serde::{Deserialize, Serialize};

/// Kinds that live outside any namespace
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "namespace",
    "node",
    "cluster role",
    "cluster role binding",
    "persistent volume",
];

/// One observed change to a cluster resource
///
/// # Example
///
/// ```
/// use kubewatch_sinks::event::Event;
///
/// let event = Event::new("Pod", "production", "nginx-pod", "Created", "create");
/// assert_eq!(event.resource_id(), "Pod:production:nginx-pod");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Resource kind (e.g. "Pod", "Deployment")
    pub kind: String,

    /// Namespace of the resource, empty for cluster-scoped kinds
    #[serde(default)]
    pub namespace: String,

    /// Resource name
    pub name: String,

    /// Why the event happened (e.g. "Created", "Updated", "Deleted")
    #[serde(default)]
    pub reason: String,

    /// Watcher action that produced the event (e.g. "create")
    #[serde(default)]
    pub action: String,
}

impl Event {
    /// Create an Event with all fields specified
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            reason: reason.into(),
            action: action.into(),
        }
    }

    /// Composite identity of the resource this event is about
    ///
    /// Always `Kind:Namespace:Name`, even when the namespace is empty.
    pub fn resource_id(&self) -> String {
        format!("{}:{}:{}", self.kind, self.namespace, self.name)
    }

    /// Whether the event's kind is cluster-scoped
    pub fn is_cluster_scoped(&self) -> bool {
        let kind = self.kind.to_lowercase();
        CLUSTER_SCOPED_KINDS.contains(&kind.as_str())
    }

    /// Human-readable description of the change
    pub fn message(&self) -> String {
        if self.is_cluster_scoped() {
            format!(
                "A `{}` `{}` has been `{}`",
                self.kind.to_lowercase(),
                self.name,
                self.reason
            )
        } else {
            format!(
                "A `{}` in namespace `{}` has been `{}`:\n`{}`",
                self.kind.to_lowercase(),
                self.namespace,
                self.reason,
                self.name
            )
        }
    }
}
