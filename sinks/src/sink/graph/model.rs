//! Graph projection of an Event
//!
//! ```text
//! (Resource {kind,name,namespace,createdAt,lastUpdated})
//!      │
//!      └──HAS_EVENT {timestamp}──► (Event {kind,name,namespace,reason,message,timestamp})
//! ```
//!
//! Resource vertices are keyed `Kind:Namespace:Name` and upserted. Event
//! vertices are keyed `event:<Name>:<unix nanos>` and always created.

use crate::event::Event;
use crate::store::Properties;
use chrono::{DateTime, Utc};

pub const RESOURCE_LABEL: &str = "Resource";
pub const EVENT_LABEL: &str = "Event";
pub const HAS_EVENT_LABEL: &str = "HAS_EVENT";

pub const LAST_UPDATED: &str = "lastUpdated";

/// Identity of the resource vertex for this event
pub fn resource_id(event: &Event) -> String {
    event.resource_id()
}

/// Identity of the event vertex captured at `at`
pub fn event_id(event: &Event, at: DateTime<Utc>) -> String {
    format!(
        "event:{}:{}",
        event.name,
        at.timestamp_nanos_opt().unwrap_or(0)
    )
}

/// Properties of a newly created resource vertex
pub fn resource_properties(event: &Event, now: DateTime<Utc>) -> Properties {
    let secs = now.timestamp();
    vec![
        ("kind", event.kind.as_str().into()),
        ("name", event.name.as_str().into()),
        ("namespace", event.namespace.as_str().into()),
        ("createdAt", secs.into()),
        (LAST_UPDATED, secs.into()),
    ]
}

/// Properties of an event vertex
pub fn event_properties(event: &Event, now: DateTime<Utc>) -> Properties {
    vec![
        ("kind", event.kind.as_str().into()),
        ("name", event.name.as_str().into()),
        ("namespace", event.namespace.as_str().into()),
        ("reason", event.reason.as_str().into()),
        ("message", event.message().into()),
        ("timestamp", now.timestamp().into()),
    ]
}

/// Properties of a HAS_EVENT edge
pub fn edge_properties(now: DateTime<Utc>) -> Properties {
    vec![("timestamp", now.timestamp().into())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PropertyValue;
    use chrono::TimeZone;

    fn at(nanos: i64) -> DateTime<Utc> {
        Utc.timestamp_nanos(nanos)
    }

    #[test]
    fn test_event_id_uses_name_and_nanos() {
        let event = Event::new("Pod", "default", "web", "Created", "create");
        assert_eq!(
            event_id(&event, at(1_700_000_000_123_456_789)),
            "event:web:1700000000123456789"
        );
    }

    #[test]
    fn test_resource_properties_set_both_timestamps() {
        let event = Event::new("Pod", "default", "web", "Created", "create");
        let props = resource_properties(&event, at(1_700_000_000_000_000_000));
        let get = |k: &str| props.iter().find(|(key, _)| *key == k).map(|(_, v)| v.clone());

        assert_eq!(get("kind"), Some(PropertyValue::from("Pod")));
        assert_eq!(get("createdAt"), Some(PropertyValue::Long(1_700_000_000)));
        assert_eq!(get(LAST_UPDATED), Some(PropertyValue::Long(1_700_000_000)));
    }

    #[test]
    fn test_event_properties_include_message() {
        let event = Event::new("Pod", "default", "web", "Created", "create");
        let props = event_properties(&event, at(0));
        let keys: Vec<&str> = props.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec!["kind", "name", "namespace", "reason", "message", "timestamp"]
        );
        assert_eq!(props[4].1, PropertyValue::String(event.message()));
    }
}
