//! Gremlin Server request/response codec
//!
//! Requests are `eval` ops serialized as GraphSON 3 and sent in a binary frame
//! prefixed with the mime type:
//!
//! ```text
//! [len: u8][mime type bytes][json request]
//! ```
//!
//! Script text never contains caller data: every key and value goes through
//! `bindings`.

use crate::error::GraphError;
use crate::store::PropertyValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

/// Serializer the server is asked to use
pub const MIME_TYPE: &str = "application/vnd.gremlin-v3.0+json";

/// Alias every script uses for the traversal source
const SCRIPT_ALIAS: &str = "g";

/// A parameterized Gremlin script
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    /// Operation name for logging and metrics
    pub op: &'static str,
    pub text: String,
    pub bindings: Map<String, Value>,
}

impl Script {
    fn new(op: &'static str) -> Self {
        Self {
            op,
            text: String::new(),
            bindings: Map::new(),
        }
    }

    fn bind(&mut self, name: String, value: Value) -> String {
        self.bindings.insert(name.clone(), value);
        name
    }

    /// Append `.property(kN, pN)` steps for each property
    fn push_properties(&mut self, properties: &[(&'static str, PropertyValue)]) {
        for (i, (key, value)) in properties.iter().enumerate() {
            let k = self.bind(format!("k{i}"), Value::String((*key).to_string()));
            let p = self.bind(format!("p{i}"), encode_value(value));
            self.text.push_str(&format!(".property({k}, {p})"));
        }
    }

    /// `g.V(vid).hasNext()`
    pub fn vertex_exists(id: &str) -> Self {
        let mut script = Self::new("vertex_exists");
        let vid = script.bind("vid".into(), Value::String(id.to_string()));
        script.text = format!("{SCRIPT_ALIAS}.V({vid}).hasNext()");
        script
    }

    /// `g.addV(label).property(T.id, vid)...id()`
    pub fn add_vertex(label: &str, id: &str, properties: &[(&'static str, PropertyValue)]) -> Self {
        let mut script = Self::new("add_vertex");
        let label = script.bind("label".into(), Value::String(label.to_string()));
        let vid = script.bind("vid".into(), Value::String(id.to_string()));
        script.text = format!("{SCRIPT_ALIAS}.addV({label}).property(T.id, {vid})");
        script.push_properties(properties);
        script.text.push_str(".id()");
        script
    }

    /// `g.V(vid).property(single, k0, p0).id()`
    pub fn set_property(id: &str, key: &'static str, value: &PropertyValue) -> Self {
        let mut script = Self::new("set_property");
        let vid = script.bind("vid".into(), Value::String(id.to_string()));
        let k = script.bind("k0".into(), Value::String(key.to_string()));
        let p = script.bind("p0".into(), encode_value(value));
        script.text = format!("{SCRIPT_ALIAS}.V({vid}).property(single, {k}, {p}).id()");
        script
    }

    /// `g.V(from).addE(label).to(__.V(to))...id()`
    pub fn add_edge(
        label: &str,
        from: &str,
        to: &str,
        properties: &[(&'static str, PropertyValue)],
    ) -> Self {
        let mut script = Self::new("add_edge");
        let label = script.bind("label".into(), Value::String(label.to_string()));
        let from = script.bind("from".into(), Value::String(from.to_string()));
        let to = script.bind("to".into(), Value::String(to.to_string()));
        script.text = format!("{SCRIPT_ALIAS}.V({from}).addE({label}).to(__.V({to}))");
        script.push_properties(properties);
        script.text.push_str(".id()");
        script
    }
}

/// GraphSON 3 encoding of a property value
pub fn encode_value(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::String(s) => Value::String(s.clone()),
        PropertyValue::Long(n) => json!({ "@type": "g:Int64", "@value": n }),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Request<'a> {
    request_id: String,
    op: &'static str,
    processor: &'static str,
    args: Args<'a>,
}

#[derive(Debug, Serialize)]
struct Args<'a> {
    gremlin: &'a str,
    bindings: &'a Map<String, Value>,
    language: &'static str,
    aliases: Map<String, Value>,
}

/// Encode a script as a binary request frame
pub fn encode_request(
    request_id: Uuid,
    script: &Script,
    traversal_source: &str,
) -> Result<Vec<u8>, GraphError> {
    let mut aliases = Map::new();
    aliases.insert(
        SCRIPT_ALIAS.to_string(),
        Value::String(traversal_source.to_string()),
    );

    let request = Request {
        request_id: request_id.to_string(),
        op: "eval",
        processor: "",
        args: Args {
            gremlin: &script.text,
            bindings: &script.bindings,
            language: "gremlin-groovy",
            aliases,
        },
    };
    let body = serde_json::to_vec(&request)?;

    let mut frame = Vec::with_capacity(1 + MIME_TYPE.len() + body.len());
    frame.push(MIME_TYPE.len() as u8);
    frame.extend_from_slice(MIME_TYPE.as_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Response status block
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ResultBody {
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResponse {
    #[serde(default)]
    request_id: Value,
    status: Status,
    #[serde(default)]
    result: ResultBody,
}

/// A decoded server response
#[derive(Debug, Clone)]
pub struct Response {
    pub request_id: Option<String>,
    pub status: Status,
    /// Result items with GraphSON type wrappers removed
    pub items: Vec<Value>,
}

/// Status codes of interest
pub mod status {
    pub const SUCCESS: u16 = 200;
    pub const NO_CONTENT: u16 = 204;
    pub const PARTIAL_CONTENT: u16 = 206;
}

/// Decode a response frame body
pub fn decode_response(body: &[u8]) -> Result<Response, GraphError> {
    let raw: RawResponse = serde_json::from_slice(body)?;
    let request_id = match untype(raw.request_id) {
        Value::String(id) => Some(id),
        _ => None,
    };
    let items = match untype(raw.result.data) {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        other => vec![other],
    };
    Ok(Response {
        request_id,
        status: raw.status,
        items,
    })
}

/// Strip GraphSON `@type`/`@value` wrappers, recursively for collections
pub fn untype(value: Value) -> Value {
    match value {
        Value::Object(mut obj) if obj.contains_key("@type") && obj.contains_key("@value") => {
            let kind = obj
                .get("@type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let inner = obj.remove("@value").unwrap_or(Value::Null);
            match (kind.as_str(), inner) {
                ("g:List" | "g:Set", Value::Array(items)) => {
                    Value::Array(items.into_iter().map(untype).collect())
                }
                (_, inner) => untype(inner),
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(untype).collect()),
        other => other,
    }
}
