//! Operation descriptions and the wire envelope.
//!
//! An [`Operation`] is an immutable record of one requested remote action:
//! constructed once per call, dispatched (and possibly retried) as a whole,
//! never mutated.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::ObjectId;

/// Broad category of a remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Produces a new object (primitives).
    Create,
    /// Mutates an existing object's placement or features.
    Transform,
    /// Combines objects, consuming the operands.
    Boolean,
    /// Reads state without mutating the document.
    Query,
    /// Streams serialized geometry out of the document.
    Export,
    /// Document open/close bookkeeping.
    Lifecycle,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Transform => "transform",
            OperationKind::Boolean => "boolean",
            OperationKind::Query => "query",
            OperationKind::Export => "export",
            OperationKind::Lifecycle => "lifecycle",
        }
    }
}

/// Immutable description of one remote call.
#[derive(Debug, Clone)]
pub struct Operation {
    kind: OperationKind,
    wire_name: &'static str,
    params: serde_json::Map<String, Value>,
    operands: Vec<ObjectId>,
}

impl Operation {
    pub fn new(kind: OperationKind, wire_name: &'static str) -> Self {
        Self {
            kind,
            wire_name,
            params: serde_json::Map::new(),
            operands: Vec::new(),
        }
    }

    /// Attach a named parameter. `None` options are simply omitted upstream.
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn param_opt(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    /// Record an operand identity. Operands are checked against the session's
    /// object graph before the request leaves the process.
    pub fn operand(mut self, id: &ObjectId) -> Self {
        self.operands.push(id.clone());
        self
    }

    pub fn operands_from<'a>(mut self, ids: impl IntoIterator<Item = &'a ObjectId>) -> Self {
        self.operands.extend(ids.into_iter().cloned());
        self
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Remote operation name as it appears on the wire.
    pub fn wire_name(&self) -> &'static str {
        self.wire_name
    }

    pub fn params(&self) -> &serde_json::Map<String, Value> {
        &self.params
    }

    pub fn operands(&self) -> &[ObjectId] {
        &self.operands
    }

    /// Serialize into the request envelope.
    pub fn to_envelope(&self) -> OpEnvelope {
        OpEnvelope {
            op: self.wire_name.to_string(),
            p: Value::Object(self.params.clone()),
        }
    }
}

/// Request body for `POST /op`.
#[derive(Debug, Clone, Serialize)]
pub struct OpEnvelope {
    pub op: String,
    pub p: Value,
}

/// Response body for `POST /op`: `{"s": <success>, "r": <result>}`.
#[derive(Debug, Clone, Deserialize)]
pub struct OpResponse {
    #[serde(rename = "s")]
    pub success: bool,
    #[serde(rename = "r", default)]
    pub result: Value,
}

impl OpResponse {
    /// The object identity carried in the reply, if any.
    pub fn object(&self) -> Option<ObjectId> {
        self.result
            .get("object")
            .and_then(Value::as_str)
            .map(ObjectId::from)
    }

    /// Failure message for `s: false` replies.
    pub fn error_message(&self) -> String {
        self.result
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("operation rejected by server")
            .to_string()
    }
}
