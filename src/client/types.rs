//! Typed parameters and results for the imperative surface.

use serde::Deserialize;
use serde_json::json;

use crate::graph::ObjectId;
use crate::op::Operation;

/// Rotation axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn as_str(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// Uniform or per-axis scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleFactor {
    Uniform(f64),
    PerAxis([f64; 3]),
}

impl From<f64> for ScaleFactor {
    fn from(f: f64) -> Self {
        ScaleFactor::Uniform(f)
    }
}

impl From<[f64; 3]> for ScaleFactor {
    fn from(f: [f64; 3]) -> Self {
        ScaleFactor::PerAxis(f)
    }
}

impl ScaleFactor {
    pub(crate) fn to_value(self) -> serde_json::Value {
        match self {
            ScaleFactor::Uniform(f) => json!(f),
            ScaleFactor::PerAxis(f) => json!(f),
        }
    }
}

/// Optional settings for object creation.
#[derive(Debug, Clone, Default)]
pub struct ObjectOpts {
    pub name: Option<String>,
    pub position: Option<[f64; 3]>,
}

impl ObjectOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn position(mut self, position: [f64; 3]) -> Self {
        self.position = Some(position);
        self
    }

    pub(crate) fn apply(&self, op: Operation) -> Operation {
        op.param_opt("name", self.name.clone())
            .param_opt("position", self.position.map(|p| json!(p)))
    }
}

/// Outcome of a mutating operation, as an explicit sum type: either the
/// target's identity survived, or the server replaced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// The operation mutated the object under its existing identity.
    InPlace,
    /// The operation produced a replacement identity; the old one is stale.
    Replaced(ObjectId),
}

/// One entry from a remote object listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteObject {
    #[serde(rename = "object")]
    pub id: ObjectId,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// Distance measurement between two objects.
#[derive(Debug, Clone, Deserialize)]
pub struct Measurement {
    pub distance: f64,
    /// Per-axis components, when the server provides them.
    #[serde(default)]
    pub delta: Option<[f64; 3]>,
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Deserialize)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    pub fn size(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::OperationKind;

    #[test]
    fn opts_apply_skips_unset_fields() {
        let op = ObjectOpts::new()
            .name("Base")
            .apply(Operation::new(OperationKind::Create, "create_box"));
        assert_eq!(op.params()["name"], "Base");
        assert!(op.params().get("position").is_none());
    }

    #[test]
    fn bounding_box_size() {
        let bb = BoundingBox {
            min: [0.0, 0.0, -1.0],
            max: [2.0, 3.0, 1.0],
        };
        assert_eq!(bb.size(), [2.0, 3.0, 2.0]);
    }
}
