//! Client-side registry of object identities created during a session.
//!
//! The graph does not hold geometry (geometry lives server-side); it records
//! which identities exist, how each was produced, and which have been
//! consumed by later operations. Stale identities are rejected locally
//! before a doomed request leaves the process.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{Classification, Error, ErrorHint};
use crate::op::Operation;
use crate::Result;

/// Opaque object identity issued by the remote kernel.
///
/// Unique within one session's lifetime; never reused after the object is
/// destroyed server-side (for example, consumed by a boolean operation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        ObjectId(s.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        ObjectId(s)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    Live,
    /// Consumed or replaced server-side. Never silently revalidated.
    Invalidated,
}

/// Provenance record for one registered identity.
#[derive(Debug, Clone)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub state: ObjectState,
    /// The operation that produced this identity. Diagnostic only, not replay.
    pub produced_by: Operation,
}

#[derive(Debug, Default)]
struct GraphState {
    records: HashMap<ObjectId, ObjectRecord>,
    /// Registration order, for stable diagnostics listings.
    order: Vec<ObjectId>,
}

/// Per-session object registry. Sessions own their graph exclusively; no
/// cross-session mutation of identities is possible.
#[derive(Debug, Default)]
pub struct ObjectGraph {
    state: Mutex<GraphState>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly issued identity. Must happen before the identity is
    /// handed to the caller, so no dangling reference exists transiently.
    pub fn register(&self, id: ObjectId, produced_by: Operation) {
        let mut st = self.state.lock().expect("object graph poisoned");
        if !st.records.contains_key(&id) {
            st.order.push(id.clone());
        }
        st.records.insert(
            id.clone(),
            ObjectRecord {
                id,
                state: ObjectState::Live,
                produced_by,
            },
        );
    }

    /// Mark an identity as consumed. Subsequent operations referencing it
    /// fail locally with `ObjectNotFound`.
    pub fn invalidate(&self, id: &ObjectId) {
        let mut st = self.state.lock().expect("object graph poisoned");
        if let Some(rec) = st.records.get_mut(id) {
            rec.state = ObjectState::Invalidated;
        }
    }

    pub fn resolve(&self, id: &ObjectId) -> Option<ObjectRecord> {
        let st = self.state.lock().expect("object graph poisoned");
        st.records.get(id).cloned()
    }

    /// Fail fast on stale or unknown identities, without a network round trip.
    pub fn ensure_live(&self, id: &ObjectId) -> Result<()> {
        let st = self.state.lock().expect("object graph poisoned");
        match st.records.get(id).map(|r| r.state) {
            Some(ObjectState::Live) => Ok(()),
            Some(ObjectState::Invalidated) => Err(Error::api(
                Classification::ObjectNotFound,
                format!("object '{id}' was consumed by an earlier operation"),
                ErrorHint::new().with_field("name"),
            )),
            None => Err(Error::api(
                Classification::ObjectNotFound,
                format!("object '{id}' is not known to this session"),
                ErrorHint::new().with_field("name"),
            )),
        }
    }

    /// Registration-ordered snapshot of every record, for diagnostics.
    pub fn records(&self) -> Vec<ObjectRecord> {
        let st = self.state.lock().expect("object graph poisoned");
        st.order
            .iter()
            .filter_map(|id| st.records.get(id).cloned())
            .collect()
    }

    /// Identities still live in this session.
    pub fn live_objects(&self) -> Vec<ObjectId> {
        self.records()
            .into_iter()
            .filter(|r| r.state == ObjectState::Live)
            .map(|r| r.id)
            .collect()
    }
}
