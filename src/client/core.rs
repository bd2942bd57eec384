//! Imperative session client.
//!
//! A `ConjureClient` is bound to exactly one remote document. It owns the
//! request executor and the object graph; every operation funnels through
//! [`ConjureClient::run`], which checks operand liveness locally before
//! anything reaches the network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::client::types::{
    Axis, BoundingBox, Measurement, Mutation, ObjectOpts, RemoteObject, ScaleFactor,
};
use crate::error::{Classification, Error, ErrorHint};
use crate::exec::{CancelToken, RequestExecutor};
use crate::export::{ExportFormat, ExportStream};
use crate::graph::{ObjectGraph, ObjectId, ObjectRecord};
use crate::materials::MaterialsCache;
use crate::op::{OpResponse, Operation, OperationKind};
use crate::Result;

pub(crate) struct ClientInner {
    pub(crate) executor: RequestExecutor,
    pub(crate) graph: ObjectGraph,
    pub(crate) document_id: String,
    pub(crate) document_name: String,
    pub(crate) closed: AtomicBool,
    pub(crate) materials: MaterialsCache,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::SeqCst) {
            // A leaked session keeps a document handle open server-side.
            warn!(
                document = self.document_id.as_str(),
                "session dropped without close(); remote document handle leaked"
            );
        }
    }
}

/// Imperative client for one remote CAD document.
///
/// Cheap to clone; clones share the same session. Operations issued
/// sequentially on one session execute and complete in issue order.
#[derive(Clone)]
pub struct ConjureClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) fn ensure_success(resp: OpResponse) -> Result<OpResponse> {
    if resp.success {
        Ok(resp)
    } else {
        Err(Error::api(
            Classification::Unknown,
            resp.error_message(),
            ErrorHint::new(),
        ))
    }
}

impl ConjureClient {
    /// Start building a session.
    pub fn builder() -> crate::client::builder::ClientBuilder {
        crate::client::builder::ClientBuilder::new()
    }

    /// Connect with defaults: credentials from the environment or config
    /// file, document name "Main".
    pub async fn connect() -> Result<Self> {
        Self::builder().connect().await
    }

    /// The remote document this session is bound to.
    pub fn document(&self) -> &str {
        &self.inner.document_id
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Execute an operation through the session's executor: closed-session
    /// guard, local stale-identity check for every operand, then the retry
    /// envelope.
    pub(crate) async fn run(&self, op: &Operation) -> Result<OpResponse> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        for id in op.operands() {
            self.inner.graph.ensure_live(id)?;
        }
        let resp = self.inner.executor.execute(op, &CancelToken::never()).await?;
        ensure_success(resp)
    }

    /// Run a creating operation and register the issued identity before it
    /// is handed back to the caller.
    pub(crate) async fn create(&self, op: Operation) -> Result<ObjectId> {
        let resp = self.run(&op).await?;
        let id = resp.object().ok_or_else(|| {
            Error::api(
                Classification::Unknown,
                format!("'{}' reply carried no object identity", op.wire_name()),
                ErrorHint::new(),
            )
        })?;
        self.inner.graph.register(id.clone(), op);
        Ok(id)
    }

    /// Run a mutating operation against `target` and fold the reply into an
    /// explicit [`Mutation`] outcome, updating the graph accordingly.
    pub(crate) async fn mutate(&self, target: &ObjectId, op: Operation) -> Result<Mutation> {
        let resp = self.run(&op).await?;
        match resp.object() {
            Some(new_id) if new_id != *target => {
                self.inner.graph.invalidate(target);
                self.inner.graph.register(new_id.clone(), op);
                Ok(Mutation::Replaced(new_id))
            }
            _ => Ok(Mutation::InPlace),
        }
    }

    // ------------------------------------------------------------------
    // Primitives
    // ------------------------------------------------------------------

    pub async fn create_box(
        &self,
        width: f64,
        height: f64,
        depth: f64,
        opts: ObjectOpts,
    ) -> Result<ObjectId> {
        let op = opts.apply(
            Operation::new(OperationKind::Create, "create_box")
                .param("width", width)
                .param("height", height)
                .param("depth", depth),
        );
        self.create(op).await
    }

    pub async fn create_cylinder(
        &self,
        radius: f64,
        height: f64,
        opts: ObjectOpts,
    ) -> Result<ObjectId> {
        let op = opts.apply(
            Operation::new(OperationKind::Create, "create_cylinder")
                .param("radius", radius)
                .param("height", height),
        );
        self.create(op).await
    }

    pub async fn create_sphere(&self, radius: f64, opts: ObjectOpts) -> Result<ObjectId> {
        let op = opts.apply(
            Operation::new(OperationKind::Create, "create_sphere").param("radius", radius),
        );
        self.create(op).await
    }

    // ------------------------------------------------------------------
    // Transforms. Each returns the resulting identity, which is the input
    // identity unless the server issued a replacement.
    // ------------------------------------------------------------------

    pub async fn translate(&self, id: &ObjectId, x: f64, y: f64, z: f64) -> Result<ObjectId> {
        let op = Operation::new(OperationKind::Transform, "move_object")
            .param("name", id.as_str())
            .param("x", x)
            .param("y", y)
            .param("z", z)
            .operand(id);
        self.resolved(id, self.mutate(id, op).await?)
    }

    pub async fn rotate(&self, id: &ObjectId, axis: Axis, angle_deg: f64) -> Result<ObjectId> {
        let op = Operation::new(OperationKind::Transform, "rotate_object")
            .param("name", id.as_str())
            .param("axis", axis.as_str())
            .param("angle", angle_deg)
            .operand(id);
        self.resolved(id, self.mutate(id, op).await?)
    }

    pub async fn scale(&self, id: &ObjectId, factor: impl Into<ScaleFactor>) -> Result<ObjectId> {
        let op = Operation::new(OperationKind::Transform, "scale_object")
            .param("name", id.as_str())
            .param("factor", factor.into().to_value())
            .operand(id);
        self.resolved(id, self.mutate(id, op).await?)
    }

    pub async fn fillet(&self, id: &ObjectId, radius: f64, edges: &[&str]) -> Result<ObjectId> {
        let op = Operation::new(OperationKind::Transform, "create_fillet")
            .param("object_name", id.as_str())
            .param("radius", radius)
            .param("edges", json!(edges))
            .operand(id);
        self.resolved(id, self.mutate(id, op).await?)
    }

    pub async fn chamfer(&self, id: &ObjectId, size: f64, edges: &[&str]) -> Result<ObjectId> {
        let op = Operation::new(OperationKind::Transform, "create_chamfer")
            .param("object_name", id.as_str())
            .param("size", size)
            .param("edges", json!(edges))
            .operand(id);
        self.resolved(id, self.mutate(id, op).await?)
    }

    fn resolved(&self, target: &ObjectId, mutation: Mutation) -> Result<ObjectId> {
        Ok(match mutation {
            Mutation::InPlace => target.clone(),
            Mutation::Replaced(id) => id,
        })
    }

    // ------------------------------------------------------------------
    // Booleans. Operands are consumed server-side; their identities are
    // invalidated locally and never reused.
    // ------------------------------------------------------------------

    pub async fn union(&self, objects: &[&ObjectId], opts: ObjectOpts) -> Result<ObjectId> {
        self.merge("boolean_fuse", objects, opts).await
    }

    pub async fn intersect(&self, objects: &[&ObjectId], opts: ObjectOpts) -> Result<ObjectId> {
        self.merge("boolean_intersect", objects, opts).await
    }

    async fn merge(
        &self,
        wire_name: &'static str,
        objects: &[&ObjectId],
        opts: ObjectOpts,
    ) -> Result<ObjectId> {
        let names: Vec<&str> = objects.iter().map(|o| o.as_str()).collect();
        let op = opts.apply(
            Operation::new(OperationKind::Boolean, wire_name)
                .param("objects", json!(names))
                .operands_from(objects.iter().copied()),
        );
        let resp = self.run(&op).await?;
        let id = resp.object().ok_or_else(|| {
            Error::api(
                Classification::Unknown,
                format!("'{wire_name}' reply carried no object identity"),
                ErrorHint::new(),
            )
        })?;
        for consumed in objects {
            self.inner.graph.invalidate(consumed);
        }
        self.inner.graph.register(id.clone(), op);
        Ok(id)
    }

    /// Cut `tool` out of `target`. The tool is consumed; the target either
    /// keeps its identity or is replaced by the reply's identity.
    pub async fn cut(&self, target: &ObjectId, tool: &ObjectId) -> Result<ObjectId> {
        self.resolved(target, self.boolean_cut(target, tool).await?)
    }

    pub(crate) async fn boolean_cut(
        &self,
        target: &ObjectId,
        tool: &ObjectId,
    ) -> Result<Mutation> {
        let op = Operation::new(OperationKind::Boolean, "boolean_cut")
            .param("target", target.as_str())
            .param("tool", tool.as_str())
            .operand(target)
            .operand(tool);
        let mutation = self.mutate(target, op).await?;
        self.inner.graph.invalidate(tool);
        Ok(mutation)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Objects as the server sees them.
    pub async fn list_objects(&self) -> Result<Vec<RemoteObject>> {
        let op = Operation::new(OperationKind::Query, "find_objects").param("pattern", "*");
        let resp = self.run(&op).await?;
        let objects = resp.result.get("o").cloned().unwrap_or(json!([]));
        Ok(serde_json::from_value(objects)?)
    }

    /// Identities this session created and still considers live, with
    /// provenance. Local diagnostics; no network.
    pub fn objects(&self) -> Vec<ObjectRecord> {
        self.inner.graph.records()
    }

    pub async fn measure(&self, from: &ObjectId, to: &ObjectId) -> Result<Measurement> {
        let op = Operation::new(OperationKind::Query, "measure_distance")
            .param("from", from.as_str())
            .param("to", to.as_str())
            .operand(from)
            .operand(to);
        let resp = self.run(&op).await?;
        Ok(serde_json::from_value(resp.result)?)
    }

    pub async fn bounding_box(&self, id: &ObjectId) -> Result<BoundingBox> {
        let op = Operation::new(OperationKind::Query, "get_bounding_box")
            .param("name", id.as_str())
            .operand(id);
        let resp = self.run(&op).await?;
        Ok(serde_json::from_value(resp.result)?)
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Stream an export of the given objects (all live objects if empty).
    pub async fn export(
        &self,
        format: ExportFormat,
        objects: &[&ObjectId],
    ) -> Result<ExportStream> {
        self.export_with_cancel(format, objects, &CancelToken::never())
            .await
    }

    /// Cancellable export. Cancellation aborts connection and retry waits;
    /// once chunks are flowing the stream is the caller's to drop.
    pub async fn export_with_cancel(
        &self,
        format: ExportFormat,
        objects: &[&ObjectId],
        cancel: &CancelToken,
    ) -> Result<ExportStream> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        let names: Vec<&str> = objects.iter().map(|o| o.as_str()).collect();
        let op = Operation::new(OperationKind::Export, format.wire_name())
            .param("objects", json!(names))
            .operands_from(objects.iter().copied());
        for id in op.operands() {
            self.inner.graph.ensure_live(id)?;
        }
        let bytes = self.inner.executor.execute_stream(&op, cancel).await?;
        Ok(ExportStream::new(bytes))
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Finalize the remote document. Idempotent: the first call issues
    /// `close_document`; later calls return without remote effect.
    pub async fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let op = Operation::new(OperationKind::Lifecycle, "close_document")
            .param("document", self.inner.document_id.as_str());
        let resp = self
            .inner
            .executor
            .execute(&op, &CancelToken::never())
            .await?;
        ensure_success(resp)?;
        info!(
            document = self.inner.document_id.as_str(),
            "session closed"
        );
        Ok(())
    }

    /// Close, reporting failures without letting them mask `cause`.
    pub(crate) async fn close_after(&self, cause: &Error) {
        if let Err(close_err) = self.close().await {
            warn!(
                error = %close_err,
                original = %cause,
                "close failed during error teardown; surfacing the original error"
            );
        }
    }
}
