//! Fluent builder surface.
//!
//! A [`Part`] is a session-scoped handle for building one CAD part; every
//! operation is delegated to the server through the same executor the
//! imperative client uses. [`ObjectRef`] handles chain left-to-right in the
//! order calls are issued, which is the order the server applies them.
//!
//! ```no_run
//! use conjure_rs::{Part, Axis, Result};
//!
//! # async fn demo() -> Result<()> {
//! Part::scope("Holder", |p| async move {
//!     let mut base = p.cuboid(100.0, 50.0, 30.0).await?;
//!     let hole = p.hole(10.0, 40.0, [50.0, 25.0, 0.0]).await?;
//!     base.cut(&hole).await?.fillet(&["top"], 2.0).await?;
//!     p.export_stl(&[&base]).await?.save("holder.stl").await?;
//!     Ok(())
//! })
//! .await
//! # }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::client::{Axis, BoundingBox, ClientBuilder, Measurement, Mutation, ObjectOpts,
    RemoteObject, ScaleFactor};
use crate::client::ConjureClient;
use crate::export::{ExportFormat, ExportStream};
use crate::graph::{ObjectId, ObjectRecord};
use crate::Result;

struct PartInner {
    client: ConjureClient,
    name: String,
    counter: AtomicU64,
}

/// Scoped context for building one CAD part. Cheap to clone; clones share
/// the session.
#[derive(Clone)]
pub struct Part {
    inner: Arc<PartInner>,
}

impl Part {
    /// Open a session for a new part, resolving credentials from the
    /// environment or config file.
    pub async fn open(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let client = ConjureClient::builder()
            .document(name.clone())
            .connect()
            .await?;
        Ok(Self::from_client(client))
    }

    /// Open with explicit construction settings (credentials, retry policy,
    /// injected transport).
    pub async fn open_with(builder: ClientBuilder) -> Result<Self> {
        Ok(Self::from_client(builder.connect().await?))
    }

    /// Wrap an already-connected session.
    pub fn from_client(client: ConjureClient) -> Self {
        let name = client.inner.document_name.clone();
        Self {
            inner: Arc::new(PartInner {
                client,
                name,
                counter: AtomicU64::new(0),
            }),
        }
    }

    /// Run a build closure with a guaranteed close on every exit path.
    ///
    /// An error from the closure takes precedence over a close failure; the
    /// close failure is logged, never surfaced over the original error.
    pub async fn scope<T, F, Fut>(name: impl Into<String>, build: F) -> Result<T>
    where
        F: FnOnce(Part) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let part = Part::open(name).await?;
        part.run_scoped(build).await
    }

    /// `scope` with explicit construction settings.
    pub async fn scope_with<T, F, Fut>(builder: ClientBuilder, build: F) -> Result<T>
    where
        F: FnOnce(Part) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let part = Part::open_with(builder).await?;
        part.run_scoped(build).await
    }

    async fn run_scoped<T, F, Fut>(self, build: F) -> Result<T>
    where
        F: FnOnce(Part) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match build(self.clone()).await {
            Ok(value) => {
                self.close().await?;
                Ok(value)
            }
            Err(err) => {
                self.inner.client.close_after(&err).await;
                Err(err)
            }
        }
    }

    /// The underlying imperative client.
    pub fn client(&self) -> &ConjureClient {
        &self.inner.client
    }

    pub async fn close(&self) -> Result<()> {
        self.inner.client.close().await
    }

    fn next_name(&self, prefix: &str) -> String {
        let n = self.inner.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}_{n}")
    }

    fn named_opts(&self, prefix: &str, position: Option<[f64; 3]>) -> ObjectOpts {
        let mut opts = ObjectOpts::new().name(self.next_name(prefix));
        if let Some(p) = position {
            opts = opts.position(p);
        }
        opts
    }

    fn wrap(&self, id: ObjectId) -> ObjectRef {
        ObjectRef {
            id,
            part: self.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Primitives
    // ------------------------------------------------------------------

    pub async fn cuboid(&self, length: f64, width: f64, height: f64) -> Result<ObjectRef> {
        let opts = self.named_opts("Box", None);
        let id = self.inner.client.create_box(length, width, height, opts).await?;
        Ok(self.wrap(id))
    }

    pub async fn cuboid_at(
        &self,
        length: f64,
        width: f64,
        height: f64,
        position: [f64; 3],
    ) -> Result<ObjectRef> {
        let opts = self.named_opts("Box", Some(position));
        let id = self.inner.client.create_box(length, width, height, opts).await?;
        Ok(self.wrap(id))
    }

    pub async fn cylinder(&self, radius: f64, height: f64) -> Result<ObjectRef> {
        let opts = self.named_opts("Cylinder", None);
        let id = self.inner.client.create_cylinder(radius, height, opts).await?;
        Ok(self.wrap(id))
    }

    pub async fn cylinder_at(
        &self,
        radius: f64,
        height: f64,
        position: [f64; 3],
    ) -> Result<ObjectRef> {
        let opts = self.named_opts("Cylinder", Some(position));
        let id = self.inner.client.create_cylinder(radius, height, opts).await?;
        Ok(self.wrap(id))
    }

    pub async fn sphere(&self, radius: f64) -> Result<ObjectRef> {
        let opts = self.named_opts("Sphere", None);
        let id = self.inner.client.create_sphere(radius, opts).await?;
        Ok(self.wrap(id))
    }

    pub async fn sphere_at(&self, radius: f64, position: [f64; 3]) -> Result<ObjectRef> {
        let opts = self.named_opts("Sphere", Some(position));
        let id = self.inner.client.create_sphere(radius, opts).await?;
        Ok(self.wrap(id))
    }

    /// Rectangular cutout tool.
    pub async fn slot(
        &self,
        width: f64,
        depth: f64,
        length: f64,
        position: [f64; 3],
    ) -> Result<ObjectRef> {
        let opts = self.named_opts("Slot", Some(position));
        let id = self.inner.client.create_box(length, width, depth, opts).await?;
        Ok(self.wrap(id))
    }

    /// Cylindrical cutout tool.
    pub async fn hole(&self, diameter: f64, depth: f64, position: [f64; 3]) -> Result<ObjectRef> {
        let opts = self.named_opts("Hole", Some(position));
        let id = self
            .inner
            .client
            .create_cylinder(diameter / 2.0, depth, opts)
            .await?;
        Ok(self.wrap(id))
    }

    // ------------------------------------------------------------------
    // Booleans
    // ------------------------------------------------------------------

    /// Fuse objects into a new one. Operands are consumed.
    pub async fn union(&self, objects: &[&ObjectRef]) -> Result<ObjectRef> {
        let ids: Vec<&ObjectId> = objects.iter().map(|o| o.id()).collect();
        let opts = ObjectOpts::new().name(self.next_name("Union"));
        let id = self.inner.client.union(&ids, opts).await?;
        Ok(self.wrap(id))
    }

    /// Intersection of objects as a new one. Operands are consumed.
    pub async fn intersect(&self, objects: &[&ObjectRef]) -> Result<ObjectRef> {
        let ids: Vec<&ObjectId> = objects.iter().map(|o| o.id()).collect();
        let opts = ObjectOpts::new().name(self.next_name("Intersect"));
        let id = self.inner.client.intersect(&ids, opts).await?;
        Ok(self.wrap(id))
    }

    // ------------------------------------------------------------------
    // Queries and export
    // ------------------------------------------------------------------

    /// Local provenance records for this session's objects.
    pub fn objects(&self) -> Vec<ObjectRecord> {
        self.inner.client.objects()
    }

    /// Objects as the server sees them.
    pub async fn list_objects(&self) -> Result<Vec<RemoteObject>> {
        self.inner.client.list_objects().await
    }

    pub async fn measure(&self, from: &ObjectRef, to: &ObjectRef) -> Result<Measurement> {
        self.inner.client.measure(from.id(), to.id()).await
    }

    pub async fn bounding_box(&self, object: &ObjectRef) -> Result<BoundingBox> {
        self.inner.client.bounding_box(object.id()).await
    }

    pub async fn export_stl(&self, objects: &[&ObjectRef]) -> Result<ExportStream> {
        self.export(ExportFormat::Stl, objects).await
    }

    pub async fn export_step(&self, objects: &[&ObjectRef]) -> Result<ExportStream> {
        self.export(ExportFormat::Step, objects).await
    }

    pub async fn export(
        &self,
        format: ExportFormat,
        objects: &[&ObjectRef],
    ) -> Result<ExportStream> {
        let ids: Vec<&ObjectId> = objects.iter().map(|o| o.id()).collect();
        self.inner.client.export(format, &ids).await
    }

    /// Name prefix used for auto-generated object labels.
    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

/// Local handle to a remote object's identity.
///
/// The handle tracks identity only; geometry lives server-side. When an
/// operation replaces the object, the handle's identity is updated in
/// place. A handle whose object was *consumed* (for example a cut tool) is
/// never revalidated; the next operation on it fails locally with
/// `ObjectNotFound`.
pub struct ObjectRef {
    id: ObjectId,
    part: Part,
}

impl std::fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRef")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl ObjectRef {
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    fn client(&self) -> &ConjureClient {
        &self.part.inner.client
    }

    pub async fn translate(&mut self, x: f64, y: f64, z: f64) -> Result<&mut Self> {
        self.id = self.client().translate(&self.id, x, y, z).await?;
        Ok(self)
    }

    pub async fn rotate(&mut self, axis: Axis, angle_deg: f64) -> Result<&mut Self> {
        self.id = self.client().rotate(&self.id, axis, angle_deg).await?;
        Ok(self)
    }

    pub async fn scale(&mut self, factor: impl Into<ScaleFactor>) -> Result<&mut Self> {
        self.id = self.client().scale(&self.id, factor).await?;
        Ok(self)
    }

    pub async fn fillet(&mut self, edges: &[&str], radius: f64) -> Result<&mut Self> {
        self.id = self.client().fillet(&self.id, radius, edges).await?;
        Ok(self)
    }

    pub async fn chamfer(&mut self, edges: &[&str], size: f64) -> Result<&mut Self> {
        self.id = self.client().chamfer(&self.id, size, edges).await?;
        Ok(self)
    }

    /// Cut `tool` out of this object. The tool is consumed; this handle
    /// follows the server's replacement identity if one is issued.
    pub async fn cut(&mut self, tool: &ObjectRef) -> Result<&mut Self> {
        match self.client().boolean_cut(&self.id, &tool.id).await? {
            Mutation::Replaced(new_id) => self.id = new_id,
            Mutation::InPlace => {}
        }
        Ok(self)
    }

    pub async fn bounding_box(&self) -> Result<BoundingBox> {
        self.client().bounding_box(&self.id).await
    }
}
