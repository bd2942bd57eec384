//! Blocking facade.
//!
//! Thin synchronous wrappers that drive the identical async core on a
//! private current-thread runtime. The blocking layer contains no retry,
//! classification, or chaining logic of its own; it blocks the calling
//! thread at exactly the points where the async facade suspends.
//!
//! Must not be used from within an async runtime (the inner `block_on`
//! would panic); spawn a blocking thread instead.

use std::path::Path;
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};
use tracing::warn;

use crate::client::{
    Axis, BoundingBox, ClientBuilder, Measurement, ObjectOpts, RemoteObject, ScaleFactor,
};
use crate::export::ExportFormat;
use crate::graph::{ObjectId, ObjectRecord};
use crate::materials::EngineeringMaterial;
use crate::{Error, Result};

fn runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Config(format!("failed to start blocking runtime: {e}")))
}

/// Blocking imperative client. See [`crate::ConjureClient`] for semantics;
/// every method simply blocks on its async counterpart.
pub struct ConjureClient {
    inner: crate::ConjureClient,
    rt: Arc<Runtime>,
}

impl ConjureClient {
    pub fn connect(builder: ClientBuilder) -> Result<Self> {
        let rt = runtime()?;
        let inner = rt.block_on(builder.connect())?;
        Ok(Self {
            inner,
            rt: Arc::new(rt),
        })
    }

    pub fn document(&self) -> &str {
        self.inner.document()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn create_box(
        &self,
        width: f64,
        height: f64,
        depth: f64,
        opts: ObjectOpts,
    ) -> Result<ObjectId> {
        self.rt
            .block_on(self.inner.create_box(width, height, depth, opts))
    }

    pub fn create_cylinder(&self, radius: f64, height: f64, opts: ObjectOpts) -> Result<ObjectId> {
        self.rt
            .block_on(self.inner.create_cylinder(radius, height, opts))
    }

    pub fn create_sphere(&self, radius: f64, opts: ObjectOpts) -> Result<ObjectId> {
        self.rt.block_on(self.inner.create_sphere(radius, opts))
    }

    pub fn translate(&self, id: &ObjectId, x: f64, y: f64, z: f64) -> Result<ObjectId> {
        self.rt.block_on(self.inner.translate(id, x, y, z))
    }

    pub fn rotate(&self, id: &ObjectId, axis: Axis, angle_deg: f64) -> Result<ObjectId> {
        self.rt.block_on(self.inner.rotate(id, axis, angle_deg))
    }

    pub fn scale(&self, id: &ObjectId, factor: impl Into<ScaleFactor>) -> Result<ObjectId> {
        self.rt.block_on(self.inner.scale(id, factor))
    }

    pub fn fillet(&self, id: &ObjectId, radius: f64, edges: &[&str]) -> Result<ObjectId> {
        self.rt.block_on(self.inner.fillet(id, radius, edges))
    }

    pub fn chamfer(&self, id: &ObjectId, size: f64, edges: &[&str]) -> Result<ObjectId> {
        self.rt.block_on(self.inner.chamfer(id, size, edges))
    }

    pub fn union(&self, objects: &[&ObjectId], opts: ObjectOpts) -> Result<ObjectId> {
        self.rt.block_on(self.inner.union(objects, opts))
    }

    pub fn intersect(&self, objects: &[&ObjectId], opts: ObjectOpts) -> Result<ObjectId> {
        self.rt.block_on(self.inner.intersect(objects, opts))
    }

    pub fn cut(&self, target: &ObjectId, tool: &ObjectId) -> Result<ObjectId> {
        self.rt.block_on(self.inner.cut(target, tool))
    }

    pub fn list_objects(&self) -> Result<Vec<RemoteObject>> {
        self.rt.block_on(self.inner.list_objects())
    }

    pub fn objects(&self) -> Vec<ObjectRecord> {
        self.inner.objects()
    }

    pub fn measure(&self, from: &ObjectId, to: &ObjectId) -> Result<Measurement> {
        self.rt.block_on(self.inner.measure(from, to))
    }

    pub fn bounding_box(&self, id: &ObjectId) -> Result<BoundingBox> {
        self.rt.block_on(self.inner.bounding_box(id))
    }

    pub fn list_materials(&self, category: Option<&str>) -> Result<Vec<EngineeringMaterial>> {
        self.rt.block_on(self.inner.list_materials(category))
    }

    pub fn material(&self, id: &str) -> Result<EngineeringMaterial> {
        self.rt.block_on(self.inner.material(id))
    }

    /// Export into memory.
    pub fn export(&self, format: ExportFormat, objects: &[&ObjectId]) -> Result<Vec<u8>> {
        self.rt.block_on(async {
            self.inner.export(format, objects).await?.collect().await
        })
    }

    /// Export straight into a file. Returns bytes written.
    pub fn export_to_file(
        &self,
        format: ExportFormat,
        objects: &[&ObjectId],
        path: impl AsRef<Path>,
    ) -> Result<u64> {
        self.rt.block_on(async {
            self.inner.export(format, objects).await?.save(path).await
        })
    }

    pub fn close(&self) -> Result<()> {
        self.rt.block_on(self.inner.close())
    }
}

impl Drop for ConjureClient {
    fn drop(&mut self) {
        // Drop is the blocking facade's finally-block: the remote document
        // is finalized even when the caller unwinds without close().
        if !self.inner.is_closed() {
            if let Err(err) = self.rt.block_on(self.inner.close()) {
                warn!(error = %err, "close during drop failed");
            }
        }
    }
}

/// Blocking builder facade. See [`crate::Part`].
pub struct Part {
    inner: crate::Part,
    rt: Arc<Runtime>,
}

impl Part {
    pub fn open(name: impl Into<String>) -> Result<Self> {
        let rt = runtime()?;
        let inner = rt.block_on(crate::Part::open(name))?;
        Ok(Self {
            inner,
            rt: Arc::new(rt),
        })
    }

    pub fn open_with(builder: ClientBuilder) -> Result<Self> {
        let rt = runtime()?;
        let inner = rt.block_on(crate::Part::open_with(builder))?;
        Ok(Self {
            inner,
            rt: Arc::new(rt),
        })
    }

    /// Run a build closure with a guaranteed close on every exit path,
    /// including unwinding. An error from the closure takes precedence over
    /// a close failure.
    pub fn scope<T>(
        name: impl Into<String>,
        build: impl FnOnce(&Part) -> Result<T>,
    ) -> Result<T> {
        let part = Part::open(name)?;
        let result = build(&part);
        match result {
            Ok(value) => {
                part.close()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(close_err) = part.close() {
                    warn!(
                        error = %close_err,
                        original = %err,
                        "close failed during error teardown; surfacing the original error"
                    );
                }
                Err(err)
            }
        }
    }

    pub fn cuboid(&self, length: f64, width: f64, height: f64) -> Result<ObjectRef> {
        self.wrap(self.rt.block_on(self.inner.cuboid(length, width, height)))
    }

    pub fn cuboid_at(
        &self,
        length: f64,
        width: f64,
        height: f64,
        position: [f64; 3],
    ) -> Result<ObjectRef> {
        self.wrap(
            self.rt
                .block_on(self.inner.cuboid_at(length, width, height, position)),
        )
    }

    pub fn cylinder(&self, radius: f64, height: f64) -> Result<ObjectRef> {
        self.wrap(self.rt.block_on(self.inner.cylinder(radius, height)))
    }

    pub fn cylinder_at(&self, radius: f64, height: f64, position: [f64; 3]) -> Result<ObjectRef> {
        self.wrap(
            self.rt
                .block_on(self.inner.cylinder_at(radius, height, position)),
        )
    }

    pub fn sphere(&self, radius: f64) -> Result<ObjectRef> {
        self.wrap(self.rt.block_on(self.inner.sphere(radius)))
    }

    pub fn sphere_at(&self, radius: f64, position: [f64; 3]) -> Result<ObjectRef> {
        self.wrap(self.rt.block_on(self.inner.sphere_at(radius, position)))
    }

    pub fn slot(&self, width: f64, depth: f64, length: f64, position: [f64; 3]) -> Result<ObjectRef> {
        self.wrap(
            self.rt
                .block_on(self.inner.slot(width, depth, length, position)),
        )
    }

    pub fn hole(&self, diameter: f64, depth: f64, position: [f64; 3]) -> Result<ObjectRef> {
        self.wrap(self.rt.block_on(self.inner.hole(diameter, depth, position)))
    }

    pub fn union(&self, objects: &[&ObjectRef]) -> Result<ObjectRef> {
        let inner: Vec<&crate::ObjectRef> = objects.iter().map(|o| &o.inner).collect();
        self.wrap(self.rt.block_on(self.inner.union(&inner)))
    }

    pub fn intersect(&self, objects: &[&ObjectRef]) -> Result<ObjectRef> {
        let inner: Vec<&crate::ObjectRef> = objects.iter().map(|o| &o.inner).collect();
        self.wrap(self.rt.block_on(self.inner.intersect(&inner)))
    }

    pub fn objects(&self) -> Vec<ObjectRecord> {
        self.inner.objects()
    }

    pub fn list_objects(&self) -> Result<Vec<RemoteObject>> {
        self.rt.block_on(self.inner.list_objects())
    }

    pub fn measure(&self, from: &ObjectRef, to: &ObjectRef) -> Result<Measurement> {
        self.rt.block_on(self.inner.measure(&from.inner, &to.inner))
    }

    pub fn bounding_box(&self, object: &ObjectRef) -> Result<BoundingBox> {
        self.rt.block_on(self.inner.bounding_box(&object.inner))
    }

    pub fn export_stl(&self, objects: &[&ObjectRef]) -> Result<Vec<u8>> {
        self.export(ExportFormat::Stl, objects)
    }

    pub fn export_step(&self, objects: &[&ObjectRef]) -> Result<Vec<u8>> {
        self.export(ExportFormat::Step, objects)
    }

    pub fn export(&self, format: ExportFormat, objects: &[&ObjectRef]) -> Result<Vec<u8>> {
        let inner: Vec<&crate::ObjectRef> = objects.iter().map(|o| &o.inner).collect();
        self.rt.block_on(async {
            self.inner.export(format, &inner).await?.collect().await
        })
    }

    pub fn export_to_file(
        &self,
        format: ExportFormat,
        objects: &[&ObjectRef],
        path: impl AsRef<Path>,
    ) -> Result<u64> {
        let inner: Vec<&crate::ObjectRef> = objects.iter().map(|o| &o.inner).collect();
        self.rt.block_on(async {
            self.inner.export(format, &inner).await?.save(path).await
        })
    }

    pub fn close(&self) -> Result<()> {
        self.rt.block_on(self.inner.close())
    }

    fn wrap(&self, result: Result<crate::ObjectRef>) -> Result<ObjectRef> {
        Ok(ObjectRef {
            inner: result?,
            rt: self.rt.clone(),
        })
    }
}

impl Drop for Part {
    fn drop(&mut self) {
        if !self.inner.client().is_closed() {
            if let Err(err) = self.rt.block_on(self.inner.close()) {
                warn!(error = %err, "close during drop failed");
            }
        }
    }
}

/// Blocking object handle. See [`crate::ObjectRef`].
pub struct ObjectRef {
    inner: crate::ObjectRef,
    rt: Arc<Runtime>,
}

impl ObjectRef {
    pub fn id(&self) -> &ObjectId {
        self.inner.id()
    }

    pub fn translate(&mut self, x: f64, y: f64, z: f64) -> Result<&mut Self> {
        self.rt.block_on(self.inner.translate(x, y, z))?;
        Ok(self)
    }

    pub fn rotate(&mut self, axis: Axis, angle_deg: f64) -> Result<&mut Self> {
        self.rt.block_on(self.inner.rotate(axis, angle_deg))?;
        Ok(self)
    }

    pub fn scale(&mut self, factor: impl Into<ScaleFactor>) -> Result<&mut Self> {
        self.rt.block_on(self.inner.scale(factor))?;
        Ok(self)
    }

    pub fn fillet(&mut self, edges: &[&str], radius: f64) -> Result<&mut Self> {
        self.rt.block_on(self.inner.fillet(edges, radius))?;
        Ok(self)
    }

    pub fn chamfer(&mut self, edges: &[&str], size: f64) -> Result<&mut Self> {
        self.rt.block_on(self.inner.chamfer(edges, size))?;
        Ok(self)
    }

    pub fn cut(&mut self, tool: &ObjectRef) -> Result<&mut Self> {
        self.rt.block_on(self.inner.cut(&tool.inner))?;
        Ok(self)
    }

    pub fn bounding_box(&self) -> Result<BoundingBox> {
        self.rt.block_on(self.inner.bounding_box())
    }
}
