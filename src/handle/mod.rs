//! Reference-counted opaque handles.
//!
//! A [`Handle`] is either unset or owns one engine reference to a
//! [`Resource`]. Cloning takes another reference, moving transfers the one
//! it holds, and closing (explicitly or on drop) releases it through the
//! release call matching the resource kind.
//!
//! ```ignore
//! let a = Handle::acquire(&engine, ObjectKind::Dataspace, |e| e.create_scalar_space())?;
//! let b = a.try_clone()?;         // count 2
//! assert!(a == b);
//! drop(a);                        // count 1
//! ```

mod kind;

pub use kind::*;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::{Engine, EngineError, EngineResult, ObjectId};
use crate::util::{Error, Result};

struct Live {
    engine: Arc<dyn Engine>,
    resource: Resource,
}

/// Owning wrapper around an engine identifier.
#[derive(Default)]
pub struct Handle {
    inner: Option<Live>,
}

impl Handle {
    /// Run an engine capability and adopt the identifier it returns.
    ///
    /// The engine must report the identifier as `kind`, and `kind` must be
    /// releasable; otherwise its reference is dropped through the engine's
    /// generic `dec_ref` and acquisition fails.
    pub fn acquire<F>(engine: &Arc<dyn Engine>, kind: ObjectKind, f: F) -> Result<Self>
    where
        F: FnOnce(&dyn Engine) -> EngineResult<ObjectId>,
    {
        let id = f(engine.as_ref()).map_err(|e| Error::acquisition(kind.name(), e))?;
        let actual = match engine.kind_of(id) {
            Ok(actual) => actual,
            Err(e) => {
                Self::drop_reference(engine, id);
                return Err(Error::acquisition(kind.name(), e));
            }
        };
        if actual != kind {
            Self::drop_reference(engine, id);
            return Err(Error::acquisition(
                kind.name(),
                EngineError::WrongKind { id, expected: kind, actual },
            ));
        }
        let Some(resource) = Resource::new(kind, id) else {
            Self::drop_reference(engine, id);
            return Err(Error::acquisition(
                kind.name(),
                EngineError::invalid(format!("{kind} handles cannot be released")),
            ));
        };
        debug!(%id, %kind, "acquired handle");
        Ok(Self::adopt(engine, resource))
    }

    /// Adopt an identifier the engine already counted for the caller,
    /// asking the engine for its kind.
    pub fn from_raw(engine: &Arc<dyn Engine>, id: ObjectId) -> Result<Self> {
        let kind = engine.kind_of(id).map_err(|e| Error::query("kind", e))?;
        let Some(resource) = Resource::new(kind, id) else {
            Self::drop_reference(engine, id);
            return Err(Error::query(
                "kind",
                EngineError::invalid(format!("object {id} is a {kind}, which has no release")),
            ));
        };
        debug!(%id, %kind, "adopted handle");
        Ok(Self::adopt(engine, resource))
    }

    /// Give back a reference that will not be adopted.
    fn drop_reference(engine: &Arc<dyn Engine>, id: ObjectId) {
        if let Err(e) = engine.dec_ref(id) {
            warn!(%id, error = %e, "failed to drop rejected reference");
        }
    }

    fn adopt(engine: &Arc<dyn Engine>, resource: Resource) -> Self {
        Self {
            inner: Some(Live { engine: Arc::clone(engine), resource }),
        }
    }

    /// New handle sharing the same identifier.
    pub fn try_clone(&self) -> Result<Self> {
        let Some(live) = &self.inner else {
            return Ok(Self::default());
        };
        live.engine
            .inc_ref(live.resource.id())
            .map_err(|e| Error::query("inc_ref", e))?;
        Ok(Self::adopt(&live.engine, live.resource))
    }

    /// Move the identifier out, leaving this handle unset.
    #[inline]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Release the current identifier and share `other`'s.
    ///
    /// `other` is referenced before the release, so assigning a handle that
    /// holds the same identifier never drops the count to zero.
    pub fn assign(&mut self, other: &Handle) -> Result<()> {
        let mut fresh = other.try_clone()?;
        self.close()?;
        self.inner = fresh.inner.take();
        Ok(())
    }

    /// Release the current identifier and take over `other`'s.
    pub fn assign_from(&mut self, mut other: Handle) -> Result<()> {
        self.close()?;
        self.inner = other.inner.take();
        Ok(())
    }

    /// Release the identifier. The handle is unset afterwards even when the
    /// engine reports a failure; closing an unset handle does nothing.
    pub fn close(&mut self) -> Result<()> {
        let Some(live) = self.inner.take() else {
            return Ok(());
        };
        let kind = live.resource.kind();
        let id = live.resource.id();
        live.resource
            .release(live.engine.as_ref())
            .map_err(|source| Error::Release { kind, source })?;
        debug!(%id, %kind, "released handle");
        Ok(())
    }

    pub fn is_valid(&self) -> Result<bool> {
        match &self.inner {
            None => Ok(false),
            Some(live) => live
                .engine
                .is_valid(live.resource.id())
                .map_err(|e| Error::query("is_valid", e)),
        }
    }

    pub fn ref_count(&self) -> Result<usize> {
        let (engine, id) = self.live("ref_count")?;
        engine.ref_count(id).map_err(|e| Error::query("ref_count", e))
    }

    /// Locally recorded kind; [`ObjectKind::Uninitialized`] when unset.
    #[inline]
    pub fn kind(&self) -> ObjectKind {
        self.inner
            .as_ref()
            .map_or(ObjectKind::Uninitialized, |l| l.resource.kind())
    }

    /// Kind as reported by the engine.
    pub fn query_kind(&self) -> Result<ObjectKind> {
        match &self.inner {
            None => Ok(ObjectKind::Uninitialized),
            Some(live) => live
                .engine
                .kind_of(live.resource.id())
                .map_err(|e| Error::query("kind", e)),
        }
    }

    pub fn ensure_kind(&self, expected: ObjectKind) -> Result<()> {
        let actual = self.kind();
        if actual != expected {
            return Err(Error::KindMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn id(&self) -> Option<ObjectId> {
        self.inner.as_ref().map(|l| l.resource.id())
    }

    #[inline]
    pub fn resource(&self) -> Option<Resource> {
        self.inner.as_ref().map(|l| l.resource)
    }

    #[inline]
    pub fn engine(&self) -> Option<&Arc<dyn Engine>> {
        self.inner.as_ref().map(|l| &l.engine)
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.inner.is_some()
    }

    /// Engine and identifier of a set handle; `what` names the operation
    /// in the [`Error::NotSet`] raised otherwise.
    pub(crate) fn live(&self, what: &'static str) -> Result<(&Arc<dyn Engine>, ObjectId)> {
        self.inner
            .as_ref()
            .map(|l| (&l.engine, l.resource.id()))
            .ok_or(Error::NotSet(what))
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "implicit handle release failed");
        }
    }
}

impl PartialEq for Handle {
    /// Two handles are equal when both are set and hold the same identifier.
    fn eq(&self, other: &Self) -> bool {
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            None => f.write_str("Handle(unset)"),
            Some(live) => f
                .debug_struct("Handle")
                .field("kind", &live.resource.kind())
                .field("id", &live.resource.id())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mem::MemEngine;

    fn engine() -> Arc<dyn Engine> {
        Arc::new(MemEngine::new())
    }

    fn scalar(engine: &Arc<dyn Engine>) -> Handle {
        Handle::acquire(engine, ObjectKind::Dataspace, |e| e.create_scalar_space()).unwrap()
    }

    #[test]
    fn test_unset_handle() {
        let mut h = Handle::default();
        assert!(!h.is_valid().unwrap());
        assert_eq!(h.kind(), ObjectKind::Uninitialized);
        assert_eq!(h.query_kind().unwrap(), ObjectKind::Uninitialized);
        assert!(matches!(h.ref_count(), Err(Error::NotSet(_))));
        assert!(h.close().is_ok());
        assert!(h != Handle::default());
        assert!(!h.try_clone().unwrap().is_set());
    }

    #[test]
    fn test_clone_shares_reference() {
        let engine = engine();
        let a = scalar(&engine);
        let b = a.try_clone().unwrap();
        assert_eq!(a.ref_count().unwrap(), 2);
        assert!(a == b);
        drop(b);
        assert_eq!(a.ref_count().unwrap(), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let engine = engine();
        let mut h = scalar(&engine);
        let id = h.id().unwrap();
        h.close().unwrap();
        assert!(!h.is_set());
        assert!(h.close().is_ok());
        assert!(!engine.is_valid(id).unwrap());
    }

    #[test]
    fn test_acquire_rejects_unreleasable_kind() {
        let mem = Arc::new(MemEngine::new());
        let engine: Arc<dyn Engine> = mem.clone();
        let err = Handle::acquire(&engine, ObjectKind::Attribute, |e| e.create_scalar_space());
        assert!(matches!(err, Err(Error::Acquisition { .. })));
        assert_eq!(mem.live_objects(), 0);
    }

    #[test]
    fn test_acquire_rejects_kind_mismatch() {
        let mem = Arc::new(MemEngine::new());
        let engine: Arc<dyn Engine> = mem.clone();

        let err = Handle::acquire(&engine, ObjectKind::Dataset, |e| e.create_scalar_space()).unwrap_err();
        match err {
            Error::Acquisition { source: EngineError::WrongKind { expected, actual, .. }, .. } => {
                assert_eq!(expected, ObjectKind::Dataset);
                assert_eq!(actual, ObjectKind::Dataspace);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(mem.live_objects(), 0);

        let h = Handle::acquire(&engine, ObjectKind::Dataspace, |e| e.create_scalar_space()).unwrap();
        assert_eq!(mem.live_objects(), 1);
        drop(h);
        assert_eq!(mem.live_objects(), 0);
    }

    #[test]
    fn test_ensure_kind() {
        let engine = engine();
        let h = scalar(&engine);
        assert!(h.ensure_kind(ObjectKind::Dataspace).is_ok());
        assert!(matches!(
            h.ensure_kind(ObjectKind::Dataset),
            Err(Error::KindMismatch { .. })
        ));
    }
}
