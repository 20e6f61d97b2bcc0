//! Operations shared by files and groups.

use std::sync::Arc;

use crate::engine::Engine;
use crate::handle::{Handle, ObjectKind};
use crate::util::{Error, Result};

/// A place links can be created under: a file (its root group) or a group.
pub trait Location {
    /// Handle of the file or group.
    fn location_handle(&self) -> &Handle;

    fn engine(&self) -> Result<&Arc<dyn Engine>> {
        Ok(self.location_handle().live("location engine")?.0)
    }

    /// Number of links directly below this location.
    fn link_count(&self) -> Result<usize> {
        Ok(self.link_names()?.len())
    }

    /// Names of the links directly below this location, sorted.
    fn link_names(&self) -> Result<Vec<String>> {
        let (engine, id) = self.location_handle().live("link_names")?;
        engine.link_names(id).map_err(|e| Error::query("link_names", e))
    }

    /// Names of the links that refer to datasets.
    fn dataset_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for name in self.link_names()? {
            let obj = self.open_object(&name)?;
            if obj.kind() == ObjectKind::Dataset {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Whether every component of `path` exists. Empty components are
    /// ignored, so `"a//b/"` is the same as `"a/b"`.
    fn link_exists(&self, path: &str) -> Result<bool> {
        let (engine, id) = self.location_handle().live("link_exists")?;
        let mut prefix = String::with_capacity(path.len());
        if path.starts_with('/') {
            prefix.push('/');
        }
        for name in path.split('/').filter(|c| !c.is_empty()) {
            if !prefix.is_empty() && !prefix.ends_with('/') {
                prefix.push('/');
            }
            prefix.push_str(name);
            let found = engine
                .link_exists(id, &prefix)
                .map_err(|e| Error::query("link_exists", e))?;
            if !found {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Open whatever object `name` refers to.
    fn open_object(&self, name: &str) -> Result<Handle> {
        let (engine, id) = self.location_handle().live("open_object")?;
        let obj = engine
            .open_object(id, name, None)
            .map_err(|e| Error::acquisition(format!("object {:?}", name), e))?;
        Handle::from_raw(engine, obj)
    }
}
