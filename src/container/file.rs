//! Container files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::location::Location;
use super::plist::{FileAccessProperty, FileCreateProperty};
use crate::engine::{AccessMode, CreateMode, Engine, ObjectId};
use crate::handle::{Handle, ObjectKind};
use crate::util::{Error, Result};

/// What to do when creating over an existing file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CreationFlag {
    /// Fail if the file exists.
    #[default]
    New,
    /// Overwrite any existing file.
    Truncate,
}

impl From<CreationFlag> for CreateMode {
    fn from(flag: CreationFlag) -> Self {
        match flag {
            CreationFlag::New => CreateMode::Exclusive,
            CreationFlag::Truncate => CreateMode::Truncate,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccessFlag {
    #[default]
    Read,
    ReadWrite,
}

impl From<AccessFlag> for AccessMode {
    fn from(flag: AccessFlag) -> Self {
        match flag {
            AccessFlag::Read => AccessMode::ReadOnly,
            AccessFlag::ReadWrite => AccessMode::ReadWrite,
        }
    }
}

/// Property lists and access settings for [`File::create_with`] and
/// [`File::open_with`].
#[derive(Debug, Default)]
pub struct FileOptions {
    pub create: Option<FileCreateProperty>,
    pub access: Option<FileAccessProperty>,
    /// Open for coordinated multi-process access.
    pub coordinated_access: bool,
}

impl FileOptions {
    pub fn coordinated() -> Self {
        Self { coordinated_access: true, ..Self::default() }
    }
}

/// An open container file. Also the root group for [`Location`] operations.
#[derive(Debug)]
pub struct File {
    handle: Handle,
    create: FileCreateProperty,
    access: FileAccessProperty,
}

impl File {
    pub fn create(engine: &Arc<dyn Engine>, path: impl AsRef<Path>, flag: CreationFlag) -> Result<Self> {
        Self::create_with(engine, path, flag, FileOptions::default())
    }

    pub fn create_with(
        engine: &Arc<dyn Engine>,
        path: impl AsRef<Path>,
        flag: CreationFlag,
        opts: FileOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let (create, access) = Self::properties(engine, opts)?;
        let (fcpl, fapl) = (create.id(), access.id());
        let handle = Handle::acquire(engine, ObjectKind::File, |e| {
            e.create_file(path, flag.into(), fcpl, fapl)
        })?;
        debug!(path = %path.display(), ?flag, "created file");
        Ok(Self { handle, create, access })
    }

    pub fn open(engine: &Arc<dyn Engine>, path: impl AsRef<Path>, flag: AccessFlag) -> Result<Self> {
        Self::open_with(engine, path, flag, FileOptions::default())
    }

    pub fn open_with(
        engine: &Arc<dyn Engine>,
        path: impl AsRef<Path>,
        flag: AccessFlag,
        opts: FileOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let (create, access) = Self::properties(engine, opts)?;
        let fapl = access.id();
        let handle = Handle::acquire(engine, ObjectKind::File, |e| e.open_file(path, flag.into(), fapl))?;
        debug!(path = %path.display(), ?flag, "opened file");
        Ok(Self { handle, create, access })
    }

    fn properties(
        engine: &Arc<dyn Engine>,
        opts: FileOptions,
    ) -> Result<(FileCreateProperty, FileAccessProperty)> {
        let create = match opts.create {
            Some(p) => p,
            None => FileCreateProperty::new(engine)?,
        };
        let access = match opts.access {
            Some(p) => p,
            None => FileAccessProperty::new(engine)?,
        };
        if opts.coordinated_access {
            access.set_coordinated_access()?;
        }
        Ok((create, access))
    }

    /// Whether anything exists at `path`.
    pub fn exists(path: impl AsRef<Path>) -> bool {
        path.as_ref().exists()
    }

    /// Whether `path` holds a container the engine can open.
    pub fn is_container(engine: &Arc<dyn Engine>, path: impl AsRef<Path>) -> Result<bool> {
        engine
            .is_container(path.as_ref())
            .map_err(|e| Error::query("is_container", e))
    }

    /// Size of the file on disk in bytes.
    pub fn size(&self) -> Result<u64> {
        let (engine, id) = self.handle.live("size")?;
        engine.file_size(id).map_err(|e| Error::query("file_size", e))
    }

    pub fn read_only(&self) -> Result<bool> {
        let (engine, id) = self.handle.live("read_only")?;
        let intent = engine.file_intent(id).map_err(|e| Error::query("file_intent", e))?;
        Ok(intent == AccessMode::ReadOnly)
    }

    /// Whether the file was opened for coordinated multi-process access.
    pub fn coordinated_access(&self) -> Result<bool> {
        let (engine, id) = self.handle.live("coordinated_access")?;
        engine
            .file_coordinated(id)
            .map_err(|e| Error::query("file_coordinated", e))
    }

    pub fn path(&self) -> Result<PathBuf> {
        let (engine, id) = self.handle.live("path")?;
        engine.file_name(id).map_err(|e| Error::query("file_name", e))
    }

    /// Number of open objects in this file, the file itself included.
    pub fn object_count(&self) -> Result<usize> {
        Ok(self.open_object_ids()?.len())
    }

    pub fn open_object_ids(&self) -> Result<Vec<ObjectId>> {
        let (engine, id) = self.handle.live("open_object_ids")?;
        engine
            .file_object_ids(id)
            .map_err(|e| Error::query("file_object_ids", e))
    }

    /// Write the file back to disk now.
    pub fn flush(&self) -> Result<()> {
        let (engine, id) = self.handle.live("flush")?;
        engine.flush(id).map_err(|e| Error::query("flush", e))
    }

    #[inline]
    pub fn creation_property(&self) -> &FileCreateProperty {
        &self.create
    }

    #[inline]
    pub fn access_property(&self) -> &FileAccessProperty {
        &self.access
    }

    #[inline]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn is_valid(&self) -> Result<bool> {
        self.handle.is_valid()
    }

    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            handle: self.handle.try_clone()?,
            create: self.create.try_clone()?,
            access: self.access.try_clone()?,
        })
    }

    /// Close the file. Objects opened from it keep it alive until they
    /// are closed too.
    pub fn close(&mut self) -> Result<()> {
        self.handle.close()
    }
}

impl Location for File {
    fn location_handle(&self) -> &Handle {
        &self.handle
    }
}

impl PartialEq for File {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}
