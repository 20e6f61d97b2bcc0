//! In-memory reference engine.
//!
//! [`MemEngine`] keeps every live resource in one [`Registry`] behind a
//! mutex. A file is loaded into an [`Image`] when opened and written back
//! when its last reference goes away or on [`Engine::flush`]. Groups,
//! datasets and committed datatypes hold an internal reference on their
//! file, so a file stays open while anything inside it is open.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use h5veneer::engine::{Engine, mem::MemEngine};
//!
//! let engine: Arc<dyn Engine> = Arc::new(MemEngine::new());
//! ```

pub mod format;
mod image;
mod reader;
mod space;
mod writer;

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use self::image::{DatasetNode, Image, Node, NodeId};
use self::space::{Sel, SpaceState};
use super::{AccessMode, CreateMode, Engine, EngineError, EngineResult, ObjectId, PropertyClass};
use crate::handle::ObjectKind;
use crate::registry::{DecRef, Registry};
use crate::util::NativeType;

/// Reference engine settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemEngineConfig {
    /// Read containers through a memory map instead of a buffered read.
    pub use_mmap: bool,
    /// Deflate level for datasets created without one.
    pub default_deflate: Option<u32>,
}

impl Default for MemEngineConfig {
    fn default() -> Self {
        Self {
            use_mmap: cfg!(feature = "mmap"),
            default_deflate: None,
        }
    }
}

#[derive(Debug)]
struct FileState {
    path: PathBuf,
    image: Image,
    intent: AccessMode,
    coordinated: bool,
    dirty: bool,
}

#[derive(Debug)]
struct TypeState {
    native: NativeType,
    /// File and node of a committed type.
    committed: Option<(ObjectId, NodeId)>,
}

#[derive(Debug)]
struct PlistState {
    class: PropertyClass,
    coordinated: bool,
    collective: bool,
    intermediate: bool,
    deflate: Option<u32>,
}

impl PlistState {
    fn new(class: PropertyClass) -> Self {
        Self {
            class,
            coordinated: false,
            collective: false,
            intermediate: false,
            deflate: None,
        }
    }
}

#[derive(Debug)]
enum Object {
    File(FileState),
    Group { file: ObjectId, node: NodeId },
    Dataset { file: ObjectId, node: NodeId },
    Datatype(TypeState),
    Dataspace(SpaceState),
    PropertyList(PlistState),
    PropertyListClass(PropertyClass),
}

impl Object {
    fn kind(&self) -> ObjectKind {
        match self {
            Self::File(_) => ObjectKind::File,
            Self::Group { .. } => ObjectKind::Group,
            Self::Dataset { .. } => ObjectKind::Dataset,
            Self::Datatype(_) => ObjectKind::Datatype,
            Self::Dataspace(_) => ObjectKind::Dataspace,
            Self::PropertyList(_) => ObjectKind::PropertyList,
            Self::PropertyListClass(_) => ObjectKind::PropertyListClass,
        }
    }

    /// File holding an internal reference from this object.
    fn parent_file(&self) -> Option<ObjectId> {
        match self {
            Self::Group { file, .. } | Self::Dataset { file, .. } => Some(*file),
            Self::Datatype(TypeState { committed: Some((file, _)), .. }) => Some(*file),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    registry: Registry<Object>,
}

fn wrong_kind(id: ObjectId, expected: ObjectKind, actual: ObjectKind) -> EngineError {
    EngineError::WrongKind { id, expected, actual }
}

fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn persist(fs: &FileState) -> EngineResult<()> {
    if fs.intent == AccessMode::ReadWrite {
        let len = writer::write_file(&fs.path, &fs.image)?;
        debug!(path = %fs.path.display(), bytes = len, "wrote container");
    }
    Ok(())
}

impl State {
    fn get(&self, id: ObjectId) -> EngineResult<&Object> {
        self.registry.get(id).ok_or(EngineError::InvalidId(id))
    }

    fn get_mut(&mut self, id: ObjectId) -> EngineResult<&mut Object> {
        self.registry.get_mut(id).ok_or(EngineError::InvalidId(id))
    }

    fn expect_kind(&self, id: ObjectId, expected: ObjectKind) -> EngineResult<()> {
        let actual = self.get(id)?.kind();
        if actual != expected {
            return Err(wrong_kind(id, expected, actual));
        }
        Ok(())
    }

    fn file(&self, id: ObjectId) -> EngineResult<&FileState> {
        match self.get(id)? {
            Object::File(fs) => Ok(fs),
            other => Err(wrong_kind(id, ObjectKind::File, other.kind())),
        }
    }

    fn file_mut(&mut self, id: ObjectId) -> EngineResult<&mut FileState> {
        match self.get_mut(id)? {
            Object::File(fs) => Ok(fs),
            other => Err(wrong_kind(id, ObjectKind::File, other.kind())),
        }
    }

    /// Writable file image.
    fn writable(&mut self, file: ObjectId) -> EngineResult<&mut FileState> {
        let fs = self.file_mut(file)?;
        if fs.intent != AccessMode::ReadWrite {
            return Err(EngineError::ReadOnly);
        }
        Ok(fs)
    }

    fn file_of(&self, obj: ObjectId) -> EngineResult<ObjectId> {
        let o = self.get(obj)?;
        match o {
            Object::File(_) => Ok(obj),
            _ => o
                .parent_file()
                .ok_or_else(|| EngineError::invalid(format!("{} {} does not belong to a file", o.kind(), obj))),
        }
    }

    /// File and group node a location identifier stands for.
    fn location(&self, loc: ObjectId) -> EngineResult<(ObjectId, NodeId)> {
        match self.get(loc)? {
            Object::File(_) => Ok((loc, Image::ROOT)),
            Object::Group { file, node } => Ok((*file, *node)),
            other => Err(wrong_kind(loc, ObjectKind::Group, other.kind())),
        }
    }

    fn dataset(&self, id: ObjectId) -> EngineResult<(ObjectId, NodeId)> {
        match self.get(id)? {
            Object::Dataset { file, node } => Ok((*file, *node)),
            other => Err(wrong_kind(id, ObjectKind::Dataset, other.kind())),
        }
    }

    fn dataset_node(&self, id: ObjectId) -> EngineResult<&DatasetNode> {
        let (file, node) = self.dataset(id)?;
        self.file(file)?.image.dataset(node)
    }

    fn space(&self, id: ObjectId) -> EngineResult<&SpaceState> {
        match self.get(id)? {
            Object::Dataspace(s) => Ok(s),
            other => Err(wrong_kind(id, ObjectKind::Dataspace, other.kind())),
        }
    }

    fn space_mut(&mut self, id: ObjectId) -> EngineResult<&mut SpaceState> {
        match self.get_mut(id)? {
            Object::Dataspace(s) => Ok(s),
            other => Err(wrong_kind(id, ObjectKind::Dataspace, other.kind())),
        }
    }

    fn datatype(&self, id: ObjectId) -> EngineResult<&TypeState> {
        match self.get(id)? {
            Object::Datatype(t) => Ok(t),
            other => Err(wrong_kind(id, ObjectKind::Datatype, other.kind())),
        }
    }

    fn plist(&self, id: ObjectId, class: PropertyClass) -> EngineResult<&PlistState> {
        let p = match self.get(id)? {
            Object::PropertyList(p) => p,
            other => return Err(wrong_kind(id, ObjectKind::PropertyList, other.kind())),
        };
        if p.class != class {
            return Err(EngineError::invalid(format!(
                "property list {} is a {} list, expected {}",
                id, p.class, class
            )));
        }
        Ok(p)
    }

    fn plist_mut(&mut self, id: ObjectId, class: PropertyClass) -> EngineResult<&mut PlistState> {
        self.plist(id, class)?;
        match self.get_mut(id)? {
            Object::PropertyList(p) => Ok(p),
            other => Err(wrong_kind(id, ObjectKind::PropertyList, other.kind())),
        }
    }

    /// Validate an optional property list argument.
    fn check_plist(&self, id: Option<ObjectId>, class: PropertyClass) -> EngineResult<()> {
        if let Some(id) = id {
            self.plist(id, class)?;
        }
        Ok(())
    }

    fn intermediate(&self, lcpl: Option<ObjectId>) -> EngineResult<bool> {
        match lcpl {
            Some(id) => Ok(self.plist(id, PropertyClass::LinkCreate)?.intermediate),
            None => Ok(false),
        }
    }

    /// Register an object that keeps `file` open.
    fn insert_in_file(&mut self, kind: ObjectKind, obj: Object, file: ObjectId) -> EngineResult<ObjectId> {
        self.registry.inc_ref(file).ok_or(EngineError::InvalidId(file))?;
        let id = self.registry.insert(kind, obj);
        trace!(%id, %kind, %file, "opened object in file");
        Ok(id)
    }

    fn find_open(&self, path: &Path) -> Option<ObjectId> {
        self.registry.iter().find_map(|(id, slot)| match slot.value() {
            Object::File(fs) if fs.path.as_path() == path => Some(id),
            _ => None,
        })
    }

    /// Element offsets for a transfer: (file offsets, memory offsets, memory extent points).
    fn plan_transfer(
        &self,
        dataset: ObjectId,
        mem_type: ObjectId,
        mem_space: Option<ObjectId>,
        file_space: Option<ObjectId>,
        xfer: Option<ObjectId>,
    ) -> EngineResult<(Vec<usize>, Vec<usize>, usize)> {
        self.check_plist(xfer, PropertyClass::DatasetTransfer)?;
        let ds = self.dataset_node(dataset)?;
        let mem_native = self.datatype(mem_type)?.native;
        if mem_native != ds.native {
            return Err(EngineError::invalid(format!(
                "memory type {} does not match stored type {}",
                mem_native, ds.native
            )));
        }

        let file_offsets = match file_space {
            None => (0..ds.dims.num_points()).collect(),
            Some(id) => {
                let s = self.space(id)?;
                if s.dims != ds.dims {
                    return Err(EngineError::invalid(format!(
                        "file dataspace extent {} differs from dataset extent {}",
                        s.dims, ds.dims
                    )));
                }
                s.offsets()
            }
        };

        let (mem_offsets, mem_points) = match mem_space {
            None => {
                let points = match file_space {
                    Some(id) => self.space(id)?.dims.num_points(),
                    None => ds.dims.num_points(),
                };
                (file_offsets.clone(), points)
            }
            Some(id) => {
                let s = self.space(id)?;
                (s.offsets(), s.dims.num_points())
            }
        };

        if mem_offsets.len() != file_offsets.len() {
            return Err(EngineError::invalid(format!(
                "memory selection has {} elements, file selection has {}",
                mem_offsets.len(),
                file_offsets.len()
            )));
        }
        Ok((file_offsets, mem_offsets, mem_points))
    }
}

/// In-memory engine persisting files as small binary containers.
#[derive(Debug, Default)]
pub struct MemEngine {
    config: MemEngineConfig,
    state: Mutex<State>,
}

impl MemEngine {
    /// Engine with default settings.
    pub fn new() -> Self {
        Self::with_config(MemEngineConfig::default())
    }

    pub fn with_config(config: MemEngineConfig) -> Self {
        Self { config, state: Mutex::new(State::default()) }
    }

    #[inline]
    pub fn config(&self) -> &MemEngineConfig {
        &self.config
    }

    /// Number of live identifiers, internal file references not counted.
    pub fn live_objects(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Drop one reference; `expected` restricts the kind.
    fn release(&self, id: ObjectId, expected: Option<ObjectKind>) -> EngineResult<usize> {
        let mut st = self.state.lock();
        if let Some(expected) = expected {
            st.expect_kind(id, expected)?;
        }

        let mut next = match st.registry.dec_ref(id).ok_or(EngineError::InvalidId(id))? {
            DecRef::Alive(n) => {
                trace!(%id, refs = n, "dropped reference");
                return Ok(n);
            }
            DecRef::Freed(obj) => Some((id, obj)),
        };

        let mut failure = None;
        while let Some((id, obj)) = next.take() {
            trace!(%id, kind = %obj.kind(), "freed object");
            if let Object::File(fs) = &obj {
                if fs.dirty {
                    if let Err(e) = persist(fs) {
                        warn!(path = %fs.path.display(), error = %e, "failed to write back file");
                        failure.get_or_insert(e);
                    }
                }
                debug!(path = %fs.path.display(), "closed file");
            }
            if let Some(file) = obj.parent_file() {
                match st.registry.dec_ref(file) {
                    Some(DecRef::Freed(parent)) => next = Some((file, parent)),
                    Some(DecRef::Alive(n)) => trace!(%file, refs = n, "dropped internal file reference"),
                    None => warn!(%file, "internal file reference already gone"),
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(0),
        }
    }

    fn close_as(&self, id: ObjectId, kind: ObjectKind) -> EngineResult<()> {
        self.release(id, Some(kind)).map(|_| ())
    }
}

impl Drop for MemEngine {
    fn drop(&mut self) {
        let st = self.state.get_mut();
        for (_, slot) in st.registry.iter() {
            if let Object::File(fs) = slot.value() {
                if fs.dirty {
                    if let Err(e) = persist(fs) {
                        warn!(path = %fs.path.display(), error = %e, "failed to write back file on shutdown");
                    }
                }
            }
        }
    }
}

impl Engine for MemEngine {
    fn kind_of(&self, id: ObjectId) -> EngineResult<ObjectKind> {
        Ok(self.state.lock().registry.kind(id).unwrap_or(ObjectKind::Bad))
    }

    fn is_valid(&self, id: ObjectId) -> EngineResult<bool> {
        Ok(self.state.lock().registry.contains(id))
    }

    fn inc_ref(&self, id: ObjectId) -> EngineResult<usize> {
        let refs = self.state.lock().registry.inc_ref(id).ok_or(EngineError::InvalidId(id))?;
        trace!(%id, refs, "added reference");
        Ok(refs)
    }

    fn dec_ref(&self, id: ObjectId) -> EngineResult<usize> {
        self.release(id, None)
    }

    fn ref_count(&self, id: ObjectId) -> EngineResult<usize> {
        self.state.lock().registry.refs(id).ok_or(EngineError::InvalidId(id))
    }

    fn close_file(&self, id: ObjectId) -> EngineResult<()> {
        self.close_as(id, ObjectKind::File)
    }

    fn close_group(&self, id: ObjectId) -> EngineResult<()> {
        self.close_as(id, ObjectKind::Group)
    }

    fn close_datatype(&self, id: ObjectId) -> EngineResult<()> {
        self.close_as(id, ObjectKind::Datatype)
    }

    fn close_dataspace(&self, id: ObjectId) -> EngineResult<()> {
        self.close_as(id, ObjectKind::Dataspace)
    }

    fn close_dataset(&self, id: ObjectId) -> EngineResult<()> {
        self.close_as(id, ObjectKind::Dataset)
    }

    fn close_plist(&self, id: ObjectId) -> EngineResult<()> {
        self.close_as(id, ObjectKind::PropertyList)
    }

    fn close_plist_class(&self, id: ObjectId) -> EngineResult<()> {
        self.close_as(id, ObjectKind::PropertyListClass)
    }

    // ------------------------------------------------------------------
    // Shape
    // ------------------------------------------------------------------

    fn create_simple_space(&self, dims: &[usize]) -> EngineResult<ObjectId> {
        if dims.is_empty() {
            return Err(EngineError::invalid("simple dataspace needs at least one dimension"));
        }
        let space = SpaceState::simple(dims);
        if space.dims.checked_num_points().is_none() {
            return Err(EngineError::invalid(format!("extent {} has too many elements", space.dims)));
        }
        let mut st = self.state.lock();
        Ok(st.registry.insert(ObjectKind::Dataspace, Object::Dataspace(space)))
    }

    fn create_scalar_space(&self) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        Ok(st.registry.insert(ObjectKind::Dataspace, Object::Dataspace(SpaceState::scalar())))
    }

    fn copy_space(&self, space: ObjectId) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        let copy = st.space(space)?.clone();
        Ok(st.registry.insert(ObjectKind::Dataspace, Object::Dataspace(copy)))
    }

    fn space_rank(&self, space: ObjectId) -> EngineResult<usize> {
        Ok(self.state.lock().space(space)?.rank())
    }

    fn space_dims(&self, space: ObjectId, out: &mut [usize]) -> EngineResult<()> {
        let st = self.state.lock();
        let s = st.space(space)?;
        if out.len() != s.rank() {
            return Err(EngineError::invalid(format!(
                "extent buffer has {} entries, rank is {}",
                out.len(),
                s.rank()
            )));
        }
        out.copy_from_slice(s.dims.sizes());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    fn select_all(&self, space: ObjectId) -> EngineResult<()> {
        self.state.lock().space_mut(space)?.sel = Sel::All;
        Ok(())
    }

    fn select_none(&self, space: ObjectId) -> EngineResult<()> {
        self.state.lock().space_mut(space)?.sel = Sel::None;
        Ok(())
    }

    fn select_hyperslab(
        &self,
        space: ObjectId,
        start: &[usize],
        stride: &[usize],
        count: &[usize],
        block: &[usize],
    ) -> EngineResult<()> {
        self.state
            .lock()
            .space_mut(space)?
            .select_hyperslab(start, stride, count, block)
    }

    fn select_elements(&self, space: ObjectId, count: usize, coords: &[usize]) -> EngineResult<()> {
        self.state.lock().space_mut(space)?.select_points(count, coords)
    }

    fn selection_bounds(&self, space: ObjectId, start: &mut [usize], end: &mut [usize]) -> EngineResult<()> {
        self.state.lock().space(space)?.bounds(start, end)
    }

    fn selected_count(&self, space: ObjectId) -> EngineResult<usize> {
        Ok(self.state.lock().space(space)?.selected_count())
    }

    // ------------------------------------------------------------------
    // Transfer
    // ------------------------------------------------------------------

    fn read(
        &self,
        dataset: ObjectId,
        mem_type: ObjectId,
        mem_space: Option<ObjectId>,
        file_space: Option<ObjectId>,
        xfer: Option<ObjectId>,
        buf: &mut [u8],
    ) -> EngineResult<()> {
        let st = self.state.lock();
        let (file_offsets, mem_offsets, mem_points) =
            st.plan_transfer(dataset, mem_type, mem_space, file_space, xfer)?;
        let ds = st.dataset_node(dataset)?;
        let esize = ds.native.size();
        if buf.len() < mem_points * esize {
            return Err(EngineError::invalid(format!(
                "buffer holds {} bytes, memory extent needs {}",
                buf.len(),
                mem_points * esize
            )));
        }

        for (&m, &f) in mem_offsets.iter().zip(file_offsets.iter()) {
            buf[m * esize..(m + 1) * esize].copy_from_slice(&ds.data[f * esize..(f + 1) * esize]);
        }
        trace!(%dataset, elements = file_offsets.len(), "read");
        Ok(())
    }

    fn write(
        &self,
        dataset: ObjectId,
        mem_type: ObjectId,
        mem_space: Option<ObjectId>,
        file_space: Option<ObjectId>,
        xfer: Option<ObjectId>,
        buf: &[u8],
    ) -> EngineResult<()> {
        let mut st = self.state.lock();
        let (file_offsets, mem_offsets, mem_points) =
            st.plan_transfer(dataset, mem_type, mem_space, file_space, xfer)?;
        let (file, node) = st.dataset(dataset)?;
        let fs = st.writable(file)?;
        let ds = fs.image.dataset_mut(node)?;
        let esize = ds.native.size();
        if buf.len() < mem_points * esize {
            return Err(EngineError::invalid(format!(
                "buffer holds {} bytes, memory extent needs {}",
                buf.len(),
                mem_points * esize
            )));
        }

        for (&m, &f) in mem_offsets.iter().zip(file_offsets.iter()) {
            ds.data[f * esize..(f + 1) * esize].copy_from_slice(&buf[m * esize..(m + 1) * esize]);
        }
        if !file_offsets.is_empty() {
            fs.dirty = true;
        }
        trace!(%dataset, elements = file_offsets.len(), "write");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    fn create_file(
        &self,
        path: &Path,
        mode: CreateMode,
        fcpl: Option<ObjectId>,
        fapl: Option<ObjectId>,
    ) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        st.check_plist(fcpl, PropertyClass::FileCreate)?;
        let coordinated = match fapl {
            Some(id) => st.plist(id, PropertyClass::FileAccess)?.coordinated,
            None => false,
        };
        if st.find_open(&normalize(path)).is_some() {
            return Err(EngineError::invalid(format!("{} is already open", path.display())));
        }

        if mode == CreateMode::Exclusive {
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .map_err(|e| match e.kind() {
                    io::ErrorKind::AlreadyExists => EngineError::FileExists(path.to_path_buf()),
                    _ => EngineError::Io(e),
                })?;
        }
        let image = Image::new();
        writer::write_file(path, &image)?;

        let path = normalize(path);
        debug!(path = %path.display(), ?mode, coordinated, "created file");
        let fs = FileState {
            path,
            image,
            intent: AccessMode::ReadWrite,
            coordinated,
            dirty: false,
        };
        Ok(st.registry.insert(ObjectKind::File, Object::File(fs)))
    }

    fn open_file(&self, path: &Path, mode: AccessMode, fapl: Option<ObjectId>) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        let coordinated = match fapl {
            Some(id) => st.plist(id, PropertyClass::FileAccess)?.coordinated,
            None => false,
        };

        let norm = normalize(path);
        if let Some(id) = st.find_open(&norm) {
            if mode == AccessMode::ReadWrite && st.file(id)?.intent == AccessMode::ReadOnly {
                return Err(EngineError::invalid(format!("{} is already open read-only", path.display())));
            }
            let refs = st.registry.inc_ref(id).ok_or(EngineError::InvalidId(id))?;
            trace!(%id, refs, "reopened file");
            return Ok(id);
        }

        let image = reader::read_file(path, self.config.use_mmap)?;
        debug!(path = %norm.display(), ?mode, nodes = image.len(), "opened file");
        let fs = FileState {
            path: norm,
            image,
            intent: mode,
            coordinated,
            dirty: false,
        };
        Ok(st.registry.insert(ObjectKind::File, Object::File(fs)))
    }

    fn flush(&self, obj: ObjectId) -> EngineResult<()> {
        let mut st = self.state.lock();
        let file = st.file_of(obj)?;
        let fs = st.file_mut(file)?;
        persist(fs)?;
        fs.dirty = false;
        Ok(())
    }

    fn file_intent(&self, file: ObjectId) -> EngineResult<AccessMode> {
        Ok(self.state.lock().file(file)?.intent)
    }

    fn file_coordinated(&self, file: ObjectId) -> EngineResult<bool> {
        Ok(self.state.lock().file(file)?.coordinated)
    }

    fn file_size(&self, file: ObjectId) -> EngineResult<u64> {
        let st = self.state.lock();
        let path = &st.file(file)?.path;
        Ok(std::fs::metadata(path)?.len())
    }

    fn file_name(&self, obj: ObjectId) -> EngineResult<PathBuf> {
        let st = self.state.lock();
        let file = st.file_of(obj)?;
        Ok(st.file(file)?.path.clone())
    }

    fn file_object_ids(&self, file: ObjectId) -> EngineResult<Vec<ObjectId>> {
        let st = self.state.lock();
        st.file(file)?;
        let mut ids: Vec<ObjectId> = st
            .registry
            .iter()
            .filter(|(id, slot)| *id == file || slot.value().parent_file() == Some(file))
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn is_container(&self, path: &Path) -> EngineResult<bool> {
        reader::is_container(path)
    }

    // ------------------------------------------------------------------
    // Naming and linking
    // ------------------------------------------------------------------

    fn create_group(
        &self,
        loc: ObjectId,
        path: &str,
        lcpl: Option<ObjectId>,
        gcpl: Option<ObjectId>,
        gapl: Option<ObjectId>,
    ) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        st.check_plist(gcpl, PropertyClass::GroupCreate)?;
        st.check_plist(gapl, PropertyClass::GroupAccess)?;
        let intermediate = st.intermediate(lcpl)?;
        let (file, from) = st.location(loc)?;

        let fs = st.writable(file)?;
        let (parent, leaf) = fs.image.parent_of(from, path, intermediate)?;
        let node = fs.image.insert(parent, leaf, Node::empty_group())?;
        fs.dirty = true;
        debug!(%file, path, "created group");
        st.insert_in_file(ObjectKind::Group, Object::Group { file, node }, file)
    }

    fn open_group(&self, loc: ObjectId, path: &str, gapl: Option<ObjectId>) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        st.check_plist(gapl, PropertyClass::GroupAccess)?;
        let (file, from) = st.location(loc)?;
        let image = &st.file(file)?.image;
        let node = image.resolve(from, path)?;
        image.group(node)?;
        st.insert_in_file(ObjectKind::Group, Object::Group { file, node }, file)
    }

    fn link_exists(&self, loc: ObjectId, path: &str) -> EngineResult<bool> {
        let st = self.state.lock();
        let (file, from) = st.location(loc)?;
        st.file(file)?.image.exists(from, path)
    }

    fn link_names(&self, loc: ObjectId) -> EngineResult<Vec<String>> {
        let st = self.state.lock();
        let (file, node) = st.location(loc)?;
        Ok(st.file(file)?.image.group(node)?.keys().cloned().collect())
    }

    fn open_object(&self, loc: ObjectId, path: &str, lapl: Option<ObjectId>) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        st.check_plist(lapl, PropertyClass::LinkAccess)?;
        let (file, from) = st.location(loc)?;
        let image = &st.file(file)?.image;
        let node = image.resolve(from, path)?;
        let (kind, obj) = match image.node(node)? {
            Node::Group(_) => (ObjectKind::Group, Object::Group { file, node }),
            Node::Dataset(_) => (ObjectKind::Dataset, Object::Dataset { file, node }),
            Node::NamedType(native) => (
                ObjectKind::Datatype,
                Object::Datatype(TypeState { native: *native, committed: Some((file, node)) }),
            ),
        };
        st.insert_in_file(kind, obj, file)
    }

    fn create_dataset(
        &self,
        loc: ObjectId,
        name: &str,
        dtype: ObjectId,
        space: ObjectId,
        lcpl: Option<ObjectId>,
        dcpl: Option<ObjectId>,
        dapl: Option<ObjectId>,
    ) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        st.check_plist(dapl, PropertyClass::DatasetAccess)?;
        let intermediate = st.intermediate(lcpl)?;
        let deflate = match dcpl {
            Some(id) => st.plist(id, PropertyClass::DatasetCreate)?.deflate,
            None => None,
        }
        .or(self.config.default_deflate)
        .unwrap_or(0)
        .min(9) as u8;
        let native = st.datatype(dtype)?.native;
        let dims = st.space(space)?.dims.clone();
        dims.checked_num_points()
            .and_then(|n| n.checked_mul(native.size()))
            .filter(|&bytes| bytes <= isize::MAX as usize)
            .ok_or_else(|| {
                EngineError::invalid(format!("dataset of {} {} elements is too large", dims, native))
            })?;
        let (file, from) = st.location(loc)?;

        let fs = st.writable(file)?;
        let (parent, leaf) = fs.image.parent_of(from, name, intermediate)?;
        let node = fs
            .image
            .insert(parent, leaf, Node::Dataset(DatasetNode::new(native, dims, deflate)))?;
        fs.dirty = true;
        debug!(%file, name, %native, deflate, "created dataset");
        st.insert_in_file(ObjectKind::Dataset, Object::Dataset { file, node }, file)
    }

    fn open_dataset(&self, loc: ObjectId, name: &str, dapl: Option<ObjectId>) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        st.check_plist(dapl, PropertyClass::DatasetAccess)?;
        let (file, from) = st.location(loc)?;
        let image = &st.file(file)?.image;
        let node = image.resolve(from, name)?;
        image.dataset(node)?;
        st.insert_in_file(ObjectKind::Dataset, Object::Dataset { file, node }, file)
    }

    fn dataset_space(&self, dataset: ObjectId) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        let dims = st.dataset_node(dataset)?.dims.clone();
        let space = SpaceState { dims, sel: Sel::All };
        Ok(st.registry.insert(ObjectKind::Dataspace, Object::Dataspace(space)))
    }

    fn dataset_type(&self, dataset: ObjectId) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        let native = st.dataset_node(dataset)?.native;
        Ok(st.registry.insert(
            ObjectKind::Datatype,
            Object::Datatype(TypeState { native, committed: None }),
        ))
    }

    // ------------------------------------------------------------------
    // Datatypes
    // ------------------------------------------------------------------

    fn native_type(&self, native: NativeType) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        Ok(st.registry.insert(
            ObjectKind::Datatype,
            Object::Datatype(TypeState { native, committed: None }),
        ))
    }

    fn copy_type(&self, dtype: ObjectId) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        let native = st.datatype(dtype)?.native;
        Ok(st.registry.insert(
            ObjectKind::Datatype,
            Object::Datatype(TypeState { native, committed: None }),
        ))
    }

    fn commit_type(
        &self,
        loc: ObjectId,
        name: &str,
        dtype: ObjectId,
        lcpl: Option<ObjectId>,
        tcpl: Option<ObjectId>,
        tapl: Option<ObjectId>,
    ) -> EngineResult<()> {
        let mut st = self.state.lock();
        st.check_plist(tcpl, PropertyClass::DatatypeCreate)?;
        st.check_plist(tapl, PropertyClass::DatatypeAccess)?;
        let intermediate = st.intermediate(lcpl)?;
        let t = st.datatype(dtype)?;
        if t.committed.is_some() {
            return Err(EngineError::invalid(format!("datatype {} is already committed", dtype)));
        }
        let native = t.native;
        let (file, from) = st.location(loc)?;

        let fs = st.writable(file)?;
        let (parent, leaf) = fs.image.parent_of(from, name, intermediate)?;
        let node = fs.image.insert(parent, leaf, Node::NamedType(native))?;
        fs.dirty = true;

        st.registry.inc_ref(file).ok_or(EngineError::InvalidId(file))?;
        if let Object::Datatype(t) = st.get_mut(dtype)? {
            t.committed = Some((file, node));
        }
        debug!(%file, name, %native, "committed datatype");
        Ok(())
    }

    fn open_type(&self, loc: ObjectId, name: &str, tapl: Option<ObjectId>) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        st.check_plist(tapl, PropertyClass::DatatypeAccess)?;
        let (file, from) = st.location(loc)?;
        let image = &st.file(file)?.image;
        let node = image.resolve(from, name)?;
        let native = match image.node(node)? {
            Node::NamedType(native) => *native,
            other => {
                return Err(EngineError::invalid(format!(
                    "{:?} is a {}, not a datatype",
                    name,
                    other.kind_name()
                )))
            }
        };
        let obj = Object::Datatype(TypeState { native, committed: Some((file, node)) });
        st.insert_in_file(ObjectKind::Datatype, obj, file)
    }

    fn type_committed(&self, dtype: ObjectId) -> EngineResult<bool> {
        Ok(self.state.lock().datatype(dtype)?.committed.is_some())
    }

    fn type_native(&self, dtype: ObjectId) -> EngineResult<NativeType> {
        Ok(self.state.lock().datatype(dtype)?.native)
    }

    // ------------------------------------------------------------------
    // Property lists
    // ------------------------------------------------------------------

    fn create_plist(&self, class: PropertyClass) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        Ok(st.registry.insert(ObjectKind::PropertyList, Object::PropertyList(PlistState::new(class))))
    }

    fn plist_class(&self, plist: ObjectId) -> EngineResult<PropertyClass> {
        match self.state.lock().get(plist)? {
            Object::PropertyList(p) => Ok(p.class),
            other => Err(wrong_kind(plist, ObjectKind::PropertyList, other.kind())),
        }
    }

    fn open_plist_class(&self, class: PropertyClass) -> EngineResult<ObjectId> {
        let mut st = self.state.lock();
        Ok(st.registry.insert(ObjectKind::PropertyListClass, Object::PropertyListClass(class)))
    }

    fn set_coordinated_access(&self, fapl: ObjectId, on: bool) -> EngineResult<()> {
        self.state.lock().plist_mut(fapl, PropertyClass::FileAccess)?.coordinated = on;
        Ok(())
    }

    fn coordinated_access(&self, fapl: ObjectId) -> EngineResult<bool> {
        Ok(self.state.lock().plist(fapl, PropertyClass::FileAccess)?.coordinated)
    }

    fn set_collective_transfer(&self, dxpl: ObjectId, on: bool) -> EngineResult<()> {
        self.state.lock().plist_mut(dxpl, PropertyClass::DatasetTransfer)?.collective = on;
        Ok(())
    }

    fn collective_transfer(&self, dxpl: ObjectId) -> EngineResult<bool> {
        Ok(self.state.lock().plist(dxpl, PropertyClass::DatasetTransfer)?.collective)
    }

    fn set_create_intermediate(&self, lcpl: ObjectId, on: bool) -> EngineResult<()> {
        self.state.lock().plist_mut(lcpl, PropertyClass::LinkCreate)?.intermediate = on;
        Ok(())
    }

    fn create_intermediate(&self, lcpl: ObjectId) -> EngineResult<bool> {
        Ok(self.state.lock().plist(lcpl, PropertyClass::LinkCreate)?.intermediate)
    }

    fn set_deflate(&self, dcpl: ObjectId, level: u32) -> EngineResult<()> {
        if level > 9 {
            return Err(EngineError::invalid(format!("deflate level {} is not in 0..=9", level)));
        }
        self.state.lock().plist_mut(dcpl, PropertyClass::DatasetCreate)?.deflate =
            (level > 0).then_some(level);
        Ok(())
    }

    fn deflate(&self, dcpl: ObjectId) -> EngineResult<Option<u32>> {
        Ok(self.state.lock().plist(dcpl, PropertyClass::DatasetCreate)?.deflate)
    }
}
