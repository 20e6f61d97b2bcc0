//! Groups.

use super::location::Location;
use super::plist::{GroupAccessProperty, GroupCreateProperty, LinkCreateProperty};
use crate::handle::{Handle, ObjectKind};
use crate::util::Result;

/// A group of links inside a file.
#[derive(Debug, Default, PartialEq)]
pub struct Group {
    handle: Handle,
}

impl Group {
    /// Create a group at `path`, creating missing parent groups too.
    pub fn create<L: Location + ?Sized>(loc: &L, path: &str) -> Result<Self> {
        Self::create_with(loc, path, true, None, None)
    }

    pub fn create_with<L: Location + ?Sized>(
        loc: &L,
        path: &str,
        create_intermediate: bool,
        gcpl: Option<&GroupCreateProperty>,
        gapl: Option<&GroupAccessProperty>,
    ) -> Result<Self> {
        let (engine, loc_id) = loc.location_handle().live("create group")?;
        let lcpl = LinkCreateProperty::new(engine)?;
        lcpl.set_create_intermediate_groups(create_intermediate)?;

        let (lcpl_id, gcpl_id, gapl_id) = (lcpl.id(), gcpl.and_then(|p| p.id()), gapl.and_then(|p| p.id()));
        let handle = Handle::acquire(engine, ObjectKind::Group, |e| {
            e.create_group(loc_id, path, lcpl_id, gcpl_id, gapl_id)
        })?;
        Ok(Self { handle })
    }

    pub fn open<L: Location + ?Sized>(loc: &L, path: &str) -> Result<Self> {
        let (engine, loc_id) = loc.location_handle().live("open group")?;
        let handle = Handle::acquire(engine, ObjectKind::Group, |e| e.open_group(loc_id, path, None))?;
        Ok(Self { handle })
    }

    /// Whether every component of `path` exists below `loc`.
    pub fn exists<L: Location + ?Sized>(loc: &L, path: &str) -> Result<bool> {
        loc.link_exists(path)
    }

    /// Wrap a handle, which must refer to a group.
    pub fn from_handle(handle: Handle) -> Result<Self> {
        handle.ensure_kind(ObjectKind::Group)?;
        Ok(Self { handle })
    }

    #[inline]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn is_valid(&self) -> Result<bool> {
        self.handle.is_valid()
    }

    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self { handle: self.handle.try_clone()? })
    }

    pub fn close(&mut self) -> Result<()> {
        self.handle.close()
    }
}

impl Location for Group {
    fn location_handle(&self) -> &Handle {
        &self.handle
    }
}
