//! Resource kinds and the release dispatch table.

use std::fmt;

use crate::engine::{Engine, EngineResult, ObjectId};

/// Kind tag of an engine resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Handle holds no identifier.
    Uninitialized,
    /// Identifier the engine does not recognise.
    Bad,
    File,
    Group,
    Datatype,
    Dataspace,
    Dataset,
    Attribute,
    PropertyList,
    PropertyListClass,
    Reference,
}

impl ObjectKind {
    /// Upper-case tag name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Bad => "BAD",
            Self::File => "FILE",
            Self::Group => "GROUP",
            Self::Datatype => "DATATYPE",
            Self::Dataspace => "DATASPACE",
            Self::Dataset => "DATASET",
            Self::Attribute => "ATTRIBUTE",
            Self::PropertyList => "PROPERTY_LIST",
            Self::PropertyListClass => "PROPERTY_LIST_CLASS",
            Self::Reference => "REFERENCE",
        }
    }

    /// Whether a handle of this kind can be released.
    #[inline]
    pub const fn is_releasable(self) -> bool {
        matches!(
            self,
            Self::File
                | Self::Group
                | Self::Datatype
                | Self::Dataspace
                | Self::Dataset
                | Self::PropertyList
                | Self::PropertyListClass
        )
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A releasable resource: an identifier paired with the one release call
/// that is valid for its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    File(ObjectId),
    Group(ObjectId),
    Datatype(ObjectId),
    Dataspace(ObjectId),
    Dataset(ObjectId),
    PropertyList(ObjectId),
    PropertyListClass(ObjectId),
}

impl Resource {
    /// Tag `id` with `kind`. Kinds without a release call give `None`.
    pub fn new(kind: ObjectKind, id: ObjectId) -> Option<Self> {
        Some(match kind {
            ObjectKind::File => Self::File(id),
            ObjectKind::Group => Self::Group(id),
            ObjectKind::Datatype => Self::Datatype(id),
            ObjectKind::Dataspace => Self::Dataspace(id),
            ObjectKind::Dataset => Self::Dataset(id),
            ObjectKind::PropertyList => Self::PropertyList(id),
            ObjectKind::PropertyListClass => Self::PropertyListClass(id),
            ObjectKind::Uninitialized
            | ObjectKind::Bad
            | ObjectKind::Attribute
            | ObjectKind::Reference => return None,
        })
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::File(_) => ObjectKind::File,
            Self::Group(_) => ObjectKind::Group,
            Self::Datatype(_) => ObjectKind::Datatype,
            Self::Dataspace(_) => ObjectKind::Dataspace,
            Self::Dataset(_) => ObjectKind::Dataset,
            Self::PropertyList(_) => ObjectKind::PropertyList,
            Self::PropertyListClass(_) => ObjectKind::PropertyListClass,
        }
    }

    pub fn id(&self) -> ObjectId {
        match *self {
            Self::File(id)
            | Self::Group(id)
            | Self::Datatype(id)
            | Self::Dataspace(id)
            | Self::Dataset(id)
            | Self::PropertyList(id)
            | Self::PropertyListClass(id) => id,
        }
    }

    /// Drop one reference through the kind-specific release call.
    pub fn release(&self, engine: &dyn Engine) -> EngineResult<()> {
        match *self {
            Self::File(id) => engine.close_file(id),
            Self::Group(id) => engine.close_group(id),
            Self::Datatype(id) => engine.close_datatype(id),
            Self::Dataspace(id) => engine.close_dataspace(id),
            Self::Dataset(id) => engine.close_dataset(id),
            Self::PropertyList(id) => engine.close_plist(id),
            Self::PropertyListClass(id) => engine.close_plist_class(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_tags_round_trip() {
        let id = ObjectId::new(9).unwrap();
        for kind in [
            ObjectKind::File,
            ObjectKind::Group,
            ObjectKind::Datatype,
            ObjectKind::Dataspace,
            ObjectKind::Dataset,
            ObjectKind::PropertyList,
            ObjectKind::PropertyListClass,
        ] {
            let res = Resource::new(kind, id).unwrap();
            assert_eq!(res.kind(), kind);
            assert_eq!(res.id(), id);
            assert!(kind.is_releasable());
        }
    }

    #[test]
    fn test_no_generic_release() {
        let id = ObjectId::new(1).unwrap();
        for kind in [
            ObjectKind::Uninitialized,
            ObjectKind::Bad,
            ObjectKind::Attribute,
            ObjectKind::Reference,
        ] {
            assert!(Resource::new(kind, id).is_none());
            assert!(!kind.is_releasable());
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ObjectKind::PropertyList.to_string(), "PROPERTY_LIST");
        assert_eq!(ObjectKind::Dataspace.to_string(), "DATASPACE");
    }
}
