//! In-memory image of one container file.
//!
//! Nodes live in an append-only arena; a node index stays valid for the
//! lifetime of the image. Node 0 is the root group.

use std::collections::BTreeMap;

use crate::engine::{EngineError, EngineResult};
use crate::util::{NativeType, Shape};

/// Index of a node in an [`Image`].
pub type NodeId = usize;

/// Stored dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetNode {
    pub native: NativeType,
    pub dims: Shape,
    /// Deflate level applied when the file is written, 0 for raw.
    pub deflate: u8,
    /// Row-major element bytes, `dims.num_points() * native.size()` long.
    pub data: Vec<u8>,
}

impl DatasetNode {
    /// Zero-filled dataset.
    pub fn new(native: NativeType, dims: Shape, deflate: u8) -> Self {
        let len = dims.num_points() * native.size();
        Self { native, dims, deflate, data: vec![0; len] }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Links sorted by name.
    Group(BTreeMap<String, NodeId>),
    Dataset(DatasetNode),
    NamedType(NativeType),
}

impl Node {
    pub fn empty_group() -> Self {
        Self::Group(BTreeMap::new())
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Group(_) => "group",
            Self::Dataset(_) => "dataset",
            Self::NamedType(_) => "datatype",
        }
    }
}

/// Node tree of a file.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    nodes: Vec<Node>,
}

impl Default for Image {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a path into its non-empty components.
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty() && *c != ".")
}

impl Image {
    pub const ROOT: NodeId = 0;

    /// Image holding only an empty root group.
    pub fn new() -> Self {
        Self { nodes: vec![Node::empty_group()] }
    }

    /// Image with no nodes at all; the decoder pushes the root first.
    pub(crate) fn empty() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Append a node without linking it; used while decoding.
    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Replace a node in place; used while decoding.
    pub(crate) fn set(&mut self, id: NodeId, node: Node) {
        if let Some(slot) = self.nodes.get_mut(id) {
            *slot = node;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> EngineResult<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| EngineError::corrupt(format!("node {} out of range", id)))
    }

    pub fn group(&self, id: NodeId) -> EngineResult<&BTreeMap<String, NodeId>> {
        match self.node(id)? {
            Node::Group(links) => Ok(links),
            other => Err(EngineError::invalid(format!("node is a {}, not a group", other.kind_name()))),
        }
    }

    pub fn dataset(&self, id: NodeId) -> EngineResult<&DatasetNode> {
        match self.node(id)? {
            Node::Dataset(ds) => Ok(ds),
            other => Err(EngineError::invalid(format!("node is a {}, not a dataset", other.kind_name()))),
        }
    }

    pub fn dataset_mut(&mut self, id: NodeId) -> EngineResult<&mut DatasetNode> {
        match self.nodes.get_mut(id) {
            Some(Node::Dataset(ds)) => Ok(ds),
            Some(other) => Err(EngineError::invalid(format!("node is a {}, not a dataset", other.kind_name()))),
            None => Err(EngineError::corrupt(format!("node {} out of range", id))),
        }
    }

    /// Link `node` under `parent` as `name`.
    pub fn insert(&mut self, parent: NodeId, name: &str, node: Node) -> EngineResult<NodeId> {
        if self.group(parent)?.contains_key(name) {
            return Err(EngineError::LinkExists(name.to_string()));
        }
        let id = self.push(node);
        if let Some(Node::Group(links)) = self.nodes.get_mut(parent) {
            links.insert(name.to_string(), id);
        }
        Ok(id)
    }

    /// Start node of a path: the root for absolute paths, `from` otherwise.
    fn origin(from: NodeId, path: &str) -> NodeId {
        if path.starts_with('/') {
            Self::ROOT
        } else {
            from
        }
    }

    /// Resolve a path to a node.
    pub fn resolve(&self, from: NodeId, path: &str) -> EngineResult<NodeId> {
        let mut cur = Self::origin(from, path);
        for name in components(path) {
            cur = *self
                .group(cur)?
                .get(name)
                .ok_or_else(|| EngineError::LinkNotFound(path.to_string()))?;
        }
        Ok(cur)
    }

    /// Walk to the group that will hold the last component of `path`,
    /// creating missing groups when `intermediate` is set.
    ///
    /// Returns the parent group and the leaf name.
    pub fn parent_of<'p>(
        &mut self,
        from: NodeId,
        path: &'p str,
        intermediate: bool,
    ) -> EngineResult<(NodeId, &'p str)> {
        let names: Vec<&str> = components(path).collect();
        let Some((leaf, dirs)) = names.split_last() else {
            return Err(EngineError::invalid(format!("empty link name {:?}", path)));
        };

        let mut cur = Self::origin(from, path);
        for name in dirs {
            let found = self.group(cur)?.get(*name).copied();
            cur = match found {
                Some(next) => {
                    self.group(next)?;
                    next
                }
                None if intermediate => self.insert(cur, name, Node::empty_group())?,
                None => return Err(EngineError::LinkNotFound(path.to_string())),
            };
        }
        Ok((cur, leaf))
    }

    /// Whether the last component of `path` exists. Missing intermediate
    /// components are an error; an intermediate that is not a group means
    /// nothing can exist below it.
    pub fn exists(&self, from: NodeId, path: &str) -> EngineResult<bool> {
        let mut cur = Self::origin(from, path);
        let mut names = components(path).peekable();
        while let Some(name) = names.next() {
            let Node::Group(links) = self.node(cur)? else {
                return Ok(false);
            };
            match links.get(name) {
                Some(&next) => cur = next,
                None if names.peek().is_none() => return Ok(false),
                None => return Err(EngineError::LinkNotFound(path.to_string())),
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_resolve() {
        let mut img = Image::new();
        let a = img.insert(Image::ROOT, "a", Node::empty_group()).unwrap();
        let b = img.insert(a, "b", Node::empty_group()).unwrap();
        assert_eq!(img.resolve(Image::ROOT, "/a/b").unwrap(), b);
        assert_eq!(img.resolve(a, "b").unwrap(), b);
        assert_eq!(img.resolve(b, "/").unwrap(), Image::ROOT);
        assert!(matches!(img.resolve(Image::ROOT, "a/c"), Err(EngineError::LinkNotFound(_))));
    }

    #[test]
    fn test_duplicate_link() {
        let mut img = Image::new();
        img.insert(Image::ROOT, "x", Node::empty_group()).unwrap();
        assert!(matches!(
            img.insert(Image::ROOT, "x", Node::empty_group()),
            Err(EngineError::LinkExists(_))
        ));
    }

    #[test]
    fn test_parent_of_intermediate() {
        let mut img = Image::new();
        assert!(img.parent_of(Image::ROOT, "/g1/g2/leaf", false).is_err());

        let (parent, leaf) = img.parent_of(Image::ROOT, "/g1/g2/leaf", true).unwrap();
        assert_eq!(leaf, "leaf");
        assert_eq!(img.resolve(Image::ROOT, "g1/g2").unwrap(), parent);
        assert!(img.exists(Image::ROOT, "g1").unwrap());
        assert!(!img.exists(Image::ROOT, "g1/g2/leaf").unwrap());
        assert!(img.exists(Image::ROOT, "g1/nope/leaf").is_err());
    }

    #[test]
    fn test_dataset_zero_filled() {
        let ds = DatasetNode::new(NativeType::Int32, Shape::from([3, 4]), 0);
        assert_eq!(ds.data.len(), 48);
        assert!(ds.data.iter().all(|&b| b == 0));
    }
}
