//! Topology tree elements
//!
//! A node's full path is its network location followed by `/` and its
//! name, e.g. host `bookie-1` at `/dc1/rack1` has path
//! `/dc1/rack1/bookie-1`.

use crate::error::{TopologyError, TopologyResult};
use std::collections::BTreeMap;
use std::fmt;

/// Separator between path segments
pub const PATH_SEPARATOR: char = '/';

/// Network location of the root
pub const ROOT: &str = "";

/// A host (leaf) in the topology
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeBase {
    name: String,
    network_location: String,
}

impl NodeBase {
    /// Create a host entry. Validation happens when the node is added.
    pub fn new(name: impl Into<String>, network_location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            network_location: network_location.into(),
        }
    }

    /// Split a full path (`/rack/host`) into location and name.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        match path.rsplit_once(PATH_SEPARATOR) {
            Some((location, name)) => Self::new(name, location),
            None => Self::new(path, ROOT),
        }
    }

    /// Host name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location of the rack holding this host
    #[must_use]
    pub fn network_location(&self) -> &str {
        &self.network_location
    }

    /// Full path
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}{}{}", self.network_location, PATH_SEPARATOR, self.name)
    }
}

impl fmt::Display for NodeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.network_location, PATH_SEPARATOR, self.name)
    }
}

/// A rack or other intermediate path segment.
///
/// Inner nodes are built and owned by the topology; a value constructed
/// with [`InnerNode::new`] can describe one but is never accepted by
/// [`add`](crate::NetworkTopology::add) or
/// [`remove`](crate::NetworkTopology::remove).
#[derive(Clone, Debug)]
pub struct InnerNode {
    name: String,
    network_location: String,
    /// Children keyed by their name (the next path segment)
    pub(crate) children: BTreeMap<String, Node>,
    /// Leaves anywhere below this node
    pub(crate) num_leaves: usize,
}

impl InnerNode {
    /// Create an empty inner node
    pub fn new(name: impl Into<String>, network_location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            network_location: network_location.into(),
            children: BTreeMap::new(),
            num_leaves: 0,
        }
    }

    pub(crate) fn root() -> Self {
        Self::new(ROOT, ROOT)
    }

    /// Segment name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location of the parent
    #[must_use]
    pub fn network_location(&self) -> &str {
        &self.network_location
    }

    /// Full path; empty for the root
    #[must_use]
    pub fn path(&self) -> String {
        if self.name.is_empty() {
            ROOT.to_string()
        } else {
            format!("{}{}{}", self.network_location, PATH_SEPARATOR, self.name)
        }
    }

    /// Leaves anywhere below this node
    #[must_use]
    pub const fn num_of_leaves(&self) -> usize {
        self.num_leaves
    }

    /// Direct children
    #[must_use]
    pub fn num_of_children(&self) -> usize {
        self.children.len()
    }

    /// True if at least one direct child is a host
    #[must_use]
    pub fn is_rack(&self) -> bool {
        self.children.values().any(Node::is_leaf)
    }

    pub(crate) fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    /// Visit every leaf below this node in path order
    pub(crate) fn for_each_leaf<'a>(&'a self, f: &mut impl FnMut(&'a NodeBase)) {
        for child in self.children.values() {
            match child {
                Node::Leaf(leaf) => f(leaf),
                Node::Inner(inner) => inner.for_each_leaf(f),
            }
        }
    }

    /// Visit every inner node below this one (not including it)
    pub(crate) fn for_each_inner<'a>(&'a self, f: &mut impl FnMut(&'a InnerNode)) {
        for child in self.children.values() {
            if let Node::Inner(inner) = child {
                f(inner);
                inner.for_each_inner(f);
            }
        }
    }
}

/// Element of the topology tree
#[derive(Clone, Debug)]
pub enum Node {
    /// A host
    Leaf(NodeBase),
    /// A rack or intermediate location
    Inner(InnerNode),
}

impl Node {
    /// Node name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Leaf(leaf) => leaf.name(),
            Self::Inner(inner) => inner.name(),
        }
    }

    /// Location of the parent
    #[must_use]
    pub fn network_location(&self) -> &str {
        match self {
            Self::Leaf(leaf) => leaf.network_location(),
            Self::Inner(inner) => inner.network_location(),
        }
    }

    /// Full path
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Leaf(leaf) => leaf.path(),
            Self::Inner(inner) => inner.path(),
        }
    }

    /// True for hosts
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// The host, if this is a leaf
    #[must_use]
    pub const fn as_leaf(&self) -> Option<&NodeBase> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Inner(_) => None,
        }
    }
}

impl From<NodeBase> for Node {
    fn from(leaf: NodeBase) -> Self {
        Self::Leaf(leaf)
    }
}

impl From<InnerNode> for Node {
    fn from(inner: InnerNode) -> Self {
        Self::Inner(inner)
    }
}

/// A validated host position: normalized location split into segments
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LeafPath {
    pub(crate) name: String,
    pub(crate) location: String,
    pub(crate) segments: Vec<String>,
}

impl LeafPath {
    /// Validate a host's name and location.
    ///
    /// The name must be non-empty and free of `/`. The location must start
    /// with `/`, name at least one segment below the root and contain no
    /// empty segments; one trailing `/` is dropped.
    pub(crate) fn parse(leaf: &NodeBase) -> TopologyResult<Self> {
        let path = leaf.path();
        let name = leaf.name();
        if name.is_empty() {
            return Err(TopologyError::illegal_argument(path, "node name is empty"));
        }
        if name.contains(PATH_SEPARATOR) {
            return Err(TopologyError::illegal_argument(
                path,
                format!("node name must not contain '{PATH_SEPARATOR}'"),
            ));
        }

        let location = leaf.network_location();
        if location.trim().is_empty() {
            return Err(TopologyError::illegal_argument(
                path,
                "network location is empty",
            ));
        }
        if !location.starts_with(PATH_SEPARATOR) {
            return Err(TopologyError::illegal_argument(
                path,
                format!("network location must start with '{PATH_SEPARATOR}'"),
            ));
        }

        let trimmed = location.strip_suffix(PATH_SEPARATOR).unwrap_or(location);
        if trimmed.is_empty() {
            return Err(TopologyError::illegal_argument(
                path,
                "hosts cannot be placed directly under the root",
            ));
        }
        let segments: Vec<String> = trimmed[1..]
            .split(PATH_SEPARATOR)
            .map(str::to_string)
            .collect();
        if segments.iter().any(String::is_empty) {
            return Err(TopologyError::illegal_argument(
                path,
                "network location has an empty segment",
            ));
        }

        Ok(Self {
            name: name.to_string(),
            location: trimmed.to_string(),
            segments,
        })
    }

    pub(crate) fn to_leaf(&self) -> NodeBase {
        NodeBase::new(self.name.clone(), self.location.clone())
    }
}
