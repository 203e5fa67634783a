//! Network topology tree
//!
//! Hosts are leaves; every segment of their network location is an
//! [`InnerNode`]. Inner nodes are created when the first host below them
//! is added and pruned when the last one is removed. The root is never
//! pruned and does not count as a rack: `num_of_racks` is the number of
//! inner nodes other than the root.
//!
//! One read-write lock guards the whole tree. `add` and `remove` hold the
//! write lock for their full duration and validate before they mutate, so
//! a failed call leaves the tree and both counters untouched. Lock guards
//! are scoped, so the lock is released on every return path.

use crate::error::{TopologyError, TopologyResult};
use crate::node::{InnerNode, LeafPath, Node, NodeBase, PATH_SEPARATOR};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

/// Prefix marking an excluded scope in [`NetworkTopology::get_leaves`]
pub const EXCLUDE_SCOPE_PREFIX: char = '~';

struct Tree {
    root: InnerNode,
    num_racks: usize,
}

/// Outcome of checking where a host would go
enum Placement {
    /// Host already present
    Present,
    /// Host can be inserted, creating this many inner nodes
    Insert { new_racks: usize },
}

enum Removal {
    Removed,
    Absent,
    /// The path names an inner node, not a host
    NamesRack,
}

/// Concurrently-safe rack/host membership tree
pub struct NetworkTopology {
    tree: RwLock<Tree>,
}

impl Default for NetworkTopology {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkTopology {
    /// Create an empty topology
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(Tree {
                root: InnerNode::root(),
                num_racks: 0,
            }),
        }
    }

    /// Add a host. `None` is a no-op, as is adding a host already present.
    ///
    /// Fails with [`TopologyError::IllegalArgument`] for inner nodes and
    /// malformed names or locations, and with
    /// [`TopologyError::InvalidTopology`] when a host occupies a segment of
    /// the location or a rack already has the host's path.
    pub fn add(&self, node: Option<&Node>) -> TopologyResult<()> {
        let Some(node) = node else {
            return Ok(());
        };
        let target = Self::validate(node, "add")?;

        let mut tree = self.tree.write();
        let new_racks = match Self::locate(&tree.root, &target)? {
            Placement::Present => {
                debug!("Node {} already in topology", node.path());
                return Ok(());
            }
            Placement::Insert { new_racks } => new_racks,
        };

        Self::insert(&mut tree.root, &target.segments, target.to_leaf());
        tree.num_racks += new_racks;
        info!(
            "Added node {} ({} new racks, {} leaves)",
            node.path(),
            new_racks,
            tree.root.num_of_leaves()
        );
        Ok(())
    }

    /// Remove a host. `None` is a no-op, as is removing a host not present.
    ///
    /// Inner node values are rejected with
    /// [`TopologyError::IllegalArgument`], as is a host path that names a
    /// rack in the tree.
    pub fn remove(&self, node: Option<&Node>) -> TopologyResult<()> {
        let Some(node) = node else {
            return Ok(());
        };
        let target = Self::validate(node, "remove")?;

        let mut tree = self.tree.write();
        let mut pruned = 0;
        match Self::detach(&mut tree.root, &target.segments, &target.name, &mut pruned) {
            Removal::Removed => {
                tree.num_racks -= pruned;
                info!(
                    "Removed node {} ({} racks pruned, {} leaves)",
                    node.path(),
                    pruned,
                    tree.root.num_of_leaves()
                );
                Ok(())
            }
            Removal::Absent => {
                debug!("Node {} not in topology", node.path());
                Ok(())
            }
            Removal::NamesRack => {
                warn!("Refusing to remove rack {} as a host", node.path());
                Err(TopologyError::illegal_argument(
                    node.path(),
                    "path names a rack, not a host",
                ))
            }
        }
    }

    /// True if a host with the same name and location is present.
    #[must_use]
    pub fn contains(&self, node: &Node) -> bool {
        let Node::Leaf(leaf) = node else {
            return false;
        };
        let Ok(target) = LeafPath::parse(leaf) else {
            return false;
        };
        let tree = self.tree.read();
        Self::find_leaf(&tree.root, &target).is_some()
    }

    /// Number of hosts
    #[must_use]
    pub fn num_of_leaves(&self) -> usize {
        self.tree.read().root.num_of_leaves()
    }

    /// Number of inner nodes, not counting the root
    #[must_use]
    pub fn num_of_racks(&self) -> usize {
        self.tree.read().num_racks
    }

    /// Hosts under `scope`, in path order.
    ///
    /// `""` and `"/"` select the whole tree. A scope prefixed with `~`
    /// selects every host outside it instead.
    #[must_use]
    pub fn get_leaves(&self, scope: &str) -> Vec<NodeBase> {
        let (scope, exclude) = parse_scope(scope);
        let tree = self.tree.read();
        let mut leaves = Vec::new();
        tree.root.for_each_leaf(&mut |leaf| {
            if in_scope(&leaf.path(), scope) != exclude {
                leaves.push(leaf.clone());
            }
        });
        leaves
    }

    /// Hosts under `scope` (same syntax as [`get_leaves`](Self::get_leaves))
    /// that are not in `excluded`.
    #[must_use]
    pub fn count_available_nodes(&self, scope: &str, excluded: &[NodeBase]) -> usize {
        let excluded: HashSet<String> = excluded
            .iter()
            .filter_map(|leaf| LeafPath::parse(leaf).ok())
            .map(|target| target.to_leaf().path())
            .collect();
        let (scope, exclude) = parse_scope(scope);
        let tree = self.tree.read();
        let mut count = 0;
        tree.root.for_each_leaf(&mut |leaf| {
            let path = leaf.path();
            if in_scope(&path, scope) != exclude && !excluded.contains(&path) {
                count += 1;
            }
        });
        count
    }

    /// Paths of the inner nodes that directly hold hosts, in path order.
    #[must_use]
    pub fn racks(&self) -> Vec<String> {
        let tree = self.tree.read();
        let mut racks = Vec::new();
        tree.root.for_each_inner(&mut |inner| {
            if inner.is_rack() {
                racks.push(inner.path());
            }
        });
        racks
    }

    /// True if both hosts are present and share a network location.
    #[must_use]
    pub fn is_on_same_rack(&self, a: &NodeBase, b: &NodeBase) -> bool {
        let (Ok(a), Ok(b)) = (LeafPath::parse(a), LeafPath::parse(b)) else {
            return false;
        };
        let tree = self.tree.read();
        a.location == b.location
            && Self::find_leaf(&tree.root, &a).is_some()
            && Self::find_leaf(&tree.root, &b).is_some()
    }

    /// Number of edges between two present hosts through their closest
    /// common ancestor. `None` if either host is absent.
    #[must_use]
    pub fn distance(&self, a: &NodeBase, b: &NodeBase) -> Option<usize> {
        let a = LeafPath::parse(a).ok()?;
        let b = LeafPath::parse(b).ok()?;
        {
            let tree = self.tree.read();
            Self::find_leaf(&tree.root, &a)?;
            Self::find_leaf(&tree.root, &b)?;
        }

        let a_path: Vec<&str> = a
            .segments
            .iter()
            .map(String::as_str)
            .chain([a.name.as_str()])
            .collect();
        let b_path: Vec<&str> = b
            .segments
            .iter()
            .map(String::as_str)
            .chain([b.name.as_str()])
            .collect();
        let common = a_path
            .iter()
            .zip(&b_path)
            .take_while(|(x, y)| x == y)
            .count();
        Some(a_path.len() - common + b_path.len() - common)
    }

    /// True while a writer holds the tree lock.
    #[must_use]
    pub fn is_write_locked(&self) -> bool {
        self.tree.is_locked_exclusive()
    }

    // ---- Internal helpers ----

    /// Reject inner nodes and malformed hosts.
    fn validate(node: &Node, op: &str) -> TopologyResult<LeafPath> {
        let result = match node {
            Node::Inner(_) => Err(TopologyError::illegal_argument(
                node.path(),
                format!("cannot {op} an inner node"),
            )),
            Node::Leaf(leaf) => LeafPath::parse(leaf),
        };
        if let Err(e) = &result {
            warn!("Rejected topology {}: {}", op, e);
        }
        result
    }

    /// Walk the host's location without mutating, checking for conflicts.
    fn locate(root: &InnerNode, target: &LeafPath) -> TopologyResult<Placement> {
        let mut current = root;
        for (depth, segment) in target.segments.iter().enumerate() {
            match current.child(segment) {
                None => {
                    return Ok(Placement::Insert {
                        new_racks: target.segments.len() - depth,
                    });
                }
                Some(Node::Leaf(leaf)) => {
                    warn!("Host {} blocks location {}", leaf.path(), target.location);
                    return Err(TopologyError::invalid_topology(
                        target.to_leaf().path(),
                        format!("{} is a host and cannot hold other nodes", leaf.path()),
                    ));
                }
                Some(Node::Inner(inner)) => current = inner,
            }
        }

        match current.child(&target.name) {
            None => Ok(Placement::Insert { new_racks: 0 }),
            Some(Node::Leaf(_)) => Ok(Placement::Present),
            Some(Node::Inner(inner)) => {
                warn!("Rack {} already exists", inner.path());
                Err(TopologyError::invalid_topology(
                    inner.path(),
                    "a rack already exists at this path",
                ))
            }
        }
    }

    /// Insert a host, creating missing inner nodes. Must follow a
    /// successful [`locate`](Self::locate) under the same write lock.
    fn insert(parent: &mut InnerNode, segments: &[String], leaf: NodeBase) {
        parent.num_leaves += 1;
        let Some((segment, rest)) = segments.split_first() else {
            parent
                .children
                .insert(leaf.name().to_string(), Node::Leaf(leaf));
            return;
        };

        let location = parent.path();
        let child = parent
            .children
            .entry(segment.clone())
            .or_insert_with(|| Node::Inner(InnerNode::new(segment.clone(), location)));
        debug_assert!(
            child.as_leaf().is_none(),
            "locate rejects hosts on the location path"
        );
        if let Node::Inner(inner) = child {
            Self::insert(inner, rest, leaf);
        }
    }

    /// Detach a host and prune inner nodes left empty. `pruned` counts the
    /// inner nodes removed.
    fn detach(
        parent: &mut InnerNode,
        segments: &[String],
        name: &str,
        pruned: &mut usize,
    ) -> Removal {
        let outcome = match segments.split_first() {
            None => match parent.children.get(name) {
                None => Removal::Absent,
                Some(Node::Inner(_)) => Removal::NamesRack,
                Some(Node::Leaf(_)) => {
                    parent.children.remove(name);
                    Removal::Removed
                }
            },
            Some((segment, rest)) => {
                let Some(Node::Inner(child)) = parent.children.get_mut(segment) else {
                    return Removal::Absent;
                };
                let outcome = Self::detach(child, rest, name, pruned);
                if matches!(outcome, Removal::Removed) && child.children.is_empty() {
                    parent.children.remove(segment);
                    *pruned += 1;
                }
                outcome
            }
        };
        if matches!(outcome, Removal::Removed) {
            parent.num_leaves -= 1;
        }
        outcome
    }

    fn find_leaf<'a>(root: &'a InnerNode, target: &LeafPath) -> Option<&'a NodeBase> {
        let mut current = root;
        for segment in &target.segments {
            match current.child(segment)? {
                Node::Inner(inner) => current = inner,
                Node::Leaf(_) => return None,
            }
        }
        current.child(&target.name)?.as_leaf()
    }
}

impl fmt::Display for NetworkTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.read();
        writeln!(f, "Number of racks: {}", tree.num_racks)?;
        writeln!(f, "Number of leaves: {}", tree.root.num_of_leaves())?;
        let mut result = Ok(());
        tree.root.for_each_leaf(&mut |leaf| {
            if result.is_ok() {
                result = writeln!(f, "{leaf}");
            }
        });
        result
    }
}

impl fmt::Debug for NetworkTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkTopology")
            .field("leaves", &self.num_of_leaves())
            .field("racks", &self.num_of_racks())
            .finish()
    }
}

/// Split a scope into its normalized path and whether it is an exclusion.
fn parse_scope(scope: &str) -> (&str, bool) {
    let (scope, exclude) = match scope.strip_prefix(EXCLUDE_SCOPE_PREFIX) {
        Some(rest) => (rest, true),
        None => (scope, false),
    };
    (scope.strip_suffix(PATH_SEPARATOR).unwrap_or(scope), exclude)
}

fn in_scope(path: &str, scope: &str) -> bool {
    scope.is_empty()
        || path
            .strip_prefix(scope)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(PATH_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::seq::SliceRandom;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    const VALID_NAME: &str = "hostname";
    const VALID_NAME2: &str = "hostname2";
    const INVALID_NAME: &str = "/hostname";
    const VALID_LOCATION: &str = "/location";
    const VALID_LOCATION2: &str = "/location2";
    const INVALID_LOCATION: &str = "location";

    fn leaf(name: &str, location: &str) -> Node {
        Node::Leaf(NodeBase::new(name, location))
    }

    fn rack(name: &str, location: &str) -> Node {
        Node::Inner(InnerNode::new(name, location))
    }

    fn counts(topology: &NetworkTopology) -> (usize, usize) {
        (topology.num_of_leaves(), topology.num_of_racks())
    }

    /// Hosts at /location/location2 (two) and /location2/location (one)
    fn populated() -> NetworkTopology {
        let topology = NetworkTopology::new();
        let nested = format!("{VALID_LOCATION}{VALID_LOCATION2}");
        let other = format!("{VALID_LOCATION2}{VALID_LOCATION}");
        topology.add(Some(&leaf(VALID_NAME, &nested))).unwrap();
        topology.add(Some(&leaf(VALID_NAME2, &nested))).unwrap();
        topology.add(Some(&leaf(VALID_NAME, &other))).unwrap();
        topology
    }

    /// Recompute counters from the structure
    fn recount(topology: &NetworkTopology) -> (usize, usize) {
        let tree = topology.tree.read();
        let mut leaves = 0;
        tree.root.for_each_leaf(&mut |_| leaves += 1);
        let mut inner = 0;
        tree.root.for_each_inner(&mut |node| {
            assert!(node.num_of_children() > 0, "empty rack {}", node.path());
            inner += 1;
        });
        (leaves, inner)
    }

    /// Run `f` on another thread, failing if it does not finish promptly
    fn completes<F>(f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            f();
            let _ = tx.send(());
        });
        rx.recv_timeout(Duration::from_secs(5))
            .expect("operation blocked on the topology lock");
    }

    #[test]
    fn test_add_none_is_noop() {
        let topology = NetworkTopology::new();
        topology.add(None).unwrap();
        topology.remove(None).unwrap();
        assert_eq!(counts(&topology), (0, 0));
    }

    #[test]
    fn test_add_on_empty() {
        let topology = NetworkTopology::new();
        let host = leaf(VALID_NAME, VALID_LOCATION);
        topology.add(Some(&host)).unwrap();

        assert_eq!(counts(&topology), (1, 1));
        assert!(topology.contains(&host));
    }

    #[test]
    fn test_add_invalid_on_empty() {
        let cases = [
            leaf(INVALID_NAME, VALID_LOCATION),
            leaf("", VALID_LOCATION),
            leaf(VALID_NAME, INVALID_LOCATION),
            leaf(INVALID_NAME, INVALID_LOCATION),
            leaf("", INVALID_LOCATION),
            leaf(VALID_NAME, ""),
            leaf(INVALID_NAME, ""),
            leaf("", ""),
            rack(VALID_NAME, VALID_LOCATION),
        ];
        for node in &cases {
            let topology = NetworkTopology::new();
            let err = topology.add(Some(node)).unwrap_err();
            assert!(err.is_illegal_argument(), "{}: {err}", node.path());
            assert_eq!(counts(&topology), (0, 0));
            assert!(!topology.is_write_locked());
        }
    }

    #[test]
    fn test_add_same_rack() {
        let topology = NetworkTopology::new();
        topology.add(Some(&leaf(VALID_NAME, VALID_LOCATION))).unwrap();
        topology.add(Some(&leaf(VALID_NAME2, VALID_LOCATION))).unwrap();
        assert_eq!(counts(&topology), (2, 1));
        assert_eq!(topology.racks(), vec![VALID_LOCATION.to_string()]);
    }

    #[test]
    fn test_add_existing_is_noop() {
        let topology = NetworkTopology::new();
        let host = leaf(VALID_NAME, VALID_LOCATION);
        topology.add(Some(&host)).unwrap();
        topology.add(Some(&host)).unwrap();
        // Trailing separator normalizes to the same host
        topology.add(Some(&leaf(VALID_NAME, "/location/"))).unwrap();
        assert_eq!(counts(&topology), (1, 1));
    }

    #[test]
    fn test_add_new_rack() {
        let topology = NetworkTopology::new();
        topology.add(Some(&leaf(VALID_NAME, VALID_LOCATION))).unwrap();
        topology.add(Some(&leaf(VALID_NAME, VALID_LOCATION2))).unwrap();
        assert_eq!(counts(&topology), (2, 2));

        // Same bare name on different paths is fine; racks grow by the
        // number of segments created
        topology.add(Some(&leaf(VALID_NAME, "/location/a/b"))).unwrap();
        assert_eq!(counts(&topology), (3, 4));
    }

    #[test]
    fn test_add_under_leaf_fails() {
        let topology = NetworkTopology::new();
        topology.add(Some(&leaf(VALID_NAME, VALID_LOCATION))).unwrap();

        let on_leaf = format!("{VALID_LOCATION}/{VALID_NAME}");
        let err = topology.add(Some(&leaf(VALID_NAME2, &on_leaf))).unwrap_err();
        assert!(err.is_invalid_topology());
        assert_eq!(err.path(), "/location/hostname/hostname2");
        assert_eq!(counts(&topology), (1, 1));
        assert!(!topology.is_write_locked());

        // Deeper below the leaf fails the same way and creates nothing
        let deeper = format!("{on_leaf}/x/y");
        assert!(topology.add(Some(&leaf(VALID_NAME2, &deeper))).is_err());
        assert_eq!(counts(&topology), (1, 1));
    }

    #[test]
    fn test_add_leaf_over_rack_fails() {
        let topology = NetworkTopology::new();
        topology.add(Some(&leaf(VALID_NAME, "/location/location2"))).unwrap();

        let err = topology.add(Some(&leaf("location2", VALID_LOCATION))).unwrap_err();
        assert!(err.is_invalid_topology());
        assert_eq!(counts(&topology), (1, 2));
    }

    #[test]
    fn test_add_inner_node_on_non_empty() {
        let topology = NetworkTopology::new();
        topology.add(Some(&leaf(VALID_NAME, VALID_LOCATION))).unwrap();

        let err = topology.add(Some(&rack(VALID_NAME2, VALID_LOCATION))).unwrap_err();
        assert!(err.is_illegal_argument());
        assert_eq!(counts(&topology), (1, 1));
        assert!(!topology.is_write_locked());
    }

    #[test]
    fn test_mutation_after_failure_does_not_block() {
        let topology = Arc::new(NetworkTopology::new());
        topology.add(Some(&leaf(VALID_NAME, VALID_LOCATION))).unwrap();

        assert!(topology.add(Some(&leaf(INVALID_NAME, VALID_LOCATION))).is_err());
        assert!(topology.add(Some(&leaf(VALID_NAME2, "/location/hostname"))).is_err());
        assert!(topology.remove(Some(&rack("location", ""))).is_err());
        assert!(!topology.is_write_locked());

        let other = Arc::clone(&topology);
        completes(move || {
            other.add(Some(&leaf(VALID_NAME2, VALID_LOCATION2))).unwrap();
        });
        assert_eq!(counts(&topology), (2, 2));
    }

    #[test]
    fn test_remove() {
        let nested = format!("{VALID_LOCATION}{VALID_LOCATION2}");
        let other = format!("{VALID_LOCATION2}{VALID_LOCATION}");
        let cases: Vec<(Option<Node>, bool, (usize, usize))> = vec![
            (None, false, (3, 4)),
            (Some(leaf(VALID_NAME, &nested)), false, (2, 4)),
            (Some(rack("location2", VALID_LOCATION)), true, (3, 4)),
            (Some(leaf("hello", VALID_LOCATION)), false, (3, 4)),
            (Some(rack("hello", VALID_LOCATION)), true, (3, 4)),
            (Some(leaf(VALID_NAME, INVALID_LOCATION)), true, (3, 4)),
            (Some(leaf("location2", VALID_LOCATION)), true, (3, 4)),
            (Some(leaf(VALID_NAME, &other)), false, (2, 2)),
        ];

        for (input, expect_err, expected) in cases {
            let topology = populated();
            assert_eq!(counts(&topology), (3, 4));

            let result = topology.remove(input.as_ref());
            assert_eq!(result.is_err(), expect_err, "{input:?}: {result:?}");
            if let Err(e) = &result {
                assert!(e.is_illegal_argument());
            }
            assert!(!topology.is_write_locked());
            assert_eq!(counts(&topology), expected, "{input:?}");
            if let Some(node) = &input
                && expected.0 < 3
            {
                assert!(!topology.contains(node));
            }
            assert_eq!(recount(&topology), expected);
        }
    }

    #[test]
    fn test_remove_prunes_to_root() {
        let topology = NetworkTopology::new();
        let deep = leaf(VALID_NAME, "/a/b/c");
        topology.add(Some(&deep)).unwrap();
        assert_eq!(counts(&topology), (1, 3));

        topology.remove(Some(&deep)).unwrap();
        assert_eq!(counts(&topology), (0, 0));
        assert!(topology.racks().is_empty());

        // The pruned path can be rebuilt
        topology.add(Some(&leaf(VALID_NAME, "/a/b"))).unwrap();
        assert_eq!(counts(&topology), (1, 2));
    }

    #[test]
    fn test_remove_keeps_shared_ancestors() {
        let topology = NetworkTopology::new();
        topology.add(Some(&leaf("h1", "/dc/rack1"))).unwrap();
        topology.add(Some(&leaf("h2", "/dc/rack2"))).unwrap();
        assert_eq!(counts(&topology), (2, 3));

        topology.remove(Some(&leaf("h1", "/dc/rack1"))).unwrap();
        assert_eq!(counts(&topology), (1, 2));
        assert_eq!(topology.racks(), vec!["/dc/rack2".to_string()]);
    }

    #[test]
    fn test_contains() {
        let topology = populated();
        assert!(topology.contains(&leaf(VALID_NAME, "/location/location2")));
        assert!(topology.contains(&leaf(VALID_NAME, "/location/location2/")));
        assert!(!topology.contains(&leaf(VALID_NAME, VALID_LOCATION)));
        assert!(!topology.contains(&leaf("location2", VALID_LOCATION)));
        assert!(!topology.contains(&rack("location2", VALID_LOCATION)));
        assert!(!topology.contains(&leaf(VALID_NAME, INVALID_LOCATION)));
    }

    #[test]
    fn test_get_leaves() {
        let topology = populated();
        let paths = |leaves: Vec<NodeBase>| leaves.iter().map(NodeBase::path).collect::<Vec<_>>();

        assert_eq!(topology.get_leaves("").len(), 3);
        assert_eq!(topology.get_leaves("/").len(), 3);
        assert_eq!(
            paths(topology.get_leaves(VALID_LOCATION)),
            vec!["/location/location2/hostname", "/location/location2/hostname2"]
        );
        assert_eq!(
            paths(topology.get_leaves("~/location")),
            vec!["/location2/location/hostname"]
        );
        // Prefix matching is per segment
        assert!(topology.get_leaves("/loc").is_empty());
        assert_eq!(topology.get_leaves("/location/location2/hostname").len(), 1);
    }

    #[test]
    fn test_count_available_nodes() {
        let topology = populated();
        let excluded = vec![NodeBase::new(VALID_NAME, "/location/location2")];
        assert_eq!(topology.count_available_nodes("", &excluded), 2);
        assert_eq!(topology.count_available_nodes(VALID_LOCATION, &excluded), 1);
        assert_eq!(topology.count_available_nodes("~/location", &excluded), 1);
        assert_eq!(topology.count_available_nodes("/nowhere", &[]), 0);
    }

    #[test]
    fn test_racks_and_same_rack() {
        let topology = populated();
        assert_eq!(
            topology.racks(),
            vec![
                "/location/location2".to_string(),
                "/location2/location".to_string()
            ]
        );

        let a = NodeBase::new(VALID_NAME, "/location/location2");
        let b = NodeBase::new(VALID_NAME2, "/location/location2");
        let c = NodeBase::new(VALID_NAME, "/location2/location");
        assert!(topology.is_on_same_rack(&a, &b));
        assert!(!topology.is_on_same_rack(&a, &c));
        assert!(!topology.is_on_same_rack(&a, &NodeBase::new("ghost", "/location/location2")));
    }

    #[test]
    fn test_distance() {
        let topology = populated();
        let a = NodeBase::new(VALID_NAME, "/location/location2");
        let b = NodeBase::new(VALID_NAME2, "/location/location2");
        let c = NodeBase::new(VALID_NAME, "/location2/location");

        assert_eq!(topology.distance(&a, &a), Some(0));
        assert_eq!(topology.distance(&a, &b), Some(2));
        assert_eq!(topology.distance(&a, &c), Some(6));
        assert_eq!(topology.distance(&a, &NodeBase::new("ghost", "/x")), None);
    }

    #[test]
    fn test_display() {
        let topology = populated();
        let rendered = topology.to_string();
        assert!(rendered.starts_with("Number of racks: 4\nNumber of leaves: 3\n"));
        assert!(rendered.contains("/location2/location/hostname\n"));
    }

    #[test]
    fn test_random_churn_keeps_counters_consistent() {
        let mut rng = rand::thread_rng();
        let topology = NetworkTopology::new();
        let mut hosts: Vec<Node> = Vec::new();
        for dc in 0..3 {
            for r in 0..4 {
                for host in 0..5 {
                    hosts.push(leaf(&format!("h{host}"), &format!("/dc{dc}/rack{r}")));
                }
            }
        }

        for _ in 0..500 {
            let node = hosts.choose(&mut rng).unwrap();
            if rng.gen_bool(0.6) {
                topology.add(Some(node)).unwrap();
            } else {
                topology.remove(Some(node)).unwrap();
            }
            assert_eq!(counts(&topology), recount(&topology));
        }

        for node in &hosts {
            topology.remove(Some(node)).unwrap();
        }
        assert_eq!(counts(&topology), (0, 0));
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let topology = Arc::new(NetworkTopology::new());
        let writers: Vec<_> = (0..4)
            .map(|t| {
                let topology = Arc::clone(&topology);
                thread::spawn(move || {
                    for i in 0..50 {
                        let host = leaf(&format!("h{i}"), &format!("/rack{t}"));
                        topology.add(Some(&host)).unwrap();
                        // Interleave a failing mutation
                        let bad = leaf(&format!("/h{i}"), &format!("/rack{t}"));
                        assert!(topology.add(Some(&bad)).is_err());
                    }
                })
            })
            .collect();
        let reader = {
            let topology = Arc::clone(&topology);
            thread::spawn(move || {
                for _ in 0..200 {
                    let leaves = topology.num_of_leaves();
                    assert!(leaves <= 200);
                    let _ = topology.get_leaves("/rack0");
                }
            })
        };

        for handle in writers {
            handle.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(counts(&topology), (200, 4));
        assert!(!topology.is_write_locked());
    }
}
