//! Bookie Placement - Network topology tree
//!
//! This crate keeps the rack/host layout of the storage nodes as a tree
//! of path segments (`/region/rack/host`). Replica placement reads it to
//! spread copies across racks; membership changes add and remove leaves.
//!
//! # Example
//! ```
//! use bookie_placement::{NetworkTopology, Node, NodeBase};
//!
//! let topology = NetworkTopology::new();
//! let host = Node::from(NodeBase::new("bookie-1", "/dc1/rack1"));
//! topology.add(Some(&host)).unwrap();
//!
//! assert!(topology.contains(&host));
//! assert_eq!(topology.num_of_leaves(), 1);
//! assert_eq!(topology.num_of_racks(), 2);
//! ```

pub mod error;
pub mod node;
pub mod topology;

pub use error::{TopologyError, TopologyResult};
pub use node::{InnerNode, Node, NodeBase, PATH_SEPARATOR, ROOT};
pub use topology::{EXCLUDE_SCOPE_PREFIX, NetworkTopology};
