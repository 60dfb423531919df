//! canopy — synchronized hierarchical state tree and command propagation
//!
//! Re-exports the tree and coordination crates plus the cluster config
//! used by the demo binary.

pub mod config;

pub use canopy_sync::{
    AttributeObject, MemoryHub, MemoryTransport, SyncError, SyncNode, SyncObject, TaskQueue,
    Transport,
};
pub use canopy_tree::{values, Branch, CallbackId, Leaf, Node, Root, Seed, Task, TreeError, Value};

pub use config::ClusterConfig;
