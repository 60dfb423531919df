//! canopy-sync - coordination layer on top of the canopy state tree
//!
//! Wraps a [`canopy_tree::Root`] in a per-process node that mirrors live
//! object attributes into the tree, executes command leaves written by
//! peers, and ships seed batches over a pluggable transport. The wiring
//! follows a star: workers talk to the coordinator, the coordinator
//! relays applied seeds back out to everyone else.

pub mod error;
pub mod node;
pub mod object;
pub mod tasks;
pub mod transport;

pub use error::{Result, SyncError};
pub use node::SyncNode;
pub use object::{AttributeObject, SyncObject};
pub use tasks::TaskQueue;
pub use transport::{MemoryHub, MemoryTransport, Transport};
