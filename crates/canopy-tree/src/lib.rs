//! Canopy Tree - Synchronized hierarchical state tree
//!
//! A path-addressed tree of branches and leaves whose mutations are
//! recorded as replayable `Seed`s. Two roots that apply the same set of
//! seeds converge to the same structure; concurrent writes to the same
//! leaf are resolved last-writer-wins by origin timestamp.

pub mod branch;
pub mod error;
pub mod leaf;
pub mod path;
pub mod root;
pub mod seed;
pub mod value;

pub use branch::{Branch, Node};
pub use error::{Result, TreeError};
pub use leaf::{CallbackId, Leaf};
pub use root::Root;
pub use seed::{Seed, Task};
pub use value::Value;
