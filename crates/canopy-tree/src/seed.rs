//! Seed - serializable mutation record, the unit of replication
//!
//! A seed is pure path + payload, replayable out of its original process
//! context. Batches of seeds are what crosses the wire between peers.

use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The structural operation a seed encodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    AddBranch,
    AddLeaf,
    RemoveBranch,
    RemoveLeaf,
    RenameBranch,
    RenameLeaf,
    SetLeaf,
}

/// A single replayable mutation.
///
/// `args` carries the new name for renames and the value for `SetLeaf`;
/// `origin` is the timestamp of the mutation in its originating process,
/// used for last-writer-wins resolution on leaf values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    pub task: Task,
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
    pub origin: DateTime<Utc>,
}

impl Seed {
    pub fn new(task: Task, path: impl Into<String>, args: Vec<Value>, origin: DateTime<Utc>) -> Self {
        Self {
            task,
            path: path.into(),
            args,
            origin,
        }
    }

    pub fn add_branch(path: impl Into<String>, origin: DateTime<Utc>) -> Self {
        Self::new(Task::AddBranch, path, Vec::new(), origin)
    }

    pub fn add_leaf(path: impl Into<String>, origin: DateTime<Utc>) -> Self {
        Self::new(Task::AddLeaf, path, Vec::new(), origin)
    }

    pub fn remove_branch(path: impl Into<String>, origin: DateTime<Utc>) -> Self {
        Self::new(Task::RemoveBranch, path, Vec::new(), origin)
    }

    pub fn remove_leaf(path: impl Into<String>, origin: DateTime<Utc>) -> Self {
        Self::new(Task::RemoveLeaf, path, Vec::new(), origin)
    }

    pub fn rename_branch(
        path: impl Into<String>,
        new_name: impl Into<String>,
        origin: DateTime<Utc>,
    ) -> Self {
        Self::new(
            Task::RenameBranch,
            path,
            vec![Value::Str(new_name.into())],
            origin,
        )
    }

    pub fn rename_leaf(
        path: impl Into<String>,
        new_name: impl Into<String>,
        origin: DateTime<Utc>,
    ) -> Self {
        Self::new(
            Task::RenameLeaf,
            path,
            vec![Value::Str(new_name.into())],
            origin,
        )
    }

    pub fn set_leaf(path: impl Into<String>, value: Value, origin: DateTime<Utc>) -> Self {
        Self::new(Task::SetLeaf, path, vec![value], origin)
    }

    /// The new-name argument of a rename seed, if present and well-typed.
    pub fn new_name(&self) -> Option<&str> {
        self.args.first().and_then(Value::as_str)
    }

    /// The value argument of a set seed, if present.
    pub fn value(&self) -> Option<&Value> {
        self.args.first()
    }
}
