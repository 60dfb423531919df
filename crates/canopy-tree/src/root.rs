//! Root - owner of one branch hierarchy, its seed log, and its queue
//!
//! All structural mutation goes through the root so that every applied
//! change lands in the outgoing seed log exactly once. The incoming
//! queue is the only cross-thread entry point: receive threads append
//! seeds, the loop thread drains and applies them between iterations.

use crate::branch::Branch;
use crate::error::{Result, TreeError};
use crate::leaf::{CallbackId, Leaf};
use crate::path;
use crate::seed::{Seed, Task};
use crate::value::Value;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tracing::debug;

/// The root of a synchronized state tree.
///
/// Path operations return a plain `bool`: a structural conflict is
/// advisory, never fatal. The failure detail is recorded in a sticky
/// error slot readable through [`Root::get_error`].
#[derive(Debug)]
pub struct Root {
    tree: Branch,
    seed_log: Vec<Seed>,
    queue: Mutex<Vec<Seed>>,
    error: Mutex<Option<String>>,
}

impl Root {
    /// Create an empty root holding only "/".
    pub fn new() -> Self {
        Self {
            tree: Branch::new("/"),
            seed_log: Vec::new(),
            queue: Mutex::new(Vec::new()),
            error: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------
    // Path-addressed CRUD
    // -----------------------------------------------------------------

    /// Create a branch at `path`. The parent must already exist;
    /// intermediate branches are never auto-created.
    pub fn create_branch_at(&mut self, branch_path: &str) -> bool {
        let origin = Utc::now();
        self.checked(|root| {
            root.insert_branch(branch_path)?;
            root.seed_log.push(Seed::add_branch(branch_path, origin));
            Ok(())
        })
    }

    /// Create an empty leaf at `path`.
    pub fn create_leaf_at(&mut self, leaf_path: &str) -> bool {
        let origin = Utc::now();
        self.checked(|root| {
            root.insert_leaf(leaf_path)?;
            root.seed_log.push(Seed::add_leaf(leaf_path, origin));
            Ok(())
        })
    }

    /// Create a leaf and immediately set its value.
    pub fn create_leaf_with_value_at(&mut self, leaf_path: &str, value: Value) -> bool {
        if !self.create_leaf_at(leaf_path) {
            return false;
        }
        self.set_value_for_leaf_at(leaf_path, value)
    }

    /// Remove the branch at `path`, recursively detaching its children.
    pub fn remove_branch_at(&mut self, branch_path: &str) -> bool {
        let origin = Utc::now();
        self.checked(|root| {
            root.take_branch(branch_path)?;
            root.seed_log.push(Seed::remove_branch(branch_path, origin));
            Ok(())
        })
    }

    /// Remove the leaf at `path`.
    pub fn remove_leaf_at(&mut self, leaf_path: &str) -> bool {
        let origin = Utc::now();
        self.checked(|root| {
            root.take_leaf(leaf_path)?;
            root.seed_log.push(Seed::remove_leaf(leaf_path, origin));
            Ok(())
        })
    }

    /// Rename the branch at `path`, keeping its subtree in place.
    pub fn rename_branch_at(&mut self, branch_path: &str, new_name: &str) -> bool {
        let origin = Utc::now();
        self.checked(|root| {
            root.rename_node(branch_path, new_name, Task::RenameBranch)?;
            root.seed_log
                .push(Seed::rename_branch(branch_path, new_name, origin));
            Ok(())
        })
    }

    /// Rename the leaf at `path`, keeping its callbacks registered.
    pub fn rename_leaf_at(&mut self, leaf_path: &str, new_name: &str) -> bool {
        let origin = Utc::now();
        self.checked(|root| {
            root.rename_node(leaf_path, new_name, Task::RenameLeaf)?;
            root.seed_log
                .push(Seed::rename_leaf(leaf_path, new_name, origin));
            Ok(())
        })
    }

    /// Set the value of the leaf at `path`, stamped with the current time.
    pub fn set_value_for_leaf_at(&mut self, leaf_path: &str, value: Value) -> bool {
        self.set_value_for_leaf_at_time(leaf_path, value, Utc::now())
    }

    /// Set the value of the leaf at `path` with an explicit timestamp,
    /// as when replaying a remote write. A seed is emitted only if the
    /// write was actually applied: stale writes are dropped, recorded in
    /// the error slot, and never re-propagated.
    pub fn set_value_for_leaf_at_time(
        &mut self,
        leaf_path: &str,
        value: Value,
        timestamp: DateTime<Utc>,
    ) -> bool {
        self.checked(|root| {
            root.set_leaf(leaf_path, value.clone(), timestamp)?;
            root.seed_log.push(Seed::set_leaf(leaf_path, value, timestamp));
            Ok(())
        })
    }

    // -----------------------------------------------------------------
    // Pure lookups
    // -----------------------------------------------------------------

    pub fn has_branch_at(&self, branch_path: &str) -> bool {
        path::split(branch_path)
            .ok()
            .and_then(|segments| self.branch_at(&segments))
            .is_some()
    }

    pub fn has_leaf_at(&self, leaf_path: &str) -> bool {
        self.get_leaf_at(leaf_path).is_some()
    }

    pub fn get_leaf_at(&self, leaf_path: &str) -> Option<&Leaf> {
        let (parent, name) = path::split_parent(leaf_path).ok()?;
        self.branch_at(&parent)?.get_leaf(name)
    }

    pub fn get_value_for_leaf_at(&self, leaf_path: &str) -> Option<Value> {
        self.get_leaf_at(leaf_path).map(|l| l.value().clone())
    }

    /// Names of the sub-branches directly under `path`, sorted.
    /// Empty if the path does not resolve to a branch.
    pub fn get_branch_list_at(&self, branch_path: &str) -> Vec<String> {
        path::split(branch_path)
            .ok()
            .and_then(|segments| self.branch_at(&segments))
            .map(Branch::branch_names)
            .unwrap_or_default()
    }

    /// Names of the top-level branches.
    pub fn get_branch_list(&self) -> Vec<String> {
        self.tree.branch_names()
    }

    /// Names of the leaves directly under `path`, sorted.
    pub fn get_leaf_list_at(&self, branch_path: &str) -> Vec<String> {
        path::split(branch_path)
            .ok()
            .and_then(|segments| self.branch_at(&segments))
            .map(Branch::leaf_names)
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------
    // Callbacks
    // -----------------------------------------------------------------

    /// Bind a change callback to the leaf at `path`. Fires on every
    /// applied write, local or replayed from a peer.
    pub fn add_callback_to_leaf_at(
        &mut self,
        leaf_path: &str,
        callback: impl Fn(&Value, DateTime<Utc>) + Send + Sync + 'static,
    ) -> Option<CallbackId> {
        let (parent, name) = path::split_parent(leaf_path).ok()?;
        self.branch_at_mut_opt(&parent)?
            .get_leaf_mut(name)
            .map(|leaf| leaf.add_callback(callback))
    }

    pub fn remove_callback_from_leaf_at(&mut self, leaf_path: &str, id: CallbackId) -> bool {
        let Ok((parent, name)) = path::split_parent(leaf_path) else {
            return false;
        };
        self.branch_at_mut_opt(&parent)
            .and_then(|b| b.get_leaf_mut(name))
            .map(|leaf| leaf.remove_callback(id))
            .unwrap_or(false)
    }

    // -----------------------------------------------------------------
    // Ownership transfer (cut / graft)
    // -----------------------------------------------------------------

    /// Detach the branch at `path` with its subtree intact and hand
    /// ownership to the caller. Emits no seed: the caller is expected to
    /// re-seed via [`Root::add_branch_at`] at the destination.
    pub fn cut_branch_at(&mut self, branch_path: &str) -> Option<Branch> {
        match self.take_branch(branch_path) {
            Ok(branch) => Some(branch),
            Err(e) => {
                self.record_error(&e);
                None
            }
        }
    }

    /// Detach the leaf at `path`, value and callbacks intact.
    pub fn cut_leaf_at(&mut self, leaf_path: &str) -> Option<Leaf> {
        match self.take_leaf(leaf_path) {
            Ok(leaf) => Some(leaf),
            Err(e) => {
                self.record_error(&e);
                None
            }
        }
    }

    /// Graft a pre-built branch under `parent_path`, emitting the full
    /// add/set seed chain for every node in the subtree.
    pub fn add_branch_at(&mut self, parent_path: &str, branch: Branch) -> bool {
        let origin = Utc::now();
        let outcome = (|| -> Result<()> {
            let segments = path::split(parent_path)?;
            // Seed paths are rebuilt from the parsed segments so a
            // trailing slash in the caller's path cannot leak into them.
            let normalized = normalize(&segments);
            let base = path::join(&normalized, branch.name());
            let parent = self
                .branch_at_mut_opt(&segments)
                .ok_or_else(|| TreeError::BranchNotFound(normalized.clone()))?;
            if parent.has_child(branch.name()) {
                return Err(TreeError::name_taken(normalized, branch.name()));
            }
            let mut seeds = Vec::new();
            branch.graft_seeds(&base, origin, &mut seeds);
            parent.add_branch(branch);
            self.seed_log.extend(seeds);
            Ok(())
        })();
        self.report(outcome)
    }

    /// Graft a pre-built leaf under `parent_path`.
    pub fn add_leaf_at(&mut self, parent_path: &str, leaf: Leaf) -> bool {
        let origin = Utc::now();
        let outcome = (|| -> Result<()> {
            let segments = path::split(parent_path)?;
            let normalized = normalize(&segments);
            let leaf_path = path::join(&normalized, leaf.name());
            let parent = self
                .branch_at_mut_opt(&segments)
                .ok_or_else(|| TreeError::BranchNotFound(normalized.clone()))?;
            if parent.has_child(leaf.name()) {
                return Err(TreeError::name_taken(normalized, leaf.name()));
            }
            let seeds = Branch::leaf_graft_seeds(&leaf, &leaf_path, origin);
            parent.add_leaf(leaf);
            self.seed_log.extend(seeds);
            Ok(())
        })();
        self.report(outcome)
    }

    // -----------------------------------------------------------------
    // Seed log and queue
    // -----------------------------------------------------------------

    /// Drain the outgoing seed log. One-shot: a second call returns an
    /// empty list unless new mutations occurred in between.
    pub fn get_seed_list(&mut self) -> Vec<Seed> {
        std::mem::take(&mut self.seed_log)
    }

    /// Append an externally received seed without applying it.
    /// Safe to call from any thread.
    pub fn add_seed_to_queue(&self, seed: Seed) {
        self.queue.lock().unwrap().push(seed);
    }

    /// Append a batch of externally received seeds without applying them.
    pub fn add_seeds_to_queue(&self, seeds: Vec<Seed>) {
        self.queue.lock().unwrap().extend(seeds);
    }

    /// Apply every queued seed in arrival order, under the same rules as
    /// the direct path operations. Failures are recorded per seed and the
    /// batch always runs to completion. When `propagate` is true, every
    /// seed that applied cleanly is re-emitted into the outgoing log so a
    /// relaying root forwards it to its other peers.
    pub fn process_queue(&mut self, propagate: bool) {
        let pending = {
            let mut queue = self.queue.lock().unwrap();
            std::mem::take(&mut *queue)
        };
        for seed in pending {
            match self.apply_seed(&seed) {
                Ok(()) => {
                    if propagate {
                        self.seed_log.push(seed);
                    }
                }
                Err(e) => {
                    debug!(task = ?seed.task, path = %seed.path, "seed apply failed: {e}");
                    self.record_error(&e);
                }
            }
        }
    }

    /// Number of seeds waiting in the incoming queue.
    pub fn queue_len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Take and clear the last recorded failure, if any.
    pub fn get_error(&self) -> Option<String> {
        self.error.lock().unwrap().take()
    }

    pub fn has_error(&self) -> bool {
        self.error.lock().unwrap().is_some()
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn apply_seed(&mut self, seed: &Seed) -> Result<()> {
        match seed.task {
            Task::AddBranch => self.insert_branch(&seed.path),
            Task::AddLeaf => self.insert_leaf(&seed.path),
            Task::RemoveBranch => self.take_branch(&seed.path).map(drop),
            Task::RemoveLeaf => self.take_leaf(&seed.path).map(drop),
            Task::RenameBranch | Task::RenameLeaf => {
                let new_name = seed
                    .new_name()
                    .ok_or_else(|| TreeError::malformed_seed(&seed.path, "missing new name"))?
                    .to_string();
                self.rename_node(&seed.path, &new_name, seed.task)
            }
            Task::SetLeaf => {
                let value = seed
                    .value()
                    .ok_or_else(|| TreeError::malformed_seed(&seed.path, "missing value"))?
                    .clone();
                self.set_leaf(&seed.path, value, seed.origin)
            }
        }
    }

    fn insert_branch(&mut self, branch_path: &str) -> Result<()> {
        let (parent_segments, name) = path::split_parent(branch_path)?;
        let parent = self.parent_branch_mut(&parent_segments, branch_path)?;
        if !parent.add_branch(Branch::new(name)) {
            return Err(TreeError::name_taken(parent.name(), name));
        }
        Ok(())
    }

    fn insert_leaf(&mut self, leaf_path: &str) -> Result<()> {
        let (parent_segments, name) = path::split_parent(leaf_path)?;
        let parent = self.parent_branch_mut(&parent_segments, leaf_path)?;
        if !parent.add_leaf(Leaf::new(name)) {
            return Err(TreeError::name_taken(parent.name(), name));
        }
        Ok(())
    }

    fn take_branch(&mut self, branch_path: &str) -> Result<Branch> {
        let (parent_segments, name) = path::split_parent(branch_path)?;
        self.parent_branch_mut(&parent_segments, branch_path)?
            .remove_branch(name)
            .ok_or_else(|| TreeError::BranchNotFound(branch_path.to_string()))
    }

    fn take_leaf(&mut self, leaf_path: &str) -> Result<Leaf> {
        let (parent_segments, name) = path::split_parent(leaf_path)?;
        self.parent_branch_mut(&parent_segments, leaf_path)?
            .remove_leaf(name)
            .ok_or_else(|| TreeError::LeafNotFound(leaf_path.to_string()))
    }

    fn rename_node(&mut self, node_path: &str, new_name: &str, task: Task) -> Result<()> {
        let (parent_segments, name) = path::split_parent(node_path)?;
        let parent = self.parent_branch_mut(&parent_segments, node_path)?;
        let found = match task {
            Task::RenameBranch => parent.get_branch(name).is_some(),
            _ => parent.get_leaf(name).is_some(),
        };
        if !found {
            return Err(match task {
                Task::RenameBranch => TreeError::BranchNotFound(node_path.to_string()),
                _ => TreeError::LeafNotFound(node_path.to_string()),
            });
        }
        if parent.has_child(new_name) {
            return Err(TreeError::name_taken(parent.name(), new_name));
        }
        parent.rename_child(name, new_name);
        Ok(())
    }

    fn set_leaf(&mut self, leaf_path: &str, value: Value, timestamp: DateTime<Utc>) -> Result<()> {
        let (parent_segments, name) = path::split_parent(leaf_path)?;
        let leaf = self
            .parent_branch_mut(&parent_segments, leaf_path)?
            .get_leaf_mut(name)
            .ok_or_else(|| TreeError::LeafNotFound(leaf_path.to_string()))?;
        if !leaf.set_value(value, timestamp) {
            return Err(TreeError::StaleWrite(leaf_path.to_string()));
        }
        Ok(())
    }

    fn branch_at(&self, segments: &[&str]) -> Option<&Branch> {
        let mut current = &self.tree;
        for segment in segments {
            current = current.get_branch(segment)?;
        }
        Some(current)
    }

    fn branch_at_mut_opt(&mut self, segments: &[&str]) -> Option<&mut Branch> {
        let mut current = &mut self.tree;
        for segment in segments {
            current = current.get_branch_mut(segment)?;
        }
        Some(current)
    }

    fn parent_branch_mut(&mut self, segments: &[&str], full_path: &str) -> Result<&mut Branch> {
        self.branch_at_mut_opt(segments).ok_or_else(|| {
            let parent = normalize(segments);
            debug!(path = %full_path, "missing intermediate branch {parent}");
            TreeError::BranchNotFound(parent)
        })
    }

    fn checked(&mut self, op: impl FnOnce(&mut Self) -> Result<()>) -> bool {
        let outcome = op(self);
        self.report(outcome)
    }

    fn report(&self, outcome: Result<()>) -> bool {
        match outcome {
            Ok(()) => true,
            Err(e) => {
                self.record_error(&e);
                false
            }
        }
    }

    fn record_error(&self, error: &TreeError) {
        debug!("tree operation failed: {error}");
        *self.error.lock().unwrap() = Some(error.to_string());
    }
}

/// Canonical absolute path for a parsed segment list.
fn normalize(segments: &[&str]) -> String {
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

impl Default for Root {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural equality: compares the trees only, not logs or queues.
impl PartialEq for Root {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree
    }
}
