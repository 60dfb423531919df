//! SyncNode - per-process wrapper tying tree, objects, tasks and transport
//!
//! One node owns one tree replica. Each `run_iteration` ingests peer
//! seeds, executes command leaves addressed to this node, runs deferred
//! tasks, mirrors live object attributes into the tree, and broadcasts
//! whatever the tree logged. The coordinator is the only node that
//! relays applied seeds onward; workers apply silently.

use crate::error::Result;
use crate::object::SyncObject;
use crate::tasks::TaskQueue;
use crate::transport::Transport;
use bytes::Bytes;
use canopy_tree::{Root, Value};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct SyncNode {
    name: String,
    is_coordinator: bool,
    tree: Root,
    objects: BTreeMap<String, Box<dyn SyncObject>>,
    tasks: TaskQueue,
    transport: Box<dyn Transport>,
    pending_out: BTreeMap<String, Vec<canopy_tree::Seed>>,
    buffers: BTreeMap<String, Bytes>,
}

impl SyncNode {
    /// Create a node named after its transport endpoint and seed the
    /// tree with the node's own namespace.
    pub fn new(transport: Box<dyn Transport>, is_coordinator: bool) -> Self {
        let name = transport.node_name().to_string();
        let mut node = Self {
            name,
            is_coordinator,
            tree: Root::new(),
            objects: BTreeMap::new(),
            tasks: TaskQueue::new(),
            transport,
            pending_out: BTreeMap::new(),
            buffers: BTreeMap::new(),
        };
        node.initialize_tree();
        node
    }

    /// Create `/<node>` and its reserved sub-branches. The creation
    /// seeds stay in the tree's log and go out on the first propagate,
    /// which is how peers learn this node's namespace.
    fn initialize_tree(&mut self) {
        let base = format!("/{}", self.name);
        self.tree.create_branch_at(&base);
        for reserved in ["objects", "commands", "attributes", "logs", "durations"] {
            self.tree.create_branch_at(&format!("{base}/{reserved}"));
        }
        info!(node = %self.name, coordinator = self.is_coordinator, "tree initialized");
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_coordinator(&self) -> bool {
        self.is_coordinator
    }

    pub fn tree(&self) -> &Root {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Root {
        &mut self.tree
    }

    pub fn connect_to(&mut self, peer: &str) -> Result<()> {
        self.transport.connect_to(peer)
    }

    // -----------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------

    /// Register a live object and carve out its attribute branch under
    /// this node's namespace.
    pub fn register_object(&mut self, object: Box<dyn SyncObject>) {
        let base = format!("/{}/objects/{}", self.name, object.name());
        self.tree.create_branch_at(&base);
        self.tree.create_branch_at(&format!("{base}/attributes"));
        self.objects.insert(object.name().to_string(), object);
    }

    /// Read an attribute straight off a local object.
    pub fn object_attribute(&self, object: &str, attribute: &str) -> Option<Value> {
        self.objects.get(object)?.get_attribute(attribute)
    }

    /// Set an attribute on a local object directly. The change reaches
    /// the tree, and the peers, on the next mirroring pass.
    pub fn set_object_attribute(&mut self, object: &str, attribute: &str, value: Value) -> bool {
        match self.objects.get_mut(object) {
            Some(target) => target.set_attribute(attribute, value),
            None => {
                warn!(node = %self.name, object, "attribute set for unregistered object");
                false
            }
        }
    }

    // -----------------------------------------------------------------
    // Commands and tasks
    // -----------------------------------------------------------------

    /// Ask `peer` to set `attribute` on its `object`, by writing a
    /// command leaf into the peer's namespace. The peer executes and
    /// removes the leaf; observing the removal is the acknowledgement.
    pub fn send_command_to(&mut self, peer: &str, object: &str, attribute: &str, value: Value) -> bool {
        let leaf_path = format!("/{}/commands/{}", peer, Uuid::new_v4());
        let command = Value::Values(vec![
            Value::Str(object.to_string()),
            Value::Str(attribute.to_string()),
            value,
        ]);
        let created = self.tree.create_leaf_with_value_at(&leaf_path, command);
        if !created {
            warn!(node = %self.name, peer, "command not queued: {:?}", self.tree.get_error());
        }
        created
    }

    pub fn add_task(&self, task: impl FnOnce() + Send + 'static) {
        self.tasks.add_task(task);
    }

    /// Drain and run the deferred task queue. Returns how many ran.
    pub fn run_tasks(&self) -> usize {
        self.tasks.run_tasks()
    }

    /// Execute and remove every command leaf under this node's
    /// `/commands` branch. Undecodable commands are logged and removed,
    /// so a malformed write cannot wedge the branch.
    pub fn execute_tree_commands(&mut self) {
        let commands_path = format!("/{}/commands", self.name);
        for leaf_name in self.tree.get_leaf_list_at(&commands_path) {
            let leaf_path = format!("{commands_path}/{leaf_name}");
            let value = self.tree.get_value_for_leaf_at(&leaf_path);
            match value.as_ref().and_then(decode_command) {
                Some((object, attribute, argument)) => {
                    match self.objects.get_mut(object) {
                        Some(target) => {
                            if !target.set_attribute(attribute, argument.clone()) {
                                warn!(node = %self.name, object, attribute, "object rejected command");
                            }
                        }
                        None => {
                            warn!(node = %self.name, object, "command for unknown object");
                        }
                    }
                }
                None => {
                    warn!(node = %self.name, path = %leaf_path, "malformed command leaf");
                }
            }
            self.tree.remove_leaf_at(&leaf_path);
        }
    }

    // -----------------------------------------------------------------
    // Mirroring
    // -----------------------------------------------------------------

    /// Mirror every registered object's attributes into
    /// `/<node>/objects/<object>/attributes/<attribute>`, emitting a
    /// write only when the stored value actually differs.
    pub fn update_tree_from_objects(&mut self) {
        let names: Vec<String> = self.objects.keys().cloned().collect();
        for object_name in names {
            let base = format!("/{}/objects/{}/attributes", self.name, object_name);
            if !self.tree.has_branch_at(&base) {
                // Object registered before a peer-driven teardown; rebuild.
                self.tree
                    .create_branch_at(&format!("/{}/objects/{}", self.name, object_name));
                self.tree.create_branch_at(&base);
            }
            let object = self.objects.get(&object_name).expect("known key");
            let mirrored: Vec<(String, Value)> = object
                .attribute_names()
                .into_iter()
                .filter_map(|a| object.get_attribute(&a).map(|v| (a, v)))
                .collect();
            for (attribute, value) in mirrored {
                let leaf_path = format!("{base}/{attribute}");
                if !self.tree.has_leaf_at(&leaf_path) {
                    self.tree.create_leaf_with_value_at(&leaf_path, value);
                } else if self.tree.get_value_for_leaf_at(&leaf_path).as_ref() != Some(&value) {
                    self.tree.set_value_for_leaf_at(&leaf_path, value);
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Loop
    // -----------------------------------------------------------------

    /// One pass of the control loop. Safe to drive manually in tests.
    pub fn run_iteration(&mut self) {
        let started = Instant::now();

        // 1. ingest peer seeds and buffers, apply the queue
        for batch in self.transport.receive_seeds() {
            self.tree.add_seeds_to_queue(batch);
        }
        for (name, payload) in self.transport.receive_buffers() {
            self.buffers.insert(name, payload);
        }
        self.tree.process_queue(self.is_coordinator);
        if let Some(error) = self.tree.get_error() {
            debug!(node = %self.name, "tree reported: {error}");
        }

        // 2. commands addressed to this node
        self.execute_tree_commands();

        // 3. deferred tasks
        let ran = self.tasks.run_tasks();
        if ran > 0 {
            debug!(node = %self.name, count = ran, "deferred tasks executed");
        }

        // 4. mirror object attributes
        self.update_tree_from_objects();

        // 5. publish the loop duration, then broadcast
        self.record_loop_duration(started.elapsed());
        self.propagate_tree();
    }

    fn record_loop_duration(&mut self, elapsed: Duration) {
        let leaf_path = format!("/{}/durations/loop", self.name);
        let micros = Value::Int(elapsed.as_micros() as i64);
        if !self.tree.has_leaf_at(&leaf_path) {
            self.tree.create_leaf_with_value_at(&leaf_path, micros);
        } else {
            self.tree.set_value_for_leaf_at(&leaf_path, micros);
        }
    }

    /// Drain the tree's seed log and ship it to every peer, together
    /// with any seeds a previous iteration failed to deliver to that
    /// peer. Failures are retained per peer, so a flaky peer catching
    /// up never causes duplicate applies on the healthy ones.
    pub fn propagate_tree(&mut self) {
        let fresh = self.tree.get_seed_list();
        for peer in self.transport.peers() {
            let mut outgoing = self.pending_out.remove(&peer).unwrap_or_default();
            outgoing.extend(fresh.iter().cloned());
            if outgoing.is_empty() {
                continue;
            }
            if let Err(e) = self.transport.send_seeds(&peer, &outgoing) {
                warn!(node = %self.name, peer = %peer, "send failed, retrying next iteration: {e}");
                self.pending_out.insert(peer, outgoing);
            }
        }
    }

    /// Ship an opaque buffer to a peer, outside the seed stream.
    pub fn send_buffer(&mut self, peer: &str, name: &str, data: Bytes) -> Result<()> {
        self.transport.send_buffer(peer, name, data)
    }

    /// Take the most recently received buffer under `name`, if any.
    pub fn take_buffer(&mut self, name: &str) -> Option<Bytes> {
        self.buffers.remove(name)
    }

    /// Drive the loop until `stop` is cancelled, one iteration per tick.
    pub async fn run(&mut self, period: Duration, stop: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = stop.cancelled() => {
                    info!(node = %self.name, "stopping");
                    break;
                }
                _ = ticker.tick() => self.run_iteration(),
            }
        }
        // Last chance for queued sends before the node goes away.
        if !self.transport.wait_for_pending_sends(Duration::from_millis(500)) {
            warn!(node = %self.name, "pending sends dropped on shutdown");
        }
    }
}

/// Command leaves decode as `[target object, attribute, value]`.
fn decode_command(value: &Value) -> Option<(&str, &str, Value)> {
    match value {
        Value::Values(parts) if parts.len() == 3 => {
            let object = parts[0].as_str()?;
            let attribute = parts[1].as_str()?;
            Some((object, attribute, parts[2].clone()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_tree::values;

    #[test]
    fn command_decoding_is_strict() {
        let good = values!["camera", "fov", 45.0];
        assert_eq!(decode_command(&good), Some(("camera", "fov", Value::Real(45.0))));

        let short = values!["camera", "fov"];
        assert!(decode_command(&short).is_none());

        let wrong_type = values![1, "fov", 45.0];
        assert!(decode_command(&wrong_type).is_none());

        assert!(decode_command(&Value::Str("flat".into())).is_none());
    }
}
