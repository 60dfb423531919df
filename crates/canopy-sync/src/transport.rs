//! Transport abstraction and the in-memory implementation
//!
//! Seed batches cross the wire as opaque serialized blobs; the transport
//! never inspects tree semantics. `MemoryHub` wires any number of
//! in-process transports together through unbounded channels, which is
//! what the tests and the demo binary run on.

use crate::error::{Result, SyncError};
use bytes::Bytes;
use canopy_tree::Seed;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Point-to-point seed and buffer shipping between named peers.
///
/// All methods are non-blocking: `receive_seeds` is a drain of whatever
/// has arrived, send failures surface as errors the caller retries on
/// its next iteration.
pub trait Transport: Send {
    /// The name this transport is registered under.
    fn node_name(&self) -> &str;

    /// Declare a peer as a send target. Fails if the peer is unknown.
    fn connect_to(&mut self, peer: &str) -> Result<()>;

    fn send_seeds(&mut self, peer: &str, seeds: &[Seed]) -> Result<()>;

    /// Send a batch to every connected peer.
    fn broadcast_seeds(&mut self, seeds: &[Seed]) -> Result<()>;

    /// Drain received batches, oldest first. Undecodable batches are
    /// logged and skipped.
    fn receive_seeds(&mut self) -> Vec<Vec<Seed>>;

    /// Ship an opaque named buffer to a peer, outside the seed stream.
    fn send_buffer(&mut self, peer: &str, name: &str, data: Bytes) -> Result<()>;

    /// Drain received buffers as (name, payload) pairs.
    fn receive_buffers(&mut self) -> Vec<(String, Bytes)>;

    /// Block until queued outgoing sends have been handed off, or the
    /// timeout elapses. Returns whether everything was handed off.
    fn wait_for_pending_sends(&mut self, timeout: Duration) -> bool;

    /// Connected peer names.
    fn peers(&self) -> Vec<String>;
}

// ---------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------

struct Mailbox {
    seeds: mpsc::UnboundedSender<Bytes>,
    buffers: mpsc::UnboundedSender<(String, Bytes)>,
}

/// Registry wiring in-process transports together. Clone the `Arc` and
/// call [`MemoryHub::register`] once per node.
#[derive(Default)]
pub struct MemoryHub {
    mailboxes: DashMap<String, Mailbox>,
}

impl MemoryHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a transport endpoint registered under `name`. A second
    /// registration under the same name replaces the first mailbox.
    pub fn register(self: &Arc<Self>, name: impl Into<String>) -> MemoryTransport {
        let name = name.into();
        let (seed_tx, seed_rx) = mpsc::unbounded_channel();
        let (buffer_tx, buffer_rx) = mpsc::unbounded_channel();
        self.mailboxes.insert(
            name.clone(),
            Mailbox {
                seeds: seed_tx,
                buffers: buffer_tx,
            },
        );
        MemoryTransport {
            name,
            hub: self.clone(),
            peers: Vec::new(),
            seed_rx,
            buffer_rx,
        }
    }

    fn deliver_seeds(&self, peer: &str, payload: Bytes) -> Result<()> {
        let mailbox = self
            .mailboxes
            .get(peer)
            .ok_or_else(|| SyncError::peer_unknown(peer))?;
        mailbox
            .seeds
            .send(payload)
            .map_err(|_| SyncError::peer_unreachable(peer))
    }

    fn deliver_buffer(&self, peer: &str, name: String, payload: Bytes) -> Result<()> {
        let mailbox = self
            .mailboxes
            .get(peer)
            .ok_or_else(|| SyncError::peer_unknown(peer))?;
        mailbox
            .buffers
            .send((name, payload))
            .map_err(|_| SyncError::peer_unreachable(peer))
    }
}

/// One node's endpoint on a [`MemoryHub`].
pub struct MemoryTransport {
    name: String,
    hub: Arc<MemoryHub>,
    peers: Vec<String>,
    seed_rx: mpsc::UnboundedReceiver<Bytes>,
    buffer_rx: mpsc::UnboundedReceiver<(String, Bytes)>,
}

impl Transport for MemoryTransport {
    fn node_name(&self) -> &str {
        &self.name
    }

    fn connect_to(&mut self, peer: &str) -> Result<()> {
        if !self.hub.mailboxes.contains_key(peer) {
            return Err(SyncError::peer_unknown(peer));
        }
        if !self.peers.iter().any(|p| p == peer) {
            self.peers.push(peer.to_string());
        }
        Ok(())
    }

    fn send_seeds(&mut self, peer: &str, seeds: &[Seed]) -> Result<()> {
        let payload = Bytes::from(serde_json::to_vec(seeds)?);
        self.hub.deliver_seeds(peer, payload)
    }

    fn broadcast_seeds(&mut self, seeds: &[Seed]) -> Result<()> {
        if seeds.is_empty() {
            return Ok(());
        }
        // Every reachable peer gets the batch even if another one is
        // down; the first failure is still reported to the caller.
        let payload = Bytes::from(serde_json::to_vec(seeds)?);
        let mut failure = None;
        for peer in &self.peers {
            if let Err(e) = self.hub.deliver_seeds(peer, payload.clone()) {
                failure.get_or_insert(e);
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn receive_seeds(&mut self) -> Vec<Vec<Seed>> {
        let mut batches = Vec::new();
        while let Ok(payload) = self.seed_rx.try_recv() {
            match serde_json::from_slice::<Vec<Seed>>(&payload) {
                Ok(batch) => batches.push(batch),
                Err(e) => warn!(node = %self.name, "dropping undecodable seed batch: {e}"),
            }
        }
        batches
    }

    fn send_buffer(&mut self, peer: &str, name: &str, data: Bytes) -> Result<()> {
        self.hub.deliver_buffer(peer, name.to_string(), data)
    }

    fn receive_buffers(&mut self) -> Vec<(String, Bytes)> {
        let mut buffers = Vec::new();
        while let Ok(pair) = self.buffer_rx.try_recv() {
            buffers.push(pair);
        }
        buffers
    }

    fn wait_for_pending_sends(&mut self, _timeout: Duration) -> bool {
        // In-memory sends complete synchronously.
        true
    }

    fn peers(&self) -> Vec<String> {
        self.peers.clone()
    }
}
