//! Leaf - terminal tree node holding a value and change callbacks

use crate::value::Value;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Handle returned by [`Leaf::add_callback`], used to unregister.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct CallbackId(u64);

type Callback = Box<dyn Fn(&Value, DateTime<Utc>) + Send + Sync>;

/// A named value cell with a monotonically tracked last-update time.
///
/// Callbacks fire synchronously on the thread performing the set, in
/// registration order. Equality compares name and value only.
pub struct Leaf {
    name: String,
    value: Value,
    last_update: DateTime<Utc>,
    next_callback_id: u64,
    callbacks: BTreeMap<CallbackId, Callback>,
}

impl Leaf {
    /// Create an empty leaf. The update time starts at the epoch so that
    /// any replayed write, however old its origin, lands on a fresh leaf.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Value::empty(),
            last_update: DateTime::UNIX_EPOCH,
            next_callback_id: 0,
            callbacks: BTreeMap::new(),
        }
    }

    pub fn with_value(name: impl Into<String>, value: Value, timestamp: DateTime<Utc>) -> Self {
        let mut leaf = Self::new(name);
        leaf.value = value;
        leaf.last_update = timestamp;
        leaf
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    /// Set the value, stamped with an explicit timestamp so that remote
    /// writes replay with their original chronology.
    ///
    /// The write is applied, and callbacks fired, only if `timestamp` is
    /// not older than the currently stored update time. Returns whether
    /// the update was applied.
    pub fn set_value(&mut self, value: Value, timestamp: DateTime<Utc>) -> bool {
        if timestamp < self.last_update {
            return false;
        }
        self.value = value;
        self.last_update = timestamp;
        for callback in self.callbacks.values() {
            callback(&self.value, timestamp);
        }
        true
    }

    /// Register a change callback. Callbacks run in registration order.
    pub fn add_callback(
        &mut self,
        callback: impl Fn(&Value, DateTime<Utc>) + Send + Sync + 'static,
    ) -> CallbackId {
        let id = CallbackId(self.next_callback_id);
        self.next_callback_id += 1;
        self.callbacks.insert(id, Box::new(callback));
        id
    }

    /// Unregister a callback. Returns whether it was registered.
    pub fn remove_callback(&mut self, id: CallbackId) -> bool {
        self.callbacks.remove(&id).is_some()
    }
}

impl PartialEq for Leaf {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaf")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("last_update", &self.last_update)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
