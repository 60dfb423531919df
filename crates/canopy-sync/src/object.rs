//! Live objects whose attributes are mirrored into the tree

use canopy_tree::Value;
use std::collections::BTreeMap;

/// A live object the coordination layer can drive.
///
/// Attribute writes arrive from two directions: local code, and command
/// leaves written into the tree by peers. Both land on `set_attribute`.
/// A `false` return means the object rejected the write; the caller
/// logs it and moves on.
pub trait SyncObject: Send {
    fn name(&self) -> &str;

    fn set_attribute(&mut self, attribute: &str, value: Value) -> bool;

    fn get_attribute(&self, attribute: &str) -> Option<Value>;

    /// Attribute names in a stable order, for mirroring.
    fn attribute_names(&self) -> Vec<String>;
}

/// Map-backed object, enough for tests and the demo. Accepts any
/// attribute name.
#[derive(Debug, Default)]
pub struct AttributeObject {
    name: String,
    attributes: BTreeMap<String, Value>,
}

impl AttributeObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(attribute.into(), value);
        self
    }
}

impl SyncObject for AttributeObject {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_attribute(&mut self, attribute: &str, value: Value) -> bool {
        self.attributes.insert(attribute.to_string(), value);
        true
    }

    fn get_attribute(&self, attribute: &str) -> Option<Value> {
        self.attributes.get(attribute).cloned()
    }

    fn attribute_names(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_tree::values;

    #[test]
    fn attribute_object_stores_and_lists() {
        let mut object = AttributeObject::new("camera").with_attribute("fov", values![45.0]);
        assert_eq!(object.get_attribute("fov"), Some(values![45.0]));
        assert!(object.set_attribute("eye", values![0.0, 1.0, 5.0]));
        assert_eq!(object.attribute_names(), vec!["eye", "fov"]);
        assert!(object.get_attribute("missing").is_none());
    }
}
