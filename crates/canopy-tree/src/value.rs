//! Variant value type held by tree leaves

use serde::{Deserialize, Serialize};

/// A value stored in a leaf, or shipped inside a seed.
///
/// Leaves usually hold a `Values` aggregate (an ordered sequence of
/// scalars); an empty `Values` marks existence without data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Int(i64),
    Real(f64),
    Str(String),
    Bool(bool),
    Values(Vec<Value>),
    Buffer(Vec<u8>),
}

impl Value {
    /// An empty aggregate — the default content of a freshly created leaf.
    pub fn empty() -> Self {
        Self::Values(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Values(v) if v.is_empty())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Real(r) => Some(*r as i64),
            Self::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(n) => Some(*n != 0),
            _ => None,
        }
    }

    pub fn as_values(&self) -> Option<&[Value]> {
        match self {
            Self::Values(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&[u8]> {
        match self {
            Self::Buffer(b) => Some(b),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Self::Real(r)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Values(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Buffer(b)
    }
}

/// Build a `Value::Values` aggregate from mixed scalars.
///
/// ```
/// use canopy_tree::values;
/// let v = values![1.0, "x", false];
/// assert_eq!(v.as_values().unwrap().len(), 3);
/// ```
#[macro_export]
macro_rules! values {
    ($($item:expr),* $(,)?) => {
        $crate::Value::Values(vec![$($crate::Value::from($item)),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_aggregate() {
        assert!(Value::empty().is_empty());
        assert!(!Value::Int(0).is_empty());
        assert!(!values![1].is_empty());
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from(3), Value::Int(3));
        assert_eq!(Value::from(2.5), Value::Real(2.5));
        assert_eq!(Value::from("hi"), Value::Str("hi".into()));
        assert_eq!(Value::from(true), Value::Bool(true));
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::Int(7).as_i64(), Some(7));
        assert_eq!(Value::Int(7).as_f64(), Some(7.0));
        assert_eq!(Value::Str("a".into()).as_str(), Some("a"));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert!(Value::Str("a".into()).as_i64().is_none());
    }

    #[test]
    fn serde_roundtrip() {
        let v = values![1.0, "I've got a flying machine", false];
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn buffer_roundtrip() {
        let v = Value::Buffer(vec![0, 1, 2, 255]);
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
