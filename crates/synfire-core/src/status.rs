//! Property maps for node status access.
//!
//! Nodes report and accept their configuration as ordered string-keyed
//! maps. The kernel adds bookkeeping entries (`global_id`, `model`) when
//! reporting; nodes own everything else.

use indexmap::IndexMap;
use std::fmt;

/// Ordered key-value map describing a node's observable state.
///
/// Insertion order is preserved so that diagnostic output is stable.
pub type PropertyMap = IndexMap<String, PropertyValue>;

/// A single property value.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    /// Signed integer property (counters, IDs, indices).
    Int(i64),
    /// Floating-point property (potentials, delays, rates).
    Float(f64),
    /// Boolean property (flags such as `frozen`).
    Bool(bool),
    /// Free-form text property (model names, labels).
    Text(String),
}

impl PropertyValue {
    /// The integer payload, if this value is an [`PropertyValue::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The float payload, if this value is a [`PropertyValue::Float`].
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The boolean payload, if this value is a [`PropertyValue::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The text payload, if this value is a [`PropertyValue::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_match_variants() {
        assert_eq!(PropertyValue::Int(7).as_int(), Some(7));
        assert_eq!(PropertyValue::Int(7).as_float(), None);
        assert_eq!(PropertyValue::Float(0.5).as_float(), Some(0.5));
        assert_eq!(PropertyValue::Bool(true).as_bool(), Some(true));
        assert_eq!(PropertyValue::from("v").as_text(), Some("v"));
    }

    #[test]
    fn map_preserves_insertion_order() {
        let mut map = PropertyMap::new();
        map.insert("b".into(), 1i64.into());
        map.insert("a".into(), 2i64.into());
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
