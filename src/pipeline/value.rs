//! Attribute values held by node attributes.
//!
//! Attributes are dynamically typed so that a downstream node can look one
//! up by name on any ancestor without knowing that ancestor's concrete type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a declared node attribute.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
    /// Declared but not yet known (e.g. a source that learns its
    /// channel count on initialize).
    #[default]
    Unset,
}

impl AttrValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float view; integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AttrValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, AttrValue::Unset)
    }

    /// Short type name used in validation messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AttrValue::Bool(_) => "bool",
            AttrValue::Int(_) => "int",
            AttrValue::Float(_) => "float",
            AttrValue::Text(_) => "text",
            AttrValue::List(_) => "list",
            AttrValue::Unset => "unset",
        }
    }

    /// Coerce `self` to the representation of `current`.
    ///
    /// Config files write `256` for a float attribute; without this the
    /// committed `Int(256)` would compare unequal to a snapshotted
    /// `Float(256.0)` and force a spurious reinitialization downstream.
    pub fn coerced_like(self, current: &AttrValue) -> AttrValue {
        match (current, self) {
            (AttrValue::Float(_), AttrValue::Int(v)) => AttrValue::Float(v as f64),
            (_, other) => other,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(v) => write!(f, "{}", v),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Text(v) => write!(f, "{:?}", v),
            AttrValue::List(v) => write!(f, "{:?}", v),
            AttrValue::Unset => write!(f, "<unset>"),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<usize> for AttrValue {
    fn from(v: usize) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(v: Vec<String>) -> Self {
        AttrValue::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::approx_constant)] // Intentionally using 3.14 as test value, not PI
    fn test_accessors() {
        assert_eq!(AttrValue::Bool(true).as_bool(), Some(true));
        assert_eq!(AttrValue::Int(42).as_int(), Some(42));
        assert_eq!(AttrValue::Float(3.14).as_float(), Some(3.14));
        assert_eq!(AttrValue::Int(2).as_float(), Some(2.0));
        assert_eq!(AttrValue::Text("eeg".into()).as_str(), Some("eeg"));
        assert_eq!(AttrValue::Float(1.0).as_int(), None);
        assert!(AttrValue::Unset.is_unset());
    }

    #[test]
    fn test_coerced_like_widens_int_for_float_slot() {
        let v = AttrValue::Int(512).coerced_like(&AttrValue::Float(256.0));
        assert_eq!(v, AttrValue::Float(512.0));

        let v = AttrValue::Int(8).coerced_like(&AttrValue::Int(4));
        assert_eq!(v, AttrValue::Int(8));

        let v = AttrValue::Text("x".into()).coerced_like(&AttrValue::Float(1.0));
        assert_eq!(v, AttrValue::Text("x".into()));
    }

    #[test]
    fn test_deserialize_untagged() {
        #[derive(Deserialize)]
        struct Holder {
            a: AttrValue,
            b: AttrValue,
            c: AttrValue,
            d: AttrValue,
        }

        let h: Holder = toml::from_str("a = 256\nb = 0.5\nc = \"lsl\"\nd = [\"Fz\", \"Cz\"]").unwrap();
        assert_eq!(h.a, AttrValue::Int(256));
        assert_eq!(h.b, AttrValue::Float(0.5));
        assert_eq!(h.c, AttrValue::Text("lsl".into()));
        assert_eq!(h.d, AttrValue::List(vec!["Fz".into(), "Cz".into()]));
    }

    #[test]
    fn test_display() {
        assert_eq!(AttrValue::Float(256.0).to_string(), "256");
        assert_eq!(AttrValue::Unset.to_string(), "<unset>");
    }
}
