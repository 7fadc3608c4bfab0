//! Parameter values.
//!
//! [`Value`] is what the builder stores in conditions, SET maps and INSERT rows,
//! and what the compiler turns into `?` placeholders. Two variants never reach
//! the connection as-is:
//!
//! - [`Value::Raw`] is inlined into the SQL text and dropped from the parameter list.
//! - [`Value::Entity`] is a reference to another record and is replaced by its
//!   primary-key scalar(s).

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// A SQL parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
    /// Ordered list, rendered as `(?,?,...)`.
    List(Vec<Value>),
    /// Reference to a record, holding its primary-key values in key order.
    Entity(Vec<Value>),
    /// SQL expression inlined verbatim.
    Raw(String),
}

/// A record that can stand in for its primary key in a condition.
pub trait Entity {
    /// Primary-key values in key order.
    fn primary_key(&self) -> Vec<Value>;
}

impl Value {
    /// Inline SQL expression (not parameterized).
    pub fn raw(sql: impl Into<String>) -> Self {
        Value::Raw(sql.into())
    }

    /// Reference to an entity by its primary key.
    pub fn entity(entity: &impl Entity) -> Self {
        Value::Entity(entity.primary_key())
    }

    pub fn list<T: Into<Value>>(values: impl IntoIterator<Item = T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Convert a JSON value: scalars and arrays map structurally, objects stay JSON.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            obj @ serde_json::Value::Object(_) => Value::Json(obj.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
            Value::Timestamp(t) => write!(f, "'{}'", t.to_rfc3339()),
            Value::Uuid(u) => write!(f, "'{u}'"),
            Value::Json(j) => write!(f, "{j}"),
            Value::Raw(sql) => f.write_str(sql),
            Value::List(items) | Value::Entity(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::list(v)
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Value::list(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Author {
        id: i64,
    }

    impl Entity for Author {
        fn primary_key(&self) -> Vec<Value> {
            vec![self.id.into()]
        }
    }

    #[test]
    fn from_json_maps_structurally() {
        let json = serde_json::json!([1, "a", null, true, 1.5, {"k": 1}]);
        let Value::List(items) = Value::from_json(&json) else {
            panic!("expected list");
        };
        assert_eq!(items[0], Value::Int(1));
        assert_eq!(items[1], Value::Text("a".into()));
        assert_eq!(items[2], Value::Null);
        assert_eq!(items[3], Value::Bool(true));
        assert_eq!(items[4], Value::Float(1.5));
        assert!(matches!(items[5], Value::Json(_)));
    }

    #[test]
    fn entity_reference_holds_key() {
        assert_eq!(Value::entity(&Author { id: 7 }), Value::Entity(vec![Value::Int(7)]));
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(Value::list([1, 2]).to_string(), "(1,2)");
        assert_eq!(Value::from("x").to_string(), "'x'");
        assert_eq!(Value::raw("NOW()").to_string(), "NOW()");
    }
}
