//! Record field access
//!
//! A record is any value whose serialized form is a map of named fields.
//! Field-keyed kernels read fields through `serde_json::Value`, so plain
//! `#[derive(Serialize)]` structs and JSON objects are both records.

use super::numeric::Numeric;
use crate::error::KernelError;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::any::type_name;
use std::cmp::Ordering;
use std::fmt;

/// Serialize `item` and return its fields
pub fn to_record<S: Serialize + ?Sized>(item: &S) -> Result<Map<String, Value>, KernelError> {
    match serde_json::to_value(item) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(KernelError::NotARecord {
            type_name: type_name::<S>().to_string(),
        }),
        Err(err) => Err(KernelError::Inspection {
            type_name: type_name::<S>().to_string(),
            reason: err.to_string(),
        }),
    }
}

/// Value of field `name`; `Ok(None)` when the record has no such field
pub fn field<S: Serialize + ?Sized>(item: &S, name: &str) -> Result<Option<Value>, KernelError> {
    let mut fields = to_record(item)?;
    Ok(fields.remove(name))
}

/// Hashable, totally ordered image of a field value
///
/// Used as the group key of field-keyed grouping and as the sort key of
/// field-keyed sorting. Arrays and objects collapse to their JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Composite(String),
}

impl FieldKey {
    fn rank(&self) -> u8 {
        match self {
            FieldKey::Null => 0,
            FieldKey::Bool(_) => 1,
            FieldKey::Number(_) => 2,
            FieldKey::String(_) => 3,
            FieldKey::Composite(_) => 4,
        }
    }
}

impl From<Value> for FieldKey {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldKey::Null,
            Value::Bool(b) => FieldKey::Bool(b),
            Value::Number(n) => FieldKey::Number(n),
            Value::String(s) => FieldKey::String(s),
            composite => FieldKey::Composite(composite.to_string()),
        }
    }
}

impl Ord for FieldKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FieldKey::Bool(a), FieldKey::Bool(b)) => a.cmp(b),
            (FieldKey::Number(a), FieldKey::Number(b)) => {
                let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                x.total_cmp(&y).then_with(|| a.to_string().cmp(&b.to_string()))
            }
            (FieldKey::String(a), FieldKey::String(b)) => a.cmp(b),
            (FieldKey::Composite(a), FieldKey::Composite(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for FieldKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Numeric for FieldKey {
    fn to_f64(&self) -> Option<f64> {
        match self {
            FieldKey::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Null => f.write_str("null"),
            FieldKey::Bool(b) => write!(f, "{}", b),
            FieldKey::Number(n) => write!(f, "{}", n),
            FieldKey::String(s) => f.write_str(s),
            FieldKey::Composite(json) => f.write_str(json),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Reading {
        device: String,
        value: f64,
    }

    #[test]
    fn test_struct_fields() {
        let reading = Reading {
            device: "probe-1".to_string(),
            value: 2.5,
        };
        assert_eq!(field(&reading, "device").unwrap(), Some(json!("probe-1")));
        assert_eq!(field(&reading, "value").unwrap(), Some(json!(2.5)));
        assert_eq!(field(&reading, "missing").unwrap(), None);
    }

    #[test]
    fn test_non_record_is_rejected() {
        let err = field(&42_i32, "value").unwrap_err();
        assert!(matches!(err, KernelError::NotARecord { .. }));
        assert!(field(&vec![1, 2], "len").is_err());
    }

    #[test]
    fn test_field_key_order() {
        let mut keys: Vec<FieldKey> = vec![
            json!("b").into(),
            json!(10).into(),
            json!(null).into(),
            json!(2.5).into(),
            json!("a").into(),
            json!(true).into(),
        ];
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["null", "true", "2.5", "10", "a", "b"]);
    }

    #[test]
    fn test_composite_keys_use_json_text() {
        let key = FieldKey::from(json!({"a": 1}));
        assert_eq!(key, FieldKey::Composite("{\"a\":1}".to_string()));
        assert_eq!(key.to_f64(), None);
    }
}
