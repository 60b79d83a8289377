//! Schema validation policies
//!
//! A validation policy decides, per record, whether a parsed record that
//! disagrees with the stream's frozen schema is emitted, dropped, or
//! stops the file. Dropped records are counted by the orchestrator for
//! diagnostics; they are never fatal.


use crate::schema::{JsonSchema, JsonType, SchemaProperty};
use crate::types::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Policy applied to records that do not conform to the stream schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Emit every record, conforming or not
    EmitRecord,
    /// Drop non-conforming records and keep going
    SkipRecord,
    /// Stop reading the file on the first non-conforming record; the
    /// schema has drifted since discovery and needs a re-discover
    WaitForDiscover,
}

impl ValidationPolicy {
    /// Whether a record passes this policy against the given schema
    pub fn record_passes_validation_policy(&self, record: &JsonObject, schema: &JsonSchema) -> bool {
        match self {
            ValidationPolicy::EmitRecord => true,
            ValidationPolicy::SkipRecord | ValidationPolicy::WaitForDiscover => {
                conforms_to_schema(record, schema)
            }
        }
    }

    /// Name used in config files and log lines
    pub fn name(&self) -> &'static str {
        match self {
            ValidationPolicy::EmitRecord => "emit_record",
            ValidationPolicy::SkipRecord => "skip_record",
            ValidationPolicy::WaitForDiscover => "wait_for_discover",
        }
    }
}

/// Check a record against a stream schema
///
/// A record conforms when every one of its fields is declared in the
/// schema and carries a value the declared type admits. Fields declared
/// in the schema but absent from the record are fine.
pub fn conforms_to_schema(record: &JsonObject, schema: &JsonSchema) -> bool {
    record.iter().all(|(name, value)| {
        schema
            .get_property(name)
            .is_some_and(|prop| value_matches(value, prop))
    })
}

fn value_matches(value: &Value, prop: &SchemaProperty) -> bool {
    match value {
        Value::Null => prop.is_nullable() || prop.json_type.admits(JsonType::Null),
        Value::Bool(_) => prop.json_type.admits(JsonType::Boolean),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                prop.json_type.admits(JsonType::Integer)
            } else {
                prop.json_type.admits(JsonType::Number)
            }
        }
        Value::String(_) => prop.json_type.admits(JsonType::String),
        Value::Array(items) => {
            prop.json_type.admits(JsonType::Array)
                && match &prop.items {
                    Some(item_prop) => items.iter().all(|i| value_matches(i, item_prop)),
                    None => true,
                }
        }
        Value::Object(fields) => {
            prop.json_type.admits(JsonType::Object)
                && match &prop.properties {
                    Some(props) => fields.iter().all(|(k, v)| {
                        props.get(k).is_some_and(|p| value_matches(v, p))
                    }),
                    None => true,
                }
        }
    }
}
