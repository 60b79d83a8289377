//! Schema inference from JSON values and schema merging

use super::types::{JsonSchema, JsonType, SchemaProperty};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    // ISO 8601, with either a T or space separator
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}").expect("valid regex")
});

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Schema inferrer over JSON records
#[derive(Debug, Clone)]
pub struct SchemaInferrer {
    /// Detect date/date-time formats on string fields
    detect_datetime: bool,
    /// Maximum depth for nested objects
    max_depth: usize,
}

impl Default for SchemaInferrer {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaInferrer {
    /// Create a new schema inferrer with default settings
    pub fn new() -> Self {
        Self {
            detect_datetime: true,
            max_depth: 10,
        }
    }

    /// Enable/disable datetime detection
    #[must_use]
    pub fn with_datetime_detection(mut self, enabled: bool) -> Self {
        self.detect_datetime = enabled;
        self
    }

    /// Infer a schema from a single JSON record
    pub fn infer(&self, value: &Value) -> JsonSchema {
        let mut schema = JsonSchema::new();
        if let Value::Object(map) = value {
            for (key, val) in map {
                schema.add_property(key, self.infer_property(val, 0));
            }
        }
        schema
    }

    /// Infer a schema from a sequence of JSON records
    ///
    /// Per-record schemas are merged with [`merge_schemas`], so a field
    /// missing from some records comes out nullable and fields whose
    /// types disagree come out as type unions.
    pub fn infer_from_records<'a>(&self, records: impl IntoIterator<Item = &'a Value>) -> JsonSchema {
        let mut merged: Option<JsonSchema> = None;
        for record in records {
            let schema = self.infer(record);
            merged = Some(match merged {
                Some(prev) => merge_schemas(&prev, &schema),
                None => schema,
            });
        }
        merged.unwrap_or_default()
    }

    fn infer_property(&self, value: &Value, depth: usize) -> SchemaProperty {
        if depth >= self.max_depth {
            return SchemaProperty::new(JsonType::Object);
        }

        match value {
            Value::Null => SchemaProperty::new(JsonType::Null),
            Value::Bool(_) => SchemaProperty::new(JsonType::Boolean),
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    SchemaProperty::new(JsonType::Integer)
                } else {
                    SchemaProperty::new(JsonType::Number)
                }
            }
            Value::String(s) => self.infer_string_property(s),
            Value::Array(arr) => self.infer_array_property(arr, depth),
            Value::Object(map) => {
                let mut properties = BTreeMap::new();
                for (key, val) in map {
                    properties.insert(key.clone(), self.infer_property(val, depth + 1));
                }
                SchemaProperty::object(properties)
            }
        }
    }

    fn infer_string_property(&self, s: &str) -> SchemaProperty {
        let mut prop = SchemaProperty::new(JsonType::String);
        if self.detect_datetime {
            if DATETIME_RE.is_match(s) {
                prop.format = Some("date-time".to_string());
            } else if DATE_RE.is_match(s) {
                prop.format = Some("date".to_string());
            }
        }
        prop
    }

    fn infer_array_property(&self, arr: &[Value], depth: usize) -> SchemaProperty {
        let mut item_schema: Option<SchemaProperty> = None;
        for item in arr {
            let prop = self.infer_property(item, depth + 1);
            item_schema = Some(match item_schema {
                Some(prev) => merge_property(&prev, &prop),
                None => prop,
            });
        }
        SchemaProperty::array(item_schema.unwrap_or_else(|| SchemaProperty::new(JsonType::Object)))
    }
}

/// Merge two stream schemas
///
/// Field-set union; a field present on only one side comes out nullable,
/// a field with disagreeing types comes out as a type union. Commutative,
/// so discovery can merge per-file schemas in any order and still land on
/// the same result.
pub fn merge_schemas(a: &JsonSchema, b: &JsonSchema) -> JsonSchema {
    let mut result = a.clone();

    for (key, b_prop) in &b.properties {
        if let Some(a_prop) = result.get_property_mut(key) {
            *a_prop = merge_property(a_prop, b_prop);
        } else {
            let mut prop = b_prop.clone();
            prop.make_nullable();
            result.add_property(key, prop);
        }
    }

    // Fields only in a are nullable too
    for key in a.properties.keys() {
        if !b.properties.contains_key(key) {
            if let Some(prop) = result.get_property_mut(key) {
                prop.make_nullable();
            }
        }
    }

    result
}

/// Merge two properties
pub(crate) fn merge_property(a: &SchemaProperty, b: &SchemaProperty) -> SchemaProperty {
    let merged_type = a.json_type.merge_with(&b.json_type);

    // A format survives only if both sides agree on it
    let format = match (&a.format, &b.format) {
        (Some(af), Some(bf)) if af == bf => Some(af.clone()),
        (Some(f), None) | (None, Some(f)) => Some(f.clone()),
        _ => None,
    };

    let properties = match (&a.properties, &b.properties) {
        (Some(a_props), Some(b_props)) => {
            let mut merged = a_props.clone();
            for (key, b_prop) in b_props {
                if let Some(a_prop) = merged.get_mut(key) {
                    *a_prop = merge_property(a_prop, b_prop);
                } else {
                    let mut prop = b_prop.clone();
                    prop.make_nullable();
                    merged.insert(key.clone(), prop);
                }
            }
            for key in a_props.keys() {
                if !b_props.contains_key(key) {
                    if let Some(prop) = merged.get_mut(key) {
                        prop.make_nullable();
                    }
                }
            }
            Some(merged)
        }
        (Some(props), None) | (None, Some(props)) => Some(props.clone()),
        (None, None) => None,
    };

    let items = match (&a.items, &b.items) {
        (Some(a_items), Some(b_items)) => Some(Box::new(merge_property(a_items, b_items))),
        (Some(items), None) | (None, Some(items)) => Some(items.clone()),
        (None, None) => None,
    };

    SchemaProperty {
        json_type: merged_type,
        description: a.description.clone().or_else(|| b.description.clone()),
        format,
        properties,
        items,
    }
}

/// Infer a schema from a single JSON value (convenience function)
pub fn infer_schema(value: &Value) -> JsonSchema {
    SchemaInferrer::new().infer(value)
}
