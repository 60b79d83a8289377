//! Schema types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON Schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Null,
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl JsonType {
    /// Rank used to keep merged type unions in a canonical order
    fn rank(self) -> u8 {
        match self {
            JsonType::Null => 0,
            JsonType::String => 1,
            JsonType::Number => 2,
            JsonType::Integer => 3,
            JsonType::Boolean => 4,
            JsonType::Object => 5,
            JsonType::Array => 6,
        }
    }
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonType::Null => write!(f, "null"),
            JsonType::String => write!(f, "string"),
            JsonType::Number => write!(f, "number"),
            JsonType::Integer => write!(f, "integer"),
            JsonType::Boolean => write!(f, "boolean"),
            JsonType::Object => write!(f, "object"),
            JsonType::Array => write!(f, "array"),
        }
    }
}

/// A single type or a union of types (unions carry `null` for nullable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonTypeOrArray {
    Single(JsonType),
    Multiple(Vec<JsonType>),
}

impl JsonTypeOrArray {
    /// Create a single type
    pub fn single(t: JsonType) -> Self {
        JsonTypeOrArray::Single(t)
    }

    /// Create a nullable type
    pub fn nullable(t: JsonType) -> Self {
        if t == JsonType::Null {
            JsonTypeOrArray::Single(JsonType::Null)
        } else {
            JsonTypeOrArray::Multiple(vec![JsonType::Null, t])
        }
    }

    /// All types in this descriptor
    pub fn types(&self) -> Vec<JsonType> {
        match self {
            JsonTypeOrArray::Single(t) => vec![*t],
            JsonTypeOrArray::Multiple(ts) => ts.clone(),
        }
    }

    /// Check if this type admits null
    pub fn is_nullable(&self) -> bool {
        match self {
            JsonTypeOrArray::Single(t) => *t == JsonType::Null,
            JsonTypeOrArray::Multiple(ts) => ts.contains(&JsonType::Null),
        }
    }

    /// Check if this type admits the given primitive
    pub fn admits(&self, t: JsonType) -> bool {
        // integer values are valid wherever number is expected
        let widened = t == JsonType::Integer && self.admits(JsonType::Number);
        self.types().contains(&t) || widened
    }

    /// Make this type nullable
    #[must_use]
    pub fn make_nullable(&self) -> Self {
        if self.is_nullable() {
            self.clone()
        } else {
            let mut types = self.types();
            types.push(JsonType::Null);
            canonicalize(types)
        }
    }

    /// Merge with another type, widening to a union on conflict
    ///
    /// Commutative: `a.merge_with(b) == b.merge_with(a)`. Disagreeing
    /// primitive types are kept side by side rather than collapsed,
    /// except integer and number which widen to number.
    #[must_use]
    pub fn merge_with(&self, other: &JsonTypeOrArray) -> JsonTypeOrArray {
        let mut types = self.types();
        types.extend(other.types());
        canonicalize(types)
    }
}

/// Dedup, widen integer alongside number, and order a type union
fn canonicalize(mut types: Vec<JsonType>) -> JsonTypeOrArray {
    if types.contains(&JsonType::Number) {
        types.retain(|t| *t != JsonType::Integer);
    }
    types.sort_by_key(|t| t.rank());
    types.dedup();

    if types.len() == 1 {
        JsonTypeOrArray::Single(types[0])
    } else {
        JsonTypeOrArray::Multiple(types)
    }
}

/// JSON Schema property definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperty {
    /// Property type(s)
    #[serde(rename = "type")]
    pub json_type: JsonTypeOrArray,

    /// Description (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Format hint (e.g., "date-time")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Nested properties (for objects)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaProperty>>,

    /// Array items schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaProperty>>,
}

impl SchemaProperty {
    /// Create a new property with the given type
    pub fn new(json_type: JsonType) -> Self {
        Self {
            json_type: JsonTypeOrArray::single(json_type),
            description: None,
            format: None,
            properties: None,
            items: None,
        }
    }

    /// Create a nullable property
    pub fn nullable(json_type: JsonType) -> Self {
        Self {
            json_type: JsonTypeOrArray::nullable(json_type),
            ..Self::new(json_type)
        }
    }

    /// Create an object property with nested properties
    pub fn object(properties: BTreeMap<String, SchemaProperty>) -> Self {
        Self {
            properties: Some(properties),
            ..Self::new(JsonType::Object)
        }
    }

    /// Create an array property with item schema
    pub fn array(items: SchemaProperty) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::new(JsonType::Array)
        }
    }

    /// Set description
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Set format hint
    #[must_use]
    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    /// Make this property nullable
    pub fn make_nullable(&mut self) {
        self.json_type = self.json_type.make_nullable();
    }

    /// Check if nullable
    pub fn is_nullable(&self) -> bool {
        self.json_type.is_nullable()
    }
}

/// Full JSON Schema document for a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema {
    /// Schema type (always "object" for a stream)
    #[serde(rename = "type")]
    pub json_type: JsonType,

    /// Field properties
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaProperty>,
}

impl Default for JsonSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonSchema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self {
            json_type: JsonType::Object,
            properties: BTreeMap::new(),
        }
    }

    /// Add a property
    pub fn add_property(&mut self, name: &str, property: SchemaProperty) {
        self.properties.insert(name.to_string(), property);
    }

    /// Get a property
    pub fn get_property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.get(name)
    }

    /// Get a mutable property
    pub fn get_property_mut(&mut self, name: &str) -> Option<&mut SchemaProperty> {
        self.properties.get_mut(name)
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
