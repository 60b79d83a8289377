//! Stream schema representation, inference and merging
//!
//! Schemas are JSON-Schema-like: a map from field name to a type
//! descriptor that may be a union (nullable fields carry `null` in the
//! union). Per-file schemas produced by the parsers are merged into one
//! canonical stream schema during discovery.

mod inference;
mod types;


pub use inference::{infer_schema, merge_schemas, SchemaInferrer};
pub use types::{JsonSchema, JsonType, JsonTypeOrArray, SchemaProperty};
