//! Configuration types for file-based sources
//!
//! A source configuration is a list of stream definitions, loaded from
//! YAML or built programmatically. Each stream names its glob patterns,
//! file format and validation policy; the config is immutable for the
//! duration of a sync.

use crate::error::{Error, Result};
use crate::format::FormatConfig;
use crate::schema::JsonSchema;
use crate::validation::ValidationPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Source Config
// ============================================================================

/// Complete configuration for a file-based source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Config version
    #[serde(default = "default_version")]
    pub version: String,

    /// Stream definitions
    pub streams: Vec<StreamConfig>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl SourceConfig {
    /// Find a stream config by name
    pub fn get_stream(&self, name: &str) -> Option<&StreamConfig> {
        self.streams.iter().find(|s| s.name == name)
    }

    /// Validate the whole config, failing on the first invalid stream
    pub fn validate(&self) -> Result<()> {
        if self.streams.is_empty() {
            return Err(Error::missing_field("streams"));
        }
        for stream in &self.streams {
            stream.validate()?;
        }
        Ok(())
    }
}

// ============================================================================
// Stream Config
// ============================================================================

/// Configuration for a single file-based stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Stream name
    pub name: String,

    /// Glob patterns selecting the stream's files
    pub globs: Vec<String>,

    /// File format and its settings
    pub format: FormatConfig,

    /// Policy applied to records that disagree with the stream schema
    #[serde(default)]
    pub validation_policy: Option<ValidationPolicy>,

    /// Primary key field(s), if the source defines one
    #[serde(default)]
    pub primary_key: Option<PrimaryKey>,

    /// Skip schema inference and declare the whole record as one object
    #[serde(default)]
    pub schemaless: bool,

    /// User-provided schema; bypasses inference entirely
    #[serde(default)]
    pub input_schema: Option<JsonSchema>,

    /// Emit a state checkpoint after this many records
    #[serde(default = "default_checkpoint_interval")]
    pub state_checkpoint_interval: usize,
}

fn default_checkpoint_interval() -> usize {
    1000
}

impl StreamConfig {
    /// Create a stream config with defaults for the optional fields
    pub fn new(name: impl Into<String>, globs: Vec<String>, format: FormatConfig) -> Self {
        Self {
            name: name.into(),
            globs,
            format,
            validation_policy: None,
            primary_key: None,
            schemaless: false,
            input_schema: None,
            state_checkpoint_interval: default_checkpoint_interval(),
        }
    }

    /// Set the validation policy
    #[must_use]
    pub fn with_validation_policy(mut self, policy: ValidationPolicy) -> Self {
        self.validation_policy = Some(policy);
        self
    }

    /// Set the checkpoint interval
    #[must_use]
    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.state_checkpoint_interval = interval;
        self
    }

    /// Set a user-provided schema
    #[must_use]
    pub fn with_input_schema(mut self, schema: JsonSchema) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Validate this stream's config
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::missing_field("name"));
        }
        if self.globs.is_empty() {
            return Err(Error::InvalidConfigValue {
                field: format!("streams.{}.globs", self.name),
                message: "at least one glob pattern is required".to_string(),
            });
        }
        if self.state_checkpoint_interval == 0 {
            return Err(Error::InvalidConfigValue {
                field: format!("streams.{}.state_checkpoint_interval", self.name),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Whether files with parse errors are skipped instead of failing
    /// the sync (unstructured streams expose this as a format setting)
    pub fn skips_unprocessable_files(&self) -> bool {
        match &self.format {
            FormatConfig::Unstructured(u) => u.skip_unprocessable_files,
            _ => false,
        }
    }
}

/// Primary key: a single field or a composite of several
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    Single(String),
    Composite(Vec<String>),
}

impl PrimaryKey {
    /// The key's fields, in order
    pub fn fields(&self) -> Vec<&str> {
        match self {
            PrimaryKey::Single(f) => vec![f.as_str()],
            PrimaryKey::Composite(fs) => fs.iter().map(String::as_str).collect(),
        }
    }
}

// ============================================================================
// Loaders
// ============================================================================

/// Load a source config from a YAML file
pub fn load_source_config<P: AsRef<Path>>(path: P) -> Result<SourceConfig> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(Error::Io)?;
    load_source_config_from_str(&content)
}

/// Load a source config from a YAML string
pub fn load_source_config_from_str(yaml: &str) -> Result<SourceConfig> {
    let config: SourceConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}
