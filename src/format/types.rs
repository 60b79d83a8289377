//! File format configuration types
//!
//! Each stream declares one file format; the format carries its own
//! sub-configuration and is the key the parser registry dispatches on.

use serde::{Deserialize, Serialize};

/// File format of a stream, with format-specific settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filetype", rename_all = "lowercase")]
pub enum FormatConfig {
    /// Delimited text (CSV, TSV, ...)
    Csv(CsvFormat),
    /// JSON Lines (one object per line)
    Jsonl(JsonlFormat),
    /// Columnar Parquet
    Parquet(ParquetFormat),
    /// Unstructured documents (markdown, text, PDF, DOCX, PPTX)
    Unstructured(UnstructuredFormat),
}

impl FormatConfig {
    /// Short label for logs and error messages
    pub fn label(&self) -> &'static str {
        match self {
            FormatConfig::Csv(_) => "csv",
            FormatConfig::Jsonl(_) => "jsonl",
            FormatConfig::Parquet(_) => "parquet",
            FormatConfig::Unstructured(_) => "unstructured",
        }
    }
}

// ============================================================================
// CSV
// ============================================================================

/// Settings for delimited-text files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvFormat {
    /// Field delimiter
    pub delimiter: char,

    /// Quote character
    pub quote_char: char,

    /// Rows to skip before the header row
    pub skip_rows_before_header: usize,

    /// Rows to skip between the header row and the first data row
    pub skip_rows_after_header: usize,

    /// Where column names come from
    pub header_definition: CsvHeaderDefinition,

    /// Values parsed as null
    pub null_values: Vec<String>,

    /// Values parsed as boolean true
    pub true_values: Vec<String>,

    /// Values parsed as boolean false
    pub false_values: Vec<String>,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote_char: '"',
            skip_rows_before_header: 0,
            skip_rows_after_header: 0,
            header_definition: CsvHeaderDefinition::default(),
            null_values: vec![String::new(), "null".to_string()],
            true_values: vec!["true".to_string(), "t".to_string(), "yes".to_string()],
            false_values: vec!["false".to_string(), "f".to_string(), "no".to_string()],
        }
    }
}

/// Where a CSV stream's column names come from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "header_definition_type", rename_all = "snake_case")]
pub enum CsvHeaderDefinition {
    /// First (non-skipped) row of each file
    #[default]
    FromCsv,
    /// Generated names `f0`, `f1`, ... based on the first row's width
    Autogenerated,
    /// Names supplied in the stream config
    UserProvided {
        /// Column names, in file order
        column_names: Vec<String>,
    },
}

// ============================================================================
// JSONL
// ============================================================================

/// Settings for JSON Lines files
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonlFormat {}

// ============================================================================
// Parquet
// ============================================================================

/// Settings for Parquet files
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParquetFormat {
    /// Emit decimal columns as numbers instead of strings
    pub decimal_as_float: bool,
}

// ============================================================================
// Unstructured documents
// ============================================================================

/// Settings for unstructured-document streams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnstructuredFormat {
    /// Skip files that cannot be parsed instead of failing the sync;
    /// skipped files produce a record with a null content payload and an
    /// embedded error message
    pub skip_unprocessable_files: bool,

    /// Partitioning strategy passed to the processing backend
    pub strategy: String,

    /// Where document partitioning happens
    pub processing: ProcessingConfig,
}

impl Default for UnstructuredFormat {
    fn default() -> Self {
        Self {
            skip_unprocessable_files: true,
            strategy: "auto".to_string(),
            processing: ProcessingConfig::default(),
        }
    }
}

/// Document processing backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ProcessingConfig {
    /// Markdown and plain text handled in-process; no binary formats
    #[default]
    Local,
    /// Delegate binary formats to a document-partitioning HTTP API
    Api {
        /// API key sent with every request
        api_key: String,
        /// Base URL of the API
        #[serde(default = "default_api_url")]
        api_url: String,
        /// Extra form parameters forwarded to the API
        #[serde(default)]
        parameters: Vec<ApiParameter>,
    },
}

fn default_api_url() -> String {
    "https://api.unstructured.io".to_string()
}

/// One extra form parameter for the processing API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiParameter {
    /// Parameter name
    pub name: String,
    /// Parameter value
    pub value: String,
}
