//! JSON Lines parser

use super::types::FormatConfig;
use super::{FileTypeParser, RecordIterator};
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::remote::{RemoteFile, StreamReader};
use crate::schema::{JsonSchema, SchemaInferrer};
use crate::types::{FileReadMode, JsonObject};
use async_trait::async_trait;
use serde_json::Value;

/// Records examined per file during schema inference
const MAX_INFERENCE_RECORDS: usize = 1000;

/// Parser for JSON Lines files (one JSON object per line)
#[derive(Debug, Clone, Default)]
pub struct JsonlParser;

impl JsonlParser {
    fn check_format(&self, config: &StreamConfig) -> Result<()> {
        match &config.format {
            FormatConfig::Jsonl(_) => Ok(()),
            other => Err(Error::config(format!(
                "stream '{}' is declared {} but was given to the jsonl parser",
                config.name,
                other.label()
            ))),
        }
    }
}

/// Parse one line; blank lines are handled by the caller
fn parse_line(uri: &str, line_number: usize, line: &str) -> Result<JsonObject> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| Error::record_parse(uri, format!("line {line_number}: {e}")))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::record_parse(
            uri,
            format!("line {line_number}: expected an object, got {other}"),
        )),
    }
}

#[async_trait]
impl FileTypeParser for JsonlParser {
    // Field sets routinely differ between files in the same stream
    fn max_n_files_for_schema_inference(&self) -> usize {
        10
    }

    fn max_n_files_for_parsability(&self) -> usize {
        1
    }

    async fn check_config(&self, config: &StreamConfig) -> (bool, Option<String>) {
        match self.check_format(config) {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        }
    }

    async fn infer_schema(
        &self,
        config: &StreamConfig,
        file: &RemoteFile,
        reader: &dyn StreamReader,
    ) -> Result<JsonSchema> {
        self.check_format(config)?;
        let contents = reader.open_file(file, FileReadMode::Text).await?;

        let mut records = Vec::new();
        for (i, line) in contents.text()?.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            if records.len() >= MAX_INFERENCE_RECORDS {
                break;
            }
            let record = parse_line(&file.uri, i + 1, line)
                .map_err(|e| Error::schema_inference(&file.uri, e.to_string()))?;
            records.push(Value::Object(record));
        }

        Ok(SchemaInferrer::new().infer_from_records(&records))
    }

    async fn parse_records(
        &self,
        config: &StreamConfig,
        file: &RemoteFile,
        reader: &dyn StreamReader,
    ) -> Result<RecordIterator> {
        self.check_format(config)?;
        let contents = reader.open_file(file, FileReadMode::Text).await?;
        let uri = file.uri.clone();
        let lines: Vec<String> = contents.text()?.lines().map(ToString::to_string).collect();

        let iter = lines
            .into_iter()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(move |(i, line)| parse_line(&uri, i + 1, &line));
        Ok(Box::new(iter))
    }
}
