//! Delimited-text parser
//!
//! Hand-rolled, quote-aware line splitting; no intermediate allocation
//! beyond the row being parsed. Values are typed per the stream's
//! null/true/false sets, falling back integer -> number -> string.

use super::types::{CsvFormat, CsvHeaderDefinition, FormatConfig};
use super::{FileTypeParser, RecordIterator};
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::remote::{RemoteFile, StreamReader};
use crate::schema::{JsonSchema, SchemaInferrer};
use crate::types::{FileReadMode, JsonObject};
use async_trait::async_trait;
use serde_json::Value;

/// Rows examined per file during schema inference
const MAX_INFERENCE_ROWS: usize = 1000;

/// Parser for delimited-text files
#[derive(Debug, Clone, Default)]
pub struct CsvParser;

impl CsvParser {
    fn format<'a>(&self, config: &'a StreamConfig) -> Result<&'a CsvFormat> {
        match &config.format {
            FormatConfig::Csv(format) => Ok(format),
            other => Err(Error::config(format!(
                "stream '{}' is declared {} but was given to the csv parser",
                config.name,
                other.label()
            ))),
        }
    }

    /// Split a file into header names and data lines per the config
    fn prepare(
        &self,
        format: &CsvFormat,
        uri: &str,
        text: &str,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let mut lines = text
            .lines()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .into_iter()
            .skip(format.skip_rows_before_header);

        let headers = match &format.header_definition {
            CsvHeaderDefinition::FromCsv => {
                let header_line = lines
                    .next()
                    .ok_or_else(|| Error::record_parse(uri, "file has no header row"))?;
                split_row(&header_line, format)
            }
            CsvHeaderDefinition::Autogenerated => {
                let lines: Vec<String> = lines.collect();
                let width = lines
                    .first()
                    .map_or(0, |first| split_row(first, format).len());
                let headers = (0..width).map(|i| format!("f{i}")).collect();
                return Ok((headers, lines));
            }
            CsvHeaderDefinition::UserProvided { column_names } => {
                return Ok((column_names.clone(), lines.collect()))
            }
        };

        if headers.iter().any(String::is_empty) {
            return Err(Error::record_parse(uri, "header row has an empty column name"));
        }

        Ok((headers, lines.skip(format.skip_rows_after_header).collect()))
    }
}

#[async_trait]
impl FileTypeParser for CsvParser {
    // Column sets routinely differ between files in the same stream
    fn max_n_files_for_schema_inference(&self) -> usize {
        10
    }

    fn max_n_files_for_parsability(&self) -> usize {
        1
    }

    async fn check_config(&self, config: &StreamConfig) -> (bool, Option<String>) {
        let format = match self.format(config) {
            Ok(f) => f,
            Err(e) => return (false, Some(e.to_string())),
        };
        if format.delimiter == format.quote_char {
            return (
                false,
                Some("delimiter and quote_char must differ".to_string()),
            );
        }
        if let CsvHeaderDefinition::UserProvided { column_names } = &format.header_definition {
            if column_names.is_empty() {
                return (false, Some("column_names must not be empty".to_string()));
            }
        }
        (true, None)
    }

    async fn infer_schema(
        &self,
        config: &StreamConfig,
        file: &RemoteFile,
        reader: &dyn StreamReader,
    ) -> Result<JsonSchema> {
        let format = self.format(config)?;
        let contents = reader.open_file(file, FileReadMode::Text).await?;
        let (headers, lines) = self
            .prepare(format, &file.uri, contents.text()?)
            .map_err(|e| Error::schema_inference(&file.uri, e.to_string()))?;

        let records: Vec<Value> = lines
            .iter()
            .filter(|line| !line.trim().is_empty())
            .take(MAX_INFERENCE_ROWS)
            .map(|line| Value::Object(parse_row(line, &headers, format)))
            .collect();

        Ok(SchemaInferrer::new().infer_from_records(&records))
    }

    async fn parse_records(
        &self,
        config: &StreamConfig,
        file: &RemoteFile,
        reader: &dyn StreamReader,
    ) -> Result<RecordIterator> {
        let format = self.format(config)?.clone();
        let contents = reader.open_file(file, FileReadMode::Text).await?;
        let (headers, lines) = self.prepare(&format, &file.uri, contents.text()?)?;

        let iter = lines
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .map(move |line| Ok(parse_row(&line, &headers, &format)));
        Ok(Box::new(iter))
    }
}

/// Parse one data row into a record
///
/// Rows narrower than the header fill missing columns with null; extra
/// trailing fields land under generated `f{i}` names so the validation
/// policy can see them.
fn parse_row(line: &str, headers: &[String], format: &CsvFormat) -> JsonObject {
    let fields = split_row(line, format);
    let mut record = JsonObject::new();

    for (i, header) in headers.iter().enumerate() {
        let value = fields
            .get(i)
            .map_or(Value::Null, |raw| type_value(raw, format));
        record.insert(header.clone(), value);
    }
    for (i, raw) in fields.iter().enumerate().skip(headers.len()) {
        record.insert(format!("f{i}"), type_value(raw, format));
    }

    record
}

/// Split a line into fields, honoring the quote character
///
/// A doubled quote inside a quoted field is an escaped quote.
fn split_row(line: &str, format: &CsvFormat) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == format.quote_char {
            if in_quotes {
                if chars.peek() == Some(&format.quote_char) {
                    current.push(format.quote_char);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                in_quotes = true;
            }
        } else if c == format.delimiter && !in_quotes {
            fields.push(current.trim().to_string());
            current = String::new();
        } else {
            current.push(c);
        }
    }

    fields.push(current.trim().to_string());
    fields
}

/// Convert a raw field into a typed JSON value
fn type_value(raw: &str, format: &CsvFormat) -> Value {
    if format.null_values.iter().any(|n| n == raw) {
        return Value::Null;
    }
    if format.true_values.iter().any(|t| t == raw) {
        return Value::Bool(true);
    }
    if format.false_values.iter().any(|f| f == raw) {
        return Value::Bool(false);
    }

    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(n) = raw.parse::<f64>() {
        if let Some(num) = serde_json::Number::from_f64(n) {
            return Value::Number(num);
        }
    }

    Value::String(raw.to_string())
}
