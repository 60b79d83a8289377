//! Parquet parser
//!
//! Schema inference is a structural parse of the file footer only; no
//! row data is read until `parse_records`. Row groups are decoded to
//! Arrow batches and converted row by row to JSON records.

use super::types::{FormatConfig, ParquetFormat};
use super::{FileTypeParser, RecordIterator};
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::remote::{RemoteFile, StreamReader};
use crate::schema::{JsonSchema, JsonType, SchemaProperty};
use crate::types::{FileReadMode, JsonObject};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Field};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value;
use std::collections::BTreeMap;

/// Parser for Parquet files
#[derive(Debug, Clone, Default)]
pub struct ParquetParser;

impl ParquetParser {
    fn format<'a>(&self, config: &'a StreamConfig) -> Result<&'a ParquetFormat> {
        match &config.format {
            FormatConfig::Parquet(format) => Ok(format),
            other => Err(Error::config(format!(
                "stream '{}' is declared {} but was given to the parquet parser",
                config.name,
                other.label()
            ))),
        }
    }
}

#[async_trait]
impl FileTypeParser for ParquetParser {
    // Columnar structure is embedded in every file; one sample is enough
    fn max_n_files_for_schema_inference(&self) -> usize {
        1
    }

    // A parsability probe costs a full footer read; not worth it at
    // connection-check time
    fn max_n_files_for_parsability(&self) -> usize {
        0
    }

    async fn check_config(&self, config: &StreamConfig) -> (bool, Option<String>) {
        match self.format(config) {
            Ok(_) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        }
    }

    async fn infer_schema(
        &self,
        config: &StreamConfig,
        file: &RemoteFile,
        reader: &dyn StreamReader,
    ) -> Result<JsonSchema> {
        let format = self.format(config)?;
        let contents = reader.open_file(file, FileReadMode::Binary).await?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(contents.into_bytes())
            .map_err(|e| Error::schema_inference(&file.uri, e.to_string()))?;

        let mut schema = JsonSchema::new();
        for field in builder.schema().fields() {
            schema.add_property(field.name(), field_property(field, format));
        }
        Ok(schema)
    }

    async fn parse_records(
        &self,
        config: &StreamConfig,
        file: &RemoteFile,
        reader: &dyn StreamReader,
    ) -> Result<RecordIterator> {
        let format = self.format(config)?.clone();
        let contents = reader.open_file(file, FileReadMode::Binary).await?;
        let uri = file.uri.clone();

        let batch_reader = ParquetRecordBatchReaderBuilder::try_new(contents.into_bytes())
            .and_then(ParquetRecordBatchReaderBuilder::build)
            .map_err(|e| Error::record_parse(&uri, e.to_string()))?;

        let mut records: Vec<Result<JsonObject>> = Vec::new();
        for batch in batch_reader {
            match batch {
                Ok(batch) => {
                    for row in 0..batch.num_rows() {
                        records.push(batch_row_to_record(&batch, row, &format, &uri));
                    }
                }
                Err(e) => {
                    records.push(Err(Error::record_parse(&uri, e.to_string())));
                    break;
                }
            }
        }

        Ok(Box::new(records.into_iter()))
    }
}

/// Map an Arrow field to a schema property
fn field_property(field: &Field, format: &ParquetFormat) -> SchemaProperty {
    let prop = match field.data_type() {
        DataType::Boolean => SchemaProperty::new(JsonType::Boolean),
        t if is_integer(t) => SchemaProperty::new(JsonType::Integer),
        DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            SchemaProperty::new(JsonType::Number)
        }
        DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => {
            if format.decimal_as_float {
                SchemaProperty::new(JsonType::Number)
            } else {
                SchemaProperty::new(JsonType::String)
            }
        }
        DataType::Date32 | DataType::Date64 => {
            SchemaProperty::new(JsonType::String).with_format("date")
        }
        DataType::Timestamp(_, _) => {
            SchemaProperty::new(JsonType::String).with_format("date-time")
        }
        DataType::List(item) | DataType::LargeList(item) => {
            SchemaProperty::array(field_property(item, format))
        }
        DataType::Struct(fields) => {
            let mut props = BTreeMap::new();
            for f in fields {
                props.insert(f.name().clone(), field_property(f, format));
            }
            SchemaProperty::object(props)
        }
        _ => SchemaProperty::new(JsonType::String),
    };

    if field.is_nullable() {
        let mut prop = prop;
        prop.make_nullable();
        prop
    } else {
        prop
    }
}

fn is_integer(t: &DataType) -> bool {
    matches!(
        t,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Convert one batch row to a JSON record
fn batch_row_to_record(
    batch: &RecordBatch,
    row: usize,
    format: &ParquetFormat,
    uri: &str,
) -> Result<JsonObject> {
    let mut record = JsonObject::new();
    for (i, field) in batch.schema().fields().iter().enumerate() {
        let value = array_value_to_json(batch.column(i).as_ref(), row, format, uri)?;
        record.insert(field.name().clone(), value);
    }
    Ok(record)
}

/// Convert a single array element to JSON
fn array_value_to_json(
    array: &dyn Array,
    row: usize,
    format: &ParquetFormat,
    uri: &str,
) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let value = match array.data_type() {
        DataType::Boolean => Value::Bool(array.as_boolean().value(row)),

        DataType::Int8 => array.as_primitive::<arrow::datatypes::Int8Type>().value(row).into(),
        DataType::Int16 => array.as_primitive::<arrow::datatypes::Int16Type>().value(row).into(),
        DataType::Int32 => array.as_primitive::<arrow::datatypes::Int32Type>().value(row).into(),
        DataType::Int64 => array.as_primitive::<arrow::datatypes::Int64Type>().value(row).into(),
        DataType::UInt8 => array.as_primitive::<arrow::datatypes::UInt8Type>().value(row).into(),
        DataType::UInt16 => array.as_primitive::<arrow::datatypes::UInt16Type>().value(row).into(),
        DataType::UInt32 => array.as_primitive::<arrow::datatypes::UInt32Type>().value(row).into(),
        DataType::UInt64 => {
            let v = array.as_primitive::<arrow::datatypes::UInt64Type>().value(row);
            match i64::try_from(v) {
                Ok(signed) => signed.into(),
                Err(_) => Value::String(v.to_string()),
            }
        }

        DataType::Float32 => {
            let v = f64::from(array.as_primitive::<arrow::datatypes::Float32Type>().value(row));
            serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
        }
        DataType::Float64 => {
            let v = array.as_primitive::<arrow::datatypes::Float64Type>().value(row);
            serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
        }

        DataType::Utf8 => Value::String(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(array.as_string::<i64>().value(row).to_string()),

        DataType::List(_) => {
            let list = array.as_list::<i32>();
            let values = list.value(row);
            let mut items = Vec::with_capacity(values.len());
            for i in 0..values.len() {
                items.push(array_value_to_json(values.as_ref(), i, format, uri)?);
            }
            Value::Array(items)
        }

        DataType::Struct(_) => {
            let strukt = array.as_struct();
            let mut obj = JsonObject::new();
            for (i, field) in strukt.fields().iter().enumerate() {
                let val = array_value_to_json(strukt.column(i).as_ref(), row, format, uri)?;
                obj.insert(field.name().clone(), val);
            }
            Value::Object(obj)
        }

        // Decimals, dates, timestamps, binary: display form
        _ => {
            let rendered = arrow::util::display::array_value_to_string(array, row)
                .map_err(|e| Error::record_parse(uri, e.to_string()))?;
            if format.decimal_as_float
                && matches!(
                    array.data_type(),
                    DataType::Decimal128(_, _) | DataType::Decimal256(_, _)
                )
            {
                rendered
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            } else {
                Value::String(rendered)
            }
        }
    };

    Ok(value)
}
