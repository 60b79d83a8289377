//! Tests for schema discovery

use super::*;
use crate::config::StreamConfig;
use crate::format::{CsvFormat, FormatConfig, ParquetFormat};
use crate::remote::InMemoryStreamReader;
use crate::schema::JsonTypeOrArray;
use chrono::{TimeZone, Utc};

fn ts() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 5, 3, 54, 7).unwrap()
}

fn csv_stream(globs: &[&str]) -> StreamConfig {
    StreamConfig::new(
        "stream1",
        globs.iter().map(ToString::to_string).collect(),
        FormatConfig::Csv(CsvFormat::default()),
    )
}

#[tokio::test]
async fn test_discover_merges_schemas_across_files() {
    let reader = InMemoryStreamReader::new()
        .with_file("a.csv", "col1,col2\nval11,val12\n", ts())
        .with_file("b.csv", "col1\nval21\n", ts());
    let registry = ParserRegistry::new();
    let discoverer = SchemaDiscoverer::new(&reader, &registry, DiscoveryPolicy::default());

    let schema = discoverer
        .discover_schema(&csv_stream(&["*.csv"]))
        .await
        .unwrap();

    // col2 is absent from b.csv, so it comes out nullable
    assert!(schema.get_property("col2").unwrap().is_nullable());
    assert_eq!(
        schema.get_property("col1").unwrap().json_type,
        JsonTypeOrArray::Single(JsonType::String)
    );

    // metadata fields are always appended
    assert!(schema.get_property(SOURCE_FILE_URL_FIELD).is_some());
    assert_eq!(
        schema
            .get_property(SOURCE_FILE_LAST_MODIFIED_FIELD)
            .unwrap()
            .format
            .as_deref(),
        Some("date-time")
    );
}

#[tokio::test]
async fn test_discover_widens_type_conflicts() {
    let reader = InMemoryStreamReader::new()
        .with_file("a.csv", "id\n1\n", ts())
        .with_file("b.csv", "id\nnot-a-number\n", ts());
    let registry = ParserRegistry::new();
    let discoverer = SchemaDiscoverer::new(&reader, &registry, DiscoveryPolicy::default());

    let schema = discoverer
        .discover_schema(&csv_stream(&["*.csv"]))
        .await
        .unwrap();
    let id = schema.get_property("id").unwrap();
    assert!(id.json_type.admits(JsonType::Integer));
    assert!(id.json_type.admits(JsonType::String));
}

#[tokio::test]
async fn test_policy_caps_sampled_files() {
    let mut reader = InMemoryStreamReader::new();
    for i in 0..100 {
        reader = reader.with_file(format!("f{i:03}.csv"), "id\n1\n", ts());
    }
    let registry = ParserRegistry::new();

    let policy = DiscoveryPolicy::new().with_max_n_files_for_schema_inference(1);
    let discoverer = SchemaDiscoverer::new(&reader, &registry, policy);
    discoverer
        .discover_schema(&csv_stream(&["*.csv"]))
        .await
        .unwrap();

    // 100 files matched, 1 read
    assert_eq!(reader.open_count(), 1);
}

#[tokio::test]
async fn test_parser_advertised_limit_is_never_raised() {
    let fixture = {
        use arrow::array::Int64Array;
        use arrow::datatypes::{DataType, Field, Schema};
        use parquet::arrow::ArrowWriter;
        use std::sync::Arc;

        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]));
        let batch = arrow::record_batch::RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(Int64Array::from(vec![1]))],
        )
        .unwrap();
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        bytes::Bytes::from(buf)
    };

    let reader = InMemoryStreamReader::new()
        .with_file("a.parquet", fixture.clone(), ts())
        .with_file("b.parquet", fixture.clone(), ts())
        .with_file("c.parquet", fixture, ts());
    let registry = ParserRegistry::new();
    let discoverer = SchemaDiscoverer::new(&reader, &registry, DiscoveryPolicy::default());

    let config = StreamConfig::new(
        "pq",
        vec!["*.parquet".to_string()],
        FormatConfig::Parquet(ParquetFormat::default()),
    );
    discoverer.discover_schema(&config).await.unwrap();

    // parquet advertises 1 file for inference; the policy default of 10
    // must not override it upward
    assert_eq!(reader.open_count(), 1);
}

#[tokio::test]
async fn test_input_schema_bypasses_sampling() {
    let reader = InMemoryStreamReader::new().with_file("a.csv", "id\n1\n", ts());
    let registry = ParserRegistry::new();
    let discoverer = SchemaDiscoverer::new(&reader, &registry, DiscoveryPolicy::default());

    let mut input = JsonSchema::new();
    input.add_property("known", SchemaProperty::new(JsonType::String));
    let config = csv_stream(&["*.csv"]).with_input_schema(input);

    let schema = discoverer.discover_schema(&config).await.unwrap();
    assert!(schema.get_property("known").is_some());
    assert_eq!(reader.open_count(), 0);
}

#[tokio::test]
async fn test_schemaless_stream_reads_nothing() {
    let reader = InMemoryStreamReader::new().with_file("a.csv", "id\n1\n", ts());
    let registry = ParserRegistry::new();
    let discoverer = SchemaDiscoverer::new(&reader, &registry, DiscoveryPolicy::default());

    let mut config = csv_stream(&["*.csv"]);
    config.schemaless = true;

    let schema = discoverer.discover_schema(&config).await.unwrap();
    assert_eq!(
        schema.get_property("data").unwrap().json_type,
        JsonTypeOrArray::Single(JsonType::Object)
    );
    assert_eq!(reader.open_count(), 0);
}

#[tokio::test]
async fn test_no_matching_files_is_a_config_error() {
    let reader = InMemoryStreamReader::new();
    let registry = ParserRegistry::new();
    let discoverer = SchemaDiscoverer::new(&reader, &registry, DiscoveryPolicy::default());

    let err = discoverer
        .discover_schema(&csv_stream(&["*.csv"]))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("matched no files"));
}

#[tokio::test]
async fn test_enumeration_cap_aborts_discovery() {
    let mut reader = InMemoryStreamReader::new();
    for i in 0..20 {
        reader = reader.with_file(format!("f{i:02}.csv"), "id\n1\n", ts());
    }
    let registry = ParserRegistry::new();
    let policy = DiscoveryPolicy::new().with_max_files_to_enumerate(10);
    let discoverer = SchemaDiscoverer::new(&reader, &registry, policy);

    let err = discoverer
        .discover_schema(&csv_stream(&["*.csv"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::TooManyFiles {
            matched: 20,
            limit: 10
        }
    ));
    assert_eq!(reader.open_count(), 0);
}

#[tokio::test]
async fn test_unparsable_sample_aborts_when_skipping_is_off() {
    let reader = InMemoryStreamReader::new()
        .with_file("a.csv", "id\n1\n", ts())
        .with_file("b.csv", "", ts());
    let registry = ParserRegistry::new();
    let discoverer = SchemaDiscoverer::new(&reader, &registry, DiscoveryPolicy::default());

    let err = discoverer
        .discover_schema(&csv_stream(&["*.csv"]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SchemaInference { .. }));
}

#[tokio::test]
async fn test_malformed_glob_fails_before_listing() {
    let reader = InMemoryStreamReader::new();
    let registry = ParserRegistry::new();
    let discoverer = SchemaDiscoverer::new(&reader, &registry, DiscoveryPolicy::default());

    let err = discoverer
        .discover_schema(&csv_stream(&["data/[oops.csv"]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedGlob { .. }));
}
