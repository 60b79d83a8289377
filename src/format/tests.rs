//! Tests for the file format parsers

use super::*;
use crate::config::StreamConfig;
use crate::remote::{InMemoryStreamReader, RemoteFile, StreamReader};
use crate::schema::{JsonType, JsonTypeOrArray};
use crate::types::JsonObject;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

fn ts() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 5, 3, 54, 7).unwrap()
}

fn stream(name: &str, format: FormatConfig) -> StreamConfig {
    StreamConfig::new(name, vec!["**".to_string()], format)
}

async fn collect_records(
    parser: &dyn FileTypeParser,
    config: &StreamConfig,
    file: &RemoteFile,
    reader: &dyn StreamReader,
) -> Vec<JsonObject> {
    parser
        .parse_records(config, file, reader)
        .await
        .unwrap()
        .collect::<crate::error::Result<Vec<_>>>()
        .unwrap()
}

// ============================================================================
// CSV
// ============================================================================

#[tokio::test]
async fn test_csv_parse_with_header() {
    let reader =
        InMemoryStreamReader::new().with_file("a.csv", "id,name\n1,alice\n2,bob\n", ts());
    let file = RemoteFile::new("a.csv", ts());
    let config = stream("s", FormatConfig::Csv(CsvFormat::default()));

    let records = collect_records(&CsvParser, &config, &file, &reader).await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], json!(1));
    assert_eq!(records[0]["name"], json!("alice"));
    assert_eq!(records[1]["id"], json!(2));
}

#[tokio::test]
async fn test_csv_quoted_fields_and_escapes() {
    let reader = InMemoryStreamReader::new().with_file(
        "q.csv",
        "id,note\n1,\"hello, world\"\n2,\"say \"\"hi\"\"\"\n",
        ts(),
    );
    let file = RemoteFile::new("q.csv", ts());
    let config = stream("s", FormatConfig::Csv(CsvFormat::default()));

    let records = collect_records(&CsvParser, &config, &file, &reader).await;
    assert_eq!(records[0]["note"], json!("hello, world"));
    assert_eq!(records[1]["note"], json!("say \"hi\""));
}

#[tokio::test]
async fn test_csv_null_true_false_values() {
    let reader = InMemoryStreamReader::new().with_file(
        "v.csv",
        "a,b,c\nnull,true,x\n,f,1.5\n",
        ts(),
    );
    let file = RemoteFile::new("v.csv", ts());
    let config = stream("s", FormatConfig::Csv(CsvFormat::default()));

    let records = collect_records(&CsvParser, &config, &file, &reader).await;
    assert_eq!(records[0]["a"], Value::Null);
    assert_eq!(records[0]["b"], json!(true));
    assert_eq!(records[1]["a"], Value::Null);
    assert_eq!(records[1]["b"], json!(false));
    assert_eq!(records[1]["c"], json!(1.5));
}

#[tokio::test]
async fn test_csv_short_row_fills_null_and_wide_row_overflows() {
    let reader =
        InMemoryStreamReader::new().with_file("w.csv", "a\nx\ny,z\n", ts());
    let file = RemoteFile::new("w.csv", ts());
    let config = stream("s", FormatConfig::Csv(CsvFormat::default()));

    let records = collect_records(&CsvParser, &config, &file, &reader).await;
    assert_eq!(records[0]["a"], json!("x"));
    // extra trailing field surfaces under a generated name so the
    // validation policy can reject the record
    assert_eq!(records[1]["a"], json!("y"));
    assert_eq!(records[1]["f1"], json!("z"));
}

#[tokio::test]
async fn test_csv_autogenerated_and_user_provided_headers() {
    let reader = InMemoryStreamReader::new().with_file("h.csv", "1,x\n2,y\n", ts());
    let file = RemoteFile::new("h.csv", ts());

    let auto = stream(
        "s",
        FormatConfig::Csv(CsvFormat {
            header_definition: CsvHeaderDefinition::Autogenerated,
            ..CsvFormat::default()
        }),
    );
    let records = collect_records(&CsvParser, &auto, &file, &reader).await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["f0"], json!(1));
    assert_eq!(records[0]["f1"], json!("x"));

    let named = stream(
        "s",
        FormatConfig::Csv(CsvFormat {
            header_definition: CsvHeaderDefinition::UserProvided {
                column_names: vec!["id".to_string(), "tag".to_string()],
            },
            ..CsvFormat::default()
        }),
    );
    let records = collect_records(&CsvParser, &named, &file, &reader).await;
    assert_eq!(records[1]["id"], json!(2));
    assert_eq!(records[1]["tag"], json!("y"));
}

#[tokio::test]
async fn test_csv_skip_rows() {
    let reader = InMemoryStreamReader::new().with_file(
        "skip.csv",
        "# comment\nid,name\nunits,text\n1,alice\n",
        ts(),
    );
    let file = RemoteFile::new("skip.csv", ts());
    let config = stream(
        "s",
        FormatConfig::Csv(CsvFormat {
            skip_rows_before_header: 1,
            skip_rows_after_header: 1,
            ..CsvFormat::default()
        }),
    );

    let records = collect_records(&CsvParser, &config, &file, &reader).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], json!(1));
}

#[tokio::test]
async fn test_csv_infer_schema_types_columns() {
    let reader = InMemoryStreamReader::new().with_file(
        "t.csv",
        "id,name,score\n1,alice,1.5\n2,bob,2\n",
        ts(),
    );
    let file = RemoteFile::new("t.csv", ts());
    let config = stream("s", FormatConfig::Csv(CsvFormat::default()));

    let schema = CsvParser
        .infer_schema(&config, &file, &reader)
        .await
        .unwrap();
    assert_eq!(
        schema.get_property("id").unwrap().json_type,
        JsonTypeOrArray::Single(JsonType::Integer)
    );
    assert_eq!(
        schema.get_property("name").unwrap().json_type,
        JsonTypeOrArray::Single(JsonType::String)
    );
    // integer and float rows widen to number
    assert_eq!(
        schema.get_property("score").unwrap().json_type,
        JsonTypeOrArray::Single(JsonType::Number)
    );
}

#[tokio::test]
async fn test_csv_empty_file_fails_inference() {
    let reader = InMemoryStreamReader::new().with_file("e.csv", "", ts());
    let file = RemoteFile::new("e.csv", ts());
    let config = stream("s", FormatConfig::Csv(CsvFormat::default()));

    let err = CsvParser
        .infer_schema(&config, &file, &reader)
        .await
        .unwrap_err();
    assert!(matches!(err, crate::error::Error::SchemaInference { .. }));
}

#[tokio::test]
async fn test_csv_check_config_rejects_equal_delimiter_and_quote() {
    let config = stream(
        "s",
        FormatConfig::Csv(CsvFormat {
            delimiter: '"',
            ..CsvFormat::default()
        }),
    );
    let (ok, error) = CsvParser.check_config(&config).await;
    assert!(!ok);
    assert!(error.unwrap().contains("delimiter"));
}

// ============================================================================
// JSONL
// ============================================================================

#[tokio::test]
async fn test_jsonl_parse_skips_blank_lines() {
    let reader = InMemoryStreamReader::new().with_file(
        "a.jsonl",
        "{\"id\": 1}\n\n{\"id\": 2, \"name\": \"x\"}\n",
        ts(),
    );
    let file = RemoteFile::new("a.jsonl", ts());
    let config = stream("s", FormatConfig::Jsonl(JsonlFormat::default()));

    let records = collect_records(&JsonlParser, &config, &file, &reader).await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["name"], json!("x"));
}

#[tokio::test]
async fn test_jsonl_parse_error_carries_line_number() {
    let reader = InMemoryStreamReader::new().with_file(
        "bad.jsonl",
        "{\"id\": 1}\nnot json\n",
        ts(),
    );
    let file = RemoteFile::new("bad.jsonl", ts());
    let config = stream("s", FormatConfig::Jsonl(JsonlFormat::default()));

    let mut iter = JsonlParser
        .parse_records(&config, &file, &reader)
        .await
        .unwrap();
    assert!(iter.next().unwrap().is_ok());
    let err = iter.next().unwrap().unwrap_err();
    assert!(err.to_string().contains("bad.jsonl"));
    assert!(err.to_string().contains("line 2"));
}

#[tokio::test]
async fn test_jsonl_non_object_line_is_an_error() {
    let reader = InMemoryStreamReader::new().with_file("arr.jsonl", "[1,2,3]\n", ts());
    let file = RemoteFile::new("arr.jsonl", ts());
    let config = stream("s", FormatConfig::Jsonl(JsonlFormat::default()));

    let mut iter = JsonlParser
        .parse_records(&config, &file, &reader)
        .await
        .unwrap();
    assert!(iter.next().unwrap().is_err());
}

#[tokio::test]
async fn test_jsonl_infer_schema_merges_lines() {
    let reader = InMemoryStreamReader::new().with_file(
        "m.jsonl",
        "{\"id\": 1}\n{\"id\": \"two\"}\n",
        ts(),
    );
    let file = RemoteFile::new("m.jsonl", ts());
    let config = stream("s", FormatConfig::Jsonl(JsonlFormat::default()));

    let schema = JsonlParser
        .infer_schema(&config, &file, &reader)
        .await
        .unwrap();
    let id = schema.get_property("id").unwrap();
    assert!(id.json_type.admits(JsonType::Integer));
    assert!(id.json_type.admits(JsonType::String));
}

// ============================================================================
// Parquet
// ============================================================================

fn parquet_fixture() -> bytes::Bytes {
    use ::parquet::arrow::ArrowWriter;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
    ]));
    let batch = arrow::record_batch::RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(vec![1, 2])),
            Arc::new(StringArray::from(vec![Some("alice"), None])),
        ],
    )
    .unwrap();

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    bytes::Bytes::from(buf)
}

#[tokio::test]
async fn test_parquet_schema_from_footer() {
    let reader = InMemoryStreamReader::new().with_file("d.parquet", parquet_fixture(), ts());
    let file = RemoteFile::new("d.parquet", ts());
    let config = stream("s", FormatConfig::Parquet(ParquetFormat::default()));

    let schema = ParquetParser
        .infer_schema(&config, &file, &reader)
        .await
        .unwrap();
    assert_eq!(
        schema.get_property("id").unwrap().json_type,
        JsonTypeOrArray::Single(JsonType::Integer)
    );
    assert!(schema.get_property("name").unwrap().is_nullable());
}

#[tokio::test]
async fn test_parquet_parse_records() {
    let reader = InMemoryStreamReader::new().with_file("d.parquet", parquet_fixture(), ts());
    let file = RemoteFile::new("d.parquet", ts());
    let config = stream("s", FormatConfig::Parquet(ParquetFormat::default()));

    let records = collect_records(&ParquetParser, &config, &file, &reader).await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], json!(1));
    assert_eq!(records[0]["name"], json!("alice"));
    assert_eq!(records[1]["name"], Value::Null);
}

#[tokio::test]
async fn test_parquet_garbage_fails_inference() {
    let reader = InMemoryStreamReader::new().with_file("g.parquet", "not parquet", ts());
    let file = RemoteFile::new("g.parquet", ts());
    let config = stream("s", FormatConfig::Parquet(ParquetFormat::default()));

    assert!(ParquetParser
        .infer_schema(&config, &file, &reader)
        .await
        .is_err());
}

// ============================================================================
// Unstructured
// ============================================================================

fn unstructured_stream(format: UnstructuredFormat) -> StreamConfig {
    stream("docs", FormatConfig::Unstructured(format))
}

#[tokio::test]
async fn test_unstructured_schema_is_static() {
    let reader = InMemoryStreamReader::new();
    let file = RemoteFile::new("doc.md", ts());
    let config = unstructured_stream(UnstructuredFormat::default());

    let schema = UnstructuredParser::default()
        .infer_schema(&config, &file, &reader)
        .await
        .unwrap();
    assert!(schema.get_property("content").is_some());
    assert!(schema.get_property("document_key").is_some());
    assert!(schema
        .get_property(crate::types::SOURCE_FILE_PARSE_ERROR_FIELD)
        .is_some());
}

#[tokio::test]
async fn test_unstructured_markdown_parsed_locally() {
    let reader = InMemoryStreamReader::new().with_file("doc.md", "# heading\n\nbody", ts());
    let file = RemoteFile::new("doc.md", ts());
    let config = unstructured_stream(UnstructuredFormat::default());

    let records =
        collect_records(&UnstructuredParser::default(), &config, &file, &reader).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["content"], json!("# heading\n\nbody"));
    assert_eq!(records[0]["document_key"], json!("doc.md"));
    assert_eq!(
        records[0][crate::types::SOURCE_FILE_PARSE_ERROR_FIELD],
        Value::Null
    );
}

#[tokio::test]
async fn test_unstructured_unsupported_type_skipped_as_error_record() {
    let reader = InMemoryStreamReader::new().with_file("data.xyz", "??", ts());
    let file = RemoteFile::new("data.xyz", ts());
    let config = unstructured_stream(UnstructuredFormat {
        skip_unprocessable_files: true,
        ..UnstructuredFormat::default()
    });

    let records =
        collect_records(&UnstructuredParser::default(), &config, &file, &reader).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["content"], Value::Null);
    assert_eq!(records[0]["document_key"], json!("data.xyz"));
    let error = records[0][crate::types::SOURCE_FILE_PARSE_ERROR_FIELD]
        .as_str()
        .unwrap();
    assert!(!error.is_empty());
}

#[tokio::test]
async fn test_unstructured_unsupported_type_fails_without_skip() {
    let reader = InMemoryStreamReader::new().with_file("data.xyz", "??", ts());
    let file = RemoteFile::new("data.xyz", ts());
    let config = unstructured_stream(UnstructuredFormat {
        skip_unprocessable_files: false,
        ..UnstructuredFormat::default()
    });

    let err = UnstructuredParser::default()
        .parse_records(&config, &file, &reader)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, crate::error::Error::RecordParse { .. }));
}

#[tokio::test]
async fn test_unstructured_pdf_requires_api_in_local_mode() {
    let reader = InMemoryStreamReader::new().with_file("doc.pdf", "%PDF-", ts());
    let file = RemoteFile::new("doc.pdf", ts());
    let config = unstructured_stream(UnstructuredFormat {
        skip_unprocessable_files: false,
        ..UnstructuredFormat::default()
    });

    let err = UnstructuredParser::default()
        .parse_records(&config, &file, &reader)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("local mode"));
}

#[tokio::test]
async fn test_unstructured_check_config_rejects_hi_res_locally() {
    let config = unstructured_stream(UnstructuredFormat {
        strategy: "hi_res".to_string(),
        ..UnstructuredFormat::default()
    });
    let (ok, error) = UnstructuredParser::default().check_config(&config).await;
    assert!(!ok);
    assert!(error.unwrap().contains("Hi-res"));
}

mod remote_api {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_stream(api_url: &str, skip: bool) -> StreamConfig {
        unstructured_stream(UnstructuredFormat {
            skip_unprocessable_files: skip,
            strategy: "auto".to_string(),
            processing: ProcessingConfig::Api {
                api_key: "test-key".to_string(),
                api_url: api_url.to_string(),
                parameters: vec![ApiParameter {
                    name: "include_page_breaks".to_string(),
                    value: "true".to_string(),
                }],
            },
        })
    }

    #[tokio::test]
    async fn test_pdf_partitioned_remotely() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/general/v0/general"))
            .and(header("unstructured-api-key", "test-key"))
            .and(query_param("strategy", "auto"))
            .and(query_param("include_page_breaks", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"type": "Title", "text": "heading"},
                {"type": "Text", "text": "This is the text"},
                {"type": "ListItem", "text": "item one"},
                {"type": "Formula", "text": "x = y"},
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let reader = InMemoryStreamReader::new().with_file("doc.pdf", "%PDF-", ts());
        let file = RemoteFile::new("doc.pdf", ts());
        let config = api_stream(&server.uri(), false);

        let records =
            collect_records(&UnstructuredParser::default(), &config, &file, &reader).await;
        assert_eq!(
            records[0]["content"],
            json!("# heading\n\nThis is the text\n\n- item one\n\n```\nx = y\n```")
        );
    }

    #[tokio::test]
    async fn test_title_depth_renders_nested_headings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/general/v0/general"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"type": "Title", "text": "first", "metadata": {"category_depth": 1}},
                {"type": "Title", "text": "second", "metadata": {"category_depth": 2}},
            ])))
            .mount(&server)
            .await;

        let reader = InMemoryStreamReader::new().with_file("doc.pdf", "%PDF-", ts());
        let file = RemoteFile::new("doc.pdf", ts());
        let config = api_stream(&server.uri(), false);

        let records =
            collect_records(&UnstructuredParser::default(), &config, &file, &reader).await;
        assert_eq!(records[0]["content"], json!("# first\n\n## second"));
    }

    #[tokio::test]
    async fn test_markdown_never_hits_the_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let reader = InMemoryStreamReader::new().with_file("doc.md", "# local", ts());
        let file = RemoteFile::new("doc.md", ts());
        let config = api_stream(&server.uri(), false);

        let records =
            collect_records(&UnstructuredParser::default(), &config, &file, &reader).await;
        assert_eq!(records[0]["content"], json!("# local"));
    }

    #[tokio::test]
    async fn test_422_becomes_parse_error_record_when_skipping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/general/v0/general"))
            .respond_with(
                ResponseTemplate::new(422).set_body_string("document is not parseable"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reader = InMemoryStreamReader::new().with_file("doc.pdf", "%PDF-", ts());
        let file = RemoteFile::new("doc.pdf", ts());
        let config = api_stream(&server.uri(), true);

        let records =
            collect_records(&UnstructuredParser::default(), &config, &file, &reader).await;
        assert_eq!(records[0]["content"], Value::Null);
        let error = records[0][crate::types::SOURCE_FILE_PARSE_ERROR_FIELD]
            .as_str()
            .unwrap();
        assert!(error.contains("document is not parseable"));
    }

    #[tokio::test]
    async fn test_422_fails_sync_without_skip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/general/v0/general"))
            .respond_with(ResponseTemplate::new(422).set_body_string("nope"))
            .mount(&server)
            .await;

        let reader = InMemoryStreamReader::new().with_file("doc.pdf", "%PDF-", ts());
        let file = RemoteFile::new("doc.pdf", ts());
        let config = api_stream(&server.uri(), false);

        let err = UnstructuredParser::default()
            .parse_records(&config, &file, &reader)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, crate::error::Error::RecordParse { .. }));
    }

    #[tokio::test]
    async fn test_5xx_retries_then_recovers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/general/v0/general"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/general/v0/general"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"type": "Text", "text": "recovered"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reader = InMemoryStreamReader::new().with_file("doc.pdf", "%PDF-", ts());
        let file = RemoteFile::new("doc.pdf", ts());
        let config = api_stream(&server.uri(), false);

        let records =
            collect_records(&UnstructuredParser::default(), &config, &file, &reader).await;
        assert_eq!(records[0]["content"], json!("recovered"));
    }

    #[tokio::test]
    async fn test_400_is_not_retried_and_not_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/general/v0/general"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let reader = InMemoryStreamReader::new().with_file("doc.pdf", "%PDF-", ts());
        let file = RemoteFile::new("doc.pdf", ts());
        // 4xx other than 422 is a config-style failure, not an
        // unprocessable document: it fails even when skipping is on
        let config = api_stream(&server.uri(), true);

        let err = UnstructuredParser::default()
            .parse_records(&config, &file, &reader)
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            crate::error::Error::HttpStatus { status: 400, .. }
        ));
    }

    #[tokio::test]
    async fn test_check_config_posts_canary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/general/v0/general"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"type": "Title", "text": "connection check"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let config = api_stream(&server.uri(), false);
        let (ok, error) = UnstructuredParser::default().check_config(&config).await;
        assert!(ok, "expected ok, got {error:?}");
    }

    #[tokio::test]
    async fn test_check_config_reports_unexpected_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/general/v0/general"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"unexpected": "response"})),
            )
            .mount(&server)
            .await;

        let config = api_stream(&server.uri(), false);
        let (ok, error) = UnstructuredParser::default().check_config(&config).await;
        assert!(!ok);
        assert!(error.unwrap().contains("API error"));
    }
}
