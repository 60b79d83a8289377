//! Unstructured-document parser
//!
//! Markdown and plain text are handled in-process. Binary document
//! formats (PDF, DOCX, PPTX) are delegated to a document-partitioning
//! HTTP API when the stream is configured with `processing: api`; the
//! API's element list is rendered back to markdown.
//!
//! Every record has the same three fields: the rendered content, the
//! document key (file URI), and a parse-error field that is null unless
//! the file could not be processed and the stream allows skipping.

use super::types::{FormatConfig, ProcessingConfig, UnstructuredFormat};
use super::{FileTypeParser, RecordIterator};
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::remote::{RemoteFile, StreamReader};
use crate::schema::{JsonSchema, JsonType, SchemaProperty};
use crate::types::{
    FileReadMode, JsonObject, SOURCE_FILE_PARSE_ERROR_FIELD,
};
use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Path of the partition endpoint on the processing API
const PARTITION_ENDPOINT: &str = "/general/v0/general";

/// Document formats this parser understands
#[derive(Debug, Clone, PartialEq, Eq)]
enum DocumentType {
    Markdown,
    Text,
    Pdf,
    Docx,
    Pptx,
    Unsupported(String),
}

impl DocumentType {
    fn detect(file: &RemoteFile) -> Self {
        match file.extension().as_deref() {
            Some("md") => DocumentType::Markdown,
            Some("txt") => DocumentType::Text,
            Some("pdf") => DocumentType::Pdf,
            Some("docx") => DocumentType::Docx,
            Some("pptx") => DocumentType::Pptx,
            Some(ext) => DocumentType::Unsupported(ext.to_string()),
            None => DocumentType::Unsupported("unknown".to_string()),
        }
    }

    fn content_type(&self) -> &'static str {
        match self {
            DocumentType::Markdown => "text/markdown",
            DocumentType::Text => "text/plain",
            DocumentType::Pdf => "application/pdf",
            DocumentType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentType::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            DocumentType::Unsupported(_) => "application/octet-stream",
        }
    }

    fn is_plain(&self) -> bool {
        matches!(self, DocumentType::Markdown | DocumentType::Text)
    }
}

/// One element returned by the partitioning API
#[derive(Debug, Deserialize)]
struct DocumentElement {
    #[serde(rename = "type")]
    element_type: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    metadata: ElementMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct ElementMetadata {
    #[serde(default)]
    category_depth: Option<usize>,
}

/// Parser for unstructured documents
#[derive(Debug, Default)]
pub struct UnstructuredParser {
    // Built on first remote call, at most once per process; streams that
    // never use API processing never pay for it
    client: OnceCell<HttpClient>,
}

impl UnstructuredParser {
    fn format<'a>(&self, config: &'a StreamConfig) -> Result<&'a UnstructuredFormat> {
        match &config.format {
            FormatConfig::Unstructured(format) => Ok(format),
            other => Err(Error::config(format!(
                "stream '{}' is declared {} but was given to the unstructured parser",
                config.name,
                other.label()
            ))),
        }
    }

    fn client(&self) -> &HttpClient {
        self.client
            .get_or_init(|| HttpClient::with_config(HttpClientConfig::default()))
    }

    /// Produce a file's markdown content, or a parse error
    async fn extract_content(
        &self,
        format: &UnstructuredFormat,
        doc_type: &DocumentType,
        file: &RemoteFile,
        reader: &dyn StreamReader,
    ) -> Result<String> {
        if let DocumentType::Unsupported(ext) = doc_type {
            return Err(parse_error(
                &file.uri,
                format!(
                    "File type '{ext}' is not supported. Supported file types are md, txt, pdf, docx, pptx"
                ),
            ));
        }

        if doc_type.is_plain() {
            let contents = reader.open_file(file, FileReadMode::Text).await?;
            return contents.into_text();
        }

        match &format.processing {
            ProcessingConfig::Local => Err(parse_error(
                &file.uri,
                format!(
                    "File type '{}' requires API processing; local mode supports md and txt only",
                    doc_type.content_type()
                ),
            )),
            ProcessingConfig::Api {
                api_key,
                api_url,
                parameters,
            } => {
                let contents = reader.open_file(file, FileReadMode::Binary).await?;
                self.partition_remotely(
                    format,
                    doc_type,
                    file,
                    contents.into_bytes(),
                    api_key,
                    api_url,
                    parameters,
                )
                .await
            }
        }
    }

    /// Send a document to the partitioning API and render the elements
    #[allow(clippy::too_many_arguments)]
    async fn partition_remotely(
        &self,
        format: &UnstructuredFormat,
        doc_type: &DocumentType,
        file: &RemoteFile,
        bytes: Bytes,
        api_key: &str,
        api_url: &str,
        parameters: &[super::types::ApiParameter],
    ) -> Result<String> {
        let url = format!("{}{}", api_url.trim_end_matches('/'), PARTITION_ENDPOINT);
        let mut request = RequestConfig::new()
            .header("accept", "application/json")
            .header("unstructured-api-key", api_key)
            .query("strategy", &format.strategy)
            .bytes(bytes, doc_type.content_type());
        for param in parameters {
            request = request.query(&param.name, &param.value);
        }

        let response = match self.client().post(&url, request).await {
            Ok(response) => response,
            // The document itself is unprocessable; not a platform fault
            Err(Error::HttpStatus { status: 422, body }) => {
                return Err(parse_error(&file.uri, body));
            }
            Err(e) => return Err(e),
        };

        let elements: Vec<DocumentElement> = response.json().await.map_err(|e| {
            parse_error(&file.uri, format!("unexpected API response: {e}"))
        })?;
        Ok(render_markdown(&elements))
    }
}

#[async_trait]
impl FileTypeParser for UnstructuredParser {
    // Output schema is static; no sampling needed beyond one file
    fn max_n_files_for_schema_inference(&self) -> usize {
        1
    }

    fn max_n_files_for_parsability(&self) -> usize {
        0
    }

    async fn check_config(&self, config: &StreamConfig) -> (bool, Option<String>) {
        let format = match self.format(config) {
            Ok(f) => f,
            Err(e) => return (false, Some(e.to_string())),
        };

        match &format.processing {
            ProcessingConfig::Local => {
                if format.strategy == "hi_res" {
                    (
                        false,
                        Some("Hi-res strategy is not supported for local processing".to_string()),
                    )
                } else {
                    (true, None)
                }
            }
            ProcessingConfig::Api {
                api_key, api_url, ..
            } => {
                let url = format!("{}{}", api_url.trim_end_matches('/'), PARTITION_ENDPOINT);
                let request = RequestConfig::new()
                    .header("accept", "application/json")
                    .header("unstructured-api-key", api_key)
                    .query("strategy", &format.strategy)
                    .bytes(
                        Bytes::from_static(b"# connection check"),
                        "text/markdown",
                    );

                let result = async {
                    let response = self.client().post(&url, request).await?;
                    let body: Value = response.json().await?;
                    if body.is_array() {
                        Ok(())
                    } else {
                        Err(Error::check(format!("unexpected API response: {body}")))
                    }
                }
                .await;

                match result {
                    Ok(()) => (true, None),
                    Err(e) => (false, Some(format!("API error: {e}"))),
                }
            }
        }
    }

    async fn infer_schema(
        &self,
        config: &StreamConfig,
        file: &RemoteFile,
        _reader: &dyn StreamReader,
    ) -> Result<JsonSchema> {
        let format = self.format(config)?;

        // The schema never varies, but a stream that refuses to skip
        // unprocessable files should find out at discovery time that a
        // sampled file is of the wrong type
        if let DocumentType::Unsupported(ext) = DocumentType::detect(file) {
            if !format.skip_unprocessable_files {
                return Err(Error::schema_inference(
                    &file.uri,
                    format!("File type '{ext}' is not supported"),
                ));
            }
        }

        Ok(document_schema())
    }

    async fn parse_records(
        &self,
        config: &StreamConfig,
        file: &RemoteFile,
        reader: &dyn StreamReader,
    ) -> Result<RecordIterator> {
        let format = self.format(config)?;
        let doc_type = DocumentType::detect(file);

        let record = match self.extract_content(format, &doc_type, file, reader).await {
            Ok(content) => document_record(&file.uri, Some(content), None),
            // Only parse errors are skippable; auth and connectivity
            // failures from the API fail the sync regardless
            Err(e @ Error::RecordParse { .. }) if format.skip_unprocessable_files => {
                warn!(
                    file = %file.uri,
                    "skipping unprocessable file: {}",
                    truncate(&e.to_string(), 200)
                );
                document_record(&file.uri, None, Some(e.to_string()))
            }
            Err(e) => return Err(e),
        };

        Ok(Box::new(std::iter::once(Ok(record))))
    }
}

/// The static schema every unstructured stream shares
fn document_schema() -> JsonSchema {
    let mut schema = JsonSchema::new();
    schema.add_property(
        "content",
        SchemaProperty::nullable(JsonType::String).with_description(
            "Content of the file as markdown. Might be null if the file could not be parsed",
        ),
    );
    schema.add_property(
        "document_key",
        SchemaProperty::new(JsonType::String)
            .with_description("Unique identifier of the document, e.g. the file path"),
    );
    schema.add_property(
        SOURCE_FILE_PARSE_ERROR_FIELD,
        SchemaProperty::nullable(JsonType::String).with_description(
            "Error message if the file could not be parsed even though the file is supported",
        ),
    );
    schema
}

/// Build the one record a document produces
fn document_record(uri: &str, content: Option<String>, error: Option<String>) -> JsonObject {
    let mut record = JsonObject::new();
    record.insert(
        "content".to_string(),
        content.map_or(Value::Null, Value::String),
    );
    record.insert("document_key".to_string(), Value::String(uri.to_string()));
    record.insert(
        SOURCE_FILE_PARSE_ERROR_FIELD.to_string(),
        error.map_or(Value::Null, Value::String),
    );
    record
}

/// Render partitioning elements back to markdown
fn render_markdown(elements: &[DocumentElement]) -> String {
    let rendered: Vec<String> = elements
        .iter()
        .map(|el| match el.element_type.as_str() {
            "Title" => {
                let depth = el.metadata.category_depth.unwrap_or(1).max(1);
                format!("{} {}", "#".repeat(depth), el.text)
            }
            "ListItem" => format!("- {}", el.text),
            "Formula" => format!("```\n{}\n```", el.text),
            _ => el.text.clone(),
        })
        .collect();
    rendered.join("\n\n")
}

fn parse_error(uri: &str, message: impl Into<String>) -> Error {
    Error::record_parse(
        uri,
        format!(
            "File could not be processed. This may be a mismatch between the declared format and the actual file type, or the file may be corrupt. {}",
            message.into()
        ),
    )
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
