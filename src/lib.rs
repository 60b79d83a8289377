// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # File-based Source CDK
//!
//! A minimal, Rust-native framework for building file-based data source
//! connectors: point a stream at glob patterns in a store, get a
//! schema-discovered, checkpointed, resumable record stream out.
//!
//! ## Features
//!
//! - **Any store**: S3, GCS, Azure and local filesystems via `object_store`
//! - **Four formats**: CSV, JSON Lines, Parquet, unstructured documents
//! - **Schema inference**: sampled across files, merged field by field
//! - **Incremental sync**: per-file history cursor with interval checkpoints
//! - **Validation policies**: emit, skip or stop on schema mismatches
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use filesource_cdk::config::load_source_config;
//! use filesource_cdk::remote::ObjectStoreReader;
//! use filesource_cdk::source::{ConfiguredCatalog, FileBasedSource, Source};
//! use filesource_cdk::types::SyncMode;
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> filesource_cdk::Result<()> {
//!     let config = load_source_config("source.yaml")?;
//!     let reader = Arc::new(ObjectStoreReader::local("/data")?);
//!     let source = FileBasedSource::new(config, reader);
//!
//!     let catalog = source.discover().await?;
//!     let selected = ConfiguredCatalog::select_all(&catalog, SyncMode::Incremental);
//!     let mut messages = source.read(&selected, None).await?;
//!     while let Some(msg) = messages.next().await {
//!         // Process records, state checkpoints and logs
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Source Interface                         │
//! │  spec() → SourceSpec    check() → Status    discover() → Catalog│
//! │  read(catalog, state) → Stream<Message>                         │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │  Remote  │  Formats  │   Discovery   │  Cursor   │ Validation  │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ S3/GCS   │ CSV       │ Sampling      │ History   │ Emit        │
//! │ Azure    │ JSONL     │ Merging       │ Slices    │ Skip        │
//! │ Local    │ Parquet   │ Cost bounds   │ Intervals │ Wait        │
//! │ Globs    │ Documents │               │           │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: Add docs before 1.0 release

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the CDK
pub mod error;

/// Common types and type aliases
pub mod types;

/// Configuration and stream definitions
pub mod config;

/// HTTP client with retry and rate limiting
pub mod http;

/// Remote file index: listing and opening files in a store
pub mod remote;

/// File format parsers and the parser registry
pub mod format;

/// Stream schema representation, inference and merging
pub mod schema;

/// Schema discovery and its cost policy
pub mod discovery;

/// Cursor and checkpoint management
pub mod cursor;

/// Schema validation policies
pub mod validation;

/// File-based stream orchestration
pub mod stream;

/// Source facade: spec, check, discover, read
pub mod source;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{load_source_config, load_source_config_from_str, SourceConfig, StreamConfig};
pub use source::{FileBasedSource, Source};
pub use stream::{FileBasedStream, Message};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
