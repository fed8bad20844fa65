//! # oo-client - OpenObserve REST API client
//!
//! A typed async client for the [OpenObserve](https://openobserve.ai) REST
//! API. It covers the everyday operations of an OpenObserve deployment:
//! ingesting documents, running SQL searches and managing configuration
//! objects (functions, pipelines, alerts, destinations, templates,
//! dashboards, streams and users).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::{Duration, Utc};
//! use oo_client::prelude::*;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("root@example.com", "Complexpass#123")
//!     .with_host("https://openobserve.example.com")
//!     .with_organisation("default");
//! let client = OpenObserveClient::new(config)?;
//!
//! // Ingest one document
//! let doc = Document::new()
//!     .with_field("job", "backup")
//!     .with_timestamp("_timestamp", Utc::now());
//! client.index("default", &doc).await?;
//!
//! // Search the last week
//! let query = SearchQuery::new(r#"SELECT * FROM "default" WHERE job = 'backup'"#)
//!     .start(Utc::now() - Duration::days(7))
//!     .end(Utc::now())
//!     .auto_convert_timestamps(true);
//! for hit in client.search(&query).await? {
//!     println!("{hit:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration objects
//!
//! The API identifies objects by ids that differ per type, and list responses
//! wrap their items differently. [`objects::ObjectType`] captures those
//! differences so that the CRUD calls, the name-based helpers in
//! [`reconcile`] and the bulk [`export`] / [`import`] work for every type:
//!
//! ```rust,no_run
//! use oo_client::prelude::*;
//!
//! # async fn example(client: OpenObserveClient) -> oo_client::error::Result<()> {
//! // Write one pretty JSON file per object below ./backup/
//! let options = ExportOptions { flat: false, strip: true };
//! client.config_export("backup/", ExportFormat::Json, true, options).await?;
//!
//! // ...and load them back, updating objects that already exist
//! let options = ImportOptions { overwrite: true, force: false };
//! let report = client.config_import(ImportTarget::All, "backup/", options, true).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`client`**: HTTP transport, URL building, ingestion and CRUD calls
//! - **`search`**: SQL search requests and responses
//! - **`objects`**: Per-type mapping tables
//! - **`reconcile`**: Create-or-update and delete by object name
//! - **`frame`**: Arrow record batches built from hits and object lists
//! - **`export`** / **`import`**: Configuration backup and restore
//! - **`convert`**: Flattening and timestamp conversion helpers
//! - **`security`**: Credential handling and input validation
//!
//! The crate only emits `tracing` events. Binaries can install a subscriber
//! with [`logging::setup::init_logging`].

pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod frame;
pub mod import;
pub mod logging;
pub mod objects;
pub mod prelude;
pub mod reconcile;
pub mod search;
pub mod security;

pub use client::OpenObserveClient;
pub use config::ClientConfig;
pub use search::SearchQuery;
