//! Prelude for commonly used types in oo-client.

pub use crate::client::{Method, OpenObserveClient};
pub use crate::config::ClientConfig;
pub use crate::convert::{Document, Record, TimeBound};
pub use crate::error::{OpenObserveError, Result};
pub use crate::export::{ExportFormat, ExportOptions};
pub use crate::import::{ImportOptions, ImportReport, ImportTarget};
pub use crate::objects::ObjectType;
pub use crate::reconcile::Reconciled;
pub use crate::search::{SearchQuery, SearchResponse};
