use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, trace};

use crate::client::{Method, OpenObserveClient};
use crate::convert::{micros_fields_to_datetime, Record, TimeBound};
use crate::error::{OpenObserveError, Result};
use crate::security::SqlValidator;

/// A SQL search over a time range.
///
/// # Examples
/// ```rust
/// use chrono::{Duration, Utc};
/// use oo_client::SearchQuery;
///
/// let now = Utc::now();
/// let query = SearchQuery::new(r#"SELECT * FROM "default""#)
///     .start(now - Duration::days(7))
///     .end(now)
///     .auto_convert_timestamps(true);
/// assert!(query.end_micros() > query.start_micros());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    sql: String,
    start: TimeBound,
    end: TimeBound,
    from: Option<u64>,
    size: Option<u64>,
    timeout: Option<Duration>,
    auto_convert_timestamps: bool,
    timestamp_columns: Option<Vec<String>>,
}

impl SearchQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            start: TimeBound::default(),
            end: TimeBound::default(),
            from: None,
            size: None,
            timeout: None,
            auto_convert_timestamps: false,
            timestamp_columns: None,
        }
    }

    /// Start of the search interval, as a datetime or epoch microseconds.
    pub fn start(mut self, start: impl Into<TimeBound>) -> Self {
        self.start = start.into();
        self
    }

    /// End of the search interval, as a datetime or epoch microseconds.
    pub fn end(mut self, end: impl Into<TimeBound>) -> Self {
        self.end = end.into();
        self
    }

    /// Offset of the first hit to return (`from` on the wire).
    pub fn offset(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }

    /// Maximum number of hits to return (`size` on the wire).
    pub fn limit(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// HTTP timeout for this search, overriding the configured default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Convert every field whose name contains `time` back to a datetime.
    pub fn auto_convert_timestamps(mut self, enabled: bool) -> Self {
        self.auto_convert_timestamps = enabled;
        self
    }

    /// Convert exactly these fields back to datetimes.
    pub fn timestamp_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.timestamp_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn start_micros(&self) -> i64 {
        self.start.as_micros()
    }

    pub fn end_micros(&self) -> i64 {
        self.end.as_micros()
    }

    pub fn converts_timestamps(&self) -> bool {
        self.auto_convert_timestamps
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.timestamp_columns.as_deref()
    }

    pub(crate) fn without_conversion(&self) -> Self {
        Self {
            auto_convert_timestamps: false,
            timestamp_columns: None,
            ..self.clone()
        }
    }

    fn request_body(&self) -> SearchRequest<'_> {
        SearchRequest {
            query: SearchBody {
                sql: &self.sql,
                start_time: self.start_micros(),
                end_time: self.end_micros(),
                from: self.from,
                size: self.size,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: SearchBody<'a>,
}

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    sql: &'a str,
    start_time: i64,
    end_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

/// Response from the `_search` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: Option<u64>,
    pub hits: Vec<Record>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub from: Option<u64>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub scan_size: Option<u64>,
}

impl OpenObserveClient {
    /// Runs a search and returns the hits.
    ///
    /// The SQL is parsed locally first; a syntax error never reaches the
    /// server.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<Record>> {
        Ok(self.search_response(query).await?.hits)
    }

    /// Runs a search and returns the full response, including totals.
    #[instrument(skip(self, query), fields(sql = %query.sql))]
    pub async fn search_response(&self, query: &SearchQuery) -> Result<SearchResponse> {
        SqlValidator::validate(&query.sql)?;

        debug!(
            start_time = query.start_micros(),
            end_time = query.end_micros(),
            "search time range"
        );

        let body = serde_json::to_value(query.request_body())?;
        let url = OpenObserveClient::parse_url(&self.endpoint_url("_search"))?;
        let timeout = query.timeout.unwrap_or(self.config().search_timeout());

        let response = self
            .dispatch(Method::Post, url, "search", Some(&body), Some(timeout))
            .await?;

        if !matches!(response.get("hits"), Some(Value::Array(_))) {
            return Err(OpenObserveError::UnexpectedResponse {
                message: "search response has no 'hits' array".to_string(),
            });
        }
        let mut response: SearchResponse = serde_json::from_value(response)?;
        trace!(hits = response.hits.len(), "search hits received");

        if query.auto_convert_timestamps || query.timestamp_columns.is_some() {
            let columns = query.timestamp_columns.as_deref();
            for hit in &mut response.hits {
                micros_fields_to_datetime(hit, columns);
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let query = SearchQuery::new("SELECT 1")
            .start(Utc.timestamp_opt(1, 0).unwrap())
            .end(2_000_000i64);
        let body = serde_json::to_value(query.request_body()).unwrap();
        assert_eq!(
            body,
            json!({"query": {"sql": "SELECT 1", "start_time": 1_000_000, "end_time": 2_000_000}})
        );
    }

    #[test]
    fn test_request_body_paging() {
        let query = SearchQuery::new("SELECT 1").offset(10).limit(5);
        let body = serde_json::to_value(query.request_body()).unwrap();
        assert_eq!(body["query"]["from"], 10);
        assert_eq!(body["query"]["size"], 5);
    }

    #[test]
    fn test_without_conversion() {
        let query = SearchQuery::new("SELECT 1")
            .auto_convert_timestamps(true)
            .timestamp_columns(["_timestamp"]);
        let plain = query.without_conversion();
        assert!(!plain.converts_timestamps());
        assert!(plain.columns().is_none());
        assert_eq!(plain.sql(), "SELECT 1");
    }

    #[test]
    fn test_response_deserializes_with_missing_metadata() {
        let response: SearchResponse =
            serde_json::from_value(json!({"hits": [{"a": 1}]})).unwrap();
        assert_eq!(response.hits.len(), 1);
        assert!(response.total.is_none());
    }
}
