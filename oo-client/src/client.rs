use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, trace};
use url::Url;

use crate::config::{ClientConfig, STREAM_PLACEHOLDER};
use crate::convert::{datetime_fields_to_micros, flatten, to_record, Record, KEY_SEPARATOR};
use crate::error::{OpenObserveError, Result};
use crate::logging::{truncate_field, MAX_LOGGED_BODY};
use crate::objects::{lookup_string, ObjectType};

/// HTTP verbs used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Whether `endpoint` is routed to `/api/v2`: `alerts/...` except the
/// destinations and templates below it, and everything under `folders`.
fn is_v2_endpoint(endpoint: &str) -> bool {
    let mut segments = endpoint.trim_start_matches('/').split(['/', '?']);
    match segments.next() {
        Some("alerts") => !matches!(segments.next(), Some("destinations" | "templates")),
        Some("folders") => true,
        _ => false,
    }
}

/// HTTP client for the OpenObserve REST API.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct OpenObserveClient {
    config: Arc<ClientConfig>,
    client: Client,
    url_template: String,
    url_template_v2: String,
}

impl std::fmt::Debug for OpenObserveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenObserveClient")
            .field("config", &self.config)
            .field("url_template", &self.url_template)
            .finish()
    }
}

impl OpenObserveClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Url::parse(config.host()).map_err(|e| OpenObserveError::Configuration {
            message: format!("invalid host '{}': {}", config.host(), e),
        })?;

        let mut auth = HeaderValue::from_str(config.basic_auth_header().expose()).map_err(|e| {
            OpenObserveError::Configuration {
                message: format!("invalid credentials: {e}"),
            }
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.verify())
            .build()
            .map_err(|e| OpenObserveError::Configuration {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            url_template: config.url_template(),
            url_template_v2: config.url_template_v2(),
            config: Arc::new(config),
            client,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Substitutes `endpoint` into the URL template.
    ///
    /// Alerts and folders live under `/api/v2`, including paths below them.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        self.render(endpoint, is_v2_endpoint(endpoint))
    }

    fn render(&self, endpoint: &str, v2: bool) -> String {
        let template = if v2 {
            &self.url_template_v2
        } else {
            &self.url_template
        };
        template.replace(STREAM_PLACEHOLDER, endpoint)
    }

    pub(crate) fn parse_url(url: &str) -> Result<Url> {
        Url::parse(url).map_err(|e| OpenObserveError::Configuration {
            message: format!("invalid url '{url}': {e}"),
        })
    }

    /// URL of an object collection, or of one object when `id` is given.
    fn object_url(&self, object_type: ObjectType, id: Option<&str>) -> Result<Url> {
        let mut url = Self::parse_url(&self.render(object_type.api_path(), object_type.is_v2()))?;
        if let Some(id) = id {
            self.push_segments(&mut url, &[id])?;
        }
        Ok(url)
    }

    /// Ingestion URL `{api}/{stream}/_json` with the stream name as one
    /// encoded path segment.
    fn ingest_url(&self, stream: &str) -> Result<Url> {
        let mut url = Self::parse_url(&self.render("", false))?;
        self.push_segments(&mut url, &[stream, "_json"])?;
        Ok(url)
    }

    fn push_segments(&self, url: &mut Url, segments: &[&str]) -> Result<()> {
        url.path_segments_mut()
            .map_err(|_| OpenObserveError::Configuration {
                message: format!("host '{}' cannot be a base url", self.config.host()),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(())
    }

    /// Sends one request to `{api}/{endpoint}` and decodes the JSON answer.
    ///
    /// Any non-2xx status is returned as [`OpenObserveError::Http`]. An empty
    /// success body decodes to `Value::Null`.
    pub async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let mut url = Self::parse_url(&self.endpoint_url(endpoint))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let segment = endpoint.split('/').next().unwrap_or(endpoint);
        let action = format!("{}_{}", method.as_str(), segment);
        self.dispatch(method, url, &action, body, None).await
    }

    pub(crate) async fn dispatch(
        &self,
        method: Method,
        url: Url,
        action: &str,
        body: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        debug!(method = method.as_str(), %url, action, "sending request");

        let mut request = self.client.request(method.into(), url);
        if let Some(body) = body {
            trace!(
                payload = %truncate_field(&body.to_string(), MAX_LOGGED_BODY),
                "request payload"
            );
            request = request.json(body);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        self.handle_response(response, action).await
    }

    async fn handle_response(&self, response: reqwest::Response, action: &str) -> Result<Value> {
        let status = response.status();
        let text = response.text().await?;
        debug!(
            action,
            status = status.as_u16(),
            body = %truncate_field(&text, MAX_LOGGED_BODY),
            "response received"
        );

        if !status.is_success() {
            return Err(OpenObserveError::Http {
                action: action.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        // Some endpoints answer a bare text message on success.
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    /// Ingests one document into `stream`.
    ///
    /// The document is flattened and sent with its values unchanged. A
    /// document the server reports as failed is an
    /// [`OpenObserveError::IndexFailed`] error.
    pub async fn index<T: Serialize + ?Sized>(&self, stream: &str, document: &T) -> Result<Value> {
        self.index_with(stream, document, false).await
    }

    /// Same as [`index`](Self::index). With `convert_datetimes` every string
    /// value that is a full RFC 3339 timestamp is sent as microseconds since
    /// the epoch.
    #[instrument(skip(self, document))]
    pub async fn index_with<T: Serialize + ?Sized>(
        &self,
        stream: &str,
        document: &T,
        convert_datetimes: bool,
    ) -> Result<Value> {
        if stream.is_empty() {
            return Err(OpenObserveError::InvalidInput {
                message: "stream name is empty".to_string(),
            });
        }

        let mut document = flatten(&to_record(document)?, KEY_SEPARATOR);
        if convert_datetimes {
            datetime_fields_to_micros(&mut document);
        }

        let url = self.ingest_url(stream)?;
        let body = Value::Array(vec![Value::Object(document.clone())]);
        let response = self
            .dispatch(Method::Post, url, "index", Some(&body), None)
            .await?;

        let status = &response["status"][0];
        if status["failed"].as_u64().unwrap_or(0) > 0 {
            let error = match &status["error"] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(OpenObserveError::IndexFailed {
                error,
                document: Value::Object(document).to_string(),
            });
        }
        Ok(response)
    }

    /// Lists objects of a type. The raw response is returned since its shape
    /// differs per type; see [`ObjectType::extract_objects`].
    #[instrument(skip(self))]
    pub async fn list_objects(&self, object_type: ObjectType) -> Result<Value> {
        self.execute(Method::Get, object_type.api_path(), &[], None)
            .await
    }

    /// Creates an object.
    #[instrument(skip(self, object), fields(name = ?object_type.object_name(object)))]
    pub async fn create_object(&self, object_type: ObjectType, object: &Record) -> Result<Value> {
        let mut url = self.object_url(object_type, None)?;
        Self::append_folder(&mut url, object_type, object);
        trace!(payload = ?object, "create object input");

        let body = Value::Object(object.clone());
        let response = self
            .dispatch(
                Method::Post,
                url,
                &format!("create_object_{object_type}"),
                Some(&body),
                None,
            )
            .await?;
        info!("Create object completed");
        Ok(response)
    }

    /// Updates an object addressed by the id field of `object`.
    #[instrument(skip(self, object))]
    pub async fn update_object(&self, object_type: ObjectType, object: &Record) -> Result<Value> {
        let id = object_type
            .object_id(object)
            .ok_or_else(|| OpenObserveError::MissingField {
                object_type: object_type.to_string(),
                field: object_type.id_key().to_string(),
            })?;
        let mut url = self.object_url(object_type, Some(&id))?;
        Self::append_folder(&mut url, object_type, object);
        trace!(payload = ?object, "update object input");

        let body = Value::Object(object.clone());
        let response = self
            .dispatch(
                Method::Put,
                url,
                &format!("update_object_{object_type}"),
                Some(&body),
                None,
            )
            .await?;
        info!(%id, "Update object completed");
        Ok(response)
    }

    /// Deletes an object by id (for some types the id is the name).
    #[instrument(skip(self))]
    pub async fn delete_object(&self, object_type: ObjectType, id: &str) -> Result<Value> {
        let url = self.object_url(object_type, Some(id))?;
        let response = self
            .dispatch(
                Method::Delete,
                url,
                &format!("delete_object_{object_type}"),
                None,
                None,
            )
            .await?;
        info!("Delete object completed");
        Ok(response)
    }

    /// Alerts are filed into folders through a query parameter.
    fn append_folder(url: &mut Url, object_type: ObjectType, object: &Record) {
        if object_type != ObjectType::Alerts {
            return;
        }
        if let Some(folder) = lookup_string(object, "folder_id") {
            url.query_pairs_mut().append_pair("folder", &folder);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenObserveClient {
        OpenObserveClient::new(ClientConfig::new("root@example.com", "secret")).unwrap()
    }

    #[test]
    fn test_client_creation() {
        assert!(OpenObserveClient::new(ClientConfig::new("u", "p")).is_ok());
    }

    #[test]
    fn test_invalid_host_is_configuration_error() {
        let config = ClientConfig::new("u", "p").with_host("not a url");
        let err = OpenObserveClient::new(config).unwrap_err();
        assert!(matches!(err, OpenObserveError::Configuration { .. }));
    }

    #[test]
    fn test_endpoint_urls() {
        let client = client();
        assert_eq!(
            client.endpoint_url("streams"),
            "http://localhost:5080/api/default/streams"
        );
        assert_eq!(
            client.endpoint_url("alerts"),
            "http://localhost:5080/api/v2/default/alerts"
        );
        assert_eq!(
            client.endpoint_url("alerts/destinations"),
            "http://localhost:5080/api/default/alerts/destinations"
        );
        assert_eq!(
            client.endpoint_url("folders/dashboards"),
            "http://localhost:5080/api/v2/default/folders/dashboards"
        );
    }

    #[test]
    fn test_endpoint_urls_below_v2_objects() {
        let client = client();
        assert_eq!(
            client.endpoint_url("alerts/2u5huhHK59KnKur8ih1QuiUmABC"),
            "http://localhost:5080/api/v2/default/alerts/2u5huhHK59KnKur8ih1QuiUmABC"
        );
        assert_eq!(
            client.endpoint_url("folders/abc"),
            "http://localhost:5080/api/v2/default/folders/abc"
        );
        assert_eq!(
            client.endpoint_url("folders/alerts"),
            "http://localhost:5080/api/v2/default/folders/alerts"
        );
        assert_eq!(
            client.endpoint_url("alerts/templates/t1"),
            "http://localhost:5080/api/default/alerts/templates/t1"
        );
        assert_eq!(
            client.endpoint_url("alerts/destinations/email"),
            "http://localhost:5080/api/default/alerts/destinations/email"
        );
        assert_eq!(
            client.endpoint_url("alertsx"),
            "http://localhost:5080/api/default/alertsx"
        );
    }

    #[test]
    fn test_ingest_url_encodes_stream() {
        let client = client();
        assert_eq!(
            client.ingest_url("default").unwrap().as_str(),
            "http://localhost:5080/api/default/default/_json"
        );
        assert_eq!(
            client.ingest_url("a/b c").unwrap().as_str(),
            "http://localhost:5080/api/default/a%2Fb%20c/_json"
        );
    }

    #[test]
    fn test_object_url_encodes_ids() {
        let client = client();
        let url = client
            .object_url(ObjectType::Users, Some("pytest@example.com"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5080/api/default/users/pytest@example.com"
        );

        let url = client
            .object_url(ObjectType::Functions, Some("a b/c"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5080/api/default/functions/a%20b%2Fc"
        );

        let url = client
            .object_url(ObjectType::Alerts, Some("2u5huhHK59KnKur8ih1QuiUmABC"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5080/api/v2/default/alerts/2u5huhHK59KnKur8ih1QuiUmABC"
        );
    }

    #[test]
    fn test_folder_query_only_for_alerts() {
        let object: Record = serde_json::from_str(r#"{"folder_id": "abc", "name": "x"}"#).unwrap();

        let mut url = Url::parse("http://localhost/api/v2/default/alerts").unwrap();
        OpenObserveClient::append_folder(&mut url, ObjectType::Alerts, &object);
        assert_eq!(url.query(), Some("folder=abc"));

        let mut url = Url::parse("http://localhost/api/default/functions").unwrap();
        OpenObserveClient::append_folder(&mut url, ObjectType::Functions, &object);
        assert_eq!(url.query(), None);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let config = ClientConfig::new("u", "p").with_host("http://localhost:1");
        let client = OpenObserveClient::new(config).unwrap();

        let err = client.list_objects(ObjectType::Streams).await.unwrap_err();
        assert!(matches!(err, OpenObserveError::Network { .. }));
    }
}
