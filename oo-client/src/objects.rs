//! Object model mapping tables.
//!
//! The OpenObserve API is not uniform across resource types: list responses
//! wrap their items under different keys (or not at all), and the field that
//! identifies an object in a URL is not always the field that names it. The
//! tables below capture those differences per [`ObjectType`].

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::convert::Record;
use crate::error::{OpenObserveError, Result};

/// Configuration object kinds managed through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Functions,
    Pipelines,
    Alerts,
    AlertDestinations,
    AlertTemplates,
    Dashboards,
    Streams,
    Users,
    Folders,
    FolderAlerts,
    FolderDashboards,
}

/// Where the items live in a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// The response body is the array itself.
    TopLevel,
    /// The array sits under this key of the response object.
    Key(&'static str),
}

impl ObjectType {
    /// Every object type the export covers, in export order.
    pub const EXPORTABLE: [ObjectType; 8] = [
        ObjectType::Functions,
        ObjectType::Pipelines,
        ObjectType::Alerts,
        ObjectType::AlertDestinations,
        ObjectType::AlertTemplates,
        ObjectType::Dashboards,
        ObjectType::Streams,
        ObjectType::Users,
    ];

    /// Object types the API can create. Streams have no create endpoint and
    /// user creation needs a password the export does not contain.
    pub const IMPORTABLE: [ObjectType; 6] = [
        ObjectType::Functions,
        ObjectType::Pipelines,
        ObjectType::Alerts,
        ObjectType::AlertDestinations,
        ObjectType::AlertTemplates,
        ObjectType::Dashboards,
    ];

    /// Path segment(s) under `/api/{org}/`.
    pub fn api_path(self) -> &'static str {
        match self {
            ObjectType::Functions => "functions",
            ObjectType::Pipelines => "pipelines",
            ObjectType::Alerts => "alerts",
            ObjectType::AlertDestinations => "alerts/destinations",
            ObjectType::AlertTemplates => "alerts/templates",
            ObjectType::Dashboards => "dashboards",
            ObjectType::Streams => "streams",
            ObjectType::Users => "users",
            ObjectType::Folders => "folders",
            ObjectType::FolderAlerts => "folders/alerts",
            ObjectType::FolderDashboards => "folders/dashboards",
        }
    }

    /// File-system friendly form of the API path (`alerts-destinations`).
    pub fn file_stem(self) -> String {
        self.api_path().replace('/', "-")
    }

    /// Whether the type is served from the `/api/v2` routes.
    pub fn is_v2(self) -> bool {
        matches!(
            self,
            ObjectType::Alerts
                | ObjectType::Folders
                | ObjectType::FolderAlerts
                | ObjectType::FolderDashboards
        )
    }

    pub fn list_shape(self) -> ListShape {
        match self {
            ObjectType::Dashboards => ListShape::Key("dashboards"),
            ObjectType::Users => ListShape::Key("data"),
            ObjectType::AlertDestinations | ObjectType::AlertTemplates => ListShape::TopLevel,
            _ => ListShape::Key("list"),
        }
    }

    /// Field used to address an existing object in update/delete URLs.
    pub fn id_key(self) -> &'static str {
        match self {
            ObjectType::Alerts => "alert_id",
            ObjectType::AlertDestinations => "destination_name",
            ObjectType::AlertTemplates => "template_name",
            ObjectType::Dashboards => "dashboardId",
            ObjectType::Functions => "name",
            ObjectType::Pipelines => "pipeline_id",
            ObjectType::Streams => "stream_name",
            ObjectType::Users => "email_id",
            ObjectType::Folders | ObjectType::FolderAlerts | ObjectType::FolderDashboards => "id",
        }
    }

    /// Field (possibly a dotted path) holding the human-facing name.
    pub fn name_key(self) -> &'static str {
        match self {
            ObjectType::AlertTemplates => "template_name",
            ObjectType::Dashboards => "title",
            ObjectType::Pipelines => "source.stream_name",
            ObjectType::Users => "email",
            _ => "name",
        }
    }

    /// Field used to name per-object export files.
    pub fn file_key(self) -> &'static str {
        match self {
            ObjectType::Dashboards => "dashboard_id",
            ObjectType::Users => "email",
            _ => "name",
        }
    }

    /// Resolves the name of an object, falling back to `name`.
    pub fn object_name(self, object: &Record) -> Option<String> {
        lookup_string(object, self.name_key()).or_else(|| lookup_string(object, "name"))
    }

    /// Resolves the URL id of an object: id key, then name key, then `name`.
    pub fn object_id(self, object: &Record) -> Option<String> {
        lookup_string(object, self.id_key()).or_else(|| self.object_name(object))
    }

    /// Resolves the export file name of an object.
    pub fn object_file_name(self, object: &Record) -> Option<String> {
        lookup_string(object, self.file_key()).or_else(|| self.object_id(object))
    }

    /// Extracts the items of a list response.
    ///
    /// Fails when the response has neither the expected key nor the expected
    /// array shape.
    pub fn extract_objects(self, response: &Value) -> Result<Vec<Record>> {
        let items = match (self.list_shape(), response) {
            (ListShape::TopLevel, Value::Array(items)) => items,
            (ListShape::Key(key), Value::Object(map)) => match map.get(key) {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(OpenObserveError::UnexpectedResponse {
                        message: format!("no '{key}' array in {self} list response"),
                    })
                }
            },
            _ => {
                return Err(OpenObserveError::UnexpectedResponse {
                    message: format!("can't normalize {self} list response: {response}"),
                })
            }
        };
        Ok(items.iter().filter_map(as_record).collect())
    }

    /// Like [`extract_objects`](Self::extract_objects) but accepts any array
    /// and treats a lone object without the list key as a single item.
    pub fn extract_objects_lenient(self, data: &Value) -> Vec<Record> {
        match data {
            Value::Array(items) => items.iter().filter_map(as_record).collect(),
            Value::Object(map) => match self.list_shape() {
                ListShape::Key(key) => match map.get(key) {
                    Some(Value::Array(items)) => items.iter().filter_map(as_record).collect(),
                    _ => vec![map.clone()],
                },
                ListShape::TopLevel => vec![map.clone()],
            },
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_path())
    }
}

impl FromStr for ObjectType {
    type Err = OpenObserveError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().trim_matches('/').replace('-', "/");
        let object_type = match normalized.as_str() {
            "functions" => ObjectType::Functions,
            "pipelines" => ObjectType::Pipelines,
            "alerts" => ObjectType::Alerts,
            "alerts/destinations" => ObjectType::AlertDestinations,
            "alerts/templates" => ObjectType::AlertTemplates,
            "dashboards" => ObjectType::Dashboards,
            "streams" => ObjectType::Streams,
            "users" => ObjectType::Users,
            "folders" => ObjectType::Folders,
            "folders/alerts" => ObjectType::FolderAlerts,
            "folders/dashboards" => ObjectType::FolderDashboards,
            _ => return Err(OpenObserveError::UnknownObjectType(s.to_string())),
        };
        Ok(object_type)
    }
}

fn as_record(value: &Value) -> Option<Record> {
    value.as_object().cloned()
}

/// Follows a dotted path (`source.stream_name`) through nested objects.
pub fn lookup_path<'a>(object: &'a Record, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = object.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Resolves a dotted path to a string; numbers are rendered as text.
pub fn lookup_string(object: &Record, path: &str) -> Option<String> {
    match lookup_path(object, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_and_display_round_trip() {
        for object_type in ObjectType::EXPORTABLE {
            let parsed: ObjectType = object_type.api_path().parse().unwrap();
            assert_eq!(parsed, object_type);
        }
        assert_eq!(
            "alerts-destinations".parse::<ObjectType>().unwrap(),
            ObjectType::AlertDestinations
        );
        assert!("widgets".parse::<ObjectType>().is_err());
    }

    #[test]
    fn test_v2_routes() {
        assert!(ObjectType::Alerts.is_v2());
        assert!(ObjectType::FolderDashboards.is_v2());
        assert!(!ObjectType::AlertDestinations.is_v2());
        assert!(!ObjectType::Streams.is_v2());
    }

    #[test]
    fn test_extract_keyed_list() {
        let response = json!({"data": [{"email": "root@example.com"}]});
        let users = ObjectType::Users.extract_objects(&response).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["email"], "root@example.com");
    }

    #[test]
    fn test_extract_top_level_list() {
        let response = json!([{"name": "email"}, {"name": "slack"}]);
        let destinations = ObjectType::AlertDestinations
            .extract_objects(&response)
            .unwrap();
        assert_eq!(destinations.len(), 2);
    }

    #[test]
    fn test_extract_unexpected_shape_is_error() {
        let response = json!({"id": 1, "name": "John Doe"});
        assert!(ObjectType::Streams.extract_objects(&response).is_err());
        assert!(ObjectType::AlertTemplates
            .extract_objects(&json!({"list": []}))
            .is_err());
    }

    #[test]
    fn test_extract_lenient_wraps_single_object() {
        let data = json!({"name": "pytest_nginx_json_body", "function": "."});
        let objects = ObjectType::Functions.extract_objects_lenient(&data);
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0]["name"], "pytest_nginx_json_body");
    }

    #[test]
    fn test_pipeline_name_uses_nested_path() {
        let pipeline = record(json!({
            "pipeline_id": "7308207793515791234",
            "name": "pytest_web",
            "source": {"stream_name": "pytestweb"}
        }));
        assert_eq!(
            ObjectType::Pipelines.object_name(&pipeline).as_deref(),
            Some("pytestweb")
        );
        assert_eq!(
            ObjectType::Pipelines.object_id(&pipeline).as_deref(),
            Some("7308207793515791234")
        );
        assert_eq!(
            ObjectType::Pipelines.object_file_name(&pipeline).as_deref(),
            Some("pytest_web")
        );
    }

    #[test]
    fn test_id_falls_back_to_name() {
        let stream = record(json!({"name": "default", "stream_type": "logs"}));
        assert_eq!(
            ObjectType::Streams.object_id(&stream).as_deref(),
            Some("default")
        );
        let user = record(json!({"email": "root@example.com"}));
        assert_eq!(
            ObjectType::Users.object_id(&user).as_deref(),
            Some("root@example.com")
        );
    }
}
