//! Configuration export to JSON and CSV files.
//!
//! File names are built by appending to a caller supplied prefix, so
//! `backup/` writes into a directory and `backup/2024-` prefixes every file.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Serializer, Value};
use tracing::{debug, info, instrument, warn};

use crate::client::OpenObserveClient;
use crate::convert::Record;
use crate::error::{OpenObserveError, Result};
use crate::frame::write_csv;
use crate::objects::{ListShape, ObjectType};

/// Fields that change on every server-side evaluation and make exports noisy.
pub const VOLATILE_KEYS: [&str; 5] = [
    "last_triggered_at",
    "last_satisfied_at",
    "updated_at",
    "last_edited_by",
    "stats",
];

/// Output format of [`OpenObserveClient::config_export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = OpenObserveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(OpenObserveError::InvalidInput {
                message: format!("unsupported export format '{other}'"),
            }),
        }
    }
}

/// Layout options for per-object export files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Write `{prefix}{type}-{name}.json` instead of `{prefix}{type}/{name}.json`.
    pub flat: bool,
    /// Drop [`VOLATILE_KEYS`] from every object.
    pub strip: bool,
}

/// Removes [`VOLATILE_KEYS`] from an object.
pub fn strip_volatile(object: &mut Record) {
    for key in VOLATILE_KEYS {
        object.remove(key);
    }
}

fn strip_response(object_type: ObjectType, response: &mut Value) {
    let items = match (object_type.list_shape(), response) {
        (ListShape::TopLevel, Value::Array(items)) => items,
        (ListShape::Key(key), Value::Object(map)) => match map.get_mut(key) {
            Some(Value::Array(items)) => items,
            _ => return,
        },
        _ => return,
    };
    for item in items.iter_mut() {
        if let Value::Object(object) = item {
            strip_volatile(object);
        }
    }
}

/// Writes `value` as UTF-8 JSON indented by four spaces.
pub fn write_pretty_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    fs::write(path, buf).map_err(|e| OpenObserveError::io(path, e))
}

fn sanitize_file_name(name: &str) -> String {
    name.trim().replace(['/', '\\'], "_")
}

/// Writes one JSON file per object of a list response.
///
/// Objects are named by the type's export file key. An object without a
/// usable name is skipped, and a file that cannot be written is logged and
/// skipped; the remaining objects are still exported. Returns the number of
/// files written.
pub fn export_objects_split(
    object_type: ObjectType,
    response: &Value,
    prefix: &str,
    options: ExportOptions,
) -> Result<usize> {
    let destination = if options.flat {
        PathBuf::from(format!("{prefix}{}-", object_type.file_stem()))
    } else {
        let dir = PathBuf::from(format!("{prefix}{}", object_type.api_path()));
        fs::create_dir_all(&dir).map_err(|e| OpenObserveError::io(&dir, e))?;
        dir
    };

    let mut written = 0;
    for mut object in object_type.extract_objects_lenient(response) {
        let Some(name) = object_type.object_file_name(&object) else {
            warn!(%object_type, "object without a name, not exported");
            continue;
        };
        if options.strip {
            strip_volatile(&mut object);
        }

        let file_name = format!("{}.json", sanitize_file_name(&name));
        let path = if options.flat {
            PathBuf::from(format!("{}{file_name}", destination.display()))
        } else {
            destination.join(file_name)
        };

        debug!(%object_type, %name, path = %path.display(), "exporting object");
        match write_pretty_json(&path, &object) {
            Ok(()) => written += 1,
            Err(e) => warn!(%object_type, %name, error = %e, "export of object failed"),
        }
    }
    Ok(written)
}

impl OpenObserveClient {
    /// Exports every exportable object type.
    ///
    /// * `Json` without `split` writes the raw list response of each type to
    ///   `{prefix}{type}.json`.
    /// * `Json` with `split` writes one file per object, see
    ///   [`export_objects_split`].
    /// * `Csv` writes `{prefix}{type}.csv` from [`list_objects_frame`](Self::list_objects_frame).
    ///
    /// Returns the number of files written.
    #[instrument(skip(self))]
    pub async fn config_export(
        &self,
        prefix: &str,
        format: ExportFormat,
        split: bool,
        options: ExportOptions,
    ) -> Result<usize> {
        let mut written = 0;
        for object_type in ObjectType::EXPORTABLE {
            let stem = object_type.file_stem();
            match format {
                ExportFormat::Csv => {
                    let frame = self.list_objects_frame(object_type).await?;
                    write_csv(&frame, format!("{prefix}{stem}.csv"))?;
                    written += 1;
                }
                ExportFormat::Json if split => {
                    let response = self.list_objects(object_type).await?;
                    written += export_objects_split(object_type, &response, prefix, options)?;
                }
                ExportFormat::Json => {
                    let mut response = self.list_objects(object_type).await?;
                    if options.strip {
                        strip_response(object_type, &mut response);
                    }
                    let path = PathBuf::from(format!("{prefix}{stem}.json"));
                    write_pretty_json(&path, &response)?;
                    written += 1;
                }
            }
            debug!(%object_type, "object type exported");
        }
        info!(written, "Config export completed");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_export_format_parse() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_strip_volatile() {
        let mut object: Record = serde_json::from_value(json!({
            "name": "alert1",
            "updated_at": 1,
            "last_triggered_at": 2,
            "stats": {"doc_num": 3}
        }))
        .unwrap();
        strip_volatile(&mut object);
        assert_eq!(object.len(), 1);
        assert!(object.contains_key("name"));
    }

    #[test]
    fn test_strip_response_keyed_list() {
        let mut response = json!({"list": [{"name": "a", "updated_at": 1}]});
        strip_response(ObjectType::Alerts, &mut response);
        assert_eq!(response, json!({"list": [{"name": "a"}]}));
    }

    #[test]
    fn test_export_tree_layout() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = format!("{}/", dir.path().display());
        let response = json!([
            {"name": "email", "url": "https://example.com"},
            {"name": "slack", "url": "https://hooks.example.com"}
        ]);

        let written = export_objects_split(
            ObjectType::AlertDestinations,
            &response,
            &prefix,
            ExportOptions::default(),
        )
        .unwrap();

        assert_eq!(written, 2);
        let path = dir.path().join("alerts/destinations/email.json");
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("{\n    \""));
    }

    #[test]
    fn test_export_flat_layout_with_strip() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = format!("{}/", dir.path().display());
        let response = json!({"list": [{"name": "pytest_alert", "updated_at": 1, "owner": "é"}]});

        let options = ExportOptions {
            flat: true,
            strip: true,
        };
        let written = export_objects_split(ObjectType::Alerts, &response, &prefix, options).unwrap();

        assert_eq!(written, 1);
        let content = fs::read_to_string(dir.path().join("alerts-pytest_alert.json")).unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value, json!({"name": "pytest_alert", "owner": "é"}));
        assert!(content.contains('é'));
    }

    #[test]
    fn test_export_skips_unnamed_and_sanitizes() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = format!("{}/", dir.path().display());
        let response = json!({"list": [{"function": "."}, {"name": "a/b"}]});

        let written = export_objects_split(
            ObjectType::Functions,
            &response,
            &prefix,
            ExportOptions::default(),
        )
        .unwrap();

        assert_eq!(written, 1);
        assert!(dir.path().join("functions/a_b.json").exists());
    }
}
