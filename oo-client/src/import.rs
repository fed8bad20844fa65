//! Configuration import from JSON files.
//!
//! The API creates one object per request, so lists are imported object by
//! object and a failure is recorded without aborting the remaining objects.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::client::OpenObserveClient;
use crate::convert::Record;
use crate::error::{OpenObserveError, Result};
use crate::objects::{lookup_string, ObjectType};
use crate::reconcile::Reconciled;
use crate::security::InputValidator;

/// Whether `value` is a 27 character alphanumeric ksuid.
pub fn is_ksuid(value: &str) -> bool {
    InputValidator::is_ksuid(value)
}

/// Whether `value` is usable as an object name.
pub fn is_name(value: &str) -> bool {
    InputValidator::is_name(value)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Update the existing object when creation fails.
    pub overwrite: bool,
    /// Skip alert id and name validation.
    pub force: bool,
}

/// Outcome of a multi-object import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Object or file label with the error message.
    pub failed: Vec<(String, String)>,
}

impl ImportReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.failed.len()
    }

    fn record(&mut self, label: String, outcome: Result<Reconciled>) {
        match outcome {
            Ok(Reconciled::Created) => self.created += 1,
            Ok(Reconciled::Updated) => self.updated += 1,
            Ok(Reconciled::Skipped) => self.skipped += 1,
            Err(e) => {
                warn!(object = %label, error = %e, "import of object failed");
                self.failed.push((label, e.to_string()));
            }
        }
    }

    fn merge(&mut self, other: ImportReport) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failed.extend(other.failed);
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} skipped, {} failed",
            self.created,
            self.updated,
            self.skipped,
            self.failed.len()
        )
    }
}

/// Which object types [`OpenObserveClient::config_import`] covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportTarget {
    /// Every importable type, see [`ObjectType::IMPORTABLE`].
    All,
    One(ObjectType),
}

impl FromStr for ImportTarget {
    type Err = OpenObserveError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(ImportTarget::All);
        }
        s.parse().map(ImportTarget::One)
    }
}

/// Rejects alerts whose `id` is not a ksuid or whose name has reserved
/// characters.
pub fn validate_alert(object: &Record) -> Result<()> {
    if let Some(id) = lookup_string(object, "id") {
        if !is_ksuid(&id) {
            return Err(OpenObserveError::InvalidInput {
                message: format!("{id} is not a ksuid"),
            });
        }
    }
    if let Some(name) = lookup_string(object, ObjectType::Alerts.name_key()) {
        if !is_name(&name) {
            return Err(OpenObserveError::InvalidInput {
                message: format!("{name} is not a valid name"),
            });
        }
    }
    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| OpenObserveError::io(path, e))?;
    Ok(serde_json::from_str(&content)?)
}

impl OpenObserveClient {
    /// Imports a single object, given inline or read from `file_path`.
    ///
    /// The file is only read when `json` is `None` or empty. With
    /// `overwrite`, a failed creation is retried as an update.
    #[instrument(skip(self, json, file_path), fields(path = %file_path.as_ref().display()))]
    pub async fn import_objects_split(
        &self,
        object_type: ObjectType,
        json: Option<Record>,
        file_path: impl AsRef<Path>,
        options: ImportOptions,
    ) -> Result<Reconciled> {
        let file_path = file_path.as_ref();
        let object = match json.filter(|json| !json.is_empty()) {
            Some(json) => json,
            None if file_path.exists() => {
                debug!("loading object to import from file");
                match read_json(file_path)? {
                    Value::Object(object) => object,
                    other => {
                        return Err(OpenObserveError::InvalidInput {
                            message: format!(
                                "{} does not hold a single object but {}",
                                file_path.display(),
                                json_kind(&other)
                            ),
                        })
                    }
                }
            }
            None => {
                return Err(OpenObserveError::InvalidInput {
                    message: format!(
                        "no object given and {} does not exist",
                        file_path.display()
                    ),
                })
            }
        };

        self.import_object(object_type, &object, options).await
    }

    async fn import_object(
        &self,
        object_type: ObjectType,
        object: &Record,
        options: ImportOptions,
    ) -> Result<Reconciled> {
        if object_type == ObjectType::Alerts && !options.force {
            validate_alert(object)?;
        }

        let name = object_type
            .object_name(object)
            .unwrap_or_else(|| "unknown".to_string());
        debug!(%object_type, %name, "trying to create object");

        match self.create_object(object_type, object).await {
            Ok(_) => Ok(Reconciled::Created),
            Err(e) if options.overwrite => {
                debug!(%name, error = %e, "Overwrite enabled. Updating object");
                self.update_object(object_type, object).await?;
                Ok(Reconciled::Updated)
            }
            Err(e) => Err(e),
        }
    }

    /// Imports objects from a list file, or with `split` from every `*.json`
    /// file of the directory at `path`.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn import_objects(
        &self,
        object_type: ObjectType,
        path: impl AsRef<Path>,
        options: ImportOptions,
        split: bool,
    ) -> Result<ImportReport> {
        let path = path.as_ref();
        let mut report = ImportReport::default();

        if split {
            for file in json_files(path)? {
                debug!(file = %file.display(), "importing file");
                let outcome = self
                    .import_objects_split(object_type, None, &file, options)
                    .await;
                report.record(file.display().to_string(), outcome);
            }
        } else {
            let data = read_json(path)?;
            for object in object_type.extract_objects_lenient(&data) {
                let label = object_type
                    .object_name(&object)
                    .unwrap_or_else(|| "unknown".to_string());
                let outcome = self.import_object(object_type, &object, options).await;
                report.record(label, outcome);
            }
        }

        info!(%object_type, %report, "Import objects completed");
        Ok(report)
    }

    /// Imports one type from `path`, or every importable type from files
    /// named after the type below the `path` prefix.
    ///
    /// With [`ImportTarget::All`] the sources are `{path}{type-stem}.json`,
    /// or the directories `{path}{type}` with `split`. Missing sources are
    /// skipped.
    #[instrument(skip(self))]
    pub async fn config_import(
        &self,
        target: ImportTarget,
        path: &str,
        options: ImportOptions,
        split: bool,
    ) -> Result<ImportReport> {
        let types = match target {
            ImportTarget::One(object_type) => {
                return self.import_objects(object_type, path, options, split).await
            }
            ImportTarget::All => ObjectType::IMPORTABLE,
        };

        let mut report = ImportReport::default();
        for object_type in types {
            let source = if split {
                PathBuf::from(format!("{path}{}", object_type.api_path()))
            } else {
                PathBuf::from(format!("{path}{}.json", object_type.file_stem()))
            };
            if !source.exists() {
                warn!(%object_type, source = %source.display(), "import source not found");
                continue;
            }
            report.merge(self.import_objects(object_type, &source, options, split).await?);
        }
        info!(%report, "Config import completed");
        Ok(report)
    }
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*.json",
        glob::Pattern::escape(&dir.display().to_string())
    );
    let entries = glob::glob(&pattern).map_err(|e| OpenObserveError::InvalidInput {
        message: format!("invalid import directory '{}': {e}", dir.display()),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(file) if file.is_file() => files.push(file),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "unreadable import file"),
        }
    }
    files.sort();
    Ok(files)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
