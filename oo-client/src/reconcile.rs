//! Name-based reconciliation on top of the id-based CRUD endpoints.
//!
//! The API addresses objects by id, while exported configuration is usually
//! managed by name. These helpers list the current objects, match by name and
//! then create, update or delete.

use serde_json::Value;
use tracing::{debug, info, instrument, trace};

use crate::client::OpenObserveClient;
use crate::convert::Record;
use crate::error::{OpenObserveError, Result};
use crate::objects::ObjectType;

/// What a create-or-update call ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Created,
    Updated,
    /// An object with the same name exists and overwriting was not requested.
    Skipped,
}

impl OpenObserveClient {
    /// Creates `object`, or updates the existing object with the same name.
    ///
    /// Names are compared after trimming whitespace. Without `overwrite` an
    /// existing match is left untouched and [`Reconciled::Skipped`] returned.
    #[instrument(skip(self, object))]
    pub async fn create_update_object_by_name(
        &self,
        object_type: ObjectType,
        object: &Record,
        overwrite: bool,
    ) -> Result<Reconciled> {
        let name = object_type
            .object_name(object)
            .ok_or_else(|| OpenObserveError::MissingField {
                object_type: object_type.to_string(),
                field: object_type.name_key().to_string(),
            })?;

        let current = self.list_objects(object_type).await?;
        let existing = object_type.extract_objects(&current)?;
        trace!(count = existing.len(), "objects listed for name match");

        let matching = existing.iter().find(|candidate| {
            object_type
                .object_name(candidate)
                .is_some_and(|candidate_name| candidate_name.trim() == name.trim())
        });

        let Some(matching) = matching else {
            self.create_object(object_type, object).await?;
            info!(%name, "Create/update by name created 1 object(s)");
            return Ok(Reconciled::Created);
        };

        if !overwrite {
            debug!(%name, "matching object but overwrite is false");
            return Ok(Reconciled::Skipped);
        }

        let mut payload = object.clone();
        if let Some(id) = object_type.object_id(matching) {
            payload.insert(object_type.id_key().to_string(), Value::String(id));
        }
        debug!(%name, "Create/update by name matching object");
        self.update_object(object_type, &payload).await?;
        info!(%name, "Create/update by name updated 1 object(s)");
        Ok(Reconciled::Updated)
    }

    /// Deletes every object whose name equals `name`; returns how many.
    #[instrument(skip(self))]
    pub async fn delete_object_by_name(&self, object_type: ObjectType, name: &str) -> Result<usize> {
        let current = self.list_objects(object_type).await?;
        let existing = object_type.extract_objects(&current)?;

        let mut deleted = 0;
        for candidate in &existing {
            if object_type.object_name(candidate).as_deref() != Some(name) {
                continue;
            }
            let Some(id) = object_type.object_id(candidate) else {
                continue;
            };
            debug!(%id, "Delete by name matching object");
            self.delete_object(object_type, &id).await?;
            deleted += 1;
        }
        info!(deleted, "Delete by name deleted object(s)");
        Ok(deleted)
    }
}
