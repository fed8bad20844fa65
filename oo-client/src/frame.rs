//! Tabular views of search hits and object lists.
//!
//! Records are normalized the way a dataframe library would: nested objects
//! are flattened into dotted column names, remaining arrays and objects are
//! kept as JSON text, and the Arrow schema is inferred from the rows.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::compute::{cast_with_options, CastOptions};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::json::reader::infer_json_schema_from_iterator;
use arrow::json::ReaderBuilder;
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use tracing::{instrument, warn};

use crate::client::OpenObserveClient;
use crate::convert::{flatten, Record, KEY_SEPARATOR};
use crate::error::{OpenObserveError, Result};
use crate::objects::ObjectType;
use crate::search::SearchQuery;

/// Column OpenObserve stores the event time in.
pub const TIMESTAMP_COLUMN: &str = "_timestamp";

fn normalize_row(record: &Record) -> Value {
    let row = flatten(record, KEY_SEPARATOR)
        .into_iter()
        .map(|(key, value)| match value {
            Value::Array(_) | Value::Object(_) => (key, Value::String(value.to_string())),
            scalar => (key, scalar),
        })
        .collect();
    Value::Object(row)
}

/// Builds a single record batch from JSON records.
///
/// Columns with only nulls are typed as Utf8 and columns mixing scalar types
/// are coerced to strings.
pub fn records_to_frame(records: &[Record]) -> Result<RecordBatch> {
    let rows: Vec<Value> = records.iter().map(normalize_row).collect();

    let inferred = infer_json_schema_from_iterator(rows.iter().map(Ok))?;
    let fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|field| match field.data_type() {
            DataType::Null => Field::new(field.name(), DataType::Utf8, true),
            data_type => Field::new(field.name(), data_type.clone(), true),
        })
        .collect();
    let schema = Arc::new(Schema::new(fields));

    if rows.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    let mut decoder = ReaderBuilder::new(schema.clone())
        .with_batch_size(rows.len())
        .with_coerce_primitive(true)
        .build_decoder()?;
    decoder.serialize(&rows)?;
    Ok(decoder
        .flush()?
        .unwrap_or_else(|| RecordBatch::new_empty(schema)))
}

/// Casts timestamp columns to Arrow timestamp types.
///
/// Columns named in `columns` are cast from Int64 microseconds or from
/// RFC 3339 strings. With `auto`, Int64 columns whose name contains `time`
/// are cast as well. A column whose values do not convert is left unchanged.
pub fn cast_timestamp_columns(
    batch: &RecordBatch,
    columns: &[String],
    auto: bool,
) -> Result<RecordBatch> {
    if batch.num_columns() == 0 {
        return Ok(batch.clone());
    }

    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut arrays = Vec::with_capacity(batch.num_columns());

    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        let explicit = columns.iter().any(|c| c == field.name());
        let target = match field.data_type() {
            DataType::Int64 if explicit || (auto && field.name().contains("time")) => {
                Some(DataType::Timestamp(TimeUnit::Microsecond, None))
            }
            DataType::Utf8 if explicit => Some(DataType::Timestamp(
                TimeUnit::Nanosecond,
                Some("+00:00".into()),
            )),
            _ => None,
        };

        let converted = target.and_then(|target| match cast_with_options(array, &target, &options) {
            Ok(cast) => Some((target, cast)),
            Err(e) => {
                warn!(column = %field.name(), error = %e, "could not convert timestamp column");
                None
            }
        });

        match converted {
            Some((data_type, cast)) => {
                fields.push(Field::new(field.name(), data_type, true));
                arrays.push(cast);
            }
            None => {
                fields.push(field.as_ref().clone());
                arrays.push(array.clone());
            }
        }
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Writes a batch as CSV with a header row.
pub fn write_csv(batch: &RecordBatch, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| OpenObserveError::io(path, e))?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch)?;
    Ok(())
}

impl OpenObserveClient {
    /// Runs a search and returns the hits as a record batch.
    ///
    /// Timestamp conversion happens on the Arrow columns: when explicit
    /// columns are requested `_timestamp` is converted along with them.
    #[instrument(skip(self, query), fields(sql = %query.sql()))]
    pub async fn search_frame(&self, query: &SearchQuery) -> Result<RecordBatch> {
        let hits = self.search(&query.without_conversion()).await?;
        let frame = records_to_frame(&hits)?;

        match query.columns() {
            Some(columns) => {
                let mut columns = columns.to_vec();
                columns.push(TIMESTAMP_COLUMN.to_string());
                cast_timestamp_columns(&frame, &columns, query.converts_timestamps())
            }
            None if query.converts_timestamps() => cast_timestamp_columns(&frame, &[], true),
            None => Ok(frame),
        }
    }

    /// Lists objects of a type as a record batch.
    #[instrument(skip(self))]
    pub async fn list_objects_frame(&self, object_type: ObjectType) -> Result<RecordBatch> {
        let response = self.list_objects(object_type).await?;
        let objects = object_type.extract_objects(&response)?;
        records_to_frame(&objects)
    }
}
