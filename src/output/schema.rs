//! Dataset to Arrow conversion
//!
//! Builds Arrow RecordBatches from tabular datasets, either conformed to a
//! declared warehouse schema or with types inferred from the values, and
//! turns batches back into rows.

use crate::error::{Error, Result};
use crate::normalize::{format_canonical, parse_datetime_value, TabularDataset};
use crate::types::{JsonObject, JsonValue};
use crate::warehouse::{FieldMode, FieldType, TableSchema};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float64Array, Int64Array, ListArray, StringArray,
    TimestampMicrosecondArray,
};
use arrow::buffer::OffsetBuffer;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use std::sync::Arc;
use tracing::debug;

const TIMESTAMP_TYPE: DataType = DataType::Timestamp(TimeUnit::Microsecond, None);

/// Convert a dataset into a single RecordBatch
///
/// With a declared schema the batch follows it exactly: schema column order,
/// missing columns all-null, extra columns dropped. Without one, column types
/// are inferred from the values.
pub fn dataset_to_batch(dataset: &TabularDataset, schema: Option<&TableSchema>) -> Result<RecordBatch> {
    match schema {
        Some(schema) => conform_to_schema(dataset, schema),
        None => infer_batch(dataset),
    }
}

/// Arrow schema equivalent of a declared schema
pub fn arrow_schema(schema: &TableSchema) -> Schema {
    let fields: Vec<Field> = schema
        .fields
        .iter()
        .map(|f| {
            Field::new(
                &f.name,
                arrow_type(f.field_type),
                f.mode == FieldMode::Nullable,
            )
        })
        .collect();
    Schema::new(fields)
}

fn arrow_type(field_type: FieldType) -> DataType {
    match field_type {
        FieldType::String => DataType::Utf8,
        FieldType::Float => DataType::Float64,
        FieldType::Integer => DataType::Int64,
        FieldType::Boolean => DataType::Boolean,
        FieldType::Timestamp => TIMESTAMP_TYPE,
    }
}

// ============================================================================
// Conformed Conversion
// ============================================================================

fn conform_to_schema(dataset: &TabularDataset, schema: &TableSchema) -> Result<RecordBatch> {
    let extra: Vec<&str> = dataset
        .columns
        .iter()
        .map(String::as_str)
        .filter(|c| schema.field(c).is_none())
        .collect();
    if !extra.is_empty() {
        debug!(dataset = %dataset.name, columns = ?extra, "Dropping columns not in schema");
    }

    let arrow_schema = Arc::new(arrow_schema(schema));
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.len());
    for field in &schema.fields {
        let values: Vec<&JsonValue> = dataset.column_values(&field.name).collect();
        columns.push(coerce_array(&values, field.field_type));
    }

    new_batch(arrow_schema, columns)
}

/// Build a column of a declared type, coercing what can be coerced
fn coerce_array(values: &[&JsonValue], field_type: FieldType) -> ArrayRef {
    match field_type {
        FieldType::String => Arc::new(
            values
                .iter()
                .map(|v| json_to_text(v))
                .collect::<StringArray>(),
        ),
        FieldType::Float => Arc::new(
            values
                .iter()
                .map(|v| json_to_f64(v))
                .collect::<Float64Array>(),
        ),
        FieldType::Integer => Arc::new(
            values
                .iter()
                .map(|v| json_to_i64(v))
                .collect::<Int64Array>(),
        ),
        FieldType::Boolean => Arc::new(
            values
                .iter()
                .map(|v| json_to_bool(v))
                .collect::<BooleanArray>(),
        ),
        FieldType::Timestamp => Arc::new(timestamp_array(values)),
    }
}

fn json_to_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[allow(clippy::cast_precision_loss)]
fn json_to_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64().or_else(|| n.as_i64().map(|i| i as f64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn json_to_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_to_bool(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn timestamp_array(values: &[&JsonValue]) -> TimestampMicrosecondArray {
    values
        .iter()
        .map(|v| parse_datetime_value(v).map(|dt| dt.and_utc().timestamp_micros()))
        .collect()
}

// ============================================================================
// Inferred Conversion
// ============================================================================

fn infer_batch(dataset: &TabularDataset) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(dataset.num_columns());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(dataset.num_columns());

    for name in &dataset.columns {
        let values: Vec<&JsonValue> = dataset.column_values(name).collect();
        let data_type = if dataset.timestamp_columns.contains(name) {
            TIMESTAMP_TYPE
        } else {
            infer_column_type(&values)
        };
        columns.push(build_array(&values, &data_type)?);
        fields.push(Field::new(name, data_type, true));
    }

    new_batch(Arc::new(Schema::new(fields)), columns)
}

fn infer_column_type(values: &[&JsonValue]) -> DataType {
    let merged = values
        .iter()
        .map(|v| infer_type(v))
        .fold(DataType::Null, |acc, t| merge_types(&acc, &t));
    // An all-null column is stored as text
    match merged {
        DataType::Null => DataType::Utf8,
        DataType::List(item) if item.data_type() == &DataType::Null => {
            DataType::List(Arc::new(Field::new("item", DataType::Utf8, true)))
        }
        other => other,
    }
}

/// Infer Arrow DataType from a JSON value
fn infer_type(value: &JsonValue) -> DataType {
    match value {
        JsonValue::Null => DataType::Null,
        JsonValue::Bool(_) => DataType::Boolean,
        JsonValue::Number(n) => {
            if n.is_i64() {
                DataType::Int64
            } else {
                DataType::Float64
            }
        }
        JsonValue::String(_) => DataType::Utf8,
        JsonValue::Array(arr) => {
            let element_type = arr
                .iter()
                .map(infer_type)
                .fold(DataType::Null, |acc, t| merge_types(&acc, &t));
            match element_type {
                // Nested containers are kept as JSON text
                DataType::List(_) | DataType::Utf8 if has_containers(arr) => DataType::Utf8,
                element => DataType::List(Arc::new(Field::new("item", element, true))),
            }
        }
        JsonValue::Object(_) => DataType::Utf8,
    }
}

fn has_containers(arr: &[JsonValue]) -> bool {
    arr.iter().any(|v| v.is_array() || v.is_object())
}

/// Merge two data types into a compatible type
fn merge_types(type1: &DataType, type2: &DataType) -> DataType {
    match (type1, type2) {
        (a, b) if a == b => a.clone(),

        (DataType::Null, other) | (other, DataType::Null) => other.clone(),

        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }

        (DataType::List(a), DataType::List(b)) => {
            match merge_types(a.data_type(), b.data_type()) {
                DataType::List(_) => DataType::Utf8,
                item => DataType::List(Arc::new(Field::new("item", item, true))),
            }
        }

        // Anything else falls back to text
        _ => DataType::Utf8,
    }
}

/// Build an Arrow array from JSON values
fn build_array(values: &[&JsonValue], data_type: &DataType) -> Result<ArrayRef> {
    match data_type {
        DataType::Boolean => Ok(coerce_array(values, FieldType::Boolean)),
        DataType::Int64 => Ok(coerce_array(values, FieldType::Integer)),
        DataType::Float64 => Ok(coerce_array(values, FieldType::Float)),
        DataType::Timestamp(_, _) => Ok(coerce_array(values, FieldType::Timestamp)),
        DataType::List(field) => build_list_array(values, field),
        _ => Ok(coerce_array(values, FieldType::String)),
    }
}

/// Build a list array from JSON arrays
fn build_list_array(values: &[&JsonValue], field: &Arc<Field>) -> Result<ArrayRef> {
    let mut all_items: Vec<&JsonValue> = Vec::new();
    let mut offsets: Vec<i32> = vec![0];
    let mut validity: Vec<bool> = Vec::with_capacity(values.len());

    for value in values {
        if let JsonValue::Array(arr) = value {
            all_items.extend(arr.iter());
            validity.push(true);
        } else {
            validity.push(false);
        }
        let offset = i32::try_from(all_items.len())
            .map_err(|_| Error::output("Array too large for i32 offset"))?;
        offsets.push(offset);
    }

    let items_array = build_array(&all_items, field.data_type())?;
    let offset_buffer = OffsetBuffer::new(offsets.into());

    let list_array = ListArray::try_new(
        Arc::clone(field),
        offset_buffer,
        items_array,
        Some(validity.into()),
    )?;
    Ok(Arc::new(list_array))
}

fn new_batch(schema: Arc<Schema>, columns: Vec<ArrayRef>) -> Result<RecordBatch> {
    RecordBatch::try_new(schema, columns)
        .map_err(|e| Error::output(format!("Failed to create RecordBatch: {e}")))
}

// ============================================================================
// Batch to Rows
// ============================================================================

/// Convert RecordBatches back into rows
///
/// Null cells become JSON `null`; timestamps render in canonical form.
pub fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<JsonObject>> {
    let mut rows = Vec::new();
    for batch in batches {
        let schema = batch.schema();
        for row_idx in 0..batch.num_rows() {
            let mut row = JsonObject::new();
            for (col_idx, field) in schema.fields().iter().enumerate() {
                let value = array_value_to_json(batch.column(col_idx).as_ref(), row_idx)?;
                row.insert(field.name().clone(), value);
            }
            rows.push(row);
        }
    }
    Ok(rows)
}

fn downcast<'a, T: 'static>(array: &'a dyn Array, name: &str) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::output(format!("Failed to downcast to {name}")))
}

/// Convert a single array element to JSON
fn array_value_to_json(array: &dyn Array, row: usize) -> Result<JsonValue> {
    if array.is_null(row) {
        return Ok(JsonValue::Null);
    }

    match array.data_type() {
        DataType::Null => Ok(JsonValue::Null),

        DataType::Boolean => {
            let arr = downcast::<BooleanArray>(array, "BooleanArray")?;
            Ok(JsonValue::Bool(arr.value(row)))
        }

        DataType::Int64 => {
            let arr = downcast::<Int64Array>(array, "Int64Array")?;
            Ok(JsonValue::Number(arr.value(row).into()))
        }

        DataType::Float64 => {
            let arr = downcast::<Float64Array>(array, "Float64Array")?;
            Ok(serde_json::Number::from_f64(arr.value(row)).map_or(JsonValue::Null, JsonValue::Number))
        }

        DataType::Utf8 => {
            let arr = downcast::<StringArray>(array, "StringArray")?;
            Ok(JsonValue::String(arr.value(row).to_string()))
        }

        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            let arr = downcast::<TimestampMicrosecondArray>(array, "TimestampMicrosecondArray")?;
            Ok(DateTime::from_timestamp_micros(arr.value(row))
                .map_or(JsonValue::Null, |dt| {
                    JsonValue::String(format_canonical(&dt.naive_utc()))
                }))
        }

        DataType::List(_) => {
            let arr = downcast::<ListArray>(array, "ListArray")?;
            let values = arr.value(row);
            let mut items = Vec::with_capacity(values.len());
            for i in 0..values.len() {
                items.push(array_value_to_json(values.as_ref(), i)?);
            }
            Ok(JsonValue::Array(items))
        }

        other => Err(Error::output(format!("Unsupported column type {other:?}"))),
    }
}
