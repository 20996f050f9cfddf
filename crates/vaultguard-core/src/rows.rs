//! Conversion of Arrow result rows into JSON-safe mappings.
//!
//! Nulls, booleans, integers, finite floats and strings keep their JSON type.
//! Everything else (dates, timestamps, decimals, nested types) is rendered
//! with Arrow's display formatter and stored as a string.

use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, UInt8Type,
    UInt16Type, UInt32Type, UInt64Type,
};
use arrow::util::display::array_value_to_string;
use arrow_array::{
    Array, ArrowPrimitiveType, BooleanArray, LargeStringArray, PrimitiveArray, StringArray,
};
use serde_json::{Number, Value};

use crate::errors::RowConversionError;
use crate::types::{Batch, Batches, RowMap};

/// Convert every row of every batch, in order. A failing row does not stop
/// the others.
pub fn batches_to_rows(batches: &Batches) -> Vec<Result<RowMap, RowConversionError>> {
    batches
        .iter()
        .flat_map(|batch| (0..batch.num_rows()).map(move |row| row_to_map(batch, row)))
        .collect()
}

pub fn row_to_map(batch: &Batch, row: usize) -> Result<RowMap, RowConversionError> {
    let schema = batch.schema();
    let mut map = RowMap::new();
    for (index, field) in schema.fields().iter().enumerate() {
        let array = batch.column(index);
        let value = cell_to_value(field.name(), array.as_ref(), row)?;
        map.insert(field.name().clone(), value);
    }
    Ok(map)
}

fn cell_to_value(column: &str, array: &dyn Array, row: usize) -> Result<Value, RowConversionError> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match array.data_type() {
        DataType::Null => Value::Null,
        DataType::Boolean => {
            let values = downcast::<BooleanArray>(column, array)?;
            Value::Bool(values.value(row))
        }
        DataType::Int8 => integer::<Int8Type>(column, array, row)?,
        DataType::Int16 => integer::<Int16Type>(column, array, row)?,
        DataType::Int32 => integer::<Int32Type>(column, array, row)?,
        DataType::Int64 => integer::<Int64Type>(column, array, row)?,
        DataType::UInt8 => integer::<UInt8Type>(column, array, row)?,
        DataType::UInt16 => integer::<UInt16Type>(column, array, row)?,
        DataType::UInt32 => integer::<UInt32Type>(column, array, row)?,
        DataType::UInt64 => {
            let values = downcast::<PrimitiveArray<UInt64Type>>(column, array)?;
            Value::Number(Number::from(values.value(row)))
        }
        DataType::Float32 => {
            let values = downcast::<PrimitiveArray<Float32Type>>(column, array)?;
            float(values.value(row) as f64)
        }
        DataType::Float64 => {
            let values = downcast::<PrimitiveArray<Float64Type>>(column, array)?;
            float(values.value(row))
        }
        DataType::Utf8 => {
            let values = downcast::<StringArray>(column, array)?;
            Value::String(values.value(row).to_string())
        }
        DataType::LargeUtf8 => {
            let values = downcast::<LargeStringArray>(column, array)?;
            Value::String(values.value(row).to_string())
        }
        _ => Value::String(array_value_to_string(array, row)?),
    };
    Ok(value)
}

fn downcast<'a, A: Array + 'static>(
    column: &str,
    array: &'a dyn Array,
) -> Result<&'a A, RowConversionError> {
    array
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| RowConversionError::UnsupportedValue {
            column: column.to_string(),
            data_type: array.data_type().clone(),
        })
}

fn integer<T>(column: &str, array: &dyn Array, row: usize) -> Result<Value, RowConversionError>
where
    T: ArrowPrimitiveType,
    T::Native: Into<i64>,
{
    let values = downcast::<PrimitiveArray<T>>(column, array)?;
    let value: i64 = values.value(row).into();
    Ok(Value::Number(Number::from(value)))
}

/// NaN and infinities are not valid JSON numbers.
fn float(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(value.to_string()))
}
