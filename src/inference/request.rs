//! Single-record request contract

use crate::error::{PredictorError, Result};
use crate::preprocessing::{FieldValue, Record};
use serde_json::Value;

/// Placeholder for an absent categorical field
pub const MISSING_CATEGORY: &str = "Unknown";

/// Turns a JSON object into a complete [`Record`] for the trained schema.
///
/// Absent numeric fields become 0, absent categorical fields become
/// `"Unknown"`. Numbers sent as strings are parsed; unparseable strings and
/// `null` are left missing for the imputer.
#[derive(Debug, Clone)]
pub struct PredictionRequest<'a> {
    numeric: &'a [String],
    categorical: &'a [String],
}

impl<'a> PredictionRequest<'a> {
    pub fn new(numeric: &'a [String], categorical: &'a [String]) -> Self {
        Self { numeric, categorical }
    }

    pub fn into_record(&self, payload: &Value) -> Result<Record> {
        let object = match payload {
            Value::Object(map) if !map.is_empty() => map,
            _ => {
                return Err(PredictorError::InvalidInput(
                    "No input data provided".to_string(),
                ))
            }
        };

        let mut record = Record::new();
        for field in self.numeric {
            let value = match object.get(field) {
                None => FieldValue::Number(0.0),
                Some(v) => numeric_value(v),
            };
            record.insert(field.clone(), value);
        }
        for field in self.categorical {
            let value = match object.get(field) {
                None => FieldValue::Text(MISSING_CATEGORY.to_string()),
                Some(v) => text_value(v),
            };
            record.insert(field.clone(), value);
        }
        Ok(record)
    }

    /// Convenience for one-off conversions
    pub fn from_json(payload: &Value, numeric: &'a [String], categorical: &'a [String]) -> Result<Record> {
        Self::new(numeric, categorical).into_record(payload)
    }
}

fn numeric_value(value: &Value) -> FieldValue {
    match value {
        Value::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or(FieldValue::Missing),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Missing),
        Value::Bool(b) => FieldValue::Number(if *b { 1.0 } else { 0.0 }),
        _ => FieldValue::Missing,
    }
}

fn text_value(value: &Value) -> FieldValue {
    match value {
        Value::String(s) => FieldValue::Text(s.clone()),
        Value::Number(n) => FieldValue::Text(n.to_string()),
        Value::Bool(b) => FieldValue::Text(b.to_string()),
        _ => FieldValue::Missing,
    }
}
