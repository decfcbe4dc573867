//! Per-field deserializers for loosely typed model JSON.
//!
//! Each helper reads one field as a [`serde_json::Value`] and degrades a
//! type mismatch to "absent" (or a documented substitute) with a warning.
//! A bad field never rejects the rest of the model.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Index written for a face entry that is not an integral number.
/// Negative indices are dropped by the stage builder.
pub const INVALID_INDEX: i64 = -1;

pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => {
            log::warn!("Ignoring non-string value {}", other);
            None
        }
    })
}

/// Strings pass through. Anything else becomes a string that no color
/// parser accepts, so it falls back like any other malformed color.
pub fn opt_color<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(format!("{:?}", other)),
    })
}

/// Numbers and numeric strings (`"2"`, `" 0.5 "`).
pub fn opt_f32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f32>, D::Error> {
    let value = Value::deserialize(d)?;
    let number = match &value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    };
    let number = number.filter(|f| f.is_finite());
    if number.is_none() {
        log::warn!("Ignoring non-numeric value {}", value);
    }
    Ok(number)
}

pub fn opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => None,
        Value::Bool(b) => Some(b),
        other => {
            log::warn!("Ignoring non-boolean value {}", other);
            None
        }
    })
}

/// A switch that is on only for a literal `true`.
pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(opt_bool(d)?.unwrap_or(false))
}

/// A list of coordinate tuples. Non-numeric components become 0 and a
/// non-array entry becomes an empty tuple, so point indices stay aligned.
pub fn opt_points<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<Vec<f32>>>, D::Error> {
    let Some(entries) = array_or_none(Value::deserialize(d)?) else {
        return Ok(None);
    };

    let mut coerced = 0usize;
    let points = entries
        .into_iter()
        .map(|entry| match entry {
            Value::Array(components) => components
                .iter()
                .map(|c| {
                    c.as_f64().map(|f| f as f32).unwrap_or_else(|| {
                        coerced += 1;
                        0.0
                    })
                })
                .collect(),
            _ => {
                coerced += 1;
                Vec::new()
            }
        })
        .collect();

    if coerced > 0 {
        log::warn!("Coerced {} malformed coordinate value(s) to 0", coerced);
    }
    Ok(Some(points))
}

/// A list of index tuples. Integral floats (`2.0`) are accepted; any other
/// entry becomes [`INVALID_INDEX`].
pub fn opt_faces<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<Vec<i64>>>, D::Error> {
    let Some(entries) = array_or_none(Value::deserialize(d)?) else {
        return Ok(None);
    };

    let mut invalid = 0usize;
    let faces = entries
        .into_iter()
        .map(|entry| match entry {
            Value::Array(indices) => indices
                .iter()
                .map(|i| {
                    integral(i).unwrap_or_else(|| {
                        invalid += 1;
                        INVALID_INDEX
                    })
                })
                .collect(),
            _ => {
                invalid += 1;
                Vec::new()
            }
        })
        .collect();

    if invalid > 0 {
        log::warn!("Found {} non-integral face index value(s)", invalid);
    }
    Ok(Some(faces))
}

/// A nested record. Anything but a JSON object is treated as absent.
pub fn opt_object<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(d)? {
        Value::Null => None,
        value @ Value::Object(_) => record(value),
        other => {
            log::warn!("Ignoring non-object value {}", other);
            None
        }
    })
}

/// A list of records. Entries that are not objects are skipped.
pub fn opt_objects<'de, D, T>(d: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Some(entries) = array_or_none(Value::deserialize(d)?) else {
        return Ok(None);
    };

    let total = entries.len();
    let records: Vec<T> = entries
        .into_iter()
        .filter(Value::is_object)
        .filter_map(record)
        .collect();
    if records.len() < total {
        log::warn!("Skipped {} malformed list entr(ies)", total - records.len());
    }
    Ok(Some(records))
}

fn record<T: DeserializeOwned>(value: Value) -> Option<T> {
    serde_json::from_value(value)
        .map_err(|err| log::warn!("Ignoring malformed record: {}", err))
        .ok()
}

fn array_or_none(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Null => None,
        Value::Array(entries) => Some(entries),
        other => {
            log::warn!("Ignoring non-array value {}", other);
            None
        }
    }
}

fn integral(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let f = value.as_f64()?;
    // i64::MAX as f64 rounds up, so the upper bound is exclusive
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then(|| f as i64)
}
