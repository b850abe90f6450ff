//! Binding raw JSON into records.
//!
//! Scalars are coerced permissively (boolean words, comma-decimal floats,
//! stringified numbers), nested kinds are bound recursively, and the
//! declared `content` field may be bound as the schema's alternate element
//! type. Unknown keys are skipped with a warning.
//!
//! Float strings follow one fixed heuristic: a dot followed by groups of
//! exactly three digits is a thousands separator and a comma is the decimal
//! mark (`"1.234,56"` is 1234.56, `"1.234"` is 1234); a single comma between
//! digits is a decimal mark (`"12,5"`); anything else is parsed as written.

use crate::collection::Collection;
use crate::record::Record;
use crate::schema::{FieldKind, Schema};
use crate::value::{FieldValue, NamedValue};
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, error, warn};

static THOUSANDS_NOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(\.\d{3})*(,\d+)?$").expect("valid regex"));

static COMMA_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+,\d+$").expect("valid regex"));

/// Binds `raw` against `schema`.
///
/// `null` yields a default-initialized record (see [`initialize`]); a map is
/// bound field by field; anything else is a binding error.
pub fn bind(schema: &'static Schema, raw: &Value) -> Result<Record> {
    if raw.is_null() {
        return Ok(initialize(schema));
    }

    let mut record = Record::empty(schema);
    bind_into(&mut record, raw)?;
    Ok(record)
}

/// Binds the keys of `raw` into an existing record. Fields not mentioned in
/// `raw` keep their current value.
pub fn bind_into(record: &mut Record, raw: &Value) -> Result<()> {
    let schema = record.schema();
    let map = raw.as_object().ok_or_else(|| {
        Error::binding(schema.name, schema.name, "data must be a map")
    })?;

    for (key, value) in map {
        let Some(index) = schema.index_of(key) else {
            warn!(entity = schema.name, field = %key, "Skipping undeclared field");
            continue;
        };
        let field = &schema.fields[index];
        let kind = schema.binding_kind(field);
        let bound = bind_kind(field.name, kind, field.nullable, value)?;
        // `None` leaves the previous value in place.
        if bound.is_some() {
            record.put(index, bound);
        }
    }

    Ok(())
}

/// A record with defaults for a data-less construction: enums take their
/// first case, non-nullable entities, values and collections an empty
/// instance, nullable fields null. Non-nullable scalars stay unset.
pub fn initialize(schema: &'static Schema) -> Record {
    let mut record = Record::empty(schema);

    for (index, field) in schema.fields.iter().enumerate() {
        let default = match schema.binding_kind(field) {
            FieldKind::Enum(enum_schema) => enum_schema.first().map(FieldValue::Enum),
            _ if field.nullable => Some(FieldValue::Null),
            FieldKind::Entity(nested) => Some(FieldValue::Entity(initialize(nested))),
            FieldKind::Collection(nested) => {
                Some(FieldValue::Collection(Collection::empty(nested)))
            }
            FieldKind::Value(value_schema) => match NamedValue::new(value_schema, Value::Null) {
                Ok(value) => Some(FieldValue::Value(value)),
                Err(e) => {
                    error!(
                        entity = schema.name,
                        field = field.name,
                        error = %e,
                        "Failed to initialize {}", value_schema.name
                    );
                    None
                }
            },
            _ => None,
        };
        record.put(index, default);
    }

    record
}

/// Binds one raw value as `kind`.
///
/// `Ok(None)` means the value was rejected in a diagnostic-only way (an
/// unknown enum backing value) and the target should stay as it is.
pub fn bind_kind(
    name: &str,
    kind: FieldKind,
    nullable: bool,
    raw: &Value,
) -> Result<Option<FieldValue>> {
    if let FieldKind::Enum(enum_schema) = kind {
        if raw.is_null() && nullable {
            return Ok(Some(FieldValue::Null));
        }
        return Ok(match enum_schema.from_backing(raw) {
            Some(value) => Some(FieldValue::Enum(value)),
            None => {
                error!(
                    field = name,
                    value = %raw,
                    "Failed to instantiate {}: no case with this backing value", enum_schema.name
                );
                None
            }
        });
    }

    // A required value field holds a named value even without payload, as
    // `initialize` leaves it, so its serialized `null` binds back to one.
    if let (FieldKind::Value(schema), Value::Null, false) = (kind, raw, nullable) {
        return Ok(Some(FieldValue::Value(NamedValue::new(schema, Value::Null)?)));
    }

    if raw.is_null() {
        return if nullable {
            Ok(Some(FieldValue::Null))
        } else {
            Err(Error::binding(name, kind.type_name(), "field cannot be null"))
        };
    }

    let value = match kind {
        FieldKind::Bool | FieldKind::Int | FieldKind::Float => {
            if raw.is_array() || raw.is_object() {
                return Err(unsupported(name, kind, raw));
            }
            match coerce_number_like(kind, raw) {
                Some(value) => value,
                None if nullable => {
                    error!(field = name, value = %raw, "Invalid {} value", kind.type_name());
                    FieldValue::Null
                }
                None => {
                    return Err(Error::binding(
                        name,
                        kind.type_name(),
                        format!("invalid value {}", raw),
                    ))
                }
            }
        }
        FieldKind::Str => match raw {
            Value::String(s) => FieldValue::Str(s.clone()),
            Value::Bool(_) | Value::Number(_) => {
                debug!(field = name, value = %raw, "Stringifying scalar");
                FieldValue::Str(raw.to_string())
            }
            _ => return Err(unsupported(name, kind, raw)),
        },
        FieldKind::DateTime => match raw.as_str().and_then(parse_datetime) {
            Some(dt) => FieldValue::DateTime(dt),
            None => {
                return Err(Error::binding(
                    name,
                    kind.type_name(),
                    format!("unrecognized date-time {}", raw),
                ))
            }
        },
        FieldKind::Value(schema) => FieldValue::Value(NamedValue::new(schema, raw.clone())?),
        FieldKind::Entity(schema) => {
            FieldValue::Entity(bind(schema, raw).map_err(|e| nest(name, e))?)
        }
        FieldKind::Collection(schema) => {
            FieldValue::Collection(Collection::from_value(schema, raw).map_err(|e| nest(name, e))?)
        }
        FieldKind::Enum(_) => unreachable!("enums are bound above"),
    };

    Ok(Some(value))
}

fn unsupported(name: &str, kind: FieldKind, raw: &Value) -> Error {
    let shape = match raw {
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
        _ => "this value",
    };
    Error::binding(name, kind.type_name(), format!("cannot bind {}", shape))
}

// Prefixes nested binding errors with the enclosing field, giving paths
// like `address.zip` or `lines[2].amount`.
pub(crate) fn nest(prefix: &str, error: Error) -> Error {
    match error {
        Error::Binding {
            field,
            target,
            message,
        } => {
            let field = if field.starts_with('[') {
                format!("{}{}", prefix, field)
            } else {
                format!("{}.{}", prefix, field)
            };
            Error::Binding {
                field,
                target,
                message,
            }
        }
        other => other,
    }
}

fn coerce_number_like(kind: FieldKind, raw: &Value) -> Option<FieldValue> {
    match kind {
        FieldKind::Bool => coerce_bool(raw).map(FieldValue::Bool),
        FieldKind::Int => coerce_int(raw).map(FieldValue::Int),
        FieldKind::Float => coerce_float(raw).map(FieldValue::Float),
        _ => None,
    }
}

fn coerce_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 1.0 => Some(true),
            Some(f) if f == 0.0 => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Some(true),
            "0" | "false" | "off" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Bool(true) => Some(1),
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_float(raw: &Value) -> Option<f64> {
    match raw {
        Value::Bool(true) => Some(1.0),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => normalize_decimal(s.trim()).parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn normalize_decimal(s: &str) -> String {
    if THOUSANDS_NOTATION.is_match(s) {
        s.replace('.', "").replace(',', ".")
    } else if COMMA_DECIMAL.is_match(s) {
        s.replace(',', ".")
    } else {
        s.to_string()
    }
}

/// Parses RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or `YYYY-MM-DD` (UTC
/// midnight).
pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}
