//! Bound values: the tagged union stored per field, enum cases and named
//! scalar values.

use crate::collection::Collection;
use crate::record::Record;
use crate::schema::{Backing, EnumCase, EnumSchema, FieldKind, ValueSchema};
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde_json::Value;

/// A selected case of a backed enum.
#[derive(Debug, Clone, Copy)]
pub struct EnumValue {
    schema: &'static EnumSchema,
    case: &'static EnumCase,
}

impl EnumValue {
    pub(crate) fn new(schema: &'static EnumSchema, case: &'static EnumCase) -> Self {
        Self { schema, case }
    }

    /// The enum this case belongs to.
    pub fn schema(&self) -> &'static EnumSchema {
        self.schema
    }

    /// The case name.
    pub fn name(&self) -> &'static str {
        self.case.name
    }

    /// The backing value.
    pub fn backing(&self) -> Backing {
        self.case.backing
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name == other.schema.name && self.case.name == other.case.name
    }
}

/// A scalar payload with a canonical name.
///
/// Raw input may be a scalar, null, an empty map (read as null), or a
/// single-key map keyed by the value's name, which is unwrapped.
///
/// # Examples
///
/// ```
/// use restbind::schema::ValueSchema;
/// use restbind::NamedValue;
/// use serde_json::json;
///
/// static SKU: ValueSchema = ValueSchema::new("sku");
///
/// let sku = NamedValue::new(&SKU, json!({"sku": "A-1"})).unwrap();
/// assert_eq!(sku.value(), &json!("A-1"));
/// assert!(NamedValue::new(&SKU, json!({"id": 1})).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct NamedValue {
    schema: &'static ValueSchema,
    value: Value,
}

impl NamedValue {
    /// Builds a value from raw input, applying the type's normalizer.
    pub fn new(schema: &'static ValueSchema, raw: Value) -> Result<Self> {
        Ok(Self {
            schema,
            value: Self::prepare(schema, raw)?,
        })
    }

    fn prepare(schema: &'static ValueSchema, raw: Value) -> Result<Value> {
        let value = match raw {
            Value::Object(map) if map.is_empty() => Value::Null,
            Value::Object(map) if map.len() == 1 => {
                let (key, value) = map.into_iter().next().unwrap_or_default();
                if key != schema.name {
                    return Err(Error::binding(
                        schema.name,
                        schema.name,
                        format!("name {} does not exist", key),
                    ));
                }
                value
            }
            raw => raw,
        };

        if value.is_array() || value.is_object() {
            return Err(Error::binding(
                schema.name,
                schema.name,
                "value must be a scalar or null",
            ));
        }

        match schema.normalize {
            Some(normalize) => {
                normalize(value).map_err(|message| Error::binding(schema.name, schema.name, message))
            }
            None => Ok(value),
        }
    }

    /// The value type.
    pub fn schema(&self) -> &'static ValueSchema {
        self.schema
    }

    /// The canonical name.
    pub fn entity_name(&self) -> &'static str {
        self.schema.name
    }

    /// The payload.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The payload, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// Whether `set_data` is rejected.
    pub fn is_read_only(&self) -> bool {
        self.schema.read_only
    }

    /// Replaces the payload.
    ///
    /// # Errors
    ///
    /// [`Error::ReadOnly`] for read-only types, or a binding error for
    /// unacceptable input.
    pub fn set_data(&mut self, raw: Value) -> Result<()> {
        if self.schema.read_only {
            return Err(Error::ReadOnly(format!("value {}", self.schema.name)));
        }
        self.value = Self::prepare(self.schema, raw)?;
        Ok(())
    }

    /// Whether the payload passes the type's check.
    pub fn is_valid(&self) -> bool {
        self.schema.check.map_or(true, |check| check(&self.value))
    }

    /// `{name: value}`, or `{}` for a null payload.
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        if !self.value.is_null() {
            map.insert(self.schema.name.to_string(), self.value.clone());
        }
        Value::Object(map)
    }
}

impl PartialEq for NamedValue {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name == other.schema.name && self.value == other.value
    }
}

impl std::fmt::Display for NamedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Value::String(s) => f.write_str(s),
            Value::Null => Ok(()),
            other => write!(f, "{}", other),
        }
    }
}

/// The bound value of one field or collection element.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// An explicit null.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// A string.
    Str(String),
    /// A date-time.
    DateTime(DateTime<FixedOffset>),
    /// An enum case.
    Enum(EnumValue),
    /// A named scalar value.
    Value(NamedValue),
    /// A nested entity.
    Entity(Record),
    /// A nested collection.
    Collection(Collection),
}

impl FieldValue {
    /// Whether this is an explicit null.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// `true` for null and for a named value without payload.
    pub fn carries_no_data(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Value(named) => named.value().is_null(),
            _ => false,
        }
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The float, if this is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The string, if this is one (or a named value holding one).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            FieldValue::Value(value) => value.as_str(),
            _ => None,
        }
    }

    /// The date-time, if this is one.
    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            FieldValue::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// The enum case, if this is one.
    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            FieldValue::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// The named value, if this is one.
    pub fn as_named_value(&self) -> Option<&NamedValue> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The entity, if this is one.
    pub fn as_entity(&self) -> Option<&Record> {
        match self {
            FieldValue::Entity(record) => Some(record),
            _ => None,
        }
    }

    /// The collection, if this is one.
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            FieldValue::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    /// Whether the value can be stored in a field of `kind`.
    pub fn fits(&self, kind: FieldKind) -> bool {
        match (self, kind) {
            (FieldValue::Null, _) => true,
            (FieldValue::Bool(_), FieldKind::Bool)
            | (FieldValue::Int(_), FieldKind::Int)
            | (FieldValue::Float(_), FieldKind::Float)
            | (FieldValue::Str(_), FieldKind::Str)
            | (FieldValue::DateTime(_), FieldKind::DateTime) => true,
            (FieldValue::Enum(value), FieldKind::Enum(schema)) => value.schema().name == schema.name,
            (FieldValue::Value(value), FieldKind::Value(schema)) => value.entity_name() == schema.name,
            (FieldValue::Entity(record), FieldKind::Entity(schema)) => {
                record.entity_name() == schema.name
            }
            (FieldValue::Collection(collection), FieldKind::Collection(schema)) => {
                collection.entity_name() == schema.name
            }
            _ => false,
        }
    }

    /// The JSON representation used when serializing: enums as their
    /// backing value, date-times as RFC 3339 with as many fractional
    /// digits as they carry, named
    /// values as their bare payload.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::DateTime(dt) => {
                Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))
            }
            FieldValue::Enum(e) => e.backing().to_json(),
            FieldValue::Value(v) => v.value().clone(),
            FieldValue::Entity(record) => record.to_value(),
            FieldValue::Collection(collection) => collection.to_value(),
        }
    }
}
