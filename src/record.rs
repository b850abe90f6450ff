//! Bound entity instances.
//!
//! A [`Record`] holds one slot per declared field of its [`Schema`]. A slot
//! is either unset (never initialized), an explicit null, or a bound
//! [`FieldValue`]. Typed entities wrap a record and implement [`Bound`].

use crate::binder;
use crate::collection::Collection;
use crate::schema::{FieldSpec, Schema};
use crate::validation::{FieldError, Validate};
use crate::value::{EnumValue, FieldValue, NamedValue};
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

/// An entity bound against a [`Schema`].
///
/// # Examples
///
/// ```
/// use restbind::schema::{FieldKind, FieldSpec, Schema};
/// use restbind::Record;
/// use serde_json::json;
///
/// static USER: Schema = Schema {
///     name: "User",
///     fields: &[
///         FieldSpec::required("id", FieldKind::Int),
///         FieldSpec::nullable("name", FieldKind::Str),
///     ],
///     content: None,
/// };
///
/// let user = Record::from_value(&USER, &json!({"id": "42", "name": "Ada"})).unwrap();
/// assert_eq!(user.i64("id"), Some(42));
/// assert_eq!(user.to_value(), json!({"id": 42, "name": "Ada"}));
/// ```
#[derive(Debug, Clone)]
pub struct Record {
    schema: &'static Schema,
    slots: Vec<Option<FieldValue>>,
}

impl Record {
    /// A record with every field unset.
    pub fn empty(schema: &'static Schema) -> Self {
        Self {
            schema,
            slots: vec![None; schema.fields.len()],
        }
    }

    /// Binds raw input; `null` yields a default-initialized record.
    pub fn from_value(schema: &'static Schema, raw: &Value) -> Result<Self> {
        binder::bind(schema, raw)
    }

    /// Decodes JSON text and binds it.
    pub fn from_json(schema: &'static Schema, json: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(json)?;
        Self::from_value(schema, &raw)
    }

    /// The schema this record was bound against.
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// The entity name.
    pub fn entity_name(&self) -> &'static str {
        self.schema.name
    }

    /// Binds further raw input into this record, field by field.
    pub fn set_data(&mut self, raw: &Value) -> Result<()> {
        binder::bind_into(self, raw)
    }

    /// The value of a field; `None` when unset or undeclared.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        let index = self.schema.index_of(name)?;
        self.slots[index].as_ref()
    }

    /// Whether a field has been initialized (null counts as initialized).
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Stores an already-typed value.
    ///
    /// # Errors
    ///
    /// A binding error if the field is not declared, the value does not fit
    /// the field's kind, or null is stored into a non-nullable field.
    pub fn set(&mut self, name: &str, value: FieldValue) -> Result<()> {
        let index = self.schema.index_of(name).ok_or_else(|| {
            Error::binding(name, self.schema.name, "no such field")
        })?;
        let field = &self.schema.fields[index];
        let kind = self.schema.binding_kind(field);

        if value.is_null() && !field.nullable {
            return Err(Error::binding(name, kind.type_name(), "field cannot be null"));
        }
        if !value.fits(kind) {
            return Err(Error::binding(
                name,
                kind.type_name(),
                "value does not match the declared type",
            ));
        }

        self.slots[index] = Some(value);
        Ok(())
    }

    /// Returns the field to the unset state.
    pub fn unset(&mut self, name: &str) {
        if let Some(index) = self.schema.index_of(name) {
            self.slots[index] = None;
        }
    }

    pub(crate) fn put(&mut self, index: usize, value: Option<FieldValue>) {
        self.slots[index] = value;
    }

    /// Declared fields with their current values, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static FieldSpec, Option<&FieldValue>)> + '_ {
        self.schema
            .fields
            .iter()
            .zip(self.slots.iter())
            .map(|(spec, slot)| (spec, slot.as_ref()))
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_bool()
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name)?.as_i64()
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name)?.as_f64()
    }

    pub fn datetime(&self, name: &str) -> Option<&DateTime<FixedOffset>> {
        self.get(name)?.as_datetime()
    }

    pub fn enum_value(&self, name: &str) -> Option<&EnumValue> {
        self.get(name)?.as_enum()
    }

    pub fn named_value(&self, name: &str) -> Option<&NamedValue> {
        self.get(name)?.as_named_value()
    }

    pub fn entity(&self, name: &str) -> Option<&Record> {
        self.get(name)?.as_entity()
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.get(name)?.as_collection()
    }

    /// The mapping representation. Unset and null fields are omitted, and so
    /// are nullable fields holding a named value without payload.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (spec, value) in self.fields() {
            match value {
                None | Some(FieldValue::Null) => continue,
                Some(value) if spec.nullable && value.carries_no_data() => continue,
                Some(value) => {
                    map.insert(spec.name.to_string(), value.to_json());
                }
            }
        }
        Value::Object(map)
    }

    /// The JSON text of [`Record::to_value`].
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_value())?)
    }
}

// Null, unset and a named value without payload all carry no data, so
// they compare equal.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        fn present(slot: &Option<FieldValue>) -> Option<&FieldValue> {
            slot.as_ref().filter(|value| !value.carries_no_data())
        }

        self.schema.name == other.schema.name
            && self.slots.len() == other.slots.len()
            && self
                .slots
                .iter()
                .zip(other.slots.iter())
                .all(|(a, b)| present(a) == present(b))
    }
}

/// A typed entity backed by a [`Record`].
///
/// Implementors supply the schema and the wrapping; binding, serialization
/// and validation come from the provided methods.
///
/// # Examples
///
/// ```
/// use restbind::schema::{FieldKind, FieldSpec, Schema};
/// use restbind::{Bound, Record};
/// use serde_json::json;
///
/// static TAG: Schema = Schema {
///     name: "Tag",
///     fields: &[FieldSpec::required("label", FieldKind::Str)],
///     content: None,
/// };
///
/// struct Tag(Record);
///
/// impl Bound for Tag {
///     fn schema() -> &'static Schema {
///         &TAG
///     }
///     fn from_record(record: Record) -> Self {
///         Tag(record)
///     }
///     fn record(&self) -> &Record {
///         &self.0
///     }
///     fn record_mut(&mut self) -> &mut Record {
///         &mut self.0
///     }
/// }
///
/// let tag = Tag::from_value(&json!({"label": "rust"})).unwrap();
/// assert!(tag.is_valid());
/// assert!(!Tag::new_empty().is_valid());
/// ```
pub trait Bound: Sized {
    /// The schema instances are bound against.
    fn schema() -> &'static Schema;

    /// Wraps a record bound against [`Bound::schema`].
    fn from_record(record: Record) -> Self;

    /// The underlying record.
    fn record(&self) -> &Record;

    /// The underlying record, mutably.
    fn record_mut(&mut self) -> &mut Record;

    /// A default-initialized instance.
    fn new_empty() -> Self {
        Self::from_record(binder::initialize(Self::schema()))
    }

    /// Binds raw input.
    fn from_value(raw: &Value) -> Result<Self> {
        binder::bind(Self::schema(), raw).map(Self::from_record)
    }

    /// Decodes and binds JSON text.
    fn from_json(json: &str) -> Result<Self> {
        Record::from_json(Self::schema(), json).map(Self::from_record)
    }

    /// Binds further raw input into this instance.
    fn set_data(&mut self, raw: &Value) -> Result<()> {
        self.record_mut().set_data(raw)
    }

    fn to_value(&self) -> Value {
        self.record().to_value()
    }

    fn to_json(&self) -> Result<String> {
        self.record().to_json()
    }

    fn is_valid(&self) -> bool {
        self.record().is_valid()
    }

    fn validation_errors(&self) -> Vec<FieldError> {
        self.record().validation_errors()
    }

    fn assert_valid(&self) -> Result<()> {
        self.record().assert_valid()
    }
}
