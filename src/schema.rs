//! Schema descriptors.
//!
//! A bound type is described once, statically: its fields, their kinds and
//! nullability, and for nested kinds the descriptor of the nested type.
//! The binder, the validator and the serializer all work from these tables;
//! nothing is discovered at runtime.
//!
//! ```
//! use restbind::schema::{FieldKind, FieldSpec, Schema};
//!
//! static POINT: Schema = Schema {
//!     name: "Point",
//!     fields: &[
//!         FieldSpec::required("x", FieldKind::Float),
//!         FieldSpec::required("y", FieldKind::Float),
//!         FieldSpec::nullable("label", FieldKind::Str),
//!     ],
//!     content: None,
//! };
//!
//! assert!(POINT.field("x").is_some());
//! assert!(POINT.field("z").is_none());
//! ```

use crate::value::{EnumValue, FieldValue};
use serde_json::Value;

/// The field name whose declared type may be swapped for
/// [`Schema::content`].
pub const CONTENT_FIELD: &str = "content";

/// Extra per-field rule consulted by validation for non-null values.
pub type FieldCheck = fn(&FieldValue) -> Result<(), String>;

/// Normalizes the raw payload of a [`crate::NamedValue`]; an `Err` rejects it.
pub type Normalizer = fn(Value) -> Result<Value, String>;

/// Validity rule for the payload of a [`crate::NamedValue`].
pub type ValueCheck = fn(&Value) -> bool;

/// The declared type of a field or collection element.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// `true`/`false`, with permissive string parsing.
    Bool,
    /// A signed 64-bit integer.
    Int,
    /// A 64-bit float; accepts comma-decimal strings.
    Float,
    /// A string; other scalars are stringified.
    Str,
    /// A date-time with offset.
    DateTime,
    /// A backed enumeration.
    Enum(&'static EnumSchema),
    /// A named scalar value.
    Value(&'static ValueSchema),
    /// A nested entity.
    Entity(&'static Schema),
    /// A homogeneous collection.
    Collection(&'static CollectionSchema),
}

impl FieldKind {
    /// Name of the kind as shown in errors and logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Str => "string",
            FieldKind::DateTime => "datetime",
            FieldKind::Enum(schema) => schema.name,
            FieldKind::Value(schema) => schema.name,
            FieldKind::Entity(schema) => schema.name,
            FieldKind::Collection(schema) => schema.name,
        }
    }

    /// Entities, values and collections: kinds that are bound recursively.
    pub fn is_nested(&self) -> bool {
        matches!(
            self,
            FieldKind::Value(_) | FieldKind::Entity(_) | FieldKind::Collection(_)
        )
    }
}

/// One declared field of an entity.
#[derive(Debug)]
pub struct FieldSpec {
    /// The key in the raw mapping.
    pub name: &'static str,
    /// The declared type.
    pub kind: FieldKind,
    /// Whether null is an acceptable value.
    pub nullable: bool,
    /// Optional format rule checked by validation.
    pub check: Option<FieldCheck>,
}

impl FieldSpec {
    /// A field that must be initialized for the entity to be valid.
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            check: None,
        }
    }

    /// A field that may be null or absent.
    pub const fn nullable(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
            check: None,
        }
    }

    /// Attaches a validation rule.
    pub const fn with_check(self, check: FieldCheck) -> Self {
        Self {
            check: Some(check),
            ..self
        }
    }
}

/// The declared shape of an entity.
#[derive(Debug)]
pub struct Schema {
    /// The entity name.
    pub name: &'static str,
    /// The declared fields, in serialization order.
    pub fields: &'static [FieldSpec],
    /// Element type bound in place of the declared type of the
    /// [`CONTENT_FIELD`] field, when that field is nested.
    pub content: Option<FieldKind>,
}

impl Schema {
    /// Looks up a declared field.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Position of a declared field.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// The kind a raw value for `field` is bound as, honouring the content
    /// substitution.
    pub fn binding_kind(&self, field: &FieldSpec) -> FieldKind {
        match self.content {
            Some(content) if field.name == CONTENT_FIELD && field.kind.is_nested() => content,
            _ => field.kind,
        }
    }
}

/// The backing value of an enum case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backing {
    /// A string-backed case.
    Str(&'static str),
    /// An integer-backed case.
    Int(i64),
}

impl Backing {
    /// The backing value as JSON.
    pub fn to_json(self) -> Value {
        match self {
            Backing::Str(s) => Value::from(s),
            Backing::Int(i) => Value::from(i),
        }
    }

    fn matches(self, raw: &Value) -> bool {
        match (self, raw) {
            (Backing::Str(s), Value::String(raw)) => s == raw,
            (Backing::Int(i), Value::Number(raw)) => raw.as_i64() == Some(i),
            _ => false,
        }
    }
}

/// One case of a backed enum.
#[derive(Debug)]
pub struct EnumCase {
    /// The case name.
    pub name: &'static str,
    /// The value it is bound from and serialized to.
    pub backing: Backing,
}

/// A backed enumeration.
#[derive(Debug)]
pub struct EnumSchema {
    /// The enum name.
    pub name: &'static str,
    /// The cases, in declaration order.
    pub cases: &'static [EnumCase],
}

impl EnumSchema {
    /// Exact backing-value lookup: `"1"` does not match an int case `1`.
    pub fn from_backing(&'static self, raw: &Value) -> Option<EnumValue> {
        self.cases
            .iter()
            .find(|case| case.backing.matches(raw))
            .map(|case| EnumValue::new(self, case))
    }

    /// Looks a case up by name.
    pub fn case(&'static self, name: &str) -> Option<EnumValue> {
        self.cases
            .iter()
            .find(|case| case.name == name)
            .map(|case| EnumValue::new(self, case))
    }

    /// The first declared case, used as the default.
    pub fn first(&'static self) -> Option<EnumValue> {
        self.cases.first().map(|case| EnumValue::new(self, case))
    }
}

/// A named scalar value type.
#[derive(Debug)]
pub struct ValueSchema {
    /// The entity name; a single-key map under this name is unwrapped.
    pub name: &'static str,
    /// Rejects `set_data` after construction.
    pub read_only: bool,
    /// Applied to every payload before it is stored.
    pub normalize: Option<Normalizer>,
    /// Checked by validation.
    pub check: Option<ValueCheck>,
}

impl ValueSchema {
    /// A plain value type without rules.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            read_only: false,
            normalize: None,
            check: None,
        }
    }
}

/// A homogeneous collection type.
#[derive(Debug)]
pub struct CollectionSchema {
    /// The entity name; when it is [`CONTENT_FIELD`], input wrapped as
    /// `{"content": [...]}` is unwrapped.
    pub name: &'static str,
    /// The element type.
    pub element: FieldKind,
    /// Rejects mutation after construction.
    pub read_only: bool,
}
