//! Homogeneous collections of bound values.

use crate::binder;
use crate::record::Bound;
use crate::schema::{CollectionSchema, FieldKind, CONTENT_FIELD};
use crate::value::FieldValue;
use crate::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// How [`Collection::search`] compares a field against the needle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Loose equality: `5`, `5.0` and `"5"` are equal.
    Equals,
    /// Substring match on string fields.
    Contains,
    /// Numeric comparison on numeric fields.
    GreaterThan,
    /// Numeric comparison on numeric fields.
    LessThan,
    /// Regular expression match on string fields.
    Regex,
}

impl Comparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Equals => "equals",
            Comparison::Contains => "contains",
            Comparison::GreaterThan => "greater_than",
            Comparison::LessThan => "less_than",
            Comparison::Regex => "regex",
        }
    }
}

impl FromStr for Comparison {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "equals" => Ok(Comparison::Equals),
            "contains" => Ok(Comparison::Contains),
            "greater_than" => Ok(Comparison::GreaterThan),
            "less_than" => Ok(Comparison::LessThan),
            "regex" => Ok(Comparison::Regex),
            other => Err(Error::Configuration(format!(
                "Unsupported comparison type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered collection of values of one element kind.
///
/// Input may be a list, a single value (stored as a one-element
/// collection) or, for collections named `content`, a list wrapped as
/// `{"content": [...]}`.
///
/// # Examples
///
/// ```
/// use restbind::schema::{CollectionSchema, FieldKind};
/// use restbind::Collection;
/// use serde_json::json;
///
/// static SCORES: CollectionSchema = CollectionSchema {
///     name: "content",
///     element: FieldKind::Int,
///     read_only: false,
/// };
///
/// let scores = Collection::from_value(&SCORES, &json!({"content": [3, "4", 5]})).unwrap();
/// let high = scores.filter(|score| score.as_i64() > Some(3));
/// assert_eq!(high.to_value(), json!([4, 5]));
/// assert_eq!(scores.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Collection {
    schema: &'static CollectionSchema,
    items: Vec<FieldValue>,
}

impl Collection {
    /// An empty collection.
    pub fn empty(schema: &'static CollectionSchema) -> Self {
        Self {
            schema,
            items: Vec::new(),
        }
    }

    /// Binds raw input; `null` gives an empty collection.
    pub fn from_value(schema: &'static CollectionSchema, raw: &Value) -> Result<Self> {
        Ok(Self {
            schema,
            items: bind_items(schema, raw)?,
        })
    }

    /// Decodes JSON text and binds it.
    pub fn from_json(schema: &'static CollectionSchema, json: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(json)?;
        Self::from_value(schema, &raw)
    }

    /// Wraps already-bound items.
    ///
    /// # Errors
    ///
    /// A binding error naming the first item that does not fit the element
    /// kind.
    pub fn from_items(schema: &'static CollectionSchema, items: Vec<FieldValue>) -> Result<Self> {
        if let Some(index) = items.iter().position(|item| !item.fits(schema.element)) {
            return Err(Error::binding(
                format!("[{}]", index),
                schema.element.type_name(),
                "value does not match the element type",
            ));
        }
        Ok(Self { schema, items })
    }

    pub fn schema(&self) -> &'static CollectionSchema {
        self.schema
    }

    pub fn entity_name(&self) -> &'static str {
        self.schema.name
    }

    pub fn is_read_only(&self) -> bool {
        self.schema.read_only
    }

    /// Replaces the contents with newly bound input.
    pub fn set_data(&mut self, raw: &Value) -> Result<()> {
        self.ensure_writable()?;
        self.items = bind_items(self.schema, raw)?;
        Ok(())
    }

    /// Appends a bound item.
    pub fn push(&mut self, item: FieldValue) -> Result<()> {
        self.ensure_writable()?;
        if !item.fits(self.schema.element) {
            return Err(Error::binding(
                format!("[{}]", self.items.len()),
                self.schema.element.type_name(),
                "value does not match the element type",
            ));
        }
        self.items.push(item);
        Ok(())
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.schema.read_only {
            return Err(Error::ReadOnly(format!("collection {}", self.schema.name)));
        }
        Ok(())
    }

    /// All items, in order.
    pub fn values(&self) -> &[FieldValue] {
        &self.items
    }

    /// Entity items whose `field` compares true against `needle`.
    ///
    /// Items where the field is unset or null are skipped; named values are
    /// compared by their payload and enums by their backing value.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] for an invalid regular expression.
    pub fn search(
        &self,
        field: &str,
        needle: &Value,
        comparison: Comparison,
    ) -> Result<Vec<&FieldValue>> {
        let pattern = match comparison {
            Comparison::Regex => {
                let source = needle.as_str().ok_or_else(|| {
                    Error::Configuration("regex comparison needs a string pattern".to_string())
                })?;
                Some(Regex::new(source).map_err(|e| {
                    Error::Configuration(format!("invalid pattern {}: {}", source, e))
                })?)
            }
            _ => None,
        };

        let mut matches = Vec::new();
        for item in &self.items {
            let Some(record) = item.as_entity() else {
                continue;
            };
            let candidate = match record.get(field) {
                None | Some(FieldValue::Null) => continue,
                Some(value) => value.to_json(),
            };

            let hit = match comparison {
                Comparison::Equals => loose_eq(&candidate, needle),
                Comparison::Contains => match (candidate.as_str(), needle) {
                    (Some(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
                    (Some(haystack), other) => haystack.contains(&other.to_string()),
                    _ => false,
                },
                Comparison::GreaterThan => {
                    matches!((numeric(&candidate), numeric(needle)), (Some(a), Some(b)) if a > b)
                }
                Comparison::LessThan => {
                    matches!((numeric(&candidate), numeric(needle)), (Some(a), Some(b)) if a < b)
                }
                Comparison::Regex => match (candidate.as_str(), &pattern) {
                    (Some(text), Some(pattern)) => pattern.is_match(text),
                    _ => false,
                },
            };

            if hit {
                matches.push(item);
            }
        }

        Ok(matches)
    }

    /// A new collection with the items matching `predicate`, in order.
    pub fn filter(&self, predicate: impl Fn(&FieldValue) -> bool) -> Collection {
        Self {
            schema: self.schema,
            items: self.items.iter().filter(|item| predicate(item)).cloned().collect(),
        }
    }

    pub fn map<T>(&self, f: impl FnMut(&FieldValue) -> T) -> Vec<T> {
        self.items.iter().map(f).collect()
    }

    /// Calls `f` with each item and its index.
    pub fn each(&self, mut f: impl FnMut(&FieldValue, usize)) {
        for (index, item) in self.items.iter().enumerate() {
            f(item, index);
        }
    }

    pub fn find(&self, predicate: impl Fn(&FieldValue) -> bool) -> Option<&FieldValue> {
        self.items.iter().find(|item| predicate(item))
    }

    pub fn any(&self, predicate: impl Fn(&FieldValue) -> bool) -> bool {
        self.items.iter().any(predicate)
    }

    /// True for an empty collection.
    pub fn all(&self, predicate: impl Fn(&FieldValue) -> bool) -> bool {
        self.items.iter().all(predicate)
    }

    /// The value of `field` for every item; `None` where the item is not an
    /// entity or the field is unset, undeclared or null.
    pub fn pluck(&self, field: &str) -> Vec<Option<&FieldValue>> {
        self.items
            .iter()
            .map(|item| {
                item.as_entity()
                    .and_then(|record| record.get(field))
                    .filter(|value| !value.is_null())
            })
            .collect()
    }

    pub fn first(&self) -> Option<&FieldValue> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&FieldValue> {
        self.items.last()
    }

    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Same as [`Collection::len`].
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldValue> {
        self.items.iter()
    }

    /// The entity items wrapped as `T`; other items are skipped.
    pub fn typed<T: Bound>(&self) -> Vec<T> {
        self.items
            .iter()
            .filter_map(FieldValue::as_entity)
            .filter(|record| record.entity_name() == T::schema().name)
            .cloned()
            .map(T::from_record)
            .collect()
    }

    /// The list representation.
    pub fn to_value(&self) -> Value {
        Value::Array(self.items.iter().map(FieldValue::to_json).collect())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_value())?)
    }
}

impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name == other.schema.name && self.items == other.items
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a FieldValue;
    type IntoIter = std::slice::Iter<'a, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn bind_items(schema: &'static CollectionSchema, raw: &Value) -> Result<Vec<FieldValue>> {
    let raw = match raw {
        Value::Object(map) if schema.name == CONTENT_FIELD && map.contains_key(CONTENT_FIELD) => {
            &map[CONTENT_FIELD]
        }
        raw => raw,
    };

    match raw {
        Value::Null => Ok(Vec::new()),
        Value::Array(elements) => {
            let mut items = Vec::with_capacity(elements.len());
            for (index, element) in elements.iter().enumerate() {
                items.push(bind_element(schema, index, element)?);
            }
            Ok(items)
        }
        single => Ok(vec![bind_element(schema, 0, single)?]),
    }
}

// Every element must be an instance of the element kind: no null
// scalars, and an unknown enum value fails instead of being dropped.
fn bind_element(schema: &'static CollectionSchema, index: usize, raw: &Value) -> Result<FieldValue> {
    let path = format!("[{}]", index);
    match (schema.element, raw) {
        (FieldKind::Entity(entity), Value::Null) => {
            Ok(FieldValue::Entity(binder::initialize(entity)))
        }
        (kind, raw) => binder::bind_kind(&path, kind, false, raw)?.ok_or_else(|| {
            Error::binding(path.as_str(), kind.type_name(), format!("invalid value {}", raw))
        }),
    }
}

// Numbers and numeric strings compare numerically, everything else
// structurally.
fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            matches!((numeric(a), numeric(b)), (Some(x), Some(y)) if x == y)
        }
        _ => false,
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::schema::{Backing, EnumCase, EnumSchema, FieldSpec, Schema};
    use serde_json::json;

    static CITY: Schema = Schema {
        name: "City",
        fields: &[
            FieldSpec::required("name", FieldKind::Str),
            FieldSpec::nullable("population", FieldKind::Int),
        ],
        content: None,
    };

    static CITIES: CollectionSchema = CollectionSchema {
        name: CONTENT_FIELD,
        element: FieldKind::Entity(&CITY),
        read_only: false,
    };

    static FROZEN: CollectionSchema = CollectionSchema {
        name: "frozen",
        element: FieldKind::Str,
        read_only: true,
    };

    fn cities() -> Collection {
        Collection::from_value(
            &CITIES,
            &json!([
                {"name": "Berlin", "population": 3_600_000},
                {"name": "Hamburg", "population": "1800000"},
                {"name": "Bonn"}
            ]),
        )
        .unwrap()
    }

    fn names(items: &[&FieldValue]) -> Vec<String> {
        items
            .iter()
            .filter_map(|item| item.as_entity()?.str("name").map(String::from))
            .collect()
    }

    #[test]
    fn test_content_unwrapping_and_single_value() {
        let wrapped = Collection::from_value(&CITIES, &json!({"content": [{"name": "Kiel"}]})).unwrap();
        assert_eq!(wrapped.len(), 1);

        let single = Collection::from_value(&CITIES, &json!({"name": "Kiel"})).unwrap();
        assert_eq!(wrapped, single);

        assert!(Collection::from_value(&CITIES, &Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_search_comparisons() {
        let cities = cities();

        let hits = cities.search("name", &json!("Bonn"), Comparison::Equals).unwrap();
        assert_eq!(names(&hits), vec!["Bonn"]);

        let hits = cities.search("population", &json!("1800000"), Comparison::Equals).unwrap();
        assert_eq!(names(&hits), vec!["Hamburg"]);

        let hits = cities.search("name", &json!("burg"), Comparison::Contains).unwrap();
        assert_eq!(names(&hits), vec!["Hamburg"]);

        let hits = cities.search("population", &json!(2_000_000), Comparison::GreaterThan).unwrap();
        assert_eq!(names(&hits), vec!["Berlin"]);

        let hits = cities.search("population", &json!(2_000_000), Comparison::LessThan).unwrap();
        assert_eq!(names(&hits), vec!["Hamburg"]);

        let hits = cities.search("name", &json!("^B"), Comparison::Regex).unwrap();
        assert_eq!(names(&hits), vec!["Berlin", "Bonn"]);
    }

    #[test]
    fn test_invalid_comparisons_are_configuration_errors() {
        assert!(matches!("like".parse::<Comparison>(), Err(Error::Configuration(_))));
        assert_eq!("greater_than".parse::<Comparison>().unwrap(), Comparison::GreaterThan);
        assert!(matches!(
            cities().search("name", &json!("("), Comparison::Regex),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_filter_leaves_source_untouched() {
        let cities = cities();
        let big = cities.filter(|city| {
            city.as_entity()
                .and_then(|record| record.i64("population"))
                .is_some_and(|population| population > 1_000_000)
        });

        assert_eq!(big.len(), 2);
        assert_eq!(cities.len(), 3);
        assert_eq!(big.entity_name(), cities.entity_name());
    }

    #[test]
    fn test_pluck_each_and_predicates() {
        let cities = cities();

        let populations: Vec<_> = cities
            .pluck("population")
            .into_iter()
            .map(|value| value.and_then(FieldValue::as_i64))
            .collect();
        assert_eq!(populations, vec![Some(3_600_000), Some(1_800_000), None]);
        assert!(cities.pluck("missing").iter().all(Option::is_none));

        let mut visited = Vec::new();
        cities.each(|_, index| visited.push(index));
        assert_eq!(visited, vec![0, 1, 2]);

        assert!(cities.any(|city| city.as_entity().and_then(|r| r.str("name")) == Some("Bonn")));
        assert!(!cities.all(|city| city.as_entity().is_some_and(|r| r.is_set("population"))));
        assert!(Collection::empty(&CITIES).all(|_| false));
    }

    #[test]
    fn test_read_only_and_element_kind() {
        let mut frozen = Collection::from_value(&FROZEN, &json!(["a"])).unwrap();
        assert!(matches!(frozen.push(FieldValue::Str("b".into())), Err(Error::ReadOnly(_))));
        assert!(frozen.set_data(&json!([])).is_err());

        let mut cities = cities();
        assert!(cities.push(FieldValue::Int(1)).is_err());
        cities
            .push(FieldValue::Entity(Record::from_value(&CITY, &json!({"name": "Ulm"})).unwrap()))
            .unwrap();
        assert_eq!(
            cities.last().and_then(|city| city.as_entity()?.str("name").map(String::from)),
            Some("Ulm".to_string())
        );
    }

    #[test]
    fn test_invalid_scalar_element_is_rejected() {
        static COUNTS: CollectionSchema = CollectionSchema {
            name: "counts",
            element: FieldKind::Int,
            read_only: false,
        };

        let counts = Collection::from_value(&COUNTS, &json!([1, "2", 3.0])).unwrap();
        assert_eq!(counts.to_value(), json!([1, 2, 3]));

        let err = Collection::from_value(&COUNTS, &json!([1, "abc", 3])).unwrap_err();
        assert!(matches!(err, Error::Binding { ref field, .. } if field == "[1]"));

        let err = Collection::from_value(&COUNTS, &json!([1, null])).unwrap_err();
        assert!(matches!(err, Error::Binding { ref field, .. } if field == "[1]"));
    }

    #[test]
    fn test_unknown_enum_element_is_not_dropped() {
        static COLOR: EnumSchema = EnumSchema {
            name: "Color",
            cases: &[
                EnumCase {
                    name: "Red",
                    backing: Backing::Str("red"),
                },
                EnumCase {
                    name: "Green",
                    backing: Backing::Str("green"),
                },
            ],
        };
        static COLORS: CollectionSchema = CollectionSchema {
            name: "colors",
            element: FieldKind::Enum(&COLOR),
            read_only: false,
        };

        let colors = Collection::from_value(&COLORS, &json!(["red", "green"])).unwrap();
        assert_eq!(colors.len(), 2);

        let err = Collection::from_value(&COLORS, &json!(["red", "blue", "red"])).unwrap_err();
        match err {
            Error::Binding { field, target, .. } => {
                assert_eq!(field, "[1]");
                assert_eq!(target, "Color");
            }
            other => panic!("Expected Binding error, got {:?}", other),
        }
    }

    #[test]
    fn test_element_errors_carry_index() {
        let err = Collection::from_value(&CITIES, &json!([{"name": "A"}, {"name": null}])).unwrap_err();
        assert!(matches!(err, Error::Binding { ref field, .. } if field == "[1].name"));
    }
}
