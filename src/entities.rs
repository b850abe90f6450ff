//! Ready-made value types and entities shared by many APIs.

use crate::record::{Bound, Record};
use crate::schema::{
    Backing, CollectionSchema, EnumCase, EnumSchema, FieldKind, FieldSpec, Schema, ValueSchema,
    CONTENT_FIELD,
};
use crate::value::{EnumValue, FieldValue};
use crate::Result;
use serde_json::Value;

/// A non-negative numeric identifier, `{"id": 7}` or `7`. Null becomes 0.
pub static ID: ValueSchema = ValueSchema {
    name: "id",
    read_only: false,
    normalize: Some(normalize_id),
    check: Some(check_id),
};

/// An e-mail address, trimmed on input.
pub static EMAIL_ADDRESS: ValueSchema = ValueSchema {
    name: "emailAddress",
    read_only: false,
    normalize: Some(normalize_email),
    check: Some(check_email),
};

/// ISO 3166-1 alpha-2 country codes.
pub static COUNTRY_CODE: EnumSchema = EnumSchema {
    name: "CountryCode",
    cases: &[
        EnumCase {
            name: "Germany",
            backing: Backing::Str("DE"),
        },
        EnumCase {
            name: "Austria",
            backing: Backing::Str("AT"),
        },
        EnumCase {
            name: "Switzerland",
            backing: Backing::Str("CH"),
        },
        EnumCase {
            name: "France",
            backing: Backing::Str("FR"),
        },
        EnumCase {
            name: "Netherlands",
            backing: Backing::Str("NL"),
        },
        EnumCase {
            name: "UnitedKingdom",
            backing: Backing::Str("GB"),
        },
        EnumCase {
            name: "UnitedStates",
            backing: Backing::Str("US"),
        },
    ],
};

/// A postal address.
pub static ADDRESS: Schema = Schema {
    name: "Address",
    fields: &[
        FieldSpec::nullable("supplement", FieldKind::Str),
        FieldSpec::required("street", FieldKind::Str).with_check(not_blank),
        FieldSpec::required("zip", FieldKind::Str).with_check(check_zip),
        FieldSpec::required("city", FieldKind::Str).with_check(not_blank),
        FieldSpec::nullable("countryCode", FieldKind::Enum(&COUNTRY_CODE)),
    ],
    content: None,
};

/// A list of addresses, bare or wrapped as `{"content": [...]}`.
pub static ADDRESSES: CollectionSchema = CollectionSchema {
    name: CONTENT_FIELD,
    element: FieldKind::Entity(&ADDRESS),
    read_only: false,
};

fn normalize_id(value: Value) -> std::result::Result<Value, String> {
    match value {
        Value::Null => Ok(Value::from(0)),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(id) => Ok(Value::from(id)),
            Err(_) => Ok(Value::String(s)),
        },
        other => Ok(other),
    }
}

fn check_id(value: &Value) -> bool {
    value.as_f64().is_some_and(|id| id >= 0.0)
}

fn normalize_email(value: Value) -> std::result::Result<Value, String> {
    match value {
        Value::String(s) => Ok(Value::String(s.trim().to_string())),
        Value::Null => Ok(Value::Null),
        other => Err(format!("{} is not an e-mail address", other)),
    }
}

fn check_email(value: &Value) -> bool {
    let Some(address) = value.as_str() else {
        return false;
    };
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !address.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn not_blank(value: &FieldValue) -> std::result::Result<(), String> {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err("must not be empty".to_string()),
    }
}

// 3 to 10 letters, digits, spaces or dashes, at least one digit.
fn check_zip(value: &FieldValue) -> std::result::Result<(), String> {
    let zip = value.as_str().unwrap_or_default().trim();
    let well_formed = (3..=10).contains(&zip.len())
        && zip
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
        && zip.chars().any(|c| c.is_ascii_digit());

    if well_formed {
        Ok(())
    } else {
        Err(format!("`{}` is not a valid postal code", zip))
    }
}

/// A postal address bound against [`ADDRESS`].
///
/// # Examples
///
/// ```
/// use restbind::entities::Address;
/// use restbind::Bound;
/// use serde_json::json;
///
/// let address = Address::from_value(&json!({
///     "street": "Hauptstr. 1",
///     "zip": "10115",
///     "city": "Berlin"
/// }))
/// .unwrap();
///
/// assert!(address.is_valid());
/// assert_eq!(address.country_code().name(), "Germany");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Address(Record);

impl Address {
    pub fn supplement(&self) -> Option<&str> {
        self.0.str("supplement")
    }

    pub fn street(&self) -> Option<&str> {
        self.0.str("street")
    }

    pub fn zip(&self) -> Option<&str> {
        self.0.str("zip")
    }

    pub fn city(&self) -> Option<&str> {
        self.0.str("city")
    }

    /// The country, Germany when none was given.
    pub fn country_code(&self) -> EnumValue {
        match self.0.enum_value("countryCode") {
            Some(code) => *code,
            None => EnumValue::new(&COUNTRY_CODE, &COUNTRY_CODE.cases[0]),
        }
    }

    pub fn set_supplement(&mut self, supplement: Option<&str>) -> Result<()> {
        self.0.set("supplement", optional_str(supplement))
    }

    pub fn set_street(&mut self, street: &str) -> Result<()> {
        self.0.set("street", FieldValue::Str(street.to_string()))
    }

    pub fn set_zip(&mut self, zip: &str) -> Result<()> {
        self.0.set("zip", FieldValue::Str(zip.to_string()))
    }

    pub fn set_city(&mut self, city: &str) -> Result<()> {
        self.0.set("city", FieldValue::Str(city.to_string()))
    }

    pub fn set_country_code(&mut self, code: EnumValue) -> Result<()> {
        self.0.set("countryCode", FieldValue::Enum(code))
    }
}

fn optional_str(value: Option<&str>) -> FieldValue {
    value.map_or(FieldValue::Null, |s| FieldValue::Str(s.to_string()))
}

impl Bound for Address {
    fn schema() -> &'static Schema {
        &ADDRESS
    }

    fn from_record(record: Record) -> Self {
        Address(record)
    }

    fn record(&self) -> &Record {
        &self.0
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.0
    }
}
