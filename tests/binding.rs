//! Binding, validation and collection behaviour against declared schemas.

use restbind::entities::{Address, ADDRESSES, EMAIL_ADDRESS, ID};
use restbind::schema::{
    Backing, CollectionSchema, EnumCase, EnumSchema, FieldKind, FieldSpec, Schema, ValueSchema,
};
use restbind::{Bound, Collection, Comparison, Error, FieldValue, Record, Validate};
use serde_json::{json, Value};

static PRIORITY: EnumSchema = EnumSchema {
    name: "Priority",
    cases: &[
        EnumCase {
            name: "Low",
            backing: Backing::Int(1),
        },
        EnumCase {
            name: "High",
            backing: Backing::Int(5),
        },
    ],
};

static TAGS: CollectionSchema = CollectionSchema {
    name: "tags",
    element: FieldKind::Str,
    read_only: false,
};

static CONTACT: Schema = Schema {
    name: "Contact",
    fields: &[
        FieldSpec::required("id", FieldKind::Value(&ID)),
        FieldSpec::nullable("email", FieldKind::Value(&EMAIL_ADDRESS)),
        FieldSpec::required("active", FieldKind::Bool),
        FieldSpec::nullable("balance", FieldKind::Float),
        FieldSpec::nullable("priority", FieldKind::Enum(&PRIORITY)),
        FieldSpec::nullable("since", FieldKind::DateTime),
        FieldSpec::required("address", FieldKind::Entity(&restbind::entities::ADDRESS)),
        FieldSpec::nullable("tags", FieldKind::Collection(&TAGS)),
    ],
    content: None,
};

static PAGE: Schema = Schema {
    name: "Page",
    fields: &[
        FieldSpec::required("content", FieldKind::Collection(&TAGS)),
        FieldSpec::nullable("total", FieldKind::Int),
    ],
    content: Some(FieldKind::Collection(&ADDRESSES)),
};

static CODE: ValueSchema = ValueSchema::new("code");

static TICKET: Schema = Schema {
    name: "Ticket",
    fields: &[
        FieldSpec::required("name", FieldKind::Str),
        FieldSpec::required("code", FieldKind::Value(&CODE)),
        FieldSpec::nullable("alt", FieldKind::Value(&CODE)),
    ],
    content: None,
};

fn contact_input() -> Value {
    json!({
        "id": {"id": 17},
        "email": "ada@example.org",
        "active": "on",
        "balance": "1.234,56",
        "priority": 5,
        "since": "2023-11-05T08:30:00.250+01:00",
        "address": {"street": "Hauptstr. 1", "zip": "10115", "city": "Berlin", "countryCode": "DE"},
        "tags": ["vip", "newsletter"]
    })
}

#[test]
fn test_permissive_scalar_coercion() {
    let contact = Record::from_value(&CONTACT, &contact_input()).unwrap();

    assert_eq!(contact.f64("balance"), Some(1234.56));
    assert_eq!(contact.bool("active"), Some(true));
    assert_eq!(contact.named_value("id").unwrap().value(), &json!(17));
    assert_eq!(contact.str("email"), Some("ada@example.org"));
    assert_eq!(contact.enum_value("priority").unwrap().name(), "High");

    let flipped = Record::from_value(&CONTACT, &json!({"active": "true", "balance": "1234,56"})).unwrap();
    assert_eq!(flipped.bool("active"), Some(true));
    assert_eq!(flipped.f64("balance"), Some(1234.56));
}

#[test]
fn test_null_into_non_nullable_scalar_is_a_binding_error() {
    let err = Record::from_value(&CONTACT, &json!({"active": null})).unwrap_err();
    match err {
        Error::Binding { field, target, .. } => {
            assert_eq!(field, "active");
            assert_eq!(target, "bool");
        }
        other => panic!("Expected Binding error, got {:?}", other),
    }
}

#[test]
fn test_unknown_fields_are_skipped() {
    let contact = Record::from_value(&CONTACT, &json!({"active": false, "nickname": "x"})).unwrap();
    assert_eq!(contact.bool("active"), Some(false));
    assert_eq!(contact.to_value(), json!({"active": false}));
}

#[test]
fn test_round_trip_preserves_equality() {
    let contact = Record::from_value(&CONTACT, &contact_input()).unwrap();
    assert!(contact.is_valid());

    let mapped = contact.to_value();
    assert_eq!(mapped["since"], json!("2023-11-05T08:30:00.250+01:00"));
    assert_eq!(mapped["priority"], json!(5));
    assert_eq!(mapped["id"], json!(17));

    let again = Record::from_value(&CONTACT, &mapped).unwrap();
    assert_eq!(again, contact);

    let from_text = Record::from_json(&CONTACT, &contact.to_json().unwrap()).unwrap();
    assert_eq!(from_text, contact);
}

#[test]
fn test_data_less_record_round_trip() {
    let contact = Record::from_value(&CONTACT, &Value::Null).unwrap();

    let again = Record::from_value(&CONTACT, &contact.to_value()).unwrap();
    assert_eq!(again, contact);
    assert_eq!(again.validation_errors(), contact.validation_errors());

    let from_text = Record::from_json(&CONTACT, &contact.to_json().unwrap()).unwrap();
    assert_eq!(from_text, contact);
}

#[test]
fn test_named_value_without_payload_round_trip() {
    let ticket = Record::from_value(&TICKET, &json!({"name": "x", "code": {}, "alt": {}})).unwrap();
    assert!(ticket.is_valid());
    assert_eq!(ticket.to_value(), json!({"name": "x", "code": null}));

    let again = Record::from_value(&TICKET, &ticket.to_value()).unwrap();
    assert!(again.named_value("code").is_some());
    assert!(again.is_valid());
    assert_eq!(again, ticket);

    let initialized = Record::from_value(&TICKET, &Value::Null).unwrap();
    let again = Record::from_json(&TICKET, &initialized.to_json().unwrap()).unwrap();
    assert_eq!(again, initialized);
}

#[test]
fn test_sub_millisecond_date_time_round_trip() {
    let mut input = contact_input();
    input["since"] = json!("2024-01-01T00:00:00.123456Z");
    let contact = Record::from_value(&CONTACT, &input).unwrap();

    let mapped = contact.to_value();
    assert_eq!(mapped["since"], json!("2024-01-01T00:00:00.123456+00:00"));
    assert_eq!(Record::from_value(&CONTACT, &mapped).unwrap(), contact);
}

#[test]
fn test_nested_validity() {
    let mut input = contact_input();
    input["address"]["zip"] = json!("?");
    let contact = Record::from_value(&CONTACT, &input).unwrap();

    let errors = contact.validation_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path, "address.zip");
    assert!(!contact.is_valid());
}

#[test]
fn test_invalid_named_value_makes_record_invalid() {
    let mut input = contact_input();
    input["email"] = json!("not-an-address");
    let contact = Record::from_value(&CONTACT, &input).unwrap();

    let paths: Vec<_> = contact.validation_errors().into_iter().map(|e| e.path).collect();
    assert_eq!(paths, vec!["email"]);
}

#[test]
fn test_default_initialization() {
    let contact = Record::from_value(&CONTACT, &Value::Null).unwrap();

    assert_eq!(contact.enum_value("priority").unwrap().name(), "Low");
    assert_eq!(contact.named_value("id").unwrap().value(), &json!(0));
    assert!(contact.entity("address").is_some());
    assert!(!contact.is_set("active"));

    let err = contact.assert_valid().unwrap_err().to_string();
    assert!(err.starts_with("Validation failed: "));
    assert!(err.contains("active"));
    assert!(err.contains("address.street"));
}

#[test]
fn test_content_field_uses_alternate_element_type() {
    let page = Record::from_value(
        &PAGE,
        &json!({"content": [{"street": "A", "zip": "10001", "city": "Berlin"}], "total": "1"}),
    )
    .unwrap();

    let content = page.collection("content").unwrap();
    assert_eq!(content.entity_name(), "content");
    assert_eq!(content.typed::<Address>()[0].street(), Some("A"));
    assert_eq!(page.i64("total"), Some(1));
}

#[test]
fn test_address_collection_scenario() {
    let addresses = Collection::from_value(
        &ADDRESSES,
        &json!([
            {"street": "A", "zip": "10001", "city": "Berlin"},
            {"street": "B", "zip": "X", "city": ""}
        ]),
    )
    .unwrap();

    let validity: Vec<bool> = addresses
        .typed::<Address>()
        .iter()
        .map(|address| address.is_valid())
        .collect();
    assert_eq!(validity, vec![true, false]);

    let errors = addresses.validation_errors();
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|error| error.path.starts_with("[1].")));

    let message = addresses.assert_valid().unwrap_err().to_string();
    assert!(message.contains("[1].zip"));
    assert!(message.contains("[1].city"));
}

#[test]
fn test_filter_is_idempotent_and_pure() {
    let addresses = Collection::from_value(
        &ADDRESSES,
        &json!({"content": [
            {"street": "Hauptstr. 1", "zip": "10001", "city": "Berlin"},
            {"street": "Nebenstr. 2", "zip": "20002", "city": "Hamburg"},
            {"street": "Industriestr. 3", "zip": "30003", "city": "München"}
        ]}),
    )
    .unwrap();

    let in_north = |item: &FieldValue| {
        item.as_entity()
            .and_then(|address| address.str("zip"))
            .is_some_and(|zip| zip.starts_with('1') || zip.starts_with('2'))
    };

    let once = addresses.filter(in_north);
    let twice = once.filter(in_north);

    assert_eq!(once.len(), 2);
    assert_eq!(once, twice);
    assert_eq!(addresses.len(), 3);

    let cities = addresses.map(|item| item.as_entity().and_then(|a| a.str("city")).map(String::from));
    assert_eq!(
        cities,
        vec![
            Some("Berlin".to_string()),
            Some("Hamburg".to_string()),
            Some("München".to_string())
        ]
    );
}

#[test]
fn test_collection_equality() {
    let input = json!([{"street": "A", "zip": "10001", "city": "Berlin"}]);
    let a = Collection::from_value(&ADDRESSES, &input).unwrap();
    let b = Collection::from_json(&ADDRESSES, &input.to_string()).unwrap();
    assert_eq!(a, b);

    let longer = Collection::from_value(
        &ADDRESSES,
        &json!([{"street": "A", "zip": "10001", "city": "Berlin"}, null]),
    )
    .unwrap();
    assert_ne!(a, longer);
}

#[test]
fn test_search_by_comparison_name() {
    let addresses = Collection::from_value(
        &ADDRESSES,
        &json!([
            {"street": "Hauptstr. 1", "zip": "10001", "city": "Berlin"},
            {"street": "Nebenstr. 2", "zip": "20002", "city": "Hamburg"}
        ]),
    )
    .unwrap();

    let comparison: Comparison = "greater_than".parse().unwrap();
    let hits = addresses.search("zip", &json!(15000), comparison).unwrap();
    assert_eq!(hits.len(), 1);

    let hits = addresses
        .search("street", &json!(r"str\. 1$"), Comparison::Regex)
        .unwrap();
    assert_eq!(hits.len(), 1);

    assert!("between".parse::<Comparison>().is_err());
}

#[test]
fn test_first_last_and_find() {
    let addresses = Collection::from_value(
        &ADDRESSES,
        &json!([
            {"street": "A", "zip": "10001", "city": "Berlin"},
            {"street": "B", "zip": "20002", "city": "Hamburg"}
        ]),
    )
    .unwrap();

    let city = |item: Option<&FieldValue>| item.and_then(|i| i.as_entity()?.str("city").map(String::from));

    assert_eq!(city(addresses.first()), Some("Berlin".to_string()));
    assert_eq!(city(addresses.last()), Some("Hamburg".to_string()));
    assert_eq!(
        city(addresses.find(|item| item.as_entity().and_then(|a| a.str("street")) == Some("B"))),
        Some("Hamburg".to_string())
    );
    assert!(addresses.find(|_| false).is_none());
    assert_eq!(addresses.count(), 2);
}
