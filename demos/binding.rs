//! Binding loose JSON into typed entities and validating them.
//!
//! This example shows how to:
//! - Bind an entity through the `Bound` trait
//! - Validate single entities and whole collections
//! - Query a collection by field
//!
//! Run with: `cargo run --example binding`

use restbind::entities::{Address, ADDRESSES};
use restbind::{Bound, Collection, Comparison, Error, Validate};
use serde_json::json;

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("restbind=warn")
        .init();

    println!("=== One entity ===");
    let home = Address::from_value(&json!({
        "street": "Hauptstr. 1",
        "zip": 10115,
        "city": "Berlin",
        "nickname": "ignored with a warning"
    }))?;
    println!("{:?} {:?} {}", home.street(), home.zip(), home.country_code().name());
    println!("Valid: {}", home.is_valid());
    println!("JSON: {}", home.to_json()?);
    println!();

    println!("=== A collection ===");
    let addresses = Collection::from_value(
        &ADDRESSES,
        &json!({"content": [
            {"street": "Hauptstr. 1", "zip": "10115", "city": "Berlin"},
            {"street": "Nebenstr. 2", "zip": "20095", "city": "Hamburg"},
            {"street": "", "zip": "?", "city": "Nowhere"}
        ]}),
    )?;
    for error in addresses.validation_errors() {
        println!("Invalid: {}", error);
    }
    if let Err(e) = addresses.assert_valid() {
        println!("{}", e);
    }
    println!();

    println!("=== Queries ===");
    let northern = addresses.search("zip", &json!(20000), "less_than".parse::<Comparison>()?)?;
    println!("Zip below 20000: {}", northern.len());
    let cities: Vec<_> = addresses
        .pluck("city")
        .into_iter()
        .flatten()
        .filter_map(|city| city.as_str())
        .collect();
    println!("Cities: {:?}", cities);

    Ok(())
}
