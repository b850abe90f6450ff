//! Telling error kinds apart.
//!
//! Run with: `cargo run --example error_handling`

use restbind::endpoint::{Endpoint, EndpointRequest};
use restbind::{ApiErrorKind, Client, Error, RequestOptions};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("restbind=warn")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .build()?;

    println!("=== API errors ===");
    match client.get("/posts/999999", RequestOptions::new()).await {
        Ok(response) => println!("Unexpected success: {}", response.body),
        Err(Error::Api {
            kind: ApiErrorKind::NotFound,
            body,
            ..
        }) => println!("Not found, body: {}", body),
        Err(e) if e.is_retryable() => println!("Gave up after retries: {}", e),
        Err(e) => println!("Other failure: {}", e),
    }
    println!();

    println!("=== Unexpected status ===");
    // The test API answers POST with 201, so expecting 200 fails.
    let posts = Endpoint::new(client.clone(), "posts");
    let request = EndpointRequest::new()
        .body_value(serde_json::json!({"title": "hello"}))
        .expect(http::StatusCode::OK);
    match posts.create(request).await {
        Err(Error::UnexpectedStatus {
            expected, status, ..
        }) => println!("Expected {}, got {}", expected, status),
        other => println!("{:?}", other),
    }
    println!();

    println!("=== Configuration errors ===");
    if let Err(e) = Client::builder().max_retries(0) {
        println!("Rejected: {}", e);
    }
    let bare = Client::builder().build()?;
    if let Err(e) = bare.get("relative/path", RequestOptions::new()).await {
        println!("Rejected: {}", e);
    }

    Ok(())
}
