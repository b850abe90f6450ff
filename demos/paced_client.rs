//! A paced, retrying client against a public test API.
//!
//! This example shows how to:
//! - Keep a minimum interval between requests
//! - Configure exponential and constant backoff
//! - Read the attempt count and latency of a response
//!
//! Run with: `cargo run --example paced_client`

use restbind::{Client, Error, RequestOptions};
use serde::Deserialize;
use std::time::{Duration, Instant};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    id: u32,
    title: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("restbind=debug,paced_client=info")
        .init();

    println!("=== Paced requests ===");
    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .request_interval(Duration::from_millis(500))?
        .max_retries(4)?
        .base_retry_delay(Duration::from_secs(1))?
        .timeout(Duration::from_secs(10))
        .build()?;

    let start = Instant::now();
    for id in 1..=3 {
        let response = client
            .get(&format!("/posts/{}", id), RequestOptions::new())
            .await?;
        let post: Post = response.json()?;
        println!(
            "post {} after {:?}: {} (attempts: {})",
            post.id,
            start.elapsed(),
            post.title,
            response.attempts
        );
    }
    println!();

    println!("=== Constant backoff ===");
    let constant = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .max_retries(3)?
        .base_retry_delay(Duration::from_secs(2))?
        .exponential_backoff(false)
        .respect_retry_after(Duration::from_secs(30))
        .build()?;

    let response = constant
        .get("/posts", RequestOptions::new().with_query_param("userId", "1"))
        .await?;
    println!("Status: {}", response.status);
    println!("Latency: {:?}", response.latency);
    println!("Was retried: {}", response.was_retried());

    Ok(())
}
