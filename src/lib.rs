//! # restbind - Typed REST API clients
//!
//! restbind has two halves that work together:
//!
//! - a **request pipeline** ([`Client`]) built on `reqwest` that keeps a
//!   minimum interval between requests, composes default, per-call and
//!   authentication headers, maps error statuses to a typed taxonomy and
//!   retries rate-limited or temporarily unavailable responses with
//!   exponential or constant backoff;
//! - a **binding layer** that turns loosely-typed JSON into records
//!   described by static [`schema`] tables, with permissive scalar
//!   coercion, validation and collection queries.
//!
//! ## Quick Start
//!
//! ```no_run
//! use restbind::endpoint::{Endpoint, EndpointRequest};
//! use restbind::entities::{Address, ADDRESSES};
//! use restbind::{Bound, Client, Validate};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), restbind::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")?
//!         .request_interval(Duration::from_millis(500))?
//!         .max_retries(5)?
//!         .build()?;
//!
//!     let addresses = Endpoint::new(client.clone(), "addresses");
//!
//!     // One entity, bound through the `Bound` trait
//!     let home: Address = addresses.fetch_entity(EndpointRequest::new().path("1")).await?;
//!     println!("{:?} {:?}", home.street(), home.city());
//!
//!     // A whole list, validated in one go
//!     let all = addresses.list(&ADDRESSES).await?;
//!     all.assert_valid()?;
//!     for city in all.pluck("city").into_iter().flatten() {
//!         println!("{:?}", city.as_str());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every status >= 400 becomes [`Error::Api`] with an [`ApiErrorKind`], the
//! raw body and the response headers. Only
//! [`ApiErrorKind::TooManyRequests`], [`ApiErrorKind::ServiceUnavailable`]
//! and [`ApiErrorKind::GatewayTimeout`] are retried:
//!
//! ```no_run
//! use restbind::{ApiErrorKind, Client, Error, RequestOptions};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().base_url("https://api.example.com")?.build()?;
//! match client.get("/orders/9", RequestOptions::new()).await {
//!     Ok(response) => println!("{}", response.body),
//!     Err(Error::Api { kind: ApiErrorKind::NotFound, .. }) => println!("no such order"),
//!     Err(e) if e.is_retryable() => eprintln!("gave up after retries: {}", e),
//!     Err(e) => eprintln!("request failed: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Both halves emit `tracing` events: dispatches and stringified scalars at
//! debug, retries, skipped fields and validation failures at warn, error
//! responses and rejected values at error. Without a subscriber nothing is
//! recorded.

pub mod auth;
pub mod binder;
mod client;
pub mod collection;
pub mod endpoint;
pub mod entities;
mod error;
mod options;
pub mod pacing;
pub mod rate_limit;
pub mod record;
mod response;
pub mod retry;
pub mod schema;
pub mod transport;
pub mod validation;
pub mod value;

pub use client::{Client, ClientBuilder};
pub use collection::{Collection, Comparison};
pub use error::{ApiErrorKind, Error, Result, RetryClass};
pub use options::RequestOptions;
pub use rate_limit::RateLimitInfo;
pub use record::{Bound, Record};
pub use response::Response;
pub use retry::RetryPolicy;
pub use validation::{FieldError, Validate};
pub use value::{EnumValue, FieldValue, NamedValue};
