//! Integration tests using wiremock to simulate HTTP servers.

use restbind::auth::{BasicAuth, BearerAuth};
use restbind::endpoint::{Content, Endpoint, EndpointRequest};
use restbind::entities::{Address, ADDRESSES};
use restbind::{ApiErrorKind, Bound, Client, Error, RequestOptions, Validate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TestData {
    id: u32,
    name: String,
}

async fn client_for(server: &MockServer) -> Client {
    Client::builder()
        .base_url(server.uri())
        .unwrap()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_successful_get_request() {
    let mock_server = MockServer::start().await;

    let response_data = TestData {
        id: 1,
        name: "Test".to_string(),
    };

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&response_data))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let response = client.get("/test", RequestOptions::new()).await.unwrap();

    assert_eq!(response.json::<TestData>().unwrap(), response_data);
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.attempts, 1);
    assert!(!response.was_retried());
}

#[tokio::test]
async fn test_successful_post_request() {
    let mock_server = MockServer::start().await;

    let request_data = TestData {
        id: 0,
        name: "New".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/test"))
        .and(body_json(&request_data))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1, "name": "New"})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let response = client
        .post("/test", RequestOptions::new().with_json(&request_data).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.json::<TestData>().unwrap().id, 1);
}

#[tokio::test]
async fn test_not_found_keeps_body_and_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Resource not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let err = client
        .get("/missing", RequestOptions::new())
        .await
        .unwrap_err();

    match err {
        Error::Api {
            kind, status, body, ..
        } => {
            assert_eq!(kind, ApiErrorKind::NotFound);
            assert_eq!(status.as_u16(), 404);
            assert_eq!(body, "Resource not found");
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_service_unavailable_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let response = client.get("/flaky", RequestOptions::new()).await.unwrap();

    assert_eq!(response.body, "ok");
    assert_eq!(response.attempts, 2);
    assert!(response.latency >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_rate_limit_info_is_attached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "7")
                .insert_header("X-RateLimit-Remaining", "0"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .max_retries(1)
        .unwrap()
        .build()
        .unwrap();

    let err = client.get("/limited", RequestOptions::new()).await.unwrap_err();
    let info = err.rate_limit_info().unwrap();
    assert_eq!(info.retry_after, Some(Duration::from_secs(7)));
    assert_eq!(info.remaining, Some(0));
}

#[tokio::test]
async fn test_auth_and_query_reach_the_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/secure"))
        .and(header("authorization", "Bearer s3cret"))
        .and(header("x-tenant", "acme"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .authentication(Arc::new(BearerAuth::new("s3cret").with_header("X-Tenant", "acme")))
        .build()
        .unwrap();

    client
        .get("/secure", RequestOptions::new().with_query_param("page", "3"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_basic_auth_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .authentication(Arc::new(BasicAuth::new("user", "pass")))
        .build()
        .unwrap();

    client.get("/", RequestOptions::new()).await.unwrap();
}

#[tokio::test]
async fn test_endpoint_fetch_entity_and_list() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/addresses/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "street": "Hauptstr. 1",
            "zip": "10115",
            "city": "Berlin",
            "unknown": true
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/addresses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                {"street": "A", "zip": "10001", "city": "Berlin"},
                {"street": "B", "zip": "X", "city": ""}
            ]
        })))
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::new(client_for(&mock_server).await, "addresses").with_prefix("api/");

    let address: Address = endpoint
        .fetch_entity(EndpointRequest::new().path("1"))
        .await
        .unwrap();
    assert_eq!(address.city(), Some("Berlin"));
    assert!(address.is_valid());

    let addresses = endpoint.list(&ADDRESSES).await.unwrap();
    assert_eq!(addresses.len(), 2);
    assert!(!addresses.is_valid());
    assert!(addresses.validation_errors()[0].path.starts_with("[1]."));
}

#[tokio::test]
async fn test_endpoint_search_sends_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/addresses"))
        .and(query_param("city", "Hamburg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"street": "Nebenstr. 2", "zip": "20095", "city": "Hamburg"}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::new(client_for(&mock_server).await, "addresses");
    let found = endpoint
        .search(&ADDRESSES, [("city", "Hamburg")])
        .await
        .unwrap();

    let typed: Vec<Address> = found.typed();
    assert_eq!(typed.len(), 1);
    assert_eq!(typed[0].zip(), Some("20095"));
}

#[tokio::test]
async fn test_endpoint_create_and_remove() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/addresses"))
        .and(body_json(json!({"street": "A", "zip": "10001", "city": "Berlin", "countryCode": "DE"})))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id": 5}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/addresses/5"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::new(client_for(&mock_server).await, "addresses");

    let mut address = Address::new_empty();
    address.set_street("A").unwrap();
    address.set_zip("10001").unwrap();
    address.set_city("Berlin").unwrap();

    let created = endpoint
        .create_entity(&address, EndpointRequest::new())
        .await
        .unwrap();
    assert_eq!(created.to_value().unwrap()["id"], 5);

    let removed = endpoint
        .remove(EndpointRequest::new().path("5"))
        .await
        .unwrap();
    assert_eq!(removed, Content::NoContent);
    assert_eq!(removed.as_str(), "success");
}

#[tokio::test]
async fn test_endpoint_unexpected_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/addresses"))
        .respond_with(ResponseTemplate::new(200).set_body_string("created?"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::new(client_for(&mock_server).await, "addresses");
    let err = endpoint
        .create(EndpointRequest::new().body_value(json!({})))
        .await
        .unwrap_err();

    match err {
        Error::UnexpectedStatus {
            expected,
            status,
            body,
        } => {
            assert_eq!(expected.as_u16(), 201);
            assert_eq!(status.as_u16(), 200);
            assert_eq!(body, "created?");
        }
        other => panic!("Expected UnexpectedStatus, got {:?}", other),
    }
}
