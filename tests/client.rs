mod common;

use std::net::TcpListener;
use std::thread::JoinHandle;

use common::{http_response, serve};
use reqwest::blocking::Client;
use usecase_field_patcher::ToolError;
use usecase_field_patcher::api::{ApiClient, CustomFieldApi};
use usecase_field_patcher::model::{PatchPayload, PatchRequest};

/// Serves exactly one canned response and hands back the raw request text.
fn serve_once(status: &str, body: &str) -> (String, JoinHandle<Vec<String>>) {
    serve(vec![http_response(status, body)])
}

fn client(base_url: &str) -> ApiClient {
    let http = Client::builder().no_proxy().build().expect("reqwest client");
    ApiClient::with_client(base_url, http)
}

#[test]
fn token_exchange_posts_credentials_and_returns_access_token() {
    let (base_url, server) = serve_once("200 OK", r#"{"access_token":"short-lived"}"#);

    let token = client(&base_url)
        .exchange_token("long-lived", "acme")
        .expect("token exchanged");
    let request = server.join().expect("server thread").remove(0);

    assert_eq!(token, "short-lived");
    assert!(request.starts_with("POST /auth/exchange HTTP/1.1"));
    assert!(request.contains(r#""api_token":"long-lived""#));
    assert!(request.contains(r#""tenant":"acme""#));
}

#[test]
fn token_exchange_failure_status_is_fatal() {
    let (base_url, server) = serve_once("401 Unauthorized", r#"{"errors":[]}"#);

    let error = client(&base_url)
        .exchange_token("long-lived", "acme")
        .expect_err("rejected");
    server.join().expect("server thread");

    assert!(matches!(error, ToolError::TokenExchangeRejected(401)));
}

#[test]
fn token_exchange_without_access_token_is_fatal() {
    let (base_url, server) = serve_once("200 OK", r#"{"token_type":"Bearer"}"#);

    let error = client(&base_url)
        .exchange_token("long-lived", "acme")
        .expect_err("no token");
    server.join().expect("server thread");

    assert!(matches!(error, ToolError::MissingAccessToken));
}

#[test]
fn token_exchange_transport_failure_carries_the_cause() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("listener bound");
    let base_url = format!("http://{}", listener.local_addr().expect("local address"));
    drop(listener);

    let error = client(&base_url)
        .exchange_token("long-lived", "acme")
        .expect_err("nobody listening");

    match error {
        ToolError::TokenExchange(cause) => assert!(!cause.is_empty()),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn custom_fields_are_listed_for_use_cases_with_bearer_auth() {
    let body = serde_json::json!({
        "data": [
            {"id": "cf-1", "type": "custom_fields", "attributes": {"name": "region", "target": "use_case"}},
            {"id": 7, "type": "custom_fields", "attributes": {"name": "owner"}}
        ]
    })
    .to_string();
    let (base_url, server) = serve_once("200 OK", &body);

    let catalog = client(&base_url)
        .fetch_custom_fields("bearer-1", "acme")
        .expect("catalog fetched");
    let request = server.join().expect("server thread").remove(0);

    assert_eq!(catalog.len(), 2);
    assert_eq!((catalog[0].name.as_str(), catalog[0].id.as_str()), ("region", "cf-1"));
    assert_eq!((catalog[1].name.as_str(), catalog[1].id.as_str()), ("owner", "7"));
    assert!(request.starts_with("GET /api/v2/acme/custom_fields?filter%5Btarget%5D=use_case HTTP/1.1"));
    assert!(request.to_ascii_lowercase().contains("authorization: bearer bearer-1"));
}

#[test]
fn custom_field_failure_status_is_fatal() {
    let (base_url, server) = serve_once("403 Forbidden", "{}");

    let error = client(&base_url)
        .fetch_custom_fields("bearer-1", "acme")
        .expect_err("rejected");
    server.join().expect("server thread");

    assert!(matches!(
        error,
        ToolError::CatalogRejected { ref tenant, status: 403 } if tenant == "acme"
    ));
}

#[test]
fn patch_returns_failure_statuses_as_replies() {
    let (base_url, server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#);
    let request = PatchRequest {
        url: format!("{base_url}/api/v2/acme/use_cases/42/custom_fields"),
        payload: PatchPayload::new("cf-1", "emea"),
    };

    let reply = client(&base_url)
        .patch_custom_field("bearer-1", &request)
        .expect("answered");
    let raw = server.join().expect("server thread").remove(0);

    assert_eq!(reply.status, 500);
    assert!(!reply.is_success());
    assert_eq!(reply.body, r#"{"error":"boom"}"#);
    assert!(raw.starts_with("PATCH /api/v2/acme/use_cases/42/custom_fields HTTP/1.1"));
    assert!(raw.contains(r#""type":"use_case_custom_fields""#));
    assert!(raw.contains(r#""custom_field_id":"cf-1""#));
}

#[test]
fn unreadable_patch_body_is_reported_in_the_reply() {
    let truncated = "HTTP/1.1 502 Bad Gateway\r\nContent-Type: application/json\r\nContent-Length: 64\r\nConnection: close\r\n\r\n{\"err".to_string();
    let (base_url, server) = serve(vec![truncated]);
    let request = PatchRequest {
        url: format!("{base_url}/api/v2/acme/use_cases/42/custom_fields"),
        payload: PatchPayload::new("cf-1", "emea"),
    };

    let reply = client(&base_url)
        .patch_custom_field("bearer-1", &request)
        .expect("answered");
    server.join().expect("server thread");

    assert_eq!(reply.status, 502);
    assert!(!reply.is_success());
    assert!(reply.body.starts_with("<unreadable response body: "), "{}", reply.body);
}
