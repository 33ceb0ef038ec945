//! Integration tests for the request client, driven against a mock server.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crestline_api::{
    ApiClient, ApiError, CancelToken, EnvelopeError, MultipartForm, ParsedBody, RequestOverrides,
    ResponseFormat,
};
use wiremock::matchers::{any, body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn get_request_classifies_json_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/account"))
        .and(query_param("limit", "100"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": [{"name": "Ada"}],
            })),
        )
        .mount(&server)
        .await;

    let client: ApiClient = ApiClient::builder(server.uri()).build().expect("client");
    let envelope = client
        .get("/account")
        .query("limit", 100i64)
        .format(ResponseFormat::Json)
        .send()
        .await
        .expect("successful request");

    assert_eq!(envelope.status(), 200);
    assert!(envelope.is_success());
    assert!(matches!(envelope.data(), Some(ParsedBody::Json(_))));
    assert!(envelope.error().is_none());

    #[derive(serde::Deserialize)]
    struct Listing {
        success: bool,
    }
    let listing: Listing = envelope.data_as().expect("typed data");
    assert!(listing.success);
}

#[tokio::test]
async fn json_body_is_sent_as_json_text_with_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/account"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({"name": "Ada"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 1})))
        .mount(&server)
        .await;

    let client: ApiClient = ApiClient::builder(server.uri()).build().expect("client");
    let envelope = client
        .post("/account")
        .json(&serde_json::json!({"name": "Ada"}))
        .format(ResponseFormat::Json)
        .send()
        .await
        .expect("successful request");

    assert_eq!(envelope.status(), 201);
}

#[tokio::test]
async fn url_encoded_body_delegates_to_the_query_codec() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("a=x%20y&b=1&b=2"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client: ApiClient = ApiClient::builder(server.uri()).build().expect("client");
    client
        .post("/auth/login")
        .form(&serde_json::json!({"a": "x y", "b": [1, 2]}))
        .send()
        .await
        .expect("successful request");
}

#[tokio::test]
async fn multipart_body_keeps_the_boundary_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client: ApiClient = ApiClient::builder(server.uri()).build().expect("client");
    let form = MultipartForm::new()
        .text("name", "statement")
        .file_bytes("file", vec![1u8, 2, 3], "statement.pdf", Some("application/pdf"));
    client
        .post("/documents")
        .multipart(form)
        .send()
        .await
        .expect("successful request");

    let requests = server.received_requests().await.expect("recording enabled");
    let content_type = requests[0]
        .headers
        .get("content-type")
        .expect("content-type present")
        .to_str()
        .expect("ascii header");
    // reqwest supplies the boundary itself; the client must not overwrite it.
    assert!(content_type.starts_with("multipart/form-data; boundary="));
}

#[tokio::test]
async fn no_format_returns_the_raw_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export"))
        .respond_with(ResponseTemplate::new(200).set_body_string("plain payload"))
        .mount(&server)
        .await;

    let client: ApiClient = ApiClient::builder(server.uri()).build().expect("client");
    let envelope = client.get("/export").send().await.expect("successful request");

    assert!(envelope.data().is_none());
    assert!(envelope.error().is_none());
    assert_eq!(envelope.text(), Some("plain payload"));
}

#[tokio::test]
async fn no_format_failure_carries_the_raw_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client: ApiClient = ApiClient::builder(server.uri()).build().expect("client");
    let err = client.get("/export").send().await.unwrap_err();

    match err {
        ApiError::Status { status, envelope } => {
            assert_eq!(status, 500);
            assert!(envelope.data().is_none());
            assert!(envelope.error().is_none());
            assert_eq!(envelope.text(), Some("boom"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn failure_status_with_parsed_body_fails_with_the_error_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(serde_json::json!({"error": "bad"})),
        )
        .mount(&server)
        .await;

    let client: ApiClient = ApiClient::builder(server.uri()).build().expect("client");
    let err = client
        .get("/admin")
        .format(ResponseFormat::Json)
        .send()
        .await
        .unwrap_err();

    match err {
        ApiError::Status { status, envelope } => {
            assert_eq!(status, 422);
            assert!(envelope.data().is_none());
            assert_eq!(
                envelope.error(),
                Some(&EnvelopeError::Payload(ParsedBody::Json(
                    serde_json::json!({"error": "bad"})
                )))
            );
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn parse_failure_on_success_status_is_captured_in_the_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client: ApiClient = ApiClient::builder(server.uri()).build().expect("client");
    let envelope = client
        .get("/status")
        .format(ResponseFormat::Json)
        .send()
        .await
        .expect("transport success even though parsing failed");

    assert!(envelope.data().is_none());
    assert!(matches!(envelope.error(), Some(EnvelopeError::Decode(_))));
    assert_eq!(envelope.text(), Some("not json"));
}

#[tokio::test]
async fn security_layer_wins_the_header_merge() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/organizations"))
        .and(header("x-tenant", "3"))
        .and(header("x-trace", "2"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client: ApiClient<String> = ApiClient::builder(server.uri())
        .base_header("X-Tenant", "1")
        .security_resolver(|_data: Option<String>| async move {
            Ok(Some(RequestOverrides::new().header("X-Tenant", "3")))
        })
        .build()
        .expect("client");

    client
        .get("/organizations")
        .header("X-Trace", "2")
        .secure(true)
        .send()
        .await
        .expect("successful request");
}

#[tokio::test]
async fn resolver_runs_only_for_secure_calls() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();
    let client: ApiClient<String> = ApiClient::builder(server.uri())
        .security_resolver(move |_data: Option<String>| {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            }
        })
        .build()
        .expect("client");

    client.get("/public").send().await.expect("request");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    client
        .get("/private")
        .secure(true)
        .send()
        .await
        .expect("request");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn resolver_error_fails_the_call_before_the_transport() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client: ApiClient<String> = ApiClient::builder(server.uri())
        .secure_by_default(true)
        .security_resolver(|_data: Option<String>| async move {
            Err(ApiError::Compose("no active session".to_string()))
        })
        .build()
        .expect("client");

    let err = client.get("/account").send().await.unwrap_err();
    assert!(matches!(err, ApiError::Compose(_)));
}

#[tokio::test]
async fn security_data_updates_are_visible_to_later_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/first"))
        .and(header("x-session", "anon"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second"))
        .and(header("x-session", "tok-123"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client: ApiClient<String> = ApiClient::builder(server.uri())
        .secure_by_default(true)
        .security_resolver(|data: Option<String>| async move {
            let session = data.unwrap_or_else(|| "anon".to_string());
            Ok(Some(RequestOverrides::new().header("X-Session", session)))
        })
        .build()
        .expect("client");

    client.get("/first").send().await.expect("request");

    client.set_security_data(Some("tok-123".to_string()));
    client.get("/second").send().await.expect("request");
}

#[tokio::test]
async fn aborting_a_shared_token_cancels_every_request_using_it() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let client: ApiClient = ApiClient::builder(server.uri()).build().expect("client");
    let token = CancelToken::from("dashboard-load");

    let first = tokio::spawn({
        let client = client.clone();
        let token = token.clone();
        async move { client.get("/a").cancel_token(token).send().await }
    });
    let second = tokio::spawn({
        let client = client.clone();
        let token = token.clone();
        async move { client.get("/b").cancel_token(token).send().await }
    });

    // Let both calls reach the transport before firing the abort.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(client.abort(&token));

    let first = first.await.expect("task joined");
    let second = second.await.expect("task joined");
    assert!(matches!(first.unwrap_err(), ApiError::Cancelled));
    assert!(matches!(second.unwrap_err(), ApiError::Cancelled));

    // The registry entry is gone; the token can be reused with a fresh handle.
    assert!(!client.cancellations().contains(&token));
    assert!(!client.cancellations().signal(&token).is_fired());
}

#[tokio::test]
async fn completed_calls_release_their_token_entry() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client: ApiClient = ApiClient::builder(server.uri()).build().expect("client");
    let token = CancelToken::unique();

    client
        .get("/quick")
        .cancel_token(token.clone())
        .send()
        .await
        .expect("request");

    assert!(!client.cancellations().contains(&token));
}

#[tokio::test]
async fn failed_calls_also_release_their_token_entry() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client: ApiClient = ApiClient::builder(server.uri()).build().expect("client");
    let token = CancelToken::from("doomed");

    let err = client
        .get("/down")
        .cancel_token(token.clone())
        .send()
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 503, .. }));
    assert!(!client.cancellations().contains(&token));
}

#[tokio::test]
async fn per_call_base_url_overrides_the_client_default() {
    let home = MockServer::start().await;
    let staging = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&home)
        .await;
    Mock::given(method("GET"))
        .and(path("/signup"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&staging)
        .await;

    let client: ApiClient = ApiClient::builder(home.uri()).build().expect("client");
    client
        .get("/signup")
        .base_url(staging.uri())
        .send()
        .await
        .expect("request against the per-call base URL");
}

#[tokio::test]
async fn text_format_decodes_the_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client: ApiClient = ApiClient::builder(server.uri()).build().expect("client");
    let envelope = client
        .get("/health")
        .format(ResponseFormat::Text)
        .send()
        .await
        .expect("request");

    assert_eq!(envelope.data(), Some(&ParsedBody::Text("ok".to_string())));
}

#[tokio::test]
async fn default_format_applies_when_the_call_sets_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 7})))
        .mount(&server)
        .await;

    let client: ApiClient = ApiClient::builder(server.uri())
        .default_format(ResponseFormat::Json)
        .build()
        .expect("client");

    let envelope = client.get("/me").send().await.expect("request");
    assert!(matches!(envelope.data(), Some(ParsedBody::Json(_))));
}
