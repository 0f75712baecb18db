//! Integration tests for the request executor.
//!
//! Attempt counting and backoff timing use a scripted in-process transport
//! with paused tokio time; wire format tests go through reqwest against a
//! wiremock server.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use inquestlabs_core::api::{
    ApiPayload, BackoffPolicy, Executor, OutboundRequest, RequestSpec, Transport, TransportError,
    TransportResponse, operations,
};
use inquestlabs_core::{ClientConfig, ErrorKind, LabsError};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "https://labs.example/api";

/// Transport failing `failures` times before answering with `response`.
struct ScriptedTransport {
    failures: u32,
    kind: fn(String) -> TransportError,
    response: TransportResponse,
    calls: AtomicU32,
}

impl ScriptedTransport {
    fn failing_forever() -> Self {
        Self::transient_then_ok(u32::MAX)
    }

    fn transient_then_ok(failures: u32) -> Self {
        Self {
            failures,
            kind: |message| TransportError::transient(message),
            response: envelope_ok(),
            calls: AtomicU32::new(0),
        }
    }

    fn rejecting() -> Self {
        Self {
            failures: u32::MAX,
            kind: |message| TransportError::request(message),
            response: envelope_ok(),
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, _request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err((self.kind)(format!("connection reset (call {call})")))
        } else {
            Ok(self.response.clone())
        }
    }
}

fn envelope_ok() -> TransportResponse {
    TransportResponse {
        status: 200,
        body: json!({"success": true, "data": ["ok"]}).to_string().into_bytes(),
    }
}

fn executor_with(transport: Arc<ScriptedTransport>, budget: u32) -> Executor {
    Executor::new(
        BASE,
        None,
        BackoffPolicy::with_max_attempts(budget).without_jitter(),
        transport,
    )
}

// ==================== Retry Tests ====================

#[tokio::test(start_paused = true)]
async fn test_exhausts_exactly_the_retry_budget() {
    let transport = Arc::new(ScriptedTransport::failing_forever());
    let executor = executor_with(Arc::clone(&transport), 3);

    let err = executor
        .execute(&operations::dfi_list(), false)
        .await
        .unwrap_err();

    assert_eq!(transport.calls(), 3);
    assert_eq!(err.kind(), ErrorKind::ExhaustedRetries);
    match err {
        LabsError::ExhaustedRetries {
            endpoint,
            attempts,
            last_error,
        } => {
            assert_eq!(endpoint, format!("{BASE}/dfi/list"));
            assert_eq!(attempts, 3);
            assert!(last_error.contains("call 3"), "{last_error}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_sleeps_only_between_attempts() {
    let transport = Arc::new(ScriptedTransport::failing_forever());
    let executor = executor_with(Arc::clone(&transport), 3);

    let start = tokio::time::Instant::now();
    let _ = executor.execute(&operations::dfi_list(), false).await;

    // 100ms after attempt 1, 400ms after attempt 2, nothing after attempt 3
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(500), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(510), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_budget_of_one_never_sleeps() {
    let transport = Arc::new(ScriptedTransport::failing_forever());
    let executor = executor_with(Arc::clone(&transport), 1);

    let start = tokio::time::Instant::now();
    let err = executor.execute(&operations::stats(), false).await.unwrap_err();

    assert_eq!(transport.calls(), 1);
    assert!(start.elapsed() < Duration::from_millis(5));
    assert!(err.to_string().starts_with("exceeded 1 attempts"), "{err}");
}

#[tokio::test(start_paused = true)]
async fn test_success_on_attempt_k_stops_retrying() {
    let transport = Arc::new(ScriptedTransport::transient_then_ok(2));
    let executor = executor_with(Arc::clone(&transport), 5);

    let payload = executor
        .execute(&operations::dfi_list(), false)
        .await
        .unwrap();

    assert_eq!(transport.calls(), 3);
    assert_eq!(payload, ApiPayload::Json(json!(["ok"])));
}

#[tokio::test(start_paused = true)]
async fn test_jittered_sleep_stays_below_ceiling() {
    let transport = Arc::new(ScriptedTransport::failing_forever());
    let executor = Executor::new(
        BASE,
        None,
        BackoffPolicy::with_max_attempts(3),
        Arc::clone(&transport) as Arc<dyn Transport>,
    );

    let start = tokio::time::Instant::now();
    let _ = executor.execute(&operations::dfi_list(), false).await;

    assert!(start.elapsed() <= Duration::from_millis(505));
}

#[tokio::test]
async fn test_unusable_request_is_not_retried() {
    let transport = Arc::new(ScriptedTransport::rejecting());
    let executor = executor_with(Arc::clone(&transport), 3);

    let err = executor
        .execute(&operations::dfi_list(), false)
        .await
        .unwrap_err();

    assert_eq!(transport.calls(), 1);
    assert_eq!(err.kind(), ErrorKind::Request);
}

#[tokio::test]
async fn test_invalid_method_makes_no_call() {
    let transport = Arc::new(ScriptedTransport::transient_then_ok(0));
    let _executor = executor_with(Arc::clone(&transport), 3);

    let err = RequestSpec::new("/dfi/list", "PUT").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("GET, POST"), "{err}");
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_missing_attachment_is_io_error_without_call() {
    let transport = Arc::new(ScriptedTransport::transient_then_ok(0));
    let executor = executor_with(Arc::clone(&transport), 3);
    let spec = RequestSpec::post("/dfi/upload").attach_file("file", "/no/such/sample.docx");

    let err = executor.execute(&spec, false).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(transport.calls(), 0);
}

// ==================== Wire Tests ====================

fn executor_for(server: &MockServer, api_key: Option<&str>) -> Executor {
    let config = ClientConfig::default()
        .with_base_url(server.uri())
        .with_retry_budget(1);
    Executor::from_config(&config, api_key.map(str::to_string)).unwrap()
}

#[tokio::test]
async fn test_success_envelope_returns_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "data": {"dfi": 42}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let payload = executor_for(&server, None)
        .execute(&operations::stats(), false)
        .await
        .unwrap();

    assert_eq!(payload.into_json(), json!({"dfi": 42}));
}

#[tokio::test]
async fn test_api_level_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dfi/list"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": false, "error": "quota exceeded"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::default().with_base_url(server.uri());
    let executor = Executor::from_config(&config, None).unwrap();
    let err = executor
        .execute(&operations::dfi_list(), false)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ApiLevel);
    assert!(err.to_string().contains("status=200"), "{err}");
    assert!(err.to_string().contains("quota exceeded"), "{err}");
}

#[tokio::test]
async fn test_http_error_carries_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dfi/details"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"success": false, "error": "not found"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = executor_for(&server, None)
        .execute(&operations::dfi_details("abc"), false)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::HttpLevel);
    let message = err.to_string();
    assert!(message.contains("status=404"), "{message}");
    assert!(message.contains("not found"), "{message}");
}

#[tokio::test]
async fn test_http_error_with_html_body_reports_na() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = executor_for(&server, None)
        .execute(&operations::dfi_list(), false)
        .await
        .unwrap_err();

    assert!(err.to_string().ends_with(": n/a"), "{err}");
}

#[tokio::test]
async fn test_non_envelope_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("definitely not json"))
        .mount(&server)
        .await;

    let err = executor_for(&server, None)
        .execute(&operations::dfi_list(), false)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn test_raw_mode_returns_body_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dfi/download"))
        .and(query_param("sha256", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xD0\xCF\x11\xE0".to_vec()))
        .mount(&server)
        .await;

    let payload = executor_for(&server, None)
        .execute(&operations::dfi_download("abc"), true)
        .await
        .unwrap();

    assert_eq!(payload.into_bytes(), b"\xD0\xCF\x11\xE0".to_vec());
}

#[tokio::test]
async fn test_authorization_header_sent_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Basic: secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": []})))
        .expect(1)
        .mount(&server)
        .await;

    executor_for(&server, Some("secret-key"))
        .execute(&operations::dfi_list(), false)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_anonymous_requests_carry_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": []})))
        .mount(&server)
        .await;

    let executor = executor_for(&server, None);
    assert!(!executor.is_authenticated());
    executor
        .execute(&operations::dfi_list(), false)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
    let agent = requests[0].headers.get("user-agent").unwrap().to_str().unwrap();
    assert!(agent.starts_with("inquestlabs-rs/"), "{agent}");
}

#[tokio::test]
async fn test_get_fields_sent_as_query_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/yara/trigger"))
        .and(query_param("trigger", "MZ"))
        .and(query_param("offset", "0x10"))
        .and(query_param("is_hex", "False"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": "uint16(0x10) == 0x5a4d"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let spec = operations::yara_uint("MZ", "0x10", false).unwrap();
    let payload = executor_for(&server, None).execute(&spec, false).await.unwrap();

    assert_eq!(payload.into_json(), json!("uint16(0x10) == 0x5a4d"));
}

#[tokio::test]
async fn test_post_fields_sent_as_urlencoded_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("term=a+b%26c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": null})))
        .expect(1)
        .mount(&server)
        .await;

    let spec = RequestSpec::post("/echo").field("term", "a b&c");
    executor_for(&server, None).execute(&spec, false).await.unwrap();
}

#[tokio::test]
async fn test_upload_sent_as_multipart() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();
    let sample = dir.path().join("invoice.docx");
    std::fs::write(&sample, b"PK\x03\x04 sample").unwrap();

    Mock::given(method("POST"))
        .and(path("/dfi/upload"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"invoice.docx\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": "c0ffee"})))
        .expect(1)
        .mount(&server)
        .await;

    let spec = operations::dfi_upload(&sample).unwrap();
    let payload = executor_for(&server, None).execute(&spec, false).await.unwrap();

    assert_eq!(payload.into_json(), json!("c0ffee"));
}

#[tokio::test]
async fn test_connection_refused_exhausts_budget() {
    // Nothing listens on the discard port.
    let config = ClientConfig::default()
        .with_base_url("http://127.0.0.1:9/api")
        .with_retry_budget(2);
    let executor = Executor::from_config(&config, None).unwrap();

    let err = executor
        .execute(&operations::dfi_list(), false)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExhaustedRetries);
    assert!(err.to_string().starts_with("exceeded 2 attempts"), "{err}");
}
