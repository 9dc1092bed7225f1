use reqwest::StatusCode;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::{Value, json};
use std::time::Duration;
use veracity_http::{Auth, HttpClient, HttpError, RequestOpts};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::new(&format!("{}/v1/", server.uri())).expect("valid base url")
}

#[tokio::test]
async fn posts_json_with_header_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/echo"))
        .and(header("x-goog-api-key", "k-123"))
        .and(body_json(json!({"hello": "world"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let opts = RequestOpts {
        auth: Some(Auth::Header {
            name: HeaderName::from_static("x-goog-api-key"),
            value: HeaderValue::from_static("k-123"),
        }),
        ..Default::default()
    };
    let got: Value = client_for(&server)
        .post_json("echo", &json!({"hello": "world"}), opts)
        .await
        .expect("success");
    assert_eq!(got, json!({"ok": true}));
}

#[tokio::test]
async fn rate_limits_honour_retry_after_when_retries_are_enabled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let opts = RequestOpts {
        retries: Some(1),
        ..Default::default()
    };
    let got: Value = client_for(&server)
        .post_json("limited", &json!({}), opts)
        .await
        .expect("retried after rate limit");
    assert_eq!(got["ok"], 1);
}

#[tokio::test]
async fn client_errors_are_never_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .with_retries(3)
        .post_json::<_, Value>("bad", &json!({}), RequestOpts::default())
        .await
        .expect_err("400 fails");
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert!(err.to_string().contains("API key not valid"));
}

#[tokio::test]
async fn server_errors_are_not_retried_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_json(json!({"error": {"code": 503, "message": "overloaded"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .post_json::<_, Value>("busy", &json!({}), RequestOpts::default())
        .await
        .expect_err("503 must fail");

    match err {
        HttpError::Api {
            status, message, ..
        } => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(message, "overloaded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn opt_in_retries_recover_from_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"n": 2})))
        .mount(&server)
        .await;

    let got: Value = client_for(&server)
        .with_retries(1)
        .post_json("flaky", &json!({}), RequestOpts::default())
        .await
        .expect("second attempt succeeds");
    assert_eq!(got["n"], 2);
}

#[tokio::test]
async fn undecodable_success_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .post_json::<_, Value>("html", &json!({}), RequestOpts::default())
        .await
        .expect_err("html is not json");
    assert!(matches!(err, HttpError::Decode(_, ref snip) if snip.contains("not json")));
}

#[tokio::test]
async fn per_request_timeout_is_enforced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let opts = RequestOpts {
        timeout: Some(Duration::from_millis(100)),
        ..Default::default()
    };
    let err = client_for(&server)
        .post_json::<_, Value>("slow", &json!({}), opts)
        .await
        .expect_err("must time out");
    assert!(matches!(err, HttpError::Network(_)));
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    // Bind then drop to get a port nobody listens on.
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let client = HttpClient::new(&format!("http://127.0.0.1:{port}/")).unwrap();
    let err = client
        .post_json::<_, Value>("x", &json!({}), RequestOpts::default())
        .await
        .expect_err("connection refused");
    assert!(matches!(err, HttpError::Network(_)));
}

#[tokio::test]
async fn without_a_timeout_slow_replies_are_awaited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"late": true}))
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.default_timeout, None);
    let got: Value = client
        .post_json("slow", &json!({}), RequestOpts::default())
        .await
        .expect("no implicit deadline");
    assert_eq!(got, json!({"late": true}));
}
