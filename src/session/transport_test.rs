use super::*;
use serde_json::json;

#[test]
fn join_url_handles_leading_slash() {
    assert_eq!(join_url("http://api.test/api", "/auth/me"), "http://api.test/api/auth/me");
    assert_eq!(join_url("http://api.test/api", "users"), "http://api.test/api/users");
}

#[test]
fn http_transport_trims_trailing_slash() {
    let transport = HttpTransport::new("http://api.test/api/", HttpTimeouts::default()).unwrap();
    assert_eq!(transport.base_url(), "http://api.test/api");
    assert_eq!(transport.url("/auth/login"), "http://api.test/api/auth/login");
}

#[test]
fn request_builders_set_method_and_body() {
    let req = ApiRequest::post("/auth/login", json!({"identifier": "a"}));
    assert_eq!(req.method, Method::Post);
    assert_eq!(req.body, Some(json!({"identifier": "a"})));
    assert!(req.bearer.is_none());

    let req = ApiRequest::delete("/users/1").with_bearer(Some("tok".into()));
    assert_eq!(req.method, Method::Delete);
    assert_eq!(req.bearer.as_deref(), Some("tok"));
}

#[test]
fn response_status_helpers() {
    assert!(ApiResponse::new(200, "").is_success());
    assert!(ApiResponse::new(204, "").is_success());
    assert!(!ApiResponse::new(302, "").is_success());
    assert!(ApiResponse::new(401, "").is_unauthorized());
    assert!(!ApiResponse::new(403, "").is_unauthorized());
}

#[test]
fn error_message_reads_message_field() {
    let resp = ApiResponse::new(400, r#"{"message": "Invalid credentials"}"#);
    assert_eq!(resp.error_message().as_deref(), Some("Invalid credentials"));
}

#[test]
fn error_message_absent_for_non_json_or_blank() {
    assert_eq!(ApiResponse::new(502, "<html>bad gateway</html>").error_message(), None);
    assert_eq!(ApiResponse::new(400, r#"{"message": "  "}"#).error_message(), None);
    assert_eq!(ApiResponse::new(400, r#"{"error": "x"}"#).error_message(), None);
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let transport = HttpTransport::new("http://127.0.0.1:1", HttpTimeouts { request_secs: 2, connect_secs: 1 }).unwrap();
    let err = transport.send(&ApiRequest::get("/auth/me")).await.unwrap_err();
    assert!(matches!(err, SessionError::Transport(_)));
}
