//! Wiremock helpers emulating the Supervisor API

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// `Authorization` value for a token
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Reject every request carrying `token` with 401
pub async fn mock_rejected_token(server: &MockServer, token: &str) {
    Mock::given(header("Authorization", bearer(token).as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "result": "error",
            "message": "Unauthorized"
        })))
        .with_priority(1)
        .mount(server)
        .await;
}

/// Answer `verb path` with 200 and the given envelope
pub async fn mock_envelope(server: &MockServer, verb: &str, route: &str, envelope: Value) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope))
        .mount(server)
        .await;
}

/// Snapshot listing envelope from `(slug, date)` pairs
pub fn backup_list(entries: &[(&str, &str)]) -> Value {
    let backups: Vec<Value> = entries
        .iter()
        .map(|(slug, date)| {
            json!({
                "slug": slug,
                "name": format!("borg-{}", slug),
                "date": date,
                "type": "full",
                "size": 42.5
            })
        })
        .collect();

    json!({ "result": "ok", "data": { "backups": backups } })
}
