mod common;

use common::{sample_lookup, sample_roster, MockApi, Sidecar};
use serde_json::json;

#[test]
fn health_reports_version_and_api() {
    let api = MockApi::start(sample_lookup(), sample_roster());
    let mut sc = Sidecar::spawn(&api.base_url);

    let health = sc.request_ok("1", "health", json!({}));
    assert_eq!(health["version"].as_str(), Some(env!("CARGO_PKG_VERSION")));
    assert!(health["workspacePath"].is_null());
    assert!(health["apiBaseUrl"]
        .as_str()
        .expect("apiBaseUrl")
        .starts_with(&api.base_url));

    sc.shutdown();
}

#[test]
fn malformed_and_unknown_requests_get_errors() {
    let api = MockApi::start(sample_lookup(), sample_roster());
    let mut sc = Sidecar::spawn(&api.base_url);

    sc.send_raw("{not json");
    let bad = sc.read();
    assert_eq!(bad["ok"].as_bool(), Some(false));
    assert_eq!(bad["error"]["code"].as_str(), Some("bad_json"));

    assert_eq!(sc.request_err("2", "grades.teleport", json!({})), "not_implemented");
    assert_eq!(
        sc.request_err("3", "workspace.select", json!({})),
        "bad_params"
    );
    assert_eq!(
        sc.request_err("4", "selection.set", json!({ "courseId": "one", "subjectId": 3 })),
        "bad_params"
    );

    sc.shutdown();
}

#[test]
fn operations_without_prerequisites_are_refused() {
    let api = MockApi::start(sample_lookup(), sample_roster());
    let mut sc = Sidecar::spawn(&api.base_url);

    assert_eq!(sc.request_err("1", "drafts.list", json!({})), "no_workspace");
    assert_eq!(sc.request_err("2", "roster.fetch", json!({})), "selection_required");
    assert_eq!(sc.request_err("3", "grades.saveAll", json!({})), "nothing_to_save");
    assert_eq!(
        sc.request_err(
            "4",
            "grades.edit",
            json!({ "recordId": 1, "field": "mac1", "value": "5" })
        ),
        "no_roster"
    );

    // Lookup data not loaded yet, so the subject cannot be resolved.
    sc.request_ok("5", "selection.set", json!({ "courseId": 1, "subjectId": 3 }));
    assert_eq!(sc.request_err("6", "roster.fetch", json!({})), "not_found");

    let status = sc.request_ok("7", "session.status", json!({}));
    assert_eq!(status["selection"], json!({ "courseId": 1, "subjectId": 3 }));
    assert_eq!(status["loading"].as_bool(), Some(false));
    assert_eq!(status["rosterLoaded"].as_bool(), Some(false));

    sc.shutdown();
}

#[test]
fn unreachable_api_surfaces_api_failed() {
    // Nothing listens on the discard port.
    let mut sc = Sidecar::spawn("http://127.0.0.1:9");
    assert_eq!(sc.request_err("1", "lookup.load", json!({})), "api_failed");
    let courses = sc.request_ok("2", "courses.list", json!({}));
    assert_eq!(courses["courses"], json!([]));
    sc.shutdown();
}
