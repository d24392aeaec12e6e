use promptcraft_audit::ExecutionTrail;
use serde_json::json;

#[test]
fn creates_a_timestamped_directory_under_the_base() {
    let base = tempfile::tempdir().expect("tempdir");
    let trail = ExecutionTrail::create(base.path()).expect("trail");
    assert!(trail.dir().is_dir());
    assert_eq!(trail.dir().parent(), Some(base.path()));
}

#[test]
fn records_request_as_json() {
    let base = tempfile::tempdir().expect("tempdir");
    let trail = ExecutionTrail::create(base.path()).expect("trail");
    trail
        .record_request(&json!({"provider": "anthropic", "model": "claude-sonnet-4-20250514"}))
        .expect("write");
    let content = std::fs::read_to_string(trail.dir().join("request.json")).expect("read");
    assert!(content.contains("\"provider\": \"anthropic\""));
}

#[test]
fn records_rendered_prompt_verbatim() {
    let base = tempfile::tempdir().expect("tempdir");
    let trail = ExecutionTrail::create(base.path()).expect("trail");
    trail.record_rendered_prompt("Hello World\n").expect("write");
    let content =
        std::fs::read_to_string(trail.dir().join("rendered_prompt.txt")).expect("read");
    assert_eq!(content, "Hello World\n");
}

#[test]
fn records_response_audit_and_metrics_artifacts() {
    let base = tempfile::tempdir().expect("tempdir");
    let trail = ExecutionTrail::create(base.path()).expect("trail");

    trail.record_response(&json!({"text": "reply"})).expect("write");
    trail.record_audit(&json!({"action": "generate"})).expect("write");
    trail.record_metrics(&json!({"total_tokens": 100})).expect("write");

    for (name, needle) in [
        ("response.json", "\"text\": \"reply\""),
        ("audit.log", "\"action\": \"generate\""),
        ("metrics.json", "\"total_tokens\": 100"),
    ] {
        let content = std::fs::read_to_string(trail.dir().join(name)).expect(name);
        assert!(content.contains(needle), "{name}: {content}");
    }
}
