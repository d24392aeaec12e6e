//! Render-then-generate flows exercised against a mock provider.

use std::collections::HashMap;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;

use promptcraft::{
    CompletionRequest, LlmClient, PromptTemplate, PromptcraftError, Provider, RetryPolicy, Value,
};

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), Value::from(*value)))
        .collect()
}

#[test]
fn renders_with_variables() {
    let tmpl = PromptTemplate::new("Hello {{ name }}!");
    let rendered = tmpl.render(&vars(&[("name", "World")]), None).expect("render");
    assert_eq!(rendered, "Hello World!");
}

#[test]
fn renders_with_defaults_when_variables_are_empty() {
    let tmpl = PromptTemplate::new("Hello {{ name }}!");
    let rendered = tmpl
        .render(&HashMap::new(), Some(&vars(&[("name", "Default")])))
        .expect("render");
    assert_eq!(rendered, "Hello Default!");
}

#[test]
fn forbidden_templates_never_reach_rendering() {
    let tmpl = PromptTemplate::new("{{ eval('x') }}");
    let errors = tmpl.validate();
    assert!(errors.iter().any(|e| e.contains("eval")), "{errors:?}");
    assert!(matches!(
        tmpl.render(&HashMap::new(), None),
        Err(PromptcraftError::TemplateRejected(_))
    ));
}

#[tokio::test]
async fn rendered_prompt_flows_through_generation_with_cost() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/messages")
            .json_body_partial(r#"{"messages": [{"role": "user", "content": "Hello World!"}]}"#);
        then.status(200).json_body(json!({
            "content": [{"type": "text", "text": "Hi there"}],
            "usage": {"input_tokens": 1000, "output_tokens": 500}
        }));
    });

    let tmpl = PromptTemplate::new("Hello {{ name }}!");
    let prompt = tmpl.render(&vars(&[("name", "World")]), None).expect("render");

    let client = LlmClient::builder()
        .anthropic_api_key("test-key")
        .anthropic_base_url(server.url(""))
        .timeout(Duration::from_secs(5))
        .retry(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        })
        .build()
        .expect("valid client config");

    let completion = client
        .generate(CompletionRequest::new(
            prompt,
            Provider::Anthropic,
            "claude-sonnet-4-20250514",
        ))
        .await
        .expect("generate");

    assert_eq!(completion.text, "Hi there");
    assert_eq!(completion.total_tokens, 1500);
    assert!((completion.cost_usd - 0.0105).abs() < 1e-9);
    mock.assert();
}

#[tokio::test]
async fn transient_failures_are_retried_before_success() {
    let server = MockServer::start();
    let failing = server.mock(|when, then| {
        when.method(POST).path("/v1/messages");
        then.status(503).json_body(json!({
            "error": {"type": "overloaded_error", "message": "overloaded"}
        }));
    });

    let client = LlmClient::builder()
        .anthropic_api_key("test-key")
        .anthropic_base_url(server.url(""))
        .timeout(Duration::from_secs(5))
        .retry(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        })
        .build()
        .expect("valid client config");

    let err = client
        .generate(CompletionRequest::new(
            "hi",
            Provider::Anthropic,
            "claude-sonnet-4-20250514",
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, PromptcraftError::CallFailed { attempts: 3, .. }));
    assert_eq!(failing.hits(), 3);
}
