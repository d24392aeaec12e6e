use std::collections::HashMap;

use promptcraft_core::{PromptcraftError, Value};
use promptcraft_prompt::{merge_variables, PromptTemplate};
use serde_json::json;

fn vars(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[test]
fn renders_template_with_vars() {
    let tmpl = PromptTemplate::new("Hello {{ name }}!");
    let rendered = tmpl
        .render(&vars(&[("name", Value::from("World"))]), None)
        .expect("render");
    assert_eq!(rendered, "Hello World!");
}

#[test]
fn missing_variables_fall_back_to_defaults() {
    let tmpl = PromptTemplate::new("Hello {{ name }}!");
    let defaults = vars(&[("name", Value::from("Default"))]);
    let rendered = tmpl
        .render(&HashMap::new(), Some(&defaults))
        .expect("render");
    assert_eq!(rendered, "Hello Default!");
}

#[test]
fn explicit_variables_override_defaults() {
    let tmpl = PromptTemplate::new("Hello {{ name }}!");
    let defaults = vars(&[("name", Value::from("Default"))]);
    let rendered = tmpl
        .render(&vars(&[("name", Value::from("Override"))]), Some(&defaults))
        .expect("render");
    assert_eq!(rendered, "Hello Override!");
}

#[test]
fn undefined_variables_render_empty() {
    let tmpl = PromptTemplate::new("Hello {{ name }}!");
    let rendered = tmpl.render(&HashMap::new(), None).expect("render");
    assert_eq!(rendered, "Hello !");
}

#[test]
fn merge_is_shallow() {
    let defaults = vars(&[("config", json!({"a": 1, "b": 2}))]);
    let overrides = vars(&[("config", json!({"a": 9}))]);
    let merged = merge_variables(Some(&defaults), &overrides);
    assert_eq!(merged.get("config"), Some(&json!({"a": 9})));
}

#[test]
fn rendering_is_deterministic() {
    let tmpl = PromptTemplate::new("{{ greeting }}, {{ name }}.");
    let v = vars(&[
        ("greeting", Value::from("Hi")),
        ("name", Value::from("Ada")),
    ]);
    let first = tmpl.render(&v, None).expect("render");
    let second = tmpl.render(&v, None).expect("render");
    assert_eq!(first, second);
    assert_eq!(first, "Hi, Ada.");
}

#[test]
fn output_is_html_escaped_by_default() {
    let tmpl = PromptTemplate::new("<p>{{ body }}</p>");
    let rendered = tmpl
        .render(&vars(&[("body", Value::from("<script>&'\""))]), None)
        .expect("render");
    assert_eq!(rendered, "<p>&lt;script&gt;&amp;&#39;&#34;</p>");
}

#[test]
fn safe_filter_bypasses_escaping() {
    let tmpl = PromptTemplate::new("{{ body | safe }}");
    let rendered = tmpl
        .render(&vars(&[("body", Value::from("<b>bold</b>"))]), None)
        .expect("render");
    assert_eq!(rendered, "<b>bold</b>");
}

#[test]
fn safe_must_be_the_outermost_filter() {
    let tmpl = PromptTemplate::new("{{ body | safe | upper }}");
    let rendered = tmpl
        .render(&vars(&[("body", Value::from("<b>"))]), None)
        .expect("render");
    assert_eq!(rendered, "&lt;B&gt;");
}

#[test]
fn conditionals_follow_the_merged_variables() {
    let tmpl = PromptTemplate::new(
        "{% if user.admin %}admin{% elif user.name %}{{ user.name }}{% else %}guest{% endif %}",
    );
    let admin = vars(&[("user", json!({"admin": true, "name": "Ada"}))]);
    assert_eq!(tmpl.render(&admin, None).expect("render"), "admin");

    let named = vars(&[("user", json!({"admin": false, "name": "Ada"}))]);
    assert_eq!(tmpl.render(&named, None).expect("render"), "Ada");

    let nobody = vars(&[("user", json!({}))]);
    assert_eq!(tmpl.render(&nobody, None).expect("render"), "guest");
}

#[test]
fn loops_iterate_arrays() {
    let tmpl = PromptTemplate::new("{% for item in items %}- {{ item }}\n{% endfor %}");
    let rendered = tmpl
        .render(&vars(&[("items", json!(["a", "b", "c"]))]), None)
        .expect("render");
    assert_eq!(rendered, "- a\n- b\n- c\n");
}

#[test]
fn loops_over_undefined_iterate_zero_times() {
    let tmpl = PromptTemplate::new("start{% for item in missing %}{{ item }}{% endfor %}end");
    let rendered = tmpl.render(&HashMap::new(), None).expect("render");
    assert_eq!(rendered, "startend");
}

#[test]
fn loop_variable_shadows_outer_scope() {
    let tmpl = PromptTemplate::new("{% for name in names %}{{ name }},{% endfor %}{{ name }}");
    let v = vars(&[("names", json!(["x", "y"])), ("name", Value::from("outer"))]);
    assert_eq!(tmpl.render(&v, None).expect("render"), "x,y,outer");
}

#[test]
fn filters_apply_in_order() {
    let tmpl = PromptTemplate::new("{{ name | trim | upper }}");
    let rendered = tmpl
        .render(&vars(&[("name", Value::from("  ada  "))]), None)
        .expect("render");
    assert_eq!(rendered, "ADA");
}

#[test]
fn default_filter_fills_missing_values() {
    let tmpl = PromptTemplate::new("{{ missing | default('fallback') }}");
    let rendered = tmpl.render(&HashMap::new(), None).expect("render");
    assert_eq!(rendered, "fallback");
}

#[test]
fn join_and_length_filters() {
    let tmpl = PromptTemplate::new("{{ items | join(', ') }} ({{ items | length }})");
    let rendered = tmpl
        .render(&vars(&[("items", json!(["a", "b"]))]), None)
        .expect("render");
    assert_eq!(rendered, "a, b (2)");
}

#[test]
fn nested_lookup_and_indexing() {
    let tmpl = PromptTemplate::new("{{ user.emails[0] }} / {{ user['name'] }}");
    let v = vars(&[("user", json!({"name": "Ada", "emails": ["a@x.io", "b@x.io"]}))]);
    assert_eq!(tmpl.render(&v, None).expect("render"), "a@x.io / Ada");
}

#[test]
fn comparisons_in_conditions() {
    let tmpl = PromptTemplate::new("{% if count >= 3 %}many{% else %}few{% endif %}");
    assert_eq!(
        tmpl.render(&vars(&[("count", json!(5))]), None).expect("render"),
        "many"
    );
    assert_eq!(
        tmpl.render(&vars(&[("count", json!(2))]), None).expect("render"),
        "few"
    );
}

#[test]
fn trailing_newline_is_preserved() {
    let tmpl = PromptTemplate::new("Hello {{ name }}\n");
    let rendered = tmpl
        .render(&vars(&[("name", Value::from("World"))]), None)
        .expect("render");
    assert_eq!(rendered, "Hello World\n");
}

#[test]
fn forbidden_template_is_rejected_on_render() {
    let tmpl = PromptTemplate::new("{{ eval('bad') }}");
    let err = tmpl.render(&HashMap::new(), None).unwrap_err();
    match err {
        PromptcraftError::TemplateRejected(message) => {
            assert!(message.contains("eval"), "message: {message}");
        }
        other => panic!("expected TemplateRejected, got {other:?}"),
    }
}

#[test]
fn numbers_and_booleans_render_plainly() {
    let tmpl = PromptTemplate::new("{{ count }} {{ ready }}");
    let v = vars(&[("count", json!(42)), ("ready", json!(true))]);
    assert_eq!(tmpl.render(&v, None).expect("render"), "42 true");
}
