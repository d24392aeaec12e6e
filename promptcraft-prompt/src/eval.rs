use std::cmp::Ordering;
use std::collections::HashMap;

use promptcraft_core::Value;

use crate::parser::{Accessor, BinaryOp, Expr, Filter, Node};

/// Renders a parsed template against the merged variable map. Evaluation is
/// total: undefined lookups become null, null renders empty, and no template
/// input can make this panic or touch the host.
pub(crate) fn render_nodes(nodes: &[Node], vars: &HashMap<String, Value>) -> String {
    let mut out = String::new();
    let mut scope = Scope {
        globals: vars,
        locals: Vec::new(),
    };
    render_into(&mut out, nodes, &mut scope);
    out
}

struct Scope<'a> {
    globals: &'a HashMap<String, Value>,
    locals: Vec<(String, Value)>,
}

impl Scope<'_> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.locals
            .iter()
            .rev()
            .find(|(local, _)| local == name)
            .map(|(_, value)| value)
            .or_else(|| self.globals.get(name))
    }
}

fn render_into(out: &mut String, nodes: &[Node], scope: &mut Scope<'_>) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Output(expr) => {
                let value = eval_expr(expr, scope);
                let text = coerce_string(&value);
                if output_is_safe(expr) {
                    out.push_str(&text);
                } else {
                    out.push_str(&escape_html(&text));
                }
            }
            Node::If {
                branches,
                otherwise,
            } => {
                let mut taken = false;
                for (condition, body) in branches {
                    if truthy(&eval_expr(condition, scope)) {
                        render_into(out, body, scope);
                        taken = true;
                        break;
                    }
                }
                if !taken {
                    render_into(out, otherwise, scope);
                }
            }
            Node::For {
                var,
                iterable,
                body,
            } => {
                let items = match eval_expr(iterable, scope) {
                    Value::Array(items) => items,
                    Value::Object(map) => map.keys().cloned().map(Value::String).collect(),
                    _ => Vec::new(),
                };
                for item in items {
                    scope.locals.push((var.clone(), item));
                    render_into(out, body, scope);
                    scope.locals.pop();
                }
            }
        }
    }
}

fn eval_expr(expr: &Expr, scope: &Scope<'_>) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Lookup { root, path } => {
            let mut current = scope.lookup(root).cloned().unwrap_or(Value::Null);
            for accessor in path {
                current = match accessor {
                    Accessor::Field(field) => current
                        .as_object()
                        .and_then(|map| map.get(field))
                        .cloned()
                        .unwrap_or(Value::Null),
                    Accessor::Index(index) => {
                        let index = eval_expr(index, scope);
                        match (&current, &index) {
                            (Value::Array(items), Value::Number(n)) => n
                                .as_u64()
                                .and_then(|i| items.get(i as usize))
                                .cloned()
                                .unwrap_or(Value::Null),
                            (Value::Object(map), Value::String(key)) => {
                                map.get(key).cloned().unwrap_or(Value::Null)
                            }
                            _ => Value::Null,
                        }
                    }
                };
            }
            current
        }
        Expr::Not(inner) => Value::Bool(!truthy(&eval_expr(inner, scope))),
        Expr::Binary { op, left, right } => {
            let left = eval_expr(left, scope);
            let right = eval_expr(right, scope);
            let result = match op {
                BinaryOp::And => truthy(&left) && truthy(&right),
                BinaryOp::Or => truthy(&left) || truthy(&right),
                BinaryOp::Eq => values_equal(&left, &right),
                BinaryOp::Ne => !values_equal(&left, &right),
                BinaryOp::Lt => {
                    matches!(compare_values(&left, &right), Some(Ordering::Less))
                }
                BinaryOp::Le => matches!(
                    compare_values(&left, &right),
                    Some(Ordering::Less | Ordering::Equal)
                ),
                BinaryOp::Gt => {
                    matches!(compare_values(&left, &right), Some(Ordering::Greater))
                }
                BinaryOp::Ge => matches!(
                    compare_values(&left, &right),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
            };
            Value::Bool(result)
        }
        Expr::Filter {
            input,
            filter,
            args,
        } => {
            let input = eval_expr(input, scope);
            let args: Vec<Value> = args.iter().map(|arg| eval_expr(arg, scope)).collect();
            apply_filter(*filter, input, &args)
        }
    }
}

fn apply_filter(filter: Filter, input: Value, args: &[Value]) -> Value {
    match filter {
        Filter::Upper => Value::String(coerce_string(&input).to_uppercase()),
        Filter::Lower => Value::String(coerce_string(&input).to_lowercase()),
        Filter::Trim => Value::String(coerce_string(&input).trim().to_string()),
        Filter::Length => {
            let len = match &input {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                _ => 0,
            };
            Value::from(len as u64)
        }
        // Arity is enforced by the parser, so args[0] is present.
        Filter::Default => {
            if matches!(input, Value::Null) {
                args[0].clone()
            } else {
                input
            }
        }
        Filter::Join => match &input {
            Value::Array(items) => {
                let separator = coerce_string(&args[0]);
                Value::String(
                    items
                        .iter()
                        .map(coerce_string)
                        .collect::<Vec<_>>()
                        .join(&separator),
                )
            }
            _ => Value::String(coerce_string(&input)),
        },
        // Escaping is decided at the output site.
        Filter::Safe => input,
    }
}

/// Only an outermost `safe` bypasses escaping, so `x | safe | upper` is still
/// escaped while `x | upper | safe` is not.
fn output_is_safe(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Filter {
            filter: Filter::Safe,
            ..
        }
    )
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => l == r,
        },
        _ => left == right,
    }
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
