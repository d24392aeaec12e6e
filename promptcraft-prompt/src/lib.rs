//! Sandboxed prompt templating.
//!
//! Templates are plain strings with `{{ expr }}` interpolation and
//! `{% if %}` / `{% for %}` blocks over a restricted expression language.
//! Evaluation can only read the supplied variables through key and index
//! lookup plus a fixed allow-list of filters; there is no access to the host
//! environment from inside a template.

mod eval;
mod parser;
mod scope;
mod template;
mod validate;

pub use scope::{sanitize_input, validate_url, ScopePolicy};
pub use template::{merge_variables, PromptTemplate};
pub use validate::validate_template;
