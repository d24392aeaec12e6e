use std::sync::OnceLock;

use regex::Regex;

use crate::parser;

/// Tokens that indicate an attempt to escape the sandbox: standalone
/// `import`/`exec`/`eval` keywords and dunder-style name mangling.
const FORBIDDEN_PATTERNS: [&str; 4] = [r"\bimport\b", r"\bexec\b", r"\beval\b", r"__\w+__"];

fn forbidden_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        FORBIDDEN_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern).expect("valid forbidden pattern"))
            .collect()
    })
}

/// Checks a raw template for forbidden patterns and syntax errors.
///
/// Returns the full accumulated list of diagnostics; an empty list means the
/// template is accepted. The scan covers the whole template text, not just
/// expression positions, so a forbidden token is caught wherever it appears.
pub fn validate_template(template: &str) -> Vec<String> {
    let mut errors = Vec::new();
    for pattern in forbidden_patterns() {
        if pattern.is_match(template) {
            errors.push(format!(
                "Forbidden pattern detected: '{}'",
                pattern.as_str()
            ));
        }
    }
    if let Err(err) = parser::parse(template) {
        errors.push(format!("Template syntax error: {err}"));
    }
    errors
}
