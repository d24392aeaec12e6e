/// JSON-like variable values, as supplied by callers and merged into the
/// rendering context.
pub type Value = serde_json::Value;
