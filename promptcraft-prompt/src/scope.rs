use std::env;
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

const AUTHORIZED_TARGETS_VAR: &str = "AUTHORIZED_TARGETS";
const MAX_TARGETS: usize = 5;

fn shell_metacharacters() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[;&|`$(){}!<>\\\n\r]").expect("valid pattern"))
}

/// Strips shell metacharacters from user input before it reaches anything
/// that could interpret them.
pub fn sanitize_input(value: &str) -> String {
    shell_metacharacters().replace_all(value, "").into_owned()
}

/// True for well-formed http/https URLs with a host.
pub fn validate_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().map(|host| !host.is_empty()).unwrap_or(false)
        }
        Err(_) => false,
    }
}

/// Allow-list of domains an execution is permitted to reference. An empty
/// list authorizes nothing.
#[derive(Clone, Debug, Default)]
pub struct ScopePolicy {
    authorized: Vec<String>,
}

impl ScopePolicy {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let authorized = targets
            .into_iter()
            .map(|target| target.into().trim().to_lowercase())
            .filter(|target| !target.is_empty())
            .collect();
        Self { authorized }
    }

    /// Loads the allow-list from the `AUTHORIZED_TARGETS` environment
    /// variable (comma-separated domains).
    pub fn from_env() -> Self {
        Self::new(env::var(AUTHORIZED_TARGETS_VAR).unwrap_or_default().split(','))
    }

    /// Case-insensitive membership check; always false when the list is
    /// empty.
    pub fn is_authorized(&self, domain: &str) -> bool {
        if self.authorized.is_empty() {
            return false;
        }
        let clean = domain.trim().to_lowercase();
        self.authorized.iter().any(|target| *target == clean)
    }

    /// Validates a batch of targets; returns all violations, empty means the
    /// batch is acceptable.
    pub fn validate_targets(&self, targets: &[String]) -> Vec<String> {
        let mut errors = Vec::new();
        if targets.len() > MAX_TARGETS {
            errors.push(format!(
                "Maximum {MAX_TARGETS} targets allowed, got {}",
                targets.len()
            ));
        }
        for target in targets {
            let clean = target.trim().to_lowercase();
            if !self.authorized.is_empty() && !self.authorized.contains(&clean) {
                errors.push(format!("Target '{clean}' is not in the authorized scope"));
            }
        }
        errors
    }
}
