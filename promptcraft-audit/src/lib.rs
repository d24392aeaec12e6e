//! Per-execution audit trail.
//!
//! Each execution gets its own timestamped directory holding the request, the
//! rendered prompt, the provider response, an audit record, and metrics as
//! separate artifacts, so a single run can be reconstructed after the fact.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

const LOG_DIR_VAR: &str = "LOG_DIR";
const DEFAULT_LOG_DIR: &str = "logs/executions";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit trail I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("audit trail serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Writer for one execution's artifacts. Creating the trail creates the
/// directory; each `record_*` call writes one file inside it.
#[derive(Debug, Clone)]
pub struct ExecutionTrail {
    dir: PathBuf,
}

impl ExecutionTrail {
    /// Creates a `<base>/<UTC timestamp>` directory for a single execution.
    pub fn create(base: impl AsRef<Path>) -> Result<Self, AuditError> {
        let timestamp = Utc::now().format("%Y-%m-%d_%H%M%S").to_string();
        let dir = base.as_ref().join(timestamp);
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "created execution trail");
        Ok(Self { dir })
    }

    /// Creates a trail under the `LOG_DIR` directory (default
    /// `logs/executions`).
    pub fn from_env() -> Result<Self, AuditError> {
        let base = env::var(LOG_DIR_VAR).unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
        Self::create(base)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the inbound execution request to `request.json`.
    pub fn record_request<T: Serialize>(&self, data: &T) -> Result<(), AuditError> {
        self.write_json("request.json", data)
    }

    /// Writes the rendered prompt text to `rendered_prompt.txt`.
    pub fn record_rendered_prompt(&self, prompt: &str) -> Result<(), AuditError> {
        fs::write(self.dir.join("rendered_prompt.txt"), prompt)?;
        Ok(())
    }

    /// Writes the provider response to `response.json`.
    pub fn record_response<T: Serialize>(&self, data: &T) -> Result<(), AuditError> {
        self.write_json("response.json", data)
    }

    /// Writes an audit record to `audit.log`.
    pub fn record_audit<T: Serialize>(&self, data: &T) -> Result<(), AuditError> {
        self.write_json("audit.log", data)
    }

    /// Writes execution metrics to `metrics.json`.
    pub fn record_metrics<T: Serialize>(&self, data: &T) -> Result<(), AuditError> {
        self.write_json("metrics.json", data)
    }

    fn write_json<T: Serialize>(&self, name: &str, data: &T) -> Result<(), AuditError> {
        let body = serde_json::to_string_pretty(data)?;
        fs::write(self.dir.join(name), body)?;
        Ok(())
    }
}
