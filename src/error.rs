use std::path::PathBuf;

use thiserror::Error;

/// Failures outside the pure rendering core: files, config, output.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to write output: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to serialize extraction result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A problem that was recovered from while rendering or extracting.
///
/// Issues never abort a call. They are collected so callers can log or
/// surface them, and the output already reflects the recovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Issue {
    #[error("line {line}: malformed {construct}, kept as text")]
    MalformedMarkup { line: usize, construct: &'static str },

    #[error("line {line}: code fence is never closed, rest of input kept as code")]
    UnterminatedFence { line: usize },

    #[error("unsafe url `{url}` kept as text")]
    UnsafeUrl { url: String },

    #[error("no JSON object could be parsed: {reason}")]
    JsonParseFailure { reason: String },
}

impl Issue {
    /// Emit the issue as a debug event.
    pub(crate) fn trace(&self) {
        match self {
            Issue::MalformedMarkup { line, construct } => {
                tracing::debug!(line, construct, "malformed markup kept as text")
            }
            Issue::UnterminatedFence { line } => {
                tracing::debug!(line, "unterminated code fence")
            }
            Issue::UnsafeUrl { url } => tracing::debug!(%url, "unsafe url kept as text"),
            Issue::JsonParseFailure { reason } => {
                tracing::debug!(%reason, "json extraction failed")
            }
        }
    }
}

/// Collects recovered issues for one call.
#[derive(Debug, Default)]
pub(crate) struct Issues(Vec<Issue>);

impl Issues {
    pub(crate) fn push(&mut self, issue: Issue) {
        issue.trace();
        self.0.push(issue);
    }

    pub(crate) fn into_vec(self) -> Vec<Issue> {
        self.0
    }
}
