//! Semantic validation of a loaded configuration.
//!
//! Parsing already rejects unknown enum values and wrong types; this pass
//! checks the combinations that only make sense together (backend vs. its
//! settings, reply style vs. what the backend can produce).

use crate::schema::{BackendKind, LungscanConfig, ReplyStyle};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "classifier.remote.endpoint"
    pub path: &'static str,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }

    /// Collapse into an error listing every error-level diagnostic.
    pub fn into_result(self) -> anyhow::Result<()> {
        if !self.has_errors() {
            return Ok(());
        }
        let lines = self
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        anyhow::bail!("invalid configuration: {lines}")
    }
}

/// Validate `config`. `require_token` is set when the Telegram bot is about
/// to start; offline commands do not need a token.
#[must_use]
pub fn validate(config: &LungscanConfig, require_token: bool) -> ValidationResult {
    let mut result = ValidationResult::default();

    if require_token && !config.telegram.has_token() {
        result.push(
            Severity::Error,
            "telegram.token",
            "bot token is required (set it in the config file or LUNGSCAN_TELEGRAM_TOKEN)",
        );
    }
    if config.telegram.poll_timeout_secs == 0 {
        result.push(
            Severity::Warning,
            "telegram.poll_timeout_secs",
            "0 disables long polling and makes the bot poll in a tight loop",
        );
    }

    let classifier = &config.classifier;
    match classifier.backend {
        BackendKind::Local => {
            match classifier.local.model_path.as_deref() {
                None => result.push(
                    Severity::Error,
                    "classifier.local.model_path",
                    "the local backend needs a path to an ONNX model",
                ),
                Some(path) if !path.exists() => result.push(
                    Severity::Warning,
                    "classifier.local.model_path",
                    format!("{} does not exist", path.display()),
                ),
                Some(_) => {},
            }
            if classifier.remote.endpoint.is_some() {
                result.push(
                    Severity::Warning,
                    "classifier.remote.endpoint",
                    "ignored while classifier.backend = \"local\"",
                );
            }
        },
        BackendKind::Remote => {
            match classifier.remote.endpoint.as_deref() {
                None => result.push(
                    Severity::Error,
                    "classifier.remote.endpoint",
                    "the remote backend needs an endpoint URL",
                ),
                Some(raw) => match url::Url::parse(raw) {
                    Ok(url) if matches!(url.scheme(), "http" | "https") => {},
                    Ok(url) => result.push(
                        Severity::Error,
                        "classifier.remote.endpoint",
                        format!("unsupported scheme '{}', expected http or https", url.scheme()),
                    ),
                    Err(e) => result.push(
                        Severity::Error,
                        "classifier.remote.endpoint",
                        format!("invalid URL: {e}"),
                    ),
                },
            }
            if classifier.remote.timeout_secs == 0 {
                result.push(
                    Severity::Error,
                    "classifier.remote.timeout_secs",
                    "timeout must be greater than zero",
                );
            }
            if !(1..=100).contains(&classifier.remote.jpeg_quality) {
                result.push(
                    Severity::Error,
                    "classifier.remote.jpeg_quality",
                    "must be within 1..=100",
                );
            }
            if classifier.reply_style == Some(ReplyStyle::Ranked) {
                result.push(
                    Severity::Error,
                    "classifier.reply_style",
                    "the remote service only returns the top label; use \"summary\"",
                );
            }
        },
    }

    result
}
