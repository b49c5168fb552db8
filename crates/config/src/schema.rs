//! Config schema types.

use std::path::PathBuf;

use {
    lungscan_media::{Normalization, image_ops::DEFAULT_JPEG_QUALITY},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LungscanConfig {
    pub telegram: TelegramConfig,
    pub classifier: ClassifierConfig,
}

/// Telegram bot account settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Long-polling timeout passed to `getUpdates` (seconds).
    pub poll_timeout_secs: u32,

    /// Register `/start` and `/help` in the client command menu at startup.
    pub register_commands: bool,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("register_commands", &self.register_commands)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            poll_timeout_secs: 30,
            register_commands: true,
        }
    }
}

impl TelegramConfig {
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

/// Which classifier answers inbound images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// ONNX model loaded in-process.
    #[default]
    Local,
    /// HTTP inference service.
    Remote,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(format!("unknown backend '{other}', expected 'local' or 'remote'")),
        }
    }
}

/// How a classification is rendered for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStyle {
    /// One line naming the top label.
    Summary,
    /// Every label with its confidence, highest first.
    Ranked,
}

/// Classifier selection and per-backend settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub backend: BackendKind,

    /// Overrides the backend's natural reply style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_style: Option<ReplyStyle>,

    pub local: LocalModelConfig,
    pub remote: RemoteConfig,
}

impl ClassifierConfig {
    /// Reply style in effect: the explicit override, else ranked for the
    /// local model and summary for the remote service.
    #[must_use]
    pub fn effective_reply_style(&self) -> ReplyStyle {
        self.reply_style.unwrap_or(match self.backend {
            BackendKind::Local => ReplyStyle::Ranked,
            BackendKind::Remote => ReplyStyle::Summary,
        })
    }
}

/// In-process model settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalModelConfig {
    /// Path to the ONNX export of the 5-class model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    /// Value range the model expects.
    pub normalization: Normalization,
}

/// Remote inference service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Full URL receiving the multipart POST.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Upper bound for one classification request (seconds).
    pub timeout_secs: u64,

    /// JPEG quality of the uploaded image (1-100).
    pub jpeg_quality: u8,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 30,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
