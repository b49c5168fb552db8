//! Chest X-ray classification: labels, results, the local and remote
//! backends and reply formatting.

pub mod backend;
pub mod error;
pub mod format;
pub mod label;
pub mod local;
pub mod remote;
pub mod result;

use std::{sync::Arc, time::Duration};

use {
    lungscan_config::{BackendKind, ClassifierConfig},
    tracing::info,
};

pub use {
    backend::{ClassifierBackend, ClassifierInput, InputKind},
    error::{Error, Result},
    format::format_reply,
    label::{LABEL_COUNT, Label},
    local::{LocalClassifier, OnnxModel, ProbabilityModel},
    remote::RemoteClassifier,
    result::{ClassificationResult, Diagnosis},
};

/// Build the configured backend. Loads the model for the local backend, so
/// call this once at startup.
pub fn build_backend(config: &ClassifierConfig) -> Result<Arc<dyn ClassifierBackend>> {
    let style = config.effective_reply_style();
    match config.backend {
        BackendKind::Local => {
            let path = config
                .local
                .model_path
                .as_deref()
                .ok_or_else(|| Error::config("classifier.local.model_path is not set"))?;
            let model = OnnxModel::load(path)?;
            info!(
                backend = "local",
                normalization = %config.local.normalization,
                "classifier ready"
            );
            Ok(Arc::new(LocalClassifier::new(
                Arc::new(model),
                config.local.normalization,
                style,
            )))
        },
        BackendKind::Remote => {
            let endpoint = config
                .remote
                .endpoint
                .as_deref()
                .ok_or_else(|| Error::config("classifier.remote.endpoint is not set"))?;
            let backend = RemoteClassifier::new(
                endpoint,
                Duration::from_secs(config.remote.timeout_secs),
                config.remote.jpeg_quality,
            )?;
            info!(backend = "remote", endpoint, "classifier ready");
            Ok(Arc::new(backend))
        },
    }
}
