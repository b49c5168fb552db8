//! Pluggable classifier backends.
//!
//! A backend declares which input it wants, so the caller can prepare the
//! decoded image once: a normalized tensor for in-process models, JPEG bytes
//! for remote services.

use {
    async_trait::async_trait,
    lungscan_config::ReplyStyle,
    lungscan_media::{DynamicImage, Normalization, NormalizedTensor, image_ops},
};

use crate::{error::Result, result::Diagnosis};

/// Input a backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Tensor(Normalization),
    Jpeg { quality: u8 },
}

impl InputKind {
    /// Turn a decoded image into the input this kind describes.
    pub fn prepare(self, image: &DynamicImage) -> Result<ClassifierInput> {
        Ok(match self {
            Self::Tensor(normalization) => {
                ClassifierInput::Tensor(image_ops::to_tensor(image, normalization))
            },
            Self::Jpeg { quality } => ClassifierInput::Jpeg(image_ops::encode_jpeg(image, quality)?),
        })
    }
}

/// A prepared image, ready for [`ClassifierBackend::classify`].
#[derive(Debug, Clone)]
pub enum ClassifierInput {
    Tensor(NormalizedTensor),
    Jpeg(Vec<u8>),
}

impl ClassifierInput {
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Tensor(_) => "tensor",
            Self::Jpeg(_) => "jpeg",
        }
    }
}

/// A classifier that can label a chest X-ray.
///
/// Implementations are shared across concurrently handled messages.
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Short identifier used in logs (e.g. "local", "remote").
    fn id(&self) -> &'static str;

    fn input_kind(&self) -> InputKind;

    /// How replies built from this backend's results are rendered.
    fn reply_style(&self) -> ReplyStyle;

    async fn classify(&self, input: ClassifierInput) -> Result<Diagnosis>;
}
