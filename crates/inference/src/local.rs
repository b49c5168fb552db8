//! In-process classification with an ONNX model.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    async_trait::async_trait,
    lungscan_config::ReplyStyle,
    lungscan_media::{Normalization, NormalizedTensor, TENSOR_SHAPE},
    tract_onnx::prelude::*,
    tracing::{debug, info},
};

use crate::{
    backend::{ClassifierBackend, ClassifierInput, InputKind},
    error::{Error, Result},
    result::{ClassificationResult, Diagnosis},
};

/// Something that maps an input tensor to one probability per label.
pub trait ProbabilityModel: Send + Sync {
    fn predict(&self, tensor: &NormalizedTensor) -> Result<Vec<f32>>;
}

type Plan = TypedRunnableModel<TypedModel>;

/// An ONNX model taking a `(1, 224, 224, 3)` float input and producing a
/// `(1, 5)` softmax output.
pub struct OnnxModel {
    plan: Plan,
    path: PathBuf,
}

impl std::fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxModel")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl OnnxModel {
    /// Load and optimize the model. Done once at startup.
    pub fn load(path: &Path) -> Result<Self> {
        let plan = onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact(TENSOR_SHAPE).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| Error::model_load(path, format!("{e:#}")))?;

        info!(path = %path.display(), "loaded classification model");
        Ok(Self {
            plan,
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProbabilityModel for OnnxModel {
    fn predict(&self, tensor: &NormalizedTensor) -> Result<Vec<f32>> {
        let input = Tensor::from_shape(&TENSOR_SHAPE, tensor.as_slice())
            .map_err(|e| Error::inference(format!("{e:#}")))?;
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| Error::inference(format!("{e:#}")))?;
        let output = outputs
            .first()
            .ok_or_else(|| Error::invalid_output("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| Error::invalid_output(format!("{e:#}")))?;
        Ok(view.iter().copied().collect())
    }
}

/// Backend running a [`ProbabilityModel`] in-process.
pub struct LocalClassifier {
    model: Arc<dyn ProbabilityModel>,
    normalization: Normalization,
    reply_style: ReplyStyle,
}

impl LocalClassifier {
    #[must_use]
    pub fn new(
        model: Arc<dyn ProbabilityModel>,
        normalization: Normalization,
        reply_style: ReplyStyle,
    ) -> Self {
        Self {
            model,
            normalization,
            reply_style,
        }
    }

    /// Classify synchronously. Also used by the one-shot CLI command.
    pub fn classify_tensor(&self, tensor: &NormalizedTensor) -> Result<ClassificationResult> {
        score(self.model.as_ref(), self.normalization, tensor)
    }
}

fn score(
    model: &dyn ProbabilityModel,
    normalization: Normalization,
    tensor: &NormalizedTensor,
) -> Result<ClassificationResult> {
    if tensor.normalization() != normalization {
        return Err(Error::UnexpectedInput {
            expected: "tensor with matching normalization",
        });
    }
    let probabilities = model.predict(tensor)?;
    let result = ClassificationResult::from_probabilities(&probabilities)?;
    debug!(
        classification = %result.classification(),
        confidence = result.confidence(result.classification()),
        "local classification"
    );
    Ok(result)
}

#[async_trait]
impl ClassifierBackend for LocalClassifier {
    fn id(&self) -> &'static str {
        "local"
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Tensor(self.normalization)
    }

    fn reply_style(&self) -> ReplyStyle {
        self.reply_style
    }

    async fn classify(&self, input: ClassifierInput) -> Result<Diagnosis> {
        let ClassifierInput::Tensor(tensor) = input else {
            return Err(Error::UnexpectedInput { expected: "tensor" });
        };
        // Run the model in blocking context.
        let model = Arc::clone(&self.model);
        let normalization = self.normalization;
        tokio::task::spawn_blocking(move || score(model.as_ref(), normalization, &tensor))
            .await
            .map_err(|e| Error::inference(format!("inference task failed: {e}")))?
            .map(Diagnosis::Scored)
    }
}
