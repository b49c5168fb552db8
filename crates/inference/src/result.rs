use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{
    error::{Error, Result},
    label::{LABEL_COUNT, Label},
};

/// Tolerance on the sum of a probability vector.
const SUM_TOLERANCE: f64 = 1e-3;

/// Decimal places kept in reported confidences.
const PRECISION: f64 = 1e6;

/// Per-label confidences and the arg-max label.
///
/// Always holds exactly one score per label. Reported confidences are
/// rounded to six decimals; ranking and display use the model's own values.
/// The classification is the arg-max of the unrounded scores; the first index
/// wins on ties.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    probabilities: [f32; LABEL_COUNT],
    scores: [f64; LABEL_COUNT],
    classification: Label,
}

impl ClassificationResult {
    /// Validate a raw model output and turn it into a result.
    pub fn from_probabilities(probabilities: &[f32]) -> Result<Self> {
        if probabilities.len() != LABEL_COUNT {
            return Err(Error::invalid_output(format!(
                "expected {LABEL_COUNT} values, got {}",
                probabilities.len()
            )));
        }

        let mut sum = 0.0_f64;
        for (label, &p) in Label::ALL.iter().zip(probabilities) {
            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(Error::invalid_output(format!(
                    "{label} has out-of-range probability {p}"
                )));
            }
            sum += f64::from(p);
        }
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(Error::invalid_output(format!(
                "probabilities sum to {sum:.6}"
            )));
        }

        let mut best = 0;
        for (i, &p) in probabilities.iter().enumerate().skip(1) {
            if p > probabilities[best] {
                best = i;
            }
        }

        let mut raw = [0.0; LABEL_COUNT];
        raw.copy_from_slice(probabilities);
        let scores = raw.map(round6);

        Ok(Self {
            probabilities: raw,
            scores,
            classification: Label::ALL[best],
        })
    }

    #[must_use]
    pub fn classification(&self) -> Label {
        self.classification
    }

    #[must_use]
    pub fn confidence(&self, label: Label) -> f64 {
        self.scores[label.index()]
    }

    /// `(label, confidence)` pairs in model output order.
    pub fn scores(&self) -> impl Iterator<Item = (Label, f64)> + '_ {
        Label::ALL.into_iter().zip(self.scores.iter().copied())
    }

    /// Unrounded model output for `label`.
    #[must_use]
    pub fn probability(&self, label: Label) -> f32 {
        self.probabilities[label.index()]
    }

    /// `(label, probability)` pairs sorted by descending unrounded
    /// probability. Equal values keep model output order.
    #[must_use]
    pub fn ranked(&self) -> Vec<(Label, f32)> {
        let mut ranked: Vec<_> = Label::ALL
            .into_iter()
            .zip(self.probabilities.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Serializes as `{"classification": "...", "Pneumonia": 0.7, ...}`.
impl Serialize for ClassificationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(LABEL_COUNT + 1))?;
        map.serialize_entry("classification", &self.classification)?;
        for (label, score) in self.scores() {
            map.serialize_entry(label.as_str(), &score)?;
        }
        map.end()
    }
}

fn round6(p: f32) -> f64 {
    (f64::from(p) * PRECISION).round() / PRECISION
}

/// What a backend reports for one image.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnosis {
    /// Full per-label confidences.
    Scored(ClassificationResult),
    /// Only the winning label is known.
    TopLabel(Label),
}

impl Diagnosis {
    #[must_use]
    pub fn label(&self) -> Label {
        match self {
            Self::Scored(result) => result.classification(),
            Self::TopLabel(label) => *label,
        }
    }

    #[must_use]
    pub fn scores(&self) -> Option<&ClassificationResult> {
        match self {
            Self::Scored(result) => Some(result),
            Self::TopLabel(_) => None,
        }
    }
}
