//! Reply text for a diagnosis.

use lungscan_config::ReplyStyle;

use crate::{
    label::Label,
    result::{ClassificationResult, Diagnosis},
};

#[must_use]
pub fn summary(label: Label) -> String {
    format!("I detect potential {label} in the X-ray.")
}

/// One `Label: 0.70` line per label, highest confidence first.
#[must_use]
pub fn ranked(result: &ClassificationResult) -> String {
    result
        .ranked()
        .into_iter()
        .map(|(label, score)| format!("{label}: {score:.2}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a diagnosis. A ranked listing needs per-label scores; without
/// them the summary is used.
#[must_use]
pub fn format_reply(diagnosis: &Diagnosis, style: ReplyStyle) -> String {
    match (style, diagnosis) {
        (ReplyStyle::Ranked, Diagnosis::Scored(result)) => ranked(result),
        _ => summary(diagnosis.label()),
    }
}
