//! `lungscan classify`: run one image through the pipeline offline.

use std::path::Path;

use {
    anyhow::{Context, Result},
    lungscan_config::LungscanConfig,
    lungscan_inference::{Diagnosis, build_backend, format_reply},
    lungscan_media::image_ops,
    serde_json::json,
    tracing::debug,
};

pub async fn handle_classify(config: &LungscanConfig, image: &Path, as_json: bool) -> Result<()> {
    lungscan_config::validate(config, false).into_result()?;

    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("failed to read {}", image.display()))?;
    let backend = build_backend(&config.classifier).context("failed to initialise classifier")?;

    let meta = image_ops::get_image_metadata(&bytes)
        .with_context(|| format!("{} is not a supported image", image.display()))?;
    debug!(
        width = meta.width,
        height = meta.height,
        format = ?meta.format,
        backend = backend.id(),
        "classifying image"
    );
    let decoded = image_ops::decode_image(&bytes)
        .with_context(|| format!("{} is not a supported image", image.display()))?;
    let input = backend.input_kind().prepare(&decoded)?;
    let diagnosis = backend.classify(input).await?;

    if as_json {
        let value = match &diagnosis {
            Diagnosis::Scored(result) => serde_json::to_value(result)?,
            Diagnosis::TopLabel(label) => json!({ "classification": label }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", format_reply(&diagnosis, backend.reply_style()));
    }
    Ok(())
}
