//! Decoding and normalization of inbound X-ray images.
//!
//! Every image, whatever its size or channel layout, ends up as a 224×224 RGB
//! bitmap. The local classifier consumes it as a [`NormalizedTensor`], the
//! remote classifier as a re-encoded JPEG.

use std::io::Cursor;

use {
    image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, imageops::FilterType},
    tracing::debug,
};

use crate::{
    error::{Error, Result},
    tensor::{INPUT_SIZE, Normalization, NormalizedTensor},
};

/// Bicubic resampling; deterministic for a given input.
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// JPEG quality used when re-encoding for the remote classifier (0-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Image metadata.
#[derive(Debug, Clone)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: Option<ImageFormat>,
}

/// Get metadata about an image without fully decoding it.
pub fn get_image_metadata(data: &[u8]) -> Result<ImageMetadata> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(Error::unsupported_format)?;

    let format = reader.format();
    let (width, height) = reader
        .into_dimensions()
        .map_err(Error::unsupported_format)?;

    Ok(ImageMetadata {
        width,
        height,
        format,
    })
}

/// Decode raw bytes into a bitmap, sniffing the format from the content.
///
/// The declared MIME type of an attachment is never trusted; anything the
/// decoder rejects is reported as [`Error::UnsupportedFormat`].
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    if data.is_empty() {
        return Err(Error::unsupported_format("empty file"));
    }

    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(Error::unsupported_format)?;
    if reader.format().is_none() {
        return Err(Error::unsupported_format("unrecognized image signature"));
    }

    let img = reader.decode().map_err(Error::unsupported_format)?;
    let (width, height) = img.dimensions();
    debug!(width, height, color = ?img.color(), "decoded image");
    Ok(img)
}

/// Force RGB and resize to exactly `INPUT_SIZE × INPUT_SIZE`, ignoring aspect
/// ratio the same way the model was trained.
#[must_use]
pub fn to_model_rgb(img: &DynamicImage) -> image::RgbImage {
    let rgb = img.to_rgb8();
    image::imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, RESIZE_FILTER)
}

/// Convert a decoded image into the classifier tensor.
#[must_use]
pub fn to_tensor(img: &DynamicImage, normalization: Normalization) -> NormalizedTensor {
    let resized = to_model_rgb(img);
    NormalizedTensor::from_rgb_bytes(resized.as_raw(), normalization)
}

/// Decode and normalize in one step.
pub fn preprocess(data: &[u8], normalization: Normalization) -> Result<NormalizedTensor> {
    let img = decode_image(data)?;
    Ok(to_tensor(&img, normalization))
}

/// Encode an image as JPEG with the given quality (1-100).
///
/// Alpha is dropped first since JPEG cannot carry it.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    if !(1..=100).contains(&quality) {
        return Err(Error::invalid_input(format!(
            "jpeg quality must be within 1..=100, got {quality}"
        )));
    }

    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut output = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| Error::external("failed to encode as JPEG", e))?;
    Ok(output.into_inner())
}
