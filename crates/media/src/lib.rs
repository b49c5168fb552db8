//! Image preprocessing for the classifier: decode, RGB coercion, resize to the
//! model input size, tensor conversion and JPEG re-encoding.

pub mod error;
pub mod image_ops;
pub mod tensor;

pub use {
    error::{Error, Result},
    image::DynamicImage,
    tensor::{INPUT_SIZE, Normalization, NormalizedTensor, TENSOR_SHAPE},
};
