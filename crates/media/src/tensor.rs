use serde::{Deserialize, Serialize};

/// Width and height of the classifier input, in pixels.
pub const INPUT_SIZE: u32 = 224;

/// Number of color channels (RGB).
pub const CHANNELS: usize = 3;

/// NHWC shape of every tensor handed to the classifier.
pub const TENSOR_SHAPE: [usize; 4] = [1, INPUT_SIZE as usize, INPUT_SIZE as usize, CHANNELS];

/// Value range of the tensor elements.
///
/// Models exported with a rescaling layer expect raw pixel values, others
/// expect them pre-divided. The two are not interchangeable for a given model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Pixel values as floats in `[0, 255]`.
    #[default]
    Raw,
    /// Pixel values divided by 255, in `[0, 1]`.
    Unit,
}

impl Normalization {
    fn divisor(self) -> f32 {
        match self {
            Self::Raw => 1.0,
            Self::Unit => 255.0,
        }
    }

    #[must_use]
    pub fn apply(self, value: u8) -> f32 {
        f32::from(value) / self.divisor()
    }

    /// Largest value an element can take under this mode.
    #[must_use]
    pub fn max_value(self) -> f32 {
        self.apply(u8::MAX)
    }
}

impl std::fmt::Display for Normalization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
            Self::Unit => f.write_str("unit"),
        }
    }
}

/// A `(1, 224, 224, 3)` float tensor in row-major NHWC order, channels RGB.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Vec<f32>,
    normalization: Normalization,
}

impl NormalizedTensor {
    /// Number of elements in a tensor of [`TENSOR_SHAPE`].
    pub const LEN: usize = TENSOR_SHAPE[0] * TENSOR_SHAPE[1] * TENSOR_SHAPE[2] * TENSOR_SHAPE[3];

    pub(crate) fn from_rgb_bytes(pixels: &[u8], normalization: Normalization) -> Self {
        debug_assert_eq!(pixels.len(), Self::LEN);
        Self {
            data: pixels.iter().map(|&v| normalization.apply(v)).collect(),
            normalization,
        }
    }

    #[must_use]
    pub fn shape(&self) -> [usize; 4] {
        TENSOR_SHAPE
    }

    #[must_use]
    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// RGB values of the pixel at row `y`, column `x`.
    #[must_use]
    pub fn pixel(&self, y: usize, x: usize) -> Option<[f32; 3]> {
        let side = INPUT_SIZE as usize;
        if y >= side || x >= side {
            return None;
        }
        let start = (y * side + x) * CHANNELS;
        Some([self.data[start], self.data[start + 1], self.data[start + 2]])
    }
}
